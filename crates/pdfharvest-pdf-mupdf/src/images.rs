//! Image listing and decoding over the lopdf object table.
//!
//! Listing follows `/XObject` references from the page's (possibly
//! inherited) resources to the shared image objects, descending into Form
//! XObjects. Decoding returns the stream verbatim for formats that are
//! already files on their own (JPEG, JPEG 2000, JBIG2) and re-encodes raw
//! samples as PNG otherwise.

use std::collections::HashSet;
use std::io::Cursor;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use pdfharvest_core::{BackendError, ExtractedImage, ImageRef};

/// Images referenced from the page `page_id`, in resource order.
///
/// An xref appears at most once per page even when several resource names
/// (or nested forms) point at it.
pub fn page_image_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<ImageRef>, BackendError> {
    let mut refs = Vec::new();
    let mut seen_images = HashSet::new();
    let mut seen_forms = HashSet::new();

    if let Some(resources) = page_resources(doc, page_id)? {
        collect_images(doc, resources, &mut refs, &mut seen_images, &mut seen_forms);
    }
    Ok(refs)
}

/// Extract the image object `xref` as encoded bytes plus extension.
pub fn extract_image(doc: &Document, xref: u32) -> Result<ExtractedImage, BackendError> {
    let err = |message: String| BackendError::ImageError { xref, message };

    let (_, object) = doc
        .objects
        .range((xref, 0)..=(xref, u16::MAX))
        .next()
        .ok_or_else(|| err("no such object".into()))?;
    let stream = object
        .as_stream()
        .map_err(|_| err("object is not a stream".into()))?;

    let filters = stream_filters(doc, stream);
    let passthrough = match filters.last().map(String::as_str) {
        Some("DCTDecode") => Some("jpeg"),
        Some("JPXDecode") => Some("jpx"),
        Some("JBIG2Decode") => Some("jb2"),
        _ => None,
    };

    if let Some(ext) = passthrough {
        // Outer filters wrapping the codec are undone; the codec data is kept.
        let outer = &filters[..filters.len() - 1];
        let data = decode_filters(doc, stream, outer).map_err(err)?;
        return Ok(ExtractedImage {
            xref,
            data,
            ext: ext.to_string(),
        });
    }

    if filters.iter().any(|f| f == "CCITTFaxDecode") {
        return Err(err("CCITTFaxDecode images are not supported".into()));
    }

    let samples = decode_filters(doc, stream, &filters).map_err(err)?;
    let data = encode_png(doc, &stream.dict, &samples).map_err(err)?;
    Ok(ExtractedImage {
        xref,
        data,
        ext: "png".to_string(),
    })
}

/// Undo the general-purpose `filters` (outermost first) of an image stream.
///
/// lopdf refuses to decompress streams marked `/Subtype /Image`, so the data
/// is decoded through a bare stream carrying only the filter entries.
fn decode_filters(doc: &Document, stream: &Stream, filters: &[String]) -> Result<Vec<u8>, String> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }

    let mut dict = Dictionary::new();
    dict.set(
        "Filter",
        filters
            .iter()
            .map(|f| Object::Name(f.as_bytes().to_vec()))
            .collect::<Vec<Object>>(),
    );
    // lopdf applies one parameter dictionary to every filter; use the
    // outermost filter's.
    let params = stream
        .dict
        .get(b"DecodeParms")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| match o {
            Object::Array(items) => items.first().and_then(|p| resolve(doc, p)),
            other => Some(other),
        })
        .and_then(|o| o.as_dict().ok());
    if let Some(params) = params {
        dict.set("DecodeParms", params.clone());
    }

    let decoded = Stream::new(dict, stream.content.clone())
        .decompressed_content()
        .map_err(|e| format!("decompression failed: {e}"))?;
    // A broken zlib stream decodes to nothing rather than an error.
    if decoded.is_empty() && !stream.content.is_empty() {
        return Err("decompression produced no data".into());
    }
    Ok(decoded)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// The page's `/Resources`, walking up `/Parent` links for inherited ones.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Option<&Dictionary>, BackendError> {
    let mut current = page_id;
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(current) {
            return Ok(None);
        }
        let dict = doc
            .get_object(current)
            .and_then(Object::as_dict)
            .map_err(|e| BackendError::ExtractionError(format!("bad page dictionary: {e}")))?;

        if let Ok(resources) = dict.get(b"Resources") {
            return Ok(resolve(doc, resources).and_then(|o| o.as_dict().ok()));
        }
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => return Ok(None),
        }
    }
}

fn collect_images(
    doc: &Document,
    resources: &Dictionary,
    refs: &mut Vec<ImageRef>,
    seen_images: &mut HashSet<ObjectId>,
    seen_forms: &mut HashSet<ObjectId>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    else {
        return;
    };

    for (name, value) in xobjects.iter() {
        // Only indirect objects have an xref to name files after.
        let Ok(id) = value.as_reference() else {
            continue;
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            tracing::debug!(xref = id.0, "XObject reference is not a stream");
            continue;
        };

        match subtype(&stream.dict) {
            Some(b"Image") => {
                if seen_images.insert(id) {
                    refs.push(ImageRef {
                        xref: id.0,
                        name: Some(String::from_utf8_lossy(name).into_owned()),
                    });
                }
            }
            Some(b"Form") => {
                if !seen_forms.insert(id) {
                    continue;
                }
                if let Some(form_resources) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve(doc, o))
                    .and_then(|o| o.as_dict().ok())
                {
                    collect_images(doc, form_resources, refs, seen_images, seen_forms);
                }
            }
            _ => {}
        }
    }
}

fn subtype(dict: &Dictionary) -> Option<&[u8]> {
    dict.get(b"Subtype").and_then(Object::as_name).ok()
}

/// Filter names of a stream, outermost first.
fn stream_filters(doc: &Document, stream: &Stream) -> Vec<String> {
    let Some(filter) = stream.dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) else {
        return Vec::new();
    };
    let name = |o: &Object| {
        o.as_name()
            .ok()
            .map(|n| String::from_utf8_lossy(n).into_owned())
    };
    match filter {
        Object::Array(items) => items.iter().filter_map(name).collect(),
        other => name(other).into_iter().collect(),
    }
}

/// Color model of raw image samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup; `base` is the color model of the palette entries.
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

fn color_model(doc: &Document, dict: &Dictionary) -> Result<ColorModel, String> {
    if dict.get(b"ImageMask").and_then(Object::as_bool).unwrap_or(false) {
        return Ok(ColorModel::Gray);
    }
    match dict.get(b"ColorSpace").ok().and_then(|o| resolve(doc, o)) {
        None => Ok(ColorModel::Gray),
        Some(space) => parse_color_space(doc, space),
    }
}

fn parse_color_space(doc: &Document, space: &Object) -> Result<ColorModel, String> {
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorModel::Cmyk),
            other => Err(format!(
                "unsupported color space {}",
                String::from_utf8_lossy(other)
            )),
        },
        Object::Array(items) => {
            let family = items
                .first()
                .and_then(|o| o.as_name().ok())
                .ok_or("empty color space array")?;
            match family {
                b"ICCBased" => {
                    let components = items
                        .get(1)
                        .and_then(|o| resolve(doc, o))
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").and_then(Object::as_i64).ok())
                        .unwrap_or(3);
                    match components {
                        1 => Ok(ColorModel::Gray),
                        3 => Ok(ColorModel::Rgb),
                        4 => Ok(ColorModel::Cmyk),
                        n => Err(format!("ICC profile with {n} components")),
                    }
                }
                b"CalGray" => Ok(ColorModel::Gray),
                b"CalRGB" => Ok(ColorModel::Rgb),
                b"Indexed" | b"I" => {
                    let base = items
                        .get(1)
                        .and_then(|o| resolve(doc, o))
                        .ok_or("indexed color space without base")?;
                    let base = parse_color_space(doc, base)?;
                    if matches!(base, ColorModel::Indexed { .. }) {
                        return Err("nested indexed color space".into());
                    }
                    let palette = items
                        .get(3)
                        .and_then(|o| resolve(doc, o))
                        .and_then(|lookup| match lookup {
                            Object::String(bytes, _) => Some(bytes.clone()),
                            Object::Stream(s) => s
                                .decompressed_content()
                                .ok()
                                .or_else(|| Some(s.content.clone())),
                            _ => None,
                        })
                        .ok_or("indexed color space without lookup table")?;
                    Ok(ColorModel::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                other => Err(format!(
                    "unsupported color space {}",
                    String::from_utf8_lossy(other)
                )),
            }
        }
        _ => Err("malformed color space".into()),
    }
}

/// Unpack `bpc`-bit samples into one byte per sample. Rows start on a byte
/// boundary. 16-bit samples keep their high byte.
///
/// Returns `None` for an unsupported depth, sizes that overflow, or data
/// shorter than the declared dimensions.
fn unpack_samples(
    data: &[u8],
    width: usize,
    height: usize,
    components: usize,
    bpc: u8,
) -> Option<Vec<u8>> {
    if !matches!(bpc, 1 | 2 | 4 | 8 | 16) {
        return None;
    }
    let samples_per_row = width.checked_mul(components)?;
    let row_bytes = samples_per_row.checked_mul(bpc as usize)?.div_ceil(8);
    let needed = row_bytes.checked_mul(height)?;
    if row_bytes == 0 || data.len() < needed {
        return None;
    }

    let mut out = Vec::with_capacity(samples_per_row.checked_mul(height)?);
    for row in data.chunks_exact(row_bytes).take(height) {
        match bpc {
            8 => out.extend_from_slice(&row[..samples_per_row]),
            16 => out.extend(row.chunks_exact(2).take(samples_per_row).map(|pair| pair[0])),
            _ => {
                let per_byte = 8 / bpc as usize;
                let mask = (1u8 << bpc) - 1;
                for i in 0..samples_per_row {
                    let byte = row[i / per_byte];
                    let shift = 8 - bpc as usize * (i % per_byte + 1);
                    out.push((byte >> shift) & mask);
                }
            }
        }
    }
    Some(out)
}

/// Scale a sample of `bpc` bits to the 0..=255 range.
fn scale(sample: u8, bpc: u8) -> u8 {
    if bpc >= 8 {
        return sample;
    }
    let max = (1u16 << bpc) - 1;
    (u16::from(sample) * 255 / max) as u8
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(cmyk[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}

fn encode_png(doc: &Document, dict: &Dictionary, samples: &[u8]) -> Result<Vec<u8>, String> {
    let dimension = |key: &[u8]| {
        dict.get(key)
            .and_then(Object::as_i64)
            .ok()
            .filter(|v| *v > 0)
            .and_then(|v| u32::try_from(v).ok())
    };
    let width = dimension(b"Width").ok_or("missing /Width")?;
    let height = dimension(b"Height").ok_or("missing /Height")?;
    let is_mask = dict.get(b"ImageMask").and_then(Object::as_bool).unwrap_or(false);
    let bpc = if is_mask {
        1
    } else {
        let declared = dict
            .get(b"BitsPerComponent")
            .and_then(Object::as_i64)
            .unwrap_or(8);
        u8::try_from(declared)
            .ok()
            .filter(|b| matches!(*b, 1 | 2 | 4 | 8 | 16))
            .ok_or_else(|| format!("unsupported /BitsPerComponent {declared}"))?
    };

    let model = color_model(doc, dict)?;
    let unpacked = unpack_samples(
        samples,
        width as usize,
        height as usize,
        model.components(),
        bpc,
    )
    .ok_or_else(|| format!("sample data does not fit {width}x{height} at {bpc} bits"))?;

    let decoded = match &model {
        ColorModel::Gray => {
            let mut pixels: Vec<u8> = unpacked.iter().map(|&s| scale(s, bpc)).collect();
            if is_mask {
                // Mask samples of 0 paint; show painted pixels as black.
                for p in &mut pixels {
                    *p = 255 - *p;
                }
            }
            image::GrayImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageLuma8)
        }
        ColorModel::Rgb => {
            let pixels = unpacked.iter().map(|&s| scale(s, bpc)).collect();
            image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8)
        }
        ColorModel::Cmyk => {
            let pixels = unpacked
                .chunks_exact(4)
                .flat_map(|c| {
                    let scaled = [
                        scale(c[0], bpc),
                        scale(c[1], bpc),
                        scale(c[2], bpc),
                        scale(c[3], bpc),
                    ];
                    cmyk_to_rgb(&scaled)
                })
                .collect();
            image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8)
        }
        ColorModel::Indexed { base, palette } => {
            let entry = base.components();
            let mut pixels = Vec::with_capacity(unpacked.len() * 3);
            for &index in &unpacked {
                let start = index as usize * entry;
                let color = palette
                    .get(start..start + entry)
                    .ok_or_else(|| format!("palette index {index} out of range"))?;
                match base.as_ref() {
                    ColorModel::Gray => pixels.extend_from_slice(&[color[0]; 3]),
                    ColorModel::Cmyk => pixels.extend_from_slice(&cmyk_to_rgb(color)),
                    _ => pixels.extend_from_slice(color),
                }
            }
            image::RgbImage::from_raw(width, height, pixels).map(image::DynamicImage::ImageRgb8)
        }
    };
    let decoded = decoded.ok_or("failed to create image from raw data")?;

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {e}"))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use lopdf::dictionary;

    use super::*;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// A document holding one image stream; returns it with the stream's xref.
    fn doc_with_image(dict: Dictionary, content: Vec<u8>) -> (Document, u32) {
        let mut doc = Document::with_version("1.5");
        let id = doc.add_object(Stream::new(dict, content));
        (doc, id.0)
    }

    fn gray_image(width: i64, height: i64, bpc: i64) -> Dictionary {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => bpc,
        }
    }

    #[test]
    fn flate_image_is_decoded_to_png() {
        let mut dict = gray_image(2, 2, 8);
        dict.set("Filter", "FlateDecode");
        let (doc, xref) = doc_with_image(dict, zlib(&[0, 64, 128, 255]));

        let image = extract_image(&doc, xref).unwrap();
        assert_eq!(image.ext, "png");
        assert!(image.data.starts_with(b"\x89PNG"));
    }

    #[test]
    fn zero_bits_per_component_is_an_error() {
        let (doc, xref) = doc_with_image(gray_image(2, 2, 0), vec![0; 4]);
        let e = extract_image(&doc, xref).unwrap_err();
        assert!(e.to_string().contains("BitsPerComponent"));
    }

    #[test]
    fn bits_per_component_that_truncates_to_zero_is_an_error() {
        let (doc, xref) = doc_with_image(gray_image(2, 2, 256), vec![0; 4]);
        assert!(extract_image(&doc, xref).is_err());
    }

    #[test]
    fn huge_dimensions_are_an_error() {
        let mut dict = gray_image(i32::MAX as i64, i32::MAX as i64, 16);
        dict.set("ColorSpace", "DeviceCMYK");
        let (doc, xref) = doc_with_image(dict, vec![0; 64]);
        assert!(extract_image(&doc, xref).is_err());
    }

    #[test]
    fn unpack_rejects_unsupported_depths_and_overflow() {
        assert!(unpack_samples(&[0u8; 4], 2, 2, 1, 0).is_none());
        assert!(unpack_samples(&[0u8; 4], 2, 2, 1, 3).is_none());
        assert!(unpack_samples(&[0u8; 4], usize::MAX, usize::MAX, 4, 16).is_none());
    }

    #[test]
    fn jpeg_behind_flate_is_unwrapped() {
        let jpeg = b"\xff\xd8\xff\xe0 jpeg body \xff\xd9".to_vec();
        let mut dict = gray_image(1, 1, 8);
        dict.set(
            "Filter",
            vec![Object::from("FlateDecode"), Object::from("DCTDecode")],
        );
        let (doc, xref) = doc_with_image(dict, zlib(&jpeg));

        let image = extract_image(&doc, xref).unwrap();
        assert_eq!(image.ext, "jpeg");
        assert_eq!(image.data, jpeg);
    }

    #[test]
    fn corrupt_flate_is_an_error() {
        let mut dict = gray_image(2, 2, 8);
        dict.set("Filter", "FlateDecode");
        let (doc, xref) = doc_with_image(dict, b"not zlib at all".to_vec());
        assert!(extract_image(&doc, xref).is_err());
    }

    #[test]
    fn unpack_one_bit_rows_are_byte_aligned() {
        // width 3, 2 rows: 101xxxxx / 010xxxxx
        let data = [0b1010_0000, 0b0100_0000];
        assert_eq!(
            unpack_samples(&data, 3, 2, 1, 1).unwrap(),
            vec![1, 0, 1, 0, 1, 0]
        );
    }

    #[test]
    fn unpack_rejects_short_data() {
        assert!(unpack_samples(&[0u8; 5], 2, 1, 3, 8).is_none());
    }

    #[test]
    fn unpack_sixteen_bit_keeps_high_byte() {
        assert_eq!(
            unpack_samples(&[0xAB, 0xCD, 0x12, 0x34], 2, 1, 1, 16).unwrap(),
            vec![0xAB, 0x12]
        );
    }

    #[test]
    fn scale_spreads_low_bit_depths() {
        assert_eq!(scale(1, 1), 255);
        assert_eq!(scale(0, 1), 0);
        assert_eq!(scale(15, 4), 255);
        assert_eq!(scale(200, 8), 200);
    }

    #[test]
    fn cmyk_black_and_white() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), [255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), [0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), [0, 255, 255]);
    }

    #[test]
    fn color_space_names() {
        let doc = Document::with_version("1.5");
        assert_eq!(
            parse_color_space(&doc, &Object::Name(b"DeviceRGB".to_vec())).unwrap(),
            ColorModel::Rgb
        );
        assert!(parse_color_space(&doc, &Object::Name(b"Pattern".to_vec())).is_err());
    }

    #[test]
    fn indexed_color_space_reads_palette_string() {
        let doc = Document::with_version("1.5");
        let space = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(1),
            Object::String(vec![255, 0, 0, 0, 0, 255], lopdf::StringFormat::Hexadecimal),
        ]);
        match parse_color_space(&doc, &space).unwrap() {
            ColorModel::Indexed { base, palette } => {
                assert_eq!(*base, ColorModel::Rgb);
                assert_eq!(palette.len(), 6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
