use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source document used when no path is given anywhere.
pub const DEFAULT_PDF_PATH: &str = "Digital-SAT-December-2024-U-S-a.pdf";
/// Image directory used when no path is given anywhere.
pub const DEFAULT_OUTPUT_DIR: &str = "extracted_images";
/// Chart file used when no path is given anywhere.
pub const DEFAULT_CHART_PATH: &str = "ratings_by_painting_style.png";

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub extract: Option<ExtractConfig>,
    pub chart: Option<ChartConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub pdf_path: Option<String>,
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartConfig {
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub color: Option<bool>,
}

impl ConfigFile {
    pub fn pdf_path(&self) -> Option<PathBuf> {
        self.extract
            .as_ref()
            .and_then(|e| e.pdf_path.as_ref())
            .map(PathBuf::from)
    }

    pub fn output_dir(&self) -> Option<PathBuf> {
        self.extract
            .as_ref()
            .and_then(|e| e.output_dir.as_ref())
            .map(PathBuf::from)
    }

    pub fn chart_path(&self) -> Option<PathBuf> {
        self.chart
            .as_ref()
            .and_then(|c| c.output_path.as_ref())
            .map(PathBuf::from)
    }

    /// Whether colored output is allowed. Defaults to `true`.
    pub fn color(&self) -> bool {
        self.display.as_ref().and_then(|d| d.color).unwrap_or(true)
    }
}

/// Platform config directory path: `<config_dir>/pdfharvest/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdfharvest").join("config.toml"))
}

/// Load config by cascading CWD `.pdfharvest.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pdfharvest.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        extract: Some(ExtractConfig {
            pdf_path: overlay
                .extract
                .as_ref()
                .and_then(|e| e.pdf_path.clone())
                .or_else(|| base.extract.as_ref().and_then(|e| e.pdf_path.clone())),
            output_dir: overlay
                .extract
                .as_ref()
                .and_then(|e| e.output_dir.clone())
                .or_else(|| base.extract.as_ref().and_then(|e| e.output_dir.clone())),
        }),
        chart: Some(ChartConfig {
            output_path: overlay
                .chart
                .as_ref()
                .and_then(|c| c.output_path.clone())
                .or_else(|| base.chart.as_ref().and_then(|c| c.output_path.clone())),
        }),
        display: Some(DisplayConfig {
            color: overlay
                .display
                .as_ref()
                .and_then(|d| d.color)
                .or_else(|| base.display.as_ref().and_then(|d| d.color)),
        }),
    }
}

/// Resolve a path setting: CLI flag > environment variable > config file > default.
pub fn resolve_path(
    flag: Option<PathBuf>,
    env_var: &str,
    from_config: Option<PathBuf>,
    default: &str,
) -> PathBuf {
    flag.or_else(|| std::env::var(env_var).ok().map(PathBuf::from))
        .or(from_config)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_paths_round_trip_toml() {
        let config = ConfigFile {
            extract: Some(ExtractConfig {
                pdf_path: Some("/tmp/in.pdf".to_string()),
                output_dir: Some("/tmp/out".to_string()),
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.pdf_path().unwrap(), PathBuf::from("/tmp/in.pdf"));
        assert_eq!(parsed.output_dir().unwrap(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn absent_sections_deserialize_as_none() {
        let parsed: ConfigFile = toml::from_str("[chart]\noutput_path = \"c.svg\"\n").unwrap();
        assert!(parsed.pdf_path().is_none());
        assert_eq!(parsed.chart_path().unwrap(), PathBuf::from("c.svg"));
        assert!(parsed.color());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            extract: Some(ExtractConfig {
                output_dir: Some("/base/out".to_string()),
                ..Default::default()
            }),
            display: Some(DisplayConfig { color: Some(true) }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            extract: Some(ExtractConfig {
                output_dir: Some("/overlay/out".to_string()),
                ..Default::default()
            }),
            display: Some(DisplayConfig { color: Some(false) }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(merged.output_dir().unwrap(), PathBuf::from("/overlay/out"));
        assert!(!merged.color());
    }

    #[test]
    fn merge_base_preserved_when_overlay_absent() {
        let base = ConfigFile {
            extract: Some(ExtractConfig {
                pdf_path: Some("/base/in.pdf".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, ConfigFile::default());
        assert_eq!(merged.pdf_path().unwrap(), PathBuf::from("/base/in.pdf"));
    }

    #[test]
    fn load_from_path_ignores_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(load_from_path(&path).is_none());
        assert!(load_from_path(&tmp.path().join("missing.toml")).is_none());
    }

    #[test]
    fn resolve_path_prefers_flag_then_config() {
        let var = "PDFHARVEST_TEST_UNSET_VAR";
        assert_eq!(
            resolve_path(Some("flag".into()), var, Some("cfg".into()), "def"),
            PathBuf::from("flag")
        );
        assert_eq!(
            resolve_path(None, var, Some("cfg".into()), "def"),
            PathBuf::from("cfg")
        );
        assert_eq!(resolve_path(None, var, None, "def"), PathBuf::from("def"));
    }
}
