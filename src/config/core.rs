use crate::capability::RepresentationSet;
use crate::config::layout::HostLayout;
use crate::utils::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// Overrides the version string the host reports when picking a layout.
    pub host_version: Option<String>,
    pub log_level: String,
    /// Fast paths that are never attempted.
    pub disabled: RepresentationSet,
    /// Checked before the built-in layouts.
    pub layouts: Vec<HostLayout>,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            host_version: None,
            log_level: "info".to_string(),
            disabled: RepresentationSet::empty(),
            layouts: Vec::new(),
        }
    }
}

impl ShimConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` if it exists, otherwise the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "MetroManDevTeam", "chunk_shim")
            .map(|dirs| dirs.config_dir().join("chunk_shim.toml"))
    }

    /// Picks the layout for `reported`, the version string the host gives.
    pub fn layout_for(&self, reported: &str) -> Result<HostLayout, ConfigError> {
        let version = self.host_version.as_deref().unwrap_or(reported);
        self.layouts
            .iter()
            .cloned()
            .chain(HostLayout::builtin())
            .find(|layout| layout.version == version)
            .ok_or_else(|| ConfigError::UnknownHostVersion(version.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
log_level = "debug"
disabled = "CHUNK_MAP | UNLOAD_QUEUE"

[[layouts]]
version = "v1_5_0"
fields = [
    { owner = "Chunk", name = "sections", symbol = "i" },
]
"#;

    #[test]
    fn test_parse_config() {
        let config = ShimConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.disabled,
            RepresentationSet::CHUNK_MAP | RepresentationSet::UNLOAD_QUEUE
        );
        let layout = config.layout_for("v1_5_0").unwrap();
        assert_eq!(layout.symbol("Chunk", "sections"), Some("i"));
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = ShimConfig::from_toml_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert!(config.disabled.is_empty());
        assert_eq!(config.layout_for("v1_4_5").unwrap(), HostLayout::v1_4_5());
    }

    #[test]
    fn test_config_layout_wins_over_builtin() {
        let mut config = ShimConfig::default();
        config
            .layouts
            .push(HostLayout::new("v1_4_5").map("Chunk", "sections", "renamed"));
        let layout = config.layout_for("v1_4_5").unwrap();
        assert_eq!(layout.symbol("Chunk", "sections"), Some("renamed"));
    }

    #[test]
    fn test_version_override_and_unknown() {
        let config = ShimConfig {
            host_version: Some("v1_4_5".to_string()),
            ..ShimConfig::default()
        };
        assert!(config.layout_for("v9").is_ok());
        assert!(matches!(
            ShimConfig::default().layout_for("v9"),
            Err(ConfigError::UnknownHostVersion(v)) if v == "v9"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = ShimConfig::load(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");

        let missing = file.path().with_extension("missing");
        let config = ShimConfig::load_or_default(&missing).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            ShimConfig::from_toml_str("log_level = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
