//! Configuration file parsing for kestrel.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Listing defaults
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Listing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One disassembly line per instruction
    #[default]
    Text,
    /// One JSON object per instruction
    Json,
}

/// Listing configuration.
#[derive(Debug, Deserialize)]
pub struct ListingConfig {
    /// Parameter count of the listed function, receiver included
    #[serde(default = "default_parameter_count")]
    pub parameter_count: i32,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Print opcode frequencies after the listing
    #[serde(default)]
    pub stats: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            parameter_count: default_parameter_count(),
            format: OutputFormat::Text,
            stats: false,
        }
    }
}

fn default_parameter_count() -> i32 {
    1
}

/// Largest accepted parameter count (receiver included)
pub const MAX_PARAMETER_COUNT: i32 = u16::MAX as i32;

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        let count = self.listing.parameter_count;
        if !(0..=MAX_PARAMETER_COUNT).contains(&count) {
            anyhow::bail!(
                "listing.parameter_count must be between 0 and {MAX_PARAMETER_COUNT}, got {count}"
            );
        }
        Ok(())
    }
}

const CONFIG_NAMES: [&str; 2] = ["kestrel.toml", ".kestrelrc.toml"];

/// Load configuration from `path`, or from the nearest config file found
/// walking up from the working directory.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(path) if !path.exists() => {
            anyhow::bail!("Config file {} does not exist", path.display())
        }
        Some(path) => Some(path.to_path_buf()),
        None => nearest_config_file(),
    };

    let Some(path) = config_path else {
        return Ok(Config::default());
    };

    tracing::debug!("Loading config from {:?}", path);
    let content = std::fs::read_to_string(&path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

fn nearest_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    cwd.ancestors()
        .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listing.parameter_count, 1);
        assert_eq!(config.listing.format, OutputFormat::Text);
        assert!(!config.listing.stats);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[listing]
parameter_count = 3
format = "json"
stats = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.listing.parameter_count, 3);
        assert_eq!(config.listing.format, OutputFormat::Json);
        assert!(config.listing.stats);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[listing]\nstats = true\n").unwrap();
        assert_eq!(config.listing.parameter_count, 1);
        assert_eq!(config.listing.format, OutputFormat::Text);

        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.listing.parameter_count, 1);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(toml::from_str::<Config>("[listing]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_parameter_count_range() {
        let config: Config = toml::from_str("[listing]\nparameter_count = 2147483647\n").unwrap();
        assert!(config.validate().is_err());
        let config: Config = toml::from_str("[listing]\nparameter_count = -1\n").unwrap();
        assert!(config.validate().is_err());
        let config: Config = toml::from_str("[listing]\nparameter_count = 65535\n").unwrap();
        assert!(config.validate().is_ok());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_config_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("kestrel-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[listing]\nparameter_count = 2147483647\n").unwrap();
        let result = load_config(Some(&path));
        std::fs::remove_file(&path).unwrap();
        assert!(format!("{:#}", result.unwrap_err()).contains("parameter_count"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/kestrel.toml"))).is_err());
    }
}
