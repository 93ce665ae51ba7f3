use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Text encoding of the source dataset.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// ISO-8859-1. Every byte maps to one char, so decoding never fails.
    #[default]
    Latin1,
    Utf8,
}

/// Options understood by the dataset loader.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    pub encoding: Encoding,
    pub delimiter: char,
    /// A chrono format string tried instead of the built-in list.
    pub date_format: Option<String>,
    /// Abort the whole load on the first malformed row instead of skipping it.
    pub strict: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            encoding: Encoding::Latin1,
            delimiter: ',',
            date_format: None,
            strict: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub store_name: String,
    /// Dataset used when no file is supplied on the command line.
    pub default_source_path: String,
    #[serde(flatten)]
    pub loader: LoaderConfig,
    pub top_countries: usize,
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store_name: "DeJa Vu Stores".to_string(),
            default_source_path: "data/dataonline.csv".to_string(),
            loader: LoaderConfig::default(),
            top_countries: 5,
            preview_rows: 5,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "dejavu", "dejavu")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
store_name: "Corner Shop"
default_source_path: "/srv/data/online_retail.csv"
encoding: utf8
delimiter: ";"
date_format: "%d.%m.%Y %H:%M"
strict: true
top_countries: 3
preview_rows: 10
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.store_name, "Corner Shop");
        assert_eq!(config.default_source_path, "/srv/data/online_retail.csv");
        assert_eq!(config.loader.encoding, Encoding::Utf8);
        assert_eq!(config.loader.delimiter, ';');
        assert_eq!(config.loader.date_format.as_deref(), Some("%d.%m.%Y %H:%M"));
        assert!(config.loader.strict);
        assert_eq!(config.top_countries, 3);
        assert_eq!(config.preview_rows, 10);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AppConfig =
            serde_yaml::from_str("default_source_path: \"sales.csv\"\n").unwrap();
        assert_eq!(config.default_source_path, "sales.csv");
        assert_eq!(config.store_name, "DeJa Vu Stores");
        assert_eq!(config.loader, LoaderConfig::default());
        assert_eq!(config.top_countries, 5);
    }

    #[test]
    fn test_unknown_encoding_is_rejected() {
        let result: std::result::Result<AppConfig, _> = serde_yaml::from_str("encoding: ebcdic\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yaml");
        fs::write(&path, "top_countries: 8\nstrict: true\n")?;

        let config = AppConfig::load_from_path(&path)?;
        assert_eq!(config.top_countries, 8);
        assert!(config.loader.strict);

        let missing = AppConfig::load_from_path(dir.path().join("nope.yaml"));
        assert!(missing.unwrap_err().to_string().contains("Failed to read config file"));
        Ok(())
    }
}
