use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A selectable metric: display name plus the CSV locator
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MetricSource {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center_lon: -96.0,
            center_lat: 37.8,
            zoom: 4.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub file: PathBuf,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("tui-choropleth.log"),
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// GeoJSON region boundaries
    pub boundaries: String,
    /// Wide frequency-distribution CSV
    pub frequency: String,
    pub metrics: Vec<MetricSource>,
    pub view: ViewConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            boundaries: "data/us-states.json".to_string(),
            frequency: "data/Frequency_Distribution.csv".to_string(),
            metrics: vec![MetricSource {
                name: "Sample Size".to_string(),
                file: "data/Sample Size.csv".to_string(),
            }],
            view: ViewConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Invalid TOML configuration")?;
        anyhow::ensure!(!config.metrics.is_empty(), "at least one [[metrics]] entry is required");
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it is absent and optional
    pub fn load_or_default(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_data_layout() {
        let config = AppConfig::default();
        assert_eq!(config.boundaries, "data/us-states.json");
        assert_eq!(config.frequency, "data/Frequency_Distribution.csv");
        assert_eq!(config.metrics[0].name, "Sample Size");
        assert_eq!(config.metrics[0].file, "data/Sample Size.csv");
        assert_eq!(config.view.center_lon, -96.0);
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::parse(
            r#"
            boundaries = "https://example.org/states.json"

            [[metrics]]
            name = "Population"
            file = "data/pop.csv"

            [[metrics]]
            name = "Income"
            file = "data/income.csv"

            [view]
            zoom = 6.5
            "#,
        )
        .unwrap();

        assert_eq!(config.boundaries, "https://example.org/states.json");
        assert_eq!(config.frequency, "data/Frequency_Distribution.csv");
        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.metrics[1].name, "Income");
        assert_eq!(config.view.zoom, 6.5);
        assert_eq!(config.view.center_lat, 37.8);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_empty_metric_list_rejected() {
        assert!(AppConfig::parse("metrics = []").is_err());
        assert!(AppConfig::parse("boundaries = 3").is_err());
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("choropleth.toml");
        let config = AppConfig::load_or_default(&path, false).unwrap();
        assert_eq!(config.metrics.len(), 1);
        assert!(AppConfig::load_or_default(&path, true).is_err());
    }
}
