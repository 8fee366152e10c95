//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pricing::PricePolicy;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scanning settings
    #[serde(default)]
    pub scan: ScanConfig,
    /// Fuzzy-matching settings
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Price lookup settings
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Scan input/output locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Folder of images to scan
    pub input_dir: Option<PathBuf>,
    /// Folder receiving renamed copies, reports, and logs
    pub output_dir: Option<PathBuf>,
}

/// Fuzzy-matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum similarity (0-100) for accepting a reference-list match
    pub threshold: f32,
    /// Directory holding the reference name lists
    pub reference_dir: Option<PathBuf>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: crate::matcher::DEFAULT_THRESHOLD,
            reference_dir: None,
        }
    }
}

/// Price lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Aggregation policy for raw samples
    pub policy: PricePolicy,
    /// Seconds to wait between successive searches
    pub pacing_secs: u64,
    /// Maximum samples per query
    pub max_samples: usize,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            policy: PricePolicy::default(),
            pacing_secs: 2,
            max_samples: 10,
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to a TOML file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "cardscan", "CardScan")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::default();
        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.matching.threshold, config.matching.threshold);
        assert_eq!(loaded.pricing.pacing_secs, 2);
        assert_eq!(loaded.pricing.policy, PricePolicy::RobustMedian);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pricing]\npacing_secs = 5\nmax_samples = 10\npolicy = \"RobustMedian\"\n").unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.pricing.pacing_secs, 5);
    }
}
