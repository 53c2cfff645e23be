use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reference::Dataset;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub back_office: BackOfficeConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackOfficeConfig {
  pub url: String,
  pub username: String,
  /// Request timeout; a timed out fetch fails rather than caching nothing
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  30
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
  /// SQLite file shared by every process on the host
  #[default]
  Sqlite,
  /// Per-process memory
  Memory,
  /// No caching: every lookup fetches from the back office
  None,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  #[serde(default)]
  pub backend: StorageBackend,
  /// SQLite database path (defaults to the user data directory)
  pub path: Option<PathBuf>,
  /// Storage-level expiry for cached namespaces
  pub ttl_minutes: Option<u64>,
}

impl CacheConfig {
  pub fn ttl(&self) -> Option<Duration> {
    self.ttl_minutes.map(from_minutes)
  }
}

/// Background refresh periods in minutes. Zero disables a dataset's refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
  pub system_parameter: u64,
  pub reference_value: u64,
  pub pws_text: u64,
  pub system_notice: u64,
  pub tax_relief_type: u64,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      system_parameter: 60,
      reference_value: 15,
      pws_text: 60,
      system_notice: 15,
      tax_relief_type: 60,
    }
  }
}

impl RefreshConfig {
  pub fn minutes(&self, dataset: Dataset) -> u64 {
    match dataset {
      Dataset::SystemParameter => self.system_parameter,
      Dataset::ReferenceValue => self.reference_value,
      Dataset::PwsText => self.pws_text,
      Dataset::SystemNotice => self.system_notice,
      Dataset::TaxReliefType => self.tax_relief_type,
    }
  }

  /// Datasets with a refresh period, paired with that period.
  pub fn schedule(&self) -> Vec<(Dataset, Duration)> {
    Dataset::ALL
      .iter()
      .filter_map(|&dataset| match self.minutes(dataset) {
        0 => None,
        period => Some((dataset, from_minutes(period))),
      })
      .collect()
  }
}

/// Longest accepted TTL or refresh period: ten years.
const MAX_MINUTES: u64 = 10 * 366 * 24 * 60;

fn from_minutes(minutes: u64) -> Duration {
  Duration::from_secs(minutes.saturating_mul(60))
}

/// Config files tried, in order, when no path is given.
fn default_locations() -> Vec<PathBuf> {
  let mut paths = vec![PathBuf::from("refdata.yaml")];
  paths.extend(dirs::config_dir().map(|dir| dir.join("refdata").join("config.yaml")));
  paths
}

impl Config {
  /// Load configuration from `explicit_path`, or else from the first of
  /// `./refdata.yaml` and `$XDG_CONFIG_HOME/refdata/config.yaml` that exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = match explicit_path {
      Some(path) if !path.exists() => {
        return Err(eyre!("Config file not found: {}", path.display()));
      }
      Some(path) => path.to_path_buf(),
      None => default_locations()
        .into_iter()
        .find(|path| path.exists())
        .ok_or_else(|| {
          eyre!(
            "No configuration file found. Create ./refdata.yaml or ~/.config/refdata/config.yaml"
          )
        })?,
    };

    let contents = std::fs::read_to_string(&path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
    Self::from_yaml(&contents).map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  /// Parse a YAML document and check its periods.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if let Some(ttl) = config.cache.ttl_minutes {
      check_minutes("cache.ttl_minutes", ttl)?;
    }
    for dataset in Dataset::ALL {
      let field = format!("refresh period for {}", dataset);
      check_minutes(&field, config.refresh.minutes(dataset))?;
    }
    Ok(config)
  }

  /// Get the back office password from environment variables.
  ///
  /// Checks REFDATA_BACK_OFFICE_PASSWORD first, then BACK_OFFICE_PASSWORD as fallback.
  pub fn get_back_office_password() -> Result<String> {
    std::env::var("REFDATA_BACK_OFFICE_PASSWORD")
      .or_else(|_| std::env::var("BACK_OFFICE_PASSWORD"))
      .map_err(|_| {
        eyre!(
          "Back office password not found. \
           Set REFDATA_BACK_OFFICE_PASSWORD or BACK_OFFICE_PASSWORD."
        )
      })
  }
}

fn check_minutes(field: &str, value: u64) -> Result<()> {
  if value > MAX_MINUTES {
    return Err(eyre!(
      "{} of {} minutes exceeds the maximum of {}",
      field,
      value,
      MAX_MINUTES
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml(
      r#"
back_office:
  url: https://bo.example.org/refdata
  username: portal
"#,
    )
    .unwrap();

    assert_eq!(config.back_office.timeout_secs, 30);
    assert_eq!(config.cache.backend, StorageBackend::Sqlite);
    assert_eq!(config.cache.ttl(), None);
    assert_eq!(config.refresh.minutes(Dataset::ReferenceValue), 15);
    assert_eq!(config.refresh.minutes(Dataset::SystemParameter), 60);
  }

  #[test]
  fn test_full_config() {
    let config = Config::from_yaml(
      r#"
back_office:
  url: https://bo.example.org/refdata
  username: portal
  timeout_secs: 10
cache:
  backend: memory
  ttl_minutes: 240
refresh:
  reference_value: 5
  pws_text: 0
"#,
    )
    .unwrap();

    assert_eq!(config.back_office.timeout_secs, 10);
    assert_eq!(config.cache.backend, StorageBackend::Memory);
    assert_eq!(config.cache.ttl(), Some(Duration::from_secs(240 * 60)));
    assert_eq!(config.refresh.minutes(Dataset::ReferenceValue), 5);
    // Unset periods keep their defaults
    assert_eq!(config.refresh.minutes(Dataset::SystemNotice), 15);
  }

  #[test]
  fn test_zero_period_is_left_out_of_schedule() {
    let refresh = RefreshConfig {
      pws_text: 0,
      ..RefreshConfig::default()
    };

    let schedule = refresh.schedule();
    assert_eq!(schedule.len(), Dataset::ALL.len() - 1);
    assert!(!schedule.iter().any(|(d, _)| *d == Dataset::PwsText));
  }

  #[test]
  fn test_unknown_backend_is_rejected() {
    let result = Config::from_yaml(
      r#"
back_office:
  url: https://bo.example.org
  username: portal
cache:
  backend: redis
"#,
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_oversized_periods_are_rejected() {
    let base = "back_office:\n  url: https://bo.example.org\n  username: portal\n";

    let ttl = Config::from_yaml(&format!("{}cache:\n  ttl_minutes: {}\n", base, u64::MAX));
    assert!(ttl.is_err());

    let refresh =
      Config::from_yaml(&format!("{}refresh:\n  pws_text: {}\n", base, u64::MAX / 2));
    let message = refresh.unwrap_err().to_string();
    assert!(message.contains("PwsText"), "{}", message);

    let fine = Config::from_yaml(&format!("{}cache:\n  ttl_minutes: 525600\n", base)).unwrap();
    assert_eq!(fine.cache.ttl(), Some(Duration::from_secs(525_600 * 60)));
  }
}
