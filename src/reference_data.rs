//! Every reference data kind behind one shared cache layer.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use crate::back_office::{BackOffice, BackOfficeClient};
use crate::cache::{
  CacheLayer, CacheStorage, CachedLookup, MemoryStorage, NoopStorage, SqliteStorage,
};
use crate::config::{CacheConfig, Config, StorageBackend};
use crate::error::{RefDataError, Result};
use crate::reference::{
  Dataset, PwsTextSource, ReferenceValueSource, SystemNotice, SystemNoticeSource,
  SystemParameterSource, TaxReliefTypeSource,
};

/// Idle timeout used when the parameter cannot be read.
pub const DEFAULT_IDLE_MINUTES: u32 = 60;

const SESSION_PARAMETERS: (&str, &str, &str) = ("SYS", "SYS", "RSTU");
const MAX_IDLE_MINS: &str = "MAX_IDLE_MINS";

/// Reference data access for the portal.
///
/// Holds one [`CachedLookup`] per kind, all writing to the same storage.
pub struct ReferenceData<B: BackOffice> {
  pub system_parameters: CachedLookup<SystemParameterSource<B>>,
  pub reference_values: CachedLookup<ReferenceValueSource<B>>,
  pub pws_texts: CachedLookup<PwsTextSource<B>>,
  pub system_notices: CachedLookup<SystemNoticeSource<B>>,
  pub tax_relief_types: CachedLookup<TaxReliefTypeSource<B>>,
}

impl ReferenceData<BackOfficeClient> {
  /// Build from configuration: HTTP back office plus the configured storage.
  pub fn from_config(config: &Config) -> color_eyre::Result<Self> {
    let back_office = Arc::new(BackOfficeClient::new(&config.back_office)?);
    let cache = CacheLayer::from_shared(open_storage(&config.cache)?);
    Ok(Self::new(back_office, cache))
  }
}

impl<B: BackOffice> ReferenceData<B> {
  pub fn new(back_office: Arc<B>, cache: CacheLayer) -> Self {
    Self {
      system_parameters: CachedLookup::new(
        SystemParameterSource::new(Arc::clone(&back_office)),
        cache.clone(),
      ),
      reference_values: CachedLookup::new(
        ReferenceValueSource::new(Arc::clone(&back_office)),
        cache.clone(),
      ),
      pws_texts: CachedLookup::new(PwsTextSource::new(Arc::clone(&back_office)), cache.clone()),
      system_notices: CachedLookup::new(
        SystemNoticeSource::new(Arc::clone(&back_office)),
        cache.clone(),
      ),
      tax_relief_types: CachedLookup::new(TaxReliefTypeSource::new(back_office), cache),
    }
  }

  /// Re-fetch one dataset. Returns the number of keys now cached.
  pub async fn refresh(&self, dataset: Dataset) -> Result<usize> {
    let keys = match dataset {
      Dataset::SystemParameter => self.system_parameters.refresh().await?.len(),
      Dataset::ReferenceValue => self.reference_values.refresh().await?.len(),
      Dataset::PwsText => self.pws_texts.refresh().await?.len(),
      Dataset::SystemNotice => self.system_notices.refresh().await?.len(),
      Dataset::TaxReliefType => self.tax_relief_types.refresh().await?.len(),
    };
    Ok(keys)
  }

  /// Re-fetch several datasets concurrently. One failing does not stop the others.
  pub async fn refresh_many(&self, datasets: &[Dataset]) -> Vec<(Dataset, Result<usize>)> {
    let results =
      futures::future::join_all(datasets.iter().map(|&dataset| self.refresh(dataset))).await;
    datasets.iter().copied().zip(results).collect()
  }

  pub fn clear(&self, dataset: Dataset) -> Result<()> {
    match dataset {
      Dataset::SystemParameter => self.system_parameters.clear(),
      Dataset::ReferenceValue => self.reference_values.clear(),
      Dataset::PwsText => self.pws_texts.clear(),
      Dataset::SystemNotice => self.system_notices.clear(),
      Dataset::TaxReliefType => self.tax_relief_types.clear(),
    }
  }

  /// Session idle timeout in minutes.
  ///
  /// Falls back to [`DEFAULT_IDLE_MINUTES`] on any failure so a back office
  /// outage cannot take sessions down with it.
  pub async fn session_idle_minutes(&self) -> u32 {
    let (domain, service, workplace) = SESSION_PARAMETERS;
    let result = self
      .system_parameters
      .lookup_code(domain, service, workplace, MAX_IDLE_MINS)
      .await;

    match result {
      Ok(param) => param.parse_value().unwrap_or_else(|| {
        warn!(value = %param.value, "unparseable {}, using default", MAX_IDLE_MINS);
        DEFAULT_IDLE_MINUTES
      }),
      Err(e) => {
        warn!(error = %e, "could not read {}, using default", MAX_IDLE_MINS);
        DEFAULT_IDLE_MINUTES
      }
    }
  }

  /// Notices to display on `date` for a key, oldest first. Missing notices are not an error.
  pub async fn current_notices(
    &self,
    domain: &str,
    service: &str,
    workplace: &str,
    date: NaiveDate,
  ) -> Result<Vec<SystemNotice>> {
    let notices = self.system_notices.safe_list(domain, service, workplace).await?;
    Ok(
      notices
        .into_iter()
        .filter(|n| n.is_visible_on(date))
        .collect(),
    )
  }
}

/// Longest storage TTL accepted from configuration.
const MAX_TTL: std::time::Duration = std::time::Duration::from_secs(100 * 366 * 24 * 60 * 60);

/// Open the storage backend named in configuration.
pub fn open_storage(config: &CacheConfig) -> Result<Arc<dyn CacheStorage>> {
  let ttl = config.ttl();
  if let Some(ttl) = ttl.filter(|ttl| *ttl > MAX_TTL) {
    return Err(RefDataError::Storage(format!(
      "cache ttl of {}s exceeds the maximum of {}s",
      ttl.as_secs(),
      MAX_TTL.as_secs()
    )));
  }

  let storage: Arc<dyn CacheStorage> = match config.backend {
    StorageBackend::Sqlite => {
      let path = match &config.path {
        Some(path) => path.clone(),
        None => SqliteStorage::default_path()?,
      };
      let mut storage = SqliteStorage::open(&path)?;
      if let Some(ttl) = ttl {
        let ttl = chrono::Duration::from_std(ttl)
          .map_err(|e| RefDataError::Storage(format!("cache ttl out of range: {}", e)))?;
        storage = storage.with_ttl(ttl);
      }
      info!(path = %path.display(), "using sqlite cache storage");
      Arc::new(storage)
    }
    StorageBackend::Memory => Arc::new(MemoryStorage::new(ttl)),
    StorageBackend::None => Arc::new(NoopStorage),
  };
  Ok(storage)
}
