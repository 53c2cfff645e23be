//! Periodic background refresh of cached datasets.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::back_office::BackOffice;
use crate::reference::Dataset;
use crate::reference_data::ReferenceData;

/// Spawn one refresh task per scheduled dataset.
///
/// The first refresh happens one period after spawning; until then lookups
/// populate lazily. Failed refreshes are logged and retried on the next tick,
/// leaving the previously cached data in place.
pub fn spawn_refresh<B>(
  reference_data: Arc<ReferenceData<B>>,
  schedule: Vec<(Dataset, Duration)>,
) -> Vec<JoinHandle<()>>
where
  B: BackOffice + 'static,
{
  schedule
    .into_iter()
    .map(|(dataset, period)| {
      let reference_data = Arc::clone(&reference_data);
      tokio::spawn(async move { refresh_loop(reference_data, dataset, period).await })
    })
    .collect()
}

async fn refresh_loop<B: BackOffice>(
  reference_data: Arc<ReferenceData<B>>,
  dataset: Dataset,
  period: Duration,
) {
  let mut ticker = tokio::time::interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
  // interval fires immediately; skip it
  ticker.tick().await;

  info!(%dataset, period_secs = period.as_secs(), "scheduled refresh");
  loop {
    ticker.tick().await;
    match reference_data.refresh(dataset).await {
      Ok(keys) => info!(%dataset, keys, "refreshed"),
      Err(e) => error!(%dataset, error = %e, "scheduled refresh failed"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::test_support::StaticBackOffice;

  #[tokio::test]
  async fn test_scheduled_datasets_are_refreshed_repeatedly() {
    let back_office = Arc::new(StaticBackOffice::new());
    let reference_data = Arc::new(ReferenceData::new(
      Arc::clone(&back_office),
      CacheLayer::new(MemoryStorage::default()),
    ));

    let handles = spawn_refresh(
      reference_data,
      vec![(Dataset::SystemParameter, Duration::from_millis(20))],
    );
    tokio::time::sleep(Duration::from_millis(110)).await;
    for handle in &handles {
      handle.abort();
    }

    // Nothing fetched at spawn time, then one fetch per elapsed period
    assert!(back_office.calls() >= 2, "calls = {}", back_office.calls());
  }

  #[tokio::test]
  async fn test_failures_do_not_stop_the_loop() {
    let back_office = Arc::new(StaticBackOffice::new());
    back_office.set_failing(true);
    let reference_data = Arc::new(ReferenceData::new(
      Arc::clone(&back_office),
      CacheLayer::new(MemoryStorage::default()),
    ));

    let handles = spawn_refresh(
      reference_data,
      vec![(Dataset::ReferenceValue, Duration::from_millis(20))],
    );
    tokio::time::sleep(Duration::from_millis(110)).await;

    assert!(back_office.calls() >= 2);
    assert!(!handles[0].is_finished());
    handles[0].abort();
  }
}
