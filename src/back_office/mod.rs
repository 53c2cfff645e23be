//! The back office: authoritative source of reference data.

mod api_types;
mod client;

use serde::de::DeserializeOwned;
use std::future::Future;

pub use api_types::{
  parse_date, parse_indicator, scalar_to_string, ApiKeyFields, ApiPwsText, ApiReferenceValue,
  ApiSystemNotice, ApiSystemParameter, ApiTaxReliefType,
};
pub use client::BackOfficeClient;

use crate::error::Result;

/// A request/response source of flat reference data rows.
///
/// Implementations must report transport and service failures as errors so
/// that an outage is never mistaken for an empty result.
pub trait BackOffice: Send + Sync {
  /// Fetch every row returned by `operation`, on behalf of `namespace`.
  fn fetch_rows<R: DeserializeOwned + Send>(
    &self,
    namespace: &'static str,
    operation: &'static str,
  ) -> impl Future<Output = Result<Vec<R>>> + Send;
}
