use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::back_office::{scalar_to_string, ApiTaxReliefType, BackOffice};
use crate::cache::{padded_sequence, CacheKey, CachedRecord, SourceAdapter};
use crate::error::Result;

/// A relief that can be claimed on a return, keyed by tax and return type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxReliefType {
  pub key: CacheKey,
  pub code: String,
  pub description: String,
  pub sequence: Option<String>,
}

impl CachedRecord for TaxReliefType {
  fn namespace() -> &'static str {
    "TaxReliefType"
  }

  fn cache_key(&self) -> CacheKey {
    self.key.clone()
  }

  fn code(&self) -> Option<&str> {
    Some(&self.code)
  }

  fn sort_key(&self) -> String {
    match &self.sequence {
      Some(sequence) => padded_sequence(sequence),
      None => self.description.to_lowercase(),
    }
  }
}

pub struct TaxReliefTypeSource<B> {
  back_office: Arc<B>,
}

impl<B: BackOffice> TaxReliefTypeSource<B> {
  pub fn new(back_office: Arc<B>) -> Self {
    Self { back_office }
  }
}

impl<B: BackOffice> SourceAdapter for TaxReliefTypeSource<B> {
  type Record = TaxReliefType;
  type Raw = ApiTaxReliefType;

  async fn fetch_raw(&self) -> Result<Vec<ApiTaxReliefType>> {
    self
      .back_office
      .fetch_rows(TaxReliefType::namespace(), "get_tax_relief_types")
      .await
  }

  fn transform(&self, raw: ApiTaxReliefType) -> Result<TaxReliefType> {
    Ok(TaxReliefType {
      key: raw.key.into(),
      code: raw.code,
      description: raw.description,
      sequence: raw
        .sequence
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|s| !s.trim().is_empty()),
    })
  }
}
