use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::back_office::{scalar_to_string, ApiReferenceValue, BackOffice};
use crate::cache::{
  build_views, group_records, merge_synthetic, padded_sequence, CacheKey, CachedRecord,
  DerivedView, NamespaceData, SourceAdapter,
};
use crate::error::Result;

/// Combined list of all waste codes for landfill returns.
const EWC_LIST: (&str, &str, &str) = ("EWC_LIST", "SLFT", "RSTU");
const EWC_HAZARDOUS: (&str, &str, &str) = ("EWC_HAZARDOUS", "SLFT", "RSTU");
const EWC_NON_HAZARDOUS: (&str, &str, &str) = ("EWC_NON_HAZARDOUS", "SLFT", "RSTU");

/// Sort options offered on return listings.
const RETURN_SORT_ORDER: (&str, &str, &str) = ("RETURN_SORT_ORDER", "SYS", "RSTU");

/// One option of a coded value list (e.g. a dropdown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceValue {
  pub key: CacheKey,
  pub code: String,
  pub value: String,
  pub sequence: Option<String>,
}

impl ReferenceValue {
  pub fn new(key: CacheKey, code: &str, value: &str, sequence: Option<&str>) -> Self {
    Self {
      key,
      code: code.to_string(),
      value: value.to_string(),
      sequence: sequence.map(String::from),
    }
  }
}

impl CachedRecord for ReferenceValue {
  fn namespace() -> &'static str {
    "ReferenceValue"
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
      None => self.value.clone(),
    }
  }
}

fn key((domain, service, workplace): (&str, &str, &str)) -> CacheKey {
  CacheKey::new(domain, service, workplace)
}

/// Waste codes are shown with their code in front and ordered by it.
fn waste_code_option(value: &ReferenceValue, target: &CacheKey) -> ReferenceValue {
  ReferenceValue {
    key: target.clone(),
    code: value.code.clone(),
    value: format!("{} - {}", value.code, value.value),
    sequence: None,
  }
}

pub struct ReferenceValueSource<B> {
  back_office: Arc<B>,
  constants: Vec<ReferenceValue>,
  views: Vec<DerivedView<ReferenceValue>>,
}

impl<B: BackOffice> ReferenceValueSource<B> {
  /// Source with the portal's own option lists and derived views.
  pub fn new(back_office: Arc<B>) -> Self {
    let sort_order = key(RETURN_SORT_ORDER);
    let constants = vec![
      ReferenceValue::new(sort_order.clone(), "MOST_RECENT", "Most recent first", Some("1")),
      ReferenceValue::new(sort_order.clone(), "OLDEST", "Oldest first", Some("2")),
      ReferenceValue::new(sort_order, "REFERENCE", "Return reference", Some("3")),
    ];

    let views = vec![DerivedView::new(
      key(EWC_LIST),
      vec![key(EWC_HAZARDOUS), key(EWC_NON_HAZARDOUS)],
      waste_code_option,
    )];

    Self::with_synthetic(back_office, constants, views)
  }

  pub fn with_synthetic(
    back_office: Arc<B>,
    constants: Vec<ReferenceValue>,
    views: Vec<DerivedView<ReferenceValue>>,
  ) -> Self {
    Self {
      back_office,
      constants,
      views,
    }
  }
}

impl<B: BackOffice> SourceAdapter for ReferenceValueSource<B> {
  type Record = ReferenceValue;
  type Raw = ApiReferenceValue;

  async fn fetch_raw(&self) -> Result<Vec<ApiReferenceValue>> {
    self
      .back_office
      .fetch_rows(ReferenceValue::namespace(), "get_reference_values")
      .await
  }

  fn transform(&self, raw: ApiReferenceValue) -> Result<ReferenceValue> {
    Ok(ReferenceValue {
      key: raw.key.into(),
      code: raw.code,
      value: raw.value,
      sequence: raw
        .sequence
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|s| !s.trim().is_empty()),
    })
  }

  fn synthetic_records(
    &self,
    fetched: &NamespaceData<ReferenceValue>,
  ) -> NamespaceData<ReferenceValue> {
    let mut synthetic = group_records(self.constants.clone());
    merge_synthetic(&mut synthetic, build_views(&self.views, fetched));
    synthetic
  }
}
