use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::back_office::{scalar_to_string, ApiSystemParameter, BackOffice};
use crate::cache::{padded_sequence, CacheKey, CachedRecord, SourceAdapter};
use crate::error::Result;

/// A named configuration value, e.g. `MAX_IDLE_MINS` under `SYS/SYS/RSTU`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemParameter {
  pub key: CacheKey,
  pub code: String,
  pub value: String,
  /// Long-form text, used by parameters that hold page copy rather than a setting
  pub text: Option<String>,
  pub description: Option<String>,
  pub sequence: Option<String>,
}

impl SystemParameter {
  /// The value parsed as `T`, or None if it does not parse.
  pub fn parse_value<T: FromStr>(&self) -> Option<T> {
    self.value.trim().parse().ok()
  }
}

impl CachedRecord for SystemParameter {
  fn namespace() -> &'static str {
    "SystemParameter"
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
      None => self.code.clone(),
    }
  }
}

pub struct SystemParameterSource<B> {
  back_office: Arc<B>,
}

impl<B: BackOffice> SystemParameterSource<B> {
  pub fn new(back_office: Arc<B>) -> Self {
    Self { back_office }
  }
}

impl<B: BackOffice> SourceAdapter for SystemParameterSource<B> {
  type Record = SystemParameter;
  type Raw = ApiSystemParameter;

  async fn fetch_raw(&self) -> Result<Vec<ApiSystemParameter>> {
    self
      .back_office
      .fetch_rows(SystemParameter::namespace(), "get_system_parameters")
      .await
  }

  fn transform(&self, raw: ApiSystemParameter) -> Result<SystemParameter> {
    Ok(SystemParameter {
      key: raw.key.into(),
      code: raw.code,
      value: raw
        .string_value
        .as_ref()
        .and_then(scalar_to_string)
        .unwrap_or_default(),
      text: raw.text.filter(|t| !t.trim().is_empty()),
      description: raw.description.filter(|d| !d.trim().is_empty()),
      sequence: raw
        .sequence
        .as_ref()
        .and_then(scalar_to_string)
        .filter(|s| !s.trim().is_empty()),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{fetch_namespace, CacheEntry, CacheLayer, CachedLookup, MemoryStorage};
  use crate::test_support::StaticBackOffice;
  use serde_json::json;

  fn source(rows: serde_json::Value) -> SystemParameterSource<StaticBackOffice> {
    SystemParameterSource::new(Arc::new(
      StaticBackOffice::new().with_rows("get_system_parameters", rows),
    ))
  }

  #[tokio::test]
  async fn test_rows_become_coded_parameters() {
    let source = source(json!([
      {"domain": "SYS", "service": "SYS", "workplace": "RSTU",
       "code": "MAX_IDLE_MINS", "string_value": "60"},
      {"domain_code": "SYS", "service_code": "SYS", "workplace_code": "RSTU",
       "code": "WARN_MINS", "string_value": 5, "description": "  "}
    ]));

    let data = fetch_namespace(&source).await.unwrap();
    let entry = &data[&CacheKey::new("SYS", "SYS", "RSTU")];

    let idle = entry.get("MAX_IDLE_MINS").unwrap();
    assert_eq!(idle.value, "60");
    assert_eq!(idle.parse_value::<u32>(), Some(60));

    let warn = entry.get("WARN_MINS").unwrap();
    assert_eq!(warn.value, "5");
    assert_eq!(warn.description, None);
    assert!(matches!(entry, CacheEntry::Coded(_)));
  }

  #[test]
  fn test_parse_value_rejects_garbage() {
    let param = SystemParameter {
      key: CacheKey::new("SYS", "SYS", "RSTU"),
      code: "MAX_IDLE_MINS".to_string(),
      value: "sixty".to_string(),
      text: None,
      description: None,
      sequence: None,
    };
    assert_eq!(param.parse_value::<u32>(), None);
  }

  #[tokio::test]
  async fn test_list_orders_by_numeric_sequence() {
    let params = CachedLookup::new(
      source(json!([
        {"domain_code": "PWS", "service_code": "SYS", "workplace_code": "RSTU",
         "code": "A", "string_value": "a", "sequence": "2"},
        {"domain_code": "PWS", "service_code": "SYS", "workplace_code": "RSTU",
         "code": "B", "string_value": "b", "sequence": 10},
        {"domain_code": "PWS", "service_code": "SYS", "workplace_code": "RSTU",
         "code": "C", "string_value": "c", "sequence": "1", "text": "<p>Intro</p>"}
      ])),
      CacheLayer::new(MemoryStorage::default()),
    );

    let listed = params.list("PWS", "SYS", "RSTU").await.unwrap();
    let codes: Vec<&str> = listed.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["C", "A", "B"]);
    assert_eq!(listed[0].text.as_deref(), Some("<p>Intro</p>"));
    assert_eq!(listed[2].sequence.as_deref(), Some("10"));
  }

  #[tokio::test]
  async fn test_unsequenced_parameters_sort_by_code() {
    let data = fetch_namespace(&source(json!([
      {"domain_code": "SYS", "service_code": "SYS", "workplace_code": "RSTU",
       "code": "WARN_MINS"},
      {"domain_code": "SYS", "service_code": "SYS", "workplace_code": "RSTU",
       "code": "MAX_IDLE_MINS"}
    ])))
    .await
    .unwrap();

    let codes: Vec<String> = data[&CacheKey::new("SYS", "SYS", "RSTU")]
      .clone()
      .into_sorted()
      .into_iter()
      .map(|p| p.code)
      .collect();
    assert_eq!(codes, vec!["MAX_IDLE_MINS", "WARN_MINS"]);
  }
}
