//! Serde types matching back office reference data responses.
//!
//! These types are separate from the cached record types so that field
//! renames, loose typing and defaulting stay at the edge.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheKey;

// ============================================================================
// Request / response envelope
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiRequest<'a> {
  pub operation: &'a str,
  pub username: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiRowsResponse<R> {
  pub success: bool,
  #[serde(default)]
  pub messages: Vec<ApiMessage>,
  #[serde(default = "Vec::new")]
  pub rows: Vec<R>,
}

impl<R> ApiRowsResponse<R> {
  /// Service messages joined for error reporting.
  pub fn message_text(&self) -> String {
    if self.messages.is_empty() {
      return "no message from service".to_string();
    }
    self
      .messages
      .iter()
      .map(|m| {
        if m.code.is_empty() {
          m.text.clone()
        } else {
          format!("{}: {}", m.code, m.text)
        }
      })
      .collect::<Vec<_>>()
      .join("; ")
  }
}

// ============================================================================
// Common nested field types
// ============================================================================

/// Key columns present on every reference data row.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyFields {
  #[serde(alias = "domain")]
  pub domain_code: String,
  #[serde(alias = "service")]
  pub service_code: String,
  #[serde(alias = "workplace")]
  pub workplace_code: String,
}

impl From<ApiKeyFields> for CacheKey {
  fn from(key: ApiKeyFields) -> Self {
    CacheKey::new(key.domain_code, key.service_code, key.workplace_code)
  }
}

// ============================================================================
// Rows per reference data kind
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiSystemParameter {
  #[serde(flatten)]
  pub key: ApiKeyFields,
  pub code: String,
  pub string_value: Option<Value>,
  pub text: Option<String>,
  pub description: Option<String>,
  pub sequence: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiReferenceValue {
  #[serde(flatten)]
  pub key: ApiKeyFields,
  pub code: String,
  #[serde(default)]
  pub value: String,
  pub sequence: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPwsText {
  #[serde(flatten)]
  pub key: ApiKeyFields,
  #[serde(default)]
  pub page_title: String,
  #[serde(default)]
  pub html_text: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSystemNotice {
  #[serde(flatten)]
  pub key: ApiKeyFields,
  pub notice_id: Value,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub html_text: String,
  pub show_from: Option<String>,
  pub show_till: Option<String>,
  pub complete_ind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTaxReliefType {
  #[serde(flatten)]
  pub key: ApiKeyFields,
  #[serde(alias = "relief_type")]
  pub code: String,
  #[serde(default)]
  pub description: String,
  pub sequence: Option<Value>,
}

// ============================================================================
// Coercion helpers
// ============================================================================

/// Render a scalar JSON value as a string. The back office is inconsistent
/// about quoting numbers.
pub fn scalar_to_string(value: &Value) -> Option<String> {
  match value {
    Value::Null => None,
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    Value::Array(_) | Value::Object(_) => None,
  }
}

/// Parse a `YYYY-MM-DD` date, ignoring any time part. Blank means no date.
pub fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, chrono::ParseError> {
  match value.map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => {
      let date_part = s.get(..10).unwrap_or(s);
      NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map(Some)
    }
  }
}

/// Back office Y/N indicator.
pub fn parse_indicator(value: Option<&str>) -> bool {
  value.is_some_and(|v| v.trim().eq_ignore_ascii_case("y"))
}
