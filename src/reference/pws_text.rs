use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::back_office::{ApiPwsText, BackOffice};
use crate::cache::{CacheKey, CachedRecord, SourceAdapter};
use crate::error::Result;

/// Editable page content. One text per key, so entries are stored unwrapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PwsText {
  pub key: CacheKey,
  pub page_title: String,
  pub html_text: String,
}

impl CachedRecord for PwsText {
  fn namespace() -> &'static str {
    "PwsText"
  }

  fn cache_key(&self) -> CacheKey {
    self.key.clone()
  }

  fn code(&self) -> Option<&str> {
    None
  }

  fn sort_key(&self) -> String {
    self.page_title.clone()
  }
}

pub struct PwsTextSource<B> {
  back_office: Arc<B>,
}

impl<B: BackOffice> PwsTextSource<B> {
  pub fn new(back_office: Arc<B>) -> Self {
    Self { back_office }
  }
}

impl<B: BackOffice> SourceAdapter for PwsTextSource<B> {
  type Record = PwsText;
  type Raw = ApiPwsText;

  async fn fetch_raw(&self) -> Result<Vec<ApiPwsText>> {
    self
      .back_office
      .fetch_rows(PwsText::namespace(), "get_pws_texts")
      .await
  }

  fn transform(&self, raw: ApiPwsText) -> Result<PwsText> {
    Ok(PwsText {
      key: raw.key.into(),
      page_title: raw.page_title.trim().to_string(),
      html_text: raw.html_text,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{fetch_namespace, CacheEntry};
  use crate::test_support::StaticBackOffice;
  use serde_json::json;

  #[tokio::test]
  async fn test_texts_are_stored_as_single_entries() {
    let source = PwsTextSource::new(Arc::new(StaticBackOffice::new().with_rows(
      "get_pws_texts",
      json!([
        {"domain_code": "HOME", "service_code": "PWS", "workplace_code": "RSTU",
         "page_title": " Welcome ", "html_text": "<p>Hello</p>"},
        {"domain_code": "LBTT", "service_code": "PWS", "workplace_code": "RSTU",
         "html_text": "<p>Land and buildings</p>"}
      ]),
    )));

    let data = fetch_namespace(&source).await.unwrap();

    match &data[&CacheKey::new("HOME", "PWS", "RSTU")] {
      CacheEntry::Single(text) => {
        assert_eq!(text.page_title, "Welcome");
        assert_eq!(text.html_text, "<p>Hello</p>");
      }
      other => panic!("expected single entry, got {:?}", other),
    }

    let lbtt = data[&CacheKey::new("LBTT", "PWS", "RSTU")].single().unwrap();
    assert_eq!(lbtt.page_title, "");
  }
}
