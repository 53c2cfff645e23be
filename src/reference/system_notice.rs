use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::back_office::{
  parse_date, parse_indicator, scalar_to_string, ApiSystemNotice, BackOffice,
};
use crate::cache::{CacheKey, CachedRecord, SourceAdapter};
use crate::error::{RefDataError, Result};

/// A banner message shown on portal pages between two dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemNotice {
  pub key: CacheKey,
  pub code: String,
  pub title: String,
  pub html_text: String,
  pub show_from: Option<NaiveDate>,
  pub show_till: Option<NaiveDate>,
  /// Withdrawn notices stay in the back office marked complete
  pub complete: bool,
}

impl SystemNotice {
  /// Whether the notice should be displayed on `date`. Open-ended bounds always match.
  pub fn is_visible_on(&self, date: NaiveDate) -> bool {
    !self.complete
      && self.show_from.map_or(true, |from| from <= date)
      && self.show_till.map_or(true, |till| date <= till)
  }
}

impl CachedRecord for SystemNotice {
  fn namespace() -> &'static str {
    "SystemNotice"
  }

  fn cache_key(&self) -> CacheKey {
    self.key.clone()
  }

  fn code(&self) -> Option<&str> {
    Some(&self.code)
  }

  fn sort_key(&self) -> String {
    let from = self
      .show_from
      .map(|d| d.format("%Y-%m-%d").to_string())
      .unwrap_or_default();
    format!("{}|{}", from, self.code)
  }
}

pub struct SystemNoticeSource<B> {
  back_office: Arc<B>,
}

impl<B: BackOffice> SystemNoticeSource<B> {
  pub fn new(back_office: Arc<B>) -> Self {
    Self { back_office }
  }
}

impl<B: BackOffice> SourceAdapter for SystemNoticeSource<B> {
  type Record = SystemNotice;
  type Raw = ApiSystemNotice;

  // Notices are optional banners; one bad row must not hide the others
  const SKIP_INVALID_ROWS: bool = true;

  async fn fetch_raw(&self) -> Result<Vec<ApiSystemNotice>> {
    self
      .back_office
      .fetch_rows(SystemNotice::namespace(), "get_system_notices")
      .await
  }

  fn transform(&self, raw: ApiSystemNotice) -> Result<SystemNotice> {
    let code = scalar_to_string(&raw.notice_id).ok_or_else(|| {
      RefDataError::source_fetch(SystemNotice::namespace(), "notice without an id")
    })?;

    let date = |value: Option<&str>| {
      parse_date(value).map_err(|e| {
        RefDataError::source_fetch(
          SystemNotice::namespace(),
          format!("notice {} has a bad date: {}", code, e),
        )
      })
    };
    let show_from = date(raw.show_from.as_deref())?;
    let show_till = date(raw.show_till.as_deref())?;

    Ok(SystemNotice {
      key: raw.key.into(),
      code,
      title: raw.title,
      html_text: raw.html_text,
      show_from,
      show_till,
      complete: parse_indicator(raw.complete_ind.as_deref()),
    })
  }
}
