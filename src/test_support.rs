//! Shared test doubles.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::back_office::BackOffice;
use crate::cache::{
  group_records, padded_sequence, CacheKey, CachedRecord, NamespaceData, SourceAdapter,
};
use crate::error::{RefDataError, Result};

/// Coded record keyed under `(domain, SYS, RSTU)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
  pub domain: String,
  pub code: String,
  pub value: String,
  pub sequence: String,
}

impl Param {
  pub fn new(domain: &str, code: &str, value: &str, sequence: &str) -> Self {
    Self {
      domain: domain.to_string(),
      code: code.to_string(),
      value: value.to_string(),
      sequence: sequence.to_string(),
    }
  }
}

impl CachedRecord for Param {
  fn namespace() -> &'static str {
    "Param"
  }

  fn cache_key(&self) -> CacheKey {
    CacheKey::new(&self.domain, "SYS", "RSTU")
  }

  fn code(&self) -> Option<&str> {
    Some(&self.code)
  }

  fn sort_key(&self) -> String {
    padded_sequence(&self.sequence)
  }
}

/// Codeless record, one per page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
  pub page: String,
  pub title: String,
}

impl Text {
  pub fn new(page: &str, title: &str) -> Self {
    Self {
      page: page.to_string(),
      title: title.to_string(),
    }
  }
}

impl CachedRecord for Text {
  fn namespace() -> &'static str {
    "Text"
  }

  fn cache_key(&self) -> CacheKey {
    CacheKey::new(&self.page, "PWS", "RSTU")
  }

  fn code(&self) -> Option<&str> {
    None
  }

  fn sort_key(&self) -> String {
    self.title.clone()
  }
}

/// Adapter serving fixed [`Param`] rows and counting fetches.
pub struct CountingAdapter {
  rows: Mutex<Vec<Param>>,
  synthetic: Vec<Param>,
  failing: AtomicBool,
  calls: AtomicUsize,
  delay: Option<Duration>,
}

impl CountingAdapter {
  pub fn new(rows: Vec<Param>) -> Self {
    Self {
      rows: Mutex::new(rows),
      synthetic: Vec::new(),
      failing: AtomicBool::new(false),
      calls: AtomicUsize::new(0),
      delay: None,
    }
  }

  pub fn with_synthetic(mut self, synthetic: Vec<Param>) -> Self {
    self.synthetic = synthetic;
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn set_rows(&self, rows: Vec<Param>) {
    *self.rows.lock().unwrap() = rows;
  }

  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl SourceAdapter for CountingAdapter {
  type Record = Param;
  type Raw = Param;

  async fn fetch_raw(&self) -> Result<Vec<Param>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    if self.failing.load(Ordering::SeqCst) {
      return Err(RefDataError::source_fetch("Param", "back office unavailable"));
    }
    let rows = self.rows.lock().unwrap().clone();
    Ok(rows)
  }

  fn transform(&self, raw: Param) -> Result<Param> {
    Ok(raw)
  }

  fn synthetic_records(&self, _fetched: &NamespaceData<Param>) -> NamespaceData<Param> {
    group_records(self.synthetic.clone())
  }
}

/// Back office answering from canned JSON rows per operation.
#[derive(Default)]
pub struct StaticBackOffice {
  rows: Mutex<HashMap<String, serde_json::Value>>,
  failing: AtomicBool,
  calls: AtomicUsize,
}

impl StaticBackOffice {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_rows(self, operation: &str, rows: serde_json::Value) -> Self {
    self.set_rows(operation, rows);
    self
  }

  pub fn set_rows(&self, operation: &str, rows: serde_json::Value) {
    self
      .rows
      .lock()
      .unwrap()
      .insert(operation.to_string(), rows);
  }

  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl BackOffice for StaticBackOffice {
  async fn fetch_rows<R: DeserializeOwned + Send>(
    &self,
    namespace: &'static str,
    operation: &'static str,
  ) -> Result<Vec<R>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.failing.load(Ordering::SeqCst) {
      return Err(RefDataError::source_fetch(namespace, "connection refused"));
    }
    let rows = self
      .rows
      .lock()
      .unwrap()
      .get(operation)
      .cloned()
      .unwrap_or_else(|| serde_json::Value::Array(Vec::new()));
    serde_json::from_value(rows).map_err(|e| RefDataError::source_fetch(namespace, e))
  }
}
