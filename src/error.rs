//! Error taxonomy for reference data lookups.

use crate::cache::CacheKey;

pub type Result<T> = std::result::Result<T, RefDataError>;

#[derive(Debug, thiserror::Error)]
pub enum RefDataError {
  /// A strict lookup found no entry for the requested key(s) after populating.
  #[error("no {namespace} data found for {}", join_keys(.keys))]
  DataNotFound {
    namespace: &'static str,
    keys: Vec<CacheKey>,
  },

  /// The back office could not deliver the namespace (transport, timeout,
  /// service failure or an unusable row). Never cached as empty data.
  #[error("failed to fetch {namespace} from back office: {message}")]
  SourceFetch { namespace: String, message: String },

  #[error("cache storage error: {0}")]
  Storage(String),

  #[error("cache database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("failed to encode cached data: {0}")]
  Encode(#[from] serde_json::Error),
}

impl RefDataError {
  pub fn source_fetch(namespace: impl Into<String>, message: impl std::fmt::Display) -> Self {
    Self::SourceFetch {
      namespace: namespace.into(),
      message: message.to_string(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::DataNotFound { .. })
  }
}

fn join_keys(keys: &[CacheKey]) -> String {
  keys
    .iter()
    .map(|k| format!("[{}]", k))
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_found_message_lists_every_key() {
    let err = RefDataError::DataNotFound {
      namespace: "ReferenceValue",
      keys: vec![
        CacheKey::new("A", "SYS", "RSTU"),
        CacheKey::new("B", "SYS", "RSTU"),
      ],
    };

    let message = err.to_string();
    assert!(message.contains("ReferenceValue"));
    assert!(message.contains("[A>$<SYS>$<RSTU]"));
    assert!(message.contains("[B>$<SYS>$<RSTU]"));
    assert!(err.is_not_found());
  }

  #[test]
  fn test_source_fetch_is_not_a_miss() {
    let err = RefDataError::source_fetch("SystemParameter", "timed out");
    assert!(!err.is_not_found());
    assert_eq!(
      err.to_string(),
      "failed to fetch SystemParameter from back office: timed out"
    );
  }
}
