//! Composite cache keys.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Separator joining the key components. Multi-character so it will not turn
/// up inside real domain, service or workplace codes.
pub const KEY_SEPARATOR: &str = ">$<";

/// The `(domain, service, workplace)` triple identifying a slice of reference data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
  domain: String,
  service: String,
  workplace: String,
}

impl CacheKey {
  pub fn new(
    domain: impl Into<String>,
    service: impl Into<String>,
    workplace: impl Into<String>,
  ) -> Self {
    Self {
      domain: domain.into(),
      service: service.into(),
      workplace: workplace.into(),
    }
  }

  pub fn domain(&self) -> &str {
    &self.domain
  }

  pub fn service(&self) -> &str {
    &self.service
  }

  pub fn workplace(&self) -> &str {
    &self.workplace
  }

  /// The joined string form, e.g. `SYS>$<SYS>$<RSTU`.
  pub fn composite(&self) -> String {
    composite_key(&self.domain, &self.service, &self.workplace)
  }

  /// Parse a composite string. Anything other than exactly three components is rejected.
  pub fn parse(composite: &str) -> Option<Self> {
    let mut parts = composite.split(KEY_SEPARATOR);
    let domain = parts.next()?;
    let service = parts.next()?;
    let workplace = parts.next()?;
    if parts.next().is_some() {
      return None;
    }
    Some(Self::new(domain, service, workplace))
  }
}

/// Join the three key components with [`KEY_SEPARATOR`].
pub fn composite_key(domain: &str, service: &str, workplace: &str) -> String {
  [domain, service, workplace].join(KEY_SEPARATOR)
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.composite())
  }
}

// Keys are map keys in the stored blob, so they serialize as plain strings.
impl Serialize for CacheKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.composite())
  }
}

impl<'de> Deserialize<'de> for CacheKey {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    CacheKey::parse(&s).ok_or_else(|| de::Error::custom(format!("invalid cache key '{}'", s)))
  }
}
