//! The reference data kinds the portal reads from the back office.

mod pws_text;
mod reference_value;
mod system_notice;
mod system_parameter;
mod tax_relief_type;

use std::fmt;
use std::str::FromStr;

pub use pws_text::{PwsText, PwsTextSource};
pub use reference_value::{ReferenceValue, ReferenceValueSource};
pub use system_notice::{SystemNotice, SystemNoticeSource};
pub use system_parameter::{SystemParameter, SystemParameterSource};
pub use tax_relief_type::{TaxReliefType, TaxReliefTypeSource};

/// A cached reference data kind, as named on the command line and in the
/// refresh schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
  SystemParameter,
  ReferenceValue,
  PwsText,
  SystemNotice,
  TaxReliefType,
}

impl Dataset {
  pub const ALL: [Dataset; 5] = [
    Dataset::SystemParameter,
    Dataset::ReferenceValue,
    Dataset::PwsText,
    Dataset::SystemNotice,
    Dataset::TaxReliefType,
  ];

  /// Cache namespace the dataset is stored under.
  pub fn namespace(self) -> &'static str {
    match self {
      Dataset::SystemParameter => "SystemParameter",
      Dataset::ReferenceValue => "ReferenceValue",
      Dataset::PwsText => "PwsText",
      Dataset::SystemNotice => "SystemNotice",
      Dataset::TaxReliefType => "TaxReliefType",
    }
  }
}

impl fmt::Display for Dataset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.namespace())
  }
}

impl FromStr for Dataset {
  type Err = String;

  /// Accepts the namespace name or a snake/kebab-case spelling of it.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted: String = s
      .chars()
      .filter(|c| !matches!(c, '-' | '_'))
      .collect::<String>()
      .to_lowercase();

    Dataset::ALL
      .into_iter()
      .find(|d| d.namespace().to_lowercase() == wanted)
      .ok_or_else(|| {
        let names: Vec<&str> = Dataset::ALL.iter().map(|d| d.namespace()).collect();
        format!("unknown dataset '{}' (expected one of {})", s, names.join(", "))
      })
  }
}
