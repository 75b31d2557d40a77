//! Provenance of a registry record: which government publication(s) it came from.

use serde::{Deserialize, Serialize};

/// Which publication(s) contributed a record.
///
/// `Mapping` and `Schedule` are assigned at extraction time; `Both` only
/// appears after reconciliation, when the two publications carried the same
/// HSN code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Mapping,
    Schedule,
    Both,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Mapping => "mapping",
            Source::Schedule => "schedule",
            Source::Both => "both",
        }
    }
}

impl std::str::FromStr for Source {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mapping" => Ok(Source::Mapping),
            "schedule" => Ok(Source::Schedule),
            "both" => Ok(Source::Both),
            other => Err(crate::Error::Internal(format!(
                "unknown record source: {}",
                other
            ))),
        }
    }
}
