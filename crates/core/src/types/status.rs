//! Status enums for case tracking.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a forensic case.
///
/// Serialized with the human-readable labels the case workspace displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CaseStatus {
    #[default]
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Open")]
    Open,
    #[serde(rename = "Under Investigation")]
    UnderInvestigation,
    #[serde(rename = "Closed")]
    Closed,
}

impl CaseStatus {
    /// Returns the display label stored in the database and sent to clients.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Open => "Open",
            Self::UnderInvestigation => "Under Investigation",
            Self::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "New" => Ok(Self::New),
            "Open" => Ok(Self::Open),
            "Under Investigation" => Ok(Self::UnderInvestigation),
            "Closed" => Ok(Self::Closed),
            _ => Err(format!("invalid case status: {s}")),
        }
    }
}
