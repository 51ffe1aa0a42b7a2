//! Case domain types.
//!
//! Field names on the wire follow the case workspace's JSON shape
//! (`type`, `dateOfIncident`, camelCase timestamps).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forensight_core::{CaseId, CaseStatus, UserId};

/// Case type used when the client does not pick one.
pub const DEFAULT_CASE_TYPE: &str = "Unspecified";

fn default_case_type() -> String {
    DEFAULT_CASE_TYPE.to_owned()
}

/// A forensic case owned by one user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    #[serde(rename = "userId")]
    pub owner: UserId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub case_type: String,
    pub status: CaseStatus,
    pub location: String,
    pub date_of_incident: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a case.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_case_type")]
    pub case_type: String,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub date_of_incident: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewCase {
    /// A case with only a title; everything else takes its default.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            case_type: default_case_type(),
            status: CaseStatus::default(),
            location: String::new(),
            date_of_incident: None,
            tags: Vec::new(),
        }
    }
}

/// A partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub case_type: Option<String>,
    pub status: Option<CaseStatus>,
    pub location: Option<String>,
    pub date_of_incident: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CaseUpdate {
    /// Apply the present fields to `case` and bump its `updated_at`.
    pub fn apply(self, case: &mut Case, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            case.title = title;
        }
        if let Some(description) = self.description {
            case.description = description;
        }
        if let Some(case_type) = self.case_type {
            case.case_type = case_type;
        }
        if let Some(status) = self.status {
            case.status = status;
        }
        if let Some(location) = self.location {
            case.location = location;
        }
        if let Some(date) = self.date_of_incident {
            case.date_of_incident = Some(date);
        }
        if let Some(tags) = self.tags {
            case.tags = tags;
        }
        case.updated_at = now;
    }
}
