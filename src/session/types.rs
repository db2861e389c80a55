use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SHEET_VERSION: u32 = 1;

/// One persisted score for one criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub criterion_name: String,
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Saved grades of one scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeSheet {
    pub version: u32,
    pub scope_key: String,
    pub rubric: String,
    #[serde(default)]
    pub records: Vec<GradeRecord>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finalized_by: Option<String>,
}

impl GradeSheet {
    pub fn new(scope_key: impl Into<String>, rubric: impl Into<String>) -> Self {
        Self {
            version: SHEET_VERSION,
            scope_key: scope_key.into(),
            rubric: rubric.into(),
            records: Vec::new(),
            updated_at: Utc::now(),
            finalized_at: None,
            finalized_by: None,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.finalized_at.is_some()
    }

    pub fn record(&self, criterion_name: &str) -> Option<&GradeRecord> {
        self.records.iter().find(|r| r.criterion_name == criterion_name)
    }
}
