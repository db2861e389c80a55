use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::types::{GradeRecord, GradeSheet};
use crate::scoring::{
    aggregate, clamp_and_format, format_decimal, parse_score, round_within, AggregateResult,
    Blocker, Criterion, RawEntry,
};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("unknown criterion '{0}'")]
    UnknownCriterion(String),

    #[error("grades for '{scope}' are finalized and can no longer be edited")]
    Locked { scope: String },

    #[error("grades for '{scope}' cannot be finalized: {}", describe(.blockers))]
    NotFinalizable { scope: String, blockers: Vec<Blocker> },
}

fn describe(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Editable grading state of one scope.
///
/// Criteria are fixed for the lifetime of the session. Raw entries are the
/// only mutable state; everything else is derived by [`evaluate`](Self::evaluate).
#[derive(Debug, Clone)]
pub struct GradingSession {
    scope_key: String,
    rubric: String,
    criteria: Vec<Criterion>,
    entries: HashMap<String, RawEntry>,
    finalized_at: Option<DateTime<Utc>>,
    finalized_by: Option<String>,
}

impl GradingSession {
    pub fn new(scope_key: impl Into<String>, rubric: impl Into<String>, criteria: Vec<Criterion>) -> Self {
        Self {
            scope_key: scope_key.into(),
            rubric: rubric.into(),
            criteria,
            entries: HashMap::new(),
            finalized_at: None,
            finalized_by: None,
        }
    }

    /// Seed raw entries from previously saved records.
    ///
    /// Records for criteria no longer in the rubric are dropped.
    pub fn from_sheet(sheet: &GradeSheet, criteria: Vec<Criterion>) -> Self {
        let mut session = Self::new(sheet.scope_key.clone(), sheet.rubric.clone(), criteria);

        for record in &sheet.records {
            if !session.has_criterion(&record.criterion_name) {
                tracing::warn!(
                    scope = %sheet.scope_key,
                    criterion = %record.criterion_name,
                    "Saved grade refers to a criterion missing from the rubric, ignoring"
                );
                continue;
            }
            let raw_value = record.score.map(format_decimal).unwrap_or_default();
            session.entries.insert(
                record.criterion_name.clone(),
                RawEntry {
                    raw_value,
                    notes: record.notes.clone(),
                },
            );
        }

        session.finalized_at = sheet.finalized_at;
        session.finalized_by = sheet.finalized_by.clone();
        session
    }

    pub fn scope_key(&self) -> &str {
        &self.scope_key
    }

    pub fn rubric(&self) -> &str {
        &self.rubric
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn is_locked(&self) -> bool {
        self.finalized_at.is_some()
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    pub fn finalized_by(&self) -> Option<&str> {
        self.finalized_by.as_deref()
    }

    pub fn entry(&self, name: &str) -> Option<&RawEntry> {
        self.entries.get(name)
    }

    pub fn raw_value(&self, name: &str) -> &str {
        self.entries
            .get(name)
            .map(|e| e.raw_value.as_str())
            .unwrap_or("")
    }

    pub fn set_raw(&mut self, name: &str, raw_value: impl Into<String>) -> Result<(), SessionError> {
        self.check_editable(name)?;
        self.entries.entry(name.to_string()).or_default().raw_value = raw_value.into();
        Ok(())
    }

    pub fn set_notes(&mut self, name: &str, notes: Option<String>) -> Result<(), SessionError> {
        self.check_editable(name)?;
        let notes = notes.filter(|n| !n.trim().is_empty());
        self.entries.entry(name.to_string()).or_default().notes = notes;
        Ok(())
    }

    /// Remove the score for a criterion, keeping its notes
    pub fn clear(&mut self, name: &str) -> Result<(), SessionError> {
        self.set_raw(name, String::new())
    }

    /// End an edit of one criterion: clamp and reformat its raw value.
    ///
    /// Returns the new raw value.
    pub fn blur(&mut self, name: &str) -> Result<String, SessionError> {
        self.check_editable(name)?;
        let max_score = self
            .criterion(name)
            .map(|c| c.max_score)
            .ok_or_else(|| SessionError::UnknownCriterion(name.to_string()))?;

        let entry = self.entries.entry(name.to_string()).or_default();
        let formatted = clamp_and_format(&entry.raw_value, max_score);
        if formatted != entry.raw_value {
            tracing::debug!(criterion = %name, from = %entry.raw_value, to = %formatted, "raw value normalised");
        }
        entry.raw_value = formatted.clone();
        Ok(formatted)
    }

    pub fn evaluate(&self) -> AggregateResult {
        aggregate(&self.criteria, &self.entries)
    }

    /// Records to hand to persistence, in definition order.
    ///
    /// Criteria with a raw value are emitted with their parsed score (rounded
    /// to 2 decimals without exceeding the maximum, `None` if invalid).
    /// Criteria with only notes are kept so the notes survive a reload.
    pub fn save_records(&self) -> Vec<GradeRecord> {
        self.criteria
            .iter()
            .filter_map(|criterion| {
                let entry = self.entries.get(&criterion.name)?;
                if entry.is_blank() && entry.notes.is_none() {
                    return None;
                }
                let score = parse_score(&entry.raw_value, criterion.max_score)
                    .map(|v| round_within(v, criterion.max_score));
                Some(GradeRecord {
                    criterion_name: criterion.name.clone(),
                    score,
                    notes: entry.notes.clone(),
                })
            })
            .collect()
    }

    pub fn to_sheet(&self) -> GradeSheet {
        let mut sheet = GradeSheet::new(self.scope_key.clone(), self.rubric.clone());
        sheet.records = self.save_records();
        sheet.finalized_at = self.finalized_at;
        sheet.finalized_by = self.finalized_by.clone();
        sheet
    }

    /// Lock the scope. Only allowed when the aggregate says it can be finalized.
    pub fn finalize(&mut self, by: &str) -> Result<GradeSheet, SessionError> {
        if self.is_locked() {
            return Err(SessionError::Locked {
                scope: self.scope_key.clone(),
            });
        }

        let result = self.evaluate();
        if !result.can_finalize {
            return Err(SessionError::NotFinalizable {
                scope: self.scope_key.clone(),
                blockers: result.blockers(),
            });
        }

        self.finalized_at = Some(Utc::now());
        self.finalized_by = Some(by.to_string());
        tracing::info!(scope = %self.scope_key, by, total = result.total, "grades finalized");
        Ok(self.to_sheet())
    }

    fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    fn has_criterion(&self, name: &str) -> bool {
        self.criterion(name).is_some()
    }

    fn check_editable(&self, name: &str) -> Result<(), SessionError> {
        if self.is_locked() {
            return Err(SessionError::Locked {
                scope: self.scope_key.clone(),
            });
        }
        if !self.has_criterion(name) {
            return Err(SessionError::UnknownCriterion(name.to_string()));
        }
        Ok(())
    }
}
