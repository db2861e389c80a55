use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::config::Criterion;
use super::parse::{format_decimal, parse_score};

/// Tolerance for the weights of one rubric summing to 1.0
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// A fully-scored criterion contributes `weight * COMPONENT_SCALE` to the total
pub const COMPONENT_SCALE: f64 = 10.0;

/// A user-editable entry for one criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawEntry {
    pub raw_value: String,
    pub notes: Option<String>,
}

impl RawEntry {
    pub fn new(raw_value: impl Into<String>) -> Self {
        Self {
            raw_value: raw_value.into(),
            notes: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.raw_value.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentResult {
    pub name: String,
    pub weight: f64,
    pub max_score: f64,
    pub score_value: Option<f64>,
    pub is_invalid: bool,
    pub component_score: Option<f64>,
}

/// Why a scope cannot be finalized yet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Blocker {
    Incomplete { filled: usize, total: usize },
    InvalidEntries(Vec<String>),
    UnbalancedWeights { total: f64 },
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::Incomplete { filled, total } => {
                write!(f, "only {}/{} criteria filled", filled, total)
            }
            Blocker::InvalidEntries(names) => {
                write!(f, "invalid score for {}", names.join(", "))
            }
            Blocker::UnbalancedWeights { total } => {
                write!(f, "weights sum to {}, expected 1", format_decimal(*total))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub components: Vec<ComponentResult>,
    pub total: f64,
    pub filled_count: usize,
    pub total_count: usize,
    pub weight_total: f64,
    pub max_total: f64,
    pub is_weight_valid: bool,
    pub is_complete: bool,
    pub can_finalize: bool,
}

impl AggregateResult {
    /// Names of criteria whose raw value is present but not a valid score
    pub fn invalid_criteria(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| c.is_invalid)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn blockers(&self) -> Vec<Blocker> {
        let mut blockers = Vec::new();

        if !self.is_complete {
            blockers.push(Blocker::Incomplete {
                filled: self.filled_count,
                total: self.total_count,
            });
        }

        let invalid = self.invalid_criteria();
        if !invalid.is_empty() {
            blockers.push(Blocker::InvalidEntries(
                invalid.into_iter().map(str::to_string).collect(),
            ));
        }

        if !self.is_weight_valid {
            blockers.push(Blocker::UnbalancedWeights {
                total: self.weight_total,
            });
        }

        blockers
    }
}

pub fn compute_component(criterion: &Criterion, raw_value: &str) -> ComponentResult {
    let score_value = parse_score(raw_value, criterion.max_score);
    let is_invalid = !raw_value.trim().is_empty() && score_value.is_none();
    let component_score = score_value.map(|v| {
        if criterion.max_score > 0.0 {
            (v / criterion.max_score) * criterion.weight * COMPONENT_SCALE
        } else {
            0.0
        }
    });

    ComponentResult {
        name: criterion.name.clone(),
        weight: criterion.weight,
        max_score: criterion.max_score,
        score_value,
        is_invalid,
        component_score,
    }
}

/// Recompute the derived view of one scope.
///
/// Criteria without an entry in `raw_entries` count as not yet entered.
/// Everything is summed at full precision; callers round for display.
pub fn aggregate(criteria: &[Criterion], raw_entries: &HashMap<String, RawEntry>) -> AggregateResult {
    let components: Vec<ComponentResult> = criteria
        .iter()
        .map(|criterion| {
            let raw = raw_entries
                .get(&criterion.name)
                .map(|e| e.raw_value.as_str())
                .unwrap_or("");
            compute_component(criterion, raw)
        })
        .collect();

    let total: f64 = components.iter().filter_map(|c| c.component_score).sum();
    let filled_count = components.iter().filter(|c| c.score_value.is_some()).count();
    let total_count = criteria.len();
    let weight_total: f64 = criteria.iter().map(|c| c.weight).sum();
    let max_total = weight_total * COMPONENT_SCALE;
    let is_weight_valid = (weight_total - 1.0).abs() < WEIGHT_TOLERANCE;
    let is_complete = total_count > 0 && filled_count == total_count;
    let any_invalid = components.iter().any(|c| c.is_invalid);
    let can_finalize = is_complete && is_weight_valid && !any_invalid;

    tracing::debug!(
        total,
        filled_count,
        total_count,
        weight_total,
        can_finalize,
        "aggregate recomputed"
    );

    AggregateResult {
        components,
        total,
        filled_count,
        total_count,
        weight_total,
        max_total,
        is_weight_valid,
        is_complete,
        can_finalize,
    }
}
