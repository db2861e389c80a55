use serde::{Deserialize, Serialize};

/// A named, weighted grading dimension.
///
/// `weight` is the criterion's share of the total. Weights within one rubric
/// are expected to sum to 1.0, but that is reported by
/// [`AggregateResult::is_weight_valid`](super::AggregateResult) rather than
/// rejected.
///
/// Example YAML:
/// ```yaml
/// name: Report
/// max_score: 10
/// weight: 0.3
/// description: Written thesis report
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Criterion {
    /// Unique within a rubric; the key used to match entries and records
    pub name: String,

    /// Upper bound for the raw score (commonly 10)
    pub max_score: f64,

    /// Share of the total, in [0, 1]
    pub weight: f64,

    /// Display text, not used in computation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Criterion {
    pub fn new(name: impl Into<String>, max_score: f64, weight: f64) -> Self {
        Self {
            name: name.into(),
            max_score,
            weight,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named, ordered list of criteria. Definition order is display order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RubricConfig {
    pub name: String,

    pub criteria: Vec<Criterion>,
}

impl Default for RubricConfig {
    fn default() -> Self {
        Self {
            name: "capstone".to_string(),
            criteria: vec![
                Criterion::new("Report", 10.0, 0.3)
                    .with_description("Written report: structure, depth, references"),
                Criterion::new("Product", 10.0, 0.3)
                    .with_description("Delivered artefact: completeness and quality"),
                Criterion::new("Defense", 10.0, 0.4)
                    .with_description("Presentation and answers to the committee"),
            ],
        }
    }
}

impl RubricConfig {
    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    pub fn weight_total(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rubric() {
        let rubric = RubricConfig::default();

        assert_eq!(rubric.name, "capstone");
        assert_eq!(rubric.criteria.len(), 3);
        assert!((rubric.weight_total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rubric_serde_roundtrip() {
        let rubric = RubricConfig::default();
        let yaml = serde_saphyr::to_string(&rubric).unwrap();
        let parsed: RubricConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(rubric, parsed);
    }

    #[test]
    fn test_criterion_without_description() {
        let yaml = r#"
name: Report
max_score: 10
weight: 0.5
"#;
        let criterion: Criterion = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(criterion.name, "Report");
        assert_eq!(criterion.max_score, 10.0);
        assert_eq!(criterion.weight, 0.5);
        assert!(criterion.description.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
name: Report
max_score: 10
weight: 0.5
bonus: 3
"#;
        let result: Result<Criterion, _> = serde_saphyr::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_by_name() {
        let rubric = RubricConfig::default();
        assert_eq!(rubric.criterion("Defense").map(|c| c.weight), Some(0.4));
        assert!(rubric.criterion("defense").is_none());
    }
}
