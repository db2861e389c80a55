use std::collections::HashSet;

use super::config::RubricConfig;

/// Validate a rubric at startup.
/// Returns all validation errors at once (not just the first).
///
/// Weights not summing to 1.0 are not an error here; that is reported per
/// scope by the aggregate.
pub fn validate_rubric(rubric: &RubricConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let prefix = format!("rubrics.{}", rubric.name);

    if rubric.name.trim().is_empty() {
        errors.push("rubrics: rubric name must not be empty".to_string());
    }

    if rubric.criteria.is_empty() {
        errors.push(format!("{}: must define at least one criterion", prefix));
    }

    let mut seen = HashSet::new();
    for (i, criterion) in rubric.criteria.iter().enumerate() {
        if criterion.name.trim().is_empty() {
            errors.push(format!("{}.criteria[{}].name: must not be empty", prefix, i));
        } else if !seen.insert(criterion.name.as_str()) {
            errors.push(format!(
                "{}.criteria[{}].name: duplicate criterion '{}'",
                prefix, i, criterion.name
            ));
        }

        if !criterion.max_score.is_finite() || criterion.max_score <= 0.0 {
            errors.push(format!(
                "{}.criteria[{}].max_score: must be positive, got {}",
                prefix, i, criterion.max_score
            ));
        }

        if !criterion.weight.is_finite() || !(0.0..=1.0).contains(&criterion.weight) {
            errors.push(format!(
                "{}.criteria[{}].weight: must be between 0 and 1, got {}",
                prefix, i, criterion.weight
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate every rubric and check rubric names are unique.
pub fn validate_rubrics(rubrics: &[RubricConfig]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for rubric in rubrics {
        if !names.insert(rubric.name.as_str()) {
            errors.push(format!("rubrics: duplicate rubric '{}'", rubric.name));
        }
        if let Err(mut rubric_errors) = validate_rubric(rubric) {
            errors.append(&mut rubric_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Criterion;

    fn rubric(criteria: Vec<Criterion>) -> RubricConfig {
        RubricConfig {
            name: "thesis".to_string(),
            criteria,
        }
    }

    #[test]
    fn test_valid_rubric() {
        assert!(validate_rubric(&RubricConfig::default()).is_ok());
    }

    #[test]
    fn test_unbalanced_weights_are_not_errors() {
        let r = rubric(vec![
            Criterion::new("A", 10.0, 0.3),
            Criterion::new("B", 10.0, 0.3),
            Criterion::new("C", 10.0, 0.3),
        ]);
        assert!(validate_rubric(&r).is_ok());
    }

    #[test]
    fn test_empty_rubric() {
        let result = validate_rubric(&rubric(vec![]));
        let errors = result.unwrap_err();
        assert!(errors[0].contains("at least one criterion"));
    }

    #[test]
    fn test_duplicate_names() {
        let r = rubric(vec![
            Criterion::new("Report", 10.0, 0.5),
            Criterion::new("Report", 10.0, 0.5),
        ]);
        let errors = validate_rubric(&r).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("rubrics.thesis.criteria[1].name"));
        assert!(errors[0].contains("duplicate"));
    }

    #[test]
    fn test_non_positive_max_score() {
        let r = rubric(vec![
            Criterion::new("A", 0.0, 0.5),
            Criterion::new("B", f64::NAN, 0.5),
        ]);
        let errors = validate_rubric(&r).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("criteria[0].max_score"));
        assert!(errors[1].contains("criteria[1].max_score"));
    }

    #[test]
    fn test_weight_out_of_range() {
        let r = rubric(vec![
            Criterion::new("A", 10.0, 1.5),
            Criterion::new("B", 10.0, -0.1),
        ]);
        let errors = validate_rubric(&r).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("criteria[0].weight"));
    }

    #[test]
    fn test_collects_all_errors() {
        let r = rubric(vec![
            Criterion::new("", -1.0, 2.0), // Errors 1-3
            Criterion::new("B", 10.0, 0.5),
        ]);
        let errors = validate_rubric(&r).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_duplicate_rubric_names() {
        let rubrics = vec![RubricConfig::default(), RubricConfig::default()];
        let errors = validate_rubrics(&rubrics).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate rubric 'capstone'"));
    }
}
