use std::io::IsTerminal;

use owo_colors::OwoColorize;
use terminal_size::{terminal_size, Width};

use crate::scoring::{format_decimal, AggregateResult, ComponentResult, RubricConfig};
use crate::session::{GradeSheet, GradingSession};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score rounded to 2 decimals, "-" when absent
pub fn format_score(score: Option<f64>) -> String {
    score.map(format_decimal).unwrap_or_else(|| "-".to_string())
}

/// "X/Y filled"
pub fn format_progress(result: &AggregateResult) -> String {
    format!("{}/{} filled", result.filled_count, result.total_count)
}

fn format_weight(weight: f64) -> String {
    format!("{}%", format_decimal(weight * 100.0))
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a name to fit available width, accounting for Unicode
fn truncate_name(name: &str, max_width: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= max_width {
        name.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// One row per criterion, in rubric order.
///
/// Columns: index, name, raw value, weight, component score, marker.
/// Invalid rows are marked with `!`.
pub fn format_breakdown(session: &GradingSession, result: &AggregateResult, use_colors: bool) -> String {
    if result.components.is_empty() {
        return "No criteria defined.".to_string();
    }

    let raw_width = 8;
    let weight_width = 6;
    let score_width = 6;
    let fixed_width = 4 + raw_width + weight_width + score_width + 2 * 4 + 2;

    let longest = result
        .components
        .iter()
        .map(|c| c.name.chars().count())
        .max()
        .unwrap_or(0);
    let name_width = match get_terminal_width() {
        Some(width) if width > fixed_width + 10 => longest.min(width - fixed_width),
        Some(_) => longest.min(20),
        None => longest,
    };

    result
        .components
        .iter()
        .enumerate()
        .map(|(idx, component)| {
            let index_str = format!("{:>2}.", idx + 1);
            let name = truncate_name(&component.name, name_width);
            let name = format!("{:<width$}", name, width = name_width);
            let raw = format!("{:>width$}", session.raw_value(&component.name), width = raw_width);
            let weight = format!("{:>width$}", format_weight(component.weight), width = weight_width);
            let score = format!(
                "{:>width$}",
                format_score(component.component_score),
                width = score_width
            );
            let marker = if component.is_invalid { "!" } else { "" };

            if use_colors {
                let line = format!(
                    "{} {}  {}  {}  {}",
                    index_str.dimmed(),
                    name,
                    raw,
                    weight.dimmed(),
                    score.bold()
                );
                if component.is_invalid {
                    format!("{} {}", line, marker.red().bold())
                } else {
                    line
                }
            } else {
                format!("{} {}  {}  {}  {} {}", index_str, name, raw, weight, score, marker)
                    .trim_end()
                    .to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// "Total: 8.2 / 10 (3/3 filled)"
pub fn format_summary(result: &AggregateResult, use_colors: bool) -> String {
    let total = format_decimal(result.total);
    let max_total = format_decimal(result.max_total);
    let progress = format_progress(result);
    let weights = format!("weights {}", format_weight(result.weight_total));

    if use_colors {
        let progress = if result.is_complete {
            progress.green().to_string()
        } else {
            progress.yellow().to_string()
        };
        let weights = if result.is_weight_valid {
            weights
        } else {
            weights.red().to_string()
        };
        format!("Total: {} / {} ({}, {})", total.bold(), max_total, progress, weights)
    } else {
        format!("Total: {} / {} ({}, {})", total, max_total, progress, weights)
    }
}

/// One warning line per reason the scope cannot be finalized.
/// Empty when finalizing is allowed.
pub fn format_blockers(result: &AggregateResult, use_colors: bool) -> String {
    result
        .blockers()
        .iter()
        .map(|blocker| {
            if use_colors {
                format!("{} {}", "warning:".yellow().bold(), blocker)
            } else {
                format!("warning: {}", blocker)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tab-separated rows for scripting: name, score, component score.
/// Absent values are empty fields. No headers, no colors.
pub fn format_tsv(result: &AggregateResult) -> String {
    let mut lines: Vec<String> = result.components.iter().map(tsv_row).collect();
    lines.push(format!("TOTAL\t\t{}", format_decimal(result.total)));
    lines.join("\n")
}

fn tsv_row(component: &ComponentResult) -> String {
    format!(
        "{}\t{}\t{}",
        component.name,
        component.score_value.map(format_decimal).unwrap_or_default(),
        component.component_score.map(format_decimal).unwrap_or_default()
    )
}

/// List a rubric's criteria with their maximum and weight
pub fn format_criteria(rubric: &RubricConfig, use_colors: bool) -> String {
    let mut lines = Vec::new();
    let header = format!("Rubric: {}", rubric.name);
    lines.push(if use_colors {
        header.bold().to_string()
    } else {
        header
    });

    for criterion in &rubric.criteria {
        let mut line = format!(
            "  {} (max {}, weight {})",
            criterion.name,
            format_decimal(criterion.max_score),
            format_weight(criterion.weight)
        );
        if let Some(description) = &criterion.description {
            line.push_str(&format!(" - {}", description));
        }
        lines.push(line);
    }

    let weight_total = rubric.weight_total();
    if (weight_total - 1.0).abs() >= crate::scoring::WEIGHT_TOLERANCE {
        let warning = format!(
            "  weights sum to {}, expected 100%",
            format_weight(weight_total)
        );
        lines.push(if use_colors {
            warning.yellow().to_string()
        } else {
            warning
        });
    }

    lines.join("\n")
}

/// One line per saved sheet: scope, rubric, record count, lock state
pub fn format_sheet_list(sheets: &[GradeSheet], use_colors: bool) -> String {
    if sheets.is_empty() {
        return "No grade sheets saved.".to_string();
    }

    sheets
        .iter()
        .map(|sheet| {
            let state = match (&sheet.finalized_at, &sheet.finalized_by) {
                (Some(at), Some(by)) => format!("finalized {} by {}", at.format("%Y-%m-%d"), by),
                (Some(at), None) => format!("finalized {}", at.format("%Y-%m-%d")),
                (None, _) => "open".to_string(),
            };
            let records = format!("{} records", sheet.records.len());
            if use_colors {
                format!(
                    "{}  {}  {}  {}",
                    sheet.scope_key.bold(),
                    sheet.rubric.cyan(),
                    records,
                    state.dimmed()
                )
            } else {
                format!("{}  {}  {}  {}", sheet.scope_key, sheet.rubric, records, state)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Criterion;

    fn session(values: &[(&str, &str)]) -> GradingSession {
        let mut s = GradingSession::new("thesis/alice", "capstone", RubricConfig::default().criteria);
        for (name, raw) in values {
            s.set_raw(name, *raw).unwrap();
        }
        s
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(2.4000000000000004)), "2.4");
        assert_eq!(format_score(Some(4.0)), "4");
        assert_eq!(format_score(None), "-");
    }

    #[test]
    fn test_format_progress() {
        let s = session(&[("Report", "8")]);
        assert_eq!(format_progress(&s.evaluate()), "1/3 filled");
    }

    #[test]
    fn test_breakdown_rows_in_order() {
        let s = session(&[("Report", "8"), ("Defense", "10")]);
        let result = s.evaluate();
        let output = format_breakdown(&s, &result, false);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(" 1."));
        assert!(lines[0].contains("Report"));
        assert!(lines[0].contains("30%"));
        assert!(lines[0].contains("2.4"));
        assert!(lines[1].contains("Product"));
        assert!(lines[1].ends_with('-'));
        assert!(lines[2].contains("Defense"));
        assert!(lines[2].contains('4'));
    }

    #[test]
    fn test_breakdown_marks_invalid_rows() {
        let s = session(&[("Product", "12")]);
        let result = s.evaluate();
        let output = format_breakdown(&s, &result, false);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[1].contains("12"));
        assert!(lines[1].ends_with('!'));
        assert!(!lines[0].ends_with('!'));
    }

    #[test]
    fn test_breakdown_empty() {
        let s = GradingSession::new("x", "empty", vec![]);
        assert_eq!(format_breakdown(&s, &s.evaluate(), false), "No criteria defined.");
    }

    #[test]
    fn test_summary() {
        let s = session(&[("Report", "8"), ("Product", "6"), ("Defense", "10")]);
        assert_eq!(
            format_summary(&s.evaluate(), false),
            "Total: 8.2 / 10 (3/3 filled, weights 100%)"
        );
    }

    #[test]
    fn test_summary_shows_off_weight_total() {
        let mut s = GradingSession::new(
            "thesis/alice",
            "odd",
            vec![Criterion::new("A", 10.0, 0.3), Criterion::new("B", 10.0, 0.3)],
        );
        s.set_raw("A", "10").unwrap();
        assert_eq!(
            format_summary(&s.evaluate(), false),
            "Total: 3 / 6 (1/2 filled, weights 60%)"
        );
    }

    #[test]
    fn test_blockers_empty_when_finalizable() {
        let s = session(&[("Report", "8"), ("Product", "6"), ("Defense", "10")]);
        assert_eq!(format_blockers(&s.evaluate(), false), "");
    }

    #[test]
    fn test_blockers_listed() {
        let s = session(&[("Report", "8"), ("Product", "x")]);
        let output = format_blockers(&s.evaluate(), false);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "warning: only 1/3 criteria filled");
        assert_eq!(lines[1], "warning: invalid score for Product");
    }

    #[test]
    fn test_tsv() {
        let s = session(&[("Report", "8"), ("Defense", "10")]);
        let output = format_tsv(&s.evaluate());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Report\t8\t2.4");
        assert_eq!(lines[1], "Product\t\t");
        assert_eq!(lines[2], "Defense\t10\t4");
        assert_eq!(lines[3], "TOTAL\t\t6.4");
    }

    #[test]
    fn test_criteria_listing() {
        let output = format_criteria(&RubricConfig::default(), false);
        assert!(output.starts_with("Rubric: capstone"));
        assert!(output.contains("Report (max 10, weight 30%)"));
        assert!(!output.contains("weights sum"));
    }

    #[test]
    fn test_criteria_listing_warns_on_weights() {
        let rubric = RubricConfig {
            name: "odd".to_string(),
            criteria: vec![Criterion::new("A", 10.0, 0.3), Criterion::new("B", 10.0, 0.3)],
        };
        let output = format_criteria(&rubric, false);
        assert!(output.contains("weights sum to 60%, expected 100%"));
    }

    #[test]
    fn test_sheet_list() {
        assert_eq!(format_sheet_list(&[], false), "No grade sheets saved.");

        let sheet = session(&[("Report", "8")]).to_sheet();
        let output = format_sheet_list(&[sheet], false);
        assert_eq!(output, "thesis/alice  capstone  1 records  open");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Presentation", 20), "Presentation");
        assert_eq!(truncate_name("Presentation", 8), "Prese...");
        assert_eq!(truncate_name("Presentation", 3), "Pre");
    }
}
