pub mod formatter;

pub use formatter::{
    format_blockers, format_breakdown, format_criteria, format_progress, format_score,
    format_sheet_list, format_summary, format_tsv, should_use_colors,
};
