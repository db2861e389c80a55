pub mod config;
pub mod engine;
pub mod parse;
pub mod validation;

pub use config::*;
pub use engine::{
    aggregate, compute_component, AggregateResult, Blocker, ComponentResult, RawEntry,
    COMPONENT_SCALE, WEIGHT_TOLERANCE,
};
pub use parse::{clamp_and_format, format_decimal, parse_score, round_to_cents, round_within};
pub use validation::{validate_rubric, validate_rubrics};
