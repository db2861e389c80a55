use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scoring::RubricConfig;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where grade sheets are stored (defaults to <config dir>/grades)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Rubric used when a command does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_rubric: Option<String>,

    pub rubrics: Vec<RubricConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let rubric = RubricConfig::default();
        Self {
            data_dir: None,
            default_rubric: Some(rubric.name.clone()),
            rubrics: vec![rubric],
        }
    }
}

impl Config {
    /// Find a rubric by name, falling back to `default_rubric`, then to the
    /// only rubric if exactly one is defined.
    pub fn rubric(&self, name: Option<&str>) -> Option<&RubricConfig> {
        match name.or(self.default_rubric.as_deref()) {
            Some(name) => self.rubrics.iter().find(|r| r.name == name),
            None if self.rubrics.len() == 1 => self.rubrics.first(),
            None => None,
        }
    }
}
