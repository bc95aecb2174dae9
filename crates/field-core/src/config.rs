use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MAX_UNDO: usize = 200;
const DEFAULT_MAX_NORMALIZE_ITERATIONS: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid editor config: {0}")]
    Json(#[from] serde_json::Error),
}

/// A toolbar entry the host may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolbarOption {
    Formatting,
    Bold,
    Italic,
    Link,
    OrderedList,
    UnorderedList,
}

impl ToolbarOption {
    pub const ALL: [ToolbarOption; 6] = [
        ToolbarOption::Formatting,
        ToolbarOption::Bold,
        ToolbarOption::Italic,
        ToolbarOption::Link,
        ToolbarOption::OrderedList,
        ToolbarOption::UnorderedList,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
    pub toolbar: Vec<ToolbarOption>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
            max_normalize_iterations: DEFAULT_MAX_NORMALIZE_ITERATIONS,
            toolbar: ToolbarOption::ALL.to_vec(),
        }
    }
}

impl EditorConfig {
    /// Replaces zero limits with the defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = DEFAULT_MAX_UNDO;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = DEFAULT_MAX_NORMALIZE_ITERATIONS;
        }
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        Ok(config.with_defaults())
    }

    pub fn has_toolbar_option(&self, option: ToolbarOption) -> bool {
        self.toolbar.contains(&option)
    }
}
