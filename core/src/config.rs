use serde::{Deserialize, Serialize};

use crate::op::FormatOptions;
use crate::rt::{ExecContext, ForceMode, Machine};

/// Settings for one evaluation: how lazy values are forced, how `Show`
/// renders, and an optional instruction budget for the driving loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub force_mode: ForceMode,
    pub show: FormatOptions,
    pub step_limit: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            force_mode: ForceMode::Cooperative,
            show: FormatOptions::default(),
            step_limit: None,
        }
    }
}

impl RuntimeConfig {
    pub fn context(&self) -> ExecContext {
        ExecContext::new()
            .with_mode(self.force_mode)
            .with_format(self.show.clone())
    }

    pub fn machine(&self) -> Machine {
        match self.step_limit {
            Some(limit) => Machine::new().with_step_limit(limit),
            None => Machine::new(),
        }
    }
}
