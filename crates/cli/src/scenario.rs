//! Scripted data stall scenarios
//!
//! ```toml
//! initial_signal = 4
//! run_for_ms = 2000
//!
//! [[step]]
//! at_ms = 0
//! validation = false
//!
//! [[step]]
//! at_ms = 300
//! in_call = true
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Invalid scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Step {index} at {at_ms}ms changes nothing")]
    EmptyStep { index: usize, at_ms: u64 },

    #[error("Step {index} at {at_ms}ms is earlier than the step before it")]
    OutOfOrder { index: usize, at_ms: u64 },
}

/// One timed change to the simulated environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Offset from scenario start
    pub at_ms: u64,

    /// New validation status of the data network
    #[serde(default)]
    pub validation: Option<bool>,

    /// New signal level
    #[serde(default)]
    pub signal: Option<u8>,

    /// Whether a voice call is in progress
    #[serde(default)]
    pub in_call: Option<bool>,

    /// Whether signal queries fail
    #[serde(default)]
    pub signal_unavailable: Option<bool>,
}

impl ScenarioStep {
    pub fn at(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }

    fn is_empty(&self) -> bool {
        self.validation.is_none()
            && self.signal.is_none()
            && self.in_call.is_none()
            && self.signal_unavailable.is_none()
    }
}

/// A complete scripted run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Signal level before the first step
    #[serde(default = "default_signal")]
    pub initial_signal: u8,

    /// How long to keep running after the last step
    #[serde(default)]
    pub run_for_ms: u64,

    /// Steps in time order
    #[serde(default, rename = "step")]
    pub steps: Vec<ScenarioStep>,
}

fn default_signal() -> u8 {
    4
}

impl Scenario {
    /// Parse and check a scenario
    pub fn from_toml_str(input: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(input)?;
        scenario.check()?;
        Ok(scenario)
    }

    fn check(&self) -> Result<(), ScenarioError> {
        let mut last = 0;
        for (index, step) in self.steps.iter().enumerate() {
            if step.is_empty() {
                return Err(ScenarioError::EmptyStep {
                    index,
                    at_ms: step.at_ms,
                });
            }
            if step.at_ms < last {
                return Err(ScenarioError::OutOfOrder {
                    index,
                    at_ms: step.at_ms,
                });
            }
            last = step.at_ms;
        }
        Ok(())
    }

    /// Offset at which the run ends
    pub fn end(&self) -> Duration {
        let last = self.steps.last().map(|s| s.at_ms).unwrap_or(0);
        Duration::from_millis(last + self.run_for_ms)
    }
}
