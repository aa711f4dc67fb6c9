//! Recovery events and the metrics collaborator
//!
//! Every escalation, hold and reset is reported as a [`RecoveryEvent`].
//! Delivery is best effort: a [`RecoveryMetrics`] sink that fails never
//! affects controller state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::RecoveryAction;
use crate::error::Result;
use crate::guard::{CallState, SignalLevel};

/// Why recovery went back to the healthy baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetReason {
    /// Validation reported the network reachable again
    Recovered,

    /// Signal dropped below the poor-signal threshold
    WeakSignal,

    /// The policy was replaced
    Reconfigured,
}

impl std::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recovered => write!(f, "recovered"),
            Self::WeakSignal => write!(f, "weak signal"),
            Self::Reconfigured => write!(f, "reconfigured"),
        }
    }
}

/// Why recovery is paused at its current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HoldReason {
    /// A voice call would be dropped
    InCall(CallState),

    /// A guard collaborator could not be queried
    GuardUnavailable,
}

/// Events emitted by the recovery controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RecoveryEvent {
    /// Validation failed while healthy; a stall episode begins
    EpisodeStarted,

    /// An action was handed to the recovery callback
    ActionDispatched {
        action: RecoveryAction,
    },

    /// Escalation paused
    Held {
        action: RecoveryAction,
        reason: HoldReason,
    },

    /// Recovery returned to the baseline
    Reset {
        from: RecoveryAction,
        reason: ResetReason,
        /// Time since the episode began, when one was in progress
        episode: Option<Duration>,
        /// Signal level that forced the reset, for [`ResetReason::WeakSignal`]
        signal: Option<SignalLevel>,
    },

    /// The recovery callback rejected an action
    DispatchFailed {
        action: RecoveryAction,
        reason: String,
    },

    /// A policy was rejected as invalid
    ConfigRejected {
        message: String,
    },
}

/// Sink for recovery events (metrics, telemetry)
pub trait RecoveryMetrics: Send + Sync {
    /// Record one event; errors are logged and dropped
    fn record(&self, event: &RecoveryEvent) -> Result<()>;
}

/// Metrics sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl RecoveryMetrics for NoopMetrics {
    fn record(&self, _event: &RecoveryEvent) -> Result<()> {
        Ok(())
    }
}
