//! Ordered recovery actions
//!
//! Index 0 is the healthy baseline; every following index names a strictly
//! more disruptive remedy.

use serde::{Deserialize, Serialize};

/// A recovery action, ordered from least to most disruptive
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryAction {
    /// No recovery in progress
    None,

    /// Tear down and reconnect the internet-providing data network
    ReestablishInternet,

    /// Power-cycle the radio stack
    RadioPowerCycle,

    /// Reboot the baseband
    ModemReboot,
}

impl RecoveryAction {
    /// Number of levels including the baseline
    pub const COUNT: usize = 4;

    /// Number of escalation steps (every level except the baseline)
    pub const STEPS: usize = Self::COUNT - 1;

    /// All levels in escalation order
    pub const ALL: [RecoveryAction; Self::COUNT] = [
        RecoveryAction::None,
        RecoveryAction::ReestablishInternet,
        RecoveryAction::RadioPowerCycle,
        RecoveryAction::ModemReboot,
    ];

    /// The most disruptive action
    pub const FINAL: RecoveryAction = RecoveryAction::ModemReboot;

    /// Position of this action in the escalation order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Action at the given index, if it exists
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The next more disruptive action, `None` past the final step
    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// True for the baseline
    pub fn is_none(self) -> bool {
        self == RecoveryAction::None
    }

    /// True when the action touches the radio and would drop an active call
    pub fn is_radio_disruptive(self) -> bool {
        matches!(
            self,
            RecoveryAction::RadioPowerCycle | RecoveryAction::ModemReboot
        )
    }
}

impl Default for RecoveryAction {
    fn default() -> Self {
        RecoveryAction::None
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ReestablishInternet => write!(f, "reestablish-internet"),
            Self::RadioPowerCycle => write!(f, "radio-power-cycle"),
            Self::ModemReboot => write!(f, "modem-reboot"),
        }
    }
}
