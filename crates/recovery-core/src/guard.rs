//! Guard collaborators and their evaluation
//!
//! Guards are cheap synchronous reads queried at decision time. A weak
//! signal resets recovery; an active call holds it; an unanswerable query
//! is treated like a failed guard and holds as well.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{CallGuardPolicy, RecoveryConfig};
use crate::error::{RecoveryError, Result};

/// Discrete signal quality level (0 = none, higher is better)
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalLevel(pub u8);

impl std::fmt::Display for SignalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Voice call state as reported by the telephony layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallState {
    /// No call
    Idle,
    /// Incoming call alerting
    Ringing,
    /// Call in progress
    Active,
}

impl CallState {
    /// Anything but idle counts as a call that radio actions would drop
    pub fn is_in_call(self) -> bool {
        self != CallState::Idle
    }
}

/// Source of the current signal quality level
pub trait SignalQualityProvider: Send + Sync {
    /// Current signal level; errors mean the level is unknown
    fn current_level(&self) -> Result<SignalLevel>;
}

/// Source of the current voice call state
pub trait CallStateProvider: Send + Sync {
    /// Current call state; errors mean the state is unknown
    fn current_state(&self) -> Result<CallState>;
}

/// Outcome of evaluating the guards for one decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Recovery may proceed
    Proceed,

    /// Signal below threshold; recovery resets
    WeakSignal(SignalLevel),

    /// A call is in progress; recovery holds
    InCall(CallState),

    /// A guard could not be queried; recovery holds
    Unavailable(RecoveryError),
}

/// Query both guards and decide
///
/// `first_step` marks the transition out of the healthy baseline, which the
/// [`CallGuardPolicy::BeyondFirstStep`] policy lets through during a call.
pub fn evaluate(
    config: &RecoveryConfig,
    signal: &dyn SignalQualityProvider,
    calls: &dyn CallStateProvider,
    first_step: bool,
) -> GuardVerdict {
    let level = match signal.current_level() {
        Ok(level) => level,
        Err(e) => {
            warn!("Signal quality unavailable, holding recovery: {}", e);
            return GuardVerdict::Unavailable(e);
        }
    };

    if level < config.poor_signal_threshold() {
        debug!(
            "Signal level {} below threshold {}",
            level,
            config.poor_signal_threshold()
        );
        return GuardVerdict::WeakSignal(level);
    }

    let exempt = first_step && config.call_guard() == CallGuardPolicy::BeyondFirstStep;
    if exempt {
        return GuardVerdict::Proceed;
    }

    match calls.current_state() {
        Ok(state) if state.is_in_call() => GuardVerdict::InCall(state),
        Ok(_) => GuardVerdict::Proceed,
        Err(e) => {
            warn!("Call state unavailable, holding recovery: {}", e);
            GuardVerdict::Unavailable(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed<T>(Result<T>);

    impl SignalQualityProvider for Fixed<SignalLevel> {
        fn current_level(&self) -> Result<SignalLevel> {
            self.0.clone()
        }
    }

    impl CallStateProvider for Fixed<CallState> {
        fn current_state(&self) -> Result<CallState> {
            self.0.clone()
        }
    }

    fn signal(level: u8) -> Fixed<SignalLevel> {
        Fixed(Ok(SignalLevel(level)))
    }

    fn call(state: CallState) -> Fixed<CallState> {
        Fixed(Ok(state))
    }

    #[test]
    fn test_weak_signal_wins_over_call() {
        let config = RecoveryConfig::default();
        let verdict = evaluate(&config, &signal(1), &call(CallState::Active), false);
        assert_eq!(verdict, GuardVerdict::WeakSignal(SignalLevel(1)));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let config = RecoveryConfig::default();
        let verdict = evaluate(&config, &signal(2), &call(CallState::Idle), false);
        assert_eq!(verdict, GuardVerdict::Proceed);
    }

    #[test]
    fn test_ringing_counts_as_call() {
        let config = RecoveryConfig::default();
        let verdict = evaluate(&config, &signal(4), &call(CallState::Ringing), false);
        assert_eq!(verdict, GuardVerdict::InCall(CallState::Ringing));
    }

    #[test]
    fn test_first_step_exemption_follows_policy() {
        let uniform = RecoveryConfig::default();
        assert_eq!(
            evaluate(&uniform, &signal(4), &call(CallState::Active), true),
            GuardVerdict::InCall(CallState::Active)
        );

        let relaxed = RecoveryConfig::default().with_call_guard(CallGuardPolicy::BeyondFirstStep);
        assert_eq!(
            evaluate(&relaxed, &signal(4), &call(CallState::Active), true),
            GuardVerdict::Proceed
        );
        assert_eq!(
            evaluate(&relaxed, &signal(4), &call(CallState::Active), false),
            GuardVerdict::InCall(CallState::Active)
        );
    }

    #[test]
    fn test_unavailable_collaborators_hold() {
        let config = RecoveryConfig::default();
        let no_signal = Fixed::<SignalLevel>(Err(RecoveryError::unavailable("signal", "modem busy")));
        assert!(matches!(
            evaluate(&config, &no_signal, &call(CallState::Idle), false),
            GuardVerdict::Unavailable(_)
        ));

        let no_calls = Fixed::<CallState>(Err(RecoveryError::unavailable("call-state", "no service")));
        assert!(matches!(
            evaluate(&config, &signal(4), &no_calls, false),
            GuardVerdict::Unavailable(_)
        ));
    }
}
