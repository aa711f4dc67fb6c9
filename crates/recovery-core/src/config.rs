//! Recovery policy configuration
//!
//! [`RecoverySettings`] is the raw, deserializable form (as loaded from a
//! per-carrier TOML table). [`RecoveryConfig`] is the validated, immutable
//! step table the controller works from. A reload replaces the whole
//! [`RecoveryConfig`]; it is never edited in place.
//!
//! ```toml
//! delays_ms = [180000, 180000, 180000]
//! skip = [false, false, false]
//! poor_signal_threshold = 2
//! call_guard = "all-steps"
//! enabled = true
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::RecoveryAction;
use crate::error::{RecoveryError, Result};
use crate::guard::SignalLevel;

/// Default wait after each step before escalating further
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(180);

/// Default poor-signal threshold; levels strictly below it abort recovery
pub const DEFAULT_POOR_SIGNAL_THRESHOLD: u8 = 2;

/// Which transitions the active-call guard applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallGuardPolicy {
    /// An active call holds every transition, including the first step
    AllSteps,

    /// The first escalation from healthy may run during a call; later
    /// escalations are held
    BeyondFirstStep,
}

impl Default for CallGuardPolicy {
    fn default() -> Self {
        CallGuardPolicy::AllSteps
    }
}

/// Raw recovery settings as supplied by the configuration source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    /// Per-step wait in milliseconds, one entry per escalation step
    pub delays_ms: Vec<u64>,

    /// Per-step skip flags, one entry per escalation step
    pub skip: Vec<bool>,

    /// Signal levels strictly below this abort recovery
    pub poor_signal_threshold: u8,

    /// Scope of the active-call guard
    pub call_guard: CallGuardPolicy,

    /// Master switch; when false validation is tracked but nothing is dispatched
    pub enabled: bool,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            delays_ms: vec![DEFAULT_STEP_DELAY.as_millis() as u64; RecoveryAction::STEPS],
            skip: vec![false; RecoveryAction::STEPS],
            poor_signal_threshold: DEFAULT_POOR_SIGNAL_THRESHOLD,
            call_guard: CallGuardPolicy::default(),
            enabled: true,
        }
    }
}

impl RecoverySettings {
    /// Parse settings from a TOML document; missing keys take defaults
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input)
            .map_err(|e| RecoveryError::config(format!("invalid recovery settings: {}", e)))
    }

    /// Validate into an immutable [`RecoveryConfig`]
    pub fn validate(&self) -> Result<RecoveryConfig> {
        RecoveryConfig::try_from(self.clone())
    }
}

/// Policy for a single escalation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryStep {
    /// The action this step performs
    pub action: RecoveryAction,

    /// How long to wait after performing it before escalating further
    pub delay: Duration,

    /// Whether this step is omitted from escalation
    pub skip: bool,
}

/// Validated, immutable recovery policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    steps: Vec<RecoveryStep>,
    poor_signal_threshold: SignalLevel,
    call_guard: CallGuardPolicy,
    enabled: bool,
}

impl RecoveryConfig {
    /// Build a policy from ordered delay and skip tables
    ///
    /// Both tables need exactly one entry per escalation step.
    pub fn new(delays: Vec<Duration>, skips: Vec<bool>) -> Result<Self> {
        if delays.is_empty() || skips.is_empty() {
            return Err(RecoveryError::config("empty delay or skip table"));
        }
        if delays.len() != skips.len() {
            return Err(RecoveryError::config(format!(
                "delay table has {} entries but skip table has {}",
                delays.len(),
                skips.len()
            )));
        }
        if delays.len() != RecoveryAction::STEPS {
            return Err(RecoveryError::config(format!(
                "expected {} escalation steps, got {}",
                RecoveryAction::STEPS,
                delays.len()
            )));
        }

        let steps = delays
            .into_iter()
            .zip(skips)
            .enumerate()
            .filter_map(|(i, (delay, skip))| {
                RecoveryAction::from_index(i + 1).map(|action| RecoveryStep { action, delay, skip })
            })
            .collect();

        Ok(Self {
            steps,
            poor_signal_threshold: SignalLevel(DEFAULT_POOR_SIGNAL_THRESHOLD),
            call_guard: CallGuardPolicy::default(),
            enabled: true,
        })
    }

    /// Set the poor-signal threshold
    pub fn with_poor_signal_threshold(mut self, threshold: SignalLevel) -> Self {
        self.poor_signal_threshold = threshold;
        self
    }

    /// Set the call-guard scope
    pub fn with_call_guard(mut self, policy: CallGuardPolicy) -> Self {
        self.call_guard = policy;
        self
    }

    /// Enable or disable recovery dispatch
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// All escalation steps in order
    pub fn steps(&self) -> &[RecoveryStep] {
        &self.steps
    }

    /// Step policy for an action; the baseline has none
    pub fn step(&self, action: RecoveryAction) -> Option<&RecoveryStep> {
        action.index().checked_sub(1).and_then(|i| self.steps.get(i))
    }

    /// Wait after `action` before the next re-evaluation
    ///
    /// At the baseline this is the first step's delay, used to re-check a
    /// stall that was held before anything was attempted.
    pub fn delay_for(&self, action: RecoveryAction) -> Duration {
        self.step(action)
            .or_else(|| self.steps.first())
            .map(|s| s.delay)
            .unwrap_or(DEFAULT_STEP_DELAY)
    }

    /// Whether `action` is omitted from escalation
    pub fn is_skipped(&self, action: RecoveryAction) -> bool {
        self.step(action).map(|s| s.skip).unwrap_or(false)
    }

    /// First non-skipped action strictly after `current`
    pub fn next_eligible_after(&self, current: RecoveryAction) -> Option<RecoveryAction> {
        let mut candidate = current.next();
        while let Some(action) = candidate {
            if !self.is_skipped(action) {
                return Some(action);
            }
            candidate = action.next();
        }
        None
    }

    /// Poor-signal threshold
    pub fn poor_signal_threshold(&self) -> SignalLevel {
        self.poor_signal_threshold
    }

    /// Call-guard scope
    pub fn call_guard(&self) -> CallGuardPolicy {
        self.call_guard
    }

    /// Whether recovery dispatch is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            steps: RecoveryAction::ALL[1..]
                .iter()
                .map(|&action| RecoveryStep {
                    action,
                    delay: DEFAULT_STEP_DELAY,
                    skip: false,
                })
                .collect(),
            poor_signal_threshold: SignalLevel(DEFAULT_POOR_SIGNAL_THRESHOLD),
            call_guard: CallGuardPolicy::default(),
            enabled: true,
        }
    }
}

impl TryFrom<RecoverySettings> for RecoveryConfig {
    type Error = RecoveryError;

    fn try_from(settings: RecoverySettings) -> Result<Self> {
        let delays = settings
            .delays_ms
            .into_iter()
            .map(Duration::from_millis)
            .collect();

        Ok(RecoveryConfig::new(delays, settings.skip)?
            .with_poor_signal_threshold(SignalLevel(settings.poor_signal_threshold))
            .with_call_guard(settings.call_guard)
            .with_enabled(settings.enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_rejects_empty_tables() {
        let err = RecoveryConfig::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, RecoveryError::Config { .. }));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let err = RecoveryConfig::new(vec![ms(1), ms(2), ms(3)], vec![false, false]).unwrap_err();
        assert!(err.to_string().contains("skip table has 2"));
    }

    #[test]
    fn test_rejects_wrong_step_count() {
        let err = RecoveryConfig::new(vec![ms(1), ms(2)], vec![false, false]).unwrap_err();
        assert!(matches!(err, RecoveryError::Config { .. }));
    }

    #[test]
    fn test_step_lookup() {
        let config = RecoveryConfig::new(vec![ms(10), ms(20), ms(30)], vec![false, true, false]).unwrap();

        assert_eq!(config.step(RecoveryAction::None), None);
        assert_eq!(config.delay_for(RecoveryAction::RadioPowerCycle), ms(20));
        assert_eq!(config.delay_for(RecoveryAction::None), ms(10));
        assert!(config.is_skipped(RecoveryAction::RadioPowerCycle));
        assert!(!config.is_skipped(RecoveryAction::ModemReboot));
    }

    #[test]
    fn test_next_eligible_skips_flagged_steps() {
        let config = RecoveryConfig::new(vec![ms(1); 3], vec![true, true, false]).unwrap();
        assert_eq!(
            config.next_eligible_after(RecoveryAction::None),
            Some(RecoveryAction::ModemReboot)
        );
        assert_eq!(config.next_eligible_after(RecoveryAction::ModemReboot), None);

        let all_skipped = RecoveryConfig::new(vec![ms(1); 3], vec![true; 3]).unwrap();
        assert_eq!(all_skipped.next_eligible_after(RecoveryAction::None), None);
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = RecoverySettings::from_toml_str(
            r#"
            delays_ms = [1000, 2000, 3000]
            skip = [false, true, false]
            poor_signal_threshold = 3
            call_guard = "beyond-first-step"
            "#,
        )
        .unwrap();

        assert!(settings.enabled);
        let config = settings.validate().unwrap();
        assert_eq!(config.delay_for(RecoveryAction::ModemReboot), ms(3000));
        assert_eq!(config.poor_signal_threshold(), SignalLevel(3));
        assert_eq!(config.call_guard(), CallGuardPolicy::BeyondFirstStep);
    }

    #[test]
    fn test_settings_defaults_validate() {
        let config = RecoverySettings::default().validate().unwrap();
        assert_eq!(config, RecoveryConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = RecoverySettings::from_toml_str("delays_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, RecoveryError::Config { .. }));
    }
}
