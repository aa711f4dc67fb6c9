//! Recovery state machine
//!
//! Pure decision logic with no runtime attached: callers feed it validation
//! transitions, timer expiries and policy reloads together with the current
//! time, and it answers with the action to dispatch (if any) and the events
//! to report. The pending re-check is kept as a deadline that the owning
//! queue turns into a timer.
//!
//! States are `Healthy` (action [`RecoveryAction::None`]) and
//! `Attempting(k)`. From healthy a failed validation with passing guards
//! dispatches the first eligible step immediately; each later step needs the
//! previous step's delay to elapse. Weak signal always drops back to
//! healthy, an active call holds in place, and a successful validation ends
//! the episode.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::action::RecoveryAction;
use crate::config::RecoveryConfig;
use crate::error::RecoveryError;
use crate::events::{HoldReason, RecoveryEvent, ResetReason};
use crate::guard::{self, CallStateProvider, GuardVerdict, SignalLevel, SignalQualityProvider};

/// Guard collaborators borrowed for one decision
#[derive(Clone, Copy)]
pub struct Guards<'a> {
    pub signal: &'a dyn SignalQualityProvider,
    pub calls: &'a dyn CallStateProvider,
}

/// Mutable core of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    /// Last action attempted in the current episode
    pub action: RecoveryAction,

    /// Last validation status reported by the monitor
    pub validated: bool,

    /// When the pending re-check is due
    pub deadline: Option<Instant>,

    /// When the current stall episode began
    pub episode_started: Option<Instant>,

    /// When the current action was dispatched
    pub last_action_at: Option<Instant>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            action: RecoveryAction::None,
            validated: true,
            deadline: None,
            episode_started: None,
            last_action_at: None,
        }
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub action: RecoveryAction,
    pub timer_pending: bool,
    pub validated: bool,
    pub episode_started: Option<Instant>,
    pub configured: bool,
}

/// Result of feeding one input to the state machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Action to hand to the recovery callback
    pub dispatch: Option<RecoveryAction>,

    /// Events for the metrics collaborator
    pub events: Vec<RecoveryEvent>,

    /// Failure to surface through the recovery callback
    pub failure: Option<RecoveryError>,
}

impl Outcome {
    fn event(mut self, event: RecoveryEvent) -> Self {
        self.events.push(event);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Validation,
    Timer,
}

/// Escalation state machine over a validated policy
#[derive(Debug, Clone)]
pub struct RecoveryStateMachine {
    config: Option<RecoveryConfig>,
    state: ControllerState,
}

impl RecoveryStateMachine {
    /// Start healthy with a valid policy
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config: Some(config),
            state: ControllerState::default(),
        }
    }

    /// Start without a usable policy; nothing escalates past the baseline
    /// until a valid one is loaded
    pub fn unconfigured() -> Self {
        Self {
            config: None,
            state: ControllerState::default(),
        }
    }

    /// Current state
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Current action
    pub fn action(&self) -> RecoveryAction {
        self.state.action
    }

    /// Active policy, if one is loaded
    pub fn config(&self) -> Option<&RecoveryConfig> {
        self.config.as_ref()
    }

    /// When the pending re-check is due
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            action: self.state.action,
            timer_pending: self.state.deadline.is_some(),
            validated: self.state.validated,
            episode_started: self.state.episode_started,
            configured: self.config.is_some(),
        }
    }

    /// Feed a validation transition
    pub fn on_validation(&mut self, valid: bool, now: Instant, guards: Guards<'_>) -> Outcome {
        self.state.validated = valid;
        if valid {
            self.recovered(now)
        } else {
            self.evaluate(Trigger::Validation, now, guards)
        }
    }

    /// Feed a timer expiry; ignored unless the deadline has passed
    pub fn on_timer(&mut self, now: Instant, guards: Guards<'_>) -> Outcome {
        match self.state.deadline {
            Some(deadline) if deadline <= now => {}
            _ => return Outcome::default(),
        }
        self.state.deadline = None;

        if self.state.validated {
            return Outcome::default();
        }
        self.evaluate(Trigger::Timer, now, guards)
    }

    /// Replace the policy wholesale
    ///
    /// An episode in progress is reset; if the network is still not
    /// validated a re-check is armed so the stall is re-evaluated under the
    /// new policy.
    pub fn reload(&mut self, config: RecoveryConfig, now: Instant) -> Outcome {
        info!("Recovery policy reloaded");
        let mut outcome = Outcome::default();
        if !self.state.action.is_none() || self.state.episode_started.is_some() {
            outcome = self.reset(ResetReason::Reconfigured, None, now);
        }

        self.state.deadline = None;
        if !self.state.validated && config.is_enabled() {
            self.state.deadline = Some(now + config.delay_for(RecoveryAction::None));
        }
        self.config = Some(config);
        outcome
    }

    /// Record a rejected policy; the current one stays in force
    pub fn reject_config(&mut self, error: RecoveryError) -> Outcome {
        warn!("Rejected recovery policy: {}", error);
        Outcome {
            dispatch: None,
            events: vec![RecoveryEvent::ConfigRejected {
                message: error.to_string(),
            }],
            failure: Some(error),
        }
    }

    /// Record that the callback could not perform `action`
    ///
    /// The step still counts as attempted; the next re-check escalates per
    /// normal policy.
    pub fn dispatch_failed(&mut self, action: RecoveryAction, error: RecoveryError) -> Outcome {
        Outcome {
            dispatch: None,
            events: vec![RecoveryEvent::DispatchFailed {
                action,
                reason: error.to_string(),
            }],
            failure: Some(error),
        }
    }

    fn evaluate(&mut self, trigger: Trigger, now: Instant, guards: Guards<'_>) -> Outcome {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => {
                debug!("No valid recovery policy, staying at baseline");
                return Outcome::default();
            }
        };
        if !config.is_enabled() {
            debug!("Recovery disabled, ignoring failed validation");
            return Outcome::default();
        }

        if config.next_eligible_after(RecoveryAction::None).is_none() {
            warn!("Every recovery step is skipped, nothing to dispatch");
            return Outcome::default();
        }

        let current = self.state.action;
        let verdict = guard::evaluate(&config, guards.signal, guards.calls, current.is_none());

        // weak signal before anything was attempted never opens an episode
        if let GuardVerdict::WeakSignal(level) = verdict {
            if current.is_none() && self.state.episode_started.is_none() {
                debug!("Signal level {} too weak to start recovery", level);
                self.state.deadline = None;
                return Outcome::default();
            }
        }

        let mut outcome = Outcome::default();
        if self.state.episode_started.is_none() {
            self.state.episode_started = Some(now);
            outcome = outcome.event(RecoveryEvent::EpisodeStarted);
        }

        match verdict {
            GuardVerdict::Proceed => {}
            GuardVerdict::WeakSignal(level) => {
                let reset = self.reset(ResetReason::WeakSignal, Some(level), now);
                outcome.events.extend(reset.events);
                return outcome;
            }
            GuardVerdict::InCall(state) => {
                return self.hold(outcome, &config, HoldReason::InCall(state), now);
            }
            GuardVerdict::Unavailable(_) => {
                return self.hold(outcome, &config, HoldReason::GuardUnavailable, now);
            }
        }

        if !current.is_none() && trigger == Trigger::Validation && !self.step_elapsed(&config, now) {
            debug!("Waiting for {} delay before escalating", current);
            return outcome;
        }

        let target = config.next_eligible_after(current).unwrap_or(current);

        info!("Data stall recovery: {} -> {}", current, target);
        self.state.action = target;
        self.state.last_action_at = Some(now);
        self.state.deadline = Some(now + config.delay_for(target));
        outcome.dispatch = Some(target);
        outcome.event(RecoveryEvent::ActionDispatched { action: target })
    }

    fn step_elapsed(&self, config: &RecoveryConfig, now: Instant) -> bool {
        if let Some(deadline) = self.state.deadline {
            return deadline <= now;
        }
        match self.state.last_action_at {
            Some(at) => now.saturating_duration_since(at) >= config.delay_for(self.state.action),
            None => true,
        }
    }

    fn hold(&mut self, mut outcome: Outcome, config: &RecoveryConfig, reason: HoldReason, now: Instant) -> Outcome {
        let action = self.state.action;
        let disruptive = config
            .next_eligible_after(action)
            .map(|next| next.is_radio_disruptive())
            .unwrap_or(action.is_radio_disruptive());
        warn!(
            "Holding data stall recovery at {} (radio disruptive next: {}): {:?}",
            action, disruptive, reason
        );
        let pending = matches!(self.state.deadline, Some(deadline) if deadline > now);
        if !pending {
            self.state.deadline = Some(now + config.delay_for(action));
        }
        outcome.events.push(RecoveryEvent::Held { action, reason });
        outcome
    }

    fn recovered(&mut self, now: Instant) -> Outcome {
        if self.state.action.is_none() && self.state.episode_started.is_none() {
            self.state.deadline = None;
            return Outcome::default();
        }
        self.reset(ResetReason::Recovered, None, now)
    }

    fn reset(&mut self, reason: ResetReason, signal: Option<SignalLevel>, now: Instant) -> Outcome {
        let from = self.state.action;
        let episode = self
            .state
            .episode_started
            .map(|started| now.saturating_duration_since(started));

        info!("Data stall recovery reset from {} ({})", from, reason);
        self.state.action = RecoveryAction::None;
        self.state.deadline = None;
        self.state.episode_started = None;
        self.state.last_action_at = None;

        Outcome::default().event(RecoveryEvent::Reset {
            from,
            reason,
            episode,
            signal,
        })
    }
}
