//! Simulated collaborators and the scenario runner

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use stallguard_recovery_core::{
    CallState, CallStateProvider, ControllerSnapshot, LocalConnectivityMonitor, RecoveryAction,
    RecoveryCallback, RecoveryController, RecoveryError, RecoveryEvent, RecoveryMetrics,
    RecoverySettings, Result, SignalLevel, SignalQualityProvider,
};

use crate::scenario::{Scenario, ScenarioStep};

/// Radio whose signal level and call state follow the scenario
#[derive(Debug)]
pub struct SimulatedRadio {
    level: AtomicU8,
    in_call: AtomicBool,
    signal_unavailable: AtomicBool,
}

impl SimulatedRadio {
    pub fn new(level: u8) -> Self {
        Self {
            level: AtomicU8::new(level),
            in_call: AtomicBool::new(false),
            signal_unavailable: AtomicBool::new(false),
        }
    }

    fn apply(&self, step: &ScenarioStep) {
        if let Some(level) = step.signal {
            self.level.store(level, Ordering::SeqCst);
        }
        if let Some(in_call) = step.in_call {
            self.in_call.store(in_call, Ordering::SeqCst);
        }
        if let Some(unavailable) = step.signal_unavailable {
            self.signal_unavailable.store(unavailable, Ordering::SeqCst);
        }
    }
}

impl SignalQualityProvider for SimulatedRadio {
    fn current_level(&self) -> Result<SignalLevel> {
        if self.signal_unavailable.load(Ordering::SeqCst) {
            return Err(RecoveryError::unavailable("signal", "simulated outage"));
        }
        Ok(SignalLevel(self.level.load(Ordering::SeqCst)))
    }
}

impl CallStateProvider for SimulatedRadio {
    fn current_state(&self) -> Result<CallState> {
        if self.in_call.load(Ordering::SeqCst) {
            Ok(CallState::Active)
        } else {
            Ok(CallState::Idle)
        }
    }
}

/// Callback that records what was dispatched and when
struct Recorder {
    started: Instant,
    dispatches: Mutex<Vec<(Duration, RecoveryAction)>>,
    failures: Mutex<Vec<String>>,
}

impl Recorder {
    async fn record(&self, action: RecoveryAction) -> Result<()> {
        let offset = self.started.elapsed();
        info!("[{:>8}ms] dispatch {}", offset.as_millis(), action);
        self.dispatches.lock().await.push((offset, action));
        Ok(())
    }
}

#[async_trait]
impl RecoveryCallback for Recorder {
    async fn reestablish_internet(&self) -> Result<()> {
        self.record(RecoveryAction::ReestablishInternet).await
    }

    async fn power_cycle_radio(&self) -> Result<()> {
        self.record(RecoveryAction::RadioPowerCycle).await
    }

    async fn reboot_modem(&self) -> Result<()> {
        self.record(RecoveryAction::ModemReboot).await
    }

    async fn on_failure(&self, error: RecoveryError) {
        warn!("Recovery failure: {}", error);
        self.failures.lock().await.push(error.to_string());
    }
}

/// Metrics sink that logs every event
struct LoggingMetrics;

impl RecoveryMetrics for LoggingMetrics {
    fn record(&self, event: &RecoveryEvent) -> Result<()> {
        info!(?event, "recovery event");
        Ok(())
    }
}

/// What happened during a scenario run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Dispatched actions with their offset from scenario start
    pub dispatches: Vec<(Duration, RecoveryAction)>,

    /// Failures surfaced through the callback
    pub failures: Vec<String>,

    /// Controller state when the run ended
    pub snapshot: ControllerSnapshot,
}

/// Play `scenario` against a controller running `policy`
pub async fn run(policy: &RecoverySettings, scenario: &Scenario) -> anyhow::Result<RunReport> {
    let started = Instant::now();
    let monitor = Arc::new(LocalConnectivityMonitor::new());
    let radio = Arc::new(SimulatedRadio::new(scenario.initial_signal));
    let recorder = Arc::new(Recorder {
        started,
        dispatches: Mutex::new(Vec::new()),
        failures: Mutex::new(Vec::new()),
    });

    let controller = RecoveryController::builder()
        .settings(policy)
        .monitor(monitor.clone())
        .signal_quality(radio.clone())
        .call_state(radio.clone())
        .callback(recorder.clone())
        .metrics(Arc::new(LoggingMetrics))
        .start()?;

    for step in &scenario.steps {
        time::sleep_until(started + step.at()).await;
        radio.apply(step);
        if let Some(valid) = step.validation {
            if monitor.set_validated(valid) == 0 {
                info!("Validation already {}, nothing to report", valid);
            }
        }
    }

    time::sleep_until(started + scenario.end()).await;
    let snapshot = controller.snapshot().await?;
    controller.shutdown().await?;

    let dispatches = recorder.dispatches.lock().await.clone();
    let failures = recorder.failures.lock().await.clone();
    Ok(RunReport {
        dispatches,
        failures,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn policy() -> RecoverySettings {
        RecoverySettings {
            delays_ms: vec![100, 100, 100],
            ..RecoverySettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_escalates_through_steps() {
        let scenario = Scenario::from_toml_str(
            r#"
            run_for_ms = 350

            [[step]]
            at_ms = 0
            validation = false
            "#,
        )
        .unwrap();

        let report = run(&policy(), &scenario).await.unwrap();
        let actions: Vec<_> = report.dispatches.iter().map(|(_, a)| *a).collect();
        assert_eq!(
            actions,
            vec![
                RecoveryAction::ReestablishInternet,
                RecoveryAction::RadioPowerCycle,
                RecoveryAction::ModemReboot,
                RecoveryAction::ModemReboot,
            ]
        );
        assert_eq!(report.snapshot.action, RecoveryAction::ModemReboot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_call_and_weak_signal() {
        let scenario = Scenario::from_toml_str(
            r#"
            run_for_ms = 500

            [[step]]
            at_ms = 0
            validation = false
            in_call = true

            [[step]]
            at_ms = 250
            signal = 1
            validation = true

            [[step]]
            at_ms = 260
            validation = false
            "#,
        )
        .unwrap();

        let report = run(&policy(), &scenario).await.unwrap();
        assert!(report.dispatches.is_empty());
        assert_eq!(report.snapshot.action, RecoveryAction::None);
        assert!(!report.snapshot.timer_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_invalid_policy_reports_failure() {
        let scenario = Scenario::from_toml_str(
            r#"
            run_for_ms = 300

            [[step]]
            at_ms = 0
            validation = false
            "#,
        )
        .unwrap();
        let policy = RecoverySettings {
            skip: vec![false],
            ..policy()
        };

        let report = run(&policy, &scenario).await.unwrap();
        assert!(report.dispatches.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(!report.snapshot.configured);
    }
}
