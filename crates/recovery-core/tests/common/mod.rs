//! Shared fakes for controller integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use stallguard_recovery_core::{
    CallState, CallStateProvider, LocalConnectivityMonitor, RecoveryAction, RecoveryCallback,
    RecoveryConfig, RecoveryController, RecoveryError, RecoveryEvent, RecoveryMetrics, Result,
    SignalLevel, SignalQualityProvider,
};

pub const STEP: Duration = Duration::from_secs(60);

/// Signal and call state the test can change between events
pub struct FakeRadio {
    level: AtomicU8,
    call: Mutex<CallState>,
    signal_unavailable: AtomicBool,
}

impl FakeRadio {
    pub fn new() -> Self {
        Self {
            level: AtomicU8::new(4),
            call: Mutex::new(CallState::Idle),
            signal_unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_level(&self, level: u8) {
        self.level.store(level, Ordering::SeqCst);
    }

    pub fn set_call(&self, state: CallState) {
        *self.call.lock() = state;
    }

    pub fn set_signal_unavailable(&self, unavailable: bool) {
        self.signal_unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl SignalQualityProvider for FakeRadio {
    fn current_level(&self) -> Result<SignalLevel> {
        if self.signal_unavailable.load(Ordering::SeqCst) {
            return Err(RecoveryError::unavailable("signal", "radio not responding"));
        }
        Ok(SignalLevel(self.level.load(Ordering::SeqCst)))
    }
}

impl CallStateProvider for FakeRadio {
    fn current_state(&self) -> Result<CallState> {
        Ok(*self.call.lock())
    }
}

/// Records every dispatched action and surfaced failure
#[derive(Default)]
pub struct RecordingCallback {
    dispatched: Mutex<Vec<RecoveryAction>>,
    failures: Mutex<Vec<RecoveryError>>,
    reject: AtomicBool,
    busy_for: Mutex<Option<Duration>>,
}

impl RecordingCallback {
    pub fn dispatched(&self) -> Vec<RecoveryAction> {
        self.dispatched.lock().clone()
    }

    pub fn failures(&self) -> Vec<RecoveryError> {
        self.failures.lock().clone()
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Make every later action take `d` before it completes
    pub fn set_busy_for(&self, d: Duration) {
        *self.busy_for.lock() = Some(d);
    }

    async fn perform(&self, action: RecoveryAction) -> Result<()> {
        self.dispatched.lock().push(action);
        let busy_for = *self.busy_for.lock();
        if let Some(d) = busy_for {
            tokio::time::sleep(d).await;
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(RecoveryError::dispatch(action, "radio busy"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecoveryCallback for RecordingCallback {
    async fn reestablish_internet(&self) -> Result<()> {
        self.perform(RecoveryAction::ReestablishInternet).await
    }

    async fn power_cycle_radio(&self) -> Result<()> {
        self.perform(RecoveryAction::RadioPowerCycle).await
    }

    async fn reboot_modem(&self) -> Result<()> {
        self.perform(RecoveryAction::ModemReboot).await
    }

    async fn on_failure(&self, error: RecoveryError) {
        self.failures.lock().push(error);
    }
}

/// Collects events; optionally fails every delivery
#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<RecoveryEvent>>,
    broken: AtomicBool,
}

impl RecordingMetrics {
    pub fn broken() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            broken: AtomicBool::new(true),
        }
    }

    pub fn events(&self) -> Vec<RecoveryEvent> {
        self.events.lock().clone()
    }
}

impl RecoveryMetrics for RecordingMetrics {
    fn record(&self, event: &RecoveryEvent) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RecoveryError::unavailable("metrics", "exporter down"));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

pub struct Fixture {
    pub controller: RecoveryController,
    pub monitor: Arc<LocalConnectivityMonitor>,
    pub radio: Arc<FakeRadio>,
    pub callback: Arc<RecordingCallback>,
    pub metrics: Arc<RecordingMetrics>,
}

impl Fixture {
    pub fn start(config: RecoveryConfig) -> Self {
        Self::start_with_metrics(config, Arc::new(RecordingMetrics::default()))
    }

    pub fn start_with_metrics(config: RecoveryConfig, metrics: Arc<RecordingMetrics>) -> Self {
        let monitor = Arc::new(LocalConnectivityMonitor::new());
        let radio = Arc::new(FakeRadio::new());
        let callback = Arc::new(RecordingCallback::default());

        let controller = RecoveryController::builder()
            .config(config)
            .monitor(monitor.clone())
            .signal_quality(radio.clone())
            .call_state(radio.clone())
            .callback(callback.clone())
            .metrics(metrics.clone())
            .start()
            .expect("controller should start");

        Self {
            controller,
            monitor,
            radio,
            callback,
            metrics,
        }
    }

    /// Push a not-valid report straight into the queue, bypassing the
    /// monitor's transition filter
    pub fn not_valid(&self) {
        self.controller
            .on_validation_status_changed(false)
            .expect("controller running");
    }

    /// Let the controller drain its queue and fire anything due within `d`
    pub async fn settle(&self, d: Duration) {
        tokio::time::sleep(d).await;
        self.controller.snapshot().await.expect("controller running");
    }

    pub async fn action(&self) -> RecoveryAction {
        self.controller.snapshot().await.expect("controller running").action
    }
}

pub fn uniform_config() -> RecoveryConfig {
    RecoveryConfig::new(vec![STEP; 3], vec![false; 3]).expect("valid config")
}

/// Just past one step delay
pub fn past_step() -> Duration {
    STEP + Duration::from_millis(1)
}
