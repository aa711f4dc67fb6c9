//! Queue-driven recovery controller
//!
//! All inputs (validation transitions, the escalation timer, policy reloads,
//! snapshot queries) are serialized through one command queue owned by a
//! single task. The escalation timer is a deadline polled by that same task,
//! so a re-check can never overtake a validation event queued before it, and
//! resetting the state machine cancels the timer by clearing the deadline.
//!
//! Recovery actions run on their own tasks. A reconnect or modem reboot can
//! take minutes; the queue keeps draining meanwhile and the action's result
//! comes back through the queue.

use std::future;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

use crate::action::RecoveryAction;
use crate::callback::{self, RecoveryCallback};
use crate::config::{RecoveryConfig, RecoverySettings};
use crate::error::{RecoveryError, Result};
use crate::events::{NoopMetrics, RecoveryEvent, RecoveryMetrics};
use crate::guard::{CallStateProvider, SignalQualityProvider};
use crate::machine::{ControllerSnapshot, Guards, Outcome, RecoveryStateMachine};
use crate::monitor::{ConnectivityMonitor, RegistrationId, ValidationSink};

/// Commands processed by the controller task
#[derive(Debug)]
pub(crate) enum Command {
    /// Validation status of the active data network changed
    Validation(bool),

    /// Replace the policy, or report why the replacement was rejected
    Reload(Result<RecoveryConfig>),

    /// A dispatched recovery action finished
    DispatchResult {
        action: RecoveryAction,
        result: Result<()>,
    },

    /// Report the current state
    Snapshot(oneshot::Sender<ControllerSnapshot>),

    /// Stop processing
    Shutdown(oneshot::Sender<()>),
}

/// Builder for [`RecoveryController`]
pub struct RecoveryControllerBuilder {
    config: Result<RecoveryConfig>,
    monitor: Option<Arc<dyn ConnectivityMonitor>>,
    signal: Option<Arc<dyn SignalQualityProvider>>,
    calls: Option<Arc<dyn CallStateProvider>>,
    callback: Option<Arc<dyn RecoveryCallback>>,
    metrics: Arc<dyn RecoveryMetrics>,
}

impl RecoveryControllerBuilder {
    fn new() -> Self {
        Self {
            config: Ok(RecoveryConfig::default()),
            monitor: None,
            signal: None,
            calls: None,
            callback: None,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Use a validated policy
    pub fn config(mut self, config: RecoveryConfig) -> Self {
        self.config = Ok(config);
        self
    }

    /// Use raw settings; invalid settings start the controller unconfigured
    pub fn settings(mut self, settings: &RecoverySettings) -> Self {
        self.config = settings.validate();
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn ConnectivityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn signal_quality(mut self, signal: Arc<dyn SignalQualityProvider>) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn call_state(mut self, calls: Arc<dyn CallStateProvider>) -> Self {
        self.calls = Some(calls);
        self
    }

    pub fn callback(mut self, callback: Arc<dyn RecoveryCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn RecoveryMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Spawn the controller task and register with the monitor
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<RecoveryController> {
        let monitor = self
            .monitor
            .ok_or_else(|| RecoveryError::config("connectivity monitor is required"))?;
        let signal = self
            .signal
            .ok_or_else(|| RecoveryError::config("signal quality provider is required"))?;
        let calls = self
            .calls
            .ok_or_else(|| RecoveryError::config("call state provider is required"))?;
        let callback = self
            .callback
            .ok_or_else(|| RecoveryError::config("recovery callback is required"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (machine, startup_error) = match self.config {
            Ok(config) => (RecoveryStateMachine::new(config), None),
            Err(e) => (RecoveryStateMachine::unconfigured(), Some(e)),
        };

        let worker = Worker {
            machine,
            deps: Collaborators {
                signal,
                calls,
                callback,
                metrics: self.metrics,
            },
            results: tx.downgrade(),
            in_flight: None,
        };
        let task = tokio::spawn(worker.run(rx, startup_error));

        let registration = match monitor.register(ValidationSink::new(tx.clone())) {
            Ok(id) => id,
            Err(e) => {
                task.abort();
                return Err(e);
            }
        };
        info!("Recovery controller started ({:?})", registration);

        Ok(RecoveryController {
            tx,
            task: Some(task),
            monitor,
            registration: Some(registration),
        })
    }
}

/// Data stall recovery controller
///
/// Owns the recovery state through a single background task. Dropping the
/// controller without calling [`shutdown`](Self::shutdown) un-registers from
/// the monitor and aborts the task.
pub struct RecoveryController {
    tx: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
    monitor: Arc<dyn ConnectivityMonitor>,
    registration: Option<RegistrationId>,
}

impl RecoveryController {
    pub fn builder() -> RecoveryControllerBuilder {
        RecoveryControllerBuilder::new()
    }

    /// Sink feeding this controller's queue, the same one the monitor holds
    pub fn validation_sink(&self) -> ValidationSink {
        ValidationSink::new(self.tx.clone())
    }

    /// Queue a validation transition
    pub fn on_validation_status_changed(&self, valid: bool) -> Result<()> {
        self.send(Command::Validation(valid))
    }

    /// Replace the policy with an already validated one
    pub fn reload_config(&self, config: RecoveryConfig) -> Result<()> {
        self.send(Command::Reload(Ok(config)))
    }

    /// Validate and apply new settings
    ///
    /// Invalid settings are rejected: the current policy stays in force, the
    /// rejection is reported to the callback and metrics, and the error is
    /// returned.
    pub fn reload_settings(&self, settings: &RecoverySettings) -> Result<()> {
        match settings.validate() {
            Ok(config) => self.reload_config(config),
            Err(e) => {
                self.send(Command::Reload(Err(e.clone())))?;
                Err(e)
            }
        }
    }

    /// Current state, answered in queue order
    pub async fn snapshot(&self) -> Result<ControllerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| RecoveryError::ControllerStopped)
    }

    /// Stop the controller and un-register from the monitor
    ///
    /// Commands queued before the call are processed first; the pending
    /// re-check, if any, is dropped. An action already running is left to
    /// finish and its result is discarded.
    pub async fn shutdown(mut self) -> Result<()> {
        self.unregister();

        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(reply)).is_ok() {
            let _ = rx.await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!("Recovery controller stopped");
        Ok(())
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| RecoveryError::ControllerStopped)
    }

    fn unregister(&mut self) {
        if let Some(id) = self.registration.take() {
            self.monitor.unregister(id);
        }
    }
}

impl Drop for RecoveryController {
    fn drop(&mut self) {
        self.unregister();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Collaborators {
    signal: Arc<dyn SignalQualityProvider>,
    calls: Arc<dyn CallStateProvider>,
    callback: Arc<dyn RecoveryCallback>,
    metrics: Arc<dyn RecoveryMetrics>,
}

impl Collaborators {
    fn guards(&self) -> Guards<'_> {
        Guards {
            signal: self.signal.as_ref(),
            calls: self.calls.as_ref(),
        }
    }

    fn record(&self, events: &[RecoveryEvent]) {
        for event in events {
            if let Err(e) = self.metrics.record(event) {
                warn!("Failed to record recovery event {:?}: {}", event, e);
            }
        }
    }

    fn notify(&self, error: RecoveryError) {
        let callback = self.callback.clone();
        tokio::spawn(async move {
            callback.on_failure(error).await;
        });
    }
}

struct Worker {
    machine: RecoveryStateMachine,
    deps: Collaborators,

    /// Route back into the queue for finished actions; weak so the queue
    /// still closes once every controller handle and sink is gone
    results: mpsc::WeakUnboundedSender<Command>,

    /// Most recently dispatched action and the task running it
    in_flight: Option<(RecoveryAction, JoinHandle<()>)>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>, startup_error: Option<RecoveryError>) {
        if let Some(e) = startup_error {
            error!("Recovery policy invalid, recovery will not escalate: {}", e);
            let outcome = self.machine.reject_config(e);
            self.apply(outcome);
        }

        loop {
            let deadline = self.machine.deadline();
            tokio::select! {
                biased;

                command = rx.recv() => {
                    let Some(command) = command else {
                        debug!("Recovery command queue closed");
                        break;
                    };
                    match command {
                        Command::Validation(valid) => {
                            debug!("Validation status changed: valid={}", valid);
                            let outcome = self.machine.on_validation(valid, Instant::now(), self.deps.guards());
                            self.apply(outcome);
                        }
                        Command::Reload(Ok(config)) => {
                            let outcome = self.machine.reload(config, Instant::now());
                            self.apply(outcome);
                        }
                        Command::Reload(Err(e)) => {
                            let outcome = self.machine.reject_config(e);
                            self.apply(outcome);
                        }
                        Command::DispatchResult { action, result: Ok(()) } => {
                            debug!("Recovery action {} completed", action);
                        }
                        Command::DispatchResult { action, result: Err(e) } => {
                            error!("Recovery action {} failed: {}", action, e);
                            let outcome = self.machine.dispatch_failed(action, e);
                            self.apply(outcome);
                        }
                        Command::Snapshot(reply) => {
                            let _ = reply.send(self.machine.snapshot());
                        }
                        Command::Shutdown(reply) => {
                            let _ = reply.send(());
                            break;
                        }
                    }
                }

                _ = sleep_until(deadline) => {
                    debug!("Recovery re-check due");
                    let outcome = self.machine.on_timer(Instant::now(), self.deps.guards());
                    self.apply(outcome);
                }
            }
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        let Outcome {
            dispatch,
            events,
            failure,
        } = outcome;

        self.deps.record(&events);

        if let Some(action) = dispatch {
            self.dispatch(action);
        }

        if let Some(e) = failure {
            self.deps.notify(e);
        }
    }

    fn dispatch(&mut self, action: RecoveryAction) {
        if let Some((running, task)) = &self.in_flight {
            if !task.is_finished() {
                warn!("Dispatching {} while {} is still running", action, running);
            }
        }

        info!("Dispatching recovery action {}", action);
        let handler = self.deps.callback.clone();
        let results = self.results.clone();
        let task = tokio::spawn(async move {
            let result = callback::dispatch(handler.as_ref(), action).await;
            if let Some(tx) = results.upgrade() {
                let _ = tx.send(Command::DispatchResult { action, result });
            }
        });
        self.in_flight = Some((action, task));
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending::<()>().await,
    }
}
