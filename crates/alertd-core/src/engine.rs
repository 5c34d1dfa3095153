// ── Alert engine ──
//
// Lifecycle management for one hub connection: the reconnecting event
// stream, serialized event routing into the two state machines, the
// acknowledge/resume commands and the auto-resume safety net.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use alertd_api::{
    AlertClient, ConnectionStatus, EventStream, EventStreamHandle, ReconnectConfig, StreamEvent,
    StreamMessage,
};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::event::AlertEventKind;
use crate::model::{MotionAlert, SuppressionState, TemperatureAlert};
use crate::motion::MotionMonitor;
use crate::stream::AlertStream;
use crate::temperature::{TemperatureMonitor, TemperatureOutcome};

// ── Engine ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<EngineInner>`. All state is owned here;
/// consumers get snapshots and [`AlertStream`] subscriptions.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: EngineConfig,
    client: AlertClient,
    stream_http: reqwest::Client,
    motion: Mutex<MotionMonitor>,
    temperature: Mutex<TemperatureMonitor>,
    motion_tx: watch::Sender<MotionAlert>,
    temperature_tx: watch::Sender<TemperatureAlert>,
    suppression_tx: watch::Sender<SuppressionState>,
    status_tx: watch::Sender<ConnectionStatus>,
    /// Fired only by [`Engine::shutdown`]; outlives stream restarts.
    cancel: CancellationToken,
    /// Child of `cancel`, replaced on every stop so the engine can restart.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    resume_task: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Create an engine from configuration. Does NOT connect:
    /// call [`start()`](Self::start) to open the event stream.
    pub fn new(config: EngineConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let client = AlertClient::new(config.base_url.clone(), config.endpoints.clone(), &transport)?;
        let stream_http = transport.build_stream_client()?;

        let (motion_tx, _) = watch::channel(MotionAlert::inactive());
        let (temperature_tx, _) = watch::channel(TemperatureAlert::default());
        let (suppression_tx, _) = watch::channel(SuppressionState::default());
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Ok(Self {
            inner: Arc::new(EngineInner {
                motion: Mutex::new(MotionMonitor::new()),
                temperature: Mutex::new(TemperatureMonitor::new(config.temperature_threshold)),
                config,
                client,
                stream_http,
                motion_tx,
                temperature_tx,
                suppression_tx,
                status_tx,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                resume_task: Mutex::new(None),
            }),
        })
    }

    /// Access the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the event stream and start routing events.
    ///
    /// Any stream already running is closed first. Reconnection after a
    /// failure is handled in the background until [`stop()`](Self::stop).
    pub async fn start(&self) -> Result<(), CoreError> {
        self.stop().await;

        let url = self.inner.client.stream_url()?;
        let cancel = self.inner.cancel_child.lock().await.clone();
        let reconnect = ReconnectConfig {
            delay: self.inner.config.reconnect_delay,
        };

        let handle = EventStream::connect(
            self.inner.stream_http.clone(),
            url.clone(),
            reconnect,
            cancel.clone(),
        );

        let engine = self.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(stream_task(engine, handle, cancel)));

        info!(%url, "alert engine started");
        Ok(())
    }

    /// Close the event stream.
    ///
    /// A pending auto-resume keeps running: restarting the stream must not
    /// leave temperature alarms suppressed.
    pub async fn stop(&self) {
        {
            let mut child = self.inner.cancel_child.lock().await;
            child.cancel();
            *child = self.inner.cancel.child_token();
        }

        let handles: Vec<_> = self.inner.task_handles.lock().await.drain(..).collect();
        let was_running = !handles.is_empty();
        for handle in handles {
            let _ = handle.await;
        }

        self.publish_status(ConnectionStatus::Disconnected);
        if was_running {
            debug!("alert engine stopped");
        }
    }

    /// Stop for good: close the stream and drop any pending auto-resume.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.stop().await;

        let resume = self.inner.resume_task.lock().await.take();
        if let Some(task) = resume {
            let _ = task.await;
        }
        debug!("alert engine shut down");
    }

    // ── Event routing ────────────────────────────────────────────

    /// Route one stream event to its state machine.
    ///
    /// Events are applied one at a time; subscribers are notified after
    /// each accepted transition, while the domain lock is still held.
    pub async fn dispatch(&self, event: &StreamEvent) {
        let Some(kind) = AlertEventKind::from_name(&event.event) else {
            trace!(event = %event.event, "ignoring unrecognised event category");
            return;
        };

        match kind {
            AlertEventKind::Motion => {
                let mut motion = self.inner.motion.lock().await;
                if let Some(alert) = motion.handle_motion(&event.data, event.received_at) {
                    debug!(scope = %alert.scope, active = alert.is_active, "motion update");
                    self.inner.motion_tx.send_replace(alert);
                }
            }
            AlertEventKind::AlarmCleared => {
                let mut motion = self.inner.motion.lock().await;
                let alert = motion.handle_cleared(&event.data);
                info!(scope = %event.data, "motion alarm cleared by hub");
                self.inner.motion_tx.send_replace(alert);
            }
            AlertEventKind::Temperature | AlertEventKind::TempAlarm => {
                let mut temperature = self.inner.temperature.lock().await;
                let outcome = temperature.handle_reading(&event.data, event.received_at);
                log_outcome(kind, outcome, &temperature);
                self.publish_temperature(&temperature);
            }
            AlertEventKind::TempCleared => {
                let mut temperature = self.inner.temperature.lock().await;
                temperature.handle_cleared();
                info!("temperature alarm cleared by hub");
                self.publish_temperature(&temperature);
            }
            AlertEventKind::TempResume => {
                let mut temperature = self.inner.temperature.lock().await;
                temperature.handle_resume();
                info!("temperature monitoring resumed by hub");
                self.publish_temperature(&temperature);
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Acknowledge the motion alarm on the hub, then clear it locally.
    ///
    /// On failure the local alert is left as it was.
    pub async fn acknowledge_motion(&self) -> Result<(), CoreError> {
        if let Err(e) = self.inner.client.acknowledge_motion().await {
            return Err(command_failed(e, "motion acknowledgment failed"));
        }

        let mut motion = self.inner.motion.lock().await;
        self.inner.motion_tx.send_replace(motion.clear());
        info!("motion alarm acknowledged");
        Ok(())
    }

    /// Acknowledge the temperature alarm.
    ///
    /// Suppression and the acknowledgment fence are applied before the
    /// request is sent and are not rolled back if it fails. After a
    /// successful request, an auto-resume is scheduled when enabled.
    pub async fn acknowledge_temperature(&self) -> Result<(), CoreError> {
        let epoch = {
            let mut temperature = self.inner.temperature.lock().await;
            let epoch = temperature.acknowledge(Utc::now());
            self.publish_temperature(&temperature);
            epoch
        };
        debug!(epoch, "temperature alarm suppressed locally");

        if let Err(e) = self.inner.client.acknowledge_temperature().await {
            return Err(command_failed(
                e,
                "temperature acknowledgment failed; staying suppressed",
            ));
        }
        info!("temperature alarm acknowledged");

        if self.inner.config.auto_resume {
            self.schedule_auto_resume(epoch).await;
        }
        Ok(())
    }

    /// Ask the hub to resume temperature monitoring.
    ///
    /// Suppression is lifted only once the hub accepts the request.
    pub async fn resume_temperature(&self) -> Result<(), CoreError> {
        if let Err(e) = self.inner.client.resume_temperature().await {
            return Err(command_failed(e, "temperature resume failed; staying suppressed"));
        }

        let mut temperature = self.inner.temperature.lock().await;
        temperature.handle_resume();
        self.publish_temperature(&temperature);
        info!("temperature monitoring resumed");
        Ok(())
    }

    /// Wait for a scheduled auto-resume, if any, to finish.
    pub async fn wait_auto_resume(&self) {
        let task = self.inner.resume_task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Drop the motion alert locally without contacting the hub.
    pub async fn clear_local_motion(&self) {
        let mut motion = self.inner.motion.lock().await;
        self.inner.motion_tx.send_replace(motion.clear());
        debug!("motion alert cleared locally");
    }

    /// Raise a temperature alarm immediately, bypassing every gate.
    pub async fn force_temperature_alarm(&self, temp: f64) {
        let mut temperature = self.inner.temperature.lock().await;
        temperature.force_alarm(temp, Utc::now());
        warn!(temp, "temperature alarm forced");
        self.publish_temperature(&temperature);
    }

    // ── State accessors ──────────────────────────────────────────

    pub fn motion_snapshot(&self) -> MotionAlert {
        self.inner.motion_tx.borrow().clone()
    }

    pub fn temperature_snapshot(&self) -> TemperatureAlert {
        self.inner.temperature_tx.borrow().clone()
    }

    pub fn suppression_snapshot(&self) -> SuppressionState {
        *self.inner.suppression_tx.borrow()
    }

    pub fn connection_status_snapshot(&self) -> ConnectionStatus {
        *self.inner.status_tx.borrow()
    }

    pub fn is_temperature_suppressed(&self) -> bool {
        self.inner.suppression_tx.borrow().suppressed
    }

    pub fn last_acknowledged(&self) -> Option<DateTime<Utc>> {
        self.inner.suppression_tx.borrow().last_acknowledged
    }

    // ── Subscriptions ────────────────────────────────────────────

    pub fn motion_alert(&self) -> AlertStream<MotionAlert> {
        AlertStream::new(self.inner.motion_tx.subscribe())
    }

    pub fn temperature_alert(&self) -> AlertStream<TemperatureAlert> {
        AlertStream::new(self.inner.temperature_tx.subscribe())
    }

    pub fn temperature_suppressed(&self) -> AlertStream<SuppressionState> {
        AlertStream::new(self.inner.suppression_tx.subscribe())
    }

    pub fn connection_status(&self) -> AlertStream<ConnectionStatus> {
        AlertStream::new(self.inner.status_tx.subscribe())
    }

    // ── Internals ────────────────────────────────────────────────

    fn publish_temperature(&self, monitor: &TemperatureMonitor) {
        self.inner.temperature_tx.send_replace(monitor.alert().clone());
        self.inner.suppression_tx.send_replace(monitor.suppression());
    }

    fn publish_status(&self, status: ConnectionStatus) {
        let previous = self.inner.status_tx.send_replace(status);
        if previous != status {
            info!(%status, "connection status changed");
        }
    }

    async fn schedule_auto_resume(&self, epoch: u64) {
        let engine = self.clone();
        let delay = self.inner.config.resume_delay;
        let cancel = self.inner.cancel.clone();

        let task = tokio::spawn(auto_resume_task(engine, epoch, delay, cancel));
        if let Some(previous) = self.inner.resume_task.lock().await.replace(task) {
            previous.abort();
        }
    }
}

/// Log a failed hub command and convert it for the caller.
fn command_failed(err: alertd_api::Error, context: &'static str) -> CoreError {
    let status = err.status();
    let err = CoreError::from(err);
    warn!(error = %err, ?status, transient = err.is_transient(), "{context}");
    err
}

fn log_outcome(kind: AlertEventKind, outcome: TemperatureOutcome, monitor: &TemperatureMonitor) {
    let temp = monitor.alert().temp;
    match outcome {
        TemperatureOutcome::Raised => {
            info!(%kind, ?temp, threshold = monitor.threshold(), "temperature alarm raised");
        }
        TemperatureOutcome::Fenced
        | TemperatureOutcome::Suppressed
        | TemperatureOutcome::AlreadyActive => {
            debug!(%kind, %outcome, ?temp, "temperature alarm gated");
        }
        _ => trace!(%kind, %outcome, ?temp, "temperature reading"),
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Forward stream status and events into the engine until cancelled.
async fn stream_task(engine: Engine, mut handle: EventStreamHandle, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            message = handle.next() => match message {
                Some(StreamMessage::Status(status)) => engine.publish_status(status),
                Some(StreamMessage::Event(event)) => engine.dispatch(&event).await,
                None => break,
            },
        }
    }

    handle.close().await;
    engine.publish_status(ConnectionStatus::Disconnected);
    debug!("stream task exiting");
}

/// Lift suppression after `delay` unless the hub (or a newer
/// acknowledgment) got there first.
async fn auto_resume_task(engine: Engine, epoch: u64, delay: Duration, cancel: CancellationToken) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        () = tokio::time::sleep(delay) => {}
    }

    let due = engine.inner.temperature.lock().await.resume_pending(epoch);
    if !due {
        debug!(epoch, "auto-resume skipped; suppression already lifted or superseded");
        return;
    }

    info!(epoch, "auto-resuming temperature monitoring");
    if let Err(e) = engine.inner.client.resume_temperature().await {
        command_failed(e, "auto-resume failed; temperature alarms stay suppressed");
        return;
    }

    // A newer acknowledgment may have landed while the request was in flight.
    let mut temperature = engine.inner.temperature.lock().await;
    if temperature.resume_if(epoch) {
        engine.publish_temperature(&temperature);
        info!(epoch, "temperature monitoring resumed");
    } else {
        debug!(epoch, "auto-resume superseded while in flight; staying suppressed");
    }
}
