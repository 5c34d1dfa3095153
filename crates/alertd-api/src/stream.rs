//! Server-sent event stream with fixed-interval auto-reconnect.
//!
//! Connects to the hub's alert stream endpoint and forwards decoded
//! events, interleaved with connection status transitions, through a
//! single ordered [`tokio::sync::mpsc`] channel. There is exactly one
//! consumer per stream, so nothing is ever dropped for a slow reader.
//!
//! # Example
//!
//! ```rust,ignore
//! use alertd_api::stream::{EventStream, ReconnectConfig, StreamMessage};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let url = Url::parse("http://localhost:8080/api/alerts/stream")?;
//! let mut handle = EventStream::connect(reqwest::Client::new(), url, ReconnectConfig::default(), CancellationToken::new());
//!
//! while let Some(message) = handle.next().await {
//!     match message {
//!         StreamMessage::Status(status) => println!("stream is {status}"),
//!         StreamMessage::Event(event) => println!("{}: {}", event.event, event.data),
//!     }
//! }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::sse::{SseDecoder, SseFrame};

// ── Channel capacity ─────────────────────────────────────────────────

const STREAM_CHANNEL_CAPACITY: usize = 1024;

const LAST_EVENT_ID: &str = "Last-Event-ID";

// ── ConnectionStatus ─────────────────────────────────────────────────

/// Connection status of the event stream.
///
/// Walks `Disconnected → Connecting → Connected`, falling back to
/// `Disconnected` on any transport failure before trying again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
}

// ── StreamEvent ──────────────────────────────────────────────────────

/// A raw event received from the hub, stamped with its arrival time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    /// SSE event name, e.g. `"motion"` or `"tempAlarm"`.
    pub event: String,

    /// Raw `data:` payload, untouched.
    pub data: String,

    /// SSE `id:` value in effect for this event, if the hub sends ids.
    pub id: Option<String>,

    /// When the frame was decoded off the wire.
    pub received_at: DateTime<Utc>,
}

impl StreamEvent {
    /// Build an event by hand (tests, replay, diagnostics).
    pub fn new(event: impl Into<String>, data: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
            received_at,
        }
    }

    fn from_frame(frame: SseFrame, received_at: DateTime<Utc>) -> Self {
        Self {
            event: frame.event,
            data: frame.data,
            id: frame.id,
            received_at,
        }
    }
}

/// Everything the stream task reports, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Status(ConnectionStatus),
    Event(StreamEvent),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Reconnection policy: a fixed delay, retried forever.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay between a disconnect and the next attempt. Default: 5s.
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
        }
    }
}

// ── EventStream ──────────────────────────────────────────────────────

/// Entry point for opening the alert event stream.
pub struct EventStream;

impl EventStream {
    /// Spawn the background connection loop and return its handle.
    ///
    /// The first connection attempt happens asynchronously; the first
    /// message on the handle is always `Status(Connecting)`.
    pub fn connect(
        http: reqwest::Client,
        url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> EventStreamHandle {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            stream_loop(http, url, reconnect, tx, task_cancel).await;
        });

        EventStreamHandle { rx, cancel, task }
    }
}

/// Handle to a running event stream.
///
/// Dropping the handle closes the channel, which also ends the
/// background task at its next send.
pub struct EventStreamHandle {
    rx: mpsc::Receiver<StreamMessage>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventStreamHandle {
    /// Wait for the next status transition or event.
    ///
    /// Returns `None` once the background task has exited.
    pub async fn next(&mut self) -> Option<StreamMessage> {
        self.rx.recv().await
    }

    /// Signal the background task to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Shut down and wait for the background task to finish.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "event stream task ended abnormally");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connecting → read → on error, disconnected → wait → again.
async fn stream_loop(
    http: reqwest::Client,
    url: Url,
    reconnect: ReconnectConfig,
    tx: mpsc::Sender<StreamMessage>,
    cancel: CancellationToken,
) {
    let mut last_event_id: Option<String> = None;

    loop {
        if emit(&tx, ConnectionStatus::Connecting).await.is_err() {
            break;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = connect_and_read(&http, &url, &tx, &mut last_event_id) => {
                match result {
                    Ok(()) => tracing::info!("event stream ended, reconnecting"),
                    Err(Error::StreamClosed) => break,
                    Err(e) => tracing::warn!(
                        error = %e,
                        transient = e.is_transient(),
                        "event stream error"
                    ),
                }
            }
        }

        if emit(&tx, ConnectionStatus::Disconnected).await.is_err() {
            break;
        }

        tracing::info!(
            delay_ms = u64::try_from(reconnect.delay.as_millis()).unwrap_or(u64::MAX),
            "waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(reconnect.delay) => {}
        }
    }

    // Best effort: the receiver may already be gone.
    let _ = tx.try_send(StreamMessage::Status(ConnectionStatus::Disconnected));
    tracing::debug!("event stream loop exiting");
}

async fn emit(tx: &mpsc::Sender<StreamMessage>, status: ConnectionStatus) -> Result<(), Error> {
    tracing::debug!(%status, "event stream status");
    tx.send(StreamMessage::Status(status))
        .await
        .map_err(|_| Error::StreamClosed)
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Open one SSE connection and forward frames until it drops.
///
/// `Ok(())` means the hub ended the body cleanly; the caller treats
/// that exactly like an error and reconnects after the delay.
async fn connect_and_read(
    http: &reqwest::Client,
    url: &Url,
    tx: &mpsc::Sender<StreamMessage>,
    last_event_id: &mut Option<String>,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to event stream");

    let mut request = http
        .get(url.clone())
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache");
    if let Some(id) = last_event_id.as_deref() {
        request = request.header(LAST_EVENT_ID, id);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::StreamConnect(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::StreamConnect(format!("HTTP {status}")));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("text/event-stream") {
        tracing::warn!(content_type, "event stream has unexpected content type");
    }

    emit(tx, ConnectionStatus::Connected).await?;
    tracing::info!("event stream connected");

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(Error::Transport)?;
        let received_at = Utc::now();

        for frame in decoder.feed(&chunk) {
            tracing::trace!(event = %frame.event, "event stream frame");
            tx.send(StreamMessage::Event(StreamEvent::from_frame(frame, received_at)))
                .await
                .map_err(|_| Error::StreamClosed)?;
        }

        if let Some(id) = decoder.last_event_id() {
            *last_event_id = Some(id.to_owned());
        }
    }

    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_delay_is_five_seconds() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_secs(5));
    }

    #[test]
    fn connection_status_renders_lowercase() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionStatus::Connected.to_string(), "connected");
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "disconnected");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn connection_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
    }

    #[test]
    fn stream_event_keeps_frame_fields() {
        let now = Utc::now();
        let frame = SseFrame {
            event: "tempAlarm".into(),
            data: "{\"temp\": 31}".into(),
            id: Some("7".into()),
        };
        let event = StreamEvent::from_frame(frame, now);
        assert_eq!(event.event, "tempAlarm");
        assert_eq!(event.data, "{\"temp\": 31}");
        assert_eq!(event.id.as_deref(), Some("7"));
        assert_eq!(event.received_at, now);
    }

    #[tokio::test]
    async fn closed_receiver_ends_the_loop() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let url = Url::parse("http://127.0.0.1:9/api/alerts/stream").unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            stream_loop(
                reqwest::Client::new(),
                url,
                ReconnectConfig::default(),
                tx,
                CancellationToken::new(),
            ),
        )
        .await;
        assert!(result.is_ok(), "loop should exit once the receiver is gone");
    }
}
