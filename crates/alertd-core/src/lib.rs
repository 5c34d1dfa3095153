//! Alert state engine between `alertd-api` and its consumers (CLI / UI).
//!
//! This crate owns the alert domain: turning a noisy, repeating and
//! possibly reordered event stream into clean, monotonic alert state.
//!
//! - **[`Engine`]**: central facade. [`start()`](Engine::start) opens the
//!   reconnecting event stream and routes events one at a time;
//!   [`acknowledge_temperature()`](Engine::acknowledge_temperature) and
//!   friends coordinate suppression with the hub.
//!
//! - **[`MotionMonitor`]** / **[`TemperatureMonitor`]**: the two state
//!   machines. Pure and synchronous; every transition takes its arrival
//!   time explicitly.
//!
//! - **[`AlertStream<T>`]**: subscription handle over a `watch` channel.
//!   Exposes `current()` / `latest()` / `changed()` for reactive rendering.
//!
//! - **[`parse_temperature`]**: forgiving extraction of a reading from
//!   numbers, JSON objects or free text.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod motion;
pub mod parse;
pub mod stream;
pub mod temperature;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_BASE_URL, EngineConfig, TlsVerification};
pub use engine::Engine;
pub use error::CoreError;
pub use event::AlertEventKind;
pub use model::{ConnectionStatus, MotionAlert, SuppressionState, TemperatureAlert};
pub use motion::MotionMonitor;
pub use parse::{parse_temperature, parse_temperature_text};
pub use stream::AlertStream;
pub use temperature::{DEFAULT_THRESHOLD, TemperatureMonitor, TemperatureOutcome};

pub use alertd_api::{Endpoints, StreamEvent};
