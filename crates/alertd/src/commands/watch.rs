//! `alertd watch`: follow the hub's event stream and print alarm state
//! changes as they are published.

use std::future::Future;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, warn};

use alertd_core::{
    AlertStream, ConnectionStatus, Engine, MotionAlert, SuppressionState, TemperatureAlert,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Tone, paint};

use super::util;

/// One published change, tagged by the subscription it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Update {
    Motion { alert: MotionAlert },
    Temperature { alert: TemperatureAlert },
    Suppression { state: SuppressionState },
    Connection { status: ConnectionStatus },
}

impl Update {
    /// Whether this update reports an active alarm.
    pub fn is_alarm(&self) -> bool {
        match self {
            Self::Motion { alert } => alert.is_active,
            Self::Temperature { alert } => alert.is_active,
            Self::Suppression { .. } | Self::Connection { .. } => false,
        }
    }
}

/// Subscriptions taken before the stream starts, so no early
/// transition is missed.
struct Subscriptions {
    motion: AlertStream<MotionAlert>,
    temperature: AlertStream<TemperatureAlert>,
    suppression: AlertStream<SuppressionState>,
    connection: AlertStream<ConnectionStatus>,
}

impl Subscriptions {
    fn take(engine: &Engine) -> Self {
        Self {
            motion: engine.motion_alert(),
            temperature: engine.temperature_alert(),
            suppression: engine.temperature_suppressed(),
            connection: engine.connection_status(),
        }
    }
}

pub async fn handle(engine: &Engine, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let subscriptions = Subscriptions::take(engine);

    engine.start().await?;
    output::print_status(
        &format!("Watching {} (Ctrl-C to stop)", engine.config().base_url),
        global.quiet,
    );

    let result = watch_loop(subscriptions, args, global, interrupted()).await;
    engine.shutdown().await;
    result
}

/// Resolves on the first Ctrl-C. Never resolves if the handler cannot
/// be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn watch_loop(
    subscriptions: Subscriptions,
    args: &WatchArgs,
    global: &GlobalOpts,
    shutdown: impl Future<Output = ()>,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let Subscriptions {
        mut motion,
        mut temperature,
        mut suppression,
        mut connection,
    } = subscriptions;

    // Every reading republishes both values; only print real changes.
    let mut last_temperature = temperature.current().clone();
    let mut last_suppression = *suppression.current();

    // One listener for the whole session, so a signal between two
    // updates is not lost.
    tokio::pin!(shutdown);

    loop {
        let update = tokio::select! {
            () = &mut shutdown => {
                debug!("interrupted, stopping watch");
                return Ok(());
            }
            Some(alert) = motion.changed() => Update::Motion { alert },
            Some(alert) = temperature.changed() => {
                if alert == last_temperature {
                    continue;
                }
                last_temperature = alert.clone();
                Update::Temperature { alert }
            }
            Some(state) = suppression.changed() => {
                if state == last_suppression {
                    continue;
                }
                last_suppression = state;
                Update::Suppression { state }
            }
            Some(status) = connection.changed() => {
                if !args.show_connection {
                    debug!(%status, "connection status changed");
                    continue;
                }
                Update::Connection { status }
            }
            else => return Ok(()),
        };

        let rendered = render_update(&global.output, &update, color)?;
        output::print_output(&rendered, global.quiet);

        if args.until_alarm && update.is_alarm() {
            return Ok(());
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────

pub fn render_update(format: &OutputFormat, update: &Update, color: bool) -> Result<String, CliError> {
    output::render_single(format, update, |u| detail_line(u, color), plain_line)
}

fn detail_line(update: &Update, color: bool) -> String {
    let now = Local::now().format("%H:%M:%S");
    let (label, state, detail) = match update {
        Update::Motion { alert } if alert.is_active => (
            "MOTION",
            paint("ALARM", Tone::Alarm, color),
            format!("{} since {}", alert.scope, util::clock(alert.timestamp)),
        ),
        Update::Motion { .. } => ("MOTION", paint("clear", Tone::Ok, color), String::new()),
        Update::Temperature { alert } if alert.is_active => (
            "TEMPERATURE",
            paint("ALARM", Tone::Alarm, color),
            format!("{} since {}", util::reading(alert.temp), util::clock(alert.timestamp)),
        ),
        Update::Temperature { alert } => (
            "TEMPERATURE",
            paint("idle", Tone::Ok, color),
            util::reading(alert.temp),
        ),
        Update::Suppression { state } if state.suppressed => (
            "SUPPRESSION",
            paint("on", Tone::Warn, color),
            format!("acknowledged {}", util::clock(state.last_acknowledged)),
        ),
        Update::Suppression { .. } => ("SUPPRESSION", paint("off", Tone::Muted, color), String::new()),
        Update::Connection { status } => {
            let tone = match status {
                ConnectionStatus::Connected => Tone::Ok,
                ConnectionStatus::Connecting => Tone::Warn,
                ConnectionStatus::Disconnected => Tone::Alarm,
            };
            ("CONNECTION", paint(&status.to_string(), tone, color), String::new())
        }
    };

    format!("{now}  {label:<12} {state}  {detail}").trim_end().to_owned()
}

fn plain_line(update: &Update) -> String {
    match update {
        Update::Motion { alert } if alert.is_active => format!("motion active {}", alert.scope),
        Update::Motion { .. } => "motion clear".into(),
        Update::Temperature { alert } => format!(
            "temperature {} {}",
            if alert.is_active { "active" } else { "idle" },
            alert.temp.map_or_else(|| "-".into(), |t| t.to_string())
        ),
        Update::Suppression { state } => {
            format!("suppression {}", if state.suppressed { "on" } else { "off" })
        }
        Update::Connection { status } => format!("connection {status}"),
    }
}
