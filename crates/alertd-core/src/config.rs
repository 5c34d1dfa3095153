// ── Runtime engine configuration ──
//
// Describes *where* the hub lives and how the engine behaves. Never
// touches disk: the CLI builds an `EngineConfig` from its profile and
// hands it in.

use std::path::PathBuf;
use std::time::Duration;

use alertd_api::{Endpoints, TlsMode, TransportConfig};
use url::Url;

use crate::temperature::DEFAULT_THRESHOLD;

/// Default hub address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed hubs).
    DangerAcceptInvalid,
}

/// Configuration for one alert hub.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hub root URL (e.g. `http://localhost:8080`).
    pub base_url: Url,
    /// Stream and command paths, relative to `base_url`.
    pub endpoints: Endpoints,
    pub tls: TlsVerification,
    /// Timeout for command requests and stream connection attempts.
    pub timeout: Duration,
    /// Readings strictly above this raise a temperature alarm.
    pub temperature_threshold: f64,
    /// Fixed delay between a stream disconnect and the next attempt.
    pub reconnect_delay: Duration,
    /// How long after an acknowledgment suppression is lifted locally.
    pub resume_delay: Duration,
    /// Send the resume command automatically after `resume_delay`.
    pub auto_resume: bool,
}

impl EngineConfig {
    /// Defaults for everything except the hub address.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            endpoints: Endpoints::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            temperature_threshold: DEFAULT_THRESHOLD,
            reconnect_delay: Duration::from_secs(5),
            resume_delay: Duration::from_secs(5),
            auto_resume: true,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hub_conventions() {
        let config = EngineConfig::new(Url::parse(DEFAULT_BASE_URL).unwrap());
        assert!((config.temperature_threshold - 30.0).abs() < f64::EPSILON);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.resume_delay, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.auto_resume);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn transport_follows_tls_choice() {
        let mut config = EngineConfig::new(Url::parse(DEFAULT_BASE_URL).unwrap());
        config.tls = TlsVerification::DangerAcceptInvalid;
        config.timeout = Duration::from_secs(3);

        let transport = config.transport();
        assert!(matches!(transport.tls, TlsMode::DangerAcceptInvalid));
        assert_eq!(transport.timeout, Duration::from_secs(3));
    }
}
