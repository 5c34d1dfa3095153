// Alert hub HTTP client
//
// Wraps `reqwest::Client` with hub-specific URL construction and the three
// outbound commands (motion ack, temperature ack, temperature resume).
// Every command is a POST with an empty JSON object; any 2xx is success and
// the response body is ignored.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// ── Endpoints ────────────────────────────────────────────────────────

/// Hub endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// `GET` server-sent event stream.
    pub stream: String,
    /// `POST` acknowledge the motion alarm.
    pub motion_ack: String,
    /// `POST` acknowledge the temperature alarm.
    pub temperature_ack: String,
    /// `POST` resume temperature monitoring.
    pub temperature_resume: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            stream: "/api/alerts/stream".into(),
            motion_ack: "/api/ack".into(),
            temperature_ack: "/api/temperature/ack".into(),
            temperature_resume: "/api/temperature/resume".into(),
        }
    }
}

// ── AlertClient ──────────────────────────────────────────────────────

/// Raw HTTP client for the hub's command endpoints.
pub struct AlertClient {
    http: reqwest::Client,
    base_url: Url,
    endpoints: Endpoints,
}

impl AlertClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// The `base_url` is the hub root (e.g. `http://localhost:8080`);
    /// a path prefix such as `http://hub.lan/alerts` is preserved.
    pub fn new(
        base_url: Url,
        endpoints: Endpoints,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            endpoints,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, endpoints: Endpoints) -> Self {
        Self {
            http,
            base_url,
            endpoints,
        }
    }

    /// The hub base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The configured endpoint paths.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}{path}`, keeping any path prefix on the base URL.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    /// Full URL of the event stream endpoint.
    pub fn stream_url(&self) -> Result<Url, Error> {
        self.endpoint_url(&self.endpoints.stream)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Acknowledge the active motion alarm.
    ///
    /// `POST {motion_ack}`
    pub async fn acknowledge_motion(&self) -> Result<(), Error> {
        let url = self.endpoint_url(&self.endpoints.motion_ack)?;
        debug!("acknowledging motion alarm");
        self.post_command(url).await
    }

    /// Acknowledge the active temperature alarm (the hub's SAFE command).
    ///
    /// `POST {temperature_ack}`
    pub async fn acknowledge_temperature(&self) -> Result<(), Error> {
        let url = self.endpoint_url(&self.endpoints.temperature_ack)?;
        debug!("acknowledging temperature alarm");
        self.post_command(url).await
    }

    /// Resume temperature monitoring after an acknowledgment.
    ///
    /// `POST {temperature_resume}`
    pub async fn resume_temperature(&self) -> Result<(), Error> {
        let url = self.endpoint_url(&self.endpoints.temperature_resume)?;
        debug!("resuming temperature monitoring");
        self.post_command(url).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// POST `{}` and map any non-2xx status to [`Error::Rejected`].
    async fn post_command(&self, url: Url) -> Result<(), Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&json!({}))
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(Error::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> AlertClient {
        AlertClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            Endpoints::default(),
        )
    }

    #[test]
    fn endpoint_url_joins_root_base() {
        let c = client("http://localhost:8080");
        assert_eq!(
            c.endpoint_url("/api/ack").unwrap().as_str(),
            "http://localhost:8080/api/ack"
        );
    }

    #[test]
    fn endpoint_url_keeps_path_prefix() {
        let c = client("http://hub.lan/alerts/");
        assert_eq!(
            c.stream_url().unwrap().as_str(),
            "http://hub.lan/alerts/api/alerts/stream"
        );
    }

    #[test]
    fn default_endpoints() {
        let e = Endpoints::default();
        assert_eq!(e.stream, "/api/alerts/stream");
        assert_eq!(e.motion_ack, "/api/ack");
        assert_eq!(e.temperature_ack, "/api/temperature/ack");
        assert_eq!(e.temperature_resume, "/api/temperature/resume");
    }
}
