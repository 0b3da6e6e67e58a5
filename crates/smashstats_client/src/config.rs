use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Endpoints of the remote service.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the HTTP API.
    ///
    /// Defaults to `http://localhost:3000`.
    pub server_url: String,
    /// URL of the persistent upload connection.
    ///
    /// Defaults to the server URL with a `ws`/`wss` scheme.
    pub socket_url: String,
    /// Base URL of the public site; player links are `{frontend_url}/{id}`.
    ///
    /// Defaults to the server URL.
    pub frontend_url: String,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self {
            socket_url: socket_url_for(&server_url),
            frontend_url: server_url.clone(),
            server_url,
        }
    }

    pub fn with_socket_url(mut self, socket_url: impl Into<String>) -> Self {
        self.socket_url = socket_url.into();
        self
    }

    pub fn with_frontend_url(mut self, frontend_url: impl Into<String>) -> Self {
        self.frontend_url = frontend_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

fn socket_url_for(server_url: &str) -> String {
    if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        server_url.to_string()
    }
}

/// Liveness settings of the upload session.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Interval at which the server pings.
    ///
    /// Defaults to 30 seconds.
    pub ping_interval: Duration,
    /// Allowance for network latency on top of the ping interval.
    ///
    /// Defaults to 2.5 seconds.
    pub latency_margin: Duration,
}

impl SessionConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        self.ping_interval + self.latency_margin
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            latency_margin: Duration::from_millis(2500),
        }
    }
}
