//! Construction parameters for [`crate::ClientCore`], builder-style like
//! [`crate::ServerConfig`].

use std::time::Duration;

/// `health_check_interval = None` (or `Some(Duration::ZERO)`) disables
/// the reconnect-storm gate described in spec §4.6.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub auth_key: Option<String>,
    /// If true, construction never raises on a failed initial dial; the
    /// connection is instead attempted lazily on first use.
    pub pre_connect: bool,
    pub auto_reconnect: bool,
    /// Converts `Disconnected` into a safe default on status queries
    /// only (spec §7); never on `put`/`get`/`task_done`/`join`/`reset`.
    pub silence_err: bool,
    pub health_check_interval: Option<Duration>,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_key: None,
            pre_connect: false,
            auto_reconnect: false,
            silence_err: false,
            health_check_interval: None,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self
    }

    pub fn with_pre_connect(mut self, pre_connect: bool) -> Self {
        self.pre_connect = pre_connect;
        self
    }

    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    pub fn with_silence_err(mut self, silence_err: bool) -> Self {
        self.silence_err = silence_err;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = Some(interval);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
