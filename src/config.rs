use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::BackendKind;

/// Connection settings for one schema on one backend.
///
/// A config is keyed by its `schema` name inside a
/// [`ConnectionRegistry`](crate::registry::ConnectionRegistry); the registry
/// dials lazily, so constructing a config never touches the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Hostname or IP address. A value starting with `/` is treated as a
    /// Unix socket path by both drivers.
    pub host: String,
    /// TCP port; when unset the backend's default port is used.
    pub port: Option<u16>,
    /// Database (schema) name. Also the registry key.
    pub schema: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Connections idle longer than this are discarded and redialed on the
    /// next use.
    pub max_idle: Duration,
}

impl BackendConfig {
    /// Idle cutoff applied when none is configured: seven hours, below the
    /// common eight-hour server-side `wait_timeout`.
    pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(7 * 3600);

    #[must_use]
    pub fn new(kind: BackendKind, host: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            kind,
            host: host.into(),
            port: None,
            schema: schema.into(),
            user: None,
            password: None,
            max_idle: Self::DEFAULT_MAX_IDLE,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Effective port: the configured one, or the backend default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.kind.default_port())
    }

    pub(crate) fn socket_path(&self) -> Option<&str> {
        self.host.starts_with('/').then_some(self.host.as_str())
    }
}
