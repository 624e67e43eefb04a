//! Configuration for the relay server

use chat_relay_core::ConfigError;
use std::fmt;
use std::time::Duration;

/// Upstream `stream_run` endpoint used when `UPSTREAM_URL` is unset
pub const DEFAULT_UPSTREAM_URL: &str = "https://hcrhmhftgn.coze.site/stream_run";

/// Tenant id sent as `project_id` in every upstream envelope
pub const DEFAULT_PROJECT_ID: u64 = 7603025396900184104;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_ROUTE: &str = "/chat";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Variables holding the upstream secret, in lookup order
pub const TOKEN_VARS: [&str; 3] = [
    "UPSTREAM_BEARER_TOKEN",
    "COZE_BEARER_TOKEN",
    "COZE_API_TOKEN",
];

/// Configuration for [`RelayServer`](crate::RelayServer)
#[derive(Clone)]
pub struct RelayConfig {
    /// Upstream streaming endpoint
    pub upstream_url: String,

    /// Secret sent to the upstream as bearer token. Requests are refused
    /// with a 500 while this is unset.
    pub bearer_token: Option<String>,

    /// Numeric tenant id
    pub project_id: u64,

    /// Address the server binds to
    pub bind_addr: String,

    /// Path of the relay endpoint
    pub route: String,

    /// Connect timeout towards the upstream
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            bearer_token: None,
            project_id: DEFAULT_PROJECT_ID,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            route: DEFAULT_ROUTE.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// The secret must never reach a log line.
impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("upstream_url", &self.upstream_url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .field("project_id", &self.project_id)
            .field("bind_addr", &self.bind_addr)
            .field("route", &self.route)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl RelayConfig {
    /// Create a new configuration builder
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    /// Load the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(token) = TOKEN_VARS.iter().find_map(|key| get(*key)) {
            builder = builder.bearer_token(token);
        }
        if let Some(url) = get("UPSTREAM_URL") {
            builder = builder.upstream_url(url);
        }
        if let Some(raw) = get("UPSTREAM_PROJECT_ID") {
            let id = raw.parse::<u64>().map_err(|_| {
                ConfigError::invalid("UPSTREAM_PROJECT_ID", format!("`{}` is not a number", raw))
            })?;
            builder = builder.project_id(id);
        }
        if let Some(addr) = get("RELAY_BIND_ADDR") {
            builder = builder.bind_addr(addr);
        }
        if let Some(route) = get("RELAY_ROUTE") {
            if !route.starts_with('/') {
                return Err(ConfigError::invalid(
                    "RELAY_ROUTE",
                    format!("`{}` must start with `/`", route),
                ));
            }
            builder = builder.route(route);
        }
        if let Some(raw) = get("UPSTREAM_CONNECT_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| {
                ConfigError::invalid(
                    "UPSTREAM_CONNECT_TIMEOUT_SECS",
                    format!("`{}` is not a whole number of seconds", raw),
                )
            })?;
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(builder.build())
    }

    /// Credential to forward, if one is configured.
    pub fn credential(&self) -> Option<&str> {
        self.bearer_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }
}

/// Builder for RelayConfig
#[derive(Default)]
pub struct RelayConfigBuilder {
    upstream_url: Option<String>,
    bearer_token: Option<String>,
    project_id: Option<u64>,
    bind_addr: Option<String>,
    route: Option<String>,
    connect_timeout: Option<Duration>,
}

impl fmt::Debug for RelayConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfigBuilder")
            .field("upstream_url", &self.upstream_url)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "<redacted>"),
            )
            .field("project_id", &self.project_id)
            .field("bind_addr", &self.bind_addr)
            .field("route", &self.route)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl RelayConfigBuilder {
    /// Set the upstream endpoint
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = Some(url.into());
        self
    }

    /// Set the upstream secret
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn project_id(mut self, id: u64) -> Self {
        self.project_id = Some(id);
        self
    }

    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = Some(addr.into());
        self
    }

    /// Set the path of the relay endpoint
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Build the configuration
    pub fn build(self) -> RelayConfig {
        RelayConfig {
            upstream_url: self
                .upstream_url
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            bearer_token: self.bearer_token,
            project_id: self.project_id.unwrap_or(DEFAULT_PROJECT_ID),
            bind_addr: self
                .bind_addr
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            route: self.route.unwrap_or_else(|| DEFAULT_ROUTE.to_string()),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.project_id, 7603025396900184104);
        assert_eq!(config.bind_addr, "127.0.0.1:8787");
        assert_eq!(config.route, "/chat");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = RelayConfig::builder()
            .upstream_url("http://127.0.0.1:9000/stream_run")
            .bearer_token("secret")
            .project_id(42)
            .route("/relay")
            .build();

        assert_eq!(config.upstream_url, "http://127.0.0.1:9000/stream_run");
        assert_eq!(config.credential(), Some("secret"));
        assert_eq!(config.project_id, 42);
        assert_eq!(config.route, "/relay");
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
    }

    #[test]
    fn test_token_fallback_order() {
        let config = RelayConfig::from_lookup(lookup(&[
            ("COZE_API_TOKEN", "third"),
            ("COZE_BEARER_TOKEN", "second"),
        ]))
        .unwrap();
        assert_eq!(config.credential(), Some("second"));

        let config = RelayConfig::from_lookup(lookup(&[
            ("UPSTREAM_BEARER_TOKEN", "first"),
            ("COZE_BEARER_TOKEN", "second"),
        ]))
        .unwrap();
        assert_eq!(config.credential(), Some("first"));

        let config =
            RelayConfig::from_lookup(lookup(&[("UPSTREAM_BEARER_TOKEN", "  ")])).unwrap();
        assert!(config.credential().is_none());
    }

    #[test]
    fn test_invalid_values() {
        let err = RelayConfig::from_lookup(lookup(&[("UPSTREAM_PROJECT_ID", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "UPSTREAM_PROJECT_ID"));

        let err = RelayConfig::from_lookup(lookup(&[("RELAY_ROUTE", "chat")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "RELAY_ROUTE"));

        let err = RelayConfig::from_lookup(lookup(&[("UPSTREAM_CONNECT_TIMEOUT_SECS", "1.5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = RelayConfig::builder().bearer_token("top-secret").build();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_builder_debug_redacts_token() {
        let builder = RelayConfig::builder()
            .bearer_token("top-secret")
            .route("/relay");
        let printed = format!("{:?}", builder);
        assert!(!printed.contains("top-secret"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("/relay"));

        let unset = format!("{:?}", RelayConfig::builder());
        assert!(unset.contains("bearer_token: None"));
    }
}
