//! Configuration for the stream client

use std::time::Duration;

/// Idle window applied when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for [`StreamClient`](crate::StreamClient)
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// Longest gap allowed between two body chunks (and before the response
    /// headers). `None` waits forever.
    pub idle_timeout: Option<Duration>,

    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,

    /// Extra headers sent with every request
    pub headers: Vec<(String, String)>,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            connect_timeout: Duration::from_secs(10),
            headers: Vec::new(),
        }
    }
}

impl StreamClientConfig {
    pub fn builder() -> StreamClientConfigBuilder {
        StreamClientConfigBuilder::default()
    }
}

/// Builder for StreamClientConfig
#[derive(Debug, Default)]
pub struct StreamClientConfigBuilder {
    idle_timeout: Option<Option<Duration>>,
    connect_timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl StreamClientConfigBuilder {
    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(Some(timeout));
        self
    }

    /// Never time out a quiet stream
    pub fn no_idle_timeout(mut self) -> Self {
        self.idle_timeout = Some(None);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> StreamClientConfig {
        let defaults = StreamClientConfig::default();
        StreamClientConfig {
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            headers: self.headers,
        }
    }
}
