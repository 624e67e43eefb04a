//! Shared state of the relay server

use crate::config::RelayConfig;
use crate::error::Result;
use crate::upstream::Upstream;

/// State handed to every request. Holds no per-conversation data.
#[derive(Debug)]
pub struct RelayState {
    pub config: RelayConfig,
    pub upstream: Upstream,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self> {
        let upstream = Upstream::new(&config)?;
        Ok(Self { config, upstream })
    }
}
