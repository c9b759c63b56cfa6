//! Server shared state
//!
//! Holds the climate resolver shared by all handlers.

use crate::climate::{ClimateResolver, Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;
use std::time::Instant;

/// Shared state for the HTTP server
pub struct AppState {
    /// Resolver whose caches live for the lifetime of the server
    pub resolver: ClimateResolver,

    started_at: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create state with an explicit clock
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let resolver = ClimateResolver::with_clock(&config, clock)?;
        Ok(Self {
            resolver,
            started_at: Instant::now(),
        })
    }

    /// Seconds since the state was created
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
