pub mod cache;
pub mod config;
pub mod limiter;
pub mod types;

pub use cache::{CacheError, CacheKey, ResponseCache};
pub use config::{
    CalendarConfig, GoogleConfig, RegistryConfig, SyncConfig, SyncOptions, TimetableConfig,
    ValidationResult,
};
pub use limiter::{RateLimiter, RateLimits, RatePermit, ServiceClass};
pub use types::{Lesson, Room, NON_TEACHING_ROOM_KIND};

use anyhow::Result;

/// Initialize shared infrastructure for a sync run
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Aula core initialized");
    Ok(())
}
