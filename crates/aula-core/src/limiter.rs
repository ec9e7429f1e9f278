//! Per-service concurrency gates.
//!
//! Every outbound HTTP call passes through [`RateLimiter::acquire`]
//! before the request is built. Each external service class has its own
//! semaphore, so a stalled calendar call can never starve feed reads.

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};

/// External services whose call volume is bounded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceClass {
    /// The authoritative schedule feed.
    Timetable,
    /// The lesson registry.
    Registry,
    /// The mirrored calendar service.
    Calendar,
}

/// Maximum in-flight requests per service class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimits {
    pub timetable: usize,
    pub registry: usize,
    pub calendar: usize,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            timetable: 5,
            registry: 10,
            calendar: 5,
        }
    }
}

/// Shared concurrency gate, one semaphore per [`ServiceClass`].
#[derive(Debug)]
pub struct RateLimiter {
    timetable: Semaphore,
    registry: Semaphore,
    calendar: Semaphore,
    limits: RateLimits,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limits: RateLimits) -> Self {
        Self {
            timetable: Semaphore::new(limits.timetable),
            registry: Semaphore::new(limits.registry),
            calendar: Semaphore::new(limits.calendar),
            limits,
        }
    }

    /// Waits until a slot for `class` is free and claims it.
    ///
    /// The returned permit gives the slot back when dropped, so every
    /// exit path out of a guarded call releases it, error returns
    /// included.
    pub async fn acquire(&self, class: ServiceClass) -> RatePermit<'_> {
        let permit = match self.semaphore(class).acquire().await {
            Ok(permit) => permit,
            // The semaphores live as long as the limiter and are never
            // closed.
            Err(_) => unreachable!("rate limiter semaphore closed"),
        };
        RatePermit { _permit: permit }
    }

    /// Slots currently free for `class`. Diagnostic only.
    #[must_use]
    pub fn available(&self, class: ServiceClass) -> usize {
        self.semaphore(class).available_permits()
    }

    /// The bounds this limiter was built with.
    #[must_use]
    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    fn semaphore(&self, class: ServiceClass) -> &Semaphore {
        match class {
            ServiceClass::Timetable => &self.timetable,
            ServiceClass::Registry => &self.registry,
            ServiceClass::Calendar => &self.calendar,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimits::default())
    }
}

/// A claimed concurrency slot. Dropping it frees the slot.
#[derive(Debug)]
pub struct RatePermit<'a> {
    _permit: SemaphorePermit<'a>,
}
