//! Reconciliation engine for Aula.
//!
//! Drives one authoritative timetable feed, the lesson registry and the
//! calendar mirror into agreement, one room at a time.

pub mod engine;
pub mod error;
pub mod report;
pub mod router;

pub use engine::SyncEngine;
pub use error::SyncError;
pub use report::{RoomReport, SyncReport};
pub use router::{CalendarRouter, StaticRouter};
