//! Calendar mirror integration for Aula.
//!
//! Pushes lesson events into per-room calendars and keeps them in step
//! with the lesson registry.

pub mod client;
pub mod error;
pub mod event;

pub use client::CalendarClient;
pub use error::CalendarError;
pub use event::{EventPayload, EventTime};
