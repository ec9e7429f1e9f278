//! Canonical schedule types shared by every service crate.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A lesson in canonical form.
///
/// This is the shape produced by feed normalization and the shape the
/// registry stores, so comparing two of them field by field decides
/// whether a stored copy is stale. Optional fields stay `None` when the
/// upstream feed omitted them, which is not the same thing as an empty
/// value: a lesson with no known groups (`None`) will be retried on a
/// later run, while a lesson whose groups resolved to nobody
/// (`Some(vec![])`) is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Identifier assigned by the schedule feed, stable across runs.
    pub source_lesson_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Discipline name, used as the calendar event title.
    pub summary: String,
    /// `{auditorium}/{building}` as published by the feed.
    pub location: String,
    /// Multi-line human-readable details (stream, lecturer, kind, url).
    pub description: String,
    pub building_id: i64,
    pub auditorium_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lecturer_email: Option<String>,
    /// Stream code with any `#subgroup` suffix stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// Mailing addresses of attending groups; `None` when resolution
    /// failed or was never attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_emails: Option<Vec<String>>,
}

/// A room known to the schedule feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub auditorium_id: i64,
    pub building_id: i64,
    /// Feed's room category, e.g. "Лекционные" or "Неаудиторные".
    pub kind: String,
    pub name: String,
}

/// Room category the feed uses for entries that are not physical
/// teaching rooms (department offices, online placeholders).
pub const NON_TEACHING_ROOM_KIND: &str = "Неаудиторные";

impl Room {
    /// Whether lessons in this room should be mirrored at all.
    #[must_use]
    pub fn is_teaching_room(&self) -> bool {
        self.kind != NON_TEACHING_ROOM_KIND
    }
}
