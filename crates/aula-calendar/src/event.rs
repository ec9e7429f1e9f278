//! Lesson to calendar-event payload mapping.

use aula_core::Lesson;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

/// Event body sent to the calendar service.
///
/// Summary, location and description come over verbatim; start and end
/// are the lesson's wall-clock times in one configured timezone. No
/// attendee list is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub location: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
}

impl EventPayload {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson, timezone: &str) -> Self {
        Self {
            summary: lesson.summary.clone(),
            location: lesson.location.clone(),
            description: lesson.description.clone(),
            start: EventTime {
                date_time: format!("{}T{}", lesson.date, lesson.start_time.format("%H:%M:%S")),
                time_zone: timezone.to_string(),
            },
            end: EventTime {
                date_time: format!("{}T{}", lesson.date, lesson.end_time.format("%H:%M:%S")),
                time_zone: timezone.to_string(),
            },
        }
    }
}
