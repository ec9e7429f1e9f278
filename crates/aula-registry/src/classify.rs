//! Lesson classification against the stored registry copy.

use aula_core::Lesson;

use crate::types::{LessonCheck, RegistryLesson};

/// Decide what, if anything, the stored copy needs.
///
/// Exactly one of the three outcomes holds for any input. `Same`
/// requires every canonical field to be equal; a single drifted field
/// makes it `Update`. No fuzzy or partial-field comparison.
#[must_use]
pub fn classify(stored: Option<&RegistryLesson>, fresh: &Lesson) -> LessonCheck {
    match stored {
        None => LessonCheck::NotFound,
        Some(record) if record.lesson == *fresh => LessonCheck::Same,
        Some(record) => LessonCheck::Update {
            registry_id: record.id.clone(),
            calendar_id: record.calendar_id.clone(),
            event_id: record.event_id.clone(),
        },
    }
}
