//! Registry wire types.

use aula_core::Lesson;
use serde::{Deserialize, Serialize};

/// A lesson as the registry stores it: the canonical lesson plus the
/// registry's own identity and calendar linkage.
///
/// The canonical fields are flattened into the same JSON object, which
/// is what makes classification honest: comparing `lesson` against a
/// freshly normalized one compares exactly the fields the feed owns and
/// nothing the registry added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryLesson {
    /// Registry record id.
    pub id: String,
    /// Calendar hosting the mirrored event, when one was linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    /// Mirrored event id, when one was linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub lesson: Lesson,
}

/// Body for creating or replacing a registry record.
///
/// Linkage may be absent: a record written after a calendar failure
/// stays representable and gets healed on a later pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistryLesson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub lesson: Lesson,
}

impl NewRegistryLesson {
    #[must_use]
    pub fn linked(lesson: Lesson, calendar_id: String, event_id: String) -> Self {
        Self {
            calendar_id: Some(calendar_id),
            event_id: Some(event_id),
            lesson,
        }
    }

    #[must_use]
    pub fn unlinked(lesson: Lesson) -> Self {
        Self {
            calendar_id: None,
            event_id: None,
            lesson,
        }
    }
}

/// Outcome of comparing a fresh feed lesson against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonCheck {
    /// Nothing stored under this feed id yet.
    NotFound,
    /// Stored copy matches field for field.
    Same,
    /// Stored copy is stale. Carries what is needed to fix it; linkage
    /// is `None` on half-applied records.
    Update {
        registry_id: String,
        calendar_id: Option<String>,
        event_id: Option<String>,
    },
}
