//! Feed wire types, field names as the feed publishes them.

use serde::Deserialize;

/// A room record from `GET /auditoriums`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRoom {
    pub oid: i64,
    pub building_gid: i64,
    pub type_of_auditorium: String,
    #[serde(default)]
    pub number: Option<String>,
}

/// A lesson record from `GET /lessons`, prior to normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLesson {
    pub lesson_oid: i64,
    /// `YYYY.MM.DD`
    pub date: String,
    /// `HH:MM`
    pub begin_lesson: String,
    /// `HH:MM`
    pub end_lesson: String,
    pub discipline: String,
    pub auditorium: String,
    pub building: String,
    /// Group code, with an optional `#subgroup` suffix.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub lecturer: Option<String>,
    #[serde(default)]
    pub lecturer_email: Option<String>,
    #[serde(default)]
    pub kind_of_work: Option<String>,
    /// Online-lesson link, frequently empty.
    #[serde(default)]
    pub url1: Option<String>,
}
