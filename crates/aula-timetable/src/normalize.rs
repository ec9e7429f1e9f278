//! Feed record normalization into canonical lessons.

use std::sync::Arc;

use aula_core::{CacheKey, Lesson, ResponseCache, Room};
use aula_registry::RegistryClient;
use chrono::{NaiveDate, NaiveTime};

use crate::error::TimetableError;
use crate::types::RawLesson;

/// Turns raw feed records into canonical lessons.
///
/// Group-email resolution goes through the registry and is memoized per
/// stream, so a stream that appears in forty lessons costs one lookup.
pub struct LessonNormalizer {
    registry: Arc<RegistryClient>,
    cache: Arc<ResponseCache>,
    email_domain: Option<String>,
}

impl LessonNormalizer {
    pub fn new(
        registry: Arc<RegistryClient>,
        cache: Arc<ResponseCache>,
        email_domain: Option<String>,
    ) -> Self {
        Self {
            registry,
            cache,
            email_domain,
        }
    }

    /// Normalize one feed record for a room.
    ///
    /// Group-email failures never fail the lesson: the lesson keeps
    /// `group_emails: None` and a later run retries the lookup.
    pub async fn normalize(&self, raw: RawLesson, room: &Room) -> Result<Lesson, TimetableError> {
        let date = NaiveDate::parse_from_str(&raw.date, "%Y.%m.%d").map_err(|_| {
            TimetableError::Parse {
                field: "date",
                value: raw.date.clone(),
            }
        })?;
        let start_time = parse_time("beginLesson", &raw.begin_lesson)?;
        let end_time = parse_time("endLesson", &raw.end_lesson)?;

        let stream = split_stream(raw.group.as_deref());
        let group_emails = match &stream {
            Some(stream) => self.resolve_group_emails(stream).await,
            None => None,
        };

        let lecturer_email = raw
            .lecturer_email
            .as_deref()
            .filter(|email| !email.is_empty())
            .map(|email| re_domain(email, self.email_domain.as_deref()));

        Ok(Lesson {
            source_lesson_id: raw.lesson_oid,
            date,
            start_time,
            end_time,
            summary: raw.discipline.clone(),
            location: format!("{}/{}", raw.auditorium, raw.building),
            description: build_description(
                stream.as_deref(),
                raw.lecturer.as_deref(),
                raw.kind_of_work.as_deref(),
                raw.url1.as_deref(),
            ),
            building_id: room.building_id,
            auditorium_id: room.auditorium_id,
            lecturer: raw.lecturer,
            lecturer_email,
            stream,
            group_emails,
        })
    }

    async fn resolve_group_emails(&self, stream: &str) -> Option<Vec<String>> {
        let key = CacheKey::new("group_emails", [stream.to_string()]);
        let registry = Arc::clone(&self.registry);
        let stream_owned = stream.to_string();

        let resolved = self
            .cache
            .get_or_fetch(key, move || async move {
                registry.group_emails(&stream_owned).await
            })
            .await;

        match resolved {
            Ok(emails) => {
                if emails.is_empty() {
                    tracing::warn!(stream, "stream has no groups");
                }
                Some(emails)
            }
            Err(err) => {
                tracing::warn!(stream, error = %err, "group email lookup unavailable");
                None
            }
        }
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, TimetableError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| TimetableError::Parse {
        field,
        value: value.to_string(),
    })
}

/// Stream code is the group code up to any `#subgroup` suffix.
fn split_stream(group: Option<&str>) -> Option<String> {
    group
        .filter(|g| !g.is_empty())
        .map(|g| g.split('#').next().unwrap_or(g).to_string())
}

fn re_domain(email: &str, domain: Option<&str>) -> String {
    match domain {
        Some(domain) => {
            let local = email.split('@').next().unwrap_or(email);
            format!("{}@{}", local, domain)
        }
        None => email.to_string(),
    }
}

fn build_description(
    stream: Option<&str>,
    lecturer: Option<&str>,
    kind_of_work: Option<&str>,
    url: Option<&str>,
) -> String {
    let mut description = format!(
        "Stream: {}\nLecturer: {}\nType: {}\n",
        stream.unwrap_or(""),
        lecturer.unwrap_or(""),
        kind_of_work.unwrap_or(""),
    );
    if let Some(url) = url {
        if !url.is_empty() {
            description.push_str(&format!("URL: {}\n", url));
        }
    }
    description
}
