//! Schedule feed HTTP client.

use std::sync::Arc;
use std::time::Duration;

use aula_core::{CacheKey, Lesson, RateLimiter, ResponseCache, Room, ServiceClass};
use chrono::NaiveDate;
use tracing::instrument;

use crate::error::TimetableError;
use crate::normalize::LessonNormalizer;
use crate::types::{RawLesson, RawRoom};

pub struct ScheduleClient {
    client: reqwest::Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    normalizer: LessonNormalizer,
}

impl ScheduleClient {
    pub fn new(
        base_url: impl Into<String>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
        normalizer: LessonNormalizer,
    ) -> Result<Self, TimetableError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter,
            cache,
            normalizer,
        })
    }

    /// The building's rooms worth mirroring.
    ///
    /// The feed only answers a full dump (`buildingoid=0`), so narrowing
    /// to the configured building and dropping non-teaching spaces
    /// happens here. Memoized per building for the life of the run.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_rooms(&self, building_id: i64) -> Result<Vec<Room>, TimetableError> {
        let key = CacheKey::new("auditoriums", [building_id.to_string()]);
        self.cache
            .get_or_fetch(key, || async move {
                self.fetch_rooms_uncached(building_id).await
            })
            .await
    }

    async fn fetch_rooms_uncached(&self, building_id: i64) -> Result<Vec<Room>, TimetableError> {
        let _permit = self.limiter.acquire(ServiceClass::Timetable).await;

        let url = format!("{}/auditoriums", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("buildingoid", "0")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(TimetableError::Api { status, detail });
        }

        let raw: Vec<RawRoom> = response.json().await?;
        let rooms: Vec<Room> = raw
            .into_iter()
            .filter(|raw| raw.building_gid == building_id)
            .map(|raw| {
                let name = raw.number.unwrap_or_else(|| raw.oid.to_string());
                Room {
                    auditorium_id: raw.oid,
                    building_id: raw.building_gid,
                    kind: raw.type_of_auditorium,
                    name,
                }
            })
            .filter(Room::is_teaching_room)
            .collect();

        tracing::info!(building_id, rooms = rooms.len(), "fetched room list");
        Ok(rooms)
    }

    /// The room's lessons over `[today, today + lookahead]`, normalized.
    ///
    /// A feed failure for a single room is soft: the room yields no
    /// lessons this run and a warning, while sibling rooms proceed. The
    /// engine separately refuses to sweep deletions off an empty fetch.
    #[instrument(
        skip(self, room),
        fields(auditorium_id = room.auditorium_id),
        level = "info"
    )]
    pub async fn fetch_lessons(
        &self,
        room: &Room,
        lookahead_days: i64,
    ) -> Result<Vec<Lesson>, TimetableError> {
        let (from, to) = fetch_window(chrono::Local::now().date_naive(), lookahead_days);

        // Scoped so the feed slot frees before the registry lookups
        // normalization makes.
        let raw_lessons: Vec<RawLesson> = {
            let _permit = self.limiter.acquire(ServiceClass::Timetable).await;

            let url = format!("{}/lessons", self.base_url);
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("fromdate", from.as_str()),
                    ("todate", to.as_str()),
                    ("auditoriumoid", room.auditorium_id.to_string().as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                tracing::warn!(
                    auditorium_id = room.auditorium_id,
                    status = response.status().as_u16(),
                    "lesson fetch failed, treating room as empty this run"
                );
                return Ok(Vec::new());
            }

            response.json().await?
        };

        let mut lessons = Vec::with_capacity(raw_lessons.len());
        for raw in raw_lessons {
            let source_lesson_id = raw.lesson_oid;
            match self.normalizer.normalize(raw, room).await {
                Ok(lesson) => lessons.push(lesson),
                Err(err) => tracing::warn!(
                    auditorium_id = room.auditorium_id,
                    source_lesson_id,
                    error = %err,
                    "skipping unparseable feed record"
                ),
            }
        }

        tracing::info!(
            auditorium_id = room.auditorium_id,
            lessons = lessons.len(),
            "fetched lessons"
        );
        Ok(lessons)
    }
}

/// Feed date window, `%Y.%m.%d` on both ends.
fn fetch_window(today: NaiveDate, lookahead_days: i64) -> (String, String) {
    let to = today + chrono::Days::new(lookahead_days.max(0) as u64);
    (
        today.format("%Y.%m.%d").to_string(),
        to.format("%Y.%m.%d").to_string(),
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use aula_core::RateLimits;
    use aula_registry::RegistryClient;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn room() -> Room {
        Room {
            auditorium_id: 3031,
            building_id: 92,
            kind: "Лекционные".to_string(),
            name: "504".to_string(),
        }
    }

    fn raw_lesson_json(lesson_oid: i64, group: &str) -> serde_json::Value {
        serde_json::json!({
            "lessonOid": lesson_oid,
            "date": "2024.03.01",
            "beginLesson": "09:00",
            "endLesson": "10:30",
            "discipline": "Circuit Theory",
            "auditorium": "504",
            "building": "Main",
            "group": group,
            "lecturer": "A. Petrov",
            "lecturerEmail": "petrov@feed.internal",
            "kindOfWork": "Lecture",
            "url1": ""
        })
    }

    fn schedule_client(feed: &MockServer, registry: &MockServer) -> ScheduleClient {
        let limiter = Arc::new(RateLimiter::new(RateLimits::default()));
        let cache = Arc::new(ResponseCache::new());
        let registry_client =
            Arc::new(RegistryClient::new(registry.uri(), None, Arc::clone(&limiter)).unwrap());
        let normalizer = LessonNormalizer::new(
            registry_client,
            Arc::clone(&cache),
            Some("example.edu".to_string()),
        );
        ScheduleClient::new(feed.uri(), limiter, cache, normalizer).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_rooms_filters_and_memoizes() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auditoriums"))
            .and(query_param("buildingoid", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"oid": 3031, "buildingGid": 92, "typeOfAuditorium": "Лекционные", "number": "504"},
                {"oid": 3032, "buildingGid": 92, "typeOfAuditorium": "Неаудиторные", "number": "Dean"},
                {"oid": 9001, "buildingGid": 17, "typeOfAuditorium": "Лекционные", "number": "101"}
            ])))
            .expect(1)
            .mount(&feed)
            .await;

        let client = schedule_client(&feed, &registry);

        let rooms = client.fetch_rooms(92).await.unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].auditorium_id, 3031);
        assert_eq!(rooms[0].name, "504");

        // Second call answers from the cache; expect(1) verifies.
        let again = client.fetch_rooms(92).await.unwrap();
        assert_eq!(again, rooms);
    }

    #[tokio::test]
    async fn test_fetch_rooms_failure_is_hard() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auditoriums"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&feed)
            .await;

        let err = schedule_client(&feed, &registry)
            .fetch_rooms(92)
            .await
            .unwrap_err();
        assert!(matches!(err, TimetableError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_lessons_normalizes_records() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lessons"))
            .and(query_param("auditoriumoid", "3031"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([raw_lesson_json(42, "BIV191#2")])),
            )
            .mount(&feed)
            .await;
        Mock::given(method("GET"))
            .and(path("/disciplines"))
            .and(query_param("course_code", "BIV191"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!([{"emails": ["biv191@example.edu"]}]),
            ))
            .mount(&registry)
            .await;

        let lessons = schedule_client(&feed, &registry)
            .fetch_lessons(&room(), 15)
            .await
            .unwrap();

        assert_eq!(lessons.len(), 1);
        let lesson = &lessons[0];
        assert_eq!(lesson.source_lesson_id, 42);
        assert_eq!(lesson.date.to_string(), "2024-03-01");
        assert_eq!(lesson.start_time.to_string(), "09:00:00");
        assert_eq!(lesson.location, "504/Main");
        assert_eq!(lesson.stream.as_deref(), Some("BIV191"));
        assert_eq!(lesson.lecturer_email.as_deref(), Some("petrov@example.edu"));
        assert_eq!(
            lesson.group_emails,
            Some(vec!["biv191@example.edu".to_string()])
        );
        assert_eq!(lesson.auditorium_id, 3031);
        assert_eq!(lesson.building_id, 92);
        assert!(lesson.description.contains("Stream: BIV191\n"));
        assert!(!lesson.description.contains("URL:"));
    }

    #[tokio::test]
    async fn test_fetch_lessons_feed_outage_is_soft() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lessons"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&feed)
            .await;

        let lessons = schedule_client(&feed, &registry)
            .fetch_lessons(&room(), 15)
            .await
            .unwrap();
        assert!(lessons.is_empty());
    }

    #[tokio::test]
    async fn test_group_lookup_memoized_across_lessons() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lessons"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                raw_lesson_json(42, "BIV191#1"),
                raw_lesson_json(43, "BIV191#2")
            ])))
            .mount(&feed)
            .await;
        Mock::given(method("GET"))
            .and(path("/disciplines"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!([{"emails": ["biv191@example.edu"]}]),
            ))
            .expect(1)
            .mount(&registry)
            .await;

        let lessons = schedule_client(&feed, &registry)
            .fetch_lessons(&room(), 15)
            .await
            .unwrap();
        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0].group_emails, lessons[1].group_emails);
    }

    #[tokio::test]
    async fn test_group_lookup_outage_keeps_lesson() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lessons"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([raw_lesson_json(42, "BIV191")])),
            )
            .mount(&feed)
            .await;
        Mock::given(method("GET"))
            .and(path("/disciplines"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&registry)
            .await;

        let lessons = schedule_client(&feed, &registry)
            .fetch_lessons(&room(), 15)
            .await
            .unwrap();
        assert_eq!(lessons.len(), 1);
        // Unresolved, not settled-empty: a later run retries.
        assert_eq!(lessons[0].group_emails, None);
    }

    #[tokio::test]
    async fn test_unparseable_record_is_skipped() {
        let feed = MockServer::start().await;
        let registry = MockServer::start().await;
        let mut bad = raw_lesson_json(41, "");
        bad["date"] = serde_json::Value::String("not-a-date".to_string());
        Mock::given(method("GET"))
            .and(path("/lessons"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([bad, raw_lesson_json(42, "")])),
            )
            .mount(&feed)
            .await;

        let lessons = schedule_client(&feed, &registry)
            .fetch_lessons(&room(), 15)
            .await
            .unwrap();
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].source_lesson_id, 42);
    }

    #[test]
    fn test_fetch_window() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 25).unwrap();
        let (from, to) = fetch_window(today, 15);
        assert_eq!(from, "2024.02.25");
        assert_eq!(to, "2024.03.11");
    }
}
