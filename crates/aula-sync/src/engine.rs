//! The reconciliation engine.
//!
//! One pass walks every room of a building: fetch the room's upcoming
//! lessons from the feed, classify each against the registry, apply the
//! smallest set of create/update calls to registry and calendar, then
//! sweep out registry lessons the feed no longer carries. Rooms are
//! independent units of work and run concurrently; outbound pressure is
//! bounded by the shared [`aula_core::RateLimiter`], not by task count.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aula_auth::AuthTokenManager;
use aula_calendar::{CalendarClient, CalendarError};
use aula_core::{Lesson, Room};
use aula_registry::{LessonCheck, NewRegistryLesson, RegistryClient, RegistryLesson};
use aula_timetable::ScheduleClient;
use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::instrument;

use crate::error::SyncError;
use crate::report::{RoomReport, SyncReport};
use crate::router::CalendarRouter;

/// What reconciling one lesson amounted to.
enum LessonOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

pub struct SyncEngine {
    timetable: Arc<ScheduleClient>,
    registry: Arc<RegistryClient>,
    calendar: Arc<CalendarClient>,
    auth: Arc<AuthTokenManager>,
    router: Arc<dyn CalendarRouter>,
    lookahead_days: i64,
    deletion_pause: Duration,
}

impl SyncEngine {
    pub fn new(
        timetable: Arc<ScheduleClient>,
        registry: Arc<RegistryClient>,
        calendar: Arc<CalendarClient>,
        auth: Arc<AuthTokenManager>,
        router: Arc<dyn CalendarRouter>,
        lookahead_days: i64,
        deletion_pause: Duration,
    ) -> Self {
        Self {
            timetable,
            registry,
            calendar,
            auth,
            router,
            lookahead_days,
            deletion_pause,
        }
    }

    /// Reconcile every room of a building.
    ///
    /// A failed room listing fails the whole batch; there is nothing to
    /// iterate without it.
    #[instrument(skip(self), level = "info")]
    pub async fn reconcile_building(&self, building_id: i64) -> Result<SyncReport, SyncError> {
        let rooms = self.timetable.fetch_rooms(building_id).await?;
        Ok(self.reconcile(rooms).await)
    }

    /// Reconcile the given rooms concurrently.
    ///
    /// Room failures are absorbed into the report; one broken room
    /// never stops its siblings.
    pub async fn reconcile(&self, rooms: Vec<Room>) -> SyncReport {
        let from_date = registry_from_date(chrono::Local::now().date_naive());
        tracing::info!(rooms = rooms.len(), "reconciliation pass starting");

        let mut tasks = FuturesUnordered::new();
        for room in rooms {
            let from_date = from_date.as_str();
            tasks.push(async move {
                let outcome = self.sync_room(&room, from_date).await;
                (room, outcome)
            });
        }

        let mut report = SyncReport::default();
        while let Some((room, outcome)) = tasks.next().await {
            match outcome {
                Ok(room_report) => report.record_room(room_report),
                Err(err) => {
                    tracing::error!(
                        auditorium_id = room.auditorium_id,
                        room = %room.name,
                        error = %err,
                        "room reconciliation aborted"
                    );
                    report.record_failed_room(room.auditorium_id);
                }
            }
        }

        report.rooms.sort_by_key(|r| r.auditorium_id);
        tracing::info!(summary = %report.summary(), "reconciliation pass finished");
        report
    }

    /// One room's unit of work: create/update pass, then the deletion
    /// sweep. The sweep never runs first; a lesson fetched late in the
    /// source sequence must not look removed.
    #[instrument(
        skip(self, room, from_date),
        fields(auditorium_id = room.auditorium_id),
        level = "info"
    )]
    async fn sync_room(&self, room: &Room, from_date: &str) -> Result<RoomReport, SyncError> {
        let lessons = self.timetable.fetch_lessons(room, self.lookahead_days).await?;
        let mut report = RoomReport::new(room.auditorium_id, room.name.clone());
        report.fetched = lessons.len();

        for lesson in &lessons {
            match self.sync_lesson(room, lesson, from_date).await {
                Ok(LessonOutcome::Created) => report.created += 1,
                Ok(LessonOutcome::Updated) => report.updated += 1,
                Ok(LessonOutcome::Unchanged) => report.unchanged += 1,
                Ok(LessonOutcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    tracing::error!(
                        source_lesson_id = lesson.source_lesson_id,
                        error = %err,
                        "lesson reconciliation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        // An empty fetch is indistinguishable from a feed outage, so it
        // never drives deletions.
        if lessons.is_empty() {
            tracing::warn!("empty source fetch, deletion sweep withheld");
            return Ok(report);
        }

        let stored = match self.registry.list_by_room(room.auditorium_id, from_date).await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "room listing unreachable, deletion sweep skipped");
                return Ok(report);
            }
        };

        let live: HashSet<i64> = lessons.iter().map(|l| l.source_lesson_id).collect();
        let stale: Vec<RegistryLesson> = stored
            .into_iter()
            .filter(|record| !live.contains(&record.lesson.source_lesson_id))
            .collect();

        for (idx, record) in stale.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(self.deletion_pause).await;
            }
            match self.delete_stale(record).await {
                Ok(()) => report.deleted += 1,
                Err(err) => {
                    tracing::error!(
                        registry_id = %record.id,
                        source_lesson_id = record.lesson.source_lesson_id,
                        error = %err,
                        "stale lesson deletion failed"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn sync_lesson(
        &self,
        room: &Room,
        lesson: &Lesson,
        from_date: &str,
    ) -> Result<LessonOutcome, SyncError> {
        match self.registry.check(lesson, from_date).await? {
            LessonCheck::Same => Ok(LessonOutcome::Unchanged),
            LessonCheck::NotFound => {
                let Some(calendar_id) = self.router.calendar_for(room) else {
                    return Ok(self.skip_unrouted(room));
                };
                self.publish_lesson(&calendar_id, lesson, None).await?;
                Ok(LessonOutcome::Created)
            }
            LessonCheck::Update {
                registry_id,
                calendar_id: Some(calendar_id),
                event_id: Some(event_id),
            } => {
                self.mutate_calendar(|| self.calendar.update_event(&calendar_id, &event_id, lesson))
                    .await?;
                let record = NewRegistryLesson::linked(lesson.clone(), calendar_id, event_id);
                self.registry.update_lesson(&registry_id, &record).await?;
                Ok(LessonOutcome::Updated)
            }
            // A stored record without full linkage: a calendar write was
            // lost somewhere. Mint a fresh event and relink.
            LessonCheck::Update { registry_id, .. } => {
                let Some(calendar_id) = self.router.calendar_for(room) else {
                    return Ok(self.skip_unrouted(room));
                };
                self.publish_lesson(&calendar_id, lesson, Some(&registry_id))
                    .await?;
                Ok(LessonOutcome::Updated)
            }
        }
    }

    /// Create the mirrored event, then write the registry record
    /// carrying its linkage. When the registry write fails the event is
    /// deleted again, so no event ever outlives a run unlinked.
    async fn publish_lesson(
        &self,
        calendar_id: &str,
        lesson: &Lesson,
        existing_registry_id: Option<&str>,
    ) -> Result<(), SyncError> {
        let event_id = self
            .mutate_calendar(|| self.calendar.create_event(calendar_id, lesson))
            .await?;

        let record =
            NewRegistryLesson::linked(lesson.clone(), calendar_id.to_string(), event_id.clone());
        let written = match existing_registry_id {
            Some(registry_id) => self.registry.update_lesson(registry_id, &record).await,
            None => self.registry.add_lesson(&record).await.map(|_| ()),
        };

        if let Err(err) = written {
            tracing::error!(
                source_lesson_id = lesson.source_lesson_id,
                error = %err,
                "registry write failed, removing just-created event"
            );
            if let Err(cleanup) = self
                .mutate_calendar(|| self.calendar.delete_event(calendar_id, &event_id))
                .await
            {
                tracing::warn!(
                    event_id = %event_id,
                    error = %cleanup,
                    "compensating event delete failed"
                );
            }
            return Err(err.into());
        }

        Ok(())
    }

    /// Delete a registry record the feed no longer carries, then its
    /// linked event. A registry failure leaves the record in place so
    /// the next pass sees it again.
    async fn delete_stale(&self, record: &RegistryLesson) -> Result<(), SyncError> {
        self.registry.delete_lesson(&record.id).await?;

        if let (Some(calendar_id), Some(event_id)) = (&record.calendar_id, &record.event_id) {
            self.mutate_calendar(|| self.calendar.delete_event(calendar_id, event_id))
                .await?;
        }

        Ok(())
    }

    /// Run a calendar mutation, refreshing the credential and retrying
    /// exactly once when the service rejects the token.
    async fn mutate_calendar<T, F, Fut>(&self, op: F) -> Result<T, SyncError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CalendarError>>,
    {
        match op().await {
            Err(err) if err.should_refresh_token() => {
                tracing::info!("calendar credential stale, refreshing and retrying");
                self.auth.force_refresh().await?;
                Ok(op().await?)
            }
            result => Ok(result?),
        }
    }

    fn skip_unrouted(&self, room: &Room) -> LessonOutcome {
        tracing::warn!(
            auditorium_id = room.auditorium_id,
            room = %room.name,
            "no calendar routed for room, lesson skipped"
        );
        LessonOutcome::Skipped
    }
}

/// Registry queries bound their view to today onward. Midnight keeps
/// lessons from earlier in the day visible to the sweep.
fn registry_from_date(today: NaiveDate) -> String {
    format!("{today}T00:00:00Z")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn test_registry_from_date_is_midnight_utc() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(registry_from_date(today), "2024-03-01T00:00:00Z");
    }
}
