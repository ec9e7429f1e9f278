//! Reconciliation pass accounting.

use serde::Serialize;

/// What one pass did to one room.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RoomReport {
    pub auditorium_id: i64,
    pub room_name: String,
    /// Lessons fetched from the feed for this room.
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Lessons passed over deliberately, like a room no calendar is
    /// routed for. Distinct from `failed`, which counts errors.
    pub skipped: usize,
    pub failed: usize,
}

impl RoomReport {
    #[must_use]
    pub fn new(auditorium_id: i64, room_name: impl Into<String>) -> Self {
        Self {
            auditorium_id,
            room_name: room_name.into(),
            ..Self::default()
        }
    }

    /// True when every lesson landed where classification said it should.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Aggregate over all rooms of one pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub rooms: Vec<RoomReport>,
    /// Rooms whose pass aborted outright, by auditorium id.
    pub failed_rooms: Vec<i64>,
}

impl SyncReport {
    pub fn record_room(&mut self, room: RoomReport) {
        self.rooms.push(room);
    }

    pub fn record_failed_room(&mut self, auditorium_id: i64) {
        self.failed_rooms.push(auditorium_id);
    }

    #[must_use]
    pub fn total_created(&self) -> usize {
        self.rooms.iter().map(|r| r.created).sum()
    }

    #[must_use]
    pub fn total_updated(&self) -> usize {
        self.rooms.iter().map(|r| r.updated).sum()
    }

    #[must_use]
    pub fn total_unchanged(&self) -> usize {
        self.rooms.iter().map(|r| r.unchanged).sum()
    }

    #[must_use]
    pub fn total_deleted(&self) -> usize {
        self.rooms.iter().map(|r| r.deleted).sum()
    }

    #[must_use]
    pub fn total_skipped(&self) -> usize {
        self.rooms.iter().map(|r| r.skipped).sum()
    }

    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.rooms.iter().map(|r| r.failed).sum()
    }

    /// True when no lesson failed and no room aborted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_rooms.is_empty() && self.rooms.iter().all(RoomReport::is_clean)
    }

    /// One-line summary for the end-of-pass log.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} rooms: {} created, {} updated, {} unchanged, {} deleted, {} skipped, {} failed",
            self.rooms.len(),
            self.total_created(),
            self.total_updated(),
            self.total_unchanged(),
            self.total_deleted(),
            self.total_skipped(),
            self.total_failed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_sum_across_rooms() {
        let mut report = SyncReport::default();
        let mut a = RoomReport::new(1, "504");
        a.created = 2;
        a.unchanged = 3;
        let mut b = RoomReport::new(2, "505");
        b.created = 1;
        b.deleted = 4;
        report.record_room(a);
        report.record_room(b);

        assert_eq!(report.total_created(), 3);
        assert_eq!(report.total_unchanged(), 3);
        assert_eq!(report.total_deleted(), 4);
        assert!(report.is_clean());
    }

    #[test]
    fn test_failures_mark_report_dirty() {
        let mut report = SyncReport::default();
        let mut a = RoomReport::new(1, "504");
        a.failed = 1;
        report.record_room(a);
        assert!(!report.is_clean());

        let mut report = SyncReport::default();
        report.record_room(RoomReport::new(1, "504"));
        report.record_failed_room(2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_summary_reads_like_a_log_line() {
        let mut report = SyncReport::default();
        let mut a = RoomReport::new(1, "504");
        a.created = 2;
        report.record_room(a);

        assert_eq!(
            report.summary(),
            "1 rooms: 2 created, 0 updated, 0 unchanged, 0 deleted, 0 skipped, 0 failed"
        );
    }
}
