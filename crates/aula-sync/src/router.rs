//! Room to calendar routing.

use std::collections::HashMap;

use aula_core::Room;

/// Resolves which calendar mirrors a given room.
///
/// The mapping is owned outside the engine: deployments differ in how
/// rooms acquire calendars (provisioned ahead of time, looked up in an
/// inventory service, one shared calendar for everything). The engine
/// only asks; a room the router cannot place is skipped, not failed.
pub trait CalendarRouter: Send + Sync {
    /// Calendar id for the room, or `None` when the room has none.
    fn calendar_for(&self, room: &Room) -> Option<String>;
}

/// Router backed by a fixed auditorium id to calendar id table.
#[derive(Debug, Default, Clone)]
pub struct StaticRouter {
    calendars: HashMap<i64, String>,
}

impl StaticRouter {
    #[must_use]
    pub fn new(calendars: HashMap<i64, String>) -> Self {
        Self { calendars }
    }

    /// Register a room's calendar, replacing any earlier entry.
    pub fn assign(&mut self, auditorium_id: i64, calendar_id: impl Into<String>) {
        self.calendars.insert(auditorium_id, calendar_id.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calendars.is_empty()
    }
}

impl CalendarRouter for StaticRouter {
    fn calendar_for(&self, room: &Room) -> Option<String> {
        self.calendars.get(&room.auditorium_id).cloned()
    }
}
