//! Engine error types.

use thiserror::Error;

/// Errors that can end a reconciliation pass.
///
/// Most failures never surface here: per-lesson and per-room trouble is
/// logged, counted in the [`crate::SyncReport`] and absorbed. What does
/// surface is the kind of failure no further room can outrun, like an
/// unusable room listing or a credential the user has to re-issue.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Timetable(#[from] aula_timetable::TimetableError),

    #[error(transparent)]
    Registry(#[from] aula_registry::RegistryError),

    #[error(transparent)]
    Calendar(#[from] aula_calendar::CalendarError),

    #[error(transparent)]
    Auth(#[from] aula_auth::AuthError),
}
