pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use client::ScheduleClient;
pub use error::TimetableError;
pub use normalize::LessonNormalizer;
pub use types::{RawLesson, RawRoom};
