pub mod classify;
pub mod client;
pub mod error;
pub mod types;

pub use classify::classify;
pub use client::RegistryClient;
pub use error::RegistryError;
pub use types::{LessonCheck, NewRegistryLesson, RegistryLesson};
