//! Lesson registry HTTP client.

use std::sync::Arc;
use std::time::Duration;

use aula_core::{Lesson, RateLimiter, ServiceClass};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::instrument;

use crate::classify::classify;
use crate::error::RegistryError;
use crate::types::{LessonCheck, NewRegistryLesson, RegistryLesson};

#[derive(Debug, Deserialize)]
struct Discipline {
    #[serde(default)]
    emails: Option<Vec<String>>,
}

pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limiter: Arc<RateLimiter>,
}

impl RegistryClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            limiter,
        })
    }

    /// Attach the registry's `key` auth header when configured.
    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("key", key),
            None => builder,
        }
    }

    async fn api_error(response: reqwest::Response) -> RegistryError {
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        RegistryError::Api { status, detail }
    }

    /// Fetch the stored copy of a feed lesson.
    ///
    /// Not-found is an answer here, not an error: it is what makes a
    /// lesson classify as new.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_lesson(
        &self,
        source_lesson_id: i64,
        from_date: &str,
    ) -> Result<Option<RegistryLesson>, RegistryError> {
        let _permit = self.limiter.acquire(ServiceClass::Registry).await;

        let url = format!("{}/lessons", self.base_url);
        let response = self
            .request(self.client.get(&url).query(&[
                ("source_lesson_id", source_lesson_id.to_string().as_str()),
                ("fromdate", from_date),
            ]))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::api_error(response).await),
        }
    }

    /// Classify a freshly normalized lesson against the stored copy.
    pub async fn check(
        &self,
        lesson: &Lesson,
        from_date: &str,
    ) -> Result<LessonCheck, RegistryError> {
        let stored = self.get_lesson(lesson.source_lesson_id, from_date).await?;
        Ok(classify(stored.as_ref(), lesson))
    }

    /// Create a registry record. Append-only; callers classify first.
    #[instrument(skip(self, record), level = "info")]
    pub async fn add_lesson(
        &self,
        record: &NewRegistryLesson,
    ) -> Result<RegistryLesson, RegistryError> {
        let _permit = self.limiter.acquire(ServiceClass::Registry).await;

        let url = format!("{}/lessons", self.base_url);
        let response = self
            .request(self.client.post(&url).json(record))
            .send()
            .await?;

        if response.status().is_success() {
            let created: RegistryLesson = response.json().await?;
            tracing::info!(
                registry_id = %created.id,
                source_lesson_id = record.lesson.source_lesson_id,
                "lesson added to registry"
            );
            Ok(created)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Replace a stored record in full.
    #[instrument(skip(self, record), level = "info")]
    pub async fn update_lesson(
        &self,
        registry_id: &str,
        record: &NewRegistryLesson,
    ) -> Result<(), RegistryError> {
        let _permit = self.limiter.acquire(ServiceClass::Registry).await;

        let url = format!("{}/lessons/{}", self.base_url, registry_id);
        let response = self
            .request(self.client.put(&url).json(record))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!(registry_id, "lesson updated in registry");
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    /// Delete a record. A not-found answer counts as already deleted.
    #[instrument(skip(self), level = "info")]
    pub async fn delete_lesson(&self, registry_id: &str) -> Result<(), RegistryError> {
        let _permit = self.limiter.acquire(ServiceClass::Registry).await;

        let url = format!("{}/lessons/{}", self.base_url, registry_id);
        let response = self.request(self.client.delete(&url)).send().await?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(registry_id, "lesson deleted from registry");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                tracing::info!(registry_id, "lesson already absent from registry");
                Ok(())
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    /// All stored lessons for a room from `from_date` on.
    ///
    /// Feeds the deletion sweep. A failure here degrades the sweep to a
    /// no-op rather than failing the room, so it answers with an empty
    /// list and a warning.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_by_room(
        &self,
        auditorium_id: i64,
        from_date: &str,
    ) -> Result<Vec<RegistryLesson>, RegistryError> {
        let _permit = self.limiter.acquire(ServiceClass::Registry).await;

        let url = format!("{}/lessons", self.base_url);
        let response = self
            .request(self.client.get(&url).query(&[
                ("auditorium_id", auditorium_id.to_string().as_str()),
                ("fromdate", from_date),
            ]))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            tracing::warn!(
                auditorium_id,
                status = response.status().as_u16(),
                "room listing unavailable, skipping deletion sweep"
            );
            Ok(Vec::new())
        }
    }

    /// Mail addresses of the groups attending a stream.
    ///
    /// An unknown stream resolves to no addresses, which is a settled
    /// answer. Server-side failures are errors so the caller can tell
    /// "nobody subscribed" apart from "could not ask".
    #[instrument(skip(self), level = "debug")]
    pub async fn group_emails(&self, course_code: &str) -> Result<Vec<String>, RegistryError> {
        let _permit = self.limiter.acquire(ServiceClass::Registry).await;

        let url = format!("{}/disciplines", self.base_url);
        let response = self
            .request(self.client.get(&url).query(&[("course_code", course_code)]))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let disciplines: Vec<Discipline> = response.json().await?;
                let emails = disciplines
                    .into_iter()
                    .next()
                    .and_then(|d| d.emails)
                    .unwrap_or_default();
                Ok(strip_sentinel(emails))
            }
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            _ => Err(Self::api_error(response).await),
        }
    }
}

/// The registry marks "no addresses" as a single empty string.
fn strip_sentinel(emails: Vec<String>) -> Vec<String> {
    if emails.len() == 1 && emails[0].is_empty() {
        Vec::new()
    } else {
        emails
    }
}
