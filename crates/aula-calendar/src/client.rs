//! Calendar service API client.

use std::sync::Arc;
use std::time::Duration;

use aula_auth::AuthTokenManager;
use aula_core::{Lesson, RateLimiter, ServiceClass};
use serde::Deserialize;
use tracing::instrument;

use crate::error::CalendarError;
use crate::event::EventPayload;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
    timezone: String,
    auth: Arc<AuthTokenManager>,
    limiter: Arc<RateLimiter>,
}

impl CalendarClient {
    pub fn new(
        auth: Arc<AuthTokenManager>,
        limiter: Arc<RateLimiter>,
        timezone: impl Into<String>,
    ) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: CALENDAR_API_BASE.to_string(),
            timezone: timezone.into(),
            auth,
            limiter,
        })
    }

    /// Point at a different calendar endpoint (mock servers, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Create the mirrored event for a lesson. Returns the event id.
    #[instrument(skip(self, lesson), level = "info")]
    pub async fn create_event(
        &self,
        calendar_id: &str,
        lesson: &Lesson,
    ) -> Result<String, CalendarError> {
        let token = self.auth.bearer_token().await?;
        let _permit = self.limiter.acquire(ServiceClass::Calendar).await;

        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id),
        );
        let payload = EventPayload::from_lesson(lesson, &self.timezone);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let created: CreatedEvent = Self::parse_response(response).await?;
        tracing::info!(
            calendar_id,
            event_id = %created.id,
            source_lesson_id = lesson.source_lesson_id,
            "event created"
        );
        Ok(created.id)
    }

    /// Replace the mirrored event in full.
    #[instrument(skip(self, lesson), level = "info")]
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        lesson: &Lesson,
    ) -> Result<(), CalendarError> {
        let token = self.auth.bearer_token().await?;
        let _permit = self.limiter.acquire(ServiceClass::Calendar).await;

        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id),
        );
        let payload = EventPayload::from_lesson(lesson, &self.timezone);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        Self::check_status(response).await?;
        tracing::info!(calendar_id, event_id, "event updated");
        Ok(())
    }

    /// Delete the mirrored event.
    ///
    /// An event that is already gone (404, or 410 for events deleted
    /// through the calendar UI) counts as success.
    #[instrument(skip(self), level = "info")]
    pub async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), CalendarError> {
        let token = self.auth.bearer_token().await?;
        let _permit = self.limiter.acquire(ServiceClass::Calendar).await;

        let url = format!(
            "{}/calendars/{}/events/{}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id),
        );

        let response = self.client.delete(&url).bearer_auth(&token).send().await?;

        match response.status().as_u16() {
            404 | 410 => {
                tracing::info!(calendar_id, event_id, "event already absent");
                Ok(())
            }
            _ => {
                Self::check_status(response).await?;
                tracing::info!(calendar_id, event_id, "event deleted");
                Ok(())
            }
        }
    }

    /// Map API responses to errors, parsing the success body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::classify_failure(response).await)
        }
    }

    /// Map API responses to errors, discarding the success body.
    async fn check_status(response: reqwest::Response) -> Result<(), CalendarError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::classify_failure(response).await)
        }
    }

    async fn classify_failure(response: reqwest::Response) -> CalendarError {
        let status = response.status();
        match status.as_u16() {
            401 => CalendarError::TokenExpired,
            403 => CalendarError::AuthRequired,
            404 => {
                let text = response.text().await.unwrap_or_default();
                CalendarError::EventNotFound(text)
            }
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                CalendarError::RateLimited(retry_after)
            }
            _ => {
                let detail = response.text().await.unwrap_or_default();
                CalendarError::Api {
                    status: status.as_u16(),
                    detail,
                }
            }
        }
    }
}
