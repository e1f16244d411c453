//! Deferred work enqueued by the catalog and its handler.
//!
//! The catalog never performs follow-up work inline: it hands a [`Task`] to the injected
//! [`Notifier`](conference_central_core::environment::Notifier). Whoever drains the queue
//! passes each task to [`TaskHandler::handle`].

use crate::catalog::CatalogService;
use crate::error::ConferenceError;
use crate::types::{CONFERENCE_KIND, parse_websafe_key};
use conference_central_core::environment::Task;
use std::sync::Arc;

/// Email the organizer a summary of what they created.
pub const SEND_CONFIRMATION_EMAIL: &str = "send_confirmation_email";
/// Recompute the featured speaker for a conference.
pub const SET_FEATURED_SPEAKER: &str = "set_featured_speaker";
/// Recompute the nearly-sold-out announcement.
pub const SET_ANNOUNCEMENT: &str = "set_announcement";

/// Build a confirmation email task.
#[must_use]
pub fn confirmation_email(email: &str, subject: &str, body: &str) -> Task {
    Task::new(SEND_CONFIRMATION_EMAIL)
        .with_param("email", email)
        .with_param("subject", subject)
        .with_param("body", body)
}

/// Build a featured-speaker task.
#[must_use]
pub fn set_featured_speaker(speaker: &str, speaker_email: &str, websafe_conference_key: &str) -> Task {
    Task::new(SET_FEATURED_SPEAKER)
        .with_param("speaker", speaker)
        .with_param("speakerEmail", speaker_email)
        .with_param("websafeConferenceKey", websafe_conference_key)
}

/// Build an announcement refresh task.
#[must_use]
pub fn set_announcement() -> Task {
    Task::new(SET_ANNOUNCEMENT)
}

/// Executes tasks against a catalog.
#[derive(Clone)]
pub struct TaskHandler {
    catalog: Arc<CatalogService>,
}

impl TaskHandler {
    /// Create a handler.
    #[must_use]
    pub const fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }

    /// Run one task.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::BadRequest`] for an unknown task or a missing parameter
    /// - errors from the catalog operation the task triggers
    pub async fn handle(&self, task: &Task) -> Result<(), ConferenceError> {
        tracing::info!(task = %task.name, "Handling task");

        match task.name.as_str() {
            SEND_CONFIRMATION_EMAIL => {
                let email = param(task, "email")?;
                let subject = param(task, "subject")?;
                tracing::info!(
                    to = email,
                    subject,
                    body = task.param("body").unwrap_or_default(),
                    "Confirmation email"
                );
                Ok(())
            }
            SET_FEATURED_SPEAKER => {
                let speaker = param(task, "speaker")?;
                let speaker_email = param(task, "speakerEmail")?;
                let conference_key =
                    parse_websafe_key(param(task, "websafeConferenceKey")?, CONFERENCE_KIND)?;
                let featured = self
                    .catalog
                    .cache_featured_speaker(speaker, speaker_email, &conference_key)
                    .await?;
                if featured.is_empty() {
                    tracing::debug!(speaker, "Speaker not featured");
                }
                Ok(())
            }
            SET_ANNOUNCEMENT => {
                self.catalog.cache_announcement().await?;
                Ok(())
            }
            other => Err(ConferenceError::BadRequest(format!(
                "Unknown task: {other}"
            ))),
        }
    }
}

fn param<'a>(task: &'a Task, name: &str) -> Result<&'a str, ConferenceError> {
    task.param(name).ok_or_else(|| {
        ConferenceError::BadRequest(format!("Task {} is missing parameter {name}", task.name))
    })
}
