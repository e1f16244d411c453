//! Session creation, session queries and wishlist operations.

use super::CatalogService;
use crate::error::ConferenceError;
use crate::filters::NAME_PROPERTY;
use crate::forms::{ConferenceForm, SessionForm, parse_date, parse_time};
use crate::tasks;
use crate::types::{CONFERENCE_KIND, Conference, SESSION_KIND, Session, UserIdentity, parse_websafe_key};
use conference_central_core::key::Key;
use conference_central_core::query::{Operator, Query, SortOrder};
use conference_central_core::record_store::RecordStoreExt;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)] // Literal pattern
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("valid email regex"));

/// Duration given to sessions created without one.
pub const DEFAULT_DURATION: &str = "1";
/// Type given to sessions created without one.
pub const DEFAULT_SESSION_TYPE: &str = "Theory";
/// Highlights given to sessions created without any.
pub const DEFAULT_HIGHLIGHTS: &str = "Very good session";

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ConferenceError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConferenceError::BadRequest(message.to_string()))
}

fn validate_email(email: &str) -> Result<(), ConferenceError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ConferenceError::BadRequest(format!(
            "Invalid speaker email: {email}"
        )))
    }
}

fn sessions_query(conference_key: &Key) -> Query {
    Query::new(SESSION_KIND)
        .ancestor(conference_key.clone())
        .order(SortOrder::ascending(NAME_PROPERTY))
}

fn to_forms(sessions: &[Session]) -> Vec<SessionForm> {
    sessions.iter().map(SessionForm::from).collect()
}

impl CatalogService {
    /// Add a session to a conference the caller organizes.
    ///
    /// Enqueues a featured-speaker check for the speaker and a confirmation email to the
    /// organizer.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::BadRequest`] if name, speaker or a valid speaker email is missing,
    ///   or the date or start time is malformed
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - [`ConferenceError::Forbidden`] if the caller is not the organizer
    pub async fn create_session(
        &self,
        user: &UserIdentity,
        websafe_conference_key: &str,
        form: &SessionForm,
    ) -> Result<SessionForm, ConferenceError> {
        let name = required(form.name.as_deref(), "Session 'name' field required")?;
        let speaker = required(form.speaker.as_deref(), "Session 'speaker' field required")?;
        let speaker_email = required(
            form.speaker_email.as_deref(),
            "Session 'speakerEmail' field required",
        )?;
        validate_email(speaker_email)?;
        let date = parse_date("date", form.date.as_deref())?;
        let start_time = parse_time("startTime", form.start_time.as_deref())?;

        let conference_key = parse_websafe_key(websafe_conference_key, CONFERENCE_KIND)?;
        let conference = self.load_conference(&conference_key).await?;
        if conference.organizer_user_id != user.user_id {
            return Err(ConferenceError::Forbidden(
                "Only the owner can add sessions to the conference.".to_string(),
            ));
        }

        let key = self
            .store
            .allocate_id(SESSION_KIND, Some(&conference_key))
            .await?;
        let or_default = |value: Option<&str>, default: &str| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let session = Session {
            key,
            name: name.to_string(),
            highlights: or_default(form.highlights.as_deref(), DEFAULT_HIGHLIGHTS),
            speaker: speaker.to_string(),
            speaker_email: speaker_email.to_string(),
            duration: or_default(form.duration.as_deref(), DEFAULT_DURATION),
            type_of_session: or_default(form.type_of_session.as_deref(), DEFAULT_SESSION_TYPE),
            date,
            start_time,
        };
        self.store.put_entity(&session).await?;

        self.notifier.notify(tasks::set_featured_speaker(
            &session.speaker,
            &session.speaker_email,
            websafe_conference_key,
        ));
        let created = SessionForm::from(&session);
        self.notifier.notify(tasks::confirmation_email(
            &user.email,
            "You created a new Session!",
            &serde_json::to_string_pretty(&created).unwrap_or_else(|_| session.name.clone()),
        ));

        tracing::info!(
            session = %session.key,
            conference = %conference_key,
            speaker = %session.speaker,
            "Session created"
        );
        Ok(created)
    }

    /// All sessions of a conference, by name.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn get_conference_sessions(
        &self,
        websafe_conference_key: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let key = self.existing_conference(websafe_conference_key).await?;
        let sessions: Vec<Session> = self.store.query_entities(sessions_query(&key)).await?;
        Ok(to_forms(&sessions))
    }

    /// Sessions of a conference with the given type.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn get_conference_sessions_by_type(
        &self,
        websafe_conference_key: &str,
        type_of_session: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let key = self.existing_conference(websafe_conference_key).await?;
        let query = sessions_query(&key).filter("typeOfSession", Operator::Equal, type_of_session);
        let sessions: Vec<Session> = self.store.query_entities(query).await?;
        Ok(to_forms(&sessions))
    }

    /// Sessions of a conference with the given duration.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn get_conference_sessions_by_duration(
        &self,
        websafe_conference_key: &str,
        duration: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let key = self.existing_conference(websafe_conference_key).await?;
        let query = sessions_query(&key).filter("duration", Operator::Equal, duration);
        let sessions: Vec<Session> = self.store.query_entities(query).await?;
        Ok(to_forms(&sessions))
    }

    /// Sessions given by `speaker`, across all conferences.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_sessions_by_speaker(
        &self,
        speaker: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let query = Query::new(SESSION_KIND)
            .filter("speaker", Operator::Equal, speaker)
            .order(SortOrder::ascending(NAME_PROPERTY));
        let sessions: Vec<Session> = self.store.query_entities(query).await?;
        Ok(to_forms(&sessions))
    }

    /// Sessions given by `speaker` registered under `speaker_email`.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::BadRequest`] if the email is malformed
    /// - store failures
    pub async fn get_sessions_by_speaker_and_email(
        &self,
        speaker: &str,
        speaker_email: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        validate_email(speaker_email)?;
        let query = Query::new(SESSION_KIND)
            .filter("speaker", Operator::Equal, speaker)
            .filter("speakerEmail", Operator::Equal, speaker_email)
            .order(SortOrder::ascending(NAME_PROPERTY));
        let sessions: Vec<Session> = self.store.query_entities(query).await?;
        Ok(to_forms(&sessions))
    }

    /// Sessions on the caller's wishlist, in the order they were added.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::Conflict`] if the wishlist is empty
    /// - store failures
    pub async fn get_sessions_in_wishlist(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let profile = self.profile_for(user).await?;
        if profile.wishlist.is_empty() {
            return Err(ConferenceError::Conflict(
                "Your wishlist is empty".to_string(),
            ));
        }
        let sessions = self.engine.resolve_sessions(&profile.wishlist).await?;
        Ok(to_forms(&sessions))
    }

    /// Conferences hosting the caller's wishlisted sessions, each listed once.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_conferences_from_wishlist(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<ConferenceForm>, ConferenceError> {
        let profile = self.profile_for(user).await?;
        let mut conference_keys: Vec<Key> = Vec::new();
        for parent in profile.wishlist.iter().filter_map(Key::parent) {
            if !conference_keys.contains(&parent) {
                conference_keys.push(parent);
            }
        }
        if conference_keys.is_empty() {
            return Ok(Vec::new());
        }

        let conferences: Vec<Conference> = self
            .store
            .get_entities::<Conference>(&conference_keys)
            .await?
            .into_iter()
            .flatten()
            .collect();
        self.render_conferences(&conferences).await
    }

    /// Add a session to the caller's wishlist.
    ///
    /// # Errors
    ///
    /// See [`AllocationEngine::wishlist_add`](crate::allocation::AllocationEngine::wishlist_add).
    pub async fn add_session_to_wishlist(
        &self,
        user: &UserIdentity,
        websafe_session_key: &str,
    ) -> Result<bool, ConferenceError> {
        let key = parse_websafe_key(websafe_session_key, SESSION_KIND)?;
        self.engine.wishlist_add(user, &key).await
    }

    /// Remove a session from the caller's wishlist and return what is left on it.
    ///
    /// # Errors
    ///
    /// See [`AllocationEngine::wishlist_remove`](crate::allocation::AllocationEngine::wishlist_remove).
    pub async fn remove_session_from_wishlist(
        &self,
        user: &UserIdentity,
        websafe_session_key: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let key = parse_websafe_key(websafe_session_key, SESSION_KIND)?;
        let remaining = self.engine.wishlist_remove(user, &key).await?;
        Ok(to_forms(&remaining))
    }

    /// Sessions before the configured cutoff that are not of the excluded type.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn get_sessions_before(
        &self,
        websafe_conference_key: &str,
    ) -> Result<Vec<SessionForm>, ConferenceError> {
        let key = parse_websafe_key(websafe_conference_key, CONFERENCE_KIND)?;
        let sessions = self
            .engine
            .sessions_before(
                &key,
                self.config.sessions_cutoff,
                &self.config.excluded_session_type,
            )
            .await?;
        Ok(to_forms(&sessions))
    }

    async fn existing_conference(&self, websafe: &str) -> Result<Key, ConferenceError> {
        let key = parse_websafe_key(websafe, CONFERENCE_KIND)?;
        self.load_conference(&key).await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_needs_a_dotted_domain() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b@mail.example.org").is_ok());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada").is_err());
    }

    #[test]
    fn required_fields_reject_blank_values() {
        assert!(required(Some("  "), "missing").is_err());
        assert!(required(None, "missing").is_err());
        assert_eq!(required(Some(" Rust "), "missing").ok(), Some("Rust"));
    }
}
