//! Sessions starting before a cutoff time.

use super::AllocationEngine;
use crate::error::ConferenceError;
use crate::types::{Conference, SESSION_KIND, Session};
use chrono::NaiveTime;
use conference_central_core::key::Key;
use conference_central_core::query::{Operator, Query, SortOrder};
use conference_central_core::record_store::RecordStoreExt;

/// Stored property holding a session's start time.
const START_TIME: &str = "startTime";

impl AllocationEngine {
    /// Sessions of a conference starting strictly before `cutoff`, earliest first, minus
    /// sessions of type `exclude_type` (compared case-insensitively) and sessions without a
    /// start time.
    ///
    /// The time range is the query's single inequality, so the type exclusion cannot be
    /// pushed to the store and is applied after the fetch.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn sessions_before(
        &self,
        conference_key: &Key,
        cutoff: NaiveTime,
        exclude_type: &str,
    ) -> Result<Vec<Session>, ConferenceError> {
        if self
            .store
            .get_entity::<Conference>(conference_key)
            .await?
            .is_none()
        {
            return Err(ConferenceError::NotFound(format!(
                "No conference found with key: {conference_key}"
            )));
        }

        // Times are stored in their `HH:MM:SS` display form, which orders lexicographically.
        let query = Query::new(SESSION_KIND)
            .ancestor(conference_key.clone())
            .filter(START_TIME, Operator::LessThan, cutoff.to_string())
            .order(SortOrder::ascending(START_TIME));

        let sessions: Vec<Session> = self.store.query_entities(query).await?;
        let fetched = sessions.len();
        let kept: Vec<Session> = sessions
            .into_iter()
            .filter(|session| {
                session.start_time.is_some()
                    && !session.type_of_session.eq_ignore_ascii_case(exclude_type)
            })
            .collect();

        tracing::debug!(
            conference = %conference_key,
            %cutoff,
            fetched,
            kept = kept.len(),
            "Selected sessions before cutoff"
        );
        Ok(kept)
    }
}
