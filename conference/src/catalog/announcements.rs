//! Cached announcement and featured-speaker strings.

use super::CatalogService;
use crate::error::ConferenceError;
use crate::filters::NAME_PROPERTY;
use crate::types::{CONFERENCE_KIND, Conference, SESSION_KIND, Session};
use conference_central_core::key::Key;
use conference_central_core::query::{Operator, Query, SortOrder};
use conference_central_core::record_store::RecordStoreExt;

/// Cache key of the nearly-sold-out announcement.
pub const ANNOUNCEMENTS_KEY: &str = "RECENT_ANNOUNCEMENTS";
/// Cache key of the featured-speaker line.
pub const FEATURED_SPEAKER_KEY: &str = "FEATURED SPEAKERS";
/// Leading text of the announcement.
pub const ANNOUNCEMENT_PREFIX: &str =
    "Last chance to attend! The following conferences are nearly sold out: ";
/// Returned when no featured speaker has been cached.
pub const NO_FEATURED_SPEAKER: &str = "no featured speaker";

impl CatalogService {
    /// Rebuild the nearly-sold-out announcement.
    ///
    /// Conferences with at least one but no more than the configured threshold of seats left
    /// are listed. With none, the cached announcement is removed and an empty string returned.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn cache_announcement(&self) -> Result<String, ConferenceError> {
        let query = Query::new(CONFERENCE_KIND)
            .filter(
                "seatsAvailable",
                Operator::LessThanOrEqual,
                i64::from(self.config.announcement_seat_threshold),
            )
            .filter("seatsAvailable", Operator::GreaterThan, 0_i64)
            .order(SortOrder::ascending("seatsAvailable"))
            .order(SortOrder::ascending(NAME_PROPERTY));
        let conferences: Vec<Conference> = self.store.query_entities(query).await?;

        if conferences.is_empty() {
            self.cache.delete(ANNOUNCEMENTS_KEY).await;
            tracing::debug!("No conferences nearly sold out, announcement cleared");
            return Ok(String::new());
        }

        let names: Vec<&str> = conferences.iter().map(|c| c.name.as_str()).collect();
        let announcement = format!("{ANNOUNCEMENT_PREFIX}{}", names.join(", "));
        self.cache
            .set(ANNOUNCEMENTS_KEY, announcement.clone())
            .await;
        tracing::info!(conferences = names.len(), "Announcement cached");
        Ok(announcement)
    }

    /// The cached announcement, or an empty string.
    pub async fn get_announcement(&self) -> String {
        self.cache
            .get(ANNOUNCEMENTS_KEY)
            .await
            .unwrap_or_default()
    }

    /// Feature `speaker` if they give more than one session at the conference.
    ///
    /// Returns the cached line, or an empty string when the speaker does not qualify (the
    /// previous featured speaker is then left in place).
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn cache_featured_speaker(
        &self,
        speaker: &str,
        speaker_email: &str,
        conference_key: &Key,
    ) -> Result<String, ConferenceError> {
        let conference = self.load_conference(conference_key).await?;
        let query = Query::new(SESSION_KIND)
            .ancestor(conference_key.clone())
            .filter("speaker", Operator::Equal, speaker)
            .filter("speakerEmail", Operator::Equal, speaker_email)
            .order(SortOrder::ascending(NAME_PROPERTY));
        let sessions: Vec<Session> = self.store.query_entities(query).await?;

        if sessions.len() < 2 {
            return Ok(String::new());
        }

        let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        let featured = format!(
            "{speaker} speaks at {} in conference {}",
            names.join(", "),
            conference.name
        );
        self.cache.set(FEATURED_SPEAKER_KEY, featured.clone()).await;
        tracing::info!(speaker, sessions = names.len(), "Featured speaker cached");
        Ok(featured)
    }

    /// The cached featured-speaker line, or [`NO_FEATURED_SPEAKER`].
    pub async fn get_featured_speaker(&self) -> String {
        self.cache
            .get(FEATURED_SPEAKER_KEY)
            .await
            .unwrap_or_else(|| NO_FEATURED_SPEAKER.to_string())
    }
}
