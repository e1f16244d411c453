//! Domain records for Conference Central.
//!
//! Three entity kinds are stored, forming a key hierarchy:
//!
//! ```text
//! Profile(user id)
//!   └── Conference(allocated id)
//!         └── Session(allocated id)
//! ```
//!
//! A conference belongs to the profile of its organizer and a session to its conference, so
//! ancestor queries answer "conferences created by" and "sessions of" directly.

use crate::error::ConferenceError;
use chrono::{NaiveDate, NaiveTime};
use conference_central_core::entity::Entity;
use conference_central_core::key::Key;
use serde::{Deserialize, Serialize};

/// Kind name of profile keys.
pub const PROFILE_KIND: &str = "Profile";
/// Kind name of conference keys.
pub const CONFERENCE_KIND: &str = "Conference";
/// Kind name of session keys.
pub const SESSION_KIND: &str = "Session";

// ============================================================================
// Caller identity
// ============================================================================

/// The authenticated caller.
///
/// Authentication happens outside this crate; services trust what they are given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    /// Stable user id, used as the profile key name.
    pub user_id: String,
    /// Email address.
    pub email: String,
    /// Display name suggested by the identity provider.
    pub nickname: String,
}

impl UserIdentity {
    /// Create an identity.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            nickname: nickname.into(),
        }
    }

    /// Key of this user's profile.
    #[must_use]
    pub fn profile_key(&self) -> Key {
        Profile::key_for(&self.user_id)
    }
}

// ============================================================================
// Profile
// ============================================================================

/// T-shirt sizes offered to attendees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum TeeShirtSize {
    #[default]
    NotSpecified,
    XsM,
    XsW,
    SM,
    SW,
    MM,
    MW,
    LM,
    LW,
    XlM,
    XlW,
    XxlM,
    XxlW,
    XxxlM,
    XxxlW,
}

/// A user's profile: display data plus registration and wishlist state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// `Profile(user_id)`.
    pub key: Key,
    /// Name shown to other users.
    pub display_name: String,
    /// Contact email.
    pub main_email: String,
    /// Preferred t-shirt size.
    #[serde(default)]
    pub tee_shirt_size: TeeShirtSize,
    /// Conferences the user registered for, in registration order. No duplicates.
    #[serde(default)]
    pub conference_keys_to_attend: Vec<Key>,
    /// Wishlisted sessions, in insertion order. No duplicates.
    #[serde(default)]
    pub wishlist: Vec<Key>,
}

impl Profile {
    /// Profile key for `user_id`.
    #[must_use]
    pub fn key_for(user_id: &str) -> Key {
        Key::new(PROFILE_KIND, user_id)
    }

    /// A fresh profile for a first-time caller.
    #[must_use]
    pub fn new(user: &UserIdentity) -> Self {
        Self {
            key: user.profile_key(),
            display_name: user.nickname.clone(),
            main_email: user.email.clone(),
            tee_shirt_size: TeeShirtSize::NotSpecified,
            conference_keys_to_attend: Vec::new(),
            wishlist: Vec::new(),
        }
    }

    /// Whether the user is registered for `conference`.
    #[must_use]
    pub fn is_attending(&self, conference: &Key) -> bool {
        self.conference_keys_to_attend.contains(conference)
    }

    /// Whether `session` is on the wishlist.
    #[must_use]
    pub fn has_wishlisted(&self, session: &Key) -> bool {
        self.wishlist.contains(session)
    }
}

impl Entity for Profile {
    const KIND: &'static str = PROFILE_KIND;

    fn key(&self) -> &Key {
        &self.key
    }
}

// ============================================================================
// Conference
// ============================================================================

/// A conference with a finite number of seats.
///
/// Invariant: `seats_available <= max_attendees` whenever `max_attendees > 0`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    /// `Profile(organizer)/Conference(id)`.
    pub key: Key,
    /// Conference name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// User id of the organizer.
    pub organizer_user_id: String,
    /// Topics covered.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Host city.
    pub city: String,
    /// First day.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Month of `start_date` (1-12), or 0 without a start date.
    pub month: u32,
    /// Capacity.
    pub max_attendees: u32,
    /// Seats not yet taken.
    pub seats_available: u32,
}

impl Entity for Conference {
    const KIND: &'static str = CONFERENCE_KIND;

    fn key(&self) -> &Key {
        &self.key
    }
}

// ============================================================================
// Session
// ============================================================================

/// A talk or workshop within a conference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// `Profile(organizer)/Conference(id)/Session(id)`.
    pub key: Key,
    /// Session title.
    pub name: String,
    /// Short pitch.
    pub highlights: String,
    /// Speaker name.
    pub speaker: String,
    /// Speaker contact email.
    pub speaker_email: String,
    /// Duration, as entered by the organizer.
    pub duration: String,
    /// Category such as `Lecture`, `Theory` or `WORKSHOP`.
    pub type_of_session: String,
    /// Day the session takes place.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Start time. Stored as `null` when unset.
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
}

impl Session {
    /// Key of the conference this session belongs to.
    #[must_use]
    pub fn conference_key(&self) -> Option<Key> {
        self.key.parent()
    }
}

impl Entity for Session {
    const KIND: &'static str = SESSION_KIND;

    fn key(&self) -> &Key {
        &self.key
    }
}

/// Decode a websafe key and check it names a record of `kind`.
///
/// An undecodable key or one of another kind names no record of that kind, so both are
/// reported as [`ConferenceError::NotFound`].
///
/// # Errors
///
/// Returns [`ConferenceError::NotFound`] when the key is malformed or of another kind.
pub fn parse_websafe_key(websafe: &str, kind: &str) -> Result<Key, ConferenceError> {
    let not_found = || ConferenceError::NotFound(format!("No {kind} found with key: {websafe}"));
    let key = Key::from_urlsafe(websafe).map_err(|_| not_found())?;
    if key.kind() == kind {
        Ok(key)
    } else {
        Err(not_found())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tee_shirt_sizes_use_wire_names() {
        assert_eq!(
            serde_json::to_value(TeeShirtSize::NotSpecified).unwrap(),
            json!("NOT_SPECIFIED")
        );
        assert_eq!(serde_json::to_value(TeeShirtSize::XxlW).unwrap(), json!("XXL_W"));
        assert_eq!(
            serde_json::from_value::<TeeShirtSize>(json!("S_M")).unwrap(),
            TeeShirtSize::SM
        );
    }

    #[test]
    fn new_profile_takes_identity_defaults() {
        let user = UserIdentity::new("u1", "u1@example.com", "Una");
        let profile = Profile::new(&user);

        assert_eq!(profile.key, Key::new("Profile", "u1"));
        assert_eq!(profile.display_name, "Una");
        assert_eq!(profile.main_email, "u1@example.com");
        assert_eq!(profile.tee_shirt_size, TeeShirtSize::NotSpecified);
        assert!(profile.conference_keys_to_attend.is_empty());
        assert!(profile.wishlist.is_empty());
    }

    #[test]
    fn session_times_are_stored_as_comparable_strings() {
        let key = Key::new("Profile", "u1").child("Conference", 1).child("Session", 2);
        let session = Session {
            key: key.clone(),
            name: "Intro".into(),
            highlights: String::new(),
            speaker: "Ada".into(),
            speaker_email: "ada@example.com".into(),
            duration: "1".into(),
            type_of_session: "Lecture".into(),
            date: None,
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
        };

        let record = session.to_record().unwrap();
        assert_eq!(record.properties["startTime"], json!("09:00:00"));
        assert_eq!(record.properties["date"], json!(null));
        assert_eq!(session.conference_key(), key.parent());
    }

    #[test]
    fn websafe_keys_must_match_the_expected_kind() {
        let conference = Key::new("Profile", "u1").child("Conference", 7);

        let parsed = parse_websafe_key(&conference.to_urlsafe(), CONFERENCE_KIND).unwrap();
        assert_eq!(parsed, conference);

        assert!(matches!(
            parse_websafe_key(&conference.to_urlsafe(), SESSION_KIND),
            Err(ConferenceError::NotFound(_))
        ));
        assert!(matches!(
            parse_websafe_key("not a key!", CONFERENCE_KIND),
            Err(ConferenceError::NotFound(_))
        ));
    }
}
