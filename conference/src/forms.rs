//! Wire forms and their explicit mappings to and from stored records.
//!
//! Forms use camelCase field names, dates as `YYYY-MM-DD` and times as `HH:MM`. Each record
//! type has one hand-written mapping per direction, so adding a field to a record is a
//! compile error until every form that should carry it does.

use crate::error::ConferenceError;
use crate::filters::FilterTriple;
use crate::types::{Conference, Profile, Session, TeeShirtSize};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Wire format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Wire format for times of day.
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse an optional `YYYY-MM-DD` date. Anything after the first ten characters is ignored,
/// so full timestamps are accepted too.
///
/// # Errors
///
/// Returns [`ConferenceError::BadRequest`] if the date does not parse.
pub fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, ConferenceError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ConferenceError::BadRequest(format!("{field} must be YYYY-MM-DD, got {raw:?}")))
}

/// Parse an optional `HH:MM` time.
///
/// # Errors
///
/// Returns [`ConferenceError::BadRequest`] if the time does not parse.
pub fn parse_time(field: &str, raw: Option<&str>) -> Result<Option<NaiveTime>, ConferenceError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    NaiveTime::parse_from_str(raw, TIME_FORMAT)
        .map(Some)
        .map_err(|_| ConferenceError::BadRequest(format!("{field} must be HH:MM, got {raw:?}")))
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|date| date.format(DATE_FORMAT).to_string())
}

// ============================================================================
// Profiles
// ============================================================================

/// Profile as returned to its owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileForm {
    /// Display name.
    pub display_name: String,
    /// Contact email.
    pub main_email: String,
    /// T-shirt size.
    pub tee_shirt_size: TeeShirtSize,
    /// Websafe keys of conferences the user registered for.
    pub conference_keys_to_attend: Vec<String>,
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            main_email: profile.main_email.clone(),
            tee_shirt_size: profile.tee_shirt_size,
            conference_keys_to_attend: profile
                .conference_keys_to_attend
                .iter()
                .map(|key| key.to_urlsafe())
                .collect(),
        }
    }
}

/// Editable profile fields. Absent or empty fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMiniForm {
    /// New display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// New t-shirt size.
    #[serde(default)]
    pub tee_shirt_size: Option<TeeShirtSize>,
}

impl ProfileMiniForm {
    /// Copy the present fields onto `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = self.display_name.as_deref().filter(|name| !name.is_empty()) {
            profile.display_name = name.to_string();
        }
        if let Some(size) = self.tee_shirt_size {
            profile.tee_shirt_size = size;
        }
    }
}

// ============================================================================
// Conferences
// ============================================================================

/// Conference input and output.
///
/// On input only `name` is required; output fields (`websafeKey`, `organizerDisplayName`,
/// `seatsAvailable`) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceForm {
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Organizer user id (output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_user_id: Option<String>,
    /// Topics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// First day, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Month of the start date (output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    /// Capacity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attendees: Option<u32>,
    /// Seats left (output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats_available: Option<u32>,
    /// Last day, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Websafe record key (output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websafe_key: Option<String>,
    /// Organizer's display name (output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_display_name: Option<String>,
}

impl ConferenceForm {
    /// Render a stored conference, optionally with its organizer's display name.
    #[must_use]
    pub fn from_conference(conference: &Conference, organizer_display_name: Option<&str>) -> Self {
        Self {
            name: Some(conference.name.clone()),
            description: conference.description.clone(),
            organizer_user_id: Some(conference.organizer_user_id.clone()),
            topics: Some(conference.topics.clone()),
            city: Some(conference.city.clone()),
            start_date: format_date(conference.start_date),
            month: Some(conference.month),
            max_attendees: Some(conference.max_attendees),
            seats_available: Some(conference.seats_available),
            end_date: format_date(conference.end_date),
            websafe_key: Some(conference.key.to_urlsafe()),
            organizer_display_name: organizer_display_name
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }

    /// Set the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the city.
    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Set the topics.
    #[must_use]
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = Some(topics.into_iter().map(Into::into).collect());
        self
    }

    /// Set the start date (`YYYY-MM-DD`).
    #[must_use]
    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    /// Set the capacity.
    #[must_use]
    pub const fn with_max_attendees(mut self, max_attendees: u32) -> Self {
        self.max_attendees = Some(max_attendees);
        self
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Session input and output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionForm {
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short pitch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<String>,
    /// Speaker name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Speaker email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_email: Option<String>,
    /// Duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Session category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_session: Option<String>,
    /// Day, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Start time, `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Websafe record key (output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websafe_key: Option<String>,
}

impl From<&Session> for SessionForm {
    fn from(session: &Session) -> Self {
        Self {
            name: Some(session.name.clone()),
            highlights: Some(session.highlights.clone()),
            speaker: Some(session.speaker.clone()),
            speaker_email: Some(session.speaker_email.clone()),
            duration: Some(session.duration.clone()),
            type_of_session: Some(session.type_of_session.clone()),
            date: format_date(session.date),
            start_time: session
                .start_time
                .map(|time| time.format(TIME_FORMAT).to_string()),
            websafe_key: Some(session.key.to_urlsafe()),
        }
    }
}

impl SessionForm {
    /// A session request with the three required fields set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        speaker: impl Into<String>,
        speaker_email: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            speaker: Some(speaker.into()),
            speaker_email: Some(speaker_email.into()),
            ..Self::default()
        }
    }

    /// Set the session type.
    #[must_use]
    pub fn with_type(mut self, type_of_session: impl Into<String>) -> Self {
        self.type_of_session = Some(type_of_session.into());
        self
    }

    /// Set the start time (`HH:MM`).
    #[must_use]
    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    /// Set the date (`YYYY-MM-DD`).
    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the duration.
    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }
}

// ============================================================================
// Queries
// ============================================================================

/// A conference query request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceQueryForms {
    /// Filters, all of which must match.
    #[serde(default)]
    pub filters: Vec<FilterTriple>,
}

impl ConferenceQueryForms {
    /// Add a filter.
    #[must_use]
    pub fn with_filter(
        mut self,
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.filters.push(FilterTriple::new(field, operator, value));
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::UserIdentity;
    use conference_central_core::key::Key;
    use serde_json::json;

    fn conference() -> Conference {
        Conference {
            key: Key::new("Profile", "org").child("Conference", 3),
            name: "RustConf".into(),
            description: None,
            organizer_user_id: "org".into(),
            topics: vec!["Rust".into()],
            city: "Portland".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 9, 8),
            end_date: None,
            month: 9,
            max_attendees: 100,
            seats_available: 40,
        }
    }

    #[test]
    fn conference_form_uses_wire_names_and_formats() {
        let form = ConferenceForm::from_conference(&conference(), Some("Organizer"));
        let value = serde_json::to_value(&form).unwrap();

        assert_eq!(value["startDate"], json!("2026-09-08"));
        assert_eq!(value["seatsAvailable"], json!(40));
        assert_eq!(value["organizerDisplayName"], json!("Organizer"));
        assert!(value.get("endDate").is_none());
        assert!(value.get("description").is_none());
    }

    #[test]
    fn empty_organizer_name_is_omitted() {
        let form = ConferenceForm::from_conference(&conference(), Some(""));
        assert_eq!(form.organizer_display_name, None);
    }

    #[test]
    fn dates_accept_timestamps_and_reject_garbage() {
        assert_eq!(
            parse_date("startDate", Some("2026-05-01T10:00:00")).unwrap(),
            NaiveDate::from_ymd_opt(2026, 5, 1)
        );
        assert_eq!(parse_date("startDate", Some("")).unwrap(), None);
        assert!(matches!(
            parse_date("startDate", Some("May 1st")),
            Err(ConferenceError::BadRequest(_))
        ));
    }

    #[test]
    fn times_parse_hours_and_minutes() {
        assert_eq!(
            parse_time("startTime", Some("18:30")).unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0)
        );
        assert!(parse_time("startTime", Some("6pm")).is_err());
    }

    #[test]
    fn mini_form_skips_empty_fields() {
        let user = UserIdentity::new("u", "u@example.com", "Nick");
        let mut profile = Profile::new(&user);

        ProfileMiniForm {
            display_name: Some(String::new()),
            tee_shirt_size: Some(TeeShirtSize::LW),
        }
        .apply_to(&mut profile);

        assert_eq!(profile.display_name, "Nick");
        assert_eq!(profile.tee_shirt_size, TeeShirtSize::LW);
    }

    #[test]
    fn query_forms_deserialize_from_client_json() {
        let forms: ConferenceQueryForms = serde_json::from_value(json!({
            "filters": [{ "field": "CITY", "operator": "EQ", "value": "London" }]
        }))
        .unwrap();

        assert_eq!(forms.filters, vec![FilterTriple::new("CITY", "EQ", "London")]);
    }
}
