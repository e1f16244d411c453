//! Conference creation, updates, queries and registration.

use super::CatalogService;
use crate::allocation::abort;
use crate::error::ConferenceError;
use crate::filters;
use crate::forms::{ConferenceForm, ConferenceQueryForms, parse_date};
use crate::tasks;
use crate::types::{CONFERENCE_KIND, Conference, UserIdentity, parse_websafe_key};
use chrono::{Datelike, NaiveDate};
use conference_central_core::query::{Query, SortOrder};
use conference_central_core::record_store::RecordStoreExt;
use conference_central_runtime::run_in_transaction;

/// City used when a new conference names none.
pub const DEFAULT_CITY: &str = "Default City";
/// Topics used when a new conference lists none.
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Copy the present fields of an update form onto `conference`.
///
/// A capacity change moves `seats_available` by the same amount; shrinking below the number
/// of seats already taken is rejected.
fn apply_update(
    conference: &mut Conference,
    form: &ConferenceForm,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<(), ConferenceError> {
    if let Some(max_attendees) = form.max_attendees {
        let taken = conference
            .max_attendees
            .saturating_sub(conference.seats_available);
        let Some(seats) = max_attendees.checked_sub(taken) else {
            return Err(ConferenceError::Conflict(format!(
                "maxAttendees cannot be lower than the {taken} seats already taken"
            )));
        };
        conference.max_attendees = max_attendees;
        conference.seats_available = seats;
    }

    if let Some(name) = non_empty(form.name.as_deref()) {
        conference.name = name.to_string();
    }
    if let Some(description) = non_empty(form.description.as_deref()) {
        conference.description = Some(description.to_string());
    }
    if let Some(city) = non_empty(form.city.as_deref()) {
        conference.city = city.to_string();
    }
    if let Some(topics) = form.topics.as_ref().filter(|topics| !topics.is_empty()) {
        conference.topics.clone_from(topics);
    }
    if let Some(start_date) = start_date {
        conference.start_date = Some(start_date);
        conference.month = start_date.month();
    }
    if end_date.is_some() {
        conference.end_date = end_date;
    }
    Ok(())
}

impl CatalogService {
    /// Create a conference owned by the caller.
    ///
    /// Missing fields take defaults (city "Default City", no capacity, topics
    /// `["Default", "Topic"]`); `month` follows `startDate` and every seat starts free. A
    /// confirmation email task goes to the organizer afterwards.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::BadRequest`] if `name` is missing or a date is malformed
    /// - store failures
    pub async fn create_conference(
        &self,
        user: &UserIdentity,
        form: &ConferenceForm,
    ) -> Result<ConferenceForm, ConferenceError> {
        let name = non_empty(form.name.as_deref()).ok_or_else(|| {
            ConferenceError::BadRequest("Conference 'name' field required".to_string())
        })?;
        let start_date = parse_date("startDate", form.start_date.as_deref())?;
        let end_date = parse_date("endDate", form.end_date.as_deref())?;

        let profile = self.profile_for(user).await?;
        let key = self
            .store
            .allocate_id(CONFERENCE_KIND, Some(&profile.key))
            .await?;

        let max_attendees = form.max_attendees.unwrap_or(0);
        let conference = Conference {
            key,
            name: name.to_string(),
            description: non_empty(form.description.as_deref()).map(str::to_string),
            organizer_user_id: user.user_id.clone(),
            topics: form
                .topics
                .clone()
                .filter(|topics| !topics.is_empty())
                .unwrap_or_else(|| DEFAULT_TOPICS.map(str::to_string).to_vec()),
            city: non_empty(form.city.as_deref())
                .unwrap_or(DEFAULT_CITY)
                .to_string(),
            start_date,
            end_date,
            month: start_date.map_or(0, |date| date.month()),
            max_attendees,
            seats_available: max_attendees,
        };
        self.store.put_entity(&conference).await?;

        let created = ConferenceForm::from_conference(&conference, Some(&profile.display_name));
        self.notifier.notify(tasks::confirmation_email(
            &user.email,
            "You created a new Conference!",
            &serde_json::to_string_pretty(&created).unwrap_or_else(|_| conference.name.clone()),
        ));

        tracing::info!(
            conference = %conference.key,
            organizer = %user.user_id,
            max_attendees,
            "Conference created"
        );
        Ok(created)
    }

    /// Update a conference the caller organizes.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - [`ConferenceError::Forbidden`] if the caller is not the organizer
    /// - [`ConferenceError::Conflict`] if the new capacity is below the seats taken
    /// - [`ConferenceError::BadRequest`] if a date is malformed
    /// - [`ConferenceError::TransactionFailure`] if the retry budget runs out
    pub async fn update_conference(
        &self,
        user: &UserIdentity,
        websafe_conference_key: &str,
        form: &ConferenceForm,
    ) -> Result<ConferenceForm, ConferenceError> {
        let key = parse_websafe_key(websafe_conference_key, CONFERENCE_KIND)?;
        let start_date = parse_date("startDate", form.start_date.as_deref())?;
        let end_date = parse_date("endDate", form.end_date.as_deref())?;
        let key_ref = &key;

        let updated = run_in_transaction(
            self.engine.store(),
            self.engine.policy(),
            move |txn| async move {
                let Some(mut conference) = txn.get::<Conference>(key_ref).await? else {
                    return abort(ConferenceError::NotFound(format!(
                        "No conference found with key: {key_ref}"
                    )));
                };
                if conference.organizer_user_id != user.user_id {
                    return abort(ConferenceError::Forbidden(
                        "Only the owner can update the conference.".to_string(),
                    ));
                }
                if let Err(err) = apply_update(&mut conference, form, start_date, end_date) {
                    return abort(err);
                }
                txn.put(&conference).await?;
                Ok(conference)
            },
        )
        .await
        .map_err(ConferenceError::from)?;

        tracing::info!(conference = %updated.key, "Conference updated");
        let profile = self.profile_for(user).await?;
        Ok(ConferenceForm::from_conference(
            &updated,
            Some(&profile.display_name),
        ))
    }

    /// A conference with its organizer's display name.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::NotFound`] if the conference does not exist
    /// - store failures
    pub async fn get_conference(
        &self,
        websafe_conference_key: &str,
    ) -> Result<ConferenceForm, ConferenceError> {
        let key = parse_websafe_key(websafe_conference_key, CONFERENCE_KIND)?;
        let conference = self.load_conference(&key).await?;
        let names = self.organizer_names(std::slice::from_ref(&conference)).await?;
        Ok(ConferenceForm::from_conference(
            &conference,
            names.get(&conference.organizer_user_id).map(String::as_str),
        ))
    }

    /// Conferences the caller organizes, by name.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_conferences_created(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<ConferenceForm>, ConferenceError> {
        let profile = self.profile_for(user).await?;
        let query = Query::new(CONFERENCE_KIND)
            .ancestor(profile.key.clone())
            .order(SortOrder::ascending(filters::NAME_PROPERTY));
        let conferences: Vec<Conference> = self.store.query_entities(query).await?;

        Ok(conferences
            .iter()
            .map(|conference| {
                ConferenceForm::from_conference(conference, Some(&profile.display_name))
            })
            .collect())
    }

    /// Conferences matching a client filter set.
    ///
    /// # Errors
    ///
    /// - [`ConferenceError::InvalidFilter`] if the filters do not compile
    /// - store failures
    pub async fn query_conferences(
        &self,
        request: &ConferenceQueryForms,
    ) -> Result<Vec<ConferenceForm>, ConferenceError> {
        let query = filters::compile(&request.filters)?.into_query();
        let conferences: Vec<Conference> = self.store.query_entities(query).await?;
        self.render_conferences(&conferences).await
    }

    /// Conferences the caller is registered for, in registration order.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn get_conferences_to_attend(
        &self,
        user: &UserIdentity,
    ) -> Result<Vec<ConferenceForm>, ConferenceError> {
        let profile = self.profile_for(user).await?;
        let conferences: Vec<Conference> = self
            .store
            .get_entities::<Conference>(&profile.conference_keys_to_attend)
            .await?
            .into_iter()
            .flatten()
            .collect();
        self.render_conferences(&conferences).await
    }

    /// Take a seat at a conference.
    ///
    /// # Errors
    ///
    /// See [`AllocationEngine::register_seat`](crate::allocation::AllocationEngine::register_seat).
    pub async fn register_for_conference(
        &self,
        user: &UserIdentity,
        websafe_conference_key: &str,
    ) -> Result<bool, ConferenceError> {
        let key = parse_websafe_key(websafe_conference_key, CONFERENCE_KIND)?;
        self.engine.register_seat(user, &key, true).await
    }

    /// Give a seat back. Returns `false` if the caller was not registered.
    ///
    /// # Errors
    ///
    /// See [`AllocationEngine::register_seat`](crate::allocation::AllocationEngine::register_seat).
    pub async fn unregister_from_conference(
        &self,
        user: &UserIdentity,
        websafe_conference_key: &str,
    ) -> Result<bool, ConferenceError> {
        let key = parse_websafe_key(websafe_conference_key, CONFERENCE_KIND)?;
        self.engine.register_seat(user, &key, false).await
    }

    pub(super) async fn render_conferences(
        &self,
        conferences: &[Conference],
    ) -> Result<Vec<ConferenceForm>, ConferenceError> {
        let names = self.organizer_names(conferences).await?;
        Ok(conferences
            .iter()
            .map(|conference| {
                ConferenceForm::from_conference(
                    conference,
                    names.get(&conference.organizer_user_id).map(String::as_str),
                )
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use conference_central_core::key::Key;

    fn conference(max_attendees: u32, seats_available: u32) -> Conference {
        Conference {
            key: Key::new("Profile", "org").child("Conference", 1),
            name: "Old".into(),
            description: None,
            organizer_user_id: "org".into(),
            topics: vec!["Rust".into()],
            city: "Berlin".into(),
            start_date: None,
            end_date: None,
            month: 0,
            max_attendees,
            seats_available,
        }
    }

    #[test]
    fn capacity_changes_move_free_seats_by_the_same_delta() {
        let mut grown = conference(10, 4);
        apply_update(
            &mut grown,
            &ConferenceForm::default().with_max_attendees(15),
            None,
            None,
        )
        .unwrap();
        assert_eq!((grown.max_attendees, grown.seats_available), (15, 9));

        let mut shrunk = conference(10, 4);
        apply_update(
            &mut shrunk,
            &ConferenceForm::default().with_max_attendees(6),
            None,
            None,
        )
        .unwrap();
        assert_eq!((shrunk.max_attendees, shrunk.seats_available), (6, 0));
    }

    #[test]
    fn capacity_below_taken_seats_is_a_conflict() {
        let mut conf = conference(10, 4);
        let err = apply_update(
            &mut conf,
            &ConferenceForm::default().with_max_attendees(5),
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ConferenceError::Conflict(_)));
        assert_eq!(conf.max_attendees, 10);
    }

    #[test]
    fn empty_fields_leave_values_unchanged() {
        let mut conf = conference(10, 4);
        let form = ConferenceForm {
            name: Some("  ".into()),
            topics: Some(Vec::new()),
            ..ConferenceForm::default()
        }
        .with_city("Lisbon");
        let start = NaiveDate::from_ymd_opt(2026, 11, 2);

        apply_update(&mut conf, &form, start, None).unwrap();

        assert_eq!(conf.name, "Old");
        assert_eq!(conf.topics, vec!["Rust".to_string()]);
        assert_eq!(conf.city, "Lisbon");
        assert_eq!(conf.month, 11);
    }
}
