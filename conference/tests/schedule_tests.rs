//! Sessions starting before the evening cutoff.

#![allow(clippy::unwrap_used)]

mod common;

use chrono::NaiveTime;
use common::{Fixture, user};
use conference_central::error::ConferenceError;
use conference_central::forms::SessionForm;

fn at(name: &str, start: &str, kind: &str) -> SessionForm {
    SessionForm::new(name, "Ferris", "ferris@example.com")
        .with_start_time(start)
        .with_type(kind)
}

#[tokio::test]
async fn workshops_and_late_sessions_are_left_out() {
    let fx = Fixture::new();
    let org = user("org");
    let conf = fx.conference(&org, "RustConf", 10).await;
    fx.session(&org, &conf, at("Evening", "20:00", "Lecture")).await;
    fx.session(&org, &conf, at("Hands On", "18:00", "Workshop")).await;
    fx.session(&org, &conf, at("Morning", "09:00", "Lecture")).await;

    let cutoff = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
    let sessions = fx
        .engine()
        .sessions_before(&conf, cutoff, "WORKSHOP")
        .await
        .unwrap();

    let names: Vec<_> = sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Morning"]);
}

#[tokio::test]
async fn results_are_ordered_by_start_time() {
    let fx = Fixture::new();
    let org = user("org");
    let conf = fx.conference(&org, "RustConf", 10).await;
    fx.session(&org, &conf, at("Lunch Talk", "12:30", "Lecture")).await;
    fx.session(&org, &conf, at("Opening", "08:45", "Keynote")).await;
    fx.session(&org, &conf, at("Afternoon", "15:00", "Theory")).await;

    let sessions = fx
        .catalog
        .get_sessions_before(&conf.to_urlsafe())
        .await
        .unwrap();

    let times: Vec<_> = sessions
        .iter()
        .filter_map(|s| s.start_time.as_deref())
        .collect();
    assert_eq!(times, vec!["08:45", "12:30", "15:00"]);
}

#[tokio::test]
async fn sessions_without_start_time_are_left_out() {
    let fx = Fixture::new();
    let org = user("org");
    let conf = fx.conference(&org, "RustConf", 10).await;
    fx.session(
        &org,
        &conf,
        SessionForm::new("Unscheduled", "Ferris", "ferris@example.com"),
    )
    .await;
    fx.session(&org, &conf, at("Scheduled", "10:00", "Lecture")).await;

    let sessions = fx
        .catalog
        .get_sessions_before(&conf.to_urlsafe())
        .await
        .unwrap();

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].name.as_deref(), Some("Scheduled"));
}

#[tokio::test]
async fn cutoff_and_excluded_type_are_parameters() {
    let fx = Fixture::new();
    let org = user("org");
    let conf = fx.conference(&org, "RustConf", 10).await;
    fx.session(&org, &conf, at("Breakfast", "07:00", "Social")).await;
    fx.session(&org, &conf, at("Morning", "09:00", "Lecture")).await;
    fx.session(&org, &conf, at("Hands On", "10:00", "Workshop")).await;

    let cutoff = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
    let sessions = fx
        .engine()
        .sessions_before(&conf, cutoff, "social")
        .await
        .unwrap();

    let names: Vec<_> = sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Morning", "Hands On"]);
}

#[tokio::test]
async fn missing_conference_is_not_found() {
    let fx = Fixture::new();
    let org = user("org");
    let conf = fx.conference(&org, "RustConf", 10).await;
    let missing = conf.parent().unwrap().child("Conference", 777);

    let err = fx
        .engine()
        .sessions_before(&missing, NaiveTime::MIN, "WORKSHOP")
        .await
        .unwrap_err();

    assert!(matches!(err, ConferenceError::NotFound(_)));
}
