//! Wishlist management and wishlist-derived reads.

#![allow(clippy::unwrap_used)]

mod common;

use common::{Fixture, user};
use conference_central::error::ConferenceError;
use conference_central::forms::SessionForm;

fn talk(name: &str) -> SessionForm {
    SessionForm::new(name, "Ferris", "ferris@example.com").with_start_time("10:00")
}

#[tokio::test]
async fn adding_twice_is_a_conflict_and_keeps_one_entry() {
    let fx = Fixture::new();
    let org = user("org");
    let alice = user("alice");
    let conf = fx.conference(&org, "RustConf", 10).await;
    let session = fx.session(&org, &conf, talk("Ownership")).await;

    assert!(fx.engine().wishlist_add(&alice, &session).await.unwrap());
    let err = fx.engine().wishlist_add(&alice, &session).await.unwrap_err();

    assert!(matches!(err, ConferenceError::Conflict(_)));
    assert_eq!(fx.stored_profile(&alice).await.unwrap().wishlist, vec![session]);
}

#[tokio::test]
async fn adding_a_missing_session_is_not_found() {
    let fx = Fixture::new();
    let org = user("org");
    let alice = user("alice");
    let conf = fx.conference(&org, "RustConf", 10).await;

    let err = fx
        .engine()
        .wishlist_add(&alice, &conf.child("Session", 404))
        .await
        .unwrap_err();

    assert!(matches!(err, ConferenceError::NotFound(_)));
    assert!(fx.stored_profile(&alice).await.is_none());
}

#[tokio::test]
async fn removing_from_an_empty_wishlist_is_a_conflict() {
    let fx = Fixture::new();
    let org = user("org");
    let alice = user("alice");
    let conf = fx.conference(&org, "RustConf", 10).await;
    let session = fx.session(&org, &conf, talk("Ownership")).await;

    let err = fx
        .engine()
        .wishlist_remove(&alice, &session)
        .await
        .unwrap_err();

    assert!(matches!(&err, ConferenceError::Conflict(msg) if msg.contains("empty")));
}

#[tokio::test]
async fn removing_an_absent_key_is_a_conflict_without_mutation() {
    let fx = Fixture::new();
    let org = user("org");
    let alice = user("alice");
    let conf = fx.conference(&org, "RustConf", 10).await;
    let kept = fx.session(&org, &conf, talk("Ownership")).await;
    let other = fx.session(&org, &conf, talk("Lifetimes")).await;
    fx.engine().wishlist_add(&alice, &kept).await.unwrap();

    let err = fx.engine().wishlist_remove(&alice, &other).await.unwrap_err();

    assert!(matches!(&err, ConferenceError::Conflict(msg) if msg.contains("not in your wishlist")));
    assert_eq!(fx.stored_profile(&alice).await.unwrap().wishlist, vec![kept]);
}

#[tokio::test]
async fn remove_returns_the_remaining_sessions_resolved() {
    let fx = Fixture::new();
    let org = user("org");
    let alice = user("alice");
    let conf = fx.conference(&org, "RustConf", 10).await;
    let first = fx.session(&org, &conf, talk("Ownership")).await;
    let second = fx.session(&org, &conf, talk("Lifetimes")).await;
    let third = fx.session(&org, &conf, talk("Traits")).await;
    for key in [&first, &second, &third] {
        fx.engine().wishlist_add(&alice, key).await.unwrap();
    }

    let remaining = fx
        .catalog
        .remove_session_from_wishlist(&alice, &second.to_urlsafe())
        .await
        .unwrap();

    let names: Vec<_> = remaining.iter().filter_map(|s| s.name.as_deref()).collect();
    assert_eq!(names, vec!["Ownership", "Traits"]);
}

#[tokio::test]
async fn catalog_wishlist_reads() {
    let fx = Fixture::new();
    let org = user("org");
    let alice = user("alice");
    let rust = fx.conference(&org, "RustConf", 10).await;
    let web = fx.conference(&org, "WebWeek", 10).await;
    let a = fx.session(&org, &rust, talk("Ownership")).await;
    let b = fx.session(&org, &web, talk("HTTP/3")).await;
    let c = fx.session(&org, &rust, talk("Traits")).await;

    let err = fx.catalog.get_sessions_in_wishlist(&alice).await.unwrap_err();
    assert!(matches!(err, ConferenceError::Conflict(_)));
    assert!(
        fx.catalog
            .get_conferences_from_wishlist(&alice)
            .await
            .unwrap()
            .is_empty()
    );

    for key in [&a, &b, &c] {
        fx.catalog
            .add_session_to_wishlist(&alice, &key.to_urlsafe())
            .await
            .unwrap();
    }

    let sessions = fx.catalog.get_sessions_in_wishlist(&alice).await.unwrap();
    assert_eq!(sessions.len(), 3);

    let conferences = fx.catalog.get_conferences_from_wishlist(&alice).await.unwrap();
    let names: Vec<_> = conferences.iter().filter_map(|c| c.name.as_deref()).collect();
    assert_eq!(names, vec!["RustConf", "WebWeek"]);
}

#[tokio::test]
async fn malformed_websafe_keys_are_not_found() {
    let fx = Fixture::new();
    let alice = user("alice");

    let err = fx
        .catalog
        .add_session_to_wishlist(&alice, "not-a-key!!")
        .await
        .unwrap_err();

    assert!(matches!(err, ConferenceError::NotFound(_)));
}
