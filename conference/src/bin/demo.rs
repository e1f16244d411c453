//! Conference Central Demo
//!
//! Walks through the main catalog flows against the configured store:
//! - Conference creation and filtered queries
//! - Seat registration until the conference is full, then a cancellation
//! - Sessions, wishlists and the sessions-before query
//! - Draining enqueued tasks (confirmation emails, featured speaker)
//!
//! # Usage
//!
//! ```bash
//! # In-memory store
//! cargo run --bin demo
//!
//! # Postgres
//! STORE_BACKEND=postgres DATABASE_URL=postgres://... cargo run --bin demo
//! ```

use anyhow::Context;
use conference_central::prelude::*;
use conference_central_runtime::metrics::MetricsServer;
use conference_central_testing::RecordingNotifier;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conference_central=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let _metrics = if config.metrics.enabled {
        let addr = config
            .metrics
            .addr
            .parse()
            .with_context(|| format!("invalid METRICS_ADDR: {}", config.metrics.addr))?;
        let mut server = MetricsServer::new(addr);
        server.start()?;
        Some(server)
    } else {
        None
    };

    let notifier = Arc::new(RecordingNotifier::new());
    let app = App::build(&config, notifier.clone()).await?;
    let catalog = &app.catalog;

    println!("\n=== Conference Central Demo ===\n");

    // Organizer and attendees
    let organizer = UserIdentity::new("org", "org@example.com", "Olga");
    let alice = UserIdentity::new("alice", "alice@example.com", "Alice");
    let bob = UserIdentity::new("bob", "bob@example.com", "Bob");
    let carol = UserIdentity::new("carol", "carol@example.com", "Carol");

    // 1. Conferences
    let rustconf = catalog
        .create_conference(
            &organizer,
            &ConferenceForm::default()
                .with_name("RustConf")
                .with_city("Portland")
                .with_topics(["Rust", "Systems"])
                .with_start_date("2026-09-10")
                .with_max_attendees(2),
        )
        .await?;
    catalog
        .create_conference(
            &organizer,
            &ConferenceForm::default()
                .with_name("WebWeek")
                .with_city("Berlin")
                .with_topics(["Web"])
                .with_start_date("2026-06-01")
                .with_max_attendees(200),
        )
        .await?;
    let conference_key = rustconf
        .websafe_key
        .clone()
        .context("created conference has no key")?;
    println!("Created RustConf ({conference_key}) with 2 seats");

    let query = ConferenceQueryForms::default()
        .with_filter("CITY", "EQ", "Portland")
        .with_filter("MONTH", "GT", "6");
    for conference in catalog.query_conferences(&query).await? {
        println!(
            "  Query match: {} organized by {}",
            conference.name.unwrap_or_default(),
            conference.organizer_display_name.unwrap_or_default()
        );
    }

    // 2. Registrations
    for user in [&alice, &bob, &carol] {
        match catalog.register_for_conference(user, &conference_key).await {
            Ok(_) => println!("{} registered", user.nickname),
            Err(err) => println!("{} could not register: {err}", user.nickname),
        }
    }
    catalog
        .unregister_from_conference(&alice, &conference_key)
        .await?;
    let seats = catalog
        .get_conference(&conference_key)
        .await?
        .seats_available
        .unwrap_or_default();
    println!("Alice cancelled; {seats} seat(s) available\n");

    // 3. Sessions
    let sessions = [
        ("Ownership in Practice", "09:00", "Lecture"),
        ("Async Deep Dive", "18:00", "WORKSHOP"),
        ("Evening Keynote", "20:00", "Lecture"),
    ];
    let mut session_keys = Vec::new();
    for (name, start, kind) in sessions {
        let session = catalog
            .create_session(
                &organizer,
                &conference_key,
                &SessionForm::new(name, "Ferris", "ferris@example.com")
                    .with_type(kind)
                    .with_start_time(start)
                    .with_date("2026-09-10"),
            )
            .await?;
        session_keys.push(session.websafe_key.context("created session has no key")?);
    }

    for key in &session_keys {
        catalog.add_session_to_wishlist(&bob, key).await?;
    }
    let remaining = catalog
        .remove_session_from_wishlist(&bob, &session_keys[0])
        .await?;
    println!("Bob's wishlist holds {} session(s)", remaining.len());

    for session in catalog.get_sessions_before(&conference_key).await? {
        println!(
            "  Before cutoff: {} at {}",
            session.name.unwrap_or_default(),
            session.start_time.unwrap_or_default()
        );
    }

    // 4. Tasks
    let tasks = notifier.drain();
    println!("\nProcessing {} task(s)", tasks.len());
    for task in &tasks {
        app.tasks.handle(task).await?;
    }
    catalog.cache_announcement().await?;

    println!("Featured speaker: {}", catalog.get_featured_speaker().await);
    println!("Announcement: {}", catalog.get_announcement().await);
    println!("\n=== Demo complete ===\n");

    Ok(())
}
