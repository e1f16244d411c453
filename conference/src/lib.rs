//! # Conference Central
//!
//! Conference catalog with transactional seat allocation and session wishlists.
//!
//! ## Modules
//!
//! - [`filters`]: compiles client `(field, operator, value)` triples into a store query that
//!   respects the single-inequality rule
//! - [`allocation`]: seat registration, wishlist changes and the sessions-before query, each
//!   change committed atomically with conflict retries
//! - [`catalog`]: profiles, conferences, sessions, announcements and featured speakers
//! - [`tasks`]: deferred work the catalog enqueues and its handler
//! - [`app`]: wiring from [`config::Config`]
//!
//! ## Example
//!
//! ```ignore
//! use conference_central::prelude::*;
//!
//! let app = App::build(&Config::from_env(), notifier).await?;
//! let conference = app
//!     .catalog
//!     .create_conference(&user, &ConferenceForm::default().with_name("RustConf"))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod allocation;
pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filters;
pub mod forms;
pub mod tasks;
pub mod types;

/// Commonly used items.
pub mod prelude {
    pub use crate::allocation::AllocationEngine;
    pub use crate::app::App;
    pub use crate::catalog::CatalogService;
    pub use crate::config::Config;
    pub use crate::error::{ConferenceError, ErrorKind};
    pub use crate::filters::{FilterError, FilterField, FilterOperator, FilterTriple, QueryPlan, compile};
    pub use crate::forms::{
        ConferenceForm, ConferenceQueryForms, ProfileForm, ProfileMiniForm, SessionForm,
    };
    pub use crate::tasks::TaskHandler;
    pub use crate::types::{Conference, Profile, Session, TeeShirtSize, UserIdentity};
}
