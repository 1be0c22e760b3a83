//! Core library for guarddog.
//!
//! This crate contains everything the terminal client needs that is not
//! rendering:
//!
//! - `auth`: identity session records, the `SessionStore` and the traits at
//!   the identity/profile seams
//! - `guard`: the role-based `AccessGuard` consulted by every protected view
//! - `router`: routes, navigation history and per-route role allow-lists
//! - `backend`: the HTTP client for the hosted auth and table endpoints
//! - `classroom`: typed enrollment/class queries and dashboard joins
//! - `notify`: user-facing notifications (toasts)
//! - `config`: application configuration
//!
//! Row-level security lives in the hosted database. Nothing in this crate
//! is an access-control boundary; the guard only decides what to show.

pub mod auth;
pub mod backend;
pub mod classroom;
pub mod config;
pub mod guard;
pub mod models;
pub mod notify;
pub mod router;
pub mod utils;

pub use auth::{AuthError, SessionSnapshot, SessionStore};
pub use config::Config;
pub use guard::{AccessGuard, GuardState, GuardView, Rendering};
pub use notify::{Notification, NotificationKind, Notifier};
pub use router::{Navigation, NavigationMode, Route, Router};
