#![warn(clippy::all, missing_docs)]

//! Core logic for the Patio operator console.
//!
//! This crate hosts the domain models, configuration handling, the
//! session store and API client, the route guard, and the customer and
//! operator controllers used by the terminal UI and any future frontends.

pub mod api;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod dates;
pub mod error;
pub mod guard;
pub mod listing;
pub mod models;
pub mod session;

pub use api::{ApiClient, HttpTransport, Transport};
pub use auth::AuthService;
pub use config::AppConfig;
pub use controllers::{CustomerController, CustomerForm, OperatorController};
pub use error::{Error, Result};
pub use guard::{AuthState, Navigation, Route, RouteGuard, RowAction};
pub use listing::{remove_by_id, DeleteConfirmation, Identified};
pub use models::{Customer, CustomerSummary, Operator, OperatorFields, Profile, Vehicle};
pub use session::{Session, SessionStore};
