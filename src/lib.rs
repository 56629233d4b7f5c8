//! liftlog - workout logging client
//!
//! Sets, reps and a running timer kept in memory, submitted to the fitness REST API.

pub mod api;
pub mod auth;
pub mod config;
pub mod library;
pub mod screen;
pub mod session;
pub mod store;
pub mod tui;
pub mod units;

pub use api::{ApiClient, ApiError, WorkoutApi};
pub use session::WorkoutSession;
pub use store::{KeyValueStore, SqliteStore};
