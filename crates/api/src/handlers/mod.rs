//! Request handlers for the job management API.
//!
//! Handlers delegate to the job store behind [`crate::state::AppState`]
//! and map errors via [`crate::error::AppError`].

pub mod jobs;
