//! HTTP surface of the conveyor job engine.
//!
//! A library crate so the binary in `main.rs` and the integration tests
//! under `tests/` can assemble the same router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;
