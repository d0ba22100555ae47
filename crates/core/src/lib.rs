//! Domain types and pure logic for the conveyor job engine.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! persistence layer, the scheduler, and any future CLI tooling. Anything
//! that needs a database, a runtime, or a wall clock lives elsewhere; the
//! [`clock::Clock`] trait is the seam through which time reaches the pure
//! code here.

pub mod clock;
pub mod error;
pub mod jobs;
pub mod retry;
pub mod types;

pub use error::CoreError;
