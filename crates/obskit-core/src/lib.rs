//! obskit core: the error surface and label primitives shared by the metrics
//! and tracer crates.
//!
//! This crate carries no backend, runtime or transport dependencies so both
//! facades can agree on one error type without pulling each other in.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `ObsError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod labels;

/// Shared result type.
pub use error::{ErrorCode, ObsError, Result};
pub use labels::{label_values, LabelValues};
