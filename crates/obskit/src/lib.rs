//! Top-level facade crate for obskit.
//!
//! Re-exports the core types, the metrics registry and the tracer so users can
//! depend on a single crate, and loads both configurations from one file.

pub mod config;

pub mod core {
    pub use obskit_core::*;
}

pub mod metrics {
    pub use obskit_metrics::*;
}

pub mod tracer {
    pub use obskit_tracer::*;
}
