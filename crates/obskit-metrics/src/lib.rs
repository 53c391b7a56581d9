#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
//! obskit metrics: a measure registry over the `prometheus` crate.
//!
//! Measures (counter, gauge, time, summary) are registered by name on a
//! caller-owned [`Metrics`] handle. Time and summary measures pair `start`/`end`
//! calls by id so overlapping measurements of the same measure do not collide.
//! The [`http`] module serves the registry over axum and times requests.

pub mod buckets;
pub mod config;
pub mod http;
pub mod measure;
pub mod registry;
pub(crate) mod series;
pub mod tracker;

pub use config::{MeasureOptions, MetricsConfig, ServerSection, SummaryOptions, TimeMeasureOptions};
pub use http::{RequestTiming, API_REQUEST_MEASURE};
pub use measure::{
    CounterMeasure, GaugeMeasure, Measure, MeasureKind, SeriesOwner, SummaryMeasure, TimeMeasure,
};
pub use registry::{Metrics, RemoveEntriesOptions};
pub use tracker::{EndOptions, RetroactiveOptions, StartOptions};
