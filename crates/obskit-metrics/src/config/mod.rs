//! Registry configuration and measure options (strict parsing + validation).

pub mod measure;
pub mod schema;

pub use measure::{MeasureOptions, SummaryOptions, TimeMeasureOptions};
pub use schema::{MetricsConfig, ServerSection};
