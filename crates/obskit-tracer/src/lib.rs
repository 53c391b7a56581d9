#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
//! obskit-tracer: distributed tracing with per-flow span stacks.
//!
//! A [`Tracer`] wraps an OpenTelemetry tracer provider. Each started span is
//! pushed on the stack of its flow id and becomes the implicit parent of the
//! next span started under that id, until it is finished.

pub mod config;
pub mod stack;
pub mod tracer;

pub use config::{ReporterConfig, SamplerConfig, SamplerKind, TracerConfig};
pub use opentelemetry::KeyValue;
pub use stack::ActiveSpan;
pub use tracer::{Carrier, ParentRelationship, SpanHandle, StartSpanOptions, Tracer};
