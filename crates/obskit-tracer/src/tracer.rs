//! Caller-owned tracer over the OpenTelemetry SDK.
//!
//! Spans are grouped by a flow id. Unless an explicit parent carrier is given,
//! a new span takes the top of its flow's stack as parent, so nested calls do
//! not have to pass parents around.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use obskit_core::error::{ObsError, Result};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{
    Link, Span as _, SpanContext, Status, TraceContextExt, Tracer as _, TracerProvider as _,
};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, Sampler, SdkTracer, SdkTracerProvider, SpanExporter,
};
use opentelemetry_sdk::Resource;
use uuid::Uuid;

use crate::config::{SamplerConfig, SamplerKind, TracerConfig};
use crate::stack::{ActiveSpan, SpanStacks};

/// Text-map carrier holding a propagated span context.
pub type Carrier = HashMap<String, String>;

/// How a new span relates to its parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentRelationship {
    /// Strict parent/child.
    #[default]
    ChildOf,
    /// Causally related but independent: a new root linked to the parent.
    Follows,
}

/// Arguments for [`Tracer::start_span`].
#[derive(Debug, Clone, Default)]
pub struct StartSpanOptions {
    /// Flow id. A UUID v4 is generated when absent.
    pub id: Option<String>,
    pub name: String,
    /// Explicit parent context; takes precedence over the flow's stack.
    pub parent: Option<Carrier>,
    pub parent_relationship: ParentRelationship,
    pub tags: Vec<KeyValue>,
}

impl StartSpanOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn parent(mut self, carrier: Carrier) -> Self {
        self.parent = Some(carrier);
        self
    }

    pub fn relationship(mut self, relationship: ParentRelationship) -> Self {
        self.parent_relationship = relationship;
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = KeyValue>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

struct Backend {
    provider: SdkTracerProvider,
    tracer: SdkTracer,
    log_spans: bool,
}

#[derive(Default)]
struct TracerInner {
    backend: RwLock<Option<Backend>>,
    stacks: SpanStacks,
    propagator: TraceContextPropagator,
}

#[derive(Clone, Default)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize with an OTLP/HTTP batch exporter built from `config.reporter`.
    pub fn init(&self, config: TracerConfig) -> Result<()> {
        config.validate()?;
        let endpoint = config.reporter.endpoint();
        let exporter = {
            use opentelemetry_otlp::WithExportConfig;
            opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint.clone())
                .build()
                .map_err(|e| ObsError::Backend(format!("otlp exporter: {e}")))?
        };
        let batch = BatchConfigBuilder::default()
            .with_scheduled_delay(Duration::from_millis(config.reporter.flush_interval_ms))
            .build();
        let processor = BatchSpanProcessor::builder(exporter)
            .with_batch_config(batch)
            .build();
        let provider = base_provider(&config)
            .with_span_processor(processor)
            .build();

        tracing::info!(service = %config.service_name, %endpoint, "tracer initialized");
        self.install(provider, &config);
        Ok(())
    }

    /// Initialize with a caller-supplied exporter, reported synchronously on finish.
    pub fn init_with_exporter<E>(&self, config: TracerConfig, exporter: E) -> Result<()>
    where
        E: SpanExporter + 'static,
    {
        config.validate()?;
        let provider = base_provider(&config)
            .with_simple_exporter(exporter)
            .build();

        tracing::info!(service = %config.service_name, "tracer initialized with custom exporter");
        self.install(provider, &config);
        Ok(())
    }

    fn install(&self, provider: SdkTracerProvider, config: &TracerConfig) {
        let tracer = provider.tracer(config.service_name.clone());
        let previous = self
            .inner
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Backend {
                provider,
                tracer,
                log_spans: config.reporter.log_spans,
            });
        self.inner.stacks.clear();
        if let Some(previous) = previous {
            shutdown_provider(&previous.provider);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.inner
            .backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Flush and close the backend. Open spans are abandoned.
    pub fn shutdown(&self) -> Result<()> {
        let previous = self
            .inner
            .backend
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.stacks.clear();
        match previous {
            Some(backend) => backend
                .provider
                .shutdown()
                .map_err(|e| ObsError::Backend(format!("tracer shutdown: {e}"))),
            None => Ok(()),
        }
    }

    /// Start a span and push it on its flow's stack.
    pub fn start_span(&self, opts: StartSpanOptions) -> Result<SpanHandle> {
        if opts.name.is_empty() {
            return Err(ObsError::Validation("span name is required".into()));
        }
        let guard = self
            .inner
            .backend
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let backend = guard
            .as_ref()
            .ok_or_else(|| ObsError::InvalidState("tracer is not initialized".into()))?;

        let id = match opts.id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        let parent = match &opts.parent {
            Some(carrier) => Some(self.inner.propagator.extract(carrier).span().span_context().clone()),
            None => self.inner.stacks.top(&id).map(|top| top.span_context),
        }
        .filter(SpanContext::is_valid);

        let mut builder = backend.tracer.span_builder(opts.name.clone());
        if !opts.tags.is_empty() {
            builder = builder.with_attributes(opts.tags);
        }
        let span = match (parent, opts.parent_relationship) {
            (Some(parent), ParentRelationship::ChildOf) => {
                let cx = Context::new().with_remote_span_context(parent);
                builder.start_with_context(&backend.tracer, &cx)
            }
            (Some(parent), ParentRelationship::Follows) => builder
                .with_links(vec![Link::with_context(parent)])
                .start_with_context(&backend.tracer, &Context::new()),
            (None, _) => builder.start_with_context(&backend.tracer, &Context::new()),
        };

        self.inner.stacks.push(ActiveSpan {
            id: id.clone(),
            name: opts.name.clone(),
            span_context: span.span_context().clone(),
        });
        tracing::trace!(flow = %id, span = %opts.name, depth = self.inner.stacks.depth(&id), "span started");

        Ok(SpanHandle {
            id,
            name: opts.name,
            span,
            log_spans: backend.log_spans,
            tracer: self.clone(),
        })
    }

    /// Top of `id`'s stack, or `None` for an unknown or empty flow.
    pub fn top_span(&self, id: &str) -> Option<ActiveSpan> {
        self.inner.stacks.top(id)
    }

    /// Pop `id`'s stack without finishing the span.
    pub fn pop(&self, id: &str) -> Option<ActiveSpan> {
        self.inner.stacks.pop(id)
    }

    pub fn depth(&self, id: &str) -> usize {
        self.inner.stacks.depth(id)
    }

    /// Number of flows with active spans.
    pub fn active_flows(&self) -> usize {
        self.inner.stacks.flows()
    }
}

fn base_provider(config: &TracerConfig) -> opentelemetry_sdk::trace::TracerProviderBuilder {
    SdkTracerProvider::builder()
        .with_sampler(sampler(&config.sampler))
        .with_resource(
            Resource::builder()
                .with_service_name(config.service_name.clone())
                .build(),
        )
}

fn sampler(config: &SamplerConfig) -> Sampler {
    match config.kind {
        SamplerKind::Const if config.param >= 1.0 => Sampler::AlwaysOn,
        SamplerKind::Const => Sampler::AlwaysOff,
        SamplerKind::Probabilistic => Sampler::TraceIdRatioBased(config.param),
    }
}

fn shutdown_provider(provider: &SdkTracerProvider) {
    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "previous tracer provider shutdown failed");
    }
}

/// A started span. Dropping it without `finish` ends the backend span but
/// leaves the flow's stack untouched.
pub struct SpanHandle {
    id: String,
    name: String,
    span: opentelemetry_sdk::trace::Span,
    log_spans: bool,
    tracer: Tracer,
}

impl SpanHandle {
    /// Flow id.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn span_context(&self) -> &SpanContext {
        self.span.span_context()
    }

    /// Propagable context of this span as a text-map carrier.
    pub fn context(&self) -> Carrier {
        let cx = Context::new().with_remote_span_context(self.span.span_context().clone());
        let mut carrier = Carrier::new();
        self.tracer.inner.propagator.inject_context(&cx, &mut carrier);
        carrier
    }

    pub fn add_tag(&mut self, tags: impl IntoIterator<Item = KeyValue>) {
        for kv in tags {
            self.span.set_attribute(kv);
        }
    }

    /// Pop the flow's stack and end the span.
    pub fn finish(self) {
        self.close();
    }

    /// Mark the span as failed, log `error`, then finish it.
    pub fn finish_with_error(mut self, error: &dyn fmt::Display) {
        let message = error.to_string();
        self.span.set_attribute(KeyValue::new("error", true));
        self.span
            .add_event("error", vec![KeyValue::new("message", message.clone())]);
        self.span.set_status(Status::error(message.clone()));
        tracing::error!(flow = %self.id, span = %self.name, error = %message, "span finished with error");
        self.close();
    }

    fn close(mut self) {
        // pops the top regardless of which span is finishing
        self.tracer.inner.stacks.pop(&self.id);
        self.span.end();
        if self.log_spans {
            let sc = self.span.span_context();
            tracing::debug!(
                flow = %self.id,
                span = %self.name,
                trace_id = %sc.trace_id(),
                span_id = %sc.span_id(),
                "span finished"
            );
        }
    }
}
