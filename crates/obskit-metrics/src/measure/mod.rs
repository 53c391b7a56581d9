//! Measurement handles, one type per kind.
//!
//! Every kind owns its exported series in a backend registry of its own, so a
//! removed name can be registered again with other labels or help text. A
//! measure can release its series entirely ([`SeriesOwner::remove`]) or only
//! the label combinations carrying one label value
//! ([`SeriesOwner::remove_entries_by_label`]).

pub mod counter;
pub mod gauge;
pub mod summary;
pub mod time;

use std::sync::Arc;

use obskit_core::error::ObsError;
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::Registry;

pub use counter::CounterMeasure;
pub use gauge::GaugeMeasure;
pub use summary::SummaryMeasure;
pub use time::TimeMeasure;

/// Capability shared by every measure kind.
pub trait SeriesOwner: Send + Sync {
    /// Effective (prefixed) measure name.
    fn name(&self) -> &str;
    /// Release every exported series.
    fn remove(&self);
    /// Drop the exported combinations whose `label_name` equals `label_value`.
    fn remove_entries_by_label(&self, label_name: &str, label_value: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureKind {
    Counter,
    Gauge,
    Time,
    Summary,
}

impl MeasureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MeasureKind::Counter => "counter",
            MeasureKind::Gauge => "gauge",
            MeasureKind::Time => "time",
            MeasureKind::Summary => "summary",
        }
    }
}

/// A registered measure.
#[derive(Clone)]
pub enum Measure {
    Counter(Arc<CounterMeasure>),
    Gauge(Arc<GaugeMeasure>),
    Time(Arc<TimeMeasure>),
    Summary(Arc<SummaryMeasure>),
}

impl Measure {
    pub fn kind(&self) -> MeasureKind {
        match self {
            Measure::Counter(_) => MeasureKind::Counter,
            Measure::Gauge(_) => MeasureKind::Gauge,
            Measure::Time(_) => MeasureKind::Time,
            Measure::Summary(_) => MeasureKind::Summary,
        }
    }

    fn owner(&self) -> &dyn SeriesOwner {
        match self {
            Measure::Counter(m) => m.as_ref() as &dyn SeriesOwner,
            Measure::Gauge(m) => m.as_ref() as &dyn SeriesOwner,
            Measure::Time(m) => m.as_ref() as &dyn SeriesOwner,
            Measure::Summary(m) => m.as_ref() as &dyn SeriesOwner,
        }
    }

    pub fn name(&self) -> &str {
        self.owner().name()
    }

    pub fn remove(&self) {
        self.owner().remove();
    }

    pub fn remove_entries_by_label(&self, label_name: &str, label_value: &str) {
        self.owner().remove_entries_by_label(label_name, label_value);
    }

    /// Snapshot of the measure's backend series. Summaries render separately.
    pub(crate) fn gather(&self) -> Vec<MetricFamily> {
        match self {
            Measure::Counter(m) => m.gather(),
            Measure::Gauge(m) => m.gather(),
            Measure::Time(m) => m.gather(),
            Measure::Summary(_) => Vec::new(),
        }
    }

    pub fn as_counter(&self) -> Option<&Arc<CounterMeasure>> {
        match self {
            Measure::Counter(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Arc<GaugeMeasure>> {
        match self {
            Measure::Gauge(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<&Arc<TimeMeasure>> {
        match self {
            Measure::Time(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_summary(&self) -> Option<&Arc<SummaryMeasure>> {
        match self {
            Measure::Summary(m) => Some(m),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Measure")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// Map a backend failure for `series` onto the shared taxonomy.
pub(crate) fn backend_err(series: &str, e: prometheus::Error) -> ObsError {
    match e {
        prometheus::Error::AlreadyReg => ObsError::NameConflict(series.to_string()),
        prometheus::Error::InconsistentCardinality { .. } | prometheus::Error::Msg(_) => {
            ObsError::Validation(format!("{series}: {e}"))
        }
        other => ObsError::Backend(format!("{series}: {other}")),
    }
}

pub(crate) fn register<C>(registry: &Registry, series: &str, collector: &C) -> obskit_core::Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|e| backend_err(series, e))
}

pub(crate) fn unregister<C>(registry: &Registry, series: &str, collector: &C)
where
    C: Collector + Clone + 'static,
{
    if let Err(e) = registry.unregister(Box::new(collector.clone())) {
        tracing::debug!(series, error = %e, "unregister skipped");
    }
}

pub(crate) fn log_removal(series: &str, result: prometheus::Result<()>) {
    if let Err(e) = result {
        tracing::debug!(series, error = %e, "series removal skipped");
    }
}
