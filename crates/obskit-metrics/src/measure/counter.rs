use obskit_core::error::{ObsError, Result};
use obskit_core::labels::LabelValues;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Opts, Registry};

use super::{backend_err, log_removal, register, unregister, SeriesOwner};
use crate::config::MeasureOptions;
use crate::series::{as_refs, SeriesIndex};

pub(crate) const COUNTER_SUFFIX: &str = "_counter";

/// Monotonic counter exported as `<name>_counter`.
pub struct CounterMeasure {
    name: String,
    series_name: String,
    counter: CounterVec,
    series: SeriesIndex,
    registry: Registry,
}

impl CounterMeasure {
    pub(crate) fn new(name: String, opts: &MeasureOptions) -> Result<Self> {
        let series_name = format!("{name}{COUNTER_SUFFIX}");
        let series = SeriesIndex::new(name.clone(), opts.labels.clone());
        let counter = CounterVec::new(Opts::new(series_name.clone(), opts.help()), &series.name_refs())
            .map_err(|e| backend_err(&series_name, e))?;
        let registry = Registry::new();
        register(&registry, &series_name, &counter)?;

        Ok(Self {
            name,
            series_name,
            counter,
            series,
            registry,
        })
    }

    pub fn series_name(&self) -> &str {
        &self.series_name
    }

    /// Increment by 1.
    pub fn inc(&self, label_values: &LabelValues) -> Result<()> {
        self.inc_by(1.0, label_values)
    }

    /// Increment by a non-negative amount.
    pub fn inc_by(&self, v: f64, label_values: &LabelValues) -> Result<()> {
        if !(v >= 0.0) {
            return Err(ObsError::Validation(format!(
                "counter {} cannot be incremented by {v}",
                self.name
            )));
        }
        let values = self.series.resolve(label_values)?;
        self.counter
            .get_metric_with_label_values(&as_refs(&values))
            .map_err(|e| backend_err(&self.series_name, e))?
            .inc_by(v);
        Ok(())
    }

    pub(crate) fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl std::fmt::Debug for CounterMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterMeasure")
            .field("name", &self.name)
            .field("labels", &self.series.names())
            .finish()
    }
}

impl SeriesOwner for CounterMeasure {
    fn name(&self) -> &str {
        &self.name
    }

    fn remove(&self) {
        unregister(&self.registry, &self.series_name, &self.counter);
        self.series.clear();
    }

    fn remove_entries_by_label(&self, label_name: &str, label_value: &str) {
        for combo in self.series.take_matching(label_name, label_value) {
            log_removal(&self.series_name, self.counter.remove_label_values(&as_refs(&combo)));
        }
    }
}
