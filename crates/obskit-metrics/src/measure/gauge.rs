use obskit_core::error::Result;
use obskit_core::labels::LabelValues;
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts, Registry};

use super::{backend_err, log_removal, register, unregister, SeriesOwner};
use crate::config::MeasureOptions;
use crate::series::{as_refs, SeriesIndex};

pub(crate) const GAUGE_SUFFIX: &str = "_gauge";

/// Settable value exported as `<name>_gauge`.
pub struct GaugeMeasure {
    name: String,
    series_name: String,
    gauge: GaugeVec,
    series: SeriesIndex,
    registry: Registry,
}

impl GaugeMeasure {
    pub(crate) fn new(name: String, opts: &MeasureOptions) -> Result<Self> {
        let series_name = format!("{name}{GAUGE_SUFFIX}");
        let series = SeriesIndex::new(name.clone(), opts.labels.clone());
        let gauge = GaugeVec::new(Opts::new(series_name.clone(), opts.help()), &series.name_refs())
            .map_err(|e| backend_err(&series_name, e))?;
        let registry = Registry::new();
        register(&registry, &series_name, &gauge)?;

        Ok(Self {
            name,
            series_name,
            gauge,
            series,
            registry,
        })
    }

    pub fn series_name(&self) -> &str {
        &self.series_name
    }

    fn child(&self, label_values: &LabelValues) -> Result<Gauge> {
        let values = self.series.resolve(label_values)?;
        self.gauge
            .get_metric_with_label_values(&as_refs(&values))
            .map_err(|e| backend_err(&self.series_name, e))
    }

    /// Increment by 1.
    pub fn inc(&self, label_values: &LabelValues) -> Result<()> {
        self.inc_by(1.0, label_values)
    }

    pub fn inc_by(&self, step: f64, label_values: &LabelValues) -> Result<()> {
        self.child(label_values)?.add(step);
        Ok(())
    }

    /// Decrement by 1.
    pub fn dec(&self, label_values: &LabelValues) -> Result<()> {
        self.dec_by(1.0, label_values)
    }

    pub fn dec_by(&self, step: f64, label_values: &LabelValues) -> Result<()> {
        self.child(label_values)?.sub(step);
        Ok(())
    }

    pub fn set(&self, value: f64, label_values: &LabelValues) -> Result<()> {
        self.child(label_values)?.set(value);
        Ok(())
    }

    /// Current value for a label combination.
    pub fn get(&self, label_values: &LabelValues) -> Result<f64> {
        Ok(self.child(label_values)?.get())
    }

    pub(crate) fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl std::fmt::Debug for GaugeMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaugeMeasure")
            .field("name", &self.name)
            .field("labels", &self.series.names())
            .finish()
    }
}

impl SeriesOwner for GaugeMeasure {
    fn name(&self) -> &str {
        &self.name
    }

    fn remove(&self) {
        unregister(&self.registry, &self.series_name, &self.gauge);
        self.series.clear();
    }

    fn remove_entries_by_label(&self, label_name: &str, label_value: &str) {
        for combo in self.series.take_matching(label_name, label_value) {
            log_removal(&self.series_name, self.gauge.remove_label_values(&as_refs(&combo)));
        }
    }
}
