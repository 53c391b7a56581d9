use obskit_core::error::{ObsError, Result};
use obskit_core::labels::LabelValues;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

use super::counter::COUNTER_SUFFIX;
use super::{backend_err, log_removal, register, unregister, SeriesOwner};
use crate::config::TimeMeasureOptions;
use crate::series::{as_refs, SeriesIndex};
use crate::tracker::{DurationTracker, EndOptions, RetroactiveOptions, StartOptions};

pub(crate) const HISTOGRAM_SUFFIX: &str = "_histogram";

/// Duration measure: every completed measurement is observed into
/// `<name>_histogram` (milliseconds) and counted in `<name>_counter`.
pub struct TimeMeasure {
    name: String,
    histogram_name: String,
    counter_name: String,
    histogram: HistogramVec,
    counter: CounterVec,
    series: SeriesIndex,
    tracker: DurationTracker,
    registry: Registry,
}

impl TimeMeasure {
    pub(crate) fn new(name: String, opts: &TimeMeasureOptions) -> Result<Self> {
        let histogram_name = format!("{name}{HISTOGRAM_SUFFIX}");
        let counter_name = format!("{name}{COUNTER_SUFFIX}");
        let help = opts.measure.help();
        let series = SeriesIndex::new(name.clone(), opts.measure.labels.clone());

        let histogram = HistogramVec::new(
            HistogramOpts::new(histogram_name.clone(), help).buckets(opts.resolved_buckets()),
            &series.name_refs(),
        )
        .map_err(|e| backend_err(&histogram_name, e))?;
        let counter = CounterVec::new(Opts::new(counter_name.clone(), help), &series.name_refs())
            .map_err(|e| backend_err(&counter_name, e))?;

        let registry = Registry::new();
        register(&registry, &histogram_name, &histogram)?;
        register(&registry, &counter_name, &counter)?;

        Ok(Self {
            name,
            histogram_name,
            counter_name,
            histogram,
            counter,
            series,
            tracker: DurationTracker::new(),
            registry,
        })
    }

    pub fn histogram_name(&self) -> &str {
        &self.histogram_name
    }

    pub fn counter_name(&self) -> &str {
        &self.counter_name
    }

    /// Start a measurement and return its id. Undeclared labels are
    /// rejected here rather than at `end`.
    pub fn start(&self, opts: StartOptions) -> Result<String> {
        self.series.check(&opts.label_values)?;
        Ok(self.tracker.start(opts))
    }

    /// End the measurement `opts.id` and record it. The pending entry is kept
    /// when `opts.label_values` is rejected.
    pub fn end(&self, opts: EndOptions) -> Result<()> {
        self.series.check(&opts.label_values)?;
        let done = self.tracker.end(opts)?;
        self.record(done.elapsed_ms, &done.labels)
    }

    /// Record a duration (milliseconds) measured elsewhere.
    pub fn retroactive(&self, opts: RetroactiveOptions) -> Result<()> {
        let time = opts
            .time
            .ok_or_else(|| ObsError::Argument("time must be specified".into()))?;
        self.record(time, &opts.label_values)
    }

    /// Number of started but not yet ended measurements.
    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    fn record(&self, elapsed_ms: f64, label_values: &LabelValues) -> Result<()> {
        let values = self.series.resolve(label_values)?;
        let refs = as_refs(&values);
        self.histogram
            .get_metric_with_label_values(&refs)
            .map_err(|e| backend_err(&self.histogram_name, e))?
            .observe(elapsed_ms);
        self.counter
            .get_metric_with_label_values(&refs)
            .map_err(|e| backend_err(&self.counter_name, e))?
            .inc();
        Ok(())
    }

    pub(crate) fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

impl std::fmt::Debug for TimeMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeMeasure")
            .field("name", &self.name)
            .field("labels", &self.series.names())
            .field("pending", &self.tracker.pending())
            .finish()
    }
}

impl SeriesOwner for TimeMeasure {
    fn name(&self) -> &str {
        &self.name
    }

    fn remove(&self) {
        unregister(&self.registry, &self.histogram_name, &self.histogram);
        unregister(&self.registry, &self.counter_name, &self.counter);
        self.series.clear();
        self.tracker.clear();
    }

    fn remove_entries_by_label(&self, label_name: &str, label_value: &str) {
        for combo in self.series.take_matching(label_name, label_value) {
            let refs = as_refs(&combo);
            log_removal(&self.histogram_name, self.histogram.remove_label_values(&refs));
            log_removal(&self.counter_name, self.counter.remove_label_values(&refs));
        }
    }
}
