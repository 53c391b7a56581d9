//! Summary measure.
//!
//! The prometheus backend has no summary type, so observations are kept in a
//! bounded sliding window per label set and quantiles are computed at render
//! time (nearest rank). `_sum` and `_count` cover every observation, not just
//! the window.

use std::collections::VecDeque;
use std::fmt::Write;

use dashmap::DashMap;
use obskit_core::error::{ObsError, Result};
use obskit_core::labels::{escape_label, LabelValues};

use super::SeriesOwner;
use crate::config::measure::{is_valid_metric_name, DEFAULT_MAX_SAMPLES};
use crate::config::SummaryOptions;
use crate::series::SeriesIndex;
use crate::tracker::{DurationTracker, EndOptions, RetroactiveOptions, StartOptions};

pub(crate) const SUMMARY_SUFFIX: &str = "_summary";

#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<f64>,
    sum: f64,
    count: u64,
}

impl Window {
    fn observe(&mut self, v: f64, max_samples: usize) {
        if self.samples.len() == max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(v);
        self.sum += v;
        self.count += 1;
    }

    fn quantiles(&self, percentiles: &[f64]) -> Vec<f64> {
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        percentiles
            .iter()
            .map(|q| {
                if sorted.is_empty() {
                    return f64::NAN;
                }
                let rank = (q * sorted.len() as f64).ceil() as usize;
                sorted[rank.clamp(1, sorted.len()) - 1]
            })
            .collect()
    }
}

/// Duration summary exported as `<name>_summary` (milliseconds).
pub struct SummaryMeasure {
    name: String,
    series_name: String,
    help: String,
    percentiles: Vec<f64>,
    max_samples: usize,
    series: SeriesIndex,
    windows: DashMap<Vec<String>, Window>,
    tracker: DurationTracker,
}

impl SummaryMeasure {
    pub(crate) fn new(name: String, opts: &SummaryOptions) -> Result<Self> {
        let series_name = format!("{name}{SUMMARY_SUFFIX}");
        if !is_valid_metric_name(&series_name) {
            return Err(ObsError::Validation(format!(
                "{series_name:?} is not a valid metric name"
            )));
        }
        Ok(Self {
            series: SeriesIndex::new(name.clone(), opts.measure.labels.clone()),
            name,
            series_name,
            help: opts.measure.help().to_string(),
            percentiles: opts.resolved_percentiles(),
            max_samples: opts.max_samples.unwrap_or(DEFAULT_MAX_SAMPLES),
            windows: DashMap::new(),
            tracker: DurationTracker::new(),
        })
    }

    pub fn series_name(&self) -> &str {
        &self.series_name
    }

    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    /// Start a measurement and return its id. Undeclared labels are
    /// rejected here rather than at `end`.
    pub fn start(&self, opts: StartOptions) -> Result<String> {
        self.series.check(&opts.label_values)?;
        Ok(self.tracker.start(opts))
    }

    /// End the measurement `opts.id` and observe it. The pending entry is
    /// kept when `opts.label_values` is rejected.
    pub fn end(&self, opts: EndOptions) -> Result<()> {
        self.series.check(&opts.label_values)?;
        let done = self.tracker.end(opts)?;
        self.observe(done.elapsed_ms, &done.labels)
    }

    /// Observe a duration (milliseconds) measured elsewhere.
    pub fn retroactive(&self, opts: RetroactiveOptions) -> Result<()> {
        let time = opts
            .time
            .ok_or_else(|| ObsError::Argument("time must be specified".into()))?;
        self.observe(time, &opts.label_values)
    }

    pub fn observe(&self, v: f64, label_values: &LabelValues) -> Result<()> {
        let key = self.series.resolve(label_values)?;
        self.windows
            .entry(key)
            .or_default()
            .observe(v, self.max_samples);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    /// Render in Prometheus text exposition format.
    pub(crate) fn render(&self, out: &mut String) {
        let mut rows: Vec<(Vec<String>, u64, f64, Vec<f64>)> = self
            .windows
            .iter()
            .map(|r| {
                let w = r.value();
                (r.key().clone(), w.count, w.sum, w.quantiles(&self.percentiles))
            })
            .collect();
        if rows.is_empty() {
            return;
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let name = &self.series_name;
        let help = self.help.replace('\\', "\\\\").replace('\n', "\\n");
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} summary");
        for (key, count, sum, quantiles) in rows {
            let label_str = self
                .series
                .names()
                .iter()
                .zip(key.iter())
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                .collect::<Vec<_>>()
                .join(",");
            let prefix = if label_str.is_empty() { String::new() } else { format!("{},", label_str) };

            for (q, v) in self.percentiles.iter().zip(quantiles) {
                let _ = writeln!(out, "{}{{{}quantile=\"{}\"}} {}", name, prefix, q, v);
            }
            if label_str.is_empty() {
                let _ = writeln!(out, "{}_sum {}", name, sum);
                let _ = writeln!(out, "{}_count {}", name, count);
            } else {
                let _ = writeln!(out, "{}_sum{{{}}} {}", name, label_str, sum);
                let _ = writeln!(out, "{}_count{{{}}} {}", name, label_str, count);
            }
        }
    }
}

impl std::fmt::Debug for SummaryMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryMeasure")
            .field("name", &self.name)
            .field("labels", &self.series.names())
            .field("percentiles", &self.percentiles)
            .finish()
    }
}

impl SeriesOwner for SummaryMeasure {
    fn name(&self) -> &str {
        &self.name
    }

    fn remove(&self) {
        self.windows.clear();
        self.series.clear();
        self.tracker.clear();
    }

    fn remove_entries_by_label(&self, label_name: &str, label_value: &str) {
        for combo in self.series.take_matching(label_name, label_value) {
            self.windows.remove(&combo);
        }
    }
}
