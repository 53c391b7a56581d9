//! Options accepted by the `add_*_measure` family.

use obskit_core::error::{ObsError, Result};

/// Default histogram buckets, in milliseconds.
pub const DEFAULT_BUCKETS: [f64; 9] = [0.1, 5.0, 15.0, 50.0, 100.0, 200.0, 300.0, 400.0, 500.0];

/// Default summary percentiles.
pub const DEFAULT_PERCENTILES: [f64; 7] = [0.01, 0.05, 0.5, 0.9, 0.95, 0.99, 0.999];

/// Observations kept per label set when computing summary quantiles.
pub const DEFAULT_MAX_SAMPLES: usize = 1024;

/// Options shared by every measure kind.
#[derive(Debug, Clone, Default)]
pub struct MeasureOptions {
    /// Unique (after prefixing) measure name.
    pub name: String,
    /// Help text. Falls back to the name.
    pub description: Option<String>,
    /// Label names, fixed at creation.
    pub labels: Vec<String>,
}

impl MeasureOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn help(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ObsError::Validation("measure name is required".into()));
        }
        for (i, label) in self.labels.iter().enumerate() {
            if !is_valid_label_name(label) {
                return Err(ObsError::Validation(format!(
                    "measure {}: invalid label name {label:?}",
                    self.name
                )));
            }
            if self.labels[..i].contains(label) {
                return Err(ObsError::Validation(format!(
                    "measure {}: duplicate label name {label}",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Options for a histogram-backed time measure.
#[derive(Debug, Clone, Default)]
pub struct TimeMeasureOptions {
    pub measure: MeasureOptions,
    /// Histogram upper bounds in milliseconds. Defaults to [`DEFAULT_BUCKETS`].
    pub buckets: Option<Vec<f64>>,
}

impl TimeMeasureOptions {
    pub fn buckets(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.measure.validate()?;
        if let Some(buckets) = &self.buckets {
            if buckets.is_empty() {
                return Err(ObsError::Validation(format!(
                    "measure {}: buckets must not be empty",
                    self.measure.name
                )));
            }
            if buckets.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ObsError::Validation(format!(
                    "measure {}: buckets must be strictly increasing",
                    self.measure.name
                )));
            }
        }
        if self.measure.labels.iter().any(|l| l == "le") {
            return Err(ObsError::Validation(format!(
                "measure {}: label name \"le\" is reserved",
                self.measure.name
            )));
        }
        Ok(())
    }

    pub(crate) fn resolved_buckets(&self) -> Vec<f64> {
        self.buckets
            .clone()
            .unwrap_or_else(|| DEFAULT_BUCKETS.to_vec())
    }
}

impl From<MeasureOptions> for TimeMeasureOptions {
    fn from(measure: MeasureOptions) -> Self {
        Self {
            measure,
            buckets: None,
        }
    }
}

/// Options for a summary measure.
#[derive(Debug, Clone, Default)]
pub struct SummaryOptions {
    pub measure: MeasureOptions,
    /// Quantiles in (0, 1]. Defaults to [`DEFAULT_PERCENTILES`].
    pub percentiles: Option<Vec<f64>>,
    /// Sliding window size per label set. Defaults to [`DEFAULT_MAX_SAMPLES`].
    pub max_samples: Option<usize>,
}

impl SummaryOptions {
    pub fn percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = Some(percentiles);
        self
    }

    pub fn max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = Some(max_samples);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.measure.validate()?;
        if let Some(percentiles) = &self.percentiles {
            if let Some(bad) = percentiles.iter().find(|p| !(**p > 0.0 && **p <= 1.0)) {
                return Err(ObsError::Validation(format!(
                    "measure {}: percentile {bad} is outside (0, 1]",
                    self.measure.name
                )));
            }
        }
        if self.max_samples == Some(0) {
            return Err(ObsError::Validation(format!(
                "measure {}: max_samples must be positive",
                self.measure.name
            )));
        }
        if self.measure.labels.iter().any(|l| l == "quantile") {
            return Err(ObsError::Validation(format!(
                "measure {}: label name \"quantile\" is reserved",
                self.measure.name
            )));
        }
        Ok(())
    }

    pub(crate) fn resolved_percentiles(&self) -> Vec<f64> {
        self.percentiles
            .clone()
            .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec())
    }
}

impl From<MeasureOptions> for SummaryOptions {
    fn from(measure: MeasureOptions) -> Self {
        Self {
            measure,
            percentiles: None,
            max_samples: None,
        }
    }
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub(crate) fn is_valid_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, not starting with `__`.
pub(crate) fn is_valid_label_name(s: &str) -> bool {
    if s.starts_with("__") {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
