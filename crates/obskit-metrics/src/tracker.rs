//! Id-keyed duration tracking shared by time and summary measures.
//!
//! Each measure owns one tracker. An id moves `absent -> pending -> absent`;
//! several ids may be pending at once so overlapping requests can be timed
//! against the same measure.

use std::time::Instant;

use dashmap::DashMap;
use obskit_core::error::{ObsError, Result};
use obskit_core::labels::{merge, LabelValues};
use uuid::Uuid;

/// Arguments for starting a measurement.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Caller-chosen id. A UUID v4 is generated when absent.
    pub id: Option<String>,
    pub label_values: LabelValues,
}

impl StartOptions {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn label_values(mut self, label_values: LabelValues) -> Self {
        self.label_values = label_values;
        self
    }
}

/// Arguments for ending a measurement.
#[derive(Debug, Clone, Default)]
pub struct EndOptions {
    pub id: Option<String>,
    /// Merged over the labels captured at start; these win on collision.
    pub label_values: LabelValues,
}

impl EndOptions {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            label_values: LabelValues::new(),
        }
    }

    pub fn label_values(mut self, label_values: LabelValues) -> Self {
        self.label_values = label_values;
        self
    }
}

/// Arguments for recording an externally measured duration.
#[derive(Debug, Clone, Default)]
pub struct RetroactiveOptions {
    /// Duration in milliseconds.
    pub time: Option<f64>,
    pub label_values: LabelValues,
}

impl RetroactiveOptions {
    pub fn new(time: f64) -> Self {
        Self {
            time: Some(time),
            label_values: LabelValues::new(),
        }
    }

    pub fn label_values(mut self, label_values: LabelValues) -> Self {
        self.label_values = label_values;
        self
    }
}

#[derive(Debug)]
struct Pending {
    started: Option<Instant>,
    labels: LabelValues,
}

/// Result of a successful `end`: the elapsed time and the merged labels.
#[derive(Debug, Clone)]
pub struct Completed {
    pub elapsed_ms: f64,
    pub labels: LabelValues,
}

#[derive(Debug, Default)]
pub struct DurationTracker {
    pending: DashMap<String, Pending>,
}

impl DurationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a start for `opts.id` (or a fresh id) and return the id.
    pub fn start(&self, opts: StartOptions) -> String {
        let id = match opts.id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        self.pending.insert(
            id.clone(),
            Pending {
                started: Some(Instant::now()),
                labels: opts.label_values,
            },
        );
        id
    }

    /// Close the pending entry for `opts.id`.
    pub fn end(&self, opts: EndOptions) -> Result<Completed> {
        let id = match opts.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ObsError::Argument("id must be specified".into())),
        };
        let (_, pending) = self
            .pending
            .remove(id)
            .ok_or_else(|| ObsError::NotFound(format!("measure not found for id {id}")))?;
        let started = pending.started.ok_or_else(|| {
            ObsError::InvalidState(format!("measure of {id} has not been started"))
        })?;

        Ok(Completed {
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            labels: merge(&pending.labels, &opts.label_values),
        })
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of started but not yet ended ids.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&self) {
        self.pending.clear();
    }
}
