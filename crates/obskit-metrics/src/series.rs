//! Declared label names plus the label combinations a measure has exported.
//!
//! The backend needs the full label cardinality on every call, so missing
//! declared labels resolve to the empty string. Observed combinations are kept
//! so that entries can later be dropped by a single label value.

use dashmap::DashSet;
use obskit_core::error::{ObsError, Result};
use obskit_core::labels::LabelValues;

#[derive(Debug)]
pub(crate) struct SeriesIndex {
    measure: String,
    names: Vec<String>,
    seen: DashSet<Vec<String>>,
}

impl SeriesIndex {
    pub(crate) fn new(measure: impl Into<String>, names: Vec<String>) -> Self {
        Self {
            measure: measure.into(),
            names,
            seen: DashSet::new(),
        }
    }

    pub(crate) fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn name_refs(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Reject label names that were not declared for the measure.
    pub(crate) fn check(&self, values: &LabelValues) -> Result<()> {
        match values.keys().find(|k| !self.names.contains(k)) {
            Some(unknown) => Err(ObsError::Validation(format!(
                "label {unknown} is not declared for measure {}",
                self.measure
            ))),
            None => Ok(()),
        }
    }

    /// Order `values` by declared label name and remember the combination.
    pub(crate) fn resolve(&self, values: &LabelValues) -> Result<Vec<String>> {
        self.check(values)?;
        let resolved: Vec<String> = self
            .names
            .iter()
            .map(|n| values.get(n).cloned().unwrap_or_default())
            .collect();
        self.seen.insert(resolved.clone());
        Ok(resolved)
    }

    /// Forget and return every combination whose `label_name` equals `label_value`.
    pub(crate) fn take_matching(&self, label_name: &str, label_value: &str) -> Vec<Vec<String>> {
        let Some(pos) = self.names.iter().position(|n| n == label_name) else {
            return vec![];
        };
        let matched: Vec<Vec<String>> = self
            .seen
            .iter()
            .filter(|combo| combo[pos] == label_value)
            .map(|combo| combo.key().clone())
            .collect();
        for combo in &matched {
            self.seen.remove(combo);
        }
        matched
    }

    pub(crate) fn clear(&self) {
        self.seen.clear();
    }
}

pub(crate) fn as_refs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}
