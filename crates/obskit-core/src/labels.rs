//! Label values attached to measurements.
//!
//! Values are kept as strings in a sorted map so that merges are deterministic
//! and rendering order is stable.

use std::collections::BTreeMap;

/// Label name -> label value.
pub type LabelValues = BTreeMap<String, String>;

/// Build a [`LabelValues`] map from any pairs whose values are displayable.
///
/// ```
/// let labels = obskit_core::label_values([("l1", 1), ("l2", 2)]);
/// assert_eq!(labels["l1"], "1");
/// ```
pub fn label_values<K, V, I>(pairs: I) -> LabelValues
where
    K: Into<String>,
    V: ToString,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect()
}

/// Merge `overrides` on top of `base`. Keys present in both take the override.
pub fn merge(base: &LabelValues, overrides: &LabelValues) -> LabelValues {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Escape a label value for the text exposition format.
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_missing_keys() {
        let base = label_values([("a", 1)]);
        let merged = merge(&base, &label_values([("b", 2)]));
        assert_eq!(merged, label_values([("a", 1), ("b", 2)]));
    }

    #[test]
    fn merge_override_wins() {
        let base = label_values([("a", 1)]);
        let merged = merge(&base, &label_values([("a", 3)]));
        assert_eq!(merged, label_values([("a", 3)]));
    }

    #[test]
    fn escape_quotes_and_newlines() {
        assert_eq!(escape_label("a\"b\nc\\"), "a\\\"b\\nc\\\\");
    }
}
