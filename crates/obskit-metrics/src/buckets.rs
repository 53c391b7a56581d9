//! Bucket layout helpers for time measures.

/// `count` buckets starting at `start`, spaced by `step`.
pub fn arithmetic(count: usize, start: f64, step: f64) -> Vec<f64> {
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// `count` buckets of the form `start + factor * ratio^i`.
pub fn geometric(count: usize, start: f64, ratio: f64, factor: f64) -> Vec<f64> {
    (0..count)
        .map(|i| start + factor * ratio.powi(i as i32))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_sequence() {
        assert_eq!(arithmetic(4, 10.0, 5.0), vec![10.0, 15.0, 20.0, 25.0]);
        assert!(arithmetic(0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn geometric_sequence() {
        assert_eq!(geometric(4, 0.0, 2.0, 1.0), vec![1.0, 2.0, 4.0, 8.0]);
        assert_eq!(geometric(3, 1.0, 10.0, 2.0), vec![3.0, 21.0, 201.0]);
    }
}
