//! Baseline Statistics
//!
//! Pure statistical primitives shared by all baseline strategies:
//! interpolated percentiles, arithmetic mean, and population standard
//! deviation. No state, no I/O — every function works on a borrowed slice
//! and never mutates caller data.

/// Interpolated percentile over an unsorted sample slice.
///
/// Sorts a copy ascending and computes a continuous rank `p * (n - 1)`,
/// linearly interpolating between the floor and ceiling elements.
///
/// `p` is a fraction in `[0, 1]` (0.25 = first quartile). An empty slice
/// returns `0.0` as a sentinel — callers that need a hard error must guard
/// before calling. A single-element slice returns that element for any `p`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let index = p * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let lower_value = sorted[lower];
        let upper_value = sorted[upper];
        lower_value + (upper_value - lower_value) * (index - lower as f64)
    }
}

/// Arithmetic mean. Empty input returns `0.0`.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by `n`, not `n - 1`).
///
/// Takes the precomputed mean so callers that already hold it avoid a
/// second pass. Empty input returns `0.0`.
pub fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.25) - 1.75).abs() < 1e-12);
        assert!((percentile(&values, 0.5) - 2.5).abs() < 1e-12);
        assert!((percentile(&values, 1.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        // Must sort a copy internally, never assume ordering
        let values = [4.0, 1.0, 3.0, 2.0];
        assert!((percentile(&values, 0.25) - 1.75).abs() < 1e-12);

        // And never mutate the caller's slice
        assert_eq!(values, [4.0, 1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_percentile_degenerate() {
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[42.0], 0.0), 42.0);
        assert_eq!(percentile(&[42.0], 0.5), 42.0);
        assert_eq!(percentile(&[42.0], 1.0), 42.0);
    }

    #[test]
    fn test_mean_and_population_std_dev() {
        // Classic textbook dataset: mean 5, population std 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert!((m - 5.0).abs() < 1e-12);
        assert!((population_std_dev(&values, m) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_stats() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std_dev(&[], 0.0), 0.0);
    }
}
