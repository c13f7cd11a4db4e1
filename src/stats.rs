//! Robust statistics over amplitude residuals.
//!
//! The flagging heuristics compare every residual against a robust location
//! and spread estimate so that the outliers being hunted cannot drag the
//! thresholds towards themselves. Location is the median; spread is the
//! median absolute deviation scaled by [`MAD_TO_SIGMA`] to be a consistent
//! estimator of the standard deviation under a normal distribution.

use crate::constants::MAD_TO_SIGMA;

/// Median and scaled median absolute deviation of a masked set of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustStats {
    /// Median of the valid values. NaN when no valid value remains.
    pub median: f64,
    /// `1.4826 × median(|x − median(x)|)` over the valid values. Zero when
    /// no valid value remains; callers must treat `mad == 0` as "no
    /// spread information" and not divide by it or build sigma windows
    /// from it.
    pub mad: f64,
}

impl RobustStats {
    /// Compute statistics over `values[i]` where `valid[i]` holds.
    ///
    /// Values paired with a false mask entry are ignored entirely, as are
    /// non-finite values regardless of their mask. The result does not
    /// depend on the order of the input.
    ///
    /// # Panics
    ///
    /// Panics if `values` and `valid` have different lengths.
    pub fn of_masked(values: &[f64], valid: &[bool]) -> Self {
        assert_eq!(values.len(), valid.len());
        let selected: Vec<f64> = values
            .iter()
            .zip(valid)
            .filter(|&(v, &ok)| ok && v.is_finite())
            .map(|(&v, _)| v)
            .collect();
        Self::of(&selected)
    }

    /// Compute statistics over every finite value in `values`.
    pub fn of(values: &[f64]) -> Self {
        let mut selected: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if selected.is_empty() {
            return Self {
                median: f64::NAN,
                mad: 0.0,
            };
        }
        let median = median_of_mut(&mut selected);
        let mut deviations: Vec<f64> = selected.iter().map(|v| (v - median).abs()).collect();
        let mad = median_of_mut(&mut deviations) * MAD_TO_SIGMA;
        Self { median, mad }
    }
}

/// Row indices whose metric lies beyond the sigma window around the
/// median. `possig` absent restricts the selection to the negative side.
///
/// Callers must have checked `stats.mad > 0` first: a zero MAD makes the
/// window degenerate, and the heuristics treat that case as "no outliers"
/// rather than comparing against it.
pub(crate) fn select_outliers(
    metric: &[f64],
    valid: &[bool],
    stats: &RobustStats,
    negsig: f64,
    possig: Option<f64>,
) -> Vec<usize> {
    let lo = stats.median - stats.mad * negsig;
    let hi = possig.map(|p| stats.median + stats.mad * p);
    (0..metric.len())
        .filter(|&i| valid[i] && (metric[i] < lo || hi.map_or(false, |hi| metric[i] > hi)))
        .collect()
}

/// Median of a non-empty slice, sorting it in place. Even-length inputs
/// yield the mean of the two middle values.
fn median_of_mut(values: &mut [f64]) -> f64 {
    debug_assert!(!values.is_empty());
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_median_odd_and_even() {
        let stats = RobustStats::of(&[3.0, 1.0, 2.0]);
        assert_abs_diff_eq!(stats.median, 2.0);

        let stats = RobustStats::of(&[4.0, 1.0, 3.0, 2.0]);
        assert_abs_diff_eq!(stats.median, 2.5);
    }

    #[test]
    fn test_mad_is_scaled() {
        // deviations from the median 3: [2, 1, 0, 1, 2] -> raw MAD 1.
        let stats = RobustStats::of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_abs_diff_eq!(stats.median, 3.0);
        assert_abs_diff_eq!(stats.mad, MAD_TO_SIGMA);
    }

    #[test]
    fn test_mask_and_nan_are_excluded() {
        let values = [1.0, 2.0, 3.0, 100.0, f64::NAN];
        let valid = [true, true, true, false, true];
        let stats = RobustStats::of_masked(&values, &valid);
        assert_abs_diff_eq!(stats.median, 2.0);
        assert_abs_diff_eq!(stats.mad, MAD_TO_SIGMA);
    }

    #[test]
    fn test_degenerate_input() {
        let stats = RobustStats::of(&[]);
        assert!(stats.median.is_nan());
        assert_abs_diff_eq!(stats.mad, 0.0);

        let stats = RobustStats::of_masked(&[1.0, 2.0], &[false, false]);
        assert!(stats.median.is_nan());
        assert_abs_diff_eq!(stats.mad, 0.0);

        // identical values have a median but no spread
        let stats = RobustStats::of(&[7.0; 12]);
        assert_abs_diff_eq!(stats.median, 7.0);
        assert_abs_diff_eq!(stats.mad, 0.0);
    }

    #[test]
    fn test_order_independence() {
        let forward: Vec<f64> = (0..101).map(|i| (i as f64 * 0.37).sin()).collect();
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(RobustStats::of(&forward), RobustStats::of(&reversed));
    }

    #[test]
    fn test_single_outlier_barely_moves_estimates() {
        // robustness sanity check: one wild value in a thousand shifts the
        // median and MAD by O(1/N) of the spread, not by O(outlier).
        let clean: Vec<f64> = (0..1000).map(|i| ((i * 7919) % 1000) as f64 / 1000.0).collect();
        let clean_stats = RobustStats::of(&clean);

        let mut dirty = clean;
        dirty.push(1.0e9);
        let dirty_stats = RobustStats::of(&dirty);

        assert_abs_diff_eq!(clean_stats.median, dirty_stats.median, epsilon = 1e-2);
        assert_abs_diff_eq!(clean_stats.mad, dirty_stats.mad, epsilon = 1e-2);
    }
}
