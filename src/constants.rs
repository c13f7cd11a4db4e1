//! Fixed constants of the flagging heuristics.
//!
//! The tunable thresholds live in [`crate::FlagContext`]; the values below
//! are baked into the heuristics themselves.

/// Scale factor turning a median absolute deviation into a consistent
/// estimate of the standard deviation under a normal distribution.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Minimum fraction of a timestamp's outlier baseline scans that a single
/// antenna must be involved in before that antenna is blamed for the
/// timestamp.
pub const ANT_IN_OUTLIER_SCANS_FRAC: f64 = 0.5;

/// Fraction of all antennas that must be near-equally involved in a
/// timestamp's scans before the whole timestamp is flagged instead of a
/// single antenna.
pub const ANTS_IN_OUTLIER_SCANS_FRAC: f64 = 1.0 / 3.0;

/// Sigma threshold for the very-high outlier fallback: when the primary
/// outliers are too spread out in time to act on, outliers beyond this
/// many sigma are still attributed per timestamp.
pub const VERY_HIGH_SIGMA: f64 = 10.0;
