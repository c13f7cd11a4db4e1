//! Per-timestamp outlier attribution: the first stage of the cascade.
//!
//! This stage looks for outliers that are concentrated in a small number
//! of timestamps, and attributes each such timestamp either to a single
//! dominant antenna or to the whole array. When the outliers are spread
//! over too many timestamps to act on individually, the stage instead
//! hands a relaxed threshold scale factor to the baseline stage, which is
//! better placed to catch persistent problems.

use log::{debug, trace};

use crate::{
    cmds::ChunkFlag,
    constants::{ANTS_IN_OUTLIER_SCANS_FRAC, ANT_IN_OUTLIER_SCANS_FRAC, VERY_HIGH_SIGMA},
    context::FlagContext,
    stats::{select_outliers, RobustStats},
};

/// What stage one decided, and the threshold scale factor threaded through
/// to the baseline stage.
pub(crate) struct TimestampClassification {
    /// Per-timestamp decisions, in timestamp order.
    pub flags: Vec<ChunkFlag>,
    /// 1.0 normally; `relaxed_factor` when outliers were found but were
    /// too spread out in time for per-timestamp attribution.
    pub thresh_scale_factor: f64,
}

/// Classify outlier timestamps for one (field, spw, pol) selection.
///
/// All slices are parallel per row; `times`/`ant1`/`ant2` cover every
/// (non-autocorrelation) row of the selection, while `valid` masks out
/// flagged and non-finite rows for the statistics.
#[allow(clippy::too_many_arguments)]
pub(crate) fn classify_timestamps(
    ctx: &FlagContext,
    metric: &[f64],
    valid: &[bool],
    times: &[f64],
    ant1: &[usize],
    ant2: &[usize],
    num_ants: usize,
    stats: &RobustStats,
) -> TimestampClassification {
    let two_sided = ctx.tmantint > 0.0;
    let outliers = select_outliers(
        metric,
        valid,
        stats,
        ctx.antnegsig,
        two_sided.then_some(ctx.antpossig),
    );

    if outliers.is_empty() {
        return TimestampClassification {
            flags: vec![],
            thresh_scale_factor: 1.0,
        };
    }

    if !two_sided {
        // negative outliers exist but per-timestamp attribution is
        // disabled; hand the problem to the baseline stage with relaxed
        // thresholds
        debug!(
            "{} negative outliers with tmantint disabled; relaxing by {}",
            outliers.len(),
            ctx.relaxed_factor
        );
        return TimestampClassification {
            flags: vec![],
            thresh_scale_factor: ctx.relaxed_factor,
        };
    }

    let n_unique_times = unique_sorted(times.to_vec()).len();
    let max_outlier_times = (ctx.tmantint * n_unique_times as f64).ceil().max(1.0) as usize;

    let outlier_times = unique_sorted(outliers.iter().map(|&i| times[i]).collect());
    if outlier_times.len() <= max_outlier_times {
        trace!(
            "{} outliers concentrated in {} of {} timestamps",
            outliers.len(),
            outlier_times.len(),
            n_unique_times
        );
        return TimestampClassification {
            flags: classify_concentrated(&outliers, &outlier_times, times, ant1, ant2, num_ants),
            thresh_scale_factor: 1.0,
        };
    }

    // Outliers are spread over too many timestamps: relax the baseline
    // thresholds. Very high outliers may still be concentrated enough to
    // attribute individually.
    debug!(
        "outliers in {} timestamps exceed the maximum of {}; relaxing by {}",
        outlier_times.len(),
        max_outlier_times,
        ctx.relaxed_factor
    );
    let very_high = select_outliers(metric, valid, stats, VERY_HIGH_SIGMA, Some(VERY_HIGH_SIGMA));
    let very_high_times = unique_sorted(very_high.iter().map(|&i| times[i]).collect());
    let flags = if !very_high.is_empty() && very_high_times.len() <= max_outlier_times {
        classify_concentrated(&very_high, &very_high_times, times, ant1, ant2, num_ants)
    } else {
        vec![]
    };
    TimestampClassification {
        flags,
        thresh_scale_factor: ctx.relaxed_factor,
    }
}

/// Attribute each outlier timestamp to a dominant antenna, or to the whole
/// array when no antenna dominates but most of the array is involved.
fn classify_concentrated(
    outliers: &[usize],
    outlier_times: &[f64],
    times: &[f64],
    ant1: &[usize],
    ant2: &[usize],
    num_ants: usize,
) -> Vec<ChunkFlag> {
    let mut flags = Vec::new();
    for &t in outlier_times {
        let scans: Vec<usize> = outliers.iter().copied().filter(|&i| times[i] == t).collect();
        let n_scans = scans.len();

        // outlier baseline scans each antenna is involved in at this
        // timestamp
        let mut antcnts = vec![0_usize; num_ants];
        for &i in &scans {
            antcnts[ant1[i]] += 1;
            antcnts[ant2[i]] += 1;
        }
        // ties broken towards the lowest antenna id
        let (dominant, max_cnt) = antcnts
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0), |acc, (ant, cnt)| if cnt > acc.1 { (ant, cnt) } else { acc });

        if max_cnt as f64 >= ANT_IN_OUTLIER_SCANS_FRAC * n_scans as f64 {
            trace!(
                "antenna {} dominates {}/{} outlier scans at {}",
                dominant,
                max_cnt,
                n_scans,
                t
            );
            flags.push(ChunkFlag::AntennaAtTime { ant: dominant, time: t });
            continue;
        }

        // No dominant antenna. Count every antenna's involvement across
        // all scans at this timestamp; if most of the array sits at or
        // near the maximum involvement, the whole integration is bad.
        let mut involvement = vec![0_usize; num_ants];
        for (i, &ti) in times.iter().enumerate() {
            if ti == t {
                involvement[ant1[i]] += 1;
                involvement[ant2[i]] += 1;
            }
        }
        let max_inv = involvement.iter().copied().max().unwrap_or(0);
        let floor = max_inv.saturating_sub(1).max(1);
        let near_max = involvement.iter().filter(|&&cnt| cnt >= floor).count();
        if near_max as f64 > ANTS_IN_OUTLIER_SCANS_FRAC * num_ants as f64 {
            trace!(
                "{}/{} antennas near-equally involved at {}; flagging timestamp",
                near_max,
                num_ants,
                t
            );
            flags.push(ChunkFlag::Timestamp { time: t });
        }
    }
    flags
}

/// Sort and deduplicate a vector of timestamps.
fn unique_sorted(mut ts: Vec<f64>) -> Vec<f64> {
    ts.sort_unstable_by(f64::total_cmp);
    ts.dedup();
    ts
}
