//! Per-baseline outlier aggregation: the second stage of the cascade.
//!
//! Where stage one hunts for bad moments, this stage hunts for persistent
//! problems: baselines whose outlier-timestamp fraction exceeds threshold,
//! antennas over-represented among those bad baselines, and the residual
//! bad baselines not explained by a bad antenna. The thresholds are scaled
//! by the factor handed over from stage one.

use std::collections::BTreeMap;

use log::{debug, trace};

use crate::{
    cmds::ChunkFlag,
    context::FlagContext,
    stats::{select_outliers, RobustStats},
};

/// Find persistently bad antennas and baselines for one (field, spw, pol)
/// selection.
///
/// Outliers are selected against the same statistics as stage one but with
/// the baseline-level sigma thresholds; `thresh_scale_factor` scales both
/// `tmint` and `tmbl`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn aggregate_baselines(
    ctx: &FlagContext,
    metric: &[f64],
    valid: &[bool],
    ant1: &[usize],
    ant2: &[usize],
    num_ants: usize,
    stats: &RobustStats,
    thresh_scale_factor: f64,
) -> Vec<ChunkFlag> {
    // two-sided when a negative threshold is configured, otherwise
    // positive only
    let two_sided = ctx.antblnegsig > 0.0;
    let outliers = select_outliers(
        metric,
        valid,
        stats,
        if two_sided { ctx.antblnegsig } else { f64::INFINITY },
        Some(ctx.antblpossig),
    );
    if outliers.is_empty() {
        return vec![];
    }

    // per-baseline totals over every row, outlier counts over the outlier
    // rows; keyed by unordered pair so the iteration order (and with it
    // the command order) is deterministic
    let mut outlier_counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    let mut total_counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for i in 0..metric.len() {
        let bl = (ant1[i].min(ant2[i]), ant1[i].max(ant2[i]));
        *total_counts.entry(bl).or_default() += 1;
    }
    for &i in &outliers {
        let bl = (ant1[i].min(ant2[i]), ant1[i].max(ant2[i]));
        *outlier_counts.entry(bl).or_default() += 1;
    }

    // a baseline is bad when its outlier timestamps exceed the scaled
    // fraction of its total timestamps, never for a single outlier
    let tmint_scaled = ctx.tmint * thresh_scale_factor;
    let bad_bls: Vec<(usize, usize)> = outlier_counts
        .iter()
        .filter(|&(bl, &count)| count as f64 > f64::max(1.0, total_counts[bl] as f64 * tmint_scaled))
        .map(|(&bl, _)| bl)
        .collect();
    if bad_bls.is_empty() {
        return vec![];
    }
    debug!(
        "{} of {} baselines exceed {} outlier fraction",
        bad_bls.len(),
        total_counts.len(),
        tmint_scaled
    );

    // promote antennas that participate in too many bad baselines
    let mut ant_in_bad_bl = vec![0_usize; num_ants];
    for &(a, b) in &bad_bls {
        ant_in_bad_bl[a] += 1;
        ant_in_bad_bl[b] += 1;
    }
    let tmbl_scaled = ctx.tmbl * thresh_scale_factor;
    let bad_ant_thresh = tmbl_scaled * (num_ants.saturating_sub(1)) as f64;
    let bad_ants: Vec<usize> = (0..num_ants)
        .filter(|&ant| ant_in_bad_bl[ant] > 0 && ant_in_bad_bl[ant] as f64 >= bad_ant_thresh)
        .collect();

    let mut flags: Vec<ChunkFlag> = bad_ants
        .iter()
        .map(|&ant| {
            trace!(
                "antenna {} in {} bad baselines (threshold {})",
                ant,
                ant_in_bad_bl[ant],
                bad_ant_thresh
            );
            ChunkFlag::Antenna { ant }
        })
        .collect();

    // remaining bad baselines not covered by a bad antenna, re-tested
    // against the always-relaxed fraction so a baseline needs a genuinely
    // high outlier rate to be flagged on its own
    let tmint_relaxed = f64::min(1.0, ctx.tmint * ctx.relaxed_factor);
    for &(a, b) in &bad_bls {
        if bad_ants.contains(&a) || bad_ants.contains(&b) {
            continue;
        }
        let fraction = outlier_counts[&(a, b)] as f64 / total_counts[&(a, b)] as f64;
        if fraction >= tmint_relaxed {
            trace!("baseline {}&{} outlier fraction {}", a, b, fraction);
            flags.push(ChunkFlag::Baseline { ant1: a, ant2: b });
        }
    }
    flags
}
