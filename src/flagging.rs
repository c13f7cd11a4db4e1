//! Running the flagging heuristics over chunks and whole datasets.
//!
//! [`flag_chunk`] evaluates one (field, spw, polarisation) selection:
//! robust statistics over the amplitude residuals, then the two heuristic
//! stages with the threshold scale factor threaded between them.
//! [`flag_dataset`] orchestrates `flag_chunk` over every combination a
//! [`FlagSelection`] names, skipping combinations that cannot be read and
//! stamping the surviving decisions into [`FlagCmd`]s.

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, trace, warn};
use rayon::prelude::*;

use crate::{
    baselines::aggregate_baselines,
    cmds::{consolidate_chunk_flags, ChunkFlag, FlagCmd},
    context::FlagContext,
    error::{AmpflagError, SelectionError},
    selection::{FlagSelection, SampleStore, VisChunk},
    stats::RobustStats,
    timestamps::classify_timestamps,
};

/// Evaluate the flagging heuristics over a single chunk.
///
/// Returns decisions local to the chunk, already consolidated; stamp them
/// with [`ChunkFlag::into_cmd`] to obtain commands. Autocorrelation rows
/// are ignored. The context is assumed validated (see
/// [`FlagContext::validate`]).
///
/// # Panics
///
/// Panics if the chunk references an antenna index at or beyond
/// `num_ants`; [`VisChunk::validate`] checks this, and the orchestrator
/// runs it before every unit.
pub fn flag_chunk(ctx: &FlagContext, chunk: &VisChunk, num_ants: usize) -> Vec<ChunkFlag> {
    // select non-autocorrelations
    let rows: Vec<usize> = (0..chunk.len())
        .filter(|&i| chunk.ant1[i] != chunk.ant2[i])
        .collect();
    if rows.is_empty() {
        return vec![];
    }

    let times: Vec<f64> = rows.iter().map(|&i| chunk.time[i]).collect();
    let ant1: Vec<usize> = rows.iter().map(|&i| chunk.ant1[i]).collect();
    let ant2: Vec<usize> = rows.iter().map(|&i| chunk.ant2[i]).collect();

    // scalar difference between corrected and model amplitude
    let metric: Vec<f64> = rows
        .iter()
        .map(|&i| chunk.corrected_amp[i].abs() - chunk.model_amp[i].abs())
        .collect();
    let valid: Vec<bool> = rows
        .iter()
        .zip(&metric)
        .map(|(&i, m)| !chunk.flagged[i] && m.is_finite())
        .collect();

    let stats = RobustStats::of_masked(&metric, &valid);
    if stats.mad <= 0.0 {
        // no spread information: degenerate selections flag nothing
        trace!("degenerate statistics over {} rows; nothing to flag", rows.len());
        return vec![];
    }
    trace!(
        "{} rows, median {:e}, robust sigma {:e}",
        rows.len(),
        stats.median,
        stats.mad
    );

    let stage1 = classify_timestamps(ctx, &metric, &valid, &times, &ant1, &ant2, num_ants, &stats);
    let mut flags = stage1.flags;
    flags.extend(aggregate_baselines(
        ctx,
        &metric,
        &valid,
        &ant1,
        &ant2,
        num_ants,
        &stats,
        stage1.thresh_scale_factor,
    ));
    consolidate_chunk_flags(flags)
}

/// One (field, spw, pol) combination the orchestrator could not evaluate.
#[derive(Debug, Clone)]
pub struct SkippedSelection {
    /// Field of the skipped combination.
    pub field: String,
    /// Spectral window of the skipped combination.
    pub spw: usize,
    /// Polarisation of the skipped combination.
    pub pol: usize,
    /// Why it was skipped.
    pub error: SelectionError,
}

/// The outcome of a dataset evaluation: every command raised, plus the
/// combinations that could not be read. Flags are never invented for data
/// that failed to read.
#[derive(Debug, Default)]
pub struct FlagReport {
    /// All commands, in (field, spw, pol) unit order.
    pub cmds: Vec<FlagCmd>,
    /// Combinations that were skipped, in unit order.
    pub skipped: Vec<SkippedSelection>,
}

/// Evaluate the flagging heuristics for every (field × spw × polarisation)
/// combination of `selection`.
///
/// Units are independent and run on the rayon thread pool; each returns
/// its own command list and the lists are concatenated in unit order, so
/// the output is deterministic. A combination whose read fails is logged,
/// recorded in the report and skipped.
///
/// # Errors
///
/// [`AmpflagError::BadThreshold`] when the context is inconsistent;
/// validation happens before any data is read.
pub fn flag_dataset<S>(
    store: &S,
    ctx: &FlagContext,
    selection: &FlagSelection,
) -> Result<FlagReport, AmpflagError>
where
    S: SampleStore + Sync,
{
    ctx.validate()?;
    debug!("{}", ctx);

    let num_ants = store.num_antennas();
    let units: Vec<(&str, usize, usize)> = selection
        .fields
        .iter()
        .flat_map(|field| {
            selection.spws.iter().flat_map(move |&spw| {
                (0..store.num_correlations(spw)).map(move |pol| (field.as_str(), spw, pol))
            })
        })
        .collect();

    let draw_target = if ctx.draw_progress {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let progress = ProgressBar::with_draw_target(Some(units.len() as u64), draw_target);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{msg:16}: [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:3}% ({eta:5})")
            .unwrap()
            .progress_chars("=> "),
    );
    progress.set_message("flag");

    let results: Vec<Result<Vec<FlagCmd>, SkippedSelection>> = units
        .par_iter()
        .progress_with(progress.clone())
        .map(|&(field, spw, pol)| flag_unit(store, ctx, field, spw, pol, &selection.intent, num_ants))
        .collect();
    progress.finish();

    let mut report = FlagReport::default();
    for result in results {
        match result {
            Ok(cmds) => report.cmds.extend(cmds),
            Err(skipped) => report.skipped.push(skipped),
        }
    }
    if report.cmds.is_empty() {
        info!("evaluation of {} raised 0 flagging commands", store.name());
    } else {
        warn!(
            "evaluation of {} raised {} flagging command(s)",
            store.name(),
            report.cmds.len()
        );
    }
    Ok(report)
}

/// Evaluate a single (field, spw, pol) unit, stamping decisions into
/// commands. A failed read yields the skip record instead; partial units
/// never emit partial flags.
fn flag_unit<S: SampleStore>(
    store: &S,
    ctx: &FlagContext,
    field: &str,
    spw: usize,
    pol: usize,
    intent: &str,
    num_ants: usize,
) -> Result<Vec<FlagCmd>, SkippedSelection> {
    info!(
        "reading data for intent {}, field {}, spw {}, pol {}",
        intent, field, spw, pol
    );
    let chunk = store
        .read(field, spw, pol, intent)
        .and_then(|chunk| {
            chunk.validate(num_ants)?;
            Ok(chunk)
        })
        .map_err(|error| {
            warn!(
                "unable to compute flagging for intent {}, field {}, spw {}, pol {}: {}",
                intent, field, spw, pol, error
            );
            SkippedSelection {
                field: field.to_string(),
                spw,
                pol,
                error,
            }
        })?;

    let decisions = flag_chunk(ctx, &chunk, num_ants);
    Ok(decisions
        .into_iter()
        .map(|decision| decision.into_cmd(store.name(), field, spw, pol, intent))
        .collect())
}
