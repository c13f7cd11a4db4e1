#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! ampflag statistically identifies misbehaving antennas, baselines and
//! timestamps in calibrated (corrected) visibility amplitudes of a radio
//! interferometric calibrator observation, and emits flagging commands for
//! them.
//!
//! For every (field, spectral window, polarisation) selection, the scalar
//! difference between corrected and model amplitude is compared against
//! robust statistics (median and scaled median absolute deviation) in a
//! two-stage cascade:
//!
//! 1. outliers concentrated in a few timestamps are attributed to a
//!    dominant antenna, or to the whole array when no antenna dominates;
//! 2. baselines whose outlier-timestamp fraction exceeds threshold are
//!    collected, antennas over-represented among those bad baselines are
//!    flagged outright, and the residual bad baselines are flagged
//!    individually.
//!
//! When stage one finds outliers too spread out in time to act on, it
//! relaxes the stage-two thresholds instead, threading an explicit scale
//! factor between the stages.
//!
//! Data access is behind the [`SampleStore`] trait: the engine pulls
//! parallel arrays of (time, antenna pair, corrected amplitude, model
//! amplitude, flag) per selection and never touches a measurement set
//! itself.
//!
//! # Examples
//!
//! ```rust
//! use ampflag::{
//!     flag_dataset, FlagContextBuilder, FlagSelection, Sample, SampleStore, SelectionError,
//!     VisChunk,
//! };
//!
//! // A toy store: one field, one spw, one polarisation, 5 antennas and
//! // 10 integrations, with antenna 3 dropping amplitude at one timestamp.
//! struct ToyStore {
//!     chunk: VisChunk,
//! }
//!
//! impl SampleStore for ToyStore {
//!     fn name(&self) -> &str {
//!         "toy.ms"
//!     }
//!     fn num_antennas(&self) -> usize {
//!         5
//!     }
//!     fn num_correlations(&self, _spw: usize) -> usize {
//!         1
//!     }
//!     fn read(
//!         &self,
//!         _field: &str,
//!         _spw: usize,
//!         _pol: usize,
//!         _intent: &str,
//!     ) -> Result<VisChunk, SelectionError> {
//!         Ok(self.chunk.clone())
//!     }
//! }
//!
//! let mut chunk = VisChunk::default();
//! for t in 0..10 {
//!     for a in 0..5 {
//!         for b in (a + 1)..5 {
//!             // mild alternating jitter keeps the robust spread non-zero
//!             let jitter = if (t + a + b) % 2 == 0 { 0.001 } else { -0.001 };
//!             let dropout = if t == 0 && (a == 3 || b == 3) { -0.5 } else { 0.0 };
//!             chunk.push(Sample {
//!                 time: 5000.0 + t as f64,
//!                 ant1: a,
//!                 ant2: b,
//!                 corrected_amp: 1.0 + jitter + dropout,
//!                 model_amp: 1.0,
//!                 flagged: false,
//!             });
//!         }
//!     }
//! }
//!
//! let store = ToyStore { chunk };
//! let ctx = FlagContextBuilder::default().build().unwrap();
//! let selection = FlagSelection::parse("J0423-0120", "0", "BANDPASS").unwrap();
//! let report = flag_dataset(&store, &ctx, &selection).unwrap();
//!
//! assert!(report.skipped.is_empty());
//! assert_eq!(report.cmds.len(), 1);
//! assert_eq!(
//!     report.cmds[0].command(),
//!     "field='J0423-0120' spw='0' antenna='3' time='5000.000' \
//!      correlation='0' intent='*BANDPASS*' reason='bad antenna'"
//! );
//! ```

mod baselines;
pub mod cmds;
pub mod constants;
pub mod context;
pub mod error;
pub mod flagging;
pub mod selection;
pub mod stats;
mod timestamps;

#[cfg(test)]
mod test_common;

pub use cmds::{ChunkFlag, FlagCmd, FlagReason, FlagScope};
pub use context::{FlagContext, FlagContextBuilder};
pub use error::{AmpflagError, SelectionError};
pub use flagging::{flag_chunk, flag_dataset, FlagReport, SkippedSelection};
pub use selection::{FlagSelection, Sample, SampleStore, VisChunk};
pub use stats::RobustStats;
