//! Selecting calibrator samples to evaluate, and the store they come from.
//!
//! The engine never talks to a measurement set directly. A caller provides
//! an implementation of [`SampleStore`], which serves one [`VisChunk`] of
//! baseline × timestamp rows per (field, spw, polarisation, intent)
//! combination; [`FlagSelection`] names the combinations to evaluate. This
//! keeps the statistical core free of any data-format dependency and makes
//! the "no data for this combination" case an ordinary value rather than a
//! control-flow exception.

use itertools::izip;

use crate::error::{AmpflagError, SelectionError};

/// One baseline × timestamp row of a single polarisation of a calibrator
/// selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Timestamp in seconds on an arbitrary monotonic epoch.
    pub time: f64,
    /// First antenna of the baseline.
    pub ant1: usize,
    /// Second antenna of the baseline. Stores should not serve
    /// autocorrelations; the engine skips any `ant1 == ant2` row it sees.
    pub ant2: usize,
    /// Calibrated visibility amplitude.
    pub corrected_amp: f64,
    /// Amplitude predicted by the calibrator model.
    pub model_amp: f64,
    /// Whether the row is already flagged upstream.
    pub flagged: bool,
}

/// Struct-of-arrays form of a set of [`Sample`]s: the shape the engine
/// consumes. All columns are parallel and index-aligned.
///
/// # Examples
///
/// ```rust
/// use ampflag::{Sample, VisChunk};
///
/// let chunk: VisChunk = (0..4)
///     .map(|i| Sample {
///         time: 100.0 + i as f64,
///         ant1: 0,
///         ant2: 1,
///         corrected_amp: 1.0,
///         model_amp: 1.0,
///         flagged: false,
///     })
///     .collect();
/// assert_eq!(chunk.len(), 4);
/// assert!(chunk.validate(2).is_ok());
/// ```
#[derive(Debug, Default, Clone)]
pub struct VisChunk {
    /// Timestamp of each row, seconds on an arbitrary monotonic epoch.
    pub time: Vec<f64>,
    /// First antenna of each row's baseline.
    pub ant1: Vec<usize>,
    /// Second antenna of each row's baseline.
    pub ant2: Vec<usize>,
    /// Calibrated visibility amplitude of each row.
    pub corrected_amp: Vec<f64>,
    /// Model visibility amplitude of each row.
    pub model_amp: Vec<f64>,
    /// Pre-existing flag of each row.
    pub flagged: Vec<bool>,
}

impl VisChunk {
    /// Number of rows in the chunk.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the chunk has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Append one row.
    pub fn push(&mut self, sample: Sample) {
        self.time.push(sample.time);
        self.ant1.push(sample.ant1);
        self.ant2.push(sample.ant2);
        self.corrected_amp.push(sample.corrected_amp);
        self.model_amp.push(sample.model_amp);
        self.flagged.push(sample.flagged);
    }

    /// Iterate the rows back out as [`Sample`]s.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        izip!(
            &self.time,
            &self.ant1,
            &self.ant2,
            &self.corrected_amp,
            &self.model_amp,
            &self.flagged
        )
        .map(
            |(&time, &ant1, &ant2, &corrected_amp, &model_amp, &flagged)| Sample {
                time,
                ant1,
                ant2,
                corrected_amp,
                model_amp,
                flagged,
            },
        )
    }

    /// Check that all columns are parallel and that every antenna index is
    /// below `num_ants`.
    ///
    /// # Errors
    ///
    /// [`SelectionError::BadChunkShape`] when a column length disagrees
    /// with the time column or an antenna index is out of range.
    pub fn validate(&self, num_ants: usize) -> Result<(), SelectionError> {
        let n = self.time.len();
        for (argument, len) in [
            ("ant1", self.ant1.len()),
            ("ant2", self.ant2.len()),
            ("corrected_amp", self.corrected_amp.len()),
            ("model_amp", self.model_amp.len()),
            ("flagged", self.flagged.len()),
        ] {
            if len != n {
                return Err(SelectionError::BadChunkShape {
                    argument,
                    expected: format!("{} rows", n),
                    received: format!("{} rows", len),
                });
            }
        }
        if let Some(&ant) = self.ant1.iter().chain(&self.ant2).find(|&&a| a >= num_ants) {
            return Err(SelectionError::BadChunkShape {
                argument: "antenna index",
                expected: format!("< {}", num_ants),
                received: format!("{}", ant),
            });
        }
        Ok(())
    }
}

impl FromIterator<Sample> for VisChunk {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        let mut chunk = Self::default();
        for sample in iter {
            chunk.push(sample);
        }
        chunk
    }
}

/// The injected data-access seam. The concrete store (a measurement-set
/// reader, a test fixture, ...) is the caller's business.
pub trait SampleStore {
    /// An identifier for the dataset, stamped into every emitted
    /// [`FlagCmd`](crate::FlagCmd)'s `filename`.
    fn name(&self) -> &str;

    /// Total number of antennas in the array, flagged or not.
    fn num_antennas(&self) -> usize;

    /// Number of correlation products recorded for the given spectral
    /// window; polarisation indices range over `0..num_correlations(spw)`.
    fn num_correlations(&self, spw: usize) -> usize;

    /// Read all baseline × timestamp rows for one (field, spw,
    /// polarisation, intent) combination.
    ///
    /// # Errors
    ///
    /// [`SelectionError::NoData`] when the combination selects nothing;
    /// [`SelectionError::Backend`] for store-side failures. Both make the
    /// orchestrator skip the combination rather than abort.
    fn read(
        &self,
        field: &str,
        spw: usize,
        pol: usize,
        intent: &str,
    ) -> Result<VisChunk, SelectionError>;
}

/// Which (field × spw) combinations to evaluate, and for which scan
/// intent.
///
/// # Examples
///
/// ```rust
/// use ampflag::FlagSelection;
///
/// let sel = FlagSelection::parse("J0423-0120,3c279", "17,19,21", "BANDPASS").unwrap();
/// assert_eq!(sel.fields.len(), 2);
/// assert_eq!(sel.spws, vec![17, 19, 21]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct FlagSelection {
    /// Field names to evaluate.
    pub fields: Vec<String>,
    /// Spectral window numbers to evaluate.
    pub spws: Vec<usize>,
    /// Scan intent the samples must match, e.g. `"BANDPASS"`.
    pub intent: String,
}

impl FlagSelection {
    /// Build a selection from the comma-separated `field` and `spw`
    /// strings of the task interface.
    ///
    /// Empty list entries are dropped, so `"0,,2"` selects two fields.
    ///
    /// # Errors
    ///
    /// [`AmpflagError::BadSpwSelection`] when an spw entry is not a
    /// number.
    pub fn parse(fields: &str, spws: &str, intent: &str) -> Result<Self, AmpflagError> {
        let fields = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        let spws = spws
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>().map_err(|e| AmpflagError::BadSpwSelection {
                    selection: spws.to_string(),
                    reason: format!("{:?}: {}", s, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            fields,
            spws,
            intent: intent.to_string(),
        })
    }
}
