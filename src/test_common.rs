//! Synthetic data shared by the unit tests.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::{
    error::SelectionError,
    selection::{Sample, SampleStore, VisChunk},
};

/// Small deterministic amplitude jitter applied to nominal rows so the
/// robust spread is non-zero. The largest deviation from the pattern's
/// median is about 1.4 robust sigma, safely inside every outlier window.
pub(crate) const JITTER: [f64; 8] = [0.0, 0.004, -0.003, 0.006, -0.005, 0.002, -0.006, 0.003];

lazy_static! {
    /// Robust sigma of the jitter pattern, for placing outliers in sigma
    /// units.
    pub(crate) static ref JITTER_SIGMA: f64 = crate::RobustStats::of(&JITTER).mad;
}

/// Timestamp of the `t`-th integration of a synthetic chunk.
pub(crate) fn time_at(t: usize) -> f64 {
    5000.0 + t as f64 * 10.0
}

/// A complete-array chunk: every baseline of `num_ants` antennas at
/// `num_times` timestamps, model amplitude 1.0, corrected amplitude 1.0
/// plus jitter, nothing flagged.
pub(crate) fn uniform_chunk(num_ants: usize, num_times: usize) -> VisChunk {
    let mut chunk = VisChunk::default();
    let mut row = 0;
    for t in 0..num_times {
        for a in 0..num_ants {
            for b in (a + 1)..num_ants {
                chunk.push(Sample {
                    time: time_at(t),
                    ant1: a,
                    ant2: b,
                    corrected_amp: 1.0 + JITTER[row % JITTER.len()],
                    model_amp: 1.0,
                    flagged: false,
                });
                row += 1;
            }
        }
    }
    chunk
}

/// Add `delta` to the corrected amplitude of baseline `bl` at the `t`-th
/// integration.
pub(crate) fn add_offset(chunk: &mut VisChunk, bl: (usize, usize), t: usize, delta: f64) {
    let time = time_at(t);
    for i in 0..chunk.len() {
        if chunk.time[i] == time && (chunk.ant1[i], chunk.ant2[i]) == bl {
            chunk.corrected_amp[i] += delta;
        }
    }
}

/// An in-memory [`SampleStore`] keyed by (field, spw, pol).
pub(crate) struct TestStore {
    name: String,
    num_ants: usize,
    num_corrs: usize,
    chunks: HashMap<(String, usize, usize), VisChunk>,
}

impl TestStore {
    pub(crate) fn new(name: &str, num_ants: usize, num_corrs: usize) -> Self {
        Self {
            name: name.to_string(),
            num_ants,
            num_corrs,
            chunks: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, field: &str, spw: usize, pol: usize, chunk: VisChunk) {
        self.chunks.insert((field.to_string(), spw, pol), chunk);
    }
}

impl SampleStore for TestStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_antennas(&self) -> usize {
        self.num_ants
    }

    fn num_correlations(&self, _spw: usize) -> usize {
        self.num_corrs
    }

    fn read(
        &self,
        field: &str,
        spw: usize,
        pol: usize,
        intent: &str,
    ) -> Result<VisChunk, SelectionError> {
        self.chunks
            .get(&(field.to_string(), spw, pol))
            .cloned()
            .ok_or_else(|| SelectionError::NoData {
                field: field.to_string(),
                spw,
                pol,
                intent: intent.to_string(),
            })
    }
}
