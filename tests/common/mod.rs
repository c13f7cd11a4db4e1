//! Synthetic calibrator data and an in-memory store for integration tests.

use std::collections::HashMap;

use ampflag::{Sample, SampleStore, SelectionError, VisChunk};

/// Small deterministic amplitude jitter applied to nominal rows so the
/// robust spread is non-zero; its robust sigma is about 0.0052, and the
/// largest deviation from its median stays inside every outlier window.
pub const JITTER: [f64; 8] = [0.0, 0.004, -0.003, 0.006, -0.005, 0.002, -0.006, 0.003];

/// Timestamp of the `t`-th integration of a synthetic chunk.
pub fn time_at(t: usize) -> f64 {
    5000.0 + t as f64 * 10.0
}

/// A complete-array chunk: every baseline of `num_ants` antennas at
/// `num_times` timestamps, model amplitude 1.0, corrected amplitude 1.0
/// plus jitter, nothing flagged.
pub fn uniform_chunk(num_ants: usize, num_times: usize) -> VisChunk {
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

/// A chunk whose corrected amplitudes equal the model amplitudes exactly.
pub fn clean_chunk(num_ants: usize, num_times: usize) -> VisChunk {
    let mut chunk = uniform_chunk(num_ants, num_times);
    for amp in chunk.corrected_amp.iter_mut() {
        *amp = 1.0;
    }
    chunk
}

/// Add `delta` to the corrected amplitude of baseline `bl` at the `t`-th
/// integration.
pub fn add_offset(chunk: &mut VisChunk, bl: (usize, usize), t: usize, delta: f64) {
    let time = time_at(t);
    for i in 0..chunk.len() {
        if chunk.time[i] == time && (chunk.ant1[i], chunk.ant2[i]) == bl {
            chunk.corrected_amp[i] += delta;
        }
    }
}

/// Add `delta` to baseline `bl` in its first `count` integrations.
pub fn add_offsets(chunk: &mut VisChunk, bl: (usize, usize), count: usize, delta: f64) {
    for t in 0..count {
        add_offset(chunk, bl, t, delta);
    }
}

/// An in-memory [`SampleStore`] keyed by (field, spw, pol).
pub struct MemoryStore {
    name: String,
    num_ants: usize,
    num_corrs: usize,
    chunks: HashMap<(String, usize, usize), VisChunk>,
}

impl MemoryStore {
    pub fn new(name: &str, num_ants: usize, num_corrs: usize) -> Self {
        Self {
            name: name.to_string(),
            num_ants,
            num_corrs,
            chunks: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: &str, spw: usize, pol: usize, chunk: VisChunk) {
        self.chunks.insert((field.to_string(), spw, pol), chunk);
    }

    /// Insert the same chunk for every polarisation of the given spw.
    pub fn insert_all_pols(&mut self, field: &str, spw: usize, chunk: &VisChunk) {
        for pol in 0..self.num_corrs {
            self.insert(field, spw, pol, chunk.clone());
        }
    }
}

impl SampleStore for MemoryStore {
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
