use ampflag::{flag_chunk, FlagContext, Sample, VisChunk};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const NUM_ANTS: usize = 64;
const NUM_TIMESTEPS: usize = 50;

/// A complete-array chunk with deterministic amplitude jitter and one
/// misbehaving antenna.
fn synthetic_chunk() -> VisChunk {
    let jitter = [0.0, 0.004, -0.003, 0.006, -0.005, 0.002, -0.006, 0.003];
    let mut chunk = VisChunk::default();
    let mut row = 0;
    for t in 0..NUM_TIMESTEPS {
        for a in 0..NUM_ANTS {
            for b in (a + 1)..NUM_ANTS {
                let dropout = if t == 0 && b == 13 { -0.12 } else { 0.0 };
                chunk.push(Sample {
                    time: 5000.0 + t as f64 * 10.0,
                    ant1: a,
                    ant2: b,
                    corrected_amp: 1.0 + jitter[row % jitter.len()] + dropout,
                    model_amp: 1.0,
                    flagged: false,
                });
                row += 1;
            }
        }
    }
    chunk
}

fn bench_flag_chunk(crt: &mut Criterion) {
    let chunk = synthetic_chunk();
    let ctx = FlagContext::default();
    crt.bench_function(
        &format!(
            "flag_chunk over {} antennas, {} timesteps",
            NUM_ANTS, NUM_TIMESTEPS
        ),
        |bch| {
            bch.iter(|| {
                black_box(flag_chunk(black_box(&ctx), black_box(&chunk), NUM_ANTS));
            });
        },
    );
}

criterion_group!(benches, bench_flag_chunk);
criterion_main!(benches);
