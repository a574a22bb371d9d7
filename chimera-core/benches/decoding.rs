use chimera_core::config::ModemConfig;
use chimera_core::{StreamingDemodulator, Transmitter};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_config() -> ModemConfig {
    ModemConfig {
        sequence_length: 31,
        seed: 21,
        samples_per_phase: 12,
        sample_rate: 48_000.0,
        carrier_freq: 9_000.0,
        correlation_threshold: 0.4,
        peak_to_noise_ratio: 3.5,
    }
}

fn benchmark_streaming_decode(c: &mut Criterion) {
    let config = bench_config();
    let tx = Transmitter::new(config).unwrap();
    let mut audio = tx.build_frame(b"bench payload", 0, 0, 0).unwrap();
    audio.extend(std::iter::repeat(0.0f32).take(config.bit_duration_samples() * 4));

    c.bench_function("streaming_demodulator_one_frame", |b| {
        b.iter(|| {
            let mut rx = StreamingDemodulator::new(config).unwrap();
            rx.add_samples(black_box(&audio));
            let mut frames = Vec::new();
            for _ in 0..20 {
                frames.extend(rx.get_available_frames());
                if !frames.is_empty() {
                    break;
                }
            }
            black_box(frames)
        })
    });
}

criterion_group!(benches, benchmark_streaming_decode);
criterion_main!(benches);
