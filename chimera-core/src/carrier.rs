//! Carrier (de)modulation: phase-per-chip <-> real-valued audio samples via
//! I/Q integration, with running absolute-sample-index phase continuity.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy)]
pub struct CarrierSymbol {
    pub phase: f64,
    pub amplitude: f64,
}

fn angular_freq(sample_rate: f64, carrier_freq: f64) -> f64 {
    2.0 * PI * carrier_freq / sample_rate
}

/// Modulate `phases` into samples, holding each phase for `samples_per_chip`
/// samples. `start_sample_index` is the absolute sample count since stream
/// start, used as the carrier reference so phase stays continuous across
/// chunk boundaries.
pub fn modulate_block(
    sample_rate: f64,
    carrier_freq: f64,
    samples_per_chip: usize,
    start_sample_index: u64,
    phases: &[f64],
) -> Vec<f32> {
    let omega = angular_freq(sample_rate, carrier_freq);
    let mut out = Vec::with_capacity(phases.len() * samples_per_chip);
    let mut n = start_sample_index;
    for &phi in phases {
        for _ in 0..samples_per_chip {
            out.push((omega * n as f64 + phi).sin() as f32);
            n += 1;
        }
    }
    out
}

/// Demodulate one chip-symbol interval of `samples_per_chip` samples via I/Q
/// integration against the local carrier reference starting at absolute
/// sample index `start_sample_index`.
pub fn demodulate_symbol(
    sample_rate: f64,
    carrier_freq: f64,
    start_sample_index: u64,
    samples: &[f32],
) -> CarrierSymbol {
    let omega = angular_freq(sample_rate, carrier_freq);
    let mut i_acc = 0.0f64;
    let mut q_acc = 0.0f64;
    for (k, &s) in samples.iter().enumerate() {
        let n = (start_sample_index + k as u64) as f64;
        i_acc += s as f64 * (omega * n).sin();
        q_acc += s as f64 * (omega * n).cos();
    }
    CarrierSymbol {
        phase: q_acc.atan2(i_acc),
        amplitude: (i_acc * i_acc + q_acc * q_acc).sqrt(),
    }
}

/// Demodulate a whole block of `samples` as consecutive `samples_per_chip`
/// intervals, starting at absolute sample index `start_sample_index`.
pub fn demodulate_block(
    sample_rate: f64,
    carrier_freq: f64,
    samples_per_chip: usize,
    start_sample_index: u64,
    samples: &[f32],
) -> Vec<CarrierSymbol> {
    samples
        .chunks_exact(samples_per_chip)
        .enumerate()
        .map(|(i, chunk)| {
            let offset = start_sample_index + (i * samples_per_chip) as u64;
            demodulate_symbol(sample_rate, carrier_freq, offset, chunk)
        })
        .collect()
}

/// Stateful modulator wrapper that tracks the running absolute sample index
/// so phase stays continuous across repeated `modulate` calls.
#[derive(Debug, Clone)]
pub struct CarrierModulator {
    sample_rate: f64,
    carrier_freq: f64,
    samples_per_chip: usize,
    sample_index: u64,
}

impl CarrierModulator {
    pub fn new(sample_rate: f64, carrier_freq: f64, samples_per_chip: usize) -> Self {
        Self {
            sample_rate,
            carrier_freq,
            samples_per_chip,
            sample_index: 0,
        }
    }

    pub fn modulate(&mut self, phases: &[f64]) -> Vec<f32> {
        let out = modulate_block(
            self.sample_rate,
            self.carrier_freq,
            self.samples_per_chip,
            self.sample_index,
            phases,
        );
        self.sample_index += (phases.len() * self.samples_per_chip) as u64;
        out
    }

    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }
}

/// Stateful demodulator wrapper mirroring [`CarrierModulator`] for the
/// streaming receive path.
#[derive(Debug, Clone)]
pub struct CarrierDemodulator {
    sample_rate: f64,
    carrier_freq: f64,
    samples_per_chip: usize,
    sample_index: u64,
}

impl CarrierDemodulator {
    pub fn new(sample_rate: f64, carrier_freq: f64, samples_per_chip: usize) -> Self {
        Self {
            sample_rate,
            carrier_freq,
            samples_per_chip,
            sample_index: 0,
        }
    }

    pub fn demodulate_one(&mut self, samples: &[f32]) -> CarrierSymbol {
        debug_assert_eq!(samples.len(), self.samples_per_chip);
        let symbol = demodulate_symbol(self.sample_rate, self.carrier_freq, self.sample_index, samples);
        self.sample_index += self.samples_per_chip as u64;
        symbol
    }

    pub fn sample_index(&self) -> u64 {
        self.sample_index
    }

    pub fn set_sample_index(&mut self, index: u64) {
        self.sample_index = index;
    }

    pub fn samples_per_chip(&self) -> usize {
        self.samples_per_chip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modulate_demodulate_recovers_phase() {
        let sample_rate = 48_000.0;
        let carrier_freq = 10_000.0;
        let samples_per_chip = 23;
        let phases = [0.0, PI / 2.0, PI, -PI / 2.0];

        let samples = modulate_block(sample_rate, carrier_freq, samples_per_chip, 0, &phases);
        let symbols = demodulate_block(sample_rate, carrier_freq, samples_per_chip, 0, &samples);

        assert_eq!(symbols.len(), phases.len());
        for (expected, got) in phases.iter().zip(symbols.iter()) {
            let diff = (expected - got.phase).rem_euclid(2.0 * PI);
            let diff = diff.min(2.0 * PI - diff);
            assert!(diff < 0.05, "expected {expected}, got {}", got.phase);
            assert!(got.amplitude > 0.0);
        }
    }

    #[test]
    fn stateful_wrappers_maintain_continuity_across_calls() {
        let mut modulator = CarrierModulator::new(48_000.0, 10_000.0, 16);
        let first = modulator.modulate(&[0.0, PI]);
        let second = modulator.modulate(&[0.0]);
        assert_eq!(modulator.sample_index(), (first.len() + second.len()) as u64);

        let all_phases = [0.0, PI, 0.0];
        let combined = modulate_block(48_000.0, 10_000.0, 16, 0, &all_phases);
        assert_eq!([first, second].concat(), combined);
    }
}
