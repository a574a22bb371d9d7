//! DSSS spreading sequence generation and per-bit spread/despread.
//!
//! The spreading sequence is a maximal-length LFSR sequence: the same
//! alpha-table construction used by [`crate::galois`] visits every nonzero
//! state of GF(2^m) in order, so we reuse `GaloisField` as the sequence
//! generator rather than hand-rolling a second LFSR.

use crate::errors::ConfigError;
use crate::galois::GaloisField;

/// Sign convention, fixed everywhere: bit 0 -> chip +1, bit 1 -> chip -1.
pub fn bit_to_chip_sign(bit: u8) -> i8 {
    if bit == 0 {
        1
    } else {
        -1
    }
}

fn primitive_poly_for_m(m: u32) -> Option<u32> {
    match m {
        2 => Some(0b111),
        3 => Some(0b1011),
        4 => Some(0b10011),
        5 => Some(0b100101),
        6 => Some(0b1000011),
        7 => Some(0b10000011),
        8 => Some(0b100011101),
        9 => Some(0b1000010001),
        10 => Some(0b10000001001),
        _ => None,
    }
}

/// An immutable maximal-length chip sequence of length n = 2^m - 1.
#[derive(Debug, Clone)]
pub struct SpreadingSequence {
    pub length: usize,
    pub seed: u32,
    pub m: u32,
    chips: Vec<i8>,
}

impl SpreadingSequence {
    /// Build the sequence. `length` must be a Mersenne number (2^m - 1) and
    /// `seed` must be nonzero.
    pub fn new(length: usize, seed: u32) -> Result<Self, ConfigError> {
        if seed == 0 {
            return Err(ConfigError::ZeroSeed);
        }
        if length == 0 || !(length + 1).is_power_of_two() {
            return Err(ConfigError::NonMersenneSequenceLength { length });
        }
        let m = (length + 1).trailing_zeros();
        let primitive_poly = primitive_poly_for_m(m)
            .ok_or(ConfigError::NonMersenneSequenceLength { length })?;
        let gf = GaloisField::new(m, primitive_poly);

        let seed_state = (seed as usize % (gf.n + 1)).max(1) as u16;
        let start_phase = gf.log(seed_state).unwrap_or(0);

        let chips = (0..length as i32)
            .map(|i| {
                let state = gf.exp(start_phase + i);
                bit_to_chip_sign((state & 1) as u8)
            })
            .collect();

        Ok(Self {
            length,
            seed,
            m,
            chips,
        })
    }

    pub fn chips(&self) -> &[i8] {
        &self.chips
    }
}

/// Spread a single bit into its chip sequence: +sequence for bit 0, the
/// sign-flipped sequence for bit 1.
pub fn spread(bit: u8, sequence: &SpreadingSequence) -> Vec<i8> {
    let sign = bit_to_chip_sign(bit);
    sequence.chips().iter().map(|&c| c * sign).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct DespreadResult {
    pub hard_bit: u8,
    pub correlation: f64,
}

/// Correlate a block of received (possibly soft-valued) chips against the
/// reference sequence. Positive correlation decodes to bit 0.
pub fn despread(received_chips: &[f64], sequence: &SpreadingSequence) -> DespreadResult {
    let correlation: f64 = received_chips
        .iter()
        .zip(sequence.chips())
        .map(|(&r, &c)| r * c as f64)
        .sum();
    let hard_bit = if correlation >= 0.0 { 0 } else { 1 };
    DespreadResult {
        hard_bit,
        correlation,
    }
}

/// Soft despread: LLR = 2*correlation/noiseVariance, clamped to +-127.
pub fn despread_soft(received_chips: &[f64], sequence: &SpreadingSequence, noise_variance: f64) -> i8 {
    let correlation = despread(received_chips, sequence).correlation;
    let variance = noise_variance.max(1e-9);
    let llr = (2.0 * correlation / variance).round();
    llr.clamp(-127.0, 127.0) as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_length_must_be_mersenne() {
        assert!(SpreadingSequence::new(30, 5).is_err());
        assert!(SpreadingSequence::new(31, 5).is_ok());
    }

    #[test]
    fn zero_seed_is_rejected() {
        assert!(SpreadingSequence::new(31, 0).is_err());
    }

    #[test]
    fn spread_despread_roundtrip_on_perfect_chips() {
        let seq = SpreadingSequence::new(31, 21).unwrap();
        for bit in [0u8, 1u8] {
            let chips = spread(bit, &seq);
            let as_f64: Vec<f64> = chips.iter().map(|&c| c as f64).collect();
            let result = despread(&as_f64, &seq);
            assert_eq!(result.hard_bit, bit);
            assert_eq!(result.correlation.abs(), seq.length as f64);
        }
    }

    #[test]
    fn different_seeds_produce_low_cross_correlation() {
        let a = SpreadingSequence::new(31, 21).unwrap();
        let b = SpreadingSequence::new(31, 13).unwrap();
        let cross: i64 = a
            .chips()
            .iter()
            .zip(b.chips())
            .map(|(&x, &y)| (x as i64) * (y as i64))
            .sum();
        assert!((cross.unsigned_abs() as usize) < a.length);
    }
}
