//! Differential phase-shift keying over the chip stream.
//!
//! Continuity across call boundaries is carried explicitly via a
//! `prev_phase` argument rather than by padding the output, so a streaming
//! caller can demodulate one chip at a time without losing an edge between
//! chunks.

use std::f64::consts::{PI, TAU};

/// Wrap `x` into (-pi, pi].
pub fn wrap_to_pi(x: f64) -> f64 {
    let mut wrapped = (x + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Differentially encode a chip stream into phases: a -1 chip advances phase
/// by pi, a +1 chip leaves it unchanged. Output length equals input length.
pub fn modulate(initial_phase: f64, chips: &[i8]) -> Vec<f64> {
    let mut phase = initial_phase;
    chips
        .iter()
        .map(|&c| {
            if c == -1 {
                phase += PI;
            }
            phase
        })
        .collect()
}

/// Soft-demodulate a phase stream into per-chip LLR-like values:
/// `scale * cos(wrap(phi[i] - phi[i-1]))`, using `prev_phase` as phi[-1].
/// Positive output means chip 0 (no phase jump); negative means chip 1.
pub fn demodulate_soft(prev_phase: f64, phases: &[f64], es_n0_linear: f64) -> Vec<f64> {
    let scale = 2.0 * es_n0_linear;
    let mut prev = prev_phase;
    phases
        .iter()
        .map(|&phi| {
            let delta = wrap_to_pi(phi - prev);
            prev = phi;
            scale * delta.cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_keeps_values_in_range() {
        for x in [-10.0, -PI - 0.01, -0.5, 0.0, 0.5, PI - 0.01, 3.0 * PI, 10.0] {
            let w = wrap_to_pi(x);
            assert!(w > -PI - 1e-9 && w <= PI + 1e-9, "wrap({x}) = {w} out of range");
        }
    }

    #[test]
    fn modulate_demodulate_roundtrip_recovers_chips() {
        let chips = [1i8, -1, -1, 1, -1];
        let phases = modulate(0.0, &chips);
        let soft = demodulate_soft(0.0, &phases, 1.0);
        let recovered: Vec<i8> = soft.iter().map(|&v| if v >= 0.0 { 1 } else { -1 }).collect();
        assert_eq!(recovered, chips);
    }

    #[test]
    fn phase_continuity_carries_across_call_boundaries() {
        let chips = [1i8, -1, 1, -1];
        let full_phases = modulate(0.0, &chips);

        let (first_half, second_half) = full_phases.split_at(2);
        let soft_first = demodulate_soft(0.0, first_half, 1.0);
        let soft_second = demodulate_soft(*first_half.last().unwrap(), second_half, 1.0);

        let mut recovered: Vec<i8> = soft_first
            .iter()
            .chain(soft_second.iter())
            .map(|&v| if v >= 0.0 { 1 } else { -1 })
            .collect();
        recovered.truncate(chips.len());
        assert_eq!(recovered, chips);
    }
}
