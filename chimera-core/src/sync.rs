//! Synchronizer: correlation-based acquisition against a known spreading
//! reference, with an adaptive noise floor and earliest-offset tie-breaking.

use crate::carrier;
use crate::dpsk;

#[derive(Debug, Clone, Copy)]
pub struct SyncParams {
    pub sample_rate: f64,
    pub carrier_freq: f64,
    pub samples_per_chip: usize,
    pub correlation_threshold: f64,
    pub peak_to_noise_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncResult {
    pub sample_offset: usize,
    pub peak_correlation: f64,
    pub peak_to_noise_ratio: f64,
    pub accepted: bool,
}

/// Correlate the reference chip pattern against the window starting at
/// `offset` samples into `samples`. Demodulates one extra leading chip
/// interval to seed DPSK phase continuity, so `samples` must hold at least
/// `(reference_chips.len() + 1) * samples_per_chip` samples from `offset`.
pub fn correlate_at_offset(
    samples: &[f32],
    offset: usize,
    reference_chips: &[i8],
    params: &SyncParams,
) -> Option<f64> {
    let needed = (reference_chips.len() + 1) * params.samples_per_chip;
    if offset.checked_add(needed)? > samples.len() {
        return None;
    }
    let window = &samples[offset..offset + needed];
    let symbols = carrier::demodulate_block(
        params.sample_rate,
        params.carrier_freq,
        params.samples_per_chip,
        0,
        window,
    );
    let phases: Vec<f64> = symbols.iter().map(|s| s.phase).collect();
    let soft_chips = dpsk::demodulate_soft(phases[0], &phases[1..], 1.0);

    Some(
        soft_chips
            .iter()
            .zip(reference_chips)
            .map(|(&soft, &chip)| soft * chip as f64)
            .sum(),
    )
}

/// Soft LLR correlation and hard-decision match ratio for a single
/// candidate offset, used by the acquisition state machine's finer
/// accept/reject test (a coarse correlation peak is necessary but not
/// sufficient to declare lock).
#[derive(Debug, Clone, Copy)]
pub struct CandidateScore {
    pub normalized_llr: f64,
    pub hard_ratio: f64,
}

/// Score a candidate sync window already known to start at `window`'s first
/// sample (i.e. `window` begins at the offset under test).
pub fn evaluate_candidate(
    window: &[f32],
    reference_chips: &[i8],
    params: &SyncParams,
) -> Option<CandidateScore> {
    let needed = (reference_chips.len() + 1) * params.samples_per_chip;
    if window.len() < needed {
        return None;
    }
    let symbols = carrier::demodulate_block(
        params.sample_rate,
        params.carrier_freq,
        params.samples_per_chip,
        0,
        &window[..needed],
    );
    let phases: Vec<f64> = symbols.iter().map(|s| s.phase).collect();
    let soft = dpsk::demodulate_soft(phases[0], &phases[1..], 1.0);
    let l = reference_chips.len() as f64;

    let correlation: f64 = soft
        .iter()
        .zip(reference_chips)
        .map(|(&s, &c)| s * c as f64)
        .sum();
    let hard_matches = soft
        .iter()
        .zip(reference_chips)
        .filter(|&(&s, &c)| {
            let hard: i8 = if s >= 0.0 { 1 } else { -1 };
            hard == c
        })
        .count();

    Some(CandidateScore {
        normalized_llr: correlation.abs() / l,
        hard_ratio: hard_matches as f64 / l,
    })
}

/// Scan sample offsets `0..=max_sample_offset` within `samples` for the best
/// correlation peak against `reference_chips`, accepting iff the peak clears
/// both the normalized correlation threshold and the peak-to-noise ratio.
pub fn find_sync_offset(
    samples: &[f32],
    reference_chips: &[i8],
    max_sample_offset: usize,
    params: &SyncParams,
) -> SyncResult {
    let mut best_offset = 0usize;
    let mut best_corr = 0.0f64;
    let mut magnitudes = Vec::new();

    for offset in 0..=max_sample_offset {
        let Some(corr) = correlate_at_offset(samples, offset, reference_chips, params) else {
            break;
        };
        magnitudes.push(corr.abs());
        if corr.abs() > best_corr.abs() {
            best_corr = corr;
            best_offset = offset;
        }
    }

    let l = reference_chips.len() as f64;
    let noise_floor = if magnitudes.len() > 1 {
        (magnitudes.iter().sum::<f64>() / magnitudes.len() as f64).max(1e-6)
    } else {
        1e-6
    };
    let peak_to_noise = best_corr.abs() / noise_floor;
    let accepted =
        best_corr.abs() >= params.correlation_threshold * l && peak_to_noise >= params.peak_to_noise_ratio;

    SyncResult {
        sample_offset: best_offset,
        peak_correlation: best_corr,
        peak_to_noise_ratio: peak_to_noise,
        accepted,
    }
}
