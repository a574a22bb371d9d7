//! Signal quality metrics used by the CLI harness to report link quality.

/// Bit error rate between two equal-or-unequal-length bit sequences,
/// compared over their shared prefix.
pub fn compute_ber(tx_bits: &[u8], rx_bits: &[u8]) -> f32 {
    if tx_bits.is_empty() || rx_bits.is_empty() {
        return 0.0;
    }
    let count = tx_bits.len().min(rx_bits.len());
    let errors = (0..count).filter(|&i| tx_bits[i] != rx_bits[i]).count();
    errors as f32 / count as f32
}

/// Estimate SNR in dB from chip-level correlation magnitude against the
/// ideal noiseless value (the DSSS spreading gain).
pub fn estimate_snr_from_correlation(peak_correlation: f64, sequence_length: usize) -> f32 {
    let ideal = sequence_length as f64;
    if ideal <= 0.0 {
        return 0.0;
    }
    let ratio = (peak_correlation.abs() / ideal).clamp(1e-6, 1.0);
    // A ratio near 1 (correlation close to ideal) maps to high SNR; a ratio
    // near 0 maps to low SNR. This is a coarse heuristic, not a calibrated
    // estimator.
    (20.0 * (ratio / (1.0 - ratio + 1e-6)).log10()) as f32
}
