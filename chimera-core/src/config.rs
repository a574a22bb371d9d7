//! Modem configuration: the parameters that must match between a transmit
//! and a receive peer, plus the channel-simulation knobs used by the CLI
//! harness and test suite.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Parameters shared between the TX and RX sides of a link. Constructing
/// through [`ModemConfig::new`] validates every field once so the rest of
/// the pipeline can assume they are sane; `Default` also yields a valid
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModemConfig {
    pub sequence_length: usize,
    pub seed: u32,
    pub samples_per_phase: usize,
    pub sample_rate: f64,
    pub carrier_freq: f64,
    pub correlation_threshold: f64,
    pub peak_to_noise_ratio: f64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            sequence_length: 31,
            seed: 21,
            samples_per_phase: 23,
            sample_rate: 44_100.0,
            carrier_freq: 10_000.0,
            correlation_threshold: 0.4,
            peak_to_noise_ratio: 3.5,
        }
    }
}

impl ModemConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence_length: usize,
        seed: u32,
        samples_per_phase: usize,
        sample_rate: f64,
        carrier_freq: f64,
        correlation_threshold: f64,
        peak_to_noise_ratio: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            sequence_length,
            seed,
            samples_per_phase,
            sample_rate,
            carrier_freq,
            correlation_threshold,
            peak_to_noise_ratio,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate {
                rate: self.sample_rate,
            });
        }
        if self.sequence_length == 0 || !(self.sequence_length + 1).is_power_of_two() {
            return Err(ConfigError::NonMersenneSequenceLength {
                length: self.sequence_length,
            });
        }
        if self.seed == 0 {
            return Err(ConfigError::ZeroSeed);
        }
        if self.samples_per_phase == 0 {
            return Err(ConfigError::InvalidFrameLayout {
                reason: "samplesPerPhase must be positive".into(),
            });
        }
        // Require real headroom under Nyquist, not just `< sample_rate/2`.
        let nyquist_margin = self.sample_rate / 2.0 * 0.9;
        if self.carrier_freq <= 0.0 || self.carrier_freq > nyquist_margin {
            return Err(ConfigError::NyquistViolation {
                carrier_hz: self.carrier_freq,
                min_required_hz: self.sample_rate,
                actual_hz: self.carrier_freq,
            });
        }
        Ok(())
    }

    /// Samples occupied by one DSSS-spread data bit.
    pub fn bit_duration_samples(&self) -> usize {
        self.sequence_length * self.samples_per_phase
    }
}

/// Output sample format for the CLI's audio rendering path.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum BitDepth {
    Pcm16,
    Pcm24,
    Pcm32,
    #[default]
    Float32,
}

/// Channel-simulation parameters used by the CLI harness and tests; not
/// consumed by the core modem itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub sample_rate: usize,
    pub bit_depth: BitDepth,
    pub snr_db: f64,
    pub enable_noise: bool,
    pub rng_seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            bit_depth: BitDepth::default(),
            snr_db: 100.0,
            enable_noise: false,
            rng_seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn disable_noise(&mut self) {
        self.enable_noise = false;
        self.snr_db = 100.0;
    }

    pub fn noise_std(&self) -> f64 {
        let snr_linear = 10.0_f64.powf(self.snr_db / 10.0);
        (1.0 / snr_linear).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(ModemConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_mersenne_sequence_length() {
        let mut config = ModemConfig::default();
        config.sequence_length = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_seed() {
        let mut config = ModemConfig::default();
        config.seed = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_carrier_above_nyquist_margin() {
        let mut config = ModemConfig::default();
        config.carrier_freq = config.sample_rate;
        assert!(config.validate().is_err());
    }

    #[test]
    fn noise_std_shrinks_as_snr_grows() {
        let mut low = SimulationConfig::default();
        low.enable_noise = true;
        low.snr_db = 0.0;
        let mut high = SimulationConfig::default();
        high.enable_noise = true;
        high.snr_db = 20.0;
        assert!(high.noise_std() < low.noise_std());
    }
}
