//! End-to-end transmit/receive scenarios over the DSSS+DPSK link.

use chimera_core::config::ModemConfig;
use chimera_core::framer::{FrameStatus, SYNC_VALIDATION_BITS};
use chimera_core::{StreamingDemodulator, Transmitter};

fn test_config() -> ModemConfig {
    ModemConfig {
        sequence_length: 15,
        seed: 9,
        samples_per_phase: 12,
        sample_rate: 48_000.0,
        carrier_freq: 9_000.0,
        correlation_threshold: 0.3,
        peak_to_noise_ratio: 2.0,
    }
}

fn trailing_silence(config: ModemConfig) -> Vec<f32> {
    vec![0.0f32; config.bit_duration_samples() * 4]
}

#[test]
fn clean_channel_single_frame_round_trip() {
    let config = test_config();
    let tx = Transmitter::new(config).unwrap();
    let audio = tx.build_frame(b"hi", 1, 0, 0).unwrap();

    let mut rx = StreamingDemodulator::new(config).unwrap();
    rx.add_samples(&audio);
    rx.add_samples(&trailing_silence(config));

    let mut frames = Vec::new();
    for _ in 0..20 {
        frames.extend(rx.get_available_frames());
        if !frames.is_empty() {
            break;
        }
    }

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].status, FrameStatus::Success);
    assert_eq!(&frames[0].user_data[..2], b"hi");
}

#[test]
fn leading_silence_before_the_frame_does_not_prevent_acquisition() {
    let config = test_config();
    let tx = Transmitter::new(config).unwrap();
    let audio = tx.build_frame(b"ab", 2, 0, 0).unwrap();

    let mut rx = StreamingDemodulator::new(config).unwrap();
    rx.add_samples(&vec![0.0f32; config.bit_duration_samples() * 3]);
    rx.add_samples(&audio);
    rx.add_samples(&trailing_silence(config));

    let mut frames = Vec::new();
    for _ in 0..30 {
        frames.extend(rx.get_available_frames());
        if !frames.is_empty() {
            break;
        }
    }

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].header.sequence_number, 2);
}

#[test]
fn each_frame_requires_a_fresh_acquisition() {
    let config = test_config();
    let tx = Transmitter::new(config).unwrap();
    let first = tx.build_frame(b"a", 1, 0, 0).unwrap();
    let second = tx.build_frame(b"b", 2, 0, 0).unwrap();

    let mut rx = StreamingDemodulator::new(config).unwrap();
    rx.add_samples(&first);
    rx.add_samples(&vec![0.0f32; config.bit_duration_samples() * 2]);
    rx.add_samples(&second);
    rx.add_samples(&trailing_silence(config));

    let mut frames = Vec::new();
    for _ in 0..60 {
        frames.extend(rx.get_available_frames());
        if frames.len() >= 2 {
            break;
        }
    }

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].header.sequence_number, 1);
    assert_eq!(frames[1].header.sequence_number, 2);
}

#[test]
fn pure_noise_never_locks() {
    let config = test_config();
    let mut rx = StreamingDemodulator::new(config).unwrap();
    let noise: Vec<f32> = (0..config.bit_duration_samples() * 20)
        .map(|i| ((i * 2654435761u32.wrapping_add(1)) as f32 / u32::MAX as f32) * 0.2 - 0.1)
        .collect();
    rx.add_samples(&noise);

    for _ in 0..30 {
        let frames = rx.get_available_frames();
        assert!(frames.is_empty());
    }
    assert!(!rx.get_sync_state().locked);
}

#[test]
fn sustained_weak_bits_mid_frame_forces_unlock() {
    let config = test_config();
    let tx = Transmitter::new(config).unwrap();
    let audio = tx.build_frame(b"hi", 1, 0, 0).unwrap();

    // Keep only the preamble+sync portion, enough for acquisition to lock,
    // then replace every header/data bit after it with broadband noise so
    // every bit demodulated inside WAITING_HEADER is weak.
    let bit_len = config.bit_duration_samples();
    let lock_samples = (bit_len * SYNC_VALIDATION_BITS).min(audio.len());
    let mut signal = audio[..lock_samples].to_vec();
    let noise: Vec<f32> = (0..bit_len * 12)
        .map(|i| ((i.wrapping_mul(2654435761).wrapping_add(7)) as f32 / u32::MAX as f32) * 0.2 - 0.1)
        .collect();
    signal.extend(noise);

    let mut rx = StreamingDemodulator::new(config).unwrap();
    rx.add_samples(&signal);

    let mut saw_locked = false;
    for _ in 0..30 {
        rx.get_available_frames();
        if rx.get_sync_state().locked {
            saw_locked = true;
        }
    }

    assert!(saw_locked, "expected acquisition to lock before the noise run");
    assert!(
        !rx.get_sync_state().locked,
        "a sustained run of weak bits must force a return to UNLOCKED"
    );
}

#[test]
fn oversized_payload_is_rejected_before_transmission() {
    let config = test_config();
    let tx = Transmitter::new(config).unwrap();
    let too_big = vec![0xAAu8; 64];
    assert!(tx.build_frame(&too_big, 0, 0, 0).is_err());
}
