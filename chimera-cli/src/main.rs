mod config;
mod frame_decoder;
mod logging;
mod telemetry;

use clap::Parser;
use color_eyre::eyre::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

use chimera_core::diagnostics::metrics::{compute_ber, estimate_snr_from_correlation};
use chimera_core::diagnostics::{FrameDiagnostics, LinkReport};
use chimera_core::framer::FrameStatus;
use chimera_core::{StreamingDemodulator, Transmitter};
use config::CliConfig;
use frame_decoder::decode_event;
use logging::{LogEvent, StatisticsEvent};
use telemetry::TelemetryAggregator;

#[derive(Parser, Debug)]
#[command(author, version, about = "Chimera acoustic modem simulator", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose diagnostic output
    #[arg(short, long)]
    verbose: bool,

    /// Output audio to WAV file (overrides config)
    #[arg(short = 'w', long)]
    wav_output: Option<PathBuf>,

    /// Message to encode (overrides config message)
    #[arg(short = 'm', long)]
    message: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };

    if let Some(wav_path) = args.wav_output {
        config.terminal.wav_output = Some(wav_path);
    }
    if let Some(message) = args.message {
        config.simulation.plaintext_source = message;
    }

    let mut logger = logging::StructuredLogger::new(config.terminal.logging.clone())?;
    logger.log(LogEvent::Info {
        message: format!(
            "Chimera CLI starting with message: \"{}\"",
            config.simulation.plaintext_source
        ),
    })?;

    let tx = Transmitter::new(config.modem)?;
    let user_data = config.simulation.plaintext_source.as_bytes().to_vec();
    let frame_bytes = tx.build_frame(&user_data, 0, 0, 0)?;

    logger.log(LogEvent::Info {
        message: format!(
            "Encoded {} bytes into {} audio samples",
            user_data.len(),
            frame_bytes.len()
        ),
    })?;

    let audio = if config.simulation.channel.enable_noise {
        let mut rng = match config.simulation.channel.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        chimera_core::channel::apply_audio_noise(
            &frame_bytes,
            config.simulation.channel.noise_std(),
            &mut rng,
        )
    } else {
        frame_bytes
    };

    if let Some(wav_path) = &config.terminal.wav_output {
        logger.log(LogEvent::Info {
            message: format!("Writing audio to {}", wav_path.display()),
        })?;

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: config.simulation.channel.sample_rate as u32,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut writer = hound::WavWriter::create(wav_path, spec)?;
        for &sample in &audio {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;

        logger.log(LogEvent::Info {
            message: format!("Wrote {} samples to {}", audio.len(), wav_path.display()),
        })?;

        return Ok(());
    }

    logger.log(LogEvent::Info {
        message: "Running audio through the streaming demodulator".to_string(),
    })?;

    let mut rx = StreamingDemodulator::new_with_log_config(
        config.modem,
        config.terminal.logging.to_core_log_config(),
    )?;
    rx.add_samples(&audio);
    rx.add_samples(&vec![0.0f32; config.modem.bit_duration_samples() * 4]);

    let mut telemetry = TelemetryAggregator::new(config.terminal.telemetry_interval_secs);
    let mut decoded_frames = Vec::new();
    let mut frame_diagnostics = Vec::new();
    let mut recovered_message = String::new();
    let mut frames_dropped = 0usize;

    for _ in 0..64 {
        let frames = rx.get_available_frames();
        for frame in frames {
            let sync = rx.get_sync_state();
            let ber = compute_ber(&user_data, &frame.user_data);
            telemetry.update(ber as f64, sync.correlation, decoded_frames.len() + 1, sync.locked);

            if let Some(event) = telemetry.sample() {
                logger.log(LogEvent::Telemetry(event))?;
            }

            if frame.status == FrameStatus::Dropped {
                frames_dropped += 1;
            } else {
                recovered_message.push_str(&String::from_utf8_lossy(&frame.user_data));
            }

            frame_diagnostics.push(FrameDiagnostics {
                sync_correlation: sync.correlation,
                estimated_snr_db: estimate_snr_from_correlation(
                    sync.correlation,
                    config.modem.sequence_length,
                ),
                ldpc_iterations: frame.ldpc_iterations,
                ldpc_converged: frame.ldpc_converged,
                bch_corrected: frame.status == FrameStatus::BchCorrected,
            });

            let frame_event = decode_event(decoded_frames.len(), &frame);
            logger.log(LogEvent::FrameDecode(frame_event))?;
            decoded_frames.push(frame);
        }
        if !decoded_frames.is_empty() {
            break;
        }
    }

    let snr_db = estimate_snr_from_correlation(
        rx.get_sync_state().correlation,
        config.modem.sequence_length,
    );
    let overall_ber = compute_ber(
        &user_data,
        decoded_frames
            .first()
            .map(|f| f.user_data.as_slice())
            .unwrap_or(&[]),
    );

    let link_report = LinkReport {
        frames_decoded: decoded_frames.len(),
        frames_dropped,
        ber: overall_ber,
        recovered_message: recovered_message.clone(),
    };

    let (ber_stats, correlation_stats) = telemetry.compute_statistics();
    let stats_event = StatisticsEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        ber: ber_stats,
        sync_correlation: correlation_stats,
        total_frames: telemetry.total_frames(),
    };
    logger.log(LogEvent::Statistics(stats_event))?;

    if args.verbose {
        logger.log(LogEvent::Info {
            message: format!(
                "Decoded {} frame(s), overall BER {:.4}, estimated SNR {:.1} dB",
                decoded_frames.len(),
                overall_ber,
                snr_db
            ),
        })?;
        for entry in rx.log_entries() {
            logger.log(LogEvent::Info {
                message: format!("[{}] {}: {}", entry.level, entry.subsystem, entry.message),
            })?;
        }
        for (index, diag) in frame_diagnostics.iter().enumerate() {
            logger.log(LogEvent::Info {
                message: format!(
                    "frame {} diagnostics: correlation {:.3}, snr {:.1} dB, ldpc converged={} in {} iterations, bch_corrected={}",
                    index,
                    diag.sync_correlation,
                    diag.estimated_snr_db,
                    diag.ldpc_converged,
                    diag.ldpc_iterations,
                    diag.bch_corrected
                ),
            })?;
        }
        logger.log(LogEvent::Info {
            message: format!(
                "link report: {} decoded, {} dropped, ber {:.4}",
                link_report.frames_decoded, link_report.frames_dropped, link_report.ber
            ),
        })?;
    }

    logger.log(LogEvent::Info {
        message: format!("Recovered message: {}", recovered_message),
    })?;

    Ok(())
}
