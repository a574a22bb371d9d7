//! Hex-dump and human-readable rendering of a decoded frame for the log.

use crate::logging::{DecodedFrame, FrameDecodeEvent, FrameHexDump};
use chimera_core::framer::FrameStatus;
use chimera_core::DecodedFrame as CoreDecodedFrame;
use chrono::Utc;

fn status_name(status: FrameStatus) -> &'static str {
    match status {
        FrameStatus::Success => "SUCCESS",
        FrameStatus::BchCorrected => "BCH_CORRECTED",
        FrameStatus::Dropped => "DROPPED",
    }
}

/// Render one decoded frame into a structured log event.
pub fn decode_event(frame_index: usize, frame: &CoreDecodedFrame) -> FrameDecodeEvent {
    let header_byte = (frame.header.sequence_number << 5)
        | (frame.header.frame_type << 3)
        | (frame.header.ldpc_n_type << 1);

    let payload_hex = frame
        .user_data
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join("");
    let payload_preview = bytes_to_ascii_preview(&frame.user_data, 32);

    let hex_dump = FrameHexDump {
        header_byte: format!("{:02X}", header_byte),
        payload: format_hex_field(&payload_hex),
    };

    let decoded = DecodedFrame {
        sequence_number: frame.header.sequence_number,
        frame_type: frame.header.frame_type,
        status: status_name(frame.status).to_string(),
        ldpc_converged: frame.ldpc_converged,
        ldpc_iterations: frame.ldpc_iterations,
        payload_preview,
    };

    FrameDecodeEvent {
        timestamp: Utc::now(),
        frame_index,
        hex_dump,
        decoded,
    }
}

fn bytes_to_ascii_preview(bytes: &[u8], max_chars: usize) -> String {
    bytes
        .iter()
        .take(max_chars)
        .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
        .collect()
}

fn format_hex_field(hex: &str) -> String {
    hex.chars()
        .collect::<Vec<_>>()
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_core::framer::FrameHeader;

    #[test]
    fn decode_event_renders_ascii_preview() {
        let frame = CoreDecodedFrame {
            header: FrameHeader {
                sequence_number: 3,
                frame_type: 1,
                ldpc_n_type: 0,
            },
            user_data: b"hi".to_vec(),
            status: FrameStatus::Success,
            ldpc_converged: true,
            ldpc_iterations: 2,
        };
        let event = decode_event(0, &frame);
        assert_eq!(event.decoded.payload_preview, "hi");
        assert_eq!(event.decoded.status, "SUCCESS");
    }

    #[test]
    fn format_hex_field_groups_by_four() {
        assert_eq!(format_hex_field("DEADBEEF"), "DEAD BEEF");
    }
}
