//! Wire framing: the 16-byte binary frame header (`spec.md` §6.2) and the
//! textual `OK .../ERROR ...` response lines (`spec.md` §6.1, §7).

use vts_video::{FrameBuffer, VtsError};

pub const DEFAULT_PORT: u16 = 5400;
pub const FRAME_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub sequence: u32,
    pub timestamp_ms: u32,
    pub width: u16,
    pub height: u16,
    pub colorspace: u8,
    pub flags: u8,
}

impl From<&FrameBuffer> for FrameHeader {
    fn from(frame: &FrameBuffer) -> Self {
        FrameHeader {
            sequence: frame.sequence,
            timestamp_ms: frame.timestamp_ms,
            width: frame.width as u16,
            height: frame.height as u16,
            colorspace: frame.colorspace.code(),
            flags: frame.flags,
        }
    }
}

impl FrameHeader {
    /// Big-endian, per `spec.md` §6.2; offsets 14..16 are a reserved
    /// all-zero field.
    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut buf = [0u8; FRAME_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.sequence.to_be_bytes());
        buf[4..8].copy_from_slice(&self.timestamp_ms.to_be_bytes());
        buf[8..10].copy_from_slice(&self.width.to_be_bytes());
        buf[10..12].copy_from_slice(&self.height.to_be_bytes());
        buf[12] = self.colorspace;
        buf[13] = self.flags;
        // buf[14..16] stays zero (reserved).
        buf
    }
}

/// Server-initiated greeting sent immediately on accept, per `spec.md` §4.6.
pub fn hello_line(name: &str, version: &str) -> String {
    format!("OK HELLO {name} VTSource {version}\n")
}

/// `ERROR <code> <message>\n`, per `spec.md` §6.1/§7. Always a single
/// `\n`-terminated line with no binary payload.
pub fn error_line(err: &VtsError) -> String {
    format!("ERROR {} {}\n", err.code(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vts_format::Colorspace;

    #[test]
    fn header_round_trips_fields() {
        let frame = FrameBuffer {
            sequence: 299,
            timestamp_ms: 9966,
            width: 720,
            height: 486,
            colorspace: Colorspace::Rgb24,
            flags: 0b1000,
            payload: Vec::new(),
        };
        let header = FrameHeader::from(&frame);
        let encoded = header.encode();
        assert_eq!(&encoded[0..4], &299u32.to_be_bytes());
        assert_eq!(&encoded[4..8], &9966u32.to_be_bytes());
        assert_eq!(&encoded[8..10], &720u16.to_be_bytes());
        assert_eq!(&encoded[10..12], &486u16.to_be_bytes());
        assert_eq!(encoded[12], 0);
        assert_eq!(encoded[13], 0b1000);
        assert_eq!(&encoded[14..16], &[0, 0]);
    }

    #[test]
    fn error_line_has_code_and_message() {
        let line = error_line(&VtsError::FileNotFound("/nope".to_owned()));
        assert_eq!(line, "ERROR 404 file not found: /nope\n");
    }
}
