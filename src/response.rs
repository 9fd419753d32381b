//! MC response construction and parsing.
//!
//! A reply frame mirrors the request's routing fields and carries a 16-bit
//! end code followed by the result payload. On failure a 3E reply stops at
//! the end code; a 4E reply appends two abort-information bytes (zero in
//! this mock) before ending.
//!
//! # Example
//!
//! ```
//! use melsec_mock::{FrameMeta, McResponse, PlcSeries};
//!
//! let reply = McResponse::success(vec![0xD2, 0x04]);
//! let bytes = reply.encode(PlcSeries::QSeries, &FrameMeta::default(), 0);
//!
//! let parsed = McResponse::decode(PlcSeries::QSeries, &bytes).unwrap();
//! parsed.check_end_code().unwrap();
//! assert_eq!(parsed.to_words(), vec![0x04D2]);
//! ```

use crate::error::{McError, Result, END_OK};
use crate::frame::{self, FrameDirection, FrameMeta, PlcSeries};
use crate::utils;

/// A reply frame: end code plus result payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McResponse {
    /// End code (`0x0000` = success).
    pub end_code: u16,
    /// Result payload (empty on failure and for ack-only commands).
    pub data: Vec<u8>,
    /// Serial number echoed from the request (0 for 3E).
    pub serial_no: u16,
}

impl McResponse {
    /// Creates a success reply carrying `data`.
    pub fn success(data: Vec<u8>) -> Self {
        Self {
            end_code: END_OK,
            data,
            serial_no: 0,
        }
    }

    /// Creates a failure reply with the given end code.
    pub fn failure(end_code: u16) -> Self {
        Self {
            end_code,
            data: Vec::new(),
            serial_no: 0,
        }
    }

    /// Returns whether the reply reports success.
    pub fn is_success(&self) -> bool {
        self.end_code == END_OK
    }

    /// Serializes the reply, echoing the request's routing fields and
    /// serial number.
    pub fn encode(&self, series: PlcSeries, meta: &FrameMeta, serial_no: u16) -> Vec<u8> {
        let mut tail = Vec::with_capacity(4 + self.data.len());
        tail.extend_from_slice(&self.end_code.to_le_bytes());
        if series == PlcSeries::IqrSeries && self.end_code != END_OK {
            // abort error info, not populated by the mock
            tail.extend_from_slice(&[0x00, 0x00]);
        }
        tail.extend_from_slice(&self.data);
        frame::encode_frame(series, FrameDirection::Response, meta, serial_no, &tail)
    }

    /// Parses a complete reply frame.
    pub fn decode(series: PlcSeries, raw: &[u8]) -> Result<Self> {
        let header = frame::decode_header(series, FrameDirection::Response, raw)?;
        let tail = &raw[series.header_len()..];
        if tail.len() < 2 {
            return Err(McError::protocol(
                "response shorter than the end code".to_string(),
            ));
        }
        let end_code = u16::from_le_bytes([tail[0], tail[1]]);
        let mut data = &tail[2..];
        if series == PlcSeries::IqrSeries && end_code != END_OK && data.len() >= 2 {
            data = &data[2..];
        }
        Ok(Self {
            end_code,
            data: data.to_vec(),
            serial_no: header.serial_no,
        })
    }

    /// Converts a nonzero end code into a typed error.
    pub fn check_end_code(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(McError::EndCode {
                code: self.end_code,
            })
        }
    }

    /// Validates the echoed 4E serial number.
    pub fn check_serial(&self, expected: u16) -> Result<()> {
        if self.serial_no == expected {
            Ok(())
        } else {
            Err(McError::SerialMismatch {
                expected,
                received: self.serial_no,
            })
        }
    }

    /// Interprets the payload as little-endian words.
    pub fn to_words(&self) -> Vec<u16> {
        utils::bytes_to_words(&self.data)
    }

    /// Interprets the payload as `count` packed bits.
    pub fn to_bits(&self, count: usize) -> Vec<bool> {
        utils::unpack_bits(&self.data, count)
    }

    /// Interprets the payload as a NUL-padded ASCII string.
    pub fn to_text(&self) -> String {
        self.data
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_roundtrip_3e() {
        let reply = McResponse::success(vec![0x34, 0x12]);
        let bytes = reply.encode(PlcSeries::QSeries, &FrameMeta::default(), 0);
        assert_eq!(bytes[0..2], [0xD0, 0x00]);
        // data length counts end code + payload
        assert_eq!(bytes[7..9], [0x04, 0x00]);
        assert_eq!(bytes[9..11], [0x00, 0x00]);

        let parsed = McResponse::decode(PlcSeries::QSeries, &bytes).unwrap();
        assert!(parsed.is_success());
        assert_eq!(parsed.to_words(), vec![0x1234]);
    }

    #[test]
    fn test_success_roundtrip_4e() {
        let reply = McResponse::success(vec![0x01, 0x00]);
        let bytes = reply.encode(PlcSeries::IqrSeries, &FrameMeta::default(), 0x7777);
        assert_eq!(bytes[0..2], [0xD4, 0x00]);
        assert_eq!(bytes[2..4], [0x77, 0x77]);

        let parsed = McResponse::decode(PlcSeries::IqrSeries, &bytes).unwrap();
        assert_eq!(parsed.serial_no, 0x7777);
        parsed.check_serial(0x7777).unwrap();
        assert!(parsed.check_serial(0x7778).is_err());
    }

    #[test]
    fn test_failure_3e_stops_at_end_code() {
        let reply = McResponse::failure(0xC056);
        let bytes = reply.encode(PlcSeries::QSeries, &FrameMeta::default(), 0);
        assert_eq!(bytes.len(), 11);

        let parsed = McResponse::decode(PlcSeries::QSeries, &bytes).unwrap();
        assert_eq!(parsed.end_code, 0xC056);
        assert!(parsed.data.is_empty());
        assert!(matches!(
            parsed.check_end_code(),
            Err(McError::EndCode { code: 0xC056 })
        ));
    }

    #[test]
    fn test_failure_4e_carries_abort_info() {
        let reply = McResponse::failure(0xC05C);
        let bytes = reply.encode(PlcSeries::IqrSeries, &FrameMeta::default(), 1);
        // header 13 + end code 2 + abort info 2
        assert_eq!(bytes.len(), 17);

        let parsed = McResponse::decode(PlcSeries::IqrSeries, &bytes).unwrap();
        assert_eq!(parsed.end_code, 0xC05C);
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn test_to_bits() {
        let reply = McResponse::success(vec![0x10, 0x11]);
        assert_eq!(reply.to_bits(4), vec![true, false, true, true]);
    }

    #[test]
    fn test_to_text_trims_padding() {
        let mut data = b"Q03UD".to_vec();
        data.resize(16, 0);
        let reply = McResponse::success(data);
        assert_eq!(reply.to_text(), "Q03UD");
    }

    #[test]
    fn test_decode_truncated() {
        let reply = McResponse::success(vec![]);
        let mut bytes = reply.encode(PlcSeries::QSeries, &FrameMeta::default(), 0);
        bytes.truncate(10);
        assert!(McResponse::decode(PlcSeries::QSeries, &bytes).is_err());
    }
}
