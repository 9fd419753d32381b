//! MC frame structure: series selection, subheaders and header codecs.
//!
//! The MC protocol has two binary frame families. **3E** (Q-series) frames
//! open with the subheader bytes `50 00` (request) / `D0 00` (reply); **4E**
//! (iQ-R series) frames open with `54 00` / `D4 00` and insert a client
//! chosen serial number plus a reserved word before the routing fields.
//!
//! # 3E request layout
//!
//! | Field | Size | Notes |
//! |-------|------|-------|
//! | subheader | 2 | `50 00` |
//! | network number | 1 | |
//! | PC number | 1 | `0xFF` = local station |
//! | dest. module I/O number | 2 | little-endian, `0x03FF` = CPU |
//! | dest. module station | 1 | |
//! | request data length | 2 | counts everything after this field |
//! | monitoring timer | 2 | units of 250 ms |
//! | command / subcommand / payload | ... | |
//!
//! A 4E request carries `serial number (2)` and `fixed 0x0000 (2)` between
//! the subheader and the network number; replies echo the serial unchanged.
//!
//! All multibyte fields after the subheader are little-endian. The
//! subheader itself is the literal byte pair shown above.

use std::io::Read;

use crate::error::{McError, Result};

/// 3E request subheader bytes.
pub const SUBHEADER_3E_REQUEST: [u8; 2] = [0x50, 0x00];
/// 3E response subheader bytes.
pub const SUBHEADER_3E_RESPONSE: [u8; 2] = [0xD0, 0x00];
/// 4E request subheader bytes.
pub const SUBHEADER_4E_REQUEST: [u8; 2] = [0x54, 0x00];
/// 4E response subheader bytes.
pub const SUBHEADER_4E_RESPONSE: [u8; 2] = [0xD4, 0x00];

/// Default monitoring timer field (16 x 250 ms = 4 s).
pub const DEFAULT_MONITORING_TIMER: u16 = 0x0010;

/// PLC series, selecting the frame family and the device address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlcSeries {
    /// Q series: 3E frames.
    #[default]
    QSeries,
    /// iQ-R series: 4E frames.
    IqrSeries,
}

impl PlcSeries {
    /// Fixed header length preceding the variable data, in bytes.
    ///
    /// The same length applies to requests and replies: 9 for 3E, 13
    /// for 4E.
    pub fn header_len(self) -> usize {
        match self {
            PlcSeries::QSeries => 9,
            PlcSeries::IqrSeries => 13,
        }
    }

    /// Byte offset of the request-data-length field within the header.
    pub(crate) fn length_offset(self) -> usize {
        self.header_len() - 2
    }

    /// Default CPU model name reported by the mock for this series.
    pub fn default_model(self) -> &'static str {
        match self {
            PlcSeries::QSeries => "Q03UD",
            PlcSeries::IqrSeries => "R04CPU",
        }
    }
}

impl std::fmt::Display for PlcSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlcSeries::QSeries => write!(f, "Q"),
            PlcSeries::IqrSeries => write!(f, "iQ-R"),
        }
    }
}

impl std::str::FromStr for PlcSeries {
    type Err = McError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "Q" => Ok(PlcSeries::QSeries),
            "IQ-R" | "IQR" | "R" => Ok(PlcSeries::IqrSeries),
            other => Err(McError::protocol(format!("unknown PLC series '{}'", other))),
        }
    }
}

/// Frame direction, selecting the expected subheader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameDirection {
    Request,
    Response,
}

fn subheader(series: PlcSeries, direction: FrameDirection) -> [u8; 2] {
    match (series, direction) {
        (PlcSeries::QSeries, FrameDirection::Request) => SUBHEADER_3E_REQUEST,
        (PlcSeries::QSeries, FrameDirection::Response) => SUBHEADER_3E_RESPONSE,
        (PlcSeries::IqrSeries, FrameDirection::Request) => SUBHEADER_4E_REQUEST,
        (PlcSeries::IqrSeries, FrameDirection::Response) => SUBHEADER_4E_RESPONSE,
    }
}

/// Routing fields common to requests and replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMeta {
    /// Network number (0 = own network).
    pub network_no: u8,
    /// PC number (0xFF = local station).
    pub pc_no: u8,
    /// Request destination module I/O number (0x03FF = control CPU).
    pub dest_module_io: u16,
    /// Request destination module station number.
    pub dest_module_station: u8,
}

impl Default for FrameMeta {
    fn default() -> Self {
        Self {
            network_no: 0,
            pc_no: 0xFF,
            dest_module_io: 0x03FF,
            dest_module_station: 0,
        }
    }
}

/// Decoded fixed-length header of an incoming frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    /// Serial number (always 0 for 3E frames).
    pub serial_no: u16,
    /// Routing fields.
    pub meta: FrameMeta,
    /// Byte count of everything after the length field.
    pub data_length: u16,
}

/// Encodes the fixed header plus `body`, where `body` is everything the
/// data-length field counts (monitoring timer onward for requests, end code
/// onward for replies).
pub(crate) fn encode_frame(
    series: PlcSeries,
    direction: FrameDirection,
    meta: &FrameMeta,
    serial_no: u16,
    body: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(series.header_len() + body.len());
    buf.extend_from_slice(&subheader(series, direction));
    if series == PlcSeries::IqrSeries {
        buf.extend_from_slice(&serial_no.to_le_bytes());
        buf.extend_from_slice(&[0x00, 0x00]);
    }
    buf.push(meta.network_no);
    buf.push(meta.pc_no);
    buf.extend_from_slice(&meta.dest_module_io.to_le_bytes());
    buf.push(meta.dest_module_station);
    buf.extend_from_slice(&(body.len() as u16).to_le_bytes());
    buf.extend_from_slice(body);
    buf
}

/// Decodes the fixed header from a complete frame buffer.
///
/// Validates the subheader for the expected series and direction and that
/// the buffer holds exactly `data_length` bytes past the header.
pub(crate) fn decode_header(
    series: PlcSeries,
    direction: FrameDirection,
    frame: &[u8],
) -> Result<FrameHeader> {
    let header_len = series.header_len();
    if frame.len() < header_len {
        return Err(McError::protocol(format!(
            "frame shorter than the {} byte header ({} bytes)",
            header_len,
            frame.len()
        )));
    }

    let expected = subheader(series, direction);
    if frame[0..2] != expected {
        return Err(McError::protocol(format!(
            "bad subheader {:02X} {:02X} (expected {:02X} {:02X})",
            frame[0], frame[1], expected[0], expected[1]
        )));
    }

    let (serial_no, routing) = match series {
        PlcSeries::QSeries => (0, &frame[2..7]),
        PlcSeries::IqrSeries => {
            (u16::from_le_bytes([frame[2], frame[3]]), &frame[6..11])
        }
    };

    let meta = FrameMeta {
        network_no: routing[0],
        pc_no: routing[1],
        dest_module_io: u16::from_le_bytes([routing[2], routing[3]]),
        dest_module_station: routing[4],
    };

    let data_length =
        u16::from_le_bytes([frame[series.length_offset()], frame[series.length_offset() + 1]]);
    if frame.len() != header_len + data_length as usize {
        return Err(McError::protocol(format!(
            "data length field says {} bytes, frame carries {}",
            data_length,
            frame.len() - header_len
        )));
    }

    Ok(FrameHeader {
        serial_no,
        meta,
        data_length,
    })
}

/// Reads one complete frame from a stream: the fixed header first, then
/// exactly `data_length` further bytes.
///
/// # Errors
///
/// - [`McError::ConnectionClosed`] when the peer closes mid-frame or before
///   a header arrives
/// - [`McError::Timeout`] when the stream's read timeout elapses
/// - [`McError::Protocol`] on a subheader that does not match the
///   configured series and direction
pub(crate) fn read_frame(
    stream: &mut impl Read,
    series: PlcSeries,
    direction: FrameDirection,
) -> Result<Vec<u8>> {
    let header_len = series.header_len();
    let mut frame = vec![0u8; header_len];
    read_exact(stream, &mut frame)?;

    let expected = subheader(series, direction);
    if frame[0..2] != expected {
        return Err(McError::protocol(format!(
            "bad subheader {:02X} {:02X} (expected {:02X} {:02X})",
            frame[0], frame[1], expected[0], expected[1]
        )));
    }

    let off = series.length_offset();
    let data_length = u16::from_le_bytes([frame[off], frame[off + 1]]) as usize;
    frame.resize(header_len + data_length, 0);
    read_exact(stream, &mut frame[header_len..])?;
    Ok(frame)
}

fn read_exact(stream: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    stream.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => McError::ConnectionClosed,
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => McError::Timeout,
        _ => McError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_parse() {
        assert_eq!("Q".parse::<PlcSeries>().unwrap(), PlcSeries::QSeries);
        assert_eq!("iQ-R".parse::<PlcSeries>().unwrap(), PlcSeries::IqrSeries);
        assert_eq!("iqr".parse::<PlcSeries>().unwrap(), PlcSeries::IqrSeries);
        assert!("QnA".parse::<PlcSeries>().is_err());
    }

    #[test]
    fn test_header_lens() {
        assert_eq!(PlcSeries::QSeries.header_len(), 9);
        assert_eq!(PlcSeries::IqrSeries.header_len(), 13);
    }

    #[test]
    fn test_encode_3e_request_header() {
        let body = [0xAA, 0xBB, 0xCC];
        let frame = encode_frame(
            PlcSeries::QSeries,
            FrameDirection::Request,
            &FrameMeta::default(),
            0,
            &body,
        );
        assert_eq!(
            frame,
            vec![0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x03, 0x00, 0xAA, 0xBB, 0xCC]
        );
    }

    #[test]
    fn test_encode_4e_response_header() {
        let frame = encode_frame(
            PlcSeries::IqrSeries,
            FrameDirection::Response,
            &FrameMeta::default(),
            0x1234,
            &[0x00, 0x00],
        );
        assert_eq!(frame[0..2], [0xD4, 0x00]);
        assert_eq!(frame[2..4], [0x34, 0x12]);
        assert_eq!(frame[4..6], [0x00, 0x00]);
        assert_eq!(frame[11..13], [0x02, 0x00]);
    }

    #[test]
    fn test_header_roundtrip_3e() {
        let meta = FrameMeta {
            network_no: 2,
            pc_no: 0x10,
            dest_module_io: 0x03E0,
            dest_module_station: 1,
        };
        let frame = encode_frame(
            PlcSeries::QSeries,
            FrameDirection::Request,
            &meta,
            0,
            &[1, 2, 3, 4],
        );
        let header = decode_header(PlcSeries::QSeries, FrameDirection::Request, &frame).unwrap();
        assert_eq!(header.meta, meta);
        assert_eq!(header.serial_no, 0);
        assert_eq!(header.data_length, 4);
    }

    #[test]
    fn test_header_roundtrip_4e() {
        let frame = encode_frame(
            PlcSeries::IqrSeries,
            FrameDirection::Request,
            &FrameMeta::default(),
            0xBEEF,
            &[9, 9],
        );
        let header = decode_header(PlcSeries::IqrSeries, FrameDirection::Request, &frame).unwrap();
        assert_eq!(header.serial_no, 0xBEEF);
        assert_eq!(header.data_length, 2);
    }

    #[test]
    fn test_decode_wrong_subheader() {
        let frame = encode_frame(
            PlcSeries::QSeries,
            FrameDirection::Request,
            &FrameMeta::default(),
            0,
            &[],
        );
        let err = decode_header(PlcSeries::QSeries, FrameDirection::Response, &frame).unwrap_err();
        assert!(matches!(err, McError::Protocol { .. }));
    }

    #[test]
    fn test_decode_length_mismatch() {
        let mut frame = encode_frame(
            PlcSeries::QSeries,
            FrameDirection::Request,
            &FrameMeta::default(),
            0,
            &[1, 2, 3],
        );
        frame.pop();
        let err = decode_header(PlcSeries::QSeries, FrameDirection::Request, &frame).unwrap_err();
        assert!(matches!(err, McError::Protocol { .. }));
    }

    #[test]
    fn test_read_frame() {
        let frame = encode_frame(
            PlcSeries::QSeries,
            FrameDirection::Request,
            &FrameMeta::default(),
            0,
            &[0x10, 0x00, 0x01, 0x04],
        );
        let mut cursor = std::io::Cursor::new(frame.clone());
        let read = read_frame(&mut cursor, PlcSeries::QSeries, FrameDirection::Request).unwrap();
        assert_eq!(read, frame);
    }

    #[test]
    fn test_read_frame_closed() {
        let mut cursor = std::io::Cursor::new(vec![0x50u8]);
        let err =
            read_frame(&mut cursor, PlcSeries::QSeries, FrameDirection::Request).unwrap_err();
        assert!(matches!(err, McError::ConnectionClosed));
    }
}
