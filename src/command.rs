//! MC command structures.
//!
//! Client-side request builders (one struct per command, validated at
//! construction, serialized with `encode`) and the server-side
//! [`McRequest`] parser that splits an inbound frame into command,
//! subcommand and payload.
//!
//! The reference request "read word D0, 1 point, 3E" serializes as
//! `50 00 00 FF FF 03 00 0C 00 10 00 01 04 00 00 00 00 00 A8 01 00`.

use crate::device::{DeviceKind, DeviceRef};
use crate::error::{McError, Result};
use crate::frame::{self, FrameDirection, FrameMeta, PlcSeries};
use crate::memory::{MAX_BIT_POINTS, MAX_WORD_POINTS};
use crate::utils;

/// Batch read command code.
pub(crate) const CMD_BATCH_READ: u16 = 0x0401;
/// Batch write command code.
pub(crate) const CMD_BATCH_WRITE: u16 = 0x1401;
/// Random read command code.
pub(crate) const CMD_RANDOM_READ: u16 = 0x0403;
/// Random write command code.
pub(crate) const CMD_RANDOM_WRITE: u16 = 0x1402;
/// CPU model name read command code.
pub(crate) const CMD_CPU_MODEL_READ: u16 = 0x0101;
/// Remote RUN command code.
pub(crate) const CMD_REMOTE_RUN: u16 = 0x1001;
/// Remote STOP command code.
pub(crate) const CMD_REMOTE_STOP: u16 = 0x1002;
/// Remote PAUSE command code.
pub(crate) const CMD_REMOTE_PAUSE: u16 = 0x1003;
/// Remote RESET command code.
pub(crate) const CMD_REMOTE_RESET: u16 = 0x1006;

/// Word-unit subcommand.
pub(crate) const SUB_WORD: u16 = 0x0000;
/// Bit-unit subcommand.
pub(crate) const SUB_BIT: u16 = 0x0001;

/// Access unit of a batch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessUnit {
    /// 16-bit word units.
    Word,
    /// Single bit units.
    Bit,
}

impl AccessUnit {
    pub(crate) fn sub_command(self) -> u16 {
        match self {
            AccessUnit::Word => SUB_WORD,
            AccessUnit::Bit => SUB_BIT,
        }
    }

    /// Decodes a subcommand word leniently: even values are word units,
    /// `0x0001`/`0x0003` are bit units (iQ-R clients use the high pair).
    pub(crate) fn from_sub_command(command: u16, sub: u16) -> Result<Self> {
        match sub {
            0x0000 | 0x0002 => Ok(AccessUnit::Word),
            0x0001 | 0x0003 => Ok(AccessUnit::Bit),
            _ => Err(McError::InvalidCommand {
                command,
                sub_command: sub,
            }),
        }
    }

    fn max_points(self) -> u16 {
        match self {
            AccessUnit::Word => MAX_WORD_POINTS,
            AccessUnit::Bit => MAX_BIT_POINTS,
        }
    }
}

fn check_count(count: u16, unit: AccessUnit) -> Result<()> {
    if count == 0 {
        return Err(McError::PointCount {
            count,
            reason: "must be at least 1".into(),
        });
    }
    if count > unit.max_points() {
        return Err(McError::PointCount {
            count,
            reason: format!("exceeds the maximum of {} points", unit.max_points()),
        });
    }
    Ok(())
}

/// Encodes a device address field: 3-byte head + code byte in 3E, 3-byte
/// head + reserved byte + 2-byte code in 4E.
pub(crate) fn encode_device_field(series: PlcSeries, kind: DeviceKind, head: u32) -> Vec<u8> {
    let head_bytes = head.to_le_bytes();
    let mut field = vec![head_bytes[0], head_bytes[1], head_bytes[2]];
    match series {
        PlcSeries::QSeries => field.push(kind.code()),
        PlcSeries::IqrSeries => {
            field.push(0x00);
            field.extend_from_slice(&kind.code_wide().to_le_bytes());
        }
    }
    field
}

/// Byte width of a device address field for the series.
pub(crate) fn device_field_len(series: PlcSeries) -> usize {
    match series {
        PlcSeries::QSeries => 4,
        PlcSeries::IqrSeries => 6,
    }
}

/// Decodes a device address field at the start of `bytes`.
pub(crate) fn decode_device_field(
    series: PlcSeries,
    bytes: &[u8],
) -> Result<(DeviceKind, u32)> {
    let field_len = device_field_len(series);
    if bytes.len() < field_len {
        return Err(McError::protocol(format!(
            "device field truncated: {} of {} bytes",
            bytes.len(),
            field_len
        )));
    }
    let head = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    let kind = match series {
        PlcSeries::QSeries => DeviceKind::from_code(bytes[3]).ok_or_else(|| {
            McError::invalid_device(format!("unknown device code {:#04X}", bytes[3]))
        })?,
        PlcSeries::IqrSeries => {
            let code = u16::from_le_bytes([bytes[4], bytes[5]]);
            DeviceKind::from_code_wide(code).ok_or_else(|| {
                McError::invalid_device(format!("unknown device code {:#06X}", code))
            })?
        }
    };
    Ok((kind, head))
}

fn encode_request_body(command: u16, sub_command: u16, monitoring_timer: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(16);
    body.extend_from_slice(&monitoring_timer.to_le_bytes());
    body.extend_from_slice(&command.to_le_bytes());
    body.extend_from_slice(&sub_command.to_le_bytes());
    body
}

/// Batch read request (command `0x0401`).
#[derive(Debug, Clone)]
pub struct BatchReadRequest {
    kind: DeviceKind,
    head: u32,
    count: u16,
    unit: AccessUnit,
}

impl BatchReadRequest {
    /// Creates a batch read of `count` points.
    ///
    /// # Errors
    ///
    /// Returns an error when the count is 0, exceeds the per-unit ceiling
    /// (960 words / 3584 bits), or the unit does not match the device
    /// width. Word-unit reads of bit devices are allowed (16 bits per
    /// word).
    pub fn new(kind: DeviceKind, head: u32, count: u16, unit: AccessUnit) -> Result<Self> {
        check_count(count, unit)?;
        if unit == AccessUnit::Bit && !kind.is_bit() {
            return Err(McError::invalid_device(format!(
                "{} is a word device, bit access rejected",
                kind
            )));
        }
        Ok(Self {
            kind,
            head,
            count,
            unit,
        })
    }

    /// Serializes the request for transmission.
    pub fn encode(
        &self,
        series: PlcSeries,
        meta: &FrameMeta,
        serial_no: u16,
        monitoring_timer: u16,
    ) -> Vec<u8> {
        let mut body = encode_request_body(CMD_BATCH_READ, self.unit.sub_command(), monitoring_timer);
        body.extend_from_slice(&encode_device_field(series, self.kind, self.head));
        body.extend_from_slice(&self.count.to_le_bytes());
        frame::encode_frame(series, FrameDirection::Request, meta, serial_no, &body)
    }
}

/// Data payload of a batch write.
#[derive(Debug, Clone)]
pub enum WriteData {
    /// Word values, one per point.
    Words(Vec<u16>),
    /// Bit values, one per point.
    Bits(Vec<bool>),
}

impl WriteData {
    fn unit(&self) -> AccessUnit {
        match self {
            WriteData::Words(_) => AccessUnit::Word,
            WriteData::Bits(_) => AccessUnit::Bit,
        }
    }

    fn count(&self) -> usize {
        match self {
            WriteData::Words(words) => words.len(),
            WriteData::Bits(bits) => bits.len(),
        }
    }
}

/// Batch write request (command `0x1401`).
#[derive(Debug, Clone)]
pub struct BatchWriteRequest {
    kind: DeviceKind,
    head: u32,
    data: WriteData,
}

impl BatchWriteRequest {
    /// Creates a batch write; the access unit follows the payload variant.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload is empty, exceeds the per-unit
    /// ceiling, or bit data targets a word device.
    pub fn new(kind: DeviceKind, head: u32, data: WriteData) -> Result<Self> {
        let count = u16::try_from(data.count()).map_err(|_| McError::PointCount {
            count: u16::MAX,
            reason: format!("{} points do not fit a 16-bit count", data.count()),
        })?;
        check_count(count, data.unit())?;
        if data.unit() == AccessUnit::Bit && !kind.is_bit() {
            return Err(McError::invalid_device(format!(
                "{} is a word device, bit access rejected",
                kind
            )));
        }
        Ok(Self { kind, head, data })
    }

    /// Serializes the request for transmission.
    ///
    /// Bit payloads use the packed two-points-per-byte layout; word
    /// payloads are little-endian byte pairs.
    pub fn encode(
        &self,
        series: PlcSeries,
        meta: &FrameMeta,
        serial_no: u16,
        monitoring_timer: u16,
    ) -> Vec<u8> {
        let mut body =
            encode_request_body(CMD_BATCH_WRITE, self.data.unit().sub_command(), monitoring_timer);
        body.extend_from_slice(&encode_device_field(series, self.kind, self.head));
        body.extend_from_slice(&(self.data.count() as u16).to_le_bytes());
        match &self.data {
            WriteData::Words(words) => body.extend_from_slice(&utils::words_to_bytes(words)),
            WriteData::Bits(bits) => body.extend_from_slice(&utils::pack_bits(bits)),
        }
        frame::encode_frame(series, FrameDirection::Request, meta, serial_no, &body)
    }
}

/// Random (scattered) read request (command `0x0403`), word units.
///
/// Reads a list of single words plus a list of double words (two
/// consecutive registers, low word first).
#[derive(Debug, Clone, Default)]
pub struct RandomReadRequest {
    /// Word entries.
    pub words: Vec<DeviceRef>,
    /// Double-word entries.
    pub dwords: Vec<DeviceRef>,
}

impl RandomReadRequest {
    /// Creates a random read.
    ///
    /// # Errors
    ///
    /// Returns an error when both lists are empty or either exceeds 255
    /// entries (the counts are single bytes on the wire).
    pub fn new(words: Vec<DeviceRef>, dwords: Vec<DeviceRef>) -> Result<Self> {
        if words.is_empty() && dwords.is_empty() {
            return Err(McError::PointCount {
                count: 0,
                reason: "must name at least one device".into(),
            });
        }
        if words.len() > 255 || dwords.len() > 255 {
            return Err(McError::PointCount {
                count: words.len().max(dwords.len()) as u16,
                reason: "random access is limited to 255 entries per list".into(),
            });
        }
        Ok(Self { words, dwords })
    }

    /// Serializes the request for transmission.
    pub fn encode(
        &self,
        series: PlcSeries,
        meta: &FrameMeta,
        serial_no: u16,
        monitoring_timer: u16,
    ) -> Vec<u8> {
        let mut body = encode_request_body(CMD_RANDOM_READ, SUB_WORD, monitoring_timer);
        body.push(self.words.len() as u8);
        body.push(self.dwords.len() as u8);
        for entry in self.words.iter().chain(&self.dwords) {
            body.extend_from_slice(&encode_device_field(series, entry.kind, entry.address));
        }
        frame::encode_frame(series, FrameDirection::Request, meta, serial_no, &body)
    }
}

/// Random (scattered) write request (command `0x1402`), word units.
#[derive(Debug, Clone, Default)]
pub struct RandomWriteRequest {
    /// Word entries with their values.
    pub words: Vec<(DeviceRef, u16)>,
    /// Double-word entries with their values (written low word first).
    pub dwords: Vec<(DeviceRef, u32)>,
}

impl RandomWriteRequest {
    /// Creates a random write.
    ///
    /// # Errors
    ///
    /// Same limits as [`RandomReadRequest::new`].
    pub fn new(words: Vec<(DeviceRef, u16)>, dwords: Vec<(DeviceRef, u32)>) -> Result<Self> {
        if words.is_empty() && dwords.is_empty() {
            return Err(McError::PointCount {
                count: 0,
                reason: "must name at least one device".into(),
            });
        }
        if words.len() > 255 || dwords.len() > 255 {
            return Err(McError::PointCount {
                count: words.len().max(dwords.len()) as u16,
                reason: "random access is limited to 255 entries per list".into(),
            });
        }
        Ok(Self { words, dwords })
    }

    /// Serializes the request for transmission.
    pub fn encode(
        &self,
        series: PlcSeries,
        meta: &FrameMeta,
        serial_no: u16,
        monitoring_timer: u16,
    ) -> Vec<u8> {
        let mut body = encode_request_body(CMD_RANDOM_WRITE, SUB_WORD, monitoring_timer);
        body.push(self.words.len() as u8);
        body.push(self.dwords.len() as u8);
        for (entry, value) in &self.words {
            body.extend_from_slice(&encode_device_field(series, entry.kind, entry.address));
            body.extend_from_slice(&value.to_le_bytes());
        }
        for (entry, value) in &self.dwords {
            body.extend_from_slice(&encode_device_field(series, entry.kind, entry.address));
            body.extend_from_slice(&((value & 0xFFFF) as u16).to_le_bytes());
            body.extend_from_slice(&((value >> 16) as u16).to_le_bytes());
        }
        frame::encode_frame(series, FrameDirection::Request, meta, serial_no, &body)
    }
}

/// CPU model name read request (command `0x0101`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuModelReadRequest;

impl CpuModelReadRequest {
    /// Serializes the request for transmission.
    pub fn encode(
        &self,
        series: PlcSeries,
        meta: &FrameMeta,
        serial_no: u16,
        monitoring_timer: u16,
    ) -> Vec<u8> {
        let body = encode_request_body(CMD_CPU_MODEL_READ, 0x0000, monitoring_timer);
        frame::encode_frame(series, FrameDirection::Request, meta, serial_no, &body)
    }
}

/// Remote control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Remote RUN: the engine resumes scanning.
    Run,
    /// Remote STOP: scanning halts.
    Stop,
    /// Remote PAUSE: scanning halts with outputs held.
    Pause,
    /// Remote RESET: memory clears and the CPU lands in STOP.
    Reset,
}

impl RemoteCommand {
    pub(crate) fn command(self) -> u16 {
        match self {
            RemoteCommand::Run => CMD_REMOTE_RUN,
            RemoteCommand::Stop => CMD_REMOTE_STOP,
            RemoteCommand::Pause => CMD_REMOTE_PAUSE,
            RemoteCommand::Reset => CMD_REMOTE_RESET,
        }
    }
}

/// Remote control request (commands `0x1001`/`0x1002`/`0x1003`/`0x1006`).
#[derive(Debug, Clone, Copy)]
pub struct RemoteControlRequest {
    /// Operation to perform.
    pub command: RemoteCommand,
}

impl RemoteControlRequest {
    /// Creates a remote control request.
    pub fn new(command: RemoteCommand) -> Self {
        Self { command }
    }

    /// Serializes the request for transmission.
    ///
    /// RUN carries force-execute + clear-mode parameters, PAUSE and RESET
    /// carry a force flag; the mock server accepts and ignores them.
    pub fn encode(
        &self,
        series: PlcSeries,
        meta: &FrameMeta,
        serial_no: u16,
        monitoring_timer: u16,
    ) -> Vec<u8> {
        let mut body = encode_request_body(self.command.command(), 0x0000, monitoring_timer);
        match self.command {
            RemoteCommand::Run => {
                body.extend_from_slice(&0x0001u16.to_le_bytes());
                body.extend_from_slice(&0x0000_0000u32.to_le_bytes());
            }
            RemoteCommand::Pause | RemoteCommand::Reset => {
                body.extend_from_slice(&0x0001u16.to_le_bytes());
            }
            RemoteCommand::Stop => {}
        }
        frame::encode_frame(series, FrameDirection::Request, meta, serial_no, &body)
    }
}

/// A decoded inbound request, as seen by the server.
#[derive(Debug, Clone)]
pub(crate) struct McRequest {
    /// Serial number echoed in the reply (0 for 3E).
    pub serial_no: u16,
    /// Routing fields echoed in the reply.
    pub meta: FrameMeta,
    /// Command word.
    pub command: u16,
    /// Subcommand word.
    pub sub_command: u16,
    /// Command-specific payload.
    pub payload: Vec<u8>,
}

impl McRequest {
    /// Decodes a complete request frame.
    pub fn decode(series: PlcSeries, raw: &[u8]) -> Result<Self> {
        let header = frame::decode_header(series, FrameDirection::Request, raw)?;
        let body = &raw[series.header_len()..];
        if body.len() < 6 {
            return Err(McError::protocol(format!(
                "request body too short for timer and command words ({} bytes)",
                body.len()
            )));
        }
        let command = u16::from_le_bytes([body[2], body[3]]);
        let sub_command = u16::from_le_bytes([body[4], body[5]]);
        Ok(Self {
            serial_no: header.serial_no,
            meta: header.meta,
            command,
            sub_command,
            payload: body[6..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_read_request_vector() {
        // "read word D0, 1 point, 3E" from the protocol documentation.
        let req = BatchReadRequest::new(DeviceKind::D, 0, 1, AccessUnit::Word).unwrap();
        let bytes = req.encode(PlcSeries::QSeries, &FrameMeta::default(), 0, 0x0010);
        assert_eq!(
            bytes,
            vec![
                0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x0C, 0x00, 0x10, 0x00, 0x01, 0x04,
                0x00, 0x00, 0x00, 0x00, 0x00, 0xA8, 0x01, 0x00
            ]
        );
    }

    #[test]
    fn test_read_request_4e_layout() {
        let req = BatchReadRequest::new(DeviceKind::M, 0x20, 8, AccessUnit::Bit).unwrap();
        let bytes = req.encode(PlcSeries::IqrSeries, &FrameMeta::default(), 0x0042, 0x0010);
        assert_eq!(bytes[0..2], [0x54, 0x00]);
        assert_eq!(bytes[2..4], [0x42, 0x00]); // serial
        assert_eq!(bytes[4..6], [0x00, 0x00]); // fixed
        // device field: head(3) + reserved + wide code(2)
        assert_eq!(bytes[19..25], [0x20, 0x00, 0x00, 0x00, 0x90, 0x00]);
        assert_eq!(bytes[25..27], [0x08, 0x00]); // count
    }

    #[test]
    fn test_read_request_validation() {
        assert!(BatchReadRequest::new(DeviceKind::D, 0, 0, AccessUnit::Word).is_err());
        assert!(BatchReadRequest::new(DeviceKind::D, 0, 961, AccessUnit::Word).is_err());
        assert!(BatchReadRequest::new(DeviceKind::M, 0, 3585, AccessUnit::Bit).is_err());
        assert!(BatchReadRequest::new(DeviceKind::D, 0, 1, AccessUnit::Bit).is_err());
        // word-unit read of a bit device is legal (16 bits per word)
        assert!(BatchReadRequest::new(DeviceKind::M, 0, 1, AccessUnit::Word).is_ok());
    }

    #[test]
    fn test_write_request_words() {
        let req = BatchWriteRequest::new(
            DeviceKind::D,
            100,
            WriteData::Words(vec![0x1234, 0x5678]),
        )
        .unwrap();
        let bytes = req.encode(PlcSeries::QSeries, &FrameMeta::default(), 0, 0x0010);
        // body: timer 2 + cmd 2 + sub 2 + dev 4 + count 2 + data 4 = 16
        assert_eq!(bytes[7..9], [0x10, 0x00]);
        assert_eq!(bytes[11..13], [0x01, 0x14]); // 0x1401
        assert_eq!(bytes[13..15], [0x00, 0x00]); // word subcommand
        assert_eq!(bytes[15..19], [0x64, 0x00, 0x00, 0xA8]);
        assert_eq!(bytes[19..21], [0x02, 0x00]);
        assert_eq!(bytes[21..], [0x34, 0x12, 0x78, 0x56]);
    }

    #[test]
    fn test_write_request_bits_packed() {
        let req = BatchWriteRequest::new(
            DeviceKind::M,
            0,
            WriteData::Bits(vec![true, false, true, true]),
        )
        .unwrap();
        let bytes = req.encode(PlcSeries::QSeries, &FrameMeta::default(), 0, 0x0010);
        assert_eq!(bytes[13..15], [0x01, 0x00]); // bit subcommand
        assert_eq!(bytes[19..21], [0x04, 0x00]); // 4 points
        assert_eq!(bytes[21..], [0x10, 0x11]); // packed pairs
    }

    #[test]
    fn test_device_field_roundtrip() {
        for series in [PlcSeries::QSeries, PlcSeries::IqrSeries] {
            let field = encode_device_field(series, DeviceKind::ZR, 0x012345);
            assert_eq!(field.len(), device_field_len(series));
            let (kind, head) = decode_device_field(series, &field).unwrap();
            assert_eq!(kind, DeviceKind::ZR);
            assert_eq!(head, 0x012345);
        }
    }

    #[test]
    fn test_decode_unknown_device_code() {
        let err = decode_device_field(PlcSeries::QSeries, &[0, 0, 0, 0x7F]).unwrap_err();
        assert!(matches!(err, McError::InvalidDevice { .. }));
    }

    #[test]
    fn test_request_decode() {
        let req = BatchReadRequest::new(DeviceKind::D, 0, 1, AccessUnit::Word).unwrap();
        let bytes = req.encode(PlcSeries::QSeries, &FrameMeta::default(), 0, 0x0010);
        let parsed = McRequest::decode(PlcSeries::QSeries, &bytes).unwrap();
        assert_eq!(parsed.command, CMD_BATCH_READ);
        assert_eq!(parsed.sub_command, SUB_WORD);
        assert_eq!(parsed.payload, vec![0x00, 0x00, 0x00, 0xA8, 0x01, 0x00]);
    }

    #[test]
    fn test_request_decode_4e_serial() {
        let req = CpuModelReadRequest;
        let bytes = req.encode(PlcSeries::IqrSeries, &FrameMeta::default(), 0x0A0B, 0x0010);
        let parsed = McRequest::decode(PlcSeries::IqrSeries, &bytes).unwrap();
        assert_eq!(parsed.serial_no, 0x0A0B);
        assert_eq!(parsed.command, CMD_CPU_MODEL_READ);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_remote_control_payloads() {
        let run = RemoteControlRequest::new(RemoteCommand::Run).encode(
            PlcSeries::QSeries,
            &FrameMeta::default(),
            0,
            0x0010,
        );
        // run carries 6 extra parameter bytes
        let stop = RemoteControlRequest::new(RemoteCommand::Stop).encode(
            PlcSeries::QSeries,
            &FrameMeta::default(),
            0,
            0x0010,
        );
        assert_eq!(run.len(), stop.len() + 6);
        let parsed = McRequest::decode(PlcSeries::QSeries, &run).unwrap();
        assert_eq!(parsed.command, CMD_REMOTE_RUN);
    }

    #[test]
    fn test_access_unit_lenient_decode() {
        assert_eq!(
            AccessUnit::from_sub_command(CMD_BATCH_READ, 0x0000).unwrap(),
            AccessUnit::Word
        );
        assert_eq!(
            AccessUnit::from_sub_command(CMD_BATCH_READ, 0x0002).unwrap(),
            AccessUnit::Word
        );
        assert_eq!(
            AccessUnit::from_sub_command(CMD_BATCH_READ, 0x0001).unwrap(),
            AccessUnit::Bit
        );
        assert_eq!(
            AccessUnit::from_sub_command(CMD_BATCH_READ, 0x0003).unwrap(),
            AccessUnit::Bit
        );
        assert!(AccessUnit::from_sub_command(CMD_BATCH_READ, 0x0004).is_err());
    }

    #[test]
    fn test_random_read_encode() {
        let req = RandomReadRequest::new(
            vec![DeviceRef::new(DeviceKind::D, 0), DeviceRef::new(DeviceKind::W, 0x10)],
            vec![DeviceRef::new(DeviceKind::D, 100)],
        )
        .unwrap();
        let bytes = req.encode(PlcSeries::QSeries, &FrameMeta::default(), 0, 0x0010);
        let parsed = McRequest::decode(PlcSeries::QSeries, &bytes).unwrap();
        assert_eq!(parsed.command, CMD_RANDOM_READ);
        assert_eq!(parsed.payload[0], 2);
        assert_eq!(parsed.payload[1], 1);
        assert_eq!(parsed.payload.len(), 2 + 3 * 4);
    }

    #[test]
    fn test_random_empty_rejected() {
        assert!(RandomReadRequest::new(vec![], vec![]).is_err());
        assert!(RandomWriteRequest::new(vec![], vec![]).is_err());
    }
}
