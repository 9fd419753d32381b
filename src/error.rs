//! Error types for the MC protocol mock.
//!
//! This module defines the [`McError`] enum and the [`Result`] type alias
//! used throughout the library for error handling.
//!
//! # Error Categories
//!
//! - **End-code errors** - nonzero completion codes returned by the (mock)
//!   PLC, carrying the numeric 16-bit code
//! - **Validation errors** - invalid devices, addresses or point counts
//! - **Communication errors** - timeouts, closed connections and I/O errors
//! - **Protocol errors** - malformed frames and serial-number mismatches
//! - **Ladder errors** - parse failures (with line number) and runtime faults
//!
//! # Example
//!
//! ```no_run
//! use melsec_mock::{ClientConfig, DeviceKind, McError, PlcClient};
//!
//! let mut client = PlcClient::connect(ClientConfig::default())?;
//!
//! match client.read_word(DeviceKind::D, 100) {
//!     Ok(value) => println!("D100 = {}", value),
//!     Err(McError::Timeout) => eprintln!("communication timed out"),
//!     Err(ref e @ McError::EndCode { code }) => {
//!         // The message includes the description automatically, e.g.
//!         // "PLC returned end code 0xC056: device range overflow"
//!         eprintln!("{} (code {:#06X})", e, code);
//!     }
//!     Err(e) => eprintln!("error: {}", e),
//! }
//! # Ok::<(), McError>(())
//! ```

use std::io;
use thiserror::Error;

/// Normal completion.
pub const END_OK: u16 = 0x0000;
/// Start device number out of range (single-point addressing).
pub const END_ADDRESS_OUT_OF_RANGE: u16 = 0xC050;
/// Requested point count out of range.
pub const END_POINT_COUNT: u16 = 0xC051;
/// Start number plus point count exceeds the device range.
pub const END_RANGE_OVERFLOW: u16 = 0xC056;
/// Command or subcommand cannot be executed.
pub const END_INVALID_COMMAND: u16 = 0xC059;
/// Unknown device code or wrong access width for the device.
pub const END_INVALID_DEVICE: u16 = 0xC05C;
/// Request data length inconsistent with the payload.
pub const END_LENGTH_MISMATCH: u16 = 0xC061;

/// Returns a human-readable description for an MC end code.
///
/// # Example
///
/// ```
/// use melsec_mock::end_code_description;
///
/// assert_eq!(end_code_description(0x0000), "normal completion");
/// assert_eq!(end_code_description(0xC056), "device range overflow");
/// ```
pub fn end_code_description(code: u16) -> &'static str {
    match code {
        END_OK => "normal completion",
        0x0050 => "command/subcommand specification error",
        0x0051 => "inter-CPU communication error",
        0x0052 => "CPU is on standby",
        0x0054 => "write disabled",
        0x0055 => "request data length error",
        0x0058 => "request not accepted",
        0x0059 => "command cannot be executed",
        END_ADDRESS_OUT_OF_RANGE => "device number out of range",
        END_POINT_COUNT => "requested point count out of range",
        0xC052 => "requested point count exceeds the allowed maximum",
        0xC053 => "bit device point count error",
        0xC054 => "start device error",
        END_RANGE_OVERFLOW => "device range overflow",
        0xC058 => "device address out of range",
        END_INVALID_COMMAND => "invalid command or subcommand",
        END_INVALID_DEVICE => "invalid device specification",
        END_LENGTH_MISMATCH => "request length mismatch",
        _ => "unknown end code",
    }
}

/// Result type alias for MC operations.
pub type Result<T> = std::result::Result<T, McError>;

/// Errors that can occur while speaking the MC protocol or running ladder
/// logic.
#[derive(Debug, Error)]
pub enum McError {
    /// The peer returned a nonzero end code.
    #[error("PLC returned end code {code:#06X}: {}", end_code_description(*.code))]
    EndCode {
        /// The 16-bit end code from the reply frame.
        code: u16,
    },

    /// Malformed frame: wrong subheader, short read, bad field.
    #[error("protocol error: {reason}")]
    Protocol {
        /// Description of the framing problem.
        reason: String,
    },

    /// Unknown device class, unknown device code, or wrong access width.
    #[error("invalid device: {reason}")]
    InvalidDevice {
        /// Description of the device problem.
        reason: String,
    },

    /// A single device number lies outside its class's address space.
    #[error("address out of range: {device}{address} (limit {limit})")]
    AddressOutOfRange {
        /// Device class symbol.
        device: String,
        /// Offending head number.
        address: u32,
        /// Highest valid head number for the class.
        limit: u32,
    },

    /// Head number plus point count runs past the end of the address space.
    #[error("device range overflow: {device}{address} + {count} points (limit {limit})")]
    RangeOverflow {
        /// Device class symbol.
        device: String,
        /// Requested head number.
        address: u32,
        /// Requested point count.
        count: u16,
        /// Highest valid head number for the class.
        limit: u32,
    },

    /// Point count of zero or above the per-width ceiling.
    #[error("invalid point count {count}: {reason}")]
    PointCount {
        /// Requested point count.
        count: u16,
        /// Why it is rejected.
        reason: String,
    },

    /// Command/subcommand pair the mock does not implement.
    #[error("invalid command {command:#06X}/{sub_command:#06X}")]
    InvalidCommand {
        /// Command word.
        command: u16,
        /// Subcommand word.
        sub_command: u16,
    },

    /// The peer closed the connection mid-exchange.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Communication timeout.
    #[error("communication timeout")]
    Timeout,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// 4E reply carried a serial number differing from the request.
    #[error("serial number mismatch: expected {expected:#06X}, received {received:#06X}")]
    SerialMismatch {
        /// Serial sent in the request.
        expected: u16,
        /// Serial echoed in the reply.
        received: u16,
    },

    /// Ladder source rejected at load time.
    #[error("ladder parse error at line {line}: {message}")]
    LadderParse {
        /// 1-based source line number.
        line: usize,
        /// Description including the offending token.
        message: String,
    },

    /// Ladder fault at scan time (the engine records it and continues).
    #[error("ladder runtime error: {reason}")]
    LadderRuntime {
        /// Description of the fault.
        reason: String,
    },
}

impl McError {
    /// Creates a new `Protocol` error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidDevice` error.
    pub fn invalid_device(reason: impl Into<String>) -> Self {
        Self::InvalidDevice {
            reason: reason.into(),
        }
    }

    /// Creates a new `LadderParse` error.
    pub fn ladder_parse(line: usize, message: impl Into<String>) -> Self {
        Self::LadderParse {
            line,
            message: message.into(),
        }
    }

    /// Maps this error to the end code a reply frame should carry.
    ///
    /// Errors with no protocol representation (I/O, timeouts, ladder faults)
    /// map to the generic "command cannot be executed" code.
    pub fn end_code(&self) -> u16 {
        match self {
            Self::EndCode { code } => *code,
            Self::AddressOutOfRange { .. } => END_ADDRESS_OUT_OF_RANGE,
            Self::RangeOverflow { .. } => END_RANGE_OVERFLOW,
            Self::PointCount { .. } => END_POINT_COUNT,
            Self::InvalidCommand { .. } => END_INVALID_COMMAND,
            Self::InvalidDevice { .. } => END_INVALID_DEVICE,
            Self::Protocol { .. } => END_LENGTH_MISMATCH,
            _ => 0x0059,
        }
    }

    /// Returns the end-code description if this is an `EndCode` error.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mock::McError;
    ///
    /// let err = McError::EndCode { code: 0xC05C };
    /// assert_eq!(err.description(), Some("invalid device specification"));
    /// assert_eq!(McError::Timeout.description(), None);
    /// ```
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::EndCode { code } => Some(end_code_description(*code)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_code_display() {
        let err = McError::EndCode { code: 0xC056 };
        assert_eq!(
            err.to_string(),
            "PLC returned end code 0xC056: device range overflow"
        );
    }

    #[test]
    fn test_end_code_display_unknown() {
        let err = McError::EndCode { code: 0xBEEF };
        assert_eq!(
            err.to_string(),
            "PLC returned end code 0xBEEF: unknown end code"
        );
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(McError::Timeout.to_string(), "communication timeout");
    }

    #[test]
    fn test_serial_mismatch_display() {
        let err = McError::SerialMismatch {
            expected: 0x0001,
            received: 0x0002,
        };
        assert_eq!(
            err.to_string(),
            "serial number mismatch: expected 0x0001, received 0x0002"
        );
    }

    #[test]
    fn test_ladder_parse_display() {
        let err = McError::ladder_parse(12, "unknown mnemonic 'OUTT'");
        assert_eq!(
            err.to_string(),
            "ladder parse error at line 12: unknown mnemonic 'OUTT'"
        );
    }

    #[test]
    fn test_error_to_end_code() {
        let err = McError::PointCount {
            count: 0,
            reason: "must be at least 1".into(),
        };
        assert_eq!(err.end_code(), END_POINT_COUNT);

        let err = McError::invalid_device("unknown device code 0x7F");
        assert_eq!(err.end_code(), END_INVALID_DEVICE);

        let err = McError::RangeOverflow {
            device: "D".into(),
            address: 99999,
            count: 1,
            limit: 12287,
        };
        assert_eq!(err.end_code(), END_RANGE_OVERFLOW);
    }

    #[test]
    fn test_description_method() {
        let err = McError::EndCode { code: 0xC051 };
        assert_eq!(
            err.description(),
            Some("requested point count out of range")
        );
        assert_eq!(McError::ConnectionClosed.description(), None);
    }
}
