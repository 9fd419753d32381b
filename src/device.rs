//! Device class definitions for the MC protocol.
//!
//! This module defines the [`DeviceKind`] enum representing the device
//! classes of a MELSEC CPU, and [`DeviceRef`], a parsed `class + head
//! number` reference such as `D100` or `X1F`.
//!
//! # Device Classes Overview
//!
//! | Class | Description | Width | Radix |
//! |-------|-------------|:-----:|:-----:|
//! | `M` `L` `F` `V` `S` | internal / latch / annunciator / edge / step relays | bit | dec |
//! | `X` `Y` `B` | inputs, outputs, link relays | bit | hex |
//! | `SM` `SB` | special relays | bit | dec |
//! | `TC` `TS` `CC` `CS` | timer / counter contacts and coils | bit | dec |
//! | `D` `R` `ZR` `Z` | data / file / index registers | word | dec |
//! | `W` `SW` | link registers | word | hex (`W`) / dec |
//! | `SD` | special registers | word | dec |
//! | `TN` `CN` | timer / counter current values | word | dec |
//!
//! # Example
//!
//! ```
//! use melsec_mock::{DeviceKind, DeviceRef};
//!
//! assert!(DeviceKind::M.is_bit());
//! assert!(!DeviceKind::D.is_bit());
//! assert_eq!(DeviceKind::D.code(), 0xA8);
//!
//! // X and Y addresses are hexadecimal
//! let r: DeviceRef = "X1F".parse().unwrap();
//! assert_eq!(r.kind, DeviceKind::X);
//! assert_eq!(r.address, 0x1F);
//! ```

use crate::error::{McError, Result};

/// Device classes of a MELSEC CPU.
///
/// Each class has a fixed access width (bit or 16-bit word), a 3E-frame
/// device code byte and a textual address radix. The 4E device code is the
/// same numeric value zero-extended to two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Internal relay (bit).
    M,
    /// Latch relay (bit).
    L,
    /// Annunciator (bit).
    F,
    /// Edge relay (bit).
    V,
    /// Link relay (bit, hex-addressed).
    B,
    /// Input (bit, hex-addressed).
    X,
    /// Output (bit, hex-addressed).
    Y,
    /// Step relay (bit).
    S,
    /// Timer contact (bit).
    TC,
    /// Timer coil (bit).
    TS,
    /// Counter contact (bit).
    CC,
    /// Counter coil (bit).
    CS,
    /// Link special relay (bit).
    SB,
    /// Special relay (bit).
    SM,
    /// Data register (word).
    D,
    /// Link register (word, hex-addressed).
    W,
    /// File register (word).
    R,
    /// Extended file register (word).
    ZR,
    /// Timer current value (word).
    TN,
    /// Counter current value (word).
    CN,
    /// Special register (word).
    SD,
    /// Link special register (word).
    SW,
    /// Index register (word).
    Z,
}

/// All device classes, in device-code table order.
pub const ALL_DEVICE_KINDS: [DeviceKind; 23] = [
    DeviceKind::M,
    DeviceKind::L,
    DeviceKind::F,
    DeviceKind::V,
    DeviceKind::B,
    DeviceKind::X,
    DeviceKind::Y,
    DeviceKind::S,
    DeviceKind::TC,
    DeviceKind::TS,
    DeviceKind::CC,
    DeviceKind::CS,
    DeviceKind::SB,
    DeviceKind::SM,
    DeviceKind::D,
    DeviceKind::W,
    DeviceKind::R,
    DeviceKind::ZR,
    DeviceKind::TN,
    DeviceKind::CN,
    DeviceKind::SD,
    DeviceKind::SW,
    DeviceKind::Z,
];

impl DeviceKind {
    /// Returns the 3E-frame device code for this class.
    pub fn code(self) -> u8 {
        match self {
            DeviceKind::M => 0x90,
            DeviceKind::SM => 0x91,
            DeviceKind::L => 0x92,
            DeviceKind::F => 0x93,
            DeviceKind::V => 0x94,
            DeviceKind::S => 0x98,
            DeviceKind::X => 0x9C,
            DeviceKind::Y => 0x9D,
            DeviceKind::B => 0xA0,
            DeviceKind::SB => 0xA1,
            DeviceKind::D => 0xA8,
            DeviceKind::SD => 0xA9,
            DeviceKind::R => 0xAF,
            DeviceKind::ZR => 0xB0,
            DeviceKind::W => 0xB4,
            DeviceKind::SW => 0xB5,
            DeviceKind::TS => 0xC0,
            DeviceKind::TC => 0xC1,
            DeviceKind::TN => 0xC2,
            DeviceKind::CS => 0xC3,
            DeviceKind::CC => 0xC4,
            DeviceKind::CN => 0xC5,
            DeviceKind::Z => 0xCC,
        }
    }

    /// Returns the 4E-frame (2-byte) device code for this class.
    ///
    /// All classes the mock supports fit in one byte; the wide code is the
    /// 3E code zero-extended.
    pub fn code_wide(self) -> u16 {
        u16::from(self.code())
    }

    /// Looks up a class by its 3E device code.
    pub fn from_code(code: u8) -> Option<Self> {
        ALL_DEVICE_KINDS.iter().copied().find(|k| k.code() == code)
    }

    /// Looks up a class by its 4E (2-byte) device code.
    pub fn from_code_wide(code: u16) -> Option<Self> {
        u8::try_from(code).ok().and_then(Self::from_code)
    }

    /// Looks up a class by its textual symbol (`"M"`, `"TC"`, ...).
    ///
    /// Matching is case-insensitive.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let upper = symbol.to_ascii_uppercase();
        ALL_DEVICE_KINDS
            .iter()
            .copied()
            .find(|k| k.symbol() == upper)
    }

    /// Returns the textual symbol of this class.
    pub fn symbol(self) -> &'static str {
        match self {
            DeviceKind::M => "M",
            DeviceKind::L => "L",
            DeviceKind::F => "F",
            DeviceKind::V => "V",
            DeviceKind::B => "B",
            DeviceKind::X => "X",
            DeviceKind::Y => "Y",
            DeviceKind::S => "S",
            DeviceKind::TC => "TC",
            DeviceKind::TS => "TS",
            DeviceKind::CC => "CC",
            DeviceKind::CS => "CS",
            DeviceKind::SB => "SB",
            DeviceKind::SM => "SM",
            DeviceKind::D => "D",
            DeviceKind::W => "W",
            DeviceKind::R => "R",
            DeviceKind::ZR => "ZR",
            DeviceKind::TN => "TN",
            DeviceKind::CN => "CN",
            DeviceKind::SD => "SD",
            DeviceKind::SW => "SW",
            DeviceKind::Z => "Z",
        }
    }

    /// Returns whether this is a bit-width class.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mock::DeviceKind;
    ///
    /// assert!(DeviceKind::X.is_bit());
    /// assert!(DeviceKind::TC.is_bit());
    /// assert!(!DeviceKind::TN.is_bit());
    /// ```
    pub fn is_bit(self) -> bool {
        matches!(
            self,
            DeviceKind::M
                | DeviceKind::L
                | DeviceKind::F
                | DeviceKind::V
                | DeviceKind::B
                | DeviceKind::X
                | DeviceKind::Y
                | DeviceKind::S
                | DeviceKind::TC
                | DeviceKind::TS
                | DeviceKind::CC
                | DeviceKind::CS
                | DeviceKind::SB
                | DeviceKind::SM
        )
    }

    /// Returns whether textual addresses of this class are hexadecimal.
    pub fn is_hex_addressed(self) -> bool {
        matches!(
            self,
            DeviceKind::X | DeviceKind::Y | DeviceKind::B | DeviceKind::W
        )
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A parsed device reference: class plus head number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceRef {
    /// Device class.
    pub kind: DeviceKind,
    /// Head number within the class.
    pub address: u32,
}

impl DeviceRef {
    /// Creates a reference from parts.
    pub fn new(kind: DeviceKind, address: u32) -> Self {
        Self { kind, address }
    }

    /// Parses a textual reference such as `"M100"`, `"X1F"` or `"ZR1000"`.
    ///
    /// Two-letter symbols are tried before one-letter symbols so that
    /// `"TC3"` resolves to timer contact 3 rather than an invalid `T`
    /// device. `X`, `Y`, `B` and `W` addresses are hexadecimal.
    ///
    /// # Errors
    ///
    /// Returns [`McError::InvalidDevice`] when the symbol is unknown or the
    /// address digits do not parse in the class radix.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim().to_ascii_uppercase();

        for len in [2usize, 1] {
            if text.len() <= len {
                continue;
            }
            let (sym, digits) = text.split_at(len);
            if let Some(kind) = DeviceKind::from_symbol(sym) {
                let radix = if kind.is_hex_addressed() { 16 } else { 10 };
                let address = u32::from_str_radix(digits, radix).map_err(|_| {
                    McError::invalid_device(format!(
                        "invalid address digits '{}' for device {}",
                        digits, sym
                    ))
                })?;
                return Ok(Self { kind, address });
            }
        }

        Err(McError::invalid_device(format!(
            "unrecognized device reference '{}'",
            text
        )))
    }
}

impl std::str::FromStr for DeviceRef {
    type Err = McError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.kind.is_hex_addressed() {
            write!(f, "{}{:X}", self.kind, self.address)
        } else {
            write!(f, "{}{}", self.kind, self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_codes() {
        assert_eq!(DeviceKind::M.code(), 0x90);
        assert_eq!(DeviceKind::SM.code(), 0x91);
        assert_eq!(DeviceKind::X.code(), 0x9C);
        assert_eq!(DeviceKind::Y.code(), 0x9D);
        assert_eq!(DeviceKind::D.code(), 0xA8);
        assert_eq!(DeviceKind::TC.code(), 0xC1);
        assert_eq!(DeviceKind::TS.code(), 0xC0);
        assert_eq!(DeviceKind::TN.code(), 0xC2);
        assert_eq!(DeviceKind::CC.code(), 0xC4);
        assert_eq!(DeviceKind::CS.code(), 0xC3);
        assert_eq!(DeviceKind::CN.code(), 0xC5);
        assert_eq!(DeviceKind::ZR.code(), 0xB0);
        assert_eq!(DeviceKind::Z.code(), 0xCC);
    }

    #[test]
    fn test_code_roundtrip() {
        for kind in ALL_DEVICE_KINDS {
            assert_eq!(DeviceKind::from_code(kind.code()), Some(kind));
            assert_eq!(DeviceKind::from_code_wide(kind.code_wide()), Some(kind));
        }
    }

    #[test]
    fn test_from_code_unknown() {
        assert_eq!(DeviceKind::from_code(0x7F), None);
        assert_eq!(DeviceKind::from_code_wide(0x1A8), None);
    }

    #[test]
    fn test_from_symbol() {
        assert_eq!(DeviceKind::from_symbol("m"), Some(DeviceKind::M));
        assert_eq!(DeviceKind::from_symbol("ZR"), Some(DeviceKind::ZR));
        assert_eq!(DeviceKind::from_symbol("Q"), None);
    }

    #[test]
    fn test_width() {
        assert!(DeviceKind::M.is_bit());
        assert!(DeviceKind::CS.is_bit());
        assert!(!DeviceKind::D.is_bit());
        assert!(!DeviceKind::SW.is_bit());
    }

    #[test]
    fn test_parse_decimal() {
        let r = DeviceRef::parse("M100").unwrap();
        assert_eq!(r.kind, DeviceKind::M);
        assert_eq!(r.address, 100);

        let r = DeviceRef::parse("d0").unwrap();
        assert_eq!(r.kind, DeviceKind::D);
        assert_eq!(r.address, 0);
    }

    #[test]
    fn test_parse_hex() {
        let r = DeviceRef::parse("X1F").unwrap();
        assert_eq!(r.kind, DeviceKind::X);
        assert_eq!(r.address, 0x1F);

        let r = DeviceRef::parse("W100").unwrap();
        assert_eq!(r.address, 0x100);
    }

    #[test]
    fn test_parse_two_letter_first() {
        // "TC3" must resolve to timer contact 3, not fail on "T".
        let r = DeviceRef::parse("TC3").unwrap();
        assert_eq!(r.kind, DeviceKind::TC);
        assert_eq!(r.address, 3);

        let r = DeviceRef::parse("ZR1000").unwrap();
        assert_eq!(r.kind, DeviceKind::ZR);
        assert_eq!(r.address, 1000);

        // "SW" before "S": SW10 is a link special register.
        let r = DeviceRef::parse("SW10").unwrap();
        assert_eq!(r.kind, DeviceKind::SW);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DeviceRef::parse("T0").is_err());
        assert!(DeviceRef::parse("M").is_err());
        assert!(DeviceRef::parse("MXYZ").is_err());
        assert!(DeviceRef::parse("D1F").is_err()); // D is decimal
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceRef::new(DeviceKind::D, 100).to_string(), "D100");
        assert_eq!(DeviceRef::new(DeviceKind::X, 0x1F).to_string(), "X1F");
    }
}
