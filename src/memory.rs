//! Simulated device memory.
//!
//! [`DeviceMemory`] is the addressable register/bit file shared between the
//! MC request handlers and the ladder engine. Storage is sparse: a slot
//! that was never written reads as 0, like a freshly powered CPU.
//!
//! # Thread safety
//!
//! Every class has its own lock, so traffic on `D` never contends with the
//! scan loop hammering `M`. Single-slot operations are atomic; a
//! multi-point read or write locks its class once but makes no atomicity
//! promise against writers of *other* classes. Consumers that need
//! cross-class coherence synchronize externally.
//!
//! # Bit/word aliasing
//!
//! Word-unit access to a bit class reads or writes 16 consecutive bits per
//! word, LSB first — this is how MC word commands address `M`, `X` or `Y`.
//!
//! # Example
//!
//! ```
//! use melsec_mock::{DeviceKind, DeviceMemory, PlcSeries};
//!
//! let mem = DeviceMemory::new(PlcSeries::QSeries);
//! mem.write_word(DeviceKind::D, 100, 1234).unwrap();
//! assert_eq!(mem.read_word(DeviceKind::D, 100).unwrap(), 1234);
//!
//! mem.write_bit(DeviceKind::M, 0, true).unwrap();
//! assert_eq!(mem.read_words(DeviceKind::M, 0, 1).unwrap(), vec![0x0001]);
//! ```

use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;

use crate::device::{DeviceKind, ALL_DEVICE_KINDS};
use crate::error::{McError, Result};
use crate::frame::PlcSeries;

/// Maximum points per bit-unit batch access.
pub const MAX_BIT_POINTS: u16 = 3584;
/// Maximum points per word-unit batch access.
pub const MAX_WORD_POINTS: u16 = 960;

/// Highest valid head number for a class on the given series
/// (Q-series standard sizes; iQ-R widens several classes).
fn address_limit(kind: DeviceKind, series: PlcSeries) -> u32 {
    let (q, iqr) = match kind {
        DeviceKind::D => (12_287, 65_535),
        DeviceKind::M => (8_191, 65_535),
        DeviceKind::X | DeviceKind::Y => (0x1FFF, 0x1FFF),
        DeviceKind::B => (0x7FFF, 0x7FFF),
        DeviceKind::W => (0x7FFF, 0xFFFF),
        DeviceKind::L => (8_191, 32_767),
        DeviceKind::F | DeviceKind::V => (2_047, 32_767),
        DeviceKind::S => (8_191, 8_191),
        DeviceKind::R => (32_767, 32_767),
        DeviceKind::ZR => (0x000F_FFFF, 0x0FFF_FFFF),
        DeviceKind::TN | DeviceKind::TC | DeviceKind::TS => (2_047, 2_047),
        DeviceKind::CN | DeviceKind::CC | DeviceKind::CS => (1_023, 1_023),
        DeviceKind::SM | DeviceKind::SD => (2_047, 4_095),
        DeviceKind::SB | DeviceKind::SW => (0x7FF, 0x7FF),
        DeviceKind::Z => (19, 19),
    };
    match series {
        PlcSeries::QSeries => q,
        PlcSeries::IqrSeries => iqr,
    }
}

/// Shared, typed device memory covering all device classes.
pub struct DeviceMemory {
    series: PlcSeries,
    banks: HashMap<DeviceKind, Mutex<HashMap<u32, u16>>>,
}

impl DeviceMemory {
    /// Creates an all-zero device memory sized for the given series.
    pub fn new(series: PlcSeries) -> Self {
        let banks = ALL_DEVICE_KINDS
            .iter()
            .map(|&kind| (kind, Mutex::new(HashMap::new())))
            .collect();
        Self { series, banks }
    }

    /// Returns the series this memory is sized for.
    pub fn series(&self) -> PlcSeries {
        self.series
    }

    /// Highest valid head number for `kind` on this memory's series.
    pub fn address_limit(&self, kind: DeviceKind) -> u32 {
        address_limit(kind, self.series)
    }

    fn bank(&self, kind: DeviceKind) -> &Mutex<HashMap<u32, u16>> {
        // Every kind was inserted in new().
        &self.banks[&kind]
    }

    fn check_address(&self, kind: DeviceKind, address: u32) -> Result<()> {
        let limit = self.address_limit(kind);
        if address > limit {
            return Err(McError::AddressOutOfRange {
                device: kind.symbol().to_string(),
                address,
                limit,
            });
        }
        Ok(())
    }

    /// Validates a batch range: `count` within `[1, max_points]` and the
    /// last touched head number inside the class.
    fn check_range(
        &self,
        kind: DeviceKind,
        head: u32,
        count: u16,
        slots_per_point: u32,
        max_points: u16,
    ) -> Result<()> {
        if count == 0 {
            return Err(McError::PointCount {
                count,
                reason: "must be at least 1".into(),
            });
        }
        if count > max_points {
            return Err(McError::PointCount {
                count,
                reason: format!("exceeds the maximum of {} points", max_points),
            });
        }
        let limit = self.address_limit(kind);
        let span = u32::from(count) * slots_per_point;
        if head > limit || limit - head < span - 1 {
            return Err(McError::RangeOverflow {
                device: kind.symbol().to_string(),
                address: head,
                count,
                limit,
            });
        }
        Ok(())
    }

    fn require_bit(&self, kind: DeviceKind) -> Result<()> {
        if !kind.is_bit() {
            return Err(McError::invalid_device(format!(
                "{} is a word device, bit access rejected",
                kind
            )));
        }
        Ok(())
    }

    fn require_word(&self, kind: DeviceKind) -> Result<()> {
        if kind.is_bit() {
            return Err(McError::invalid_device(format!(
                "{} is a bit device, word access rejected",
                kind
            )));
        }
        Ok(())
    }

    /// Reads one bit.
    pub fn read_bit(&self, kind: DeviceKind, address: u32) -> Result<bool> {
        self.require_bit(kind)?;
        self.check_address(kind, address)?;
        let bank = self.bank(kind).lock().unwrap();
        Ok(bank.get(&address).copied().unwrap_or(0) != 0)
    }

    /// Writes one bit.
    pub fn write_bit(&self, kind: DeviceKind, address: u32, value: bool) -> Result<()> {
        self.require_bit(kind)?;
        self.check_address(kind, address)?;
        let mut bank = self.bank(kind).lock().unwrap();
        bank.insert(address, u16::from(value));
        Ok(())
    }

    /// Reads `count` consecutive bits starting at `head`.
    pub fn read_bits(&self, kind: DeviceKind, head: u32, count: u16) -> Result<Vec<bool>> {
        self.require_bit(kind)?;
        self.check_range(kind, head, count, 1, MAX_BIT_POINTS)?;
        let bank = self.bank(kind).lock().unwrap();
        Ok((0..u32::from(count))
            .map(|i| bank.get(&(head + i)).copied().unwrap_or(0) != 0)
            .collect())
    }

    /// Writes consecutive bits starting at `head`.
    pub fn write_bits(&self, kind: DeviceKind, head: u32, values: &[bool]) -> Result<()> {
        self.require_bit(kind)?;
        let count = u16::try_from(values.len()).map_err(|_| McError::PointCount {
            count: u16::MAX,
            reason: format!("{} points do not fit a 16-bit count", values.len()),
        })?;
        self.check_range(kind, head, count, 1, MAX_BIT_POINTS)?;
        let mut bank = self.bank(kind).lock().unwrap();
        for (i, &value) in values.iter().enumerate() {
            bank.insert(head + i as u32, u16::from(value));
        }
        Ok(())
    }

    /// Reads one word.
    pub fn read_word(&self, kind: DeviceKind, address: u32) -> Result<u16> {
        self.require_word(kind)?;
        self.check_address(kind, address)?;
        let bank = self.bank(kind).lock().unwrap();
        Ok(bank.get(&address).copied().unwrap_or(0))
    }

    /// Writes one word.
    pub fn write_word(&self, kind: DeviceKind, address: u32, value: u16) -> Result<()> {
        self.require_word(kind)?;
        self.check_address(kind, address)?;
        let mut bank = self.bank(kind).lock().unwrap();
        bank.insert(address, value);
        Ok(())
    }

    /// Reads `count` words starting at `head`.
    ///
    /// On a bit class this reads 16 consecutive bits per word (LSB = the
    /// earliest bit), which is how MC word-unit commands address relays.
    pub fn read_words(&self, kind: DeviceKind, head: u32, count: u16) -> Result<Vec<u16>> {
        if kind.is_bit() {
            self.check_range(kind, head, count, 16, MAX_WORD_POINTS)?;
            let bank = self.bank(kind).lock().unwrap();
            return Ok((0..u32::from(count))
                .map(|w| {
                    let base = head + w * 16;
                    (0u32..16).fold(0u16, |acc, bit| {
                        if bank.get(&(base + bit)).copied().unwrap_or(0) != 0 {
                            acc | (1u16 << bit)
                        } else {
                            acc
                        }
                    })
                })
                .collect());
        }
        self.check_range(kind, head, count, 1, MAX_WORD_POINTS)?;
        let bank = self.bank(kind).lock().unwrap();
        Ok((0..u32::from(count))
            .map(|i| bank.get(&(head + i)).copied().unwrap_or(0))
            .collect())
    }

    /// Writes consecutive words starting at `head`.
    ///
    /// On a bit class each word fans out to 16 consecutive bits.
    pub fn write_words(&self, kind: DeviceKind, head: u32, values: &[u16]) -> Result<()> {
        let count = u16::try_from(values.len()).map_err(|_| McError::PointCount {
            count: u16::MAX,
            reason: format!("{} points do not fit a 16-bit count", values.len()),
        })?;
        if kind.is_bit() {
            self.check_range(kind, head, count, 16, MAX_WORD_POINTS)?;
            let mut bank = self.bank(kind).lock().unwrap();
            for (w, &value) in values.iter().enumerate() {
                let base = head + w as u32 * 16;
                for bit in 0u32..16 {
                    bank.insert(base + bit, u16::from(value & (1u16 << bit) != 0));
                }
            }
            return Ok(());
        }
        self.check_range(kind, head, count, 1, MAX_WORD_POINTS)?;
        let mut bank = self.bank(kind).lock().unwrap();
        for (i, &value) in values.iter().enumerate() {
            bank.insert(head + i as u32, value);
        }
        Ok(())
    }

    /// Clears every device of every class to 0.
    pub fn reset_all(&self) {
        for bank in self.banks.values() {
            bank.lock().unwrap().clear();
        }
        debug!("device memory cleared");
    }
}

impl std::fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("series", &self.series)
            .finish()
    }
}
