//! Compiled ladder programs.
//!
//! A [`LadderProgram`] is an ordered list of [`Instruction`]s, built either
//! through the fluent builder methods here or from text via
//! [`parse_ladder_source`](crate::parse_ladder_source). Operand
//! widths are validated as instructions are appended, so a program that
//! loads is a program the engine can run.
//!
//! # Example
//!
//! ```
//! use melsec_mock::LadderProgram;
//!
//! // self-holding rung: X0 starts Y0, X1 stops it
//! let program = LadderProgram::new("latch")
//!     .ld("X0")?
//!     .or_("Y0")?
//!     .ani("X1")?
//!     .out("Y0")?
//!     .end();
//! assert_eq!(program.len(), 5);
//! # Ok::<(), melsec_mock::McError>(())
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::device::{DeviceKind, DeviceRef};
use crate::error::{McError, Result};

/// Highest timer number (matches the `TC`/`TS`/`TN` address space).
pub const MAX_TIMER: u16 = 2047;
/// Highest counter number (matches the `CC`/`CS`/`CN` address space).
pub const MAX_COUNTER: u16 = 1023;

/// An instruction operand: a device reference or an immediate constant.
///
/// Constants are signed 16-bit (`K-5`, `H1F`); the engine reinterprets the
/// bit pattern as unsigned where a word device expects one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Value read from a word device at execution time.
    Device(DeviceRef),
    /// Immediate constant fixed at load time.
    Const(i16),
}

impl Operand {
    /// Parses an operand token: `K<dec>`, `H<hex>`, a bare signed decimal,
    /// or a word-device reference.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mock::{DeviceKind, Operand};
    ///
    /// assert_eq!(Operand::parse("K100").unwrap(), Operand::Const(100));
    /// assert_eq!(Operand::parse("H1F").unwrap(), Operand::Const(0x1F));
    /// assert!(matches!(Operand::parse("D0").unwrap(), Operand::Device(_)));
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim().to_ascii_uppercase();
        if let Some(digits) = text.strip_prefix('K') {
            let value: i32 = digits.parse().map_err(|_| {
                McError::invalid_device(format!("invalid K constant '{}'", text))
            })?;
            return i16::try_from(value).map(Operand::Const).map_err(|_| {
                McError::invalid_device(format!("K constant '{}' does not fit 16 bits", text))
            });
        }
        if let Some(digits) = text.strip_prefix('H') {
            let value = u16::from_str_radix(digits, 16).map_err(|_| {
                McError::invalid_device(format!("invalid H constant '{}'", text))
            })?;
            return Ok(Operand::Const(value as i16));
        }
        if text.starts_with('-') || text.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(value) = text.parse::<i16>() {
                return Ok(Operand::Const(value));
            }
        }
        let device = DeviceRef::parse(&text)?;
        if device.kind.is_bit() {
            return Err(McError::invalid_device(format!(
                "{} is a bit device, a word operand is required",
                device
            )));
        }
        Ok(Operand::Device(device))
    }
}

impl From<i16> for Operand {
    fn from(value: i16) -> Self {
        Operand::Const(value)
    }
}

impl From<DeviceRef> for Operand {
    fn from(device: DeviceRef) -> Self {
        Operand::Device(device)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Device(d) => write!(f, "{}", d),
            Operand::Const(v) => write!(f, "K{}", v),
        }
    }
}

/// A compiled ladder instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Load contact: acc = value.
    Ld(DeviceRef),
    /// Load inverted contact: acc = !value.
    Ldi(DeviceRef),
    /// Series contact: acc &= value.
    And(DeviceRef),
    /// Series inverted contact: acc &= !value.
    Ani(DeviceRef),
    /// Parallel contact: acc |= value.
    Or(DeviceRef),
    /// Parallel inverted contact: acc |= !value.
    Ori(DeviceRef),
    /// Combine the previous block in series.
    Anb,
    /// Combine the previous block in parallel.
    Orb,
    /// Push acc onto the branch stack.
    Mps,
    /// Peek the branch stack into acc.
    Mrd,
    /// Pop the branch stack into acc.
    Mpp,
    /// Write acc to a bit device.
    Out(DeviceRef),
    /// Latch the device on while acc is true.
    Set(DeviceRef),
    /// Reset the device while acc is true.
    Rst(DeviceRef),
    /// One-scan pulse on the rising edge of acc.
    Pls(DeviceRef),
    /// One-scan pulse on the falling edge of acc.
    Plf(DeviceRef),
    /// Timer coil with preset in 100 ms units.
    OutT { timer: u16, preset: u16 },
    /// Counter coil with a count preset.
    OutC { counter: u16, preset: u16 },
    /// Reset a timer (contact, coil and current value).
    RstT(u16),
    /// Reset a counter (contact, coil and current value).
    RstC(u16),
    /// Move a 16-bit value into a word device, gated by acc.
    Mov { src: Operand, dst: DeviceRef },
    /// dst = a + b (16-bit signed, wrapping), gated by acc.
    Add { a: Operand, b: Operand, dst: DeviceRef },
    /// dst = a - b (16-bit signed, wrapping), gated by acc.
    Sub { a: Operand, b: Operand, dst: DeviceRef },
    /// dst = a * b (16-bit signed, wrapping), gated by acc.
    Mul { a: Operand, b: Operand, dst: DeviceRef },
    /// dst = a / b; division by zero raises the diagnostic relay.
    Div { a: Operand, b: Operand, dst: DeviceRef },
    /// End of the scan.
    End,
    /// No operation.
    Nop,
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Ld(d) => write!(f, "LD {}", d),
            Instruction::Ldi(d) => write!(f, "LDI {}", d),
            Instruction::And(d) => write!(f, "AND {}", d),
            Instruction::Ani(d) => write!(f, "ANI {}", d),
            Instruction::Or(d) => write!(f, "OR {}", d),
            Instruction::Ori(d) => write!(f, "ORI {}", d),
            Instruction::Anb => write!(f, "ANB"),
            Instruction::Orb => write!(f, "ORB"),
            Instruction::Mps => write!(f, "MPS"),
            Instruction::Mrd => write!(f, "MRD"),
            Instruction::Mpp => write!(f, "MPP"),
            Instruction::Out(d) => write!(f, "OUT {}", d),
            Instruction::Set(d) => write!(f, "SET {}", d),
            Instruction::Rst(d) => write!(f, "RST {}", d),
            Instruction::Pls(d) => write!(f, "PLS {}", d),
            Instruction::Plf(d) => write!(f, "PLF {}", d),
            Instruction::OutT { timer, preset } => write!(f, "OUT T{} K{}", timer, preset),
            Instruction::OutC { counter, preset } => write!(f, "OUT C{} K{}", counter, preset),
            Instruction::RstT(n) => write!(f, "RST T{}", n),
            Instruction::RstC(n) => write!(f, "RST C{}", n),
            Instruction::Mov { src, dst } => write!(f, "MOV {} {}", src, dst),
            Instruction::Add { a, b, dst } => write!(f, "ADD {} {} {}", a, b, dst),
            Instruction::Sub { a, b, dst } => write!(f, "SUB {} {} {}", a, b, dst),
            Instruction::Mul { a, b, dst } => write!(f, "MUL {} {} {}", a, b, dst),
            Instruction::Div { a, b, dst } => write!(f, "DIV {} {} {}", a, b, dst),
            Instruction::End => write!(f, "END"),
            Instruction::Nop => write!(f, "NOP"),
        }
    }
}

/// An ordered, validated ladder instruction list.
#[derive(Debug, Clone, Default)]
pub struct LadderProgram {
    name: String,
    instructions: Vec<Instruction>,
    network_comments: BTreeMap<u32, String>,
    device_comments: HashMap<String, String>,
}

impl LadderProgram {
    /// Creates an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compiled instruction list.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns whether the program is empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Rung-group comments captured from `NETWORK` markers.
    pub fn network_comments(&self) -> &BTreeMap<u32, String> {
        &self.network_comments
    }

    /// Device comments captured from `COMMENT` markers.
    pub fn device_comments(&self) -> &HashMap<String, String> {
        &self.device_comments
    }

    pub(crate) fn set_network_comment(&mut self, network: u32, comment: String) {
        if !comment.is_empty() {
            self.network_comments.insert(network, comment);
        }
    }

    pub(crate) fn set_device_comment(&mut self, device: String, comment: String) {
        self.device_comments.insert(device, comment);
    }

    /// Appends an instruction after validating its operand widths.
    ///
    /// # Errors
    ///
    /// Returns [`McError::InvalidDevice`] when a contact or output names a
    /// word device, a data instruction targets a bit device, or a timer or
    /// counter number is out of range.
    pub fn push(&mut self, instruction: Instruction) -> Result<()> {
        validate(&instruction)?;
        self.instructions.push(instruction);
        Ok(())
    }

    fn with(mut self, instruction: Instruction) -> Result<Self> {
        self.push(instruction)?;
        Ok(self)
    }

    /// `LD`: load a contact, starting a rung or block.
    pub fn ld(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Ld(d))
    }

    /// `LDI`: load an inverted contact.
    pub fn ldi(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Ldi(d))
    }

    /// `AND`: series contact.
    pub fn and_(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::And(d))
    }

    /// `ANI`: series inverted contact.
    pub fn ani(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Ani(d))
    }

    /// `OR`: parallel contact.
    pub fn or_(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Or(d))
    }

    /// `ORI`: parallel inverted contact.
    pub fn ori(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Ori(d))
    }

    /// `ANB`: combine the previous block in series.
    pub fn anb(mut self) -> Self {
        self.instructions.push(Instruction::Anb);
        self
    }

    /// `ORB`: combine the previous block in parallel.
    pub fn orb(mut self) -> Self {
        self.instructions.push(Instruction::Orb);
        self
    }

    /// `MPS`: push the rung state.
    pub fn mps(mut self) -> Self {
        self.instructions.push(Instruction::Mps);
        self
    }

    /// `MRD`: reread the pushed rung state.
    pub fn mrd(mut self) -> Self {
        self.instructions.push(Instruction::Mrd);
        self
    }

    /// `MPP`: pop the rung state.
    pub fn mpp(mut self) -> Self {
        self.instructions.push(Instruction::Mpp);
        self
    }

    /// `OUT`: drive a bit device from the rung result.
    pub fn out(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Out(d))
    }

    /// `SET`: latch a bit device on.
    pub fn set(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Set(d))
    }

    /// `RST`: reset a bit device.
    pub fn rst(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Rst(d))
    }

    /// `PLS`: rising-edge one-scan pulse.
    pub fn pls(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Pls(d))
    }

    /// `PLF`: falling-edge one-scan pulse.
    pub fn plf(self, device: &str) -> Result<Self> {
        let d = DeviceRef::parse(device)?;
        self.with(Instruction::Plf(d))
    }

    /// `OUT T<n> K<preset>`: timer coil, preset in 100 ms units.
    pub fn out_t(self, timer: u16, preset: u16) -> Result<Self> {
        self.with(Instruction::OutT { timer, preset })
    }

    /// `OUT C<n> K<preset>`: counter coil.
    pub fn out_c(self, counter: u16, preset: u16) -> Result<Self> {
        self.with(Instruction::OutC { counter, preset })
    }

    /// `RST T<n>`: reset a timer.
    pub fn rst_t(self, timer: u16) -> Result<Self> {
        self.with(Instruction::RstT(timer))
    }

    /// `RST C<n>`: reset a counter.
    pub fn rst_c(self, counter: u16) -> Result<Self> {
        self.with(Instruction::RstC(counter))
    }

    /// `MOV src dst`: move a value into a word device.
    pub fn mov(self, src: impl Into<Operand>, dst: &str) -> Result<Self> {
        let dst = DeviceRef::parse(dst)?;
        self.with(Instruction::Mov {
            src: src.into(),
            dst,
        })
    }

    /// `ADD a b dst`.
    pub fn add(self, a: impl Into<Operand>, b: impl Into<Operand>, dst: &str) -> Result<Self> {
        let dst = DeviceRef::parse(dst)?;
        self.with(Instruction::Add {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    /// `SUB a b dst`.
    pub fn sub(self, a: impl Into<Operand>, b: impl Into<Operand>, dst: &str) -> Result<Self> {
        let dst = DeviceRef::parse(dst)?;
        self.with(Instruction::Sub {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    /// `MUL a b dst`.
    pub fn mul(self, a: impl Into<Operand>, b: impl Into<Operand>, dst: &str) -> Result<Self> {
        let dst = DeviceRef::parse(dst)?;
        self.with(Instruction::Mul {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    /// `DIV a b dst`.
    pub fn div(self, a: impl Into<Operand>, b: impl Into<Operand>, dst: &str) -> Result<Self> {
        let dst = DeviceRef::parse(dst)?;
        self.with(Instruction::Div {
            a: a.into(),
            b: b.into(),
            dst,
        })
    }

    /// `END`: terminate the scan.
    pub fn end(mut self) -> Self {
        self.instructions.push(Instruction::End);
        self
    }

    /// `NOP`.
    pub fn nop(mut self) -> Self {
        self.instructions.push(Instruction::Nop);
        self
    }
}

impl std::fmt::Display for LadderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Ladder Program: {} ===", self.name)?;
        for (i, inst) in self.instructions.iter().enumerate() {
            writeln!(f, "{:4}: {}", i, inst)?;
        }
        Ok(())
    }
}

fn require_bit(device: &DeviceRef) -> Result<()> {
    if !device.kind.is_bit() {
        return Err(McError::invalid_device(format!(
            "{} is a word device where a contact or coil is required",
            device
        )));
    }
    Ok(())
}

fn require_word(device: &DeviceRef) -> Result<()> {
    if device.kind.is_bit() {
        return Err(McError::invalid_device(format!(
            "{} is a bit device where a word register is required",
            device
        )));
    }
    Ok(())
}

fn require_word_operand(operand: &Operand) -> Result<()> {
    match operand {
        Operand::Const(_) => Ok(()),
        Operand::Device(d) => require_word(d),
    }
}

fn check_timer(timer: u16) -> Result<()> {
    if timer > MAX_TIMER {
        return Err(McError::invalid_device(format!(
            "timer T{} beyond T{}",
            timer, MAX_TIMER
        )));
    }
    Ok(())
}

fn check_counter(counter: u16) -> Result<()> {
    if counter > MAX_COUNTER {
        return Err(McError::invalid_device(format!(
            "counter C{} beyond C{}",
            counter, MAX_COUNTER
        )));
    }
    Ok(())
}

fn validate(instruction: &Instruction) -> Result<()> {
    match instruction {
        Instruction::Ld(d)
        | Instruction::Ldi(d)
        | Instruction::And(d)
        | Instruction::Ani(d)
        | Instruction::Or(d)
        | Instruction::Ori(d)
        | Instruction::Out(d)
        | Instruction::Set(d)
        | Instruction::Rst(d)
        | Instruction::Pls(d)
        | Instruction::Plf(d) => require_bit(d),
        Instruction::OutT { timer, .. } | Instruction::RstT(timer) => check_timer(*timer),
        Instruction::OutC { counter, .. } | Instruction::RstC(counter) => check_counter(*counter),
        Instruction::Mov { src, dst } => {
            require_word_operand(src)?;
            require_word(dst)
        }
        Instruction::Add { a, b, dst }
        | Instruction::Sub { a, b, dst }
        | Instruction::Mul { a, b, dst }
        | Instruction::Div { a, b, dst } => {
            require_word_operand(a)?;
            require_word_operand(b)?;
            require_word(dst)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let program = LadderProgram::new("latch")
            .ld("X0")
            .unwrap()
            .or_("Y0")
            .unwrap()
            .ani("X1")
            .unwrap()
            .out("Y0")
            .unwrap()
            .end();
        assert_eq!(program.len(), 5);
        assert_eq!(
            program.instructions()[0],
            Instruction::Ld(DeviceRef::new(DeviceKind::X, 0))
        );
        assert_eq!(program.instructions()[4], Instruction::End);
    }

    #[test]
    fn test_contact_rejects_word_device() {
        assert!(LadderProgram::new("bad").ld("D0").is_err());
        assert!(LadderProgram::new("bad").out("D0").is_err());
    }

    #[test]
    fn test_data_rejects_bit_device() {
        assert!(LadderProgram::new("bad").mov(1i16, "M0").is_err());
        assert!(LadderProgram::new("ok").add(1i16, 2i16, "D0").is_ok());
        assert!(LadderProgram::new("bad").div(1i16, 2i16, "Y0").is_err());
    }

    #[test]
    fn test_operand_parse() {
        assert_eq!(Operand::parse("K100").unwrap(), Operand::Const(100));
        assert_eq!(Operand::parse("K-5").unwrap(), Operand::Const(-5));
        assert_eq!(Operand::parse("HFFFF").unwrap(), Operand::Const(-1));
        assert_eq!(Operand::parse("42").unwrap(), Operand::Const(42));
        assert!(matches!(
            Operand::parse("D100").unwrap(),
            Operand::Device(DeviceRef {
                kind: DeviceKind::D,
                address: 100
            })
        ));
        assert!(Operand::parse("M0").is_err());
        assert!(Operand::parse("K70000").is_err());
        assert!(Operand::parse("HZZ").is_err());
    }

    #[test]
    fn test_timer_counter_limits() {
        assert!(LadderProgram::new("t").out_t(2047, 10).is_ok());
        assert!(LadderProgram::new("t").out_t(2048, 10).is_err());
        assert!(LadderProgram::new("c").out_c(1023, 5).is_ok());
        assert!(LadderProgram::new("c").rst_c(1024).is_err());
    }

    #[test]
    fn test_display() {
        let program = LadderProgram::new("demo")
            .ld("X0")
            .unwrap()
            .out_t(0, 20)
            .unwrap()
            .end();
        let text = program.to_string();
        assert!(text.contains("LD X0"));
        assert!(text.contains("OUT T0 K20"));
        assert!(text.contains("END"));
    }

    #[test]
    fn test_mov_operand_forms() {
        let program = LadderProgram::new("mov")
            .ld("M0")
            .unwrap()
            .mov(100i16, "D10")
            .unwrap()
            .mov(DeviceRef::new(DeviceKind::D, 0), "D11")
            .unwrap();
        assert_eq!(program.len(), 3);
    }
}
