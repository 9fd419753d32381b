//! GX-Works-style ladder text parser.
//!
//! Consumes the line-oriented mnemonic format that GX Works exports:
//!
//! ```text
//! ; self-holding circuit
//! COMMENT X0 "start switch"
//!
//! NETWORK 1 "latch"
//! LD X0
//! OR Y0
//! ANI X1
//! OUT Y0
//!
//! NETWORK 2 "timer"
//! LD X2
//! OUT T0 K20
//! LD T0
//! OUT Y1
//!
//! END
//! ```
//!
//! The recognized mnemonic set is a strict superset of the
//! [`LadderProgram`] builder's: pulse-contact aliases (`LDP`, `ANDF`, ...)
//! compile to their plain contacts, `DMOV` to `MOV`, and `INC d` / `DEC d`
//! to `ADD d K1 d` / `SUB d K1 d`. `T<n>` and `C<n>` operands alias the
//! timer/counter devices: contacts become `TC<n>` / `CC<n>`, and `OUT` /
//! `RST` on them become the dedicated timer/counter instructions.
//!
//! Errors carry the 1-based line number and offending token; any error
//! fails the whole parse (no partial programs).

use log::debug;

use crate::device::{DeviceKind, DeviceRef};
use crate::error::{McError, Result};
use crate::program::{Instruction, LadderProgram, Operand};

/// Parses ladder source text into a compiled program.
///
/// # Errors
///
/// Returns [`McError::LadderParse`] on the first malformed line.
///
/// # Example
///
/// ```
/// use melsec_mock::parse_ladder_source;
///
/// let program = parse_ladder_source("LD X0\nOUT Y0\nEND\n", "demo").unwrap();
/// assert_eq!(program.len(), 3);
/// ```
pub fn parse_ladder_source(source: &str, name: &str) -> Result<LadderProgram> {
    let mut program = LadderProgram::new(name);

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with("//") {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let mnemonic = tokens.next().unwrap_or_default().to_ascii_uppercase();
        let operands: Vec<&str> = tokens.collect();

        if mnemonic == "END" {
            program.push(Instruction::End).map_err(wrap(line_no))?;
            break;
        }

        parse_line(&mut program, &mnemonic, &operands, line).map_err(wrap(line_no))?;
    }

    debug!(
        "parsed ladder program '{}': {} instructions",
        name,
        program.len()
    );
    Ok(program)
}

/// Wraps any error from a line into a `LadderParse` error carrying the
/// line number.
fn wrap(line: usize) -> impl Fn(McError) -> McError {
    move |e| match e {
        McError::LadderParse { line: 0, message } => McError::ladder_parse(line, message),
        McError::LadderParse { .. } => e,
        other => McError::ladder_parse(line, other.to_string()),
    }
}

fn parse_line(
    program: &mut LadderProgram,
    mnemonic: &str,
    operands: &[&str],
    line: &str,
) -> Result<()> {
    match mnemonic {
        "NETWORK" => {
            let no: u32 = expect(operands, 0, mnemonic)?
                .parse()
                .map_err(|_| bad_token(operands[0], "network number"))?;
            program.set_network_comment(no, quoted_text(line));
            Ok(())
        }
        "COMMENT" => {
            let device = expect(operands, 0, mnemonic)?.to_ascii_uppercase();
            program.set_device_comment(device, quoted_text(line));
            Ok(())
        }
        "LD" | "LDP" | "LDF" => program.push(Instruction::Ld(contact(expect(operands, 0, mnemonic)?)?)),
        "LDI" => program.push(Instruction::Ldi(contact(expect(operands, 0, mnemonic)?)?)),
        "AND" | "ANDP" | "ANDF" => {
            program.push(Instruction::And(contact(expect(operands, 0, mnemonic)?)?))
        }
        "ANI" => program.push(Instruction::Ani(contact(expect(operands, 0, mnemonic)?)?)),
        "OR" | "ORP" | "ORF" => {
            program.push(Instruction::Or(contact(expect(operands, 0, mnemonic)?)?))
        }
        "ORI" => program.push(Instruction::Ori(contact(expect(operands, 0, mnemonic)?)?)),
        "ANB" => program.push(Instruction::Anb),
        "ORB" => program.push(Instruction::Orb),
        "MPS" => program.push(Instruction::Mps),
        "MRD" => program.push(Instruction::Mrd),
        "MPP" => program.push(Instruction::Mpp),
        "NOP" => program.push(Instruction::Nop),
        "OUT" => {
            let target = expect(operands, 0, mnemonic)?;
            if let Some(timer) = timer_counter_number(target, 'T') {
                let preset = preset(expect(operands, 1, "OUT T")?)?;
                program.push(Instruction::OutT { timer, preset })
            } else if let Some(counter) = timer_counter_number(target, 'C') {
                let preset = preset(expect(operands, 1, "OUT C")?)?;
                program.push(Instruction::OutC { counter, preset })
            } else {
                program.push(Instruction::Out(contact(target)?))
            }
        }
        "SET" => program.push(Instruction::Set(contact(expect(operands, 0, mnemonic)?)?)),
        "RST" => {
            let target = expect(operands, 0, mnemonic)?;
            if let Some(timer) = timer_counter_number(target, 'T') {
                program.push(Instruction::RstT(timer))
            } else if let Some(counter) = timer_counter_number(target, 'C') {
                program.push(Instruction::RstC(counter))
            } else {
                program.push(Instruction::Rst(contact(target)?))
            }
        }
        "PLS" => program.push(Instruction::Pls(contact(expect(operands, 0, mnemonic)?)?)),
        "PLF" => program.push(Instruction::Plf(contact(expect(operands, 0, mnemonic)?)?)),
        "MOV" | "DMOV" => {
            let src = Operand::parse(expect(operands, 0, mnemonic)?)?;
            let dst = DeviceRef::parse(expect(operands, 1, mnemonic)?)?;
            program.push(Instruction::Mov { src, dst })
        }
        "ADD" | "SUB" | "MUL" | "DIV" => {
            let a = Operand::parse(expect(operands, 0, mnemonic)?)?;
            let b = Operand::parse(expect(operands, 1, mnemonic)?)?;
            let dst = DeviceRef::parse(expect(operands, 2, mnemonic)?)?;
            program.push(match mnemonic {
                "ADD" => Instruction::Add { a, b, dst },
                "SUB" => Instruction::Sub { a, b, dst },
                "MUL" => Instruction::Mul { a, b, dst },
                _ => Instruction::Div { a, b, dst },
            })
        }
        "INC" | "DEC" => {
            let dst = DeviceRef::parse(expect(operands, 0, mnemonic)?)?;
            let a = Operand::Device(dst);
            let b = Operand::Const(1);
            program.push(if mnemonic == "INC" {
                Instruction::Add { a, b, dst }
            } else {
                Instruction::Sub { a, b, dst }
            })
        }
        other => Err(McError::ladder_parse(
            0,
            format!("unknown mnemonic '{}'", other),
        )),
    }
}

fn expect<'a>(operands: &[&'a str], index: usize, mnemonic: &str) -> Result<&'a str> {
    operands.get(index).copied().ok_or_else(|| {
        McError::invalid_device(format!(
            "{} is missing operand {}",
            mnemonic,
            index + 1
        ))
    })
}

fn bad_token(token: &str, what: &str) -> McError {
    McError::invalid_device(format!("'{}' is not a valid {}", token, what))
}

/// Resolves a contact operand, aliasing `T<n>`/`C<n>` to the timer and
/// counter contact devices.
fn contact(token: &str) -> Result<DeviceRef> {
    if let Some(n) = timer_counter_number(token, 'T') {
        return Ok(DeviceRef::new(DeviceKind::TC, u32::from(n)));
    }
    if let Some(n) = timer_counter_number(token, 'C') {
        return Ok(DeviceRef::new(DeviceKind::CC, u32::from(n)));
    }
    DeviceRef::parse(token)
}

/// Returns `Some(n)` for tokens of the shape `T123` / `C7` (prefix letter
/// followed only by decimal digits).
fn timer_counter_number(token: &str, prefix: char) -> Option<u16> {
    let upper = token.to_ascii_uppercase();
    let digits = upper.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parses a timer/counter preset: a non-negative `K`/`H` constant.
fn preset(token: &str) -> Result<u16> {
    match Operand::parse(token)? {
        Operand::Const(value) if value >= 0 => Ok(value as u16),
        Operand::Const(value) => Err(bad_token(&format!("K{}", value), "preset")),
        Operand::Device(_) => Err(bad_token(token, "preset (a constant is required)")),
    }
}

/// Extracts the text between the first and last double quote of a line, or
/// an empty string when the line carries no quoted text.
fn quoted_text(line: &str) -> String {
    match (line.find('"'), line.rfind('"')) {
        (Some(start), Some(end)) if end > start => line[start + 1..end].to_string(),
        _ => String::new(),
    }
}
