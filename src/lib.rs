//! # MELSEC Mock PLC
//!
//! A mock Mitsubishi PLC that speaks the MELSEC Communication (MC)
//! protocol over TCP, backed by a simulated device memory and a ladder
//! logic engine - plus the matching MC client. It gives PLC-facing
//! software a faithful protocol peer without hardware on the bench.
//!
//! Both binary frame families are supported: **3E** (Q series) and **4E**
//! (iQ-R series, with request serial numbers).
//!
//! ## Quick Start
//!
//! ```no_run
//! use melsec_mock::{
//!     parse_ladder_source, ClientConfig, DeviceKind, MockPlcServer, PlcClient, ServerConfig,
//! };
//!
//! fn main() -> melsec_mock::Result<()> {
//!     // a Q-series mock on the default MC port
//!     let server = MockPlcServer::new(ServerConfig::new("127.0.0.1", 5000));
//!     server.load_program(parse_ladder_source(
//!         "LD X0\nOR Y0\nANI X1\nOUT Y0\nEND\n",
//!         "latch",
//!     )?)?;
//!     server.start()?;
//!
//!     // drive it like a real PLC
//!     let mut client = PlcClient::connect(ClientConfig::new("127.0.0.1", 5000))?;
//!     client.remote_run()?;
//!     client.write_bit(DeviceKind::X, 0, true)?;
//!     client.write_word(DeviceKind::D, 100, 1234)?;
//!     assert_eq!(client.read_word(DeviceKind::D, 100)?, 1234);
//!
//!     client.remote_stop()?;
//!     server.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Device Classes
//!
//! The full MELSEC device file is simulated - bit classes (`M`, `L`, `F`,
//! `V`, `B`, `X`, `Y`, `S`, `SM`, `SB`, timer/counter contacts and coils)
//! and word classes (`D`, `W`, `R`, `ZR`, `TN`, `CN`, `SD`, `SW`, `Z`),
//! with Q or iQ-R address spaces depending on the configured series.
//! Word-unit access to a bit class reads and writes 16 bits per word,
//! exactly as a CPU does.
//!
//! ## Ladder Logic
//!
//! Programs come from the fluent [`LadderProgram`] builder or from
//! GX-Works-style text via [`parse_ladder_source`]. The engine runs a
//! 10 ms scan cycle (configurable) with contacts, block and branch
//! stacks, `SET`/`RST`, edge pulses, timers, counters and 16-bit data
//! instructions. Remote RUN/STOP/PAUSE/RESET from any client controls the
//! engine.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, McError>`]. The server converts
//! recoverable faults into MC end codes and keeps the connection open;
//! the client surfaces nonzero end codes as [`McError::EndCode`] with the
//! numeric code attached. The engine never panics at scan time - faults
//! raise the `SM1` diagnostic relay and scanning continues.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod command;
mod cpu;
mod device;
mod engine;
mod error;
mod frame;
mod memory;
mod parser;
mod program;
mod response;
mod server;
pub mod utils;

// Public re-exports
pub use client::{ClientConfig, PlcClient, DEFAULT_TIMEOUT};
pub use command::{
    AccessUnit, BatchReadRequest, BatchWriteRequest, CpuModelReadRequest, RandomReadRequest,
    RandomWriteRequest, RemoteCommand, RemoteControlRequest, WriteData,
};
pub use cpu::{CpuMode, CpuModeCell};
pub use device::{DeviceKind, DeviceRef, ALL_DEVICE_KINDS};
pub use engine::{LadderEngine, DEFAULT_SCAN_PERIOD, DIAGNOSTIC_RELAY};
pub use error::{
    end_code_description, McError, Result, END_ADDRESS_OUT_OF_RANGE, END_INVALID_COMMAND,
    END_INVALID_DEVICE, END_LENGTH_MISMATCH, END_OK, END_POINT_COUNT, END_RANGE_OVERFLOW,
};
pub use frame::{
    FrameMeta, PlcSeries, DEFAULT_MONITORING_TIMER, SUBHEADER_3E_REQUEST, SUBHEADER_3E_RESPONSE,
    SUBHEADER_4E_REQUEST, SUBHEADER_4E_RESPONSE,
};
pub use memory::{DeviceMemory, MAX_BIT_POINTS, MAX_WORD_POINTS};
pub use parser::parse_ladder_source;
pub use program::{Instruction, LadderProgram, Operand, MAX_COUNTER, MAX_TIMER};
pub use response::McResponse;
pub use server::{MockPlcServer, ServerConfig};
