//! MC client harness.
//!
//! One-shot operations against a PLC (real or mock): device reads and
//! writes, CPU model read, remote control and a connectivity ping.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;

use melsec_mock::{ClientConfig, DeviceRef, McError, PlcClient, PlcSeries};

#[derive(Parser, Debug)]
#[command(
    name = "plc-client",
    about = "MC protocol client for Mitsubishi MELSEC PLCs (3E/4E frames)."
)]
struct Args {
    /// PLC host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// PLC port.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// PLC series: Q (3E frames) or iQ-R (4E frames).
    #[arg(long, default_value = "Q")]
    series: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read words starting at a device, e.g. `read D100 --count 4`.
    Read {
        /// Device reference such as D100 or W1F.
        device: String,
        /// Number of points.
        #[arg(long, default_value_t = 1)]
        count: u16,
    },
    /// Write words starting at a device, e.g. `write D100 1 2 3`.
    Write {
        /// Device reference.
        device: String,
        /// Values to write.
        #[arg(required = true)]
        values: Vec<u16>,
    },
    /// Read bits starting at a device, e.g. `read-bits M0 --count 8`.
    ReadBits {
        /// Device reference.
        device: String,
        /// Number of points.
        #[arg(long, default_value_t = 1)]
        count: u16,
    },
    /// Write bits starting at a device, e.g. `write-bits M0 1 0 1 1`.
    WriteBits {
        /// Device reference.
        device: String,
        /// Bit values (0 or 1).
        #[arg(required = true)]
        values: Vec<u8>,
    },
    /// Read the CPU model name.
    Model,
    /// Remote RUN.
    Run,
    /// Remote STOP.
    Stop,
    /// Remote PAUSE.
    Pause,
    /// Remote RESET.
    Reset,
    /// Connectivity test (reads D0).
    Ping,
}

fn run(args: Args) -> Result<(), McError> {
    let series: PlcSeries = args.series.parse()?;
    let mut client = PlcClient::connect(
        ClientConfig::new(args.host, args.port).with_series(series),
    )?;

    match args.command {
        Command::Read { device, count } => {
            let d = DeviceRef::parse(&device)?;
            let values = client.read_words(d.kind, d.address, count)?;
            for (i, value) in values.iter().enumerate() {
                println!("{} = {} (0x{:04X})", DeviceRef::new(d.kind, d.address + i as u32), value, value);
            }
        }
        Command::Write { device, values } => {
            let d = DeviceRef::parse(&device)?;
            client.write_words(d.kind, d.address, &values)?;
            println!("wrote {} words at {}", values.len(), d);
        }
        Command::ReadBits { device, count } => {
            let d = DeviceRef::parse(&device)?;
            let bits = client.read_bits(d.kind, d.address, count)?;
            for (i, bit) in bits.iter().enumerate() {
                println!(
                    "{} = {}",
                    DeviceRef::new(d.kind, d.address + i as u32),
                    u8::from(*bit)
                );
            }
        }
        Command::WriteBits { device, values } => {
            let d = DeviceRef::parse(&device)?;
            let bits: Vec<bool> = values.iter().map(|&v| v != 0).collect();
            client.write_bits(d.kind, d.address, &bits)?;
            println!("wrote {} bits at {}", bits.len(), d);
        }
        Command::Model => println!("{}", client.read_cpu_model()?),
        Command::Run => {
            client.remote_run()?;
            println!("RUN");
        }
        Command::Stop => {
            client.remote_stop()?;
            println!("STOP");
        }
        Command::Pause => {
            client.remote_pause()?;
            println!("PAUSE");
        }
        Command::Reset => {
            client.remote_reset()?;
            println!("RESET");
        }
        Command::Ping => {
            if client.test_connection() {
                println!("ok");
            } else {
                return Err(McError::ConnectionClosed);
            }
        }
    }

    client.disconnect()
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
