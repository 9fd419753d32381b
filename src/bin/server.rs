//! Mock PLC server harness.
//!
//! Binds the mock, optionally loads a ladder text file and starts the
//! engine, then runs until Ctrl-C.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use clap::Parser;
use log::{error, info};

use melsec_mock::{parse_ladder_source, MockPlcServer, PlcSeries, ServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "plc-server",
    about = "Mock Mitsubishi MELSEC PLC speaking the MC protocol (3E/4E) over TCP."
)]
struct Args {
    /// Bind host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Bind port.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// PLC series: Q (3E frames) or iQ-R (4E frames).
    #[arg(long, default_value = "Q")]
    series: String,

    /// Ladder source file to load at startup.
    #[arg(long, value_name = "FILE")]
    program: Option<PathBuf>,

    /// Start the ladder engine immediately (equivalent to a remote RUN).
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let series: PlcSeries = match args.series.parse() {
        Ok(series) => series,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = MockPlcServer::new(
        ServerConfig::new(args.host.clone(), args.port).with_series(series),
    );

    if let Some(path) = &args.program {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                error!("cannot read {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".to_string());
        match parse_ladder_source(&source, &name) {
            Ok(program) => {
                if let Err(e) = server.load_program(program) {
                    error!("program load failed: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                error!("{}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = server.start() {
        error!("cannot bind {}:{}: {}", args.host, args.port, e);
        return ExitCode::FAILURE;
    }
    if args.run {
        server.engine().start();
    }

    // run until Ctrl-C
    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    }) {
        error!("signal handler failed: {}", e);
        server.stop();
        return ExitCode::FAILURE;
    }

    info!(
        "mock PLC up on {}:{} ({} series), Ctrl-C to stop",
        args.host, args.port, series
    );
    let _ = shutdown_rx.recv();

    server.stop();
    ExitCode::SUCCESS
}
