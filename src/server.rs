//! Mock PLC server.
//!
//! [`MockPlcServer`] binds a TCP listener, accepts any number of
//! connections (one handler thread each) and answers MC requests against
//! a shared [`DeviceMemory`], while a [`LadderEngine`] scans the loaded
//! program against the same memory. Remote control commands side-effect
//! the engine: RUN starts scanning, STOP and PAUSE halt it, RESET clears
//! the device memory and lands in STOP.
//!
//! Within one connection requests are processed strictly in order.
//! Recoverable faults (bad device, bad range, unknown command) become
//! error replies with the matching end code and the connection stays
//! usable; an unparseable frame closes the connection.
//!
//! # Example
//!
//! ```no_run
//! use melsec_mock::{ClientConfig, DeviceKind, MockPlcServer, PlcClient, ServerConfig};
//!
//! let server = MockPlcServer::new(ServerConfig::new("127.0.0.1", 5000));
//! server.start()?;
//!
//! let mut client = PlcClient::connect(ClientConfig::new("127.0.0.1", 5000))?;
//! client.write_word(DeviceKind::D, 0, 42)?;
//! assert_eq!(client.read_word(DeviceKind::D, 0)?, 42);
//!
//! server.stop();
//! # Ok::<(), melsec_mock::McError>(())
//! ```

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::command::{
    decode_device_field, device_field_len, AccessUnit, McRequest, CMD_BATCH_READ,
    CMD_BATCH_WRITE, CMD_CPU_MODEL_READ, CMD_RANDOM_READ, CMD_RANDOM_WRITE, CMD_REMOTE_PAUSE,
    CMD_REMOTE_RESET, CMD_REMOTE_RUN, CMD_REMOTE_STOP,
};
use crate::cpu::{CpuMode, CpuModeCell};
use crate::device::DeviceKind;
use crate::engine::LadderEngine;
use crate::error::{McError, Result};
use crate::frame::{self, FrameDirection, FrameMeta, PlcSeries};
use crate::memory::DeviceMemory;
use crate::program::LadderProgram;
use crate::response::McResponse;
use crate::utils;

/// Poll interval for connection handlers to observe a server shutdown.
const HANDLER_POLL: Duration = Duration::from_millis(500);

/// Configuration for creating a mock server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port (0 picks an ephemeral port).
    pub port: u16,
    /// Frame family served and device address spaces simulated.
    pub series: PlcSeries,
    /// CPU model name reported by the model-read command.
    pub model: String,
    /// Ladder scan period.
    pub scan_period: Duration,
}

impl ServerConfig {
    /// Creates a Q-series configuration for the given endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let series = PlcSeries::QSeries;
        Self {
            host: host.into(),
            port,
            series,
            model: series.default_model().to_string(),
            scan_period: crate::engine::DEFAULT_SCAN_PERIOD,
        }
    }

    /// Selects the frame family; also resets the model name to the
    /// series default.
    pub fn with_series(mut self, series: PlcSeries) -> Self {
        self.series = series;
        self.model = series.default_model().to_string();
        self
    }

    /// Overrides the reported CPU model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Overrides the ladder scan period.
    pub fn with_scan_period(mut self, period: Duration) -> Self {
        self.scan_period = period;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 5000)
    }
}

/// State shared by the accept loop and every connection handler.
struct Shared {
    series: PlcSeries,
    model: String,
    memory: Arc<DeviceMemory>,
    engine: Arc<LadderEngine>,
    mode: CpuModeCell,
    running: AtomicBool,
}

/// Mock MELSEC PLC: MC server plus ladder engine over shared memory.
pub struct MockPlcServer {
    host: String,
    port: u16,
    shared: Arc<Shared>,
    local_addr: Mutex<Option<SocketAddr>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MockPlcServer {
    /// Creates a server; `start` binds the listener.
    pub fn new(config: ServerConfig) -> Self {
        let memory = Arc::new(DeviceMemory::new(config.series));
        let mode = CpuModeCell::new();
        let engine = Arc::new(
            LadderEngine::new(Arc::clone(&memory), mode.clone())
                .with_scan_period(config.scan_period),
        );
        Self {
            host: config.host,
            port: config.port,
            shared: Arc::new(Shared {
                series: config.series,
                model: config.model,
                memory,
                engine,
                mode,
                running: AtomicBool::new(false),
            }),
            local_addr: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the bind fails.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().unwrap();
        if handle.is_some() {
            return Ok(());
        }

        let listener = TcpListener::bind((self.host.as_str(), self.port))?;
        let addr = listener.local_addr()?;
        *self.local_addr.lock().unwrap() = Some(addr);
        self.shared.running.store(true, Ordering::SeqCst);
        info!(
            "mock PLC listening on {} ({} series, model {})",
            addr, self.shared.series, self.shared.model
        );

        let shared = Arc::clone(&self.shared);
        *handle = Some(thread::spawn(move || {
            for stream in listener.incoming() {
                if !shared.running.load(Ordering::SeqCst) {
                    break;
                }
                match stream {
                    Ok(stream) => {
                        let shared = Arc::clone(&shared);
                        thread::spawn(move || handle_connection(shared, stream));
                    }
                    Err(e) => {
                        if shared.running.load(Ordering::SeqCst) {
                            warn!("accept failed: {}", e);
                        }
                    }
                }
            }
            debug!("accept loop exiting");
        }));
        Ok(())
    }

    /// Stops the server: halts the engine, closes the listener and joins
    /// the accept loop. Open connections close on their next poll.
    pub fn stop(&self) {
        let handle = self.handle.lock().unwrap().take();
        let Some(handle) = handle else {
            return;
        };
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.engine.stop();
        // unblock the accept loop with a throwaway connection
        if let Some(addr) = self.local_addr() {
            let _ = TcpStream::connect_timeout(&addr, Duration::from_millis(200));
        }
        let _ = handle.join();
        info!("mock PLC stopped");
    }

    /// The bound address, once started. With port 0 this reveals the
    /// ephemeral port picked by the OS.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap()
    }

    /// Returns whether the server is accepting connections.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// The frame family served.
    pub fn series(&self) -> PlcSeries {
        self.shared.series
    }

    /// Handle to the simulated device memory.
    pub fn device_memory(&self) -> Arc<DeviceMemory> {
        Arc::clone(&self.shared.memory)
    }

    /// Handle to the ladder engine.
    pub fn engine(&self) -> Arc<LadderEngine> {
        Arc::clone(&self.shared.engine)
    }

    /// Current CPU mode.
    pub fn cpu_mode(&self) -> CpuMode {
        self.shared.mode.get()
    }

    /// Loads a ladder program into the engine (engine must be stopped).
    pub fn load_program(&self, program: LadderProgram) -> Result<()> {
        self.shared.engine.load(program)
    }
}

impl Drop for MockPlcServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MockPlcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPlcServer")
            .field("series", &self.shared.series)
            .field("local_addr", &self.local_addr())
            .field("running", &self.is_running())
            .finish()
    }
}

fn handle_connection(shared: Arc<Shared>, mut stream: TcpStream) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    info!("client connected: {}", peer);
    let _ = stream.set_nodelay(true);
    let _ = stream.set_read_timeout(Some(HANDLER_POLL));

    while shared.running.load(Ordering::SeqCst) {
        match frame::read_frame(&mut stream, shared.series, FrameDirection::Request) {
            Ok(raw) => {
                let reply = shared.handle_frame(&raw);
                if stream.write_all(&reply).is_err() {
                    break;
                }
            }
            Err(McError::Timeout) => continue,
            Err(McError::ConnectionClosed) => break,
            Err(e) => {
                // framing is broken beyond recovery
                warn!("dropping {}: {}", peer, e);
                break;
            }
        }
    }
    info!("client disconnected: {}", peer);
}

impl Shared {
    fn handle_frame(&self, raw: &[u8]) -> Vec<u8> {
        match McRequest::decode(self.series, raw) {
            Ok(request) => {
                let reply_meta = FrameMeta {
                    network_no: request.meta.network_no,
                    pc_no: request.meta.pc_no,
                    ..FrameMeta::default()
                };
                let response = match self.process(&request) {
                    Ok(data) => McResponse::success(data),
                    Err(e) => {
                        debug!(
                            "command {:#06X}/{:#06X} failed: {}",
                            request.command, request.sub_command, e
                        );
                        McResponse::failure(e.end_code())
                    }
                };
                response.encode(self.series, &reply_meta, request.serial_no)
            }
            Err(e) => {
                debug!("malformed request: {}", e);
                McResponse::failure(e.end_code()).encode(
                    self.series,
                    &FrameMeta::default(),
                    0,
                )
            }
        }
    }

    fn process(&self, request: &McRequest) -> Result<Vec<u8>> {
        match request.command {
            CMD_BATCH_READ => self.batch_read(request),
            CMD_BATCH_WRITE => self.batch_write(request),
            CMD_RANDOM_READ => self.random_read(request),
            CMD_RANDOM_WRITE => self.random_write(request),
            CMD_CPU_MODEL_READ => Ok(self.model_bytes()),
            CMD_REMOTE_RUN => {
                self.engine.start();
                info!("remote RUN");
                Ok(Vec::new())
            }
            CMD_REMOTE_STOP => {
                self.engine.stop();
                info!("remote STOP");
                Ok(Vec::new())
            }
            CMD_REMOTE_PAUSE => {
                self.engine.pause();
                info!("remote PAUSE");
                Ok(Vec::new())
            }
            CMD_REMOTE_RESET => {
                self.engine.reset();
                info!("remote RESET");
                Ok(Vec::new())
            }
            command => Err(McError::InvalidCommand {
                command,
                sub_command: request.sub_command,
            }),
        }
    }

    /// Splits a batch payload into device, head and count.
    fn batch_target(&self, payload: &[u8]) -> Result<(DeviceKind, u32, u16, usize)> {
        let field_len = device_field_len(self.series);
        if payload.len() < field_len + 2 {
            return Err(McError::protocol(format!(
                "batch payload carries {} bytes, at least {} required",
                payload.len(),
                field_len + 2
            )));
        }
        let (kind, head) = decode_device_field(self.series, payload)?;
        let count = u16::from_le_bytes([payload[field_len], payload[field_len + 1]]);
        Ok((kind, head, count, field_len + 2))
    }

    fn batch_read(&self, request: &McRequest) -> Result<Vec<u8>> {
        let unit = AccessUnit::from_sub_command(request.command, request.sub_command)?;
        let (kind, head, count, _) = self.batch_target(&request.payload)?;
        debug!("batch read {}{} x{} ({:?})", kind, head, count, unit);
        match unit {
            AccessUnit::Bit => {
                let bits = self.memory.read_bits(kind, head, count)?;
                Ok(utils::pack_bits(&bits))
            }
            AccessUnit::Word => {
                let words = self.memory.read_words(kind, head, count)?;
                Ok(utils::words_to_bytes(&words))
            }
        }
    }

    fn batch_write(&self, request: &McRequest) -> Result<Vec<u8>> {
        let unit = AccessUnit::from_sub_command(request.command, request.sub_command)?;
        let (kind, head, count, data_at) = self.batch_target(&request.payload)?;
        let data = &request.payload[data_at..];
        debug!("batch write {}{} x{} ({:?})", kind, head, count, unit);
        match unit {
            AccessUnit::Bit => {
                if data.len() != utils::packed_len(count as usize) {
                    return Err(McError::protocol(format!(
                        "{} bit points need {} data bytes, {} received",
                        count,
                        utils::packed_len(count as usize),
                        data.len()
                    )));
                }
                let bits = utils::unpack_bits(data, count as usize);
                self.memory.write_bits(kind, head, &bits)?;
            }
            AccessUnit::Word => {
                if data.len() != count as usize * 2 {
                    return Err(McError::protocol(format!(
                        "{} word points need {} data bytes, {} received",
                        count,
                        count as usize * 2,
                        data.len()
                    )));
                }
                self.memory
                    .write_words(kind, head, &utils::bytes_to_words(data))?;
            }
        }
        Ok(Vec::new())
    }

    fn random_read(&self, request: &McRequest) -> Result<Vec<u8>> {
        let payload = &request.payload;
        if payload.len() < 2 {
            return Err(McError::protocol("random read payload too short"));
        }
        let word_count = payload[0] as usize;
        let dword_count = payload[1] as usize;
        let field_len = device_field_len(self.series);
        let expected = 2 + (word_count + dword_count) * field_len;
        if payload.len() != expected {
            return Err(McError::protocol(format!(
                "random read payload carries {} bytes, {} required",
                payload.len(),
                expected
            )));
        }

        let mut data = Vec::with_capacity(word_count * 2 + dword_count * 4);
        let mut offset = 2;
        for _ in 0..word_count {
            let (kind, head) = decode_device_field(self.series, &payload[offset..])?;
            offset += field_len;
            let words = self.memory.read_words(kind, head, 1)?;
            data.extend_from_slice(&utils::words_to_bytes(&words));
        }
        for _ in 0..dword_count {
            let (kind, head) = decode_device_field(self.series, &payload[offset..])?;
            offset += field_len;
            let words = self.memory.read_words(kind, head, 2)?;
            data.extend_from_slice(&utils::words_to_bytes(&words));
        }
        Ok(data)
    }

    fn random_write(&self, request: &McRequest) -> Result<Vec<u8>> {
        let payload = &request.payload;
        if payload.len() < 2 {
            return Err(McError::protocol("random write payload too short"));
        }
        let word_count = payload[0] as usize;
        let dword_count = payload[1] as usize;
        let field_len = device_field_len(self.series);
        let expected = 2 + word_count * (field_len + 2) + dword_count * (field_len + 4);
        if payload.len() != expected {
            return Err(McError::protocol(format!(
                "random write payload carries {} bytes, {} required",
                payload.len(),
                expected
            )));
        }

        let mut offset = 2;
        for _ in 0..word_count {
            let (kind, head) = decode_device_field(self.series, &payload[offset..])?;
            offset += field_len;
            let value = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
            offset += 2;
            self.memory.write_words(kind, head, &[value])?;
        }
        for _ in 0..dword_count {
            let (kind, head) = decode_device_field(self.series, &payload[offset..])?;
            offset += field_len;
            let low = u16::from_le_bytes([payload[offset], payload[offset + 1]]);
            let high = u16::from_le_bytes([payload[offset + 2], payload[offset + 3]]);
            offset += 4;
            self.memory.write_words(kind, head, &[low, high])?;
        }
        Ok(Vec::new())
    }

    fn model_bytes(&self) -> Vec<u8> {
        let mut bytes = self.model.as_bytes().to_vec();
        bytes.truncate(16);
        bytes.resize(16, 0);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientConfig, PlcClient};
    use crate::device::{DeviceKind, DeviceRef};
    use crate::parser::parse_ladder_source;
    use std::io::Read;

    fn start_server(series: PlcSeries) -> MockPlcServer {
        let server = MockPlcServer::new(
            ServerConfig::new("127.0.0.1", 0)
                .with_series(series)
                .with_scan_period(Duration::from_millis(1)),
        );
        server.start().unwrap();
        server
    }

    fn connect(server: &MockPlcServer) -> PlcClient {
        let addr = server.local_addr().unwrap();
        PlcClient::connect(
            ClientConfig::new(addr.ip().to_string(), addr.port())
                .with_series(server.series())
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap()
    }

    #[test]
    fn test_word_write_then_read() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        client.write_word(DeviceKind::D, 0, 1234).unwrap();
        assert_eq!(client.read_word(DeviceKind::D, 0).unwrap(), 1234);

        client
            .write_words(DeviceKind::D, 100, &[1, 2, 3])
            .unwrap();
        assert_eq!(
            client.read_words(DeviceKind::D, 100, 3).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_bit_write_then_read() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        client
            .write_bits(DeviceKind::M, 0, &[true, false, true, true])
            .unwrap();
        assert_eq!(
            client.read_bits(DeviceKind::M, 0, 4).unwrap(),
            vec![true, false, true, true]
        );
        assert!(client.read_bit(DeviceKind::M, 3).unwrap());
        assert!(!client.read_bit(DeviceKind::M, 1).unwrap());
    }

    #[test]
    fn test_bit_as_word_over_the_wire() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        client.write_word(DeviceKind::M, 0, 0x8005).unwrap();
        assert!(client.read_bit(DeviceKind::M, 0).unwrap());
        assert!(client.read_bit(DeviceKind::M, 2).unwrap());
        assert!(client.read_bit(DeviceKind::M, 15).unwrap());
        assert_eq!(client.read_word(DeviceKind::M, 0).unwrap(), 0x8005);
    }

    #[test]
    fn test_dword_and_string_helpers() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        client
            .write_dword(DeviceKind::D, 10, 0xDEAD_BEEF)
            .unwrap();
        assert_eq!(client.read_dword(DeviceKind::D, 10).unwrap(), 0xDEAD_BEEF);
        assert_eq!(client.read_word(DeviceKind::D, 10).unwrap(), 0xBEEF);

        client
            .write_string(DeviceKind::D, 200, "PRODUCT-001", 12)
            .unwrap();
        assert_eq!(
            client.read_string(DeviceKind::D, 200, 12).unwrap(),
            "PRODUCT-001"
        );
    }

    #[test]
    fn test_random_read_write() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        client
            .random_write(
                &[
                    (DeviceRef::new(DeviceKind::D, 0), 11),
                    (DeviceRef::new(DeviceKind::W, 0x10), 22),
                ],
                &[(DeviceRef::new(DeviceKind::D, 50), 0x0001_0002)],
            )
            .unwrap();

        let (words, dwords) = client
            .random_read(
                &[
                    DeviceRef::new(DeviceKind::D, 0),
                    DeviceRef::new(DeviceKind::W, 0x10),
                ],
                &[DeviceRef::new(DeviceKind::D, 50)],
            )
            .unwrap();
        assert_eq!(words, vec![11, 22]);
        assert_eq!(dwords, vec![0x0001_0002]);
    }

    #[test]
    fn test_cpu_model_read() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);
        assert_eq!(client.read_cpu_model().unwrap(), "Q03UD");
    }

    #[test]
    fn test_4e_roundtrip() {
        let server = start_server(PlcSeries::IqrSeries);
        let mut client = connect(&server);

        client.write_word(DeviceKind::D, 40_000, 7).unwrap();
        assert_eq!(client.read_word(DeviceKind::D, 40_000).unwrap(), 7);
        assert_eq!(client.read_cpu_model().unwrap(), "R04CPU");
    }

    #[test]
    fn test_bad_range_keeps_connection_usable() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        let err = client.read_words(DeviceKind::D, 20_000, 4).unwrap_err();
        assert!(matches!(err, McError::EndCode { code: 0xC056 }));

        // the connection survives the error reply
        client.write_word(DeviceKind::D, 1, 5).unwrap();
        assert_eq!(client.read_word(DeviceKind::D, 1).unwrap(), 5);
    }

    #[test]
    fn test_remote_control_drives_engine() {
        let server = start_server(PlcSeries::QSeries);
        server
            .load_program(parse_ladder_source("LD X0\nOUT Y0\nEND\n", "latch").unwrap())
            .unwrap();
        let memory = server.device_memory();
        let mut client = connect(&server);

        assert_eq!(server.cpu_mode(), CpuMode::Stop);
        client.remote_run().unwrap();
        assert_eq!(server.cpu_mode(), CpuMode::Run);

        client.write_bit(DeviceKind::X, 0, true).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(client.read_bit(DeviceKind::Y, 0).unwrap());

        client.remote_stop().unwrap();
        assert_eq!(server.cpu_mode(), CpuMode::Stop);
        assert!(!server.engine().is_running());

        client.remote_pause().unwrap();
        assert_eq!(server.cpu_mode(), CpuMode::Pause);

        client.remote_reset().unwrap();
        assert_eq!(server.cpu_mode(), CpuMode::Stop);
        assert_eq!(client.read_word(DeviceKind::D, 0).unwrap(), 0);
        assert!(!client.read_bit(DeviceKind::Y, 0).unwrap());
        assert!(!memory.read_bit(DeviceKind::X, 0).unwrap());
    }

    #[test]
    fn test_test_connection_ping() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);
        assert!(client.test_connection());
    }

    #[test]
    fn test_reference_frame_end_to_end() {
        // raw 3E "read D0, 1 point" exchange, byte for byte
        let server = start_server(PlcSeries::QSeries);
        server
            .device_memory()
            .write_word(DeviceKind::D, 0, 0x04D2)
            .unwrap();

        let addr = server.local_addr().unwrap();
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream
            .write_all(&[
                0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x0C, 0x00, 0x10, 0x00, 0x01, 0x04,
                0x00, 0x00, 0x00, 0x00, 0x00, 0xA8, 0x01, 0x00,
            ])
            .unwrap();

        let mut reply = [0u8; 13];
        stream.read_exact(&mut reply).unwrap();
        assert_eq!(
            reply,
            [0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x04, 0x00, 0x00, 0x00, 0xD2, 0x04]
        );
    }

    #[test]
    fn test_unknown_device_code_end_code() {
        let server = start_server(PlcSeries::QSeries);
        let addr = server.local_addr().unwrap();
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        // same reference frame with device code 0x7F
        stream
            .write_all(&[
                0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x0C, 0x00, 0x10, 0x00, 0x01, 0x04,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x7F, 0x01, 0x00,
            ])
            .unwrap();

        let mut reply = [0u8; 11];
        stream.read_exact(&mut reply).unwrap();
        // end code 0xC05C, no payload
        assert_eq!(reply[9..11], [0x5C, 0xC0]);
    }

    #[test]
    fn test_unknown_command_end_code() {
        let server = start_server(PlcSeries::QSeries);
        let mut client = connect(&server);

        // 0x0801 monitor registration is not implemented by the mock;
        // craft it through the raw stream
        let addr = server.local_addr().unwrap();
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        stream
            .write_all(&[
                0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x06, 0x00, 0x10, 0x00, 0x01, 0x08,
                0x00, 0x00,
            ])
            .unwrap();
        let mut reply = [0u8; 11];
        stream.read_exact(&mut reply).unwrap();
        assert_eq!(reply[9..11], [0x59, 0xC0]);

        // and the regular client still works against the same server
        assert!(client.test_connection());
    }

    #[test]
    fn test_write_length_mismatch_end_code() {
        let server = start_server(PlcSeries::QSeries);
        let addr = server.local_addr().unwrap();
        let mut stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        // write 2 word points but carry only 2 data bytes
        stream
            .write_all(&[
                0x50, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x0E, 0x00, 0x10, 0x00, 0x01, 0x14,
                0x00, 0x00, 0x00, 0x00, 0x00, 0xA8, 0x02, 0x00, 0x34, 0x12,
            ])
            .unwrap();
        let mut reply = [0u8; 11];
        stream.read_exact(&mut reply).unwrap();
        assert_eq!(reply[9..11], [0x61, 0xC0]);
    }

    #[test]
    fn test_stop_shuts_down() {
        let server = start_server(PlcSeries::QSeries);
        let addr = server.local_addr().unwrap();
        let mut client = connect(&server);
        assert!(client.test_connection());

        server.stop();
        assert!(!server.is_running());

        // fresh connections are refused once the listener is gone
        thread::sleep(Duration::from_millis(100));
        assert!(TcpStream::connect_timeout(&addr, Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_concurrent_clients() {
        let server = start_server(PlcSeries::QSeries);
        let addr = server.local_addr().unwrap();

        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                thread::spawn(move || {
                    let mut client = PlcClient::connect(
                        ClientConfig::new(addr.ip().to_string(), addr.port())
                            .with_timeout(Duration::from_secs(2)),
                    )
                    .unwrap();
                    for round in 0..20u16 {
                        client
                            .write_word(DeviceKind::D, 1000 + i, round)
                            .unwrap();
                        assert_eq!(
                            client.read_word(DeviceKind::D, 1000 + i).unwrap(),
                            round
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
