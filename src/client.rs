//! MC protocol client.
//!
//! [`PlcClient`] opens a TCP connection to a PLC (real or
//! [`MockPlcServer`](crate::MockPlcServer)), keeps it open across calls,
//! frames requests for the configured series and decodes the replies into
//! typed results. Each operation is exactly one request and one reply; the
//! client never retries or reconnects on its own.
//!
//! # Example
//!
//! ```no_run
//! use melsec_mock::{ClientConfig, DeviceKind, PlcClient, PlcSeries};
//!
//! let config = ClientConfig::new("192.168.3.250", 5007).with_series(PlcSeries::IqrSeries);
//! let mut client = PlcClient::connect(config)?;
//!
//! client.write_word(DeviceKind::D, 100, 1234)?;
//! assert_eq!(client.read_word(DeviceKind::D, 100)?, 1234);
//!
//! client.write_bit(DeviceKind::M, 0, true)?;
//! let bits = client.read_bits(DeviceKind::M, 0, 4)?;
//!
//! println!("CPU: {}", client.read_cpu_model()?);
//! client.remote_run()?;
//! # Ok::<(), melsec_mock::McError>(())
//! ```

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use log::debug;

use crate::command::{
    AccessUnit, BatchReadRequest, BatchWriteRequest, CpuModelReadRequest, RandomReadRequest,
    RandomWriteRequest, RemoteCommand, RemoteControlRequest, WriteData,
};
use crate::device::{DeviceKind, DeviceRef};
use crate::error::{McError, Result};
use crate::frame::{self, FrameDirection, FrameMeta, PlcSeries, DEFAULT_MONITORING_TIMER};
use crate::response::McResponse;

/// Default client communication timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for creating an MC client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// PLC host name or address.
    pub host: String,
    /// PLC TCP port.
    pub port: u16,
    /// Frame family to speak.
    pub series: PlcSeries,
    /// Read/write timeout.
    pub timeout: Duration,
    /// Routing fields placed in every request.
    pub meta: FrameMeta,
    /// Monitoring timer field, in 250 ms units.
    pub monitoring_timer: u16,
}

impl ClientConfig {
    /// Creates a configuration for the given endpoint with Q-series
    /// framing and default routing.
    ///
    /// # Example
    ///
    /// ```
    /// use melsec_mock::ClientConfig;
    ///
    /// let config = ClientConfig::new("127.0.0.1", 5000);
    /// assert_eq!(config.port, 5000);
    /// ```
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            series: PlcSeries::QSeries,
            timeout: DEFAULT_TIMEOUT,
            meta: FrameMeta::default(),
            monitoring_timer: DEFAULT_MONITORING_TIMER,
        }
    }

    /// Selects the frame family (default: Q series / 3E).
    pub fn with_series(mut self, series: PlcSeries) -> Self {
        self.series = series;
        self
    }

    /// Sets a custom timeout (default: 3 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the network number routing field.
    pub fn with_network_no(mut self, network_no: u8) -> Self {
        self.meta.network_no = network_no;
        self
    }

    /// Sets the PC number routing field.
    pub fn with_pc_no(mut self, pc_no: u8) -> Self {
        self.meta.pc_no = pc_no;
        self
    }

    /// Sets the destination module I/O number routing field.
    pub fn with_dest_module_io(mut self, io: u16) -> Self {
        self.meta.dest_module_io = io;
        self
    }

    /// Sets the monitoring timer field (units of 250 ms).
    pub fn with_monitoring_timer(mut self, timer: u16) -> Self {
        self.monitoring_timer = timer;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 5000)
    }
}

/// MC protocol client over a persistent TCP connection.
pub struct PlcClient {
    stream: TcpStream,
    series: PlcSeries,
    meta: FrameMeta,
    monitoring_timer: u16,
    serial_no: u16,
}

impl PlcClient {
    /// Connects to the PLC.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the TCP connection cannot be established
    /// or configured.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect((config.host.as_str(), config.port))?;
        stream.set_read_timeout(Some(config.timeout))?;
        stream.set_write_timeout(Some(config.timeout))?;
        stream.set_nodelay(true)?;
        debug!("connected to {}:{} ({})", config.host, config.port, config.series);

        Ok(Self {
            stream,
            series: config.series,
            meta: config.meta,
            monitoring_timer: config.monitoring_timer,
            serial_no: 0,
        })
    }

    /// Closes the connection.
    pub fn disconnect(self) -> Result<()> {
        self.stream.shutdown(Shutdown::Both)?;
        Ok(())
    }

    /// The frame family this client speaks.
    pub fn series(&self) -> PlcSeries {
        self.series
    }

    fn next_serial(&mut self) -> u16 {
        self.serial_no = self.serial_no.wrapping_add(1);
        self.serial_no
    }

    fn transact(&mut self, request: &[u8], serial_no: u16) -> Result<McResponse> {
        self.stream.write_all(request).map_err(|e| match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => McError::Timeout,
            std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => McError::ConnectionClosed,
            _ => McError::Io(e),
        })?;

        let raw = frame::read_frame(&mut self.stream, self.series, FrameDirection::Response)?;
        let response = McResponse::decode(self.series, &raw)?;
        if self.series == PlcSeries::IqrSeries {
            response.check_serial(serial_no)?;
        }
        response.check_end_code()?;
        Ok(response)
    }

    /// Reads `count` words starting at `(kind, head)`.
    ///
    /// Reading a bit class in word units yields 16 bits per word.
    pub fn read_words(&mut self, kind: DeviceKind, head: u32, count: u16) -> Result<Vec<u16>> {
        let serial_no = self.next_serial();
        let request = BatchReadRequest::new(kind, head, count, AccessUnit::Word)?.encode(
            self.series,
            &self.meta,
            serial_no,
            self.monitoring_timer,
        );
        let response = self.transact(&request, serial_no)?;
        Ok(response.to_words())
    }

    /// Reads a single word.
    pub fn read_word(&mut self, kind: DeviceKind, head: u32) -> Result<u16> {
        Ok(self.read_words(kind, head, 1)?.first().copied().unwrap_or(0))
    }

    /// Writes consecutive words starting at `(kind, head)`.
    pub fn write_words(&mut self, kind: DeviceKind, head: u32, values: &[u16]) -> Result<()> {
        let serial_no = self.next_serial();
        let request = BatchWriteRequest::new(kind, head, WriteData::Words(values.to_vec()))?
            .encode(self.series, &self.meta, serial_no, self.monitoring_timer);
        self.transact(&request, serial_no)?;
        Ok(())
    }

    /// Writes a single word.
    pub fn write_word(&mut self, kind: DeviceKind, head: u32, value: u16) -> Result<()> {
        self.write_words(kind, head, &[value])
    }

    /// Reads `count` bits starting at `(kind, head)`.
    pub fn read_bits(&mut self, kind: DeviceKind, head: u32, count: u16) -> Result<Vec<bool>> {
        let serial_no = self.next_serial();
        let request = BatchReadRequest::new(kind, head, count, AccessUnit::Bit)?.encode(
            self.series,
            &self.meta,
            serial_no,
            self.monitoring_timer,
        );
        let response = self.transact(&request, serial_no)?;
        Ok(response.to_bits(count as usize))
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self, kind: DeviceKind, head: u32) -> Result<bool> {
        Ok(self.read_bits(kind, head, 1)?.first().copied().unwrap_or(false))
    }

    /// Writes consecutive bits starting at `(kind, head)`.
    pub fn write_bits(&mut self, kind: DeviceKind, head: u32, values: &[bool]) -> Result<()> {
        let serial_no = self.next_serial();
        let request = BatchWriteRequest::new(kind, head, WriteData::Bits(values.to_vec()))?
            .encode(self.series, &self.meta, serial_no, self.monitoring_timer);
        self.transact(&request, serial_no)?;
        Ok(())
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, kind: DeviceKind, head: u32, value: bool) -> Result<()> {
        self.write_bits(kind, head, &[value])
    }

    /// Reads a double word (two consecutive registers, low word first).
    pub fn read_dword(&mut self, kind: DeviceKind, head: u32) -> Result<u32> {
        let words = self.read_words(kind, head, 2)?;
        let low = words.first().copied().unwrap_or(0);
        let high = words.get(1).copied().unwrap_or(0);
        Ok(u32::from(high) << 16 | u32::from(low))
    }

    /// Writes a double word (low word first).
    pub fn write_dword(&mut self, kind: DeviceKind, head: u32, value: u32) -> Result<()> {
        self.write_words(kind, head, &[(value & 0xFFFF) as u16, (value >> 16) as u16])
    }

    /// Reads an ASCII string of `length` characters (two per word, low
    /// byte first), trimming trailing NUL padding.
    pub fn read_string(&mut self, kind: DeviceKind, head: u32, length: u16) -> Result<String> {
        let word_count = length.div_ceil(2);
        let words = self.read_words(kind, head, word_count)?;
        let mut text: String = words
            .iter()
            .flat_map(|w| [char::from((w & 0xFF) as u8), char::from((w >> 8) as u8)])
            .take(length as usize)
            .collect();
        while text.ends_with('\0') {
            text.pop();
        }
        Ok(text)
    }

    /// Writes an ASCII string NUL-padded to `length` characters.
    ///
    /// # Errors
    ///
    /// Returns a protocol error when the text is not ASCII.
    pub fn write_string(
        &mut self,
        kind: DeviceKind,
        head: u32,
        text: &str,
        length: u16,
    ) -> Result<()> {
        if !text.is_ascii() {
            return Err(McError::protocol("string payloads must be ASCII"));
        }
        let mut bytes = text.as_bytes()[..text.len().min(length as usize)].to_vec();
        bytes.resize(length as usize + length as usize % 2, 0);
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from(pair[0]) | u16::from(pair[1]) << 8)
            .collect();
        self.write_words(kind, head, &words)
    }

    /// Reads scattered word and double-word devices in one exchange.
    ///
    /// Returns the word values and double-word values in request order.
    pub fn random_read(
        &mut self,
        words: &[DeviceRef],
        dwords: &[DeviceRef],
    ) -> Result<(Vec<u16>, Vec<u32>)> {
        let serial_no = self.next_serial();
        let request = RandomReadRequest::new(words.to_vec(), dwords.to_vec())?.encode(
            self.series,
            &self.meta,
            serial_no,
            self.monitoring_timer,
        );
        let response = self.transact(&request, serial_no)?;
        let values = response.to_words();
        if values.len() < words.len() + dwords.len() * 2 {
            return Err(McError::protocol(format!(
                "random read reply carries {} words, {} expected",
                values.len(),
                words.len() + dwords.len() * 2
            )));
        }
        let word_values = values[..words.len()].to_vec();
        let dword_values = values[words.len()..]
            .chunks_exact(2)
            .map(|pair| u32::from(pair[1]) << 16 | u32::from(pair[0]))
            .collect();
        Ok((word_values, dword_values))
    }

    /// Writes scattered word and double-word devices in one exchange.
    pub fn random_write(
        &mut self,
        words: &[(DeviceRef, u16)],
        dwords: &[(DeviceRef, u32)],
    ) -> Result<()> {
        let serial_no = self.next_serial();
        let request = RandomWriteRequest::new(words.to_vec(), dwords.to_vec())?.encode(
            self.series,
            &self.meta,
            serial_no,
            self.monitoring_timer,
        );
        self.transact(&request, serial_no)?;
        Ok(())
    }

    /// Reads the CPU model name.
    pub fn read_cpu_model(&mut self) -> Result<String> {
        let serial_no = self.next_serial();
        let request =
            CpuModelReadRequest.encode(self.series, &self.meta, serial_no, self.monitoring_timer);
        let response = self.transact(&request, serial_no)?;
        Ok(response.to_text())
    }

    fn remote(&mut self, command: RemoteCommand) -> Result<()> {
        let serial_no = self.next_serial();
        let request = RemoteControlRequest::new(command).encode(
            self.series,
            &self.meta,
            serial_no,
            self.monitoring_timer,
        );
        self.transact(&request, serial_no)?;
        Ok(())
    }

    /// Switches the CPU to RUN; the ladder engine starts scanning.
    pub fn remote_run(&mut self) -> Result<()> {
        self.remote(RemoteCommand::Run)
    }

    /// Switches the CPU to STOP.
    pub fn remote_stop(&mut self) -> Result<()> {
        self.remote(RemoteCommand::Stop)
    }

    /// Switches the CPU to PAUSE.
    pub fn remote_pause(&mut self) -> Result<()> {
        self.remote(RemoteCommand::Pause)
    }

    /// Resets the CPU: device memory clears and the mode lands in STOP.
    pub fn remote_reset(&mut self) -> Result<()> {
        self.remote(RemoteCommand::Reset)
    }

    /// Pings the PLC by reading `D0`.
    pub fn test_connection(&mut self) -> bool {
        self.read_word(DeviceKind::D, 0).is_ok()
    }
}

impl std::fmt::Debug for PlcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlcClient")
            .field("series", &self.series)
            .field("peer", &self.stream.peer_addr().ok())
            .finish()
    }
}
