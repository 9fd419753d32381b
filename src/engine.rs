//! Ladder execution engine.
//!
//! [`LadderEngine`] runs the loaded [`LadderProgram`] in a scan loop: one
//! full pass from the first instruction to `END`, then sleep until the
//! next scan boundary. The default period is 10 ms and is a soft minimum -
//! an overrunning scan starts the next one immediately without
//! accumulating drift.
//!
//! Inputs are read from the shared [`DeviceMemory`] at the moment each
//! instruction executes, so MC writes arriving between instructions are
//! observed mid-scan, as on real hardware. The engine never takes a lock
//! across a whole scan.
//!
//! Timer and counter state (preset, current, edge memory) is private to
//! the engine, keyed by timer/counter number; only the resulting contact
//! bits and current values are published to `TC`/`TS`/`TN` and
//! `CC`/`CS`/`CN`. Pulse instructions remember the previous rung result
//! per *instruction index*, so two `PLS M0` in one program edge-detect
//! independently.
//!
//! Runtime faults never panic: division by zero (and any out-of-range
//! operand that slips past load-time validation) raises the `SM1`
//! diagnostic relay and the scan continues.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::cpu::{CpuMode, CpuModeCell};
use crate::device::{DeviceKind, DeviceRef};
use crate::error::{McError, Result};
use crate::memory::DeviceMemory;
use crate::program::{Instruction, LadderProgram, Operand};

/// Default scan period (soft minimum).
pub const DEFAULT_SCAN_PERIOD: Duration = Duration::from_millis(10);

/// `SM` relay raised when a scan hits an arithmetic or operand fault.
pub const DIAGNOSTIC_RELAY: u32 = 1;

#[derive(Debug, Clone, Default)]
struct TimerState {
    preset: u16,
    elapsed_ms: u64,
    running: bool,
    contact: bool,
}

#[derive(Debug, Clone, Default)]
struct CounterState {
    preset: u16,
    count: u16,
    contact: bool,
    prev_input: bool,
}

/// Engine state owned by the scan loop.
struct EngineCore {
    program: Arc<LadderProgram>,
    timers: HashMap<u16, TimerState>,
    counters: HashMap<u16, CounterState>,
    pulse_prev: HashMap<usize, bool>,
    scan_count: u64,
}

/// Scan-cycle interpreter over the shared device memory.
///
/// The engine is shared behind an [`Arc`]: the server dispatcher starts and
/// stops it from connection threads while the scan runs on its own thread.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use melsec_mock::{
///     CpuModeCell, DeviceKind, DeviceMemory, LadderEngine, LadderProgram, PlcSeries,
/// };
///
/// let memory = Arc::new(DeviceMemory::new(PlcSeries::QSeries));
/// let engine = LadderEngine::new(Arc::clone(&memory), CpuModeCell::new());
///
/// let program = LadderProgram::new("copy")
///     .ld("X0")?
///     .out("Y0")?
///     .end();
/// engine.load(program)?;
///
/// memory.write_bit(DeviceKind::X, 0, true)?;
/// engine.scan_once();
/// assert!(memory.read_bit(DeviceKind::Y, 0)?);
/// # Ok::<(), melsec_mock::McError>(())
/// ```
pub struct LadderEngine {
    memory: Arc<DeviceMemory>,
    mode: CpuModeCell,
    core: Mutex<EngineCore>,
    scan_period: Duration,
    stop_flag: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LadderEngine {
    /// Creates an engine over the given memory with an empty program.
    pub fn new(memory: Arc<DeviceMemory>, mode: CpuModeCell) -> Self {
        Self {
            memory,
            mode,
            core: Mutex::new(EngineCore {
                program: Arc::new(LadderProgram::new("")),
                timers: HashMap::new(),
                counters: HashMap::new(),
                pulse_prev: HashMap::new(),
                scan_count: 0,
            }),
            scan_period: DEFAULT_SCAN_PERIOD,
            stop_flag: AtomicBool::new(true),
            handle: Mutex::new(None),
        }
    }

    /// Sets a custom scan period.
    pub fn with_scan_period(mut self, period: Duration) -> Self {
        self.scan_period = period;
        self
    }

    /// The configured scan period.
    pub fn scan_period(&self) -> Duration {
        self.scan_period
    }

    /// Number of scans executed since the last load or reset.
    pub fn scan_count(&self) -> u64 {
        self.core.lock().unwrap().scan_count
    }

    /// Returns whether the scan thread is running.
    pub fn is_running(&self) -> bool {
        self.handle.lock().unwrap().is_some()
    }

    /// Loads a program, replacing the previous one.
    ///
    /// Timer, counter and pulse state is discarded: instruction indices of
    /// the new program have no relation to the old one.
    ///
    /// # Errors
    ///
    /// Returns an error while the engine is running; hot swap requires a
    /// stop first.
    pub fn load(&self, program: LadderProgram) -> Result<()> {
        if self.is_running() {
            return Err(McError::LadderRuntime {
                reason: "the engine must be stopped before loading a program".into(),
            });
        }
        let mut core = self.core.lock().unwrap();
        info!(
            "ladder program '{}' loaded ({} instructions)",
            program.name(),
            program.len()
        );
        core.program = Arc::new(program);
        core.timers.clear();
        core.counters.clear();
        core.pulse_prev.clear();
        core.scan_count = 0;
        Ok(())
    }

    /// Starts the scan thread and switches the CPU mode to RUN.
    ///
    /// A second start while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().unwrap();
        if handle.is_some() {
            return;
        }
        self.stop_flag.store(false, Ordering::SeqCst);
        self.mode.set(CpuMode::Run);

        let engine = Arc::clone(self);
        *handle = Some(thread::spawn(move || {
            info!("ladder engine running, scan period {:?}", engine.scan_period);
            let mut next = Instant::now() + engine.scan_period;
            while !engine.stop_flag.load(Ordering::SeqCst) {
                engine.scan_once();
                let now = Instant::now();
                if next > now {
                    thread::sleep(next - now);
                    next += engine.scan_period;
                } else {
                    // overrun: start the next scan immediately, realign
                    next = now + engine.scan_period;
                }
            }
            debug!("ladder engine thread exiting");
        }));
    }

    /// Stops the scan thread and switches the CPU mode to STOP.
    ///
    /// An in-flight scan completes to its next instruction boundary before
    /// the thread exits; outputs hold their last state.
    pub fn stop(&self) {
        self.halt(CpuMode::Stop);
    }

    /// Stops the scan thread and switches the CPU mode to PAUSE.
    pub fn pause(&self) {
        self.halt(CpuMode::Pause);
    }

    fn halt(&self, mode: CpuMode) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
            info!("ladder engine halted ({})", mode);
        }
        self.mode.set(mode);
    }

    /// Stops scanning, clears the device memory and all engine transients,
    /// and leaves the CPU in STOP.
    pub fn reset(&self) {
        self.halt(CpuMode::Stop);
        let mut core = self.core.lock().unwrap();
        core.timers.clear();
        core.counters.clear();
        core.pulse_prev.clear();
        core.scan_count = 0;
        drop(core);
        self.memory.reset_all();
        info!("ladder engine reset");
    }

    /// Executes exactly one scan.
    ///
    /// Public for deterministic stepping in tests and tools; the scan
    /// thread calls this on every cycle. Timers advance by the nominal
    /// scan period per call.
    pub fn scan_once(&self) {
        let mut core = self.core.lock().unwrap();
        core.scan_count += 1;
        let program = Arc::clone(&core.program);
        self.run_scan(&mut core, &program);
    }

    fn run_scan(&self, core: &mut EngineCore, program: &LadderProgram) {
        let scan_ms = self.scan_period.as_millis() as u64;
        let mut acc = false;
        let mut block_stack: Vec<bool> = Vec::new();
        let mut branch_stack: Vec<bool> = Vec::new();
        let mut rung_done = true;

        for (index, instruction) in program.instructions().iter().enumerate() {
            match instruction {
                Instruction::Ld(d) | Instruction::Ldi(d) => {
                    let mut value = self.read_contact(d);
                    if matches!(instruction, Instruction::Ldi(_)) {
                        value = !value;
                    }
                    if rung_done {
                        block_stack.clear();
                        branch_stack.clear();
                        rung_done = false;
                    } else {
                        // a new block within the rung: remember the one
                        // completed so far for ANB/ORB
                        block_stack.push(acc);
                    }
                    acc = value;
                }
                Instruction::And(d) => acc = acc && self.read_contact(d),
                Instruction::Ani(d) => acc = acc && !self.read_contact(d),
                Instruction::Or(d) => acc = acc || self.read_contact(d),
                Instruction::Ori(d) => acc = acc || !self.read_contact(d),
                Instruction::Anb => {
                    if let Some(block) = block_stack.pop() {
                        acc = block && acc;
                    }
                }
                Instruction::Orb => {
                    if let Some(block) = block_stack.pop() {
                        acc = block || acc;
                    }
                }
                Instruction::Mps => branch_stack.push(acc),
                Instruction::Mrd => {
                    if let Some(&top) = branch_stack.last() {
                        acc = top;
                    }
                }
                Instruction::Mpp => {
                    if let Some(top) = branch_stack.pop() {
                        acc = top;
                    }
                }
                Instruction::Out(d) => {
                    self.write_contact(d, acc);
                    rung_done = true;
                }
                Instruction::Set(d) => {
                    if acc {
                        self.write_contact(d, true);
                    }
                    rung_done = true;
                }
                Instruction::Rst(d) => {
                    if acc {
                        self.write_contact(d, false);
                        // resetting a timer/counter contact also clears its
                        // current value
                        match d.kind {
                            DeviceKind::TC => self.reset_timer(core, d.address as u16),
                            DeviceKind::CC => self.reset_counter(core, d.address as u16),
                            _ => {}
                        }
                    }
                    rung_done = true;
                }
                Instruction::Pls(d) => {
                    let prev = core.pulse_prev.insert(index, acc).unwrap_or(false);
                    self.write_contact(d, acc && !prev);
                    rung_done = true;
                }
                Instruction::Plf(d) => {
                    let prev = core.pulse_prev.insert(index, acc).unwrap_or(false);
                    self.write_contact(d, !acc && prev);
                    rung_done = true;
                }
                Instruction::OutT { timer, preset } => {
                    self.drive_timer(core, *timer, *preset, acc, scan_ms);
                    rung_done = true;
                }
                Instruction::OutC { counter, preset } => {
                    self.drive_counter(core, *counter, *preset, acc);
                    rung_done = true;
                }
                Instruction::RstT(timer) => {
                    if acc {
                        self.reset_timer(core, *timer);
                    }
                    rung_done = true;
                }
                Instruction::RstC(counter) => {
                    if acc {
                        self.reset_counter(core, *counter);
                    }
                    rung_done = true;
                }
                Instruction::Mov { src, dst } => {
                    if acc {
                        let value = self.resolve(src);
                        self.write_register(dst, value as u16);
                    }
                    rung_done = true;
                }
                Instruction::Add { a, b, dst } => {
                    if acc {
                        let value = self.resolve(a).wrapping_add(self.resolve(b));
                        self.write_register(dst, value as u16);
                    }
                    rung_done = true;
                }
                Instruction::Sub { a, b, dst } => {
                    if acc {
                        let value = self.resolve(a).wrapping_sub(self.resolve(b));
                        self.write_register(dst, value as u16);
                    }
                    rung_done = true;
                }
                Instruction::Mul { a, b, dst } => {
                    if acc {
                        let value = self.resolve(a).wrapping_mul(self.resolve(b));
                        self.write_register(dst, value as u16);
                    }
                    rung_done = true;
                }
                Instruction::Div { a, b, dst } => {
                    if acc {
                        let divisor = self.resolve(b);
                        if divisor == 0 {
                            // destination preserved, diagnostic relay raised
                            self.raise_diagnostic();
                        } else {
                            let value = self.resolve(a).wrapping_div(divisor);
                            self.write_register(dst, value as u16);
                        }
                    }
                    rung_done = true;
                }
                Instruction::End => break,
                Instruction::Nop => {}
            }
        }
    }

    fn read_contact(&self, device: &DeviceRef) -> bool {
        match self.memory.read_bit(device.kind, device.address) {
            Ok(value) => value,
            Err(_) => {
                self.raise_diagnostic();
                false
            }
        }
    }

    fn write_contact(&self, device: &DeviceRef, value: bool) {
        if self.memory.write_bit(device.kind, device.address, value).is_err() {
            self.raise_diagnostic();
        }
    }

    fn write_register(&self, device: &DeviceRef, value: u16) {
        if self.memory.write_word(device.kind, device.address, value).is_err() {
            self.raise_diagnostic();
        }
    }

    fn resolve(&self, operand: &Operand) -> i16 {
        match operand {
            Operand::Const(value) => *value,
            Operand::Device(device) => {
                match self.memory.read_word(device.kind, device.address) {
                    Ok(value) => value as i16,
                    Err(_) => {
                        self.raise_diagnostic();
                        0
                    }
                }
            }
        }
    }

    fn raise_diagnostic(&self) {
        let _ = self.memory.write_bit(DeviceKind::SM, DIAGNOSTIC_RELAY, true);
    }

    fn drive_timer(&self, core: &mut EngineCore, timer: u16, preset: u16, input: bool, scan_ms: u64) {
        let state = core.timers.entry(timer).or_default();
        state.preset = preset;
        let address = u32::from(timer);
        if input {
            state.running = true;
            state.elapsed_ms += scan_ms;
            // TN counts in 100 ms units and saturates at the preset
            let mut current = (state.elapsed_ms / 100) as u16;
            if current >= preset {
                current = preset;
                state.contact = true;
            }
            let contact = state.contact;
            let _ = self.memory.write_word(DeviceKind::TN, address, current);
            let _ = self.memory.write_bit(DeviceKind::TS, address, true);
            let _ = self.memory.write_bit(DeviceKind::TC, address, contact);
        } else {
            *state = TimerState {
                preset,
                ..TimerState::default()
            };
            let _ = self.memory.write_word(DeviceKind::TN, address, 0);
            let _ = self.memory.write_bit(DeviceKind::TS, address, false);
            let _ = self.memory.write_bit(DeviceKind::TC, address, false);
        }
    }

    fn drive_counter(&self, core: &mut EngineCore, counter: u16, preset: u16, input: bool) {
        let state = core.counters.entry(counter).or_default();
        state.preset = preset;
        let address = u32::from(counter);
        if input && !state.prev_input && !state.contact {
            state.count += 1;
            let count = state.count;
            let _ = self.memory.write_word(DeviceKind::CN, address, count);
            if count >= preset {
                state.contact = true;
                let _ = self.memory.write_bit(DeviceKind::CC, address, true);
            }
        }
        state.prev_input = input;
        let _ = self.memory.write_bit(DeviceKind::CS, address, input);
    }

    fn reset_timer(&self, core: &mut EngineCore, timer: u16) {
        core.timers.remove(&timer);
        let address = u32::from(timer);
        let _ = self.memory.write_word(DeviceKind::TN, address, 0);
        let _ = self.memory.write_bit(DeviceKind::TC, address, false);
        let _ = self.memory.write_bit(DeviceKind::TS, address, false);
    }

    fn reset_counter(&self, core: &mut EngineCore, counter: u16) {
        core.counters.remove(&counter);
        let address = u32::from(counter);
        let _ = self.memory.write_word(DeviceKind::CN, address, 0);
        let _ = self.memory.write_bit(DeviceKind::CC, address, false);
        let _ = self.memory.write_bit(DeviceKind::CS, address, false);
    }
}

impl std::fmt::Debug for LadderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LadderEngine")
            .field("scan_period", &self.scan_period)
            .field("running", &self.is_running())
            .finish()
    }
}
