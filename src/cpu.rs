//! CPU operating mode.
//!
//! A MELSEC CPU is always in exactly one of RUN, STOP or PAUSE. The mock
//! keeps that mode in a [`CpuModeCell`], a cheaply clonable handle shared
//! by the MC dispatcher (remote RUN/STOP/PAUSE/RESET commands) and the
//! ladder engine (which self-resets to STOP). RESET is momentary: it is an
//! operation that clears state and lands back in STOP, not a mode of its
//! own.

use std::sync::{Arc, Mutex};

/// CPU operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuMode {
    /// Scanning the ladder program.
    Run,
    /// Halted; outputs hold their last state in this mock.
    #[default]
    Stop,
    /// Halted with outputs held.
    Pause,
}

impl std::fmt::Display for CpuMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpuMode::Run => write!(f, "RUN"),
            CpuMode::Stop => write!(f, "STOP"),
            CpuMode::Pause => write!(f, "PAUSE"),
        }
    }
}

/// Shared handle to the process-wide CPU mode.
///
/// # Example
///
/// ```
/// use melsec_mock::{CpuMode, CpuModeCell};
///
/// let cell = CpuModeCell::new();
/// assert_eq!(cell.get(), CpuMode::Stop);
/// cell.set(CpuMode::Run);
/// assert_eq!(cell.get(), CpuMode::Run);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpuModeCell(Arc<Mutex<CpuMode>>);

impl CpuModeCell {
    /// Creates a cell in the initial STOP mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current mode.
    pub fn get(&self) -> CpuMode {
        *self.0.lock().unwrap()
    }

    /// Sets the mode.
    pub fn set(&self, mode: CpuMode) {
        *self.0.lock().unwrap() = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_mode_is_stop() {
        assert_eq!(CpuModeCell::new().get(), CpuMode::Stop);
    }

    #[test]
    fn test_handles_share_state() {
        let a = CpuModeCell::new();
        let b = a.clone();
        a.set(CpuMode::Run);
        assert_eq!(b.get(), CpuMode::Run);
    }

    #[test]
    fn test_display() {
        assert_eq!(CpuMode::Run.to_string(), "RUN");
        assert_eq!(CpuMode::Stop.to_string(), "STOP");
        assert_eq!(CpuMode::Pause.to_string(), "PAUSE");
    }
}
