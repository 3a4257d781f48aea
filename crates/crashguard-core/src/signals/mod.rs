//! # Fatal Signals
//!
//! The fixed set of process-abort-class signals crashguard intercepts, and the
//! registry that points each of them at the shared fatal signal handler.
//!
//! ## The fatal set
//!
//! | Signal    | Typical cause                                   |
//! |-----------|-------------------------------------------------|
//! | `SIGQUIT` | Quit request from the terminal (`Ctrl-\`)       |
//! | `SIGILL`  | Illegal instruction, `ud2`, unsupported CPU     |
//! | `SIGTRAP` | Breakpoint instruction outside a debugger       |
//! | `SIGABRT` | `abort()`, double panics, failed C assertions   |
//! | `SIGFPE`  | Integer division by zero in foreign code        |
//! | `SIGBUS`  | Misaligned access, truncated `mmap`ed file      |
//! | `SIGSEGV` | Invalid memory access                           |
//! | `SIGSYS`  | Bad system call (e.g. blocked by seccomp)       |
//!
//! Every other signal keeps its existing disposition.

pub mod names;
pub mod registry;

use std::fmt;
use std::str::FromStr;

use libc::c_int;
pub use names::{signal_description, signal_from_name, signal_name};
pub use registry::{
    current_disposition, install_fatal_handlers, install_handler, prepare_action, Disposition, InstallFailure, InstallReport,
    SignalSpec,
};

use crate::error::{CrashGuardError, CrashGuardResult};

/// One of the signals in the fatal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalSignal
{
    /// `SIGQUIT`
    Quit,
    /// `SIGILL`
    IllegalInstruction,
    /// `SIGTRAP`
    Trap,
    /// `SIGABRT`
    Abort,
    /// `SIGFPE`
    FloatingPoint,
    /// `SIGBUS`
    Bus,
    /// `SIGSEGV`
    Segmentation,
    /// `SIGSYS`
    BadSystemCall,
}

impl FatalSignal
{
    /// The full fatal set, in installation order.
    pub const ALL: [FatalSignal; 8] = [
        FatalSignal::Quit,
        FatalSignal::IllegalInstruction,
        FatalSignal::Trap,
        FatalSignal::Abort,
        FatalSignal::FloatingPoint,
        FatalSignal::Bus,
        FatalSignal::Segmentation,
        FatalSignal::BadSystemCall,
    ];

    /// Raw platform signal number.
    pub const fn raw(self) -> c_int
    {
        match self {
            FatalSignal::Quit => libc::SIGQUIT,
            FatalSignal::IllegalInstruction => libc::SIGILL,
            FatalSignal::Trap => libc::SIGTRAP,
            FatalSignal::Abort => libc::SIGABRT,
            FatalSignal::FloatingPoint => libc::SIGFPE,
            FatalSignal::Bus => libc::SIGBUS,
            FatalSignal::Segmentation => libc::SIGSEGV,
            FatalSignal::BadSystemCall => libc::SIGSYS,
        }
    }

    /// Map a raw signal number back into the fatal set.
    ///
    /// Returns `None` for any signal outside the set.
    pub fn from_raw(raw: c_int) -> Option<Self>
    {
        Self::ALL.into_iter().find(|signal| signal.raw() == raw)
    }

    /// Symbolic name, e.g. `"SIGABRT"`.
    pub fn name(self) -> &'static str
    {
        signal_name(self.raw())
    }

    /// Human-readable description, e.g. `"Aborted"`.
    pub fn description(self) -> &'static str
    {
        signal_description(self.raw())
    }
}

impl fmt::Display for FatalSignal
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

impl From<FatalSignal> for c_int
{
    fn from(signal: FatalSignal) -> Self
    {
        signal.raw()
    }
}

impl TryFrom<c_int> for FatalSignal
{
    type Error = CrashGuardError;

    fn try_from(raw: c_int) -> Result<Self, Self::Error>
    {
        Self::from_raw(raw).ok_or_else(|| {
            CrashGuardError::InvalidSignal(format!("{} ({raw}) is not in the fatal signal set", signal_name(raw)))
        })
    }
}

impl FromStr for FatalSignal
{
    type Err = CrashGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        Self::try_from(parse_signal(s)?)
    }
}

/// Parse any signal the platform knows, by name (`"SIGUSR1"`, `"usr1"`) or
/// by number (`"10"`).
///
/// Unlike [`FatalSignal::from_str`] this accepts signals outside the fatal set.
///
/// ## Errors
///
/// Returns [`CrashGuardError::InvalidSignal`] for unknown names and for
/// numbers outside `1..NSIG`.
pub fn parse_signal(input: &str) -> CrashGuardResult<c_int>
{
    let trimmed = input.trim();
    if let Ok(number) = trimmed.parse::<c_int>() {
        // NSIG isn't exported on every platform; 64 covers Linux realtime signals.
        return if (1..=64).contains(&number) {
            Ok(number)
        } else {
            Err(CrashGuardError::InvalidSignal(format!("signal number {number} out of range")))
        };
    }

    signal_from_name(trimmed).ok_or_else(|| CrashGuardError::InvalidSignal(format!("unknown signal name: {trimmed}")))
}
