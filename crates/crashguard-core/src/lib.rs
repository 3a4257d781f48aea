//! # crashguard-core
//!
//! Fatal signal and uncaught panic capture for Unix processes.
//!
//! One early call to [`CrashGuard::perform`] turns otherwise silent crashes
//! into a short report on standard error followed by a well-defined death:
//!
//! - **Fatal signals** (`SIGQUIT`, `SIGILL`, `SIGTRAP`, `SIGABRT`, `SIGFPE`,
//!   `SIGBUS`, `SIGSEGV`, `SIGSYS`): the signal name and a stack trace are
//!   written with raw `write(2)` calls, then the process kills itself with
//!   `SIGKILL` (or re-raises the signal with its default action, see
//!   [`TerminationMode`]).
//! - **Uncaught panics**: one log line with the panic message and location,
//!   then exit status `-1`.
//!
//! ## Why unsafe code is needed
//!
//! Signal dispositions, raw file descriptor writes and stack capture are only
//! reachable through `libc`. The signal handler additionally has to stay
//! within the async-signal-safe subset of the C library: no allocation, no
//! locks, no buffered I/O. We wrap these calls in safe functions, but the
//! calls themselves must be `unsafe`.
//!
//! ## Platform Support
//!
//! - **Linux (glibc)** and **Apple platforms**: full reports, including
//!   symbolized stack frames from `backtrace_symbols_fd(3)`
//! - **Other Unix**: signal reports without stack frames
//! - **Windows**: not supported

#![allow(unsafe_code)] // Required for sigaction, write(2) and backtrace(3)

#[cfg(not(unix))]
compile_error!("crashguard-core supports Unix targets only");

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod guard;
pub mod handler;
pub mod host;
pub mod panic;
pub mod prelude;
pub mod signals;

pub use config::{GuardConfig, TerminationMode};
pub use error::{CrashGuardError, CrashGuardResult};
pub use guard::{CrashGuard, GuardState};
pub use host::{HostServices, NoopHost};
pub use panic::UNCAUGHT_PANIC_EXIT_CODE;
pub use signals::{FatalSignal, InstallReport};
