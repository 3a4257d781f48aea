//! Installation of the shared handler for every signal in the fatal set.
//!
//! Each signal gets the same `sigaction` descriptor: the handler function
//! pointer, an empty additional block mask and no flags. No `SA_ONSTACK`
//! (there is no alternate stack), no `SA_RESTART`, no `SA_SIGINFO`, and no
//! `SA_NODEFER`, so the kernel blocks the signal being handled for the duration
//! of the handler and nothing else.
//!
//! A signal whose installation fails is logged and skipped; the remaining
//! signals are still installed. There is no uninstall.
//!
//! ## Stack overflow
//!
//! The Rust runtime installs its own `SIGSEGV`/`SIGBUS` handler, running on an
//! alternate stack, to print "has overflowed its stack". Installation replaces
//! it (it shows up as the `previous` disposition). Without `SA_ONSTACK` the
//! kernel cannot push a frame for our handler onto an exhausted stack, so a
//! stack overflow kills the process with `SIGSEGV` and no report at all.

use std::{fmt, io, mem, ptr};

use libc::c_int;
use tracing::{debug, error, warn};

use super::FatalSignal;
use crate::diagnostic;
use crate::handler::{self, SignalHandler};

/// What a signal was doing before we replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition
{
    /// `SIG_DFL`: the kernel's default action.
    Default,
    /// `SIG_IGN`: the signal was ignored.
    Ignore,
    /// Another handler was installed at this address.
    Handler(usize),
}

impl Disposition
{
    fn from_raw(handler: libc::sighandler_t) -> Self
    {
        match handler {
            libc::SIG_DFL => Disposition::Default,
            libc::SIG_IGN => Disposition::Ignore,
            address => Disposition::Handler(address),
        }
    }
}

impl fmt::Display for Disposition
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Disposition::Default => f.write_str("default"),
            Disposition::Ignore => f.write_str("ignore"),
            Disposition::Handler(address) => write!(f, "handler@0x{address:x}"),
        }
    }
}

/// A successfully installed signal and the disposition it replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec
{
    /// The signal now routed to the fatal signal handler.
    pub signal: FatalSignal,
    /// The disposition in place before installation.
    pub previous: Disposition,
}

/// A signal whose installation failed.
#[derive(Debug)]
pub struct InstallFailure
{
    /// The signal that kept its previous disposition.
    pub signal: FatalSignal,
    /// The OS error reported by `sigaction`.
    pub error: io::Error,
}

/// Outcome of one registry pass.
#[derive(Debug, Default)]
pub struct InstallReport
{
    /// Installed signals, in installation order.
    pub installed: Vec<SignalSpec>,
    /// Signals that could not be installed.
    pub failures: Vec<InstallFailure>,
}

impl InstallReport
{
    /// `true` when every signal in the fatal set was installed.
    pub fn is_complete(&self) -> bool
    {
        self.failures.is_empty() && self.installed.len() == FatalSignal::ALL.len()
    }

    /// `true` when `signal` is routed to the fatal signal handler.
    pub fn covers(&self, signal: FatalSignal) -> bool
    {
        self.installed.iter().any(|spec| spec.signal == signal)
    }
}

/// Build the `sigaction` descriptor shared by every fatal signal.
///
/// The additional block mask is cleared with `sigemptyset`. If that fails the
/// handler's behaviour during a crash is unknown, so the process is aborted
/// on the spot rather than continuing with an untrustworthy crash handler.
pub fn prepare_action(handler: SignalHandler) -> libc::sigaction
{
    // SAFETY: `sigaction` is a plain C struct; all-zero is a valid starting
    // value (no flags, SIG_DFL, and on Linux a null restorer).
    let mut action: libc::sigaction = unsafe { mem::zeroed() };

    // SAFETY: `sa_mask` is a valid, exclusively borrowed sigset_t.
    if unsafe { libc::sigemptyset(&mut action.sa_mask) } != 0 {
        let err = io::Error::last_os_error();
        error!(error = %err, "Cannot clear the crash handler signal mask, aborting");
        std::process::abort();
    }

    action.sa_sigaction = handler as libc::sighandler_t;
    action.sa_flags = 0;
    action
}

/// Point `signal` at `action`, returning the disposition it replaced.
///
/// ## Errors
///
/// Returns the OS error from `sigaction(2)` (typically `EINVAL`).
pub fn install_handler(signal: FatalSignal, action: &libc::sigaction) -> io::Result<SignalSpec>
{
    // SAFETY: zeroed sigaction is valid output storage for the old action.
    let mut previous: libc::sigaction = unsafe { mem::zeroed() };

    // SAFETY: both pointers reference live, properly initialised structs.
    let rc = unsafe { libc::sigaction(signal.raw(), action, &mut previous) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(SignalSpec {
        signal,
        previous: Disposition::from_raw(previous.sa_sigaction),
    })
}

/// Install the fatal signal handler for every signal in the fatal set.
///
/// Failures are logged with the signal name and OS error and do not stop the
/// remaining installations.
pub fn install_fatal_handlers() -> InstallReport
{
    install_all(handler::fatal_signal_handler)
}

pub(crate) fn install_all(handler: SignalHandler) -> InstallReport
{
    // The first backtrace(3) call may dlopen the unwinder, which is not
    // async-signal-safe. Do it now, outside any signal context.
    diagnostic::prime_unwinder();

    let action = prepare_action(handler);
    install_signals(&FatalSignal::ALL, |signal| install_handler(signal, &action))
}

/// Run `install` for each of `signals` in order, recording every outcome.
pub(crate) fn install_signals<F>(signals: &[FatalSignal], mut install: F) -> InstallReport
where
    F: FnMut(FatalSignal) -> io::Result<SignalSpec>,
{
    let mut report = InstallReport::default();

    for &signal in signals {
        match install(signal) {
            Ok(spec) => {
                debug!(signal = %signal, previous = %spec.previous, "Installed fatal signal handler");
                report.installed.push(spec);
            }
            Err(err) => {
                warn!(signal = %signal, error = %err, "Failed to install handler for {}: {}", signal.name(), err);
                report.failures.push(InstallFailure { signal, error: err });
            }
        }
    }

    report
}

/// Read the current disposition of `signal` without changing it.
///
/// ## Errors
///
/// Returns the OS error from `sigaction(2)`.
pub fn current_disposition(signal: c_int) -> io::Result<Disposition>
{
    // SAFETY: zeroed sigaction is valid output storage.
    let mut current: libc::sigaction = unsafe { mem::zeroed() };

    // SAFETY: a null `act` only queries the disposition.
    let rc = unsafe { libc::sigaction(signal, ptr::null(), &mut current) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(Disposition::from_raw(current.sa_sigaction))
}

#[cfg(test)]
mod tests
{
    use serial_test::serial;

    use super::*;

    extern "C" fn noop_handler(_signum: c_int) {}

    /// Snapshot of the fatal set's actions, put back on drop so a real fault
    /// in a later test is not sent to `noop_handler` and retried forever.
    struct SavedActions(Vec<(c_int, libc::sigaction)>);

    impl SavedActions
    {
        fn capture() -> Self
        {
            let saved = FatalSignal::ALL
                .iter()
                .map(|signal| {
                    // SAFETY: zeroed sigaction is valid output storage; a null
                    // `act` only reads the current action.
                    let mut action: libc::sigaction = unsafe { mem::zeroed() };
                    let rc = unsafe { libc::sigaction(signal.raw(), ptr::null(), &mut action) };
                    assert_eq!(rc, 0, "cannot read action for {signal}");
                    (signal.raw(), action)
                })
                .collect();
            Self(saved)
        }
    }

    impl Drop for SavedActions
    {
        fn drop(&mut self)
        {
            for (signal, action) in &self.0 {
                // SAFETY: `action` was filled in by sigaction for this signal.
                unsafe { libc::sigaction(*signal, action, ptr::null_mut()) };
            }
        }
    }

    #[test]
    fn test_disposition_from_raw()
    {
        assert_eq!(Disposition::from_raw(libc::SIG_DFL), Disposition::Default);
        assert_eq!(Disposition::from_raw(libc::SIG_IGN), Disposition::Ignore);
        assert_eq!(Disposition::from_raw(0x1000), Disposition::Handler(0x1000));
    }

    #[test]
    fn test_prepare_action_has_no_flags_and_empty_mask()
    {
        let action = prepare_action(noop_handler);
        assert_eq!(action.sa_flags, 0);
        assert_eq!(action.sa_sigaction, noop_handler as libc::sighandler_t);
        for signal in FatalSignal::ALL {
            // SAFETY: sa_mask was initialised by sigemptyset.
            let member = unsafe { libc::sigismember(&action.sa_mask, signal.raw()) };
            assert_eq!(member, 0, "{signal} unexpectedly blocked");
        }
    }

    #[test]
    #[serial]
    fn test_install_reports_previous_disposition()
    {
        let _saved = SavedActions::capture();
        let action = prepare_action(noop_handler);
        let first = install_handler(FatalSignal::Trap, &action).unwrap();
        assert_eq!(first.signal, FatalSignal::Trap);

        let second = install_handler(FatalSignal::Trap, &action).unwrap();
        assert_eq!(second.previous, Disposition::Handler(noop_handler as usize));
        assert_eq!(
            current_disposition(libc::SIGTRAP).unwrap(),
            Disposition::Handler(noop_handler as usize)
        );
    }

    #[test]
    #[serial]
    fn test_install_all_covers_fatal_set_only()
    {
        let _saved = SavedActions::capture();
        let before = current_disposition(libc::SIGUSR2).unwrap();
        let report = install_all(noop_handler);

        assert!(report.is_complete(), "failures: {:?}", report.failures);
        for signal in FatalSignal::ALL {
            assert!(report.covers(signal));
        }
        assert_eq!(current_disposition(libc::SIGUSR2).unwrap(), before);
    }

    #[test]
    #[serial]
    fn test_install_failure_is_recorded_and_rest_still_install()
    {
        let _saved = SavedActions::capture();
        let action = prepare_action(noop_handler);

        // Route SIGILL's installation at SIGKILL, which sigaction always rejects.
        let report = install_signals(&FatalSignal::ALL, |signal| {
            if signal == FatalSignal::IllegalInstruction {
                // SAFETY: `action` is a fully initialised descriptor.
                let rc = unsafe { libc::sigaction(libc::SIGKILL, &action, ptr::null_mut()) };
                assert_eq!(rc, -1);
                return Err(io::Error::last_os_error());
            }
            install_handler(signal, &action)
        });

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].signal, FatalSignal::IllegalInstruction);
        assert_eq!(report.failures[0].error.raw_os_error(), Some(libc::EINVAL));
        assert!(!report.is_complete());

        assert_eq!(report.installed.len(), FatalSignal::ALL.len() - 1);
        for signal in FatalSignal::ALL.into_iter().skip(2) {
            assert!(report.covers(signal), "{signal} not installed after the failure");
            assert_eq!(
                current_disposition(signal.raw()).unwrap(),
                Disposition::Handler(noop_handler as usize)
            );
        }
    }

    #[test]
    fn test_report_coverage_helpers()
    {
        let mut report = InstallReport::default();
        assert!(!report.is_complete());
        assert!(!report.covers(FatalSignal::Abort));

        report.installed.push(SignalSpec {
            signal: FatalSignal::Abort,
            previous: Disposition::Default,
        });
        report.failures.push(InstallFailure {
            signal: FatalSignal::Bus,
            error: io::Error::from_raw_os_error(libc::EINVAL),
        });
        assert!(report.covers(FatalSignal::Abort));
        assert!(!report.covers(FatalSignal::Bus));
        assert!(!report.is_complete());
    }
}
