//! # Fatal Signal Handler
//!
//! The `extern "C"` function the kernel calls for every signal in the fatal
//! set. It writes the diagnostic report to standard error and then ends the
//! process. It never returns to the faulting context.
//!
//! ## Handler state
//!
//! The handler cannot take a lock to read its configuration, so the settings
//! it needs are mirrored into `static` atomics by [`configure`] before any
//! signal is installed. Lock-free atomic loads and stores are
//! async-signal-safe.
//!
//! Only the first fatal signal writes a report. Another thread faulting while
//! that report is being written parks in `pause(2)` until the reporting thread
//! terminates the process. A second fatal signal on the reporting thread itself
//! (the report faulting) skips the rest of the report and terminates at once.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::{mem, ptr};

use libc::c_int;

use crate::config::{GuardConfig, TerminationMode};
use crate::diagnostic::{self, MAX_FRAMES};

/// Signature of a handler installed through `sa_sigaction` without `SA_SIGINFO`.
pub type SignalHandler = extern "C" fn(c_int);

static TERMINATION: AtomicU8 = AtomicU8::new(TerminationMode::Kill.as_u8());
static FRAME_LIMIT: AtomicUsize = AtomicUsize::new(MAX_FRAMES);
static HANDLING: AtomicBool = AtomicBool::new(false);
static REPORTING_THREAD: AtomicUsize = AtomicUsize::new(0);

/// Publish `config` to the handler.
///
/// Must run before the handler is installed; [`crate::CrashGuard::perform`]
/// does this.
pub fn configure(config: &GuardConfig)
{
    TERMINATION.store(config.termination.as_u8(), Ordering::SeqCst);
    FRAME_LIMIT.store(config.max_frames.min(MAX_FRAMES), Ordering::SeqCst);
}

/// Termination mode the handler will use.
pub fn termination_mode() -> TerminationMode
{
    TerminationMode::from_u8(TERMINATION.load(Ordering::SeqCst))
}

/// Frame limit the handler will use.
pub fn frame_limit() -> usize
{
    FRAME_LIMIT.load(Ordering::SeqCst)
}

/// Handler installed for every fatal signal.
pub extern "C" fn fatal_signal_handler(signum: c_int)
{
    let this_thread = current_thread();

    if !HANDLING.swap(true, Ordering::SeqCst) {
        REPORTING_THREAD.store(this_thread, Ordering::SeqCst);
        diagnostic::write_signal_report(libc::STDERR_FILENO, signum, frame_limit());
    } else if REPORTING_THREAD.load(Ordering::SeqCst) != this_thread {
        wait_for_reporting_thread();
    }

    terminate(signum, termination_mode());
}

fn current_thread() -> usize
{
    // SAFETY: pthread_self only reads the calling thread's descriptor.
    unsafe { libc::pthread_self() as usize }
}

fn wait_for_reporting_thread() -> !
{
    loop {
        // SAFETY: pause(2) is async-signal-safe and takes no arguments.
        unsafe { libc::pause() };
    }
}

/// End the process after a fatal signal.
///
/// Async-signal-safe: only `sigaction`, `pthread_sigmask`, `raise`, `kill`,
/// `getpid` and `_exit` are called.
pub fn terminate(signum: c_int, mode: TerminationMode) -> !
{
    if mode == TerminationMode::Reraise {
        reraise_with_default(signum);
    }

    // SAFETY: kill/getpid/_exit are async-signal-safe and take no pointers.
    unsafe {
        libc::kill(libc::getpid(), libc::SIGKILL);
        // SIGKILL is delivered before kill() returns to a single-threaded
        // caller, but nothing guarantees that here.
        libc::_exit(128 + signum)
    }
}

fn reraise_with_default(signum: c_int)
{
    // SAFETY: all structs are zero-initialised locals; every call is
    // async-signal-safe.
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = libc::SIG_DFL;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(signum, &action, ptr::null_mut());

        // The kernel blocked `signum` on entry; unblock it so raise() delivers now.
        let mut unblock: libc::sigset_t = mem::zeroed();
        libc::sigemptyset(&mut unblock);
        libc::sigaddset(&mut unblock, signum);
        libc::pthread_sigmask(libc::SIG_UNBLOCK, &unblock, ptr::null_mut());

        libc::raise(signum);
    }
}

#[cfg(test)]
mod tests
{
    use std::env;
    use std::os::unix::process::ExitStatusExt;
    use std::process::Command;
    use std::thread;

    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_configure_publishes_settings()
    {
        configure(&GuardConfig::default().with_termination(TerminationMode::Reraise).with_max_frames(7));
        assert_eq!(termination_mode(), TerminationMode::Reraise);
        assert_eq!(frame_limit(), 7);

        configure(&GuardConfig::default());
        assert_eq!(termination_mode(), TerminationMode::Kill);
        assert_eq!(frame_limit(), MAX_FRAMES);
    }

    #[test]
    fn test_handler_has_not_fired()
    {
        assert!(!HANDLING.load(Ordering::SeqCst));
    }

    const CONCURRENT_CHILD_ENV: &str = "CRASHGUARD_CONCURRENT_FAULT_CHILD";

    /// Two threads enter the handler; the second must not cut the first
    /// thread's report short.
    fn run_two_faulting_threads() -> !
    {
        configure(&GuardConfig::default());
        diagnostic::prime_unwinder();

        let second = thread::spawn(|| {
            while !HANDLING.load(Ordering::SeqCst) {
                std::hint::spin_loop();
            }
            fatal_signal_handler(libc::SIGBUS);
        });
        let first = thread::spawn(|| fatal_signal_handler(libc::SIGSEGV));

        let _ = first.join();
        let _ = second.join();
        std::process::exit(0)
    }

    #[test]
    fn test_second_fatal_signal_waits_for_first_report()
    {
        if env::var_os(CONCURRENT_CHILD_ENV).is_some() {
            run_two_faulting_threads();
        }

        // Re-run just this test in a child process, which the handler kills.
        let output = Command::new(env::current_exe().unwrap())
            .args([
                "--exact",
                "handler::tests::test_second_fatal_signal_waits_for_first_report",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(CONCURRENT_CHILD_ENV, "1")
            .output()
            .unwrap();
        let stderr = String::from_utf8_lossy(&output.stderr);

        assert_eq!(output.status.signal(), Some(libc::SIGKILL), "{:?}\n{stderr}", output.status);
        assert_eq!(stderr.matches("Fatal signal").count(), 1, "{stderr}");
        assert!(
            stderr.contains(&format!("Fatal signal {} (SIGSEGV)", libc::SIGSEGV)),
            "{stderr}"
        );
        assert!(stderr.contains("Stack trace"), "report was cut short:\n{stderr}");
    }
}
