//! Static signal name and description table.
//!
//! `strsignal(3)` may allocate or return a pointer into a buffer that another
//! thread is overwriting, so the fatal signal handler cannot use it. This
//! table holds the same text as glibc's descriptions in `'static` storage and
//! every lookup is a linear scan with no allocation and no locking, which keeps
//! it callable from inside a signal handler.

use libc::c_int;

/// `(number, name, description)` for every signal we know how to print.
static SIGNAL_TABLE: &[(c_int, &str, &str)] = &[
    (libc::SIGHUP, "SIGHUP", "Hangup"),
    (libc::SIGINT, "SIGINT", "Interrupt"),
    (libc::SIGQUIT, "SIGQUIT", "Quit"),
    (libc::SIGILL, "SIGILL", "Illegal instruction"),
    (libc::SIGTRAP, "SIGTRAP", "Trace/breakpoint trap"),
    (libc::SIGABRT, "SIGABRT", "Aborted"),
    (libc::SIGBUS, "SIGBUS", "Bus error"),
    (libc::SIGFPE, "SIGFPE", "Floating point exception"),
    (libc::SIGKILL, "SIGKILL", "Killed"),
    (libc::SIGUSR1, "SIGUSR1", "User defined signal 1"),
    (libc::SIGSEGV, "SIGSEGV", "Segmentation fault"),
    (libc::SIGUSR2, "SIGUSR2", "User defined signal 2"),
    (libc::SIGPIPE, "SIGPIPE", "Broken pipe"),
    (libc::SIGALRM, "SIGALRM", "Alarm clock"),
    (libc::SIGTERM, "SIGTERM", "Terminated"),
    (libc::SIGCHLD, "SIGCHLD", "Child exited"),
    (libc::SIGCONT, "SIGCONT", "Continued"),
    (libc::SIGSTOP, "SIGSTOP", "Stopped (signal)"),
    (libc::SIGTSTP, "SIGTSTP", "Stopped"),
    (libc::SIGTTIN, "SIGTTIN", "Stopped (tty input)"),
    (libc::SIGTTOU, "SIGTTOU", "Stopped (tty output)"),
    (libc::SIGURG, "SIGURG", "Urgent I/O condition"),
    (libc::SIGXCPU, "SIGXCPU", "CPU time limit exceeded"),
    (libc::SIGXFSZ, "SIGXFSZ", "File size limit exceeded"),
    (libc::SIGVTALRM, "SIGVTALRM", "Virtual timer expired"),
    (libc::SIGPROF, "SIGPROF", "Profiling timer expired"),
    (libc::SIGWINCH, "SIGWINCH", "Window changed"),
    (libc::SIGIO, "SIGIO", "I/O possible"),
    (libc::SIGSYS, "SIGSYS", "Bad system call"),
];

/// Name used for signal numbers missing from the table.
pub const UNKNOWN_SIGNAL_NAME: &str = "SIG?";

/// Description used for signal numbers missing from the table.
pub const UNKNOWN_SIGNAL_DESCRIPTION: &str = "Unknown signal";

/// Symbolic name of `signum`, e.g. `"SIGSEGV"`.
///
/// Async-signal-safe.
pub fn signal_name(signum: c_int) -> &'static str
{
    lookup(signum).map_or(UNKNOWN_SIGNAL_NAME, |&(_, name, _)| name)
}

/// Human-readable description of `signum`, e.g. `"Segmentation fault"`.
///
/// Async-signal-safe.
pub fn signal_description(signum: c_int) -> &'static str
{
    lookup(signum).map_or(UNKNOWN_SIGNAL_DESCRIPTION, |&(_, _, description)| description)
}

/// Resolve a signal name to its number.
///
/// Accepts `"SIGSEGV"`, `"segv"` or `"SegV"`; matching ignores ASCII case and
/// the `SIG` prefix is optional.
pub fn signal_from_name(name: &str) -> Option<c_int>
{
    let trimmed = name.trim();
    let bare = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("SIG") => &trimmed[3..],
        _ => trimmed,
    };

    SIGNAL_TABLE
        .iter()
        .find(|(_, table_name, _)| table_name[3..].eq_ignore_ascii_case(bare))
        .map(|&(signum, _, _)| signum)
}

fn lookup(signum: c_int) -> Option<&'static (c_int, &'static str, &'static str)>
{
    SIGNAL_TABLE.iter().find(|(number, _, _)| *number == signum)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_every_name_starts_with_sig()
    {
        for (_, name, description) in SIGNAL_TABLE {
            assert!(name.starts_with("SIG"), "{name}");
            assert!(!description.is_empty(), "{name} has no description");
        }
    }

    #[test]
    fn test_lookup_known_signals()
    {
        assert_eq!(signal_name(libc::SIGSEGV), "SIGSEGV");
        assert_eq!(signal_description(libc::SIGSEGV), "Segmentation fault");
        assert_eq!(signal_description(libc::SIGABRT), "Aborted");
        assert_eq!(signal_description(libc::SIGSYS), "Bad system call");
    }

    #[test]
    fn test_lookup_unknown_signal()
    {
        assert_eq!(signal_name(0), UNKNOWN_SIGNAL_NAME);
        assert_eq!(signal_description(-5), UNKNOWN_SIGNAL_DESCRIPTION);
    }

    #[test]
    fn test_signal_from_name_variants()
    {
        assert_eq!(signal_from_name("SIGABRT"), Some(libc::SIGABRT));
        assert_eq!(signal_from_name("abrt"), Some(libc::SIGABRT));
        assert_eq!(signal_from_name("SigSegv"), Some(libc::SIGSEGV));
        assert_eq!(signal_from_name("  usr1 "), Some(libc::SIGUSR1));
        assert_eq!(signal_from_name("SIGNOPE"), None);
        assert_eq!(signal_from_name(""), None);
        assert_eq!(signal_from_name("SIG"), None);
    }
}
