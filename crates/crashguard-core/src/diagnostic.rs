//! # Diagnostic Writer
//!
//! Async-signal-safe output for the fatal signal handler.
//!
//! Everything in this module may run while the faulting thread holds the
//! allocator lock, the stdio lock, or any other lock, so it:
//! - never allocates (all buffers live on the stack),
//! - never takes a lock (no `std::io::stderr()`, no `tracing`),
//! - only calls `write(2)` and the `execinfo` pair `backtrace(3)` /
//!   `backtrace_symbols_fd(3)`.
//!
//! `backtrace(3)` is not on the POSIX async-signal-safe list because its first
//! call may load the unwinder library. [`prime_unwinder`] makes that first
//! call at install time so that the call made from the handler only walks the
//! stack.
//!
//! ## Report format
//!
//! ```text
//! Fatal signal 6 (SIGABRT): Aborted
//! Stack trace (14 frames):
//! ./app(+0x1c2a5)[0x55d1a4a1c2a5]
//! /lib/x86_64-linux-gnu/libc.so.6(+0x42520)[0x7f2b7b642520]
//! ...
//! ```
//!
//! When no frames can be captured the second line reads
//! `Stack trace unavailable` and the report ends there.

use std::ffi::c_void;
use std::io;

use libc::c_int;

use crate::signals::{signal_description, signal_name};

/// Upper bound on captured frames.
pub const MAX_FRAMES: usize = 128;

#[cfg(crashguard_execinfo)]
extern "C" {
    fn backtrace(buffer: *mut *mut c_void, size: c_int) -> c_int;
    fn backtrace_symbols_fd(buffer: *const *mut c_void, size: c_int, fd: c_int);
}

/// Write all of `bytes` to `fd` with raw `write(2)` calls.
///
/// Retries on `EINTR` and partial writes; gives up silently on any other
/// error, since there is nowhere left to report it.
pub fn write_raw(fd: c_int, bytes: &[u8])
{
    let mut remaining = bytes;
    while !remaining.is_empty() {
        // SAFETY: `remaining` is a live slice; write(2) reads at most len bytes.
        let written = unsafe { libc::write(fd, remaining.as_ptr().cast::<c_void>(), remaining.len()) };
        if written < 0 {
            if io::Error::last_os_error().raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return;
        }
        if written == 0 {
            return;
        }
        remaining = &remaining[written as usize..];
    }
}

/// Decimal rendering of an integer into a stack buffer.
///
/// `format!` allocates; this does not.
pub struct DecimalBuf
{
    buf: [u8; 20],
    start: usize,
}

impl DecimalBuf
{
    /// Render `value`, including a leading `-` for negatives.
    pub fn new(value: i64) -> Self
    {
        let mut buf = [0u8; 20];
        let mut pos = buf.len();
        let negative = value < 0;
        let mut magnitude = value.unsigned_abs();

        loop {
            pos -= 1;
            buf[pos] = b'0' + (magnitude % 10) as u8;
            magnitude /= 10;
            if magnitude == 0 {
                break;
            }
        }
        if negative {
            pos -= 1;
            buf[pos] = b'-';
        }

        Self { buf, start: pos }
    }

    /// The rendered digits.
    pub fn as_bytes(&self) -> &[u8]
    {
        &self.buf[self.start..]
    }
}

/// Return addresses captured at the moment of a fault.
///
/// Lives on the handler's stack and is discarded with it.
pub struct CapturedStack
{
    frames: [*mut c_void; MAX_FRAMES],
    len: usize,
}

impl CapturedStack
{
    /// Capture up to `limit` frames (clamped to [`MAX_FRAMES`]) of the
    /// calling thread's stack.
    ///
    /// Yields an empty stack on targets without `backtrace(3)`.
    pub fn capture(limit: usize) -> Self
    {
        let mut frames = [std::ptr::null_mut(); MAX_FRAMES];
        let limit = limit.min(MAX_FRAMES);
        let len = fill_frames(&mut frames[..limit]);
        Self { frames, len }
    }

    /// Number of captured frames.
    pub fn len(&self) -> usize
    {
        self.len
    }

    /// `true` when nothing was captured.
    pub fn is_empty(&self) -> bool
    {
        self.len == 0
    }

    /// The captured return addresses, innermost first.
    pub fn addresses(&self) -> &[*mut c_void]
    {
        &self.frames[..self.len]
    }

    /// Write one symbolized line per frame to `fd`.
    pub fn write_symbols(&self, fd: c_int)
    {
        if !self.is_empty() {
            symbolize_frames(self.addresses(), fd);
        }
    }
}

#[cfg(crashguard_execinfo)]
fn fill_frames(frames: &mut [*mut c_void]) -> usize
{
    if frames.is_empty() {
        return 0;
    }
    // SAFETY: backtrace(3) writes at most `frames.len()` entries.
    let depth = unsafe { backtrace(frames.as_mut_ptr(), frames.len() as c_int) };
    usize::try_from(depth).unwrap_or(0).min(frames.len())
}

#[cfg(not(crashguard_execinfo))]
fn fill_frames(_frames: &mut [*mut c_void]) -> usize
{
    0
}

#[cfg(crashguard_execinfo)]
fn symbolize_frames(frames: &[*mut c_void], fd: c_int)
{
    // SAFETY: every entry came from backtrace(3); the symbolizer writes
    // straight to `fd` without calling malloc.
    unsafe { backtrace_symbols_fd(frames.as_ptr(), frames.len() as c_int, fd) };
}

#[cfg(not(crashguard_execinfo))]
fn symbolize_frames(_frames: &[*mut c_void], _fd: c_int) {}

/// Load the unwinder outside signal context.
///
/// Called once before any handler is installed.
pub fn prime_unwinder()
{
    let _ = CapturedStack::capture(1);
}

/// Write the signal line and stack trace for `signum` to `fd`.
///
/// Async-signal-safe. Captures at most `frame_limit` frames; with zero frames
/// the signal line is still written.
pub fn write_signal_report(fd: c_int, signum: c_int, frame_limit: usize)
{
    write_raw(fd, b"Fatal signal ");
    write_raw(fd, DecimalBuf::new(i64::from(signum)).as_bytes());
    write_raw(fd, b" (");
    write_raw(fd, signal_name(signum).as_bytes());
    write_raw(fd, b"): ");
    write_raw(fd, signal_description(signum).as_bytes());
    write_raw(fd, b"\n");

    let stack = CapturedStack::capture(frame_limit);
    if stack.is_empty() {
        write_raw(fd, b"Stack trace unavailable\n");
        return;
    }

    write_raw(fd, b"Stack trace (");
    write_raw(fd, DecimalBuf::new(stack.len() as i64).as_bytes());
    write_raw(fd, b" frames):\n");
    stack.write_symbols(fd);
}

#[cfg(test)]
mod tests
{
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::FromRawFd;

    use super::*;

    /// Run `write` against the write end of a pipe and return what it wrote.
    fn capture_output(write: impl FnOnce(c_int)) -> String
    {
        let mut fds = [0 as c_int; 2];
        // SAFETY: `fds` has room for both ends.
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

        write(fds[1]);
        // SAFETY: we own both descriptors; closing the write end lets read hit EOF.
        unsafe { libc::close(fds[1]) };

        // SAFETY: fds[0] is a fresh descriptor owned by nobody else.
        let mut reader = unsafe { File::from_raw_fd(fds[0]) };
        let mut output = String::new();
        reader.read_to_string(&mut output).unwrap();
        output
    }

    #[test]
    fn test_decimal_buf()
    {
        assert_eq!(DecimalBuf::new(0).as_bytes(), b"0");
        assert_eq!(DecimalBuf::new(6).as_bytes(), b"6");
        assert_eq!(DecimalBuf::new(128).as_bytes(), b"128");
        assert_eq!(DecimalBuf::new(-1).as_bytes(), b"-1");
        assert_eq!(DecimalBuf::new(i64::MAX).as_bytes(), i64::MAX.to_string().as_bytes());
        assert_eq!(DecimalBuf::new(i64::MIN).as_bytes(), i64::MIN.to_string().as_bytes());
    }

    #[test]
    fn test_write_raw_writes_everything()
    {
        let payload = "x".repeat(10_000);
        let output = capture_output(|fd| write_raw(fd, payload.as_bytes()));
        assert_eq!(output, payload);
    }

    #[test]
    fn test_write_raw_to_closed_fd_returns()
    {
        // EBADF must not loop forever.
        write_raw(-1, b"nowhere");
    }

    #[test]
    fn test_report_without_frames()
    {
        let output = capture_output(|fd| write_signal_report(fd, libc::SIGABRT, 0));
        assert_eq!(
            output,
            format!("Fatal signal {} (SIGABRT): Aborted\nStack trace unavailable\n", libc::SIGABRT)
        );
    }

    #[test]
    fn test_capture_respects_limit()
    {
        assert!(CapturedStack::capture(0).is_empty());
        let stack = CapturedStack::capture(2);
        assert!(stack.len() <= 2);
        assert_eq!(stack.addresses().len(), stack.len());
        assert!(CapturedStack::capture(MAX_FRAMES * 4).len() <= MAX_FRAMES);
    }

    #[cfg(crashguard_execinfo)]
    #[test]
    fn test_report_with_frames()
    {
        let output = capture_output(|fd| write_signal_report(fd, libc::SIGSEGV, 16));
        let mut lines = output.lines();
        assert_eq!(
            lines.next(),
            Some(format!("Fatal signal {} (SIGSEGV): Segmentation fault", libc::SIGSEGV).as_str())
        );
        assert!(lines.next().unwrap().starts_with("Stack trace ("));
        assert!(lines.next().is_some(), "expected at least one frame line");
    }
}
