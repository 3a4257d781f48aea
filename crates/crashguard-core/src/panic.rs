//! # Uncaught-Panic Handler
//!
//! Replaces the process panic hook with one that logs a single line and exits
//! with [`UNCAUGHT_PANIC_EXIT_CODE`].
//!
//! This runs on the panicking thread's normal stack, not in signal context,
//! so it is free to allocate and to log through `tracing`. The hook fires
//! before unwinding starts and cannot tell whether a `catch_unwind` further up
//! would have recovered, so every panic is treated as uncaught.

use std::any::Any;
use std::panic::{self, Location};
use std::thread;

use tracing::{error, Level};

/// Exit status used after an uncaught panic.
///
/// Negative to mark an abnormal exit; Unix truncates it to 255.
pub const UNCAUGHT_PANIC_EXIT_CODE: i32 = -1;

/// Install the uncaught-panic hook, replacing any existing hook.
pub fn install_panic_hook()
{
    panic::set_hook(Box::new(|info| {
        let thread = thread::current();
        let description = describe_panic(info.payload(), info.location(), thread.name());
        log_uncaught(&description);
        std::process::exit(UNCAUGHT_PANIC_EXIT_CODE);
    }));
}

/// Text of a panic payload.
///
/// `panic!("literal")` carries a `&'static str`, formatted panics carry a
/// `String`; anything else came from `panic_any`.
pub fn payload_message(payload: &(dyn Any + Send)) -> &str
{
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "Box<dyn Any>"
    }
}

/// One-line description of a panic.
///
/// ```rust
/// use crashguard_core::panic::describe_panic;
///
/// let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
/// let line = describe_panic(payload.as_ref(), None, Some("worker"));
/// assert_eq!(line, "thread 'worker' panicked: boom");
/// ```
pub fn describe_panic(payload: &(dyn Any + Send), location: Option<&Location<'_>>, thread_name: Option<&str>) -> String
{
    let message = payload_message(payload);
    let thread_name = thread_name.unwrap_or("<unnamed>");
    match location {
        Some(location) => format!(
            "thread '{thread_name}' panicked at {}:{}:{}: {message}",
            location.file(),
            location.line(),
            location.column()
        ),
        None => format!("thread '{thread_name}' panicked: {message}"),
    }
}

fn log_uncaught(description: &str)
{
    // Keep it on one line even when the panic message spans several.
    let description = description.replace('\n', "\\n");

    // A filter such as `RUST_LOG=off` would swallow the line; the process is
    // about to exit, so it goes to stderr directly instead.
    if tracing::enabled!(Level::ERROR) {
        error!("Uncaught panic: {description}");
    } else {
        eprintln!("Uncaught panic: {description}");
    }
}
