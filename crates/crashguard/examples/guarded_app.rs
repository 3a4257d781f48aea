//! Example showing the usual startup order for an application using crashguard
//!
//! 1. Initialize logging, so setup messages and the panic line have a subscriber
//! 2. Install the crash guard as early as possible
//! 3. Run the application
//!
//! Run with `CRASHGUARD_EXAMPLE_CRASH=abort` or `=panic` to see a report.

use crashguard_core::CrashGuard;
use crashguard_utils::init_logging;

fn main()
{
    // Set RUST_LOG=debug to see each signal being installed
    // Set CRASHGUARD_LOG_FORMAT=json for JSON output
    init_logging().expect("Failed to initialize logging");

    let report = CrashGuard::shared().perform();
    tracing::info!(complete = report.is_complete(), "Crash guard ready");

    let span = tracing::span!(tracing::Level::INFO, "work", job = "example");
    let _guard = span.enter();

    match std::env::var("CRASHGUARD_EXAMPLE_CRASH").as_deref() {
        Ok("abort") => std::process::abort(),
        Ok("panic") => panic!("example panic"),
        _ => tracing::info!("Nothing crashed"),
    }
}
