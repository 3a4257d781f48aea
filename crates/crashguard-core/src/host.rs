//! # Host Services
//!
//! Capabilities the embedding environment provides to the setup sequence.
//!
//! Crash capture does not depend on them. The orchestrator calls both once,
//! after the handlers are installed, logs any failure and carries on.

use crate::error::CrashGuardResult;

/// One-shot configuration calls provided by the host environment.
///
/// Implementations must be `Send + Sync` because the shared guard lives in a
/// `static`.
pub trait HostServices: Send + Sync
{
    /// Short name used in log messages.
    fn name(&self) -> &str
    {
        "host"
    }

    /// Turn on the platform accessibility services.
    ///
    /// ## Errors
    ///
    /// Any error is logged by the orchestrator and otherwise ignored.
    fn enable_accessibility(&self) -> CrashGuardResult<()>;

    /// Apply keyboard and autocorrect preferences.
    ///
    /// ## Errors
    ///
    /// Any error is logged by the orchestrator and otherwise ignored.
    fn configure_keyboard(&self) -> CrashGuardResult<()>;
}

/// Host with nothing to configure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl HostServices for NoopHost
{
    fn name(&self) -> &str
    {
        "noop"
    }

    fn enable_accessibility(&self) -> CrashGuardResult<()>
    {
        Ok(())
    }

    fn configure_keyboard(&self) -> CrashGuardResult<()>
    {
        Ok(())
    }
}
