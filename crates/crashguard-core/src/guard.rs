//! # Setup Orchestrator
//!
//! [`CrashGuard`] is the one-time entry point: it installs the fatal signal
//! handlers and the uncaught-panic hook, then runs the host collaborators.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninstalled ──perform()──▶ Installing ──▶ Installed
//! ```
//!
//! The transition happens exactly once per guard. Concurrent callers of
//! [`CrashGuard::perform`] block until the first one finishes and then all
//! observe the same [`InstallReport`]; later calls return it immediately.
//! There is no teardown.
//!
//! ## Example
//!
//! ```rust,no_run
//! use crashguard_core::CrashGuard;
//!
//! fn main()
//! {
//!     let report = CrashGuard::shared().perform();
//!     assert!(report.is_complete());
//!     // ... application code ...
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::GuardConfig;
use crate::error::{CrashGuardError, CrashGuardResult};
use crate::host::{HostServices, NoopHost};
use crate::signals::{self, InstallReport};
use crate::{handler, panic};

static SHARED: OnceCell<CrashGuard> = OnceCell::new();

/// Where a guard is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState
{
    /// `perform()` has not been called.
    Uninstalled,
    /// `perform()` is running.
    Installing,
    /// Handlers are installed.
    Installed,
}

impl GuardState
{
    const fn as_u8(self) -> u8
    {
        match self {
            GuardState::Uninstalled => 0,
            GuardState::Installing => 1,
            GuardState::Installed => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self
    {
        match raw {
            1 => GuardState::Installing,
            2 => GuardState::Installed,
            _ => GuardState::Uninstalled,
        }
    }
}

impl fmt::Display for GuardState
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            GuardState::Uninstalled => f.write_str("uninstalled"),
            GuardState::Installing => f.write_str("installing"),
            GuardState::Installed => f.write_str("installed"),
        }
    }
}

/// Process-wide crash capture setup.
///
/// Most programs use [`CrashGuard::shared`]. [`CrashGuard::new`] exists for
/// embedding and tests; note that what it installs (signal dispositions and
/// the panic hook) is process-global regardless of which guard installed it.
pub struct CrashGuard
{
    config: GuardConfig,
    host: Box<dyn HostServices>,
    state: AtomicU8,
    report: OnceCell<InstallReport>,
    installs: AtomicUsize,
}

impl fmt::Debug for CrashGuard
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("CrashGuard")
            .field("config", &self.config)
            .field("host", &self.host.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CrashGuard
{
    /// Create a standalone guard.
    pub fn new(config: GuardConfig, host: Box<dyn HostServices>) -> Self
    {
        Self {
            config,
            host,
            state: AtomicU8::new(GuardState::Uninstalled.as_u8()),
            report: OnceCell::new(),
            installs: AtomicUsize::new(0),
        }
    }

    /// The process-wide guard.
    ///
    /// Created on first access from [`GuardConfig::from_env`] with a
    /// [`NoopHost`]. Concurrent first callers block until creation finishes;
    /// every caller gets the same instance.
    pub fn shared() -> &'static CrashGuard
    {
        SHARED.get_or_init(|| CrashGuard::new(GuardConfig::from_env(), Box::new(NoopHost)))
    }

    /// Create the process-wide guard with an explicit configuration and host.
    ///
    /// ## Errors
    ///
    /// Returns [`CrashGuardError::AlreadyInitialized`] if the shared guard
    /// already exists, including one created implicitly by
    /// [`CrashGuard::shared`].
    pub fn init_shared(config: GuardConfig, host: Box<dyn HostServices>) -> CrashGuardResult<&'static CrashGuard>
    {
        SHARED
            .try_insert(CrashGuard::new(config, host))
            .map_err(|_| CrashGuardError::AlreadyInitialized)
    }

    /// Run the installation once and return its report.
    ///
    /// Installs the fatal signal handlers, then the panic hook (unless
    /// disabled in the configuration), then calls the host collaborators.
    /// Repeated calls do not reinstall anything.
    pub fn perform(&self) -> &InstallReport
    {
        self.report.get_or_init(|| self.install())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GuardState
    {
        GuardState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// The configuration this guard installs with.
    pub fn config(&self) -> &GuardConfig
    {
        &self.config
    }

    /// The installation report, once `perform()` has completed.
    pub fn report(&self) -> Option<&InstallReport>
    {
        self.report.get()
    }

    /// How many times the installation body has run. At most 1.
    pub fn install_count(&self) -> usize
    {
        self.installs.load(Ordering::SeqCst)
    }

    fn install(&self) -> InstallReport
    {
        self.state.store(GuardState::Installing.as_u8(), Ordering::SeqCst);
        self.installs.fetch_add(1, Ordering::SeqCst);

        handler::configure(&self.config);
        let report = signals::install_fatal_handlers();

        if self.config.panic_hook {
            panic::install_panic_hook();
            debug!("Installed uncaught panic hook");
        }

        if let Err(err) = self.host.enable_accessibility() {
            warn!(host = self.host.name(), error = %err, "Failed to enable accessibility services");
        }
        if let Err(err) = self.host.configure_keyboard() {
            warn!(host = self.host.name(), error = %err, "Failed to configure keyboard preferences");
        }

        info!(
            installed = report.installed.len(),
            failed = report.failures.len(),
            termination = ?self.config.termination,
            "Crash guard installed"
        );

        self.state.store(GuardState::Installed.as_u8(), Ordering::SeqCst);
        report
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_state_round_trips_through_u8()
    {
        for state in [GuardState::Uninstalled, GuardState::Installing, GuardState::Installed] {
            assert_eq!(GuardState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn test_new_guard_is_uninstalled()
    {
        let guard = CrashGuard::new(GuardConfig::default(), Box::new(NoopHost));
        assert_eq!(guard.state(), GuardState::Uninstalled);
        assert!(guard.report().is_none());
        assert_eq!(guard.install_count(), 0);
    }

    #[test]
    fn test_debug_names_host()
    {
        let guard = CrashGuard::new(GuardConfig::default(), Box::new(NoopHost));
        let rendered = format!("{guard:?}");
        assert!(rendered.contains("noop"));
        assert!(rendered.contains("Uninstalled"));
    }
}
