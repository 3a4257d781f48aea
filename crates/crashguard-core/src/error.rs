//! # Error Types
//!
//! General error handling for crash capture setup.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Very little in this crate can fail in a way a caller can act on: a fatal
//! signal always ends the process, and a signal that cannot be installed is
//! logged and skipped. What remains is configuration parsing, singleton
//! initialisation, and the host collaborators.

use thiserror::Error;

/// Main error type for crash guard operations
///
/// ## Error Categories
///
/// 1. **Input errors**: InvalidSignal, InvalidConfig
/// 2. **Lifecycle errors**: AlreadyInitialized
/// 3. **Collaborator errors**: HostService
/// 4. **I/O errors**: Io (OS call failures surfaced through `errno`)
#[derive(Error, Debug)]
pub enum CrashGuardError
{
    /// A signal name or number could not be resolved
    ///
    /// Produced when parsing user input such as `"SIGFOO"` or `"0"`.
    /// Signals outside the fatal set are still valid for
    /// [`crate::signals::parse_signal`], so this only fires for names the
    /// platform does not know at all.
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// A configuration value could not be parsed
    ///
    /// The string names the offending key and value, e.g.
    /// `CRASHGUARD_TERMINATION=explode`.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared guard was already created
    ///
    /// [`crate::CrashGuard::init_shared`] can only run before the first call to
    /// [`crate::CrashGuard::shared`]. After that the configuration is fixed for
    /// the lifetime of the process.
    #[error("Crash guard already initialized")]
    AlreadyInitialized,

    /// A host-provided service reported a failure
    ///
    /// Collaborator failures never affect crash capture; they are logged by the
    /// orchestrator and otherwise ignored.
    #[error("Host service failed: {0}")]
    HostService(String),

    /// I/O error (for OS calls that set `errno`)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, CrashGuardError>`
///
/// ```rust
/// use crashguard_core::error::CrashGuardResult;
/// fn foo() -> CrashGuardResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type CrashGuardResult<T> = std::result::Result<T, CrashGuardError>;
