//! # Configuration
//!
//! Settings for the crash guard, read from code or from the environment.
//!
//! ## Environment Variables
//!
//! - `CRASHGUARD_TERMINATION`: how the fatal signal handler ends the process
//!   (`kill` or `reraise`, default: `kill`)
//! - `CRASHGUARD_MAX_FRAMES`: stack frames captured per report
//!   (`0`..=`128`, default: `128`; larger values are clamped)
//! - `CRASHGUARD_PANIC_HOOK`: whether to install the panic hook
//!   (`1`/`0`, `true`/`false`, `on`/`off`, default: on)

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::diagnostic::MAX_FRAMES;
use crate::error::{CrashGuardError, CrashGuardResult};

/// Environment variable selecting the [`TerminationMode`].
pub const ENV_TERMINATION: &str = "CRASHGUARD_TERMINATION";
/// Environment variable setting [`GuardConfig::max_frames`].
pub const ENV_MAX_FRAMES: &str = "CRASHGUARD_MAX_FRAMES";
/// Environment variable setting [`GuardConfig::panic_hook`].
pub const ENV_PANIC_HOOK: &str = "CRASHGUARD_PANIC_HOOK";

/// How the fatal signal handler ends the process once the report is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminationMode
{
    /// Send `SIGKILL` to our own pid. Cannot be caught, blocked or ignored,
    /// and never produces a core dump.
    #[default]
    Kill,
    /// Restore the default disposition and re-raise the original signal, so
    /// the kernel applies its usual action (usually a core dump). Falls back to
    /// `SIGKILL` if the process is still alive afterwards.
    Reraise,
}

impl TerminationMode
{
    pub(crate) const fn as_u8(self) -> u8
    {
        match self {
            TerminationMode::Kill => 0,
            TerminationMode::Reraise => 1,
        }
    }

    pub(crate) const fn from_u8(raw: u8) -> Self
    {
        match raw {
            1 => TerminationMode::Reraise,
            _ => TerminationMode::Kill,
        }
    }
}

impl FromStr for TerminationMode
{
    type Err = CrashGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "kill" | "sigkill" => Ok(TerminationMode::Kill),
            "reraise" | "raise" | "core" | "default" => Ok(TerminationMode::Reraise),
            other => Err(CrashGuardError::InvalidConfig(format!(
                "{ENV_TERMINATION}={other}: expected 'kill' or 'reraise'"
            ))),
        }
    }
}

/// Crash guard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig
{
    /// How the fatal signal handler terminates the process.
    pub termination: TerminationMode,
    /// Maximum stack frames in a fatal signal report, at most [`MAX_FRAMES`].
    pub max_frames: usize,
    /// Whether `perform()` installs the uncaught-panic hook.
    pub panic_hook: bool,
}

impl Default for GuardConfig
{
    fn default() -> Self
    {
        Self {
            termination: TerminationMode::Kill,
            max_frames: MAX_FRAMES,
            panic_hook: true,
        }
    }
}

impl GuardConfig
{
    /// Set the termination mode.
    #[must_use]
    pub fn with_termination(mut self, termination: TerminationMode) -> Self
    {
        self.termination = termination;
        self
    }

    /// Set the frame limit, clamped to [`MAX_FRAMES`].
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: usize) -> Self
    {
        self.max_frames = max_frames.min(MAX_FRAMES);
        self
    }

    /// Enable or disable the uncaught-panic hook.
    #[must_use]
    pub fn with_panic_hook(mut self, enabled: bool) -> Self
    {
        self.panic_hook = enabled;
        self
    }

    /// Read the configuration from the environment.
    ///
    /// ## Errors
    ///
    /// Returns [`CrashGuardError::InvalidConfig`] naming the first variable
    /// whose value cannot be parsed. Unset variables keep their defaults.
    pub fn try_from_env() -> CrashGuardResult<Self>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the configuration from the environment, falling back to defaults
    /// (with a warning) when a value is invalid.
    pub fn from_env() -> Self
    {
        Self::try_from_env().unwrap_or_else(|err| {
            warn!(error = %err, "Ignoring crash guard environment configuration");
            Self::default()
        })
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// [`GuardConfig::try_from_env`] uses the process environment; tests pass
    /// a closure over a map instead.
    ///
    /// ## Errors
    ///
    /// Same as [`GuardConfig::try_from_env`].
    pub fn from_lookup<F>(lookup: F) -> CrashGuardResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_TERMINATION) {
            config.termination = value.parse()?;
        }

        if let Some(value) = lookup(ENV_MAX_FRAMES) {
            let frames = value
                .trim()
                .parse::<usize>()
                .map_err(|e| CrashGuardError::InvalidConfig(format!("{ENV_MAX_FRAMES}={value}: {e}")))?;
            config = config.with_max_frames(frames);
        }

        if let Some(value) = lookup(ENV_PANIC_HOOK) {
            config.panic_hook = parse_flag(&value)
                .ok_or_else(|| CrashGuardError::InvalidConfig(format!("{ENV_PANIC_HOOK}={value}: expected on/off")))?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool>
{
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
