//! Common module for library exports

pub use crate::config::{GuardConfig, TerminationMode};
pub use crate::error::{CrashGuardError, CrashGuardResult};
pub use crate::guard::{CrashGuard, GuardState};
pub use crate::host::{HostServices, NoopHost};
pub use crate::signals::{Disposition, FatalSignal, InstallFailure, InstallReport, SignalSpec};
