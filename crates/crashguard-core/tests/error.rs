//! Tests for error handling

use crashguard_core::error::{CrashGuardError, CrashGuardResult};
use crashguard_core::FatalSignal;

#[test]
fn test_invalid_signal_display()
{
    let error = CrashGuardError::InvalidSignal("SIGFOO".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Invalid signal"));
    assert!(message.contains("SIGFOO"));
}

#[test]
fn test_invalid_config_display()
{
    let error = CrashGuardError::InvalidConfig("CRASHGUARD_MAX_FRAMES=lots".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Invalid configuration"));
    assert!(message.contains("CRASHGUARD_MAX_FRAMES"));
}

#[test]
fn test_already_initialized_display()
{
    let message = format!("{}", CrashGuardError::AlreadyInitialized);
    assert!(message.contains("already initialized"));
}

#[test]
fn test_io_error_conversion()
{
    let io_err = std::io::Error::from_raw_os_error(libc::EINVAL);
    let error: CrashGuardError = io_err.into();

    match error {
        CrashGuardError::Io(inner) => assert_eq!(inner.raw_os_error(), Some(libc::EINVAL)),
        _ => panic!("Expected Io variant"),
    }
}

#[test]
fn test_non_fatal_signal_is_rejected()
{
    let error = FatalSignal::try_from(libc::SIGUSR1).unwrap_err();
    assert!(matches!(error, CrashGuardError::InvalidSignal(_)));
    assert!(error.to_string().contains("SIGUSR1"));
}

#[test]
fn test_result_type()
{
    // Test that Result type is properly aliased
    let _result: CrashGuardResult<()> = Ok(());
    let _error_result: CrashGuardResult<()> = Err(CrashGuardError::AlreadyInitialized);
}
