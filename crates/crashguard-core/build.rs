//! Build script for crashguard-core
//!
//! This script checks build requirements and inspects the target platform:
//! - Minimum Rust version (1.70.0)
//! - Whether the target C library ships `backtrace(3)` / `backtrace_symbols_fd(3)`
//!
//! ## Emitted cfgs
//!
//! - `crashguard_execinfo`: the target links `execinfo` functions from its libc
//!   (glibc on Linux, libSystem on Apple platforms). Without it the signal
//!   handler still reports the signal but captures zero frames.

use std::env;

fn main()
{
    println!("cargo:rustc-check-cfg=cfg(crashguard_execinfo)");
    println!("cargo:rerun-if-changed=build.rs");

    // Check minimum Rust version
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        if rustc_version < min_rust_version {
            panic!(
                "crashguard-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    // Build scripts run on the host, so read the target from cargo's env vars
    // rather than from #[cfg] attributes.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_env = env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();

    if has_execinfo(&target_os, &target_env) {
        println!("cargo:rustc-cfg=crashguard_execinfo");
    } else if target_os != "windows" {
        println!(
            "cargo:warning=target {target_os}-{target_env} has no backtrace(3); fatal signal reports will omit stack frames"
        );
    }
}

fn has_execinfo(target_os: &str, target_env: &str) -> bool
{
    match target_os {
        "linux" => target_env == "gnu",
        "macos" | "ios" | "tvos" | "watchos" | "visionos" => true,
        _ => false,
    }
}
