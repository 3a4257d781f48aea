use std::error::Error;
use std::{process, ptr, thread};

use clap::{Parser, Subcommand};
use crashguard_core::signals::{current_disposition, parse_signal, signal_description, signal_name};
use crashguard_core::{CrashGuard, FatalSignal, GuardConfig, InstallReport, NoopHost, TerminationMode};
use crashguard_utils::{info, init_logging, init_logging_with_level, warn, LogFormat, LogLevel};

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Fatal signal and uncaught panic capture for Unix processes.
#[derive(Parser, Debug)]
#[command(name = "crashguard")]
#[command(version)]
#[command(about = "Install crash capture and exercise it with real signals and panics", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format used with --log-level (pretty or json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// How a fatal signal ends the process (kill or reraise)
    #[arg(long, global = true)]
    termination: Option<TerminationMode>,

    /// Maximum stack frames per fatal signal report (0-128)
    #[arg(long, global = true)]
    max_frames: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// List the fatal signal set and each signal's current disposition
    Signals
    {
        /// Install the crash guard before listing
        #[arg(long, default_value_t = false)]
        installed: bool,
    },
    /// Install the crash guard, then raise a signal against this process
    Raise
    {
        /// Signal name (SIGSEGV, segv) or number
        signal: String,
    },
    /// Install the crash guard, then write to a protected page
    Fault,
    /// Install the crash guard, then panic
    Panic
    {
        /// Panic message
        #[arg(default_value = "crashguard test panic")]
        message: String,
        /// Panic on a named worker thread instead of the main thread
        #[arg(long, default_value_t = false)]
        thread: bool,
    },
    /// Install the crash guard twice and print the report
    Install,
}

fn main()
{
    let cli = Cli::parse();

    let logging = match cli.log_level {
        Some(level) => init_logging_with_level(level, cli.log_format),
        None => init_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(1);
    }

    if let Err(e) = run_command(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(cli: Cli) -> CliResult<()>
{
    let guard = build_guard(&cli)?;

    match cli.command {
        Commands::Signals { installed } => {
            if installed {
                guard.perform();
            }
            print_signals()
        }
        Commands::Raise { signal } => {
            let raw = parse_signal(&signal)?;
            guard.perform();
            info!(signal = signal_name(raw), raw, "Raising signal");

            // SAFETY: raise(3) has no memory-safety preconditions.
            if unsafe { libc::raise(raw) } != 0 {
                return Err(std::io::Error::last_os_error().into());
            }
            println!("Process survived {} ({raw})", signal_name(raw));
            Ok(())
        }
        Commands::Fault => {
            guard.perform();
            info!("Writing to a protected page");
            trigger_segfault()
        }
        Commands::Panic { message, thread } => {
            guard.perform();
            if thread {
                let worker = thread::Builder::new()
                    .name("crashguard-worker".to_string())
                    .spawn(move || panic!("{message}"))?;
                worker.join().map_err(|_| "worker thread panicked")?;
                Ok(())
            } else {
                panic!("{message}");
            }
        }
        Commands::Install => {
            guard.perform();
            let report = guard.perform();
            print_report(guard, report);
            Ok(())
        }
    }
}

fn build_guard(cli: &Cli) -> CliResult<&'static CrashGuard>
{
    let mut config = GuardConfig::try_from_env()?;
    if let Some(termination) = cli.termination {
        config = config.with_termination(termination);
    }
    if let Some(frames) = cli.max_frames {
        if frames > crashguard_core::diagnostic::MAX_FRAMES {
            warn!(requested = frames, "Frame limit clamped to {}", crashguard_core::diagnostic::MAX_FRAMES);
        }
        config = config.with_max_frames(frames);
    }

    Ok(CrashGuard::init_shared(config, Box::new(NoopHost))?)
}

fn print_signals() -> CliResult<()>
{
    println!("{:<8} {:>4}  {:<28} DISPOSITION", "SIGNAL", "NUM", "DESCRIPTION");
    for signal in FatalSignal::ALL {
        let disposition = current_disposition(signal.raw())?;
        println!(
            "{:<8} {:>4}  {:<28} {disposition}",
            signal.name(),
            signal.raw(),
            signal_description(signal.raw())
        );
    }
    Ok(())
}

fn print_report(guard: &CrashGuard, report: &InstallReport)
{
    println!("Crash guard: {} (installation ran {} time(s))", guard.state(), guard.install_count());
    println!("  Termination: {:?}", guard.config().termination);
    println!("  Max frames:  {}", guard.config().max_frames);
    println!("  Panic hook:  {}", guard.config().panic_hook);

    println!("\nInstalled signals ({}):", report.installed.len());
    for spec in &report.installed {
        println!("  {:<8} previous: {}", spec.signal.name(), spec.previous);
    }

    if report.failures.is_empty() {
        println!("\nFailures: none");
    } else {
        println!("\nFailures ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {:<8} {}", failure.signal.name(), failure.error);
        }
    }
}

/// Write to a freshly mapped `PROT_NONE` page, which faults with `SIGSEGV`.
fn trigger_segfault() -> CliResult<()>
{
    // SAFETY: sysconf has no preconditions.
    let page_size = usize::try_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).unwrap_or(4096);

    // SAFETY: an anonymous private mapping with no address hint.
    let page = unsafe {
        libc::mmap(
            ptr::null_mut(),
            page_size,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };
    if page == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error().into());
    }

    // SAFETY: deliberately not safe. The page is mapped but inaccessible, so
    // the store faults before any memory is modified.
    unsafe { page.cast::<u8>().write_volatile(1) };

    Err("write to a protected page did not fault".into())
}
