use anyhow::Result;
use crossbeam_channel::Sender;
use std::io::{self, Write};
use std::process;
use std::sync::atomic::{AtomicI32, Ordering};
use std::thread;

#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGPIPE, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, flag};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalPipe = 141, // 128 + SIGPIPE (13)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }

    fn from_status(status: i32) -> Option<Self> {
        match status {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::GeneralError),
            2 => Some(ExitCode::InvalidUsage),
            130 => Some(ExitCode::SignalInt),
            141 => Some(ExitCode::SignalPipe),
            143 => Some(ExitCode::SignalTerm),
            _ => None,
        }
    }
}

/// Exit status owed to the first shutdown signal, 0 until one arrives
static TERMINATION_STATUS: AtomicI32 = AtomicI32::new(0);

/// Control messages sent by the signal handler to the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ctrl {
    Shutdown { immediate: bool },
}

/// Background thread turning process signals into `Ctrl` messages
pub struct SignalHandler {
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    pub fn new(ctrl_sender: Sender<Ctrl>) -> Result<Self> {
        #[cfg(unix)]
        {
            let mut signals = Signals::new([SIGINT, SIGPIPE, SIGTERM])?;

            let handle = thread::spawn(move || {
                let mut shutdown_count = 0;
                for sig in signals.forever() {
                    match sig {
                        SIGINT | SIGTERM => {
                            if sig == SIGTERM {
                                eprintln!(
                                    "{}",
                                    crate::config::format_warning_message_auto(
                                        "Received SIGTERM, shutting down gracefully..."
                                    )
                                );
                            }
                            mark_terminated(exit_code_for_signal(sig));
                            shutdown_count += 1;
                            let immediate = shutdown_count > 1;
                            let _ = ctrl_sender.send(Ctrl::Shutdown { immediate });
                            if immediate {
                                exit_code_for_signal(sig).exit();
                            }
                        }
                        SIGPIPE => {
                            // Broken pipe is normal when piping into head
                            ExitCode::SignalPipe.exit();
                        }
                        _ => {}
                    }
                }
            });

            Ok(SignalHandler { _handle: handle })
        }

        #[cfg(windows)]
        {
            let term_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
            flag::register(SIGINT, std::sync::Arc::clone(&term_flag))?;

            let handle = thread::spawn(move || {
                let mut shutdown_count = 0;
                loop {
                    thread::sleep(std::time::Duration::from_millis(100));
                    if term_flag.swap(false, Ordering::Relaxed) {
                        mark_terminated(ExitCode::SignalInt);
                        shutdown_count += 1;
                        let immediate = shutdown_count > 1;
                        let _ = ctrl_sender.send(Ctrl::Shutdown { immediate });
                        if immediate {
                            ExitCode::SignalInt.exit();
                        }
                    }
                }
            });

            Ok(SignalHandler { _handle: handle })
        }
    }

    /// Exit code for the first SIGINT/SIGTERM seen, if any arrived
    pub fn termination_exit_code() -> Option<ExitCode> {
        match TERMINATION_STATUS.load(Ordering::Relaxed) {
            0 => None,
            status => ExitCode::from_status(status),
        }
    }
}

fn mark_terminated(code: ExitCode) {
    // Later signals keep the status of the first one
    let _ = TERMINATION_STATUS.compare_exchange(0, code as i32, Ordering::Relaxed, Ordering::Relaxed);
}

#[cfg(unix)]
fn exit_code_for_signal(sig: i32) -> ExitCode {
    if sig == SIGTERM {
        ExitCode::SignalTerm
    } else {
        ExitCode::SignalInt
    }
}

/// Stdout wrapper that treats a broken pipe as a quiet exit
pub struct SafeStdout {
    stdout: io::Stdout,
}

impl Default for SafeStdout {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeStdout {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
        }
    }

    pub fn writeln(&mut self, data: &str) -> Result<()> {
        match writeln!(self.stdout, "{}", data) {
            Ok(()) => Ok(()),
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            Err(e) => Err(anyhow::anyhow!("Failed to write to stdout: {}", e)),
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        match self.stdout.flush() {
            Ok(()) => Ok(()),
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            Err(e) => Err(anyhow::anyhow!("Failed to flush stdout: {}", e)),
        }
    }
}

/// Stderr wrapper; if stderr itself is gone there is nothing left to report to
pub struct SafeStderr {
    stderr: io::Stderr,
}

impl Default for SafeStderr {
    fn default() -> Self {
        Self::new()
    }
}

impl SafeStderr {
    pub fn new() -> Self {
        Self {
            stderr: io::stderr(),
        }
    }

    pub fn writeln(&mut self, data: &str) -> Result<()> {
        match writeln!(self.stderr, "{}", data) {
            Ok(()) => Ok(()),
            Err(e) if is_broken_pipe(&e) => ExitCode::SignalPipe.exit(),
            Err(_) => ExitCode::GeneralError.exit(),
        }
    }
}

fn is_broken_pipe(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
    }
    #[cfg(windows)]
    {
        e.kind() == io::ErrorKind::BrokenPipe
            || e.raw_os_error() == Some(232) // ERROR_NO_DATA
            || e.raw_os_error() == Some(109) // ERROR_BROKEN_PIPE
    }
}
