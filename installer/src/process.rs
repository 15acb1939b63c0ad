//! External process execution with time limits.
//!
//! The build toolchain and the post-install check both run external
//! programs. They do so through [`CommandExecutor`] so that tests can script
//! the results, and the system implementation kills any process that
//! outlives its time limit.

use crate::error::{InstallerError, Result};
use log::debug;
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Time limit applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// A non-zero exit is not an error; callers inspect `Output::status`.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the
    /// command, and [`InstallerError::CommandTimedOut`] if it does not
    /// finish in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tarts_installer::process::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("cargo", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), tarts_installer::error::InstallerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        (**self).run(cmd, args)
    }
}

/// Executes commands on the host system, killing them after a time limit.
///
/// Stdout and stderr are drained on background threads while the child runs,
/// so a chatty process cannot block on a full pipe.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor with the given time limit.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Return the configured time limit.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        debug!("running {cmd} {}", args.join(" "));
        let deadline = Instant::now() + self.timeout;
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let Some(status) = child.wait_timeout(self.timeout)? else {
            // The process may have exited between the timeout and the kill.
            if let Err(err) = child.kill() {
                debug!("failed to kill {cmd}: {err}");
            }
            child.wait()?;
            return Err(self.timed_out(cmd));
        };

        // A background grandchild can hold the pipes open after the child
        // exits, so reading them is bounded by the same deadline.
        Ok(Output {
            status,
            stdout: self.collect(cmd, stdout, deadline)?,
            stderr: self.collect(cmd, stderr, deadline)?,
        })
    }
}

impl SystemCommandExecutor {
    fn timed_out(&self, cmd: &str) -> InstallerError {
        InstallerError::CommandTimedOut {
            command: cmd.to_owned(),
            seconds: self.timeout.as_secs(),
        }
    }

    fn collect(
        &self,
        cmd: &str,
        pipe: Option<Receiver<Drained>>,
        deadline: Instant,
    ) -> Result<Vec<u8>> {
        let Some(receiver) = pipe else {
            return Ok(Vec::new());
        };
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .max(OUTPUT_GRACE);
        match receiver.recv_timeout(remaining) {
            Ok(bytes) => Ok(bytes?),
            Err(RecvTimeoutError::Timeout) => {
                debug!("{cmd} exited but its output pipes stayed open");
                Err(self.timed_out(cmd))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(std::io::Error::other("output reader thread panicked").into())
            }
        }
    }
}

type Drained = std::io::Result<Vec<u8>>;

/// Least time allowed for reading output once the child has exited.
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

fn drain(mut pipe: impl Read + Send + 'static) -> Receiver<Drained> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = pipe.read_to_end(&mut buffer).map(|_| buffer);
        if sender.send(result).is_err() {
            // The run gave up on this pipe after its deadline.
        }
    });
    receiver
}

/// Join a process's stdout and stderr into one lossily decoded string.
///
/// # Examples
///
/// ```
/// use std::process::Command;
/// use tarts_installer::process::combined_output;
///
/// # #[cfg(unix)] {
/// let output = Command::new("sh").args(["-c", "echo out; echo err >&2"]).output().unwrap();
/// assert_eq!(combined_output(&output), "out\nerr\n");
/// # }
/// ```
#[must_use]
pub fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}
