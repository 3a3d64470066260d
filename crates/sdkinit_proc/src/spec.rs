//! Command, mode and exit models plus the supervisor error type.

use std::fmt;
use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::signal::EnumSignal;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// How the child is supervised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumSupervisorMode {
    /// Start the child and block on it; signals are not relayed.
    Synchronous,
    /// Relay `SIGINT`/`SIGTERM` to the child while waiting for it.
    #[default]
    Supervised,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// External command to run as the child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCommand {
    /// Program name, resolved through `PATH` when it has no separator.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl SpecCommand {
    /// Build a command from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split `argv` into program and arguments; `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }
}

impl fmt::Display for SpecCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How the child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecChildExit {
    /// Exit code for a normal exit.
    pub code: Option<i32>,
    /// Terminating signal number when killed by a signal.
    pub signal: Option<i32>,
}

impl SpecChildExit {
    /// Only a normal exit with status 0 counts as success.
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Status to exit the supervisor with: the child's code, or `128 + N`
    /// when the child was killed by signal `N`.
    pub fn to_exit_code(&self) -> u8 {
        match (self.code, self.signal) {
            (Some(code), _) => u8::try_from(code & 0xff).unwrap_or(1),
            (None, Some(signal)) => u8::try_from(128 + signal).unwrap_or(1),
            (None, None) => 1,
        }
    }
}

impl From<ExitStatus> for SpecChildExit {
    fn from(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for SpecChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit status {code}"),
            (None, Some(signal)) => match EnumSignal::try_from(signal) {
                Ok(known) => write!(f, "killed by {known}"),
                Err(raw) => write!(f, "killed by signal {raw}"),
            },
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// Result alias for supervisor operations.
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Failures while launching, signalling or reaping the child.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The child process could not be created.
    #[error("Error starting command `{program}`: {source}")]
    Launch {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        source: io::Error,
    },
    /// Subscribing to a termination signal failed.
    #[error("Error registering handler for {signal}: {source}")]
    SignalRegistration {
        /// Signal being subscribed to.
        signal: EnumSignal,
        /// Underlying registration error.
        source: io::Error,
    },
    /// Relaying a signal to the child failed; never fatal.
    #[error("Error forwarding {signal} to subprocess {pid}: {source}")]
    SignalForward {
        /// Signal being relayed.
        signal: EnumSignal,
        /// Child pid.
        pid: i32,
        /// Errno from `kill(2)`.
        source: nix::errno::Errno,
    },
    /// The child could not be reaped.
    #[error("Error waiting for command `{program}`: {source}")]
    Wait {
        /// Program being waited on.
        program: String,
        /// Underlying wait error.
        source: io::Error,
    },
    /// The async runtime backing supervised mode could not be built.
    #[error("Error building supervisor runtime: {source}")]
    Runtime {
        /// Underlying runtime builder error.
        source: io::Error,
    },
}

impl SupervisorError {
    /// Whether the error must terminate the supervisor.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SignalForward { .. })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
