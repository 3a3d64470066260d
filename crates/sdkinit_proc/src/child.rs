//! Owned child process handle and its shared signalling view.

use std::process::Stdio;
use std::sync::Arc;

use nix::sys::signal::kill;
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::signal::EnumSignal;
use crate::spec::{SpecChildExit, SpecCommand, SupervisorError, SupervisorResult};

/// Running child process.
///
/// Only the owner can wait on it; [`ChildHandle::wait`] consumes the handle so
/// nothing can touch the process after it has been reaped. Concurrent signal
/// delivery goes through a [`ChildSignaller`].
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    signaller: ChildSignaller,
}

/// Read-only view of a child that can only request signal delivery.
#[derive(Debug, Clone)]
pub struct ChildSignaller {
    pid: Pid,
    program: Arc<str>,
}

/// Spawn `spec_command` with stdout/stderr attached to ours and stdin on the
/// null device.
///
/// Must be called from within a tokio runtime.
pub fn launch(spec_command: &SpecCommand) -> SupervisorResult<ChildHandle> {
    let map_err_launch = |e: std::io::Error| SupervisorError::Launch {
        program: spec_command.program.clone(),
        source: e,
    };

    let child = Command::new(&spec_command.program)
        .args(&spec_command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(false)
        .spawn()
        .map_err(map_err_launch)?;

    let pid = child
        .id()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| map_err_launch(std::io::Error::other("child pid unavailable")))?;

    info!(command = %spec_command, pid, "Subprocess started.");
    Ok(ChildHandle {
        child,
        signaller: ChildSignaller {
            pid: Pid::from_raw(pid),
            program: Arc::from(spec_command.program.as_str()),
        },
    })
}

impl ChildHandle {
    /// OS process id.
    pub fn pid(&self) -> i32 {
        self.signaller.pid()
    }

    /// Program the child was started from.
    pub fn program(&self) -> &str {
        self.signaller.program()
    }

    /// Shared view for delivering signals while the owner waits.
    pub fn signaller(&self) -> ChildSignaller {
        self.signaller.clone()
    }

    /// Block until the child terminates and reap it.
    pub async fn wait(mut self) -> SupervisorResult<SpecChildExit> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| SupervisorError::Wait {
                program: self.signaller.program.to_string(),
                source: e,
            })?;
        let spec_exit = SpecChildExit::from(status);
        debug!(pid = self.pid(), exit = %spec_exit, "subprocess reaped");
        Ok(spec_exit)
    }
}

impl ChildSignaller {
    #[cfg(test)]
    pub(crate) fn for_pid(pid: i32, program: &str) -> Self {
        Self {
            pid: Pid::from_raw(pid),
            program: Arc::from(program),
        }
    }

    /// OS process id.
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// Program the child was started from.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Deliver `signal` to the child unchanged.
    pub fn request_signal(&self, signal: EnumSignal) -> SupervisorResult<()> {
        kill(self.pid, nix::sys::signal::Signal::from(signal)).map_err(|errno| {
            SupervisorError::SignalForward {
                signal,
                pid: self.pid(),
                source: errno,
            }
        })
    }
}
