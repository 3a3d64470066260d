//! Child lifecycle in synchronous and supervised mode.

use std::process::{Command, Stdio};

use tokio::runtime::Builder;
use tracing::{info, warn};

use crate::child::{ChildSignaller, launch};
use crate::signal::{OsSignalSource, SignalSource};
use crate::spec::{
    EnumSupervisorMode, SpecChildExit, SpecCommand, SupervisorError, SupervisorResult,
};

/// Launches one command and blocks until it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Supervisor {
    mode: EnumSupervisorMode,
}

impl Supervisor {
    /// Supervisor running children in `mode`.
    pub fn new(mode: EnumSupervisorMode) -> Self {
        Self { mode }
    }

    /// Run `spec_command` to completion.
    ///
    /// Supervised mode drives a current-thread tokio runtime and subscribes to
    /// the process-wide `SIGINT`/`SIGTERM` before the child is spawned.
    pub fn run(&self, spec_command: &SpecCommand) -> SupervisorResult<SpecChildExit> {
        match self.mode {
            EnumSupervisorMode::Synchronous => run_synchronous(spec_command),
            EnumSupervisorMode::Supervised => {
                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| SupervisorError::Runtime { source: e })?;
                runtime.block_on(async {
                    let signal_source = OsSignalSource::register()?;
                    run_supervised(spec_command, signal_source).await
                })
            }
        }
    }
}

/// Start `spec_command` and block until it exits; signals are not relayed.
pub fn run_synchronous(spec_command: &SpecCommand) -> SupervisorResult<SpecChildExit> {
    let mut child = Command::new(&spec_command.program)
        .args(&spec_command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| SupervisorError::Launch {
            program: spec_command.program.clone(),
            source: e,
        })?;
    info!(command = %spec_command, pid = child.id(), "Subprocess started.");

    let status = child.wait().map_err(|e| SupervisorError::Wait {
        program: spec_command.program.clone(),
        source: e,
    })?;
    Ok(SpecChildExit::from(status))
}

/// Start `spec_command`, relay every signal from `signal_source` to it, and
/// wait for it to exit.
///
/// The listener only starts once the child exists and is stopped as soon as
/// the child has been reaped. Relay failures are logged and do not affect the
/// result, which is always the child's own exit or a wait failure.
pub async fn run_supervised<S>(
    spec_command: &SpecCommand,
    signal_source: S,
) -> SupervisorResult<SpecChildExit>
where
    S: SignalSource,
{
    let child_handle = launch(spec_command)?;
    let listener = tokio::spawn(forward_signals(signal_source, child_handle.signaller()));

    let res_wait = child_handle.wait().await;
    listener.abort();
    res_wait
}

async fn forward_signals<S>(mut signal_source: S, signaller: ChildSignaller) -> u64
where
    S: SignalSource,
{
    let mut n_forwarded = 0;
    while let Some(signal) = signal_source.recv().await {
        info!(%signal, pid = signaller.pid(), "Received signal. Forwarding to subprocess...");
        match signaller.request_signal(signal) {
            Ok(()) => n_forwarded += 1,
            Err(err) => warn!(error = %err, "Error forwarding signal to subprocess."),
        }
    }
    n_forwarded
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{Supervisor, forward_signals, run_supervised, run_synchronous};
    use crate::child::ChildSignaller;
    use crate::child::tests::C_PID_NEVER_ALLOCATED;
    use crate::signal::{ChannelSignalSource, EnumSignal};
    use crate::spec::{EnumSupervisorMode, SpecCommand, SupervisorError};

    async fn wait_for_file(path: &Path) {
        for _ in 0..200 {
            if path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("timed out waiting for {}", path.display());
    }

    /// Shell child that appends one line per `SIGTERM` and exits 0 on the first.
    fn trap_command(path_marker: &Path, path_ready: &Path) -> SpecCommand {
        let script = r#"trap 'echo term >> "$1"; exit 0' TERM; : > "$2"; while :; do sleep 0.05; done"#;
        SpecCommand::new(
            "sh",
            [
                "-c".to_string(),
                script.to_string(),
                "sh".to_string(),
                path_marker.display().to_string(),
                path_ready.display().to_string(),
            ],
        )
    }

    #[test]
    fn synchronous_mode_returns_child_exit_code() {
        let spec_exit = run_synchronous(&SpecCommand::new("sh", ["-c", "exit 5"])).expect("run");
        assert_eq!(spec_exit.code, Some(5));
        assert_eq!(spec_exit.to_exit_code(), 5);

        let spec_exit = Supervisor::new(EnumSupervisorMode::Synchronous)
            .run(&SpecCommand::new("true", Vec::<String>::new()))
            .expect("run");
        assert!(spec_exit.is_success());
    }

    #[test]
    fn synchronous_mode_launch_failure() {
        let err = run_synchronous(&SpecCommand::new("sdkinit-definitely-not-a-program", ["x"]))
            .expect_err("must fail");
        assert!(matches!(err, SupervisorError::Launch { .. }));
    }

    #[tokio::test]
    async fn supervised_mode_returns_child_exit_code() {
        let (_tx, signal_source) = ChannelSignalSource::new();
        let spec_exit = run_supervised(&SpecCommand::new("sh", ["-c", "exit 9"]), signal_source)
            .await
            .expect("run");
        assert_eq!(spec_exit.code, Some(9));
        assert_eq!(spec_exit.to_exit_code(), 9);
    }

    #[tokio::test]
    async fn supervised_mode_launch_failure_skips_listener() {
        let (tx, signal_source) = ChannelSignalSource::new();
        let err = run_supervised(
            &SpecCommand::new("sdkinit-definitely-not-a-program", ["x"]),
            signal_source,
        )
        .await
        .expect_err("must fail");
        assert!(matches!(err, SupervisorError::Launch { .. }));
        // The source was dropped without a listener ever reading it.
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn supervised_mode_keeps_waiting_after_source_closes() {
        let (tx, signal_source) = ChannelSignalSource::new();
        drop(tx);
        let spec_command = SpecCommand::new("sh", ["-c", "sleep 0.2; exit 4"]);
        let spec_exit = run_supervised(&spec_command, signal_source)
            .await
            .expect("run");
        assert_eq!(spec_exit.code, Some(4));
    }

    #[tokio::test]
    async fn supervised_terminate_kills_sleep_with_signal_status() {
        let (tx, signal_source) = ChannelSignalSource::new();
        let task = tokio::spawn(async move {
            run_supervised(&SpecCommand::new("sleep", ["100"]), signal_source).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(EnumSignal::Terminate).expect("send");

        let spec_exit = task.await.expect("join").expect("run");
        assert_eq!(spec_exit.code, None);
        assert_eq!(spec_exit.signal, Some(EnumSignal::Terminate.number()));
        // Killed by a signal is the failure branch, never "terminated successfully".
        assert!(!spec_exit.is_success());
        assert_eq!(spec_exit.to_exit_code(), 143);
    }

    #[tokio::test]
    async fn supervised_forwards_each_signal_exactly_once() {
        let tmp = TempDir::new().expect("tempdir");
        let path_marker = tmp.path().join("marker");
        let path_ready = tmp.path().join("ready");

        let (tx, signal_source) = ChannelSignalSource::new();
        let spec_command = trap_command(&path_marker, &path_ready);
        let task = tokio::spawn(async move { run_supervised(&spec_command, signal_source).await });

        wait_for_file(&path_ready).await;
        tx.send(EnumSignal::Terminate).expect("send");

        let spec_exit = task.await.expect("join").expect("run");
        assert!(spec_exit.is_success());
        assert_eq!(
            std::fs::read_to_string(&path_marker).expect("marker"),
            "term\n"
        );
    }

    #[tokio::test]
    async fn listener_survives_failed_forwarding() {
        let signaller = ChildSignaller::for_pid(C_PID_NEVER_ALLOCATED, "gone");

        let (tx, signal_source) = ChannelSignalSource::new();
        tx.send(EnumSignal::Terminate).expect("send");
        tx.send(EnumSignal::Interrupt).expect("send");
        drop(tx);

        // Both relays fail with ESRCH; the listener logs and keeps going.
        let n_forwarded = forward_signals(signal_source, signaller).await;
        assert_eq!(n_forwarded, 0);
    }
}
