//! Copy-then-supervise run and its error type.

use sdkinit_io_fs::{CopyTreeError, copy_tree};
use sdkinit_proc::{Supervisor, SupervisorError};
use thiserror::Error;
use tracing::{error, info};

use crate::cli::SpecInitConfig;

/// Fatal failures; each ends the process with status 1.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Error copying files: {0}")]
    Copy(#[from] CopyTreeError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

/// Copy the tree, then run the configured command if there is one.
///
/// Returns the status the process should exit with.
pub(crate) fn run(spec_init_config: &SpecInitConfig) -> Result<u8, AppError> {
    let report = copy_tree(
        &spec_init_config.path_dir_src,
        &spec_init_config.path_dir_dst,
        spec_init_config.spec_cp_options.clone(),
    )?;
    info!(
        src = %spec_init_config.path_dir_src.display(),
        dst = %spec_init_config.path_dir_dst.display(),
        summary = %report,
        "Files copied successfully."
    );

    let Some(spec_command) = &spec_init_config.spec_command else {
        info!("No command specified. Finishing...");
        return Ok(0);
    };

    let spec_exit = Supervisor::new(spec_init_config.mode).run(spec_command)?;
    if spec_exit.is_success() {
        info!(command = %spec_command, "Subprocess terminated successfully.");
    } else {
        error!(command = %spec_command, exit = %spec_exit, "Subprocess terminated with error.");
    }
    Ok(spec_exit.to_exit_code())
}

#[cfg(test)]
mod tests {
    use sdkinit_io_fs::SpecCopyOptions;
    use sdkinit_log::SpecLogOptions;
    use sdkinit_proc::{EnumSupervisorMode, SpecCommand};
    use tempfile::TempDir;

    use super::{AppError, run};
    use crate::cli::SpecInitConfig;

    fn config_for(tmp: &TempDir, spec_command: Option<SpecCommand>) -> SpecInitConfig {
        SpecInitConfig {
            path_dir_src: tmp.path().join("protos"),
            path_dir_dst: tmp.path().join("shared/protos"),
            spec_cp_options: SpecCopyOptions::default(),
            mode: EnumSupervisorMode::Synchronous,
            spec_command,
            spec_log_options: SpecLogOptions::default(),
        }
    }

    #[test]
    fn run_without_command_copies_and_returns_zero() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_init_config = config_for(&tmp, None);
        std::fs::create_dir_all(&spec_init_config.path_dir_src).expect("mkdir");
        std::fs::write(spec_init_config.path_dir_src.join("a.proto"), "a").expect("write");

        assert_eq!(run(&spec_init_config).expect("run"), 0);
        assert!(spec_init_config.path_dir_dst.join("a.proto").is_file());
    }

    #[test]
    fn run_copy_failure_never_launches_command() {
        let tmp = TempDir::new().expect("tempdir");
        let path_marker = tmp.path().join("launched");
        let spec_command = SpecCommand::new(
            "sh",
            ["-c".to_string(), format!(": > {}", path_marker.display())],
        );
        let spec_init_config = config_for(&tmp, Some(spec_command));

        let err = run(&spec_init_config).expect_err("missing source");
        assert!(matches!(err, AppError::Copy(_)));
        assert!(err.to_string().starts_with("Error copying files: "));
        assert!(!path_marker.exists());
        assert!(!spec_init_config.path_dir_dst.exists());
    }

    #[test]
    fn run_propagates_child_exit_code() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_init_config = config_for(&tmp, Some(SpecCommand::new("sh", ["-c", "exit 42"])));
        std::fs::create_dir_all(&spec_init_config.path_dir_src).expect("mkdir");

        assert_eq!(run(&spec_init_config).expect("run"), 42);
    }

    #[test]
    fn run_launch_failure_is_fatal() {
        let tmp = TempDir::new().expect("tempdir");
        let spec_init_config = config_for(
            &tmp,
            Some(SpecCommand::new("sdkinit-definitely-not-a-program", ["x"])),
        );
        std::fs::create_dir_all(&spec_init_config.path_dir_src).expect("mkdir");

        let err = run(&spec_init_config).expect_err("launch failure");
        assert!(matches!(err, AppError::Supervisor(_)));
    }
}
