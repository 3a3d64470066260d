//! Command-line surface and the run configuration derived from it.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sdkinit_io_fs::{EnumCopySymlinkStrategy, SpecCopyOptions};
use sdkinit_log::{EnumLogFormat, SpecLogOptions};
use sdkinit_proc::{EnumSupervisorMode, SpecCommand};

use crate::conf::{
    C_DIR_DST_DEFAULT, C_DIR_SRC_DEFAULT, C_ENV_DEST_DIR, C_ENV_LOG_FORMAT, C_ENV_MODE,
    C_ENV_SRC_DIR, C_ENV_SYMLINKS, C_ENV_WORKERS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EnumCliMode {
    /// Relay SIGINT/SIGTERM to the command while waiting for it.
    Supervised,
    /// Run the command without relaying signals.
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EnumCliSymlinks {
    /// Copy what the link points to.
    Dereference,
    /// Recreate the link itself.
    Copy,
    /// Leave links out.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum EnumCliLogFormat {
    Text,
    Json,
}

/// Copy protocol definitions to a shared volume, then run COMMAND.
#[derive(Debug, Parser)]
#[command(name = "sdkinit", version)]
pub(crate) struct Cli {
    /// Directory to copy from.
    #[arg(long, env = C_ENV_SRC_DIR, default_value = C_DIR_SRC_DEFAULT)]
    pub(crate) src_dir: PathBuf,

    /// Directory to copy into; created when missing.
    #[arg(long, env = C_ENV_DEST_DIR, default_value = C_DIR_DST_DEFAULT)]
    pub(crate) dest_dir: PathBuf,

    /// How COMMAND is supervised.
    #[arg(long, env = C_ENV_MODE, value_enum, default_value_t = EnumCliMode::Supervised)]
    pub(crate) mode: EnumCliMode,

    /// How symlinks in the source tree are handled.
    #[arg(long, env = C_ENV_SYMLINKS, value_enum, default_value_t = EnumCliSymlinks::Dereference)]
    pub(crate) symlinks: EnumCliSymlinks,

    /// Maximum threads for copying file contents.
    #[arg(long, env = C_ENV_WORKERS)]
    pub(crate) workers: Option<usize>,

    /// Log line format.
    #[arg(long, env = C_ENV_LOG_FORMAT, value_enum, default_value_t = EnumCliLogFormat::Text)]
    pub(crate) log_format: EnumCliLogFormat,

    /// Command to run after the copy, followed by its arguments.
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) command: Vec<String>,
}

/// Everything one run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub(crate) struct SpecInitConfig {
    pub(crate) path_dir_src: PathBuf,
    pub(crate) path_dir_dst: PathBuf,
    pub(crate) spec_cp_options: SpecCopyOptions,
    pub(crate) mode: EnumSupervisorMode,
    pub(crate) spec_command: Option<SpecCommand>,
    pub(crate) spec_log_options: SpecLogOptions,
}

impl Cli {
    pub(crate) fn into_config(self) -> SpecInitConfig {
        let rule_symlink = match self.symlinks {
            EnumCliSymlinks::Dereference => EnumCopySymlinkStrategy::Dereference,
            EnumCliSymlinks::Copy => EnumCopySymlinkStrategy::CopySymlinks,
            EnumCliSymlinks::Skip => EnumCopySymlinkStrategy::SkipSymlinks,
        };
        let mode = match self.mode {
            EnumCliMode::Supervised => EnumSupervisorMode::Supervised,
            EnumCliMode::Sync => EnumSupervisorMode::Synchronous,
        };
        let format = match self.log_format {
            EnumCliLogFormat::Text => EnumLogFormat::Text,
            EnumCliLogFormat::Json => EnumLogFormat::Json,
        };

        SpecInitConfig {
            path_dir_src: self.src_dir,
            path_dir_dst: self.dest_dir,
            spec_cp_options: SpecCopyOptions {
                rule_symlink,
                num_workers_max: self.workers,
            },
            mode,
            spec_command: SpecCommand::from_argv(&self.command),
            spec_log_options: SpecLogOptions {
                format,
                ..SpecLogOptions::default()
            },
        }
    }
}
