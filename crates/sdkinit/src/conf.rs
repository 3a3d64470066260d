//! Defaults and environment variable names.

/// Default source of protocol definitions.
pub(crate) const C_DIR_SRC_DEFAULT: &str = "/protos";
/// Default shared destination.
pub(crate) const C_DIR_DST_DEFAULT: &str = "/shared/protos";

/// Source directory override.
pub(crate) const C_ENV_SRC_DIR: &str = "SRC_DIR";
/// Destination directory override.
pub(crate) const C_ENV_DEST_DIR: &str = "DEST_DIR";
/// Supervisor mode (`supervised` | `sync`).
pub(crate) const C_ENV_MODE: &str = "SDKINIT_MODE";
/// Symlink policy (`dereference` | `copy` | `skip`).
pub(crate) const C_ENV_SYMLINKS: &str = "SDKINIT_SYMLINKS";
/// Worker cap for the file-copy stage.
pub(crate) const C_ENV_WORKERS: &str = "SDKINIT_WORKERS";
/// Log line format (`text` | `json`).
pub(crate) const C_ENV_LOG_FORMAT: &str = "SDKINIT_LOG_FORMAT";
