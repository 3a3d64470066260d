//! Copy specification models and top-level error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    #[default]
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `copy_tree`.
#[derive(Debug, Clone, Default)]
pub struct SpecCopyOptions {
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Maximum worker threads for file-copy stage.
    pub num_workers_max: Option<usize>,
}

/// Result alias for tree copy runs.
pub type CopyTreeResult<T> = Result<T, CopyTreeError>;

/// Any failure of a `copy_tree` run.
///
/// The first failure aborts the whole walk; there is no per-entry error list.
#[derive(Debug, Error)]
pub enum CopyTreeError {
    /// Source path is missing or is not a directory.
    #[error("Source is not a directory: {}", path.display())]
    SourceNotDirectory {
        /// Offending source path.
        path: PathBuf,
    },
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        path_dir_src.display(),
        path_dir_dst.display()
    )]
    SourceDestinationOverlap {
        /// Normalized source directory.
        path_dir_src: PathBuf,
        /// Normalized destination directory.
        path_dir_dst: PathBuf,
    },
    /// Destination root could not be created.
    #[error("Failed to initialize destination {}: {source}", path.display())]
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A source directory could not be listed.
    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDirectory {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Entry type or metadata could not be determined.
    #[error("Failed to inspect {}: {source}", path.display())]
    InspectEntry {
        /// Entry being inspected.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A destination directory could not be created.
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        /// Destination directory.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Opening, reading or writing a file failed mid-copy.
    #[error(
        "Failed to copy {} -> {}: {source}",
        path_file_src.display(),
        path_file_dst.display()
    )]
    CopyFile {
        /// Source file.
        path_file_src: PathBuf,
        /// Destination file.
        path_file_dst: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Recreating a symbolic link at destination failed.
    #[error("Failed to create symlink {}: {source}", path.display())]
    CreateSymlink {
        /// Destination link path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::PathBuf;

    use super::CopyTreeError;

    #[test]
    fn copy_error_message_names_operation_and_cause() {
        let err = CopyTreeError::CopyFile {
            path_file_src: PathBuf::from("/protos/a.proto"),
            path_file_dst: PathBuf::from("/shared/protos/a.proto"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to copy /protos/a.proto -> /shared/protos/a.proto: denied"
        );
    }
}
