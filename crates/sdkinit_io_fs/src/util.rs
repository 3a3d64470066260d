use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _is_relative_to_base(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}

/// Append `l_components` to `path_base`, folding `.` and `..` lexically.
fn _append_lexically<'a>(
    mut path_base: PathBuf,
    l_components: impl IntoIterator<Item = Component<'a>>,
) -> PathBuf {
    for component in l_components {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                path_base.pop();
            }
            other => path_base.push(other.as_os_str()),
        }
    }
    path_base
}

/// Resolve `path` without requiring it to exist.
///
/// The longest existing prefix is canonicalized (following symlinks), and the
/// missing remainder is appended with `.`/`..` folded lexically.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    let path_abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let l_components: Vec<Component<'_>> = path_abs.components().collect();
    for n_prefix in (1..=l_components.len()).rev() {
        let path_prefix: PathBuf = l_components[..n_prefix].iter().collect();
        if let Ok(resolved) = fs::canonicalize(&path_prefix) {
            return _append_lexically(resolved, l_components[n_prefix..].iter().copied());
        }
    }
    _append_lexically(PathBuf::new(), l_components)
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = resolve_path(src);
    let dst_resolved = resolve_path(dst);
    _is_relative_to_base(&dst_resolved, &src_resolved)
        || _is_relative_to_base(&src_resolved, &dst_resolved)
}

/// Map `path_src` under `path_dir_src` onto the same relative path under `path_dir_dst`.
///
/// Falls back to `path_item_name` when `path_src` is not below `path_dir_src`.
pub(crate) fn derive_destination_path(
    path_src: &Path,
    path_item_name: &str,
    path_dir_src: &Path,
    path_dir_dst: &Path,
) -> PathBuf {
    path_dir_dst.join(
        path_src
            .strip_prefix(path_dir_src)
            .unwrap_or(Path::new(path_item_name)),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileOperations

/// Drop a stale symlink sitting where a regular entry is about to be written,
/// and make an existing read-only destination file writable again.
fn _prepare_destination_file(path_file_dst: &Path) -> Result<(), io::Error> {
    let meta_dst = match fs::symlink_metadata(path_file_dst) {
        Ok(v) => v,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if meta_dst.file_type().is_symlink() {
        return fs::remove_file(path_file_dst);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = meta_dst.permissions();
        if meta_dst.is_file() && permissions.mode() & 0o200 == 0 {
            permissions.set_mode(permissions.mode() | 0o200);
            fs::set_permissions(path_file_dst, permissions)?;
        }
    }
    Ok(())
}

pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    _prepare_destination_file(path_file_dst)?;
    fs::copy(path_file_src, path_file_dst)?;

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;
    #[cfg(target_os = "linux")]
    {
        apply_times_linux(&stat_src, path_file_dst)?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_times_linux(stat_src: &fs::Metadata, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let file_time_access = FileTime::from_last_access_time(stat_src);
    let file_time_modify = FileTime::from_last_modification_time(stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)
}

/// Recreate the link at `path_src` as `path_dst`, replacing a previous link.
pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> Result<(), io::Error> {
    let target = fs::read_link(path_src)?;

    match fs::symlink_metadata(path_dst) {
        Ok(meta_dst) if meta_dst.file_type().is_symlink() => fs::remove_file(path_dst)?,
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "destination exists and is not a symlink",
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Workers

pub(crate) fn calculate_worker_limit(num_workers_max: Option<usize>) -> usize {
    let n_cpu = std::thread::available_parallelism()
        .map(|v| v.get())
        .unwrap_or(1);

    match num_workers_max {
        Some(n) => n.clamp(1, n_cpu),
        None => n_cpu.clamp(1, 8),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{calculate_worker_limit, derive_destination_path, is_overlap, resolve_path};

    #[test]
    fn derive_destination_path_keeps_relative_structure() {
        let path_dst = derive_destination_path(
            Path::new("/protos/eigr/actor.proto"),
            "actor.proto",
            Path::new("/protos"),
            Path::new("/shared/protos"),
        );
        assert_eq!(path_dst, Path::new("/shared/protos/eigr/actor.proto"));
    }

    #[test]
    fn overlap_detects_nesting_in_both_directions() {
        assert!(is_overlap(Path::new("/a/b"), Path::new("/a/b/c")));
        assert!(is_overlap(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(!is_overlap(Path::new("/a/b"), Path::new("/a/bc")));
    }

    #[test]
    fn resolve_path_folds_parent_components_of_missing_tail() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let path_root = std::fs::canonicalize(tmp.path()).expect("canonicalize");
        std::fs::create_dir(path_root.join("protos")).expect("mkdir");

        let path_resolved = resolve_path(&path_root.join("protos/../shared/./protos"));
        assert_eq!(path_resolved, path_root.join("shared/protos"));
    }

    #[test]
    fn worker_limit_is_at_least_one() {
        assert_eq!(calculate_worker_limit(Some(0)), 1);
        assert!(calculate_worker_limit(None) >= 1);
        assert!(calculate_worker_limit(None) <= 8);
    }
}
