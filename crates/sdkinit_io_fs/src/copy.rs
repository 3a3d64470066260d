//! Filesystem tree traversal and copy orchestration.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{CopyTreeError, CopyTreeResult, EnumCopySymlinkStrategy, SpecCopyOptions};
use crate::util::{
    calculate_worker_limit, copy_file_with_metadata, create_symbolic_link,
    derive_destination_path, is_overlap, resolve_path,
};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: String,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: String,
}

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

#[derive(Debug)]
struct SpecCopyContext {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    path_dir_dst_resolved: PathBuf,
    spec_cp_options: SpecCopyOptions,
    n_workers_max: usize,
    builder_cp_report: ReportCopyBuilder,
    set_ancestor_dirs: HashSet<(u64, u64)>,
    l_tasks_file_copy: Vec<SpecCopyTaskFile>,
}

impl SpecCopyContext {
    fn warn(&mut self, message: String) {
        warn!(target: "sdkinit_io_fs", "{message}");
        self.builder_cp_report.add_warning(message);
    }
}

/// Copy a directory tree from `dir_source` to `dir_destination`.
///
/// Every directory and regular file under the source is replicated at the
/// same relative path under the destination. Regular files are created or
/// truncated and keep the source permission bits (and, on Linux, the source
/// access/modify times). Destination entries that have no counterpart in the
/// source are left untouched.
///
/// Symlinks follow [`SpecCopyOptions::rule_symlink`]. Sockets, fifos and
/// device nodes are skipped with a warning.
///
/// This function performs:
/// 1. Source validation and destination initialization.
/// 2. Depth-first traversal creating destination directories and planning
///    file-copy tasks.
/// 3. Batched file-copy execution (serial or rayon thread pool).
///
/// The run is all-or-nothing: the first failure is returned as
/// [`CopyTreeError`] and aborts the remaining work. A missing source is
/// detected before anything is created at the destination.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
) -> CopyTreeResult<ReportCopy>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(CopyTreeError::SourceNotDirectory { path: path_dir_src });
    }
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(CopyTreeError::SourceDestinationOverlap {
            path_dir_src,
            path_dir_dst,
        });
    }
    fs::create_dir_all(&path_dir_dst).map_err(|e| CopyTreeError::DestinationInitFailed {
        path: path_dir_dst.clone(),
        source: e,
    })?;

    let n_workers_max = calculate_worker_limit(spec_cp_options.num_workers_max);
    debug!(
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        workers = n_workers_max,
        symlinks = ?spec_cp_options.rule_symlink,
        "copy tree started"
    );

    let mut spec_cp_ctx = SpecCopyContext {
        path_dir_src: path_dir_src.clone(),
        path_dir_dst_resolved: resolve_path(&path_dir_dst),
        path_dir_dst,
        spec_cp_options,
        n_workers_max,
        builder_cp_report: ReportCopyBuilder::default(),
        set_ancestor_dirs: HashSet::new(),
        l_tasks_file_copy: Vec::new(),
    };

    walk_directory(&path_dir_src, &mut spec_cp_ctx)?;
    flush_file_copy_tasks(&mut spec_cp_ctx)?;
    Ok(spec_cp_ctx.builder_cp_report.build())
}

fn copy_one_file(spec_task: &SpecCopyTaskFile) -> CopyTreeResult<()> {
    copy_file_with_metadata(&spec_task.path_file_src, &spec_task.path_file_dst).map_err(|e| {
        CopyTreeError::CopyFile {
            path_file_src: spec_task.path_file_src.clone(),
            path_file_dst: spec_task.path_file_dst.clone(),
            source: e,
        }
    })?;
    debug!(dst = %spec_task.path_file_dst.display(), "file copied");
    Ok(())
}

fn flush_file_copy_tasks(spec_cp_ctx: &mut SpecCopyContext) -> CopyTreeResult<()> {
    let l_tasks_file_copy = std::mem::take(&mut spec_cp_ctx.l_tasks_file_copy);
    if l_tasks_file_copy.is_empty() {
        return Ok(());
    }
    let n_tasks = l_tasks_file_copy.len() as u64;

    if spec_cp_ctx.n_workers_max <= 1 {
        l_tasks_file_copy.iter().try_for_each(copy_one_file)?;
        spec_cp_ctx.builder_cp_report.add_files(n_tasks);
        return Ok(());
    }

    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(spec_cp_ctx.n_workers_max)
        .build();
    let Ok(thread_pool) = thread_pool else {
        spec_cp_ctx.warn(format!(
            "Failed to initialize thread pool (workers={}); fallback to serial copy.",
            spec_cp_ctx.n_workers_max
        ));
        l_tasks_file_copy.iter().try_for_each(copy_one_file)?;
        spec_cp_ctx.builder_cp_report.add_files(n_tasks);
        return Ok(());
    };

    thread_pool.install(|| l_tasks_file_copy.par_iter().try_for_each(copy_one_file))?;
    spec_cp_ctx.builder_cp_report.add_files(n_tasks);
    Ok(())
}

/// Push `path_root` onto the set of directories on the current walk path.
///
/// Returns `(b_is_loop, identifier)`. Only tracked when following links, since
/// only dereferenced symlinks can lead back into an ancestor.
fn enter_dir(
    path_root: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> CopyTreeResult<(bool, Option<(u64, u64)>)> {
    if spec_cp_ctx.spec_cp_options.rule_symlink != EnumCopySymlinkStrategy::Dereference {
        return Ok((false, None));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        let stat_root = fs::metadata(path_root).map_err(|e| CopyTreeError::InspectEntry {
            path: path_root.to_path_buf(),
            source: e,
        })?;
        let tuple_dirs_identifier = (stat_root.dev(), stat_root.ino());
        if !spec_cp_ctx.set_ancestor_dirs.insert(tuple_dirs_identifier) {
            return Ok((true, None));
        }
        Ok((false, Some(tuple_dirs_identifier)))
    }
    #[cfg(not(unix))]
    {
        let _ = path_root;
        Ok((false, None))
    }
}

/// Whether a dereferenced directory resolves into the destination tree.
///
/// Without links the overlap check in `copy_tree` already rules this out.
fn is_inside_destination(path_dir_src_sub: &Path, spec_cp_ctx: &SpecCopyContext) -> bool {
    if spec_cp_ctx.spec_cp_options.rule_symlink != EnumCopySymlinkStrategy::Dereference {
        return false;
    }
    resolve_path(path_dir_src_sub).starts_with(&spec_cp_ctx.path_dir_dst_resolved)
}

fn walk_directory(path_root: &Path, spec_cp_ctx: &mut SpecCopyContext) -> CopyTreeResult<()> {
    let (b_is_loop, tuple_dirs_identifier) = enter_dir(path_root, spec_cp_ctx)?;
    if b_is_loop {
        spec_cp_ctx.warn(format!("Symlink loop detected: {}", path_root.display()));
        return Ok(());
    }

    let res_walk = walk_entries(path_root, spec_cp_ctx);
    if let Some(tuple_dirs_identifier) = tuple_dirs_identifier {
        spec_cp_ctx.set_ancestor_dirs.remove(&tuple_dirs_identifier);
    }
    res_walk
}

fn walk_entries(path_root: &Path, spec_cp_ctx: &mut SpecCopyContext) -> CopyTreeResult<()> {
    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    let map_err_read = |e: io::Error| CopyTreeError::ReadDirectory {
        path: path_root.to_path_buf(),
        source: e,
    };
    let iter_entries = fs::read_dir(path_root).map_err(map_err_read)?;

    for _entry_res in iter_entries {
        let entry = _entry_res.map_err(map_err_read)?;
        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| CopyTreeError::InspectEntry {
                path: path_entry.clone(),
                source: e,
            })?;
        spec_cp_ctx.builder_cp_report.add_scanned();

        if cfg_file_type.is_dir() {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: c_name,
            });
        } else if cfg_file_type.is_file() {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: c_name,
            });
        } else if cfg_file_type.is_symlink() {
            handle_symlink_entry(path_entry, c_name, &mut l_dirs, &mut l_files, spec_cp_ctx)?;
        } else {
            spec_cp_ctx.builder_cp_report.add_skipped();
            spec_cp_ctx.warn(format!("Special file skipped: {}", path_entry.display()));
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));

    for _dir_entry in l_dirs {
        if is_inside_destination(&_dir_entry.path_dir_src_sub, spec_cp_ctx) {
            spec_cp_ctx.builder_cp_report.add_skipped();
            spec_cp_ctx.warn(format!(
                "Destination subtree skipped: {}",
                _dir_entry.path_dir_src_sub.display()
            ));
            continue;
        }
        handle_dir_entry(&_dir_entry, spec_cp_ctx)?;
        walk_directory(&_dir_entry.path_dir_src_sub, spec_cp_ctx)?;
    }

    for _file_entry in l_files {
        handle_file_entry(_file_entry, spec_cp_ctx);
    }
    Ok(())
}

/// Route a symlink to the dir/file lists, recreate it, or skip it.
fn handle_symlink_entry(
    path_entry: PathBuf,
    c_name: String,
    l_dirs: &mut Vec<SpecDirEntry>,
    l_files: &mut Vec<SpecFileEntry>,
    spec_cp_ctx: &mut SpecCopyContext,
) -> CopyTreeResult<()> {
    match spec_cp_ctx.spec_cp_options.rule_symlink {
        EnumCopySymlinkStrategy::SkipSymlinks => {
            debug!(path = %path_entry.display(), "symlink skipped");
            spec_cp_ctx.builder_cp_report.add_skipped();
        }
        EnumCopySymlinkStrategy::CopySymlinks => {
            let path_link_dst = derive_destination_path(
                &path_entry,
                &c_name,
                &spec_cp_ctx.path_dir_src,
                &spec_cp_ctx.path_dir_dst,
            );
            create_symbolic_link(&path_entry, &path_link_dst).map_err(|e| {
                CopyTreeError::CreateSymlink {
                    path: path_link_dst.clone(),
                    source: e,
                }
            })?;
            spec_cp_ctx.builder_cp_report.add_symlink();
        }
        EnumCopySymlinkStrategy::Dereference => {
            let meta_target = match fs::metadata(&path_entry) {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    spec_cp_ctx.builder_cp_report.add_skipped();
                    spec_cp_ctx.warn(format!("Broken symlink skipped: {}", path_entry.display()));
                    return Ok(());
                }
                Err(e) => {
                    return Err(CopyTreeError::InspectEntry {
                        path: path_entry,
                        source: e,
                    });
                }
            };

            if meta_target.is_dir() {
                l_dirs.push(SpecDirEntry {
                    path_dir_src_sub: path_entry,
                    name_dir: c_name,
                });
            } else if meta_target.is_file() {
                l_files.push(SpecFileEntry {
                    path_file_src: path_entry,
                    name_file: c_name,
                });
            } else {
                spec_cp_ctx.builder_cp_report.add_skipped();
                spec_cp_ctx.warn(format!(
                    "Special file target skipped: {}",
                    path_entry.display()
                ));
            }
        }
    }
    Ok(())
}

fn handle_dir_entry(
    spec_dir_entry: &SpecDirEntry,
    spec_cp_ctx: &mut SpecCopyContext,
) -> CopyTreeResult<()> {
    let path_dir_dst_sub = derive_destination_path(
        &spec_dir_entry.path_dir_src_sub,
        &spec_dir_entry.name_dir,
        &spec_cp_ctx.path_dir_src,
        &spec_cp_ctx.path_dir_dst,
    );
    fs::create_dir_all(&path_dir_dst_sub).map_err(|e| CopyTreeError::CreateDirectory {
        path: path_dir_dst_sub.clone(),
        source: e,
    })?;
    spec_cp_ctx.builder_cp_report.add_dir();
    Ok(())
}

fn handle_file_entry(spec_file_entry: SpecFileEntry, spec_cp_ctx: &mut SpecCopyContext) {
    let path_file_dst = derive_destination_path(
        &spec_file_entry.path_file_src,
        &spec_file_entry.name_file,
        &spec_cp_ctx.path_dir_src,
        &spec_cp_ctx.path_dir_dst,
    );
    spec_cp_ctx.l_tasks_file_copy.push(SpecCopyTaskFile {
        path_file_src: spec_file_entry.path_file_src,
        path_file_dst,
    });
}
