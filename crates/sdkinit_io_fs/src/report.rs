//! Copy report and its accumulator.

use std::fmt;

/// Counters and diagnostics for one successful `copy_tree` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportCopy {
    /// Source entries listed during the walk.
    pub cnt_scanned: u64,
    /// Destination directories ensured.
    pub cnt_dirs: u64,
    /// Regular files copied.
    pub cnt_files: u64,
    /// Symbolic links recreated.
    pub cnt_symlinks: u64,
    /// Entries left out by symlink policy or entry type.
    pub cnt_skipped: u64,
    /// Non-fatal warnings, in walk order.
    pub warnings: Vec<String>,
}

impl ReportCopy {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[COPY] scanned={} dirs={} files={} symlinks={} skipped={} warnings={}",
            self.cnt_scanned,
            self.cnt_dirs,
            self.cnt_files,
            self.cnt_symlinks,
            self.cnt_skipped,
            self.warning_count()
        )
    }
}

/// Accumulates counts while the walk is running.
#[derive(Debug, Default)]
pub struct ReportCopyBuilder {
    report: ReportCopy,
}

impl ReportCopyBuilder {
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub fn add_dir(&mut self) {
        self.report.cnt_dirs += 1;
    }

    /// Record a batch of `n_files` copied files.
    pub fn add_files(&mut self, n_files: u64) {
        self.report.cnt_files += n_files;
    }

    pub fn add_symlink(&mut self) {
        self.report.cnt_symlinks += 1;
    }

    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    pub fn build(self) -> ReportCopy {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::ReportCopyBuilder;

    #[test]
    fn builder_accumulates_into_one_line_summary() {
        let mut builder = ReportCopyBuilder::default();
        for _ in 0..8 {
            builder.add_scanned();
        }
        builder.add_dir();
        builder.add_dir();
        builder.add_files(3);
        builder.add_files(2);
        builder.add_skipped();
        builder.add_warning("Special file skipped: /protos/agent.sock".to_string());

        let report = builder.build();
        assert_eq!(report.cnt_files, 5);
        assert_eq!(report.cnt_symlinks, 0);
        assert_eq!(report.warning_count(), 1);
        assert_eq!(
            report.to_string(),
            "[COPY] scanned=8 dirs=2 files=5 symlinks=0 skipped=1 warnings=1"
        );
    }

    #[test]
    fn empty_builder_yields_zero_report() {
        let report = ReportCopyBuilder::default().build();
        assert_eq!(
            report.to_string(),
            "[COPY] scanned=0 dirs=0 files=0 symlinks=0 skipped=0 warnings=0"
        );
    }
}
