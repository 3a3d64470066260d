//! `sdkinit_io_fs` v1:
//! Tree copier used at container start to publish protocol definitions.
//!
//! Modules:
//! - `copy`   : traversal and copy orchestration
//! - `spec`   : enums/options/errors
//! - `report` : run-time report model
//! - `util`   : shared helper functions

pub mod copy;
pub mod report;
pub mod spec;
mod util;

pub use copy::copy_tree;
pub use report::{ReportCopy, ReportCopyBuilder};
pub use spec::{CopyTreeError, CopyTreeResult, EnumCopySymlinkStrategy, SpecCopyOptions};
