// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Outcome reports.
//!
//! Batch operations never stop at the first bad path. Instead, every path
//! lands in exactly one bucket of a report, and the report is printed in
//! full once the batch is done.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Doctor outcome bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Live entry already converged.
    DidNotTouch,

    /// Live entry now links to repository.
    ReplacedWithSymlink,

    /// Stale link into repository was removed or materialized.
    UnlinkedOrphanSymlink,

    /// Ambiguous state left for the user.
    RequireManualResolve,
}

/// Four-way partition of reconciliation outcomes.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    pub did_not_touch: Vec<String>,
    pub replaced_with_symlink: Vec<String>,
    pub unlinked_orphan_symlink: Vec<String>,
    pub require_manual_resolve: Vec<String>,
}

impl DoctorReport {
    /// Record entry in bucket.
    pub fn push(&mut self, bucket: Bucket, entry: impl Into<String>) {
        let entry = entry.into();
        match bucket {
            Bucket::DidNotTouch => self.did_not_touch.push(entry),
            Bucket::ReplacedWithSymlink => self.replaced_with_symlink.push(entry),
            Bucket::UnlinkedOrphanSymlink => self.unlinked_orphan_symlink.push(entry),
            Bucket::RequireManualResolve => self.require_manual_resolve.push(entry),
        }
    }

    /// Append every bucket of other report after our own entries.
    pub fn append(&mut self, mut other: DoctorReport) {
        self.did_not_touch.append(&mut other.did_not_touch);
        self.replaced_with_symlink.append(&mut other.replaced_with_symlink);
        self.unlinked_orphan_symlink.append(&mut other.unlinked_orphan_symlink);
        self.require_manual_resolve.append(&mut other.require_manual_resolve);
    }

    /// Nothing requires manual reconcile.
    pub fn is_converged(&self) -> bool {
        self.require_manual_resolve.is_empty()
    }
}

impl Display for DoctorReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let sections = [
            ("did not touch:", &self.did_not_touch),
            ("replaced with symlink:", &self.replaced_with_symlink),
            ("unlinked orphan symlink:", &self.unlinked_orphan_symlink),
            ("require manual reconcile:", &self.require_manual_resolve),
        ];

        for (heading, entries) in sections {
            writeln!(fmt, "{heading}")?;
            write_entries(fmt, "  ", entries)?;
        }

        Ok(())
    }
}

/// Three-way partition of track, untrack, or unlink outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    action: String,
    changed: bool,
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl OperationReport {
    /// Construct new empty report for named action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            changed: false,
            succeeded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Record path whose operation went through.
    pub fn succeed(&mut self, entry: impl Into<String>) {
        self.changed = true;
        self.succeeded.push(entry.into());
    }

    /// Record path left alone, with reason.
    pub fn skip(&mut self, entry: impl Display, reason: impl Display) {
        self.skipped.push(format!("{entry}: {reason}"));
    }

    /// Record path whose operation failed, with reason.
    pub fn fail(&mut self, entry: impl Display, reason: impl Display) {
        self.failed.push(format!("{entry}: {reason}"));
    }

    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// At least one path changed on disk.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

impl Display for OperationReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{} summary:", self.action)?;
        let sections = [
            ("succeeded:", &self.succeeded),
            ("skipped:", &self.skipped),
            ("failed:", &self.failed),
        ];

        for (heading, entries) in sections {
            writeln!(fmt, "  {heading}")?;
            write_entries(fmt, "    ", entries)?;
        }

        Ok(())
    }
}

fn write_entries(fmt: &mut Formatter<'_>, indent: &str, entries: &[String]) -> FmtResult {
    if entries.is_empty() {
        return writeln!(fmt, "{indent}(none)");
    }

    for entry in entries {
        writeln!(fmt, "{indent}- {entry}")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_doctor_report() {
        let mut report = DoctorReport::default();
        report.push(Bucket::DidNotTouch, "git/config");
        report.push(Bucket::DidNotTouch, "nvim/init.lua");
        report.push(Bucket::UnlinkedOrphanSymlink, "old/rc (removed dangling symlink)");

        let expect = indoc! {"
            did not touch:
              - git/config
              - nvim/init.lua
            replaced with symlink:
              (none)
            unlinked orphan symlink:
              - old/rc (removed dangling symlink)
            require manual reconcile:
              (none)
        "};
        assert_eq!(report.to_string(), expect);
        assert!(report.is_converged());
    }

    #[test]
    fn append_keeps_order() {
        let mut report = DoctorReport::default();
        report.push(Bucket::RequireManualResolve, "z/managed");

        let mut orphans = DoctorReport::default();
        orphans.push(Bucket::RequireManualResolve, "a/orphan");
        report.append(orphans);

        assert_eq!(report.require_manual_resolve, vec!["z/managed", "a/orphan"]);
        assert!(!report.is_converged());
    }

    #[test]
    fn render_operation_report() {
        let mut report = OperationReport::new("add");
        report.succeed("git/config");
        report.skip("nvim/init.lua", "already tracked");

        let expect = indoc! {"
            add summary:
              succeeded:
                - git/config
              skipped:
                - nvim/init.lua: already tracked
              failed:
                (none)
        "};
        assert_eq!(report.to_string(), expect);
        assert!(report.changed());
    }

    #[test]
    fn skips_and_failures_do_not_mark_changed() {
        let mut report = OperationReport::new("unlink");
        report.skip("a", "live file missing");
        report.fail("b", "invalid path");

        assert!(!report.changed());
        assert_eq!(report.action(), "unlink");
    }
}
