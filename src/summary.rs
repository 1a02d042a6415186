//! Session summary ledger.
//!
//! Every saved non-compliant still gets one row in an in-memory ledger;
//! the ledger is written out as a small CSV exactly once, at shutdown. A
//! session with no saved violations leaves no summary file behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::evaluate::ComplianceVerdict;

pub const SUMMARY_HEADER: &str = "Frame,Timestamp,Missing Items,Filepath";

/// One saved violation: which frame, when, what was missing, where the
/// still landed. Timestamps carry microseconds, captured at append time,
/// in the same format the alert log uses.
#[derive(Clone, Debug)]
pub struct SummaryRecord {
    pub frame_index: u64,
    pub timestamp: String,
    pub missing_items: String,
    pub evidence_path: String,
}

/// Append-only ledger, flushed as CSV at end of session.
pub struct SessionSummary {
    path: PathBuf,
    records: Vec<SummaryRecord>,
}

impl SessionSummary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one saved still. Duplicate frame indices are kept as-is; the
    /// ledger is a log, not a set.
    pub fn append(&mut self, verdict: &ComplianceVerdict, evidence_path: &Path) {
        self.records.push(SummaryRecord {
            frame_index: verdict.frame_index,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            missing_items: verdict.joined_items(),
            evidence_path: evidence_path.display().to_string(),
        });
    }

    pub fn records(&self) -> &[SummaryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the CSV. Returns false without touching the filesystem when
    /// the ledger is empty.
    pub fn flush(&self) -> Result<bool> {
        if self.records.is_empty() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("creating summary directory {}", parent.display())
                })?;
            }
        }
        let mut out = String::with_capacity(64 * (self.records.len() + 1));
        out.push_str(SUMMARY_HEADER);
        out.push('\n');
        for record in &self.records {
            out.push_str(&format!(
                "{},{},{},{}\n",
                record.frame_index,
                csv_field(&record.timestamp),
                csv_field(&record.missing_items),
                csv_field(&record.evidence_path)
            ));
        }
        std::fs::write(&self.path, out)
            .with_context(|| format!("writing session summary {}", self.path.display()))?;
        Ok(true)
    }
}

/// Quote a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::MissingItem;

    fn verdict(frame_index: u64, missing: Vec<MissingItem>) -> ComplianceVerdict {
        ComplianceVerdict {
            frame_index,
            missing_items: missing,
        }
    }

    #[test]
    fn empty_ledger_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let summary = SessionSummary::new(dir.path().join("alerts_summary.csv"));
        assert!(!summary.flush().unwrap());
        assert!(!summary.path().exists());
    }

    #[test]
    fn multi_item_rows_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = SessionSummary::new(dir.path().join("alerts_summary.csv"));
        summary.append(
            &verdict(42, vec![MissingItem::Helmet, MissingItem::VestHarness]),
            Path::new("saved_frames/non_compliant/x.jpg"),
        );
        assert!(summary.flush().unwrap());

        let contents = std::fs::read_to_string(summary.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], SUMMARY_HEADER);
        assert!(lines[1].starts_with("42,"));
        assert!(lines[1].contains("\"helmet, vest/harness\""));
        assert!(lines[1].ends_with("saved_frames/non_compliant/x.jpg"));
    }

    #[test]
    fn duplicate_frame_indices_keep_both_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = SessionSummary::new(dir.path().join("summary.csv"));
        let v = verdict(30, vec![MissingItem::Gloves]);
        summary.append(&v, Path::new("a.jpg"));
        summary.append(&v, Path::new("b.jpg"));
        assert_eq!(summary.len(), 2);
        summary.flush().unwrap();

        let contents = std::fs::read_to_string(summary.path()).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn timestamps_carry_microseconds() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = SessionSummary::new(dir.path().join("summary.csv"));
        summary.append(&verdict(10, vec![MissingItem::Boots]), Path::new("x.jpg"));
        let ts = &summary.records()[0].timestamp;
        assert_eq!(ts.len(), "2026-01-01 00:00:00.000000".len());
        let fraction = ts.rsplit('.').next().unwrap();
        assert_eq!(fraction.len(), 6);
        assert!(fraction.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn flush_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("alerts_summary.csv");
        let mut summary = SessionSummary::new(&path);
        summary.append(&verdict(10, vec![MissingItem::Helmet]), Path::new("x.jpg"));
        assert!(summary.flush().unwrap());
        assert!(path.is_file());
    }

    #[test]
    fn csv_quoting_doubles_inner_quotes() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
