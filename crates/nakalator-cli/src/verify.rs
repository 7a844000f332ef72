//! Post-creation checks
//!
//! Reads back what the repository attached to a new data resource and compares
//! it with what was sent: file count, file order and, through the mapping
//! report, the checksum of every file. Findings are logged; nothing is rolled
//! back.

use crate::api::RemoteFile;
use crate::report::{read_report, ReportRow};
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, warn};

/// Result of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed,
    Warning(String),
    Failed(String),
    Skipped(String),
}

impl CheckOutcome {
    fn log(&self, check: &str) {
        match self {
            CheckOutcome::Passed => info!(check, "Check OK"),
            CheckOutcome::Warning(msg) => warn!(check, "{}", msg),
            CheckOutcome::Failed(msg) => error!(check, "{}", msg),
            CheckOutcome::Skipped(msg) => warn!(check, "Check skipped: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationReport {
    /// The repository listed no files yet
    Unavailable,
    Checked {
        count: CheckOutcome,
        order: CheckOutcome,
        checksums: CheckOutcome,
    },
}

impl VerificationReport {
    pub fn log(&self) {
        match self {
            VerificationReport::Unavailable => {
                warn!("Cannot verify yet, check the data manually on Nakala")
            },
            VerificationReport::Checked {
                count,
                order,
                checksums,
            } => {
                count.log("count");
                order.log("order");
                checksums.log("checksums");
            },
        }
    }

    pub fn has_failures(&self) -> bool {
        match self {
            VerificationReport::Unavailable => false,
            VerificationReport::Checked {
                count,
                order,
                checksums,
            } => [count, order, checksums]
                .iter()
                .any(|c| matches!(c, CheckOutcome::Failed(_))),
        }
    }
}

/// Remote file count against the number of files sent
pub fn check_count(remote: &[RemoteFile], expected: usize) -> CheckOutcome {
    if remote.len() == expected {
        CheckOutcome::Passed
    } else {
        CheckOutcome::Failed(format!(
            "Missing files on Nakala: {} listed, {} sent",
            remote.len(),
            expected
        ))
    }
}

/// Remote file order against the order the files were offered in
pub fn check_order(remote: &[RemoteFile], offered: &[String]) -> CheckOutcome {
    if remote.len() != offered.len() {
        return CheckOutcome::Warning(format!(
            "Cannot compare file order: {} file(s) on Nakala, {} offered.",
            remote.len(),
            offered.len()
        ));
    }

    match remote
        .iter()
        .zip(offered)
        .position(|(remote, local)| remote.name != *local)
    {
        None => CheckOutcome::Passed,
        Some(at) => CheckOutcome::Warning(format!(
            "File order differs from position {} ('{}' instead of '{}'). This happens with parallel uploads or retried files; files can be reordered on the Nakala web interface.",
            at, remote[at].name, offered[at]
        )),
    }
}

/// Report rows against remote files: same names, same checksums
pub fn check_checksums(rows: &[ReportRow], remote: &[RemoteFile]) -> CheckOutcome {
    if let Some(row) = rows.iter().find(|r| r.sha1.as_deref().map_or(true, str::is_empty)) {
        return CheckOutcome::Failed(format!("Checksum missing in the report for '{}'", row.original_name));
    }

    let remote_by_name: HashMap<&str, Option<&str>> = remote
        .iter()
        .map(|f| (f.name.as_str(), f.sha1.as_deref()))
        .collect();

    let mut problems = Vec::new();
    for row in rows {
        match remote_by_name.get(row.original_name.as_str()) {
            None => problems.push(format!("'{}' not found on Nakala", row.original_name)),
            Some(sha1) if *sha1 != row.sha1.as_deref() => {
                problems.push(format!("'{}' has a different checksum on Nakala", row.original_name))
            },
            Some(_) => {},
        }
    }

    let reported: std::collections::HashSet<&str> =
        rows.iter().map(|r| r.original_name.as_str()).collect();
    for file in remote {
        if !reported.contains(file.name.as_str()) {
            problems.push(format!("'{}' is on Nakala but not in the report", file.name));
        }
    }

    if problems.is_empty() {
        CheckOutcome::Passed
    } else {
        CheckOutcome::Failed(problems.join("; "))
    }
}

/// Run every check for one data resource.
///
/// `offered` is the file names in the order they were offered for upload;
/// `report` is the job's mapping report when one could be written.
pub fn verify(
    remote: &[RemoteFile],
    offered: &[String],
    uploaded_count: usize,
    report: Option<&Path>,
) -> VerificationReport {
    if remote.is_empty() {
        return VerificationReport::Unavailable;
    }

    let checksums = match report.map(read_report) {
        Some(Ok(rows)) => check_checksums(&rows, remote),
        Some(Err(e)) => CheckOutcome::Failed(format!("Cannot read the report back: {}", e)),
        None => CheckOutcome::Skipped("no report was written".to_string()),
    };

    VerificationReport::Checked {
        count: check_count(remote, uploaded_count),
        order: check_order(remote, offered),
        checksums,
    }
}
