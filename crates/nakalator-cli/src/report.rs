//! Mapping reports
//!
//! One `;`-separated CSV per job maps each uploaded file to its checksum and
//! to the identifiers of its data resource and collection. Same-collection
//! batches can merge those files into a single tab-separated one.

use crate::api::UploadedFile;
use crate::error::Result;
use chrono::{DateTime, Local};
use nakalator_common::naming::{file_name, file_safe_id};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One uploaded file in a mapping report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub index: usize,
    pub original_name: String,
    pub collection_doi: Option<String>,
    pub data_doi: String,
    pub sha1: Option<String>,
}

/// Rows for a job, in upload order
pub fn build_rows(uploaded: &[UploadedFile], collection: Option<&str>, data_id: &str) -> Vec<ReportRow> {
    uploaded
        .iter()
        .enumerate()
        .map(|(index, file)| ReportRow {
            index,
            original_name: file.name.clone(),
            collection_doi: collection.map(str::to_string),
            data_doi: data_id.to_string(),
            sha1: Some(file.sha1.clone()),
        })
        .collect()
}

/// `data_<n>_<collection>_<data>_mapping_ids_<timestamp>.csv`; the collection
/// part is left out when the data has none.
pub fn report_file_name(
    position: usize,
    collection: Option<&str>,
    data_id: &str,
    at: DateTime<Local>,
) -> String {
    let stamp = at.format("%Y%m%d_%H%M%S");
    match collection {
        Some(collection) => format!(
            "data_{}_{}_{}_mapping_ids_{}.csv",
            position,
            file_safe_id(collection),
            file_safe_id(data_id),
            stamp
        ),
        None => format!(
            "data_{}_{}_mapping_ids_{}.csv",
            position,
            file_safe_id(data_id),
            stamp
        ),
    }
}

/// Name of the merged report of a collection
pub fn merged_file_name(collection: &str) -> String {
    format!("merge_{}_mapping_ids_all.csv", file_safe_id(collection))
}

fn write_rows(path: &Path, delimiter: u8, rows: &[ReportRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a job report into `dir`, creating it when needed
pub fn write_report(dir: &Path, name: &str, rows: &[ReportRow]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    write_rows(&path, b';', rows)?;
    debug!(path = %path.display(), rows = rows.len(), "Report written");
    Ok(path)
}

/// Read a job report back
pub fn read_report(path: &Path) -> Result<Vec<ReportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<ReportRow>, _>>()?;
    Ok(rows)
}

/// Concatenate job reports, sorted by file name descending, into one
/// tab-separated file in `dir`.
pub fn merge_reports(dir: &Path, reports: &[PathBuf], collection: &str) -> Result<PathBuf> {
    let mut sorted: Vec<&PathBuf> = reports.iter().collect();
    sorted.sort_by_key(|path| std::cmp::Reverse(file_name(path)));

    let mut rows = Vec::new();
    for report in sorted {
        rows.extend(read_report(report)?);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(merged_file_name(collection));
    write_rows(&path, b'\t', &rows)?;
    info!(path = %path.display(), reports = reports.len(), rows = rows.len(), "Reports merged");
    Ok(path)
}
