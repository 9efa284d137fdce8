//! Snapshot export
//!
//! Reads every stored job, most recently seen first, into one record set and
//! writes it twice:
//!
//! - an xlsx workbook with an `All Jobs` sheet and one sheet per source
//! - a flat CSV with the same header and rows as `All Jobs`
//!
//! The header is the union of all records' columns in order of first
//! appearance; a record without a column gets an empty cell.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::JobPosting;
use crate::storage::{JobStore, SharedStore};
use crate::utils::error::StorageError;
use crate::utils::{format_timestamp, truncate_text, Clock};

/// Name of the sheet holding every row
pub const ALL_JOBS_SHEET: &str = "All Jobs";

/// Excel's limit on sheet name length
const MAX_SHEET_NAME_LEN: usize = 31;

/// Excel's limit on characters in one cell
const MAX_CELL_LEN: usize = 32_767;

/// Header used when there are no records to take columns from
const BASE_COLUMNS: &[&str] = &[
    "id",
    "title",
    "employer_name",
    "location",
    "employment_type",
    "source",
    "job_url",
    "posted_at",
    "closing_date",
    "description",
    "raw_text_snippet",
    "first_seen_at",
    "last_seen_at",
    "sighting_count",
];

/// Errors raised while writing snapshots
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One exported row as ordered (column, value) pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRecord {
    cells: Vec<(String, String)>,
}

impl ExportRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing an earlier value for the same column
    pub fn push(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(c, _)| c == column) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    /// Values for `columns`, empty where missing
    pub fn row<'a>(&'a self, columns: &'a [String]) -> impl Iterator<Item = &'a str> {
        columns.iter().map(|c| self.get(c).unwrap_or_default())
    }
}

impl From<&JobPosting> for ExportRecord {
    fn from(job: &JobPosting) -> Self {
        let mut record = ExportRecord::new();
        record.push("id", job.id.as_str());
        record.push("title", job.title.as_str());
        record.push("employer_name", job.employer_name.as_str());
        record.push("location", job.location.as_str());
        record.push("employment_type", job.employment_type.as_str());
        record.push("source", job.source.as_str());
        record.push("job_url", job.job_url.clone().unwrap_or_default());
        if let Some(url) = &job.source_careers_url {
            record.push("source_careers_url", url.as_str());
        }
        if let Some(id) = job.employer_id {
            record.push("employer_id", id.to_string());
        }
        record.push("posted_at", job.posted_at.as_str());
        record.push("closing_date", job.closing_date.as_str());
        record.push("description", job.description.as_str());
        record.push("raw_text_snippet", job.raw_text_snippet.as_str());
        record.push("first_seen_at", format_timestamp(&job.first_seen_at));
        record.push("last_seen_at", format_timestamp(&job.last_seen_at));
        record.push("sighting_count", job.sighting_count.to_string());
        record
    }
}

/// Union of all records' columns in order of first appearance
pub fn union_columns(records: &[ExportRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for column in records.iter().flat_map(ExportRecord::columns) {
        if seen.insert(column) {
            columns.push(column.to_string());
        }
    }
    columns
}

/// Make a string a legal Excel sheet name
///
/// Drops `[ ] : * ? / \`, trims surrounding apostrophes and whitespace and
/// cuts to 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned: String = cleaned
        .trim()
        .trim_matches('\'')
        .trim()
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .collect();

    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

/// Sanitized sheet name not yet taken (Excel compares names case-insensitively)
fn unique_sheet_name(raw: &str, taken: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(raw);
    let mut name = base.clone();
    let mut n = 2;
    while !taken.insert(name.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        name = format!("{}{suffix}", base.chars().take(keep).collect::<String>());
        n += 1;
    }
    name
}

fn fill_sheet(
    sheet: &mut Worksheet,
    columns: &[String],
    records: &[&ExportRecord],
    header: &Format,
) -> Result<(), XlsxError> {
    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, header)?;
    }
    for (row, record) in records.iter().enumerate() {
        for (col, value) in record.row(columns).enumerate() {
            if value.is_empty() {
                continue;
            }
            let value = if value.chars().count() > MAX_CELL_LEN {
                truncate_text(value, MAX_CELL_LEN)
            } else {
                value.to_string()
            };
            sheet.write_string(row as u32 + 1, col as u16, value)?;
        }
    }
    Ok(())
}

/// Write the workbook: `All Jobs` plus one sheet per source
pub fn write_workbook(
    path: &Path,
    columns: &[String],
    records: &[ExportRecord],
) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let mut taken = HashSet::new();

    let all: Vec<&ExportRecord> = records.iter().collect();
    let sheet = workbook.add_worksheet();
    sheet.set_name(unique_sheet_name(ALL_JOBS_SHEET, &mut taken))?;
    fill_sheet(sheet, columns, &all, &header)?;

    let mut by_source: BTreeMap<&str, Vec<&ExportRecord>> = BTreeMap::new();
    for record in records {
        let source = record.get("source").filter(|s| !s.is_empty()).unwrap_or("unknown");
        by_source.entry(source).or_default().push(record);
    }

    for (source, rows) in &by_source {
        let sheet = workbook.add_worksheet();
        sheet.set_name(unique_sheet_name(source, &mut taken))?;
        fill_sheet(sheet, columns, rows, &header)?;
        debug!(source = %source, rows = rows.len(), "Source sheet written");
    }

    workbook.save(path)?;
    Ok(())
}

/// Write the flat CSV snapshot, returning the number of data rows
pub fn write_csv(path: &Path, columns: &[String], records: &[ExportRecord]) -> Result<usize, ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(record.row(columns))?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Outcome of one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub rows: usize,
    pub columns: usize,
    pub workbook_path: PathBuf,
    pub csv_path: PathBuf,
}

/// Export stage
pub struct Exporter {
    store: SharedStore,
    dir: PathBuf,
    clock: Clock,
}

impl Exporter {
    pub fn new(store: SharedStore, dir: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            store,
            dir: dir.into(),
            clock,
        }
    }

    /// All stored jobs as export records, most recently seen first
    pub fn records(&self) -> Result<Vec<ExportRecord>, ExportError> {
        Ok(self
            .store
            .list_jobs()?
            .iter()
            .map(ExportRecord::from)
            .collect())
    }

    /// Write both snapshots under the export directory
    pub fn export(&self) -> Result<ExportReport, ExportError> {
        let records = self.records()?;
        let mut columns = union_columns(&records);
        if columns.is_empty() {
            columns = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        }

        std::fs::create_dir_all(&self.dir)?;
        let stem = format!("jobs_{}", (self.clock)().format("%Y%m%d_%H%M%S"));
        let workbook_path = self.dir.join(format!("{stem}.xlsx"));
        let csv_path = self.dir.join(format!("{stem}.csv"));

        write_workbook(&workbook_path, &columns, &records)?;
        let rows = write_csv(&csv_path, &columns, &records)?;

        let report = ExportReport {
            rows,
            columns: columns.len(),
            workbook_path,
            csv_path,
        };
        info!(
            rows = report.rows,
            columns = report.columns,
            workbook = %report.workbook_path.display(),
            csv = %report.csv_path.display(),
            "Export complete"
        );
        Ok(report)
    }
}
