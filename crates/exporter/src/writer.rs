use crate::error::ExportError;
use crate::rows::{ChangeRow, CompositionRow, PerformanceRow, SkippedRow, metric_rows};
use crate::workbook::build_workbook;
use analytics::SummaryMetrics;
use index_engine::IndexRun;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const PERFORMANCE_FILE: &str = "index_performance.csv";
pub const COMPOSITION_FILE: &str = "daily_composition.csv";
pub const CHANGES_FILE: &str = "composition_changes.csv";
pub const SUMMARY_CSV_FILE: &str = "summary_metrics.csv";
pub const SUMMARY_JSON_FILE: &str = "summary_metrics.json";
pub const SKIPPED_FILE: &str = "skipped_dates.csv";
pub const WORKBOOK_FILE: &str = "index_analysis.xlsx";

/// Paths of everything one export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub performance: PathBuf,
    pub composition: PathBuf,
    pub changes: PathBuf,
    pub summary_csv: PathBuf,
    pub summary_json: PathBuf,
    pub skipped: PathBuf,
    pub workbook: PathBuf,
}

impl ExportedFiles {
    pub fn all(&self) -> [&Path; 7] {
        [
            self.performance.as_path(),
            self.composition.as_path(),
            self.changes.as_path(),
            self.summary_csv.as_path(),
            self.summary_json.as_path(),
            self.skipped.as_path(),
            self.workbook.as_path(),
        ]
    }
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    metrics: &'a SummaryMetrics,
    skipped_dates: usize,
    first_date: Option<chrono::NaiveDate>,
    last_date: Option<chrono::NaiveDate>,
}

/// Writes a completed run to a directory.
#[derive(Debug, Clone)]
pub struct ReportExporter {
    directory: PathBuf,
}

impl ReportExporter {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn export(&self, run: &IndexRun, metrics: &SummaryMetrics) -> Result<ExportedFiles, ExportError> {
        fs::create_dir_all(&self.directory).map_err(|source| ExportError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let files = ExportedFiles {
            performance: self.write_csv(
                PERFORMANCE_FILE,
                &["date", "index_value", "daily_return_pct", "cumulative_return_pct", "constituents"],
                run.points.iter().map(PerformanceRow::from),
            )?,
            composition: self.write_csv(
                COMPOSITION_FILE,
                &["date", "rank", "symbol", "market_cap", "weight"],
                run.constituencies.iter().flat_map(CompositionRow::for_constituency),
            )?,
            changes: self.write_csv(
                CHANGES_FILE,
                &["date", "tickers_added", "tickers_removed", "num_added", "num_removed", "change_type"],
                run.changes.iter().map(ChangeRow::from),
            )?,
            summary_csv: self.write_csv(
                SUMMARY_CSV_FILE,
                &["metric", "value"],
                metric_rows(metrics, run.skipped.len()),
            )?,
            summary_json: self.write_summary_json(run, metrics)?,
            skipped: self.write_csv(
                SKIPPED_FILE,
                &["date", "reason"],
                run.skipped.iter().map(SkippedRow::from),
            )?,
            workbook: self.write_workbook(run, metrics)?,
        };

        tracing::info!(directory = %self.directory.display(), "Report exported");
        Ok(files)
    }

    /// Writes the header explicitly so that an empty table still has one.
    fn write_csv<T, I>(&self, file_name: &str, header: &[&str], rows: I) -> Result<PathBuf, ExportError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let path = self.directory.join(file_name);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;
        writer.write_record(header)?;
        let mut count = 0usize;
        for row in rows {
            writer.serialize(row)?;
            count += 1;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(file = file_name, rows = count, "Wrote table");
        Ok(path)
    }

    fn write_workbook(&self, run: &IndexRun, metrics: &SummaryMetrics) -> Result<PathBuf, ExportError> {
        let path = self.directory.join(WORKBOOK_FILE);
        build_workbook(run, metrics)?.save(&path)?;
        tracing::debug!(file = WORKBOOK_FILE, "Wrote workbook");
        Ok(path)
    }

    fn write_summary_json(&self, run: &IndexRun, metrics: &SummaryMetrics) -> Result<PathBuf, ExportError> {
        let path = self.directory.join(SUMMARY_JSON_FILE);
        let document = SummaryDocument {
            metrics,
            skipped_dates: run.skipped.len(),
            first_date: run.first_date(),
            last_date: run.last_date(),
        };
        let body = serde_json::to_string_pretty(&document)?;
        fs::write(&path, body).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
