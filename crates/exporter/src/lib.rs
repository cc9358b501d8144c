//! # Report Exporter
//!
//! Renders a completed index run to disk and to the terminal:
//!
//! - `index_performance.csv`: the index level series.
//! - `daily_composition.csv`: every constituent of every processed date, in rank order.
//! - `composition_changes.csv`: the change log, one row per processed date.
//! - `summary_metrics.csv` and `summary_metrics.json`: the summary metrics.
//! - `skipped_dates.csv`: dates that produced no index point, with the reason.
//! - `index_analysis.xlsx`: the same tables as one workbook, plus a `Graph` sheet
//!   charting the index level.
//!
//! Existing files are overwritten.

pub mod console;
pub mod error;
pub mod rows;
pub mod workbook;
pub mod writer;

pub use console::{print_summary, summary_table};
pub use error::ExportError;
pub use rows::{ChangeRow, CompositionRow, MetricRow, PerformanceRow, SkippedRow, metric_rows};
pub use workbook::build_workbook;
pub use writer::{ExportedFiles, ReportExporter};
