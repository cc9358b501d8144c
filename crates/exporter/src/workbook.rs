use crate::rows::{ChangeRow, PerformanceRow, metric_rows};
use analytics::SummaryMetrics;
use index_engine::IndexRun;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Chart, ChartType, Format, Workbook, Worksheet, XlsxError};

pub const PERFORMANCE_SHEET: &str = "index_performance";
pub const GRAPH_SHEET: &str = "Graph";
pub const COMPOSITION_SHEET: &str = "daily_composition";
pub const CHANGES_SHEET: &str = "composition_changes";
pub const SUMMARY_SHEET: &str = "summary_metrics";

/// Sheet names in workbook order.
pub const SHEETS: [&str; 5] = [
    PERFORMANCE_SHEET,
    GRAPH_SHEET,
    COMPOSITION_SHEET,
    CHANGES_SHEET,
    SUMMARY_SHEET,
];

fn number(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn write_header(sheet: &mut Worksheet, header: &[&str], bold: &Format) -> Result<(), XlsxError> {
    for (col, title) in (0u16..).zip(header) {
        sheet.write_string_with_format(0, col, *title, bold)?;
    }
    Ok(())
}

/// Builds the multi-sheet report, with a line chart of the index level on its own sheet.
///
/// The chart is omitted when the run produced no points.
pub fn build_workbook(run: &IndexRun, metrics: &SummaryMetrics) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet().set_name(PERFORMANCE_SHEET)?;
    write_header(
        sheet,
        &["date", "index_value", "daily_return_pct", "cumulative_return_pct"],
        &bold,
    )?;
    for (row, point) in (1u32..).zip(&run.points) {
        let line = PerformanceRow::from(point);
        sheet.write_string(row, 0, line.date.to_string())?;
        sheet.write_number(row, 1, number(line.index_value))?;
        sheet.write_number(row, 2, number(line.daily_return_pct))?;
        sheet.write_number(row, 3, number(line.cumulative_return_pct))?;
    }

    let graph = workbook.add_worksheet().set_name(GRAPH_SHEET)?;
    if !run.points.is_empty() {
        let last = u32::try_from(run.points.len()).unwrap_or(u32::MAX);
        let mut chart = Chart::new(ChartType::Line);
        chart.title().set_name("Index Value Over Time");
        chart.x_axis().set_name("Date");
        chart.y_axis().set_name("Index Value");
        chart.legend().set_hidden();
        chart
            .add_series()
            .set_categories((PERFORMANCE_SHEET, 1, 0, last, 0))
            .set_values((PERFORMANCE_SHEET, 1, 1, last, 1));
        chart.set_width(1000).set_height(500);
        graph.insert_chart(0, 0, &chart)?;
    }

    let sheet = workbook.add_worksheet().set_name(COMPOSITION_SHEET)?;
    write_header(sheet, &["date", "constituents"], &bold)?;
    for (row, constituency) in (1u32..).zip(&run.constituencies) {
        let symbols: Vec<&str> = constituency.symbols().collect();
        sheet.write_string(row, 0, constituency.date.to_string())?;
        sheet.write_string(row, 1, symbols.join(", "))?;
    }

    let sheet = workbook.add_worksheet().set_name(CHANGES_SHEET)?;
    write_header(
        sheet,
        &["date", "tickers_added", "tickers_removed", "num_added", "num_removed", "change_type"],
        &bold,
    )?;
    for (row, change) in (1u32..).zip(&run.changes) {
        let line = ChangeRow::from(change);
        sheet.write_string(row, 0, line.date.to_string())?;
        sheet.write_string(row, 1, &line.tickers_added)?;
        sheet.write_string(row, 2, &line.tickers_removed)?;
        sheet.write_number(row, 3, line.num_added as f64)?;
        sheet.write_number(row, 4, line.num_removed as f64)?;
        sheet.write_string(row, 5, &line.change_type)?;
    }

    let sheet = workbook.add_worksheet().set_name(SUMMARY_SHEET)?;
    write_header(sheet, &["metric", "value"], &bold)?;
    for (row, metric) in (1u32..).zip(metric_rows(metrics, run.skipped.len())) {
        sheet.write_string(row, 0, &metric.metric)?;
        sheet.write_string(row, 1, &metric.value)?;
    }

    Ok(workbook)
}
