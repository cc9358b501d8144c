use crate::rows::metric_rows;
use analytics::SummaryMetrics;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use index_engine::IndexRun;

/// The end-of-run summary as a terminal table.
pub fn summary_table(run: &IndexRun, metrics: &SummaryMetrics) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"]);

    if let (Some(first), Some(last)) = (run.first_date(), run.last_date()) {
        table.add_row(vec!["Period".to_string(), format!("{first} to {last}")]);
    }
    if let Some(point) = run.final_level() {
        table.add_row(vec![
            "Final Index Level".to_string(),
            format!("{:.2}", point.index_value),
        ]);
    }
    for row in metric_rows(metrics, run.skipped.len()) {
        table.add_row(vec![row.metric, row.value]);
    }
    table
}

pub fn print_summary(run: &IndexRun, metrics: &SummaryMetrics) {
    println!("\n{}", summary_table(run, metrics));
}
