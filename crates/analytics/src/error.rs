use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("Not enough data to perform calculation: {0}")]
    NotEnoughData(String),

    #[error("Metric is undefined for a degenerate series: {0}")]
    DegenerateSeries(String),

    #[error("Error in calculation: {0}")]
    Calculation(String),
}
