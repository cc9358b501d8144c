use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Observation for {symbol} is dated {found}, expected {expected}")]
    DateMismatch {
        symbol: String,
        expected: chrono::NaiveDate,
        found: chrono::NaiveDate,
    },
}
