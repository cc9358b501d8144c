use chrono::NaiveDate;
use core_types::SkipReason;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Insufficient data on {date}: {available} eligible symbols, {required} required")]
    InsufficientData {
        date: NaiveDate,
        available: usize,
        required: usize,
    },

    #[error("Missing price on {date} for active constituents: {}", .symbols.join(", "))]
    MissingPrice {
        date: NaiveDate,
        symbols: Vec<String>,
    },

    #[error("No price data stored for {0}")]
    NoData(NaiveDate),

    #[error("Dates must be processed in ascending order: {date} does not follow {last}")]
    OutOfOrder { date: NaiveDate, last: NaiveDate },

    #[error("The index calculator has terminated; no further dates can be processed")]
    Terminated,

    #[error("No trading date between {start} and {end} could be processed")]
    NoValidDates { start: NaiveDate, end: NaiveDate },

    #[error("Invalid price data: {0}")]
    Data(String),
}

impl IndexError {
    /// Date-scoped errors are skipped and logged; everything else aborts the run.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            IndexError::NoData(_) => Some(SkipReason::NoData),
            IndexError::InsufficientData {
                available,
                required,
                ..
            } => Some(SkipReason::InsufficientData {
                available: *available,
                required: *required,
            }),
            IndexError::MissingPrice { symbols, .. } => Some(SkipReason::MissingPrice {
                symbols: symbols.clone(),
            }),
            _ => None,
        }
    }
}

impl From<core_types::CoreError> for IndexError {
    fn from(error: core_types::CoreError) -> Self {
        IndexError::Data(error.to_string())
    }
}
