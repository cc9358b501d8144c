use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the selector does when fewer than N symbols are eligible on a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Skip the date entirely and record it as a gap.
    #[default]
    Skip,
    /// Select every eligible symbol, even if that is fewer than N.
    Partial,
}

/// When the calculator resets weights back to 1/N and re-captures basis prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Reset only on dates where the constituency changes.
    #[default]
    OnChange,
    /// Reset on every processed date.
    Daily,
}

/// Which dates the pipeline iterates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarKind {
    /// Every date for which the store holds at least one observation.
    #[default]
    Observed,
    /// Monday to Friday, minus configured holidays.
    Weekdays,
}

/// Classification of a row in the composition change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Inception,
    Rebalance,
    NoChange,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChangeType::Inception => "Inception",
            ChangeType::Rebalance => "Rebalance",
            ChangeType::NoChange => "No Change",
        };
        f.write_str(label)
    }
}

impl FromStr for ShortfallPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(ShortfallPolicy::Skip),
            "partial" => Ok(ShortfallPolicy::Partial),
            other => Err(CoreError::InvalidInput(
                "shortfall_policy".to_string(),
                other.to_string(),
            )),
        }
    }
}

impl FromStr for ResetPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on_change" | "on-change" => Ok(ResetPolicy::OnChange),
            "daily" => Ok(ResetPolicy::Daily),
            other => Err(CoreError::InvalidInput(
                "reset_policy".to_string(),
                other.to_string(),
            )),
        }
    }
}
