//! Shared primitive types used across the engine.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A lender / institution identifier (LEI, RSSD or respondent id).
pub type LenderId = String;

/// A 5-digit county geography code (state FIPS + county FIPS).
pub type CountyCode = String;

/// A reporting year.
pub type Year = u16;

/// The three report families the engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFamily {
    Mortgage,
    SmallBusiness,
    Branch,
}

impl DataFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFamily::Mortgage      => "mortgage",
            DataFamily::SmallBusiness => "small_business",
            DataFamily::Branch        => "branch",
        }
    }
}

impl fmt::Display for DataFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How lender volume is measured when building a peer band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBasis {
    Count,
    Amount,
}

/// Order identifiers numerically when both are numeric, lexically otherwise.
///
/// Institution ids arrive as strings ("3", "10", "5493001KJTIIGC8Y1R12"),
/// and "lowest institution id" must mean 3 < 10.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
