//! Data-quality notes attached to a family report.
//!
//! None of these are failures. They are how the engine tells a reader
//! why a number is missing or where a fallback was applied.

use crate::{
    crosswalk::MetroGroupKey,
    types::{CountyCode, DataFamily, Year},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataQualityNote {
    /// County had no crosswalk entry; its records were grouped under `fallback`.
    UnmappedCounty {
        county_code: CountyCode,
        fallback: MetroGroupKey,
    },
    /// The subject has no volume in this cell, so peer metrics were not computed.
    InsufficientSubjectVolume {
        year: Year,
        metro: MetroGroupKey,
    },
    /// The subject has no records anywhere in the assessment area.
    NoSubjectActivity {
        family: DataFamily,
    },
    /// Retrieval returned records outside the requested counties/years; dropped.
    RecordsOutsideArea {
        count: usize,
    },
    /// Mortgage records outside the configured loan scope; dropped.
    RecordsOutOfScope {
        count: usize,
    },
}

impl DataQualityNote {
    /// Emit the note to the log at the level it deserves.
    pub fn log(&self, family: DataFamily) {
        match self {
            DataQualityNote::UnmappedCounty { county_code, fallback } => {
                log::warn!(
                    "[{family}] county {county_code} has no crosswalk entry; grouped as {fallback}"
                );
            }
            DataQualityNote::InsufficientSubjectVolume { year, metro } => {
                log::warn!(
                    "[{family}] {year} {metro}: insufficient subject volume for a peer band"
                );
            }
            DataQualityNote::NoSubjectActivity { .. } => {
                log::info!("[{family}] subject has no activity in the assessment area");
            }
            DataQualityNote::RecordsOutsideArea { count } => {
                log::warn!("[{family}] dropped {count} records outside the assessment area");
            }
            DataQualityNote::RecordsOutOfScope { count } => {
                log::debug!("[{family}] {count} records outside the loan scope");
            }
        }
    }
}
