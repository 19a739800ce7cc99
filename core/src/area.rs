//! Assessment area: the caller-supplied counties and years under review.
//! The engine never infers or widens it.

use crate::{
    error::{AnalysisError, AnalysisResult},
    records::CellRecord,
    types::{CountyCode, Year},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentArea {
    counties: BTreeSet<CountyCode>,
    years: BTreeSet<Year>,
}

impl AssessmentArea {
    pub fn new<C, Y>(counties: C, years: Y) -> AnalysisResult<Self>
    where
        C: IntoIterator,
        C::Item: Into<CountyCode>,
        Y: IntoIterator<Item = Year>,
    {
        let counties: BTreeSet<CountyCode> = counties.into_iter().map(Into::into).collect();
        let years: BTreeSet<Year> = years.into_iter().collect();

        if counties.is_empty() {
            return Err(AnalysisError::InvalidAssessmentArea(
                "at least one county is required".into(),
            ));
        }
        if years.is_empty() {
            return Err(AnalysisError::InvalidAssessmentArea(
                "at least one year is required".into(),
            ));
        }
        if let Some(bad) = counties
            .iter()
            .find(|c| c.len() != 5 || !c.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(AnalysisError::InvalidAssessmentArea(format!(
                "county code '{bad}' is not a 5-digit geography code"
            )));
        }
        Ok(Self { counties, years })
    }

    pub fn counties(&self) -> &BTreeSet<CountyCode> {
        &self.counties
    }

    pub fn years(&self) -> &BTreeSet<Year> {
        &self.years
    }

    pub fn contains(&self, county_code: &str, year: Year) -> bool {
        self.years.contains(&year) && self.counties.contains(county_code)
    }

    pub fn covers<R: CellRecord>(&self, record: &R) -> bool {
        self.contains(record.county_code(), record.year())
    }
}
