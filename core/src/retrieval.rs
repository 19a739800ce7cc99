//! The bulk retrieval seam.
//!
//! The engine never talks to a warehouse directly. Everything it reads
//! comes through a RecordSource, which either returns a (possibly empty)
//! record set or fails.

use crate::{
    area::AssessmentArea,
    crosswalk::GeographyCrosswalkEntry,
    error::AnalysisResult,
    records::{BranchRecord, LoanApplicationRecord, SmallBusinessLoanRecord},
    types::{CountyCode, LenderId, Year},
};

/// What to pull. `lender_id: None` pulls every lender in the geography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub lender_id: Option<LenderId>,
    pub counties: Vec<CountyCode>,
    pub years: Vec<Year>,
}

impl RecordQuery {
    pub fn for_lender(lender_id: &str, area: &AssessmentArea) -> Self {
        Self {
            lender_id: Some(lender_id.to_string()),
            counties: area.counties().iter().cloned().collect(),
            years: area.years().iter().copied().collect(),
        }
    }

    pub fn market(counties: Vec<CountyCode>, years: Vec<Year>) -> Self {
        Self { lender_id: None, counties, years }
    }
}

pub trait RecordSource {
    fn crosswalk_entries(&self) -> AnalysisResult<Vec<GeographyCrosswalkEntry>>;

    fn mortgage_records(&self, query: &RecordQuery) -> AnalysisResult<Vec<LoanApplicationRecord>>;

    fn small_business_records(
        &self,
        query: &RecordQuery,
    ) -> AnalysisResult<Vec<SmallBusinessLoanRecord>>;

    fn branch_records(&self, query: &RecordQuery) -> AnalysisResult<Vec<BranchRecord>>;
}
