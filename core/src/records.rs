//! Raw record types as delivered by the warehouse.
//!
//! RULE: records are immutable once ingested. Classification never
//! mutates a record; it produces a ClassificationResult alongside it.

use crate::types::{CountyCode, LenderId, VolumeBasis, Year};
use serde::{Deserialize, Serialize};

/// Anything that can be placed into a (year, metro group) cell and
/// measured for peer selection.
pub trait CellRecord {
    fn lender_id(&self) -> &str;
    fn year(&self) -> Year;
    fn county_code(&self) -> &str;
    fn volume(&self, basis: VolumeBasis) -> f64;
}

// ── Mortgage ───────────────────────────────────────────────────────

/// One mortgage application / origination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplicationRecord {
    pub lender_id: LenderId,
    pub year: Year,
    pub county_code: CountyCode,
    pub loan_amount: f64,
    /// Borrower income in thousands of dollars.
    pub borrower_income: Option<f64>,
    /// Area median family income in dollars.
    pub area_median_family_income: Option<f64>,
    /// Tract median family income as a percent of the area median.
    pub tract_income_ratio: Option<f64>,
    pub tract_minority_pct: Option<f64>,
    pub ethnicity_codes: [Option<u32>; 5],
    pub race_codes: [Option<u32>; 5],
    pub loan_purpose: Option<u32>,
    pub action_taken: Option<u32>,
    pub occupancy_type: Option<u32>,
    pub total_units: Option<u32>,
    pub construction_method: Option<u32>,
    pub reverse_mortgage: Option<u32>,
}

impl LoanApplicationRecord {
    /// A bare originated, owner-occupied, site-built, single-unit loan.
    /// Callers fill in the classification inputs they care about.
    pub fn originated(lender_id: &str, year: Year, county_code: &str, loan_amount: f64) -> Self {
        Self {
            lender_id: lender_id.to_string(),
            year,
            county_code: county_code.to_string(),
            loan_amount,
            borrower_income: None,
            area_median_family_income: None,
            tract_income_ratio: None,
            tract_minority_pct: None,
            ethnicity_codes: [None; 5],
            race_codes: [None; 5],
            loan_purpose: Some(1),
            action_taken: Some(1),
            occupancy_type: Some(1),
            total_units: Some(1),
            construction_method: Some(1),
            reverse_mortgage: Some(2),
        }
    }
}

impl CellRecord for LoanApplicationRecord {
    fn lender_id(&self) -> &str { &self.lender_id }
    fn year(&self) -> Year { self.year }
    fn county_code(&self) -> &str { &self.county_code }

    fn volume(&self, basis: VolumeBasis) -> f64 {
        match basis {
            VolumeBasis::Count  => 1.0,
            VolumeBasis::Amount => self.loan_amount,
        }
    }
}

// ── Small business ─────────────────────────────────────────────────

/// Count and dollar amount (thousands) for one loan-size bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeBucket {
    pub count: u64,
    pub amount: f64,
}

/// One lender's small-business lending for a county-year and tract income group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmallBusinessLoanRecord {
    pub lender_id: LenderId,
    pub year: Year,
    pub county_code: CountyCode,
    pub income_group_code: Option<u32>,
    pub under_100k: SizeBucket,
    pub from_100k_to_250k: SizeBucket,
    pub from_250k_to_1m: SizeBucket,
    pub revenue_under_1m: SizeBucket,
}

impl SmallBusinessLoanRecord {
    pub fn total_count(&self) -> u64 {
        self.under_100k.count + self.from_100k_to_250k.count + self.from_250k_to_1m.count
    }

    pub fn total_amount(&self) -> f64 {
        self.under_100k.amount + self.from_100k_to_250k.amount + self.from_250k_to_1m.amount
    }
}

impl CellRecord for SmallBusinessLoanRecord {
    fn lender_id(&self) -> &str { &self.lender_id }
    fn year(&self) -> Year { self.year }
    fn county_code(&self) -> &str { &self.county_code }

    fn volume(&self, basis: VolumeBasis) -> f64 {
        match basis {
            VolumeBasis::Count  => self.total_count() as f64,
            VolumeBasis::Amount => self.total_amount(),
        }
    }
}

// ── Branches ───────────────────────────────────────────────────────

/// One reported branch-year observation. The same `branch_id` may be
/// reported more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub institution_id: LenderId,
    pub year: Year,
    pub county_code: CountyCode,
    pub branch_id: String,
    pub lmi_tract: bool,
    pub majority_minority_tract: bool,
}

impl CellRecord for BranchRecord {
    fn lender_id(&self) -> &str { &self.institution_id }
    fn year(&self) -> Year { self.year }
    fn county_code(&self) -> &str { &self.county_code }

    fn volume(&self, _basis: VolumeBasis) -> f64 {
        1.0
    }
}
