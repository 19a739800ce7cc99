//! Tract and borrower classification.
//!
//! Every function here is pure and null-tolerant: a missing input yields
//! `None` ("unclassified") for that one dimension, never an error.
//!
//! RULE: race/ethnicity priority is fixed.
//!   1. Any Hispanic ethnicity code → Hispanic, whatever the race fields say.
//!   2. Otherwise the first race field (1→5) that is present and not a
//!      non-response sentinel decides the category.
//!   3. Otherwise unclassified.

use crate::{
    config::{ClassificationConfig, IncomeGroupTable, MortgageScope},
    records::{LoanApplicationRecord, SmallBusinessLoanRecord},
};
use serde::{Deserialize, Serialize};

// ── Categories ─────────────────────────────────────────────────────

/// Income relative to area median (tract or borrower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeLevel {
    Low,
    Moderate,
    Middle,
    Upper,
}

impl IncomeLevel {
    pub const ALL: [IncomeLevel; 4] = [
        IncomeLevel::Low,
        IncomeLevel::Moderate,
        IncomeLevel::Middle,
        IncomeLevel::Upper,
    ];

    pub fn is_low_to_moderate(&self) -> bool {
        matches!(self, IncomeLevel::Low | IncomeLevel::Moderate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceEthnicity {
    Hispanic,
    Black,
    Asian,
    NativeAmerican,
    PacificIslander,
    WhiteOther,
}

impl RaceEthnicity {
    pub const ALL: [RaceEthnicity; 6] = [
        RaceEthnicity::Hispanic,
        RaceEthnicity::Black,
        RaceEthnicity::Asian,
        RaceEthnicity::NativeAmerican,
        RaceEthnicity::PacificIslander,
        RaceEthnicity::WhiteOther,
    ];

    pub fn is_minority(&self) -> bool {
        !matches!(self, RaceEthnicity::WhiteOther)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanPurpose {
    HomePurchase,
    HomeImprovement,
    Refinance,
    CashOutRefinance,
    Other,
    NotApplicable,
}

impl LoanPurpose {
    pub const ALL: [LoanPurpose; 6] = [
        LoanPurpose::HomePurchase,
        LoanPurpose::HomeImprovement,
        LoanPurpose::Refinance,
        LoanPurpose::CashOutRefinance,
        LoanPurpose::Other,
        LoanPurpose::NotApplicable,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1  => Some(LoanPurpose::HomePurchase),
            2  => Some(LoanPurpose::HomeImprovement),
            31 => Some(LoanPurpose::Refinance),
            32 => Some(LoanPurpose::CashOutRefinance),
            4  => Some(LoanPurpose::Other),
            5  => Some(LoanPurpose::NotApplicable),
            _  => None,
        }
    }
}

/// Everything classification attaches to one mortgage record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub tract_income: Option<IncomeLevel>,
    pub low_mod_income_tract: Option<bool>,
    pub majority_minority_tract: Option<bool>,
    pub borrower_income: Option<IncomeLevel>,
    pub low_mod_income_borrower: Option<bool>,
    pub race_ethnicity: Option<RaceEthnicity>,
    pub minority_borrower: bool,
    pub loan_purpose: Option<LoanPurpose>,
}

// ── Classifier ─────────────────────────────────────────────────────

pub struct Classifier<'a> {
    config: &'a ClassificationConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a ClassificationConfig) -> Self {
        Self { config }
    }

    /// LMICT iff the tract income ratio is present and <= the LMI ceiling.
    pub fn low_mod_income_tract(&self, tract_income_ratio: Option<f64>) -> Option<bool> {
        tract_income_ratio
            .filter(|r| r.is_finite())
            .map(|r| r <= self.config.lmi_ratio_max)
    }

    /// MMCT iff the minority percentage is present and strictly above the floor.
    pub fn majority_minority_tract(&self, minority_pct: Option<f64>) -> Option<bool> {
        minority_pct
            .filter(|p| p.is_finite())
            .map(|p| p > self.config.mmct_minority_pct_min)
    }

    pub fn income_level(&self, ratio: Option<f64>) -> Option<IncomeLevel> {
        let r = ratio.filter(|r| r.is_finite())?;
        let c = self.config;
        Some(if r < c.low_income_ratio_below {
            IncomeLevel::Low
        } else if r <= c.lmi_ratio_max {
            IncomeLevel::Moderate
        } else if r < c.middle_income_ratio_below {
            IncomeLevel::Middle
        } else {
            IncomeLevel::Upper
        })
    }

    pub fn borrower_income_level(
        &self,
        borrower_income_thousands: Option<f64>,
        area_median_family_income: Option<f64>,
    ) -> Option<IncomeLevel> {
        self.income_level(borrower_income_ratio(
            borrower_income_thousands,
            area_median_family_income,
        ))
    }

    pub fn low_mod_income_borrower(
        &self,
        borrower_income_thousands: Option<f64>,
        area_median_family_income: Option<f64>,
    ) -> Option<bool> {
        borrower_income_ratio(borrower_income_thousands, area_median_family_income)
            .map(|r| r <= self.config.lmi_ratio_max)
    }

    pub fn race_ethnicity(
        &self,
        ethnicity_codes: &[Option<u32>; 5],
        race_codes: &[Option<u32>; 5],
    ) -> Option<RaceEthnicity> {
        let c = self.config;
        if ethnicity_codes
            .iter()
            .flatten()
            .any(|code| c.hispanic_ethnicity_codes.contains(code))
        {
            return Some(RaceEthnicity::Hispanic);
        }

        let code = race_codes
            .iter()
            .flatten()
            .find(|code| !c.race_non_response_codes.contains(code))?;

        let table = &c.race_codes;
        Some(if table.black.contains(code) {
            RaceEthnicity::Black
        } else if table.asian.contains(code) {
            RaceEthnicity::Asian
        } else if table.native_american.contains(code) {
            RaceEthnicity::NativeAmerican
        } else if table.pacific_islander.contains(code) {
            RaceEthnicity::PacificIslander
        } else {
            RaceEthnicity::WhiteOther
        })
    }

    pub fn classify_mortgage(&self, record: &LoanApplicationRecord) -> ClassificationResult {
        let race_ethnicity = self.race_ethnicity(&record.ethnicity_codes, &record.race_codes);
        ClassificationResult {
            tract_income: self.income_level(record.tract_income_ratio),
            low_mod_income_tract: self.low_mod_income_tract(record.tract_income_ratio),
            majority_minority_tract: self.majority_minority_tract(record.tract_minority_pct),
            borrower_income: self.borrower_income_level(
                record.borrower_income,
                record.area_median_family_income,
            ),
            low_mod_income_borrower: self.low_mod_income_borrower(
                record.borrower_income,
                record.area_median_family_income,
            ),
            race_ethnicity,
            minority_borrower: is_minority_borrower(race_ethnicity),
            loan_purpose: record.loan_purpose.and_then(LoanPurpose::from_code),
        }
    }
}

/// Borrower income as a percent of area median family income.
/// Income arrives in thousands; the median in dollars.
pub fn borrower_income_ratio(
    borrower_income_thousands: Option<f64>,
    area_median_family_income: Option<f64>,
) -> Option<f64> {
    let income = borrower_income_thousands.filter(|v| v.is_finite())?;
    let median = area_median_family_income.filter(|v| v.is_finite() && *v > 0.0)?;
    Some(income * 1000.0 / median * 100.0)
}

/// True iff the category is one of the minority categories.
/// Unclassified borrowers are not minority borrowers.
pub fn is_minority_borrower(race_ethnicity: Option<RaceEthnicity>) -> bool {
    race_ethnicity.map(|r| r.is_minority()).unwrap_or(false)
}

/// Small-business tract income level from its income-group code.
pub fn income_group_level(table: &IncomeGroupTable, code: Option<u32>) -> Option<IncomeLevel> {
    let code = code?;
    if table.low.contains(&code) {
        Some(IncomeLevel::Low)
    } else if table.moderate.contains(&code) {
        Some(IncomeLevel::Moderate)
    } else if table.middle.contains(&code) {
        Some(IncomeLevel::Middle)
    } else if table.upper.contains(&code) {
        Some(IncomeLevel::Upper)
    } else {
        None
    }
}

pub fn small_business_income_level(
    table: &IncomeGroupTable,
    record: &SmallBusinessLoanRecord,
) -> Option<IncomeLevel> {
    income_group_level(table, record.income_group_code)
}

/// Whether a mortgage record falls inside the configured loan scope.
/// A restricted field that is missing on the record excludes it.
pub fn in_mortgage_scope(scope: &MortgageScope, record: &LoanApplicationRecord) -> bool {
    fn allowed(codes: &[u32], value: Option<u32>) -> bool {
        codes.is_empty() || value.is_some_and(|v| codes.contains(&v))
    }

    allowed(&scope.action_taken_codes, record.action_taken)
        && allowed(&scope.occupancy_types, record.occupancy_type)
        && allowed(&scope.construction_methods, record.construction_method)
        && allowed(&scope.loan_purposes, record.loan_purpose)
        && scope
            .max_total_units
            .map_or(true, |max| record.total_units.is_some_and(|u| u <= max))
        && !(scope.exclude_reverse_mortgages && record.reverse_mortgage == Some(1))
}
