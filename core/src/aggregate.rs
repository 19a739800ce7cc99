//! Aggregation: subject / peer / market metrics per (year, metro group) cell.
//!
//! RULE: percentages are null-safe. A zero denominator yields `None`,
//! never 0 and never a panic.
//!
//! Each dimension tracks its own denominator: a record that is
//! unclassified for a dimension is excluded from that dimension's
//! numerator and denominator but still counted in the row totals.

use crate::{
    branch::{BranchAccess, ClassifiedBranch},
    classifier::{ClassificationResult, IncomeLevel, LoanPurpose, RaceEthnicity},
    crosswalk::MetroGroupKey,
    records::{CellRecord, LoanApplicationRecord, SizeBucket, SmallBusinessLoanRecord},
    types::{VolumeBasis, Year},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// `numerator / denominator * 100`, or `None` when the denominator is zero.
pub fn percentage(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator * 100.0)
    }
}

// ── Groups and cells ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Subject,
    Peer,
    Market,
}

/// The unit of independent work: one year in one metro group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub year: Year,
    pub metro: MetroGroupKey,
}

// ── Dimensions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum Dimension {
    LowModIncomeTract,
    MajorityMinorityTract,
    TractIncome(IncomeLevel),
    LowModIncomeBorrower,
    BorrowerIncome(IncomeLevel),
    MinorityBorrower,
    RaceEthnicity(RaceEthnicity),
    LoanPurpose(LoanPurpose),
    LoanSize(LoanSizeBucket),
    RevenueUnder1m,
    BranchAccess(BranchAccess),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanSizeBucket {
    Under100k,
    From100kTo250k,
    From250kTo1m,
}

impl LoanSizeBucket {
    pub const ALL: [LoanSizeBucket; 3] = [
        LoanSizeBucket::Under100k,
        LoanSizeBucket::From100kTo250k,
        LoanSizeBucket::From250kTo1m,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    hit_count: u64,
    hit_amount: f64,
    classified_count: u64,
    classified_amount: f64,
    excluded_count: u64,
}

/// One dimension of one aggregate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionMetric {
    pub dimension: Dimension,
    pub count: u64,
    pub amount: f64,
    /// Records classified for this dimension (the percentage denominator).
    pub classified_count: u64,
    pub classified_amount: f64,
    /// Records left out because the dimension could not be classified.
    pub excluded_count: u64,
    pub count_pct: Option<f64>,
    pub amount_pct: Option<f64>,
    /// True iff no record was excluded from this dimension.
    pub complete: bool,
}

impl DimensionMetric {
    fn from_tally(dimension: Dimension, t: &Tally) -> Self {
        Self {
            dimension,
            count: t.hit_count,
            amount: t.hit_amount,
            classified_count: t.classified_count,
            classified_amount: t.classified_amount,
            excluded_count: t.excluded_count,
            count_pct: percentage(t.hit_count as f64, t.classified_count as f64),
            amount_pct: percentage(t.hit_amount, t.classified_amount),
            complete: t.excluded_count == 0,
        }
    }
}

/// One output row: one group in one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub year: Year,
    pub metro: MetroGroupKey,
    pub group: GroupKind,
    pub lender_count: usize,
    pub total_count: u64,
    pub total_amount: f64,
    /// Records whose county had no crosswalk entry.
    pub unmapped_count: u64,
    pub dimensions: Vec<DimensionMetric>,
}

impl AggregateMetrics {
    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionMetric> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }
}

// ── Accumulation ───────────────────────────────────────────────────

/// Row-level running totals that records contribute into.
#[derive(Debug, Default)]
pub struct MetricsAccumulator {
    lenders: BTreeSet<String>,
    total_count: u64,
    total_amount: f64,
    unmapped_count: u64,
    tallies: BTreeMap<Dimension, Tally>,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with every listed dimension present, so a row with no members
    /// still reports each of them with a null percentage.
    pub fn with_dimensions(dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        let mut acc = Self::default();
        for d in dimensions {
            acc.tallies.entry(d).or_default();
        }
        acc
    }

    pub fn add_total(&mut self, lender_id: &str, count: u64, amount: f64, mapped: bool) {
        if !self.lenders.contains(lender_id) {
            self.lenders.insert(lender_id.to_string());
        }
        self.total_count += count;
        self.total_amount += amount;
        if !mapped {
            self.unmapped_count += count;
        }
    }

    /// Record a yes/no/unclassified outcome for a dimension.
    pub fn observe(
        &mut self,
        dimension: Dimension,
        outcome: Option<bool>,
        count: u64,
        amount: f64,
    ) {
        let t = self.tallies.entry(dimension).or_default();
        match outcome {
            Some(hit) => {
                t.classified_count += count;
                t.classified_amount += amount;
                if hit {
                    t.hit_count += count;
                    t.hit_amount += amount;
                }
            }
            None => t.excluded_count += count,
        }
    }

    /// Record a categorical outcome: every category of the family sees the
    /// same denominator, exactly one (or none, if unclassified) gets the hit.
    pub fn observe_category<T: Copy + PartialEq>(
        &mut self,
        categories: &[T],
        to_dimension: impl Fn(T) -> Dimension,
        value: Option<T>,
        count: u64,
        amount: f64,
    ) {
        for &category in categories {
            self.observe(to_dimension(category), value.map(|v| v == category), count, amount);
        }
    }

    pub fn finish(self, cell: &Cell, group: GroupKind) -> AggregateMetrics {
        AggregateMetrics {
            year: cell.year,
            metro: cell.metro.clone(),
            group,
            lender_count: self.lenders.len(),
            total_count: self.total_count,
            total_amount: self.total_amount,
            unmapped_count: self.unmapped_count,
            dimensions: self
                .tallies
                .iter()
                .map(|(d, t)| DimensionMetric::from_tally(*d, t))
                .collect(),
        }
    }
}

/// A classified record that knows how to add itself to a row.
pub trait Contributes {
    /// Every dimension a row of this record type reports, members or not.
    fn dimensions() -> Vec<Dimension>
    where
        Self: Sized;

    fn contribute(&self, acc: &mut MetricsAccumulator, mapped: bool);
}

fn each<T: Copy>(
    categories: &[T],
    to_dimension: fn(T) -> Dimension,
) -> impl Iterator<Item = Dimension> + '_ {
    categories.iter().map(move |c| to_dimension(*c))
}

/// A mortgage record with its classification attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLoan {
    pub record: LoanApplicationRecord,
    pub classification: ClassificationResult,
}

impl Contributes for ClassifiedLoan {
    fn dimensions() -> Vec<Dimension> {
        let mut dims = vec![
            Dimension::LowModIncomeTract,
            Dimension::MajorityMinorityTract,
            Dimension::LowModIncomeBorrower,
            Dimension::MinorityBorrower,
        ];
        dims.extend(each(&IncomeLevel::ALL, Dimension::TractIncome));
        dims.extend(each(&IncomeLevel::ALL, Dimension::BorrowerIncome));
        dims.extend(each(&RaceEthnicity::ALL, Dimension::RaceEthnicity));
        dims.extend(each(&LoanPurpose::ALL, Dimension::LoanPurpose));
        dims
    }

    fn contribute(&self, acc: &mut MetricsAccumulator, mapped: bool) {
        let c = &self.classification;
        let amount = self.record.loan_amount;
        acc.add_total(&self.record.lender_id, 1, amount, mapped);

        acc.observe(Dimension::LowModIncomeTract, c.low_mod_income_tract, 1, amount);
        acc.observe(Dimension::MajorityMinorityTract, c.majority_minority_tract, 1, amount);
        acc.observe(Dimension::LowModIncomeBorrower, c.low_mod_income_borrower, 1, amount);
        // Minority share is taken over borrowers whose race/ethnicity is known.
        acc.observe(
            Dimension::MinorityBorrower,
            c.race_ethnicity.map(|_| c.minority_borrower),
            1,
            amount,
        );
        acc.observe_category(&IncomeLevel::ALL, Dimension::TractIncome, c.tract_income, 1, amount);
        acc.observe_category(
            &IncomeLevel::ALL,
            Dimension::BorrowerIncome,
            c.borrower_income,
            1,
            amount,
        );
        acc.observe_category(
            &RaceEthnicity::ALL,
            Dimension::RaceEthnicity,
            c.race_ethnicity,
            1,
            amount,
        );
        acc.observe_category(&LoanPurpose::ALL, Dimension::LoanPurpose, c.loan_purpose, 1, amount);
    }
}

impl CellRecord for ClassifiedLoan {
    fn lender_id(&self) -> &str { &self.record.lender_id }
    fn year(&self) -> Year { self.record.year }
    fn county_code(&self) -> &str { &self.record.county_code }
    fn volume(&self, basis: VolumeBasis) -> f64 { self.record.volume(basis) }
}

/// A small-business record with its tract income level attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSmallBusiness {
    pub record: SmallBusinessLoanRecord,
    pub tract_income: Option<IncomeLevel>,
}

impl Contributes for ClassifiedSmallBusiness {
    fn dimensions() -> Vec<Dimension> {
        let mut dims = vec![Dimension::LowModIncomeTract, Dimension::RevenueUnder1m];
        dims.extend(each(&IncomeLevel::ALL, Dimension::TractIncome));
        dims.extend(each(&LoanSizeBucket::ALL, Dimension::LoanSize));
        dims
    }

    fn contribute(&self, acc: &mut MetricsAccumulator, mapped: bool) {
        let r = &self.record;
        let count = r.total_count();
        let amount = r.total_amount();
        acc.add_total(&r.lender_id, count, amount, mapped);

        let lmi = self.tract_income.map(|l| l.is_low_to_moderate());
        acc.observe(Dimension::LowModIncomeTract, lmi, count, amount);
        acc.observe_category(
            &IncomeLevel::ALL,
            Dimension::TractIncome,
            self.tract_income,
            count,
            amount,
        );

        let buckets: [(LoanSizeBucket, SizeBucket); 3] = [
            (LoanSizeBucket::Under100k, r.under_100k),
            (LoanSizeBucket::From100kTo250k, r.from_100k_to_250k),
            (LoanSizeBucket::From250kTo1m, r.from_250k_to_1m),
        ];
        for (bucket, sized) in buckets {
            acc.observe_category(
                &LoanSizeBucket::ALL,
                Dimension::LoanSize,
                Some(bucket),
                sized.count,
                sized.amount,
            );
        }

        let rev = r.revenue_under_1m;
        acc.observe(Dimension::RevenueUnder1m, Some(true), rev.count, rev.amount);
        acc.observe(
            Dimension::RevenueUnder1m,
            Some(false),
            count.saturating_sub(rev.count),
            (amount - rev.amount).max(0.0),
        );
    }
}

impl CellRecord for ClassifiedSmallBusiness {
    fn lender_id(&self) -> &str { &self.record.lender_id }
    fn year(&self) -> Year { self.record.year }
    fn county_code(&self) -> &str { &self.record.county_code }
    fn volume(&self, basis: VolumeBasis) -> f64 { self.record.volume(basis) }
}

impl Contributes for ClassifiedBranch {
    fn dimensions() -> Vec<Dimension> {
        let mut dims = vec![Dimension::LowModIncomeTract, Dimension::MajorityMinorityTract];
        dims.extend(each(&BranchAccess::ALL, Dimension::BranchAccess));
        dims
    }

    fn contribute(&self, acc: &mut MetricsAccumulator, mapped: bool) {
        let r = &self.record;
        acc.add_total(&r.institution_id, 1, 0.0, mapped);
        acc.observe(Dimension::LowModIncomeTract, Some(r.lmi_tract), 1, 0.0);
        acc.observe(Dimension::MajorityMinorityTract, Some(r.majority_minority_tract), 1, 0.0);
        acc.observe_category(
            &BranchAccess::ALL,
            Dimension::BranchAccess,
            Some(self.access),
            1,
            0.0,
        );
    }
}

/// Aggregate the members of one group in one cell.
pub fn aggregate<'a, R, I>(cell: &Cell, group: GroupKind, members: I) -> AggregateMetrics
where
    R: Contributes + 'a,
    I: IntoIterator<Item = (&'a R, bool)>,
{
    let mut acc = MetricsAccumulator::with_dimensions(R::dimensions());
    for (record, mapped) in members {
        record.contribute(&mut acc, mapped);
    }
    acc.finish(cell, group)
}
