//! Branch deduplication and access classification.
//!
//! Step 1: one canonical record per branch id (lowest institution id,
//!         then lowest year, then the remaining fields for a total order).
//! Step 2: each survivor falls into exactly one access category.
//! Step 3: group by metro area through the crosswalk.

use crate::{
    crosswalk::{GeographyCrosswalk, MetroGroupKey},
    records::{BranchRecord, CellRecord},
    types::{compare_ids, VolumeBasis, Year},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchAccess {
    LmiOnly,
    MmctOnly,
    LmiAndMmct,
    Neither,
}

impl BranchAccess {
    pub const ALL: [BranchAccess; 4] = [
        BranchAccess::LmiOnly,
        BranchAccess::MmctOnly,
        BranchAccess::LmiAndMmct,
        BranchAccess::Neither,
    ];

    pub fn of(lmi_tract: bool, majority_minority_tract: bool) -> Self {
        match (lmi_tract, majority_minority_tract) {
            (true, false)  => BranchAccess::LmiOnly,
            (false, true)  => BranchAccess::MmctOnly,
            (true, true)   => BranchAccess::LmiAndMmct,
            (false, false) => BranchAccess::Neither,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedBranch {
    pub record: BranchRecord,
    pub access: BranchAccess,
    pub metro: MetroGroupKey,
    pub mapped: bool,
}

impl CellRecord for ClassifiedBranch {
    fn lender_id(&self) -> &str { &self.record.institution_id }
    fn year(&self) -> Year { self.record.year }
    fn county_code(&self) -> &str { &self.record.county_code }
    fn volume(&self, basis: VolumeBasis) -> f64 { self.record.volume(basis) }
}

fn canonical_order(a: &BranchRecord, b: &BranchRecord) -> Ordering {
    compare_ids(&a.institution_id, &b.institution_id)
        .then_with(|| a.year.cmp(&b.year))
        .then_with(|| a.county_code.cmp(&b.county_code))
        .then_with(|| a.lmi_tract.cmp(&b.lmi_tract))
        .then_with(|| a.majority_minority_tract.cmp(&b.majority_minority_tract))
}

/// Collapse duplicate reports to one canonical record per branch id.
/// Output is ordered by branch id; running it on its own output is a no-op.
pub fn dedupe(records: impl IntoIterator<Item = BranchRecord>) -> Vec<BranchRecord> {
    let mut canonical: BTreeMap<String, BranchRecord> = BTreeMap::new();
    let mut duplicates = 0usize;
    for record in records {
        match canonical.get_mut(&record.branch_id) {
            Some(kept) => {
                duplicates += 1;
                if canonical_order(&record, kept) == Ordering::Less {
                    *kept = record;
                }
            }
            None => {
                canonical.insert(record.branch_id.clone(), record);
            }
        }
    }
    if duplicates > 0 {
        log::debug!("Branch dedup collapsed {duplicates} duplicate reports");
    }
    canonical.into_values().collect()
}

pub fn classify(record: BranchRecord, crosswalk: &GeographyCrosswalk) -> ClassifiedBranch {
    let resolution = crosswalk.resolve(&record.county_code);
    ClassifiedBranch {
        access: BranchAccess::of(record.lmi_tract, record.majority_minority_tract),
        metro: resolution.group_key(),
        mapped: resolution.mapped,
        record,
    }
}

pub fn dedupe_and_classify(
    records: impl IntoIterator<Item = BranchRecord>,
    crosswalk: &GeographyCrosswalk,
) -> Vec<ClassifiedBranch> {
    dedupe(records)
        .into_iter()
        .map(|r| classify(r, crosswalk))
        .collect()
}

/// Access category counts for one grouping. The four categories always
/// sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchAccessSummary {
    pub lmi_only: u64,
    pub mmct_only: u64,
    pub lmi_and_mmct: u64,
    pub neither: u64,
    pub total: u64,
}

impl BranchAccessSummary {
    pub fn add(&mut self, access: BranchAccess) {
        match access {
            BranchAccess::LmiOnly    => self.lmi_only += 1,
            BranchAccess::MmctOnly   => self.mmct_only += 1,
            BranchAccess::LmiAndMmct => self.lmi_and_mmct += 1,
            BranchAccess::Neither    => self.neither += 1,
        }
        self.total += 1;
    }
}

/// One summary per metro group.
pub fn summarize_by_metro<'a, I>(branches: I) -> BTreeMap<MetroGroupKey, BranchAccessSummary>
where
    I: IntoIterator<Item = &'a ClassifiedBranch>,
{
    let mut out: BTreeMap<MetroGroupKey, BranchAccessSummary> = BTreeMap::new();
    for b in branches {
        out.entry(b.metro.clone()).or_default().add(b.access);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(inst: &str, year: Year, id: &str) -> BranchRecord {
        BranchRecord {
            institution_id: inst.into(),
            year,
            county_code: "39049".into(),
            branch_id: id.into(),
            lmi_tract: false,
            majority_minority_tract: false,
        }
    }

    #[test]
    fn tie_break_falls_through_to_year() {
        let out = dedupe([branch("3", 2023, "B"), branch("3", 2021, "B"), branch("3", 2022, "B")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].year, 2021);
    }

    #[test]
    fn input_order_does_not_change_the_survivor() {
        let a = dedupe([branch("10", 2020, "B"), branch("9", 2023, "B")]);
        let b = dedupe([branch("9", 2023, "B"), branch("10", 2020, "B")]);
        assert_eq!(a, b);
        assert_eq!(a[0].institution_id, "9");
    }

    #[test]
    fn access_categories_are_exclusive() {
        assert_eq!(BranchAccess::of(true, false), BranchAccess::LmiOnly);
        assert_eq!(BranchAccess::of(false, true), BranchAccess::MmctOnly);
        assert_eq!(BranchAccess::of(true, true), BranchAccess::LmiAndMmct);
        assert_eq!(BranchAccess::of(false, false), BranchAccess::Neither);
    }
}
