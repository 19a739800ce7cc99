//! Deterministic synthetic warehouse for demo runs.
//!
//! RULE: all randomness flows through DemoRng, seeded from the single
//! `--demo-seed`. Each record family draws from its own stream, so adding
//! a family never changes another family's data.

use lendscope_core::{
    crosswalk::GeographyCrosswalkEntry,
    error::AnalysisResult,
    records::{BranchRecord, LoanApplicationRecord, SizeBucket, SmallBusinessLoanRecord},
    store::WarehouseStore,
};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct DemoRng {
    inner: Pcg64Mcg,
}

impl DemoRng {
    /// One stream per (seed, stream index). The index must never change once assigned.
    pub fn new(seed: u64, stream: u64) -> Self {
        let derived = seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self { inner: Pcg64Mcg::seed_from_u64(derived) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len() as u64) as usize]
    }
}

const STREAM_MORTGAGE: u64 = 1;
const STREAM_SMALL_BUSINESS: u64 = 2;
const STREAM_BRANCH: u64 = 3;

pub const DEMO_COUNTIES: [&str; 4] = ["39049", "39041", "39089", "39001"];
pub const DEMO_YEARS: [u16; 2] = [2022, 2023];
pub const DEMO_SUBJECT: &str = "1001";

/// (lender id, relative size). The subject sits in the middle of the market.
const DEMO_LENDERS: [(&str, u64); 8] = [
    ("1001", 60),
    ("1002", 45),
    ("1003", 110),
    ("1004", 25),
    ("1005", 300),
    ("1006", 70),
    ("1007", 10),
    ("1008", 130),
];

fn crosswalk() -> Vec<GeographyCrosswalkEntry> {
    let columbus = |county: &str, name: &str| GeographyCrosswalkEntry {
        county_code: county.into(),
        metro_code: Some("18140".into()),
        metro_name: Some("Columbus, OH".into()),
        county_name: name.into(),
        state_name: "Ohio".into(),
    };
    vec![
        columbus("39049", "Franklin County"),
        columbus("39041", "Delaware County"),
        columbus("39089", "Licking County"),
        GeographyCrosswalkEntry {
            county_code: "39001".into(),
            metro_code: None,
            metro_name: None,
            county_name: "Adams County".into(),
            state_name: "Ohio".into(),
        },
    ]
}

/// Populate an empty, migrated store with a deterministic market.
pub fn seed(store: &WarehouseStore, seed: u64) -> AnalysisResult<()> {
    store.in_transaction(|s| {
        for entry in crosswalk() {
            s.insert_crosswalk_entry(&entry)?;
        }
        seed_mortgages(s, &mut DemoRng::new(seed, STREAM_MORTGAGE))?;
        seed_small_business(s, &mut DemoRng::new(seed, STREAM_SMALL_BUSINESS))?;
        seed_branches(s, &mut DemoRng::new(seed, STREAM_BRANCH))?;
        Ok(())
    })?;
    log::info!(
        "Demo warehouse seeded: {} mortgage rows, {} branch observations",
        store.mortgage_record_count()?,
        store.branch_observation_count()?
    );
    Ok(())
}

fn seed_mortgages(store: &WarehouseStore, rng: &mut DemoRng) -> AnalysisResult<()> {
    for &year in &DEMO_YEARS {
        for &county in &DEMO_COUNTIES {
            for &(lender, size) in &DEMO_LENDERS {
                let n = size / 2 + rng.below(size.max(1));
                for _ in 0..n {
                    store.insert_mortgage_record(&synthetic_loan(rng, lender, year, county))?;
                }
            }
        }
    }
    Ok(())
}

fn synthetic_loan(
    rng: &mut DemoRng,
    lender: &str,
    year: u16,
    county: &str,
) -> LoanApplicationRecord {
    let mut r = LoanApplicationRecord::originated(
        lender,
        year,
        county,
        (rng.range_f64(60.0, 650.0) * 1000.0).round(),
    );
    r.borrower_income = (!rng.chance(0.05)).then(|| rng.range_f64(25.0, 250.0).round());
    r.area_median_family_income = Some(92_400.0);
    r.tract_income_ratio = (!rng.chance(0.02)).then(|| rng.range_f64(35.0, 190.0));
    r.tract_minority_pct = (!rng.chance(0.02)).then(|| rng.range_f64(2.0, 95.0));
    if rng.chance(0.07) {
        r.ethnicity_codes[0] = Some(*rng.pick(&[1, 11, 12, 14]));
    } else {
        r.ethnicity_codes[0] = Some(2);
    }
    r.race_codes[0] = Some(*rng.pick(&[5, 5, 5, 5, 3, 3, 2, 22, 1, 4, 6, 7]));
    if rng.chance(0.3) {
        r.race_codes[1] = Some(8);
    }
    r.loan_purpose = Some(*rng.pick(&[1, 1, 1, 31, 32, 2, 4]));
    r.action_taken = Some(*rng.pick(&[1, 1, 1, 1, 3, 4]));
    r.occupancy_type = Some(*rng.pick(&[1, 1, 1, 1, 2, 3]));
    r.total_units = Some(if rng.chance(0.03) { 6 } else { 1 });
    r.reverse_mortgage = Some(if rng.chance(0.01) { 1 } else { 2 });
    r
}

fn seed_small_business(store: &WarehouseStore, rng: &mut DemoRng) -> AnalysisResult<()> {
    for &year in &DEMO_YEARS {
        for &county in &DEMO_COUNTIES {
            for &(lender, size) in &DEMO_LENDERS {
                for income_group in [101, 102, 103, 104, 105] {
                    let under = rng.below(size / 4 + 1);
                    let mid = rng.below(size / 10 + 1);
                    let large = rng.below(size / 20 + 1);
                    let bucket =
                        |count: u64, avg: f64| SizeBucket { count, amount: count as f64 * avg };
                    let revenue = rng.below(under + mid + large + 1);
                    store.insert_small_business_record(&SmallBusinessLoanRecord {
                        lender_id: lender.into(),
                        year,
                        county_code: county.into(),
                        income_group_code: Some(income_group),
                        under_100k: bucket(under, 38.0),
                        from_100k_to_250k: bucket(mid, 165.0),
                        from_250k_to_1m: bucket(large, 540.0),
                        revenue_under_1m: bucket(revenue, 45.0),
                    })?;
                }
            }
        }
    }
    Ok(())
}

fn seed_branches(store: &WarehouseStore, rng: &mut DemoRng) -> AnalysisResult<()> {
    for &(lender, size) in &DEMO_LENDERS {
        let branches = 1 + size / 15;
        for b in 0..branches {
            let county = *rng.pick(&DEMO_COUNTIES);
            let record = BranchRecord {
                institution_id: lender.into(),
                year: *rng.pick(&DEMO_YEARS),
                county_code: county.into(),
                branch_id: format!("{lender}-{b:03}"),
                lmi_tract: rng.chance(0.3),
                majority_minority_tract: rng.chance(0.2),
            };
            store.insert_branch_record(&record)?;
            // Some branches are reported twice.
            if rng.chance(0.25) {
                store.insert_branch_record(&record)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = DemoRng::new(42, STREAM_MORTGAGE);
        let mut b = DemoRng::new(42, STREAM_MORTGAGE);
        for _ in 0..100 {
            assert_eq!(a.below(1000), b.below(1000));
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut a = DemoRng::new(42, STREAM_MORTGAGE);
        let mut b = DemoRng::new(42, STREAM_BRANCH);
        let xs: Vec<u64> = (0..8).map(|_| a.below(u64::MAX)).collect();
        let ys: Vec<u64> = (0..8).map(|_| b.below(u64::MAX)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut rng = DemoRng::new(7, 1);
        for _ in 0..1000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }
}
