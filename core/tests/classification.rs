//! Classification tests: tract income, minority tract, borrower income,
//! and the race/ethnicity priority rule.

use lendscope_core::{
    classifier::{Classifier, IncomeLevel, RaceEthnicity},
    config::ClassificationConfig,
    records::LoanApplicationRecord,
};

fn codes(values: &[u32]) -> [Option<u32>; 5] {
    let mut out = [None; 5];
    for (slot, v) in out.iter_mut().zip(values) {
        *slot = Some(*v);
    }
    out
}

#[test]
fn hispanic_ethnicity_wins_over_any_race_field() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);

    // Race 1 is Black, but ethnicity field 3 says Mexican.
    let ethnicity = [Some(2), None, Some(11), None, None];
    let race = codes(&[3, 5]);
    assert_eq!(c.race_ethnicity(&ethnicity, &race), Some(RaceEthnicity::Hispanic));
}

#[test]
fn first_usable_race_field_decides() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);
    let not_hispanic = codes(&[2]);

    // 6 = not provided, 8 = no co-applicant: skipped. 22 = Chinese → Asian.
    assert_eq!(
        c.race_ethnicity(&not_hispanic, &codes(&[6, 8, 22, 3])),
        Some(RaceEthnicity::Asian)
    );
    assert_eq!(
        c.race_ethnicity(&not_hispanic, &[None, Some(7), Some(41), None, None]),
        Some(RaceEthnicity::PacificIslander)
    );
    assert_eq!(c.race_ethnicity(&not_hispanic, &codes(&[1])), Some(RaceEthnicity::NativeAmerican));
    assert_eq!(c.race_ethnicity(&not_hispanic, &codes(&[5, 3])), Some(RaceEthnicity::WhiteOther));
}

#[test]
fn unknown_race_code_falls_into_white_other() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);
    assert_eq!(
        c.race_ethnicity(&[None; 5], &codes(&[99])),
        Some(RaceEthnicity::WhiteOther)
    );
}

#[test]
fn only_sentinels_is_unclassified() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);
    assert_eq!(c.race_ethnicity(&codes(&[3]), &codes(&[6, 7, 8])), None);
    assert_eq!(c.race_ethnicity(&[None; 5], &[None; 5]), None);
}

#[test]
fn lmict_true_with_mmct_unclassified() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);

    let mut rec = LoanApplicationRecord::originated("L1", 2023, "39049", 150_000.0);
    rec.tract_income_ratio = Some(75.0);
    rec.tract_minority_pct = None;

    let result = c.classify_mortgage(&rec);
    assert_eq!(result.low_mod_income_tract, Some(true));
    assert_eq!(result.majority_minority_tract, None);
    assert_eq!(result.tract_income, Some(IncomeLevel::Moderate));
}

#[test]
fn tract_thresholds_are_inclusive_and_strict_respectively() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);
    assert_eq!(c.low_mod_income_tract(Some(80.0)), Some(true));
    assert_eq!(c.low_mod_income_tract(Some(80.01)), Some(false));
    assert_eq!(c.majority_minority_tract(Some(50.0)), Some(false));
    assert_eq!(c.majority_minority_tract(Some(50.01)), Some(true));
}

#[test]
fn borrower_income_uses_thousands_against_dollar_median() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);

    // 56k / 70,000 = 80% → LMI (inclusive).
    assert_eq!(c.low_mod_income_borrower(Some(56.0), Some(70_000.0)), Some(true));
    // 57k / 70,000 ≈ 81.4% → not LMI.
    assert_eq!(c.low_mod_income_borrower(Some(57.0), Some(70_000.0)), Some(false));
    assert_eq!(c.low_mod_income_borrower(Some(57.0), None), None);
    assert_eq!(c.low_mod_income_borrower(Some(57.0), Some(0.0)), None);
    assert_eq!(
        c.borrower_income_level(Some(100.0), Some(70_000.0)),
        Some(IncomeLevel::Upper)
    );
}

#[test]
fn minority_borrower_flag_follows_category() {
    let config = ClassificationConfig::default();
    let c = Classifier::new(&config);

    let mut rec = LoanApplicationRecord::originated("L1", 2023, "39049", 150_000.0);
    rec.race_codes = codes(&[3]);
    assert!(c.classify_mortgage(&rec).minority_borrower);

    rec.race_codes = codes(&[5]);
    assert!(!c.classify_mortgage(&rec).minority_borrower);

    rec.race_codes = codes(&[6]);
    let unclassified = c.classify_mortgage(&rec);
    assert_eq!(unclassified.race_ethnicity, None);
    assert!(!unclassified.minority_borrower);
}

#[test]
fn custom_code_tables_are_honoured() {
    let mut config = ClassificationConfig::default();
    config.hispanic_ethnicity_codes = vec![9];
    let c = Classifier::new(&config);
    assert_eq!(c.race_ethnicity(&codes(&[1]), &codes(&[5])), Some(RaceEthnicity::WhiteOther));
    assert_eq!(c.race_ethnicity(&codes(&[9]), &codes(&[5])), Some(RaceEthnicity::Hispanic));
}
