//! Peer selection tests: band correctness, per-cell independence.

use lendscope_core::{
    area::AssessmentArea,
    config::{AnalysisConfig, PeerBandConfig},
    crosswalk::{GeographyCrosswalk, GeographyCrosswalkEntry, MetroGroupKey},
    engine::AnalysisEngine,
    peer::{select_peers, PeerSelection},
    records::LoanApplicationRecord,
    types::LenderId,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn crosswalk() -> GeographyCrosswalk {
    GeographyCrosswalk::from_entries([
        GeographyCrosswalkEntry {
            county_code: "39049".into(),
            metro_code: Some("12345".into()),
            metro_name: Some("Springfield".into()),
            county_name: "Franklin".into(),
            state_name: "Ohio".into(),
        },
        GeographyCrosswalkEntry {
            county_code: "39061".into(),
            metro_code: Some("17140".into()),
            metro_name: Some("Cincinnati".into()),
            county_name: "Hamilton".into(),
            state_name: "Ohio".into(),
        },
    ])
}

fn loans(lender: &str, year: u16, county: &str, n: usize) -> Vec<LoanApplicationRecord> {
    (0..n)
        .map(|_| LoanApplicationRecord::originated(lender, year, county, 100_000.0))
        .collect()
}

fn metro(code: &str, name: &str) -> MetroGroupKey {
    MetroGroupKey::Metro { code: code.into(), name: Some(name.into()) }
}

#[test]
fn only_x_falls_inside_the_band() {
    let engine = AnalysisEngine::new(AnalysisConfig::standard(), crosswalk()).unwrap();
    let area = AssessmentArea::new(["39049"], [2023]).unwrap();

    let mut records = loans("SUBJECT", 2023, "39049", 100);
    records.extend(loans("X", 2023, "39049", 180));
    records.extend(loans("Y", 2023, "39049", 210));
    records.extend(loans("Z", 2023, "39049", 40));

    let report = engine.mortgage_report("SUBJECT", records, &area);
    let cell = report.cell(2023, &metro("12345", "Springfield")).expect("cell exists");
    let peers: Vec<&str> = cell
        .selection
        .peers()
        .expect("subject has volume")
        .iter()
        .map(String::as_str)
        .collect();
    assert_eq!(peers, vec!["X"]);

    match &cell.selection {
        PeerSelection::Selected { band_low, band_high, subject_volume, .. } => {
            assert_eq!(*subject_volume, 100.0);
            assert_eq!(*band_low, 50.0);
            assert_eq!(*band_high, 200.0);
        }
        other => panic!("expected a selection, got {other:?}"),
    }
}

#[test]
fn one_band_per_metro_code_even_when_county_names_disagree() {
    let cw = GeographyCrosswalk::from_entries([
        GeographyCrosswalkEntry {
            county_code: "39049".into(),
            metro_code: Some("18140".into()),
            metro_name: Some("Columbus, OH".into()),
            county_name: "Franklin".into(),
            state_name: "Ohio".into(),
        },
        GeographyCrosswalkEntry {
            county_code: "39041".into(),
            metro_code: Some("18140".into()),
            metro_name: None,
            county_name: "Delaware".into(),
            state_name: "Ohio".into(),
        },
    ]);
    let engine = AnalysisEngine::new(AnalysisConfig::standard(), cw).unwrap();
    let area = AssessmentArea::new(["39049", "39041"], [2023]).unwrap();

    let mut records = loans("SUBJECT", 2023, "39049", 50);
    records.extend(loans("SUBJECT", 2023, "39041", 50));
    records.extend(loans("P", 2023, "39049", 150));

    let report = engine.mortgage_report("SUBJECT", records, &area);
    assert_eq!(report.cells.len(), 1, "both counties belong to metro 18140");
    match &report.cells[0].selection {
        PeerSelection::Selected { subject_volume, peers, .. } => {
            assert_eq!(*subject_volume, 100.0, "subject volume spans both counties");
            assert!(peers.contains("P"), "150 is inside [50, 200]");
        }
        other => panic!("expected a selection, got {other:?}"),
    }
}

#[test]
fn peer_membership_is_recomputed_per_cell() {
    let engine = AnalysisEngine::new(AnalysisConfig::standard(), crosswalk()).unwrap();
    let area = AssessmentArea::new(["39049", "39061"], [2022, 2023]).unwrap();

    let mut records = Vec::new();
    // Subject: 10 loans in every cell.
    for year in [2022, 2023] {
        records.extend(loans("S", year, "39049", 10));
        records.extend(loans("S", year, "39061", 10));
    }
    // A is comparable in 2022 Springfield only; huge everywhere else.
    records.extend(loans("A", 2022, "39049", 12));
    records.extend(loans("A", 2023, "39049", 90));
    records.extend(loans("A", 2022, "39061", 90));
    records.extend(loans("A", 2023, "39061", 3));

    let report = engine.mortgage_report("S", records, &area);
    assert_eq!(report.cells.len(), 4);

    let is_peer =
        |year, key: &MetroGroupKey| report.cell(year, key).unwrap().selection.is_peer("A");
    let springfield = metro("12345", "Springfield");
    let cincinnati = metro("17140", "Cincinnati");
    assert!(is_peer(2022, &springfield));
    assert!(!is_peer(2023, &springfield));
    assert!(!is_peer(2022, &cincinnati));
    assert!(!is_peer(2023, &cincinnati));
}

#[test]
fn peers_cannot_introduce_cells_or_counties() {
    let engine = AnalysisEngine::new(AnalysisConfig::standard(), crosswalk()).unwrap();
    let area = AssessmentArea::new(["39049", "39061"], [2022, 2023]).unwrap();

    let mut records = loans("S", 2023, "39049", 10);
    // Other lenders are active in counties/years the subject never touched.
    records.extend(loans("A", 2023, "39049", 10));
    records.extend(loans("A", 2023, "39061", 500));
    records.extend(loans("B", 2022, "39049", 500));

    let report = engine.mortgage_report("S", records, &area);
    assert_eq!(report.cells.len(), 1, "only the subject's cell may be analyzed");
    let cell = &report.cells[0];
    assert_eq!(cell.year, 2023);
    assert_eq!(cell.metro, metro("12345", "Springfield"));

    let market = cell.row(lendscope_core::aggregate::GroupKind::Market).unwrap();
    assert_eq!(market.total_count, 20, "market row must only see footprint records");
    assert_eq!(report.records_analyzed, 20);
}

fn lender_volumes() -> impl Strategy<Value = BTreeMap<LenderId, f64>> {
    prop::collection::btree_map("[A-E]", 0u32..400, 0..5)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k, v as f64)).collect())
}

proptest! {
    #[test]
    fn peer_band_law(mut volumes in lender_volumes(), subject_volume in 1u32..300) {
        volumes.insert("SUBJECT".to_string(), subject_volume as f64);
        let band = PeerBandConfig::default();
        let selection = select_peers("SUBJECT", &volumes, &band);
        let peers = selection.peers().expect("subject has positive volume");

        prop_assert!(!peers.contains("SUBJECT"));
        let s = subject_volume as f64;
        for (lender, volume) in &volumes {
            let expected = lender != "SUBJECT" && 0.5 * s <= *volume && *volume <= 2.0 * s;
            prop_assert_eq!(
                peers.contains(lender),
                expected,
                "lender {} volume {}",
                lender,
                volume
            );
        }
    }

    #[test]
    fn zero_subject_volume_never_selects(volumes in lender_volumes()) {
        let selection = select_peers("SUBJECT", &volumes, &PeerBandConfig::default());
        prop_assert_eq!(selection, PeerSelection::InsufficientSubjectVolume);
    }
}
