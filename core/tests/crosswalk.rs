//! Crosswalk resolution tests, including the Non-MSA fallbacks.

use lendscope_core::{
    crosswalk::{state_for_county, GeographyCrosswalk, GeographyCrosswalkEntry, MetroGroupKey},
    store::WarehouseStore,
    retrieval::RecordSource,
};

fn entry(county: &str, metro: Option<&str>, state: &str) -> GeographyCrosswalkEntry {
    GeographyCrosswalkEntry {
        county_code: county.into(),
        metro_code: metro.map(Into::into),
        metro_name: metro.map(|_| "Columbus, OH".to_string()),
        county_name: format!("County {county}"),
        state_name: state.into(),
    }
}

#[test]
fn unknown_ohio_county_groups_to_ohio_non_msa() {
    let cw = GeographyCrosswalk::from_entries([entry("39049", Some("18140"), "Ohio")]);

    let r = cw.resolve("39999");
    assert!(!r.mapped, "county with no entry must be flagged unmapped");
    assert_eq!(r.metro_code, None);
    assert_eq!(r.county_name, None);
    assert_eq!(r.state_name.as_deref(), Some("Ohio"));
    assert_eq!(cw.group_key("39999").to_string(), "Ohio Non-MSA");
}

#[test]
fn rural_county_with_entry_groups_to_state_non_msa() {
    let cw = GeographyCrosswalk::from_entries([entry("39001", None, "Ohio")]);
    let r = cw.resolve("39001");
    assert!(r.mapped);
    assert_eq!(
        r.group_key(),
        MetroGroupKey::NonMetro { state: "Ohio".into() }
    );
}

#[test]
fn state_prefix_lookup() {
    assert_eq!(state_for_county("39049"), Some("Ohio"));
    assert_eq!(state_for_county("72001"), Some("Puerto Rico"));
    assert_eq!(state_for_county("03001"), None);
    assert_eq!(state_for_county("3"), None);
}

#[test]
fn crosswalk_round_trips_through_the_store() {
    let store = WarehouseStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.insert_crosswalk_entry(&entry("39049", Some("18140"), "Ohio")).unwrap();
    store.insert_crosswalk_entry(&entry("39001", None, "Ohio")).unwrap();

    let cw = GeographyCrosswalk::from_entries(store.crosswalk_entries().unwrap());
    assert_eq!(cw.len(), 2);
    assert_eq!(cw.group_key("39049").to_string(), "18140");
    assert_eq!(cw.group_key("39001").to_string(), "Ohio Non-MSA");
}
