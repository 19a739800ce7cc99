//! Geography crosswalk: county code → metro area, with a state Non-MSA fallback.
//!
//! Loaded once per analysis run and shared read-only across cells.
//! An unknown county is a data-quality condition, never an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One row of geography reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeographyCrosswalkEntry {
    pub county_code: String,
    pub metro_code: Option<String>,
    pub metro_name: Option<String>,
    pub county_name: String,
    pub state_name: String,
}

/// Result of resolving one county code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeoResolution {
    pub metro_code: Option<String>,
    pub metro_name: Option<String>,
    pub county_name: Option<String>,
    pub state_name: Option<String>,
    /// False when the county had no crosswalk entry.
    pub mapped: bool,
}

/// The grouping key for a cell: a metro area, a state's non-metro
/// remainder, or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetroGroupKey {
    Metro { code: String, name: Option<String> },
    NonMetro { state: String },
    Unmapped,
}

impl MetroGroupKey {
    pub fn label(&self) -> String {
        match self {
            MetroGroupKey::Metro { code, name: Some(name) } => format!("{code} {name}"),
            MetroGroupKey::Metro { code, name: None } => code.clone(),
            MetroGroupKey::NonMetro { state } => format!("{state} Non-MSA"),
            MetroGroupKey::Unmapped => "Unmapped".to_string(),
        }
    }
}

impl fmt::Display for MetroGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetroGroupKey::Metro { code, .. } => f.write_str(code),
            MetroGroupKey::NonMetro { state } => write!(f, "{state} Non-MSA"),
            MetroGroupKey::Unmapped => f.write_str("Unmapped"),
        }
    }
}

impl GeoResolution {
    pub fn group_key(&self) -> MetroGroupKey {
        match (&self.metro_code, &self.state_name) {
            (Some(code), _) => MetroGroupKey::Metro {
                code: code.clone(),
                name: self.metro_name.clone(),
            },
            (None, Some(state)) => MetroGroupKey::NonMetro { state: state.clone() },
            (None, None) => MetroGroupKey::Unmapped,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GeographyCrosswalk {
    by_county: HashMap<String, GeographyCrosswalkEntry>,
    /// One display name per metro code, so every county of a metro
    /// produces the same group key.
    metro_names: HashMap<String, String>,
}

impl GeographyCrosswalk {
    /// The canonical metro name is the first non-blank one in county-code order.
    pub fn from_entries(entries: impl IntoIterator<Item = GeographyCrosswalkEntry>) -> Self {
        let mut entries: Vec<GeographyCrosswalkEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.county_code.cmp(&b.county_code));

        let mut metro_names: HashMap<String, String> = HashMap::new();
        for e in &entries {
            let (Some(code), Some(name)) = (metro_code_of(e), e.metro_name.as_deref()) else {
                continue;
            };
            if !name.trim().is_empty() {
                metro_names
                    .entry(code.to_string())
                    .or_insert_with(|| name.trim().to_string());
            }
        }

        let by_county = entries
            .into_iter()
            .map(|e| (e.county_code.clone(), e))
            .collect();
        Self { by_county, metro_names }
    }

    pub fn len(&self) -> usize {
        self.by_county.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_county.is_empty()
    }

    pub fn entry(&self, county_code: &str) -> Option<&GeographyCrosswalkEntry> {
        self.by_county.get(county_code)
    }

    pub fn resolve(&self, county_code: &str) -> GeoResolution {
        match self.by_county.get(county_code) {
            Some(e) => GeoResolution {
                metro_code: metro_code_of(e).map(str::to_string),
                metro_name: metro_code_of(e).and_then(|c| self.metro_names.get(c).cloned()),
                county_name: Some(e.county_name.clone()),
                state_name: Some(e.state_name.clone()),
                mapped: true,
            },
            None => GeoResolution {
                metro_code: None,
                metro_name: None,
                county_name: None,
                state_name: state_for_county(county_code).map(str::to_string),
                mapped: false,
            },
        }
    }

    pub fn group_key(&self, county_code: &str) -> MetroGroupKey {
        self.resolve(county_code).group_key()
    }
}

/// Metro code with surrounding blanks removed; a blank code means rural.
fn metro_code_of(entry: &GeographyCrosswalkEntry) -> Option<&str> {
    entry
        .metro_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// State name from the 2-digit FIPS prefix of a county code.
pub fn state_for_county(county_code: &str) -> Option<&'static str> {
    let prefix = county_code.get(0..2)?;
    STATE_FIPS
        .iter()
        .find(|(fips, _)| *fips == prefix)
        .map(|(_, name)| *name)
}

const STATE_FIPS: &[(&str, &str)] = &[
    ("01", "Alabama"), ("02", "Alaska"), ("04", "Arizona"), ("05", "Arkansas"),
    ("06", "California"), ("08", "Colorado"), ("09", "Connecticut"), ("10", "Delaware"),
    ("11", "District of Columbia"), ("12", "Florida"), ("13", "Georgia"), ("15", "Hawaii"),
    ("16", "Idaho"), ("17", "Illinois"), ("18", "Indiana"), ("19", "Iowa"),
    ("20", "Kansas"), ("21", "Kentucky"), ("22", "Louisiana"), ("23", "Maine"),
    ("24", "Maryland"), ("25", "Massachusetts"), ("26", "Michigan"), ("27", "Minnesota"),
    ("28", "Mississippi"), ("29", "Missouri"), ("30", "Montana"), ("31", "Nebraska"),
    ("32", "Nevada"), ("33", "New Hampshire"), ("34", "New Jersey"), ("35", "New Mexico"),
    ("36", "New York"), ("37", "North Carolina"), ("38", "North Dakota"), ("39", "Ohio"),
    ("40", "Oklahoma"), ("41", "Oregon"), ("42", "Pennsylvania"), ("44", "Rhode Island"),
    ("45", "South Carolina"), ("46", "South Dakota"), ("47", "Tennessee"), ("48", "Texas"),
    ("49", "Utah"), ("50", "Vermont"), ("51", "Virginia"), ("53", "Washington"),
    ("54", "West Virginia"), ("55", "Wisconsin"), ("56", "Wyoming"),
    ("60", "American Samoa"), ("66", "Guam"), ("69", "Northern Mariana Islands"),
    ("72", "Puerto Rico"), ("78", "Virgin Islands"),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(county: &str, metro: Option<&str>, state: &str) -> GeographyCrosswalkEntry {
        GeographyCrosswalkEntry {
            county_code: county.into(),
            metro_code: metro.map(Into::into),
            metro_name: metro.map(|m| format!("Metro {m}")),
            county_name: format!("County {county}"),
            state_name: state.into(),
        }
    }

    #[test]
    fn mapped_metro_county_resolves_to_metro() {
        let cw = GeographyCrosswalk::from_entries([entry("39049", Some("18140"), "Ohio")]);
        let r = cw.resolve("39049");
        assert!(r.mapped);
        assert_eq!(r.metro_code.as_deref(), Some("18140"));
        assert_eq!(
            r.group_key(),
            MetroGroupKey::Metro { code: "18140".into(), name: Some("Metro 18140".into()) }
        );
    }

    #[test]
    fn blank_metro_code_counts_as_rural() {
        let cw = GeographyCrosswalk::from_entries([entry("39001", Some("  "), "Ohio")]);
        assert_eq!(cw.group_key("39001").to_string(), "Ohio Non-MSA");
    }

    #[test]
    fn unknown_prefix_is_unmapped() {
        let cw = GeographyCrosswalk::default();
        let r = cw.resolve("99001");
        assert!(!r.mapped);
        assert_eq!(r.state_name, None);
        assert_eq!(r.group_key(), MetroGroupKey::Unmapped);
    }

    #[test]
    fn counties_of_one_metro_share_a_key_whatever_their_names() {
        let mut columbus = entry("39049", Some("18140"), "Ohio");
        columbus.metro_name = Some("Columbus, OH".into());
        let mut delaware = entry("39041", Some("18140 "), "Ohio");
        delaware.metro_name = None;
        let mut licking = entry("39089", Some("18140"), "Ohio");
        licking.metro_name = Some("Columbus OH MSA".into());

        let cw = GeographyCrosswalk::from_entries([licking, delaware, columbus]);
        let key = cw.group_key("39049");
        assert_eq!(cw.group_key("39041"), key);
        assert_eq!(cw.group_key("39089"), key);
        // 39041 sorts first but has no name, so 39049's name is canonical.
        assert_eq!(
            key,
            MetroGroupKey::Metro { code: "18140".into(), name: Some("Columbus, OH".into()) }
        );
    }

    #[test]
    fn labels_are_human_readable() {
        let k = MetroGroupKey::Metro { code: "12345".into(), name: Some("Springfield".into()) };
        assert_eq!(k.label(), "12345 Springfield");
        assert_eq!(MetroGroupKey::NonMetro { state: "Ohio".into() }.label(), "Ohio Non-MSA");
    }
}
