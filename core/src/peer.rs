//! Volume-banded peer selection.
//!
//! A lender L != subject is a peer in a cell iff
//!   lower * S <= volume(L) <= upper * S
//! where S is the subject's volume in that same cell. The band is
//! evaluated independently for every cell; nothing carries between cells.

use crate::{
    config::PeerBandConfig,
    records::CellRecord,
    types::{LenderId, VolumeBasis},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of peer selection for one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PeerSelection {
    Selected {
        subject_volume: f64,
        band_low: f64,
        band_high: f64,
        peers: BTreeSet<LenderId>,
    },
    /// The subject has no volume here, so no band exists.
    /// Distinct from a band that happens to contain zero peers.
    InsufficientSubjectVolume,
}

impl PeerSelection {
    pub fn peers(&self) -> Option<&BTreeSet<LenderId>> {
        match self {
            PeerSelection::Selected { peers, .. } => Some(peers),
            PeerSelection::InsufficientSubjectVolume => None,
        }
    }

    pub fn is_peer(&self, lender_id: &str) -> bool {
        self.peers().is_some_and(|p| p.contains(lender_id))
    }
}

/// Sum each lender's volume over the records of one cell.
pub fn lender_volumes<'a, R, I>(records: I, basis: VolumeBasis) -> BTreeMap<LenderId, f64>
where
    R: CellRecord + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut volumes: BTreeMap<LenderId, f64> = BTreeMap::new();
    for r in records {
        *volumes.entry(r.lender_id().to_string()).or_insert(0.0) += r.volume(basis);
    }
    volumes
}

pub fn select_peers(
    subject_id: &str,
    volumes: &BTreeMap<LenderId, f64>,
    band: &PeerBandConfig,
) -> PeerSelection {
    let subject_volume = volumes.get(subject_id).copied().unwrap_or(0.0);
    if subject_volume <= 0.0 {
        return PeerSelection::InsufficientSubjectVolume;
    }

    let band_low = band.lower_multiplier * subject_volume;
    let band_high = band.upper_multiplier * subject_volume;
    let peers = volumes
        .iter()
        .filter(|(lender, volume)| {
            lender.as_str() != subject_id && band_low <= **volume && **volume <= band_high
        })
        .map(|(lender, _)| lender.clone())
        .collect();

    PeerSelection::Selected { subject_volume, band_low, band_high, peers }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volumes(pairs: &[(&str, f64)]) -> BTreeMap<LenderId, f64> {
        pairs.iter().map(|(l, v)| (l.to_string(), *v)).collect()
    }

    #[test]
    fn band_edges_are_inclusive() {
        let v = volumes(&[("S", 100.0), ("lo", 50.0), ("hi", 200.0), ("out", 200.5)]);
        let sel = select_peers("S", &v, &PeerBandConfig::default());
        let peers = sel.peers().unwrap();
        assert!(peers.contains("lo"));
        assert!(peers.contains("hi"));
        assert!(!peers.contains("out"));
        assert!(!peers.contains("S"));
    }

    #[test]
    fn missing_subject_is_insufficient_not_empty() {
        let v = volumes(&[("A", 10.0)]);
        let sel = select_peers("S", &v, &PeerBandConfig::default());
        assert_eq!(sel, PeerSelection::InsufficientSubjectVolume);
        assert!(!sel.is_peer("A"));
    }

    #[test]
    fn zero_peers_is_still_a_selection() {
        let v = volumes(&[("S", 10.0), ("A", 1000.0)]);
        match select_peers("S", &v, &PeerBandConfig::default()) {
            PeerSelection::Selected { peers, subject_volume, .. } => {
                assert!(peers.is_empty());
                assert_eq!(subject_volume, 10.0);
            }
            other => panic!("expected a selection, got {other:?}"),
        }
    }
}
