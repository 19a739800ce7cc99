//! lendscope-core: peer-relative lending and branch-presence analysis.
//!
//! Pipeline (per data family):
//!   1. Retrieval      (RecordSource, warehouse adapter)
//!   2. Crosswalk      (county → metro group, Non-MSA fallback)
//!   3. Classification (tract income, minority tract, borrower, race/ethnicity)
//!   4. Peer selection (volume band around the subject, per cell)
//!   5. Aggregation    (subject / peer / market rows per cell)
//!
//! The engine module composes these into the three report families.

pub mod aggregate;
pub mod area;
pub mod branch;
pub mod classifier;
pub mod config;
pub mod crosswalk;
pub mod engine;
pub mod error;
pub mod notes;
pub mod peer;
pub mod records;
pub mod retrieval;
pub mod store;
pub mod types;
