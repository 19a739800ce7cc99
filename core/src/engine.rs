//! The analysis engine: composes the stages into the three report families.
//!
//! PIPELINE (per family, fixed order):
//!   1. Retrieve      subject pull → footprint counties → market pull
//!   2. Scope         mortgage loan-scope filter (mortgage only)
//!   3. Classify      attach tract / borrower / race classifications
//!   4. Footprint     (year, county) pairs where the subject has records
//!   5. Cells         group footprint records by (year, metro group)
//!   6. Per cell      volumes → peer band → subject / peer / market rows
//!
//! RULES:
//!   - The footprint comes from the subject's records only. Peer and
//!     market lenders never add or remove a cell.
//!   - Every cell is computed independently; cells may run in parallel.
//!   - A failing family never aborts the others.

use crate::{
    aggregate::{
        aggregate, AggregateMetrics, Cell, ClassifiedLoan, ClassifiedSmallBusiness, Contributes,
        GroupKind,
    },
    area::AssessmentArea,
    branch::{dedupe_and_classify, summarize_by_metro, BranchAccessSummary, ClassifiedBranch},
    classifier::{in_mortgage_scope, small_business_income_level, Classifier},
    config::AnalysisConfig,
    crosswalk::{GeographyCrosswalk, MetroGroupKey},
    error::{AnalysisError, AnalysisResult},
    notes::DataQualityNote,
    peer::{lender_volumes, select_peers, PeerSelection},
    records::{BranchRecord, CellRecord, LoanApplicationRecord, SmallBusinessLoanRecord},
    retrieval::{RecordQuery, RecordSource},
    types::{CountyCode, DataFamily, LenderId, VolumeBasis, Year},
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use uuid::Uuid;

// ── Report types ─────────────────────────────────────────────────────────────

/// Peer selection and the aggregate rows for one cell.
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub year: Year,
    pub metro: MetroGroupKey,
    pub selection: PeerSelection,
    /// Subject and market always; peer only when a band exists.
    pub rows: Vec<AggregateMetrics>,
}

impl CellReport {
    pub fn row(&self, group: GroupKind) -> Option<&AggregateMetrics> {
        self.rows.iter().find(|r| r.group == group)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FamilyReport {
    pub family: DataFamily,
    pub subject: LenderId,
    /// Records that entered cell aggregation (subject + everyone else).
    pub records_analyzed: usize,
    pub cells: Vec<CellReport>,
    pub notes: Vec<DataQualityNote>,
}

impl FamilyReport {
    fn empty(family: DataFamily, subject: &str) -> Self {
        Self {
            family,
            subject: subject.to_string(),
            records_analyzed: 0,
            cells: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn cell(&self, year: Year, metro: &MetroGroupKey) -> Option<&CellReport> {
        self.cells.iter().find(|c| c.year == year && &c.metro == metro)
    }

    /// All rows across cells, in cell order.
    pub fn rows(&self) -> impl Iterator<Item = &AggregateMetrics> {
        self.cells.iter().flat_map(|c| c.rows.iter())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchAccessRow {
    pub metro: MetroGroupKey,
    pub group: GroupKind,
    #[serde(flatten)]
    pub summary: BranchAccessSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchReport {
    #[serde(flatten)]
    pub report: FamilyReport,
    /// Deduplicated, classified branches inside the subject's footprint.
    pub branches: Vec<ClassifiedBranch>,
    /// Access category counts per metro group, subject and market.
    pub summaries: Vec<BranchAccessRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FamilyOutcome<T> {
    Completed { report: T },
    Unavailable { reason: String },
}

impl<T> FamilyOutcome<T> {
    fn from_result(family: DataFamily, result: AnalysisResult<T>) -> Self {
        match result {
            Ok(report) => FamilyOutcome::Completed { report },
            Err(e) => {
                log::error!("[{family}] analysis unavailable: {e}");
                FamilyOutcome::Unavailable { reason: e.to_string() }
            }
        }
    }

    pub fn report(&self) -> Option<&T> {
        match self {
            FamilyOutcome::Completed { report } => Some(report),
            FamilyOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, FamilyOutcome::Unavailable { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub subject: LenderId,
    pub area: AssessmentArea,
    pub mortgage: Option<FamilyOutcome<FamilyReport>>,
    pub small_business: Option<FamilyOutcome<FamilyReport>>,
    pub branch: Option<FamilyOutcome<BranchReport>>,
}

// ── Footprint ────────────────────────────────────────────────────────────────

/// The (county, year) pairs where the subject has at least one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    years_by_county: BTreeMap<CountyCode, BTreeSet<Year>>,
}

impl Footprint {
    pub fn of_subject<R: CellRecord>(subject: &str, records: &[R]) -> Self {
        let mut years_by_county: BTreeMap<CountyCode, BTreeSet<Year>> = BTreeMap::new();
        for r in records.iter().filter(|r| r.lender_id() == subject) {
            years_by_county
                .entry(r.county_code().to_string())
                .or_default()
                .insert(r.year());
        }
        Self { years_by_county }
    }

    pub fn is_empty(&self) -> bool {
        self.years_by_county.is_empty()
    }

    pub fn contains<R: CellRecord>(&self, record: &R) -> bool {
        self.years_by_county
            .get(record.county_code())
            .is_some_and(|years| years.contains(&record.year()))
    }

    pub fn counties(&self) -> impl Iterator<Item = &CountyCode> {
        self.years_by_county.keys()
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct AnalysisEngine {
    config: AnalysisConfig,
    crosswalk: GeographyCrosswalk,
}

impl AnalysisEngine {
    pub fn new(config: AnalysisConfig, crosswalk: GeographyCrosswalk) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { config, crosswalk })
    }

    /// Build an engine, loading the crosswalk from the source once.
    pub fn load(config: AnalysisConfig, source: &dyn RecordSource) -> AnalysisResult<Self> {
        let entries = source.crosswalk_entries()?;
        log::info!("Loaded {} crosswalk entries", entries.len());
        Self::new(config, GeographyCrosswalk::from_entries(entries))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn crosswalk(&self) -> &GeographyCrosswalk {
        &self.crosswalk
    }

    // ── Orchestration ────────────────────────────────────────────────────────

    /// Run every family. Each family's failure is isolated to its own slot.
    pub fn run_all(
        &self,
        source: &dyn RecordSource,
        subject: &str,
        area: &AssessmentArea,
    ) -> AnalysisReport {
        self.run(
            source,
            subject,
            area,
            &[DataFamily::Mortgage, DataFamily::SmallBusiness, DataFamily::Branch],
        )
    }

    pub fn run(
        &self,
        source: &dyn RecordSource,
        subject: &str,
        area: &AssessmentArea,
        families: &[DataFamily],
    ) -> AnalysisReport {
        let wants = |f: DataFamily| families.contains(&f);

        let mortgage = wants(DataFamily::Mortgage).then(|| {
            FamilyOutcome::from_result(
                DataFamily::Mortgage,
                self.analyze_mortgage(source, subject, area),
            )
        });
        let small_business = wants(DataFamily::SmallBusiness).then(|| {
            FamilyOutcome::from_result(
                DataFamily::SmallBusiness,
                self.analyze_small_business(source, subject, area),
            )
        });
        let branch = wants(DataFamily::Branch).then(|| {
            FamilyOutcome::from_result(
                DataFamily::Branch,
                self.analyze_branches(source, subject, area),
            )
        });

        AnalysisReport {
            analysis_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            subject: subject.to_string(),
            area: area.clone(),
            mortgage,
            small_business,
            branch,
        }
    }

    pub fn analyze_mortgage(
        &self,
        source: &dyn RecordSource,
        subject: &str,
        area: &AssessmentArea,
    ) -> AnalysisResult<FamilyReport> {
        let family = DataFamily::Mortgage;
        match retrieve(family, subject, area, |q| source.mortgage_records(q))? {
            Some(records) => Ok(self.mortgage_report(subject, records, area)),
            None => Ok(no_subject_activity(family, subject)),
        }
    }

    pub fn analyze_small_business(
        &self,
        source: &dyn RecordSource,
        subject: &str,
        area: &AssessmentArea,
    ) -> AnalysisResult<FamilyReport> {
        let family = DataFamily::SmallBusiness;
        match retrieve(family, subject, area, |q| source.small_business_records(q))? {
            Some(records) => Ok(self.small_business_report(subject, records, area)),
            None => Ok(no_subject_activity(family, subject)),
        }
    }

    pub fn analyze_branches(
        &self,
        source: &dyn RecordSource,
        subject: &str,
        area: &AssessmentArea,
    ) -> AnalysisResult<BranchReport> {
        let family = DataFamily::Branch;
        match retrieve(family, subject, area, |q| source.branch_records(q))? {
            Some(records) => Ok(self.branch_report(subject, records, area)),
            None => Ok(BranchReport {
                report: no_subject_activity(family, subject),
                branches: Vec::new(),
                summaries: Vec::new(),
            }),
        }
    }

    // ── In-memory entry points ───────────────────────────────────────────────

    pub fn mortgage_report(
        &self,
        subject: &str,
        records: Vec<LoanApplicationRecord>,
        area: &AssessmentArea,
    ) -> FamilyReport {
        // Out-of-area records pass through so the area filter counts them;
        // only in-area records can be out of scope.
        let scope = &self.config.mortgage.scope;
        let total = records.len();
        let in_scope: Vec<LoanApplicationRecord> = records
            .into_iter()
            .filter(|r| !area.covers(r) || in_mortgage_scope(scope, r))
            .collect();
        let out_of_scope = total - in_scope.len();

        let classifier = Classifier::new(&self.config.classification);
        let classified: Vec<ClassifiedLoan> = in_scope
            .into_iter()
            .map(|record| ClassifiedLoan {
                classification: classifier.classify_mortgage(&record),
                record,
            })
            .collect();

        let mut report = self.analyze_cells(
            DataFamily::Mortgage,
            subject,
            classified,
            area,
            self.config.mortgage.volume_basis,
        );
        if out_of_scope > 0 {
            let note = DataQualityNote::RecordsOutOfScope { count: out_of_scope };
            note.log(DataFamily::Mortgage);
            report.notes.push(note);
        }
        report
    }

    pub fn small_business_report(
        &self,
        subject: &str,
        records: Vec<SmallBusinessLoanRecord>,
        area: &AssessmentArea,
    ) -> FamilyReport {
        let table = &self.config.small_business.income_groups;
        let classified: Vec<ClassifiedSmallBusiness> = records
            .into_iter()
            .map(|record| ClassifiedSmallBusiness {
                tract_income: small_business_income_level(table, &record),
                record,
            })
            .collect();

        self.analyze_cells(
            DataFamily::SmallBusiness,
            subject,
            classified,
            area,
            self.config.small_business.volume_basis,
        )
    }

    pub fn branch_report(
        &self,
        subject: &str,
        records: Vec<BranchRecord>,
        area: &AssessmentArea,
    ) -> BranchReport {
        let branches = dedupe_and_classify(records, &self.crosswalk);
        let footprint = Footprint::of_subject(subject, &branches);

        let detail: Vec<ClassifiedBranch> = branches
            .iter()
            .filter(|b| area.covers(*b) && footprint.contains(*b))
            .cloned()
            .collect();

        let subject_summary =
            summarize_by_metro(detail.iter().filter(|b| b.record.institution_id == subject));
        let market_summary = summarize_by_metro(detail.iter());
        let mut summaries: Vec<BranchAccessRow> = Vec::new();
        for (metro, summary) in market_summary {
            if let Some(s) = subject_summary.get(&metro) {
                summaries.push(BranchAccessRow {
                    metro: metro.clone(),
                    group: GroupKind::Subject,
                    summary: s.clone(),
                });
            }
            summaries.push(BranchAccessRow { metro, group: GroupKind::Market, summary });
        }

        let report = self.analyze_cells(
            DataFamily::Branch,
            subject,
            branches,
            area,
            VolumeBasis::Count,
        );
        BranchReport { report, branches: detail, summaries }
    }

    // ── Cells ────────────────────────────────────────────────────────────────

    fn analyze_cells<R>(
        &self,
        family: DataFamily,
        subject: &str,
        records: Vec<R>,
        area: &AssessmentArea,
        basis: VolumeBasis,
    ) -> FamilyReport
    where
        R: CellRecord + Contributes + Sync,
    {
        let started = Instant::now();
        let mut report = FamilyReport::empty(family, subject);

        let retrieved = records.len();
        let records: Vec<R> = records.into_iter().filter(|r| area.covers(r)).collect();
        if records.len() < retrieved {
            report.notes.push(DataQualityNote::RecordsOutsideArea {
                count: retrieved - records.len(),
            });
        }

        let footprint = Footprint::of_subject(subject, &records);
        if footprint.is_empty() {
            report.notes.push(DataQualityNote::NoSubjectActivity { family });
            report.notes.iter().for_each(|n| n.log(family));
            return report;
        }

        // Resolve each footprint county once.
        let mut placement: BTreeMap<&str, (MetroGroupKey, bool)> = BTreeMap::new();
        for county in footprint.counties() {
            let resolution = self.crosswalk.resolve(county);
            let key = resolution.group_key();
            if !resolution.mapped {
                report.notes.push(DataQualityNote::UnmappedCounty {
                    county_code: county.clone(),
                    fallback: key.clone(),
                });
            }
            placement.insert(county.as_str(), (key, resolution.mapped));
        }

        let mut cells: BTreeMap<Cell, Vec<(&R, bool)>> = BTreeMap::new();
        for r in records.iter().filter(|r| footprint.contains(*r)) {
            if let Some((metro, mapped)) = placement.get(r.county_code()) {
                let cell = Cell { year: r.year(), metro: metro.clone() };
                cells.entry(cell).or_default().push((r, *mapped));
            }
        }
        report.records_analyzed = cells.values().map(Vec::len).sum();

        let work: Vec<(Cell, Vec<(&R, bool)>)> = cells.into_iter().collect();
        let compute = |(cell, members): &(Cell, Vec<(&R, bool)>)| {
            self.compute_cell(subject, cell, members, basis)
        };
        report.cells = if self.config.parallel_cells {
            work.par_iter().map(compute).collect()
        } else {
            work.iter().map(compute).collect()
        };

        for cell in &report.cells {
            if cell.selection == PeerSelection::InsufficientSubjectVolume {
                report.notes.push(DataQualityNote::InsufficientSubjectVolume {
                    year: cell.year,
                    metro: cell.metro.clone(),
                });
            }
        }
        report.notes.iter().for_each(|n| n.log(family));

        log::info!(
            "[{family}] {} cells, {} records analyzed in {:?}",
            report.cells.len(),
            report.records_analyzed,
            started.elapsed()
        );
        report
    }

    /// Peer band and the three membership-filtered aggregations for one cell.
    fn compute_cell<R>(
        &self,
        subject: &str,
        cell: &Cell,
        members: &[(&R, bool)],
        basis: VolumeBasis,
    ) -> CellReport
    where
        R: CellRecord + Contributes,
    {
        let volumes = lender_volumes(members.iter().map(|(r, _)| *r), basis);
        let selection = select_peers(subject, &volumes, &self.config.peer_band);

        let mut rows = Vec::with_capacity(3);
        rows.push(aggregate(
            cell,
            GroupKind::Subject,
            members.iter().copied().filter(|(r, _)| r.lender_id() == subject),
        ));
        if let Some(peers) = selection.peers() {
            log::debug!(
                "{} {}: {} peers of {} lenders",
                cell.year,
                cell.metro,
                peers.len(),
                volumes.len()
            );
            rows.push(aggregate(
                cell,
                GroupKind::Peer,
                members.iter().copied().filter(|(r, _)| peers.contains(r.lender_id())),
            ));
        }
        rows.push(aggregate(cell, GroupKind::Market, members.iter().copied()));

        CellReport {
            year: cell.year,
            metro: cell.metro.clone(),
            selection,
            rows,
        }
    }
}

// ── Retrieval helpers ────────────────────────────────────────────────────────

/// Subject pull to find its counties, then a market pull over only those.
/// Returns None when the subject has no records in the area at all.
fn retrieve<T, F>(
    family: DataFamily,
    subject: &str,
    area: &AssessmentArea,
    fetch: F,
) -> AnalysisResult<Option<Vec<T>>>
where
    T: CellRecord,
    F: Fn(&RecordQuery) -> AnalysisResult<Vec<T>>,
{
    let as_retrieval = |e: AnalysisError| match e {
        AnalysisError::Retrieval { .. } => e,
        other => AnalysisError::Retrieval { family, reason: other.to_string() },
    };

    let subject_records = fetch(&RecordQuery::for_lender(subject, area)).map_err(as_retrieval)?;
    let counties: BTreeSet<CountyCode> = subject_records
        .iter()
        .filter(|r| r.lender_id() == subject && area.covers(*r))
        .map(|r| r.county_code().to_string())
        .collect();
    if counties.is_empty() {
        return Ok(None);
    }

    let query = RecordQuery::market(
        counties.into_iter().collect(),
        area.years().iter().copied().collect(),
    );
    let records = fetch(&query).map_err(as_retrieval)?;
    log::info!(
        "[{family}] retrieved {} records across {} counties",
        records.len(),
        query.counties.len()
    );
    Ok(Some(records))
}

fn no_subject_activity(family: DataFamily, subject: &str) -> FamilyReport {
    let note = DataQualityNote::NoSubjectActivity { family };
    note.log(family);
    let mut report = FamilyReport::empty(family, subject);
    report.notes.push(note);
    report
}
