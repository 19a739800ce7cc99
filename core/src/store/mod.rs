//! SQLite warehouse adapter.
//!
//! RULE: Only the store talks to the database.
//! The engine reads through the RecordSource trait and never executes SQL.

use crate::{
    crosswalk::GeographyCrosswalkEntry,
    error::AnalysisResult,
    records::{BranchRecord, LoanApplicationRecord, SmallBusinessLoanRecord},
    retrieval::{RecordQuery, RecordSource},
};
use rusqlite::{types::Value, Connection};

mod branch;
mod crosswalk;
mod mortgage;
mod small_business;

pub struct WarehouseStore {
    conn: Connection,
}

impl WarehouseStore {
    pub fn open(path: &str) -> AnalysisResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests and demo runs).
    pub fn in_memory() -> AnalysisResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalysisResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_warehouse.sql"))?;
        Ok(())
    }

    /// Run `f` inside one transaction. Bulk seeding uses this.
    pub fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> AnalysisResult<T>,
    ) -> AnalysisResult<T> {
        self.conn.execute_batch("BEGIN")?;
        match f(self) {
            Ok(v) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(v)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }
}

/// WHERE clause + bound values for a RecordQuery.
/// `lender_column` differs between tables (lender_id vs institution_id).
fn query_filter(query: &RecordQuery, lender_column: &str) -> (String, Vec<Value>) {
    let mut values: Vec<Value> = Vec::new();

    let county_slots = vec!["?"; query.counties.len()].join(", ");
    values.extend(query.counties.iter().cloned().map(Value::from));

    let year_slots = vec!["?"; query.years.len()].join(", ");
    values.extend(query.years.iter().map(|y| Value::from(i64::from(*y))));

    let mut clause = format!("county_code IN ({county_slots}) AND year IN ({year_slots})");
    if let Some(lender) = &query.lender_id {
        clause.push_str(&format!(" AND {lender_column} = ?"));
        values.push(Value::from(lender.clone()));
    }
    (clause, values)
}

fn is_empty_query(query: &RecordQuery) -> bool {
    query.counties.is_empty() || query.years.is_empty()
}

impl RecordSource for WarehouseStore {
    fn crosswalk_entries(&self) -> AnalysisResult<Vec<GeographyCrosswalkEntry>> {
        self.all_crosswalk_entries()
    }

    fn mortgage_records(&self, query: &RecordQuery) -> AnalysisResult<Vec<LoanApplicationRecord>> {
        if is_empty_query(query) {
            return Ok(Vec::new());
        }
        self.select_mortgage_records(query)
    }

    fn small_business_records(
        &self,
        query: &RecordQuery,
    ) -> AnalysisResult<Vec<SmallBusinessLoanRecord>> {
        if is_empty_query(query) {
            return Ok(Vec::new());
        }
        self.select_small_business_records(query)
    }

    fn branch_records(&self, query: &RecordQuery) -> AnalysisResult<Vec<BranchRecord>> {
        if is_empty_query(query) {
            return Ok(Vec::new());
        }
        self.select_branch_records(query)
    }
}
