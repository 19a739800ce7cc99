//! Store methods for branch observations.

use super::{query_filter, WarehouseStore};
use crate::{error::AnalysisResult, records::BranchRecord, retrieval::RecordQuery};
use rusqlite::{params, params_from_iter};

impl WarehouseStore {
    pub fn insert_branch_record(&self, r: &BranchRecord) -> AnalysisResult<()> {
        self.conn.execute(
            "INSERT INTO branch_observation
             (institution_id, year, county_code, branch_id, lmi_tract, majority_minority_tract)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                r.institution_id, r.year, r.county_code, r.branch_id,
                r.lmi_tract, r.majority_minority_tract,
            ],
        )?;
        Ok(())
    }

    pub(super) fn select_branch_records(
        &self,
        query: &RecordQuery,
    ) -> AnalysisResult<Vec<BranchRecord>> {
        let (clause, values) = query_filter(query, "institution_id");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT institution_id, year, county_code, branch_id,
                    lmi_tract, majority_minority_tract
             FROM branch_observation WHERE {clause} ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |r| {
                Ok(BranchRecord {
                    institution_id:          r.get(0)?,
                    year:                    r.get(1)?,
                    county_code:             r.get(2)?,
                    branch_id:               r.get(3)?,
                    lmi_tract:               r.get(4)?,
                    majority_minority_tract: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn branch_observation_count(&self) -> AnalysisResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM branch_observation",
            params![],
            |r| r.get(0),
        )?)
    }
}
