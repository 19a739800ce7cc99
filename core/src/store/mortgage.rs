//! Store methods for mortgage application records.

use super::{query_filter, WarehouseStore};
use crate::{error::AnalysisResult, records::LoanApplicationRecord, retrieval::RecordQuery};
use rusqlite::{params, params_from_iter};

const MORTGAGE_COLUMNS: &str = "lender_id, year, county_code, loan_amount,
    borrower_income, area_median_family_income, tract_income_ratio, tract_minority_pct,
    ethnicity_1, ethnicity_2, ethnicity_3, ethnicity_4, ethnicity_5,
    race_1, race_2, race_3, race_4, race_5,
    loan_purpose, action_taken, occupancy_type, total_units,
    construction_method, reverse_mortgage";

impl WarehouseStore {
    pub fn insert_mortgage_record(&self, r: &LoanApplicationRecord) -> AnalysisResult<()> {
        let [e1, e2, e3, e4, e5] = r.ethnicity_codes;
        let [r1, r2, r3, r4, r5] = r.race_codes;
        self.conn.execute(
            &format!(
                "INSERT INTO mortgage_application ({MORTGAGE_COLUMNS})
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,
                         ?17,?18,?19,?20,?21,?22,?23,?24)"
            ),
            params![
                r.lender_id, r.year, r.county_code, r.loan_amount,
                r.borrower_income, r.area_median_family_income,
                r.tract_income_ratio, r.tract_minority_pct,
                e1, e2, e3, e4, e5,
                r1, r2, r3, r4, r5,
                r.loan_purpose, r.action_taken, r.occupancy_type, r.total_units,
                r.construction_method, r.reverse_mortgage,
            ],
        )?;
        Ok(())
    }

    pub(super) fn select_mortgage_records(
        &self,
        query: &RecordQuery,
    ) -> AnalysisResult<Vec<LoanApplicationRecord>> {
        let (clause, values) = query_filter(query, "lender_id");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MORTGAGE_COLUMNS} FROM mortgage_application
             WHERE {clause} ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |r| {
                Ok(LoanApplicationRecord {
                    lender_id:                 r.get(0)?,
                    year:                      r.get(1)?,
                    county_code:               r.get(2)?,
                    loan_amount:               r.get(3)?,
                    borrower_income:           r.get(4)?,
                    area_median_family_income: r.get(5)?,
                    tract_income_ratio:        r.get(6)?,
                    tract_minority_pct:        r.get(7)?,
                    ethnicity_codes: [r.get(8)?, r.get(9)?, r.get(10)?, r.get(11)?, r.get(12)?],
                    race_codes:      [r.get(13)?, r.get(14)?, r.get(15)?, r.get(16)?, r.get(17)?],
                    loan_purpose:        r.get(18)?,
                    action_taken:        r.get(19)?,
                    occupancy_type:      r.get(20)?,
                    total_units:         r.get(21)?,
                    construction_method: r.get(22)?,
                    reverse_mortgage:    r.get(23)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn mortgage_record_count(&self) -> AnalysisResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM mortgage_application",
            params![],
            |r| r.get(0),
        )?)
    }
}
