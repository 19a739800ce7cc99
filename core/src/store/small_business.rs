//! Store methods for small-business lending rows.

use super::{query_filter, WarehouseStore};
use crate::{
    error::AnalysisResult,
    records::{SizeBucket, SmallBusinessLoanRecord},
    retrieval::RecordQuery,
};
use rusqlite::{params, params_from_iter, Row};

const SMALL_BUSINESS_COLUMNS: &str = "lender_id, year, county_code, income_group_code,
    count_under_100k, amount_under_100k, count_100k_250k, amount_100k_250k,
    count_250k_1m, amount_250k_1m, count_rev_under_1m, amount_rev_under_1m";

fn bucket(row: &Row<'_>, count_idx: usize) -> rusqlite::Result<SizeBucket> {
    let count: i64 = row.get(count_idx)?;
    Ok(SizeBucket {
        count: count.max(0) as u64,
        amount: row.get(count_idx + 1)?,
    })
}

impl WarehouseStore {
    pub fn insert_small_business_record(&self, r: &SmallBusinessLoanRecord) -> AnalysisResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO small_business_loan ({SMALL_BUSINESS_COLUMNS})
                 VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)"
            ),
            params![
                r.lender_id, r.year, r.county_code, r.income_group_code,
                r.under_100k.count as i64, r.under_100k.amount,
                r.from_100k_to_250k.count as i64, r.from_100k_to_250k.amount,
                r.from_250k_to_1m.count as i64, r.from_250k_to_1m.amount,
                r.revenue_under_1m.count as i64, r.revenue_under_1m.amount,
            ],
        )?;
        Ok(())
    }

    pub(super) fn select_small_business_records(
        &self,
        query: &RecordQuery,
    ) -> AnalysisResult<Vec<SmallBusinessLoanRecord>> {
        let (clause, values) = query_filter(query, "lender_id");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SMALL_BUSINESS_COLUMNS} FROM small_business_loan
             WHERE {clause} ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |r| {
                Ok(SmallBusinessLoanRecord {
                    lender_id:         r.get(0)?,
                    year:              r.get(1)?,
                    county_code:       r.get(2)?,
                    income_group_code: r.get(3)?,
                    under_100k:        bucket(r, 4)?,
                    from_100k_to_250k: bucket(r, 6)?,
                    from_250k_to_1m:   bucket(r, 8)?,
                    revenue_under_1m:  bucket(r, 10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
