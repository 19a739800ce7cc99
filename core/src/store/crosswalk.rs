//! Store methods for geography reference data.

use super::WarehouseStore;
use crate::{crosswalk::GeographyCrosswalkEntry, error::AnalysisResult};
use rusqlite::params;

impl WarehouseStore {
    pub fn insert_crosswalk_entry(&self, entry: &GeographyCrosswalkEntry) -> AnalysisResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO geography_crosswalk
             (county_code, metro_code, metro_name, county_name, state_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.county_code,
                entry.metro_code,
                entry.metro_name,
                entry.county_name,
                entry.state_name,
            ],
        )?;
        Ok(())
    }

    /// The whole crosswalk. Loaded once per analysis run.
    pub fn all_crosswalk_entries(&self) -> AnalysisResult<Vec<GeographyCrosswalkEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT county_code, metro_code, metro_name, county_name, state_name
             FROM geography_crosswalk ORDER BY county_code",
        )?;
        let entries = stmt
            .query_map([], |r| {
                Ok(GeographyCrosswalkEntry {
                    county_code: r.get(0)?,
                    metro_code:  r.get(1)?,
                    metro_name:  r.get(2)?,
                    county_name: r.get(3)?,
                    state_name:  r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
