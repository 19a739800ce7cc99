//! lendscope-runner: headless peer analysis for one lender and assessment area.
//!
//! Usage:
//!   lendscope-runner --db warehouse.db --lender 1001 --counties 39049,39041 --years 2022,2023
//!   lendscope-runner --demo-seed 7 --family mortgage --out report.json
//!
//! With `--demo-seed` and no `--db`, an in-memory warehouse is seeded with a
//! deterministic synthetic market and the demo lender/area defaults apply.

mod demo;

use anyhow::{bail, Result};
use lendscope_core::{
    area::AssessmentArea,
    config::AnalysisConfig,
    engine::{AnalysisEngine, AnalysisReport, FamilyOutcome, FamilyReport},
    store::WarehouseStore,
    types::{DataFamily, Year},
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let demo_seed: Option<u64> = flag(&args, "--demo-seed").and_then(|s| s.parse().ok());
    let db = flag(&args, "--db");
    let data_dir = flag(&args, "--data-dir").unwrap_or("./data");
    let out = flag(&args, "--out");

    let (lender, counties, years) = match demo_seed {
        Some(_) => (
            flag(&args, "--lender").unwrap_or(demo::DEMO_SUBJECT).to_string(),
            flag(&args, "--counties")
                .map(parse_list)
                .unwrap_or_else(|| demo::DEMO_COUNTIES.iter().map(|c| c.to_string()).collect()),
            flag(&args, "--years")
                .map(parse_years)
                .transpose()?
                .unwrap_or_else(|| demo::DEMO_YEARS.to_vec()),
        ),
        None => {
            let Some(lender) = flag(&args, "--lender") else {
                bail!("--lender is required unless --demo-seed is given");
            };
            let Some(counties) = flag(&args, "--counties") else {
                bail!("--counties is required unless --demo-seed is given");
            };
            let Some(years) = flag(&args, "--years") else {
                bail!("--years is required unless --demo-seed is given");
            };
            (lender.to_string(), parse_list(counties), parse_years(years)?)
        }
    };
    let families = parse_families(flag(&args, "--family").unwrap_or("all"))?;

    let config_path = format!("{data_dir}/analysis_config.json");
    let config = if Path::new(&config_path).exists() {
        AnalysisConfig::load(data_dir)?
    } else {
        log::warn!("{config_path} not found; using standard configuration");
        AnalysisConfig::standard()
    };

    let store = match db {
        Some(path) => {
            let store = WarehouseStore::open(path)?;
            store.migrate()?;
            store
        }
        None => {
            let store = WarehouseStore::in_memory()?;
            store.migrate()?;
            store
        }
    };
    if let Some(seed) = demo_seed {
        demo::seed(&store, seed)?;
    }

    eprintln!("lendscope-runner");
    eprintln!("  lender:    {lender}");
    eprintln!("  counties:  {}", counties.join(","));
    eprintln!("  years:     {years:?}");
    eprintln!("  db:        {}", db.unwrap_or(":memory:"));
    eprintln!("  data_dir:  {data_dir}");
    eprintln!();

    let area = AssessmentArea::new(counties, years)?;
    let engine = AnalysisEngine::load(config, &store)?;
    let report = engine.run(&store, &lender, &area, &families);

    let json = serde_json::to_string_pretty(&report)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .map_err(|e| anyhow::anyhow!("Cannot write {path}: {e}"))?;
            print_summary(&report);
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    eprintln!("=== ANALYSIS SUMMARY ===");
    eprintln!("  analysis_id:  {}", report.analysis_id);
    eprintln!("  generated_at: {}", report.generated_at.to_rfc3339());
    let families = [
        (DataFamily::Mortgage, report.mortgage.as_ref().map(|o| summarize(o, |r| r))),
        (DataFamily::SmallBusiness, report.small_business.as_ref().map(|o| summarize(o, |r| r))),
        (DataFamily::Branch, report.branch.as_ref().map(|o| summarize(o, |b| &b.report))),
    ];
    for (family, line) in families {
        if let Some(line) = line {
            eprintln!("  {:<15} {line}", family.as_str());
        }
    }
}

fn summarize<T>(outcome: &FamilyOutcome<T>, family_report: fn(&T) -> &FamilyReport) -> String {
    match outcome {
        FamilyOutcome::Completed { report } => {
            let r = family_report(report);
            format!(
                "{} records | {} cells | {} notes",
                r.records_analyzed,
                r.cells.len(),
                r.notes.len()
            )
        }
        FamilyOutcome::Unavailable { reason } => format!("unavailable: {reason}"),
    }
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_years(raw: &str) -> Result<Vec<Year>> {
    parse_list(raw)
        .iter()
        .map(|y| {
            y.parse::<Year>()
                .map_err(|e| anyhow::anyhow!("Invalid year {y:?}: {e}"))
        })
        .collect()
}

fn parse_families(raw: &str) -> Result<Vec<DataFamily>> {
    let mut out = Vec::new();
    for name in parse_list(raw) {
        match name.as_str() {
            "all" => out.extend([
                DataFamily::Mortgage,
                DataFamily::SmallBusiness,
                DataFamily::Branch,
            ]),
            "mortgage" => out.push(DataFamily::Mortgage),
            "small-business" | "small_business" => out.push(DataFamily::SmallBusiness),
            "branch" | "branches" => out.push(DataFamily::Branch),
            other => {
                bail!("Unknown family {other:?} (expected all, mortgage, small-business, branch)")
            }
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_parse_and_expand_all() {
        assert_eq!(
            parse_families("all").unwrap(),
            vec![DataFamily::Mortgage, DataFamily::SmallBusiness, DataFamily::Branch]
        );
        assert_eq!(parse_families("branch").unwrap(), vec![DataFamily::Branch]);
        assert!(parse_families("auto").is_err());
    }

    #[test]
    fn lists_skip_blanks() {
        assert_eq!(parse_list("39049, 39041,,"), vec!["39049", "39041"]);
        assert!(parse_years("2022,twenty").is_err());
    }

    #[test]
    fn demo_market_runs_end_to_end() {
        let store = WarehouseStore::in_memory().unwrap();
        store.migrate().unwrap();
        demo::seed(&store, 7).unwrap();

        let area = AssessmentArea::new(
            demo::DEMO_COUNTIES.iter().map(|c| c.to_string()),
            demo::DEMO_YEARS,
        )
        .unwrap();
        let engine = AnalysisEngine::load(AnalysisConfig::standard(), &store).unwrap();
        let report = engine.run_all(&store, demo::DEMO_SUBJECT, &area);

        let mortgage = report.mortgage.as_ref().and_then(FamilyOutcome::report).unwrap();
        assert!(mortgage.records_analyzed > 0);
        assert!(!mortgage.cells.is_empty());
        assert!(report.branch.as_ref().and_then(FamilyOutcome::report).is_some());
    }
}
