use crate::{
    error::{AnalysisError, AnalysisResult},
    types::VolumeBasis,
};
use serde::{Deserialize, Serialize};

// ── Classification thresholds and code tables ──────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Tract or borrower is LMI when its ratio to area median is <= this.
    pub lmi_ratio_max: f64,
    /// Tract is majority-minority when minority percentage is > this.
    pub mmct_minority_pct_min: f64,
    /// Income level boundaries (percent of area median).
    pub low_income_ratio_below: f64,
    pub middle_income_ratio_below: f64,
    pub hispanic_ethnicity_codes: Vec<u32>,
    pub race_codes: RaceCodeTable,
    /// Not provided, not applicable, no co-applicant.
    pub race_non_response_codes: Vec<u32>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            lmi_ratio_max: 80.0,
            mmct_minority_pct_min: 50.0,
            low_income_ratio_below: 50.0,
            middle_income_ratio_below: 120.0,
            hispanic_ethnicity_codes: vec![1, 11, 12, 13, 14],
            race_codes: RaceCodeTable::default(),
            race_non_response_codes: vec![6, 7, 8],
        }
    }
}

/// Race code → category table. Codes not listed here fall into White/other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceCodeTable {
    pub native_american: Vec<u32>,
    pub asian: Vec<u32>,
    pub black: Vec<u32>,
    pub pacific_islander: Vec<u32>,
}

impl Default for RaceCodeTable {
    fn default() -> Self {
        Self {
            native_american: vec![1],
            asian: vec![2, 21, 22, 23, 24, 25, 26, 27],
            black: vec![3],
            pacific_islander: vec![4, 41, 42, 43, 44],
        }
    }
}

// ── Peer band ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerBandConfig {
    pub lower_multiplier: f64,
    pub upper_multiplier: f64,
}

impl Default for PeerBandConfig {
    fn default() -> Self {
        Self {
            lower_multiplier: 0.5,
            upper_multiplier: 2.0,
        }
    }
}

// ── Mortgage scope ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MortgageConfig {
    pub volume_basis: VolumeBasis,
    pub scope: MortgageScope,
}

impl Default for MortgageConfig {
    fn default() -> Self {
        Self {
            volume_basis: VolumeBasis::Count,
            scope: MortgageScope::default(),
        }
    }
}

/// Which mortgage records enter the analysis at all.
/// An empty code list means "unrestricted" for that field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MortgageScope {
    pub action_taken_codes: Vec<u32>,
    pub occupancy_types: Vec<u32>,
    pub construction_methods: Vec<u32>,
    pub loan_purposes: Vec<u32>,
    pub max_total_units: Option<u32>,
    pub exclude_reverse_mortgages: bool,
}

impl Default for MortgageScope {
    fn default() -> Self {
        Self {
            action_taken_codes: vec![1],
            occupancy_types: vec![1],
            construction_methods: vec![1],
            loan_purposes: Vec::new(),
            max_total_units: Some(4),
            exclude_reverse_mortgages: true,
        }
    }
}

// ── Small business ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmallBusinessConfig {
    pub volume_basis: VolumeBasis,
    pub income_groups: IncomeGroupTable,
}

impl Default for SmallBusinessConfig {
    fn default() -> Self {
        Self {
            volume_basis: VolumeBasis::Count,
            income_groups: IncomeGroupTable::default(),
        }
    }
}

/// Tract income-group code → income level. Unlisted codes are unclassified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeGroupTable {
    pub low: Vec<u32>,
    pub moderate: Vec<u32>,
    pub middle: Vec<u32>,
    pub upper: Vec<u32>,
}

impl Default for IncomeGroupTable {
    fn default() -> Self {
        Self {
            low: vec![101],
            moderate: vec![102],
            middle: vec![103],
            upper: vec![104],
        }
    }
}

// ── Top-level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub classification: ClassificationConfig,
    pub peer_band: PeerBandConfig,
    pub mortgage: MortgageConfig,
    pub small_business: SmallBusinessConfig,
    pub parallel_cells: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnalysisConfig {
    /// Built-in thresholds and code tables.
    pub fn standard() -> Self {
        Self {
            classification: ClassificationConfig::default(),
            peer_band: PeerBandConfig::default(),
            mortgage: MortgageConfig::default(),
            small_business: SmallBusinessConfig::default(),
            parallel_cells: true,
        }
    }

    /// Load from the data/ directory. Missing sections keep their standard values.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/analysis_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: AnalysisConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        let band = &self.peer_band;
        if !(band.lower_multiplier > 0.0 && band.upper_multiplier > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "peer band multipliers must be positive, got [{}, {}]",
                band.lower_multiplier, band.upper_multiplier
            )));
        }
        if band.lower_multiplier > band.upper_multiplier {
            return Err(AnalysisError::InvalidConfig(format!(
                "peer band lower multiplier {} exceeds upper {}",
                band.lower_multiplier, band.upper_multiplier
            )));
        }

        let c = &self.classification;
        if !(c.low_income_ratio_below <= c.lmi_ratio_max
            && c.lmi_ratio_max < c.middle_income_ratio_below)
        {
            return Err(AnalysisError::InvalidConfig(format!(
                "income boundaries must satisfy low ({}) <= lmi ({}) < middle ({})",
                c.low_income_ratio_below, c.lmi_ratio_max, c.middle_income_ratio_below
            )));
        }
        Ok(())
    }
}
