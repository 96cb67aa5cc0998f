// ⚙️ Payout Configuration - pool, tax and weights from a JSON file
//
// {
//   "total_pool": "$4,209,000,000.00",
//   "tax_rate": 0.05,
//   "score_weight": 60,
//   "hit_weight": 30,
//   "name_truncate_threshold": 15,
//   "faction_id": "40959",
//   "template": "templates/earnings.html"
// }

use crate::earnings::PayoutParams;
use crate::names::{NameReconciler, DEFAULT_TRUNCATE_THRESHOLD};
use crate::parser::parse_us_number;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TAX_RATE: f64 = 0.05;
pub const DEFAULT_SCORE_WEIGHT: f64 = 60.0;
pub const DEFAULT_HIT_WEIGHT: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutConfig {
    /// Pool before tax; a number or a US-formatted string
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total_pool: f64,

    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,

    #[serde(default = "default_score_weight")]
    pub score_weight: f64,

    #[serde(default = "default_hit_weight")]
    pub hit_weight: f64,

    /// `null` turns the long-name truncation off
    #[serde(default = "default_truncate_threshold")]
    pub name_truncate_threshold: Option<usize>,

    #[serde(default)]
    pub faction_id: Option<String>,

    #[serde(default)]
    pub template: Option<PathBuf>,
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

fn default_score_weight() -> f64 {
    DEFAULT_SCORE_WEIGHT
}

fn default_hit_weight() -> f64 {
    DEFAULT_HIT_WEIGHT
}

fn default_truncate_threshold() -> Option<usize> {
    Some(DEFAULT_TRUNCATE_THRESHOLD)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => parse_us_number(&s).map_err(serde::de::Error::custom),
    }
}

impl Default for PayoutConfig {
    fn default() -> Self {
        PayoutConfig {
            total_pool: 0.0,
            tax_rate: DEFAULT_TAX_RATE,
            score_weight: DEFAULT_SCORE_WEIGHT,
            hit_weight: DEFAULT_HIT_WEIGHT,
            name_truncate_threshold: default_truncate_threshold(),
            faction_id: None,
            template: None,
        }
    }
}

impl PayoutConfig {
    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        Self::from_json(&content)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse config JSON")
    }

    pub fn validate(&self) -> Result<()> {
        if !self.total_pool.is_finite() || self.total_pool < 0.0 {
            anyhow::bail!("total_pool must be a non-negative amount, got {}", self.total_pool);
        }

        if !(0.0..=1.0).contains(&self.tax_rate) {
            anyhow::bail!("tax_rate must be between 0 and 1, got {}", self.tax_rate);
        }

        if !self.score_weight.is_finite() || self.score_weight < 0.0 {
            anyhow::bail!("score_weight must be non-negative, got {}", self.score_weight);
        }

        if !self.hit_weight.is_finite() || self.hit_weight < 0.0 {
            anyhow::bail!("hit_weight must be non-negative, got {}", self.hit_weight);
        }

        if self.score_weight + self.hit_weight == 0.0 {
            anyhow::bail!("score_weight and hit_weight cannot both be zero");
        }

        Ok(())
    }

    pub fn payout_params(&self) -> PayoutParams {
        PayoutParams::new(self.total_pool, self.tax_rate, self.score_weight, self.hit_weight)
    }

    pub fn reconciler(&self) -> NameReconciler {
        NameReconciler::with_truncation(self.name_truncate_threshold)
    }
}
