//! Campaign-creation input: typed structs, TOML/JSON parsing, validation.
//!
//! An experiment TOML defines the full campaign: identity, pricing, funding
//! target, research team, long-form details, and the support-tier ladder.
//! The same shapes deserialize from the JSON bodies of `POST /experiments`,
//! replacing the untyped payloads the original frontend sent.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::types::{Experiment, ExperimentDetails, Requirements, Researcher, SupportTier};
use crate::error::CatalogError;

// ── Input Structs ───────────────────────────────────────────────

/// Top-level campaign input parsed from TOML files or JSON bodies.
///
/// Maps to the `[experiment]`, `[author]`, `[details]`, `[requirements]`,
/// and `[[support_tiers]]` / `[[researchers]]` sections of a campaign TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentInput {
    pub experiment: ExperimentMeta,
    pub author: Option<Researcher>,
    pub details: Option<ExperimentDetails>,
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub researchers: Vec<Researcher>,
    #[serde(default)]
    pub support_tiers: Vec<SupportTierInput>,
}

/// The `[experiment]` section: identity, pricing, and funding target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentMeta {
    /// Explicit id; slugified from the title when absent.
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Monthly access base price in EDU. Must be positive.
    #[serde(default)]
    pub access_price: f64,
    /// Funding goal in EDU. Must be positive.
    #[serde(default)]
    pub funding_goal: f64,
    /// Length of the funding window in days.
    #[serde(default = "default_duration_days")]
    pub duration_days: i64,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_duration_days() -> i64 {
    30
}

/// One `[[support_tiers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTierInput {
    pub amount: f64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

// ── Parsing ─────────────────────────────────────────────────────

/// Parse a campaign input from a TOML string.
pub fn parse_toml(content: &str) -> Result<ExperimentInput> {
    let input: ExperimentInput = toml::from_str(content)?;
    input.validate()?;
    Ok(input)
}

/// Parse a campaign input from a TOML file path.
pub fn parse_toml_file(path: &std::path::Path) -> Result<ExperimentInput> {
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content)
}

impl ExperimentInput {
    /// Validate required fields, collecting every violation rather than
    /// stopping at the first.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut fields: Vec<String> = Vec::new();
        if self.experiment.title.trim().is_empty() {
            fields.push("title".into());
        }
        if !(self.experiment.funding_goal > 0.0) {
            fields.push("funding_goal".into());
        }
        if !(self.experiment.access_price > 0.0) {
            fields.push("access_price".into());
        }
        for (i, tier) in self.support_tiers.iter().enumerate() {
            if !(tier.amount > 0.0) || tier.title.trim().is_empty() {
                fields.push(format!("support_tiers[{}]", i));
            }
        }
        if !fields.is_empty() {
            return Err(CatalogError::validation(fields));
        }

        // Ascending tier amounts are a convention, not a hard requirement
        let mut prev = 0.0_f64;
        for tier in &self.support_tiers {
            if tier.amount <= prev {
                tracing::warn!(
                    experiment = %self.experiment.title,
                    tier = %tier.title,
                    "support tiers are not strictly increasing by amount"
                );
                break;
            }
            prev = tier.amount;
        }
        Ok(())
    }

    /// Resolved experiment id: explicit, or a slug of the title.
    pub fn resolved_id(&self) -> String {
        self.experiment
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| slugify(&self.experiment.title))
    }

    /// Materialize a fresh `Experiment` from this input. Funding counters
    /// start at zero, the updates and data-file lists empty.
    pub fn into_experiment(self) -> Experiment {
        let id = self.resolved_id();
        Experiment {
            id,
            title: self.experiment.title,
            description: self.experiment.description,
            category: self.experiment.category,
            access_price: self.experiment.access_price,
            funding_goal: self.experiment.funding_goal,
            funding_raised: 0.0,
            backers: 0,
            days_left: self.experiment.duration_days,
            contract_address: self.experiment.contract_address,
            tags: self.experiment.tags,
            author: self.author,
            details: self.details,
            requirements: self.requirements,
            benefits: self.benefits,
            researchers: self.researchers,
            updates: Vec::new(),
            data_files: Vec::new(),
            support_tiers: self
                .support_tiers
                .into_iter()
                .map(|t| SupportTier {
                    amount: t.amount,
                    title: t.title,
                    description: t.description,
                    backers: 0,
                })
                .collect(),
        }
    }
}

/// Partial update applied by `PUT /experiments/{id}`. Funding counters are
/// deliberately absent: those move only through pledges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub days_left: Option<i64>,
    pub contract_address: Option<String>,
    pub tags: Option<Vec<String>>,
    pub details: Option<ExperimentDetails>,
    pub benefits: Option<Vec<String>>,
}

/// Generate a URL-safe slug from a campaign title.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
