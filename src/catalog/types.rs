//! Catalog entity types: experiments and everything they own.
//!
//! An `Experiment` is a fundable research campaign. It exclusively owns its
//! embedded tiers, data files, updates, and researchers — they live and die
//! with the parent. Monetary amounts are EDU-token f64 values; the contract
//! address and data-file content hashes are opaque strings this core carries
//! but never interprets.

use serde::{Deserialize, Serialize};

/// A research campaign: funding state, support-tier ladder, gated data.
///
/// Invariants (enforced at creation, assumed thereafter): `funding_goal > 0`,
/// `funding_raised >= 0`, `access_price > 0`. `funding_raised` may exceed the
/// goal — overfunded campaigns are valid. `days_left <= 0` means the funding
/// period has ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Monthly access base price in EDU.
    pub access_price: f64,
    pub funding_goal: f64,
    #[serde(default)]
    pub funding_raised: f64,
    /// Campaign-level backer total. Per-tier counters are independent and
    /// are not required to sum to this.
    #[serde(default)]
    pub backers: u64,
    #[serde(default)]
    pub days_left: i64,
    /// On-chain settlement contract. Opaque; format unvalidated here.
    #[serde(default)]
    pub contract_address: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<Researcher>,
    pub details: Option<ExperimentDetails>,
    pub requirements: Option<Requirements>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub researchers: Vec<Researcher>,
    /// Newest-first by convention; `append_update` inserts at the front.
    #[serde(default)]
    pub updates: Vec<Update>,
    #[serde(default)]
    pub data_files: Vec<DataFile>,
    /// Ascending amount order by convention (not enforced; pricing and
    /// eligibility reads sort defensively).
    #[serde(default)]
    pub support_tiers: Vec<SupportTier>,
}

/// A named contribution threshold. Benefits are cumulative: a tier's
/// description implicitly includes everything the lower tiers grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTier {
    /// Contribution threshold in EDU.
    pub amount: f64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Backers who chose exactly this tier. Independent counter — not a
    /// cumulative sum, not reconciled with `Experiment::backers`.
    #[serde(default)]
    pub backers: u64,
}

/// A content-addressed research artifact on decentralized storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Informational, free-form ("1.2 GB", "4.5 MB").
    #[serde(default)]
    pub size: String,
    pub date: chrono::NaiveDate,
    /// Opaque content hash used for integrity verification against storage.
    pub hash: String,
}

/// A campaign progress update. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub date: chrono::NaiveDate,
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// A member of the research team (or the campaign author).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Researcher {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub institution: String,
}

/// Long-form campaign body shown on the detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentDetails {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub methodology: String,
    #[serde(default)]
    pub impact: String,
}

/// What the project needs to run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub computation: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub timeline: String,
}
