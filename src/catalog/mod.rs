//! # Catalog — Research-Campaign Model and Funding Core
//!
//! Organizes fundable research into **experiments**: campaigns with a funding
//! goal and deadline, a ladder of paid support tiers, content-addressed data
//! artifacts, and a monthly access price. Campaigns are defined in TOML
//! (version-controlled) or posted as JSON, held in an in-memory repository,
//! and read through pure funding/pricing functions.
//!
//! ## Module Structure
//!
//! - [`config`] — Typed campaign-creation input: TOML/JSON parsing, validation, slugification
//! - [`types`] — Experiment, support tier, data file, update, researcher entities
//! - [`repository`] — In-memory, insertion-ordered campaign repository
//! - [`funding`] — Pure funding-progress and tier-ladder math
//! - [`pricing`] — Swappable access-pricing strategy (linear default)

pub mod config;
pub mod funding;
pub mod pricing;
pub mod repository;
pub mod types;

pub use config::{
    parse_toml, parse_toml_file, slugify, ExperimentInput, ExperimentMeta, ExperimentPatch,
    SupportTierInput,
};
pub use pricing::{price, LinearPricing, PricingPolicy};
pub use repository::CampaignRepository;
pub use types::*;

#[cfg(test)]
mod tests;
