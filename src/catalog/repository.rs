//! In-memory campaign repository.
//!
//! Holds every `Experiment` the catalog knows about, keyed by id, with
//! `list()` preserving insertion order. Pure data plus derived accessors —
//! no I/O. Concurrent writers to the same experiment id must be serialized
//! by the caller (the API server wraps the repository in a mutex);
//! `funding_raised`, `backers`, and tier counters are monotonically
//! non-decreasing under that discipline.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use super::config::{ExperimentInput, ExperimentPatch};
use super::types::{DataFile, Experiment, Update};
use crate::error::CatalogError;

#[derive(Debug, Default)]
pub struct CampaignRepository {
    experiments: HashMap<String, Experiment>,
    /// Insertion order of ids, backing `list()`.
    order: Vec<String>,
}

impl CampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up one experiment by id.
    pub fn get(&self, id: &str) -> Result<&Experiment, CatalogError> {
        self.experiments
            .get(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// All experiments in insertion order.
    pub fn list(&self) -> Vec<&Experiment> {
        self.order
            .iter()
            .filter_map(|id| self.experiments.get(id))
            .collect()
    }

    /// Validate the input and add a new campaign. Fails with `Validation`
    /// naming every violated field, or `Conflict` when the id is taken.
    pub fn create(&mut self, input: ExperimentInput) -> Result<&Experiment, CatalogError> {
        input.validate()?;
        let id = input.resolved_id();
        if self.experiments.contains_key(&id) {
            return Err(CatalogError::Conflict(id));
        }
        let experiment = input.into_experiment();
        info!(id = %experiment.id, title = %experiment.title, "experiment created");
        self.order.push(id.clone());
        Ok(self.experiments.entry(id).or_insert(experiment))
    }

    /// Insert a fully-formed experiment (seed data, imports). Same conflict
    /// rule as `create`, no field validation.
    pub fn insert(&mut self, experiment: Experiment) -> Result<(), CatalogError> {
        if self.experiments.contains_key(&experiment.id) {
            return Err(CatalogError::Conflict(experiment.id));
        }
        self.order.push(experiment.id.clone());
        self.experiments.insert(experiment.id.clone(), experiment);
        Ok(())
    }

    /// Prepend a progress update (newest-first).
    pub fn append_update(&mut self, id: &str, update: Update) -> Result<&Experiment, CatalogError> {
        let experiment = self.get_mut(id)?;
        info!(id = %id, title = %update.title, "update posted");
        experiment.updates.insert(0, update);
        Ok(experiment)
    }

    /// Record a pledge: bump `funding_raised`, the campaign backer total,
    /// and — when a tier was chosen — that tier's own counter. Tier counters
    /// stay independent of the campaign total.
    pub fn record_pledge(
        &mut self,
        id: &str,
        amount: f64,
        tier_index: Option<usize>,
    ) -> Result<&Experiment, CatalogError> {
        if !(amount > 0.0) {
            return Err(CatalogError::InvalidInput(format!(
                "pledge amount must be positive, got {}",
                amount
            )));
        }
        let experiment = self.get_mut(id)?;
        if let Some(i) = tier_index {
            let tier = experiment.support_tiers.get_mut(i).ok_or_else(|| {
                CatalogError::InvalidInput(format!("no support tier at index {}", i))
            })?;
            tier.backers += 1;
        }
        experiment.funding_raised += amount;
        experiment.backers += 1;
        info!(
            id = %id,
            amount,
            raised = experiment.funding_raised,
            backers = experiment.backers,
            "pledge recorded"
        );
        Ok(experiment)
    }

    /// Attach an uploaded data file to a campaign.
    pub fn attach_data_file(
        &mut self,
        id: &str,
        file: DataFile,
    ) -> Result<&Experiment, CatalogError> {
        if file.name.trim().is_empty() || file.hash.trim().is_empty() {
            return Err(CatalogError::validation(["name", "hash"]));
        }
        let experiment = self.get_mut(id)?;
        info!(id = %id, file = %file.name, hash = %file.hash, "data file attached");
        experiment.data_files.push(file);
        Ok(experiment)
    }

    /// Apply a partial update to presentation fields. Funding counters move
    /// only through `record_pledge`.
    pub fn patch(&mut self, id: &str, patch: ExperimentPatch) -> Result<&Experiment, CatalogError> {
        if matches!(&patch.title, Some(t) if t.trim().is_empty()) {
            return Err(CatalogError::validation(["title"]));
        }
        let experiment = self.get_mut(id)?;
        if let Some(title) = patch.title {
            experiment.title = title;
        }
        if let Some(description) = patch.description {
            experiment.description = description;
        }
        if let Some(category) = patch.category {
            experiment.category = category;
        }
        if let Some(days_left) = patch.days_left {
            experiment.days_left = days_left;
        }
        if let Some(contract_address) = patch.contract_address {
            experiment.contract_address = contract_address;
        }
        if let Some(tags) = patch.tags {
            experiment.tags = tags;
        }
        if let Some(details) = patch.details {
            experiment.details = Some(details);
        }
        if let Some(benefits) = patch.benefits {
            experiment.benefits = benefits;
        }
        Ok(experiment)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Experiment, CatalogError> {
        self.experiments
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// A repository pre-loaded with the demo campaign. Used by `serve --seed`
    /// and the workflow examples.
    pub fn with_demo_data() -> Self {
        let mut repo = Self::new();
        repo.insert(demo_experiment())
            .expect("empty repository cannot conflict");
        repo
    }
}

/// The quantum drug-discovery demo campaign.
pub fn demo_experiment() -> Experiment {
    use super::types::{ExperimentDetails, Requirements, Researcher, SupportTier};

    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid demo date");
    Experiment {
        id: "qc-drug-discovery".into(),
        title: "Quantum Computing for Drug Discovery".into(),
        description: "Using quantum algorithms to accelerate drug discovery process".into(),
        category: "Quantum Computing".into(),
        access_price: 100.0,
        funding_goal: 50_000.0,
        funding_raised: 32_500.0,
        backers: 78,
        days_left: 15,
        contract_address: "0x1234567890abcdef".into(),
        tags: vec!["Quantum Computing".into(), "Drug Discovery".into(), "AI".into()],
        author: Some(Researcher {
            name: "Dr. Alice Johnson".into(),
            role: String::new(),
            institution: "Stanford University".into(),
        }),
        details: Some(ExperimentDetails {
            overview: "Novel quantum algorithms that simulate molecular interactions \
                       with unprecedented accuracy, accelerating the drug discovery pipeline."
                .into(),
            methodology: "Quantum circuit design for molecular simulation combined with \
                          classical-quantum hybrid optimization."
                .into(),
            impact: "10x faster drug discovery pipeline and more accurate molecular \
                     interaction predictions."
                .into(),
        }),
        requirements: Some(Requirements {
            computation: "Access to quantum computing resources".into(),
            data: "Molecular structure databases".into(),
            timeline: "12 months".into(),
        }),
        benefits: vec![
            "Early access to research findings".into(),
            "Rights to use data in derivative research".into(),
            "Acknowledgment in publications".into(),
        ],
        researchers: vec![
            Researcher {
                name: "Dr. Sarah Chen".into(),
                role: "Principal Investigator".into(),
                institution: "Quantum Research Institute".into(),
            },
            Researcher {
                name: "Dr. Michael Zhang".into(),
                role: "Senior Researcher".into(),
                institution: "Quantum Research Institute".into(),
            },
        ],
        updates: vec![
            Update {
                date: date(2023, 11, 15),
                title: "First milestone reached".into(),
                content: "First quantum algorithm for molecular docking implemented; \
                          initial results show a 10x speedup over classical methods."
                    .into(),
            },
            Update {
                date: date(2023, 10, 1),
                title: "Project launched".into(),
                content: "Thank you to all our early supporters!".into(),
            },
        ],
        data_files: vec![DataFile {
            name: "Initial Molecular Structures".into(),
            description: "3D models of target protein structures".into(),
            size: "1.2 GB".into(),
            date: date(2023, 10, 5),
            hash: "QmX7b5jxn6VdLnkt3yGBRBrMTmtbBSZYcGvpSTtqWm3wLf".into(),
        }],
        support_tiers: vec![
            SupportTier {
                amount: 100.0,
                title: "Early Supporter".into(),
                description: "Monthly research updates and acknowledgment in publications".into(),
                backers: 45,
            },
            SupportTier {
                amount: 500.0,
                title: "Research Contributor".into(),
                description: "All previous rewards plus early access to research data".into(),
                backers: 22,
            },
            SupportTier {
                amount: 2500.0,
                title: "Major Contributor".into(),
                description: "All previous rewards plus naming rights for a discovered molecule"
                    .into(),
                backers: 11,
            },
        ],
    }
}
