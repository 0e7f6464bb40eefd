//! # Purchase — Wallet-Gated Access-Purchase Workflow
//!
//! A cooperative state machine that gates the paid "buy access" action
//! behind wallet-connection state and produces an [`AccessGrant`] for the
//! external settlement layer. It never blocks a thread: it suspends at two
//! await points (wallet connection, settlement submission) and is otherwise
//! advanced by explicit calls.
//!
//! ```text
//! Disconnected ──request_purchase()──> Connecting ──wallet ok──> Connected
//!      ^                                   │ rejected                │
//!      └───────────────────────────────────┘          request/auto   ▼
//!                     Connected <──cancel()────────────────────  ModalOpen
//!                         ^                                         │ confirm()
//!                         └────────────cancel()──── Submitting <────┘
//!                                                      │ settlement
//!                                                      ▼
//!                                            {Confirmed, Failed} ──retry──> ModalOpen
//! ```
//!
//! At most one grant may be in flight per (wallet, experiment) pair; a
//! duplicate `confirm()` fails with `AlreadyPending` and leaves exactly one
//! `Pending` grant.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::pricing::PricingPolicy;
use crate::catalog::types::{Experiment, SupportTier};
use crate::error::CatalogError;
use crate::events::{Event, EventBus};

// ── External Collaborator Seams ─────────────────────────────────

/// Wallet connection provider. `connect` suspends until the wallet resolves
/// and yields the connected wallet address, or `WalletRejected`.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_connected(&self) -> bool;
    async fn connect(&self) -> Result<String, CatalogError>;
}

/// Settlement boundary: submit a pending grant, await the on-chain outcome.
/// The wire format of that call is not this core's business.
#[async_trait::async_trait]
pub trait SettlementClient: Send + Sync {
    async fn submit(&self, grant: &AccessGrant) -> SettlementOutcome;
}

/// Outcome signalled by the external settlement layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    Confirmed,
    Failed { reason: String },
}

// ── Grants ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Pending,
    Confirmed,
    Failed,
}

/// The record produced when a user purchases timed access to a campaign's
/// gated content. References the experiment by id; owned by the caller —
/// the settlement layer decides persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub id: uuid::Uuid,
    pub experiment_id: String,
    pub wallet: String,
    pub duration_months: u32,
    /// Title of the advisory tier selection, if any.
    pub tier: Option<String>,
    /// Computed price in EDU.
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub status: GrantStatus,
}

// ── In-Flight Guard ─────────────────────────────────────────────

/// Tracks (wallet, experiment) pairs with a grant in flight, shared across
/// every workflow instance in the process. A second claim for a held pair
/// fails `AlreadyPending` instead of minting a duplicate grant.
#[derive(Debug, Default)]
pub struct ActiveGrants {
    held: Mutex<HashSet<(String, String)>>,
}

impl ActiveGrants {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn claim(&self, wallet: &str, experiment_id: &str) -> Result<(), CatalogError> {
        let mut held = self.lock();
        let key = (wallet.to_string(), experiment_id.to_string());
        if !held.insert(key) {
            return Err(CatalogError::AlreadyPending {
                wallet: wallet.to_string(),
                experiment_id: experiment_id.to_string(),
            });
        }
        Ok(())
    }

    fn release(&self, wallet: &str, experiment_id: &str) {
        self.lock()
            .remove(&(wallet.to_string(), experiment_id.to_string()));
    }

    pub fn is_held(&self, wallet: &str, experiment_id: &str) -> bool {
        self.lock()
            .contains(&(wallet.to_string(), experiment_id.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<(String, String)>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── State Machine ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseState {
    Disconnected,
    Connecting,
    Connected,
    ModalOpen,
    Submitting,
    Confirmed,
    Failed,
}

/// One user's purchase session for one experiment.
///
/// Holds a snapshot of the experiment's pricing surface (base price, tier
/// ladder) taken at construction; repository mutations during the session
/// do not reprice an open modal.
pub struct PurchaseWorkflow {
    experiment_id: String,
    base_price: f64,
    tiers: Vec<SupportTier>,
    wallet: Arc<dyn WalletProvider>,
    pricing: Arc<dyn PricingPolicy>,
    active: Arc<ActiveGrants>,
    events: Option<Arc<EventBus>>,
    state: PurchaseState,
    wallet_address: Option<String>,
    grant: Option<AccessGrant>,
}

impl PurchaseWorkflow {
    pub fn new(
        experiment: &Experiment,
        wallet: Arc<dyn WalletProvider>,
        pricing: Arc<dyn PricingPolicy>,
        active: Arc<ActiveGrants>,
    ) -> Self {
        let state = if wallet.is_connected() {
            PurchaseState::Connected
        } else {
            PurchaseState::Disconnected
        };
        // Ladder snapshot in ascending amount order; tier selection below
        // indexes into this.
        let mut tiers = experiment.support_tiers.clone();
        tiers.sort_by(|a, b| a.amount.total_cmp(&b.amount));
        PurchaseWorkflow {
            experiment_id: experiment.id.clone(),
            base_price: experiment.access_price,
            tiers,
            wallet,
            pricing,
            active,
            events: None,
            state,
            wallet_address: None,
            grant: None,
        }
    }

    /// Attach an event bus; grant lifecycle events fan out through it.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> PurchaseState {
        self.state
    }

    /// The grant for the current attempt, if one has been emitted.
    pub fn grant(&self) -> Option<&AccessGrant> {
        self.grant.as_ref()
    }

    pub fn wallet_address(&self) -> Option<&str> {
        self.wallet_address.as_deref()
    }

    /// User pressed "Support This Research". Connects the wallet first if
    /// needed (the suspension point), then opens the purchase modal.
    ///
    /// On wallet rejection the workflow stays `Disconnected` and the
    /// `WalletRejected` condition is surfaced; the user may simply retry.
    pub async fn request_purchase(&mut self) -> Result<PurchaseState, CatalogError> {
        match self.state {
            PurchaseState::Disconnected => {
                self.state = PurchaseState::Connecting;
                match self.wallet.connect().await {
                    Ok(address) => {
                        info!(experiment = %self.experiment_id, wallet = %address, "wallet connected");
                        self.wallet_address = Some(address);
                        self.state = PurchaseState::ModalOpen;
                        Ok(self.state)
                    }
                    Err(err) => {
                        warn!(experiment = %self.experiment_id, error = %err, "wallet connection rejected");
                        self.state = PurchaseState::Disconnected;
                        Err(err)
                    }
                }
            }
            PurchaseState::Connected | PurchaseState::Confirmed | PurchaseState::Failed => {
                // Already connected (terminal states reopen as a retry).
                self.grant = None;
                if self.wallet_address.is_none() {
                    // Session constructed with a pre-connected wallet.
                    self.wallet_address = Some(self.wallet.connect().await?);
                }
                self.state = PurchaseState::ModalOpen;
                Ok(self.state)
            }
            PurchaseState::ModalOpen => Ok(self.state),
            PurchaseState::Connecting => Err(CatalogError::InvalidInput(
                "wallet connection already in progress".into(),
            )),
            PurchaseState::Submitting => Err(CatalogError::AlreadyPending {
                wallet: self.wallet_address.clone().unwrap_or_default(),
                experiment_id: self.experiment_id.clone(),
            }),
        }
    }

    /// User confirmed the purchase in the modal: compute the price, claim
    /// the in-flight slot, emit a `Pending` grant, move to `Submitting`.
    ///
    /// On pricing failure the modal stays open and the error is surfaced.
    /// `tier_index` indexes the ascending ladder and is advisory only.
    pub fn confirm(
        &mut self,
        duration_months: u32,
        tier_index: Option<usize>,
    ) -> Result<AccessGrant, CatalogError> {
        match self.state {
            PurchaseState::ModalOpen => {}
            PurchaseState::Submitting => {
                return Err(CatalogError::AlreadyPending {
                    wallet: self.wallet_address.clone().unwrap_or_default(),
                    experiment_id: self.experiment_id.clone(),
                })
            }
            other => {
                return Err(CatalogError::InvalidInput(format!(
                    "confirm is only valid with the purchase modal open (state: {:?})",
                    other
                )))
            }
        }

        let tier = match tier_index {
            Some(i) => Some(self.tiers.get(i).ok_or_else(|| {
                CatalogError::InvalidInput(format!("no support tier at index {}", i))
            })?),
            None => None,
        };
        let price = self.pricing.quote(self.base_price, duration_months, tier)?;

        let wallet = self
            .wallet_address
            .clone()
            .ok_or_else(|| CatalogError::InvalidInput("no connected wallet address".into()))?;
        self.active.claim(&wallet, &self.experiment_id)?;

        let grant = AccessGrant {
            id: uuid::Uuid::new_v4(),
            experiment_id: self.experiment_id.clone(),
            wallet,
            duration_months,
            tier: tier.map(|t| t.title.clone()),
            price,
            created_at: Utc::now(),
            status: GrantStatus::Pending,
        };
        info!(
            experiment = %self.experiment_id,
            grant = %grant.id,
            price,
            months = duration_months,
            "access grant submitted"
        );
        if let Some(bus) = &self.events {
            bus.emit(Event::GrantSubmitted {
                experiment_id: grant.experiment_id.clone(),
                wallet: grant.wallet.clone(),
                price: grant.price,
            });
        }
        self.state = PurchaseState::Submitting;
        self.grant = Some(grant.clone());
        Ok(grant)
    }

    /// Submit the pending grant to the settlement layer and apply its
    /// outcome. This is the second suspension point.
    pub async fn settle(
        &mut self,
        settlement: &dyn SettlementClient,
    ) -> Result<AccessGrant, CatalogError> {
        let grant = match (&self.state, &self.grant) {
            (PurchaseState::Submitting, Some(grant)) => grant.clone(),
            _ => {
                return Err(CatalogError::InvalidInput(
                    "no grant is awaiting settlement".into(),
                ))
            }
        };
        let outcome = settlement.submit(&grant).await;
        self.resolve_settlement(outcome)
    }

    /// Apply an externally signalled settlement outcome to the pending
    /// grant. `Confirmed` and `Failed` are terminal; `retry()` or another
    /// `request_purchase()` reopens the modal.
    pub fn resolve_settlement(
        &mut self,
        outcome: SettlementOutcome,
    ) -> Result<AccessGrant, CatalogError> {
        if self.state != PurchaseState::Submitting {
            return Err(CatalogError::InvalidInput(
                "no grant is awaiting settlement".into(),
            ));
        }
        let grant = self
            .grant
            .as_mut()
            .expect("submitting state always carries a grant");
        self.active.release(&grant.wallet, &grant.experiment_id);
        match outcome {
            SettlementOutcome::Confirmed => {
                grant.status = GrantStatus::Confirmed;
                self.state = PurchaseState::Confirmed;
                info!(grant = %grant.id, "settlement confirmed");
                if let Some(bus) = &self.events {
                    bus.emit(Event::GrantConfirmed {
                        experiment_id: grant.experiment_id.clone(),
                        wallet: grant.wallet.clone(),
                    });
                }
                Ok(grant.clone())
            }
            SettlementOutcome::Failed { reason } => {
                grant.status = GrantStatus::Failed;
                self.state = PurchaseState::Failed;
                warn!(grant = %grant.id, reason = %reason, "settlement failed");
                if let Some(bus) = &self.events {
                    bus.emit(Event::GrantFailed {
                        experiment_id: grant.experiment_id.clone(),
                        wallet: grant.wallet.clone(),
                        reason: reason.clone(),
                    });
                }
                Err(CatalogError::SettlementFailed(reason))
            }
        }
    }

    /// Close the modal or abandon an unacknowledged submission, discarding
    /// any pending grant. From `Connecting` (the connect future having been
    /// dropped) the workflow returns to `Disconnected`; otherwise to
    /// `Connected`.
    pub fn cancel(&mut self) -> Result<PurchaseState, CatalogError> {
        match self.state {
            PurchaseState::Connecting => {
                self.state = PurchaseState::Disconnected;
                self.wallet_address = None;
                Ok(self.state)
            }
            PurchaseState::ModalOpen => {
                self.state = PurchaseState::Connected;
                Ok(self.state)
            }
            PurchaseState::Submitting => {
                if let Some(grant) = self.grant.take() {
                    self.active.release(&grant.wallet, &grant.experiment_id);
                    info!(grant = %grant.id, "pending grant discarded");
                }
                self.state = PurchaseState::Connected;
                Ok(self.state)
            }
            other => Err(CatalogError::InvalidInput(format!(
                "nothing to cancel (state: {:?})",
                other
            ))),
        }
    }

    /// Reopen the modal after a terminal outcome.
    pub fn retry(&mut self) -> Result<PurchaseState, CatalogError> {
        match self.state {
            PurchaseState::Confirmed | PurchaseState::Failed => {
                self.grant = None;
                self.state = PurchaseState::ModalOpen;
                Ok(self.state)
            }
            other => Err(CatalogError::InvalidInput(format!(
                "retry is only valid after settlement (state: {:?})",
                other
            ))),
        }
    }
}
