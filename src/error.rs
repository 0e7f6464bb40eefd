//! Error taxonomy for the catalog core.
//!
//! Repository and pricing errors (`Validation`, `NotFound`, `Conflict`,
//! `InvalidInput`) are local and recoverable: callers get them unchanged,
//! never a silent default. Workflow errors (`WalletRejected`,
//! `AlreadyPending`, `SettlementFailed`) leave the purchase state machine
//! in a recoverable state and are surfaced as retryable conditions.

/// All failure modes the catalog core can report.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    /// Input shape rejected at the repository or pricing boundary.
    /// `fields` names every violated field, not just the first.
    #[error("validation failed: {}", fields.join(", "))]
    Validation { fields: Vec<String> },

    /// Unknown experiment id.
    #[error("experiment '{0}' not found")]
    NotFound(String),

    /// Duplicate experiment id on create.
    #[error("experiment '{0}' already exists")]
    Conflict(String),

    /// Locally detectable bad argument (non-positive duration, bad tier index).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The user or wallet declined the connection request.
    #[error("wallet connection rejected: {0}")]
    WalletRejected(String),

    /// A purchase for this (wallet, experiment) pair is already in flight.
    #[error("purchase already pending for wallet {wallet} on experiment '{experiment_id}'")]
    AlreadyPending {
        wallet: String,
        experiment_id: String,
    },

    /// External settlement reported failure for a submitted grant.
    #[error("settlement failed: {0}")]
    SettlementFailed(String),
}

impl CatalogError {
    /// Validation error over a list of violated field names.
    pub fn validation<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        CatalogError::Validation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the caller can retry the failed operation as-is or after a
    /// user-visible prompt (wallet/settlement/duplicate conditions).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::WalletRejected(_)
                | CatalogError::AlreadyPending { .. }
                | CatalogError::SettlementFailed(_)
        )
    }
}
