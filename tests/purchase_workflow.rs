//! # Purchase Workflow Integration Tests
//!
//! Exercises the wallet-gated purchase state machine end to end with
//! configurable test doubles for the two external collaborators: a wallet
//! provider that can accept or reject connection requests, and a settlement
//! client that can confirm or fail submitted grants.
//!
//! ## Testing strategy
//!
//! The doubles are plain structs with interior mutability so a test can
//! flip wallet behavior mid-scenario (reject once, then accept). Tests are
//! grouped by scenario: connection gating, confirmation and duplicate
//! protection, settlement outcomes and retry, and cancellation paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use descidata::catalog::pricing::LinearPricing;
use descidata::catalog::repository::demo_experiment;
use descidata::error::CatalogError;
use descidata::purchase::{
    AccessGrant, ActiveGrants, GrantStatus, PurchaseState, PurchaseWorkflow, SettlementClient,
    SettlementOutcome, WalletProvider,
};

/// Wallet double: connection state plus a switchable rejection mode.
struct MockWallet {
    connected: AtomicBool,
    reject_next: AtomicBool,
    connect_calls: AtomicUsize,
}

impl MockWallet {
    fn disconnected() -> Arc<Self> {
        Arc::new(MockWallet {
            connected: AtomicBool::new(false),
            reject_next: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
        })
    }

    fn connected() -> Arc<Self> {
        let wallet = Self::disconnected();
        wallet.connected.store(true, Ordering::SeqCst);
        wallet
    }

    fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl WalletProvider for MockWallet {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn connect(&self) -> Result<String, CatalogError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(CatalogError::WalletRejected(
                "user closed the wallet popup".into(),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok("0xabcdef0123456789".into())
    }
}

/// Settlement double: scripted outcome.
struct MockSettlement {
    confirm: bool,
    submissions: AtomicUsize,
}

impl MockSettlement {
    fn confirming() -> Self {
        MockSettlement {
            confirm: true,
            submissions: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        MockSettlement {
            confirm: false,
            submissions: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl SettlementClient for MockSettlement {
    async fn submit(&self, _grant: &AccessGrant) -> SettlementOutcome {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if self.confirm {
            SettlementOutcome::Confirmed
        } else {
            SettlementOutcome::Failed {
                reason: "on-chain transaction reverted".into(),
            }
        }
    }
}

fn workflow_with(wallet: Arc<MockWallet>, active: Arc<ActiveGrants>) -> PurchaseWorkflow {
    PurchaseWorkflow::new(
        &demo_experiment(),
        wallet,
        Arc::new(LinearPricing),
        active,
    )
}

// ── Connection gating ───────────────────────────────────────────

#[tokio::test]
async fn disconnected_wallet_is_connected_before_the_modal_opens() {
    let wallet = MockWallet::disconnected();
    let mut wf = workflow_with(wallet.clone(), ActiveGrants::new());
    assert_eq!(wf.state(), PurchaseState::Disconnected);

    let state = wf.request_purchase().await.unwrap();
    assert_eq!(state, PurchaseState::ModalOpen);
    assert_eq!(wf.wallet_address(), Some("0xabcdef0123456789"));
    assert_eq!(wallet.connect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wallet_rejection_stays_disconnected_and_is_retryable() {
    let wallet = MockWallet::disconnected();
    wallet.reject_next();
    let mut wf = workflow_with(wallet.clone(), ActiveGrants::new());

    let err = wf.request_purchase().await.unwrap_err();
    assert!(matches!(err, CatalogError::WalletRejected(_)));
    assert!(err.is_retryable());
    assert_eq!(wf.state(), PurchaseState::Disconnected);

    // The user tries again and the wallet accepts this time
    let state = wf.request_purchase().await.unwrap();
    assert_eq!(state, PurchaseState::ModalOpen);
}

#[tokio::test]
async fn already_connected_wallet_goes_straight_to_the_modal() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    assert_eq!(wf.state(), PurchaseState::Connected);
    let state = wf.request_purchase().await.unwrap();
    assert_eq!(state, PurchaseState::ModalOpen);
}

// ── Confirmation and duplicate protection ───────────────────────

#[tokio::test]
async fn confirm_emits_a_pending_grant_and_submits() {
    let mut wf = workflow_with(MockWallet::disconnected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();

    let grant = wf.confirm(3, Some(1)).unwrap();
    assert_eq!(wf.state(), PurchaseState::Submitting);
    assert_eq!(grant.status, GrantStatus::Pending);
    assert_eq!(grant.price, 300.0);
    assert_eq!(grant.tier.as_deref(), Some("Research Contributor"));
    assert_eq!(grant.experiment_id, "qc-drug-discovery");
}

#[tokio::test]
async fn zero_duration_keeps_the_modal_open() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();

    let err = wf.confirm(0, None).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));
    assert_eq!(wf.state(), PurchaseState::ModalOpen);
    assert!(wf.grant().is_none());

    // The modal is still usable with a fixed duration
    assert!(wf.confirm(1, None).is_ok());
}

#[tokio::test]
async fn double_confirm_fails_already_pending_with_one_grant() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();
    let first = wf.confirm(2, None).unwrap();

    let err = wf.confirm(2, None).unwrap_err();
    assert!(matches!(err, CatalogError::AlreadyPending { .. }));

    // Exactly one grant exists and it is still Pending
    let pending = wf.grant().unwrap();
    assert_eq!(pending.id, first.id);
    assert_eq!(pending.status, GrantStatus::Pending);
    assert_eq!(wf.state(), PurchaseState::Submitting);
}

#[tokio::test]
async fn concurrent_session_for_same_wallet_and_experiment_is_rejected() {
    let active = ActiveGrants::new();
    let wallet = MockWallet::connected();

    let mut first = workflow_with(wallet.clone(), active.clone());
    first.request_purchase().await.unwrap();
    first.confirm(1, None).unwrap();

    let mut second = workflow_with(wallet, active.clone());
    second.request_purchase().await.unwrap();
    let err = second.confirm(1, None).unwrap_err();
    assert!(matches!(err, CatalogError::AlreadyPending { .. }));
    assert!(second.grant().is_none());

    // Settling the first releases the pair for the second
    first.resolve_settlement(SettlementOutcome::Confirmed).unwrap();
    assert!(second.confirm(1, None).is_ok());
}

// ── Settlement outcomes ─────────────────────────────────────────

#[tokio::test]
async fn settlement_confirmation_is_terminal() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();
    wf.confirm(6, None).unwrap();

    let settlement = MockSettlement::confirming();
    let grant = wf.settle(&settlement).await.unwrap();
    assert_eq!(grant.status, GrantStatus::Confirmed);
    assert_eq!(grant.price, 600.0);
    assert_eq!(wf.state(), PurchaseState::Confirmed);
    assert_eq!(settlement.submissions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn settlement_failure_supports_retry_through_the_modal() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();
    wf.confirm(1, None).unwrap();

    let err = wf.settle(&MockSettlement::failing()).await.unwrap_err();
    assert!(matches!(err, CatalogError::SettlementFailed(_)));
    assert_eq!(wf.state(), PurchaseState::Failed);
    assert_eq!(wf.grant().unwrap().status, GrantStatus::Failed);

    // Retry reopens the modal with the failed grant discarded
    assert_eq!(wf.retry().unwrap(), PurchaseState::ModalOpen);
    assert!(wf.grant().is_none());

    let retried = wf.confirm(1, None).unwrap();
    let confirmed = wf.resolve_settlement(SettlementOutcome::Confirmed).unwrap();
    assert_eq!(confirmed.status, GrantStatus::Confirmed);
    assert_eq!(confirmed.id, retried.id);
}

#[tokio::test]
async fn settlement_signal_without_a_pending_grant_is_invalid() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    let err = wf.resolve_settlement(SettlementOutcome::Confirmed).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput(_)));
}

// ── Cancellation ────────────────────────────────────────────────

#[tokio::test]
async fn cancel_from_modal_returns_to_connected() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();
    assert_eq!(wf.cancel().unwrap(), PurchaseState::Connected);
    assert!(wf.grant().is_none());
}

#[tokio::test]
async fn cancel_during_submission_discards_the_grant_and_frees_the_pair() {
    let active = ActiveGrants::new();
    let mut wf = workflow_with(MockWallet::connected(), active.clone());
    wf.request_purchase().await.unwrap();
    let grant = wf.confirm(1, None).unwrap();
    assert!(active.is_held(&grant.wallet, &grant.experiment_id));

    assert_eq!(wf.cancel().unwrap(), PurchaseState::Connected);
    assert!(wf.grant().is_none());
    assert!(!active.is_held(&grant.wallet, &grant.experiment_id));

    // No orphaned modal: a fresh request is needed before confirming again
    assert!(matches!(
        wf.confirm(1, None).unwrap_err(),
        CatalogError::InvalidInput(_)
    ));
}

#[tokio::test]
async fn reopening_after_confirmation_starts_a_clean_attempt() {
    let mut wf = workflow_with(MockWallet::connected(), ActiveGrants::new());
    wf.request_purchase().await.unwrap();
    wf.confirm(1, None).unwrap();
    wf.resolve_settlement(SettlementOutcome::Confirmed).unwrap();
    assert_eq!(wf.state(), PurchaseState::Confirmed);

    // Terminal state reopens through request_purchase as the retry path
    let state = wf.request_purchase().await.unwrap();
    assert_eq!(state, PurchaseState::ModalOpen);
    assert!(wf.grant().is_none());
}
