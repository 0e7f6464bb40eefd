//! Access pricing: a swappable strategy over (base price, duration, tier).
//!
//! The workflow only ever talks to `dyn PricingPolicy`, so a deployment can
//! swap tier-aware pricing in without touching the state machine. Tier
//! selection is advisory metadata for benefit entitlement — the default
//! policy never uses it as a multiplier.

use super::types::{Experiment, SupportTier};
use crate::error::CatalogError;

/// Pricing strategy boundary. Output must be a non-negative EDU amount.
pub trait PricingPolicy: Send + Sync {
    fn quote(
        &self,
        base_price: f64,
        duration_months: u32,
        tier: Option<&SupportTier>,
    ) -> Result<f64, CatalogError>;
}

/// Default policy: `base_price * duration_months`, no discount, tier ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearPricing;

impl PricingPolicy for LinearPricing {
    fn quote(
        &self,
        base_price: f64,
        duration_months: u32,
        _tier: Option<&SupportTier>,
    ) -> Result<f64, CatalogError> {
        if duration_months == 0 {
            return Err(CatalogError::InvalidInput(
                "duration must be at least one month".into(),
            ));
        }
        Ok(base_price * duration_months as f64)
    }
}

/// Price timed access to an experiment under the default linear policy.
pub fn price(experiment: &Experiment, duration_months: u32) -> Result<f64, CatalogError> {
    LinearPricing.quote(experiment.access_price, duration_months, None)
}
