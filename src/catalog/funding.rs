//! Pure funding math over an experiment's state.
//!
//! Progress is deliberately NOT clamped at 100: an overfunded campaign
//! reports >100%, which distinguishes "met the goal" from "exactly funded".

use super::types::{Experiment, SupportTier};

/// Funding progress as a rounded integer percent of the goal.
pub fn progress(experiment: &Experiment) -> i64 {
    (experiment.funding_raised / experiment.funding_goal * 100.0).round() as i64
}

/// EDU still needed to reach the goal; zero once met or overfunded.
pub fn remaining(experiment: &Experiment) -> f64 {
    (experiment.funding_goal - experiment.funding_raised).max(0.0)
}

/// Whether the funding window is still open.
pub fn is_open(experiment: &Experiment) -> bool {
    experiment.days_left > 0
}

/// Tiers in ascending amount order, the display order of the ladder.
/// Sorts defensively — ascending input order is convention, not enforced.
pub fn sorted_tiers(experiment: &Experiment) -> Vec<&SupportTier> {
    let mut tiers: Vec<&SupportTier> = experiment.support_tiers.iter().collect();
    tiers.sort_by(|a, b| a.amount.total_cmp(&b.amount));
    tiers
}

/// Every tier a pledge of `amount` is entitled to: the matched tier and all
/// below it. Benefits are cumulative down the ladder.
pub fn eligible_tiers(experiment: &Experiment, amount: f64) -> Vec<&SupportTier> {
    sorted_tiers(experiment)
        .into_iter()
        .filter(|t| t.amount <= amount)
        .collect()
}

/// The highest tier whose threshold a pledge of `amount` meets, if any.
pub fn tier_for_pledge(experiment: &Experiment, amount: f64) -> Option<&SupportTier> {
    eligible_tiers(experiment, amount).pop()
}

/// Funding sidebar payload: everything the detail page needs in one read.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FundingSummary {
    pub percent_funded: i64,
    pub raised: f64,
    pub goal: f64,
    pub remaining: f64,
    pub backers: u64,
    pub days_left: i64,
    pub open: bool,
}

pub fn summary(experiment: &Experiment) -> FundingSummary {
    FundingSummary {
        percent_funded: progress(experiment),
        raised: experiment.funding_raised,
        goal: experiment.funding_goal,
        remaining: remaining(experiment),
        backers: experiment.backers,
        days_left: experiment.days_left,
        open: is_open(experiment),
    }
}
