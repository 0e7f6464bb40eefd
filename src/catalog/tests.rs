//! Unit tests for campaign input parsing, the repository, funding math,
//! and access pricing.

use super::*;
use crate::error::CatalogError;

fn sample_input() -> ExperimentInput {
    parse_toml(
        r#"
[experiment]
title = "Quantum Computing for Drug Discovery"
description = "Using quantum algorithms to accelerate drug discovery"
category = "Quantum Computing"
access_price = 100.0
funding_goal = 50000.0
duration_days = 15
contract_address = "0x1234567890abcdef"
tags = ["Quantum Computing", "Drug Discovery"]

[author]
name = "Dr. Alice Johnson"
institution = "Stanford University"

[[support_tiers]]
amount = 100.0
title = "Early Supporter"
description = "Monthly research updates"

[[support_tiers]]
amount = 500.0
title = "Research Contributor"
description = "Early access to research data"
"#,
    )
    .unwrap()
}

#[test]
fn parse_minimal_toml() {
    let input = parse_toml(
        r#"
[experiment]
title = "Test Campaign"
access_price = 10.0
funding_goal = 1000.0
"#,
    )
    .unwrap();
    assert_eq!(input.experiment.title, "Test Campaign");
    assert_eq!(input.experiment.duration_days, 30);
    assert!(input.support_tiers.is_empty());
    assert_eq!(input.resolved_id(), "test-campaign");
}

#[test]
fn parse_full_toml() {
    let input = sample_input();
    assert_eq!(input.experiment.category, "Quantum Computing");
    assert_eq!(input.support_tiers.len(), 2);
    assert_eq!(input.support_tiers[1].title, "Research Contributor");
    assert_eq!(input.author.as_ref().unwrap().name, "Dr. Alice Johnson");
    assert_eq!(input.resolved_id(), "quantum-computing-for-drug-discovery");
}

#[test]
fn validation_reports_every_violated_field() {
    let input = ExperimentInput {
        experiment: ExperimentMeta {
            id: None,
            title: "  ".into(),
            description: String::new(),
            category: String::new(),
            access_price: 0.0,
            funding_goal: -5.0,
            duration_days: 30,
            contract_address: String::new(),
            tags: vec![],
        },
        author: None,
        details: None,
        requirements: None,
        benefits: vec![],
        researchers: vec![],
        support_tiers: vec![],
    };
    let err = input.validate().unwrap_err();
    match err {
        CatalogError::Validation { fields } => {
            assert_eq!(fields, vec!["title", "funding_goal", "access_price"]);
        }
        other => panic!("expected Validation, got {:?}", other),
    }
}

#[test]
fn validation_flags_bad_tiers() {
    let mut input = sample_input();
    input.support_tiers[1].amount = 0.0;
    let err = input.validate().unwrap_err();
    assert_eq!(
        err,
        CatalogError::validation(["support_tiers[1]"]),
    );
}

#[test]
fn parse_toml_file_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("campaign.toml");
    std::fs::write(
        &path,
        r#"
[experiment]
title = "Soil Microbiome Survey"
access_price = 20.0
funding_goal = 5000.0
"#,
    )
    .unwrap();
    let input = parse_toml_file(&path).unwrap();
    assert_eq!(input.resolved_id(), "soil-microbiome-survey");
}

#[test]
fn parse_rejects_malformed_toml() {
    assert!(parse_toml("[experiment\ntitle = ").is_err());
}

#[test]
fn slugify_is_url_safe() {
    assert_eq!(slugify("Quantum Computing!"), "quantum-computing");
    assert_eq!(slugify("  CRISPR  &  Gene -- Editing  "), "crispr-gene-editing");
    assert_eq!(slugify("già-123"), "già-123");
}

// ── Repository ──────────────────────────────────────────────────

#[test]
fn create_get_and_list_preserve_insertion_order() {
    let mut repo = CampaignRepository::new();
    let mut first = sample_input();
    first.experiment.id = Some("first".into());
    let mut second = sample_input();
    second.experiment.id = Some("second".into());

    repo.create(first).unwrap();
    repo.create(second).unwrap();

    assert_eq!(repo.get("first").unwrap().id, "first");
    let ids: Vec<&str> = repo.list().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[test]
fn create_rejects_duplicate_id_with_conflict() {
    let mut repo = CampaignRepository::new();
    repo.create(sample_input()).unwrap();
    let err = repo.create(sample_input()).unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(id) if id == "quantum-computing-for-drug-discovery"));
}

#[test]
fn create_rejects_missing_funding_goal() {
    let mut input = sample_input();
    input.experiment.funding_goal = 0.0;
    let mut repo = CampaignRepository::new();
    let err = repo.create(input).unwrap_err();
    assert_eq!(err, CatalogError::validation(["funding_goal"]));
}

#[test]
fn get_unknown_id_is_not_found() {
    let repo = CampaignRepository::new();
    assert_eq!(
        repo.get("missing").unwrap_err(),
        CatalogError::NotFound("missing".into())
    );
}

#[test]
fn append_update_prepends_newest_first() {
    let mut repo = CampaignRepository::with_demo_data();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
    repo.append_update(
        "qc-drug-discovery",
        Update {
            date,
            title: "Second milestone".into(),
            content: String::new(),
        },
    )
    .unwrap();
    let experiment = repo.get("qc-drug-discovery").unwrap();
    assert_eq!(experiment.updates[0].title, "Second milestone");

    let err = repo
        .append_update(
            "missing",
            Update {
                date,
                title: "x".into(),
                content: String::new(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[test]
fn record_pledge_moves_funding_monotonically() {
    let mut repo = CampaignRepository::with_demo_data();
    let before = repo.get("qc-drug-discovery").unwrap().clone();

    repo.record_pledge("qc-drug-discovery", 500.0, Some(1)).unwrap();
    let after = repo.get("qc-drug-discovery").unwrap();

    assert_eq!(after.funding_raised, before.funding_raised + 500.0);
    assert_eq!(after.backers, before.backers + 1);
    assert_eq!(
        after.support_tiers[1].backers,
        before.support_tiers[1].backers + 1
    );
}

#[test]
fn tier_backer_counts_are_independent() {
    let mut repo = CampaignRepository::with_demo_data();
    let before = repo.get("qc-drug-discovery").unwrap().clone();

    // Pledge without a tier: no tier counter moves
    repo.record_pledge("qc-drug-discovery", 50.0, None).unwrap();
    let after = repo.get("qc-drug-discovery").unwrap();
    for (b, a) in before.support_tiers.iter().zip(&after.support_tiers) {
        assert_eq!(b.backers, a.backers);
    }

    // Pledge into tier 0: only tier 0 moves, campaign total moves separately
    let before = after.clone();
    repo.record_pledge("qc-drug-discovery", 100.0, Some(0)).unwrap();
    let after = repo.get("qc-drug-discovery").unwrap();
    assert_eq!(after.support_tiers[0].backers, before.support_tiers[0].backers + 1);
    assert_eq!(after.support_tiers[1].backers, before.support_tiers[1].backers);
    assert_eq!(after.support_tiers[2].backers, before.support_tiers[2].backers);
    assert_eq!(after.backers, before.backers + 1);
}

#[test]
fn record_pledge_rejects_bad_amounts_and_tiers() {
    let mut repo = CampaignRepository::with_demo_data();
    assert!(matches!(
        repo.record_pledge("qc-drug-discovery", 0.0, None).unwrap_err(),
        CatalogError::InvalidInput(_)
    ));
    assert!(matches!(
        repo.record_pledge("qc-drug-discovery", 100.0, Some(9)).unwrap_err(),
        CatalogError::InvalidInput(_)
    ));
}

#[test]
fn patch_rejects_blank_title() {
    let mut repo = CampaignRepository::with_demo_data();
    let patch = ExperimentPatch {
        title: Some("   ".into()),
        ..Default::default()
    };
    assert_eq!(
        repo.patch("qc-drug-discovery", patch).unwrap_err(),
        CatalogError::validation(["title"])
    );
}

// ── Funding Calculator ──────────────────────────────────────────

#[test]
fn progress_is_rounded_percent() {
    let mut e = repository::demo_experiment();
    e.funding_raised = 32_500.0;
    e.funding_goal = 50_000.0;
    assert_eq!(funding::progress(&e), 65);

    e.funding_raised = 333.0;
    e.funding_goal = 1000.0;
    assert_eq!(funding::progress(&e), 33);
}

#[test]
fn progress_exceeds_100_when_overfunded() {
    let mut e = repository::demo_experiment();
    e.funding_raised = 60_000.0;
    e.funding_goal = 50_000.0;
    assert_eq!(funding::progress(&e), 120);
    assert_eq!(funding::remaining(&e), 0.0);
}

#[test]
fn remaining_is_clamped_at_zero() {
    let mut e = repository::demo_experiment();
    e.funding_raised = 32_500.0;
    e.funding_goal = 50_000.0;
    assert_eq!(funding::remaining(&e), 17_500.0);
}

#[test]
fn is_open_tracks_days_left() {
    let mut e = repository::demo_experiment();
    e.days_left = 1;
    assert!(funding::is_open(&e));
    e.days_left = 0;
    assert!(!funding::is_open(&e));
    e.days_left = -3;
    assert!(!funding::is_open(&e));
}

#[test]
fn eligible_tiers_are_cumulative_down_the_ladder() {
    let e = repository::demo_experiment();
    let eligible = funding::eligible_tiers(&e, 500.0);
    let titles: Vec<&str> = eligible.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Early Supporter", "Research Contributor"]);

    assert_eq!(
        funding::tier_for_pledge(&e, 600.0).unwrap().title,
        "Research Contributor"
    );
    assert!(funding::tier_for_pledge(&e, 50.0).is_none());
}

#[test]
fn sorted_tiers_do_not_assume_input_order() {
    let mut e = repository::demo_experiment();
    e.support_tiers.reverse();
    let sorted = funding::sorted_tiers(&e);
    let amounts: Vec<f64> = sorted.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![100.0, 500.0, 2500.0]);
}

// ── Pricing ─────────────────────────────────────────────────────

#[test]
fn linear_pricing_is_base_times_months() {
    let e = repository::demo_experiment();
    assert_eq!(pricing::price(&e, 3).unwrap(), 300.0);
    assert_eq!(pricing::price(&e, 1).unwrap(), 100.0);
}

#[test]
fn zero_months_is_invalid_input() {
    let e = repository::demo_experiment();
    assert!(matches!(
        pricing::price(&e, 0).unwrap_err(),
        CatalogError::InvalidInput(_)
    ));
}

#[test]
fn tier_selection_does_not_change_the_linear_price() {
    let e = repository::demo_experiment();
    let tier = &e.support_tiers[2];
    let with_tier = LinearPricing.quote(e.access_price, 2, Some(tier)).unwrap();
    let without = LinearPricing.quote(e.access_price, 2, None).unwrap();
    assert_eq!(with_tier, without);
}

#[test]
fn pricing_policy_is_swappable() {
    /// Flat 20% discount for any tier holder; exercises the strategy seam.
    struct TierDiscount;
    impl PricingPolicy for TierDiscount {
        fn quote(
            &self,
            base: f64,
            months: u32,
            tier: Option<&SupportTier>,
        ) -> Result<f64, CatalogError> {
            let linear = LinearPricing.quote(base, months, tier)?;
            Ok(if tier.is_some() { linear * 0.8 } else { linear })
        }
    }

    let e = repository::demo_experiment();
    let tier = &e.support_tiers[0];
    assert_eq!(TierDiscount.quote(e.access_price, 5, Some(tier)).unwrap(), 400.0);
    assert_eq!(TierDiscount.quote(e.access_price, 5, None).unwrap(), 500.0);
}
