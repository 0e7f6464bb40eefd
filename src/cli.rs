//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Contains the
//! execution logic for each subcommand: the API server, catalog browsing,
//! campaign import, updates, pledges, quotes, and data uploads.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use descidata::catalog::{self, funding, CampaignRepository};
use descidata::catalog::types::Update;
use descidata::client::CatalogClient;
use descidata::format_edu;

/// Run the catalog REST API server.
pub async fn run_serve(port: u16, seed: bool) -> Result<()> {
    let repo = if seed {
        info!("seeding catalog with the demo campaign");
        CampaignRepository::with_demo_data()
    } else {
        CampaignRepository::new()
    };
    descidata::api::run(port, repo).await
}

/// List all experiments with a one-line funding summary each.
pub async fn run_list(api_url: &str) -> Result<()> {
    let client = CatalogClient::new(api_url);
    let experiments = client.list_experiments().await?;
    if experiments.is_empty() {
        println!("No experiments in the catalog.");
        return Ok(());
    }
    for e in &experiments {
        let status = if funding::is_open(e) {
            format!("{} days left", e.days_left)
        } else {
            "closed".to_string()
        };
        println!(
            "{:<28} {:>4}% funded  {:>14} raised  {:>4} backers  {}",
            e.id,
            funding::progress(e),
            format_edu(e.funding_raised),
            e.backers,
            status
        );
    }
    Ok(())
}

/// Show one experiment in detail: funding sidebar, tiers, data files, updates.
pub async fn run_show(api_url: &str, id: &str) -> Result<()> {
    let client = CatalogClient::new(api_url);
    let e = client.get_experiment(id).await?;

    println!("{} [{}]", e.title, e.category);
    println!("{}", e.description);
    if let Some(author) = &e.author {
        println!("by {} ({})", author.name, author.institution);
    }
    println!();
    println!(
        "Funding: {} of {} ({}%), {} backers, {}",
        format_edu(e.funding_raised),
        format_edu(e.funding_goal),
        funding::progress(&e),
        e.backers,
        if funding::is_open(&e) {
            format!("{} days left", e.days_left)
        } else {
            "funding period ended".to_string()
        }
    );
    println!(
        "Access: {} per month · contract {}",
        format_edu(e.access_price),
        e.contract_address
    );

    if !e.support_tiers.is_empty() {
        println!("\nSupport tiers:");
        for tier in funding::sorted_tiers(&e) {
            println!(
                "  {:>12}  {:<24} {} backers",
                format_edu(tier.amount),
                tier.title,
                tier.backers
            );
        }
    }
    if !e.data_files.is_empty() {
        println!("\nData files:");
        for f in &e.data_files {
            println!("  {} ({}) hash {}", f.name, f.size, f.hash);
        }
    }
    if !e.updates.is_empty() {
        println!("\nUpdates:");
        for u in &e.updates {
            println!("  {} {}", u.date, u.title);
        }
    }
    Ok(())
}

/// Import a campaign TOML and create it on the remote catalog.
pub async fn run_create(api_url: &str, file: &Path) -> Result<()> {
    let input = catalog::parse_toml_file(file)?;
    let client = CatalogClient::new(api_url);
    let experiment = client.create_experiment(&input).await?;
    println!("Created experiment '{}'", experiment.id);
    Ok(())
}

/// Post a progress update.
pub async fn run_update(api_url: &str, id: &str, title: &str, content: &str) -> Result<()> {
    let client = CatalogClient::new(api_url);
    let update = Update {
        date: Utc::now().date_naive(),
        title: title.to_string(),
        content: content.to_string(),
    };
    client.post_update(id, &update).await?;
    println!("Update posted to '{}'", id);
    Ok(())
}

/// Record a pledge, optionally against a support tier.
pub async fn run_pledge(api_url: &str, id: &str, amount: f64, tier: Option<usize>) -> Result<()> {
    let client = CatalogClient::new(api_url);
    let experiment = client.record_pledge(id, amount, tier).await?;
    println!(
        "Pledged {} to '{}', now {}% funded",
        format_edu(amount),
        id,
        funding::progress(&experiment)
    );
    Ok(())
}

/// Price timed access.
pub async fn run_quote(api_url: &str, id: &str, months: u32) -> Result<()> {
    let client = CatalogClient::new(api_url);
    let quote = client.quote(id, months).await?;
    let price = quote["price"].as_f64().unwrap_or_default();
    println!(
        "{} month(s) of access to '{}': {}",
        months,
        id,
        format_edu(price)
    );
    Ok(())
}

/// Upload a data artifact; the server reports back the content hash.
pub async fn run_upload(
    api_url: &str,
    id: &str,
    file: &Path,
    description: Option<&str>,
) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("file path has no usable name: {}", file.display()))?;
    let client = CatalogClient::new(api_url);
    let stored = client.upload_data(id, name, bytes, description).await?;
    println!("Uploaded '{}' ({}) hash {}", stored.name, stored.size, stored.hash);
    Ok(())
}
