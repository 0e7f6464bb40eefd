//! Typed REST client for a remote descidata catalog.
//!
//! Wraps the `/experiments` resource boundary with one method per endpoint.
//! Non-2xx responses surface the response body text as the error message,
//! falling back to the status code when the body is empty.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::config::{ExperimentInput, ExperimentPatch};
use crate::catalog::funding::FundingSummary;
use crate::catalog::types::{DataFile, Experiment, Update};

pub struct CatalogClient {
    base_url: String,
    http: reqwest::Client,
}

/// Body for `POST /experiments/{id}/updates`.
#[derive(Serialize)]
struct UpdatePayload<'a> {
    date: chrono::NaiveDate,
    title: &'a str,
    content: &'a str,
}

/// Body for `POST /experiments/{id}/pledges`.
#[derive(Serialize)]
struct PledgePayload {
    amount: f64,
    tier_index: Option<usize>,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Self {
        CatalogClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .connect_timeout(std::time::Duration::from_secs(5))
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client construction cannot fail with static config"),
        }
    }

    /// GET /experiments
    pub async fn list_experiments(&self) -> Result<Vec<Experiment>> {
        self.read_json(self.http.get(self.url("/experiments"))).await
    }

    /// GET /experiments/{id}
    pub async fn get_experiment(&self, id: &str) -> Result<Experiment> {
        self.read_json(self.http.get(self.url(&format!("/experiments/{}", id))))
            .await
    }

    /// POST /experiments
    pub async fn create_experiment(&self, input: &ExperimentInput) -> Result<Experiment> {
        self.read_json(self.http.post(self.url("/experiments")).json(input))
            .await
    }

    /// PUT /experiments/{id}
    pub async fn update_experiment(&self, id: &str, patch: &ExperimentPatch) -> Result<Experiment> {
        self.read_json(
            self.http
                .put(self.url(&format!("/experiments/{}", id)))
                .json(patch),
        )
        .await
    }

    /// POST /experiments/{id}/updates
    pub async fn post_update(&self, id: &str, update: &Update) -> Result<Experiment> {
        let payload = UpdatePayload {
            date: update.date,
            title: &update.title,
            content: &update.content,
        };
        self.read_json(
            self.http
                .post(self.url(&format!("/experiments/{}/updates", id)))
                .json(&payload),
        )
        .await
    }

    /// POST /experiments/{id}/pledges
    pub async fn record_pledge(
        &self,
        id: &str,
        amount: f64,
        tier_index: Option<usize>,
    ) -> Result<Experiment> {
        self.read_json(
            self.http
                .post(self.url(&format!("/experiments/{}/pledges", id)))
                .json(&PledgePayload { amount, tier_index }),
        )
        .await
    }

    /// GET /experiments/{id}/funding
    pub async fn funding_summary(&self, id: &str) -> Result<FundingSummary> {
        self.read_json(self.http.get(self.url(&format!("/experiments/{}/funding", id))))
            .await
    }

    /// GET /experiments/{id}/quote?months=N
    pub async fn quote(&self, id: &str, months: u32) -> Result<serde_json::Value> {
        self.read_json(
            self.http
                .get(self.url(&format!("/experiments/{}/quote", id)))
                .query(&[("months", months)]),
        )
        .await
    }

    /// POST /experiments/{id}/data — multipart upload. The server hashes the
    /// bytes and returns the stored `DataFile` with its content hash.
    pub async fn upload_data(
        &self,
        id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        description: Option<&str>,
    ) -> Result<DataFile> {
        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string()),
        );
        if let Some(desc) = description {
            form = form.text("description", desc.to_string());
        }
        self.read_json(
            self.http
                .post(self.url(&format!("/experiments/{}/data", id)))
                .multipart(form),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request; deserialize 2xx bodies, surface non-2xx body text.
    async fn read_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.trim().is_empty() {
                anyhow::bail!("catalog request failed: {}", status);
            }
            anyhow::bail!("{}", body.trim());
        }
        Ok(response.json().await?)
    }
}
