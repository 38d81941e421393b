//! Async HTTP client wrapping the Attune JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use attune_engine::{
  jobs::RetagBatchResult,
  segments::{SegmentSetupResult, SegmentSummary},
};
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the Attune API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// Async HTTP client for the Attune JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  // ── Segments ──────────────────────────────────────────────────────────────

  /// `POST /segments/setup`
  pub async fn create_prebuilt_segments(
    &self,
    tenant_id: &str,
  ) -> Result<SegmentSetupResult> {
    let resp = self
      .client
      .post(self.url("/segments/setup"))
      .json(&json!({ "tenant_id": tenant_id }))
      .send()
      .await
      .context("POST /segments/setup failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /segments/setup → {}", resp.status()));
    }
    resp.json().await.context("deserialising segment setup result")
  }

  /// `GET /segments?tenant_id=<t>`
  pub async fn list_segments(
    &self,
    tenant_id: &str,
  ) -> Result<Vec<SegmentSummary>> {
    let resp = self
      .client
      .get(self.url("/segments"))
      .query(&[("tenant_id", tenant_id)])
      .send()
      .await
      .context("GET /segments failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /segments → {}", resp.status()));
    }
    resp.json().await.context("deserialising segments")
  }

  // ── Maintenance jobs — one page per call ──────────────────────────────────

  /// `POST /admin/retag`
  pub async fn retag_page(
    &self,
    tenant_id: &str,
    cursor: Option<String>,
    batch_size: Option<usize>,
  ) -> Result<RetagBatchResult> {
    self
      .job_page("/admin/retag", &json!({
        "tenant_id": tenant_id,
        "cursor": cursor,
        "batch_size": batch_size,
      }))
      .await
  }

  /// `POST /admin/tag-enrolled`
  pub async fn tag_enrolled_page(
    &self,
    tenant_id: &str,
    cursor: Option<String>,
    batch_size: Option<usize>,
  ) -> Result<RetagBatchResult> {
    self
      .job_page("/admin/tag-enrolled", &json!({
        "tenant_id": tenant_id,
        "cursor": cursor,
        "batch_size": batch_size,
      }))
      .await
  }

  /// `POST /admin/tag-product-purchasers`
  pub async fn tag_product_purchasers_page(
    &self,
    tenant_id: &str,
    product_id: Uuid,
    cursor: Option<String>,
    batch_size: Option<usize>,
  ) -> Result<RetagBatchResult> {
    self
      .job_page("/admin/tag-product-purchasers", &json!({
        "tenant_id": tenant_id,
        "product_id": product_id,
        "cursor": cursor,
        "batch_size": batch_size,
      }))
      .await
  }

  async fn job_page(
    &self,
    path: &str,
    body: &serde_json::Value,
  ) -> Result<RetagBatchResult> {
    let resp = self
      .client
      .post(self.url(path))
      .json(body)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST {path} → {}", resp.status()));
    }
    resp.json().await.context("deserialising job page result")
  }
}
