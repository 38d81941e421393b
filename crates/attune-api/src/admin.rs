//! Handlers for `/admin/*` maintenance endpoints.
//!
//! Each batch endpoint processes exactly one page per request and returns
//! the resumption cursor; the operator tool loops until `done`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/admin/retag` | Re-derive tags for one page of contacts |
//! | `POST` | `/admin/tag-enrolled` | One page of the enrollment log |
//! | `POST` | `/admin/tag-product-purchasers` | One page of a product's sales |
//! | `POST` | `/admin/tag-contact-enrollments` | Single-contact drift fix |

use std::sync::Arc;

use attune_core::store::AudienceStore;
use attune_engine::{
  jobs::{self, RetagBatchResult},
  sync::SoftSyncResult,
};
use axum::{Json, extract::State};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct RetagBody {
  pub tenant_id:  String,
  pub cursor:     Option<String>,
  pub batch_size: Option<usize>,
}

/// `POST /admin/retag`
pub async fn retag<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<RetagBody>,
) -> Result<Json<RetagBatchResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result = jobs::retag_all_contacts(
    store.as_ref(),
    &body.tenant_id,
    body.cursor,
    body.batch_size,
  )
  .await?;
  Ok(Json(result))
}

/// `POST /admin/tag-enrolled`
pub async fn tag_enrolled<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<RetagBody>,
) -> Result<Json<RetagBatchResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result = jobs::tag_enrolled_users_with_course_tags(
    store.as_ref(),
    &body.tenant_id,
    body.cursor,
    body.batch_size,
  )
  .await?;
  Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ProductPurchasersBody {
  pub tenant_id:  String,
  pub product_id: Uuid,
  pub cursor:     Option<String>,
  pub batch_size: Option<usize>,
}

/// `POST /admin/tag-product-purchasers`
pub async fn tag_product_purchasers<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<ProductPurchasersBody>,
) -> Result<Json<RetagBatchResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result = jobs::tag_product_purchasers(
    store.as_ref(),
    &body.tenant_id,
    body.product_id,
    body.cursor,
    body.batch_size,
  )
  .await?;
  Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ContactEnrollmentsBody {
  pub tenant_id: String,
  pub email:     String,
}

/// `POST /admin/tag-contact-enrollments`
pub async fn tag_contact_enrollments<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<ContactEnrollmentsBody>,
) -> Result<Json<SoftSyncResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result = jobs::tag_contact_with_enrollments(
    store.as_ref(),
    &body.tenant_id,
    &body.email,
  )
  .await?;
  Ok(Json(result))
}
