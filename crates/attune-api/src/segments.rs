//! Handlers for `/segments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/segments?tenant_id=<t>` | Every tag as a segment summary |
//! | `POST` | `/segments/setup` | Idempotent prebuilt-segment creation |
//! | `POST` | `/segments/contacts` | Audience query (all/any + exclusions) |

use std::sync::Arc;

use attune_core::store::AudienceStore;
use attune_engine::segments::{
  self, SegmentContact, SegmentMatchMode, SegmentSetupResult, SegmentSummary,
};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub tenant_id: String,
}

/// `GET /segments?tenant_id=<t>`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SegmentSummary>>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let summaries =
    segments::get_segments_by_tag(store.as_ref(), &params.tenant_id).await?;
  Ok(Json(summaries))
}

#[derive(Debug, Deserialize)]
pub struct SetupBody {
  pub tenant_id: String,
}

/// `POST /segments/setup`
pub async fn setup<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<SetupBody>,
) -> Result<Json<SegmentSetupResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result =
    segments::create_prebuilt_segments(store.as_ref(), &body.tenant_id)
      .await?;
  Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ContactsBody {
  pub tenant_id:       String,
  #[serde(default)]
  pub tag_ids:         Vec<Uuid>,
  #[serde(default)]
  pub mode:            SegmentMatchMode,
  #[serde(default)]
  pub exclude_tag_ids: Vec<Uuid>,
  pub limit:           Option<usize>,
}

/// `POST /segments/contacts`
pub async fn contacts<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<ContactsBody>,
) -> Result<Json<Vec<SegmentContact>>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result = segments::get_contacts_by_tags(
    store.as_ref(),
    &body.tenant_id,
    &body.tag_ids,
    body.mode,
    &body.exclude_tag_ids,
    body.limit,
  )
  .await?;
  Ok(Json(result))
}
