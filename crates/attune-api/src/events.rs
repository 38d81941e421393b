//! Handlers for `/events/*` and `/contacts/tag` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/events/follow-gate` | 404 if the product does not exist |
//! | `POST` | `/events/purchase` | Dangling catalog refs are soft |
//! | `POST` | `/events/enrollment` | 404 if the course does not exist |
//! | `POST` | `/events/engagement` | Unknown contact → `contact_id: null` |
//! | `POST` | `/contacts/tag` | Manual tagging; never creates contacts |

use std::sync::Arc;

use attune_core::store::AudienceStore;
use attune_engine::sync::{
  self, ContactSyncResult, EngagementEvent, EnrollmentEvent,
  EnrollmentSyncResult, FollowGateEvent, PurchaseEvent, SoftSyncResult,
};
use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::ApiError;

/// `POST /events/follow-gate`
pub async fn follow_gate<S>(
  State(store): State<Arc<S>>,
  Json(event): Json<FollowGateEvent>,
) -> Result<Json<ContactSyncResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result =
    sync::sync_contact_from_follow_gate(store.as_ref(), &event).await?;
  Ok(Json(result))
}

/// `POST /events/purchase`
pub async fn purchase<S>(
  State(store): State<Arc<S>>,
  Json(event): Json<PurchaseEvent>,
) -> Result<Json<ContactSyncResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result =
    sync::sync_contact_from_purchase(store.as_ref(), &event).await?;
  Ok(Json(result))
}

/// `POST /events/enrollment`
pub async fn enrollment<S>(
  State(store): State<Arc<S>>,
  Json(event): Json<EnrollmentEvent>,
) -> Result<Json<EnrollmentSyncResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result =
    sync::sync_contact_from_enrollment(store.as_ref(), &event).await?;
  Ok(Json(result))
}

/// `POST /events/engagement`
pub async fn engagement<S>(
  State(store): State<Arc<S>>,
  Json(event): Json<EngagementEvent>,
) -> Result<Json<SoftSyncResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result =
    sync::sync_contact_engagement(store.as_ref(), &event).await?;
  Ok(Json(result))
}

// ─── Manual tagging ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TagContactBody {
  pub tenant_id: String,
  pub email:     String,
  pub tags:      Vec<String>,
}

/// `POST /contacts/tag`
pub async fn tag_contact<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<TagContactBody>,
) -> Result<Json<SoftSyncResult>, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let result = sync::manual_tag_contact(
    store.as_ref(),
    &body.tenant_id,
    &body.email,
    &body.tags,
  )
  .await?;
  Ok(Json(result))
}
