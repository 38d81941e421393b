//! JSON REST API for Attune.
//!
//! Exposes an axum [`Router`] backed by any
//! [`attune_core::store::AudienceStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility — event producers (webhook
//! receivers) and the operator CLI both talk to this surface.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", attune_api::api_router(store.clone()))
//! ```

pub mod admin;
pub mod catalog;
pub mod error;
pub mod events;
pub mod segments;

use std::{path::PathBuf, sync::Arc};

use attune_core::store::AudienceStore;
use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router
/// regardless of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: AudienceStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Business events
    .route("/events/follow-gate", post(events::follow_gate::<S>))
    .route("/events/purchase", post(events::purchase::<S>))
    .route("/events/enrollment", post(events::enrollment::<S>))
    .route("/events/engagement", post(events::engagement::<S>))
    .route("/contacts/tag", post(events::tag_contact::<S>))
    // Segments
    .route(
      "/segments",
      get(segments::list::<S>),
    )
    .route("/segments/setup", post(segments::setup::<S>))
    .route("/segments/contacts", post(segments::contacts::<S>))
    // Maintenance
    .route("/admin/retag", post(admin::retag::<S>))
    .route("/admin/tag-enrolled", post(admin::tag_enrolled::<S>))
    .route(
      "/admin/tag-product-purchasers",
      post(admin::tag_product_purchasers::<S>),
    )
    .route(
      "/admin/tag-contact-enrollments",
      post(admin::tag_contact_enrollments::<S>),
    )
    // Catalog mirror
    .route("/catalog/products", post(catalog::product::<S>))
    .route("/catalog/courses", post(catalog::course::<S>))
    .route("/catalog/customers", post(catalog::customer::<S>))
    .route("/catalog/purchases", post(catalog::purchase::<S>))
    .route("/catalog/enrollments", post(catalog::enrollment::<S>))
    .route("/catalog/users", post(catalog::user::<S>))
    .with_state(store)
}

// ─── Integration tests ───────────────────────────────────────────────────────
