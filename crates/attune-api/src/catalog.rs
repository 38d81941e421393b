//! Handlers for `/catalog/*` mirror endpoints.
//!
//! The surrounding platform pushes its commerce records here so the
//! tagging engine can read them. Upserts by id; all return `201`.

use std::sync::Arc;

use attune_core::{
  catalog::{Course, Customer, Enrollment, Product, Purchase, User},
  store::AudienceStore,
};
use axum::{Json, extract::State, http::StatusCode};

use crate::error::ApiError;

fn store_err<E>(e: E) -> ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  ApiError::Store(Box::new(e))
}

/// `POST /catalog/products`
pub async fn product<S>(
  State(store): State<Arc<S>>,
  Json(product): Json<Product>,
) -> Result<StatusCode, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.insert_product(product).await.map_err(store_err)?;
  Ok(StatusCode::CREATED)
}

/// `POST /catalog/courses`
pub async fn course<S>(
  State(store): State<Arc<S>>,
  Json(course): Json<Course>,
) -> Result<StatusCode, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.insert_course(course).await.map_err(store_err)?;
  Ok(StatusCode::CREATED)
}

/// `POST /catalog/customers`
pub async fn customer<S>(
  State(store): State<Arc<S>>,
  Json(customer): Json<Customer>,
) -> Result<StatusCode, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.insert_customer(customer).await.map_err(store_err)?;
  Ok(StatusCode::CREATED)
}

/// `POST /catalog/purchases`
pub async fn purchase<S>(
  State(store): State<Arc<S>>,
  Json(purchase): Json<Purchase>,
) -> Result<StatusCode, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.insert_purchase(purchase).await.map_err(store_err)?;
  Ok(StatusCode::CREATED)
}

/// `POST /catalog/enrollments`
pub async fn enrollment<S>(
  State(store): State<Arc<S>>,
  Json(enrollment): Json<Enrollment>,
) -> Result<StatusCode, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.insert_enrollment(enrollment).await.map_err(store_err)?;
  Ok(StatusCode::CREATED)
}

/// `POST /catalog/users`
pub async fn user<S>(
  State(store): State<Arc<S>>,
  Json(user): Json<User>,
) -> Result<StatusCode, ApiError>
where
  S: AudienceStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store.insert_user(user).await.map_err(store_err)?;
  Ok(StatusCode::CREATED)
}
