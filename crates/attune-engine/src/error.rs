//! Error types for the tagging engine.
//!
//! Only two things are hard failures here: a primary event referencing a
//! catalog record that does not exist, and a backend error. Everything
//! else (unknown contacts on engagement events, dangling references in
//! batch jobs) is soft and surfaces in result payloads instead.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("product not found: {0}")]
  ProductNotFound(Uuid),

  #[error("course not found: {0}")]
  CourseNotFound(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend failure.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
