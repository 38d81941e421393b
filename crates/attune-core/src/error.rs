//! Error types for `attune-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown contact status: {0:?}")]
  UnknownContactStatus(String),

  #[error("unknown contact source: {0:?}")]
  UnknownContactSource(String),

  #[error("unknown activity type: {0:?}")]
  UnknownActivityType(String),

  #[error("unknown product type: {0:?}")]
  UnknownProductType(String),

  #[error("unknown skill level: {0:?}")]
  UnknownSkillLevel(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
