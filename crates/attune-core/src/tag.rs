//! Tag — a named `namespace:value` label scoped to one tenant.
//!
//! Tags are created lazily on first use and are immutable afterwards except
//! for `contact_count` and `updated_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
  pub tag_id:        Uuid,
  pub tenant_id:     String,
  /// Structured `namespace:value` name (e.g. `genre:techno`), unique per
  /// tenant. Case- and format-stable: the same signal always produces the
  /// same name.
  pub name:          String,
  /// Display color hex, chosen from the namespace at creation time.
  pub color:         String,
  pub description:   Option<String>,
  /// Number of contacts this tag has ever been attached to. Never
  /// decremented — no removal path exists — so this is an upper bound on
  /// current holders, not an exact count.
  pub contact_count: u64,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`crate::store::AudienceStore::insert_tag_if_absent`].
/// The id, zero count, and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTag {
  pub tenant_id:   String,
  pub name:        String,
  pub color:       String,
  pub description: Option<String>,
}
