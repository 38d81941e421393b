//! Tag store (get-or-create) and the tag application engine.

use attune_core::{
  store::AudienceStore,
  tag::{NewTag, Tag},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Colors ──────────────────────────────────────────────────────────────────

const COLOR_PRODUCT: &str = "#EC4899"; // pink
const COLOR_COURSE: &str = "#8B5CF6"; // purple
const COLOR_GENRE: &str = "#8B5CF6"; // purple
const COLOR_INTEREST: &str = "#3B82F6"; // blue
const COLOR_SKILL: &str = "#10B981"; // green
const COLOR_CUSTOMER: &str = "#F59E0B"; // amber
const COLOR_DEFAULT: &str = "#6B7280"; // gray

/// Display color for an auto-created tag, by namespace prefix.
pub fn tag_color(name: &str) -> &'static str {
  if name.starts_with("product:") {
    COLOR_PRODUCT
  } else if name.starts_with("course:") {
    COLOR_COURSE
  } else if name.starts_with("genre:") {
    COLOR_GENRE
  } else if name.starts_with("interest:") {
    COLOR_INTEREST
  } else if name.starts_with("skill:") {
    COLOR_SKILL
  } else if name == "customer" {
    COLOR_CUSTOMER
  } else {
    COLOR_DEFAULT
  }
}

/// Human-readable description for an auto-created tag.
pub fn tag_description(name: &str) -> String {
  if let Some(product) = name.strip_prefix("product:") {
    format!("Purchased: {}", product.replace('-', " "))
  } else if let Some(course) = name.strip_prefix("course:") {
    format!("Enrolled in: {}", course.replace('-', " "))
  } else {
    format!("Auto-generated tag: {name}")
  }
}

// ─── Get-or-create ───────────────────────────────────────────────────────────

/// Resolve a tag by (tenant, name), creating it on first use with a
/// namespace-derived color and description and a zero contact count.
///
/// Safe to call concurrently for the same name: lost lookup races fall
/// through to the store's insert-if-absent primitive, where the UNIQUE
/// (tenant, name) constraint guarantees a single winner.
pub async fn get_or_create_tag<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  name: &str,
) -> Result<Tag> {
  if let Some(tag) =
    store.find_tag(tenant_id, name).await.map_err(Error::store)?
  {
    return Ok(tag);
  }

  store
    .insert_tag_if_absent(NewTag {
      tenant_id:   tenant_id.to_owned(),
      name:        name.to_owned(),
      color:       tag_color(name).to_owned(),
      description: Some(tag_description(name)),
    })
    .await
    .map_err(Error::store)
}

// ─── Application ─────────────────────────────────────────────────────────────

/// Attach `tag_names` to a contact, skipping tags it already holds.
///
/// Idempotent: reapplying a held tag is a no-op. Every newly-attached
/// tag's `contact_count` is incremented exactly once, and the contact is
/// only persisted when its tag list actually changed.
///
/// This is the single integration point all event handlers and jobs
/// funnel through — it is the only place `contact_count` bookkeeping
/// happens, so it must never be bypassed.
///
/// Returns the names that were newly attached. Unknown contacts are a
/// silent no-op.
pub async fn add_tags_to_contact<S: AudienceStore>(
  store: &S,
  contact_id: Uuid,
  tenant_id: &str,
  tag_names: &[String],
) -> Result<Vec<String>> {
  let Some(mut contact) =
    store.get_contact(contact_id).await.map_err(Error::store)?
  else {
    return Ok(Vec::new());
  };

  let mut added = Vec::new();
  for name in tag_names {
    let tag = get_or_create_tag(store, tenant_id, name).await?;
    if !contact.tag_ids.contains(&tag.tag_id) {
      contact.tag_ids.push(tag.tag_id);
      store
        .increment_tag_contact_count(tag.tag_id)
        .await
        .map_err(Error::store)?;
      added.push(name.clone());
    }
  }

  if !added.is_empty() {
    contact.updated_at = chrono::Utc::now();
    store.update_contact(&contact).await.map_err(Error::store)?;
  }

  Ok(added)
}
