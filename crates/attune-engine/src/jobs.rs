//! Batch reconciliation jobs — cursor-resumable tag backfill.
//!
//! Each job processes exactly one page per call and returns a resumption
//! cursor; the caller loops until `done`. Per-item failures are counted,
//! logged at `warn`, and never abort the page. All tag application goes
//! through [`crate::tags::add_tags_to_contact`], so re-running any job to
//! completion is idempotent.

use std::collections::{BTreeMap, HashSet};

use attune_core::{
  catalog::{Course, Product},
  contact::{Contact, ContactSource},
  store::AudienceStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  classify::{infer_genres, infer_skill_level},
  slug::{category_slug, tag_slug},
  sync::{SoftSyncResult, course_text},
  tags::add_tags_to_contact,
};

const DEFAULT_RETAG_BATCH: usize = 25;
const DEFAULT_ENROLLED_BATCH: usize = 50;
const DEFAULT_PURCHASERS_BATCH: usize = 50;

/// Counters returned by one page of a batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetagBatchResult {
  pub processed:   u32,
  /// Tags applied across the page, counted before idempotent dedup
  /// against each contact's existing list.
  pub tags_added:  u32,
  pub errors:      u32,
  pub next_cursor: Option<String>,
  pub done:        bool,
}

/// Order-preserving dedup.
fn dedup(tags: Vec<String>) -> Vec<String> {
  let mut seen = HashSet::new();
  tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Course-derived tags shared by the enrollment-style derivations: slug
/// tag, skill level, category, and inferred genres.
fn push_course_tags(tags: &mut Vec<String>, course: &Course) {
  let slug = course
    .slug
    .clone()
    .unwrap_or_else(|| tag_slug(&course.title));
  if !slug.is_empty() {
    tags.push(format!("course:{slug}"));
  }
  if let Some(level) = course.skill_level {
    tags.push(format!("skill:{}", level.as_str()));
  }
  if let Some(category) = &course.category {
    tags.push(format!("category:{}", category_slug(category)));
  }
  tags.extend(infer_genres(&course_text(course)));
}

/// Product-derived tags shared by the retag derivations: the type's
/// interest tag, inferred genres, and optionally an inferred skill level.
fn push_product_tags(
  tags: &mut Vec<String>,
  product: &Product,
  with_skill: bool,
) {
  if let Some(product_type) = product.product_type {
    tags.push(product_type.interest_tag().to_owned());
  }
  let mut text = vec![product.title.clone()];
  if let Some(description) = &product.description {
    text.push(description.clone());
  }
  text.extend(product.genres.iter().cloned());
  let text = text.join(" ");
  tags.extend(infer_genres(&text));
  if with_skill
    && let Some(level) = infer_skill_level(&text)
  {
    tags.push(format!("skill:{}", level.as_str()));
  }
}

// ─── Retag all contacts ──────────────────────────────────────────────────────

/// Re-derive the full tag set for one contact from its source-of-truth
/// records. Dangling references are skipped, not fatal.
async fn derive_contact_tags<S: AudienceStore>(
  store: &S,
  contact: &Contact,
) -> Result<Vec<String>> {
  let mut tags = Vec::new();

  // 1. Purchase history via the linked customer record.
  if let Some(customer_id) = contact.customer_id {
    tags.push("customer".to_owned());

    if store
      .get_customer(customer_id)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      for purchase in store
        .purchases_for_customer(customer_id)
        .await
        .map_err(Error::store)?
      {
        if let Some(product_id) = purchase.product_id
          && let Some(product) =
            store.get_product(product_id).await.map_err(Error::store)?
        {
          push_product_tags(&mut tags, &product, true);
        }

        if let Some(course_id) = purchase.course_id
          && let Some(course) =
            store.get_course(course_id).await.map_err(Error::store)?
        {
          tags.push("interest:learning".to_owned());
          tags.push("student".to_owned());
          push_course_tags(&mut tags, &course);
        }
      }
    }
  }

  // 2. Courses recorded in the contact's own history.
  for course_id in &contact.custom_fields.enrolled_courses {
    if let Some(course) =
      store.get_course(*course_id).await.map_err(Error::store)?
    {
      tags.push("interest:learning".to_owned());
      tags.push("student".to_owned());
      push_course_tags(&mut tags, &course);
    }
  }

  // 3. Follow-gate products.
  for product_id in &contact.custom_fields.follow_gate_products {
    if let Some(product) =
      store.get_product(*product_id).await.map_err(Error::store)?
    {
      push_product_tags(&mut tags, &product, true);
    }
  }
  if !contact.custom_fields.follow_gate_products.is_empty() {
    tags.push("source:follow-gate".to_owned());
  }

  // 4. Source attribution.
  match contact.source {
    Some(ContactSource::Purchase | ContactSource::CustomerSync) => {
      tags.push("customer".to_owned());
    }
    Some(ContactSource::CourseEnrollment | ContactSource::StudentSync) => {
      tags.push("student".to_owned());
      tags.push("interest:learning".to_owned());
    }
    Some(ContactSource::FollowGate) => tags.push("lead".to_owned()),
    _ => {}
  }

  // 5. Engagement thresholds.
  if contact.engagement_score >= 80 {
    tags.push("engagement:hot".to_owned());
  } else if contact.engagement_score >= 50 {
    tags.push("engagement:warm".to_owned());
  } else if contact.engagement_score < 20 && contact.emails_sent > 5 {
    tags.push("engagement:cold".to_owned());
  }

  // 6. First-touch references.
  if let Some(product_id) = contact.source_product_id
    && let Some(product) =
      store.get_product(product_id).await.map_err(Error::store)?
  {
    push_product_tags(&mut tags, &product, false);
  }
  if let Some(course_id) = contact.source_course_id
    && let Some(course) =
      store.get_course(course_id).await.map_err(Error::store)?
  {
    tags.push("interest:learning".to_owned());
    if let Some(level) = course.skill_level {
      tags.push(format!("skill:{}", level.as_str()));
    }
    if let Some(category) = &course.category {
      tags.push(format!("category:{}", category_slug(category)));
    }
  }

  Ok(tags)
}

async fn retag_one<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  contact: &Contact,
) -> Result<u32> {
  let tags = derive_contact_tags(store, contact).await?;
  let unique = dedup(tags);
  if unique.is_empty() {
    return Ok(0);
  }
  add_tags_to_contact(store, contact.contact_id, tenant_id, &unique).await?;
  Ok(unique.len() as u32)
}

/// Re-derive tags for one page of the tenant's contacts.
///
/// Call repeatedly with each returned `next_cursor` until `done`.
pub async fn retag_all_contacts<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  cursor: Option<String>,
  batch_size: Option<usize>,
) -> Result<RetagBatchResult> {
  let batch = batch_size.unwrap_or(DEFAULT_RETAG_BATCH);
  let page = store
    .list_contacts_page(tenant_id, cursor, batch)
    .await
    .map_err(Error::store)?;

  let mut processed = 0;
  let mut tags_added = 0;
  let mut errors = 0;

  for contact in &page.items {
    match retag_one(store, tenant_id, contact).await {
      Ok(count) => {
        tags_added += count;
        processed += 1;
      }
      Err(e) => {
        tracing::warn!(
          contact_id = %contact.contact_id,
          error = %e,
          "retag failed for contact"
        );
        errors += 1;
      }
    }
  }

  Ok(RetagBatchResult {
    processed,
    tags_added,
    errors,
    next_cursor: page.next_cursor,
    done: page.done,
  })
}

// ─── Enrollment backfill ─────────────────────────────────────────────────────

/// Apply course tags to the contacts of enrolled users, one page of the
/// enrollment log per call.
///
/// Users with no resolvable email or no existing contact are counted as
/// errors and skipped — this job never creates contacts.
pub async fn tag_enrolled_users_with_course_tags<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  cursor: Option<String>,
  batch_size: Option<usize>,
) -> Result<RetagBatchResult> {
  let batch = batch_size.unwrap_or(DEFAULT_ENROLLED_BATCH);
  let page = store
    .enrollments_page(tenant_id, cursor, batch)
    .await
    .map_err(Error::store)?;

  // Group the page by user so each contact is written once.
  let mut by_user: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
  for enrollment in &page.items {
    by_user
      .entry(enrollment.user_id.clone())
      .or_default()
      .push(enrollment.course_id);
  }

  let mut processed = 0;
  let mut tags_added = 0;
  let mut errors = 0;

  for (user_id, course_ids) in by_user {
    let email = store
      .get_user(&user_id)
      .await
      .map_err(Error::store)?
      .and_then(|user| user.email);
    let Some(email) = email else {
      tracing::warn!(user_id = %user_id, "enrolled user has no resolvable email");
      errors += 1;
      continue;
    };

    let email = email.to_lowercase();
    let Some(contact) = store
      .find_contact_by_email(tenant_id, &email)
      .await
      .map_err(Error::store)?
    else {
      tracing::warn!(user_id = %user_id, "no contact for enrolled user");
      errors += 1;
      continue;
    };

    let mut tags = vec!["student".to_owned(), "interest:learning".to_owned()];
    for course_id in course_ids {
      if let Some(course) =
        store.get_course(course_id).await.map_err(Error::store)?
      {
        push_course_tags(&mut tags, &course);
      }
    }

    let unique = dedup(tags);
    add_tags_to_contact(store, contact.contact_id, tenant_id, &unique)
      .await?;
    tags_added += unique.len() as u32;
    processed += 1;
  }

  Ok(RetagBatchResult {
    processed,
    tags_added,
    errors,
    next_cursor: page.next_cursor,
    done: page.done,
  })
}

// ─── Product purchaser backfill ──────────────────────────────────────────────

/// Tag every buyer of one product, one page of its purchase log per call.
///
/// The product must exist; buyers whose customer record or contact cannot
/// be resolved are counted as errors and skipped.
pub async fn tag_product_purchasers<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  product_id: Uuid,
  cursor: Option<String>,
  batch_size: Option<usize>,
) -> Result<RetagBatchResult> {
  let batch = batch_size.unwrap_or(DEFAULT_PURCHASERS_BATCH);
  let product = store
    .get_product(product_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ProductNotFound(product_id))?;

  let mut tags = vec!["customer".to_owned()];
  let slug = tag_slug(&product.title);
  if !slug.is_empty() {
    tags.push(format!("product:{slug}"));
  }
  push_product_tags(&mut tags, &product, false);
  let tags = dedup(tags);

  let page = store
    .purchases_for_product_page(product_id, cursor, batch)
    .await
    .map_err(Error::store)?;

  let mut processed = 0;
  let mut tags_added = 0;
  let mut errors = 0;

  for purchase in &page.items {
    let email = store
      .get_customer(purchase.customer_id)
      .await
      .map_err(Error::store)?
      .map(|customer| customer.email.to_lowercase());
    let Some(email) = email else {
      tracing::warn!(purchase_id = %purchase.purchase_id, "purchase has no customer record");
      errors += 1;
      continue;
    };

    let Some(contact) = store
      .find_contact_by_email(tenant_id, &email)
      .await
      .map_err(Error::store)?
    else {
      tracing::warn!(purchase_id = %purchase.purchase_id, "no contact for purchaser");
      errors += 1;
      continue;
    };

    add_tags_to_contact(store, contact.contact_id, tenant_id, &tags).await?;
    tags_added += tags.len() as u32;
    processed += 1;
  }

  Ok(RetagBatchResult {
    processed,
    tags_added,
    errors,
    next_cursor: page.next_cursor,
    done: page.done,
  })
}

// ─── Single-contact enrollment fix ───────────────────────────────────────────

/// Re-derive course tags for one contact from its recorded enrollments.
/// Unknown contacts are a soft no-op.
pub async fn tag_contact_with_enrollments<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  email: &str,
) -> Result<SoftSyncResult> {
  let email = email.to_lowercase();
  let Some(contact) = store
    .find_contact_by_email(tenant_id, &email)
    .await
    .map_err(Error::store)?
  else {
    return Ok(SoftSyncResult { contact_id: None, tags_added: Vec::new() });
  };

  let mut tags = Vec::new();
  for course_id in &contact.custom_fields.enrolled_courses {
    if let Some(course) =
      store.get_course(*course_id).await.map_err(Error::store)?
    {
      tags.push("interest:learning".to_owned());
      tags.push("student".to_owned());
      push_course_tags(&mut tags, &course);
    }
  }

  let unique = dedup(tags);
  if !unique.is_empty() {
    add_tags_to_contact(store, contact.contact_id, tenant_id, &unique)
      .await?;
  }

  Ok(SoftSyncResult {
    contact_id: Some(contact.contact_id),
    tags_added: unique,
  })
}
