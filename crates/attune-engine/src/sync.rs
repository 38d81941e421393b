//! Per-event contact upsert handlers.
//!
//! Each handler follows the same shape: resolve (or create) the contact
//! by (tenant, lowercased email), patch fields additively, compute the
//! event's tag set, apply it through
//! [`crate::tags::add_tags_to_contact`], and append one activity row.
//!
//! Custom fields merge additively — counters accumulate, lists append —
//! and attribution fields (`source_product_id`, `source_course_id`) keep
//! their first-touch value once set.

use attune_core::{
  activity::{ActivityMetadata, ActivityType, NewActivity},
  catalog::{Course, Product},
  contact::{ContactSource, ContactStatus, NewContact, PurchaseRecord},
  store::AudienceStore,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  classify::{infer_genres, infer_skill_level},
  slug::{category_slug, tag_slug},
  tags::add_tags_to_contact,
};

// ─── Event payloads ──────────────────────────────────────────────────────────

/// A visitor claimed a free download through a follow gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowGateEvent {
  pub tenant_id:  String,
  pub email:      String,
  pub name:       Option<String>,
  pub product_id: Uuid,
}

/// A completed checkout, for either a product or a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseEvent {
  pub tenant_id:  String,
  pub email:      String,
  /// Platform account of the buyer, when known. Carried for parity with
  /// the payment webhook payload; customer linkage happens upstream.
  pub user_id:    Option<String>,
  pub product_id: Option<Uuid>,
  pub course_id:  Option<Uuid>,
  pub amount:     f64,
}

/// A user enrolled in a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentEvent {
  pub tenant_id: String,
  pub email:     String,
  pub user_id:   String,
  pub course_id: Uuid,
}

/// What the email provider's webhook reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
  Opened,
  Clicked,
  Bounced,
}

impl EngagementKind {
  fn activity_type(self) -> ActivityType {
    match self {
      Self::Opened => ActivityType::EmailOpened,
      Self::Clicked => ActivityType::EmailClicked,
      Self::Bounced => ActivityType::EmailBounced,
    }
  }
}

/// An email-engagement webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
  pub tenant_id:     String,
  pub email:         String,
  pub kind:          EngagementKind,
  pub link_url:      Option<String>,
  pub email_subject: Option<String>,
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Outcome of a handler that always resolves to a contact.
/// `tags_added` is the tag set computed for the event; tags the contact
/// already held are skipped during application but still listed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSyncResult {
  pub contact_id: Uuid,
  pub created:    bool,
  pub tags_added: Vec<String>,
}

/// Outcome of the enrollment handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentSyncResult {
  pub contact_id:          Uuid,
  pub created:             bool,
  pub tags_added:          Vec<String>,
  /// Whether this enrollment changed the contact's recorded student
  /// level. Returned for observability; not used further internally.
  pub skill_level_updated: bool,
}

/// Outcome of a handler that may not find its contact (engagement and
/// manual tagging never create one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftSyncResult {
  pub contact_id: Option<Uuid>,
  pub tags_added: Vec<String>,
}

// ─── Text and score helpers ──────────────────────────────────────────────────

/// The text blob genre/skill inference runs on for a product.
fn product_text(product: &Product) -> String {
  let mut parts = vec![product.title.clone()];
  if let Some(description) = &product.description {
    parts.push(description.clone());
  }
  parts.extend(product.genres.iter().cloned());
  parts.join(" ")
}

/// Like [`product_text`], with the category appended — the follow-gate
/// handler classifies on it too.
fn product_text_with_category(product: &Product) -> String {
  let mut text = product_text(product);
  if let Some(category) = product.product_category {
    text.push(' ');
    text.push_str(category.as_str());
  }
  text
}

/// The text blob genre inference runs on for a course.
pub(crate) fn course_text(course: &Course) -> String {
  let mut parts = vec![course.title.clone()];
  if let Some(description) = &course.description {
    parts.push(description.clone());
  }
  if let Some(category) = &course.category {
    parts.push(category.clone());
  }
  parts.join(" ")
}

pub(crate) fn raise_score(score: u8, delta: u8) -> u8 {
  score.saturating_add(delta).min(100)
}

fn lower_score(score: u8, delta: u8) -> u8 { score.saturating_sub(delta) }

/// Split a free-form name into (first, rest).
fn split_name(name: &str) -> (Option<String>, Option<String>) {
  let mut parts = name.split_whitespace();
  let first = parts.next().map(str::to_owned);
  let rest: Vec<&str> = parts.collect();
  let last = if rest.is_empty() { None } else { Some(rest.join(" ")) };
  (first, last)
}

// ─── Follow gate ─────────────────────────────────────────────────────────────

/// Handle a follow-gate capture.
///
/// The referenced product must exist — a dangling `product_id` is a hard
/// validation error, since the gate cannot have been served without it.
pub async fn sync_contact_from_follow_gate<S: AudienceStore>(
  store: &S,
  event: &FollowGateEvent,
) -> Result<ContactSyncResult> {
  let product = store
    .get_product(event.product_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::ProductNotFound(event.product_id))?;

  let mut tags_to_add = Vec::new();
  if let Some(product_type) = product.product_type {
    tags_to_add.push(product_type.interest_tag().to_owned());
  }

  let text = product_text_with_category(&product);
  tags_to_add.extend(infer_genres(&text));
  if let Some(level) = infer_skill_level(&text) {
    tags_to_add.push(format!("skill:{}", level.as_str()));
  }
  tags_to_add.push("source:follow-gate".to_owned());

  let email = event.email.to_lowercase();
  let existing = store
    .find_contact_by_email(&event.tenant_id, &email)
    .await
    .map_err(Error::store)?;

  let now = Utc::now();
  let (contact_id, created) = match existing {
    Some(mut contact) => {
      if contact.source_product_id.is_none() {
        contact.source_product_id = Some(event.product_id);
        contact.source = Some(ContactSource::FollowGate);
      }
      if let Some(name) = &event.name
        && contact.first_name.is_none()
      {
        (contact.first_name, contact.last_name) = split_name(name);
      }
      contact.custom_fields.last_activity = Some(now);
      contact.custom_fields.follow_gate_products.push(event.product_id);
      contact.updated_at = now;
      store.update_contact(&contact).await.map_err(Error::store)?;
      (contact.contact_id, false)
    }
    None => {
      let (first_name, last_name) = match &event.name {
        Some(name) => split_name(name),
        None => (None, None),
      };
      let mut input = NewContact::new(event.tenant_id.clone(), email);
      input.first_name = first_name;
      input.last_name = last_name;
      input.source = Some(ContactSource::FollowGate);
      input.source_product_id = Some(event.product_id);
      input.custom_fields.last_activity = Some(now);
      input.custom_fields.follow_gate_products = vec![event.product_id];
      let contact =
        store.insert_contact(input).await.map_err(Error::store)?;
      (contact.contact_id, true)
    }
  };

  add_tags_to_contact(store, contact_id, &event.tenant_id, &tags_to_add)
    .await?;

  store
    .record_activity(NewActivity {
      contact_id,
      tenant_id: event.tenant_id.clone(),
      activity_type: ActivityType::Subscribed,
      metadata: ActivityMetadata {
        tag_name: Some(format!("Follow gate: {}", product.title)),
        ..Default::default()
      },
    })
    .await
    .map_err(Error::store)?;

  Ok(ContactSyncResult { contact_id, created, tags_added: tags_to_add })
}

// ─── Purchase ────────────────────────────────────────────────────────────────

/// Handle a completed purchase.
///
/// Dangling product/course references are soft here — the sale already
/// happened, so the contact is still upserted and tagged `customer`; only
/// the catalog-derived tags are omitted.
pub async fn sync_contact_from_purchase<S: AudienceStore>(
  store: &S,
  event: &PurchaseEvent,
) -> Result<ContactSyncResult> {
  let mut tags_to_add = vec!["customer".to_owned()];
  let mut text = String::new();
  let mut purchased_title = String::new();

  if let Some(product_id) = event.product_id
    && let Some(product) =
      store.get_product(product_id).await.map_err(Error::store)?
  {
    purchased_title = product.title.clone();
    text = product_text(&product);

    let slug = tag_slug(&product.title);
    if !slug.is_empty() {
      tags_to_add.push(format!("product:{slug}"));
    }
    if let Some(product_type) = product.product_type {
      tags_to_add.push(product_type.interest_tag().to_owned());
    }
    if let Some(category) = product.product_category {
      tags_to_add.push(category.interest_tag().to_owned());
    }
  }

  if let Some(course_id) = event.course_id
    && let Some(course) =
      store.get_course(course_id).await.map_err(Error::store)?
  {
    purchased_title = course.title.clone();
    text = course_text(&course);

    let slug = tag_slug(&course.title);
    if !slug.is_empty() {
      tags_to_add.push(format!("course:{slug}"));
    }
    tags_to_add.push("interest:learning".to_owned());
    if let Some(level) = course.skill_level {
      tags_to_add.push(format!("skill:{}", level.as_str()));
    }
  }

  tags_to_add.extend(infer_genres(&text));

  let email = event.email.to_lowercase();
  let existing = store
    .find_contact_by_email(&event.tenant_id, &email)
    .await
    .map_err(Error::store)?;

  let now = Utc::now();
  let points = event.amount.max(0.0).floor() as u64;
  let record = PurchaseRecord {
    product_id: event.product_id,
    course_id:  event.course_id,
    amount:     event.amount,
    timestamp:  now,
  };

  let (contact_id, created) = match existing {
    Some(mut contact) => {
      contact.custom_fields.purchase_points += points;
      contact.custom_fields.total_points += points;
      contact.custom_fields.last_purchase_at = Some(now);
      contact.custom_fields.last_activity = Some(now);
      contact.custom_fields.purchases.push(record);
      contact.engagement_score = raise_score(contact.engagement_score, 20);
      contact.updated_at = now;
      store.update_contact(&contact).await.map_err(Error::store)?;
      (contact.contact_id, false)
    }
    None => {
      let mut input = NewContact::new(event.tenant_id.clone(), email);
      input.source = Some(ContactSource::Purchase);
      input.source_product_id = event.product_id;
      input.source_course_id = event.course_id;
      input.engagement_score = 20;
      input.custom_fields.purchase_points = points;
      input.custom_fields.total_points = points;
      input.custom_fields.last_purchase_at = Some(now);
      input.custom_fields.last_activity = Some(now);
      input.custom_fields.purchases = vec![record];
      let contact =
        store.insert_contact(input).await.map_err(Error::store)?;
      (contact.contact_id, true)
    }
  };

  add_tags_to_contact(store, contact_id, &event.tenant_id, &tags_to_add)
    .await?;

  store
    .record_activity(NewActivity {
      contact_id,
      tenant_id: event.tenant_id.clone(),
      activity_type: ActivityType::CustomFieldUpdated,
      metadata: ActivityMetadata {
        field_name: Some("purchase".to_owned()),
        new_value: Some(purchased_title),
        ..Default::default()
      },
    })
    .await
    .map_err(Error::store)?;

  Ok(ContactSyncResult { contact_id, created, tags_added: tags_to_add })
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

/// Handle a course enrollment. The course must exist.
pub async fn sync_contact_from_enrollment<S: AudienceStore>(
  store: &S,
  event: &EnrollmentEvent,
) -> Result<EnrollmentSyncResult> {
  let course = store
    .get_course(event.course_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::CourseNotFound(event.course_id))?;

  let mut tags_to_add =
    vec!["interest:learning".to_owned(), "student".to_owned()];

  let slug = course
    .slug
    .clone()
    .unwrap_or_else(|| tag_slug(&course.title));
  if !slug.is_empty() {
    tags_to_add.push(format!("course:{slug}"));
  }

  tags_to_add.extend(infer_genres(&course_text(&course)));

  if let Some(level) = course.skill_level {
    tags_to_add.push(format!("skill:{}", level.as_str()));
  }
  if let Some(category) = &course.category {
    tags_to_add.push(format!("category:{}", category_slug(category)));
  }

  let email = event.email.to_lowercase();
  let existing = store
    .find_contact_by_email(&event.tenant_id, &email)
    .await
    .map_err(Error::store)?;

  let now = Utc::now();
  let mut skill_level_updated = false;

  let (contact_id, created) = match existing {
    Some(mut contact) => {
      contact.custom_fields.last_activity = Some(now);
      contact.custom_fields.enrolled_courses.push(event.course_id);
      if let Some(level) = course.skill_level
        && contact.custom_fields.student_level != Some(level)
      {
        contact.custom_fields.student_level = Some(level);
        skill_level_updated = true;
      }
      if contact.source_course_id.is_none() {
        contact.source_course_id = Some(event.course_id);
      }
      contact.updated_at = now;
      store.update_contact(&contact).await.map_err(Error::store)?;
      (contact.contact_id, false)
    }
    None => {
      let mut input = NewContact::new(event.tenant_id.clone(), email);
      input.source = Some(ContactSource::CourseEnrollment);
      input.source_course_id = Some(event.course_id);
      input.custom_fields.student_level = course.skill_level;
      input.custom_fields.last_activity = Some(now);
      input.custom_fields.enrolled_courses = vec![event.course_id];
      let contact =
        store.insert_contact(input).await.map_err(Error::store)?;
      skill_level_updated = course.skill_level.is_some();
      (contact.contact_id, true)
    }
  };

  add_tags_to_contact(store, contact_id, &event.tenant_id, &tags_to_add)
    .await?;

  store
    .record_activity(NewActivity {
      contact_id,
      tenant_id: event.tenant_id.clone(),
      activity_type: ActivityType::CampaignEnrolled,
      metadata: ActivityMetadata {
        tag_name: Some(format!("Course: {}", course.title)),
        ..Default::default()
      },
    })
    .await
    .map_err(Error::store)?;

  Ok(EnrollmentSyncResult {
    contact_id,
    created,
    tags_added: tags_to_add,
    skill_level_updated,
  })
}

// ─── Engagement ──────────────────────────────────────────────────────────────

/// Interest tags inferred from a clicked link URL. Each check is
/// independent; a URL can contribute several.
fn link_interest_tags(url: &str) -> Vec<String> {
  let url = url.to_lowercase();
  let mut tags = Vec::new();
  if url.contains("mixing") || url.contains("mix") {
    tags.push("interest:mixing".to_owned());
  }
  if url.contains("mastering") || url.contains("master") {
    tags.push("interest:mastering".to_owned());
  }
  if url.contains("sample") || url.contains("loop") {
    tags.push("interest:samples".to_owned());
  }
  if url.contains("preset") {
    tags.push("interest:presets".to_owned());
  }
  if url.contains("course") || url.contains("learn") {
    tags.push("interest:learning".to_owned());
  }
  tags
}

/// Handle an email-engagement webhook event.
///
/// Engagement events never create contacts: an unknown email is a soft
/// no-op (the provider may report on addresses we never captured).
pub async fn sync_contact_engagement<S: AudienceStore>(
  store: &S,
  event: &EngagementEvent,
) -> Result<SoftSyncResult> {
  let email = event.email.to_lowercase();
  let Some(mut contact) = store
    .find_contact_by_email(&event.tenant_id, &email)
    .await
    .map_err(Error::store)?
  else {
    return Ok(SoftSyncResult { contact_id: None, tags_added: Vec::new() });
  };

  let now = Utc::now();
  let mut tags_to_add = Vec::new();

  match event.kind {
    EngagementKind::Opened => {
      contact.emails_opened += 1;
      contact.last_opened_at = Some(now);
      contact.engagement_score = raise_score(contact.engagement_score, 2);
      contact.custom_fields.last_activity = Some(now);
      contact.custom_fields.total_points += 5;
    }
    EngagementKind::Clicked => {
      contact.emails_clicked += 1;
      contact.last_clicked_at = Some(now);
      contact.engagement_score = raise_score(contact.engagement_score, 5);
      contact.custom_fields.last_activity = Some(now);
      contact.custom_fields.total_points += 10;
      if let Some(url) = &event.link_url {
        tags_to_add.extend(link_interest_tags(url));
      }
    }
    EngagementKind::Bounced => {
      contact.status = ContactStatus::Bounced;
      contact.engagement_score = lower_score(contact.engagement_score, 10);
    }
  }

  // Thresholds are checked against the post-update score; only one
  // applies per event.
  if contact.engagement_score >= 80 {
    tags_to_add.push("engagement:hot".to_owned());
  } else if contact.engagement_score >= 50 {
    tags_to_add.push("engagement:warm".to_owned());
  }

  contact.updated_at = now;
  store.update_contact(&contact).await.map_err(Error::store)?;

  if !tags_to_add.is_empty() {
    add_tags_to_contact(
      store,
      contact.contact_id,
      &event.tenant_id,
      &tags_to_add,
    )
    .await?;
  }

  store
    .record_activity(NewActivity {
      contact_id: contact.contact_id,
      tenant_id: event.tenant_id.clone(),
      activity_type: event.kind.activity_type(),
      metadata: ActivityMetadata {
        email_subject: event.email_subject.clone(),
        link_clicked: event.link_url.clone(),
        ..Default::default()
      },
    })
    .await
    .map_err(Error::store)?;

  Ok(SoftSyncResult {
    contact_id: Some(contact.contact_id),
    tags_added: tags_to_add,
  })
}

// ─── Manual tagging ──────────────────────────────────────────────────────────

/// Apply operator-chosen tag names to an existing contact. Unknown
/// contacts are a soft no-op; this never creates one.
pub async fn manual_tag_contact<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  email: &str,
  tag_names: &[String],
) -> Result<SoftSyncResult> {
  let email = email.to_lowercase();
  let Some(contact) = store
    .find_contact_by_email(tenant_id, &email)
    .await
    .map_err(Error::store)?
  else {
    return Ok(SoftSyncResult { contact_id: None, tags_added: Vec::new() });
  };

  add_tags_to_contact(store, contact.contact_id, tenant_id, tag_names)
    .await?;

  Ok(SoftSyncResult {
    contact_id: Some(contact.contact_id),
    tags_added: tag_names.to_vec(),
  })
}
