//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields
//! (tag id lists, custom fields, genres, activity metadata) are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings. Enums
//! use the discriminant strings defined next to each type in
//! `attune-core`.

use attune_core::{
  activity::{ActivityMetadata, ActivityType, ContactActivity},
  catalog::{
    Course, Customer, Enrollment, Product, ProductType, Purchase, SkillLevel,
    User,
  },
  contact::{Contact, ContactSource, ContactStatus, CustomFields},
  tag::Tag,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_uuid_opt(id: Option<Uuid>) -> Option<String> {
  id.map(encode_uuid)
}

pub fn decode_uuid_opt(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_tag_ids(ids: &[Uuid]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_tag_ids(s: &str) -> Result<Vec<Uuid>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_custom_fields(cf: &CustomFields) -> Result<String> {
  Ok(serde_json::to_string(cf)?)
}

pub fn decode_custom_fields(s: &str) -> Result<CustomFields> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_genres(genres: &[String]) -> Result<String> {
  Ok(serde_json::to_string(genres)?)
}

pub fn decode_genres(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_metadata(m: &ActivityMetadata) -> Result<String> {
  Ok(serde_json::to_string(m)?)
}

pub fn decode_metadata(s: &str) -> Result<ActivityMetadata> {
  Ok(serde_json::from_str(s)?)
}

// ─── Cursors ─────────────────────────────────────────────────────────────────
// Keyset cursor: `<created_at RFC3339>|<uuid>`, opaque to callers.

pub fn encode_cursor(created_at: &str, id: &str) -> String {
  format!("{created_at}|{id}")
}

pub fn decode_cursor(cursor: &str) -> Result<(String, String)> {
  match cursor.split_once('|') {
    Some((ts, id)) if !ts.is_empty() && !id.is_empty() => {
      Ok((ts.to_owned(), id.to_owned()))
    }
    _ => Err(Error::BadCursor(cursor.to_owned())),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `contacts` row.
pub struct RawContact {
  pub contact_id:        String,
  pub tenant_id:         String,
  pub email:             String,
  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub status:            String,
  pub subscribed_at:     String,
  pub tag_ids:           String,
  pub source:            Option<String>,
  pub source_product_id: Option<String>,
  pub source_course_id:  Option<String>,
  pub customer_id:       Option<String>,
  pub emails_sent:       i64,
  pub emails_opened:     i64,
  pub emails_clicked:    i64,
  pub engagement_score:  i64,
  pub last_opened_at:    Option<String>,
  pub last_clicked_at:   Option<String>,
  pub custom_fields:     String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawContact {
  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id:        decode_uuid(&self.contact_id)?,
      tenant_id:         self.tenant_id,
      email:             self.email,
      first_name:        self.first_name,
      last_name:         self.last_name,
      status:            ContactStatus::parse(&self.status)?,
      subscribed_at:     decode_dt(&self.subscribed_at)?,
      tag_ids:           decode_tag_ids(&self.tag_ids)?,
      source:            self
        .source
        .as_deref()
        .map(ContactSource::parse)
        .transpose()?,
      source_product_id: decode_uuid_opt(self.source_product_id.as_deref())?,
      source_course_id:  decode_uuid_opt(self.source_course_id.as_deref())?,
      customer_id:       decode_uuid_opt(self.customer_id.as_deref())?,
      emails_sent:       self.emails_sent as u32,
      emails_opened:     self.emails_opened as u32,
      emails_clicked:    self.emails_clicked as u32,
      engagement_score:  self.engagement_score.clamp(0, 100) as u8,
      last_opened_at:    decode_dt_opt(self.last_opened_at.as_deref())?,
      last_clicked_at:   decode_dt_opt(self.last_clicked_at.as_deref())?,
      custom_fields:     decode_custom_fields(&self.custom_fields)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `tags` row.
pub struct RawTag {
  pub tag_id:        String,
  pub tenant_id:     String,
  pub name:          String,
  pub color:         String,
  pub description:   Option<String>,
  pub contact_count: i64,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawTag {
  pub fn into_tag(self) -> Result<Tag> {
    Ok(Tag {
      tag_id:        decode_uuid(&self.tag_id)?,
      tenant_id:     self.tenant_id,
      name:          self.name,
      color:         self.color,
      description:   self.description,
      contact_count: self.contact_count.max(0) as u64,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `contact_activity` row.
pub struct RawActivity {
  pub activity_id:   String,
  pub contact_id:    String,
  pub tenant_id:     String,
  pub activity_type: String,
  pub metadata:      String,
  pub timestamp:     String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<ContactActivity> {
    Ok(ContactActivity {
      activity_id:   decode_uuid(&self.activity_id)?,
      contact_id:    decode_uuid(&self.contact_id)?,
      tenant_id:     self.tenant_id,
      activity_type: ActivityType::parse(&self.activity_type)?,
      metadata:      decode_metadata(&self.metadata)?,
      timestamp:     decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw strings read directly from a `products` row.
pub struct RawProduct {
  pub product_id:       String,
  pub tenant_id:        String,
  pub title:            String,
  pub description:      Option<String>,
  pub product_type:     Option<String>,
  pub product_category: Option<String>,
  pub genres:           String,
}

impl RawProduct {
  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      product_id:       decode_uuid(&self.product_id)?,
      tenant_id:        self.tenant_id,
      title:            self.title,
      description:      self.description,
      product_type:     self
        .product_type
        .as_deref()
        .map(ProductType::parse)
        .transpose()?,
      product_category: self
        .product_category
        .as_deref()
        .map(ProductType::parse)
        .transpose()?,
      genres:           decode_genres(&self.genres)?,
    })
  }
}

/// Raw strings read directly from a `courses` row.
pub struct RawCourse {
  pub course_id:   String,
  pub tenant_id:   String,
  pub title:       String,
  pub description: Option<String>,
  pub category:    Option<String>,
  pub skill_level: Option<String>,
  pub slug:        Option<String>,
}

impl RawCourse {
  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:   decode_uuid(&self.course_id)?,
      tenant_id:   self.tenant_id,
      title:       self.title,
      description: self.description,
      category:    self.category,
      skill_level: self
        .skill_level
        .as_deref()
        .map(SkillLevel::parse)
        .transpose()?,
      slug:        self.slug,
    })
  }
}

/// Raw strings read directly from a `customers` row.
pub struct RawCustomer {
  pub customer_id: String,
  pub tenant_id:   String,
  pub email:       String,
  pub user_id:     Option<String>,
}

impl RawCustomer {
  pub fn into_customer(self) -> Result<Customer> {
    Ok(Customer {
      customer_id: decode_uuid(&self.customer_id)?,
      tenant_id:   self.tenant_id,
      email:       self.email,
      user_id:     self.user_id,
    })
  }
}

/// Raw strings read directly from a `purchases` row.
pub struct RawPurchase {
  pub purchase_id: String,
  pub customer_id: String,
  pub product_id:  Option<String>,
  pub course_id:   Option<String>,
  pub amount:      f64,
  pub created_at:  String,
}

impl RawPurchase {
  pub fn into_purchase(self) -> Result<Purchase> {
    Ok(Purchase {
      purchase_id: decode_uuid(&self.purchase_id)?,
      customer_id: decode_uuid(&self.customer_id)?,
      product_id:  decode_uuid_opt(self.product_id.as_deref())?,
      course_id:   decode_uuid_opt(self.course_id.as_deref())?,
      amount:      self.amount,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `enrollments` row.
pub struct RawEnrollment {
  pub enrollment_id: String,
  pub course_id:     String,
  pub user_id:       String,
  pub enrolled_at:   String,
}

impl RawEnrollment {
  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      enrollment_id: decode_uuid(&self.enrollment_id)?,
      course_id:     decode_uuid(&self.course_id)?,
      user_id:       self.user_id,
      enrolled_at:   decode_dt(&self.enrolled_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id: String,
  pub email:   Option<String>,
  pub name:    Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> User {
    User {
      user_id: self.user_id,
      email:   self.email,
      name:    self.name,
    }
  }
}
