//! Contact — the tenant-scoped lead/customer record tags attach to.
//!
//! Identity is (tenant_id, lowercased email). A contact is created by the
//! first business event referencing an unknown email and mutated additively
//! by every later event. This subsystem never deletes contacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::SkillLevel};

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Delivery status of a contact's email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
  Subscribed,
  Unsubscribed,
  Bounced,
  Complained,
}

impl ContactStatus {
  /// The string stored in the `status` column.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Subscribed => "subscribed",
      Self::Unsubscribed => "unsubscribed",
      Self::Bounced => "bounced",
      Self::Complained => "complained",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "subscribed" => Ok(Self::Subscribed),
      "unsubscribed" => Ok(Self::Unsubscribed),
      "bounced" => Ok(Self::Bounced),
      "complained" => Ok(Self::Complained),
      other => Err(Error::UnknownContactStatus(other.to_owned())),
    }
  }
}

/// How a contact first entered the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
  FollowGate,
  Purchase,
  CourseEnrollment,
  PlatformUser,
  CustomerSync,
  StudentSync,
  Manual,
}

impl ContactSource {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::FollowGate => "follow_gate",
      Self::Purchase => "purchase",
      Self::CourseEnrollment => "course_enrollment",
      Self::PlatformUser => "platform_user",
      Self::CustomerSync => "customer_sync",
      Self::StudentSync => "student_sync",
      Self::Manual => "manual",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "follow_gate" => Ok(Self::FollowGate),
      "purchase" => Ok(Self::Purchase),
      "course_enrollment" => Ok(Self::CourseEnrollment),
      "platform_user" => Ok(Self::PlatformUser),
      "customer_sync" => Ok(Self::CustomerSync),
      "student_sync" => Ok(Self::StudentSync),
      "manual" => Ok(Self::Manual),
      other => Err(Error::UnknownContactSource(other.to_owned())),
    }
  }
}

// ─── Custom fields ───────────────────────────────────────────────────────────

/// One purchase captured into a contact's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseRecord {
  pub product_id: Option<Uuid>,
  pub course_id:  Option<Uuid>,
  pub amount:     f64,
  pub timestamp:  DateTime<Utc>,
}

/// A contact's accumulated history.
///
/// Named fields instead of an open map; handlers merge additively (append
/// to the lists, accumulate the counters) and never replace wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomFields {
  pub purchase_points:      u64,
  pub total_points:         u64,
  pub student_level:        Option<SkillLevel>,
  pub enrolled_courses:     Vec<Uuid>,
  /// Every follow-gate product this contact has claimed, in order.
  /// Grows unbounded.
  pub follow_gate_products: Vec<Uuid>,
  pub purchases:            Vec<PurchaseRecord>,
  pub last_purchase_at:     Option<DateTime<Utc>>,
  pub last_activity:        Option<DateTime<Utc>>,
}

// ─── Contact ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id:        Uuid,
  pub tenant_id:         String,
  /// Always stored lowercased; part of the identity key.
  pub email:             String,
  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub status:            ContactStatus,
  pub subscribed_at:     DateTime<Utc>,
  /// Owned tag ids, duplicate-free, in attachment order.
  pub tag_ids:           Vec<Uuid>,
  pub source:            Option<ContactSource>,
  /// First-touch attribution; set once and never overwritten.
  pub source_product_id: Option<Uuid>,
  pub source_course_id:  Option<Uuid>,
  /// Link to the commerce customer record, when known.
  pub customer_id:       Option<Uuid>,
  pub emails_sent:       u32,
  pub emails_opened:     u32,
  pub emails_clicked:    u32,
  /// Bounded [0, 100] responsiveness heuristic.
  pub engagement_score:  u8,
  pub last_opened_at:    Option<DateTime<Utc>>,
  pub last_clicked_at:   Option<DateTime<Utc>>,
  pub custom_fields:     CustomFields,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Contact {
  /// The display name campaign exports use: "First Last" when a first
  /// name is known, otherwise nothing.
  pub fn display_name(&self) -> Option<String> {
    let first = self.first_name.as_deref()?;
    Some(match self.last_name.as_deref() {
      Some(last) => format!("{first} {last}"),
      None => first.to_owned(),
    })
  }
}

// ─── NewContact ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::AudienceStore::insert_contact`].
/// The id, counters, tag list, and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewContact {
  pub tenant_id:         String,
  pub email:             String,
  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub status:            ContactStatus,
  pub source:            Option<ContactSource>,
  pub source_product_id: Option<Uuid>,
  pub source_course_id:  Option<Uuid>,
  pub customer_id:       Option<Uuid>,
  pub engagement_score:  u8,
  pub custom_fields:     CustomFields,
}

impl NewContact {
  /// Convenience constructor: a subscribed contact with empty history.
  pub fn new(tenant_id: impl Into<String>, email: impl Into<String>) -> Self {
    Self {
      tenant_id:         tenant_id.into(),
      email:             email.into(),
      first_name:        None,
      last_name:         None,
      status:            ContactStatus::Subscribed,
      source:            None,
      source_product_id: None,
      source_course_id:  None,
      customer_id:       None,
      engagement_score:  0,
      custom_fields:     CustomFields::default(),
    }
  }
}
