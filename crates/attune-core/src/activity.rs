//! Contact activity — the append-only audit trail.
//!
//! One row per business event per contact. Rows are never mutated; the
//! store only ever inserts and reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// What kind of event an activity row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
  Subscribed,
  EmailOpened,
  EmailClicked,
  EmailBounced,
  CustomFieldUpdated,
  CampaignEnrolled,
}

impl ActivityType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Subscribed => "subscribed",
      Self::EmailOpened => "email_opened",
      Self::EmailClicked => "email_clicked",
      Self::EmailBounced => "email_bounced",
      Self::CustomFieldUpdated => "custom_field_updated",
      Self::CampaignEnrolled => "campaign_enrolled",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "subscribed" => Ok(Self::Subscribed),
      "email_opened" => Ok(Self::EmailOpened),
      "email_clicked" => Ok(Self::EmailClicked),
      "email_bounced" => Ok(Self::EmailBounced),
      "custom_field_updated" => Ok(Self::CustomFieldUpdated),
      "campaign_enrolled" => Ok(Self::CampaignEnrolled),
      other => Err(Error::UnknownActivityType(other.to_owned())),
    }
  }
}

/// Event-specific detail. Each activity type fills the fields it has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMetadata {
  pub tag_name:      Option<String>,
  pub field_name:    Option<String>,
  pub new_value:     Option<String>,
  pub email_subject: Option<String>,
  pub link_clicked:  Option<String>,
}

/// An immutable audit-log row. Once written, no field ever changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactActivity {
  pub activity_id:   Uuid,
  pub contact_id:    Uuid,
  pub tenant_id:     String,
  pub activity_type: ActivityType,
  pub metadata:      ActivityMetadata,
  /// Server-assigned; never changes after creation.
  pub timestamp:     DateTime<Utc>,
}

/// Input to [`crate::store::AudienceStore::record_activity`].
/// The id and timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub contact_id:    Uuid,
  pub tenant_id:     String,
  pub activity_type: ActivityType,
  pub metadata:      ActivityMetadata,
}
