//! Catalog records — the commerce source-of-truth the tagger reads.
//!
//! Products, courses, customers, purchases, enrollments, and platform
//! users are written by the surrounding platform and mirrored into the
//! audience store; the tagging engine only reads them to derive tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Product ─────────────────────────────────────────────────────────────────

/// The commercial format of a digital product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
  SamplePack,
  PresetPack,
  MidiPack,
  BeatLease,
  EffectChain,
  Coaching,
  Course,
  Pdf,
  Service,
}

impl ProductType {
  /// The string stored in the `product_type` column.
  /// Must match the `rename_all = "kebab-case"` serde tags above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::SamplePack => "sample-pack",
      Self::PresetPack => "preset-pack",
      Self::MidiPack => "midi-pack",
      Self::BeatLease => "beat-lease",
      Self::EffectChain => "effect-chain",
      Self::Coaching => "coaching",
      Self::Course => "course",
      Self::Pdf => "pdf",
      Self::Service => "service",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "sample-pack" => Ok(Self::SamplePack),
      "preset-pack" => Ok(Self::PresetPack),
      "midi-pack" => Ok(Self::MidiPack),
      "beat-lease" => Ok(Self::BeatLease),
      "effect-chain" => Ok(Self::EffectChain),
      "coaching" => Ok(Self::Coaching),
      "course" => Ok(Self::Course),
      "pdf" => Ok(Self::Pdf),
      "service" => Ok(Self::Service),
      other => Err(Error::UnknownProductType(other.to_owned())),
    }
  }

  /// The interest tag a product of this type contributes to its buyers
  /// and followers, e.g. `interest:samples` for a sample pack.
  pub fn interest_tag(&self) -> &'static str {
    match self {
      Self::SamplePack => "interest:samples",
      Self::PresetPack => "interest:presets",
      Self::MidiPack => "interest:midi",
      Self::BeatLease => "interest:beats",
      Self::EffectChain => "interest:mixing",
      Self::Coaching => "interest:coaching",
      Self::Course => "interest:learning",
      Self::Pdf => "interest:guides",
      Self::Service => "interest:services",
    }
  }
}

/// A digital product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
  pub product_id:       Uuid,
  pub tenant_id:        String,
  pub title:            String,
  pub description:      Option<String>,
  pub product_type:     Option<ProductType>,
  /// Secondary categorisation; consulted for an extra interest tag when
  /// it maps to a known type.
  pub product_category: Option<ProductType>,
  /// Free-text genre labels entered by the creator.
  pub genres:           Vec<String>,
}

// ─── Course ──────────────────────────────────────────────────────────────────

/// Declared difficulty of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
  Beginner,
  Intermediate,
  Advanced,
}

impl SkillLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Beginner => "beginner",
      Self::Intermediate => "intermediate",
      Self::Advanced => "advanced",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "beginner" => Ok(Self::Beginner),
      "intermediate" => Ok(Self::Intermediate),
      "advanced" => Ok(Self::Advanced),
      other => Err(Error::UnknownSkillLevel(other.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
  pub course_id:   Uuid,
  pub tenant_id:   String,
  pub title:       String,
  pub description: Option<String>,
  pub category:    Option<String>,
  pub skill_level: Option<SkillLevel>,
  /// Creator-chosen URL slug; when absent, tag slugs are generated from
  /// the title.
  pub slug:        Option<String>,
}

// ─── Commerce records ────────────────────────────────────────────────────────

/// A paying customer of one tenant's storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
  pub customer_id: Uuid,
  pub tenant_id:   String,
  pub email:       String,
  pub user_id:     Option<String>,
}

/// One completed purchase. Exactly one of `product_id` / `course_id` is
/// normally set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
  pub purchase_id: Uuid,
  pub customer_id: Uuid,
  pub product_id:  Option<Uuid>,
  pub course_id:   Option<Uuid>,
  pub amount:      f64,
  pub created_at:  DateTime<Utc>,
}

/// One user's enrollment in one course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
  pub enrollment_id: Uuid,
  pub course_id:     Uuid,
  pub user_id:       String,
  pub enrolled_at:   DateTime<Utc>,
}

/// A platform account, used to resolve enrollments back to an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id: String,
  pub email:   Option<String>,
  pub name:    Option<String>,
}
