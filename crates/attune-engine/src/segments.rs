//! Segmentation queries and prebuilt segment templates.

use attune_core::{store::AudienceStore, tag::NewTag};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Templates ───────────────────────────────────────────────────────────────

/// A reusable audience definition backed by a single tag.
#[derive(Debug, Clone, Copy)]
pub struct SegmentTemplate {
  pub name:        &'static str,
  pub description: &'static str,
  pub tag_pattern: &'static str,
  pub color:       &'static str,
}

/// The stock segments every tenant gets on setup. Immutable configuration
/// data; colors and descriptions are used verbatim when the backing tag
/// is first created.
pub const PREBUILT_SEGMENT_TEMPLATES: &[SegmentTemplate] = &[
  SegmentTemplate {
    name:        "Hot Leads",
    description: "Highly engaged contacts (score >= 80)",
    tag_pattern: "engagement:hot",
    color:       "#EF4444",
  },
  SegmentTemplate {
    name:        "Warm Leads",
    description: "Moderately engaged contacts (score >= 50)",
    tag_pattern: "engagement:warm",
    color:       "#F59E0B",
  },
  SegmentTemplate {
    name:        "Customers",
    description: "Contacts who have made a purchase",
    tag_pattern: "customer",
    color:       "#10B981",
  },
  SegmentTemplate {
    name:        "Beginners",
    description: "Contacts interested in beginner content",
    tag_pattern: "skill:beginner",
    color:       "#3B82F6",
  },
  SegmentTemplate {
    name:        "Intermediate",
    description: "Contacts interested in intermediate content",
    tag_pattern: "skill:intermediate",
    color:       "#6366F1",
  },
  SegmentTemplate {
    name:        "Advanced",
    description: "Contacts interested in advanced content",
    tag_pattern: "skill:advanced",
    color:       "#8B5CF6",
  },
  SegmentTemplate {
    name:        "Techno Producers",
    description: "Contacts interested in techno music",
    tag_pattern: "genre:techno",
    color:       "#EC4899",
  },
  SegmentTemplate {
    name:        "Hip-Hop Producers",
    description: "Contacts interested in hip-hop music",
    tag_pattern: "genre:hip-hop",
    color:       "#14B8A6",
  },
  SegmentTemplate {
    name:        "House Producers",
    description: "Contacts interested in house music",
    tag_pattern: "genre:house",
    color:       "#F97316",
  },
  SegmentTemplate {
    name:        "EDM Producers",
    description: "Contacts interested in EDM",
    tag_pattern: "genre:edm",
    color:       "#A855F7",
  },
  SegmentTemplate {
    name:        "Sample Collectors",
    description: "Contacts interested in samples",
    tag_pattern: "interest:samples",
    color:       "#06B6D4",
  },
  SegmentTemplate {
    name:        "Preset Hunters",
    description: "Contacts interested in presets",
    tag_pattern: "interest:presets",
    color:       "#84CC16",
  },
  SegmentTemplate {
    name:        "Course Students",
    description: "Contacts interested in learning",
    tag_pattern: "interest:learning",
    color:       "#0EA5E9",
  },
  SegmentTemplate {
    name:        "Mixing Enthusiasts",
    description: "Contacts interested in mixing",
    tag_pattern: "interest:mixing",
    color:       "#D946EF",
  },
];

// ─── Setup ───────────────────────────────────────────────────────────────────

/// One named segment and the tag that backs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRef {
  pub name:   String,
  pub tag_id: Uuid,
}

/// Outcome of [`create_prebuilt_segments`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSetupResult {
  pub created:  u32,
  pub skipped:  u32,
  pub segments: Vec<SegmentRef>,
}

/// Ensure every prebuilt template's backing tag exists for this tenant.
///
/// Re-running is a no-op for already-created tags: they are returned as
/// `skipped` with their existing ids, counts untouched.
pub async fn create_prebuilt_segments<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
) -> Result<SegmentSetupResult> {
  let mut created = 0;
  let mut skipped = 0;
  let mut segments = Vec::with_capacity(PREBUILT_SEGMENT_TEMPLATES.len());

  for template in PREBUILT_SEGMENT_TEMPLATES {
    if let Some(tag) = store
      .find_tag(tenant_id, template.tag_pattern)
      .await
      .map_err(Error::store)?
    {
      segments.push(SegmentRef {
        name:   template.name.to_owned(),
        tag_id: tag.tag_id,
      });
      skipped += 1;
      continue;
    }

    let tag = store
      .insert_tag_if_absent(NewTag {
        tenant_id:   tenant_id.to_owned(),
        name:        template.tag_pattern.to_owned(),
        color:       template.color.to_owned(),
        description: Some(template.description.to_owned()),
      })
      .await
      .map_err(Error::store)?;

    segments.push(SegmentRef {
      name:   template.name.to_owned(),
      tag_id: tag.tag_id,
    });
    created += 1;
  }

  Ok(SegmentSetupResult { created, skipped, segments })
}

// ─── Summaries ───────────────────────────────────────────────────────────────

/// A tag viewed as a segment: display name resolved through the template
/// table when the tag backs a prebuilt segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSummary {
  pub tag_id:        Uuid,
  pub tag_name:      String,
  pub display_name:  String,
  pub description:   Option<String>,
  pub color:         String,
  pub contact_count: u64,
}

/// Every tag for the tenant, as segment summaries.
pub async fn get_segments_by_tag<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
) -> Result<Vec<SegmentSummary>> {
  let tags = store.list_tags(tenant_id).await.map_err(Error::store)?;

  Ok(
    tags
      .into_iter()
      .map(|tag| {
        let display_name = PREBUILT_SEGMENT_TEMPLATES
          .iter()
          .find(|t| t.tag_pattern == tag.name)
          .map(|t| t.name.to_owned())
          .unwrap_or_else(|| tag.name.clone());
        SegmentSummary {
          tag_id: tag.tag_id,
          tag_name: tag.name,
          display_name,
          description: tag.description,
          color: tag.color,
          contact_count: tag.contact_count,
        }
      })
      .collect(),
  )
}

// ─── Audience queries ────────────────────────────────────────────────────────

/// How requested tag ids combine in [`get_contacts_by_tags`].
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMatchMode {
  /// Every requested tag must be present.
  #[default]
  All,
  /// At least one requested tag must be present.
  Any,
}

/// The truncated projection audience queries return — not the full
/// contact record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentContact {
  pub contact_id:       Uuid,
  pub email:            String,
  pub name:             Option<String>,
  pub engagement_score: u8,
}

/// Upper bound on how many subscribed contacts one audience query loads.
const SEGMENT_SCAN_LIMIT: usize = 5000;

const DEFAULT_SEGMENT_LIMIT: usize = 1000;

/// Materialise an audience: subscribed contacts matching `tag_ids` under
/// `mode`, minus anyone holding an excluded tag.
///
/// An empty `tag_ids` list matches everyone (after exclusion filtering).
pub async fn get_contacts_by_tags<S: AudienceStore>(
  store: &S,
  tenant_id: &str,
  tag_ids: &[Uuid],
  mode: SegmentMatchMode,
  exclude_tag_ids: &[Uuid],
  limit: Option<usize>,
) -> Result<Vec<SegmentContact>> {
  let limit = limit.unwrap_or(DEFAULT_SEGMENT_LIMIT);
  let contacts = store
    .list_subscribed_contacts(tenant_id, SEGMENT_SCAN_LIMIT)
    .await
    .map_err(Error::store)?;

  Ok(
    contacts
      .into_iter()
      .filter(|contact| {
        if exclude_tag_ids.iter().any(|ex| contact.tag_ids.contains(ex)) {
          return false;
        }
        if tag_ids.is_empty() {
          return true;
        }
        match mode {
          SegmentMatchMode::All => {
            tag_ids.iter().all(|t| contact.tag_ids.contains(t))
          }
          SegmentMatchMode::Any => {
            tag_ids.iter().any(|t| contact.tag_ids.contains(t))
          }
        }
      })
      .take(limit)
      .map(|contact| {
        let name = contact.display_name();
        SegmentContact {
          contact_id: contact.contact_id,
          email: contact.email,
          name,
          engagement_score: contact.engagement_score,
        }
      })
      .collect(),
  )
}
