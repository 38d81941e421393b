//! Integration tests for the tagging engine against an in-memory SQLite
//! store.

use attune_core::{
  activity::ActivityType,
  catalog::{Course, Customer, Enrollment, Product, ProductType, Purchase, SkillLevel, User},
  contact::{ContactSource, ContactStatus, NewContact},
  store::AudienceStore,
};
use attune_store_sqlite::SqliteStore;
use chrono::Utc;
use uuid::Uuid;

use crate::{
  Error, jobs, segments,
  segments::SegmentMatchMode,
  sync::{
    self, EngagementEvent, EngagementKind, EnrollmentEvent, FollowGateEvent,
    PurchaseEvent,
  },
  tags,
};

const TENANT: &str = "store-1";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn product(
  title: &str,
  product_type: Option<ProductType>,
  genres: &[&str],
) -> Product {
  Product {
    product_id:       Uuid::new_v4(),
    tenant_id:        TENANT.to_owned(),
    title:            title.to_owned(),
    description:      None,
    product_type,
    product_category: None,
    genres:           genres.iter().map(|g| g.to_string()).collect(),
  }
}

fn course(
  title: &str,
  skill_level: Option<SkillLevel>,
  category: Option<&str>,
) -> Course {
  Course {
    course_id: Uuid::new_v4(),
    tenant_id: TENANT.to_owned(),
    title: title.to_owned(),
    description: None,
    category: category.map(str::to_owned),
    skill_level,
    slug: None,
  }
}

fn follow_gate(email: &str, product_id: Uuid) -> FollowGateEvent {
  FollowGateEvent {
    tenant_id: TENANT.to_owned(),
    email: email.to_owned(),
    name: None,
    product_id,
  }
}

fn engagement(email: &str, kind: EngagementKind) -> EngagementEvent {
  EngagementEvent {
    tenant_id:     TENANT.to_owned(),
    email:         email.to_owned(),
    kind,
    link_url:      None,
    email_subject: None,
  }
}

async fn tag_names_of(s: &SqliteStore, contact_id: Uuid) -> Vec<String> {
  let contact = s.get_contact(contact_id).await.unwrap().unwrap();
  let mut names = Vec::new();
  for tag_id in contact.tag_ids {
    names.push(s.get_tag(tag_id).await.unwrap().unwrap().name);
  }
  names
}

// ─── Tag application ─────────────────────────────────────────────────────────

#[tokio::test]
async fn tag_application_is_idempotent() {
  let s = store().await;
  let contact = s
    .insert_contact(NewContact::new(TENANT, "a@example.com"))
    .await
    .unwrap();

  let wanted = vec!["genre:techno".to_owned()];
  let first =
    tags::add_tags_to_contact(&s, contact.contact_id, TENANT, &wanted)
      .await
      .unwrap();
  let second =
    tags::add_tags_to_contact(&s, contact.contact_id, TENANT, &wanted)
      .await
      .unwrap();

  assert_eq!(first, vec!["genre:techno"]);
  assert!(second.is_empty());

  let contact = s.get_contact(contact.contact_id).await.unwrap().unwrap();
  assert_eq!(contact.tag_ids.len(), 1);

  let tag = s.find_tag(TENANT, "genre:techno").await.unwrap().unwrap();
  assert_eq!(tag.contact_count, 1);
}

#[tokio::test]
async fn get_or_create_tag_is_stable() {
  let s = store().await;

  let first = tags::get_or_create_tag(&s, TENANT, "interest:samples")
    .await
    .unwrap();
  let second = tags::get_or_create_tag(&s, TENANT, "interest:samples")
    .await
    .unwrap();

  assert_eq!(first.tag_id, second.tag_id);
  assert_eq!(s.list_tags(TENANT).await.unwrap().len(), 1);
  assert_eq!(first.color, "#3B82F6");
}

#[tokio::test]
async fn same_tag_name_is_scoped_per_tenant() {
  let s = store().await;

  let a = tags::get_or_create_tag(&s, "store-1", "customer").await.unwrap();
  let b = tags::get_or_create_tag(&s, "store-2", "customer").await.unwrap();
  assert_ne!(a.tag_id, b.tag_id);
}

// ─── Follow gate ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn follow_gate_creates_contact_with_tags_and_activity() {
  let s = store().await;
  let pack = product(
    "Dark Techno Essentials",
    Some(ProductType::SamplePack),
    &["techno"],
  );
  let product_id = pack.product_id;
  s.insert_product(pack).await.unwrap();

  let result =
    sync::sync_contact_from_follow_gate(&s, &follow_gate("new@x.com", product_id))
      .await
      .unwrap();

  assert!(result.created);
  assert_eq!(
    result.tags_added,
    vec!["interest:samples", "genre:techno", "source:follow-gate"]
  );

  let contact = s
    .find_contact_by_email(TENANT, "new@x.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(contact.source, Some(ContactSource::FollowGate));
  assert_eq!(contact.source_product_id, Some(product_id));
  assert_eq!(contact.custom_fields.follow_gate_products, vec![product_id]);
  assert_eq!(
    tag_names_of(&s, contact.contact_id).await,
    vec!["interest:samples", "genre:techno", "source:follow-gate"]
  );

  let activity =
    s.list_activity_for_contact(contact.contact_id).await.unwrap();
  assert_eq!(activity.len(), 1);
  assert_eq!(activity[0].activity_type, ActivityType::Subscribed);
  assert_eq!(
    activity[0].metadata.tag_name.as_deref(),
    Some("Follow gate: Dark Techno Essentials")
  );
}

#[tokio::test]
async fn follow_gate_lowercases_email_identity() {
  let s = store().await;
  let pack = product("Loops", Some(ProductType::SamplePack), &[]);
  let product_id = pack.product_id;
  s.insert_product(pack).await.unwrap();

  let first =
    sync::sync_contact_from_follow_gate(&s, &follow_gate("Mixed@X.com", product_id))
      .await
      .unwrap();
  let second =
    sync::sync_contact_from_follow_gate(&s, &follow_gate("mixed@x.com", product_id))
      .await
      .unwrap();

  assert!(first.created);
  assert!(!second.created);
  assert_eq!(first.contact_id, second.contact_id);
}

#[tokio::test]
async fn follow_gate_fills_name_only_when_absent() {
  let s = store().await;
  let pack = product("Loops", None, &[]);
  let product_id = pack.product_id;
  s.insert_product(pack).await.unwrap();

  let mut event = follow_gate("n@x.com", product_id);
  event.name = Some("Ada Lovelace King".to_owned());
  sync::sync_contact_from_follow_gate(&s, &event).await.unwrap();

  let contact =
    s.find_contact_by_email(TENANT, "n@x.com").await.unwrap().unwrap();
  assert_eq!(contact.first_name.as_deref(), Some("Ada"));
  assert_eq!(contact.last_name.as_deref(), Some("Lovelace King"));

  // A later capture with a different name must not overwrite.
  let mut event = follow_gate("n@x.com", product_id);
  event.name = Some("Someone Else".to_owned());
  sync::sync_contact_from_follow_gate(&s, &event).await.unwrap();

  let contact =
    s.find_contact_by_email(TENANT, "n@x.com").await.unwrap().unwrap();
  assert_eq!(contact.first_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn follow_gate_missing_product_is_a_hard_error() {
  let s = store().await;
  let err =
    sync::sync_contact_from_follow_gate(&s, &follow_gate("x@x.com", Uuid::new_v4()))
      .await
      .unwrap_err();
  assert!(matches!(err, Error::ProductNotFound(_)));

  // The event aborted before any contact was written.
  assert!(
    s.find_contact_by_email(TENANT, "x@x.com")
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Purchase ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn course_purchase_tags_points_and_score() {
  let s = store().await;
  let masterclass =
    course("Mixing Masterclass", Some(SkillLevel::Advanced), None);
  let course_id = masterclass.course_id;
  s.insert_course(masterclass).await.unwrap();

  // Existing contact, zero score, zero points.
  s.insert_contact(NewContact::new(TENANT, "buyer@x.com"))
    .await
    .unwrap();

  let result = sync::sync_contact_from_purchase(&s, &PurchaseEvent {
    tenant_id:  TENANT.to_owned(),
    email:      "buyer@x.com".to_owned(),
    user_id:    None,
    product_id: None,
    course_id:  Some(course_id),
    amount:     49.0,
  })
  .await
  .unwrap();

  assert!(!result.created);
  assert_eq!(
    result.tags_added,
    vec![
      "customer",
      "course:mixing-masterclass",
      "interest:learning",
      "skill:advanced"
    ]
  );

  let contact = s
    .find_contact_by_email(TENANT, "buyer@x.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(contact.custom_fields.total_points, 49);
  assert_eq!(contact.custom_fields.purchase_points, 49);
  assert_eq!(contact.engagement_score, 20);
  assert_eq!(contact.custom_fields.purchases.len(), 1);
  assert_eq!(contact.custom_fields.purchases[0].course_id, Some(course_id));
}

#[tokio::test]
async fn product_purchase_slug_and_interest_tags() {
  let s = store().await;
  let pack = product(
    "Epic Drums Vol. 1!",
    Some(ProductType::SamplePack),
    &["trap"],
  );
  let product_id = pack.product_id;
  s.insert_product(pack).await.unwrap();

  let result = sync::sync_contact_from_purchase(&s, &PurchaseEvent {
    tenant_id:  TENANT.to_owned(),
    email:      "d@x.com".to_owned(),
    user_id:    None,
    product_id: Some(product_id),
    course_id:  None,
    amount:     29.99,
  })
  .await
  .unwrap();

  assert!(result.created);
  assert_eq!(
    result.tags_added,
    vec![
      "customer",
      "product:epic-drums-vol-1",
      "interest:samples",
      "genre:hip-hop",
      "genre:trap"
    ]
  );

  let contact =
    s.find_contact_by_email(TENANT, "d@x.com").await.unwrap().unwrap();
  // floor(29.99) = 29; new customers start at score 20.
  assert_eq!(contact.custom_fields.total_points, 29);
  assert_eq!(contact.engagement_score, 20);
  assert_eq!(contact.source, Some(ContactSource::Purchase));
  assert_eq!(contact.source_product_id, Some(product_id));
}

#[tokio::test]
async fn purchase_preserves_first_touch_attribution() {
  let s = store().await;
  let gate = product("Freebie Loops", Some(ProductType::SamplePack), &[]);
  let gate_id = gate.product_id;
  s.insert_product(gate).await.unwrap();
  let paid = product("Paid Pack", Some(ProductType::SamplePack), &[]);
  let paid_id = paid.product_id;
  s.insert_product(paid).await.unwrap();

  sync::sync_contact_from_follow_gate(&s, &follow_gate("ft@x.com", gate_id))
    .await
    .unwrap();

  sync::sync_contact_from_purchase(&s, &PurchaseEvent {
    tenant_id:  TENANT.to_owned(),
    email:      "ft@x.com".to_owned(),
    user_id:    None,
    product_id: Some(paid_id),
    course_id:  None,
    amount:     10.0,
  })
  .await
  .unwrap();

  let contact =
    s.find_contact_by_email(TENANT, "ft@x.com").await.unwrap().unwrap();
  assert_eq!(contact.source_product_id, Some(gate_id));
  assert_eq!(contact.source, Some(ContactSource::FollowGate));
}

#[tokio::test]
async fn purchase_with_dangling_product_still_tags_customer() {
  let s = store().await;

  let result = sync::sync_contact_from_purchase(&s, &PurchaseEvent {
    tenant_id:  TENANT.to_owned(),
    email:      "gone@x.com".to_owned(),
    user_id:    None,
    product_id: Some(Uuid::new_v4()),
    course_id:  None,
    amount:     5.0,
  })
  .await
  .unwrap();

  assert_eq!(result.tags_added, vec!["customer"]);
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn enrollment_tags_and_skill_level_tracking() {
  let s = store().await;
  let beats =
    course("Beat Making 101", Some(SkillLevel::Beginner), Some("Sound Design"));
  let course_id = beats.course_id;
  s.insert_course(beats).await.unwrap();

  let event = EnrollmentEvent {
    tenant_id: TENANT.to_owned(),
    email:     "st@x.com".to_owned(),
    user_id:   "user-1".to_owned(),
    course_id,
  };
  let result =
    sync::sync_contact_from_enrollment(&s, &event).await.unwrap();

  assert!(result.created);
  assert!(result.skill_level_updated);
  assert_eq!(
    result.tags_added,
    vec![
      "interest:learning",
      "student",
      "course:beat-making-101",
      "skill:beginner",
      "category:sound-design"
    ]
  );

  let contact =
    s.find_contact_by_email(TENANT, "st@x.com").await.unwrap().unwrap();
  assert_eq!(
    contact.custom_fields.student_level,
    Some(SkillLevel::Beginner)
  );
  assert_eq!(contact.custom_fields.enrolled_courses, vec![course_id]);
  assert_eq!(contact.source_course_id, Some(course_id));

  let activity =
    s.list_activity_for_contact(contact.contact_id).await.unwrap();
  assert_eq!(activity.len(), 1);
  assert_eq!(activity[0].activity_type, ActivityType::CampaignEnrolled);

  // Enrolling again in the same level is not a level change.
  let result =
    sync::sync_contact_from_enrollment(&s, &event).await.unwrap();
  assert!(!result.created);
  assert!(!result.skill_level_updated);
}

#[tokio::test]
async fn enrollment_prefers_declared_course_slug() {
  let s = store().await;
  let mut advanced = course("Advanced Mixing", Some(SkillLevel::Advanced), None);
  advanced.slug = Some("mixing-deep-dive".to_owned());
  let course_id = advanced.course_id;
  s.insert_course(advanced).await.unwrap();

  let result = sync::sync_contact_from_enrollment(&s, &EnrollmentEvent {
    tenant_id: TENANT.to_owned(),
    email:     "adv@x.com".to_owned(),
    user_id:   "user-2".to_owned(),
    course_id,
  })
  .await
  .unwrap();

  assert!(result.tags_added.contains(&"course:mixing-deep-dive".to_owned()));
}

#[tokio::test]
async fn enrollment_missing_course_is_a_hard_error() {
  let s = store().await;
  let err = sync::sync_contact_from_enrollment(&s, &EnrollmentEvent {
    tenant_id: TENANT.to_owned(),
    email:     "st@x.com".to_owned(),
    user_id:   "user-1".to_owned(),
    course_id: Uuid::new_v4(),
  })
  .await
  .unwrap_err();
  assert!(matches!(err, Error::CourseNotFound(_)));
}

// ─── Engagement ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn engagement_never_creates_contacts() {
  let s = store().await;

  let result =
    sync::sync_contact_engagement(&s, &engagement("ghost@x.com", EngagementKind::Opened))
      .await
      .unwrap();

  assert_eq!(result.contact_id, None);
  assert!(result.tags_added.is_empty());
  assert!(
    s.find_contact_by_email(TENANT, "ghost@x.com")
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn engagement_score_clamps_at_100() {
  let s = store().await;
  let mut input = NewContact::new(TENANT, "hot@x.com");
  input.engagement_score = 95;
  s.insert_contact(input).await.unwrap();

  for _ in 0..4 {
    sync::sync_contact_engagement(&s, &engagement("hot@x.com", EngagementKind::Opened))
      .await
      .unwrap();
  }

  let contact =
    s.find_contact_by_email(TENANT, "hot@x.com").await.unwrap().unwrap();
  assert_eq!(contact.engagement_score, 100);
  assert_eq!(contact.emails_opened, 4);
  assert_eq!(contact.custom_fields.total_points, 20);
}

#[tokio::test]
async fn engagement_score_floors_at_0_and_sets_bounced() {
  let s = store().await;
  let mut input = NewContact::new(TENANT, "b@x.com");
  input.engagement_score = 5;
  s.insert_contact(input).await.unwrap();

  for _ in 0..2 {
    sync::sync_contact_engagement(&s, &engagement("b@x.com", EngagementKind::Bounced))
      .await
      .unwrap();
  }

  let contact =
    s.find_contact_by_email(TENANT, "b@x.com").await.unwrap().unwrap();
  assert_eq!(contact.engagement_score, 0);
  assert_eq!(contact.status, ContactStatus::Bounced);
}

#[tokio::test]
async fn engagement_click_fuses_link_interest_tags() {
  let s = store().await;
  s.insert_contact(NewContact::new(TENANT, "c@x.com")).await.unwrap();

  let mut event = engagement("c@x.com", EngagementKind::Clicked);
  event.link_url = Some("https://shop.example/sample-loops".to_owned());
  let result = sync::sync_contact_engagement(&s, &event).await.unwrap();

  assert_eq!(result.tags_added, vec!["interest:samples"]);

  let contact =
    s.find_contact_by_email(TENANT, "c@x.com").await.unwrap().unwrap();
  assert_eq!(contact.emails_clicked, 1);
  assert_eq!(contact.custom_fields.total_points, 10);
}

#[tokio::test]
async fn engagement_thresholds_use_post_update_score() {
  let s = store().await;
  let mut input = NewContact::new(TENANT, "warm@x.com");
  input.engagement_score = 48;
  s.insert_contact(input).await.unwrap();

  // 48 + 2 = 50: warm, not hot.
  let result =
    sync::sync_contact_engagement(&s, &engagement("warm@x.com", EngagementKind::Opened))
      .await
      .unwrap();
  assert_eq!(result.tags_added, vec!["engagement:warm"]);

  let mut input = NewContact::new(TENANT, "hot2@x.com");
  input.engagement_score = 78;
  s.insert_contact(input).await.unwrap();

  // 78 + 2 = 80: hot only.
  let result =
    sync::sync_contact_engagement(&s, &engagement("hot2@x.com", EngagementKind::Opened))
      .await
      .unwrap();
  assert_eq!(result.tags_added, vec!["engagement:hot"]);
}

// ─── Manual tagging ──────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_tag_contact_is_soft_for_unknown_email() {
  let s = store().await;
  let result = sync::manual_tag_contact(
    &s,
    TENANT,
    "nobody@x.com",
    &["vip".to_owned()],
  )
  .await
  .unwrap();
  assert_eq!(result.contact_id, None);
}

#[tokio::test]
async fn manual_tag_contact_applies_given_names() {
  let s = store().await;
  let contact =
    s.insert_contact(NewContact::new(TENANT, "vip@x.com")).await.unwrap();

  let result = sync::manual_tag_contact(
    &s,
    TENANT,
    "vip@x.com",
    &["vip".to_owned(), "genre:techno".to_owned()],
  )
  .await
  .unwrap();

  assert_eq!(result.contact_id, Some(contact.contact_id));
  assert_eq!(
    tag_names_of(&s, contact.contact_id).await,
    vec!["vip", "genre:techno"]
  );
}

// ─── Segmentation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn segment_match_modes_and_exclusions() {
  let s = store().await;
  let tag_a = tags::get_or_create_tag(&s, TENANT, "genre:techno")
    .await
    .unwrap()
    .tag_id;
  let tag_b = tags::get_or_create_tag(&s, TENANT, "customer")
    .await
    .unwrap()
    .tag_id;

  let c1 = s.insert_contact(NewContact::new(TENANT, "c1@x.com")).await.unwrap();
  let c2 = s.insert_contact(NewContact::new(TENANT, "c2@x.com")).await.unwrap();
  let c3 = s.insert_contact(NewContact::new(TENANT, "c3@x.com")).await.unwrap();

  tags::add_tags_to_contact(
    &s,
    c1.contact_id,
    TENANT,
    &["genre:techno".to_owned(), "customer".to_owned()],
  )
  .await
  .unwrap();
  tags::add_tags_to_contact(&s, c2.contact_id, TENANT, &["genre:techno".to_owned()])
    .await
    .unwrap();
  tags::add_tags_to_contact(&s, c3.contact_id, TENANT, &["customer".to_owned()])
    .await
    .unwrap();

  let all = segments::get_contacts_by_tags(
    &s,
    TENANT,
    &[tag_a, tag_b],
    SegmentMatchMode::All,
    &[],
    None,
  )
  .await
  .unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].email, "c1@x.com");

  let any = segments::get_contacts_by_tags(
    &s,
    TENANT,
    &[tag_a, tag_b],
    SegmentMatchMode::Any,
    &[],
    None,
  )
  .await
  .unwrap();
  assert_eq!(any.len(), 3);

  // Excluding tag_b drops c1 and c3 even though they match.
  let excluded = segments::get_contacts_by_tags(
    &s,
    TENANT,
    &[tag_a, tag_b],
    SegmentMatchMode::Any,
    &[tag_b],
    None,
  )
  .await
  .unwrap();
  assert_eq!(excluded.len(), 1);
  assert_eq!(excluded[0].email, "c2@x.com");

  // An empty tag list matches everyone after exclusions.
  let everyone = segments::get_contacts_by_tags(
    &s,
    TENANT,
    &[],
    SegmentMatchMode::All,
    &[tag_b],
    None,
  )
  .await
  .unwrap();
  assert_eq!(everyone.len(), 1);
}

#[tokio::test]
async fn segments_only_cover_subscribed_contacts() {
  let s = store().await;
  s.insert_contact(NewContact::new(TENANT, "ok@x.com")).await.unwrap();
  let mut bounced = s
    .insert_contact(NewContact::new(TENANT, "lost@x.com"))
    .await
    .unwrap();
  bounced.status = ContactStatus::Bounced;
  s.update_contact(&bounced).await.unwrap();

  let everyone = segments::get_contacts_by_tags(
    &s,
    TENANT,
    &[],
    SegmentMatchMode::All,
    &[],
    None,
  )
  .await
  .unwrap();
  assert_eq!(everyone.len(), 1);
  assert_eq!(everyone[0].email, "ok@x.com");
}

#[tokio::test]
async fn prebuilt_segments_setup_is_idempotent() {
  let s = store().await;

  let first = segments::create_prebuilt_segments(&s, TENANT).await.unwrap();
  assert_eq!(first.created, 14);
  assert_eq!(first.skipped, 0);
  assert_eq!(first.segments.len(), 14);

  let second = segments::create_prebuilt_segments(&s, TENANT).await.unwrap();
  assert_eq!(second.created, 0);
  assert_eq!(second.skipped, 14);

  // Same backing tags both times.
  assert_eq!(
    first
      .segments
      .iter()
      .map(|seg| seg.tag_id)
      .collect::<Vec<_>>(),
    second
      .segments
      .iter()
      .map(|seg| seg.tag_id)
      .collect::<Vec<_>>()
  );

  // Prebuilt tags start with zero holders.
  let hot = s.find_tag(TENANT, "engagement:hot").await.unwrap().unwrap();
  assert_eq!(hot.contact_count, 0);
  assert_eq!(hot.color, "#EF4444");
}

#[tokio::test]
async fn segment_summaries_resolve_template_display_names() {
  let s = store().await;
  segments::create_prebuilt_segments(&s, TENANT).await.unwrap();
  tags::get_or_create_tag(&s, TENANT, "genre:trap").await.unwrap();

  let summaries = segments::get_segments_by_tag(&s, TENANT).await.unwrap();

  let hot = summaries
    .iter()
    .find(|seg| seg.tag_name == "engagement:hot")
    .unwrap();
  assert_eq!(hot.display_name, "Hot Leads");

  let trap = summaries
    .iter()
    .find(|seg| seg.tag_name == "genre:trap")
    .unwrap();
  assert_eq!(trap.display_name, "genre:trap");
}

// ─── Batch jobs ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn retag_all_contacts_pages_exactly_once_over_everyone() {
  let s = store().await;
  for i in 0..7 {
    let mut input = NewContact::new(TENANT, format!("c{i}@x.com"));
    input.source = Some(ContactSource::Purchase);
    s.insert_contact(input).await.unwrap();
  }

  let mut processed = 0;
  let mut cursor = None;
  let mut pages = 0;
  loop {
    let result = jobs::retag_all_contacts(&s, TENANT, cursor, Some(3))
      .await
      .unwrap();
    processed += result.processed;
    assert_eq!(result.errors, 0);
    pages += 1;
    assert!(pages < 10, "job did not terminate");
    if result.done {
      break;
    }
    cursor = result.next_cursor;
  }

  assert_eq!(processed, 7);

  // Every purchase-sourced contact derived exactly one `customer` tag.
  let customer = s.find_tag(TENANT, "customer").await.unwrap().unwrap();
  assert_eq!(customer.contact_count, 7);

  // A second full run is a no-op for the index.
  let mut cursor = None;
  loop {
    let result = jobs::retag_all_contacts(&s, TENANT, cursor, Some(3))
      .await
      .unwrap();
    if result.done {
      break;
    }
    cursor = result.next_cursor;
  }
  let customer = s.find_tag(TENANT, "customer").await.unwrap().unwrap();
  assert_eq!(customer.contact_count, 7);
}

#[tokio::test]
async fn retag_derives_from_history_and_tolerates_dangling_refs() {
  let s = store().await;
  let theory = course("Music Theory", Some(SkillLevel::Beginner), None);
  let course_id = theory.course_id;
  s.insert_course(theory).await.unwrap();

  let mut input = NewContact::new(TENANT, "h@x.com");
  input.source = Some(ContactSource::FollowGate);
  // One real course, one deleted.
  input.custom_fields.enrolled_courses = vec![course_id, Uuid::new_v4()];
  s.insert_contact(input).await.unwrap();

  let result =
    jobs::retag_all_contacts(&s, TENANT, None, None).await.unwrap();
  assert_eq!(result.processed, 1);
  assert_eq!(result.errors, 0);
  assert!(result.done);

  let contact =
    s.find_contact_by_email(TENANT, "h@x.com").await.unwrap().unwrap();
  let names = tag_names_of(&s, contact.contact_id).await;
  assert!(names.contains(&"interest:learning".to_owned()));
  assert!(names.contains(&"student".to_owned()));
  assert!(names.contains(&"course:music-theory".to_owned()));
  assert!(names.contains(&"skill:beginner".to_owned()));
  // follow_gate source contributes `lead`.
  assert!(names.contains(&"lead".to_owned()));
}

#[tokio::test]
async fn retag_applies_engagement_threshold_tags() {
  let s = store().await;

  let mut cold = NewContact::new(TENANT, "cold@x.com");
  cold.engagement_score = 10;
  let mut cold = s.insert_contact(cold).await.unwrap();
  cold.emails_sent = 6;
  s.update_contact(&cold).await.unwrap();

  let mut hot = NewContact::new(TENANT, "hot@x.com");
  hot.engagement_score = 85;
  s.insert_contact(hot).await.unwrap();

  jobs::retag_all_contacts(&s, TENANT, None, None).await.unwrap();

  let cold = s.find_contact_by_email(TENANT, "cold@x.com").await.unwrap().unwrap();
  assert_eq!(
    tag_names_of(&s, cold.contact_id).await,
    vec!["engagement:cold"]
  );

  let hot = s.find_contact_by_email(TENANT, "hot@x.com").await.unwrap().unwrap();
  assert_eq!(tag_names_of(&s, hot.contact_id).await, vec!["engagement:hot"]);
}

#[tokio::test]
async fn retag_reads_customer_purchase_history() {
  let s = store().await;
  let pack = product("Festival EDM Kit", Some(ProductType::PresetPack), &["edm"]);
  let product_id = pack.product_id;
  s.insert_product(pack).await.unwrap();

  let customer_id = Uuid::new_v4();
  s.insert_customer(Customer {
    customer_id,
    tenant_id: TENANT.to_owned(),
    email: "buyer@x.com".to_owned(),
    user_id: None,
  })
  .await
  .unwrap();
  s.insert_purchase(Purchase {
    purchase_id: Uuid::new_v4(),
    customer_id,
    product_id: Some(product_id),
    course_id: None,
    amount: 30.0,
    created_at: Utc::now(),
  })
  .await
  .unwrap();

  let mut input = NewContact::new(TENANT, "buyer@x.com");
  input.customer_id = Some(customer_id);
  s.insert_contact(input).await.unwrap();

  jobs::retag_all_contacts(&s, TENANT, None, None).await.unwrap();

  let contact =
    s.find_contact_by_email(TENANT, "buyer@x.com").await.unwrap().unwrap();
  let names = tag_names_of(&s, contact.contact_id).await;
  assert!(names.contains(&"customer".to_owned()));
  assert!(names.contains(&"interest:presets".to_owned()));
  assert!(names.contains(&"genre:edm".to_owned()));
}

#[tokio::test]
async fn tag_enrolled_users_skips_unresolvable_users() {
  let s = store().await;
  let mixing = course("Mixing Fundamentals", Some(SkillLevel::Beginner), None);
  let course_id = mixing.course_id;
  s.insert_course(mixing).await.unwrap();

  // user-a resolves to an existing contact; user-b has no user record.
  s.insert_user(User {
    user_id: "user-a".to_owned(),
    email:   Some("a@x.com".to_owned()),
    name:    None,
  })
  .await
  .unwrap();
  s.insert_contact(NewContact::new(TENANT, "a@x.com")).await.unwrap();

  for user_id in ["user-a", "user-b"] {
    s.insert_enrollment(Enrollment {
      enrollment_id: Uuid::new_v4(),
      course_id,
      user_id: user_id.to_owned(),
      enrolled_at: Utc::now(),
    })
    .await
    .unwrap();
  }

  let result =
    jobs::tag_enrolled_users_with_course_tags(&s, TENANT, None, None)
      .await
      .unwrap();

  assert_eq!(result.processed, 1);
  assert_eq!(result.errors, 1);
  assert!(result.done);

  let contact =
    s.find_contact_by_email(TENANT, "a@x.com").await.unwrap().unwrap();
  let names = tag_names_of(&s, contact.contact_id).await;
  assert!(names.contains(&"student".to_owned()));
  assert!(names.contains(&"interest:learning".to_owned()));
  assert!(names.contains(&"course:mixing-fundamentals".to_owned()));
  assert!(names.contains(&"skill:beginner".to_owned()));

  // No contact was created for the unresolvable user.
  assert_eq!(s.list_contacts_page(TENANT, None, 10).await.unwrap().items.len(), 1);
}

#[tokio::test]
async fn tag_enrolled_users_ignores_other_tenants_courses() {
  let s = store().await;
  let mut foreign = course("Other Store Course", None, None);
  foreign.tenant_id = "store-2".to_owned();
  let course_id = foreign.course_id;
  s.insert_course(foreign).await.unwrap();
  s.insert_enrollment(Enrollment {
    enrollment_id: Uuid::new_v4(),
    course_id,
    user_id: "user-x".to_owned(),
    enrolled_at: Utc::now(),
  })
  .await
  .unwrap();

  let result =
    jobs::tag_enrolled_users_with_course_tags(&s, TENANT, None, None)
      .await
      .unwrap();
  assert_eq!(result.processed, 0);
  assert_eq!(result.errors, 0);
  assert!(result.done);
}

#[tokio::test]
async fn tag_product_purchasers_tags_existing_contacts() {
  let s = store().await;
  let pack = product("Epic Drums Vol. 1!", Some(ProductType::SamplePack), &[]);
  let product_id = pack.product_id;
  s.insert_product(pack).await.unwrap();

  // Two buyers; only the first has a contact.
  for (email, has_contact) in [("p1@x.com", true), ("p2@x.com", false)] {
    let customer_id = Uuid::new_v4();
    s.insert_customer(Customer {
      customer_id,
      tenant_id: TENANT.to_owned(),
      email: email.to_owned(),
      user_id: None,
    })
    .await
    .unwrap();
    s.insert_purchase(Purchase {
      purchase_id: Uuid::new_v4(),
      customer_id,
      product_id: Some(product_id),
      course_id: None,
      amount: 20.0,
      created_at: Utc::now(),
    })
    .await
    .unwrap();
    if has_contact {
      s.insert_contact(NewContact::new(TENANT, email)).await.unwrap();
    }
  }

  let result =
    jobs::tag_product_purchasers(&s, TENANT, product_id, None, None)
      .await
      .unwrap();

  assert_eq!(result.processed, 1);
  assert_eq!(result.errors, 1);
  assert!(result.done);

  let contact =
    s.find_contact_by_email(TENANT, "p1@x.com").await.unwrap().unwrap();
  let names = tag_names_of(&s, contact.contact_id).await;
  assert_eq!(
    names,
    vec!["customer", "product:epic-drums-vol-1", "interest:samples"]
  );
}

#[tokio::test]
async fn tag_product_purchasers_requires_the_product() {
  let s = store().await;
  let err = jobs::tag_product_purchasers(&s, TENANT, Uuid::new_v4(), None, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ProductNotFound(_)));
}

#[tokio::test]
async fn tag_contact_with_enrollments_single_contact_fix() {
  let s = store().await;
  let theory = course("Music Theory", None, Some("Theory"));
  let course_id = theory.course_id;
  s.insert_course(theory).await.unwrap();

  let missing =
    jobs::tag_contact_with_enrollments(&s, TENANT, "none@x.com")
      .await
      .unwrap();
  assert_eq!(missing.contact_id, None);

  let mut input = NewContact::new(TENANT, "fix@x.com");
  input.custom_fields.enrolled_courses = vec![course_id];
  s.insert_contact(input).await.unwrap();

  let result = jobs::tag_contact_with_enrollments(&s, TENANT, "fix@x.com")
    .await
    .unwrap();
  assert!(result.contact_id.is_some());
  assert_eq!(
    result.tags_added,
    vec![
      "interest:learning",
      "student",
      "course:music-theory",
      "category:theory"
    ]
  );
}
