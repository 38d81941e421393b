//! The `AudienceStore` trait and pagination types.
//!
//! The trait is implemented by storage backends (e.g.
//! `attune-store-sqlite`). The engine and API depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{ContactActivity, NewActivity},
  catalog::{Course, Customer, Enrollment, Product, Purchase, User},
  contact::{Contact, NewContact},
  tag::{NewTag, Tag},
};

// ─── Pagination ──────────────────────────────────────────────────────────────

/// One page of a cursor-resumable scan.
///
/// Callers treat `next_cursor` as an opaque token: persist it between
/// invocations and pass it back verbatim to resume.
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items:       Vec<T>,
  /// Resumption token; `None` once the scan is exhausted.
  pub next_cursor: Option<String>,
  pub done:        bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an Attune audience store backend.
///
/// Backends must enforce UNIQUE (tenant_id, email) on contacts and
/// UNIQUE (tenant_id, name) on tags, and must apply each write method as
/// one atomic operation — the engine's read-check-then-write sequences
/// rely on that for correctness under concurrent events.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AudienceStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Contacts ──────────────────────────────────────────────────────────

  /// Look up a contact by its identity key. `email` must already be
  /// lowercased by the caller.
  fn find_contact_by_email<'a>(
    &'a self,
    tenant_id: &'a str,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + 'a;

  /// Retrieve a contact by id. Returns `None` if not found.
  fn get_contact(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Create and persist a new contact. The store assigns the id, the
  /// empty tag list, zeroed counters, and all timestamps.
  fn insert_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Persist the mutable fields of an existing contact as one atomic
  /// write. The caller is expected to have loaded, mutated, and
  /// re-stamped `updated_at` on the record.
  fn update_contact<'a>(
    &'a self,
    contact: &'a Contact,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Scan the tenant's contacts in stable (created_at, id) order, one
  /// page per call.
  fn list_contacts_page<'a>(
    &'a self,
    tenant_id: &'a str,
    cursor: Option<String>,
    limit: usize,
  ) -> impl Future<Output = Result<Page<Contact>, Self::Error>> + Send + 'a;

  /// All currently-subscribed contacts for a tenant, capped at `limit`.
  fn list_subscribed_contacts<'a>(
    &'a self,
    tenant_id: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + 'a;

  // ── Tags ──────────────────────────────────────────────────────────────

  /// Look up a tag by its unique (tenant_id, name) key.
  fn find_tag<'a>(
    &'a self,
    tenant_id: &'a str,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + 'a;

  /// Retrieve a tag by id. Returns `None` if not found.
  fn get_tag(
    &self,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<Option<Tag>, Self::Error>> + Send + '_;

  /// Insert a tag unless one with the same (tenant_id, name) already
  /// exists; either way, return the winning row. This is the
  /// insert-if-absent primitive concurrent tag creation relies on.
  fn insert_tag_if_absent(
    &self,
    input: NewTag,
  ) -> impl Future<Output = Result<Tag, Self::Error>> + Send + '_;

  /// Atomically add one to a tag's contact count and bump `updated_at`.
  fn increment_tag_contact_count(
    &self,
    tag_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All tags for a tenant.
  fn list_tags<'a>(
    &'a self,
    tenant_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Tag>, Self::Error>> + Send + 'a;

  // ── Activity — append-only ────────────────────────────────────────────

  /// Append one audit-log row. The store assigns the id and timestamp.
  fn record_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<ContactActivity, Self::Error>> + Send + '_;

  /// All activity rows for a contact, oldest first.
  fn list_activity_for_contact(
    &self,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ContactActivity>, Self::Error>> + Send + '_;

  // ── Catalog reads ─────────────────────────────────────────────────────

  fn get_product(
    &self,
    product_id: Uuid,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn get_customer(
    &self,
    customer_id: Uuid,
  ) -> impl Future<Output = Result<Option<Customer>, Self::Error>> + Send + '_;

  fn get_user<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Full purchase history for one customer, oldest first.
  fn purchases_for_customer(
    &self,
    customer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Purchase>, Self::Error>> + Send + '_;

  /// Scan all purchases of one product, one page per call.
  fn purchases_for_product_page(
    &self,
    product_id: Uuid,
    cursor: Option<String>,
    limit: usize,
  ) -> impl Future<Output = Result<Page<Purchase>, Self::Error>> + Send + '_;

  /// Scan the enrollment log restricted to the tenant's courses, one
  /// page per call.
  fn enrollments_page<'a>(
    &'a self,
    tenant_id: &'a str,
    cursor: Option<String>,
    limit: usize,
  ) -> impl Future<Output = Result<Page<Enrollment>, Self::Error>> + Send + 'a;

  // ── Catalog mirror writes ─────────────────────────────────────────────
  // Used by the surrounding platform (and tests) to mirror its records
  // into the store; ids are caller-supplied.

  fn insert_product(
    &self,
    product: Product,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_course(
    &self,
    course: Course,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_customer(
    &self,
    customer: Customer,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_purchase(
    &self,
    purchase: Purchase,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_enrollment(
    &self,
    enrollment: Enrollment,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn insert_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
