//! [`SqliteStore`] — the SQLite implementation of [`AudienceStore`].

use std::path::Path;

use attune_core::{
  activity::{ContactActivity, NewActivity},
  catalog::{Course, Customer, Enrollment, Product, Purchase, User},
  contact::{Contact, NewContact},
  store::{AudienceStore, Page},
  tag::{NewTag, Tag},
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawActivity, RawContact, RawCourse, RawCustomer, RawEnrollment,
    RawProduct, RawPurchase, RawTag, RawUser, decode_cursor, encode_cursor,
    encode_custom_fields, encode_dt, encode_genres, encode_metadata,
    encode_tag_ids, encode_uuid, encode_uuid_opt,
  },
  schema::SCHEMA,
};

// ─── Column lists and row readers ────────────────────────────────────────────

const CONTACT_COLS: &str = "contact_id, tenant_id, email, first_name, \
   last_name, status, subscribed_at, tag_ids, source, source_product_id, \
   source_course_id, customer_id, emails_sent, emails_opened, \
   emails_clicked, engagement_score, last_opened_at, last_clicked_at, \
   custom_fields, created_at, updated_at";

const TAG_COLS: &str =
  "tag_id, tenant_id, name, color, description, contact_count, created_at, \
   updated_at";

fn contact_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawContact> {
  Ok(RawContact {
    contact_id:        row.get(0)?,
    tenant_id:         row.get(1)?,
    email:             row.get(2)?,
    first_name:        row.get(3)?,
    last_name:         row.get(4)?,
    status:            row.get(5)?,
    subscribed_at:     row.get(6)?,
    tag_ids:           row.get(7)?,
    source:            row.get(8)?,
    source_product_id: row.get(9)?,
    source_course_id:  row.get(10)?,
    customer_id:       row.get(11)?,
    emails_sent:       row.get(12)?,
    emails_opened:     row.get(13)?,
    emails_clicked:    row.get(14)?,
    engagement_score:  row.get(15)?,
    last_opened_at:    row.get(16)?,
    last_clicked_at:   row.get(17)?,
    custom_fields:     row.get(18)?,
    created_at:        row.get(19)?,
    updated_at:        row.get(20)?,
  })
}

fn tag_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTag> {
  Ok(RawTag {
    tag_id:        row.get(0)?,
    tenant_id:     row.get(1)?,
    name:          row.get(2)?,
    color:         row.get(3)?,
    description:   row.get(4)?,
    contact_count: row.get(5)?,
    created_at:    row.get(6)?,
    updated_at:    row.get(7)?,
  })
}

fn activity_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawActivity> {
  Ok(RawActivity {
    activity_id:   row.get(0)?,
    contact_id:    row.get(1)?,
    tenant_id:     row.get(2)?,
    activity_type: row.get(3)?,
    metadata:      row.get(4)?,
    timestamp:     row.get(5)?,
  })
}

fn purchase_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPurchase> {
  Ok(RawPurchase {
    purchase_id: row.get(0)?,
    customer_id: row.get(1)?,
    product_id:  row.get(2)?,
    course_id:   row.get(3)?,
    amount:      row.get(4)?,
    created_at:  row.get(5)?,
  })
}

fn enrollment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEnrollment> {
  Ok(RawEnrollment {
    enrollment_id: row.get(0)?,
    course_id:     row.get(1)?,
    user_id:       row.get(2)?,
    enrolled_at:   row.get(3)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Attune audience store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The
/// single connection also serializes all writers, which provides the
/// atomic read-modify-write behaviour the engine expects.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a fully-built [`Contact`] into the `contacts` table.
  async fn insert_contact_row(&self, contact: &Contact) -> Result<()> {
    let contact_id_str    = encode_uuid(contact.contact_id);
    let tenant_id         = contact.tenant_id.clone();
    let email             = contact.email.clone();
    let first_name        = contact.first_name.clone();
    let last_name         = contact.last_name.clone();
    let status_str        = contact.status.as_str().to_owned();
    let subscribed_at_str = encode_dt(contact.subscribed_at);
    let tag_ids_str       = encode_tag_ids(&contact.tag_ids)?;
    let source_str        = contact.source.map(|s| s.as_str().to_owned());
    let source_product    = encode_uuid_opt(contact.source_product_id);
    let source_course     = encode_uuid_opt(contact.source_course_id);
    let customer_id_str   = encode_uuid_opt(contact.customer_id);
    let emails_sent       = contact.emails_sent as i64;
    let emails_opened     = contact.emails_opened as i64;
    let emails_clicked    = contact.emails_clicked as i64;
    let engagement_score  = contact.engagement_score as i64;
    let last_opened_str   = contact.last_opened_at.map(encode_dt);
    let last_clicked_str  = contact.last_clicked_at.map(encode_dt);
    let custom_fields_str = encode_custom_fields(&contact.custom_fields)?;
    let created_at_str    = encode_dt(contact.created_at);
    let updated_at_str    = encode_dt(contact.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (
             contact_id, tenant_id, email, first_name, last_name, status,
             subscribed_at, tag_ids, source, source_product_id,
             source_course_id, customer_id, emails_sent, emails_opened,
             emails_clicked, engagement_score, last_opened_at,
             last_clicked_at, custom_fields, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
          rusqlite::params![
            contact_id_str,
            tenant_id,
            email,
            first_name,
            last_name,
            status_str,
            subscribed_at_str,
            tag_ids_str,
            source_str,
            source_product,
            source_course,
            customer_id_str,
            emails_sent,
            emails_opened,
            emails_clicked,
            engagement_score,
            last_opened_str,
            last_clicked_str,
            custom_fields_str,
            created_at_str,
            updated_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Shared keyset-paginated contact scan.
  async fn contacts_page_inner(
    &self,
    tenant_id: String,
    cursor: Option<String>,
    limit: usize,
  ) -> Result<Page<Contact>> {
    let key = cursor.as_deref().map(decode_cursor).transpose()?;
    let fetch = (limit + 1) as i64;

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let rows = if let Some((ts, id)) = key {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CONTACT_COLS} FROM contacts
             WHERE tenant_id = ?1
               AND (created_at, contact_id) > (?2, ?3)
             ORDER BY created_at, contact_id
             LIMIT ?4"
          ))?;
          stmt
            .query_map(rusqlite::params![tenant_id, ts, id, fetch], contact_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CONTACT_COLS} FROM contacts
             WHERE tenant_id = ?1
             ORDER BY created_at, contact_id
             LIMIT ?2"
          ))?;
          stmt
            .query_map(rusqlite::params![tenant_id, fetch], contact_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    let done = raws.len() <= limit;
    let mut raws = raws;
    raws.truncate(limit);
    let next_cursor = if done {
      None
    } else {
      raws
        .last()
        .map(|r| encode_cursor(&r.created_at, &r.contact_id))
    };

    let items = raws
      .into_iter()
      .map(RawContact::into_contact)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, next_cursor, done })
  }
}

// ─── AudienceStore impl ──────────────────────────────────────────────────────

impl AudienceStore for SqliteStore {
  type Error = crate::Error;

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn find_contact_by_email(
    &self,
    tenant_id: &str,
    email: &str,
  ) -> Result<Option<Contact>> {
    let tenant_id = tenant_id.to_owned();
    let email = email.to_owned();

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTACT_COLS} FROM contacts
                 WHERE tenant_id = ?1 AND email = ?2"
              ),
              rusqlite::params![tenant_id, email],
              contact_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn get_contact(&self, contact_id: Uuid) -> Result<Option<Contact>> {
    let id_str = encode_uuid(contact_id);

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTACT_COLS} FROM contacts WHERE contact_id = ?1"
              ),
              rusqlite::params![id_str],
              contact_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn insert_contact(&self, input: NewContact) -> Result<Contact> {
    let now = Utc::now();
    let contact = Contact {
      contact_id:        Uuid::new_v4(),
      tenant_id:         input.tenant_id,
      email:             input.email,
      first_name:        input.first_name,
      last_name:         input.last_name,
      status:            input.status,
      subscribed_at:     now,
      tag_ids:           Vec::new(),
      source:            input.source,
      source_product_id: input.source_product_id,
      source_course_id:  input.source_course_id,
      customer_id:       input.customer_id,
      emails_sent:       0,
      emails_opened:     0,
      emails_clicked:    0,
      engagement_score:  input.engagement_score.min(100),
      last_opened_at:    None,
      last_clicked_at:   None,
      custom_fields:     input.custom_fields,
      created_at:        now,
      updated_at:        now,
    };

    self.insert_contact_row(&contact).await?;
    Ok(contact)
  }

  async fn update_contact(&self, contact: &Contact) -> Result<()> {
    let contact_id_str    = encode_uuid(contact.contact_id);
    let first_name        = contact.first_name.clone();
    let last_name         = contact.last_name.clone();
    let status_str        = contact.status.as_str().to_owned();
    let tag_ids_str       = encode_tag_ids(&contact.tag_ids)?;
    let source_str        = contact.source.map(|s| s.as_str().to_owned());
    let source_product    = encode_uuid_opt(contact.source_product_id);
    let source_course     = encode_uuid_opt(contact.source_course_id);
    let customer_id_str   = encode_uuid_opt(contact.customer_id);
    let emails_sent       = contact.emails_sent as i64;
    let emails_opened     = contact.emails_opened as i64;
    let emails_clicked    = contact.emails_clicked as i64;
    let engagement_score  = contact.engagement_score as i64;
    let last_opened_str   = contact.last_opened_at.map(encode_dt);
    let last_clicked_str  = contact.last_clicked_at.map(encode_dt);
    let custom_fields_str = encode_custom_fields(&contact.custom_fields)?;
    let updated_at_str    = encode_dt(contact.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE contacts SET
             first_name = ?2, last_name = ?3, status = ?4, tag_ids = ?5,
             source = ?6, source_product_id = ?7, source_course_id = ?8,
             customer_id = ?9, emails_sent = ?10, emails_opened = ?11,
             emails_clicked = ?12, engagement_score = ?13,
             last_opened_at = ?14, last_clicked_at = ?15,
             custom_fields = ?16, updated_at = ?17
           WHERE contact_id = ?1",
          rusqlite::params![
            contact_id_str,
            first_name,
            last_name,
            status_str,
            tag_ids_str,
            source_str,
            source_product,
            source_course,
            customer_id_str,
            emails_sent,
            emails_opened,
            emails_clicked,
            engagement_score,
            last_opened_str,
            last_clicked_str,
            custom_fields_str,
            updated_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_contacts_page(
    &self,
    tenant_id: &str,
    cursor: Option<String>,
    limit: usize,
  ) -> Result<Page<Contact>> {
    self
      .contacts_page_inner(tenant_id.to_owned(), cursor, limit)
      .await
  }

  async fn list_subscribed_contacts(
    &self,
    tenant_id: &str,
    limit: usize,
  ) -> Result<Vec<Contact>> {
    let tenant_id = tenant_id.to_owned();
    let limit = limit as i64;

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLS} FROM contacts
           WHERE tenant_id = ?1 AND status = 'subscribed'
           ORDER BY created_at, contact_id
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![tenant_id, limit], contact_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn find_tag(&self, tenant_id: &str, name: &str) -> Result<Option<Tag>> {
    let tenant_id = tenant_id.to_owned();
    let name = name.to_owned();

    let raw: Option<RawTag> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TAG_COLS} FROM tags
                 WHERE tenant_id = ?1 AND name = ?2"
              ),
              rusqlite::params![tenant_id, name],
              tag_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTag::into_tag).transpose()
  }

  async fn get_tag(&self, tag_id: Uuid) -> Result<Option<Tag>> {
    let id_str = encode_uuid(tag_id);

    let raw: Option<RawTag> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {TAG_COLS} FROM tags WHERE tag_id = ?1"),
              rusqlite::params![id_str],
              tag_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTag::into_tag).transpose()
  }

  async fn insert_tag_if_absent(&self, input: NewTag) -> Result<Tag> {
    let candidate_id = encode_uuid(Uuid::new_v4());
    let now_str = encode_dt(Utc::now());
    let tenant_id = input.tenant_id;
    let name = input.name;
    let color = input.color;
    let description = input.description;

    // Insert and re-read inside one call so a concurrent creator of the
    // same (tenant, name) cannot interleave; the UNIQUE constraint makes
    // the insert a no-op when the tag already exists.
    let raw: RawTag = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tags (
             tag_id, tenant_id, name, color, description, contact_count,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
           ON CONFLICT (tenant_id, name) DO NOTHING",
          rusqlite::params![candidate_id, tenant_id, name, color, description, now_str],
        )?;

        let row = conn.query_row(
          &format!(
            "SELECT {TAG_COLS} FROM tags WHERE tenant_id = ?1 AND name = ?2"
          ),
          rusqlite::params![tenant_id, name],
          tag_row,
        )?;
        Ok(row)
      })
      .await?;

    raw.into_tag()
  }

  async fn increment_tag_contact_count(&self, tag_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(tag_id);
    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE tags
           SET contact_count = contact_count + 1, updated_at = ?2
           WHERE tag_id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_tags(&self, tenant_id: &str) -> Result<Vec<Tag>> {
    let tenant_id = tenant_id.to_owned();

    let raws: Vec<RawTag> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TAG_COLS} FROM tags WHERE tenant_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![tenant_id], tag_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTag::into_tag).collect()
  }

  // ── Activity — append-only ────────────────────────────────────────────────

  async fn record_activity(
    &self,
    input: NewActivity,
  ) -> Result<ContactActivity> {
    let activity = ContactActivity {
      activity_id:   Uuid::new_v4(),
      contact_id:    input.contact_id,
      tenant_id:     input.tenant_id,
      activity_type: input.activity_type,
      metadata:      input.metadata,
      timestamp:     Utc::now(),
    };

    let activity_id_str = encode_uuid(activity.activity_id);
    let contact_id_str  = encode_uuid(activity.contact_id);
    let tenant_id       = activity.tenant_id.clone();
    let type_str        = activity.activity_type.as_str().to_owned();
    let metadata_str    = encode_metadata(&activity.metadata)?;
    let timestamp_str   = encode_dt(activity.timestamp);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contact_activity (
             activity_id, contact_id, tenant_id, activity_type, metadata,
             timestamp
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            activity_id_str,
            contact_id_str,
            tenant_id,
            type_str,
            metadata_str,
            timestamp_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(activity)
  }

  async fn list_activity_for_contact(
    &self,
    contact_id: Uuid,
  ) -> Result<Vec<ContactActivity>> {
    let id_str = encode_uuid(contact_id);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT activity_id, contact_id, tenant_id, activity_type,
                  metadata, timestamp
           FROM contact_activity
           WHERE contact_id = ?1
           ORDER BY timestamp, activity_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], activity_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Catalog reads ─────────────────────────────────────────────────────────

  async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>> {
    let id_str = encode_uuid(product_id);

    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT product_id, tenant_id, title, description,
                      product_type, product_category, genres
               FROM products WHERE product_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawProduct {
                  product_id:       row.get(0)?,
                  tenant_id:        row.get(1)?,
                  title:            row.get(2)?,
                  description:      row.get(3)?,
                  product_type:     row.get(4)?,
                  product_category: row.get(5)?,
                  genres:           row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProduct::into_product).transpose()
  }

  async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>> {
    let id_str = encode_uuid(course_id);

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT course_id, tenant_id, title, description, category,
                      skill_level, slug
               FROM courses WHERE course_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCourse {
                  course_id:   row.get(0)?,
                  tenant_id:   row.get(1)?,
                  title:       row.get(2)?,
                  description: row.get(3)?,
                  category:    row.get(4)?,
                  skill_level: row.get(5)?,
                  slug:        row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn get_customer(&self, customer_id: Uuid) -> Result<Option<Customer>> {
    let id_str = encode_uuid(customer_id);

    let raw: Option<RawCustomer> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT customer_id, tenant_id, email, user_id
               FROM customers WHERE customer_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawCustomer {
                  customer_id: row.get(0)?,
                  tenant_id:   row.get(1)?,
                  email:       row.get(2)?,
                  user_id:     row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCustomer::into_customer).transpose()
  }

  async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
    let user_id = user_id.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, name FROM users WHERE user_id = ?1",
              rusqlite::params![user_id],
              |row| {
                Ok(RawUser {
                  user_id: row.get(0)?,
                  email:   row.get(1)?,
                  name:    row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(RawUser::into_user))
  }

  async fn purchases_for_customer(
    &self,
    customer_id: Uuid,
  ) -> Result<Vec<Purchase>> {
    let id_str = encode_uuid(customer_id);

    let raws: Vec<RawPurchase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT purchase_id, customer_id, product_id, course_id, amount,
                  created_at
           FROM purchases
           WHERE customer_id = ?1
           ORDER BY created_at, purchase_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], purchase_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPurchase::into_purchase).collect()
  }

  async fn purchases_for_product_page(
    &self,
    product_id: Uuid,
    cursor: Option<String>,
    limit: usize,
  ) -> Result<Page<Purchase>> {
    let id_str = encode_uuid(product_id);
    let key = cursor.as_deref().map(decode_cursor).transpose()?;
    let fetch = (limit + 1) as i64;

    let raws: Vec<RawPurchase> = self
      .conn
      .call(move |conn| {
        let rows = if let Some((ts, id)) = key {
          let mut stmt = conn.prepare(
            "SELECT purchase_id, customer_id, product_id, course_id,
                    amount, created_at
             FROM purchases
             WHERE product_id = ?1
               AND (created_at, purchase_id) > (?2, ?3)
             ORDER BY created_at, purchase_id
             LIMIT ?4",
          )?;
          stmt
            .query_map(rusqlite::params![id_str, ts, id, fetch], purchase_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT purchase_id, customer_id, product_id, course_id,
                    amount, created_at
             FROM purchases
             WHERE product_id = ?1
             ORDER BY created_at, purchase_id
             LIMIT ?2",
          )?;
          stmt
            .query_map(rusqlite::params![id_str, fetch], purchase_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    let done = raws.len() <= limit;
    let mut raws = raws;
    raws.truncate(limit);
    let next_cursor = if done {
      None
    } else {
      raws
        .last()
        .map(|r| encode_cursor(&r.created_at, &r.purchase_id))
    };

    let items = raws
      .into_iter()
      .map(RawPurchase::into_purchase)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, next_cursor, done })
  }

  async fn enrollments_page(
    &self,
    tenant_id: &str,
    cursor: Option<String>,
    limit: usize,
  ) -> Result<Page<Enrollment>> {
    let tenant_id = tenant_id.to_owned();
    let key = cursor.as_deref().map(decode_cursor).transpose()?;
    let fetch = (limit + 1) as i64;

    let raws: Vec<RawEnrollment> = self
      .conn
      .call(move |conn| {
        let rows = if let Some((ts, id)) = key {
          let mut stmt = conn.prepare(
            "SELECT e.enrollment_id, e.course_id, e.user_id, e.enrolled_at
             FROM enrollments e
             JOIN courses c ON c.course_id = e.course_id
             WHERE c.tenant_id = ?1
               AND (e.enrolled_at, e.enrollment_id) > (?2, ?3)
             ORDER BY e.enrolled_at, e.enrollment_id
             LIMIT ?4",
          )?;
          stmt
            .query_map(
              rusqlite::params![tenant_id, ts, id, fetch],
              enrollment_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT e.enrollment_id, e.course_id, e.user_id, e.enrolled_at
             FROM enrollments e
             JOIN courses c ON c.course_id = e.course_id
             WHERE c.tenant_id = ?1
             ORDER BY e.enrolled_at, e.enrollment_id
             LIMIT ?2",
          )?;
          stmt
            .query_map(rusqlite::params![tenant_id, fetch], enrollment_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    let done = raws.len() <= limit;
    let mut raws = raws;
    raws.truncate(limit);
    let next_cursor = if done {
      None
    } else {
      raws
        .last()
        .map(|r| encode_cursor(&r.enrolled_at, &r.enrollment_id))
    };

    let items = raws
      .into_iter()
      .map(RawEnrollment::into_enrollment)
      .collect::<Result<Vec<_>>>()?;

    Ok(Page { items, next_cursor, done })
  }

  // ── Catalog mirror writes ─────────────────────────────────────────────────

  async fn insert_product(&self, product: Product) -> Result<()> {
    let product_id_str = encode_uuid(product.product_id);
    let tenant_id      = product.tenant_id;
    let title          = product.title;
    let description    = product.description;
    let type_str       = product.product_type.map(|t| t.as_str().to_owned());
    let category_str   = product.product_category.map(|t| t.as_str().to_owned());
    let genres_str     = encode_genres(&product.genres)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO products (
             product_id, tenant_id, title, description, product_type,
             product_category, genres
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            product_id_str,
            tenant_id,
            title,
            description,
            type_str,
            category_str,
            genres_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_course(&self, course: Course) -> Result<()> {
    let course_id_str = encode_uuid(course.course_id);
    let tenant_id     = course.tenant_id;
    let title         = course.title;
    let description   = course.description;
    let category      = course.category;
    let skill_str     = course.skill_level.map(|s| s.as_str().to_owned());
    let slug          = course.slug;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO courses (
             course_id, tenant_id, title, description, category,
             skill_level, slug
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            course_id_str,
            tenant_id,
            title,
            description,
            category,
            skill_str,
            slug,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_customer(&self, customer: Customer) -> Result<()> {
    let customer_id_str = encode_uuid(customer.customer_id);
    let tenant_id       = customer.tenant_id;
    let email           = customer.email;
    let user_id         = customer.user_id;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO customers (
             customer_id, tenant_id, email, user_id
           ) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![customer_id_str, tenant_id, email, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_purchase(&self, purchase: Purchase) -> Result<()> {
    let purchase_id_str = encode_uuid(purchase.purchase_id);
    let customer_id_str = encode_uuid(purchase.customer_id);
    let product_id_str  = encode_uuid_opt(purchase.product_id);
    let course_id_str   = encode_uuid_opt(purchase.course_id);
    let amount          = purchase.amount;
    let created_at_str  = encode_dt(purchase.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO purchases (
             purchase_id, customer_id, product_id, course_id, amount,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            purchase_id_str,
            customer_id_str,
            product_id_str,
            course_id_str,
            amount,
            created_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_enrollment(&self, enrollment: Enrollment) -> Result<()> {
    let enrollment_id_str = encode_uuid(enrollment.enrollment_id);
    let course_id_str     = encode_uuid(enrollment.course_id);
    let user_id           = enrollment.user_id;
    let enrolled_at_str   = encode_dt(enrollment.enrolled_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO enrollments (
             enrollment_id, course_id, user_id, enrolled_at
           ) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            enrollment_id_str,
            course_id_str,
            user_id,
            enrolled_at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_user(&self, user: User) -> Result<()> {
    let user_id = user.user_id;
    let email   = user.email;
    let name    = user.name;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO users (user_id, email, name)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, email, name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
