//! SQL schema for the Attune SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated
//! on the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contacts (
    contact_id        TEXT PRIMARY KEY,
    tenant_id         TEXT NOT NULL,
    email             TEXT NOT NULL,   -- always lowercased
    first_name        TEXT,
    last_name         TEXT,
    status            TEXT NOT NULL DEFAULT 'subscribed',
    subscribed_at     TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    tag_ids           TEXT NOT NULL DEFAULT '[]',  -- JSON array of tag UUIDs
    source            TEXT,
    source_product_id TEXT,
    source_course_id  TEXT,
    customer_id       TEXT,
    emails_sent       INTEGER NOT NULL DEFAULT 0,
    emails_opened     INTEGER NOT NULL DEFAULT 0,
    emails_clicked    INTEGER NOT NULL DEFAULT 0,
    engagement_score  INTEGER NOT NULL DEFAULT 0,
    last_opened_at    TEXT,
    last_clicked_at   TEXT,
    custom_fields     TEXT NOT NULL DEFAULT '{}',  -- JSON CustomFields
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (tenant_id, email)
);

CREATE TABLE IF NOT EXISTS tags (
    tag_id        TEXT PRIMARY KEY,
    tenant_id     TEXT NOT NULL,
    name          TEXT NOT NULL,
    color         TEXT NOT NULL,
    description   TEXT,
    contact_count INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (tenant_id, name)
);

-- Activity rows are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS contact_activity (
    activity_id   TEXT PRIMARY KEY,
    contact_id    TEXT NOT NULL REFERENCES contacts(contact_id),
    tenant_id     TEXT NOT NULL,
    activity_type TEXT NOT NULL,
    metadata      TEXT NOT NULL DEFAULT '{}',
    timestamp     TEXT NOT NULL
);

-- Catalog mirror tables, written by the surrounding platform.

CREATE TABLE IF NOT EXISTS products (
    product_id       TEXT PRIMARY KEY,
    tenant_id        TEXT NOT NULL,
    title            TEXT NOT NULL,
    description      TEXT,
    product_type     TEXT,
    product_category TEXT,
    genres           TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS courses (
    course_id   TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT,
    category    TEXT,
    skill_level TEXT,
    slug        TEXT
);

CREATE TABLE IF NOT EXISTS customers (
    customer_id TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL,
    email       TEXT NOT NULL,
    user_id     TEXT
);

CREATE TABLE IF NOT EXISTS purchases (
    purchase_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL REFERENCES customers(customer_id),
    product_id  TEXT,
    course_id   TEXT,
    amount      REAL NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id TEXT PRIMARY KEY,
    course_id     TEXT NOT NULL REFERENCES courses(course_id),
    user_id       TEXT NOT NULL,
    enrolled_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    user_id TEXT PRIMARY KEY,
    email   TEXT,
    name    TEXT
);

CREATE INDEX IF NOT EXISTS contacts_tenant_idx
    ON contacts(tenant_id);
CREATE INDEX IF NOT EXISTS contacts_tenant_created_idx
    ON contacts(tenant_id, created_at, contact_id);
CREATE INDEX IF NOT EXISTS tags_tenant_idx
    ON tags(tenant_id);
CREATE INDEX IF NOT EXISTS activity_contact_idx
    ON contact_activity(contact_id);
CREATE INDEX IF NOT EXISTS activity_tenant_idx
    ON contact_activity(tenant_id);
CREATE INDEX IF NOT EXISTS purchases_customer_idx
    ON purchases(customer_id);
CREATE INDEX IF NOT EXISTS purchases_product_idx
    ON purchases(product_id, created_at, purchase_id);
CREATE INDEX IF NOT EXISTS enrollments_course_idx
    ON enrollments(course_id);

PRAGMA user_version = 1;
";
