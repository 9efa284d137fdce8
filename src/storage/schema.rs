//! SQLite schema for employers and job postings
//!
//! Timestamps are RFC 3339 UTC text with microsecond precision, so
//! lexicographic order matches chronological order.

/// Full schema, idempotent
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employers (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    name                TEXT NOT NULL UNIQUE COLLATE NOCASE,
    careers_url         TEXT NULL,
    source              TEXT NOT NULL DEFAULT '',
    updated_at          TEXT NOT NULL,
    discovery_attempts  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS jobs (
    id                  TEXT PRIMARY KEY,
    employer_id         INTEGER NULL REFERENCES employers(id),
    employer_name       TEXT NOT NULL DEFAULT '',
    title               TEXT NOT NULL DEFAULT '',
    location            TEXT NOT NULL DEFAULT '',
    job_url             TEXT NULL UNIQUE,
    source_careers_url  TEXT NULL,
    employment_type     TEXT NOT NULL DEFAULT '',
    posted_at           TEXT NOT NULL DEFAULT '',
    closing_date        TEXT NOT NULL DEFAULT '',
    raw_text_snippet    TEXT NOT NULL DEFAULT '',
    description         TEXT NOT NULL DEFAULT '',
    source              TEXT NOT NULL DEFAULT '',
    first_seen_at       TEXT NOT NULL,
    last_seen_at        TEXT NOT NULL,
    sighting_count      INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_jobs_last_seen_at ON jobs(last_seen_at);
CREATE INDEX IF NOT EXISTS idx_jobs_source ON jobs(source);
"#;

/// Atomic job upsert
///
/// The conflict target is the identity key. Only the sighting bookkeeping,
/// a newly supplied closing date and a non-empty description change on a
/// repeat sighting; everything else keeps its first-seen value.
pub const UPSERT_JOB: &str = r#"
INSERT INTO jobs (
    id, employer_id, employer_name, title, location, job_url, source_careers_url,
    employment_type, posted_at, closing_date, raw_text_snippet, description, source,
    first_seen_at, last_seen_at, sighting_count
)
VALUES (?1, ?2, ?3, ?4, ?5, NULLIF(?6, ''), ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14, 1)
ON CONFLICT(id) DO UPDATE SET
    last_seen_at   = excluded.last_seen_at,
    sighting_count = jobs.sighting_count + 1,
    closing_date   = CASE WHEN excluded.closing_date <> '' THEN excluded.closing_date
                          ELSE jobs.closing_date END,
    description    = CASE WHEN excluded.description <> '' THEN excluded.description
                          ELSE jobs.description END
RETURNING sighting_count
"#;

pub const SELECT_JOB_COLUMNS: &str = r#"
SELECT id, employer_id, employer_name, title, location, job_url, source,
       source_careers_url, employment_type, description, posted_at, closing_date,
       raw_text_snippet, first_seen_at, last_seen_at, sighting_count
FROM jobs
"#;

pub const SELECT_EMPLOYER_COLUMNS: &str = r#"
SELECT id, name, careers_url, source, updated_at, discovery_attempts
FROM employers
"#;
