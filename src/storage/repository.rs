//! Repository Pattern for Database Abstraction
//!
//! Business logic talks to the store through the [`JobStore`] and
//! [`EmployerStore`] traits, which lets the pipeline run against SQLite in
//! production and an in-memory mock in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Business Logic                          │
//! │         (ingestor, registry, discovery, export)             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Repository Traits                         │
//! │              JobStore, EmployerStore => Store               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!     ┌─────────────────┐           ┌─────────────────┐
//!     │     SQLite      │           │     Memory      │
//!     │  SqliteStore    │           │  MemoryStore    │
//!     └─────────────────┘           └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use jobharvest::storage::{SharedStore, SqliteStore};
//!
//! // Production: use SQLite
//! let store: SharedStore = Arc::new(SqliteStore::open("data/jobs.db")?);
//!
//! // Testing: use the in-memory store
//! let store: SharedStore = Arc::new(MemoryStore::new());
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Employer, JobPosting, JobUpsert, NewEmployer, UpsertOutcome};
use crate::storage::schema::{SCHEMA, SELECT_EMPLOYER_COLUMNS, SELECT_JOB_COLUMNS, UPSERT_JOB};
use crate::utils::error::{StorageError, StorageResult};
use crate::utils::{format_timestamp, parse_timestamp};

// ============================================================================
// Repository Traits
// ============================================================================

/// Persistence of job postings
pub trait JobStore: Send + Sync {
    /// Insert a first sighting or update a repeat one in a single atomic step
    fn upsert_job(&self, job: &JobUpsert, now: DateTime<Utc>) -> StorageResult<UpsertOutcome>;

    /// Get a job by identity key
    fn get_job(&self, id: &str) -> StorageResult<Option<JobPosting>>;

    /// All jobs, most recently seen first
    fn list_jobs(&self) -> StorageResult<Vec<JobPosting>>;

    /// Count stored jobs
    fn count_jobs(&self) -> StorageResult<usize>;
}

/// Persistence of the employer registry
pub trait EmployerStore: Send + Sync {
    /// Insert an employer unless one with the same name (case-insensitive) exists
    ///
    /// Returns the new id, or `None` when the employer was already known.
    fn insert_employer(&self, employer: &NewEmployer, now: DateTime<Utc>) -> StorageResult<Option<i64>>;

    fn get_employer(&self, id: i64) -> StorageResult<Option<Employer>>;

    fn find_employer(&self, name: &str) -> StorageResult<Option<Employer>>;

    fn list_employers(&self) -> StorageResult<Vec<Employer>>;

    /// Employers without a careers URL, optionally capped by discovery attempts
    fn unresolved_employers(&self, max_attempts: Option<u32>) -> StorageResult<Vec<Employer>>;

    /// Employers with a careers URL
    fn resolved_employers(&self) -> StorageResult<Vec<Employer>>;

    /// Resolve an employer; an empty URL is rejected
    fn set_careers_url(&self, id: i64, url: &str, now: DateTime<Utc>) -> StorageResult<()>;

    /// Count one more failed discovery attempt, returning the new total
    fn record_discovery_miss(&self, id: i64, now: DateTime<Utc>) -> StorageResult<u32>;
}

/// Combined store used by the pipeline
pub trait Store: JobStore + EmployerStore {}

impl<T: JobStore + EmployerStore> Store for T {}

/// Store shared between pipeline stages
pub type SharedStore = Arc<dyn Store>;

fn reject_empty_url(url: &str) -> StorageResult<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(StorageError::InvalidRecord(
            "careers_url must not be empty".to_string(),
        ));
    }
    Ok(url)
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of [`Store`]
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection; every
/// write is one statement, so no transaction spans a lock release.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and create if needed) a database file
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        tracing::info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> StorageResult<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create tables and indexes if missing
    pub fn init_schema(&self) -> StorageResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn query_employers(&self, filter: &str, params: &[&dyn rusqlite::ToSql]) -> StorageResult<Vec<Employer>> {
        let conn = self.conn()?;
        let sql = format!("{SELECT_EMPLOYER_COLUMNS} {filter}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, employer_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn employer_from_row(row: &Row<'_>) -> rusqlite::Result<Employer> {
    Ok(Employer {
        id: row.get(0)?,
        name: row.get(1)?,
        careers_url: row.get(2)?,
        source: row.get(3)?,
        updated_at: parse_timestamp(&row.get::<_, String>(4)?),
        discovery_attempts: row.get::<_, i64>(5)?.max(0) as u32,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobPosting> {
    Ok(JobPosting {
        id: row.get(0)?,
        employer_id: row.get(1)?,
        employer_name: row.get(2)?,
        title: row.get(3)?,
        location: row.get(4)?,
        job_url: row.get(5)?,
        source: row.get(6)?,
        source_careers_url: row.get(7)?,
        employment_type: row.get(8)?,
        description: row.get(9)?,
        posted_at: row.get(10)?,
        closing_date: row.get(11)?,
        raw_text_snippet: row.get(12)?,
        first_seen_at: parse_timestamp(&row.get::<_, String>(13)?),
        last_seen_at: parse_timestamp(&row.get::<_, String>(14)?),
        sighting_count: row.get::<_, i64>(15)?.max(0) as u32,
    })
}

impl JobStore for SqliteStore {
    fn upsert_job(&self, job: &JobUpsert, now: DateTime<Utc>) -> StorageResult<UpsertOutcome> {
        if job.id.is_empty() {
            return Err(StorageError::InvalidRecord("job id must not be empty".to_string()));
        }

        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            UPSERT_JOB,
            params![
                job.id,
                job.employer_id,
                job.employer_name,
                job.title,
                job.location,
                job.job_url,
                job.source_careers_url,
                job.employment_type,
                job.posted_at,
                job.closing_date,
                job.raw_text_snippet,
                job.description,
                job.source,
                format_timestamp(&now),
            ],
            |row| row.get(0),
        )?;

        Ok(UpsertOutcome::from_sighting_count(count))
    }

    fn get_job(&self, id: &str) -> StorageResult<Option<JobPosting>> {
        let conn = self.conn()?;
        let sql = format!("{SELECT_JOB_COLUMNS} WHERE id = ?1");
        let job = conn.query_row(&sql, params![id], job_from_row).optional()?;
        Ok(job)
    }

    fn list_jobs(&self) -> StorageResult<Vec<JobPosting>> {
        let conn = self.conn()?;
        let sql = format!("{SELECT_JOB_COLUMNS} ORDER BY last_seen_at DESC, id ASC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], job_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count_jobs(&self) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl EmployerStore for SqliteStore {
    fn insert_employer(&self, employer: &NewEmployer, now: DateTime<Utc>) -> StorageResult<Option<i64>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                r#"
                INSERT INTO employers (name, careers_url, source, updated_at, discovery_attempts)
                VALUES (?1, NULLIF(?2, ''), ?3, ?4, 0)
                ON CONFLICT(name) DO NOTHING
                RETURNING id
                "#,
                params![
                    employer.name,
                    employer.careers_url.as_deref().unwrap_or_default(),
                    employer.source,
                    format_timestamp(&now),
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn get_employer(&self, id: i64) -> StorageResult<Option<Employer>> {
        Ok(self.query_employers("WHERE id = ?1", &[&id])?.into_iter().next())
    }

    fn find_employer(&self, name: &str) -> StorageResult<Option<Employer>> {
        Ok(self
            .query_employers("WHERE name = ?1", &[&name])?
            .into_iter()
            .next())
    }

    fn list_employers(&self) -> StorageResult<Vec<Employer>> {
        self.query_employers("ORDER BY id", &[])
    }

    fn unresolved_employers(&self, max_attempts: Option<u32>) -> StorageResult<Vec<Employer>> {
        let cap = max_attempts.map(i64::from).unwrap_or(i64::MAX);
        self.query_employers(
            "WHERE (careers_url IS NULL OR trim(careers_url) = '') AND discovery_attempts < ?1 ORDER BY id",
            &[&cap],
        )
    }

    fn resolved_employers(&self) -> StorageResult<Vec<Employer>> {
        self.query_employers(
            "WHERE careers_url IS NOT NULL AND trim(careers_url) <> '' ORDER BY id",
            &[],
        )
    }

    fn set_careers_url(&self, id: i64, url: &str, now: DateTime<Utc>) -> StorageResult<()> {
        let url = reject_empty_url(url)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE employers SET careers_url = ?1, updated_at = ?2 WHERE id = ?3",
            params![url, format_timestamp(&now), id],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("employer {id}")));
        }
        Ok(())
    }

    fn record_discovery_miss(&self, id: i64, now: DateTime<Utc>) -> StorageResult<u32> {
        let conn = self.conn()?;
        let attempts: Option<i64> = conn
            .query_row(
                r#"
                UPDATE employers
                SET discovery_attempts = discovery_attempts + 1, updated_at = ?1
                WHERE id = ?2
                RETURNING discovery_attempts
                "#,
                params![format_timestamp(&now), id],
                |row| row.get(0),
            )
            .optional()?;

        attempts
            .map(|n| n.max(0) as u32)
            .ok_or_else(|| StorageError::NotFound(format!("employer {id}")))
    }
}

// ============================================================================
// Memory Implementation (for testing)
// ============================================================================

/// In-memory implementation of [`Store`]
///
/// Mirrors the SQLite semantics (case-insensitive employer names, unique
/// non-empty job URLs, non-erasing updates) without a database.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<String, JobPosting>>,
    employers: RwLock<Vec<Employer>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn employers_where(&self, keep: impl Fn(&Employer) -> bool) -> StorageResult<Vec<Employer>> {
        let employers = self.employers.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(employers.iter().filter(|e| keep(e)).cloned().collect())
    }

    fn update_employer<T>(&self, id: i64, update: impl FnOnce(&mut Employer) -> T) -> StorageResult<T> {
        let mut employers = self.employers.write().map_err(|_| StorageError::LockPoisoned)?;
        employers
            .iter_mut()
            .find(|e| e.id == id)
            .map(update)
            .ok_or_else(|| StorageError::NotFound(format!("employer {id}")))
    }
}

impl JobStore for MemoryStore {
    fn upsert_job(&self, job: &JobUpsert, now: DateTime<Utc>) -> StorageResult<UpsertOutcome> {
        if job.id.is_empty() {
            return Err(StorageError::InvalidRecord("job id must not be empty".to_string()));
        }

        let mut jobs = self.jobs.write().map_err(|_| StorageError::LockPoisoned)?;

        if let Some(existing) = jobs.get_mut(&job.id) {
            existing.last_seen_at = now;
            existing.sighting_count += 1;
            if !job.closing_date.is_empty() {
                existing.closing_date = job.closing_date.clone();
            }
            if !job.description.is_empty() {
                existing.description = job.description.clone();
            }
            return Ok(UpsertOutcome::Updated);
        }

        let job_url = Some(job.job_url.clone()).filter(|u| !u.is_empty());
        if job_url.is_some() && jobs.values().any(|j| j.job_url == job_url) {
            return Err(StorageError::InvalidRecord(format!(
                "job_url already stored: {}",
                job.job_url
            )));
        }

        jobs.insert(
            job.id.clone(),
            JobPosting {
                id: job.id.clone(),
                employer_id: job.employer_id,
                employer_name: job.employer_name.clone(),
                title: job.title.clone(),
                location: job.location.clone(),
                job_url,
                source: job.source.clone(),
                source_careers_url: job.source_careers_url.clone(),
                employment_type: job.employment_type.clone(),
                description: job.description.clone(),
                posted_at: job.posted_at.clone(),
                closing_date: job.closing_date.clone(),
                raw_text_snippet: job.raw_text_snippet.clone(),
                first_seen_at: now,
                last_seen_at: now,
                sighting_count: 1,
            },
        );
        Ok(UpsertOutcome::Inserted)
    }

    fn get_job(&self, id: &str) -> StorageResult<Option<JobPosting>> {
        let jobs = self.jobs.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(jobs.get(id).cloned())
    }

    fn list_jobs(&self) -> StorageResult<Vec<JobPosting>> {
        let jobs = self.jobs.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut list: Vec<JobPosting> = jobs.values().cloned().collect();
        list.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    fn count_jobs(&self) -> StorageResult<usize> {
        let jobs = self.jobs.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(jobs.len())
    }
}

impl EmployerStore for MemoryStore {
    fn insert_employer(&self, employer: &NewEmployer, now: DateTime<Utc>) -> StorageResult<Option<i64>> {
        let mut employers = self.employers.write().map_err(|_| StorageError::LockPoisoned)?;
        let lowered = employer.name.to_lowercase();
        if employers.iter().any(|e| e.name.to_lowercase() == lowered) {
            return Ok(None);
        }

        let id = employers.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        employers.push(Employer {
            id,
            name: employer.name.clone(),
            careers_url: employer.careers_url.clone().filter(|u| !u.trim().is_empty()),
            source: employer.source.clone(),
            updated_at: now,
            discovery_attempts: 0,
        });
        Ok(Some(id))
    }

    fn get_employer(&self, id: i64) -> StorageResult<Option<Employer>> {
        Ok(self.employers_where(|e| e.id == id)?.into_iter().next())
    }

    fn find_employer(&self, name: &str) -> StorageResult<Option<Employer>> {
        let lowered = name.to_lowercase();
        Ok(self
            .employers_where(|e| e.name.to_lowercase() == lowered)?
            .into_iter()
            .next())
    }

    fn list_employers(&self) -> StorageResult<Vec<Employer>> {
        self.employers_where(|_| true)
    }

    fn unresolved_employers(&self, max_attempts: Option<u32>) -> StorageResult<Vec<Employer>> {
        self.employers_where(|e| {
            e.careers_url.as_deref().map_or(true, |u| u.trim().is_empty())
                && max_attempts.map_or(true, |cap| e.discovery_attempts < cap)
        })
    }

    fn resolved_employers(&self) -> StorageResult<Vec<Employer>> {
        self.employers_where(|e| e.careers_url.as_deref().is_some_and(|u| !u.trim().is_empty()))
    }

    fn set_careers_url(&self, id: i64, url: &str, now: DateTime<Utc>) -> StorageResult<()> {
        let url = reject_empty_url(url)?.to_string();
        self.update_employer(id, |e| {
            e.careers_url = Some(url);
            e.updated_at = now;
        })
    }

    fn record_discovery_miss(&self, id: i64, now: DateTime<Utc>) -> StorageResult<u32> {
        self.update_employer(id, |e| {
            e.discovery_attempts += 1;
            e.updated_at = now;
            e.discovery_attempts
        })
    }
}
