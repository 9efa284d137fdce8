//! Common test utilities

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jobharvest::models::{Employer, JobPosting, JobUpsert, NewEmployer, RawPosting, UpsertOutcome};
use jobharvest::storage::{EmployerStore, JobStore, MemoryStore, SharedStore, SqliteStore};
use jobharvest::utils::error::{StorageError, StorageResult};
use jobharvest::utils::Clock;
use tempfile::TempDir;

/// Fixed starting instant for deterministic timestamps
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Clock that advances one minute on every call
#[allow(dead_code)]
pub fn stepping_clock() -> Clock {
    let ticks = Arc::new(AtomicI64::new(0));
    Arc::new(move || t0() + Duration::minutes(ticks.fetch_add(1, Ordering::SeqCst)))
}

/// SQLite store in a fresh temp directory; keep the guard alive
#[allow(dead_code)]
pub fn sqlite_store() -> (TempDir, SharedStore) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("jobs.db")).unwrap();
    (dir, Arc::new(store))
}

/// Create a posting with the given title and url
#[allow(dead_code)]
pub fn posting(title: &str, url: &str) -> RawPosting {
    RawPosting {
        title: title.to_string(),
        company: "Acme".to_string(),
        location: "London".to_string(),
        url: url.to_string(),
        description: format!("{title} description"),
        ..Default::default()
    }
}

/// Employer with an optional careers URL
#[allow(dead_code)]
pub fn employer(id: i64, name: &str, careers_url: Option<&str>) -> Employer {
    Employer {
        id,
        name: name.to_string(),
        careers_url: careers_url.map(String::from),
        source: "seed".to_string(),
        updated_at: t0(),
        discovery_attempts: 0,
    }
}

/// Careers page with two graduate postings and some noise
#[allow(dead_code)]
pub const ACME_CAREERS_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>Careers at Acme</title></head>
<body>
    <nav>
        <a href="/">Home</a>
        <a href="/about">About us</a>
    </nav>
    <main>
        <h1>Early careers</h1>
        <ul>
            <li><a href="/careers/graduate-analyst?utm_source=site">Graduate Analyst Programme</a></li>
            <li><a href="https://acme.test/careers/summer-intern">Summer Internship 2025</a></li>
        </ul>
        <a href="mailto:graduates@acme.test">Graduate enquiries</a>
    </main>
</body>
</html>
"#;

/// In-memory store whose employer writes fail for chosen names
#[allow(dead_code)]
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    /// Employers (case-insensitive) whose inserts and updates fail
    pub failing_names: Vec<String>,
    /// Make `resolved_employers` fail
    pub fail_resolved: bool,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing_names: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    fn check_name(&self, name: &str) -> StorageResult<()> {
        if self.failing_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return Err(StorageError::InvalidRecord(format!("write refused for {name}")));
        }
        Ok(())
    }

    fn check_id(&self, id: i64) -> StorageResult<()> {
        match self.inner.get_employer(id)? {
            Some(employer) => self.check_name(&employer.name),
            None => Ok(()),
        }
    }
}

impl JobStore for FaultyStore {
    fn upsert_job(&self, job: &JobUpsert, now: DateTime<Utc>) -> StorageResult<UpsertOutcome> {
        self.inner.upsert_job(job, now)
    }

    fn get_job(&self, id: &str) -> StorageResult<Option<JobPosting>> {
        self.inner.get_job(id)
    }

    fn list_jobs(&self) -> StorageResult<Vec<JobPosting>> {
        self.inner.list_jobs()
    }

    fn count_jobs(&self) -> StorageResult<usize> {
        self.inner.count_jobs()
    }
}

impl EmployerStore for FaultyStore {
    fn insert_employer(&self, employer: &NewEmployer, now: DateTime<Utc>) -> StorageResult<Option<i64>> {
        self.check_name(&employer.name)?;
        self.inner.insert_employer(employer, now)
    }

    fn get_employer(&self, id: i64) -> StorageResult<Option<Employer>> {
        self.inner.get_employer(id)
    }

    fn find_employer(&self, name: &str) -> StorageResult<Option<Employer>> {
        self.inner.find_employer(name)
    }

    fn list_employers(&self) -> StorageResult<Vec<Employer>> {
        self.inner.list_employers()
    }

    fn unresolved_employers(&self, max_attempts: Option<u32>) -> StorageResult<Vec<Employer>> {
        self.inner.unresolved_employers(max_attempts)
    }

    fn resolved_employers(&self) -> StorageResult<Vec<Employer>> {
        if self.fail_resolved {
            return Err(StorageError::LockPoisoned);
        }
        self.inner.resolved_employers()
    }

    fn set_careers_url(&self, id: i64, url: &str, now: DateTime<Utc>) -> StorageResult<()> {
        self.check_id(id)?;
        self.inner.set_careers_url(id, url, now)
    }

    fn record_discovery_miss(&self, id: i64, now: DateTime<Utc>) -> StorageResult<u32> {
        self.check_id(id)?;
        self.inner.record_discovery_miss(id, now)
    }
}
