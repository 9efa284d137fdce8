//! Identity keys and idempotent ingestion
//!
//! Every posting, whatever its source, is keyed the same way:
//!
//! 1. a non-empty URL that parses is keyed by its normalized form
//!    (see [`normalize_url`]), so tracking parameters and fragments do not
//!    create duplicates;
//! 2. anything else is keyed by `sha256:` + the hex digest of
//!    `lower(employer)|lower(title)|url`.
//!
//! [`JobIngestor`] turns a batch of [`RawPosting`]s into upserts and counts
//! what happened. One bad item never aborts the batch.

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::crawler::url::normalize_url;
use crate::models::{JobUpsert, PostingOrigin, RawPosting, UpsertOutcome};
use crate::storage::repository::{JobStore, SharedStore};
use crate::utils::{system_clock, Clock};

/// Prefix of content-hash identity keys
pub const HASH_KEY_PREFIX: &str = "sha256:";

/// Derive the identity key of a posting
pub fn identity_key(job: &JobUpsert) -> String {
    let url = job.job_url.trim();
    if !url.is_empty() {
        if let Some(normalized) = normalize_url(url) {
            return normalized;
        }
    }
    content_hash(&job.employer_name, &job.title, url)
}

fn content_hash(employer: &str, title: &str, url: &str) -> String {
    let material = format!(
        "{}|{}|{}",
        employer.trim().to_lowercase(),
        title.trim().to_lowercase(),
        url
    );
    format!("{HASH_KEY_PREFIX}{:x}", Sha256::digest(material.as_bytes()))
}

/// Counts for one ingested batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.skipped
    }

    /// Fold another batch into this one
    pub fn absorb(&mut self, other: IngestReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inserted={} updated={} skipped={}",
            self.inserted, self.updated, self.skipped
        )
    }
}

/// Writes raw postings to the store
#[derive(Clone)]
pub struct JobIngestor {
    store: SharedStore,
    clock: Clock,
}

impl JobIngestor {
    pub fn new(store: SharedStore) -> Self {
        Self::with_clock(store, system_clock())
    }

    pub fn with_clock(store: SharedStore, clock: Clock) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Upsert a batch, one atomic statement per posting
    pub fn ingest(&self, origin: &PostingOrigin, postings: &[RawPosting]) -> IngestReport {
        let mut report = IngestReport::default();

        for raw in postings {
            if raw.is_blank() {
                debug!(source = %origin.source, "Skipping posting without title or url");
                report.skipped += 1;
                continue;
            }

            let mut job = JobUpsert::from_raw(raw, origin);
            job.id = identity_key(&job);

            match self.store.upsert_job(&job, (self.clock)()) {
                Ok(UpsertOutcome::Inserted) => {
                    debug!(id = %job.id, title = %job.title, "Inserted job");
                    report.inserted += 1;
                }
                Ok(UpsertOutcome::Updated) => {
                    debug!(id = %job.id, title = %job.title, "Updated job");
                    report.updated += 1;
                }
                Err(e) => {
                    warn!(id = %job.id, source = %origin.source, error = %e, "Failed to persist job");
                    report.skipped += 1;
                }
            }
        }

        info!(
            source = %origin.source,
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            "Batch ingested"
        );
        report
    }
}

impl std::fmt::Debug for JobIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobIngestor").finish_non_exhaustive()
    }
}
