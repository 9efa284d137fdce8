//! Persistence for employers and job postings
//!
//! SQLite holds two tables: the employer registry and the deduplicated job
//! store. Access goes through the repository traits so the pipeline can run
//! against an in-memory store in tests.

pub mod dedup;
pub mod repository;
pub mod schema;

pub use dedup::{identity_key, IngestReport, JobIngestor, HASH_KEY_PREFIX};
pub use repository::{EmployerStore, JobStore, MemoryStore, SharedStore, SqliteStore, Store};
pub use schema::SCHEMA;
