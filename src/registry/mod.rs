//! Employer registry stages
//!
//! - [`employers`]: fill the registry from ranking pages and a seed file
//! - [`discovery`]: resolve missing careers URLs

pub mod discovery;
pub mod employers;

pub use discovery::{CareersLookup, Discovery, DiscoveryReport, HeuristicTable, NoopLookup};
pub use employers::{read_seed_file, EmployerFetchReport, EmployerFetcher};
