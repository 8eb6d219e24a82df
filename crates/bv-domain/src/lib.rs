#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Domain types for the build-artifact store: version ordering, per-version
//! records and the in-memory metadata index.

pub mod record;
pub mod state;
pub mod timestamp;
pub mod version;

pub use record::VersionRecord;
pub use state::IndexState;
pub use version::{compare_versions, validate_version, InvalidVersion, OrderKey};
