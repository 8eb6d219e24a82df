//! Durable storage for versioned build artifacts.

pub mod changelog;
pub mod config;
pub mod error;
pub mod hash;
pub mod index;
mod lock;
pub mod store;

pub use changelog::ChangelogStore;
pub use config::{default_root, StoreConfig};
pub use error::StoreError;
pub use index::{LoadedIndex, MetadataIndex};
pub use store::{
    ArtifactReader, ArtifactStore, BackfillSummary, OpenReport, StagingSweep, VerifyReport,
    VerifyStatus,
};

pub use bv_domain::{compare_versions, IndexState, OrderKey, VersionRecord};
