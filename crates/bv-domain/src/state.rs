//! In-memory metadata index.
//!
//! `IndexState` is the document persisted as `metadata.json`. Every mutation
//! goes through [`IndexState::upsert`], which keeps version strings unique
//! and the sequence sorted by [`OrderKey`]. Nothing here touches the
//! filesystem.

use serde::{Deserialize, Serialize};

use crate::record::VersionRecord;
use crate::version::OrderKey;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexState {
    #[serde(default)]
    versions: Vec<VersionRecord>,
}

impl IndexState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records as loaded, without re-sorting them.
    #[must_use]
    pub fn from_records(versions: Vec<VersionRecord>) -> Self {
        Self { versions }
    }

    /// Replace any record for the same version, then re-sort.
    ///
    /// The sort is stable, so records whose keys compare equal keep their
    /// relative order and a replacement lands after its equal-keyed peers.
    #[must_use]
    pub fn upsert(mut self, record: VersionRecord) -> Self {
        self.versions.retain(|existing| existing.version != record.version);
        self.versions.push(record);
        self.versions.sort_by_cached_key(VersionRecord::order_key);
        self
    }

    #[must_use]
    pub fn latest(&self) -> Option<&VersionRecord> {
        self.versions.last()
    }

    #[must_use]
    pub fn find(&self, version: &str) -> Option<&VersionRecord> {
        self.versions.iter().find(|record| record.version == version)
    }

    #[must_use]
    pub fn records(&self) -> &[VersionRecord] {
        &self.versions
    }

    #[must_use]
    pub fn into_records(self) -> Vec<VersionRecord> {
        self.versions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Versions whose records still lack a content hash.
    #[must_use]
    pub fn pending_backfill(&self) -> Vec<String> {
        self.versions
            .iter()
            .filter(|record| record.needs_backfill())
            .map(|record| record.version.clone())
            .collect()
    }

    /// Fill in a missing hash in place. Existing hashes are never replaced,
    /// and no other field or the record's position changes.
    ///
    /// Returns `true` when the record was updated.
    pub fn fill_hash(&mut self, version: &str, hash: String) -> bool {
        match self
            .versions
            .iter_mut()
            .find(|record| record.version == version)
        {
            Some(record) if record.hash.is_none() => {
                record.hash = Some(hash);
                true
            }
            _ => false,
        }
    }

    /// Whether the sequence is ordered by [`OrderKey`].
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        self.versions
            .windows(2)
            .all(|pair| OrderKey::parse(&pair[0].version) <= OrderKey::parse(&pair[1].version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn record(version: &str, size: u64) -> VersionRecord {
        VersionRecord::new(
            version,
            size,
            OffsetDateTime::UNIX_EPOCH,
            format!("hash-{version}-{size}"),
        )
    }

    fn versions(state: &IndexState) -> Vec<&str> {
        state.records().iter().map(|r| r.version.as_str()).collect()
    }

    #[test]
    fn upsert_sorts_numerically() {
        let state = IndexState::new()
            .upsert(record("v1.0", 1))
            .upsert(record("v10.0", 2))
            .upsert(record("v2.0", 3));
        assert_eq!(versions(&state), ["v1.0", "v2.0", "v10.0"]);
        assert!(state.is_sorted());
    }

    #[test]
    fn upsert_replaces_same_version() {
        let state = IndexState::new()
            .upsert(record("v1.0", 1))
            .upsert(record("v2.0", 2))
            .upsert(record("v1.0", 99));
        assert_eq!(state.len(), 2);
        let replaced = state.find("v1.0").expect("v1.0 present");
        assert_eq!(replaced.size, 99);
        assert_eq!(replaced.hash.as_deref(), Some("hash-v1.0-99"));
    }

    #[test]
    fn equal_keys_keep_insertion_order() {
        let state = IndexState::new()
            .upsert(record("v1", 1))
            .upsert(record("v1.0", 2))
            .upsert(record("v1.abc", 3));
        assert_eq!(versions(&state), ["v1", "v1.0", "v1.abc"]);

        let state = state.upsert(record("v1", 4));
        assert_eq!(versions(&state), ["v1.0", "v1.abc", "v1"]);
    }

    #[test]
    fn latest_and_find() {
        let empty = IndexState::new();
        assert!(empty.latest().is_none());
        assert!(empty.find("v1.0").is_none());

        let state = IndexState::new()
            .upsert(record("v2.0", 2))
            .upsert(record("v1.0", 1));
        assert_eq!(state.latest().map(|r| r.version.as_str()), Some("v2.0"));
        assert_eq!(state.find("v1.0").map(|r| r.size), Some(1));
        assert!(state.find("v1").is_none());
    }

    #[test]
    fn fill_hash_only_touches_missing_hashes() {
        let mut legacy = record("v1.0", 1);
        legacy.hash = None;
        let mut state = IndexState::from_records(vec![record("v2.0", 2), legacy]);
        assert_eq!(state.pending_backfill(), ["v1.0"]);

        assert!(state.fill_hash("v1.0", "abc".into()));
        assert!(!state.fill_hash("v1.0", "def".into()));
        assert!(!state.fill_hash("v2.0", "def".into()));
        assert!(!state.fill_hash("v9.9", "def".into()));

        assert_eq!(versions(&state), ["v2.0", "v1.0"]);
        assert_eq!(state.find("v1.0").and_then(|r| r.hash.as_deref()), Some("abc"));
        assert!(state.pending_backfill().is_empty());
    }

    #[test]
    fn document_shape_round_trips() -> anyhow::Result<()> {
        let raw = r#"{"versions":[{"version":"v1.0","size":3,"uploaded_at":"2025-01-01T00:00:00Z"}]}"#;
        let state: IndexState = serde_json::from_str(raw)?;
        assert_eq!(state.len(), 1);
        assert_eq!(state.pending_backfill(), ["v1.0"]);

        let empty: IndexState = serde_json::from_str("{}")?;
        assert!(empty.is_empty());
        Ok(())
    }
}
