use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::version::OrderKey;

/// Metadata for one stored version.
///
/// `hash` is `None` only for records written before hashing existed; the
/// store backfills it and never clears it again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
    pub size: u64,
    #[serde(with = "crate::timestamp")]
    pub uploaded_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl VersionRecord {
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        size: u64,
        uploaded_at: OffsetDateTime,
        hash: String,
    ) -> Self {
        Self {
            version: version.into(),
            size,
            uploaded_at,
            hash: Some(hash),
        }
    }

    #[must_use]
    pub fn order_key(&self) -> OrderKey {
        OrderKey::parse(&self.version)
    }

    #[must_use]
    pub fn needs_backfill(&self) -> bool {
        self.hash.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_record_without_hash_loads() -> anyhow::Result<()> {
        let record: VersionRecord = serde_json::from_value(json!({
            "version": "v1.0",
            "size": 42,
            "uploaded_at": "2025-01-01T12:30:05Z",
        }))?;
        assert_eq!(record.version, "v1.0");
        assert_eq!(record.size, 42);
        assert!(record.needs_backfill());
        Ok(())
    }

    #[test]
    fn serializes_in_document_shape() -> anyhow::Result<()> {
        let ts = OffsetDateTime::from_unix_timestamp(1_735_734_605)?;
        let record = VersionRecord::new("v2.0", 7, ts, "ab".repeat(32));
        let value = serde_json::to_value(&record)?;
        assert_eq!(
            value,
            json!({
                "version": "v2.0",
                "size": 7,
                "uploaded_at": "2025-01-01T12:30:05Z",
                "hash": "ab".repeat(32),
            })
        );
        Ok(())
    }
}
