//! Remote record values
//!
//! One record in the remote store mirrors one tracked filesystem entry.

use serde::{Deserialize, Serialize};

use crate::frequency::Frequency;

/// Lifecycle status of a remote record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
}

/// Value stored under a server-generated key in the remote namespace.
///
/// The key itself is not part of the value; it is assigned by the store on
/// creation and never changes for the lifetime of the mirrored entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Normalized frequency extracted from the entry name
    pub frequency: Frequency,
    /// Entry name as it appeared on disk when last written
    pub name: String,
    /// Absolute path of the mirrored entry
    pub path: String,
    pub status: RecordStatus,
    /// Unix seconds, set once at creation
    pub created_at: i64,
    /// Unix seconds, refreshed on every remote write for this entry
    pub updated_at: i64,
}

impl RemoteRecord {
    /// Build a fresh record for a newly observed entry.
    pub fn new(frequency: Frequency, name: impl Into<String>, path: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            frequency,
            name: name.into(),
            path: path.into(),
            status: RecordStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_with_normalized_frequency() {
        let freq = Frequency::parse_exact("045,100").unwrap();
        let record = RemoteRecord::new(freq, "045,100", "/watch/045,100");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["frequency"], "045.100");
        assert_eq!(value["name"], "045,100");
        assert_eq!(value["status"], "active");
        assert_eq!(value["created_at"], value["updated_at"]);
    }

    #[test]
    fn test_record_round_trips() {
        let freq = Frequency::parse_exact("044.800").unwrap();
        let record = RemoteRecord::new(freq, "044.800", "/watch/044.800");

        let json = serde_json::to_string(&record).unwrap();
        let back: RemoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
