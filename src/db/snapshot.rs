

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use super::{CandidateScan, CandidateSource, CandidateSourceError};


/// Profiles exported to a JSON file: either a bare array or `{"users": [...]}`.
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CandidateSource for SnapshotSource {
    async fn scan(&self) -> Result<CandidateScan, CandidateSourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let document: Value = serde_json::from_str(&raw)?;

        let records = match document {
            Value::Array(records) => records,
            Value::Object(mut map) => match map.remove("users") {
                Some(Value::Array(records)) => records,
                _ => {
                    return Err(CandidateSourceError::InvalidResponse(
                        "snapshot object has no \"users\" array".to_string(),
                    ));
                }
            },
            _ => {
                return Err(CandidateSourceError::InvalidResponse(
                    "snapshot is neither an array nor an object".to_string(),
                ));
            }
        };

        let mut scan = CandidateScan::default();
        for record in &records {
            scan.push_record(record, None);
        }

        info!(
            "Snapshot {}: {} candidates, {} skipped",
            self.path.display(),
            scan.candidates.len(),
            scan.skipped.len()
        );
        Ok(scan)
    }

    fn describe(&self) -> String {
        format!("snapshot:{}", self.path.display())
    }
}
