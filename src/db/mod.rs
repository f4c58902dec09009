

pub mod firestore;
pub mod records;
pub mod snapshot;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::core::config::{StoreConfig, StoreKind};
use crate::search::models::Candidate;

pub use firestore::FirestoreSource;
pub use records::{MalformedCandidate, decode_profile};
pub use snapshot::SnapshotSource;


#[derive(Debug, Error)]
pub enum CandidateSourceError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Retry exhausted after {0} attempts: {1}")]
    RetryExhausted(u32, String),
    #[error("Scan interrupted after {fetched} records: {reason}")]
    Interrupted { fetched: usize, reason: String },
    #[error("Source misconfigured: {0}")]
    Misconfigured(String),
}


/// What to do when a scan faults after some records were already read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialScanPolicy {
    /// Fail the whole search.
    #[default]
    Abort,
    /// Rank what was fetched and flag the response as partial.
    RankPartial,
}


#[derive(Debug, Default)]
pub struct CandidateScan {
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<MalformedCandidate>,
    /// Set when enumeration stopped early; `candidates` then holds only what was read.
    pub fault: Option<String>,
}

impl CandidateScan {
    pub fn is_complete(&self) -> bool {
        self.fault.is_none()
    }

    /// Decodes raw records in order, skipping malformed ones.
    pub fn push_record(&mut self, record: &serde_json::Value, fallback_id: Option<&str>) {
        match decode_profile(record, fallback_id) {
            Ok(candidate) => self.candidates.push(candidate),
            Err(malformed) => {
                tracing::warn!("Skipping malformed profile: {}", malformed);
                self.skipped.push(malformed);
            }
        }
    }
}


#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Full scan. `Err` only when nothing could be read at all.
    async fn scan(&self) -> Result<CandidateScan, CandidateSourceError>;


    fn describe(&self) -> String;
}


#[async_trait]
impl CandidateSource for Arc<dyn CandidateSource> {
    async fn scan(&self) -> Result<CandidateScan, CandidateSourceError> {
        (**self).scan().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}


pub fn build_source(config: &StoreConfig) -> Result<Arc<dyn CandidateSource>, CandidateSourceError> {
    match config.kind {
        StoreKind::Firestore => Ok(Arc::new(FirestoreSource::new(config)?)),
        StoreKind::Snapshot => {
            let path = config.snapshot_path.clone().ok_or_else(|| {
                CandidateSourceError::Misconfigured("snapshot_path not set".to_string())
            })?;
            Ok(Arc::new(SnapshotSource::new(path)))
        }
    }
}
