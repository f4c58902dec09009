

pub mod core;
pub mod db;
pub mod llm;
pub mod mcp;
pub mod search;
pub mod utils;

pub use utils::{normalize_query, preview};


pub use core::config::SkillBridgeConfig;
pub use core::error::{Result, SkillBridgeError};
pub use db::{CandidateScan, CandidateSource, CandidateSourceError, PartialScanPolicy};
pub use llm::embeddings::{EmbeddingClient, EmbeddingError, HttpEmbeddingClient};
pub use search::{Candidate, Ranker, RankingConfig, ScoredCandidate, SearchResponse};


pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080";


pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";


pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;
