

pub mod boost;
pub mod cache;
pub mod models;
pub mod ranker;
pub mod ranking;
pub mod sequencer;
pub mod similarity;


pub use boost::{LexicalFields, apply_boost, classify};
pub use cache::{CacheStats, QueryEmbeddingCache};
pub use models::{Candidate, MatchTier, ScoredCandidate, SearchOutcome, SearchResponse};
pub use ranker::Ranker;
pub use ranking::{RankingConfig, rank, score_candidate, select_top_k};
pub use sequencer::{SearchSequencer, SearchTicket};
pub use similarity::cosine_similarity;
