

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::models::{Candidate, ScoredCandidate, SearchOutcome, SearchResponse};
use super::ranking::{RankingConfig, rank};
use super::sequencer::{SearchSequencer, SearchTicket};
use crate::core::error::{Result, SkillBridgeError};
use crate::db::{CandidateSource, CandidateSourceError, PartialScanPolicy};
use crate::llm::embeddings::EmbeddingClient;


/// Embeds a query once, then scores and selects candidates.
pub struct Ranker {
    embedder: Arc<dyn EmbeddingClient>,
    config: RankingConfig,
    partial_policy: PartialScanPolicy,
}

impl Ranker {

    pub fn new(embedder: Arc<dyn EmbeddingClient>, config: RankingConfig) -> Self {
        Self {
            embedder,
            config,
            partial_policy: PartialScanPolicy::default(),
        }
    }


    pub fn with_partial_policy(mut self, policy: PartialScanPolicy) -> Self {
        self.partial_policy = policy;
        self
    }


    pub fn config(&self) -> &RankingConfig {
        &self.config
    }


    pub fn embedder(&self) -> &Arc<dyn EmbeddingClient> {
        &self.embedder
    }

    /// `None` for an empty query: no embedding call is made.
    async fn embed_query(&self, query: &str) -> Result<Option<Vec<f32>>> {
        if query.trim().is_empty() {
            debug!("Empty query, skipping search");
            return Ok(None);
        }

        let vector = self.embedder.embed(query).await.map_err(|e| {
            warn!("Query embedding failed: {}", e);
            SkillBridgeError::EmbeddingUnavailable(e)
        })?;
        Ok(Some(vector))
    }


    /// Ranks an already-fetched candidate snapshot. At most `top_k` results.
    pub async fn search(
        &self,
        query: &str,
        candidates: &[Candidate],
        requester_id: Option<&str>,
    ) -> Result<Vec<ScoredCandidate>> {
        let sequencer = SearchSequencer::new();
        let ticket = sequencer.issue();
        let outcome = self
            .search_tracked(&sequencer, ticket, query, candidates, requester_id)
            .await?;
        outcome
            .completed()
            .ok_or_else(|| SkillBridgeError::Internal("private search was superseded".into()))
    }


    /// Like [`Ranker::search`], but discards the result if `ticket` is no longer current.
    pub async fn search_tracked(
        &self,
        sequencer: &SearchSequencer,
        ticket: SearchTicket,
        query: &str,
        candidates: &[Candidate],
        requester_id: Option<&str>,
    ) -> Result<SearchOutcome<Vec<ScoredCandidate>>> {
        let Some(query_vector) = self.embed_query(query).await? else {
            return Ok(SearchOutcome::Completed(Vec::new()));
        };

        if !sequencer.is_current(ticket) {
            debug!("Search #{} superseded after embedding", ticket.sequence());
            return Ok(SearchOutcome::Superseded);
        }

        let results = rank(query, &query_vector, candidates, requester_id, &self.config);

        if !sequencer.is_current(ticket) {
            return Ok(SearchOutcome::Superseded);
        }
        Ok(SearchOutcome::Completed(results))
    }


    /// Embeds the query, scans `source`, then ranks.
    pub async fn search_source(
        &self,
        query: &str,
        source: &dyn CandidateSource,
        requester_id: Option<&str>,
    ) -> Result<SearchResponse> {
        let sequencer = SearchSequencer::new();
        let ticket = sequencer.issue();
        let outcome = self
            .search_source_tracked(&sequencer, ticket, query, source, requester_id)
            .await?;
        outcome
            .completed()
            .ok_or_else(|| SkillBridgeError::Internal("private search was superseded".into()))
    }


    pub async fn search_source_tracked(
        &self,
        sequencer: &SearchSequencer,
        ticket: SearchTicket,
        query: &str,
        source: &dyn CandidateSource,
        requester_id: Option<&str>,
    ) -> Result<SearchOutcome<SearchResponse>> {
        let mut response = SearchResponse::empty(query);

        let Some(query_vector) = self.embed_query(query).await? else {
            return Ok(SearchOutcome::Completed(response));
        };

        let scan = source.scan().await.map_err(|e| {
            warn!("Candidate scan of {} failed: {}", source.describe(), e);
            SkillBridgeError::CandidateSourceUnavailable(e)
        })?;

        if let Some(fault) = &scan.fault {
            match self.partial_policy {
                PartialScanPolicy::Abort => {
                    return Err(SkillBridgeError::CandidateSourceUnavailable(
                        CandidateSourceError::Interrupted {
                            fetched: scan.candidates.len(),
                            reason: fault.clone(),
                        },
                    ));
                }
                PartialScanPolicy::RankPartial => {
                    warn!(
                        "Ranking partial candidate set ({} records) from {}: {}",
                        scan.candidates.len(),
                        source.describe(),
                        fault
                    );
                    response.partial = true;
                    response.source_fault = Some(fault.clone());
                }
            }
        }

        if !sequencer.is_current(ticket) {
            debug!("Search #{} superseded after scan", ticket.sequence());
            return Ok(SearchOutcome::Superseded);
        }

        response.candidates_scanned = scan.candidates.len();
        response.skipped_records = scan.skipped.len();
        response.results = rank(query, &query_vector, &scan.candidates, requester_id, &self.config);

        info!(
            "Search {} '{}': scanned={}, skipped={}, returned={}, partial={}",
            response.search_id,
            crate::preview(query, 40),
            response.candidates_scanned,
            response.skipped_records,
            response.results.len(),
            response.partial
        );

        if !sequencer.is_current(ticket) {
            return Ok(SearchOutcome::Superseded);
        }
        Ok(SearchOutcome::Completed(response))
    }
}
