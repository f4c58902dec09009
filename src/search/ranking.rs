

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::boost::{LexicalFields, apply_boost, classify};
use super::models::{Candidate, ScoredCandidate};
use super::similarity::similarity_or_zero;
use crate::core::error::{Result, SkillBridgeError};


/// Hand-tuned ranking constants. Changing them changes product behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Scores below this are dropped.
    pub min_score: f64,
    /// Added to the vector score on a role/skill match.
    pub boost_bonus: f64,
    /// Lowest score a role/skill match can get.
    pub boost_floor: f64,
    /// Upper bound of every score; also the name-match score.
    pub score_ceiling: f64,
    pub top_k: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_score: 0.35,
            boost_bonus: 0.3,
            boost_floor: 0.8,
            score_ceiling: 1.0,
            top_k: 5,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.min_score)
            || !unit.contains(&self.boost_floor)
            || !unit.contains(&self.score_ceiling)
        {
            return Err(SkillBridgeError::Config(
                "ranking.min_score, boost_floor and score_ceiling must lie in [0, 1]".into(),
            ));
        }
        if !self.boost_bonus.is_finite() || self.boost_bonus < 0.0 {
            return Err(SkillBridgeError::Config("ranking.boost_bonus must be non-negative".into()));
        }
        if self.top_k == 0 {
            return Err(SkillBridgeError::Config("ranking.top_k must be positive".into()));
        }
        Ok(())
    }
}


/// Scores one candidate; `query` must already be normalized.
pub fn score_candidate(
    query: &str,
    query_vector: &[f32],
    candidate: &Candidate,
    config: &RankingConfig,
) -> ScoredCandidate {
    let base_score = similarity_or_zero(query_vector, candidate.embedding.as_deref());
    let fields = LexicalFields::from_candidate(candidate);
    let tier = classify(query, &fields);
    let score = apply_boost(base_score, tier, config);

    ScoredCandidate {
        candidate: candidate.clone(),
        score,
        tier,
    }
}


/// Threshold, stable descending sort, truncate to `top_k`.
pub fn select_top_k(scored: Vec<ScoredCandidate>, config: &RankingConfig) -> Vec<ScoredCandidate> {
    let mut retained: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|s| s.score >= config.min_score)
        .collect();

    // sort_by is stable: equal scores keep input order
    retained.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    retained.truncate(config.top_k);
    retained
}


pub fn rank(
    query: &str,
    query_vector: &[f32],
    candidates: &[Candidate],
    requester_id: Option<&str>,
    config: &RankingConfig,
) -> Vec<ScoredCandidate> {
    let query = crate::normalize_query(query);
    if query.is_empty() {
        return Vec::new();
    }

    let scored: Vec<ScoredCandidate> = candidates
        .iter()
        .filter(|c| requester_id != Some(c.id.as_str()))
        .map(|c| score_candidate(&query, query_vector, c, config))
        .collect();

    let total = scored.len();
    let ranked = select_top_k(scored, config);
    debug!(
        "Ranked '{}': scored={}, returned={}",
        crate::preview(&query, 40),
        total,
        ranked.len()
    );
    ranked
}
