

use super::models::{Candidate, MatchTier};
use super::ranking::RankingConfig;


/// Lowercased name, role and space-joined skills of one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalFields {
    pub name: String,
    pub role: String,
    pub skills: String,
}

impl LexicalFields {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            name: candidate.name.to_lowercase(),
            role: candidate.role.to_lowercase(),
            skills: candidate.skills.join(" ").to_lowercase(),
        }
    }
}


/// Tiers are checked in strict priority order; `query` must already be normalized.
pub fn classify(query: &str, fields: &LexicalFields) -> MatchTier {
    if query.is_empty() {
        return MatchTier::Semantic;
    }
    if fields.name.contains(query) {
        MatchTier::Name
    } else if fields.role.contains(query) || fields.skills.contains(query) {
        MatchTier::RoleOrSkill
    } else {
        MatchTier::Semantic
    }
}


/// Final score for a tier, clamped into `[0, score_ceiling]`.
pub fn apply_boost(base_score: f64, tier: MatchTier, config: &RankingConfig) -> f64 {
    let boosted = match tier {
        MatchTier::Name => config.score_ceiling,
        MatchTier::RoleOrSkill => (base_score + config.boost_bonus).max(config.boost_floor),
        MatchTier::Semantic => base_score,
    };
    boosted.clamp(0.0, config.score_ceiling)
}
