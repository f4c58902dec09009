

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;


/// Read-only profile snapshot fed to the ranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Candidate {

    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }


    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }


    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }


    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}


/// Which boost tier decided a candidate's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchTier {
    /// Query found in the name.
    Name,
    /// Query found in the role or skills text.
    RoleOrSkill,
    /// No lexical match; pure vector similarity.
    Semantic,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub score: f64,
    pub tier: MatchTier,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub search_id: uuid::Uuid,
    pub query: String,
    pub results: Vec<ScoredCandidate>,
    pub candidates_scanned: usize,
    pub skipped_records: usize,
    /// Set when the candidate scan faulted part-way and the fetched subset was ranked.
    pub partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_fault: Option<String>,
    pub searched_at: DateTime<Utc>,
}

impl SearchResponse {

    pub fn empty(query: &str) -> Self {
        Self {
            search_id: uuid::Uuid::new_v4(),
            query: query.to_string(),
            results: Vec::new(),
            candidates_scanned: 0,
            skipped_records: 0,
            partial: false,
            source_fault: None,
            searched_at: Utc::now(),
        }
    }
}


#[derive(Debug, Clone)]
pub enum SearchOutcome<T> {
    Completed(T),
    /// A newer search was issued before this one finished; its results are discarded.
    Superseded,
}

impl<T> SearchOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
