use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{ballot::CandidateTotal, id::ApiId},
    db::Vote,
};

/// The full tally of one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryResults {
    pub id: ApiId,
    pub name: String,
    /// Descending by votes.
    pub tally: Vec<CandidateTotal>,
}

/// Polled by clients for near-live updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveCategory {
    pub id: ApiId,
    pub name: String,
    /// Descending by votes.
    pub counts: Vec<CandidateTotal>,
    pub leading_candidate: Option<ApiId>,
    pub tied_candidates: Vec<ApiId>,
}

/// A candidate's share of the votes cast in their category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateShare {
    pub candidate: ApiId,
    pub name: String,
    pub votes: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnalytics {
    pub id: ApiId,
    pub name: String,
    pub total_votes: u64,
    pub candidates: Vec<CandidateShare>,
}

/// A vote as listed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteDesc {
    pub id: ApiId,
    pub voter: ApiId,
    pub candidate: ApiId,
    pub category: ApiId,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for VoteDesc {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id.into(),
            voter: vote.voter.into(),
            candidate: vote.candidate.into(),
            category: vote.category.into(),
            cast_at: vote.cast_at,
        }
    }
}
