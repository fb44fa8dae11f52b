use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, common::VotingStatus, db::Candidate};

/// A vote as submitted by a voter. Both IDs arrive as opaque strings from the
/// ballot form; an absent candidate means nothing was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub category: String,
    #[serde(default)]
    pub candidate: Option<String>,
}

/// A candidate as shown on the ballot and in the winners list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    pub id: ApiId,
    pub category: ApiId,
    pub full_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    pub level_of_study: String,
    pub year_of_study: String,
    pub position: String,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            category: candidate.category.into(),
            full_name: candidate.full_name(),
            first_name: candidate.candidate.first_name,
            middle_name: candidate.candidate.middle_name,
            last_name: candidate.candidate.last_name,
            course: candidate.candidate.course,
            level_of_study: candidate.candidate.level_of_study,
            year_of_study: candidate.candidate.year_of_study,
            position: candidate.candidate.position,
        }
    }
}

/// One row of a tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTotal {
    pub candidate: ApiId,
    pub name: String,
    pub votes: u64,
}

/// Everything a voter sees for one category of the ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotCategory {
    pub id: ApiId,
    pub name: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: VotingStatus,
    pub candidates: Vec<CandidateDesc>,
    /// Descending by votes.
    pub tally: Vec<CandidateTotal>,
    pub leading_candidate: Option<ApiId>,
    pub tied_candidates: Vec<ApiId>,
    pub has_voted: bool,
}
