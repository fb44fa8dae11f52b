use chrono::{DateTime, Utc};

use crate::{
    error::{Error, Result},
    model::{db::NewVote, mongodb::Id},
    store::ElectionStore,
};

/// What happened to an attempt to cast a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Ok,
    /// The voter already has a vote in this category, whether cast earlier or
    /// by a concurrent request that won the race.
    AlreadyVoted,
    /// No such candidate, or the candidate stands in a different category.
    UnknownCandidate,
    UnknownCategory,
    /// `now` is outside the category's voting window.
    CategoryClosed,
}

/// Admit a vote for `candidate_id` in `category_id`.
///
/// The IDs are taken as submitted; one that does not parse is simply unknown.
/// Nothing is written unless every check passes, and the final insert relies
/// on the store's `(voter, category)` uniqueness constraint rather than on a
/// prior read, so concurrent casts by the same voter admit exactly one vote.
pub async fn cast_vote(
    store: &dyn ElectionStore,
    voter: Id,
    category_id: &str,
    candidate_id: &str,
    now: DateTime<Utc>,
) -> Result<CastOutcome> {
    let Ok(candidate_id) = candidate_id.parse::<Id>() else {
        return Ok(CastOutcome::UnknownCandidate);
    };
    let Some(candidate) = store.candidate(candidate_id).await? else {
        return Ok(CastOutcome::UnknownCandidate);
    };

    let Ok(category_id) = category_id.parse::<Id>() else {
        return Ok(CastOutcome::UnknownCategory);
    };
    let Some(category) = store.category(category_id).await? else {
        return Ok(CastOutcome::UnknownCategory);
    };

    if candidate.category != category.id {
        debug!(
            "Candidate {} does not stand in category {}",
            candidate.id, category.id
        );
        return Ok(CastOutcome::UnknownCandidate);
    }

    if !category.window.is_open(now) {
        return Ok(CastOutcome::CategoryClosed);
    }

    let vote = NewVote {
        voter,
        candidate: candidate.id,
        category: category.id,
        cast_at: now,
    };
    match store.insert_vote(vote).await {
        Ok(vote) => {
            info!(
                "Admitted vote {} by {voter} in category {}",
                vote.id, category.name
            );
            Ok(CastOutcome::Ok)
        }
        Err(Error::Duplicate(index)) => {
            warn!("Rejected repeat vote by {voter} in category {} ({index})", category.name);
            Ok(CastOutcome::AlreadyVoted)
        }
        Err(e) => Err(e),
    }
}
