//! Read-only views over the whole election, assembled for the API.

use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    model::{
        api::{
            ballot::{BallotCategory, CandidateDesc, CandidateTotal},
            results::{CandidateShare, CategoryAnalytics, CategoryResults, LiveCategory},
        },
        db::Category,
        mongodb::Id,
    },
    store::ElectionStore,
};

use super::tally::{self, leaders, percentage, CandidateTally};

impl From<&CandidateTally> for CandidateTotal {
    fn from(entry: &CandidateTally) -> Self {
        Self {
            candidate: entry.candidate.id.into(),
            name: entry.candidate.full_name(),
            votes: entry.votes,
        }
    }
}

fn totals(tally: &[CandidateTally]) -> Vec<CandidateTotal> {
    tally.iter().map(CandidateTotal::from).collect()
}

/// Every category with its current tally, in category order.
async fn tallies(store: &dyn ElectionStore) -> Result<Vec<(Category, Vec<CandidateTally>)>> {
    let categories = store.categories().await?;
    let mut tallies = Vec::with_capacity(categories.len());
    for category in categories {
        let tally = tally::tally(store, &category).await?;
        tallies.push((category, tally));
    }
    Ok(tallies)
}

/// The ballot as seen by one voter. Categories without candidates are left off.
pub async fn get_ballot(
    store: &dyn ElectionStore,
    voter: Id,
    now: DateTime<Utc>,
) -> Result<Vec<BallotCategory>> {
    let mut ballot = Vec::new();
    for category in store.categories().await? {
        let candidates = store.candidates_in(category.id).await?;
        if candidates.is_empty() {
            continue;
        }
        let counts = store.vote_counts(category.id).await?;
        let has_voted = store.has_voted(voter, category.id).await?;
        let tally = tally::rank(candidates.clone(), &counts);
        let leaders = leaders(&tally);

        ballot.push(BallotCategory {
            id: category.id.into(),
            start: category.window.start(),
            end: category.window.end(),
            status: category.window.status(now),
            candidates: candidates.into_iter().map(CandidateDesc::from).collect(),
            tally: totals(&tally),
            leading_candidate: leaders.leading.map(Into::into),
            tied_candidates: leaders.tied.into_iter().map(Into::into).collect(),
            has_voted,
            name: category.category.name,
        });
    }
    Ok(ballot)
}

/// Full tally of every category, each descending by votes.
pub async fn get_results(store: &dyn ElectionStore) -> Result<Vec<CategoryResults>> {
    Ok(tallies(store)
        .await?
        .into_iter()
        .map(|(category, tally)| CategoryResults {
            id: category.id.into(),
            tally: totals(&tally),
            name: category.category.name,
        })
        .collect())
}

/// Counts plus leader state, for clients polling for updates.
pub async fn get_live(store: &dyn ElectionStore) -> Result<Vec<LiveCategory>> {
    Ok(tallies(store)
        .await?
        .into_iter()
        .map(|(category, tally)| {
            let leaders = leaders(&tally);
            LiveCategory {
                id: category.id.into(),
                counts: totals(&tally),
                leading_candidate: leaders.leading.map(Into::into),
                tied_candidates: leaders.tied.into_iter().map(Into::into).collect(),
                name: category.category.name,
            }
        })
        .collect())
}

/// Winners of every category whose voting has ended by `now`.
pub async fn get_winners(
    store: &dyn ElectionStore,
    now: DateTime<Utc>,
) -> Result<Vec<CandidateDesc>> {
    let tallies = tallies(store).await?;
    let winners = tally::winners(
        tallies
            .iter()
            .map(|(category, tally)| (category, tally.as_slice())),
        now,
    );
    Ok(winners.into_iter().map(CandidateDesc::from).collect())
}

/// Per-category counts and percentage shares.
pub async fn get_analytics(store: &dyn ElectionStore) -> Result<Vec<CategoryAnalytics>> {
    Ok(tallies(store)
        .await?
        .into_iter()
        .map(|(category, tally)| {
            let total_votes = tally.iter().map(|entry| entry.votes).sum();
            CategoryAnalytics {
                id: category.id.into(),
                total_votes,
                candidates: tally
                    .iter()
                    .map(|entry| CandidateShare {
                        candidate: entry.candidate.id.into(),
                        name: entry.candidate.full_name(),
                        votes: entry.votes,
                        percentage: percentage(entry.votes, total_votes),
                    })
                    .collect(),
                name: category.category.name,
            }
        })
        .collect())
}
