//! Vote counts are never stored. Every function here derives its answer
//! from the votes as they are right now.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    model::{
        common::VotingStatus,
        db::{Candidate, Category},
        mongodb::Id,
    },
    store::ElectionStore,
};

/// One candidate and the number of votes cast for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTally {
    pub candidate: Candidate,
    pub votes: u64,
}

/// Who is ahead in a category.
///
/// At most one of the fields is populated: a single leader, or the set of
/// candidates sharing the top count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaders {
    pub leading: Option<Id>,
    pub tied: Vec<Id>,
}

/// Pair each candidate with their count and sort descending by votes.
/// The sort is stable, so equal counts keep the candidates' given order.
pub fn rank(candidates: Vec<Candidate>, counts: &HashMap<Id, u64>) -> Vec<CandidateTally> {
    let mut tally: Vec<_> = candidates
        .into_iter()
        .map(|candidate| CandidateTally {
            votes: counts.get(&candidate.id).copied().unwrap_or(0),
            candidate,
        })
        .collect();
    tally.sort_by(|a, b| b.votes.cmp(&a.votes));
    tally
}

/// Count the votes for every candidate standing in the category.
pub async fn tally(store: &dyn ElectionStore, category: &Category) -> Result<Vec<CandidateTally>> {
    let candidates = store.candidates_in(category.id).await?;
    let counts = store.vote_counts(category.id).await?;
    Ok(rank(candidates, &counts))
}

/// The candidates holding the highest count in a tally.
fn at_max(tally: &[CandidateTally]) -> impl Iterator<Item = &CandidateTally> {
    let max = tally.iter().map(|entry| entry.votes).max().unwrap_or(0);
    tally.iter().filter(move |entry| entry.votes == max)
}

pub fn leaders(tally: &[CandidateTally]) -> Leaders {
    let top: Vec<Id> = at_max(tally).map(|entry| entry.candidate.id).collect();
    match top.len() {
        0 => Leaders::default(),
        1 => Leaders {
            leading: Some(top[0]),
            tied: Vec::new(),
        },
        _ => Leaders {
            leading: None,
            tied: top,
        },
    }
}

/// Share of the category's votes, as a percentage. Zero when nothing was cast.
pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        votes as f64 / total as f64 * 100.0
    }
}

/// Every candidate at the top of a category whose voting has ended.
/// Categories still open or not yet started contribute nothing. The result
/// follows category order, then tally order, with repeats removed.
pub fn winners<'a, I>(tallies: I, now: DateTime<Utc>) -> Vec<Candidate>
where
    I: IntoIterator<Item = (&'a Category, &'a [CandidateTally])>,
{
    let mut seen = HashSet::new();
    let mut winners = Vec::new();
    for (category, tally) in tallies {
        if category.window.status(now) != VotingStatus::Ended {
            continue;
        }
        for entry in at_max(tally) {
            if seen.insert(entry.candidate.id) {
                winners.push(entry.candidate.clone());
            }
        }
    }
    winners
}
