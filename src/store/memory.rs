use std::collections::HashMap;

use rocket::tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::model::{
    common::VotingWindow,
    db::{
        Admin, Candidate, Category, IssuedOtp, NewAdmin, NewCandidate, NewCategory, NewVote,
        NewVoter, Vote, Voter,
    },
    mongodb::{Id, VOTER_CATEGORY_INDEX},
};

use super::ElectionStore;

#[derive(Default)]
struct Tables {
    voters: Vec<Voter>,
    admins: Vec<Admin>,
    categories: Vec<Category>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
}

/// An in-process store. Each operation holds a single lock for its whole
/// check-and-write, so unique constraints hold under concurrency exactly as
/// they do with the database's unique indexes.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl ElectionStore for MemoryStore {
    async fn voter(&self, id: Id) -> Result<Option<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables.voters.iter().find(|v| v.id == id).cloned())
    }

    async fn voter_by_voter_id(&self, voter_id: &str) -> Result<Option<Voter>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .voters
            .iter()
            .find(|v| v.voter_id == voter_id)
            .cloned())
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        let mut tables = self.tables.lock().await;
        if tables.voters.iter().any(|v| v.voter_id == voter.voter_id) {
            return Err(Error::Duplicate("voter_id".to_string()));
        }
        if tables.voters.iter().any(|v| v.email == voter.email) {
            return Err(Error::Duplicate("email".to_string()));
        }
        let voter = Voter {
            id: Id::new(),
            voter,
        };
        tables.voters.push(voter.clone());
        Ok(voter)
    }

    async fn set_voter_otp(&self, id: Id, otp: IssuedOtp) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.voters.iter_mut().find(|v| v.id == id) {
            Some(voter) => {
                voter.otp = Some(otp);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_voter_active(&self, voter_id: &str, active: bool) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.voters.iter_mut().find(|v| v.voter_id == voter_id) {
            Some(voter) => {
                voter.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        let tables = self.tables.lock().await;
        Ok(tables.admins.iter().find(|a| a.id == id).cloned())
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .admins
            .iter()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn admin_count(&self) -> Result<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.admins.len() as u64)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let mut tables = self.tables.lock().await;
        if tables.admins.iter().any(|a| a.username == admin.username) {
            return Err(Error::Duplicate("username".to_string()));
        }
        let admin = Admin {
            id: Id::new(),
            admin,
        };
        tables.admins.push(admin.clone());
        Ok(admin)
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.clone())
    }

    async fn category(&self, id: Id) -> Result<Option<Category>> {
        let tables = self.tables.lock().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category> {
        let mut tables = self.tables.lock().await;
        if tables.categories.iter().any(|c| c.name == category.name) {
            return Err(Error::Duplicate("name".to_string()));
        }
        let category = Category {
            id: Id::new(),
            category,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn set_category_window(&self, id: Id, window: VotingWindow) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.window = window;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn candidates_in(&self, category: Id) -> Result<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| c.category == category)
            .cloned()
            .collect())
    }

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let mut tables = self.tables.lock().await;
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        tables.candidates.push(candidate.clone());
        Ok(candidate)
    }

    async fn replace_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.candidates.iter_mut().find(|c| c.id == candidate.id) {
            Some(existing) => {
                *existing = candidate.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        let mut tables = self.tables.lock().await;
        if tables
            .votes
            .iter()
            .any(|v| v.voter == vote.voter && v.category == vote.category)
        {
            return Err(Error::Duplicate(VOTER_CATEGORY_INDEX.to_string()));
        }
        let vote = Vote {
            id: Id::new(),
            vote,
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn has_voted(&self, voter: Id, category: Id) -> Result<bool> {
        let tables = self.tables.lock().await;
        Ok(tables
            .votes
            .iter()
            .any(|v| v.voter == voter && v.category == category))
    }

    async fn vote_counts(&self, category: Id) -> Result<HashMap<Id, u64>> {
        let tables = self.tables.lock().await;
        let mut counts = HashMap::new();
        for vote in tables.votes.iter().filter(|v| v.category == category) {
            *counts.entry(vote.candidate).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn votes(&self) -> Result<Vec<Vote>> {
        let tables = self.tables.lock().await;
        Ok(tables.votes.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[rocket::async_test]
    async fn voter_id_and_email_are_unique() {
        let store = MemoryStore::new();
        store.insert_voter(NewVoter::example()).await.unwrap();

        let mut same_id = NewVoter::example2();
        same_id.voter_id = NewVoter::example().voter_id;
        assert!(matches!(
            store.insert_voter(same_id).await,
            Err(Error::Duplicate(field)) if field == "voter_id"
        ));

        let mut same_email = NewVoter::example2();
        same_email.email = NewVoter::example().email;
        assert!(matches!(
            store.insert_voter(same_email).await,
            Err(Error::Duplicate(field)) if field == "email"
        ));

        store.insert_voter(NewVoter::example2()).await.unwrap();
    }

    #[rocket::async_test]
    async fn second_vote_in_category_is_rejected() {
        let store = MemoryStore::new();
        let (voter, category) = (Id::new(), Id::new());
        let vote = |candidate| NewVote {
            voter,
            candidate,
            category,
            cast_at: Utc::now(),
        };

        store.insert_vote(vote(Id::new())).await.unwrap();
        assert!(matches!(
            store.insert_vote(vote(Id::new())).await,
            Err(Error::Duplicate(_))
        ));
        assert_eq!(store.votes().await.unwrap().len(), 1);

        // Same voter, different category is fine.
        let mut elsewhere = vote(Id::new());
        elsewhere.category = Id::new();
        store.insert_vote(elsewhere).await.unwrap();
    }

    #[rocket::async_test]
    async fn vote_counts_only_cover_the_category() {
        let store = MemoryStore::new();
        let (category, other) = (Id::new(), Id::new());
        let (alice, bob) = (Id::new(), Id::new());
        for (candidate, category) in [(alice, category), (alice, category), (bob, category), (bob, other)] {
            store
                .insert_vote(NewVote {
                    voter: Id::new(),
                    candidate,
                    category,
                    cast_at: Utc::now(),
                })
                .await
                .unwrap();
        }

        let counts = store.vote_counts(category).await.unwrap();
        assert_eq!(counts.get(&alice), Some(&2));
        assert_eq!(counts.get(&bob), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
