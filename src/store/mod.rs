//! Repository-style access to everything the election core persists.
//!
//! Every method is a single atomic operation against the backing store.
//! Inserts that would violate a unique constraint fail with
//! [`Error::Duplicate`](crate::error::Error::Duplicate) and write nothing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{
    common::VotingWindow,
    db::{
        Admin, Candidate, Category, IssuedOtp, NewAdmin, NewCandidate, NewCategory, NewVote,
        NewVoter, Vote, Voter,
    },
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// The shared store, as placed in managed state.
pub type Store = Arc<dyn ElectionStore>;

#[rocket::async_trait]
pub trait ElectionStore: Send + Sync {
    // Identity store.

    async fn voter(&self, id: Id) -> Result<Option<Voter>>;

    async fn voter_by_voter_id(&self, voter_id: &str) -> Result<Option<Voter>>;

    /// Insert a voter. Fails with `Duplicate` if the voter ID or email is taken.
    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter>;

    /// Overwrite the voter's OTP. Returns false if no such voter exists.
    async fn set_voter_otp(&self, id: Id, otp: IssuedOtp) -> Result<bool>;

    /// Returns false if no voter has the given voter ID.
    async fn set_voter_active(&self, voter_id: &str, active: bool) -> Result<bool>;

    async fn admin(&self, id: Id) -> Result<Option<Admin>>;

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>>;

    async fn admin_count(&self) -> Result<u64>;

    /// Insert an admin. Fails with `Duplicate` if the username is taken.
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin>;

    // Election catalog.

    /// All categories, in creation order.
    async fn categories(&self) -> Result<Vec<Category>>;

    async fn category(&self, id: Id) -> Result<Option<Category>>;

    /// Insert a category. Fails with `Duplicate` if the name is taken.
    async fn insert_category(&self, category: NewCategory) -> Result<Category>;

    /// Returns false if no such category exists.
    async fn set_category_window(&self, id: Id, window: VotingWindow) -> Result<bool>;

    /// All candidates standing in the given category, in creation order.
    async fn candidates_in(&self, category: Id) -> Result<Vec<Candidate>>;

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>>;

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate>;

    /// Returns false if no such candidate exists.
    async fn replace_candidate(&self, candidate: &Candidate) -> Result<bool>;

    // Vote ledger.

    /// Insert a vote. Fails with `Duplicate` if the voter already has a vote in
    /// that category, including when a concurrent insert won the race.
    async fn insert_vote(&self, vote: NewVote) -> Result<Vote>;

    async fn has_voted(&self, voter: Id, category: Id) -> Result<bool>;

    /// Number of votes per candidate in the given category.
    /// Candidates with no votes are absent.
    async fn vote_counts(&self, category: Id) -> Result<HashMap<Id, u64>>;

    /// Every vote, in the order cast.
    async fn votes(&self) -> Result<Vec<Vote>>;
}
