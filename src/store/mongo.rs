use std::collections::HashMap;

use mongodb::{
    bson::{doc, to_bson, Bson, Document},
    error::Error as DbError,
    options::FindOptions,
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::VotingWindow,
    db::{
        Admin, Candidate, Category, IssuedOtp, NewAdmin, NewCandidate, NewCategory, NewVote,
        NewVoter, Vote, Voter,
    },
    mongodb::{duplicate_key_index, ensure_indexes_exist, Coll, Id},
};

use super::ElectionStore;

/// The production store, backed by MongoDB.
///
/// Uniqueness is enforced by the indexes created in [`ensure_indexes_exist`],
/// so inserts are single writes with no prior existence check.
pub struct MongoStore {
    voters: Coll<Voter>,
    new_voters: Coll<NewVoter>,
    admins: Coll<Admin>,
    new_admins: Coll<NewAdmin>,
    categories: Coll<Category>,
    new_categories: Coll<NewCategory>,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
}

impl MongoStore {
    /// Wrap the given database, creating any missing indexes first.
    pub async fn new(db: &Database) -> std::result::Result<Self, DbError> {
        ensure_indexes_exist(db).await?;
        Ok(Self {
            voters: Coll::from_db(db),
            new_voters: Coll::from_db(db),
            admins: Coll::from_db(db),
            new_admins: Coll::from_db(db),
            categories: Coll::from_db(db),
            new_categories: Coll::from_db(db),
            candidates: Coll::from_db(db),
            new_candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
            new_votes: Coll::from_db(db),
        })
    }
}

/// Convert a write error into `Error::Duplicate` if it violated a unique index.
fn map_write_error(err: DbError) -> Error {
    match duplicate_key_index(&err) {
        Some(index) => Error::Duplicate(index),
        None => Error::Db(err),
    }
}

/// Extract the ID the database assigned to a freshly inserted document.
fn inserted_id(id: Bson) -> Result<Id> {
    id.as_object_id().map(Id::from).ok_or_else(|| {
        Error::Status(
            rocket::http::Status::InternalServerError,
            format!("Database returned a non-ObjectId insert ID: {id}"),
        )
    })
}

/// Sort by ID ascending, which for ObjectIds is creation order.
fn creation_order() -> FindOptions {
    FindOptions::builder().sort(doc! {"_id": 1}).build()
}

#[rocket::async_trait]
impl ElectionStore for MongoStore {
    async fn voter(&self, id: Id) -> Result<Option<Voter>> {
        Ok(self.voters.find_one(id.as_doc(), None).await?)
    }

    async fn voter_by_voter_id(&self, voter_id: &str) -> Result<Option<Voter>> {
        Ok(self
            .voters
            .find_one(doc! {"voter_id": voter_id}, None)
            .await?)
    }

    async fn insert_voter(&self, voter: NewVoter) -> Result<Voter> {
        let result = self
            .new_voters
            .insert_one(&voter, None)
            .await
            .map_err(map_write_error)?;
        Ok(Voter {
            id: inserted_id(result.inserted_id)?,
            voter,
        })
    }

    async fn set_voter_otp(&self, id: Id, otp: IssuedOtp) -> Result<bool> {
        let update = doc! {
            "$set": { "otp": to_bson(&otp).map_err(DbError::from)? }
        };
        let result = self.voters.update_one(id.as_doc(), update, None).await?;
        Ok(result.matched_count == 1)
    }

    async fn set_voter_active(&self, voter_id: &str, active: bool) -> Result<bool> {
        let update = doc! {
            "$set": { "active": active }
        };
        let result = self
            .voters
            .update_one(doc! {"voter_id": voter_id}, update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn admin(&self, id: Id) -> Result<Option<Admin>> {
        Ok(self.admins.find_one(id.as_doc(), None).await?)
    }

    async fn admin_by_username(&self, username: &str) -> Result<Option<Admin>> {
        Ok(self
            .admins
            .find_one(doc! {"username": username}, None)
            .await?)
    }

    async fn admin_count(&self) -> Result<u64> {
        Ok(self.admins.count_documents(None, None).await?)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin> {
        let result = self
            .new_admins
            .insert_one(&admin, None)
            .await
            .map_err(map_write_error)?;
        Ok(Admin {
            id: inserted_id(result.inserted_id)?,
            admin,
        })
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self
            .categories
            .find(None, creation_order())
            .await?
            .try_collect()
            .await?)
    }

    async fn category(&self, id: Id) -> Result<Option<Category>> {
        Ok(self.categories.find_one(id.as_doc(), None).await?)
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category> {
        let result = self
            .new_categories
            .insert_one(&category, None)
            .await
            .map_err(map_write_error)?;
        Ok(Category {
            id: inserted_id(result.inserted_id)?,
            category,
        })
    }

    async fn set_category_window(&self, id: Id, window: VotingWindow) -> Result<bool> {
        let update = doc! {
            "$set": { "window": to_bson(&window).map_err(DbError::from)? }
        };
        let result = self
            .categories
            .update_one(id.as_doc(), update, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn candidates_in(&self, category: Id) -> Result<Vec<Candidate>> {
        Ok(self
            .candidates
            .find(doc! {"category": *category}, creation_order())
            .await?
            .try_collect()
            .await?)
    }

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate> {
        let result = self
            .new_candidates
            .insert_one(&candidate, None)
            .await
            .map_err(map_write_error)?;
        Ok(Candidate {
            id: inserted_id(result.inserted_id)?,
            candidate,
        })
    }

    async fn replace_candidate(&self, candidate: &Candidate) -> Result<bool> {
        let result = self
            .candidates
            .replace_one(candidate.id.as_doc(), candidate, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<Vote> {
        // A concurrent duplicate is caught by the unique index at commit time.
        let result = self
            .new_votes
            .insert_one(&vote, None)
            .await
            .map_err(map_write_error)?;
        Ok(Vote {
            id: inserted_id(result.inserted_id)?,
            vote,
        })
    }

    async fn has_voted(&self, voter: Id, category: Id) -> Result<bool> {
        let filter = doc! {
            "voter": *voter,
            "category": *category,
        };
        Ok(self.votes.count_documents(filter, None).await? > 0)
    }

    async fn vote_counts(&self, category: Id) -> Result<HashMap<Id, u64>> {
        let pipeline = [
            doc! { "$match": { "category": *category } },
            doc! { "$group": { "_id": "$candidate", "votes": { "$sum": 1 } } },
        ];
        let groups: Vec<Document> = self
            .votes
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;

        let mut counts = HashMap::with_capacity(groups.len());
        for group in groups {
            let candidate = group
                .get_object_id("_id")
                .map_err(|e| malformed_group(&group, e))?;
            let votes = match group.get("votes") {
                Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
                Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
                _ => None,
            }
            .ok_or_else(|| malformed_group(&group, "non-integer vote count"))?;
            counts.insert(candidate.into(), votes);
        }
        Ok(counts)
    }

    async fn votes(&self) -> Result<Vec<Vote>> {
        Ok(self
            .votes
            .find(None, creation_order())
            .await?
            .try_collect()
            .await?)
    }
}

fn malformed_group(group: &Document, reason: impl std::fmt::Display) -> Error {
    Error::Status(
        rocket::http::Status::InternalServerError,
        format!("Malformed vote count {group}: {reason}"),
    )
}
