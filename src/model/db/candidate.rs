use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core candidate data. Only `category` matters for tallying; the rest is display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    pub level_of_study: String,
    pub year_of_study: String,
    /// Label of the office being contested, as shown on the ballot.
    pub position: String,
    /// The category this candidate stands in.
    pub category: Id,
}

impl CandidateCore {
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example(first_name: &str, category: Id) -> Self {
            Self {
                first_name: first_name.to_string(),
                middle_name: None,
                last_name: "Mwangi".to_string(),
                course: "BSc Computer Science".to_string(),
                level_of_study: "Undergraduate".to_string(),
                year_of_study: "3".to_string(),
                position: "Chair".to_string(),
                category,
            }
        }
    }

    impl Candidate {
        pub fn example(first_name: &str, category: Id) -> Self {
            Self {
                id: Id::new(),
                candidate: CandidateCore::example(first_name, category),
            }
        }
    }
}
