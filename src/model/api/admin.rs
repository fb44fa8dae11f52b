use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    model::{
        api::id::ApiId,
        common::{
            password::{hash_password, MIN_PASSWORD_LENGTH},
            VotingStatus, VotingWindow,
        },
        db::{admin::NewAdmin, Category, NewCandidate},
    },
};

/// Raw admin credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl TryFrom<AdminCredentials> for NewAdmin {
    type Error = Error;

    /// Convert [`AdminCredentials`] to a new admin by hashing the password.
    /// This enforces that the username is non-empty, and the password meets minimum length.
    fn try_from(cred: AdminCredentials) -> Result<Self, Self::Error> {
        if cred.username.is_empty() || cred.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::bad_request("Illegal admin credentials"));
        }
        Ok(Self {
            password_hash: hash_password(&cred.password)?,
            username: cred.username,
        })
    }
}

/// A voting window as submitted by an admin. Either bound may be omitted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl TryFrom<WindowSpec> for VotingWindow {
    type Error = Error;

    fn try_from(spec: WindowSpec) -> Result<Self, Self::Error> {
        VotingWindow::new(spec.start, spec.end).map_err(|e| Error::bad_request(e.to_string()))
    }
}

/// A new category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    #[serde(flatten)]
    pub window: WindowSpec,
}

/// A category as shown to admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDesc {
    pub id: ApiId,
    pub name: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub status: VotingStatus,
}

impl CategoryDesc {
    pub fn new(category: Category, now: DateTime<Utc>) -> Self {
        Self {
            id: category.id.into(),
            status: category.window.status(now),
            start: category.window.start(),
            end: category.window.end(),
            name: category.category.name,
        }
    }
}

/// A new candidate, or the full replacement of an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub course: String,
    pub level_of_study: String,
    pub year_of_study: String,
    pub position: String,
    pub category: ApiId,
}

impl From<CandidateSpec> for NewCandidate {
    fn from(spec: CandidateSpec) -> Self {
        Self {
            first_name: spec.first_name,
            middle_name: spec.middle_name.filter(|name| !name.is_empty()),
            last_name: spec.last_name,
            course: spec.course,
            level_of_study: spec.level_of_study,
            year_of_study: spec.year_of_study,
            position: spec.position,
            category: spec.category.into(),
        }
    }
}

/// Activate or deactivate a voter account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActiveSpec {
    pub active: bool,
}

#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::mongodb::Id;

    impl AdminCredentials {
        pub fn example1() -> Self {
            Self {
                username: "returning-officer".into(),
                password: "countevery1".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                username: "".into(),
                password: "".into(),
            }
        }
    }

    impl CategorySpec {
        pub fn example() -> Self {
            Self {
                name: "Guild President".to_string(),
                window: WindowSpec::default(),
            }
        }
    }

    impl CandidateSpec {
        pub fn example(first_name: &str, category: Id) -> Self {
            Self {
                first_name: first_name.to_string(),
                middle_name: None,
                last_name: "Achieng".to_string(),
                course: "BA Economics".to_string(),
                level_of_study: "Undergraduate".to_string(),
                year_of_study: "2".to_string(),
                position: "President".to_string(),
                category: category.into(),
            }
        }
    }
}
