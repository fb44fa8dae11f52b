use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{email::Email, otp::Code},
    mongodb::Id,
};

/// Core voter data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Registration number: the identifier voters log in with. Unique.
    pub voter_id: String,
    /// Where one-time passcodes are delivered. Unique.
    pub email: Email,
    /// Argon2-encoded password hash. Plaintext is never stored.
    pub password_hash: String,
    /// The most recently issued OTP, if any. Overwritten on every login.
    #[serde(default)]
    pub otp: Option<IssuedOtp>,
    /// Inactive voters can neither log in nor vote.
    pub active: bool,
}

impl VoterCore {
    /// Create a new, active voter with no OTP issued yet.
    pub fn new(voter_id: String, email: Email, password_hash: String) -> Self {
        Self {
            voter_id,
            email,
            password_hash,
            otp: None,
            active: true,
        }
    }
}

/// An OTP code together with the moment it was issued. Keeping them in one
/// value means a code can never exist without its issuance time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOtp {
    pub code: Code,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub issued_at: DateTime<Utc>,
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    use crate::model::common::password::hash_password;

    pub const EXAMPLE_PASSWORD: &str = "ballots-not-bullets";

    impl VoterCore {
        pub fn example() -> Self {
            Self::new(
                "T21-03-04567".to_string(),
                Email::example(),
                hash_password(EXAMPLE_PASSWORD).unwrap(),
            )
        }

        pub fn example2() -> Self {
            Self::new(
                "T21-03-07890".to_string(),
                Email::example2(),
                hash_password(EXAMPLE_PASSWORD).unwrap(),
            )
        }
    }

    impl Voter {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                voter: VoterCore::example(),
            }
        }
    }
}
