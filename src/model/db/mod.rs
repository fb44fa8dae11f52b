//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

pub mod admin;
pub mod candidate;
pub mod category;
pub mod vote;
pub mod voter;

pub use admin::{Admin, NewAdmin};
pub use candidate::{Candidate, NewCandidate};
pub use category::{Category, NewCategory};
pub use vote::{NewVote, Vote};
pub use voter::{IssuedOtp, NewVoter, Voter};
