//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// If the given error is a duplicate key write error, return the name of the
/// violated index (or `"unknown"` if the server message does not name it).
pub fn duplicate_key_index(err: &DbError) -> Option<String> {
    if let ErrorKind::Write(WriteFailure::WriteError(ref e)) = *err.kind {
        if e.code == DUPLICATE_KEY {
            return Some(index_from_message(&e.message).to_string());
        }
    }
    None
}

/// Server messages look like "E11000 duplicate key error collection: db.votes
/// index: voter_category dup key: { ... }".
fn index_from_message(message: &str) -> &str {
    message
        .split("index: ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_read_from_server_message() {
        let message = "E11000 duplicate key error collection: election.votes \
            index: voter_category dup key: { voter: ObjectId('64b7f1c2a1b2c3d4e5f60718'), \
            category: ObjectId('64b7f1c2a1b2c3d4e5f60719') }";
        assert_eq!(index_from_message(message), "voter_category");

        let message = "E11000 duplicate key error collection: election.voters \
            index: email dup key: { email: \"amani@students.example.ac\" }";
        assert_eq!(index_from_message(message), "email");
    }

    #[test]
    fn unnamed_index_is_unknown() {
        assert_eq!(index_from_message("E11000 duplicate key error"), "unknown");
        assert_eq!(index_from_message("index: "), "unknown");
    }

    #[test]
    fn other_errors_are_not_duplicates() {
        let err = DbError::custom("connection reset");
        assert_eq!(duplicate_key_index(&err), None);
    }
}
