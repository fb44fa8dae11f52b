use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::mongodb::optional_bson_datetime;

/// The period during which a category accepts votes.
/// A missing bound leaves that side of the window open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow", into = "RawWindow")]
pub struct VotingWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Voting must start before it ends ({start} is not before {end})")]
    StartNotBeforeEnd {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl VotingWindow {
    /// Create a window, rejecting one whose start is not strictly before its end.
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, WindowError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Err(WindowError::StartNotBeforeEnd { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// A window with no bounds at all: always open.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Where `now` falls relative to this window.
    /// The start is inclusive and the end exclusive.
    pub fn status(&self, now: DateTime<Utc>) -> VotingStatus {
        match (self.start, self.end) {
            (Some(start), _) if now < start => VotingStatus::NotStarted,
            (_, Some(end)) if now >= end => VotingStatus::Ended,
            _ => VotingStatus::Ongoing,
        }
    }

    /// Does this window accept votes at `now`?
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == VotingStatus::Ongoing
    }
}

/// Voting status of a category at a particular instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStatus {
    NotStarted,
    Ongoing,
    Ended,
}

/// Unvalidated storage form of [`VotingWindow`].
#[derive(Serialize, Deserialize)]
struct RawWindow {
    #[serde(default, with = "optional_bson_datetime")]
    start: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_bson_datetime")]
    end: Option<DateTime<Utc>>,
}

impl TryFrom<RawWindow> for VotingWindow {
    type Error = WindowError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl From<VotingWindow> for RawWindow {
    fn from(window: VotingWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }
}
