//! Task identifiers
//!
//! Tasks are keyed by positive integers, allocated sequentially by the store.
//! The textual form is the bare number (`7`); a leading `#` is accepted on
//! input so ids copied from text output (`#7`) parse as well.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID: expected a positive integer, got '{0}'")]
    InvalidTaskId(String),

    #[error("Task IDs exhausted: no ID follows {0}")]
    Exhausted(u64),
}

/// Identifier of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a task ID from its numeric value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the ID that follows this one
    pub fn next(self) -> Result<Self, IdError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(IdError::Exhausted(self.0))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for TaskId {
    type Error = IdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(IdError::InvalidTaskId(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

        digits
            .parse::<u64>()
            .ok()
            .and_then(|value| Self::try_from(value).ok())
            .ok_or_else(|| IdError::InvalidTaskId(s.to_string()))
    }
}
