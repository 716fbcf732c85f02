//! Core domain library for vectorbench.
//!
//! Pure types and functions for the benchmarking harness: entities,
//! configuration structures, vector-config validation, result evaluation,
//! and parameter generation. Nothing in this crate performs I/O; the
//! execution engine (`vectorbench-engine`) composes these pieces with live
//! collaborators.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod config;
pub mod entities;
pub mod evaluate;
pub mod generate;
pub mod telemetry;
pub mod validate;

/// A typesafe wrapper for UUID version 4, used as entity identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Generate a new random UUID v4
    pub fn new() -> Self {
        Id(Uuid::new_v4())
    }

    /// Create from an existing Uuid
    pub fn from_uuid(uuid: Uuid) -> Self {
        Id(uuid)
    }

    /// Parse from a string, returning an error if invalid
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Id(Uuid::parse_str(s)?))
    }

    /// Get the underlying Uuid
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Check if this is a nil UUID (all zeros)
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::new()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Id::parse(s)
    }
}
