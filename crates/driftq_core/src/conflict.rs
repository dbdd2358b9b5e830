//! Conflict descriptors and resolution strategies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The shape of a detected conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The server's version of the entity diverged from the client's base.
    Version,
    /// The client updated an entity the server has deleted, or vice versa.
    UpdateDelete,
    /// A create collided with an entity the server already knows.
    DuplicateCreate,
}

impl ConflictKind {
    /// Returns the snake_case name of the conflict kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Version => "version",
            ConflictKind::UpdateDelete => "update_delete",
            ConflictKind::DuplicateCreate => "duplicate_create",
        }
    }
}

/// Strategy for resolving a conflict.
///
/// Only [`ResolutionStrategy::Manual`] is guaranteed by the queue itself:
/// the item stays in `Conflict` until an explicit reset. The automatic
/// strategies are carried on the descriptor for an external resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Discard the client change and accept the server version.
    ServerWins,
    /// Reapply the client change over the server version.
    ClientWins,
    /// Merge fields from both versions.
    Merge,
    /// Whichever version has the later timestamp wins.
    LatestWins,
    /// A human decides; the item is excluded from automatic retry.
    Manual,
}

impl ResolutionStrategy {
    /// Returns true if this strategy can be applied without a human.
    #[must_use]
    pub fn auto_resolves(&self) -> bool {
        !matches!(self, ResolutionStrategy::Manual)
    }

    /// Returns the snake_case name of the strategy.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::ServerWins => "server_wins",
            ResolutionStrategy::ClientWins => "client_wins",
            ResolutionStrategy::Merge => "merge",
            ResolutionStrategy::LatestWins => "latest_wins",
            ResolutionStrategy::Manual => "manual",
        }
    }
}

/// Structured description of a conflict reported by the remote system.
///
/// Present on an item if and only if its status is `Conflict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetails {
    /// What kind of disagreement was detected.
    pub kind: ConflictKind,
    /// The server's current version of the entity, if it still exists.
    pub server_version: Option<Value>,
    /// The client's assumed version of the entity.
    pub client_version: Option<Value>,
    /// The strategy chosen (or required) to resolve this conflict.
    pub resolution: Option<ResolutionStrategy>,
    /// Names of the fields that disagree, when known.
    pub conflicting_fields: Vec<String>,
}

impl ConflictDetails {
    /// Creates a conflict descriptor with no resolution chosen yet.
    pub fn new(kind: ConflictKind, server_version: Option<Value>, client_version: Option<Value>) -> Self {
        Self {
            kind,
            server_version,
            client_version,
            resolution: None,
            conflicting_fields: Vec::new(),
        }
    }

    /// Sets the conflicting field names.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.conflicting_fields = fields;
        self
    }

    /// Sets the resolution strategy.
    #[must_use]
    pub fn with_resolution(mut self, resolution: ResolutionStrategy) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Returns true if a resolution strategy has been chosen.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}
