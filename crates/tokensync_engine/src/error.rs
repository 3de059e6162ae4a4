//! Error types for the sync engine.

use std::fmt;
use thiserror::Error;
use tokensync_model::{ModelError, TokenType};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Why an aliased definition could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokenReason {
    /// The alias chain ends at a path that does not exist.
    MissingTarget,
    /// The alias chain loops, including a token referencing itself.
    Cycle,
    /// The alias chain ends at a token of a different type.
    TypeMismatch,
}

impl fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokenReason::MissingTarget => f.write_str("missing target"),
            BrokenReason::Cycle => f.write_str("reference cycle"),
            BrokenReason::TypeMismatch => f.write_str("type mismatch"),
        }
    }
}

/// One alias that stayed unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenReference {
    /// Full path of the aliased definition.
    pub path: String,
    /// Path (or id, for upstream tokens) the definition points at.
    pub target: String,
    /// Terminal cause along the alias chain.
    pub reason: BrokenReason,
}

impl fmt::Display for BrokenReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.path, self.target, self.reason)
    }
}

fn describe_broken(references: &[BrokenReference]) -> String {
    references
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur while fetching, resolving or merging tokens.
///
/// The type is `Clone` so a single populate failure can be handed to every
/// caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The data bridge failed. Not retried here.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
    },

    /// A payload did not have the expected shape.
    #[error("decode error at {endpoint}: {message}")]
    Decode {
        /// Endpoint the payload came from.
        endpoint: String,
        /// Decoder message.
        message: String,
    },

    /// The external definition is malformed.
    #[error("invalid definition: {0}")]
    Definition(String),

    /// A definition uses a type tag with no token type.
    #[error("unsupported token type {0:?}")]
    UnsupportedTokenType(String),

    /// Aliases left unresolved by the fixpoint, reported as one batch.
    #[error("{} broken reference(s): {}", .0.len(), describe_broken(.0))]
    BrokenReference(Vec<BrokenReference>),

    /// A group tree does not hold together.
    #[error("{message} {id} of type {token_type}")]
    TreeConsistency {
        /// Offending id.
        id: String,
        /// Type of the root being walked.
        token_type: TokenType,
        /// What went wrong.
        message: String,
    },

    /// An entity has no owning group where one is required.
    #[error("{entity} {id} is not assigned to any group")]
    MissingGroupAssignment {
        /// Entity kind, e.g. `asset`.
        entity: &'static str,
        /// Entity id.
        id: String,
    },

    /// A batch response did not contain one item per requested item.
    #[error("count mismatch: requested {requested}, received {received}")]
    CountMismatch {
        /// Items requested.
        requested: usize,
        /// Items received.
        received: usize,
    },

    /// A model payload failed to decode.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EngineError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a decode error for `endpoint`.
    pub fn decode(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Creates a dangling-child error.
    pub fn dangling_child(id: impl Into<String>, token_type: TokenType) -> Self {
        Self::TreeConsistency {
            id: id.into(),
            token_type,
            message: "unable to find token or group".into(),
        }
    }
}

/// Phase of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No run in progress.
    Idle,
    /// Parsing the external definition.
    Loading,
    /// Resolving references and building local groups.
    Resolving,
    /// Reading upstream state through the cache.
    Fetching,
    /// Computing the tree diff.
    Merging,
    /// Renumbering sort orders.
    Sorting,
    /// Writing the diff back.
    Writing,
    /// Last run completed.
    Synced,
    /// Last run failed.
    Error,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Loading => "loading",
            SyncPhase::Resolving => "resolving",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Merging => "merging",
            SyncPhase::Sorting => "sorting",
            SyncPhase::Writing => "writing",
            SyncPhase::Synced => "synced",
            SyncPhase::Error => "error",
        };
        f.write_str(name)
    }
}

/// Aggregated failure of a synchronization run, labeled with its phase.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("sync failed while {phase}: {source}")]
pub struct SyncRunError {
    /// Phase that failed.
    pub phase: SyncPhase,
    /// Underlying error.
    #[source]
    pub source: EngineError,
}

impl SyncRunError {
    /// Creates a run error.
    pub fn new(phase: SyncPhase, source: EngineError) -> Self {
        Self { phase, source }
    }
}
