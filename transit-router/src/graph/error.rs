//! Graph construction errors and traversal rejections.

use crate::calendar::CalendarError;
use crate::domain::{InvalidId, StopId, TimeError, TraverseMode};
use crate::pattern::PatternError;

/// Why an edge could not be traversed from a state.
///
/// A rejection is an ordinary outcome: the search simply does not explore
/// that edge from that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejected {
    #[error("mode {0} not allowed")]
    ModeNotAllowed(TraverseMode),

    #[error("transfer forbidden")]
    ForbiddenTransfer,

    #[error("timed-transfer edge used for a transfer that is not timed")]
    NotTimedTransfer,

    #[error("timed transfer not made over a timed-transfer edge")]
    TimedTransferMissing,

    #[error("trip banned")]
    BannedTrip,

    #[error("route banned")]
    BannedRoute,

    #[error("no service in the search window")]
    NoService,

    #[error("boarding or alighting not available at this stop")]
    BoardAlightNotAvailable,

    #[error("repeated board or alight")]
    RepeatedBoardAlight,

    #[error("not riding this trip")]
    NotOnTrip,

    #[error("already riding a trip")]
    AlreadyOnBoard,

    #[error("negative wait")]
    NegativeWait,

    #[error("environmental limit exceeded")]
    EnvironmentalLimit,

    #[error("invalid state change")]
    Defective,
}

/// Result of traversing one edge.
pub type TraverseResult = Result<crate::routing::State, Rejected>;

/// Errors from building a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Two vertices for the same stop
    #[error("duplicate stop {0}")]
    DuplicateStop(StopId),

    /// Reference to a stop that was never added
    #[error("unknown stop {0}")]
    UnknownStop(String),

    /// Reference to a vertex label that was never added
    #[error("unknown vertex {0}")]
    UnknownVertex(String),

    /// Malformed network description field
    #[error("invalid network description: {0}")]
    Invalid(String),

    #[error(transparent)]
    Id(#[from] InvalidId),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("failed to read network: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse network: {0}")]
    Json(#[from] serde_json::Error),
}
