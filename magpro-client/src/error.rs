//! Client error types
//!
//! Every failure is classified into one of a few categories so callers can
//! decide presentation (notice level, wording) without string-matching at
//! call sites. Transport failures are further classified by walking the
//! reqwest error source chain, since the user-facing advice differs between
//! a timeout and a refused connection.

use std::error::Error as StdError;

use shared::{Notice, NoticeLevel};
use thiserror::Error;

use crate::store::StoreError;

/// Network-level failure, classified for user-facing wording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request timed out
    #[error("The server is not responding (timeout).")]
    Timeout,

    /// Connection actively refused
    #[error("Connection refused by the server.")]
    Refused,

    /// No route to the host
    #[error("Server unreachable, check the network.")]
    Unreachable,

    /// Socket-level failure mid-exchange
    #[error("Network error while talking to the server.")]
    Socket,

    /// Anything else
    #[error("Connection error: {0}")]
    Other(String),
}

impl TransportError {
    /// Classify a reqwest error by inspecting its source chain. reqwest
    /// wraps hyper/io errors several levels deep, so the interesting text
    /// ("connection refused", "no route to host") only shows up by walking
    /// `source()`.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportError::Timeout;
        }

        let mut chain = err.to_string();
        let mut source: Option<&dyn StdError> = StdError::source(err);
        while let Some(s) = source {
            chain.push_str(&format!(" → {s}"));
            source = s.source();
        }
        let lowered = chain.to_lowercase();

        if lowered.contains("refused") {
            TransportError::Refused
        } else if lowered.contains("unreachable") || lowered.contains("no route") {
            TransportError::Unreachable
        } else if lowered.contains("reset")
            || lowered.contains("broken pipe")
            || lowered.contains("socket")
        {
            TransportError::Socket
        } else {
            TransportError::Other(chain)
        }
    }
}

/// Local state-machine violation during a table/seat transfer.
///
/// Any of these aborts the transfer back to idle; the caller only has to
/// surface the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Transfer initiated on a table with nothing to move
    #[error("This table is empty, nothing to transfer.")]
    EmptyTable,

    /// Destination is the source table
    #[error("The destination is the same as the source table.")]
    SameTable,

    /// Destination table already has occupants
    #[error("The destination table is occupied.")]
    DestinationOccupied,

    /// Seat is not in the occupied set of the source table
    #[error("Seat {seat} is not occupied.")]
    SeatNotOccupied { seat: u32 },

    /// Operation issued in a phase that does not accept it
    #[error("Operation not valid while {phase}.")]
    InvalidTransition { phase: &'static str },
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-level failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Locally rejected input
    #[error("{0}")]
    Validation(String),

    /// Transfer state-machine violation
    #[error(transparent)]
    State(#[from] StateError),

    /// The server answered but refused the operation
    #[error("{message}")]
    Rejected { message: String },

    /// Persistent store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Convert into the notice the presentation layer should show.
    /// Validation problems are transient warnings; everything else is an
    /// error-level notice.
    pub fn to_notice(&self) -> Notice {
        let level = match self {
            ClientError::Validation(_) => NoticeLevel::Warning,
            ClientError::State(StateError::EmptyTable) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Notice::new(level, self.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(TransportError::classify(&err))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
