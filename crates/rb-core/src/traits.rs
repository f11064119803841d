//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use crate::models::{Board, Dat, Versioned};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Identifies one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocKey {
    Board(String),
    Dat { board: String, thread_key: String },
}

/// A buffered write. `expected` is the version the document was read at,
/// or `None` when the document must not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub enum Put {
    Board {
        name: String,
        expected: Option<u64>,
        board: Board,
    },
    Dat {
        board: String,
        thread_key: String,
        expected: Option<u64>,
        dat: Dat,
    },
}

impl Put {
    pub fn key(&self) -> DocKey {
        match self {
            Put::Board { name, .. } => DocKey::Board(name.clone()),
            Put::Dat { board, thread_key, .. } => DocKey::Dat {
                board: board.clone(),
                thread_key: thread_key.clone(),
            },
        }
    }

    pub fn expected(&self) -> Option<u64> {
        match self {
            Put::Board { expected, .. } | Put::Dat { expected, .. } => *expected,
        }
    }
}

/// Everything a transaction wants applied, with its preconditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitRequest {
    /// Documents read but not written: must still be at these versions.
    pub checks: Vec<(DocKey, Option<u64>)>,
    pub puts: Vec<Put>,
}

/// Outcome of a commit. A conflict leaves the store untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Applied,
    Conflict,
}

/// Transactional document store holding boards and their dats.
///
/// Reads are single-document and atomic; `commit` applies all puts or none.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_board(&self, name: &str) -> anyhow::Result<Option<Versioned<Board>>>;
    async fn get_dat(&self, board: &str, thread_key: &str)
        -> anyhow::Result<Option<Versioned<Dat>>>;
    async fn list_boards(&self) -> anyhow::Result<Vec<String>>;
    async fn commit(&self, request: CommitRequest) -> anyhow::Result<Commit>;
}

/// Poster identity contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Pseudonymous ID shared by every post from `addr` to `board` on `date`.
    fn poster_id(&self, addr: &str, board: &str, date: NaiveDate) -> String;

    /// Trip for a secret given as wire-charset bytes.
    fn trip(&self, secret: &[u8]) -> String;
}
