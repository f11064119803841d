//! # MemoryStore
//!
//! In-process implementation of [`DocumentStore`]. One lock guards every
//! document, which makes each commit trivially atomic. Used by tests and by
//! the binary when no database plugin is compiled in.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::models::{Board, Dat, Versioned};
use crate::traits::{Commit, CommitRequest, DocKey, DocumentStore, Put};

#[derive(Default)]
struct Documents {
    boards: BTreeMap<String, Versioned<Board>>,
    dats: HashMap<(String, String), Versioned<Dat>>,
}

impl Documents {
    fn version_of(&self, key: &DocKey) -> Option<u64> {
        match key {
            DocKey::Board(name) => self.boards.get(name).map(|v| v.version),
            DocKey::Dat { board, thread_key } => self
                .dats
                .get(&(board.clone(), thread_key.clone()))
                .map(|v| v.version),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a board unconditionally (seeding and tests).
    pub fn insert_board(&self, name: &str, board: Board) {
        let mut docs = self.lock();
        let version = docs.boards.get(name).map_or(1, |v| v.version + 1);
        docs.boards
            .insert(name.to_owned(), Versioned { doc: board, version });
    }

    /// Stores a dat unconditionally (seeding and tests).
    pub fn insert_dat(&self, board: &str, thread_key: &str, dat: Dat) {
        let mut docs = self.lock();
        let key = (board.to_owned(), thread_key.to_owned());
        let version = docs.dats.get(&key).map_or(1, |v| v.version + 1);
        docs.dats.insert(key, Versioned { doc: dat, version });
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_board(&self, name: &str) -> anyhow::Result<Option<Versioned<Board>>> {
        Ok(self.lock().boards.get(name).cloned())
    }

    async fn get_dat(
        &self,
        board: &str,
        thread_key: &str,
    ) -> anyhow::Result<Option<Versioned<Dat>>> {
        let key = (board.to_owned(), thread_key.to_owned());
        Ok(self.lock().dats.get(&key).cloned())
    }

    async fn list_boards(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.lock().boards.keys().cloned().collect())
    }

    async fn commit(&self, request: CommitRequest) -> anyhow::Result<Commit> {
        let mut docs = self.lock();

        let stale = request
            .checks
            .iter()
            .map(|(key, expected)| (key.clone(), *expected))
            .chain(request.puts.iter().map(|p| (p.key(), p.expected())))
            .any(|(key, expected)| docs.version_of(&key) != expected);
        if stale {
            return Ok(Commit::Conflict);
        }

        for put in request.puts {
            let version = put.expected().map_or(1, |v| v + 1);
            match put {
                Put::Board { name, board, .. } => {
                    docs.boards.insert(name, Versioned { doc: board, version });
                }
                Put::Dat {
                    board,
                    thread_key,
                    dat,
                    ..
                } => {
                    docs.dats
                        .insert((board, thread_key), Versioned { doc: dat, version });
                }
            }
        }
        Ok(Commit::Applied)
    }
}
