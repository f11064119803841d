//! Optimistic transactions over a [`DocumentStore`].
//!
//! Reads go straight to the store and remember the version they saw. Puts are
//! buffered and only reach the store in [`Transaction::commit`], which sends
//! them together with the remembered versions as preconditions. A document put
//! without having been read is expected to be absent.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{Board, Dat};
use crate::traits::{Commit, CommitRequest, DocKey, DocumentStore, Put};

pub struct Transaction<'a> {
    store: &'a dyn DocumentStore,
    reads: HashMap<DocKey, Option<u64>>,
    puts: Vec<Put>,
}

impl<'a> Transaction<'a> {
    pub fn begin(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            reads: HashMap::new(),
            puts: Vec::new(),
        }
    }

    pub async fn get_board(&mut self, name: &str) -> Result<Option<Board>> {
        let found = self.store.get_board(name).await?;
        self.reads
            .entry(DocKey::Board(name.to_owned()))
            .or_insert(found.as_ref().map(|v| v.version));
        Ok(found.map(|v| v.doc))
    }

    pub async fn get_dat(&mut self, board: &str, thread_key: &str) -> Result<Option<Dat>> {
        let found = self.store.get_dat(board, thread_key).await?;
        self.reads
            .entry(DocKey::Dat {
                board: board.to_owned(),
                thread_key: thread_key.to_owned(),
            })
            .or_insert(found.as_ref().map(|v| v.version));
        Ok(found.map(|v| v.doc))
    }

    pub fn put_board(&mut self, name: &str, board: Board) {
        let key = DocKey::Board(name.to_owned());
        let expected = self.read_version(&key);
        self.push(Put::Board {
            name: name.to_owned(),
            expected,
            board,
        });
    }

    pub fn put_dat(&mut self, board: &str, thread_key: &str, dat: Dat) {
        let key = DocKey::Dat {
            board: board.to_owned(),
            thread_key: thread_key.to_owned(),
        };
        let expected = self.read_version(&key);
        self.push(Put::Dat {
            board: board.to_owned(),
            thread_key: thread_key.to_owned(),
            expected,
            dat,
        });
    }

    /// Applies every buffered put atomically, or fails with
    /// [`AppError::TransactionConflict`] if any document moved since it was read.
    pub async fn commit(self) -> Result<()> {
        let written: HashSet<DocKey> = self.puts.iter().map(Put::key).collect();
        let checks = self
            .reads
            .into_iter()
            .filter(|(key, _)| !written.contains(key))
            .collect();
        let request = CommitRequest {
            checks,
            puts: self.puts,
        };

        match self.store.commit(request).await? {
            Commit::Applied => Ok(()),
            Commit::Conflict => {
                debug!("commit lost to a concurrent writer");
                Err(AppError::TransactionConflict)
            }
        }
    }

    fn read_version(&self, key: &DocKey) -> Option<u64> {
        self.reads.get(key).copied().flatten()
    }

    // A later put of the same document replaces the earlier one.
    fn push(&mut self, put: Put) {
        let key = put.key();
        self.puts.retain(|p| p.key() != key);
        self.puts.push(put);
    }
}
