//! # Domain Models
//!
//! These structs represent the documents of a textboard and the values that
//! flow through a post. Two document kinds are persisted: a [`Board`] keyed by
//! board name, and a [`Dat`] keyed by thread key with the board as ancestor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one thread as listed in `subject.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Decimal unix seconds of the thread's creation; also the dat key.
    pub thread_key: String,
    /// HTML-escaped title, emitted verbatim.
    pub title: String,
    /// Number of lines physically present in the dat.
    pub message_count: u32,
    pub last_modified: DateTime<Utc>,
}

/// A named forum and its live thread order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// Ordered by activity ("bump" order), not by creation.
    pub subjects: Vec<Subject>,
    /// Writes accepted in the current period.
    pub write_count: u32,
}

impl Board {
    /// Index of the subject for `thread_key`, if listed.
    pub fn position(&self, thread_key: &str) -> Option<usize> {
        self.subjects.iter().position(|s| s.thread_key == thread_key)
    }
}

/// The append-only post log of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dat {
    /// Newline-joined dat lines in the internal (UTF-8) representation.
    pub content: String,
    pub last_modified: DateTime<Utc>,
}

/// A document together with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub doc: T,
    pub version: u64,
}

/// Where a post goes: a new thread (carrying its title) or a reply to an
/// existing thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostTarget {
    NewThread { title: String },
    Reply { thread_key: String },
}

impl PostTarget {
    pub fn thread_key(&self) -> Option<&str> {
        match self {
            PostTarget::Reply { thread_key } => Some(thread_key),
            PostTarget::NewThread { .. } => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            PostTarget::NewThread { title } => Some(title),
            PostTarget::Reply { .. } => None,
        }
    }
}

/// Poster-supplied fields of a post, already decoded from the wire charset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    /// Raw name field; may carry `#secret` for a trip.
    pub name: String,
    pub mail: String,
    pub message: String,
    /// Client address used for the poster ID.
    pub poster_addr: String,
}

/// What a committed post reports back to the poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReceipt {
    pub board: String,
    pub thread_key: String,
    pub res_num: u32,
    pub poster_id: String,
    pub posted_at: DateTime<Utc>,
    /// The res number went past the board's message cap.
    pub over_capacity: bool,
}

impl PostReceipt {
    /// `unixSeconds.milliseconds`, as sent in `x-PostDate`.
    pub fn post_date(&self) -> String {
        format!(
            "{}.{:03}",
            self.posted_at.timestamp(),
            self.posted_at.timestamp_subsec_millis()
        )
    }
}
