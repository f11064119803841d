//! JSON views of boards and dats for the browser front end.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectJson {
    pub subjects: Vec<SubjectEntry>,
    /// Unix seconds of service start. Clients use it to detect restarts.
    pub precure: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectEntry {
    pub thread_key: String,
    pub thread_title: String,
    pub message_count: u32,
    /// `YYYY/MM/DD HH:MM:SS` in the service timezone.
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatJson {
    pub messages: Vec<MessageEntry>,
    pub thread_title: String,
    pub last_modified: String,
    pub precure: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEntry {
    /// Res number, starting at 1.
    pub num: usize,
    pub name: String,
    pub mail: String,
    pub date_and_id: String,
    pub content: String,
}

/// Result of a dat JSON request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatJsonReply {
    NotModified,
    Messages(DatJson),
}
