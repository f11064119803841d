//! Thread list ordering ("age"/"sage") and `subject.txt` rendering.

use std::fmt::Write as _;

use crate::models::{Board, Subject};

/// Whether a post moves its thread to the top of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Age,
    Sage,
}

impl Bump {
    /// Only the exact mail value `sage` suppresses the bump.
    pub fn from_mail(mail: &str) -> Self {
        if mail == "sage" {
            Bump::Sage
        } else {
            Bump::Age
        }
    }
}

/// Moves the subject at `pos` to the front unless the post was sage.
/// Every other subject keeps its relative order.
pub fn reorder(subjects: &mut [Subject], pos: usize, bump: Bump) {
    if subjects.len() <= 1 || bump == Bump::Sage {
        return;
    }
    subjects[..=pos].rotate_right(1);
}

/// One `threadKey.dat<>title \t (count)` line per thread, in live order.
pub fn subject_txt(board: &Board) -> String {
    let mut out = String::new();
    for s in &board.subjects {
        let _ = writeln!(
            out,
            "{}.dat<>{} \t ({})",
            s.thread_key, s.title, s.message_count
        );
    }
    out
}
