//! Per-board settings.
//!
//! One plain record per board, looked up by board name. The `BBS_*` values
//! are what `SETTING.TXT` advertises to clients; the capacity limits are what
//! the posting engine enforces.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub title: String,
    pub noname_name: String,
    pub unicode: String,
    /// Byte limits of the posting form fields, measured in wire bytes.
    pub subject_count: usize,
    pub name_count: usize,
    pub mail_count: usize,
    pub message_count: usize,
    pub thread_tatesugi: u32,
    pub slip: String,
    pub disp_ip: String,
    pub force_id: String,
    pub no_id: String,
    pub jp_check: String,
    pub four_world: String,
    pub ymd_weeks: String,
    pub arr: String,
    pub soko: String,
    pub disp_msec: u32,

    /// Threads a board may hold.
    pub max_threads: usize,
    /// Res number at which a thread is closed with the overflow marker.
    pub max_messages: u32,
    /// Writes accepted per period across the whole board.
    pub write_entity_limit: u32,
    /// Wire bytes a dat may hold before replies are refused.
    pub dat_capacity: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            title: "スタブ".to_string(),
            noname_name: "名無しさん".to_string(),
            unicode: "pass".to_string(),
            subject_count: 128,
            name_count: 96,
            mail_count: 32,
            message_count: 4096,
            thread_tatesugi: 8,
            slip: String::new(),
            disp_ip: String::new(),
            force_id: "checked".to_string(),
            no_id: String::new(),
            jp_check: String::new(),
            four_world: String::new(),
            ymd_weeks: String::new(),
            arr: String::new(),
            soko: "ononon".to_string(),
            disp_msec: 3,
            max_threads: 500,
            max_messages: 1000,
            write_entity_limit: 4000,
            dat_capacity: 500 * 1024,
        }
    }
}

impl BoardSettings {
    /// Renders `SETTING.TXT`.
    pub fn setting_txt(&self) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: &dyn std::fmt::Display| {
            let _ = writeln!(out, "{key}={value}");
        };
        line("BBS_TITLE", &self.title);
        line("BBS_NONAME_NAME", &self.noname_name);
        line("BBS_UNICODE", &self.unicode);
        line("BBS_SUBJECT_COUNT", &self.subject_count);
        line("BBS_NAME_COUNT", &self.name_count);
        line("BBS_MAIL_COUNT", &self.mail_count);
        line("BBS_MESSAGE_COUNT", &self.message_count);
        line("BBS_THREAD_TATESUGI", &self.thread_tatesugi);
        line("BBS_SLIP", &self.slip);
        line("BBS_DISP_IP", &self.disp_ip);
        line("BBS_FORCE_ID", &self.force_id);
        line("BBS_NO_ID", &self.no_id);
        line("BBS_JP_CHECK", &self.jp_check);
        line("BBS_4WORLD", &self.four_world);
        line("BBS_YMD_WEEKS", &self.ymd_weeks);
        line("BBS_ARR", &self.arr);
        line("BBS_SOKO", &self.soko);
        line("BBS_DISP_MSEC", &self.disp_msec);
        out
    }
}

/// Board name → settings lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardDirectory(BTreeMap<String, BoardSettings>);

impl BoardDirectory {
    pub fn get(&self, board: &str) -> Option<&BoardSettings> {
        self.0.get(board)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn insert(&mut self, board: impl Into<String>, settings: BoardSettings) {
        self.0.insert(board.into(), settings);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, BoardSettings)> for BoardDirectory {
    fn from_iter<I: IntoIterator<Item = (String, BoardSettings)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
