//! # Dat serialization
//!
//! One post is one line:
//!
//! ```text
//! 名前<>メール欄<>年/月/日(曜) 時:分:秒.ミリ秒 ID:hogehoge0<> 本文 <>スレタイ
//! ```
//!
//! The title is only filled on the first line. Lines are joined with `\n`,
//! the log is only ever appended to.

use chrono::{DateTime, Datelike, TimeZone};

pub const DELIMITER: &str = "<>";

const WEEK_DAYS_JP: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// The name field of a post: display name plus optional trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterName {
    pub name: String,
    pub trip: Option<String>,
}

impl PosterName {
    /// Escaped name field as written to the dat. `◆` is reserved for trips.
    pub fn render(&self) -> String {
        let name = escape_field(&self.name).replace('◆', "◇");
        match &self.trip {
            Some(trip) => format!("{name} </b>◆{trip} <b>").trim().to_string(),
            None => name.trim().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.trip.is_none()
    }
}

/// Splits a raw name field at the first `#` into name and trip secret.
pub fn split_trip(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('#') {
        Some((name, secret)) => (name, Some(secret)),
        None => (raw, None),
    }
}

/// One post ready to be rendered.
pub struct DatLine<'a, Tz: TimeZone> {
    pub name: &'a PosterName,
    pub mail: &'a str,
    pub posted_at: &'a DateTime<Tz>,
    pub poster_id: &'a str,
    pub message: &'a str,
    /// `Some` only for the first line of a thread.
    pub title: Option<&'a str>,
}

impl<Tz: TimeZone> DatLine<'_, Tz>
where
    Tz::Offset: std::fmt::Display,
{
    pub fn render(&self) -> String {
        [
            self.name.render(),
            escape_field(self.mail),
            format!("{} ID:{}", format_date(self.posted_at), self.poster_id),
            format!(" {} ", escape_message(self.message)),
            self.title.map(escape_field).unwrap_or_default(),
        ]
        .join(DELIMITER)
    }
}

/// `YYYY/MM/DD(曜) HH:MM:SS.mmm`
pub fn format_date<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let weekday = WEEK_DAYS_JP[t.weekday().num_days_from_sunday() as usize];
    format!(
        "{}({}) {}",
        t.format("%Y/%m/%d"),
        weekday,
        t.format("%H:%M:%S%.3f")
    )
}

/// Escapes `& < > " '` with the numeric quote entities 2ch readers expect
/// (`&#34;`, `&#39;`).
fn escape_html(s: &str) -> String {
    html_escape::encode_text(s)
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

/// HTML-escapes a single-line field and drops tabs and newlines, which would
/// break the line and `subject.txt` formats.
pub fn escape_field(s: &str) -> String {
    escape_html(s)
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n'))
        .collect()
}

/// HTML-escapes the message body; newlines become `<br>`. Tabs are kept for AA.
pub fn escape_message(s: &str) -> String {
    escape_html(s).replace('\n', "<br>")
}

/// Closing line written as res `max + 1` once a thread hits its cap.
pub fn overflow_line(max: u32) -> String {
    format!(
        "{}<><>Over {max} Thread<> このスレッドは{max}を超えました。 <br> 新しいスレッドを立ててください。 <>",
        max + 1
    )
}

/// Appends a line to a dat log.
pub fn append_line(content: &mut String, line: &str) {
    if !content.is_empty() {
        content.push('\n');
    }
    content.push_str(line);
}

/// Number of post lines in a dat log.
pub fn line_count(content: &str) -> usize {
    if content.is_empty() {
        0
    } else {
        content.split('\n').count()
    }
}

/// A dat line split back into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub name: &'a str,
    pub mail: &'a str,
    pub date_and_id: &'a str,
    pub message: &'a str,
    pub title: &'a str,
}

pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let mut fields = line.splitn(5, DELIMITER);
    Some(ParsedLine {
        name: fields.next()?,
        mail: fields.next()?,
        date_and_id: fields.next()?,
        message: fields.next()?.trim_matches(' '),
        title: fields.next().unwrap_or(""),
    })
}
