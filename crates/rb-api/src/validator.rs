//! Posting form validation.
//!
//! Each field is taken exactly once, its byte limit is checked on the wire
//! bytes, and only then is it decoded and cleaned.

use rb_core::encoding::from_wire;
use rb_core::settings::BoardSettings;
use thiserror::Error;

use crate::form::WireForm;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad parameter '{field}' is: {reason}")]
pub struct BadParameter {
    pub field: &'static str,
    pub reason: String,
}

impl BadParameter {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

type Result<T> = std::result::Result<T, BadParameter>;

pub fn submit(form: &WireForm) -> Result<String> {
    Ok(from_wire(form.one("submit")?).into_owned())
}

pub fn board_name(form: &WireForm) -> Result<String> {
    let field = "bbs";
    let bbs = from_wire(form.one(field)?).into_owned();
    max_len(field, &bbs, 10)?;
    between(field, &bbs, "0", "zzzzzzzzzz")?;
    Ok(bbs)
}

pub fn thread_key(form: &WireForm) -> Result<String> {
    let field = "key";
    let key = from_wire(form.one(field)?).into_owned();
    max_len(field, &key, 10)?;
    between(field, &key, "0000000000", "9999999999")?;
    Ok(key)
}

pub fn time(form: &WireForm) -> Result<String> {
    let raw = form.one("time")?;
    if raw.is_empty() {
        return Err(BadParameter::new("time", "0 byte"));
    }
    Ok(from_wire(raw).into_owned())
}

/// Name field with any `#secret` kept. Only the display part is cleaned, the
/// secret is hashed exactly as typed. Empty means anonymous.
pub fn name(form: &WireForm, settings: &BoardSettings) -> Result<String> {
    let raw = limited(form, "FROM", settings.name_count)?;
    let cleaned = match raw.split_once('#') {
        Some((name, secret)) => format!("{}#{secret}", trim(&del_bad_char(name))),
        None => trim(&del_bad_char(&raw)).to_string(),
    };
    Ok(cleaned)
}

pub fn mail(form: &WireForm, settings: &BoardSettings) -> Result<String> {
    let raw = limited(form, "mail", settings.mail_count)?;
    Ok(trim(&del_bad_char(&raw)).to_string())
}

pub fn message(form: &WireForm, settings: &BoardSettings) -> Result<String> {
    let field = "MESSAGE";
    let cleaned = del_bad_char(&limited(form, field, settings.message_count)?);
    not_blank(field, &cleaned)?;
    Ok(trim(&cleaned).to_string())
}

pub fn title(form: &WireForm, settings: &BoardSettings) -> Result<String> {
    let field = "subject";
    let cleaned = del_bad_char(&limited(form, field, settings.subject_count)?);
    let title = trim(&cleaned);
    not_blank(field, title)?;
    Ok(title.to_string())
}

/// Posts must come from a page of this host and board.
pub fn referer(referer: Option<&str>, host: &str, board: &str) -> Result<()> {
    match referer {
        Some(r) if r.contains(host) && r.contains(board) => Ok(()),
        _ => Err(BadParameter::new("referer", "BAD")),
    }
}

fn limited(form: &WireForm, field: &'static str, max: usize) -> Result<String> {
    let raw = form.one(field)?;
    if raw.len() > max {
        return Err(BadParameter::new(
            field,
            format!("byte len {} > {max}", raw.len()),
        ));
    }
    Ok(from_wire(raw).into_owned())
}

fn max_len(field: &'static str, s: &str, max: usize) -> Result<()> {
    if s.chars().count() > max {
        return Err(BadParameter::new(field, format!("len {s} > {max}")));
    }
    Ok(())
}

fn between(field: &'static str, s: &str, lo: &str, hi: &str) -> Result<()> {
    if s < lo || hi < s {
        return Err(BadParameter::new(
            field,
            format!("{s} < {lo} or {hi} < {s}"),
        ));
    }
    Ok(())
}

fn not_blank(field: &'static str, s: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(BadParameter::new(field, "blank"));
    }
    Ok(())
}

/// Control characters other than `\t` and `\n` become spaces.
fn del_bad_char(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0}'..='\u{8}' | '\u{b}'..='\u{1f}' | '\u{7f}' => ' ',
            c => c,
        })
        .collect()
}

fn trim(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, '\t' | '\n' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(body: &[u8]) -> WireForm {
        WireForm::parse(body)
    }

    #[test]
    fn board_name_bounds() {
        assert_eq!(board_name(&form(b"bbs=news4vip")).unwrap(), "news4vip");
        let err = board_name(&form(b"bbs=news4vipnews4vip")).unwrap_err();
        assert_eq!(err.field, "bbs");
        assert!(board_name(&form(b"bbs=%7E")).is_err());
        assert_eq!(
            board_name(&form(b"")).unwrap_err().to_string(),
            "bad parameter 'bbs' is: missing"
        );
    }

    #[test]
    fn thread_key_must_be_digits() {
        assert_eq!(thread_key(&form(b"key=1574515741")).unwrap(), "1574515741");
        assert!(thread_key(&form(b"key=abc")).is_err());
        assert!(thread_key(&form(b"key=12345678901")).is_err());
    }

    #[test]
    fn time_must_not_be_empty() {
        assert!(time(&form(b"time=1")).is_ok());
        assert_eq!(time(&form(b"time=")).unwrap_err().reason, "0 byte");
    }

    #[test]
    fn byte_limit_counts_wire_bytes() {
        let settings = BoardSettings {
            name_count: 4,
            ..BoardSettings::default()
        };
        // Two Shift_JIS characters are exactly four bytes.
        assert_eq!(name(&form(b"FROM=%82%A0%82%A2"), &settings).unwrap(), "あい");
        let err = name(&form(b"FROM=%82%A0%82%A2a"), &settings).unwrap_err();
        assert_eq!(err.field, "FROM");
    }

    #[test]
    fn trip_secret_is_kept_as_typed() {
        let settings = BoardSettings::default();
        assert_eq!(
            name(&form(b"FROM=+%01a+%23se%01cret+"), &settings).unwrap(),
            "a#se\u{1}cret "
        );
        assert_eq!(name(&form(b"FROM=+a%09"), &settings).unwrap(), "a");
    }

    #[test]
    fn message_is_cleaned_and_required() {
        let settings = BoardSettings::default();
        assert_eq!(
            message(&form(b"MESSAGE=+%0Aa%01b%09c%0A+"), &settings).unwrap(),
            "a b\tc"
        );
        let err = message(&form(b"MESSAGE=+%0A+"), &settings).unwrap_err();
        assert_eq!(err.reason, "blank");
    }

    #[test]
    fn title_is_trimmed_then_required() {
        let settings = BoardSettings::default();
        assert_eq!(title(&form(b"subject=+t+"), &settings).unwrap(), "t");
        assert!(title(&form(b"subject=%09"), &settings).is_err());
    }

    #[test]
    fn referer_must_name_host_and_board() {
        let ok = Some("http://localhost:8080/test/read.cgi/news4vip/1/");
        assert!(referer(ok, "localhost:8080", "news4vip").is_ok());
        assert!(referer(ok, "example.com", "news4vip").is_err());
        assert!(referer(ok, "localhost:8080", "poverty").is_err());
        assert!(referer(None, "localhost:8080", "news4vip").is_err());
    }
}
