//! Incremental dat transfer.
//!
//! Clients that already hold a prefix of a dat ask for the rest with
//! `If-Modified-Since` plus `Range: bytes=N-`. `N` counts bytes of the wire
//! encoding, which is what the client has on disk.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::encoding::to_wire;
use crate::error::{AppError, Result};
use crate::models::Dat;

/// What to send back for a dat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatTransfer {
    /// 200 with the whole dat.
    Full { body: Vec<u8>, last_modified: String },
    /// 304, empty body.
    NotModified,
    /// 206 with the bytes from the requested offset on.
    Partial { body: Vec<u8>, last_modified: String },
    /// 416: the client holds more than the server has (e.g. after a rewrite).
    RangeNotSatisfiable,
}

/// RFC 7231 date, as used in `Last-Modified`.
pub fn http_date(t: &DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses `bytes=<digits>-` into the start offset.
pub fn parse_range(header: &str) -> Result<usize> {
    header
        .strip_prefix("bytes=")
        .and_then(|rest| rest.strip_suffix('-'))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| AppError::MalformedRange(header.to_string()))
}

/// Decides the response for a dat given the conditional request headers.
/// Fails with [`AppError::MalformedRange`] when a conditional request carries
/// no usable `Range`.
pub fn negotiate(
    dat: &Dat,
    if_modified_since: Option<&str>,
    range: Option<&str>,
) -> Result<DatTransfer> {
    let body = to_wire(&dat.content);
    let last_modified = http_date(&dat.last_modified);

    let Some(since) = if_modified_since.filter(|s| !s.is_empty()) else {
        return Ok(DatTransfer::Full {
            body: body.into_owned(),
            last_modified,
        });
    };
    if since == last_modified {
        return Ok(DatTransfer::NotModified);
    }

    let offset = parse_range(range.unwrap_or_default())?;
    debug!(offset, len = body.len(), "partial dat request");
    if offset > body.len() {
        return Ok(DatTransfer::RangeNotSatisfiable);
    }
    Ok(DatTransfer::Partial {
        body: body[offset..].to_vec(),
        last_modified,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dat(content: &str) -> Dat {
        Dat {
            content: content.to_string(),
            last_modified: Utc.with_ymd_and_hms(2019, 11, 23, 13, 29, 1).unwrap(),
        }
    }

    const LAST_MODIFIED: &str = "Sat, 23 Nov 2019 13:29:01 GMT";

    #[test]
    fn http_date_format() {
        assert_eq!(http_date(&dat("").last_modified), LAST_MODIFIED);
    }

    #[test]
    fn no_condition_sends_everything() {
        let result = negotiate(&dat("1行目\n2行目"), None, None).unwrap();
        assert_eq!(
            result,
            DatTransfer::Full {
                body: to_wire("1行目\n2行目").into_owned(),
                last_modified: LAST_MODIFIED.to_string(),
            }
        );
        assert!(matches!(
            negotiate(&dat("x"), Some(""), None).unwrap(),
            DatTransfer::Full { .. }
        ));
    }

    #[test]
    fn unchanged_dat_is_not_modified() {
        let result = negotiate(&dat("a"), Some(LAST_MODIFIED), Some("bytes=1-")).unwrap();
        assert_eq!(result, DatTransfer::NotModified);
    }

    #[test]
    fn offset_counts_wire_bytes() {
        // "1行目\n" is 6 bytes in Shift_JIS but 8 in UTF-8.
        let result = negotiate(
            &dat("1行目\n2行目"),
            Some("Fri, 22 Nov 2019 00:00:00 GMT"),
            Some("bytes=6-"),
        )
        .unwrap();
        assert_eq!(
            result,
            DatTransfer::Partial {
                body: to_wire("2行目").into_owned(),
                last_modified: LAST_MODIFIED.to_string(),
            }
        );
    }

    #[test]
    fn offset_at_end_is_empty_partial() {
        let content = "あいう";
        let len = to_wire(content).len();
        let result = negotiate(
            &dat(content),
            Some("old"),
            Some(format!("bytes={len}-").as_str()),
        )
        .unwrap();
        assert!(matches!(result, DatTransfer::Partial { body, .. } if body.is_empty()));
    }

    #[test]
    fn offset_past_end_is_not_satisfiable() {
        let content = "あいう";
        let len = to_wire(content).len();
        let result = negotiate(
            &dat(content),
            Some("old"),
            Some(format!("bytes={}-", len + 1).as_str()),
        )
        .unwrap();
        assert_eq!(result, DatTransfer::RangeNotSatisfiable);
    }

    #[test]
    fn malformed_range_is_rejected() {
        let ranges = [
            None,
            Some(""),
            Some("bytes=-"),
            Some("bytes=10"),
            Some("10-"),
            Some("bytes=1-2"),
        ];
        for range in ranges {
            let err = negotiate(&dat("a"), Some("old"), range).unwrap_err();
            assert!(matches!(err, AppError::MalformedRange(_)), "{range:?}");
        }
    }

    #[test]
    fn parse_range_accepts_digits_only() {
        assert_eq!(parse_range("bytes=3050-").unwrap(), 3050);
        assert_eq!(parse_range("bytes=0-").unwrap(), 0);
        assert!(parse_range("bytes=+5-").is_err());
    }
}
