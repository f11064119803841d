//! Transcoding between the wire charset (Shift_JIS) and internal UTF-8 text.
//!
//! Characters without a Shift_JIS mapping are sent as HTML numeric character
//! references, so a UTF-8 dat can always be served.

use std::borrow::Cow;

use encoding_rs::SHIFT_JIS;

/// Charset label used in `Content-Type` headers.
pub const WIRE_CHARSET: &str = "Shift_JIS";

/// Encodes internal text into wire bytes.
pub fn to_wire(text: &str) -> Cow<'_, [u8]> {
    let (bytes, _, _) = SHIFT_JIS.encode(text);
    bytes
}

/// Decodes wire bytes into internal text; malformed sequences become U+FFFD.
pub fn from_wire(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, _) = SHIFT_JIS.decode(bytes);
    text
}

/// Length of `text` once encoded for the wire.
pub fn wire_len(text: &str) -> usize {
    to_wire(text).len()
}
