//! # rb-auth-trip
//!
//! Legacy implementation of `IdentityProvider`.
//! Computes the daily poster ID and both generations of trip codes.
//!
//! Trip secrets arrive as wire-charset bytes; every length below is a byte
//! length of that encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use md5::Md5;
use rb_core::traits::IdentityProvider;
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Secrets of at least this many bytes use the 12-character trip.
const NEW_TRIP_MIN_LEN: usize = 12;
const DEFAULT_SALT: &str = "H.";
const RESERVED_TRIP: &str = "???";

pub struct TripIdentityProvider {
    /// Salt mixed into every poster ID. Rotating it rotates all IDs.
    id_salt: SecretString,
    /// `#` + 16 hex digits + up to two salt characters.
    raw_key: Regex,
}

impl TripIdentityProvider {
    pub fn new(id_salt: SecretString) -> anyhow::Result<Self> {
        Ok(Self {
            id_salt,
            raw_key: Regex::new(r"^#([0-9A-Fa-f]{16})([./0-9A-Za-z]{0,2})$")?,
        })
    }

    fn trip12(&self, key: &[u8]) -> String {
        if !matches!(key.first(), Some(b'#' | b'$')) {
            let digest = Sha1::digest(key);
            return STANDARD.encode(digest)[..12].replace('+', ".");
        }

        let Some(caps) = self.raw_key.captures(key) else {
            return RESERVED_TRIP.to_string();
        };
        let Ok(raw) = hex::decode(&caps[1]) else {
            return RESERVED_TRIP.to_string();
        };
        let mut salt = String::from_utf8_lossy(&caps[2]).into_owned();
        salt.push_str("..");
        salt.truncate(2);
        crypt_tail(&raw, &salt)
    }

    fn trip_old(&self, key: &[u8]) -> String {
        let salt = if key.is_empty() {
            DEFAULT_SALT.to_string()
        } else {
            old_salt(key)
        };
        crypt_tail(key, &salt)
    }
}

/// Salt of the short trip: the second and third bytes of `key + "H."`,
/// folded into the crypt alphabet.
fn old_salt(key: &[u8]) -> String {
    let mut padded = key.to_vec();
    padded.extend_from_slice(DEFAULT_SALT.as_bytes());
    let end = (key.len() + 2).min(3);
    padded[1..end]
        .iter()
        .map(|&b| match b {
            b':'..=b'@' => (b'A' + (b - b':')) as char,
            b'['..=b'`' => (b'a' + (b - b'[')) as char,
            b'.'..=b'z' => b as char,
            _ => '.',
        })
        .collect()
}

/// Last ten characters of the DES crypt of `key` under `salt`.
fn crypt_tail(key: &[u8], salt: &str) -> String {
    match pwhash::unix_crypt::hash_with(salt, key) {
        Ok(hash) => hash[hash.len().saturating_sub(10)..].to_string(),
        Err(err) => {
            warn!(%err, "crypt rejected trip input");
            RESERVED_TRIP.to_string()
        }
    }
}

impl IdentityProvider for TripIdentityProvider {
    /// `base64(sha256(md5hex(addr)[-4..] + board + YYYY/MM/DD + salt))[..8]`
    fn poster_id(&self, addr: &str, board: &str, date: NaiveDate) -> String {
        let addr_hex = hex::encode(Md5::digest(addr.as_bytes()));
        let mut hasher = Sha256::new();
        hasher.update(&addr_hex[addr_hex.len() - 4..]);
        hasher.update(board);
        hasher.update(date.format("%Y/%m/%d").to_string());
        hasher.update(self.id_salt.expose_secret());
        STANDARD.encode(hasher.finalize())[..8].to_string()
    }

    fn trip(&self, secret: &[u8]) -> String {
        if secret.len() >= NEW_TRIP_MIN_LEN {
            self.trip12(secret)
        } else {
            self.trip_old(secret)
        }
    }
}
