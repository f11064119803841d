//! `application/x-www-form-urlencoded` bodies whose values are percent-encoded
//! wire-charset bytes. Values stay raw so byte limits can be checked before
//! decoding.

use std::collections::HashMap;

use percent_encoding::percent_decode;

use crate::validator::BadParameter;

#[derive(Debug, Default)]
pub struct WireForm {
    fields: HashMap<String, Vec<Vec<u8>>>,
}

impl WireForm {
    pub fn parse(body: &[u8]) -> Self {
        let mut fields: HashMap<String, Vec<Vec<u8>>> = HashMap::new();
        for pair in body.split(|&b| b == b'&').filter(|p| !p.is_empty()) {
            let (key, value) = match pair.iter().position(|&b| b == b'=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, &[][..]),
            };
            let key = String::from_utf8_lossy(&decode(key)).into_owned();
            fields.entry(key).or_default().push(decode(value));
        }
        Self { fields }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The single raw value of `name`.
    pub fn one(&self, name: &'static str) -> Result<&[u8], BadParameter> {
        match self.fields.get(name).map(Vec::as_slice) {
            None => Err(BadParameter::new(name, "missing")),
            Some([]) => Err(BadParameter::new(name, "empty")),
            Some([value]) => Ok(value),
            Some(_) => Err(BadParameter::new(name, "too many")),
        }
    }
}

fn decode(raw: &[u8]) -> Vec<u8> {
    let spaced: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&spaced).collect()
}
