use std::collections::BTreeMap;

use crate::{Error, Result};
use k8s_openapi::api::core::v1::Secret;

pub enum Decoded {
    /// Usually secrets are just short utf8 encoded strings
    Utf8(String),
    /// But it's allowed to just base64 encode binary in the values
    Bytes(Vec<u8>),
}

pub fn decode_secret(secret: &Secret) -> BTreeMap<String, Decoded> {
    let mut res = BTreeMap::new();
    if let Some(data) = secret.data.clone() {
        for (k, v) in data {
            match String::from_utf8(v.0) {
                Ok(s) => res.insert(k, Decoded::Utf8(s)),
                Err(e) => res.insert(k, Decoded::Bytes(e.into_bytes())),
            };
        }
    }
    // stringData is write-only on the API server, but objects built locally may carry it
    if let Some(string_data) = secret.string_data.clone() {
        for (k, v) in string_data {
            res.insert(k, Decoded::Utf8(v));
        }
    }
    res
}

/// Text stored under `key`, `None` when the key is absent.
pub fn secret_text(secret: &Secret, key: &str) -> Result<Option<String>> {
    match decode_secret(secret).remove(key) {
        Some(Decoded::Utf8(s)) => Ok(Some(s)),
        Some(Decoded::Bytes(_)) => Err(Error::InvalidPayload(format!(
            "secret key `{key}` is not valid UTF-8"
        ))),
        None => Ok(None),
    }
}
