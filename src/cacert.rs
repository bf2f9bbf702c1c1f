//! Repair of the `cacert` reference inside an OpenStack `clouds.yaml`.
//!
//! The installer may leave a `cacert` path in the root credentials that only
//! exists on the bootstrap host. Components reading the credentials mount the
//! trusted CA bundle at a well-known location instead, so every cloud entry
//! carrying a `cacert` is pointed at that location.

use serde::Deserialize;
use serde_yaml::Value;
use tracing::*;

use crate::{Error, Result};

/// Where the cloud-config CA bundle is mounted for static pods.
pub static DEFAULT_CACERT_PATH: &str =
    "/etc/kubernetes/static-pod-resources/configmaps/cloud-config/ca-bundle.pem";

pub static CLOUDS_KEY: &str = "clouds";
pub static CACERT_KEY: &str = "cacert";

/// Plain scalars a YAML 1.1 reader resolves to booleans, beyond `true`/`false`.
static YAML11_BOOLS: &[&str] = &["y", "n", "yes", "no", "on", "off"];

/// Result of a repair pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairOutcome {
    /// The repaired document. Byte-identical to the input when `corrected` is empty.
    pub document: String,
    /// Names of the clouds whose `cacert` was rewritten, in document order.
    pub corrected: Vec<String>,
}

impl RepairOutcome {
    pub fn changed(&self) -> bool {
        !self.corrected.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct CaCertRepairer {
    cacert_path: String,
}

impl Default for CaCertRepairer {
    fn default() -> Self {
        Self::new(DEFAULT_CACERT_PATH)
    }
}

impl CaCertRepairer {
    pub fn new(cacert_path: impl Into<String>) -> Self {
        Self {
            cacert_path: cacert_path.into(),
        }
    }

    pub fn cacert_path(&self) -> &str {
        &self.cacert_path
    }

    /// Point every `cacert` in `clouds` at the canonical bundle and return the document.
    pub fn repair(&self, clouds: &str) -> Result<String> {
        self.repair_report(clouds).map(|outcome| outcome.document)
    }

    pub fn repair_report(&self, clouds: &str) -> Result<RepairOutcome> {
        let mut doc = parse_first_document(clouds)?;
        doc.apply_merge().map_err(Error::ParseError)?;
        let corrected = self.repair_value(&mut doc);
        if corrected.is_empty() {
            return Ok(RepairOutcome {
                document: clouds.to_string(),
                corrected,
            });
        }
        let document = serde_yaml::to_string(&doc).map_err(Error::SerializationError)?;
        Ok(RepairOutcome {
            document: quote_yaml11_bools(&document),
            corrected,
        })
    }

    /// Rewrite `clouds.<name>.cacert` in place, returning the names that changed.
    pub fn repair_value(&self, doc: &mut Value) -> Vec<String> {
        let mut corrected = Vec::new();
        let Some(Value::Mapping(clouds)) = doc.get_mut(CLOUDS_KEY) else {
            debug!("No `{}` mapping in document, nothing to repair", CLOUDS_KEY);
            return corrected;
        };
        for (name, cloud) in clouds.iter_mut() {
            let Some(cacert) = cloud.get_mut(CACERT_KEY) else {
                continue;
            };
            if cacert.as_str() == Some(self.cacert_path.as_str()) {
                continue;
            }
            let name = cloud_name(name);
            info!(
                "Replacing cacert {:?} of cloud {} with {}",
                cacert, name, self.cacert_path
            );
            *cacert = Value::String(self.cacert_path.clone());
            corrected.push(name);
        }
        corrected
    }
}

fn cloud_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Only the first document of a stream is considered; an empty stream is null.
fn parse_first_document(clouds: &str) -> Result<Value> {
    match serde_yaml::Deserializer::from_str(clouds).next() {
        Some(de) => Value::deserialize(de).map_err(Error::ParseError),
        None => Ok(Value::Null),
    }
}

fn is_yaml11_bool(scalar: &str) -> bool {
    YAML11_BOOLS.iter().any(|b| scalar.eq_ignore_ascii_case(b))
}

/// Single-quote plain scalars such as `yes` or `off` so YAML 1.1 readers keep them strings.
///
/// Booleans are always emitted as `true`/`false`, so any such plain scalar
/// in serializer output came from a string. Block scalar bodies are left alone.
fn quote_yaml11_bools(doc: &str) -> String {
    let mut out = String::with_capacity(doc.len());
    let mut block_parent: Option<usize> = None;
    for line in doc.split_inclusive('\n') {
        let body = line.trim_end_matches('\n');
        let indent = body.len() - body.trim_start_matches(' ').len();
        if let Some(parent) = block_parent {
            if body.trim().is_empty() || indent > parent {
                out.push_str(line);
                continue;
            }
            block_parent = None;
        }
        let (quoted, opens_block) = quote_line(body, indent);
        if opens_block {
            block_parent = Some(indent);
        }
        out.push_str(&quoted);
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

fn quote_line(body: &str, indent: usize) -> (String, bool) {
    let mut out = body[..indent].to_string();
    let mut rest = &body[indent..];
    while let Some(item) = rest.strip_prefix("- ") {
        out.push_str("- ");
        rest = item;
    }
    let (key, value) = match split_key(rest) {
        Some((key, value)) => (Some(key), value),
        None => (None, rest),
    };
    if let Some(key) = key {
        out.push_str(&quote_scalar(key));
        out.push(':');
        if !value.is_empty() {
            out.push(' ');
        }
    }
    out.push_str(&quote_scalar(value));
    let opens_block = value.starts_with('|') || value.starts_with('>');
    (out, opens_block)
}

/// Split `key: value` or `key:` on the separator following a plain or quoted key.
fn split_key(rest: &str) -> Option<(&str, &str)> {
    let key_end = match rest.chars().next()? {
        '\'' => closing_single_quote(rest)?,
        '"' => closing_double_quote(rest)?,
        _ => {
            if let Some(key) = rest.strip_suffix(':') {
                if !key.contains(": ") {
                    return Some((key, ""));
                }
            }
            return rest.split_once(": ");
        }
    };
    let (key, tail) = rest.split_at(key_end);
    if tail == ":" {
        Some((key, ""))
    } else {
        tail.strip_prefix(": ").map(|value| (key, value))
    }
}

fn closing_single_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn closing_double_quote(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn quote_scalar(scalar: &str) -> String {
    if is_yaml11_bool(scalar) {
        format!("'{scalar}'")
    } else {
        scalar.to_string()
    }
}
