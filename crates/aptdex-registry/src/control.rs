//! Debian control-file stanzas.
//!
//! A decoded `Packages` document is a sequence of stanzas separated by blank
//! lines. [`split`] finds the stanzas without copying, and [`parse_stanza`]
//! turns one stanza into a [`ControlRecord`].

use std::collections::BTreeMap;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A borrowed run of non-blank lines within a decoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStanza<'a> {
    /// Byte offset of the stanza within the document.
    pub offset: usize,
    pub text: &'a [u8],
}

/// Attributes of one package, keyed case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlRecord {
    fields: BTreeMap<String, String>,
}

impl ControlRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn package(&self) -> Option<&str> {
        self.get("Package")
    }

    pub fn version(&self) -> Option<&str> {
        self.get("Version")
    }

    pub fn architecture(&self) -> Option<&str> {
        self.get("Architecture")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ControlRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Stanza at byte {offset} has no fields")]
    #[diagnostic(code(aptdex_registry::control::no_fields))]
    NoFields { offset: usize },

    #[error("Stanza at byte {offset} is not valid UTF-8")]
    #[diagnostic(code(aptdex_registry::control::invalid_utf8))]
    InvalidUtf8 { offset: usize },
}

impl FormatError {
    pub fn offset(&self) -> usize {
        match self {
            FormatError::NoFields {
                offset,
            }
            | FormatError::InvalidUtf8 {
                offset,
            } => *offset,
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Splits a decoded document into stanzas.
///
/// Any run of blank (whitespace-only) lines separates stanzas. Returned
/// stanzas are never empty.
pub fn split(text: &[u8]) -> Vec<ControlStanza<'_>> {
    let mut stanzas = Vec::new();
    let mut start = None;
    let mut end = 0;
    let mut pos = 0;

    for line in text.split_inclusive(|&b| b == b'\n') {
        let line_start = pos;
        pos += line.len();

        if is_blank(line) {
            if let Some(offset) = start.take() {
                stanzas.push(ControlStanza {
                    offset,
                    text: &text[offset..end],
                });
            }
        } else {
            start.get_or_insert(line_start);
            end = pos;
        }
    }

    if let Some(offset) = start {
        stanzas.push(ControlStanza {
            offset,
            text: &text[offset..end],
        });
    }

    stanzas
}

/// Parses one stanza into a record.
///
/// `Key: value` lines set a field, replacing any earlier value. Lines that
/// start with whitespace, or otherwise carry no `": "` separator, continue the
/// most recent field. A bare `Key:` line is dropped.
pub fn parse_stanza(stanza: &ControlStanza<'_>) -> Result<ControlRecord, FormatError> {
    let text = std::str::from_utf8(stanza.text).map_err(|_| {
        FormatError::InvalidUtf8 {
            offset: stanza.offset,
        }
    })?;

    let mut fields = BTreeMap::new();
    let mut current: Option<&str> = None;

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }

        if let Some((key, value)) = line.split_once(": ") {
            fields.insert(key.to_string(), value.to_string());
            current = Some(key);
            continue;
        }
        // bare key header
        if line.trim_end().ends_with(':') {
            continue;
        }

        // continuation before any field has nowhere to go
        if let Some(value) = current.and_then(|key| fields.get_mut(key)) {
            value.push('\n');
            value.push_str(line.trim());
        }
    }

    if fields.is_empty() {
        return Err(FormatError::NoFields {
            offset: stanza.offset,
        });
    }

    Ok(ControlRecord {
        fields,
    })
}
