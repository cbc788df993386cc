//! Line-faithful model of the `hindsight.conf` document.
//!
//! The format is INI-like: `[Section]` headers, `KEY=value` entries, `#` or
//! `;` comments and blank lines. Parsing never fails. Anything that is not a
//! header or a key/value pair is kept verbatim as an opaque line, so a
//! hand-edited or damaged file still loads and re-serializes unchanged.
//!
//! Lookups are by key name only, regardless of section. The schema keeps key
//! names globally unique to make that safe.

use std::path::Path;

use thiserror::Error;

use crate::error::Result;
use crate::file_ops::{read_optional, write_file_atomic};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("key {0} not found")]
pub struct KeyNotFound(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Comment, blank or unrecognised line, stored without trailing whitespace.
    Opaque(String),
    /// `KEY=value`. `raw` holds the original line until the value is changed.
    Pair {
        key: String,
        value: String,
        raw: Option<String>,
    },
}

impl Entry {
    fn pair(key: &str, value: &str) -> Self {
        Entry::Pair {
            key: key.to_string(),
            value: value.to_string(),
            raw: None,
        }
    }

    fn key(&self) -> Option<&str> {
        match self {
            Entry::Pair { key, .. } => Some(key),
            Entry::Opaque(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Entry::Opaque(line) => line.clone(),
            Entry::Pair { raw: Some(raw), .. } => raw.clone(),
            Entry::Pair { key, value, raw: None } => format_pair(key, value),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Entry::Opaque(line) if line.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    header: String,
    entries: Vec<Entry>,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

/// Ordered, sectioned key/value document with comment and ordering fidelity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    /// Lines before the first section header.
    preamble: Vec<Entry>,
    sections: Vec<Section>,
}

impl ConfigDocument {
    pub fn parse(text: &str) -> Self {
        let mut doc = ConfigDocument::default();

        for line in text.lines() {
            let line = line.trim_end();
            if let Some(name) = parse_header(line) {
                doc.sections.push(Section {
                    name: name.to_string(),
                    header: line.to_string(),
                    entries: Vec::new(),
                });
                continue;
            }

            let entry = match parse_pair(line) {
                Some((key, value)) => Entry::Pair {
                    key: key.to_string(),
                    value,
                    raw: Some(line.to_string()),
                },
                None => Entry::Opaque(line.to_string()),
            };

            match doc.sections.last_mut() {
                Some(section) => section.entries.push(entry),
                None => doc.preamble.push(entry),
            }
        }

        doc
    }

    /// Load a document from disk; `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        Ok(read_optional(path)?.map(|text| Self::parse(&text)))
    }

    /// Serialize and atomically replace `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_file_atomic(path, &self.serialize(), None)
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let mut push = |line: &str| {
            out.push_str(line);
            out.push('\n');
        };

        for entry in &self.preamble {
            push(&entry.render());
        }
        for section in &self.sections {
            push(&section.header);
            for entry in &section.entries {
                push(&entry.render());
            }
        }
        out
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries().find_map(|entry| match entry {
            Entry::Pair { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Name of the section holding `key`; `None` for absent or root-level keys.
    pub fn section_of(&self, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| s.entries.iter().any(|e| e.key() == Some(key)))
            .map(|s| s.name.as_str())
    }

    /// All keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries().filter_map(Entry::key)
    }

    /// Replace an existing value in place.
    ///
    /// Setting the value a key already holds leaves its original line untouched.
    pub fn set(&mut self, key: &str, new_value: &str) -> Result<(), KeyNotFound> {
        let slot = self
            .entries_mut()
            .find(|e| e.key() == Some(key))
            .ok_or_else(|| KeyNotFound(key.to_string()))?;

        if let Entry::Pair { value, raw, .. } = slot
            && *value != new_value
        {
            *value = new_value.to_string();
            *raw = None;
        }
        Ok(())
    }

    /// Insert `key` directly after the header of `section`, creating the
    /// section at the end of the document when it does not exist yet.
    pub fn append_to_section(&mut self, section: &str, key: &str, value: &str) {
        match self.sections.iter_mut().find(|s| s.name == section) {
            Some(existing) => existing.entries.insert(0, Entry::pair(key, value)),
            None => self.push_section(section, &[(key, value)]),
        }
    }

    /// Entries before the first section header.
    pub fn preamble(&self) -> &[Entry] {
        &self.preamble
    }

    /// Add a top-level pair after the last non-blank line of the preamble.
    pub fn push_preamble(&mut self, key: &str, value: &str) {
        let at = self
            .preamble
            .iter()
            .rposition(|e| !e.is_blank())
            .map_or(0, |i| i + 1);
        self.preamble.insert(at, Entry::pair(key, value));
    }

    /// Append a whole new section with its entries in the given order.
    pub fn push_section(&mut self, name: &str, pairs: &[(&str, &str)]) {
        let needs_separator = match self.sections.last() {
            Some(last) => last.entries.last().is_some_and(|e| !e.is_blank()),
            None => self.preamble.last().is_some_and(|e| !e.is_blank()),
        };
        if needs_separator {
            match self.sections.last_mut() {
                Some(last) => last.entries.push(Entry::Opaque(String::new())),
                None => self.preamble.push(Entry::Opaque(String::new())),
            }
        }

        self.sections.push(Section {
            name: name.to_string(),
            header: format!("[{name}]"),
            entries: pairs.iter().map(|(k, v)| Entry::pair(k, v)).collect(),
        });
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.preamble
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.entries.iter()))
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.preamble
            .iter_mut()
            .chain(self.sections.iter_mut().flat_map(|s| s.entries.iter_mut()))
    }
}

/// Replace the line holding `key` directly in `text`, leaving every other
/// byte alone. Works on files that would not otherwise be re-serialized.
///
/// Returns `None` when no line assigns `key`.
pub fn replace_key_line(text: &str, key: &str, value: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len() + value.len());
    let mut found = false;

    for line in text.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        match parse_pair(body.trim_end()) {
            Some((k, _)) if k == key => {
                found = true;
                out.push_str(&format_pair(key, value));
                out.push_str(ending);
            }
            _ => out.push_str(line),
        }
    }

    found.then_some(out)
}

/// Quote values containing whitespace; everything else is written bare.
pub fn format_pair(key: &str, value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("{key}=\"{value}\"")
    } else {
        format!("{key}={value}")
    }
}

fn parse_header(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?.trim();
    if inner.is_empty() || inner.contains(['[', ']']) {
        return None;
    }
    Some(inner)
}

fn parse_pair(line: &str) -> Option<(&str, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
