//! `%%NAME%%` placeholder substitution.
//!
//! Rendering is a single pass over the template: every token whose name is
//! in the [`Placeholders`] map is replaced, and every token that is not is
//! reported back as a [`LifecycleError::Render`]. Substituted values are
//! never rescanned, so a value that happens to contain `%%` is inserted as is.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{LifecycleError, Result};
use crate::file_ops::read_optional;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%%([A-Za-z0-9_]+)%%").expect("placeholder pattern is valid"));

/// Placeholder name to replacement value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders(BTreeMap<String, String>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Placeholders(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// An immutable template body and the name it is reported under.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    body: String,
}

impl Template {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Read a template from disk. A missing file means the schema or
    /// artifact set is unknown, which is fatal.
    pub fn load(name: impl Into<String>, path: &Path) -> Result<Self> {
        match read_optional(path)? {
            Some(body) => Ok(Self::new(name, body)),
            None => Err(LifecycleError::Schema {
                path: PathBuf::from(path),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn render(&self, values: &Placeholders) -> Result<String> {
        let mut missing = BTreeSet::new();

        let rendered = PLACEHOLDER.replace_all(&self.body, |caps: &Captures| {
            let name = &caps[1];
            match values.get(name) {
                Some(value) => value.to_string(),
                None => {
                    missing.insert(name.to_string());
                    caps[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(LifecycleError::Render {
                artifact: self.name.clone(),
                names: missing.into_iter().collect(),
            });
        }

        Ok(rendered.into_owned())
    }
}
