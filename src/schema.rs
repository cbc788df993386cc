//! The recognized-key schema of `hindsight.conf`.
//!
//! Each [`RecognizedKey`] names its canonical section, its default and two
//! policy flags:
//!
//! - `preserve`: a full regeneration carries the previous value forward
//!   instead of resetting it to the template default.
//! - `user_owned`: an update re-applies the previous value on top of the
//!   freshly pulled baseline.
//!
//! Every user-owned key is also preserved. Key names are unique across all
//! sections because document lookups ignore sections.

use std::path::Path;

use crate::document::ConfigDocument;
use crate::template::Placeholders;

/// Release version of this tool and of the templates shipped with it.
pub const RELEASE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const SECTION_INSTALLATION: &str = "Installation";
pub const SECTION_USER: &str = "User Settings";
pub const SECTION_PATHS: &str = "System Paths";
pub const SECTION_API: &str = "API";
pub const SECTION_SEARCH: &str = "Search";

/// Key names used directly by the lifecycle code.
pub mod keys {
    pub const VERSION: &str = "VERSION";
    pub const TERMINAL_CMD: &str = "TERMINAL_CMD";
    pub const DAYS_TO_KEEP: &str = "DAYS_TO_KEEP";
    pub const POLL_INTERVAL: &str = "POLL_INTERVAL";
    pub const REFINER_MODEL: &str = "REFINER_MODEL";
    pub const EXCLUDED_APPS: &str = "EXCLUDED_APPS";
    pub const GIT_BRANCH: &str = "GIT_BRANCH";
}

/// Placeholders that are not document keys but are always available.
pub const HOME: &str = "HOME";
pub const INSTALL_ROOT: &str = "INSTALL_ROOT";
pub const USER: &str = "USER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Literal(&'static str),
    /// Path relative to the install root.
    UnderRoot(&'static str),
    /// [`RELEASE_VERSION`].
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizedKey {
    pub section: &'static str,
    pub key: &'static str,
    pub default: DefaultValue,
    pub preserve: bool,
    pub user_owned: bool,
    /// Question asked when the document is created from scratch.
    pub prompt: Option<&'static str>,
}

impl RecognizedKey {
    const fn new(section: &'static str, key: &'static str, default: DefaultValue) -> Self {
        Self {
            section,
            key,
            default,
            preserve: false,
            user_owned: false,
            prompt: None,
        }
    }

    const fn preserved(mut self) -> Self {
        self.preserve = true;
        self
    }

    const fn user_owned(mut self) -> Self {
        self.preserve = true;
        self.user_owned = true;
        self
    }

    const fn prompted(mut self, question: &'static str) -> Self {
        self.prompt = Some(question);
        self
    }

    pub fn default_value(&self, root: &Path) -> String {
        match self.default {
            DefaultValue::Literal(v) => v.to_string(),
            DefaultValue::UnderRoot(rel) => root.join(rel).display().to_string(),
            DefaultValue::Release => RELEASE_VERSION.to_string(),
        }
    }
}

use DefaultValue::{Literal, Release, UnderRoot};

const fn lit(section: &'static str, key: &'static str, v: &'static str) -> RecognizedKey {
    RecognizedKey::new(section, key, Literal(v))
}

const fn path(key: &'static str, rel: &'static str) -> RecognizedKey {
    RecognizedKey::new(SECTION_PATHS, key, UnderRoot(rel)).preserved()
}

const fn search(key: &'static str, v: &'static str) -> RecognizedKey {
    lit(SECTION_SEARCH, key, v).preserved()
}

/// The full schema, in canonical document order.
pub static RECOGNIZED_KEYS: &[RecognizedKey] = &[
    RecognizedKey::new(SECTION_INSTALLATION, keys::VERSION, Release),
    lit(SECTION_USER, keys::TERMINAL_CMD, "").preserved(),
    lit(SECTION_USER, keys::DAYS_TO_KEEP, "90")
        .user_owned()
        .prompted("How many days of history should be kept?"),
    lit(SECTION_USER, keys::POLL_INTERVAL, "5")
        .user_owned()
        .prompted("Seconds between screenshots?"),
    lit(SECTION_USER, keys::REFINER_MODEL, "gemini-2.5-flash")
        .user_owned()
        .prompted("Model used to refine search answers?"),
    lit(SECTION_USER, keys::EXCLUDED_APPS, "keepassxc")
        .user_owned()
        .prompted("Comma-separated window titles never to capture?"),
    lit(SECTION_USER, keys::GIT_BRANCH, "main").user_owned(),
    path("APP_PATH", "app"),
    path("SCRIPTS_PATH", "scripts"),
    path("VENV_PATH", "venv"),
    path("DATA_DIR", "data"),
    path("SCREENSHOT_DIR", "data/screenshots"),
    path("OCR_TEXT_DIR", "data/ocr_text"),
    path("DB_DIR", "data/db"),
    path("LOG_FILE", "data/hindsight.log"),
    lit(SECTION_API, "URL", "http://127.0.0.1:5000"),
    search("SEARCH_MODE", "hybrid"),
    search("EMBEDDING_MODEL", "all-mpnet-base-v2"),
    search("SEMANTIC_WEIGHT", "0.7"),
    search("KEYWORD_WEIGHT", "0.3"),
    search("MAX_RESULTS", "20"),
    search("MIN_SCORE", "0.35"),
    search("REFINE_RESULTS", "true"),
];

pub fn recognized_key(name: &str) -> Option<&'static RecognizedKey> {
    RECOGNIZED_KEYS.iter().find(|k| k.key == name)
}

pub fn keys_in_section(section: &str) -> impl Iterator<Item = &'static RecognizedKey> + '_ {
    RECOGNIZED_KEYS.iter().filter(move |k| k.section == section)
}

pub fn user_owned_keys() -> impl Iterator<Item = &'static RecognizedKey> {
    RECOGNIZED_KEYS.iter().filter(|k| k.user_owned)
}

/// Placeholders that do not come from the document.
pub fn environment_placeholders(root: &Path) -> Placeholders {
    let home = dirs::home_dir()
        .map(|h| h.display().to_string())
        .unwrap_or_default();
    let user = std::env::var("USER").unwrap_or_default();

    let mut values = Placeholders::new();
    values
        .insert(HOME, home)
        .insert(INSTALL_ROOT, root.display().to_string())
        .insert(USER, user);
    values
}

/// Placeholders for rendering deployment artifacts: schema defaults,
/// overridden by the document's values, plus the environment.
pub fn document_placeholders(doc: &ConfigDocument, root: &Path) -> Placeholders {
    let mut values = environment_placeholders(root);
    for key in RECOGNIZED_KEYS {
        values.insert(key.key, key.default_value(root));
    }
    for key in doc.keys() {
        if let Some(value) = doc.get(key) {
            values.insert(key, value);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn key_names_are_globally_unique() {
        let mut seen = HashSet::new();
        for key in RECOGNIZED_KEYS {
            assert!(seen.insert(key.key), "duplicate key {}", key.key);
        }
    }

    #[test]
    fn user_owned_keys_are_preserved() {
        for key in user_owned_keys() {
            assert!(key.preserve, "{} is user-owned but not preserved", key.key);
        }
    }

    #[test]
    fn search_block_has_seven_keys() {
        assert_eq!(keys_in_section(SECTION_SEARCH).count(), 7);
    }

    #[test]
    fn user_owned_set_matches_update_policy() {
        let owned: Vec<_> = user_owned_keys().map(|k| k.key).collect();
        assert_eq!(
            owned,
            vec![
                keys::DAYS_TO_KEEP,
                keys::POLL_INTERVAL,
                keys::REFINER_MODEL,
                keys::EXCLUDED_APPS,
                keys::GIT_BRANCH
            ]
        );
    }

    #[test]
    fn path_defaults_follow_root() {
        let root = PathBuf::from("/home/ada/hindsight");
        let key = recognized_key("SCREENSHOT_DIR").unwrap();
        assert_eq!(key.default_value(&root), "/home/ada/hindsight/data/screenshots");
    }

    #[test]
    fn document_values_override_defaults() {
        let root = PathBuf::from("/srv/hs");
        let doc = ConfigDocument::parse("[User Settings]\nDAYS_TO_KEEP=7\nCUSTOM=yes\n");
        let values = document_placeholders(&doc, &root);
        assert_eq!(values.get(keys::DAYS_TO_KEEP), Some("7"));
        assert_eq!(values.get(keys::POLL_INTERVAL), Some("5"));
        assert_eq!(values.get("CUSTOM"), Some("yes"));
        assert_eq!(values.get(INSTALL_ROOT), Some("/srv/hs"));
    }
}
