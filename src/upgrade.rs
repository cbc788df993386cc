//! Bring `hindsight.conf` to full schema compliance without losing data.
//!
//! Two passes:
//!
//! 1. Instantiation, only when there is no document or a regeneration was
//!    requested. The canonical template is rendered with values taken from
//!    the previous document for preserve-flagged keys, from the operator for
//!    prompted keys, and from the schema defaults for everything else. The
//!    previous file is backed up first.
//! 2. Repair, on every run. Each recognized key that is missing gets its
//!    default appended to its section. Existing values are never touched and
//!    unknown keys are never removed.
//!
//! Every run finally stamps `VERSION` with the release the template belongs
//! to, since that key records the installation rather than a user choice.

use std::path::{Path, PathBuf};

use log::info;

use crate::document::{ConfigDocument, Entry};
use crate::error::Result;
use crate::file_ops::backup_file;
use crate::prompt::Operator;
use crate::schema::{self, RECOGNIZED_KEYS, RELEASE_VERSION, RecognizedKey, SECTION_INSTALLATION, keys};
use crate::template::Template;

/// A key added by the repair pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub section: &'static str,
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug)]
pub struct UpgradeOutcome {
    pub document: ConfigDocument,
    /// No document existed before this run.
    pub created: bool,
    /// An existing document was rewritten from the template.
    pub regenerated: bool,
    pub backup: Option<PathBuf>,
    pub injected: Vec<Injection>,
    /// Previous `VERSION` when the stamp changed it.
    pub previous_version: Option<String>,
}

pub struct UpgradeEngine<'a> {
    root: &'a Path,
    template: &'a Template,
    dry_run: bool,
}

impl<'a> UpgradeEngine<'a> {
    pub fn new(root: &'a Path, template: &'a Template) -> Self {
        Self {
            root,
            template,
            dry_run: false,
        }
    }

    /// Skip the backup a regeneration would take.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Upgrade `existing` (loaded from `document_path`) in memory.
    ///
    /// Nothing is written except the backup taken before a regeneration; the
    /// caller saves the returned document once at the end of its run.
    pub fn run(
        &self,
        existing: Option<ConfigDocument>,
        document_path: &Path,
        regenerate: bool,
        operator: &mut dyn Operator,
    ) -> Result<UpgradeOutcome> {
        let created = existing.is_none();
        let regenerated = regenerate && !created;
        let mut backup = None;

        let mut document = match existing {
            Some(current) if regenerate => {
                if self.dry_run {
                    info!("[dry run] would back up {}", document_path.display());
                } else if document_path.exists() {
                    backup = Some(backup_file(document_path)?);
                }
                info!("Regenerating {} from template", document_path.display());
                self.instantiate(Some(&current), operator)?
            }
            Some(current) => current,
            None => {
                info!("No configuration at {}, creating it", document_path.display());
                self.instantiate(None, operator)?
            }
        };

        let injected = repair(&mut document, self.root);
        let previous_version = stamp_version(&mut document, &self.release_version());

        Ok(UpgradeOutcome {
            document,
            created,
            regenerated,
            backup,
            injected,
            previous_version,
        })
    }

    /// The template's literal `VERSION`, or this build's release when the
    /// template leaves it to a placeholder.
    pub fn release_version(&self) -> String {
        let shipped = ConfigDocument::parse(self.template.body());
        match shipped.get(keys::VERSION).map(str::trim) {
            Some(v) if !v.is_empty() && !v.contains("%%") => v.to_string(),
            _ => RELEASE_VERSION.to_string(),
        }
    }

    /// Render a fresh document from the template.
    ///
    /// Without a snapshot the operator is asked for every prompted key. With
    /// one, preserve-flagged keys keep their previous value and everything
    /// else falls back to the schema default. Keys the schema does not know
    /// are carried over from `snapshot` into their previous section.
    ///
    /// Operator answers and preserved values also override literals the
    /// template ships for the same key.
    pub fn instantiate(
        &self,
        snapshot: Option<&ConfigDocument>,
        operator: &mut dyn Operator,
    ) -> Result<ConfigDocument> {
        let mut values = schema::environment_placeholders(self.root);
        let mut pinned: Vec<(&RecognizedKey, String)> = Vec::new();

        for key in RECOGNIZED_KEYS {
            let value = match snapshot {
                Some(snapshot) => match preserved_value(snapshot, key) {
                    Some(kept) => {
                        pinned.push((key, kept.to_string()));
                        kept.to_string()
                    }
                    None => key.default_value(self.root),
                },
                None => {
                    let value = self.initial_value(key, operator)?;
                    if key.prompt.is_some() {
                        pinned.push((key, value.clone()));
                    }
                    value
                }
            };
            values.insert(key.key, value);
        }

        if let Some(snapshot) = snapshot {
            for key in snapshot.keys().filter(|k| schema::recognized_key(k).is_none()) {
                if let Some(value) = snapshot.get(key) {
                    values.insert(key, value);
                }
            }
        }

        let mut document = ConfigDocument::parse(&self.template.render(&values)?);

        for (key, value) in &pinned {
            if document.get(key.key) == Some(value.as_str()) {
                continue;
            }
            if document.set(key.key, value).is_err() {
                document.append_to_section(key.section, key.key, value);
            }
        }

        if let Some(snapshot) = snapshot {
            carry_unknown_keys(snapshot, &mut document);
        }

        Ok(document)
    }

    fn initial_value(&self, key: &RecognizedKey, operator: &mut dyn Operator) -> Result<String> {
        let default = key.default_value(self.root);
        match key.prompt {
            Some(question) => {
                let answer = operator.text(question, Some(&default))?;
                let answer = answer.trim();
                Ok(if answer.is_empty() { default } else { answer.to_string() })
            }
            None => Ok(default),
        }
    }
}

fn preserved_value<'d>(snapshot: &'d ConfigDocument, key: &RecognizedKey) -> Option<&'d str> {
    if key.preserve { snapshot.get(key.key) } else { None }
}

/// Set `VERSION` to `release`. Returns the replaced value when it changed.
fn stamp_version(document: &mut ConfigDocument, release: &str) -> Option<String> {
    let previous = document.get(keys::VERSION).map(str::to_string);
    if previous.as_deref() == Some(release) {
        return None;
    }
    if document.set(keys::VERSION, release).is_err() {
        document.append_to_section(SECTION_INSTALLATION, keys::VERSION, release);
    }
    info!("{} set to {release}", keys::VERSION);
    previous
}

fn carry_unknown_keys(snapshot: &ConfigDocument, document: &mut ConfigDocument) {
    for entry in snapshot.preamble() {
        if let Entry::Pair { key, value, .. } = entry
            && schema::recognized_key(key).is_none()
            && !document.contains_key(key)
        {
            info!("Keeping unrecognized top-level key {key}");
            document.push_preamble(key, value);
        }
    }

    for section in snapshot.sections() {
        for entry in section.entries().iter().rev() {
            if let Entry::Pair { key, value, .. } = entry
                && schema::recognized_key(key).is_none()
                && !document.contains_key(key)
            {
                info!("Keeping unrecognized key {key} in [{}]", section.name());
                document.append_to_section(section.name(), key, value);
            }
        }
    }
}

/// Append every missing recognized key to its section with its default.
///
/// A section that is absent altogether is appended as one block in schema
/// order. Inside an existing section new keys go right after the header,
/// also in schema order.
pub fn repair(document: &mut ConfigDocument, root: &Path) -> Vec<Injection> {
    let mut injected = Vec::new();

    for section in section_order() {
        let missing: Vec<Injection> = schema::keys_in_section(section)
            .filter(|k| !document.contains_key(k.key))
            .map(|k| Injection {
                section: k.section,
                key: k.key,
                value: k.default_value(root),
            })
            .collect();

        if missing.is_empty() {
            continue;
        }

        if document.has_section(section) {
            for m in missing.iter().rev() {
                document.append_to_section(section, m.key, &m.value);
            }
        } else {
            let pairs: Vec<(&str, &str)> = missing.iter().map(|m| (m.key, m.value.as_str())).collect();
            document.push_section(section, &pairs);
        }

        for m in &missing {
            info!("Added missing key {} to [{}] with default {:?}", m.key, m.section, m.value);
        }
        injected.extend(missing);
    }

    injected
}

fn section_order() -> Vec<&'static str> {
    let mut order: Vec<&'static str> = Vec::new();
    for key in RECOGNIZED_KEYS {
        if !order.contains(&key.section) {
            order.push(key.section);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedOperator;
    use crate::schema::{SECTION_SEARCH, SECTION_USER, keys};

    fn root() -> PathBuf {
        PathBuf::from("/home/ada/hindsight")
    }

    #[test]
    fn repair_injects_whole_search_block() {
        let mut doc = ConfigDocument::parse("[User Settings]\nDAYS_TO_KEEP=30\n");
        let injected = repair(&mut doc, &root());
        assert!(injected.iter().any(|i| i.key == "SEARCH_MODE"));

        let text = doc.serialize();
        let search = text.split("[Search]\n").nth(1).unwrap();
        assert!(search.starts_with(
            "SEARCH_MODE=hybrid\nEMBEDDING_MODEL=all-mpnet-base-v2\nSEMANTIC_WEIGHT=0.7\n"
        ));
        assert_eq!(doc.get(keys::DAYS_TO_KEEP), Some("30"));
    }

    #[test]
    fn repair_keeps_user_search_values() {
        let mut doc = ConfigDocument::parse("[Search]\nMAX_RESULTS=50\n");
        repair(&mut doc, &root());
        assert_eq!(doc.get("MAX_RESULTS"), Some("50"));
        assert_eq!(doc.get("MIN_SCORE"), Some("0.35"));
        assert_eq!(doc.serialize().matches("[Search]").count(), 1);
        // injected keys land after the header, in schema order, before the user's key
        let text = doc.serialize();
        let search = text.split("[Search]\n").nth(1).unwrap();
        assert!(search.starts_with("SEARCH_MODE=hybrid\n"));
        assert!(search.contains("MIN_SCORE=0.35\nREFINE_RESULTS=true\nMAX_RESULTS=50\n"));
    }

    #[test]
    fn repair_is_idempotent() {
        let mut doc = ConfigDocument::parse("# mine\n[User Settings]\nTERMINAL_CMD=foot\n");
        repair(&mut doc, &root());
        let first = doc.serialize();

        let mut again = ConfigDocument::parse(&first);
        assert!(repair(&mut again, &root()).is_empty());
        assert_eq!(again.serialize(), first);
    }

    #[test]
    fn repair_respects_keys_living_in_other_sections() {
        let mut doc = ConfigDocument::parse("[Legacy]\nPOLL_INTERVAL=2\n");
        repair(&mut doc, &root());
        assert_eq!(doc.section_of(keys::POLL_INTERVAL), Some("Legacy"));
        assert_eq!(doc.serialize().matches("POLL_INTERVAL").count(), 1);
    }

    #[test]
    fn creation_prompts_for_prompted_keys() {
        let template = Template::new(
            "hindsight.conf",
            "[User Settings]\nDAYS_TO_KEEP=%%DAYS_TO_KEEP%%\nPOLL_INTERVAL=%%POLL_INTERVAL%%\n",
        );
        let r = root();
        let engine = UpgradeEngine::new(&r, &template);
        // DAYS_TO_KEEP, POLL_INTERVAL, REFINER_MODEL, EXCLUDED_APPS
        let mut op = ScriptedOperator::new(["45", "", "", ""]);
        let doc = engine.instantiate(None, &mut op).unwrap();
        assert_eq!(doc.get(keys::DAYS_TO_KEEP), Some("45"));
        assert_eq!(doc.get(keys::POLL_INTERVAL), Some("5"));
        assert_eq!(op.asked.len(), 4);
    }

    #[test]
    fn regeneration_preserves_flagged_keys_and_unknown_keys() {
        let template = Template::new(
            "hindsight.conf",
            "[Installation]\nVERSION=%%VERSION%%\n\n[User Settings]\nTERMINAL_CMD=%%TERMINAL_CMD%%\nDAYS_TO_KEEP=%%DAYS_TO_KEEP%%\n",
        );
        let snapshot = ConfigDocument::parse(
            "[Installation]\nVERSION=0.9\n[User Settings]\nTERMINAL_CMD=alacritty\nDAYS_TO_KEEP=30\nMY_NOTE=keep me\n",
        );
        let r = root();
        let engine = UpgradeEngine::new(&r, &template);
        let mut op = ScriptedOperator::new(Vec::<String>::new());
        let doc = engine.instantiate(Some(&snapshot), &mut op).unwrap();

        assert_eq!(doc.get(keys::TERMINAL_CMD), Some("alacritty"));
        assert_eq!(doc.get(keys::DAYS_TO_KEEP), Some("30"));
        assert_eq!(doc.get(keys::VERSION), Some(schema::RELEASE_VERSION));
        assert_eq!(doc.get("MY_NOTE"), Some("keep me"));
        assert_eq!(doc.section_of("MY_NOTE"), Some(SECTION_USER));
        // keys missing from the snapshot fall back to defaults without asking
        assert!(op.asked.is_empty());
    }

    #[test]
    fn preserved_value_beats_template_literal() {
        let template = Template::new("hindsight.conf", "[User Settings]\nDAYS_TO_KEEP=120\n");
        let snapshot = ConfigDocument::parse("[User Settings]\nDAYS_TO_KEEP=30\nTERMINAL_CMD=alacritty\n");
        let r = root();
        let engine = UpgradeEngine::new(&r, &template);
        let doc = engine
            .instantiate(Some(&snapshot), &mut ScriptedOperator::default())
            .unwrap();
        assert_eq!(doc.get(keys::DAYS_TO_KEEP), Some("30"));
        assert_eq!(doc.get(keys::TERMINAL_CMD), Some("alacritty"));
        assert_eq!(doc.section_of(keys::TERMINAL_CMD), Some(SECTION_USER));
    }

    #[test]
    fn regeneration_keeps_unknown_keys_before_first_header() {
        let template = Template::new("hindsight.conf", "# header\n\n[User Settings]\nDAYS_TO_KEEP=%%DAYS_TO_KEEP%%\n");
        let snapshot = ConfigDocument::parse("MY_ROOT_KEY=precious\n[User Settings]\nDAYS_TO_KEEP=30\n");
        let r = root();
        let engine = UpgradeEngine::new(&r, &template);
        let doc = engine
            .instantiate(Some(&snapshot), &mut ScriptedOperator::default())
            .unwrap();
        assert_eq!(doc.get("MY_ROOT_KEY"), Some("precious"));
        assert_eq!(doc.section_of("MY_ROOT_KEY"), None);
        assert_eq!(
            doc.serialize(),
            "# header\nMY_ROOT_KEY=precious\n\n[User Settings]\nDAYS_TO_KEEP=30\n"
        );
    }

    #[test]
    fn plain_upgrade_stamps_template_release() {
        let template = Template::new("hindsight.conf", "[Installation]\nVERSION=2.0\n");
        let r = root();
        let engine = UpgradeEngine::new(&r, &template);
        let existing = ConfigDocument::parse("[Installation]\nVERSION=1.0\n");
        let outcome = engine
            .run(Some(existing), Path::new("/nonexistent/hindsight.conf"), false, &mut ScriptedOperator::default())
            .unwrap();
        assert_eq!(outcome.document.get(keys::VERSION), Some("2.0"));
        assert_eq!(outcome.previous_version.as_deref(), Some("1.0"));

        let again = engine
            .run(Some(outcome.document), Path::new("/nonexistent/hindsight.conf"), false, &mut ScriptedOperator::default())
            .unwrap();
        assert!(again.previous_version.is_none());
    }

    #[test]
    fn placeholder_version_falls_back_to_build_release() {
        let template = Template::new("hindsight.conf", "[Installation]\nVERSION=%%VERSION%%\n");
        let r = root();
        assert_eq!(UpgradeEngine::new(&r, &template).release_version(), schema::RELEASE_VERSION);
    }

    #[test]
    fn dry_run_regeneration_takes_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hindsight.conf");
        std::fs::write(&path, "[User Settings]\nDAYS_TO_KEEP=30\n").unwrap();
        let existing = ConfigDocument::load(&path).unwrap();

        let template = Template::new("hindsight.conf", "[User Settings]\nDAYS_TO_KEEP=%%DAYS_TO_KEEP%%\n");
        let engine = UpgradeEngine::new(dir.path(), &template).dry_run(true);
        let outcome = engine
            .run(existing, &path, true, &mut ScriptedOperator::default())
            .unwrap();

        assert!(outcome.regenerated);
        assert!(outcome.backup.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn regeneration_resets_non_preserved_keys() {
        let template = Template::new("hindsight.conf", "[API]\nURL=%%URL%%\n");
        let snapshot = ConfigDocument::parse("[API]\nURL=http://10.0.0.2:9000\n");
        let r = root();
        let engine = UpgradeEngine::new(&r, &template);
        let doc = engine
            .instantiate(Some(&snapshot), &mut ScriptedOperator::default())
            .unwrap();
        assert_eq!(doc.get("URL"), Some("http://127.0.0.1:5000"));
    }

    #[test]
    fn run_backs_up_before_regenerating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hindsight.conf");
        std::fs::write(&path, "[User Settings]\nDAYS_TO_KEEP=30\n").unwrap();
        let existing = ConfigDocument::load(&path).unwrap();

        let template = Template::new("hindsight.conf", "[User Settings]\nDAYS_TO_KEEP=%%DAYS_TO_KEEP%%\n");
        let engine = UpgradeEngine::new(dir.path(), &template);
        let outcome = engine
            .run(existing, &path, true, &mut ScriptedOperator::default())
            .unwrap();

        assert!(outcome.regenerated);
        let backup = outcome.backup.unwrap();
        assert_eq!(
            std::fs::read_to_string(backup).unwrap(),
            "[User Settings]\nDAYS_TO_KEEP=30\n"
        );
        assert_eq!(outcome.document.get(keys::DAYS_TO_KEEP), Some("30"));
        assert!(outcome.document.has_section(SECTION_SEARCH));
    }
}
