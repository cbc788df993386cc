//! Update coordination against the canonical remote.
//!
//! The coordinator moves through three states: [`UpdateState::NonVersioned`]
//! (the install root is not a git working tree yet), [`UpdateState::UpToDate`]
//! and [`UpdateState::UpdateAvailable`]. Consent is asked before converting
//! the root and before applying an update. When the remote version cannot be
//! determined the run fails without touching anything on disk.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::document::ConfigDocument;
use crate::error::{LifecycleError, Result};
use crate::file_ops::{backup_file, backup_path, backup_timestamp};
use crate::prompt::Operator;
use crate::schema::{SECTION_USER, keys, recognized_key, user_owned_keys};
use crate::upstream::Upstream;
use crate::version::DottedVersion;

/// Version assumed for a document without a `VERSION` key.
const UNVERSIONED: &str = "0";
const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateState {
    NonVersioned,
    UpToDate { local: String, remote: String },
    UpdateAvailable { local: String, remote: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The operator said no. Nothing was changed by the declined step.
    Declined,
    UpToDate { local: String, remote: String },
    /// A new baseline was pulled; configuration must run again.
    Applied { from: String, to: String },
}

pub struct UpdateCoordinator<'a, U: Upstream> {
    root: &'a Path,
    document_name: &'a str,
    upstream: &'a U,
}

impl<'a, U: Upstream> UpdateCoordinator<'a, U> {
    pub fn new(root: &'a Path, document_name: &'a str, upstream: &'a U) -> Self {
        Self {
            root,
            document_name,
            upstream,
        }
    }

    fn document_path(&self) -> PathBuf {
        self.root.join(self.document_name)
    }

    fn load_document(&self) -> Result<ConfigDocument> {
        Ok(ConfigDocument::load(&self.document_path())?.unwrap_or_default())
    }

    /// Current state. Reaching the remote is required unless the root is
    /// not versioned yet.
    pub async fn state(&self, document: &ConfigDocument) -> Result<UpdateState> {
        if !self.upstream.is_repository(self.root) {
            return Ok(UpdateState::NonVersioned);
        }

        let local = local_version(document);
        let remote = self.remote_version(&branch(document)).await?;

        if DottedVersion::parse(&remote) > DottedVersion::parse(&local) {
            Ok(UpdateState::UpdateAvailable { local, remote })
        } else {
            Ok(UpdateState::UpToDate { local, remote })
        }
    }

    async fn remote_version(&self, branch: &str) -> Result<String> {
        let text = self.upstream.fetch_template(branch).await?;
        let remote = ConfigDocument::parse(&text);
        match remote.get(keys::VERSION).map(str::trim) {
            Some(v) if !v.is_empty() && !v.contains("%%") => Ok(v.to_string()),
            _ => Err(LifecycleError::Network(
                "remote template carries no VERSION".to_string(),
            )),
        }
    }

    pub async fn run(&self, operator: &mut dyn Operator) -> Result<UpdateOutcome> {
        let mut document = self.load_document()?;
        let mut state = self.state(&document).await?;

        if state == UpdateState::NonVersioned {
            let question = format!(
                "{} is not under version control. Back it up and replace it with a fresh clone?",
                self.root.display()
            );
            if !operator.confirm(&question, false)? {
                info!("Version-control conversion declined");
                return Ok(UpdateOutcome::Declined);
            }
            self.convert(&branch(&document))?;
            document = self.load_document()?;
            state = self.state(&document).await?;
        }

        let (local, remote) = match state {
            UpdateState::UpdateAvailable { local, remote } => (local, remote),
            UpdateState::UpToDate { local, remote } => {
                info!("Up to date (local {local}, remote {remote})");
                return Ok(UpdateOutcome::UpToDate { local, remote });
            }
            UpdateState::NonVersioned => {
                return Err(LifecycleError::Command {
                    command: "git clone".to_string(),
                    detail: format!("{} is still not a repository", self.root.display()),
                });
            }
        };

        let question = format!("Hindsight {remote} is available (installed {local}). Update now?");
        if !operator.confirm(&question, true)? {
            info!("Update declined");
            return Ok(UpdateOutcome::Declined);
        }

        self.apply(&document)?;
        Ok(UpdateOutcome::Applied {
            from: local,
            to: remote,
        })
    }

    /// Back up the root, clone in its place and restore the previous
    /// configuration document. The backup is moved back if cloning fails.
    fn convert(&self, branch: &str) -> Result<()> {
        let backup = backup_path(self.root, &backup_timestamp());
        let root_exists = self.root.exists();

        if root_exists {
            fs::rename(self.root, &backup)
                .map_err(|e| LifecycleError::io("failed to back up", self.root, e))?;
            info!("Moved {} to {}", self.root.display(), backup.display());
        }

        if let Err(e) = self.upstream.clone_into(branch, self.root) {
            if root_exists {
                if self.root.exists()
                    && let Err(cleanup) = fs::remove_dir_all(self.root)
                {
                    warn!("Could not remove partial clone at {}: {cleanup}", self.root.display());
                }
                fs::rename(&backup, self.root)
                    .map_err(|e| LifecycleError::io("failed to restore backup", &backup, e))?;
                warn!("Clone failed, restored {}", self.root.display());
            }
            return Err(e);
        }

        let previous = backup.join(self.document_name);
        if root_exists && previous.is_file() {
            let target = self.document_path();
            fs::copy(&previous, &target)
                .map_err(|e| LifecycleError::io("failed to restore", &target, e))?;
            info!("Restored {} from backup", target.display());
        }
        Ok(())
    }

    /// Pull the new baseline and reassert the user-owned values captured
    /// from `document`.
    fn apply(&self, document: &ConfigDocument) -> Result<()> {
        let captured: Vec<(&'static str, String)> = user_owned_keys()
            .filter_map(|k| document.get(k.key).map(|v| (k.key, v.to_string())))
            .collect();

        let path = self.document_path();
        if path.exists() {
            backup_file(&path)?;
        }

        self.upstream.pull(&branch(document), self.root)?;

        let mut pulled = self.load_document()?;
        for (key, value) in &captured {
            if pulled.set(key, value).is_err() {
                let section = recognized_key(key).map_or(SECTION_USER, |k| k.section);
                pulled.append_to_section(section, key, value);
            }
        }
        pulled.save(&path)?;
        info!("Reasserted {} user setting(s) into {}", captured.len(), path.display());
        Ok(())
    }
}

fn local_version(document: &ConfigDocument) -> String {
    match document.get(keys::VERSION).map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNVERSIONED.to_string(),
    }
}

fn branch(document: &ConfigDocument) -> String {
    match document.get(keys::GIT_BRANCH).map(str::trim) {
        Some(b) if !b.is_empty() => b.to_string(),
        _ => DEFAULT_BRANCH.to_string(),
    }
}
