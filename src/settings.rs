use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::deploy::DestinationDirs;
use crate::error::{LifecycleError, Result};
use crate::file_ops::read_optional;

const DEFAULT_DOCUMENT: &str = "hindsight.conf";
const DEFAULT_REMOTE: &str = "https://github.com/hindsight-app/hindsight.git";
const DEFAULT_TEMPLATE_URL: &str =
    "https://raw.githubusercontent.com/hindsight-app/hindsight/{branch}/templates/hindsight.conf.template";
const SYSTEM_UNIT_DIR: &str = "/etc/systemd/system";

fn default_timeout() -> u64 {
    30
}

/// Settings for the setup tool itself (not the Hindsight configuration
/// document). Every field is optional on disk; unset paths are derived from
/// the invoking user's home directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub install_root: Option<PathBuf>,
    pub document_name: Option<String>,
    /// Defaults to `<install_root>/templates`.
    pub template_dir: Option<PathBuf>,
    pub unit_dir: Option<PathBuf>,
    pub launcher_dir: Option<PathBuf>,
    pub autostart_dir: Option<PathBuf>,
    pub remote_url: Option<String>,
    /// Raw URL of the canonical template; `{branch}` is substituted.
    pub template_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            install_root: None,
            document_name: None,
            template_dir: None,
            unit_dir: None,
            launcher_dir: None,
            autostart_dir: None,
            remote_url: None,
            template_url: None,
            http_timeout_secs: default_timeout(),
        }
    }
}

impl Settings {
    /// `$XDG_CONFIG_HOME/hindsight/setup.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hindsight").join("setup.toml"))
    }

    /// Load from `explicit`, or from the default location. A missing file
    /// yields defaults; a malformed one is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        match read_optional(&path)? {
            Some(text) => Self::parse(&text, &path),
            None if explicit.is_some() => Err(LifecycleError::Settings {
                path,
                detail: "file does not exist".to_string(),
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| LifecycleError::Settings {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        if root.is_some() {
            self.install_root = root;
        }
        self
    }

    pub fn install_root(&self) -> PathBuf {
        self.install_root
            .clone()
            .unwrap_or_else(|| home().join("hindsight"))
    }

    pub fn document_name(&self) -> &str {
        self.document_name.as_deref().unwrap_or(DEFAULT_DOCUMENT)
    }

    pub fn document_path(&self) -> PathBuf {
        self.install_root().join(self.document_name())
    }

    pub fn template_dir(&self) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(|| self.install_root().join("templates"))
    }

    /// The canonical configuration template.
    pub fn document_template(&self) -> PathBuf {
        self.template_dir()
            .join(format!("{}.template", self.document_name()))
    }

    pub fn remote_url(&self) -> &str {
        self.remote_url.as_deref().unwrap_or(DEFAULT_REMOTE)
    }

    pub fn template_url(&self) -> &str {
        self.template_url.as_deref().unwrap_or(DEFAULT_TEMPLATE_URL)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }

    /// Destination directories; `user_scope` picks the per-user unit
    /// directory over the system one.
    pub fn destinations(&self, user_scope: bool) -> DestinationDirs {
        let units = self.unit_dir.clone().unwrap_or_else(|| {
            if user_scope {
                config_home().join("systemd").join("user")
            } else {
                PathBuf::from(SYSTEM_UNIT_DIR)
            }
        });
        DestinationDirs {
            units,
            launchers: self.launcher_dir.clone().unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| home().join(".local").join("share"))
                    .join("applications")
            }),
            autostart: self
                .autostart_dir
                .clone()
                .unwrap_or_else(|| config_home().join("autostart")),
        }
    }
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"))
}

fn config_home() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| home().join(".config"))
}
