#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use hindsight_setup::Settings;
use hindsight_setup::deploy::HostControl;
use hindsight_setup::error::Result;
use hindsight_setup::terminal::KNOWN_TERMINALS;
use tempfile::TempDir;

/// Records every host call instead of running systemctl.
#[derive(Default)]
pub struct RecordingHost {
    pub calls: RefCell<Vec<String>>,
}

impl RecordingHost {
    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl HostControl for RecordingHost {
    fn stop(&self, unit: &str) -> Result<()> {
        self.record(format!("stop {unit}"));
        Ok(())
    }
    fn enable(&self, unit: &str) -> Result<()> {
        self.record(format!("enable {unit}"));
        Ok(())
    }
    fn start(&self, unit: &str) -> Result<()> {
        self.record(format!("start {unit}"));
        Ok(())
    }
    fn reload_units(&self) -> Result<()> {
        self.record("daemon-reload".to_string());
        Ok(())
    }
    fn refresh_launchers(&self, dir: &Path) -> Result<()> {
        self.record(format!("refresh {}", dir.display()));
        Ok(())
    }
}

/// Templates shipped with the crate.
pub fn shipped_templates() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

/// An install root plus destination directories, all inside one temp dir.
pub struct Sandbox {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_templates(&shipped_templates())
    }

    pub fn with_templates(templates: &Path) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        let settings = Settings {
            install_root: Some(base.join("hindsight")),
            template_dir: Some(templates.to_path_buf()),
            unit_dir: Some(base.join("systemd/user")),
            launcher_dir: Some(base.join("applications")),
            autostart_dir: Some(base.join("autostart")),
            ..Default::default()
        };
        std::fs::create_dir_all(base.join("hindsight")).unwrap();
        Self { dir, settings }
    }

    pub fn document_path(&self) -> PathBuf {
        self.settings.document_path()
    }

    pub fn write_document(&self, body: &str) {
        std::fs::write(self.document_path(), body).unwrap();
    }

    pub fn read_document(&self) -> String {
        std::fs::read_to_string(self.document_path()).unwrap()
    }

    pub fn unit(&self, name: &str) -> PathBuf {
        self.dir.path().join("systemd/user").join(name)
    }
}

/// Every requirement is present and kitty is the only terminal.
pub fn only_kitty(name: &str) -> bool {
    !KNOWN_TERMINALS.contains(&name) || name == "kitty"
}

/// Every requirement and every known terminal is present.
pub fn everything(_name: &str) -> bool {
    true
}
