//! Service-manager and launcher-registry control.
//!
//! [`SystemHost`] drives `systemctl` (with `--user` unless running as root)
//! and `update-desktop-database`. Callers treat every operation here as best
//! effort and only log failures.

use std::path::Path;
use std::process::Command;

use crate::error::{LifecycleError, Result};

pub trait HostControl {
    /// Per-user units rather than system units.
    fn user_scope(&self) -> bool {
        true
    }
    fn stop(&self, unit: &str) -> Result<()>;
    fn enable(&self, unit: &str) -> Result<()>;
    fn start(&self, unit: &str) -> Result<()>;
    /// Make the service manager re-read unit files.
    fn reload_units(&self) -> Result<()>;
    /// Rebuild the launcher registry index for `dir`.
    fn refresh_launchers(&self, dir: &Path) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SystemHost {
    user_scope: bool,
}

impl SystemHost {
    /// User-scope units unless the process runs as root.
    pub fn detect() -> Self {
        Self {
            user_scope: !is_root(),
        }
    }

    fn systemctl(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("systemctl");
        if self.user_scope {
            cmd.arg("--user");
        }
        cmd.args(args);
        cmd
    }

    fn run_systemctl(&self, args: &[&str]) -> Result<()> {
        run(self.systemctl(args), &format!("systemctl {}", args.join(" ")))
    }
}

impl HostControl for SystemHost {
    fn user_scope(&self) -> bool {
        self.user_scope
    }

    fn stop(&self, unit: &str) -> Result<()> {
        self.run_systemctl(&["stop", unit])
    }

    fn enable(&self, unit: &str) -> Result<()> {
        self.run_systemctl(&["enable", unit])
    }

    fn start(&self, unit: &str) -> Result<()> {
        self.run_systemctl(&["start", unit])
    }

    fn reload_units(&self) -> Result<()> {
        self.run_systemctl(&["daemon-reload"])
    }

    fn refresh_launchers(&self, dir: &Path) -> Result<()> {
        let mut cmd = Command::new("update-desktop-database");
        cmd.arg(dir);
        run(cmd, "update-desktop-database")
    }
}

fn run(mut cmd: Command, label: &str) -> Result<()> {
    let output = cmd.output().map_err(|e| LifecycleError::Command {
        command: label.to_string(),
        detail: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(LifecycleError::Command {
            command: label.to_string(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[inline]
fn is_root() -> bool {
    nix::unistd::getuid().is_root()
}
