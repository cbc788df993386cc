//! Render service units and launcher definitions and install them.
//!
//! # Module Structure
//!
//! - `artifact` - the fixed artifact list and the name-based destination rule
//! - `host` - service manager and launcher registry control
//!
//! A deployment pass renders every artifact first, so an unresolved
//! placeholder aborts the run before any service is stopped or any file is
//! installed. Each file is
//! then written through a temporary file and an atomic rename. Stopping,
//! starting and reloading are best effort: failures are logged and returned
//! in the [`DeployReport`].

mod artifact;
mod host;

use std::path::{Path, PathBuf};

use log::{info, warn};

pub use artifact::{
    ARTIFACTS, AUTOSTART_ARTIFACT, ArtifactSpec, Destination, DestinationDirs, classify, known_units,
};
pub use host::{HostControl, SystemHost};

use crate::error::Result;
use crate::file_ops::write_file_atomic;
use crate::template::{Placeholders, Template};

const ARTIFACT_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedArtifact {
    pub name: String,
    pub destination: Destination,
    pub path: PathBuf,
}

#[derive(Debug, Default)]
pub struct DeployReport {
    pub deployed: Vec<DeployedArtifact>,
    /// Artifacts with no destination rule.
    pub skipped: Vec<String>,
    /// Best-effort steps that failed.
    pub failures: Vec<String>,
}

/// Artifact bodies ready to install. Produced by [`ServiceDeployer::render`].
#[derive(Debug, Default)]
pub struct RenderedArtifacts {
    artifacts: Vec<(String, Destination, String)>,
    skipped: Vec<String>,
}

pub struct ServiceDeployer<'a, H: HostControl> {
    template_dir: &'a Path,
    dirs: &'a DestinationDirs,
    host: &'a H,
    dry_run: bool,
}

impl<'a, H: HostControl> ServiceDeployer<'a, H> {
    pub fn new(template_dir: &'a Path, dirs: &'a DestinationDirs, host: &'a H) -> Self {
        Self {
            template_dir,
            dirs,
            host,
            dry_run: false,
        }
    }

    /// Render and classify, but neither write files nor touch services.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Stop every known unit. Units that are missing or already stopped are
    /// normal here, so failures are only collected.
    pub fn stop_services(&self, artifacts: &[ArtifactSpec]) -> Vec<String> {
        let mut failures = Vec::new();
        if self.dry_run {
            return failures;
        }
        for unit in known_units(artifacts) {
            if let Err(e) = self.host.stop(unit) {
                warn!("Could not stop {unit}: {e}");
                failures.push(format!("stop {unit}: {e}"));
            }
        }
        failures
    }

    /// Render and install `artifacts`, then reload the unit cache and the
    /// launcher index.
    pub fn deploy(&self, values: &Placeholders, artifacts: &[ArtifactSpec]) -> Result<DeployReport> {
        let rendered = self.render(values, artifacts)?;
        self.install(rendered)
    }

    /// Classify and render every artifact without touching the host.
    pub fn render(&self, values: &Placeholders, artifacts: &[ArtifactSpec]) -> Result<RenderedArtifacts> {
        let mut rendered = RenderedArtifacts::default();

        for spec in artifacts {
            let Some(destination) = classify(spec.name) else {
                warn!("{} matches no destination rule, skipping", spec.name);
                rendered.skipped.push(spec.name.to_string());
                continue;
            };
            let template = Template::load(spec.name, &self.template_dir.join(spec.template_file()))?;
            let body = template.render(values)?;
            rendered.artifacts.push((spec.name.to_string(), destination, body));
        }
        Ok(rendered)
    }

    /// Write rendered artifacts to their destinations, then reload the unit
    /// cache and the launcher index.
    pub fn install(&self, rendered: RenderedArtifacts) -> Result<DeployReport> {
        let mut report = DeployReport {
            skipped: rendered.skipped,
            ..Default::default()
        };

        for (name, destination, body) in rendered.artifacts {
            let path = self.dirs.dir(destination).join(&name);
            if self.dry_run {
                info!("[dry run] would install {name} to {}", path.display());
            } else {
                write_file_atomic(&path, &body, Some(ARTIFACT_MODE))?;
                info!("Installed {name} to {}", path.display());
            }
            report.deployed.push(DeployedArtifact {
                name,
                destination,
                path,
            });
        }

        if !self.dry_run {
            self.refresh(&mut report);
        }
        Ok(report)
    }

    fn refresh(&self, report: &mut DeployReport) {
        if let Err(e) = self.host.reload_units() {
            warn!("Unit reload failed: {e}");
            report.failures.push(format!("reload units: {e}"));
        }

        let launcher_touched = report
            .deployed
            .iter()
            .any(|a| a.destination == Destination::Launchers);
        if launcher_touched && let Err(e) = self.host.refresh_launchers(&self.dirs.launchers) {
            warn!("Launcher index refresh failed: {e}");
            report.failures.push(format!("refresh launchers: {e}"));
        }
    }

    /// Enable and start the artifacts flagged for activation.
    pub fn start_services(&self, artifacts: &[ArtifactSpec]) -> Vec<String> {
        let mut failures = Vec::new();
        if self.dry_run {
            return failures;
        }
        for spec in artifacts.iter().filter(|a| a.activate && a.is_unit()) {
            let result = self
                .host
                .enable(spec.name)
                .and_then(|()| self.host.start(spec.name));
            match result {
                Ok(()) => info!("Started {}", spec.name),
                Err(e) => {
                    warn!("Could not start {}: {e}", spec.name);
                    failures.push(format!("start {}: {e}", spec.name));
                }
            }
        }
        failures
    }
}
