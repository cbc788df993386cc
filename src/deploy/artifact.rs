//! Deployment artifacts and where they go.

use std::path::{Path, PathBuf};

/// The launcher definition that is installed into the autostart directory.
pub const AUTOSTART_ARTIFACT: &str = "hindsight-autostart.desktop";

const LAUNCHER_SUFFIX: &str = ".desktop";
const UNIT_SUFFIXES: [&str; 2] = [".service", ".timer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Service-manager unit directory.
    Units,
    /// Launcher registry (application menu).
    Launchers,
    Autostart,
}

/// Destination class for an artifact name. First matching rule wins; the
/// designated autostart name is checked before the generic launcher suffix.
pub fn classify(name: &str) -> Option<Destination> {
    if name == AUTOSTART_ARTIFACT {
        Some(Destination::Autostart)
    } else if name.ends_with(LAUNCHER_SUFFIX) {
        Some(Destination::Launchers)
    } else if UNIT_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        Some(Destination::Units)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub name: &'static str,
    /// Enabled and started once deployed. Units driven by a timer are not.
    pub activate: bool,
}

impl ArtifactSpec {
    pub fn template_file(&self) -> String {
        format!("{}.template", self.name)
    }

    pub fn is_unit(&self) -> bool {
        classify(self.name) == Some(Destination::Units)
    }
}

const fn artifact(name: &'static str, activate: bool) -> ArtifactSpec {
    ArtifactSpec { name, activate }
}

/// Everything a configuration run renders, in deployment order.
pub static ARTIFACTS: &[ArtifactSpec] = &[
    artifact("hindsight-api.service", true),
    artifact("hindsight-daemon.service", true),
    artifact("hindsight-rebuild.service", false),
    artifact("hindsight-rebuild.timer", true),
    artifact("hindsight-cleanup.service", false),
    artifact("hindsight-cleanup.timer", true),
    artifact("hindsight-manager.desktop", false),
    artifact(AUTOSTART_ARTIFACT, false),
];

/// Unit names known to the service manager, in stop order.
pub fn known_units(artifacts: &[ArtifactSpec]) -> impl Iterator<Item = &'static str> + '_ {
    artifacts.iter().filter(|a| a.is_unit()).map(|a| a.name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDirs {
    pub units: PathBuf,
    pub launchers: PathBuf,
    pub autostart: PathBuf,
}

impl DestinationDirs {
    pub fn dir(&self, destination: Destination) -> &Path {
        match destination {
            Destination::Units => &self.units,
            Destination::Launchers => &self.launchers,
            Destination::Autostart => &self.autostart,
        }
    }
}
