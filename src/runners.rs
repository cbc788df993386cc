//! Top-level runs behind the three command-line entry points.
//!
//! Each run loads the configuration document once, changes it in memory and
//! writes it once.

use std::path::PathBuf;

use log::info;

use crate::deploy::{ARTIFACTS, DeployReport, HostControl, ServiceDeployer};
use crate::document::ConfigDocument;
use crate::error::Result;
use crate::prompt::Operator;
use crate::requirements::{self, REQUIREMENTS};
use crate::schema;
use crate::settings::Settings;
use crate::template::Template;
use crate::terminal::{self, Selection};
use crate::update::{UpdateCoordinator, UpdateOutcome};
use crate::upgrade::{Injection, UpgradeEngine};
use crate::upstream::Upstream;

/// Looks an executable up on PATH.
pub type PathLookup = fn(&str) -> bool;

pub fn on_path(name: &str) -> bool {
    which::which(name).is_ok()
}

#[derive(Debug, Clone, Copy)]
pub struct ConfigureOptions {
    /// Rewrite an existing document from the template.
    pub force: bool,
    /// Enable and start units after deployment.
    pub start: bool,
    pub dry_run: bool,
    pub lookup: PathLookup,
}

impl Default for ConfigureOptions {
    fn default() -> Self {
        Self {
            force: false,
            start: true,
            dry_run: false,
            lookup: on_path,
        }
    }
}

#[derive(Debug)]
pub struct ConfigureReport {
    pub document_path: PathBuf,
    pub created: bool,
    pub regenerated: bool,
    pub backup: Option<PathBuf>,
    pub injected: Vec<Injection>,
    /// `VERSION` before it was stamped with the current release.
    pub previous_version: Option<String>,
    /// Set when the terminal detector ran.
    pub terminal: Option<Selection>,
    pub deploy: DeployReport,
    /// Stop and start problems.
    pub service_failures: Vec<String>,
    pub dry_run: bool,
}

/// Create or upgrade the document, then redeploy every artifact.
pub fn configure<H: HostControl>(
    settings: &Settings,
    host: &H,
    operator: &mut dyn Operator,
    options: &ConfigureOptions,
) -> Result<ConfigureReport> {
    let missing = requirements::missing_with(REQUIREMENTS, options.lookup);
    requirements::confirm_missing(&missing, operator)?;

    let root = settings.install_root();
    let document_path = settings.document_path();
    let template = Template::load(settings.document_name(), &settings.document_template())?;
    let existing = ConfigDocument::load(&document_path)?;

    let engine = UpgradeEngine::new(&root, &template).dry_run(options.dry_run);
    let outcome = engine.run(existing, &document_path, options.force, operator)?;
    let mut document = outcome.document;

    let terminal = if terminal::needs_detection_with(&document, options.lookup) {
        let candidates = terminal::discover_with(options.lookup);
        let selection = terminal::choose(&candidates, operator)?;
        if let Selection::Chosen(value) = &selection {
            terminal::apply_to_document(&mut document, value);
        }
        Some(selection)
    } else {
        None
    };

    if options.dry_run {
        info!("[dry run] would write {}", document_path.display());
    } else {
        document.save(&document_path)?;
        info!("Wrote {}", document_path.display());
    }

    let values = schema::document_placeholders(&document, &root);
    let template_dir = settings.template_dir();
    let dirs = settings.destinations(host.user_scope());
    let deployer = ServiceDeployer::new(&template_dir, &dirs, host).dry_run(options.dry_run);

    let rendered = deployer.render(&values, ARTIFACTS)?;
    let mut service_failures = deployer.stop_services(ARTIFACTS);
    let deploy = deployer.install(rendered)?;
    if options.start {
        service_failures.extend(deployer.start_services(ARTIFACTS));
    }

    Ok(ConfigureReport {
        document_path,
        created: outcome.created,
        regenerated: outcome.regenerated,
        backup: outcome.backup,
        injected: outcome.injected,
        previous_version: outcome.previous_version,
        terminal,
        deploy,
        service_failures,
        dry_run: options.dry_run,
    })
}

pub async fn update<U: Upstream>(
    settings: &Settings,
    upstream: &U,
    operator: &mut dyn Operator,
) -> Result<UpdateOutcome> {
    let root = settings.install_root();
    UpdateCoordinator::new(&root, settings.document_name(), upstream)
        .run(operator)
        .await
}

pub fn detect_terminal(settings: &Settings, operator: &mut dyn Operator) -> Result<Selection> {
    terminal::run_detector(&settings.document_path(), operator)
}
