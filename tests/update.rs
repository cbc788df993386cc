mod common;

use std::cell::Cell;
use std::path::Path;

use common::Sandbox;
use hindsight_setup::error::{LifecycleError, Result};
use hindsight_setup::prompt::ScriptedOperator;
use hindsight_setup::runners;
use hindsight_setup::update::UpdateOutcome;
use hindsight_setup::upstream::Upstream;

const DOCUMENT: &str = "\
# tuned by hand
[Installation]
VERSION=1.4

[User Settings]
DAYS_TO_KEEP=30
EXCLUDED_APPS=keepassxc,signal
";

/// A remote that is never reachable.
struct Offline {
    mutations: Cell<usize>,
}

impl Upstream for Offline {
    fn is_repository(&self, _root: &Path) -> bool {
        true
    }
    fn clone_into(&self, _branch: &str, _root: &Path) -> Result<()> {
        self.mutations.set(self.mutations.get() + 1);
        Ok(())
    }
    fn pull(&self, _branch: &str, _root: &Path) -> Result<()> {
        self.mutations.set(self.mutations.get() + 1);
        Ok(())
    }
    async fn fetch_template(&self, _branch: &str) -> Result<String> {
        Err(LifecycleError::Network("dns error: failed to lookup address".into()))
    }
}

/// A remote that serves a fixed template and rewrites the document on pull.
struct Release {
    template: &'static str,
    baseline: &'static str,
}

impl Upstream for Release {
    fn is_repository(&self, _root: &Path) -> bool {
        true
    }
    fn clone_into(&self, _branch: &str, _root: &Path) -> Result<()> {
        unreachable!("already a repository")
    }
    fn pull(&self, _branch: &str, root: &Path) -> Result<()> {
        std::fs::write(root.join("hindsight.conf"), self.baseline).unwrap();
        Ok(())
    }
    async fn fetch_template(&self, _branch: &str) -> Result<String> {
        Ok(self.template.to_string())
    }
}

#[tokio::test]
async fn unreachable_remote_fails_without_touching_anything() {
    let sandbox = Sandbox::new();
    sandbox.write_document(DOCUMENT);
    let upstream = Offline { mutations: Cell::new(0) };
    let mut op = ScriptedOperator::default();

    let err = runners::update(&sandbox.settings, &upstream, &mut op).await.unwrap_err();

    assert!(matches!(err, LifecycleError::Network(_)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(sandbox.read_document(), DOCUMENT);
    assert_eq!(upstream.mutations.get(), 0);
    assert_eq!(
        std::fs::read_dir(sandbox.settings.install_root()).unwrap().count(),
        1,
        "no backup expected"
    );
}

#[tokio::test]
async fn newer_release_is_applied_and_user_values_survive() {
    let sandbox = Sandbox::new();
    sandbox.write_document(DOCUMENT);
    let upstream = Release {
        template: "[Installation]\nVERSION=1.10\n",
        baseline: "[Installation]\nVERSION=1.10\n\n[User Settings]\nDAYS_TO_KEEP=90\nEXCLUDED_APPS=keepassxc\n",
    };

    let outcome = runners::update(&sandbox.settings, &upstream, &mut ScriptedOperator::new(["y"]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Applied {
            from: "1.4".into(),
            to: "1.10".into()
        }
    );
    let text = sandbox.read_document();
    assert!(text.contains("VERSION=1.10\n"));
    assert!(text.contains("DAYS_TO_KEEP=30\n"));
    assert!(text.contains("EXCLUDED_APPS=keepassxc,signal\n"));
}

const SHIPPED_TEMPLATE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/templates/hindsight.conf.template"
));

#[test]
fn shipped_template_carries_this_release() {
    let doc = hindsight_setup::ConfigDocument::parse(SHIPPED_TEMPLATE);
    assert_eq!(doc.get("VERSION"), Some(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn shipped_template_as_remote_offers_an_update() {
    let sandbox = Sandbox::new();
    sandbox.write_document("[Installation]\nVERSION=0.1\n");
    let upstream = Release {
        template: SHIPPED_TEMPLATE,
        baseline: SHIPPED_TEMPLATE,
    };
    let mut op = ScriptedOperator::new(["n"]);

    let outcome = runners::update(&sandbox.settings, &upstream, &mut op).await.unwrap();

    assert_eq!(outcome, UpdateOutcome::Declined);
    assert_eq!(op.asked.len(), 1);
}

#[tokio::test]
async fn configured_document_is_up_to_date_with_shipped_template() {
    let sandbox = Sandbox::new();
    sandbox.write_document("[User Settings]\nTERMINAL_CMD=kitty\n");
    runners::configure(
        &sandbox.settings,
        &common::RecordingHost::default(),
        &mut ScriptedOperator::default(),
        &runners::ConfigureOptions {
            lookup: common::only_kitty,
            ..Default::default()
        },
    )
    .unwrap();
    let upstream = Release {
        template: SHIPPED_TEMPLATE,
        baseline: SHIPPED_TEMPLATE,
    };

    let outcome = runners::update(&sandbox.settings, &upstream, &mut ScriptedOperator::default())
        .await
        .unwrap();

    assert!(matches!(outcome, UpdateOutcome::UpToDate { .. }));
}

#[tokio::test]
async fn lexically_smaller_but_newer_version_is_not_up_to_date() {
    let sandbox = Sandbox::new();
    sandbox.write_document("[Installation]\nVERSION=9.0\n");
    let upstream = Release {
        template: "VERSION=10.0\n",
        baseline: "[Installation]\nVERSION=10.0\n",
    };

    let outcome = runners::update(&sandbox.settings, &upstream, &mut ScriptedOperator::new(["n"]))
        .await
        .unwrap();

    assert_eq!(outcome, UpdateOutcome::Declined);
    assert_eq!(sandbox.read_document(), "[Installation]\nVERSION=9.0\n");
}
