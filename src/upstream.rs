//! The canonical remote: a git repository plus the raw template it serves.
//!
//! [`Upstream`] is the seam the update coordinator talks through. The real
//! implementation shells out to `git` and fetches the template over HTTP;
//! tests substitute an in-memory fake.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use log::{debug, info};

use crate::error::{LifecycleError, Result};

const USER_AGENT: &str = concat!("hindsight-setup/", env!("CARGO_PKG_VERSION"));

#[allow(async_fn_in_trait)]
pub trait Upstream {
    /// True when `root` is a working tree of a git repository.
    fn is_repository(&self, root: &Path) -> bool;

    /// Clone the remote at `branch` into `root`, which must not exist.
    fn clone_into(&self, branch: &str, root: &Path) -> Result<()>;

    /// Move the working tree at `root` to the remote head of `branch`,
    /// discarding local changes to tracked files.
    fn pull(&self, branch: &str, root: &Path) -> Result<()>;

    /// Text of the canonical configuration template on `branch`.
    async fn fetch_template(&self, branch: &str) -> Result<String>;
}

pub struct GitUpstream {
    remote_url: String,
    template_url: String,
    client: reqwest::Client,
}

impl GitUpstream {
    /// `template_url` may contain `{branch}`, replaced per request.
    pub fn new(remote_url: &str, template_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| LifecycleError::Network(e.to_string()))?;

        Ok(Self {
            remote_url: remote_url.to_string(),
            template_url: template_url.to_string(),
            client,
        })
    }

    pub fn template_url_for(&self, branch: &str) -> String {
        self.template_url.replace("{branch}", branch)
    }
}

impl Upstream for GitUpstream {
    fn is_repository(&self, root: &Path) -> bool {
        root.join(".git").exists()
    }

    fn clone_into(&self, branch: &str, root: &Path) -> Result<()> {
        info!("Cloning {} ({branch}) into {}", self.remote_url, root.display());
        let mut cmd = Command::new("git");
        cmd.args(["clone", "--branch", branch, &self.remote_url]).arg(root);
        git(cmd, "git clone")
    }

    fn pull(&self, branch: &str, root: &Path) -> Result<()> {
        info!("Pulling {branch} into {}", root.display());
        let mut fetch = Command::new("git");
        fetch.arg("-C").arg(root).args(["fetch", "origin", branch]);
        git(fetch, "git fetch")?;

        let mut reset = Command::new("git");
        reset
            .arg("-C")
            .arg(root)
            .args(["reset", "--hard", &format!("origin/{branch}")]);
        git(reset, "git reset")
    }

    async fn fetch_template(&self, branch: &str) -> Result<String> {
        let url = self.template_url_for(branch);
        debug!("Fetching remote template from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LifecycleError::Network(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(LifecycleError::Network(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| LifecycleError::Network(format!("{url}: {e}")))
    }
}

fn git(mut cmd: Command, label: &str) -> Result<()> {
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
