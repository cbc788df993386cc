//! Error taxonomy for configuration, deployment and update runs.
//!
//! Only fatal conditions are represented here. Classification warnings and
//! best-effort failures (service stop/start, unit reload, launcher refresh)
//! are logged and collected into run reports instead of being returned.

use std::path::PathBuf;

use thiserror::Error;

/// Exit status telling the caller an update was applied and configuration must run again.
pub const EXIT_RECONFIGURE: i32 = 10;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The canonical template (or an artifact template) is missing, so the target schema is unknown.
    #[error("template not found at {}: cannot determine the configuration schema", path.display())]
    Schema { path: PathBuf },

    /// Placeholders survived substitution.
    #[error("unresolved placeholders in {artifact}: {}", names.join(", "))]
    Render { artifact: String, names: Vec<String> },

    /// The remote version could not be obtained.
    #[error("could not retrieve the remote version: {0}")]
    Network(String),

    /// The operator declined a consent prompt.
    #[error("{0} declined by user")]
    Declined(String),

    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external command that the run depends on failed.
    #[error("`{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("invalid settings file {}: {detail}", path.display())]
    Settings { path: PathBuf, detail: String },

    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl LifecycleError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LifecycleError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this error. Declining a prompt is a clean exit.
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::Declined(_) => 0,
            _ => 1,
        }
    }
}

pub type Result<T, E = LifecycleError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declined_exits_cleanly() {
        assert_eq!(LifecycleError::Declined("update".into()).exit_code(), 0);
        assert_eq!(LifecycleError::Network("timeout".into()).exit_code(), 1);
    }

    #[test]
    fn render_error_lists_names() {
        let err = LifecycleError::Render {
            artifact: "hindsight-api.service".into(),
            names: vec!["APP_PATH".into(), "VENV_PATH".into()],
        };
        assert_eq!(
            err.to_string(),
            "unresolved placeholders in hindsight-api.service: APP_PATH, VENV_PATH"
        );
    }
}
