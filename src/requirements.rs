//! External executables a configured installation relies on.
//!
//! Nothing is installed from here. A configure run only reports what is
//! missing and asks whether to continue when a required tool is absent.

use log::warn;

use crate::error::{LifecycleError, Result};
use crate::prompt::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub executable: &'static str,
    pub purpose: &'static str,
    /// Deployment or updating cannot work without it.
    pub required: bool,
}

const fn req(executable: &'static str, purpose: &'static str, required: bool) -> Requirement {
    Requirement {
        executable,
        purpose,
        required,
    }
}

pub static REQUIREMENTS: &[Requirement] = &[
    req("systemctl", "service manager control", true),
    req("update-desktop-database", "launcher registry refresh", false),
    req("git", "updates", true),
    req("xdotool", "active window tracking", true),
    req("xprop", "window class lookup", true),
    req("maim", "screenshots", true),
    req("tesseract", "OCR", true),
    req("recollindex", "full-text indexing", false),
    req("python3", "the Hindsight services", true),
];

/// Requirements whose executable is not on PATH.
pub fn missing_with(
    requirements: &'static [Requirement],
    is_installed: impl Fn(&str) -> bool,
) -> Vec<&'static Requirement> {
    requirements
        .iter()
        .filter(|r| !is_installed(r.executable))
        .collect()
}

/// Warn about every missing tool and ask for consent to continue when a
/// required one is among them.
pub fn confirm_missing(missing: &[&Requirement], operator: &mut dyn Operator) -> Result<()> {
    for r in missing {
        warn!(
            "{} not found on PATH ({}{})",
            r.executable,
            r.purpose,
            if r.required { ", required" } else { "" }
        );
    }

    let required: Vec<&str> = missing
        .iter()
        .filter(|r| r.required)
        .map(|r| r.executable)
        .collect();
    if required.is_empty() {
        return Ok(());
    }

    let question = format!(
        "Missing required tools: {}. Install them with your package manager. Continue anyway?",
        required.join(", ")
    );
    if operator.confirm(&question, false)? {
        Ok(())
    } else {
        Err(LifecycleError::Declined("dependency check".to_string()))
    }
}
