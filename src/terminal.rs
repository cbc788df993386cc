//! Pick the terminal emulator stored in `TERMINAL_CMD`.
//!
//! One installed candidate is taken as is, several are offered as a menu,
//! and with none the operator may type a command. An empty answer leaves
//! the key alone; it is never written as an empty value.

use std::path::Path;

use log::{info, warn};

use crate::document::{ConfigDocument, replace_key_line};
use crate::error::{LifecycleError, Result};
use crate::file_ops::{read_optional, write_file_atomic};
use crate::prompt::Operator;
use crate::schema::{SECTION_USER, keys};

/// Terminal launchers looked up on PATH, in menu order.
pub const KNOWN_TERMINALS: &[&str] = &[
    "konsole",
    "gnome-terminal",
    "xfce4-terminal",
    "mate-terminal",
    "tilix",
    "terminator",
    "alacritty",
    "kitty",
    "wezterm",
    "foot",
    "xterm",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(String),
    /// Nothing usable was entered; `TERMINAL_CMD` stays as it is.
    Skipped,
}

/// Known terminals present on PATH.
pub fn discover() -> Vec<String> {
    discover_with(|name| which::which(name).is_ok())
}

pub fn discover_with(is_installed: impl Fn(&str) -> bool) -> Vec<String> {
    KNOWN_TERMINALS
        .iter()
        .filter(|name| is_installed(name))
        .map(|name| name.to_string())
        .collect()
}

pub fn choose(candidates: &[String], operator: &mut dyn Operator) -> Result<Selection> {
    match candidates {
        [only] => {
            info!("Found one terminal, using {only}");
            Ok(Selection::Chosen(only.clone()))
        }
        [] => {
            let answer = operator.text(
                "No supported terminal was found. Enter the command that opens your terminal:",
                None,
            )?;
            let answer = answer.trim();
            if answer.is_empty() {
                warn!("No terminal entered; {} left unchanged", keys::TERMINAL_CMD);
                Ok(Selection::Skipped)
            } else {
                Ok(Selection::Chosen(answer.to_string()))
            }
        }
        many => {
            let picked = operator.select("Several terminals are installed. Which one should Hindsight use?", many)?;
            Ok(Selection::Chosen(picked))
        }
    }
}

/// True when `TERMINAL_CMD` is empty or its program is not on PATH.
pub fn needs_detection(doc: &ConfigDocument) -> bool {
    needs_detection_with(doc, |name| which::which(name).is_ok())
}

pub fn needs_detection_with(doc: &ConfigDocument, is_installed: impl Fn(&str) -> bool) -> bool {
    match doc
        .get(keys::TERMINAL_CMD)
        .and_then(|cmd| cmd.split_whitespace().next())
    {
        Some(program) => !is_installed(program),
        None => true,
    }
}

/// Store the selection in an in-memory document.
pub fn apply_to_document(doc: &mut ConfigDocument, value: &str) {
    if doc.set(keys::TERMINAL_CMD, value).is_err() {
        doc.append_to_section(SECTION_USER, keys::TERMINAL_CMD, value);
    }
}

/// Store the selection directly in the file at `path` by replacing the
/// `TERMINAL_CMD` line. Every other byte of the file is kept.
pub fn apply_to_file(path: &Path, value: &str) -> Result<()> {
    let text = read_optional(path)?.ok_or_else(|| {
        LifecycleError::io(
            "configuration not found, run `configure` first:",
            path,
            std::io::Error::from(std::io::ErrorKind::NotFound),
        )
    })?;

    let updated = match replace_key_line(&text, keys::TERMINAL_CMD, value) {
        Some(updated) => updated,
        None => {
            let mut doc = ConfigDocument::parse(&text);
            doc.append_to_section(SECTION_USER, keys::TERMINAL_CMD, value);
            doc.serialize()
        }
    };

    if updated != text {
        write_file_atomic(path, &updated, None)?;
    }
    info!("{} set to {value}", keys::TERMINAL_CMD);
    Ok(())
}

/// Full detector run against the file at `path`.
pub fn run_detector(path: &Path, operator: &mut dyn Operator) -> Result<Selection> {
    let selection = choose(&discover(), operator)?;
    if let Selection::Chosen(value) = &selection {
        apply_to_file(path, value)?;
    }
    Ok(selection)
}
