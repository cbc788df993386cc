//! Configuration lifecycle for a Hindsight installation.
//!
//! Creates and upgrades the `hindsight.conf` document from its template,
//! renders and installs the service units and launcher definitions that
//! depend on it, picks the terminal emulator, and pulls new releases from
//! the canonical repository.

pub mod cli;
pub mod console;
pub mod deploy;
pub mod document;
pub mod error;
pub mod file_ops;
pub mod prompt;
pub mod requirements;
pub mod runners;
pub mod schema;
pub mod settings;
pub mod template;
pub mod terminal;
pub mod update;
pub mod upgrade;
pub mod upstream;
pub mod version;

pub use document::ConfigDocument;
pub use error::{EXIT_RECONFIGURE, LifecycleError, Result};
pub use settings::Settings;
pub use template::{Placeholders, Template};
