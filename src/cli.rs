use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Hindsight configuration lifecycle manager")]
pub struct Args {
    /// Settings file for this tool (default: ~/.config/hindsight/setup.toml)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Installation root, overriding the settings file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create or upgrade hindsight.conf and redeploy services and launchers
    Configure {
        /// Regenerate the document from the template, keeping user values
        #[arg(long)]
        force: bool,

        /// Do not enable or start services afterwards
        #[arg(long)]
        no_start: bool,

        /// Show what would be written without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Check the remote for a newer release (Exit 0 = nothing to do, 1 = failed, 10 = updated, re-run configure)
    Update,
    /// Choose the terminal emulator Hindsight opens
    DetectTerminal,
}
