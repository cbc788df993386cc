use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use hindsight_setup::cli::{Args, Cmd};
use hindsight_setup::deploy::SystemHost;
use hindsight_setup::prompt::TerminalOperator;
use hindsight_setup::runners::{self, ConfigureOptions};
use hindsight_setup::update::UpdateOutcome;
use hindsight_setup::upstream::GitUpstream;
use hindsight_setup::{EXIT_RECONFIGURE, LifecycleError, Settings, console};

fn main() {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    match rt.block_on(real_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let code = e
                .downcast_ref::<LifecycleError>()
                .map_or(1, LifecycleError::exit_code);
            if code == 0 {
                log::info!("{e:#}");
            } else {
                error!("{e:#}");
            }
            std::process::exit(code);
        }
    }
}

async fn real_main(args: Args) -> Result<i32> {
    let settings = Settings::load(args.settings.as_deref())
        .context("Failed to load settings")?
        .with_root(args.root);
    let mut operator = TerminalOperator;

    match args.sub {
        Cmd::Configure {
            force,
            no_start,
            dry_run,
        } => {
            console::banner("H I N D S I G H T   ·   configure");
            let host = SystemHost::detect();
            let options = ConfigureOptions {
                force,
                start: !no_start,
                dry_run,
                ..Default::default()
            };
            let report = runners::configure(&settings, &host, &mut operator, &options)?;
            console::configure_summary(&report);
            Ok(0)
        }
        Cmd::Update => {
            let upstream = GitUpstream::new(
                settings.remote_url(),
                settings.template_url(),
                settings.http_timeout(),
            )?;
            let outcome = runners::update(&settings, &upstream, &mut operator).await?;
            console::update_summary(&outcome);
            Ok(match outcome {
                UpdateOutcome::Applied { .. } => EXIT_RECONFIGURE,
                UpdateOutcome::Declined | UpdateOutcome::UpToDate { .. } => 0,
            })
        }
        Cmd::DetectTerminal => {
            let selection = runners::detect_terminal(&settings, &mut operator)?;
            console::terminal_summary(&selection);
            Ok(0)
        }
    }
}
