//! Coloured status output on stdout. Diagnostics go through `log` instead.

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::runners::ConfigureReport;
use crate::terminal::Selection;
use crate::update::UpdateOutcome;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}

fn line(out: &mut StandardStream, color: Option<Color>, bold: bool, text: &str) {
    let _ = out.set_color(ColorSpec::new().set_fg(color).set_bold(bold));
    let _ = writeln!(out, "{text}");
    let _ = out.reset();
}

pub fn banner(title: &str) {
    let mut out = stdout();
    line(&mut out, Some(Color::Cyan), false, &format!("\n{RULE}"));
    line(&mut out, Some(Color::Cyan), true, &format!("  {title}"));
    line(&mut out, Some(Color::Cyan), false, &format!("{RULE}\n"));
}

pub fn configure_summary(report: &ConfigureReport) {
    let mut out = stdout();

    let heading = if report.dry_run {
        "DRY RUN COMPLETE (nothing written)"
    } else {
        "✓ CONFIGURATION COMPLETE"
    };
    line(&mut out, Some(Color::Green), true, &format!("\n  {heading}\n"));

    let document = if report.created {
        "created"
    } else if report.regenerated {
        "regenerated"
    } else {
        "upgraded"
    };
    let _ = writeln!(out, "Document {document}: {}", report.document_path.display());
    if let Some(backup) = &report.backup {
        let _ = writeln!(out, "  previous version saved as {}", backup.display());
    }
    if !report.injected.is_empty() {
        let _ = writeln!(out, "  {} missing key(s) added", report.injected.len());
    }
    if let Some(previous) = &report.previous_version {
        let _ = writeln!(out, "  VERSION updated from {previous}");
    }
    if let Some(Selection::Chosen(cmd)) = &report.terminal {
        let _ = writeln!(out, "  terminal: {cmd}");
    }

    let _ = writeln!(out, "\nArtifacts:");
    for a in &report.deploy.deployed {
        line(
            &mut out,
            Some(Color::Green),
            false,
            &format!("  ✓ {} → {}", a.name, a.path.display()),
        );
    }
    for name in &report.deploy.skipped {
        line(
            &mut out,
            Some(Color::Yellow),
            false,
            &format!("  ⚠ {name} skipped (no destination)"),
        );
    }

    let failures: Vec<&String> = report
        .service_failures
        .iter()
        .chain(&report.deploy.failures)
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "\nNon-fatal problems:");
        for f in failures {
            line(&mut out, Some(Color::Yellow), false, &format!("  ⚠ {f}"));
        }
    }
    let _ = writeln!(out);
}

pub fn update_summary(outcome: &UpdateOutcome) {
    let mut out = stdout();
    match outcome {
        UpdateOutcome::Declined => line(&mut out, None, false, "No changes made."),
        UpdateOutcome::UpToDate { local, .. } => line(
            &mut out,
            Some(Color::Green),
            true,
            &format!("✓ Hindsight {local} is up to date"),
        ),
        UpdateOutcome::Applied { from, to } => {
            line(
                &mut out,
                Some(Color::Green),
                true,
                &format!("✓ Updated Hindsight {from} → {to}"),
            );
            line(
                &mut out,
                Some(Color::Cyan),
                false,
                "Run `hindsight-setup configure` to apply the new release.",
            );
        }
    }
}

pub fn terminal_summary(selection: &Selection) {
    let mut out = stdout();
    match selection {
        Selection::Chosen(cmd) => {
            line(&mut out, Some(Color::Green), true, &format!("✓ Terminal set to {cmd}"))
        }
        Selection::Skipped => line(
            &mut out,
            Some(Color::Yellow),
            false,
            "⚠ No terminal selected; configuration left unchanged",
        ),
    }
}
