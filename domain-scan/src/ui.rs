//! Terminal display logic for the domain-scan CLI.
//!
//! Progress lines, AVAILABLE / FAIL highlighting, headers and the final
//! summary. Uses only the `console` crate. Everything that is not a result
//! goes to stderr so stdout can be piped.

use console::{pad_str, style, Alignment};
use domain_scan_lib::{EventKind, ScanError, ScanEvent, ScanSettings, ScanSnapshot, ScanState};
use std::time::Duration;

const DOMAIN_WIDTH: usize = 30;

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a scan.
pub fn print_header(total: usize, concurrency: usize, settings: &ScanSettings) {
    println!(
        "{} {} {}",
        style("domain-scan").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "- Scanning {} domain{}",
            total,
            if total == 1 { "" } else { "s" }
        ))
        .dim(),
    );

    let meta_parts = [
        format!("Mode: {}", settings.mode),
        format!("Patterns: {}", settings.patterns.join(", ")),
        format!("Suffixes: {}", settings.suffixes.join(", ")),
        format!("Concurrency: {}", concurrency),
        format!("Timeout: {}s", settings.timeout.as_secs()),
    ];
    println!("{}", style(meta_parts.join(" | ")).dim());
    eprintln!(
        "{}",
        style("Type p + Enter to pause, r to resume, s to stop.").dim()
    );
    println!();
}

// ── Events ───────────────────────────────────────────────────────────────────

/// Render one progress event, or `None` when it should not be shown.
pub fn format_event(event: &ScanEvent, available_only: bool) -> Option<String> {
    match event.kind {
        EventKind::Available => Some(format!(
            "  {}  {}",
            style(pad_str(&event.payload, DOMAIN_WIDTH, Alignment::Left, Some(".."))).white(),
            style("AVAILABLE").green().bold(),
        )),
        EventKind::Fail if !available_only => Some(format!(
            "  {}  {}",
            style(pad_str(&event.payload, DOMAIN_WIDTH, Alignment::Left, Some(".."))).white(),
            style("FAIL").yellow(),
        )),
        EventKind::Scanned if !available_only => {
            Some(format!("  {}", style(&event.payload).dim()))
        }
        EventKind::Complete | EventKind::Stopped => {
            Some(format!("\n  {}", style(&event.payload).bold()))
        }
        EventKind::Aborted => Some(format!("\n  {}", style(&event.payload).red().bold())),
        _ => None,
    }
}

pub fn print_event(event: &ScanEvent, available_only: bool) {
    if let Some(line) = format_event(event, available_only) {
        println!("{}", line);
    }
}

/// Acknowledge an interactive control command.
pub fn print_control(state: ScanState) {
    let label = match state {
        ScanState::Paused => style("paused, type r to resume".to_string()).yellow(),
        ScanState::Running => style("resumed".to_string()).green(),
        ScanState::Stopped => style("stopping after in-flight lookups".to_string()).red(),
        other => style(other.to_string()).dim(),
    };
    eprintln!("  {}", label);
}

// ── Generation warnings ──────────────────────────────────────────────────────

pub fn print_generation_errors(errors: &[ScanError]) {
    for error in errors {
        eprintln!("{} {}", style("Warning:").yellow().bold(), error);
    }
}

// ── Suffix listing ───────────────────────────────────────────────────────────

/// Print every known suffix, one per line.
pub fn print_suffixes(suffixes: &[String]) {
    for suffix in suffixes {
        println!("{}", suffix);
    }
    eprintln!("{} suffixes", suffixes.len());
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(snapshot: &ScanSnapshot, duration: Duration) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    let taken = snapshot
        .done
        .saturating_sub(snapshot.available.len() + snapshot.failed.len());
    println!(
        "  {}/{} checked in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(snapshot.done).bold(),
        snapshot.total,
        duration.as_secs_f64(),
        style("|").dim(),
        style(format!("{} available", snapshot.available.len())).green(),
        style("|").dim(),
        style(format!("{} taken", taken)).red(),
        style("|").dim(),
        style(format!("{} failed", snapshot.failed.len())).yellow(),
    );

    if !snapshot.available.is_empty() {
        println!(
            "  {} {}",
            style("Available:").green().bold(),
            format_list(&snapshot.available, 20)
        );
    }
    if !snapshot.failed.is_empty() {
        println!(
            "  {} {}",
            style("Could not be checked:").yellow(),
            format_list(&snapshot.failed, 5)
        );
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Join a list, truncating after `max_show` entries.
pub fn format_list(domains: &[String], max_show: usize) -> String {
    if domains.len() <= max_show {
        domains.join(", ")
    } else {
        let shown = &domains[..max_show];
        let remaining = domains.len() - max_show;
        format!("{}, ... and {} more", shown.join(", "), remaining)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
