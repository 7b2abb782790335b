//! Domain Scan CLI Application
//!
//! A command-line interface that generates candidate domain names from
//! patterns and scans their availability over WHOIS, with interactive
//! pause/resume/stop control while the scan runs.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::Term;
use domain_scan_lib::{
    estimate_pattern_count, generate_candidates, is_valid_suffix, list_suffixes,
    load_env_config, parse_timeout_string, ConfigManager, GenerationMode, ScanController,
    ScanEvent, ScanRequest, ScanSettings, MAX_CANDIDATES, MAX_CONCURRENCY,
};
use std::io::BufRead;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Candidate count above which an interactive run asks for confirmation.
const LARGE_RUN_THRESHOLD: usize = 5000;

/// Per-subscriber event buffer for the terminal printer.
const EVENT_BUFFER: usize = 1024;

/// CLI arguments for domain-scan
#[derive(Parser, Debug)]
#[command(name = "domain-scan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate domain names from patterns and scan their availability over WHOIS")]
#[command(
    long_about = "Generate candidate domain names from patterns and check their availability over WHOIS.\n\nModes:\n  fixed    A = letter, B = digit, C = letter or digit (e.g. AABB)\n  style    each distinct letter stands for one character (e.g. ABAB)\n  literal  the pattern itself\n\nWhile scanning, type p (pause), r (resume) or s (stop) followed by Enter. Ctrl-C stops."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Generation mode: fixed, style or literal
    #[arg(short = 'm', long = "mode", value_name = "MODE", help_heading = "Generation")]
    pub mode: Option<String>,

    /// Patterns to expand (comma-separated or repeated)
    #[arg(
        short = 'p',
        long = "pattern",
        value_name = "PATTERN",
        value_delimiter = ',',
        action = clap::ArgAction::Append,
        help_heading = "Generation"
    )]
    pub patterns: Option<Vec<String>>,

    /// Suffixes to append, e.g. .com,net (comma-separated or repeated)
    #[arg(
        short = 's',
        long = "suffix",
        value_name = "SUFFIX",
        value_delimiter = ',',
        action = clap::ArgAction::Append,
        help_heading = "Generation"
    )]
    pub suffixes: Option<Vec<String>>,

    /// List every suffix with a known WHOIS server and exit
    #[arg(long = "list-suffixes", help_heading = "Generation")]
    pub list_suffixes: bool,

    /// Print generated candidates without checking them
    #[arg(long = "dry-run", help_heading = "Generation")]
    pub dry_run: bool,

    /// Concurrent lookups (default: 5, max: 100)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Per-lookup deadline, e.g. 5s, 30s, 1m (default: 5s)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Skip the confirmation prompt for large scans
    #[arg(short = 'y', long = "yes", help_heading = "Performance")]
    pub yes: bool,

    /// Print the final scan snapshot as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Only print available domains while scanning
    #[arg(long = "available-only", help_heading = "Output Format")]
    pub available_only: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    if args.list_suffixes {
        ui::print_suffixes(&list_suffixes());
        return;
    }

    if let Err(e) = run_scan(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn validate_args(args: &Args) -> Result<(), String> {
    // --list-suffixes is self-contained, skip other validation
    if args.list_suffixes {
        return Ok(());
    }

    if let Some(mode) = &args.mode {
        if mode.parse::<GenerationMode>().is_err() {
            return Err(format!(
                "Unknown mode '{}'. Use one of: fixed, style, literal",
                mode
            ));
        }
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m', at most 1h",
                timeout
            ));
        }
    }

    if let Some(suffixes) = &args.suffixes {
        if let Some(bad) = suffixes.iter().find(|s| !is_valid_suffix(s)) {
            return Err(format!("Invalid suffix '{}'", bad));
        }
    }

    if let Some(patterns) = &args.patterns {
        if patterns.iter().all(|p| p.trim().is_empty()) {
            return Err("--pattern needs at least one non-empty pattern".to_string());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main scan logic
async fn run_scan(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let request = settings.request().normalized();

    // Size the run before expanding anything
    let estimate = estimate_candidates(&request);
    if estimate > MAX_CANDIDATES {
        return Err(format!(
            "Patterns would generate about {} candidates, more than the limit of {}. Use shorter patterns or fewer suffixes.",
            estimate, MAX_CANDIDATES
        )
        .into());
    }
    if !args.dry_run && !confirm_large_run(estimate, request.concurrency, args.yes)? {
        eprintln!("Aborted.");
        return Ok(());
    }

    let generation = generate_candidates(&request.mode, &request.patterns, &request.suffixes);
    ui::print_generation_errors(&generation.errors);

    // Dry-run: print candidates and exit without checking
    if args.dry_run {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&generation.candidates)?);
        } else {
            for candidate in &generation.candidates {
                println!("{}", candidate);
            }
        }
        eprintln!("{} domains would be checked", generation.candidates.len());
        return Ok(());
    }

    let total = generation.candidates.len();

    let config = settings.scan_config().with_subscriber_capacity(EVENT_BUFFER);
    let controller = Arc::new(ScanController::with_servers(config, settings.servers.clone())?);
    let mut events = controller.subscribe();

    if !args.json {
        ui::print_header(total, request.concurrency, &settings);
    }

    let started = Instant::now();
    controller.start_candidates(generation.candidates, request.concurrency)?;

    spawn_stdin_control(Arc::clone(&controller));
    spawn_ctrl_c_handler(Arc::clone(&controller));

    loop {
        let next = tokio::select! {
            biased;
            event = events.next_event() => Some(event),
            _ = controller.wait() => None,
        };

        match next {
            Some(Some(event)) => {
                if !args.json {
                    ui::print_event(&event, args.available_only);
                }
                if event.kind.is_terminal() {
                    break;
                }
            }
            Some(None) => break,
            None => {
                // Workers are done; whatever is still buffered ends with the terminal event.
                while let Some(line) = events.try_recv() {
                    match ScanEvent::parse(&line) {
                        Some(event) if !args.json => ui::print_event(&event, args.available_only),
                        _ => {}
                    }
                }
                break;
            }
        }
    }

    let snapshot = controller.snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        ui::print_summary(&snapshot, started.elapsed());
    }

    Ok(())
}

/// Resolve settings: defaults < config files < DS_* environment < CLI arguments.
fn build_settings(args: &Args) -> Result<ScanSettings, Box<dyn std::error::Error>> {
    let mut settings = ScanSettings::default();
    let env_config = load_env_config();
    let config_manager = ConfigManager::new();

    // Step 1: config files
    let explicit_path = args.config.clone().or_else(|| env_config.config.clone());
    if let Some(path) = explicit_path {
        tracing::info!(path = %path, "using explicit config file");
        let file_config = config_manager
            .load_file(&path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
        settings.apply_file(&file_config);
    } else {
        match config_manager.discover_and_load() {
            Ok(file_config) => settings.apply_file(&file_config),
            Err(e) => tracing::warn!("Config discovery warning: {}", e),
        }
    }

    // Step 2: environment variables (DS_*)
    settings.apply_env(&env_config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args(&mut settings, args)?;

    tracing::debug!(?settings, "resolved settings");
    Ok(settings)
}

fn apply_cli_args(settings: &mut ScanSettings, args: &Args) -> Result<(), String> {
    if let Some(mode) = &args.mode {
        settings.mode = mode.clone();
    }
    if let Some(patterns) = &args.patterns {
        settings.patterns = patterns.clone();
    }
    if let Some(suffixes) = &args.suffixes {
        settings.suffixes = suffixes.clone();
    }
    if let Some(concurrency) = args.concurrency {
        settings.concurrency = concurrency;
    }
    if let Some(timeout) = &args.timeout {
        let secs = parse_timeout_string(timeout)
            .ok_or_else(|| format!("Invalid timeout '{}'", timeout))?;
        settings.timeout = Duration::from_secs(secs.max(1));
    }
    Ok(())
}

/// Upper bound on the candidate count of a request, from pattern estimates alone.
///
/// Patterns that do not parse count as zero; generation reports them.
fn estimate_candidates(request: &ScanRequest) -> usize {
    let Ok(mode) = request.mode.parse::<GenerationMode>() else {
        return 0;
    };
    request
        .patterns
        .iter()
        .filter_map(|pattern| estimate_pattern_count(mode, pattern).ok())
        .fold(0usize, |acc, count| acc.saturating_add(count))
        .saturating_mul(request.suffixes.len())
}

/// Ask before very large scans when a human is at the terminal.
fn confirm_large_run(
    total: usize,
    concurrency: usize,
    yes: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    if total <= LARGE_RUN_THRESHOLD || yes {
        return Ok(true);
    }

    let term = Term::stderr();
    if !term.is_term() {
        return Ok(true);
    }

    let estimated_secs = total as f64 / concurrency.max(1) as f64;
    eprint!(
        "Will check {} domains (~{:.0}s at concurrency {}). Proceed? [Y/n] ",
        total, estimated_secs, concurrency
    );
    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    Ok(!is_negative_answer(&input))
}

fn is_negative_answer(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "n" | "no")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    Stop,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_lowercase().as_str() {
        "p" | "pause" => Some(Command::Pause),
        "r" | "resume" => Some(Command::Resume),
        "s" | "stop" | "q" | "quit" => Some(Command::Stop),
        _ => None,
    }
}

/// Read control commands from stdin on a plain thread.
///
/// The thread is never joined; it dies with the process.
fn spawn_stdin_control(controller: Arc<ScanController>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let applied = match parse_command(&line) {
                Some(Command::Pause) => controller.pause(),
                Some(Command::Resume) => controller.resume(),
                Some(Command::Stop) => controller.stop(),
                None => continue,
            };
            if applied {
                ui::print_control(controller.state());
            }
            if !controller.state().is_active() {
                break;
            }
        }
    });
}

fn spawn_ctrl_c_handler(controller: Arc<ScanController>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && controller.stop() {
            ui::print_control(controller.state());
        }
    });
}
