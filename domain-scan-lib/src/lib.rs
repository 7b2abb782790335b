//! # Domain Scan Library
//!
//! Generate candidate domain names from patterns and check their availability
//! over WHOIS, concurrently, with live pause/resume/stop control and
//! streamed progress.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_scan_lib::{ScanConfig, ScanController, ScanRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = ScanController::new(ScanConfig::default());
//!     let request = ScanRequest::new("fixed", vec!["AB".into()], vec![".com".into()]);
//!
//!     let summary = controller.start(&request)?;
//!     println!("scanning {} candidates", summary.total);
//!
//!     controller.wait().await;
//!     println!("available: {:?}", controller.snapshot().available);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Pattern generation**: `fixed`, `style` and `literal` modes
//! - **WHOIS lookups**: raw port-43 client with a per-check deadline
//! - **Worker pool**: bounded queue, pause gate, one-shot stop signal
//! - **Progress fan-out**: bounded per-subscriber queues, drop on full
//! - **Configurable**: TOML files and `DS_*` environment variables

// Re-export main public API types and functions
// This makes them available as domain_scan_lib::TypeName
pub use broadcast::{ProgressBroadcaster, Subscription};
pub use concurrent::{Gate, Latch};
pub use config::{
    load_env_config, ConfigManager, DefaultsConfig, EnvConfig, FileConfig, ScanSettings,
};
pub use controller::{ScanController, StartSummary};
pub use error::ScanError;
pub use protocols::{
    classify_response, get_whois_server, list_suffixes, Lookup, SuffixRegistry, WhoisClient,
};
pub use types::{
    EventKind, GenerationMode, GenerationResult, LookupOutcome, ScanConfig, ScanEvent,
    ScanRequest, ScanSnapshot, ScanState, DEFAULT_CONCURRENCY, MAX_CANDIDATES, MAX_CONCURRENCY,
    MAX_LOOKUP_TIMEOUT,
};
pub use utils::{is_valid_suffix, normalize_suffix, parse_timeout_string, split_list};

// Public modules
pub mod generate;
pub mod protocols;

// Re-export generation functions for convenience
pub use generate::{estimate_pattern_count, expand_pattern, generate_candidates};

// Internal modules - these are not part of the public API
mod broadcast;
mod concurrent;
mod config;
mod controller;
mod error;
mod session;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScanError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
