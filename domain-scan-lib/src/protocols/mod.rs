//! Protocol implementations for domain checking.
//!
//! This module contains the WHOIS lookup client and the suffix registry
//! that tells it which server to ask.

/// WHOIS protocol implementation
pub mod whois;

/// Suffix to WHOIS server mappings
pub mod registry;

// Re-export commonly used functions and types
pub use registry::{get_whois_server, get_whois_server_map, list_suffixes, SuffixRegistry};
pub use whois::{classify_response, Lookup, WhoisClient};
