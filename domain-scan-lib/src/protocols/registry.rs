//! Suffix registry: which WHOIS server answers for which top-level suffix.
//!
//! The built-in table is static configuration. A `SuffixRegistry` can layer
//! extra entries from a config file on top of it at construction time; it is
//! never mutated afterwards.

use crate::error::ScanError;
use crate::utils::extract_suffix;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref DEFAULT_REGISTRY: SuffixRegistry = SuffixRegistry::new();
}

/// Get the built-in WHOIS server mappings.
///
/// Keys are suffixes without the leading dot; values are hostnames queried
/// on port 43.
pub fn get_whois_server_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Generic TLDs
        ("com", "whois.verisign-grs.com"),
        ("net", "whois.verisign-grs.com"),
        ("org", "whois.pir.org"),
        ("info", "whois.afilias.net"),
        ("top", "whois.afilias-srs.net"),
        ("dev", "whois.nic.google"),
        ("xyz", "whois.nic.xyz"),
        ("sbs", "whois.nic.sbs"),
        ("best", "whois.nic.best"),
        ("ltd", "whois.nic.ltd"),
        ("pro", "whois.nic.pro"),
        ("live", "whois.nic.live"),
        ("art", "whois.nic.art"),
        ("chat", "whois.nic.chat"),
        ("vip", "whois.nic.vip"),
        ("link", "whois.uniregistry.net"),
        ("ren", "whois.nic.ren"),
        // Country code TLDs
        ("cn", "whois.cnnic.cn"),
        ("cc", "ccwhois.verisign-grs.com"),
        ("de", "whois.denic.de"),
        ("in", "whois.registry.in"),
        ("my", "whois.mynic.my"),
        ("me", "whois.nic.me"),
    ])
}

/// Suffix -> WHOIS host table used by the lookup client.
#[derive(Debug, Clone)]
pub struct SuffixRegistry {
    servers: HashMap<String, String>,
}

impl SuffixRegistry {
    /// Registry holding only the built-in table.
    pub fn new() -> Self {
        Self {
            servers: get_whois_server_map()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Registry with no entries at all.
    pub fn empty() -> Self {
        Self {
            servers: HashMap::new(),
        }
    }

    /// Add or replace entries. Suffix keys are normalized (lower-cased,
    /// leading dot removed); entries with an empty key or host are rejected.
    pub fn with_overrides<I, K, V>(mut self, entries: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (suffix, host) in entries {
            let key = suffix.as_ref().trim().trim_start_matches('.').to_lowercase();
            let host = host.as_ref().trim();
            if key.is_empty() || key.contains('.') {
                return Err(ScanError::config(format!(
                    "Invalid suffix '{}' in server table",
                    suffix.as_ref()
                )));
            }
            if host.is_empty() {
                return Err(ScanError::config(format!(
                    "Empty WHOIS server for suffix '{}'",
                    key
                )));
            }
            self.servers.insert(key, host.to_string());
        }
        Ok(self)
    }

    /// WHOIS host for a suffix (without leading dot).
    pub fn server_for(&self, suffix: &str) -> Option<&str> {
        self.servers
            .get(&suffix.trim_start_matches('.').to_lowercase())
            .map(String::as_str)
    }

    /// WHOIS host responsible for a full domain.
    pub fn server_for_domain(&self, domain: &str) -> Option<&str> {
        self.server_for(extract_suffix(domain))
    }

    /// Every configured suffix with a leading dot, sorted.
    pub fn suffixes(&self) -> Vec<String> {
        let mut suffixes: Vec<String> = self.servers.keys().map(|k| format!(".{}", k)).collect();
        suffixes.sort();
        suffixes
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Default for SuffixRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up the built-in WHOIS server for a suffix.
pub fn get_whois_server(suffix: &str) -> Option<&'static str> {
    DEFAULT_REGISTRY.server_for(suffix)
}

/// List every built-in suffix, dot-prefixed and sorted.
///
/// # Examples
///
/// ```rust
/// use domain_scan_lib::list_suffixes;
///
/// let suffixes = list_suffixes();
/// assert!(suffixes.contains(&".com".to_string()));
/// ```
pub fn list_suffixes() -> Vec<String> {
    DEFAULT_REGISTRY.suffixes()
}
