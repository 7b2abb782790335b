//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `DS_*`
//! environment variables, and merging them with proper precedence rules:
//! CLI arguments > environment > local file > global file > XDG file > defaults.

use crate::error::ScanError;
use crate::types::{
    GenerationMode, ScanConfig, ScanRequest, DEFAULT_CONCURRENCY, DEFAULT_LOOKUP_TIMEOUT,
    DEFAULT_PATTERN, DEFAULT_SUFFIX, MAX_CONCURRENCY,
};
use crate::utils::{is_valid_suffix, parse_timeout_string, split_list};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for scan parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Extra or replacement suffix -> WHOIS host entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<HashMap<String, String>>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Generation mode token: fixed, style or literal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffixes: Option<Vec<String>>,

    /// Worker count, 1..=100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Per-check deadline (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    local_dir: PathBuf,
    home_dir: Option<PathBuf>,
    xdg_dir: Option<PathBuf>,
}

impl ConfigManager {
    /// Manager looking in the working directory, `$HOME` and `$XDG_CONFIG_HOME`.
    pub fn new() -> Self {
        let home_dir = env::var_os("HOME").map(PathBuf::from);
        let xdg_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home_dir.as_ref().map(|home| home.join(".config")));
        Self {
            local_dir: PathBuf::from("."),
            home_dir,
            xdg_dir,
        }
    }

    /// Manager rooted at explicit directories instead of the process environment.
    pub fn with_dirs<P: Into<PathBuf>>(local_dir: P, home_dir: Option<PathBuf>, xdg_dir: Option<PathBuf>) -> Self {
        Self {
            local_dir: local_dir.into(),
            home_dir,
            xdg_dir,
        }
    }

    /// Load and validate configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScanError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScanError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// Missing files are skipped. The first file that exists but fails to
    /// parse or validate aborts discovery with that error; callers decide
    /// whether that is fatal (the CLI logs it and continues on defaults).
    pub fn discover_and_load(&self) -> Result<FileConfig, ScanError> {
        let mut merged = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged = self.merge_configs(merged, config);
            loaded_files.push(path);
        }

        if loaded_files.len() > 1 {
            let active = loaded_files.last().map(|p| p.display().to_string());
            tracing::info!(
                files = ?loaded_files,
                active = active.as_deref().unwrap_or_default(),
                "multiple config files merged"
            );
        }

        Ok(merged)
    }

    /// Local configuration file in the working directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["domain-scan.toml", ".domain-scan.toml"]
            .iter()
            .map(|name| self.local_dir.join(name))
            .find(|path| path.exists())
    }

    /// Global configuration file in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = self.home_dir.as_ref()?;
        [".domain-scan.toml", "domain-scan.toml"]
            .iter()
            .map(|name| home.join(name))
            .find(|path| path.exists())
    }

    /// XDG configuration file.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let path = self.xdg_dir.as_ref()?.join("domain-scan").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations. Values from `higher` take precedence.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.mode.is_some() {
                        lower_defaults.mode = higher_defaults.mode;
                    }
                    if higher_defaults.patterns.is_some() {
                        lower_defaults.patterns = higher_defaults.patterns;
                    }
                    if higher_defaults.suffixes.is_some() {
                        lower_defaults.suffixes = higher_defaults.suffixes;
                    }
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            servers: match (lower.servers, higher.servers) {
                (Some(mut lower_servers), Some(higher_servers)) => {
                    lower_servers.extend(higher_servers);
                    Some(lower_servers)
                }
                (lower_servers, higher_servers) => higher_servers.or(lower_servers),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ScanError> {
        if let Some(defaults) = &config.defaults {
            if let Some(mode) = &defaults.mode {
                mode.parse::<GenerationMode>()
                    .map_err(|_| ScanError::config(format!("Unknown mode '{}', use fixed, style or literal", mode)))?;
            }

            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(ScanError::config("Concurrency must be between 1 and 100"));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(ScanError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m', at most 1h",
                        timeout_str
                    )));
                }
            }

            if let Some(suffixes) = &defaults.suffixes {
                if let Some(bad) = suffixes.iter().find(|s| !is_valid_suffix(s)) {
                    return Err(ScanError::config(format!("Invalid suffix '{}'", bad)));
                }
            }
        }

        if let Some(servers) = &config.servers {
            for (suffix, host) in servers {
                if suffix.is_empty() || suffix.contains('.') || suffix.contains(' ') {
                    return Err(ScanError::config(format!(
                        "Invalid suffix '{}' in [servers], write it without a dot",
                        suffix
                    )));
                }
                if host.trim().is_empty() {
                    return Err(ScanError::config(format!(
                        "Server for suffix '{}' cannot be empty",
                        suffix
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DS_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub mode: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub suffixes: Option<Vec<String>>,
    pub concurrency: Option<usize>,
    pub timeout: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Build from an arbitrary variable source. Invalid values are dropped
    /// with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env_config = EnvConfig::default();

        if let Some(mode) = lookup("DS_MODE") {
            match mode.trim().parse::<GenerationMode>() {
                Ok(parsed) => env_config.mode = Some(parsed.as_str().to_string()),
                Err(_) => tracing::warn!("Invalid DS_MODE='{}', use fixed, style or literal", mode),
            }
        }

        if let Some(list) = lookup("DS_PATTERNS") {
            let patterns = split_list(&list);
            if !patterns.is_empty() {
                env_config.patterns = Some(patterns);
            }
        }

        if let Some(list) = lookup("DS_SUFFIXES") {
            let suffixes = split_list(&list);
            if suffixes.iter().all(|s| is_valid_suffix(s)) && !suffixes.is_empty() {
                env_config.suffixes = Some(suffixes);
            } else {
                tracing::warn!("Invalid DS_SUFFIXES='{}'", list);
            }
        }

        if let Some(val) = lookup("DS_CONCURRENCY") {
            match val.trim().parse::<usize>() {
                Ok(concurrency) if concurrency > 0 && concurrency <= MAX_CONCURRENCY => {
                    env_config.concurrency = Some(concurrency);
                }
                _ => tracing::warn!("Invalid DS_CONCURRENCY='{}', must be 1-100", val),
            }
        }

        if let Some(timeout_str) = lookup("DS_TIMEOUT") {
            if parse_timeout_string(&timeout_str).is_some() {
                env_config.timeout = Some(timeout_str);
            } else {
                tracing::warn!(
                    "Invalid DS_TIMEOUT='{}', use format like '5s', '30s', '2m', at most 1h",
                    timeout_str
                );
            }
        }

        if let Some(config_path) = lookup("DS_CONFIG") {
            if !config_path.trim().is_empty() {
                env_config.config = Some(config_path);
            }
        }

        tracing::debug!(?env_config, "environment configuration");
        env_config
    }
}

/// Load configuration from the process's `DS_*` environment variables.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|key| env::var(key).ok())
}

/// Fully resolved scan settings after all layers were applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSettings {
    pub mode: String,
    pub patterns: Vec<String>,
    pub suffixes: Vec<String>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub servers: BTreeMap<String, String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mode: GenerationMode::Fixed.as_str().to_string(),
            patterns: vec![DEFAULT_PATTERN.to_string()],
            suffixes: vec![DEFAULT_SUFFIX.to_string()],
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
            servers: BTreeMap::new(),
        }
    }
}

impl ScanSettings {
    /// Overlay values from a (merged) config file.
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(defaults) = &file.defaults {
            self.overlay(
                defaults.mode.as_ref(),
                defaults.patterns.as_ref(),
                defaults.suffixes.as_ref(),
                defaults.concurrency,
                defaults.timeout.as_deref(),
            );
        }
        if let Some(servers) = &file.servers {
            self.servers
                .extend(servers.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    /// Overlay values from the environment.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        self.overlay(
            env.mode.as_ref(),
            env.patterns.as_ref(),
            env.suffixes.as_ref(),
            env.concurrency,
            env.timeout.as_deref(),
        );
    }

    fn overlay(
        &mut self,
        mode: Option<&String>,
        patterns: Option<&Vec<String>>,
        suffixes: Option<&Vec<String>>,
        concurrency: Option<usize>,
        timeout: Option<&str>,
    ) {
        if let Some(mode) = mode {
            self.mode = mode.clone();
        }
        if let Some(patterns) = patterns.filter(|p| !p.is_empty()) {
            self.patterns = patterns.clone();
        }
        if let Some(suffixes) = suffixes.filter(|s| !s.is_empty()) {
            self.suffixes = suffixes.clone();
        }
        if let Some(concurrency) = concurrency {
            self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        }
        if let Some(secs) = timeout.and_then(parse_timeout_string) {
            self.timeout = Duration::from_secs(secs.max(1));
        }
    }

    pub fn request(&self) -> ScanRequest {
        ScanRequest::new(self.mode.clone(), self.patterns.clone(), self.suffixes.clone())
            .with_concurrency(self.concurrency)
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default().with_lookup_timeout(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
mode = "style"
patterns = ["ABAB", "AABB"]
suffixes = [".com", "net"]
concurrency = 25
timeout = "3s"

[servers]
io = "whois.nic.io"
"#,
        );

        let config = ConfigManager::new().load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.mode.as_deref(), Some("style"));
        assert_eq!(defaults.patterns, Some(vec!["ABAB".to_string(), "AABB".to_string()]));
        assert_eq!(defaults.concurrency, Some(25));
        assert_eq!(defaults.timeout.as_deref(), Some("3s"));

        let servers = config.servers.unwrap();
        assert_eq!(servers.get("io").map(String::as_str), Some("whois.nic.io"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "[defaults]\nconcurrency = 0\n",
            "[defaults]\nconcurrency = 101\n",
            "[defaults]\ntimeout = \"soon\"\n",
            "[defaults]\ntimeout = \"61m\"\n",
            "[defaults]\ntimeout = \"400000000000000000m\"\n",
            "[defaults]\nmode = \"Fixed\"\n",
            "[defaults]\nsuffixes = [\".c m\"]\n",
            "[servers]\n\".io\" = \"whois.nic.io\"\n",
            "[servers]\nio = \"  \"\n",
            "[defaults\n",
        ];

        let manager = ConfigManager::new();
        for content in cases {
            let temp_file = write_config(content);
            assert!(
                manager.load_file(temp_file.path()).is_err(),
                "accepted: {}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::new()
            .load_file("/definitely/not/here.toml")
            .unwrap_err();
        assert!(matches!(err, ScanError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new();

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(10),
                mode: Some("style".to_string()),
                ..Default::default()
            }),
            servers: Some(HashMap::from([
                ("io".to_string(), "old.example".to_string()),
                ("ai".to_string(), "whois.nic.ai".to_string()),
            ])),
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some(25),
                ..Default::default()
            }),
            servers: Some(HashMap::from([("io".to_string(), "whois.nic.io".to_string())])),
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();
        assert_eq!(defaults.concurrency, Some(25)); // Higher wins
        assert_eq!(defaults.mode.as_deref(), Some("style")); // Lower preserved

        let servers = merged.servers.unwrap();
        assert_eq!(servers.get("io").map(String::as_str), Some("whois.nic.io"));
        assert_eq!(servers.get("ai").map(String::as_str), Some("whois.nic.ai"));
    }

    #[test]
    fn test_discover_precedence() {
        let local = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let xdg = TempDir::new().unwrap();

        fs::create_dir_all(xdg.path().join("domain-scan")).unwrap();
        fs::write(
            xdg.path().join("domain-scan").join("config.toml"),
            "[defaults]\nconcurrency = 3\nmode = \"literal\"\ntimeout = \"9s\"\n",
        )
        .unwrap();
        fs::write(
            home.path().join(".domain-scan.toml"),
            "[defaults]\nconcurrency = 7\nmode = \"style\"\n",
        )
        .unwrap();
        fs::write(local.path().join("domain-scan.toml"), "[defaults]\nconcurrency = 12\n").unwrap();

        let manager = ConfigManager::with_dirs(
            local.path(),
            Some(home.path().to_path_buf()),
            Some(xdg.path().to_path_buf()),
        );
        let merged = manager.discover_and_load().unwrap();
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.concurrency, Some(12));
        assert_eq!(defaults.mode.as_deref(), Some("style"));
        assert_eq!(defaults.timeout.as_deref(), Some("9s"));
    }

    #[test]
    fn test_discover_reports_broken_file() {
        let local = TempDir::new().unwrap();
        fs::write(local.path().join("domain-scan.toml"), "[defaults]\ntimeout = \"2h\"\n").unwrap();

        let manager = ConfigManager::with_dirs(local.path(), None, None);
        let err = manager.discover_and_load().unwrap_err();
        assert!(matches!(err, ScanError::ConfigError { .. }));
    }

    #[test]
    fn test_discover_with_no_files() {
        let empty = TempDir::new().unwrap();
        let manager = ConfigManager::with_dirs(empty.path(), None, None);
        let merged = manager.discover_and_load().unwrap();
        assert!(merged.defaults.is_none());
        assert!(merged.servers.is_none());
    }

    #[test]
    fn test_env_config_parsing() {
        let vars = HashMap::from([
            ("DS_MODE", "style"),
            ("DS_PATTERNS", "ABAB, AABB"),
            ("DS_SUFFIXES", ".com,net"),
            ("DS_CONCURRENCY", "20"),
            ("DS_TIMEOUT", "2m"),
            ("DS_CONFIG", "/tmp/scan.toml"),
        ]);
        let env_config = EnvConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(env_config.mode.as_deref(), Some("style"));
        assert_eq!(env_config.patterns, Some(vec!["ABAB".to_string(), "AABB".to_string()]));
        assert_eq!(env_config.suffixes, Some(vec![".com".to_string(), "net".to_string()]));
        assert_eq!(env_config.concurrency, Some(20));
        assert_eq!(env_config.timeout.as_deref(), Some("2m"));
        assert_eq!(env_config.config.as_deref(), Some("/tmp/scan.toml"));
    }

    #[test]
    fn test_env_config_ignores_invalid_values() {
        let vars = HashMap::from([
            ("DS_MODE", "old"),
            ("DS_CONCURRENCY", "0"),
            ("DS_TIMEOUT", "later"),
            ("DS_PATTERNS", " , "),
        ]);
        let env_config = EnvConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(env_config, EnvConfig::default());

        let vars = HashMap::from([("DS_TIMEOUT", "10000000000000000000s")]);
        let env_config = EnvConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(env_config.timeout, None);
    }

    #[test]
    fn test_settings_layering() {
        let mut settings = ScanSettings::default();
        assert_eq!(settings.mode, "fixed");
        assert_eq!(settings.patterns, vec!["AABB"]);
        assert_eq!(settings.timeout, Duration::from_secs(5));

        let file = FileConfig {
            defaults: Some(DefaultsConfig {
                mode: Some("style".to_string()),
                concurrency: Some(8),
                timeout: Some("10s".to_string()),
                ..Default::default()
            }),
            servers: Some(HashMap::from([("io".to_string(), "whois.nic.io".to_string())])),
        };
        settings.apply_file(&file);

        let env_config = EnvConfig {
            concurrency: Some(2),
            suffixes: Some(vec![".net".to_string()]),
            ..Default::default()
        };
        settings.apply_env(&env_config);

        assert_eq!(settings.mode, "style");
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.suffixes, vec![".net"]);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.servers.get("io").map(String::as_str), Some("whois.nic.io"));

        let request = settings.request();
        assert_eq!(request.concurrency, 2);
        assert_eq!(settings.scan_config().lookup_timeout, Duration::from_secs(10));
    }
}
