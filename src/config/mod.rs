//! Configuration for the habit API server
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/habitd/config.toml)
//! 3. Built-in defaults (lowest priority)
//!
//! The resulting `Config` is built once at startup and handed to the HTTP
//! layer by reference; nothing else in the process reads configuration
//! ambiently.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

mod logging;


pub use logging::{FileLogging, LogRotation, LoggingConfig};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the API server to
    pub bind_addr: SocketAddr,

    /// Directory holding habits.json and entries.json
    pub data_dir: PathBuf,

    /// Optional secondary directory that receives a best-effort copy of
    /// every save
    pub mirror_dir: Option<PathBuf>,

    /// Shared secret required in the x-api-key header on protected routes.
    /// With no key configured, protected routes always answer 401.
    pub api_key: Option<String>,

    /// Origins allowed by the CORS layer
    pub allowed_origins: Vec<String>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            data_dir: PathBuf::from("./data"),
            mirror_dir: None,
            api_key: None,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            logging: LoggingConfig::default(),
        }
    }
}

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub data_dir: Option<String>,
    pub mirror_dir: Option<String>,
    pub api_key: Option<String>,
    pub allowed_origins: Option<Vec<String>>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

impl Config {
    /// Get the config file path: ~/.config/habitd/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("habitd").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        // Create parent directory
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let template = Self::default().to_toml();

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, template);
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed is a fatal error -
    /// failing fast with a clear message beats silently running on defaults
    /// while the user debugs the wrong thing.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config file {}: {}", path.display(), e);
                    eprintln!("Fix the file or delete it to regenerate defaults, then restart habitd.");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("Cannot read config file {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        let file = Self::load_file_config();
        let defaults = Self::default();

        // Bind address: env > file > default
        let bind_addr = std::env::var("HABITD_BIND")
            .ok()
            .or(file.bind_addr)
            .map(|s| s.parse().expect("Invalid bind address"))
            .unwrap_or(defaults.bind_addr);

        // Data directory: env > file > default
        let data_dir = std::env::var("HABITD_DATA_DIR")
            .ok()
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        // Mirror directory: env > file; unset means no mirroring
        let mirror_dir = std::env::var("HABITD_MIRROR_DIR")
            .ok()
            .or(file.mirror_dir)
            .map(PathBuf::from);

        // Shared secret: env > file. API_KEY is the name the original
        // deployment used; keep honoring it.
        let api_key = std::env::var("HABITD_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .or(file.api_key);

        let allowed_origins = file.allowed_origins.unwrap_or(defaults.allowed_origins);

        let logging = LoggingConfig::from_file(file.logging);

        Self {
            bind_addr,
            data_dir,
            mirror_dir,
            api_key,
            allowed_origins,
            logging,
        }
    }

    /// Render this config as a commented TOML template. Single source of
    /// truth for `ensure_config_exists` and `habitd config --reset`.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();

        out.push_str("# habitd configuration\n");
        out.push_str("# Environment variables (HABITD_BIND, HABITD_DATA_DIR, HABITD_MIRROR_DIR,\n");
        out.push_str("# HABITD_API_KEY) override values in this file.\n\n");

        out.push_str(&format!("bind_addr = \"{}\"\n", self.bind_addr));
        out.push_str(&format!("data_dir = \"{}\"\n", self.data_dir.display()));
        match &self.mirror_dir {
            Some(dir) => out.push_str(&format!("mirror_dir = \"{}\"\n", dir.display())),
            None => out.push_str("# mirror_dir = \"/mnt/backup/habitd\"   # best-effort replica of every save\n"),
        }
        match &self.api_key {
            Some(key) => out.push_str(&format!("api_key = \"{}\"\n", key)),
            None => out.push_str("# api_key = \"change-me\"   # shared secret for the x-api-key header\n"),
        }
        out.push_str(&format!(
            "allowed_origins = [{}]\n",
            self.allowed_origins
                .iter()
                .map(|o| format!("\"{}\"", o))
                .collect::<Vec<_>>()
                .join(", ")
        ));

        out.push_str("\n[logging]\n");
        out.push_str(&format!("level = \"{}\"\n", self.logging.level));
        out.push_str(&format!("file_enabled = {}\n", self.logging.file_enabled));
        out.push_str(&format!(
            "file_dir = \"{}\"\n",
            self.logging.file_dir.display()
        ));
        out.push_str(&format!(
            "file_rotation = \"{}\"   # hourly | daily | never\n",
            self.logging.file_rotation.as_str()
        ));
        out.push_str(&format!("file_prefix = \"{}\"\n", self.logging.file_prefix));

        out
    }
}
