//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILDIRSHELL_CONFIG` (environment variable)
//! 2. `~/.config/maildirshell/config.toml` (Linux),
//!    `~/Library/Application Support/maildirshell/config.toml` (macOS),
//!    `%APPDATA%\maildirshell\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::parser::walker::DEFAULT_MAX_DEPTH;
use crate::render::listing::ListWidths;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    /// Maildirs to open and the user's own addresses.
    pub mailboxes: MailboxesConfig,
    pub display: DisplayConfig,
    /// Outgoing mail server, handed to whatever transport is plugged in.
    pub smtp: SmtpConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory holding the log file.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxesConfig {
    /// Maildir roots. The first one is opened active, the others passive.
    pub maildirs: Vec<PathBuf>,
    /// Addresses that belong to the user; left out of reply-all.
    pub me: Vec<String>,
}

/// Display and parsing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Deepest MIME nesting level that is parsed.
    pub max_depth: usize,
    /// Wrap width for text reduced from HTML.
    pub html_width: usize,
    /// From column width in message lists.
    pub from_width: usize,
    /// Subject column width in message lists.
    pub subject_width: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// `host:port`.
    pub host: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Envelope sender.
    pub from: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            html_width: 80,
            from_width: 25,
            subject_width: 75,
        }
    }
}

impl DisplayConfig {
    pub fn list_widths(&self) -> ListWidths {
        ListWidths {
            from: self.from_width,
            subject: self.subject_width,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    let Some(path) = config_file_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
            return Config::default();
        }
    };
    match toml::from_str::<Config>(&contents) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
            Config::default()
        }
    }
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILDIRSHELL_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("maildirshell").join("config.toml"))
}

/// Directory for the log file.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("maildirshell")
}

/// Name of the log file inside [`cache_dir`].
pub const LOG_FILE_NAME: &str = "maildirshell.log";

pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.display.max_depth, 10);
        assert_eq!(cfg.display.html_width, 80);
        assert!(cfg.mailboxes.maildirs.is_empty());
        assert!(cfg.smtp.password.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[mailboxes]
maildirs = ["/home/u/Mail/inbox", "/home/u/Mail/lists"]
me = ["u@example.com"]

[display]
max_depth = 4
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.mailboxes.maildirs.len(), 2);
        assert_eq!(cfg.mailboxes.me, ["u@example.com"]);
        assert_eq!(cfg.display.max_depth, 4);
        assert_eq!(cfg.display.from_width, 25);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.smtp.host = "smtp.example.com:587".into();
        cfg.smtp.user = Some("u".into());
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.smtp.host, "smtp.example.com:587");
        assert_eq!(parsed.smtp.user.as_deref(), Some("u"));
        assert_eq!(parsed.display.subject_width, 75);
    }

    #[test]
    fn test_log_file_under_cache_dir_override() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/mds-logs"));
        assert_eq!(log_file_path(&cfg), PathBuf::from("/tmp/mds-logs/maildirshell.log"));
    }

    #[test]
    fn test_list_widths_follow_display() {
        let display = DisplayConfig {
            from_width: 12,
            ..DisplayConfig::default()
        };
        assert_eq!(display.list_widths().from, 12);
        assert_eq!(display.list_widths().subject, 75);
    }
}
