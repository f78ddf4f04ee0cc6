// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

use booksync_r25::R25Config;

/// The name of the application.
pub const APP_NAME: &str = "booksync";

/// File name of the local store inside the state directory.
const DB_FILE: &str = "booksync.db";

/// Configuration for a sync run.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Directory for storing application state.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// R25 web services.
    pub r25: R25Config,

    /// Booking source API.
    pub source: SourceConfig,

    /// Reconciliation rules.
    pub sync: SyncConfig,

    /// Where the end-of-run report goes.
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Normalize the configuration.
    pub fn normalize(&mut self) -> Result<(), Box<dyn Error>> {
        // Normalize state directory
        match &self.state_dir {
            Some(a) => {
                self.state_dir = Some(
                    expand_path(a)
                        .map_err(|e| format!("Failed to expand state directory path: {e}"))?,
                );
            }

            None => match get_state_dir() {
                Ok(a) => self.state_dir = Some(a.join(APP_NAME)),
                Err(e) => tracing::warn!(err = %e, "failed to get state directory"),
            },
        }

        if let Some(path) = &self.report.path {
            self.report.path = Some(
                expand_path(path).map_err(|e| format!("Failed to expand report path: {e}"))?,
            );
        }

        if self.r25.base_url.is_empty() {
            return Err("r25.base_url is required".into());
        }
        if self.source.base_url.is_empty() {
            return Err("source.base_url is required".into());
        }
        if self.sync.uid_prefix.is_empty() {
            return Err("sync.uid_prefix must not be empty".into());
        }

        Ok(())
    }

    /// Path of the local store, `None` when no state directory is known.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.state_dir.as_ref().map(|dir| dir.join(DB_FILE))
    }
}

/// Booking source API settings.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SourceConfig {
    /// Base URL of the API, e.g. `https://bookings.example.edu`.
    pub base_url: String,

    /// Key sent in the `X-API-Key` header.
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// IANA zone for source times without an offset; the system zone if omitted.
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// How a booking group is located in R25.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// `starts_with` search on `<group>_`; several matches are possible.
    #[default]
    NamePrefix,
    /// Exact search on the event's alien uid.
    AlienUid,
}

/// Which remote set mirrors the mapped spaces.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FavoritesConfig {
    /// The account's favorite spaces.
    #[default]
    Favorites,
    /// The space list of a saved space search.
    SavedSearch { query_id: u64 },
    /// Leave remote favorites alone.
    None,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SyncConfig {
    /// Organization every synced event belongs to.
    pub organization_id: String,

    #[serde(default)]
    pub match_mode: MatchMode,

    /// Prefix of alien uids and profile names.
    #[serde(default = "default_uid_prefix")]
    pub uid_prefix: String,

    /// Event type for newly seen statuses without an entry in `event_type_map`.
    #[serde(default)]
    pub default_event_type_id: Option<i64>,

    /// Event type by status description.
    #[serde(default)]
    pub event_type_map: HashMap<String, i64>,

    /// Status descriptions mapped to `ignore` when first seen.
    #[serde(default)]
    pub ignore_statuses: Vec<String>,

    /// Status descriptions mapped to `remove` when first seen.
    #[serde(default)]
    pub remove_statuses: Vec<String>,

    #[serde(default)]
    pub favorites: FavoritesConfig,

    /// Window length when no end date is given.
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ReportConfig {
    /// File the report is appended to; the log when omitted.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

const fn default_timeout() -> u64 {
    30
}

fn default_uid_prefix() -> String {
    "BKS".to_string()
}

const fn default_window_days() -> i64 {
    7
}

fn expand_path(path: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }

    let path = path.to_str().ok_or("Invalid path")?;

    // Handle tilde and home directory
    let home_prefixes: &[&str] = if cfg!(unix) {
        &["~/", "$HOME/", "${HOME}/"]
    } else {
        &[r"~\", "~/", r"%UserProfile%\", r"%UserProfile%/"]
    };
    for prefix in home_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_home_dir()?.join(stripped));
        }
    }

    // Handle config directories
    let config_prefixes: &[&str] = if cfg!(unix) {
        &["$XDG_CONFIG_HOME/", "${XDG_CONFIG_HOME}/"]
    } else {
        &[r"%LOCALAPPDATA%\", "%LOCALAPPDATA%/"]
    };
    for prefix in config_prefixes {
        if let Some(stripped) = path.strip_prefix(prefix) {
            return Ok(get_config_dir()?.join(stripped));
        }
    }

    Ok(path.into())
}

fn get_home_dir() -> Result<PathBuf, Box<dyn Error>> {
    dirs::home_dir().ok_or_else(|| "User-specific home directory not found".into())
}

fn get_config_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let config_dir = xdg::BaseDirectories::new().get_config_home();
    #[cfg(windows)]
    let config_dir = dirs::config_dir();
    config_dir.ok_or_else(|| "User-specific config directory not found".into())
}

fn get_state_dir() -> Result<PathBuf, Box<dyn Error>> {
    #[cfg(unix)]
    let state_dir = xdg::BaseDirectories::new().get_state_home();
    #[cfg(windows)]
    let state_dir = dirs::data_dir();
    state_dir.ok_or_else(|| "User-specific state directory not found".into())
}
