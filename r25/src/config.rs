// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// R25 authentication method.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AuthMethod {
    /// No authentication.
    #[serde(rename = "none")]
    #[default]
    None,
    /// Basic authentication (username/password).
    #[serde(rename = "basic")]
    Basic {
        /// Username for authentication.
        username: String,
        /// Password for authentication.
        password: String,
    },
    /// Bearer token authentication.
    #[serde(rename = "bearer")]
    Bearer {
        /// Bearer token.
        token: String,
    },
}

/// R25 web service configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct R25Config {
    /// Base URL of the web services host, e.g. `https://webservices.collegenet.com`.
    pub base_url: String,
    /// Instance name. Selects the `/r25ws/wrd/<instance>/run/` layout; without
    /// it the legacy `/r25ws/servlet/wrd/run/` layout is used.
    #[serde(default)]
    pub instance: Option<String>,
    /// Authentication method.
    #[serde(default)]
    pub auth: AuthMethod,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Base of the 25Live web UI, used to build links to events in reports.
    #[serde(default)]
    pub live_url: Option<String>,
}

impl R25Config {
    /// Path prefix that every resource name is appended to.
    #[must_use]
    pub fn run_path(&self) -> String {
        match &self.instance {
            Some(instance) => format!("/r25ws/wrd/{instance}/run/"),
            None => "/r25ws/servlet/wrd/run/".to_string(),
        }
    }

    /// Link to an event's details page in the web UI, if a base is known.
    #[must_use]
    pub fn event_link(&self, event_id: impl std::fmt::Display) -> String {
        match &self.live_url {
            Some(base) => format!(
                "{}#!/home/event/{event_id}/details",
                base.trim_end_matches('/')
            ),
            None => format!("event {event_id}"),
        }
    }
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("booksync-r25/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for R25Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            instance: None,
            auth: AuthMethod::default(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            live_url: None,
        }
    }
}
