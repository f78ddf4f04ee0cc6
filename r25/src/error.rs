// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// R25 client errors.
///
/// Every variant is a transport-level failure: the operation did not reach a
/// point where the server's verdict on the document could be read.
#[non_exhaustive]
#[derive(Debug)]
pub enum R25Error {
    /// HTTP layer error, including unexpected status codes.
    Http(String),

    /// XML parsing/writing error.
    Xml(String),

    /// The server asked us to slow down (HTTP 429).
    RateLimited(String),

    /// Response had an unexpected shape, e.g. an XHTML error page.
    InvalidResponse(String),

    /// Configuration error.
    Config(String),
}

impl fmt::Display for R25Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Xml(e) => write!(f, "XML error: {e}"),
            Self::RateLimited(url) => write!(f, "Too many requests: {url}"),
            Self::InvalidResponse(e) => write!(f, "Invalid server response: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for R25Error {}

impl From<reqwest::Error> for R25Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<quick_xml::Error> for R25Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for R25Error {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}
