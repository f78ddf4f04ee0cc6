// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and status handling.

use reqwest::{Client, Method, RequestBuilder, StatusCode};

use crate::config::{AuthMethod, R25Config};
use crate::error::R25Error;

/// HTTP client for R25 operations.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: R25Config,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or client creation fails.
    pub fn new(config: R25Config) -> Result<Self, R25Error> {
        if config.base_url.trim().is_empty() {
            return Err(R25Error::Config("R25 base_url is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, config })
    }

    /// Full URL of a resource such as `event.xml`.
    pub fn url(&self, resource: &str) -> String {
        format!(
            "{}{}{resource}",
            self.config.base_url.trim_end_matches('/'),
            self.config.run_path()
        )
    }

    /// Builds a request with authentication and `Accept` headers.
    pub fn build_request(&self, method: Method, resource: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, self.url(resource))
            .header("Accept", "text/xml");

        match &self.config.auth {
            AuthMethod::Basic { username, password } => {
                req = req.basic_auth(username, Some(password));
            }
            AuthMethod::Bearer { token } => {
                req = req.bearer_auth(token);
            }
            AuthMethod::None => {}
        }

        req
    }

    /// Executes a request and returns the body when the status is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`R25Error::RateLimited`] on HTTP 429 and [`R25Error::Http`]
    /// for any other status not in `accepted`.
    pub async fn execute(
        &self,
        req: RequestBuilder,
        resource: &str,
        accepted: &[StatusCode],
    ) -> Result<String, R25Error> {
        let resp = req.send().await?;
        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(resource, "R25 is rate limiting requests");
            return Err(R25Error::RateLimited(resource.to_string()));
        }

        let text = resp
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        if !accepted.contains(&status) {
            return Err(R25Error::Http(format!("{resource}: {status}: {text}")));
        }

        tracing::debug!(resource, %status, "R25 response");
        Ok(text)
    }
}
