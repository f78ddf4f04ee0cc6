// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! R25 client for event, space and favorites operations.

use std::sync::Arc;

use reqwest::{Method, StatusCode};

use crate::config::R25Config;
use crate::document::Document;
use crate::error::R25Error;
use crate::http::HttpClient;
use crate::listing::{EventSummary, FavoriteObject, space_ids_from};
use crate::response::{WriteOutcome, ensure_not_html};
use crate::types::{EventId, SpaceId};

/// Status codes after which a write response body carries the server's verdict.
const WRITE_STATUSES: &[StatusCode] = &[
    StatusCode::OK,
    StatusCode::CREATED,
    StatusCode::BAD_REQUEST,
    StatusCode::FORBIDDEN,
    StatusCode::TOO_EARLY,
];

/// Client for the R25 web services.
///
/// # Example
///
/// ```ignore
/// use booksync_r25::{AuthMethod, R25Client, R25Config};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = R25Config {
///     base_url: "https://webservices.collegenet.com".to_string(),
///     instance: Some("campus".to_string()),
///     auth: AuthMethod::Basic {
///         username: "user".to_string(),
///         password: "pass".to_string(),
///     },
///     ..Default::default()
/// };
///
/// let client = R25Client::new(config)?;
/// let blank = client.create_blank_event().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct R25Client {
    http: Arc<HttpClient>,
    config: R25Config,
}

impl R25Client {
    /// Creates a new R25 client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: R25Config) -> Result<Self, R25Error> {
        let http = HttpClient::new(config.clone())?;
        Ok(Self {
            http: Arc::new(http),
            config,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &R25Config {
        &self.config
    }

    /// Asks the server for a blank editable event document.
    ///
    /// The returned document carries a freshly allocated event id and a
    /// placeholder profile, with every node in `new` status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server does not answer 201.
    pub async fn create_blank_event(&self) -> Result<Document, R25Error> {
        let resource = "events.xml";
        let body = self
            .http
            .execute(
                self.http.build_request(Method::POST, resource),
                resource,
                &[StatusCode::CREATED],
            )
            .await?;
        parse_data(&body)
    }

    /// Fetches an existing event in edit mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an event document.
    pub async fn fetch_editable_event(&self, event_id: EventId) -> Result<Document, R25Error> {
        let resource = "event.xml";
        let id = event_id.to_string();
        let req = self
            .http
            .build_request(Method::GET, resource)
            .query(&[("event_id", id.as_str()), ("mode", "edit")]);
        let body = self.http.execute(req, resource, &[StatusCode::OK]).await?;
        parse_data(&body)
    }

    /// Submits an edited event document and classifies the server's answer.
    ///
    /// Throttling is reported as [`WriteOutcome::RateLimited`] rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or malformed responses.
    pub async fn submit_event(
        &self,
        event_id: EventId,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error> {
        let resource = "event.xml";
        let id = event_id.to_string();
        let req = self
            .http
            .build_request(Method::PUT, resource)
            .query(&[("event_id", id.as_str()), ("return_doc", "T")])
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(doc.to_xml()?);

        tracing::debug!(%event_id, "submitting event");
        match self.http.execute(req, resource, WRITE_STATUSES).await {
            Ok(body) => WriteOutcome::from_xml(&body),
            Err(R25Error::RateLimited(_)) => Ok(WriteOutcome::RateLimited),
            Err(e) => Err(e),
        }
    }

    /// Deletes an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_event(&self, event_id: EventId) -> Result<(), R25Error> {
        let resource = "event.xml";
        let id = event_id.to_string();
        let req = self
            .http
            .build_request(Method::DELETE, resource)
            .query(&[("event_id", id.as_str())]);
        self.http.execute(req, resource, &[StatusCode::OK]).await?;
        tracing::info!(%event_id, "deleted event");
        Ok(())
    }

    /// Lists events with their reservations.
    ///
    /// `params` are passed as query parameters, e.g. `("starts_with", "7_")`
    /// or `("alien_uid", "BKS_RSRV_7")`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing cannot be read.
    pub async fn list_events(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Vec<EventSummary>, R25Error> {
        let resource = "events.xml";
        let req = self
            .http
            .build_request(Method::GET, resource)
            .query(params)
            .query(&[("scope", "extended"), ("include", "reservations")]);
        let body = self.http.execute(req, resource, &[StatusCode::OK]).await?;
        EventSummary::list_from(&parse_data(&body)?)
    }

    /// Looks up a space by its short name.
    ///
    /// Returns `None` if no space has that short name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing cannot be read.
    pub async fn space_by_short_name(&self, short_name: &str) -> Result<Option<SpaceId>, R25Error> {
        let resource = "spaces.xml";
        let req = self
            .http
            .build_request(Method::GET, resource)
            .query(&[("short_name", short_name)]);
        let body = self.http.execute(req, resource, &[StatusCode::OK]).await?;
        Ok(space_ids_from(&parse_data(&body)?)?.into_iter().next())
    }

    /// Lists the favorite objects of a type, see [`crate::object_type`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing cannot be read.
    pub async fn favorites(&self, object_type: u32) -> Result<Vec<FavoriteObject>, R25Error> {
        let resource = "favorites.xml";
        let ty = object_type.to_string();
        let req = self
            .http
            .build_request(Method::GET, resource)
            .query(&[("object_type", ty.as_str())]);
        let body = self.http.execute(req, resource, &[StatusCode::OK]).await?;
        FavoriteObject::list_from(&parse_data(&body)?)
    }

    /// Marks an object as favorite.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or malformed responses.
    pub async fn add_favorite(
        &self,
        object_type: u32,
        object_id: u64,
    ) -> Result<WriteOutcome, R25Error> {
        let resource = "favorites.xml";
        let (ty, id) = (object_type.to_string(), object_id.to_string());
        let req = self
            .http
            .build_request(Method::PUT, resource)
            .query(&[("object_type", ty.as_str()), ("object_id", id.as_str())])
            .body(String::new());
        match self.http.execute(req, resource, WRITE_STATUSES).await {
            Ok(body) if body.trim().is_empty() => Ok(WriteOutcome::Success(Document::new(
                "r25:favorites",
            ))),
            Ok(body) => WriteOutcome::from_xml(&body),
            Err(R25Error::RateLimited(_)) => Ok(WriteOutcome::RateLimited),
            Err(e) => Err(e),
        }
    }

    /// Removes an object from the favorites.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_favorite(&self, object_type: u32, object_id: u64) -> Result<(), R25Error> {
        let resource = "favorites.xml";
        let (ty, id) = (object_type.to_string(), object_id.to_string());
        let req = self
            .http
            .build_request(Method::DELETE, resource)
            .query(&[("object_type", ty.as_str()), ("object_id", id.as_str())]);
        self.http.execute(req, resource, &[StatusCode::OK]).await?;
        Ok(())
    }

    /// Fetches a saved space search.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a search document.
    pub async fn fetch_space_search(&self, query_id: &str) -> Result<Document, R25Error> {
        let resource = "space_search.xml";
        let req = self
            .http
            .build_request(Method::GET, resource)
            .query(&[("query_id", query_id)]);
        let body = self.http.execute(req, resource, &[StatusCode::OK]).await?;
        parse_data(&body)
    }

    /// Submits an edited saved space search.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or malformed responses.
    pub async fn submit_space_search(
        &self,
        query_id: &str,
        doc: &Document,
    ) -> Result<WriteOutcome, R25Error> {
        let resource = "space_search.xml";
        let req = self
            .http
            .build_request(Method::PUT, resource)
            .query(&[("query_id", query_id)])
            .header("Content-Type", "text/xml; charset=utf-8")
            .body(doc.to_xml()?);
        match self.http.execute(req, resource, WRITE_STATUSES).await {
            Ok(body) => WriteOutcome::from_xml(&body),
            Err(R25Error::RateLimited(_)) => Ok(WriteOutcome::RateLimited),
            Err(e) => Err(e),
        }
    }
}

fn parse_data(body: &str) -> Result<Document, R25Error> {
    let doc = Document::from_xml(body)?;
    ensure_not_html(&doc)?;
    Ok(doc)
}
