// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client for the external booking source.

use std::time::Duration;

use async_trait::async_trait;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::{Timestamp, Zoned};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::model::{Booking, Room, Status, r25_datetime};

/// Booking source errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("booking source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("booking source answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid booking source time: {0}")]
    Time(String),

    #[error("booking source configuration: {0}")]
    Config(String),
}

/// Which bookings a run considers, besides the time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingFilter {
    #[default]
    All,
    /// Only bookings changed on or after the date.
    ChangedSince(Date),
    /// One booking, regardless of the window.
    Booking(u64),
    /// The bookings of one group inside the window.
    Group(u64),
}

/// A listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingQuery {
    pub start: Zoned,
    /// `None` for no upper bound.
    pub end: Option<Zoned>,
    pub status_ids: Vec<u64>,
    pub filter: BookingFilter,
}

/// Listing operations of the booking source.
#[async_trait]
pub trait BookingSource: Send + Sync {
    async fn list_bookings(&self, query: &BookingQuery) -> Result<Vec<Booking>, SourceError>;

    async fn list_statuses(&self) -> Result<Vec<Status>, SourceError>;

    async fn list_rooms(&self) -> Result<Vec<Room>, SourceError>;
}

/// [`BookingSource`] backed by the source's JSON API.
#[derive(Debug, Clone)]
pub struct HttpBookingSource {
    client: reqwest::Client,
    base_url: String,
    time_zone: TimeZone,
}

impl HttpBookingSource {
    /// Creates a client from the `[core.source]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key or time zone is invalid, or the HTTP
    /// client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| SourceError::Config(format!("invalid API key: {e}")))?;
        headers.insert("X-API-Key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let time_zone = match &config.time_zone {
            Some(name) => TimeZone::get(name)
                .map_err(|e| SourceError::Config(format!("unknown time zone {name}: {e}")))?,
            None => TimeZone::system(),
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            time_zone,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Vec<BookingRaw>, SourceError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url, "querying booking source");
        let response = self.client.post(&url).json(body).send().await?;
        Self::read_json(response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(url, "querying booking source");
        let response = self.client.get(&url).send().await?;
        Self::read_json(response).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SourceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    fn convert(&self, raw: BookingRaw) -> Result<Booking, SourceError> {
        Ok(Booking {
            id: raw.booking_id,
            group_id: raw.event_number,
            room_id: raw.room_id,
            room_description: raw.room_description,
            start: parse_time(&raw.date_time_start, &self.time_zone)?,
            end: parse_time(&raw.date_time_end, &self.time_zone)?,
            status_id: raw.status_id,
            event_name: raw.event_name,
            date_changed: raw
                .date_changed
                .as_deref()
                .map(|t| parse_time(t, &self.time_zone))
                .transpose()?,
            setup_minutes: raw.setup_minutes,
            teardown_minutes: raw.teardown_minutes,
        })
    }
}

#[async_trait]
impl BookingSource for HttpBookingSource {
    async fn list_bookings(&self, query: &BookingQuery) -> Result<Vec<Booking>, SourceError> {
        let raws = match query.filter {
            BookingFilter::Booking(id) => {
                self.post(
                    "/api/PublicEvent/geteventswithbookingdetails",
                    &BookingIdsRequest { booking_ids: [id] },
                )
                .await?
            }
            BookingFilter::All | BookingFilter::Group(_) | BookingFilter::ChangedSince(_) => {
                let min_date_changed = match query.filter {
                    BookingFilter::ChangedSince(date) => Some(date.strftime("%Y-%m-%d").to_string()),
                    _ => None,
                };
                let request = EventsRequest {
                    start: r25_datetime(&query.start),
                    end: match &query.end {
                        Some(end) => r25_datetime(end),
                        None => UNBOUNDED_END.to_string(),
                    },
                    status_ids: &query.status_ids,
                    min_date_changed,
                };
                self.post("/api/PublicEvent/getevents", &request).await?
            }
        };

        let bookings = raws
            .into_iter()
            .map(|raw| self.convert(raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match query.filter {
            BookingFilter::Group(group_id) => bookings
                .into_iter()
                .filter(|b| b.group_id == group_id)
                .collect(),
            _ => bookings,
        })
    }

    async fn list_statuses(&self) -> Result<Vec<Status>, SourceError> {
        let raws: Vec<StatusRaw> = self.get("/api/PublicConfiguration/Statuses").await?;
        Ok(raws
            .into_iter()
            .map(|s| Status {
                id: s.status_id,
                description: s.description,
                blocks_space: s.blocks_space,
            })
            .collect())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, SourceError> {
        let raws: Vec<RoomRaw> = self.get("/api/PublicConfiguration/Rooms").await?;
        Ok(raws
            .into_iter()
            .map(|r| Room {
                id: r.room_id,
                description: r.description,
                active: r.active,
            })
            .collect())
    }
}

/// Sent as the window end when the run has no upper bound.
const UNBOUNDED_END: &str = "9999-12-31T00:00:00+00:00";

/// Reads a source timestamp, interpreting offset-less values in `tz`.
fn parse_time(text: &str, tz: &TimeZone) -> Result<Zoned, SourceError> {
    if let Ok(zoned) = text.parse::<Zoned>() {
        return Ok(zoned);
    }
    if let Ok(ts) = text.parse::<Timestamp>() {
        return Ok(ts.to_zoned(tz.clone()));
    }
    text.parse::<DateTime>()
        .and_then(|dt| dt.to_zoned(tz.clone()))
        .map_err(|e| SourceError::Time(format!("{text}: {e}")))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventsRequest<'a> {
    start: String,
    end: String,
    status_ids: &'a [u64],
    #[serde(skip_serializing_if = "Option::is_none")]
    min_date_changed: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingIdsRequest {
    booking_ids: [u64; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingRaw {
    booking_id: u64,
    event_number: u64,
    room_id: u64,
    #[serde(default)]
    room_description: String,
    date_time_start: String,
    date_time_end: String,
    status_id: u64,
    #[serde(default)]
    event_name: String,
    #[serde(default)]
    date_changed: Option<String>,
    #[serde(default)]
    setup_minutes: i64,
    #[serde(default)]
    teardown_minutes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRaw {
    status_id: u64,
    #[serde(default)]
    description: String,
    #[serde(default = "default_true")]
    blocks_space: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomRaw {
    room_id: u64,
    #[serde(default)]
    description: String,
    #[serde(default = "default_true")]
    active: bool,
}

const fn default_true() -> bool {
    true
}
