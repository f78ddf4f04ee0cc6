// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

use booksync_r25::R25Client;
use jiff::Zoned;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use tokio::fs;

use crate::config::Config;
use crate::directory::SpaceDirectory;
use crate::error::SyncError;
use crate::localdb::LocalDb;
use crate::reconcile::{Reconciler, RunMode, RunSummary, Settings};
use crate::remote::Remote;
use crate::report::{FileSink, LogSink, REPORT_SUBJECT, Report, ReportSink};
use crate::source::{BookingFilter, BookingQuery, BookingSource, HttpBookingSource};
use crate::status_map::{StatusRules, StatusTable};

/// Upper bound of the booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// Bookings starting before this date.
    Until(Date),
    /// No upper bound.
    Unbounded,
}

impl fmt::Display for WindowEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowEnd::Until(date) => date.fmt(f),
            WindowEnd::Unbounded => f.write_str("max"),
        }
    }
}

/// What one run looks at and what it may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub start: Date,
    pub end: WindowEnd,
    pub filter: BookingFilter,
    pub mode: RunMode,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub summary: RunSummary,
    pub report: Report,
}

/// The batch entry point: loads lookups, fetches bookings, reconciles and reports.
pub struct Syncer {
    config: Config,
    db: LocalDb,
    remote: Arc<dyn Remote>,
    source: Arc<dyn BookingSource>,
    sink: Box<dyn ReportSink>,
    time_zone: TimeZone,
}

impl Syncer {
    /// Creates a syncer with the real R25 client, booking source and report sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the local store
    /// cannot be opened.
    pub async fn new(mut config: Config) -> Result<Self, SyncError> {
        config
            .normalize()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        if let Some(dir) = &config.state_dir {
            tracing::debug!(path = %dir.display(), "ensuring state directory exists");
            fs::create_dir_all(dir).await?;
        }
        let db = LocalDb::open(config.db_path().as_deref()).await?;

        let remote = Arc::new(R25Client::new(config.r25.clone())?);
        let source = Arc::new(HttpBookingSource::new(&config.source)?);
        let sink: Box<dyn ReportSink> = match &config.report.path {
            Some(path) => Box::new(FileSink::new(path)),
            None => Box::new(LogSink),
        };
        Self::with_parts(config, db, remote, source, sink)
    }

    /// Creates a syncer from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured time zone is unknown.
    pub fn with_parts(
        config: Config,
        db: LocalDb,
        remote: Arc<dyn Remote>,
        source: Arc<dyn BookingSource>,
        sink: Box<dyn ReportSink>,
    ) -> Result<Self, SyncError> {
        let time_zone = match &config.source.time_zone {
            Some(name) => TimeZone::get(name)
                .map_err(|e| SyncError::Config(format!("unknown time zone {name}: {e}")))?,
            None => TimeZone::system(),
        };
        Ok(Self {
            config,
            db,
            remote,
            source,
            sink,
            time_zone,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default window end for a start date.
    pub fn default_end(&self, start: Date) -> WindowEnd {
        let days = self.config.sync.default_window_days;
        match jiff::Span::new()
            .try_days(days)
            .and_then(|span| start.checked_add(span))
        {
            Ok(end) => WindowEnd::Until(end),
            Err(_) => WindowEnd::Unbounded,
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// The report is sent only in update mode and only when it has messages,
    /// also when setup failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookups or bookings cannot be loaded.
    /// Per-group failures are reported instead, and a report that cannot be
    /// delivered is logged.
    pub async fn run(&self, options: &RunOptions) -> Result<RunResult, SyncError> {
        let mut report = Report::new();
        let result = self.run_inner(options, &mut report).await;
        if let Err(e) = &result {
            report.warn(format!("Sync aborted: {e}"));
        }

        if options.mode.update && !report.is_empty() {
            if let Err(e) = self.sink.send(REPORT_SUBJECT, &report.body()).await {
                tracing::error!(err = %e, "failed to deliver the report");
            }
        }

        let summary = result?;
        tracing::info!("{summary}");
        Ok(RunResult { summary, report })
    }

    async fn run_inner(
        &self,
        options: &RunOptions,
        report: &mut Report,
    ) -> Result<RunSummary, SyncError> {
        tracing::info!(
            "Considering bookings from {} to {}",
            options.start,
            options.end
        );
        if let BookingFilter::ChangedSince(date) = options.filter {
            tracing::info!("\tand changed since {date}");
        }

        let rooms = self.source.list_rooms().await?;
        let directory =
            SpaceDirectory::refresh(self.db.space_assignments.clone(), &*self.remote, &rooms)
                .await?;

        let statuses = self.source.list_statuses().await?;
        let rules = StatusRules::from_config(&self.config.sync);
        let table = StatusTable::refresh(&self.db.status_maps, &statuses, &rules).await?;

        if let Err(e) = directory
            .sync_favorites(
                &*self.remote,
                &self.config.sync.favorites,
                options.mode.update,
            )
            .await
        {
            report.warn(format!("Error syncing favorite spaces: {e}"));
        }

        let query = BookingQuery {
            start: self.midnight(options.start)?,
            end: match options.end {
                WindowEnd::Until(date) => Some(self.midnight(date)?),
                WindowEnd::Unbounded => None,
            },
            status_ids: table.search_statuses(),
            filter: options.filter,
        };
        match options.filter {
            BookingFilter::Booking(id) => tracing::info!("Looking for single booking {id}"),
            BookingFilter::Group(id) => tracing::info!("Looking for booking group {id}"),
            BookingFilter::ChangedSince(_) => tracing::info!("Looking for changed bookings"),
            BookingFilter::All => tracing::info!("Looking for all bookings"),
        }
        let bookings = self.source.list_bookings(&query).await?;
        tracing::info!("Found {} bookings", bookings.len());

        let settings = Settings::from_config(&self.config.sync);
        let reconciler = Reconciler::new(
            &*self.remote,
            &directory,
            &table,
            &settings,
            options.mode,
        );
        Ok(reconciler.run(&bookings, report).await)
    }

    fn midnight(&self, date: Date) -> Result<Zoned, SyncError> {
        date.to_zoned(self.time_zone.clone())
            .map_err(|e| SyncError::Config(format!("invalid window date {date}: {e}")))
    }

    /// Closes the local store.
    pub async fn close(self) {
        self.db.close().await;
    }
}

impl fmt::Debug for Syncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Syncer")
            .field("config", &self.config)
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}
