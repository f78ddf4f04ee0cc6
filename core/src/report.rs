// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Subject of the end-of-run report.
pub const REPORT_SUBJECT: &str = "booksync report";

/// Diagnostics accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    messages: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs a warning and keeps it for the report.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages joined by newlines.
    pub fn body(&self) -> String {
        self.messages.join("\n")
    }
}

/// Receiver of the end-of-run report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> io::Result<()>;
}

/// Writes the report to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn send(&self, subject: &str, body: &str) -> io::Result<()> {
        tracing::info!(subject, "{body}");
        Ok(())
    }
}

/// Appends the report to a file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSink for FileSink {
    async fn send(&self, subject: &str, body: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let stamp = jiff::Timestamp::now();
        file.write_all(format!("{subject} ({stamp})\n{body}\n\n").as_bytes())
            .await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "report written");
        Ok(())
    }
}
