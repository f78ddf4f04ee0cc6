// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! booksync - reconcile room bookings into R25 events

use std::process::ExitCode;

use booksync_cli::run;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}
