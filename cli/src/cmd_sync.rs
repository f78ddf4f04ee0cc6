// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use booksync_core::{BookingFilter, RunMode, RunOptions, Syncer, WindowEnd};
use clap::{Arg, ArgGroup, ArgMatches, Command};
use colored::Colorize;
use jiff::civil::Date;

use crate::arg::{FilterArgs, ModeArgs, WindowArgs, today};

/// One reconciliation pass over a booking window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdSync {
    pub start: Option<Date>,
    pub end: Option<WindowEnd>,
    pub filter: BookingFilter,
    pub mode: RunMode,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Sync bookings into R25, the default command")
            .args(Self::args())
            .group(Self::group())
    }

    pub fn args() -> [Arg; 7] {
        [
            WindowArgs::start(),
            WindowArgs::end(),
            FilterArgs::changed(),
            FilterArgs::booking(),
            FilterArgs::event(),
            ModeArgs::delete(),
            ModeArgs::update(),
        ]
    }

    pub fn group() -> ArgGroup {
        FilterArgs::group()
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            start: WindowArgs::get_start(matches),
            end: WindowArgs::get_end(matches),
            filter: FilterArgs::get(matches),
            mode: ModeArgs::get(matches),
        }
    }

    /// Resolve the defaults: the window starts today and spans the configured days.
    pub fn options(&self, syncer: &Syncer) -> RunOptions {
        let start = self.start.unwrap_or_else(today);
        RunOptions {
            start,
            end: self.end.unwrap_or_else(|| syncer.default_end(start)),
            filter: self.filter,
            mode: self.mode,
        }
    }

    pub async fn run(self, syncer: &Syncer) -> Result<(), Box<dyn Error>> {
        let options = self.options(syncer);
        tracing::debug!(?options, "running sync...");

        // The report has already been delivered when the run fails.
        match syncer.run(&options).await {
            Ok(result) => {
                println!("{}", result.summary);
                if !options.mode.update {
                    println!(
                        "{} nothing was written to R25, pass --update to apply",
                        "Dry run:".yellow()
                    );
                }
            }
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
        Ok(())
    }
}
