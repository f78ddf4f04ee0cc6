// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use booksync_core::{BookingFilter, RunMode, WindowEnd};
use clap::{Arg, ArgGroup, ArgMatches, arg};
use clap_num::number_range;
use jiff::{Zoned, civil::Date};

/// Word accepted wherever a date is expected.
const TODAY: &str = "today";

/// Window end meaning "no upper bound".
const MAX: &str = "max";

#[derive(Debug, Clone, Copy)]
pub struct WindowArgs;

impl WindowArgs {
    pub fn start() -> Arg {
        arg!(-s --start <DATE> "Start date of the booking window, defaults to today")
            .value_parser(parse_date)
    }

    pub fn get_start(matches: &ArgMatches) -> Option<Date> {
        matches.get_one("start").copied()
    }

    pub fn end() -> Arg {
        arg!(-e --end <DATE> "End date of the booking window, or `max` for no upper bound")
            .long_help(
                "\
End date of the booking window, exclusive. `max` removes the upper bound. Defaults to the start \
date plus `sync.default_window_days`.",
            )
            .value_parser(parse_end)
    }

    pub fn get_end(matches: &ArgMatches) -> Option<WindowEnd> {
        matches.get_one("end").copied()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FilterArgs;

impl FilterArgs {
    pub const GROUP: &str = "filter";

    pub fn changed() -> Arg {
        arg!(-c --changed [DATE] "Only bookings changed since the date, today if no date is given")
            .value_parser(parse_date)
            .num_args(0..=1)
            .default_missing_value(TODAY)
    }

    pub fn booking() -> Arg {
        arg!(-b --booking <ID> "Only the booking with this id").value_parser(clap::value_parser!(u64))
    }

    pub fn event() -> Arg {
        arg!(-r --event <ID> "Only the bookings of this booking group")
            .value_parser(clap::value_parser!(u64))
    }

    /// The filters are mutually exclusive.
    pub fn group() -> ArgGroup {
        ArgGroup::new(Self::GROUP)
            .args(["changed", "booking", "event"])
            .multiple(false)
    }

    pub fn get(matches: &ArgMatches) -> BookingFilter {
        if let Some(id) = matches.get_one::<u64>("booking") {
            BookingFilter::Booking(*id)
        } else if let Some(id) = matches.get_one::<u64>("event") {
            BookingFilter::Group(*id)
        } else if let Some(date) = matches.get_one::<Date>("changed") {
            BookingFilter::ChangedSince(*date)
        } else {
            BookingFilter::All
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModeArgs;

impl ModeArgs {
    pub fn delete() -> Arg {
        arg!(-d --delete "Delete the matching R25 events instead of updating them")
    }

    pub fn update() -> Arg {
        arg!(-u --update "Write changes to R25, otherwise only log what would change")
    }

    pub fn get(matches: &ArgMatches) -> RunMode {
        RunMode {
            delete: matches.get_flag("delete"),
            update: matches.get_flag("update"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommonArgs;

impl CommonArgs {
    pub fn verbosity() -> Arg {
        fn from_0_to_3(s: &str) -> Result<u8, String> {
            number_range(s, 0, 3)
        }

        arg!(-v --verbosity <LEVEL> "Log verbosity: 0 warn, 1 info, 2 debug, 3 debug everything")
            .value_parser(from_0_to_3)
            .default_value("1")
            .global(true)
    }

    pub fn get_verbosity(matches: &ArgMatches) -> u8 {
        matches.get_one("verbosity").copied().unwrap_or(1)
    }
}

fn parse_date(s: &str) -> Result<Date, String> {
    if s.eq_ignore_ascii_case(TODAY) {
        return Ok(today());
    }
    s.parse()
        .map_err(|e| format!("Invalid date `{s}`, expected YYYY-MM-DD or `{TODAY}`: {e}"))
}

fn parse_end(s: &str) -> Result<WindowEnd, String> {
    if s.eq_ignore_ascii_case(MAX) {
        Ok(WindowEnd::Unbounded)
    } else {
        parse_date(s).map(WindowEnd::Until)
    }
}

/// Today's date in the system time zone.
pub fn today() -> Date {
    Zoned::now().date()
}
