// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, ffi::OsString, path::PathBuf, process::ExitCode};

use booksync_core::{APP_NAME, Syncer};
use clap::{ArgMatches, Command, ValueHint, arg, builder::styling, crate_version, value_parser};
use colored::Colorize;

use crate::arg::CommonArgs;
use crate::cmd_generate_completion::CmdGenerateCompletion;
use crate::cmd_sync::CmdSync;
use crate::config::parse_config;
use crate::logging;

/// Run the booksync command-line interface.
///
/// Only malformed arguments and configuration fail the process, a failed
/// sync is reported and logged instead.
pub async fn run() -> ExitCode {
    let cli = match Cli::parse() {
        Ok(cli) => cli,
        Err(e) => {
            println!("{} {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(cli.verbosity);
    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{} {}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

/// Command-line interface
#[derive(Debug)]
pub struct Cli {
    /// Path to the configuration file
    pub config: Option<PathBuf>,

    /// Log verbosity, 0 to 3
    pub verbosity: u8,

    /// The command to execute
    pub command: Commands,
}

impl Cli {
    /// Create the command-line interface
    pub fn command() -> Command {
        const STYLES: styling::Styles = styling::Styles::styled()
            .header(styling::AnsiColor::Green.on_default().bold())
            .usage(styling::AnsiColor::Green.on_default().bold())
            .literal(styling::AnsiColor::Blue.on_default().bold())
            .placeholder(styling::AnsiColor::Cyan.on_default());

        Command::new(APP_NAME)
            .about("Reconcile room bookings from the scheduling feed into R25 events.")
            .author("Zexin Yuan <aim@yzx9.xyz>")
            .version(crate_version!())
            .styles(STYLES)
            .subcommand_required(false) // allow default to sync
            .arg_required_else_help(false)
            .arg(
                // `-c` belongs to `--changed`
                arg!(--config <CONFIG> "Path to the configuration file")
                    .long_help(
                        "\
Path to the configuration file. Defaults to $XDG_CONFIG_HOME/booksync/config.toml on Linux and \
MacOS, %LOCALAPPDATA%/booksync/config.toml on Windows.",
                    )
                    .value_parser(value_parser!(PathBuf))
                    .value_hint(ValueHint::FilePath)
                    .global(true),
            )
            .arg(CommonArgs::verbosity())
            .args(CmdSync::args())
            .group(CmdSync::group())
            .subcommand(CmdSync::command())
            .subcommand(CmdGenerateCompletion::command())
    }

    /// Parse the command-line arguments
    pub fn parse() -> Result<Self, Box<dyn Error>> {
        let commands = Self::command();
        let matches = commands.get_matches();
        Self::from(matches)
    }

    /// Parse the specified arguments
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let commands = Self::command();
        let matches = commands.try_get_matches_from(args)?;
        Self::from(matches)
    }

    /// Create a CLI instance from the `ArgMatches`
    pub fn from(matches: ArgMatches) -> Result<Self, Box<dyn Error>> {
        use Commands::*;
        let command = match matches.subcommand() {
            Some((CmdSync::NAME, matches)) => Sync(CmdSync::from(matches)),
            Some((CmdGenerateCompletion::NAME, matches)) => {
                GenerateCompletion(CmdGenerateCompletion::from(matches))
            }
            None => Sync(CmdSync::from(&matches)),
            Some((name, _)) => return Err(format!("Unknown command: {name}").into()),
        };

        let config = matches.get_one("config").cloned();
        let verbosity = CommonArgs::get_verbosity(&matches);
        Ok(Cli {
            config,
            verbosity,
            command,
        })
    }

    /// Run the command
    pub async fn run(self) -> Result<(), Box<dyn Error>> {
        self.command.run(self.config).await
    }
}

/// The commands available in the CLI
#[derive(Debug, Clone)]
pub enum Commands {
    /// Sync bookings into R25
    Sync(CmdSync),

    /// Generate shell completion
    GenerateCompletion(CmdGenerateCompletion),
}

impl Commands {
    /// Run the command with the given configuration
    pub async fn run(self, config: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
        use Commands::*;
        match self {
            Sync(a) => Self::run_sync(config, a).await,
            GenerateCompletion(a) => a.run(),
        }
    }

    async fn run_sync(config: Option<PathBuf>, cmd: CmdSync) -> Result<(), Box<dyn Error>> {
        tracing::debug!("parsing configuration...");
        let (core_config, _config) = parse_config(config).await?;
        let syncer = Syncer::new(core_config).await?;

        let result = cmd.run(&syncer).await;

        syncer.close().await;
        result
    }
}
