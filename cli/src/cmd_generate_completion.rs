// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::{error::Error, io};

use clap::{ArgMatches, Command, ValueEnum, arg, value_parser};
use clap_complete::generate;

use crate::Cli;

/// Print a completion script for the booksync command line.
#[derive(Debug, Clone, Copy)]
pub struct CmdGenerateCompletion {
    pub shell: Shell,
}

impl CmdGenerateCompletion {
    pub const NAME: &str = "generate-completion";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Generate shell completion for the specified shell")
            .hide(true)
            .arg(
                arg!(shell: <SHELL> "The shell generator to use")
                    .value_parser(value_parser!(Shell)),
            )
    }

    pub fn from(matches: &ArgMatches) -> Self {
        let shell = matches.get_one::<Shell>("shell").copied().unwrap_or_default();
        Self { shell }
    }

    pub fn run(self) -> Result<(), Box<dyn Error>> {
        tracing::debug!(?self, "generating shell completion...");
        self.generate(&mut io::stdout());
        Ok(())
    }

    pub fn generate(self, buf: &mut impl io::Write) {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        match self.shell.builtin() {
            Some(shell) => generate(shell, &mut cmd, name, buf),
            None => generate(clap_complete_nushell::Nushell, &mut cmd, name, buf),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    #[default]
    Bash,
    Elvish,
    Fish,
    Nushell,
    #[clap(name = "powershell")]
    #[allow(clippy::enum_variant_names)]
    PowerShell,
    Zsh,
}

impl Shell {
    /// The generator shipped with `clap_complete`, `None` for Nushell.
    fn builtin(self) -> Option<clap_complete::Shell> {
        use clap_complete::Shell as ClapShell;
        match self {
            Shell::Bash => Some(ClapShell::Bash),
            Shell::Elvish => Some(ClapShell::Elvish),
            Shell::Fish => Some(ClapShell::Fish),
            Shell::PowerShell => Some(ClapShell::PowerShell),
            Shell::Zsh => Some(ClapShell::Zsh),
            Shell::Nushell => None,
        }
    }
}
