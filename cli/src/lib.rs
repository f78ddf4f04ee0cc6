// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end of booksync.

mod arg;
mod cli;
mod cmd_generate_completion;
mod cmd_sync;
mod config;
mod logging;

pub use crate::cli::{Cli, Commands, run};
pub use crate::cmd_generate_completion::{CmdGenerateCompletion, Shell};
pub use crate::cmd_sync::CmdSync;
pub use crate::config::{Config, parse_config};
