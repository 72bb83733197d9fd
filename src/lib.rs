//! Scaffolding for command-line programs: arguments, subcommands, an INI
//! config file and logging, resolved into one configuration.
//!
//! Clapscope builds a [clap](https://docs.rs/clap) parser from declarations,
//! reads `~/.<prog>.ini`, merges both into a two-level [`Configuration`]
//! (section → option → [`Value`]) and sets up
//! [tracing](https://docs.rs/tracing) output from the result. Your handler
//! then runs with everything resolved.
//!
//! ```ignore
//! let cli = Cli::new("Greets people.");
//! cli.version(env!("CARGO_PKG_VERSION"))?
//!     .subcommand("hello", "Say hello.", |ctx| {
//!         let name = ctx.config_mut().get_option("hello", "name").to_string();
//!         tracing::info!("{{fg_blue}}Hello {name}!");
//!         Ok(0)
//!     })?
//!     .subcommand_argument("hello", Argument::new(["-n", "--name"]).default("World"))?;
//! std::process::exit(cli.main());
//! ```
//!
//! # Precedence
//!
//! Every option has up to three sources:
//!
//! ```text
//! Argument default      Argument::default(...)
//!        ↑ overridden by
//! Config file           [section] option = value
//!        ↑ overridden by
//! Explicit flag         --option value, typed by the user
//! ```
//!
//! The hard part is the last arrow. clap fills in defaults, so after parsing
//! `--name World` and "no flag, default World" look the same. Clapscope
//! therefore keeps every declaration twice: a *real* parser tree with
//! defaults, and a *shadow* tree with no defaults at all. Both trees parse the
//! same argv. A destination that is set in the shadow result was typed on the
//! command line, and its real value overwrites whatever the file said.
//! Otherwise the default only fills in options the file left unset.
//!
//! For a `--color`/`--no-color` pair the shadow tree turns the disabling flag
//! into plain presence detection, so `--no-color` still reads as "explicitly
//! given" even though its value is `false`.
//!
//! # Destinations and sections
//!
//! An argument's destination is `<section>_<option>`. Root arguments live in
//! the `general` section; subcommand arguments live in a section named after
//! the subcommand. `--log-file` declared at the root resolves to
//! `general.log_file`; `-n/--name` on `hello` resolves to `hello.name`.
//! Subcommand names may not contain `_`, so the first `_` always splits the
//! section from the option.
//!
//! # The configuration container
//!
//! [`Configuration::get_section`] and [`Configuration::get_option`] never
//! fail: a missing section is created empty and a missing option reads as
//! [`Value::Absent`] (and is inserted as such). Use
//! [`Configuration::lookup`] to look without touching anything, or
//! [`Configuration::section_as`] to deserialize a whole section into your
//! own struct.
//!
//! Values read from the file are coerced: `yes`/`true`/`on`/`1` become
//! `true`, `no`/`false`/`none`/`off`/`0` become `false`, digit strings become
//! integers or decimals, everything else stays a string.
//!
//! # Built-in flags
//!
//! Every program gets these in the `general` section:
//!
//! | Flag | Option |
//! |------|--------|
//! | `-V`, `--version` | prints the version |
//! | `-v`, `--verbose` | `verbose`: DEBUG on the console |
//! | `--color` / `--no-color` | `color`: emoji levels and ANSI colors |
//! | `--log-fmt`, `--log-file-fmt`, `--datetime-fmt` | line templates |
//! | `--log-file` | `log_file`: also append DEBUG lines to this file |
//! | `-c`, `--config-file` | which INI file to read and write |
//! | `--save-config` | write the resolved configuration back |
//!
//! Declaring an argument that reuses one of these flags takes the flag over;
//! the built-in keeps whatever flags remain.
//!
//! # Lifecycle
//!
//! Declarations are only accepted before the run starts. [`Cli::enter`]
//! parses, reads the config file, resolves, installs logging and returns a
//! [`Session`]; [`Session::run`] dispatches to the selected subcommand's
//! handler or the root entrypoint; dropping the session finishes the run.
//! [`Cli::main`] does all of it and maps the outcome to an exit code:
//! the handler's own code on success, clap's code for help and usage errors,
//! and [`EXIT_FAILURE_CODE`] for anything else.
//!
//! # Saving
//!
//! `--save-config` (or [`RunContext::save_config`]) writes the resolved
//! configuration to the config file through a temp file and a rename, so the
//! file is either the old one or the complete new one. `general.save_config`
//! itself is never written.
//!
//! # Error handling
//!
//! Fallible operations return [`ClapscopeError`]; handlers return
//! `anyhow::Result<i32>` so they can use `?` on anything. See the [`error`]
//! module for the full set.

pub mod ansi;
pub mod error;
pub mod file;
pub mod logging;
pub mod types;

mod config;
mod declare;
mod lifecycle;
mod parse;
mod registry;
mod resolve;
mod value;

#[cfg(test)]
mod fixtures;

pub use config::{Configuration, Section};
pub use declare::{Argument, DEST_SEPARATOR};
pub use error::ClapscopeError;
pub use lifecycle::{Cli, EXIT_FAILURE_CODE, Handler, RunContext, Session};
pub use logging::LogSettings;
pub use parse::{ArgNamespace, expand_response_files};
pub use registry::ROOT_SECTION;
pub use types::{Action, FormatMode, Phase, ValueKind};
pub use value::{Value, coerce};
