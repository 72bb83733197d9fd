//! The lifecycle coordinator: declaration phase, the enter sequence, and the
//! run phase.
//!
//! ```text
//! Cli::new ──► Declaring ──enter()──► Running ──drop(Session)──► Finished
//!                 │                      │
//!      argument / subcommand /      parse argv on both trees,
//!      entrypoint / setters         read the config file, resolve,
//!                                   install logging, maybe save
//! ```
//!
//! All coordinator state sits behind one reentrant lock shared by every clone
//! of the [`Cli`] and by the [`RunContext`], so declarations made from several
//! threads and a config save from inside a handler never interleave.

use std::cell::RefCell;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, error, warn};

use crate::config::Configuration;
use crate::declare::Argument;
use crate::error::ClapscopeError;
use crate::file::{self, SAVE_CONFIG_OPTION, SaveOutcome};
use crate::logging::{self, DEFAULT_DATETIME_FMT, DEFAULT_LOG_FILE_FMT, DEFAULT_LOG_FMT, LogSettings};
use crate::parse::{self, ArgNamespace, Tree};
use crate::registry::{ParseOutcome, ROOT_SECTION, Registry};
use crate::resolve::{self, ResolveInput};
use crate::types::{Action, Phase};
use crate::value::Value;

/// Exit status for any error that escapes the run.
pub const EXIT_FAILURE_CODE: i32 = 255;

/// A root entrypoint or subcommand handler. The returned value becomes the
/// process exit code.
pub type Handler = Arc<dyn Fn(&mut RunContext) -> anyhow::Result<i32> + Send + Sync>;

type Shared = Arc<ReentrantMutex<RefCell<State>>>;

struct State {
    phase: Phase,
    registry: Registry,
    entrypoint: Option<Handler>,
    handlers: Vec<(String, Handler)>,
    config_file: Option<PathBuf>,
    install_logging: bool,
}

/// Coordinates declaration, parsing, config resolution and the run.
///
/// ```ignore
/// let cli = Cli::new("Greets people.");
/// cli.argument(Argument::new(["-n", "--name"]).default("World"))?
///     .entrypoint(|ctx| {
///         let name = ctx.config_mut().get_option("general", "name").to_string();
///         tracing::info!("Hello {name}!");
///         Ok(0)
///     })?;
/// std::process::exit(cli.main());
/// ```
#[derive(Clone)]
pub struct Cli {
    shared: Shared,
}

impl Cli {
    /// A new coordinator with the built-in `general` flags declared.
    pub fn new(description: &str) -> Self {
        let mut registry = Registry::new(description);
        for arg in builtin_arguments() {
            let declared = registry.declare(None, arg);
            debug_assert!(declared.is_ok(), "built-in flag rejected: {declared:?}");
        }

        let state = State {
            phase: Phase::Uninitialized,
            registry,
            entrypoint: None,
            handlers: Vec::new(),
            config_file: None,
            install_logging: true,
        };
        let cli = Self {
            shared: Arc::new(ReentrantMutex::new(RefCell::new(state))),
        };
        cli.shared.lock().borrow_mut().phase = Phase::Declaring;
        cli
    }

    pub fn phase(&self) -> Phase {
        self.shared.lock().borrow().phase
    }

    /// Run `f` on the state if declarations are still open.
    fn declaring<R>(
        &self,
        action: &str,
        f: impl FnOnce(&mut State) -> Result<R, ClapscopeError>,
    ) -> Result<R, ClapscopeError> {
        let guard = self.shared.lock();
        let mut state = guard.borrow_mut();
        if state.phase != Phase::Declaring {
            return Err(ClapscopeError::sequence(action));
        }
        f(&mut state)
    }

    /// Program name used in help output and for the default config path.
    /// Defaults to the file stem of argv[0].
    pub fn prog_name(&self, name: &str) -> Result<&Self, ClapscopeError> {
        self.declaring("set the program name", |state| {
            state.registry.set_prog(name);
            Ok(())
        })?;
        Ok(self)
    }

    /// Version printed by `-V`/`--version`.
    pub fn version(&self, version: &str) -> Result<&Self, ClapscopeError> {
        self.declaring("set the version", |state| {
            state.registry.set_version(version);
            Ok(())
        })?;
        Ok(self)
    }

    /// Config file to use when `--config-file` isn't given, instead of
    /// `~/.<prog>.ini`.
    pub fn config_file(&self, path: impl Into<PathBuf>) -> Result<&Self, ClapscopeError> {
        let path = path.into();
        self.declaring("set the config file", |state| {
            state.config_file = Some(path);
            Ok(())
        })?;
        Ok(self)
    }

    /// Whether entering installs the global log subscriber. On by default.
    pub fn install_logging(&self, install: bool) -> Result<&Self, ClapscopeError> {
        self.declaring("change logging setup", |state| {
            state.install_logging = install;
            Ok(())
        })?;
        Ok(self)
    }

    /// Register the handler that runs when no subcommand is selected.
    pub fn entrypoint<F>(&self, handler: F) -> Result<&Self, ClapscopeError>
    where
        F: Fn(&mut RunContext) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        self.declaring("register an entrypoint", |state| {
            state.entrypoint = Some(Arc::new(handler));
            Ok(())
        })?;
        Ok(self)
    }

    /// Declare an argument in the root namespace; it lands in the `general`
    /// section.
    pub fn argument(&self, arg: Argument) -> Result<&Self, ClapscopeError> {
        self.declaring("declare an argument", |state| {
            state.registry.declare(None, arg)
        })?;
        Ok(self)
    }

    /// Register a subcommand. Its help line is the first non-blank line of
    /// `doc`. Registering the same name again replaces the handler.
    pub fn subcommand<F>(&self, name: &str, doc: &str, handler: F) -> Result<&Self, ClapscopeError>
    where
        F: Fn(&mut RunContext) -> anyhow::Result<i32> + Send + Sync + 'static,
    {
        let help = doc.lines().map(str::trim).find(|line| !line.is_empty());
        let handler: Handler = Arc::new(handler);
        self.declaring("register a subcommand", |state| {
            state.registry.add_subcommand(name, help)?;
            match state.handlers.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing = handler,
                None => state.handlers.push((name.to_string(), handler)),
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Declare an argument in a registered subcommand's namespace; it lands
    /// in the section named after the subcommand.
    pub fn subcommand_argument(&self, subcommand: &str, arg: Argument) -> Result<&Self, ClapscopeError> {
        self.declaring("declare a subcommand argument", |state| {
            state.registry.declare(Some(subcommand), arg)
        })?;
        Ok(self)
    }

    /// Start the run phase: parse `argv`, read the config file, resolve the
    /// configuration, set up logging and save the config if asked to.
    ///
    /// Returns `Ok(None)` if a session is already running. A coordinator can
    /// only be entered once; entering after it finished is an error.
    pub fn enter<I, T>(&self, argv: I) -> Result<Option<Session>, ClapscopeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let guard = self.shared.lock();
        {
            let mut state = guard.borrow_mut();
            match state.phase {
                Phase::Running => {
                    debug!("Already running; ignoring nested enter. Was run() called before enter()?");
                    return Ok(None);
                }
                Phase::Finished => return Err(ClapscopeError::sequence("enter a finished run")),
                Phase::Uninitialized | Phase::Declaring => state.phase = Phase::Running,
            }
        }

        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        match self.prepare(argv) {
            Ok(context) => Ok(Some(Session { context })),
            Err(e) => {
                guard.borrow_mut().phase = Phase::Finished;
                Err(e)
            }
        }
    }

    fn prepare(&self, argv: Vec<OsString>) -> Result<RunContext, ClapscopeError> {
        let guard = self.shared.lock();
        let argv = parse::expand_response_files(argv)?;

        let mut state = guard.borrow_mut();
        if state.registry.prog().is_empty() {
            let prog = prog_from_argv0(argv.first().map(Path::new));
            state.registry.set_prog(&prog);
        }

        let ParseOutcome { real, shadow } = state.registry.parse(&argv)?;
        let command = state.registry.command(Tree::Real);
        let subcommand = real.subcommand().map(str::to_string);
        let entrypoint = subcommand
            .as_deref()
            .and_then(|name| state.handlers.iter().find(|(n, _)| n == name))
            .map(|(_, handler)| Arc::clone(handler))
            .or_else(|| state.entrypoint.clone());

        let config_file =
            resolve::config_file_path(state.config_file.as_deref(), &real, state.registry.prog());
        let file_entries = match &config_file {
            Some(path) => file::read(path)?,
            None => Vec::new(),
        };

        let input = ResolveInput {
            real,
            shadow,
            file_entries,
        };
        let mut config = Configuration::new();
        resolve::resolve(&input, &mut config);

        let install = state.install_logging;
        drop(state);

        if install {
            logging::install(&LogSettings::from_config(&config))?;
        }

        let ResolveInput { real, shadow, .. } = input;
        let context = RunContext {
            shared: Arc::clone(&self.shared),
            args: real,
            args_passed: shadow,
            config_file,
            subcommand,
            entrypoint,
            command,
            config,
        };

        let save = context
            .config
            .lookup(ROOT_SECTION, SAVE_CONFIG_OPTION)
            .is_some_and(Value::is_truthy);
        if save && let Err(e) = context.save_config() {
            warn!("Could not save config: {e}");
        }

        Ok(context)
    }

    /// Run from `argv` to an exit code: enter, dispatch, leave.
    ///
    /// Help and version requests print and return 0; usage errors print and
    /// return 2. Every other error is logged and returns
    /// [`EXIT_FAILURE_CODE`].
    pub fn main_from<I, T>(&self, argv: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let result = match self.enter(argv) {
            Ok(Some(mut session)) => session.run(),
            Ok(None) => Err(ClapscopeError::sequence("start a second run while one is active").into()),
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(code) => code,
            Err(err) => exit_code(&err),
        }
    }

    /// [`main_from`](Self::main_from) with the process arguments.
    pub fn main(&self) -> i32 {
        self.main_from(std::env::args_os())
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(ClapscopeError::Args(clap_err)) = err.downcast_ref::<ClapscopeError>() {
        if let Err(io) = clap_err.print() {
            error!("Could not print usage: {io}");
        }
        return clap_err.exit_code();
    }

    if tracing::dispatcher::has_been_set() {
        error!("{err:#}");
    } else {
        eprintln!("{err:#}");
    }
    EXIT_FAILURE_CODE
}

fn prog_from_argv0(argv0: Option<&Path>) -> String {
    argv0
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

fn builtin_arguments() -> Vec<Argument> {
    vec![
        Argument::new(["-V", "--version"])
            .action(Action::Version)
            .help("Print version and exit"),
        Argument::new(["-v", "--verbose"])
            .action(Action::StoreTrue)
            .help("Verbose output"),
        Argument::new(["--datetime-fmt"])
            .default(DEFAULT_DATETIME_FMT)
            .help("Format string for datetimes"),
        Argument::new(["--log-fmt"])
            .default(DEFAULT_LOG_FMT)
            .help("Format string for printed log output"),
        Argument::new(["--log-file-fmt"])
            .default(DEFAULT_LOG_FILE_FMT)
            .help("Format string for log file"),
        Argument::new(["--log-file"]).help("File to write log messages to"),
        Argument::new(["--color"])
            .action(Action::StoreBoolean)
            .default(true)
            .help("color in output"),
        Argument::new(["-c", "--config-file"]).help("The config file to read and/or write"),
        Argument::new(["--save-config"])
            .action(Action::StoreTrue)
            .help("Save the running configuration to the config file"),
    ]
}

/// A running session. Dropping it ends the run.
pub struct Session {
    context: RunContext,
}

impl Session {
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.context
    }

    /// Dispatch to the selected subcommand's handler, or the root entrypoint.
    pub fn run(&mut self) -> anyhow::Result<i32> {
        let handler = self
            .context
            .entrypoint
            .clone()
            .ok_or(ClapscopeError::NoEntrypoint)?;
        handler(&mut self.context)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.context.shared.lock().borrow_mut().phase = Phase::Finished;
    }
}

/// Everything a handler needs: the resolved configuration and the raw
/// parse results.
pub struct RunContext {
    shared: Shared,
    args: ArgNamespace,
    args_passed: ArgNamespace,
    config_file: Option<PathBuf>,
    subcommand: Option<String>,
    entrypoint: Option<Handler>,
    command: clap::Command,
    config: Configuration,
}

impl RunContext {
    /// Parsed arguments, defaults filled in.
    pub fn args(&self) -> &ArgNamespace {
        &self.args
    }

    /// Parsed arguments without defaults; only flags typed on the command
    /// line carry a value.
    pub fn args_passed(&self) -> &ArgNamespace {
        &self.args_passed
    }

    /// True if `dest` was given explicitly on the command line.
    pub fn arg_passed(&self, dest: &str) -> bool {
        self.args_passed.is_set(dest)
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn subcommand(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    /// The program's `--help` text, as plain text.
    pub fn render_help(&self) -> String {
        self.command.clone().render_help().to_string()
    }

    /// The program's usage line, as plain text.
    pub fn render_usage(&self) -> String {
        self.command.clone().render_usage().to_string()
    }

    /// Print the `--help` text to stdout.
    pub fn print_help(&self) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        write!(out, "{}", self.render_help())?;
        out.flush()
    }

    /// Print the usage line to stdout.
    pub fn print_usage(&self) -> std::io::Result<()> {
        writeln!(std::io::stdout().lock(), "{}", self.render_usage())
    }

    /// Write the configuration to the config file, atomically.
    pub fn save_config(&self) -> Result<SaveOutcome, ClapscopeError> {
        let _guard = self.shared.lock();
        let Some(path) = &self.config_file else {
            warn!("No config file location known, not saving config");
            return Ok(SaveOutcome::Skipped);
        };
        debug!("Saving config file to {}", path.display());
        file::write(path, &self.config)
    }
}
