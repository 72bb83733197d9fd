//! Logging setup driven by the resolved `general` section.
//!
//! Two sinks: the console (stderr) at INFO, or DEBUG with `--verbose`, and an
//! optional append-only log file at DEBUG. Lines are rendered from templates
//! with `{level}`, `{message}`, `{time}`, `{target}`, `{file}` and `{line}`
//! placeholders plus the palette tokens of [`crate::ansi`].
//!
//! The console formatter is [`FormatMode::EmojiColor`] when `color` is on and
//! [`FormatMode::Plain`] otherwise. The file formatter is always plain.

use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::ansi;
use crate::config::Configuration;
use crate::error::ClapscopeError;
use crate::registry::ROOT_SECTION;
use crate::types::FormatMode;
use crate::value::Value;

pub const DEFAULT_LOG_FMT: &str = "{level} {message}";
pub const DEFAULT_LOG_FILE_FMT: &str = "[{level}] [{time}] [file:{file}] [line:{line}] {message}";
pub const DEFAULT_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Logging options, read from the `general` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub verbose: bool,
    pub color: bool,
    pub log_fmt: String,
    pub log_file_fmt: String,
    pub datetime_fmt: String,
    pub log_file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            color: true,
            log_fmt: DEFAULT_LOG_FMT.into(),
            log_file_fmt: DEFAULT_LOG_FILE_FMT.into(),
            datetime_fmt: DEFAULT_DATETIME_FMT.into(),
            log_file: None,
        }
    }
}

impl LogSettings {
    /// Read settings from the container. Missing or absent options keep
    /// their defaults.
    pub fn from_config(config: &Configuration) -> Self {
        let defaults = Self::default();
        let get = |option: &str| {
            config
                .lookup(ROOT_SECTION, option)
                .filter(|v| !v.is_absent())
        };
        let text = |option: &str, fallback: String| get(option).map_or(fallback, Value::to_string);

        Self {
            verbose: get("verbose").is_some_and(Value::is_truthy),
            color: get("color").map_or(defaults.color, Value::is_truthy),
            log_fmt: text("log_fmt", defaults.log_fmt),
            log_file_fmt: text("log_file_fmt", defaults.log_file_fmt),
            datetime_fmt: text("datetime_fmt", defaults.datetime_fmt),
            log_file: get("log_file")
                .map(Value::to_string)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn console_level(&self) -> Level {
        if self.verbose { Level::DEBUG } else { Level::INFO }
    }

    pub fn console_format(&self) -> LineFormat {
        let mode = if self.color {
            FormatMode::EmojiColor
        } else {
            FormatMode::Plain
        };
        LineFormat::new(&self.log_fmt, &self.datetime_fmt, mode)
    }

    pub fn file_format(&self) -> LineFormat {
        LineFormat::new(&self.log_file_fmt, &self.datetime_fmt, FormatMode::Plain)
    }
}

/// One log event, detached from tracing so rendering is testable on its own.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub level: Level,
    pub message: &'a str,
    pub target: &'a str,
    pub file: Option<&'a str>,
    pub line: Option<u32>,
    pub time: DateTime<Local>,
}

/// A line template plus how to treat colors in it.
#[derive(Debug, Clone)]
pub struct LineFormat {
    template: String,
    datetime_fmt: String,
    mode: FormatMode,
}

impl LineFormat {
    pub fn new(template: &str, datetime_fmt: &str, mode: FormatMode) -> Self {
        Self {
            template: template.into(),
            datetime_fmt: datetime_fmt.into(),
            mode,
        }
    }

    pub fn render(&self, record: &Record<'_>) -> String {
        let level = match self.mode {
            FormatMode::EmojiColor => ansi::level_glyph(record.level).to_string(),
            FormatMode::Plain => record.level.to_string(),
        };

        let mut line = self
            .template
            .replace("{level}", &level)
            .replace("{target}", record.target)
            .replace("{file}", record.file.unwrap_or("?"))
            .replace("{line}", &record.line.map_or("?".into(), |l| l.to_string()));
        if line.contains("{time}") {
            line = line.replace("{time}", &self.timestamp(&record.time));
        }
        // Last, so placeholders inside the message are left alone.
        line = line.replace("{message}", record.message);

        let expanded = ansi::expand(&line);
        match self.mode {
            FormatMode::EmojiColor => format!("{expanded}{}", ansi::RESET_ALL),
            FormatMode::Plain => ansi::strip(&expanded).into_owned(),
        }
    }

    fn timestamp(&self, time: &DateTime<Local>) -> String {
        let mut out = String::new();
        // chrono reports a bad strftime pattern as a fmt error.
        if write!(out, "{}", time.format(&self.datetime_fmt)).is_err() {
            out = time.to_rfc3339();
        }
        out
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.finish();

        let meta = event.metadata();
        let record = Record {
            level: *meta.level(),
            message: &message,
            target: meta.target(),
            file: meta.file(),
            line: meta.line(),
            time: Local::now(),
        };
        writeln!(writer, "{}", self.render(&record))
    }
}

/// Collects the `message` field and appends any other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        let mut out = self.message;
        for field in self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&field);
        }
        out
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }
}

/// Build the two-sink subscriber with `console` as the console writer.
pub fn build_subscriber<W>(
    settings: &LogSettings,
    console: W,
) -> Result<impl Subscriber + Send + Sync + 'static, ClapscopeError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(settings.console_format())
        .with_writer(console)
        .with_filter(LevelFilter::from_level(settings.console_level()));

    let file_layer = match &settings.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ClapscopeError::Io {
                    path: path.clone(),
                    source: e,
                })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .event_format(settings.file_format())
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    Ok(tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer))
}

/// Install the subscriber process-wide, logging to stderr.
///
/// Fails with [`ClapscopeError::DuplicateRootHandler`] if a global subscriber
/// is already in place; clapscope never stacks a second set of handlers on
/// top of someone else's.
pub fn install(settings: &LogSettings) -> Result<(), ClapscopeError> {
    if tracing::dispatcher::has_been_set() {
        return Err(ClapscopeError::DuplicateRootHandler);
    }
    build_subscriber(settings, std::io::stderr)?
        .try_init()
        .map_err(|_| ClapscopeError::DuplicateRootHandler)
}
