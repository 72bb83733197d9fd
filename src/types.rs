//! Small shared enums used across the declaration, resolution and logging
//! layers.

/// What a declared argument does when it appears on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Take a value (`--name Ann`, or a positional).
    #[default]
    Store,
    /// Presence sets `true`.
    StoreTrue,
    /// Presence sets `false`.
    StoreFalse,
    /// An enabling flag plus a generated `--no-<name>` disabling flag sharing
    /// one destination.
    StoreBoolean,
    /// Print the program version and exit.
    Version,
}

impl Action {
    /// Flag-style actions never consume a value.
    pub fn takes_value(self) -> bool {
        matches!(self, Action::Store)
    }
}

/// How a stored value is parsed from its command-line string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    #[default]
    Str,
    Int,
    Decimal,
}

/// Rendering mode for a log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    /// Levels as colored glyphs, color tokens expanded to ANSI codes.
    EmojiColor,
    /// Color tokens expanded and then every ANSI escape stripped.
    Plain,
}

/// Lifecycle of a [`Cli`](crate::Cli) coordinator.
///
/// ```text
/// Uninitialized → Declaring → Running → Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Declaring,
    Running,
    Finished,
}
