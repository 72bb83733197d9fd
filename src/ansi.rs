//! ANSI color tokens for log templates.
//!
//! Templates may embed `{fg_<color>}`, `{bg_<color>}` and `{style_<name>}`
//! tokens. [`expand`] swaps them for escape codes; [`strip`] removes every
//! escape sequence from a string, which is how the plain (file) formatter
//! gets uncolored output from the same template.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::Level;

pub const RESET_ALL: &str = "\x1b[0m";

const COLORS: &[(&str, u8)] = &[
    ("black", 0),
    ("red", 1),
    ("green", 2),
    ("yellow", 3),
    ("blue", 4),
    ("magenta", 5),
    ("cyan", 6),
    ("white", 7),
];

const STYLES: &[(&str, u8)] = &[
    ("bright", 1),
    ("dim", 2),
    ("normal", 22),
    ("reset_all", 0),
];

static TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{((?:fg|bg|style)_[a-z_]+)\}").ok());

// CSI sequences (colors, cursor movement) and two-byte escapes.
static ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|[@-Z\\-_])").ok());

/// Escape code for a palette token name such as `fg_red`, `bg_lightblue_ex`
/// or `style_bright`.
pub fn code(token: &str) -> Option<String> {
    if let Some(style) = token.strip_prefix("style_") {
        return STYLES
            .iter()
            .find(|(name, _)| *name == style)
            .map(|(_, n)| format!("\x1b[{n}m"));
    }

    let (base, color) = if let Some(color) = token.strip_prefix("fg_") {
        (30, color)
    } else if let Some(color) = token.strip_prefix("bg_") {
        (40, color)
    } else {
        return None;
    };

    if color == "reset" {
        return Some(format!("\x1b[{}m", base + 9));
    }
    let (color, base) = match color
        .strip_prefix("light")
        .and_then(|c| c.strip_suffix("_ex"))
    {
        Some(c) => (c, base + 60),
        None => (color, base),
    };
    COLORS
        .iter()
        .find(|(name, _)| *name == color)
        .map(|(_, offset)| format!("\x1b[{}m", base + offset))
}

/// Replace every known palette token with its escape code. Unknown tokens
/// are left as they are.
pub fn expand(template: &str) -> Cow<'_, str> {
    match TOKEN.as_ref() {
        Some(re) => re.replace_all(template, |caps: &Captures<'_>| {
            code(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        }),
        None => Cow::Borrowed(template),
    }
}

/// Remove every ANSI escape sequence.
pub fn strip(text: &str) -> Cow<'_, str> {
    match ESCAPE.as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Colored glyph template for a level, still containing palette tokens.
pub fn level_glyph(level: Level) -> &'static str {
    match level {
        Level::ERROR => "{fg_red}☒{style_reset_all}",
        Level::WARN => "{fg_yellow}⚠{style_reset_all}",
        Level::INFO => "{fg_blue}ℹ{style_reset_all}",
        Level::DEBUG => "{fg_cyan}☐{style_reset_all}",
        Level::TRACE => "{fg_magenta}·{style_reset_all}",
    }
}
