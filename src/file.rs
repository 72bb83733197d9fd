//! INI config file codec.
//!
//! # Reading
//!
//! The format is the classic one:
//!
//! ```text
//! # comment
//! [general]
//! name = Bea
//! verbose: yes
//!
//! [hello]
//! greeting = first line
//!     continued on an indented line
//! ```
//!
//! Option names are lower-cased. Values come back as raw strings; type
//! coercion happens in the resolver. Any malformed line fails the whole read
//! with [`ClapscopeError::ConfigFormat`]. A missing file is not an error, it
//! reads as empty.
//!
//! Blank lines inside a multi-line value are kept when an indented line
//! follows them; trailing ones are dropped. A line whose first non-blank
//! character is `#` or `;` is always a comment, even inside a multi-line
//! value, so a value line starting with either character does not survive
//! a save and re-read. Leading and trailing whitespace of each value line is
//! not preserved either.
//!
//! # Writing
//!
//! [`write`] serializes the container into a temp file next to the
//! destination and renames it over the destination, so readers never see a
//! half-written file. An empty serialization leaves the destination alone.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::error::ClapscopeError;
use crate::registry::ROOT_SECTION;

/// Option that is never persisted, so a saved file doesn't re-trigger saving
/// on every later run.
pub const SAVE_CONFIG_OPTION: &str = "save_config";

/// One `option = value` line, attributed to its section.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub section: String,
    pub option: String,
    pub raw: String,
}

/// What [`write`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Written(PathBuf),
    /// Nothing to write; the destination was left untouched.
    Skipped,
}

/// The per-program fallback location: `~/.<prog>.ini`.
///
/// Returns `None` if the home directory cannot be determined.
pub fn default_config_path(prog: &str) -> Option<PathBuf> {
    let user = directories::UserDirs::new()?;
    Some(user.home_dir().join(format!(".{prog}.ini")))
}

/// Read a config file. A missing file yields no entries.
pub fn read(path: &Path) -> Result<Vec<FileEntry>, ClapscopeError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file {} not found, using defaults", path.display());
            Ok(Vec::new())
        }
        Err(e) => Err(ClapscopeError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Parse INI text. `path` is only used for error messages.
pub fn parse(content: &str, path: &Path) -> Result<Vec<FileEntry>, ClapscopeError> {
    let fail = |line: usize, reason: String| ClapscopeError::ConfigFormat {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut entries: Vec<FileEntry> = Vec::new();
    let mut seen_sections: HashSet<String> = HashSet::new();
    let mut seen_options: HashSet<(String, String)> = HashSet::new();
    let mut current: Option<String> = None;
    // Index of the entry an indented line would continue.
    let mut continuable: Option<usize> = None;
    // Blank lines seen inside a value; kept only if the value continues.
    let mut pending_blank = 0usize;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() {
            if continuable.is_some() {
                pending_blank += 1;
            }
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let blanks = std::mem::take(&mut pending_blank);
        let indented = raw_line.starts_with([' ', '\t']);
        if indented && let Some(entry_idx) = continuable {
            let entry = &mut entries[entry_idx];
            for _ in 0..blanks {
                entry.raw.push('\n');
            }
            if !entry.raw.is_empty() {
                entry.raw.push('\n');
            }
            entry.raw.push_str(trimmed);
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('[') {
            let Some(name) = header.strip_suffix(']') else {
                return Err(fail(line_no, format!("unterminated section header '{trimmed}'")));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(fail(line_no, "empty section name".into()));
            }
            if !seen_sections.insert(name.to_string()) {
                return Err(fail(line_no, format!("section '{name}' appears more than once")));
            }
            current = Some(name.to_string());
            continuable = None;
            continue;
        }

        let Some(section) = &current else {
            return Err(fail(
                line_no,
                "option outside of any [section] header".into(),
            ));
        };
        let Some(split_at) = trimmed.find(['=', ':']) else {
            return Err(fail(line_no, format!("expected 'option = value', got '{trimmed}'")));
        };

        let option = trimmed[..split_at].trim().to_lowercase();
        let raw = trimmed[split_at + 1..].trim().to_string();
        if option.is_empty() {
            return Err(fail(line_no, "missing option name".into()));
        }
        if !seen_options.insert((section.clone(), option.clone())) {
            return Err(fail(
                line_no,
                format!("option '{option}' appears more than once in [{section}]"),
            ));
        }

        entries.push(FileEntry {
            section: section.clone(),
            option,
            raw,
        });
        continuable = Some(entries.len() - 1);
    }

    Ok(entries)
}

/// Serialize the container: sections and options in insertion order, absent
/// values and `general.save_config` left out, empty sections skipped.
pub fn render(config: &Configuration) -> String {
    let mut out = String::new();
    for (name, section) in config.sections() {
        let options: Vec<_> = section
            .iter()
            .filter(|(option, value)| {
                !value.is_absent() && !(name == ROOT_SECTION && *option == SAVE_CONFIG_OPTION)
            })
            .collect();
        if options.is_empty() {
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("[{name}]\n"));
        for (option, value) in options {
            let value = value.to_string().replace('\n', "\n\t");
            out.push_str(&format!("{option} = {value}\n"));
        }
    }
    out
}

/// Atomically replace `path` with the serialized container.
///
/// The temp file lives in the destination's directory so the final rename
/// never crosses filesystems. If it ends up empty the destination is left
/// untouched and [`SaveOutcome::Skipped`] is returned.
pub fn write(path: &Path, config: &Configuration) -> Result<SaveOutcome, ClapscopeError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_at(dir))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_at(dir))?;
    let tmp_path = tmp.path().to_path_buf();
    tmp.write_all(render(config).as_bytes())
        .map_err(io_at(&tmp_path))?;
    tmp.flush().map_err(io_at(&tmp_path))?;

    let size = tmp.as_file().metadata().map_err(io_at(&tmp_path))?.len();
    if size == 0 {
        warn!(
            "Config serialization produced nothing, not replacing {}",
            path.display()
        );
        return Ok(SaveOutcome::Skipped);
    }

    tmp.persist(path)
        .map_err(|e| ClapscopeError::Io {
            path: path.to_path_buf(),
            source: e.error,
        })?;
    debug!("Saved config file to {}", path.display());
    Ok(SaveOutcome::Written(path.to_path_buf()))
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> ClapscopeError + use<> {
    let path = path.to_path_buf();
    move |source| ClapscopeError::Io { path, source }
}
