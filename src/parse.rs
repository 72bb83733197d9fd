//! Turning clap's `ArgMatches` into flat destination → [`Value`] namespaces,
//! and `@file` response-file expansion of argv.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::PathBuf;

use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::declare::Declaration;
use crate::error::ClapscopeError;
use crate::types::{Action, ValueKind};
use crate::value::Value;

const RESPONSE_FILE_PREFIX: char = '@';
const MAX_RESPONSE_FILE_DEPTH: usize = 16;

/// Which parser tree a namespace came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tree {
    /// Defaults registered; the namespace the program runs with.
    Real,
    /// No defaults; only explicitly passed flags carry a value.
    Shadow,
}

/// The flat result of one parse: every destination of the root namespace and
/// of the selected subcommand, plus which subcommand (if any) was selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgNamespace {
    values: BTreeMap<String, Value>,
    subcommand: Option<String>,
}

impl ArgNamespace {
    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest)
    }

    /// True if the destination holds anything but `Absent`.
    pub fn is_set(&self, dest: &str) -> bool {
        self.get(dest).is_some_and(|v| !v.is_absent())
    }

    pub fn subcommand(&self) -> Option<&str> {
        self.subcommand.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, Value)], subcommand: Option<&str>) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            subcommand: subcommand.map(str::to_string),
        }
    }
}

/// Build a namespace from the root matches and, if one was selected, the
/// subcommand's matches.
pub(crate) fn namespace(
    matches: &ArgMatches,
    root: &[Declaration],
    subcommands: &[(String, Vec<Declaration>)],
    tree: Tree,
) -> ArgNamespace {
    let mut values = BTreeMap::new();
    collect(matches, root, tree, &mut values);

    let mut subcommand = None;
    if let Some((name, sub_matches)) = matches.subcommand() {
        if let Some((_, decls)) = subcommands.iter().find(|(n, _)| n == name) {
            collect(sub_matches, decls, tree, &mut values);
        }
        subcommand = Some(name.to_string());
    }

    ArgNamespace { values, subcommand }
}

/// Fold one command level into `out`.
///
/// Several declarations may share a destination (a boolean pair). The one
/// given last on the command line wins; when none were given, the first
/// declaration's default applies.
fn collect(
    matches: &ArgMatches,
    decls: &[Declaration],
    tree: Tree,
    out: &mut BTreeMap<String, Value>,
) {
    let mut explicit_at: HashMap<&str, usize> = HashMap::new();

    for decl in decls.iter().filter(|d| d.produces_value()) {
        if matches.value_source(&decl.id) == Some(ValueSource::CommandLine) {
            let idx = matches
                .indices_of(&decl.id)
                .and_then(Iterator::max)
                .unwrap_or(0);
            let newer = explicit_at.get(decl.dest.as_str()).is_none_or(|prev| idx >= *prev);
            if newer {
                explicit_at.insert(&decl.dest, idx);
                out.insert(decl.dest.clone(), cli_value(matches, decl));
            }
        } else if !explicit_at.contains_key(decl.dest.as_str()) {
            let fallback = match tree {
                Tree::Real => decl.effective_default(),
                Tree::Shadow => Value::Absent,
            };
            out.entry(decl.dest.clone()).or_insert(fallback);
        }
    }
}

fn cli_value(matches: &ArgMatches, decl: &Declaration) -> Value {
    match decl.action {
        Action::StoreTrue => Value::Bool(true),
        Action::StoreFalse => Value::Bool(false),
        Action::Store => match decl.kind {
            ValueKind::Int => matches
                .try_get_one::<i64>(&decl.id)
                .ok()
                .flatten()
                .map_or(Value::Absent, |i| Value::Int(*i)),
            ValueKind::Decimal => matches
                .try_get_one::<f64>(&decl.id)
                .ok()
                .flatten()
                .map_or(Value::Absent, |d| Value::Decimal(*d)),
            ValueKind::Str => matches
                .try_get_one::<String>(&decl.id)
                .ok()
                .flatten()
                .map_or(Value::Absent, |s| Value::Str(s.clone())),
        },
        Action::StoreBoolean | Action::Version => Value::Absent,
    }
}

/// Replace every `@path` argument (after the program name) with the lines of
/// that file, one argument per line. Blank lines are skipped. Nested
/// references are expanded too.
pub fn expand_response_files(argv: Vec<OsString>) -> Result<Vec<OsString>, ClapscopeError> {
    let mut iter = argv.into_iter();
    let mut out: Vec<OsString> = iter.next().into_iter().collect();
    expand_into(iter, &mut out, 0)?;
    Ok(out)
}

fn expand_into(
    args: impl Iterator<Item = OsString>,
    out: &mut Vec<OsString>,
    depth: usize,
) -> Result<(), ClapscopeError> {
    for arg in args {
        let Some(path) = arg
            .to_str()
            .and_then(|s| s.strip_prefix(RESPONSE_FILE_PREFIX))
            .map(PathBuf::from)
        else {
            out.push(arg);
            continue;
        };

        if depth >= MAX_RESPONSE_FILE_DEPTH {
            return Err(ClapscopeError::InvalidValue {
                key: arg.to_string_lossy().into_owned(),
                reason: "response files nested too deeply".into(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ClapscopeError::Io {
            path: path.clone(),
            source: e,
        })?;
        let lines = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(OsString::from)
            .collect::<Vec<_>>();
        expand_into(lines.into_iter(), out, depth + 1)?;
    }
    Ok(())
}
