//! Argument declarations: the user-facing [`Argument`] builder and the
//! normalized [`Declaration`]s it expands into.
//!
//! One `Argument` becomes one `Declaration`, except for
//! [`Action::StoreBoolean`], which becomes an enable/disable pair sharing a
//! destination (`--color` / `--no-color` → `general_color`).

use crate::error::ClapscopeError;
use crate::types::{Action, ValueKind};
use crate::value::Value;

/// Separator between the section and option halves of a destination.
pub const DEST_SEPARATOR: char = '_';

/// A command-line argument as the application describes it.
///
/// ```ignore
/// Argument::new(["-n", "--name"]).help("Name to greet").default("World")
/// Argument::new(["--color"]).action(Action::StoreBoolean).default(true).help("color in output")
/// Argument::new(["path"]).help("File to read")
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    flags: Vec<String>,
    help: Option<String>,
    default: Value,
    action: Action,
    kind: Option<ValueKind>,
    dest: Option<String>,
    required: bool,
}

impl Argument {
    /// Flag strings (`-n`, `--name`) or a single bare positional name.
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            help: None,
            default: Value::Absent,
            action: Action::Store,
            kind: None,
            dest: None,
            required: false,
        }
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Compiled default. Also fixes the value kind unless [`kind`](Self::kind)
    /// is set: an integer default parses `Int`, a decimal default `Decimal`.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Override the option half of the destination (the section half always
    /// comes from the owning namespace).
    pub fn dest(mut self, name: &str) -> Self {
        self.dest = Some(name.to_string());
        self
    }

    /// Only meaningful for flags taking a value.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    fn effective_kind(&self) -> ValueKind {
        self.kind.unwrap_or(match self.default {
            Value::Int(_) => ValueKind::Int,
            Value::Decimal(_) => ValueKind::Decimal,
            _ => ValueKind::Str,
        })
    }
}

/// Flag strings split by form.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Flags {
    pub shorts: Vec<char>,
    pub longs: Vec<String>,
    pub positional: Option<String>,
}

impl Flags {
    fn parse(raw: &[String]) -> Result<Self, ClapscopeError> {
        if raw.is_empty() {
            return Err(ClapscopeError::spec("an argument needs at least one flag or name"));
        }

        let mut flags = Flags::default();
        for flag in raw {
            if let Some(long) = flag.strip_prefix("--") {
                if long.is_empty() {
                    return Err(ClapscopeError::spec("'--' is not a valid flag"));
                }
                flags.longs.push(long.to_string());
            } else if let Some(short) = flag.strip_prefix('-') {
                let mut chars = short.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => flags.shorts.push(c),
                    _ => {
                        return Err(ClapscopeError::spec(format!(
                            "short flag '{flag}' must be a single character"
                        )));
                    }
                }
            } else {
                if flags.positional.is_some() || raw.len() > 1 {
                    return Err(ClapscopeError::spec(format!(
                        "positional '{flag}' cannot be combined with other names"
                    )));
                }
                flags.positional = Some(flag.clone());
            }
        }
        Ok(flags)
    }

    /// The option name a destination is derived from: first long flag, else
    /// first short flag, else the positional name. `-` becomes `_`.
    fn option_name(&self) -> String {
        let name = match (self.longs.first(), self.shorts.first(), &self.positional) {
            (Some(long), _, _) => long.clone(),
            (None, Some(short), _) => short.to_string(),
            (None, None, Some(pos)) => pos.clone(),
            (None, None, None) => String::new(),
        };
        name.replace('-', "_")
    }

    pub fn is_empty(&self) -> bool {
        self.shorts.is_empty() && self.longs.is_empty() && self.positional.is_none()
    }

    /// Remove every flag also present in `other`. Positionals never conflict.
    pub fn remove_overlap(&mut self, other: &Flags) {
        self.shorts.retain(|s| !other.shorts.contains(s));
        self.longs.retain(|l| !other.longs.contains(l));
    }

    pub fn overlaps(&self, other: &Flags) -> bool {
        self.shorts.iter().any(|s| other.shorts.contains(s))
            || self.longs.iter().any(|l| other.longs.contains(l))
    }
}

/// One argument as registered on a parser tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Declaration {
    /// `section_option` key the value is stored under.
    pub dest: String,
    /// Unique parser-side identity. Equal to `dest` except for the disabling
    /// half of a boolean pair, which gets a `no-` prefix (never a valid dest,
    /// since dests contain no `-`).
    pub id: String,
    pub flags: Flags,
    pub help: Option<String>,
    pub default: Value,
    pub action: Action,
    pub kind: ValueKind,
    /// Fixed at expansion time so the shadow copy, which has no default,
    /// keeps the same arity as the real one.
    pub required: bool,
}

impl Declaration {
    /// The value the destination holds when the flag is not given.
    pub fn effective_default(&self) -> Value {
        match (&self.default, self.action) {
            (Value::Absent, Action::StoreTrue) => Value::Bool(false),
            (Value::Absent, Action::StoreFalse) => Value::Bool(true),
            (default, _) => default.clone(),
        }
    }

    /// Version declarations print and exit; they never produce a value.
    pub fn produces_value(&self) -> bool {
        self.action != Action::Version
    }

    /// The shadow-tree copy: same destination and positions, no default, and
    /// a disabling flag degraded to plain presence detection.
    pub fn shadow(&self) -> Declaration {
        let action = match self.action {
            Action::StoreFalse => Action::StoreTrue,
            other => other,
        };
        Declaration {
            default: Value::Absent,
            action,
            ..self.clone()
        }
    }
}

/// Expand an [`Argument`] into the declarations registered in `section`.
pub(crate) fn expand(section: &str, arg: Argument) -> Result<Vec<Declaration>, ClapscopeError> {
    let flags = Flags::parse(&arg.flags)?;

    if flags.positional.is_some() && arg.action != Action::Store {
        return Err(ClapscopeError::spec(format!(
            "positional '{}' can only store a value",
            arg.flags[0]
        )));
    }

    let option = match &arg.dest {
        Some(dest) => dest.replace('-', "_"),
        None => flags.option_name(),
    };
    let dest = format!("{section}{DEST_SEPARATOR}{option}");
    let kind = arg.effective_kind();
    let help = arg.help.clone();
    // Positionals without a default must be supplied. A default makes
    // requiredness moot.
    let required = ((arg.required && arg.action.takes_value()) || flags.positional.is_some())
        && arg.default.is_absent();

    if arg.action != Action::StoreBoolean {
        return Ok(vec![Declaration {
            id: dest.clone(),
            dest,
            flags,
            help,
            default: arg.default,
            action: arg.action,
            kind,
            required,
        }]);
    }

    let Some(long) = flags.longs.first() else {
        return Err(ClapscopeError::spec(format!(
            "boolean flag {:?} has no long form to derive a --no- flag from",
            arg.flags
        )));
    };
    let negated = Flags {
        longs: vec![format!("no-{long}")],
        ..Flags::default()
    };

    let describe = |verb: &str| help.as_ref().map(|h| format!("{verb} {h}"));
    let enable = Declaration {
        id: dest.clone(),
        dest: dest.clone(),
        flags,
        help: describe("Enable"),
        default: arg.default.clone(),
        action: Action::StoreTrue,
        kind: ValueKind::Str,
        required: false,
    };
    let disable = Declaration {
        id: format!("no-{dest}"),
        dest,
        flags: negated,
        help: describe("Disable"),
        default: arg.default,
        action: Action::StoreFalse,
        kind: ValueKind::Str,
        required: false,
    };
    Ok(vec![enable, disable])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dest_from_first_long_flag() {
        let decls = expand("general", Argument::new(["-n", "--name", "--alias"])).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].dest, "general_name");
        assert_eq!(decls[0].flags.shorts, vec!['n']);
    }

    #[test]
    fn dest_normalizes_dashes() {
        let decls = expand("general", Argument::new(["--log-file-fmt"])).unwrap();
        assert_eq!(decls[0].dest, "general_log_file_fmt");
    }

    #[test]
    fn dest_from_short_when_no_long() {
        let decls = expand("hello", Argument::new(["-q"])).unwrap();
        assert_eq!(decls[0].dest, "hello_q");
    }

    #[test]
    fn dest_override() {
        let decls = expand("general", Argument::new(["-x"]).dest("extra-mode")).unwrap();
        assert_eq!(decls[0].dest, "general_extra_mode");
    }

    #[test]
    fn positional_dest_and_requiredness() {
        let decls = expand("general", Argument::new(["path"])).unwrap();
        assert_eq!(decls[0].dest, "general_path");
        assert!(decls[0].required);
        assert!(decls[0].shadow().required);

        let decls = expand("general", Argument::new(["path"]).default(".")).unwrap();
        assert!(!decls[0].required);
        assert!(!decls[0].shadow().required);
    }

    #[test]
    fn kind_inferred_from_default() {
        let decls = expand("general", Argument::new(["--count"]).default(3i64)).unwrap();
        assert_eq!(decls[0].kind, ValueKind::Int);
        let decls = expand("general", Argument::new(["--ratio"]).default(0.5)).unwrap();
        assert_eq!(decls[0].kind, ValueKind::Decimal);
        let decls = expand("general", Argument::new(["--name"])).unwrap();
        assert_eq!(decls[0].kind, ValueKind::Str);
    }

    #[test]
    fn boolean_pair_shares_destination() {
        let arg = Argument::new(["--color"])
            .action(Action::StoreBoolean)
            .default(true)
            .help("color in output");
        let decls = expand("general", arg).unwrap();

        assert_eq!(decls.len(), 2);
        let (enable, disable) = (&decls[0], &decls[1]);
        assert_eq!(enable.dest, "general_color");
        assert_eq!(disable.dest, "general_color");
        assert_ne!(enable.id, disable.id);
        assert_eq!(enable.flags.longs, vec!["color"]);
        assert_eq!(disable.flags.longs, vec!["no-color"]);
        assert_eq!(enable.action, Action::StoreTrue);
        assert_eq!(disable.action, Action::StoreFalse);
        assert_eq!(enable.help.as_deref(), Some("Enable color in output"));
        assert_eq!(disable.help.as_deref(), Some("Disable color in output"));
        assert_eq!(disable.default, Value::Bool(true));
    }

    #[test]
    fn boolean_pair_uses_first_long_flag() {
        let arg = Argument::new(["-c", "--comma", "--commas"]).action(Action::StoreBoolean);
        let decls = expand("general", arg).unwrap();
        assert_eq!(decls[1].flags.longs, vec!["no-comma"]);
        assert!(decls[1].flags.shorts.is_empty());
    }

    #[test]
    fn boolean_pair_without_long_flag_is_spec_error() {
        let arg = Argument::new(["-c"]).action(Action::StoreBoolean);
        let err = expand("general", arg).unwrap_err();
        assert!(matches!(err, ClapscopeError::Spec { .. }));
    }

    #[test]
    fn malformed_flags_are_spec_errors() {
        assert!(expand("general", Argument::new(Vec::<String>::new())).is_err());
        assert!(expand("general", Argument::new(["-ab"])).is_err());
        assert!(expand("general", Argument::new(["--"])).is_err());
        assert!(expand("general", Argument::new(["path", "--path"])).is_err());
        assert!(expand("general", Argument::new(["path"]).action(Action::StoreTrue)).is_err());
    }

    #[test]
    fn shadow_drops_default_and_degrades_disable() {
        let arg = Argument::new(["--color"])
            .action(Action::StoreBoolean)
            .default(true);
        let decls = expand("general", arg).unwrap();
        let shadow: Vec<_> = decls.iter().map(Declaration::shadow).collect();

        for (real, shadow) in decls.iter().zip(&shadow) {
            assert_eq!(real.dest, shadow.dest);
            assert_eq!(real.id, shadow.id);
            assert_eq!(real.flags, shadow.flags);
            assert_eq!(shadow.default, Value::Absent);
        }
        assert_eq!(shadow[1].action, Action::StoreTrue);
    }

    #[test]
    fn effective_defaults_for_flags() {
        let decls = expand("general", Argument::new(["-v"]).action(Action::StoreTrue)).unwrap();
        assert_eq!(decls[0].effective_default(), Value::Bool(false));
        let decls = expand("general", Argument::new(["-q"]).action(Action::StoreFalse)).unwrap();
        assert_eq!(decls[0].effective_default(), Value::Bool(true));
        let decls = expand("general", Argument::new(["--log-file"])).unwrap();
        assert_eq!(decls[0].effective_default(), Value::Absent);
    }
}
