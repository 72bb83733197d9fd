//! The dual parser registry.
//!
//! Every declaration is registered twice: once on the real tree, with its
//! default, and once on the shadow tree, without any default and with a
//! disabling flag degraded to presence detection. Both trees are turned into
//! clap [`Command`]s and parsed against the same argv. The shadow result tells
//! the resolver which destinations were given explicitly; the real result
//! provides the values.
//!
//! The two trees are kept structurally identical: same namespaces, same
//! destinations, same flags, same positions.

use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};

use crate::declare::{self, Argument, DEST_SEPARATOR, Declaration};
use crate::error::ClapscopeError;
use crate::parse::{self, ArgNamespace, Tree};
use crate::types::{Action, ValueKind};

/// Section holding the root namespace's options.
pub const ROOT_SECTION: &str = "general";

const SUBCOMMAND_HEADING: &str = "Sub-commands";
const HELP_SHORT: char = 'h';
const HELP_LONG: &str = "help";

/// Declarations of one parser tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DeclTree {
    pub root: Vec<Declaration>,
    pub subcommands: Vec<(String, Vec<Declaration>)>,
}

impl DeclTree {
    fn namespace_mut(&mut self, subcommand: Option<&str>) -> Option<&mut Vec<Declaration>> {
        match subcommand {
            None => Some(&mut self.root),
            Some(name) => self
                .subcommands
                .iter_mut()
                .find(|(n, _)| n == name)
                .map(|(_, decls)| decls),
        }
    }

    /// Register `decl`, resolving conflicts in favor of the newcomer: flags
    /// it reuses are taken away from older declarations, and an older
    /// declaration left without flags (or with the same identity) is dropped.
    fn insert(&mut self, subcommand: Option<&str>, decl: Declaration) {
        let Some(decls) = self.namespace_mut(subcommand) else {
            return;
        };
        for existing in decls.iter_mut() {
            if existing.flags.overlaps(&decl.flags) {
                existing.flags.remove_overlap(&decl.flags);
            }
        }
        decls.retain(|d| !d.flags.is_empty() && d.id != decl.id);
        decls.push(decl);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SubcommandInfo {
    name: String,
    help: Option<String>,
}

/// Both parser trees plus the metadata needed to build clap commands.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    description: String,
    prog: String,
    version: String,
    subcommands: Vec<SubcommandInfo>,
    real: DeclTree,
    shadow: DeclTree,
}

/// Namespaces produced by parsing argv against both trees.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParseOutcome {
    pub real: ArgNamespace,
    pub shadow: ArgNamespace,
}

impl Registry {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            prog: String::new(),
            version: "unknown".into(),
            subcommands: Vec::new(),
            real: DeclTree::default(),
            shadow: DeclTree::default(),
        }
    }

    pub fn set_prog(&mut self, prog: &str) {
        self.prog = prog.to_string();
    }

    pub fn set_version(&mut self, version: &str) {
        self.version = version.to_string();
    }

    pub fn prog(&self) -> &str {
        &self.prog
    }

    pub fn has_subcommand(&self, name: &str) -> bool {
        self.subcommands.iter().any(|s| s.name == name)
    }

    /// Declare an argument in the root namespace (`None`) or in a registered
    /// subcommand's namespace.
    pub fn declare(
        &mut self,
        subcommand: Option<&str>,
        arg: Argument,
    ) -> Result<(), ClapscopeError> {
        if let Some(name) = subcommand
            && !self.has_subcommand(name)
        {
            return Err(ClapscopeError::spec(format!(
                "'{name}' is not a registered subcommand"
            )));
        }

        let section = subcommand.unwrap_or(ROOT_SECTION);
        for decl in declare::expand(section, arg)? {
            self.shadow.insert(subcommand, decl.shadow());
            self.real.insert(subcommand, decl);
        }
        Ok(())
    }

    /// Register a subcommand namespace on both trees. Re-registering a name
    /// only updates its help text.
    pub fn add_subcommand(&mut self, name: &str, help: Option<&str>) -> Result<(), ClapscopeError> {
        if name.is_empty() || name.contains(DEST_SEPARATOR) || name.starts_with('-') {
            return Err(ClapscopeError::spec(format!(
                "subcommand name '{name}' must be non-empty, not start with '-', and not contain '{DEST_SEPARATOR}'"
            )));
        }
        if name == ROOT_SECTION {
            return Err(ClapscopeError::spec(format!(
                "'{ROOT_SECTION}' is reserved for the root namespace"
            )));
        }

        let help = help.map(str::to_string);
        if let Some(existing) = self.subcommands.iter_mut().find(|s| s.name == name) {
            existing.help = help;
            return Ok(());
        }

        self.subcommands.push(SubcommandInfo {
            name: name.to_string(),
            help,
        });
        self.real.subcommands.push((name.to_string(), Vec::new()));
        self.shadow.subcommands.push((name.to_string(), Vec::new()));
        Ok(())
    }

    pub fn tree(&self, tree: Tree) -> &DeclTree {
        match tree {
            Tree::Real => &self.real,
            Tree::Shadow => &self.shadow,
        }
    }

    /// Build the clap command for one tree.
    pub fn command(&self, tree: Tree) -> Command {
        let decls = self.tree(tree);
        let mut cmd = self
            .base_command(self.prog.clone(), &decls.root)
            .about(self.description.clone())
            .args(decls.root.iter().map(|d| clap_arg(d, tree)));

        if !self.subcommands.is_empty() {
            cmd = cmd.subcommand_help_heading(SUBCOMMAND_HEADING);
        }
        for info in &self.subcommands {
            let args = decls
                .subcommands
                .iter()
                .find(|(n, _)| *n == info.name)
                .map(|(_, d)| d.as_slice())
                .unwrap_or_default();
            let mut sub = self
                .base_command(info.name.clone(), args)
                .args(args.iter().map(|d| clap_arg(d, tree)));
            if let Some(help) = &info.help {
                sub = sub.about(help.clone());
            }
            cmd = cmd.subcommand(sub);
        }
        cmd
    }

    fn base_command(&self, name: String, decls: &[Declaration]) -> Command {
        let cmd = Command::new(name)
            .version(self.version.clone())
            .disable_version_flag(true)
            .args_override_self(true);
        with_help_flag(cmd, decls)
    }

    /// Parse argv against the real tree, then the shadow tree.
    ///
    /// The real tree goes first so help, version and usage errors are
    /// rendered from the tree that shows defaults.
    pub fn parse(&self, argv: &[OsString]) -> Result<ParseOutcome, ClapscopeError> {
        let real_matches = self.command(Tree::Real).try_get_matches_from(argv)?;
        let shadow_matches = self.command(Tree::Shadow).try_get_matches_from(argv)?;

        Ok(ParseOutcome {
            real: parse::namespace(
                &real_matches,
                &self.real.root,
                &self.real.subcommands,
                Tree::Real,
            ),
            shadow: parse::namespace(
                &shadow_matches,
                &self.shadow.root,
                &self.shadow.subcommands,
                Tree::Shadow,
            ),
        })
    }
}

/// Give declarations that reuse `-h` or `--help` precedence over clap's
/// generated help flag. Whichever of the two is still free keeps printing
/// help.
fn with_help_flag(cmd: Command, decls: &[Declaration]) -> Command {
    let short_free = !decls.iter().any(|d| d.flags.shorts.contains(&HELP_SHORT));
    let long_free = !decls
        .iter()
        .any(|d| d.flags.longs.iter().any(|l| l == HELP_LONG));
    if short_free && long_free {
        return cmd;
    }

    let cmd = cmd.disable_help_flag(true);
    if !short_free && !long_free {
        return cmd;
    }
    let mut help = Arg::new(HELP_LONG)
        .action(ArgAction::Help)
        .help("Print help");
    if short_free {
        help = help.short(HELP_SHORT);
    }
    if long_free {
        help = help.long(HELP_LONG);
    }
    cmd.arg(help)
}

/// Translate one declaration into a clap argument.
fn clap_arg(decl: &Declaration, tree: Tree) -> Arg {
    let mut arg = Arg::new(decl.id.clone());

    if let Some(name) = &decl.flags.positional {
        arg = arg.value_name(name.clone());
    }
    for (i, long) in decl.flags.longs.iter().enumerate() {
        arg = if i == 0 {
            arg.long(long.clone())
        } else {
            arg.visible_alias(long.clone())
        };
    }
    for (i, short) in decl.flags.shorts.iter().enumerate() {
        arg = if i == 0 {
            arg.short(*short)
        } else {
            arg.visible_short_alias(*short)
        };
    }
    if let Some(help) = &decl.help {
        arg = arg.help(help.clone());
    }

    match decl.action {
        Action::Store => {
            arg = arg.action(ArgAction::Set).required(decl.required);
            arg = match decl.kind {
                ValueKind::Str => arg.value_parser(clap::value_parser!(String)),
                ValueKind::Int => arg.value_parser(clap::value_parser!(i64)),
                ValueKind::Decimal => arg.value_parser(clap::value_parser!(f64)),
            };
            if tree == Tree::Real && !decl.default.is_absent() {
                arg = arg.default_value(decl.default.to_string());
            }
        }
        Action::StoreTrue | Action::StoreBoolean => arg = arg.action(ArgAction::SetTrue),
        Action::StoreFalse => arg = arg.action(ArgAction::SetFalse),
        Action::Version => arg = arg.action(ArgAction::Version),
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn registry() -> Registry {
        let mut reg = Registry::new("test tool");
        reg.set_prog("prog");
        reg.declare(None, Argument::new(["-n", "--name"]).default("World"))
            .unwrap();
        reg.declare(
            None,
            Argument::new(["--color"])
                .action(Action::StoreBoolean)
                .default(true)
                .help("color in output"),
        )
        .unwrap();
        reg.declare(None, Argument::new(["-v", "--verbose"]).action(Action::StoreTrue))
            .unwrap();
        reg.add_subcommand("hello", Some("Say hello")).unwrap();
        reg.declare(Some("hello"), Argument::new(["--count"]).default(1i64))
            .unwrap();
        reg
    }

    fn assert_trees_match(reg: &Registry) {
        let (real, shadow) = (reg.tree(Tree::Real), reg.tree(Tree::Shadow));
        let pairs = real.root.iter().zip(&shadow.root).chain(
            real.subcommands
                .iter()
                .zip(&shadow.subcommands)
                .flat_map(|((rn, r), (sn, s))| {
                    assert_eq!(rn, sn);
                    r.iter().zip(s)
                }),
        );
        assert_eq!(real.root.len(), shadow.root.len());
        for (r, s) in pairs {
            assert_eq!(r.dest, s.dest);
            assert_eq!(r.id, s.id);
            assert_eq!(r.flags, s.flags);
            assert_eq!(r.required, s.required);
            assert!(s.default.is_absent());
            assert_ne!(s.action, Action::StoreFalse);
        }
    }

    #[test]
    fn trees_stay_structurally_identical() {
        let reg = registry();
        assert_trees_match(&reg);
        assert_eq!(reg.tree(Tree::Real).root.len(), 4);
    }

    #[test]
    fn real_namespace_carries_defaults() {
        let out = registry().parse(&argv(&["prog"])).unwrap();
        assert_eq!(out.real.get("general_name"), Some(&Value::Str("World".into())));
        assert_eq!(out.real.get("general_color"), Some(&Value::Bool(true)));
        assert_eq!(out.real.get("general_verbose"), Some(&Value::Bool(false)));
        assert_eq!(out.real.subcommand(), None);
        assert!(out.real.get("hello_count").is_none());
    }

    #[test]
    fn shadow_namespace_only_has_explicit_values() {
        let out = registry()
            .parse(&argv(&["prog", "--name", "Ann"]))
            .unwrap();
        assert_eq!(out.shadow.get("general_name"), Some(&Value::Str("Ann".into())));
        assert!(!out.shadow.is_set("general_color"));
        assert!(!out.shadow.is_set("general_verbose"));
    }

    #[test]
    fn no_flag_resolves_false_and_is_explicit() {
        let out = registry().parse(&argv(&["prog", "--no-color"])).unwrap();
        assert_eq!(out.real.get("general_color"), Some(&Value::Bool(false)));
        assert_eq!(out.shadow.get("general_color"), Some(&Value::Bool(true)));
    }

    #[test]
    fn last_of_a_boolean_pair_wins() {
        let reg = registry();
        let out = reg.parse(&argv(&["prog", "--no-color", "--color"])).unwrap();
        assert_eq!(out.real.get("general_color"), Some(&Value::Bool(true)));
        let out = reg.parse(&argv(&["prog", "--color", "--no-color"])).unwrap();
        assert_eq!(out.real.get("general_color"), Some(&Value::Bool(false)));
    }

    #[test]
    fn repeated_option_last_wins() {
        let out = registry()
            .parse(&argv(&["prog", "--name", "a", "-n", "b"]))
            .unwrap();
        assert_eq!(out.real.get("general_name"), Some(&Value::Str("b".into())));
    }

    #[test]
    fn subcommand_selected_and_typed() {
        let out = registry()
            .parse(&argv(&["prog", "hello", "--count", "3"]))
            .unwrap();
        assert_eq!(out.real.subcommand(), Some("hello"));
        assert_eq!(out.real.get("hello_count"), Some(&Value::Int(3)));
        assert_eq!(out.shadow.get("hello_count"), Some(&Value::Int(3)));
        // Root destinations are still present.
        assert_eq!(out.real.get("general_name"), Some(&Value::Str("World".into())));
    }

    #[test]
    fn subcommand_defaults_without_explicit_value() {
        let out = registry().parse(&argv(&["prog", "hello"])).unwrap();
        assert_eq!(out.real.get("hello_count"), Some(&Value::Int(1)));
        assert!(!out.shadow.is_set("hello_count"));
    }

    #[test]
    fn invalid_integer_is_rejected() {
        let err = registry()
            .parse(&argv(&["prog", "hello", "--count", "many"]))
            .unwrap_err();
        assert!(matches!(err, ClapscopeError::Args(_)));
    }

    #[test]
    fn positionals_parse_in_both_trees() {
        let mut reg = Registry::new("t");
        reg.set_prog("prog");
        reg.declare(None, Argument::new(["path"])).unwrap();
        reg.declare(None, Argument::new(["mode"]).default("fast")).unwrap();
        assert_trees_match(&reg);

        let out = reg.parse(&argv(&["prog", "a.txt"])).unwrap();
        assert_eq!(out.real.get("general_path"), Some(&Value::Str("a.txt".into())));
        assert_eq!(out.real.get("general_mode"), Some(&Value::Str("fast".into())));
        assert!(out.shadow.is_set("general_path"));
        assert!(!out.shadow.is_set("general_mode"));

        assert!(reg.parse(&argv(&["prog"])).is_err());
    }

    #[test]
    fn redeclaring_a_flag_replaces_the_old_one() {
        let mut reg = Registry::new("t");
        reg.set_prog("prog");
        reg.declare(None, Argument::new(["-c", "--config-file"])).unwrap();
        reg.declare(
            None,
            Argument::new(["-c", "--comma"]).action(Action::StoreBoolean),
        )
        .unwrap();
        assert_trees_match(&reg);

        let config_file = reg
            .tree(Tree::Real)
            .root
            .iter()
            .find(|d| d.dest == "general_config_file")
            .unwrap();
        assert!(config_file.flags.shorts.is_empty());
        assert_eq!(config_file.flags.longs, vec!["config-file"]);

        let out = reg.parse(&argv(&["prog", "-c"])).unwrap();
        assert_eq!(out.real.get("general_comma"), Some(&Value::Bool(true)));
    }

    #[test]
    fn unknown_subcommand_target_is_spec_error() {
        let mut reg = Registry::new("t");
        let err = reg
            .declare(Some("nope"), Argument::new(["--x"]))
            .unwrap_err();
        assert!(matches!(err, ClapscopeError::Spec { .. }));
    }

    #[test]
    fn subcommand_names_are_validated() {
        let mut reg = Registry::new("t");
        assert!(reg.add_subcommand("do_thing", None).is_err());
        assert!(reg.add_subcommand("general", None).is_err());
        assert!(reg.add_subcommand("", None).is_err());
        assert!(reg.add_subcommand("do-thing", None).is_ok());
    }

    #[test]
    fn version_flag_reports_display_version() {
        let mut reg = Registry::new("t");
        reg.set_prog("prog");
        reg.set_version("1.2.3");
        reg.declare(None, Argument::new(["-V", "--version"]).action(Action::Version))
            .unwrap();
        let err = reg.parse(&argv(&["prog", "--version"])).unwrap_err();
        match err {
            ClapscopeError::Args(e) => {
                assert_eq!(e.kind(), clap::error::ErrorKind::DisplayVersion);
            }
            other => panic!("Expected Args, got {other:?}"),
        }
    }

    fn help_kind(reg: &Registry, args: &[&str]) -> Option<clap::error::ErrorKind> {
        match reg.parse(&argv(args)) {
            Err(ClapscopeError::Args(e)) => Some(e.kind()),
            _ => None,
        }
    }

    #[test]
    fn short_h_can_be_taken_from_help() {
        let mut reg = Registry::new("t");
        reg.set_prog("prog");
        reg.declare(None, Argument::new(["-h", "--host"]).default("localhost"))
            .unwrap();

        let outcome = reg.parse(&argv(&["prog", "-h", "example.org"])).unwrap();
        assert_eq!(outcome.real.get("general_host"), Some(&Value::from("example.org")));
        assert!(outcome.shadow.is_set("general_host"));

        let outcome = reg.parse(&argv(&["prog"])).unwrap();
        assert_eq!(outcome.real.get("general_host"), Some(&Value::from("localhost")));

        assert_eq!(
            help_kind(&reg, &["prog", "--help"]),
            Some(clap::error::ErrorKind::DisplayHelp)
        );
    }

    #[test]
    fn taking_both_help_flags_leaves_no_help_flag() {
        let mut reg = Registry::new("t");
        reg.set_prog("prog");
        reg.declare(None, Argument::new(["-h", "--help"]).action(Action::StoreTrue))
            .unwrap();

        let outcome = reg.parse(&argv(&["prog", "--help"])).unwrap();
        assert_eq!(outcome.real.get("general_help"), Some(&Value::Bool(true)));
    }

    #[test]
    fn help_conflicts_are_per_namespace() {
        let mut reg = registry();
        reg.declare(Some("hello"), Argument::new(["-h", "--height"]).default(2i64))
            .unwrap();

        let outcome = reg.parse(&argv(&["prog", "hello", "-h", "5"])).unwrap();
        assert_eq!(outcome.real.get("hello_height"), Some(&Value::Int(5)));
        assert_eq!(
            help_kind(&reg, &["prog", "-h"]),
            Some(clap::error::ErrorKind::DisplayHelp)
        );
        assert_eq!(
            help_kind(&reg, &["prog", "hello", "--help"]),
            Some(clap::error::ErrorKind::DisplayHelp)
        );
    }
}
