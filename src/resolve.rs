//! Precedence resolution: fold config-file values and parsed arguments into
//! the configuration container.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, so every
//! precedence rule is testable with synthetic namespaces. Steps:
//!
//! 1. Coerce each config-file entry and store it in its section
//! 2. For every argument destination `<section>_<option>`:
//!    - explicitly passed on the command line: overwrite
//!    - otherwise: fill in the argument default, but only where the file
//!      left no value
//!
//! So the effective order is: explicit CLI flag > config file > argument
//! default.

use std::path::{Path, PathBuf};

use crate::config::Configuration;
use crate::declare::DEST_SEPARATOR;
use crate::file::{self, FileEntry};
use crate::parse::ArgNamespace;
use crate::registry::ROOT_SECTION;
use crate::value::{self, Value};

/// Destinations the parser reserves for its own bookkeeping; never folded.
const RESERVED_DESTS: &[&str] = &["subparsers", "entrypoint"];

/// All pre-loaded data needed for one resolution pass. No I/O happens here.
pub struct ResolveInput {
    /// Namespace from the tree with defaults.
    pub real: ArgNamespace,
    /// Namespace from the tree without defaults; set entries were typed by
    /// the user.
    pub shadow: ArgNamespace,
    /// Raw config-file entries, in file order.
    pub file_entries: Vec<FileEntry>,
}

/// Fold `input` into `config`.
pub fn resolve(input: &ResolveInput, config: &mut Configuration) {
    for entry in &input.file_entries {
        config.set_option(&entry.section, &entry.option, value::coerce(&entry.raw));
    }

    for (dest, arg_value) in input.real.iter() {
        if RESERVED_DESTS.contains(&dest) {
            continue;
        }
        let Some((section, option)) = dest.split_once(DEST_SEPARATOR) else {
            continue;
        };

        let explicit = input.shadow.is_set(dest);
        let section = config.get_section(section);
        if explicit || !section.has_value(option) {
            section.set(option, arg_value.clone());
        }
    }
}

/// Where the config file lives for this run.
///
/// An explicit `--config-file` wins, then a path set through the builder,
/// then `~/.<prog>.ini`. `None` if no home directory can be found.
pub fn config_file_path(
    builder_override: Option<&Path>,
    real: &ArgNamespace,
    prog: &str,
) -> Option<PathBuf> {
    let from_cli = real
        .get(&format!("{ROOT_SECTION}{DEST_SEPARATOR}config_file"))
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    from_cli
        .or_else(|| builder_override.map(Path::to_path_buf))
        .or_else(|| file::default_config_path(prog))
}
