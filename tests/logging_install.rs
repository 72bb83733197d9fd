//! Installing the global subscriber is process-wide, so it gets its own test
//! binary and a single test.

use std::ffi::OsString;

use clapscope::{Argument, ClapscopeError, Cli, LogSettings, logging};

#[test]
fn install_once_then_refuse() {
    let dir = tempfile::TempDir::new().unwrap();
    let log_file = dir.path().join("run.log");

    let cli = Cli::new("Logs things.");
    cli.prog_name("prog")
        .unwrap()
        .config_file(dir.path().join("prog.ini"))
        .unwrap()
        .argument(Argument::new(["--name"]).default("World"))
        .unwrap()
        .entrypoint(|ctx| {
            let name = ctx.config_mut().get_option("general", "name").to_string();
            tracing::debug!("{{fg_green}}Hello {name}");
            Ok(0)
        })
        .unwrap();

    let log_arg = log_file.to_string_lossy().into_owned();
    let argv: Vec<OsString> = ["prog", "--no-color", "--log-file", &log_arg, "--log-file-fmt", "{level}|{message}"]
        .iter()
        .map(OsString::from)
        .collect();
    assert_eq!(cli.main_from(argv), 0);

    let logged = std::fs::read_to_string(&log_file).unwrap();
    assert_eq!(logged, "DEBUG|Hello World\n");

    // A second coordinator must not stack its handlers on the first.
    let second = Cli::new("Logs again.");
    second.prog_name("prog").unwrap().config_file(dir.path().join("prog.ini")).unwrap();
    assert!(matches!(
        second.enter(["prog"]),
        Err(ClapscopeError::DuplicateRootHandler)
    ));
    assert!(matches!(
        logging::install(&LogSettings::default()),
        Err(ClapscopeError::DuplicateRootHandler)
    ));
}
