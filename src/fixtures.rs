#[cfg(test)]
pub mod test {
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    use serde::Deserialize;

    use crate::Cli;

    /// Typed view of a `[hello]` section.
    #[derive(Deserialize, Debug, PartialEq)]
    pub struct Greeting {
        pub name: String,

        #[serde(default)]
        pub times: i64,

        #[serde(default)]
        pub loud: bool,
    }

    /// A coordinator named `prog` whose config file is `<dir>/prog.ini`,
    /// without global logging.
    pub fn test_cli(dir: &Path) -> Cli {
        let cli = Cli::new("Test program.");
        cli.prog_name("prog")
            .and_then(|c| c.config_file(config_path(dir)))
            .and_then(|c| c.install_logging(false))
            .unwrap();
        cli
    }

    pub fn config_path(dir: &Path) -> PathBuf {
        dir.join("prog.ini")
    }

    pub fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = config_path(dir);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_cli_is_declaring() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = test_cli(dir.path());
        assert_eq!(cli.phase(), crate::Phase::Declaring);
    }
}
