//! # clapscope demo application
//!
//! A small greeter showing how a program is put together with clapscope.
//! This is **not** a real app; it exists to demonstrate and manually verify
//! clapscope's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example clapscope_demo
//! cargo run --example clapscope_demo -- hello --name Ann
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                 | How to exercise it                                                        |
//! |-------------------------|---------------------------------------------------------------------------|
//! | Root entrypoint         | `cargo run --example clapscope_demo`                                      |
//! | Boolean flag pair       | `cargo run --example clapscope_demo -- --no-comma`                        |
//! | Subcommands             | `cargo run --example clapscope_demo -- goodbye -n Bea`                    |
//! | Saving the config       | `cargo run --example clapscope_demo -- --no-comma --save-config hello -n Ann` |
//! | Config file precedence  | Run `hello` again without `-n`; the saved name is used                    |
//! | Explicit flag wins      | `cargo run --example clapscope_demo -- hello -n World`                    |
//! | Colorless output        | `cargo run --example clapscope_demo -- --no-color hello`                  |
//! | Verbose + log file      | `cargo run --example clapscope_demo -- -v --log-file demo.log thinking`   |
//! | Response files          | Put one argument per line in `args.txt`, then pass `@args.txt`            |
//! | Version                 | `cargo run --example clapscope_demo -- --version`                         |

use std::thread::sleep;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use clapscope::{Action, Argument, Cli, ClapscopeError, RunContext};

/// Typed view of a subcommand's section.
#[derive(Deserialize, Debug)]
struct Greeting {
    name: String,
}

fn comma(ctx: &mut RunContext) -> &'static str {
    if ctx.config_mut().get_option("general", "comma").is_truthy() {
        ","
    } else {
        ""
    }
}

fn main_entry(ctx: &mut RunContext) -> anyhow::Result<i32> {
    let comma = comma(ctx);
    info!("{{bg_green}}{{fg_red}}Hello{comma} World!");
    Ok(0)
}

fn hello(ctx: &mut RunContext) -> anyhow::Result<i32> {
    let comma = comma(ctx);
    let greeting: Greeting = ctx.config().section_as("hello")?;
    info!("{{fg_blue}}Hello{comma} {}!", greeting.name);
    Ok(0)
}

fn goodbye(ctx: &mut RunContext) -> anyhow::Result<i32> {
    let comma = comma(ctx);
    let name = ctx.config_mut().get_option("goodbye", "name").to_string();
    info!("{{bg_red}}Goodbye{comma} {name}!");
    Ok(0)
}

fn thinking(ctx: &mut RunContext) -> anyhow::Result<i32> {
    let comma = comma(ctx);
    debug!("Just a moment...");
    sleep(Duration::from_millis(500));
    debug!("Almost there!");
    sleep(Duration::from_millis(500));

    let name = ctx.config_mut().get_option("thinking", "name").to_string();
    info!("{{fg_cyan}}Hello{comma} {name}!");
    Ok(0)
}

fn build() -> Result<Cli, ClapscopeError> {
    let cli = Cli::new("My useful CLI tool with subcommands.");
    let name = || {
        Argument::new(["-n", "--name"])
            .help("Name to greet")
            .default("World")
    };

    cli.prog_name("clapscope-demo")?
        .version(env!("CARGO_PKG_VERSION"))?
        .argument(
            Argument::new(["-c", "--comma"])
                .help("comma in output")
                .action(Action::StoreBoolean)
                .default(true),
        )?
        .entrypoint(main_entry)?
        .subcommand("hello", "Description of hello subcommand here.", hello)?
        .subcommand_argument("hello", name())?
        .subcommand("goodbye", "This will show up in --help output.", goodbye)?
        .subcommand_argument(
            "goodbye",
            Argument::new(["-n", "--name"])
                .help("Name to bid farewell to")
                .default("World"),
        )?
        .subcommand("thinking", "Think a bit before greeting the user.", thinking)?
        .subcommand_argument("thinking", name())?;
    Ok(cli)
}

fn main() {
    let code = match build() {
        Ok(cli) => cli.main(),
        Err(e) => {
            eprintln!("{e}");
            clapscope::EXIT_FAILURE_CODE
        }
    };
    std::process::exit(code);
}
