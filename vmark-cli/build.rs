use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the command tree in src/main.rs
// Build scripts can't access src/ modules, so the shape is duplicated here
const INSPECT_VIEWS: &[&str] = &["sniff", "syntax", "document"];

fn file_arg(name: &'static str) -> Arg {
    Arg::new(name)
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("vmark-md")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert between markdown and the vmark document tree")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("preserve-line-breaks")
                .long("preserve-line-breaks")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("hard-break-style")
                .long("hard-break-style")
                .value_parser(["backslash", "trailing-spaces"])
                .global(true),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("parse").arg(file_arg("input")).arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(Command::new("serialize").arg(file_arg("input")))
        .subcommand(
            Command::new("roundtrip").arg(file_arg("input")).arg(
                Arg::new("check")
                    .long("check")
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(
            Command::new("convert")
                .arg(file_arg("input"))
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to").required(true))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("inspect").arg(file_arg("path")).arg(
                Arg::new("view")
                    .index(2)
                    .value_parser(clap::builder::PossibleValuesParser::new(INSPECT_VIEWS)),
            ),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "vmark-md", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "vmark-md", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "vmark-md", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
