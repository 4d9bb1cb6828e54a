//! Print the intermediate forms of a pattern.

use anyhow::Result;
use clap::Parser;
use extparse::{dfa::Dfa, nfa::Nfa, parser};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

#[derive(Parser)]
struct Cli {
    pattern: String,
    /// Skip the NFA.
    #[arg(long)]
    dfa_only: bool,
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    TermLogger::init(
        args.log_level,
        ConfigBuilder::new().set_time_format_custom(&[]).build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let ast = parser::parse(&args.pattern)?;
    println!("pattern: {ast}");

    let nfa = Nfa::build(&ast)?;
    if !args.dfa_only {
        println!("\nNFA:\n{nfa}");
    }

    let dfa = Dfa::build(&nfa);
    println!("\nDFA:\n{dfa}");

    Ok(())
}
