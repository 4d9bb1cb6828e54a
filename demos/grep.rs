use std::{
    fs::File,
    io::{BufRead, BufReader},
};

use anyhow::Result;
use clap::Parser;
use extparse::Regex;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

#[derive(Parser)]
struct Cli {
    pattern: String,
    file: String,
    /// Print only the matched part of each line.
    #[arg(short, long)]
    only_matching: bool,
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

    let file = File::open(args.file)?;
    let reader = BufReader::new(file);
    let re = Regex::new(&args.pattern)?;

    for line in reader.lines() {
        let line = line?;
        if let Some((start, end)) = re.find(&line) {
            if args.only_matching {
                println!("{}", &line[start..end]);
            } else {
                println!("{line}");
            }
        }
    }

    Ok(())
}
