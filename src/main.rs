use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use enrol::cli::{self, Cli};
use enrol::clock::SystemClock;
use enrol::config::Config;

fn main() -> anyhow::Result<ExitCode> {
    enrol::logging::init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    let code = match cli::run(cli, config, SystemClock, stdin, &mut stdout) {
        Ok(code) => code,
        Err(err) => {
            err.log_error();
            eprintln!("{}", err.user_message());
            err.exit_code()
        }
    };
    stdout.flush()?;

    Ok(ExitCode::from(code))
}
