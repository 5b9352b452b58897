use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use mg_app::cli::{Cli, Command};
use mg_app::pipeline;
use mg_core::config::{CodecConfig, load_config};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CodecConfig::default(),
    };

    match &cli.command {
        Command::Mcep(args) => pipeline::run_mcep(args, &config),
        Command::Mgc2mgc(args) => pipeline::run_mgc2mgc(args, &config),
        Command::Mgc2sp(args) => pipeline::run_mgc2sp(args, &config),
    }
}
