//! Main entry point for the mkfw CLI tool

use clap::Parser;
use colored::Colorize;
use mkfw::ErrorCategory;
use mkfw::cli::{Args, run_cli};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ErrorCategory::InvalidParams.exit_code()
            } else {
                0
            };
            std::process::exit(code);
        }
    };

    if let Err(e) = run_cli(args) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.category().exit_code());
    }
}
