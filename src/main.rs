use clap::Parser;
use colored::Colorize;
use restamp::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli::dispatch(cli) {
        eprintln!("{} {}", "error:".bright_red().bold(), err);
        std::process::exit(1);
    }
}
