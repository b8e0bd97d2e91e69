use clap::Parser;
use tactical_alloc::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
