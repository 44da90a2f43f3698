use std::process::ExitCode;

use clap::Parser;
use vikunja_cli::Vikunja;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Vikunja::parse();
    cli.exec()
}
