use anyhow::Result;
use clap::Parser;
use sinew::cli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
