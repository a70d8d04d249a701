mod cli;
mod compose;
mod run;
mod simulate;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let config = run::load_config(&cli.global)?;
    match cli.command {
        Command::Compose(args) => compose::run(&config, args),
        Command::Simulate(args) => simulate::run(&config, args),
        Command::Catalog(args) => run::list_catalog(args),
    }
}
