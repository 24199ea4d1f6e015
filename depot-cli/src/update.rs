//! `depot-update` — consumer-side sync against a remote manifest.

use anyhow::Result;
use clap::Parser;

use depot_cli::{commands::update::UpdateArgs, init_tracing};

#[derive(Parser, Debug)]
#[command(
    name = "depot-update",
    version,
    about = "Sync a local copy with the files listed in a remote manifest",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    args: UpdateArgs,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.args.run()
}
