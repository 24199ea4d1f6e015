//! `depot-publish` — publisher-side manifest builder.

use anyhow::Result;
use clap::Parser;

use depot_cli::{commands::publish::PublishArgs, init_tracing};

#[derive(Parser, Debug)]
#[command(
    name = "depot-publish",
    version,
    about = "Rebuild the content manifest for a project's tracked directories",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    args: PublishArgs,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.args.run()
}
