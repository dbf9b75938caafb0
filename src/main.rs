use anyhow::Result;
use clap::Parser;
use purse::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    purse::observability::init(cli.verbose);
    cli.run().await
}
