use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    booktrack::logging::init().context("init logging")?;

    let cli = booktrack::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        booktrack::cli::Command::Generate(args) => {
            booktrack::generate::run(args).await.context("generate")?;
        }
        booktrack::cli::Command::Lookup(args) => {
            booktrack::books::run(args).await.context("lookup")?;
        }
        booktrack::cli::Command::Profile(args) => {
            booktrack::profile::run(args).await.context("profile")?;
        }
        booktrack::cli::Command::Tracks(args) => {
            booktrack::matching::run(args).await.context("tracks")?;
        }
        booktrack::cli::Command::Playlist(args) => {
            booktrack::playlist::run(args).await.context("playlist")?;
        }
    }

    Ok(())
}
