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
    campus_books::logging::init().context("init logging")?;

    let cli = campus_books::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        campus_books::cli::Command::Scrape(args) => {
            campus_books::catalog::ingest::run(args)
                .await
                .context("scrape")?;
        }
        campus_books::cli::Command::Status(args) => {
            campus_books::catalog::query::status(args)
                .await
                .context("status")?;
        }
        campus_books::cli::Command::Recommend(args) => {
            campus_books::catalog::query::recommend(args)
                .await
                .context("recommend")?;
        }
        campus_books::cli::Command::Summary(args) => {
            campus_books::catalog::summary::run(args)
                .await
                .context("summary")?;
        }
    }

    Ok(())
}
