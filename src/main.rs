use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;

mod export;
mod ingest;
mod pipeline;
mod sentiment;
mod settings;
mod store;
mod telemetry;

#[derive(Parser)]
#[command(name = "crawler", about = "Financial news sentiment crawler")]
struct Cli {
    /// Override the JSON export path
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Override the database connection string (e.g. sqlite://data/news.db)
    #[arg(short, long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // initialize logging/tracing (stderr). Respect RUST_LOG and CRAWLER_LOG_FORMAT
    telemetry::config::init_tracing();

    let mut settings = settings::Settings::from_env()?;
    if let Some(output) = cli.output {
        settings.output_path = output;
    }
    if let Some(database) = cli.database {
        settings.database_url = database;
    }

    let records = pipeline::run(&settings).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
