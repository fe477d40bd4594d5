/// Fetchkeep CLI
///
/// Downloads URLs into the configured directory and manages the persisted
/// progress records.
use clap::{Parser, Subcommand};
use fetchkeep::{DownloadRecord, Downloader, DownloaderConfig};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "fetchkeep", version, about = "Single-file downloads with persisted progress")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download one or more URLs concurrently
    Download {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Show every stored download record
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the record for one file name
    Show {
        filename: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove all completed records
    Clear,
    /// Remove one record by id
    Remove { id: String },
}

fn print_record(record: &DownloadRecord) {
    let total = record
        .total_bytes
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    let percent = record
        .percent
        .map(|p| format!("{}%", p))
        .unwrap_or_else(|| "--".to_string());
    println!(
        "{}  {:<11} {:>5}  {}/{}  {}",
        record.id,
        record.status().to_string(),
        percent,
        record.received_bytes,
        total,
        record.filename
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fetchkeep=info,fetchkeep_shared=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Config
    let config = DownloaderConfig::from_env();
    config.ensure_dirs()?;

    // Database
    let pool = fetchkeep_shared::db::create_pool(&config.database_url()).await?;
    fetchkeep_shared::db::run_migrations(&pool).await?;

    let downloader = Downloader::new(pool, config);

    match cli.command {
        Command::Download { urls } => {
            let mut handles = Vec::with_capacity(urls.len());
            for url in urls {
                let downloader = downloader.clone();
                handles.push(tokio::spawn(async move {
                    let result = downloader.download(&url).await;
                    (url, result)
                }));
            }

            let mut failed = 0usize;
            for handle in handles {
                let (url, result) = handle.await?;
                match result {
                    Ok(record) => info!("Saved {} to {}", url, record.local_path),
                    Err(e) => {
                        error!("{}: {}", url, e);
                        failed += 1;
                    }
                }
            }

            if failed > 0 {
                anyhow::bail!("{} download(s) failed", failed);
            }
        }
        Command::List { json } => {
            let records = downloader.update_download_list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    print_record(record);
                }
            }
        }
        Command::Show { filename, json } => match downloader.find_download(&filename).await? {
            Some(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
            Some(record) => print_record(&record),
            None => anyhow::bail!("No download named {}", filename),
        },
        Command::Clear => {
            let removed = downloader.remove_all_completed().await?;
            println!("Removed {} completed download(s)", removed);
        }
        Command::Remove { id } => {
            let removed = downloader.remove_completed(&id).await?;
            println!("Removed {} download(s)", removed);
        }
    }

    Ok(())
}
