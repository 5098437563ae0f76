use anyhow::Result;
use clap::{Parser, Subcommand};
use client::ApiClient;
use common::{ClientConfig, JobId, JobStatus, Session, Variant};
use jobs::FilterMode;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

/// Command line client for the Aegis content filtering service
#[derive(Debug, Parser)]
#[command(name = "studio", version, about = "Upload media for filtering and inspect the results")]
struct Cli {
    /// Backend base URL, overrides AEGIS_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the signed-in user
    Whoami,
    /// Forget the stored session token
    Logout,
    /// Upload a file, follow processing and print the filtered segments
    Process {
        file: PathBuf,
        #[arg(long, default_value_t = FilterMode::Full)]
        mode: FilterMode,
        /// `.srt` or `.vtt` subtitles used to guide detection
        #[arg(long)]
        subtitles: Option<PathBuf>,
    },
    /// List jobs
    List {
        #[arg(long)]
        status: Option<JobStatus>,
    },
    /// Delete a job and its files
    Delete { id: JobId },
    /// Print a directly playable download URL
    Url {
        id: JobId,
        #[arg(long, default_value_t = Variant::Processed)]
        variant: Variant,
    },
    /// Download a job's original or processed file
    Download {
        id: JobId,
        #[arg(long, default_value_t = Variant::Processed)]
        variant: Variant,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Aggregate job counters
    Stats,
    /// Files in the backend output directory
    Outputs,
    /// Check that the backend is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter_layer)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_string();
    }

    info!("Using backend at {}", config.api_url);

    let session = Session::from_file(&config.token_path);
    let api = ApiClient::new(&config, session)?;

    match cli.command {
        Command::Login { email, password } => commands::login(&api, &email, &password).await,
        Command::Register { email, password } => {
            commands::register(&api, &email, &password).await
        }
        Command::Whoami => commands::whoami(&api).await,
        Command::Logout => {
            commands::logout(&api);
            Ok(())
        }
        Command::Process {
            file,
            mode,
            subtitles,
        } => commands::process(&api, &config, &file, mode, subtitles.as_deref()).await,
        Command::List { status } => commands::list(&api, status).await,
        Command::Delete { id } => commands::delete(&api, id).await,
        Command::Url { id, variant } => {
            println!("{}", api.download_url(id, variant));
            Ok(())
        }
        Command::Download { id, variant, out } => {
            commands::download(&api, id, variant, out).await
        }
        Command::Stats => commands::stats(&api).await,
        Command::Outputs => commands::outputs(&api).await,
        Command::Health => commands::health(&api).await,
    }
}
