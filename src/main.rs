// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tokio::io::BufReader;
use tracing::{error, info};

mod annotation;
mod auth;
mod config;
mod console;
mod logging;
mod s3;
mod session;
#[cfg(test)]
mod test_utils;

use crate::annotation::Label;
use crate::auth::SupabaseAuth;
use crate::console::Console;
use crate::s3::S3Storage;
use crate::session::AnnotationSession;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (`.toml`, or a KEY=value file)
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.toml",
        global = true
    )]
    config: String,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration and check that both buckets exist
    Check,
    /// Show annotation progress
    Status,
    /// List the images that still need a label
    List,
    /// Download an image
    Fetch {
        /// Image key within the images bucket
        key: String,

        /// File to write the image to
        #[arg(short, long, value_name = "PATH")]
        out: PathBuf,
    },
    /// Label a single image
    Save {
        /// Image key within the images bucket
        key: String,

        /// Label spelling, slug or 1-based position (see `annotate` -> `labels`)
        label: String,

        /// Free-text comment stored with the label
        #[arg(long, default_value = "")]
        comment: String,

        /// Annotator email
        #[arg(long)]
        email: String,

        /// Annotator password
        #[arg(long, env = "ANNOTATOR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the stored annotation for an image
    Show {
        /// Image key within the images bucket
        key: String,
    },
    /// Start the interactive annotation console
    Annotate,
}

type Session = AnnotationSession<S3Storage, SupabaseAuth>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            let _log_guard = logging::init_logging(None, cli.verbose)?;
            error!("Failed to load configuration from {}: {}", cli.config, e);
            process::exit(1);
        }
    };

    let _log_guard = logging::init_logging(config.logging.as_ref(), cli.verbose)?;
    info!("Lameness annotator v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config);

    let mut session = initialize_session(&config).await?;

    match cli.command {
        Commands::Check => check(&session).await,
        Commands::Status => status(&mut session).await,
        Commands::List => list(&mut session).await,
        Commands::Fetch { key, out } => fetch(&session, &key, &out).await,
        Commands::Save {
            key,
            label,
            comment,
            email,
            password,
        } => save(&mut session, &key, &label, &comment, &email, &password).await,
        Commands::Show { key } => show(&session, &key).await,
        Commands::Annotate => annotate(session).await,
    }
}

async fn initialize_session(config: &config::Config) -> Result<Session> {
    let storage = S3Storage::new(&config.storage)
        .await
        .context("Failed to initialize object storage")?;
    let auth = SupabaseAuth::new(&config.auth).context("Failed to initialize auth backend")?;

    info!(
        "Images in {}/{}, annotations in {}/{}",
        config.storage.images_bucket,
        config.storage.images_folder,
        config.storage.annotations_bucket,
        config.storage.annotations_folder
    );

    Ok(AnnotationSession::new(storage, auth, config))
}

/// The only command allowed to halt on a missing bucket
async fn check(session: &Session) -> Result<()> {
    if let Err(e) = session.verify_buckets().await {
        error!("Configuration check failed: {}", e);
        process::exit(1);
    }

    println!("Configuration OK");
    Ok(())
}

async fn status(session: &mut Session) -> Result<()> {
    session.refresh().await;
    if !session.has_images() {
        println!("No images found in {}", session.images_location());
    }
    println!("{}", session.progress());
    Ok(())
}

async fn list(session: &mut Session) -> Result<()> {
    session.refresh().await;
    if !session.has_images() {
        println!("No images found in {}", session.images_location());
    }
    for key in session.queue() {
        println!("{}", key);
    }
    Ok(())
}

async fn fetch(session: &Session, key: &str, out: &Path) -> Result<()> {
    let data = session
        .image(key)
        .await
        .with_context(|| format!("Failed to fetch {}", key))?;
    tokio::fs::write(out, &data)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!("Wrote {} bytes of {} to {}", data.len(), key, out.display());
    Ok(())
}

async fn save(
    session: &mut Session,
    key: &str,
    label: &str,
    comment: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let label: Label = label.parse()?;
    session.sign_in(email, password).await?;

    let annotation_key = session.save_image(key, label, comment).await?;
    println!("Saved '{}' for {} as {}", label, key, annotation_key);
    println!("{}", session.progress());
    Ok(())
}

async fn show(session: &Session, key: &str) -> Result<()> {
    let record = session
        .annotation(key)
        .await
        .with_context(|| format!("No readable annotation for {}", key))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn annotate(session: Session) -> Result<()> {
    let mut console = Console::new(session);
    let mut stdout = tokio::io::stdout();
    console
        .run(BufReader::new(tokio::io::stdin()), &mut stdout)
        .await?;

    info!("{}", console.session().progress());
    Ok(())
}
