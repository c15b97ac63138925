use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use galleria::{
    Config, create_app,
    form::{SubmitOutcome, UploadForm},
    images::{ImageCache, ImageStore, LocalFileStorage, SelectedFile},
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage the image collection
    #[command(subcommand)]
    Images(ImageCommands),
}

#[derive(Subcommand, Debug)]
enum ImageCommands {
    /// List all images in collection order
    List,
    /// Upload a file and register it as a new image
    Add {
        /// Path to a PNG, JPEG or GIF file
        file: PathBuf,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(&cli.log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Images(cmd)) => handle_image_command(config, cmd).await,
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        None => run_server(config, None, None, None).await,
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// `RUST_LOG` directives win over `--log-level` when set.
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).to_string().to_lowercase()))
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        info!("Configuration loaded from: {:?}", config_path);
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

async fn handle_image_command(
    config: Config,
    cmd: ImageCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(ImageStore::new(&config.storage.data_directory));

    match cmd {
        ImageCommands::List => {
            let images = store.list().await;
            if images.is_empty() {
                println!("No images in {:?}", config.storage.data_directory);
            } else {
                for image in images {
                    println!(
                        "{}  {}  {:<20}  {}",
                        image.id,
                        image.created_at.format("%Y-%m-%d %H:%M"),
                        image.title,
                        image.url
                    );
                }
            }
        }
        ImageCommands::Add {
            file,
            title,
            description,
        } => {
            let data = tokio::fs::read(&file).await?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let media_type = mime_guess::from_path(&file).first_or_octet_stream();

            let storage = Arc::new(LocalFileStorage::new(
                config.storage.uploads_directory.clone(),
                config.uploads_url_prefix(),
            ));
            let mut form = UploadForm::new(store, storage, Arc::new(ImageCache::new()));
            form.set_title(title);
            form.set_description(description);

            if form
                .select_file(SelectedFile::new(name, media_type.to_string(), data))
                .is_ok()
                && let Err(e) = form.upload().await
            {
                tracing::warn!("Upload of {:?} failed: {}", file, e);
            }

            match form.submit().await? {
                SubmitOutcome::Invalid(errors) => {
                    for (field, message) in errors.iter() {
                        eprintln!("Error: {}: {}", field, message);
                    }
                    std::process::exit(1);
                }
                SubmitOutcome::Created { image, toast } => {
                    println!("{}: {} ({})", toast.title, image.id, image.url);
                }
                outcome => {
                    if let Some(toast) = outcome.toast() {
                        eprintln!("Error: {}. {}", toast.title, toast.description);
                    }
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Template directory: {:?}", config.templates.directory);
    info!(
        "Static files directory: {:?}",
        config.static_files.directory
    );
    info!("Data directory: {:?}", config.storage.data_directory);
    info!("Uploads directory: {:?}", config.storage.uploads_directory);

    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => {}
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_app(config).await;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_cli_parses_image_commands() {
        let cli = Cli::parse_from([
            "galleria",
            "--log-level",
            "debug",
            "images",
            "add",
            "photo.png",
            "--title",
            "My Photo",
            "--description",
            "A nice day",
        ]);
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(
            cli.command,
            Some(Commands::Images(ImageCommands::Add { ref title, .. })) if title == "My Photo"
        ));
    }
}
