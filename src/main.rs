/*!
 * orbit-wagon CLI
 *
 * Drives the deploy wagon against the repository named in a TOML config:
 * register the wagon, connect, run one operation, disconnect.
 */

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use orbit_wagon::{
    config::{LogLevel, WagonConfig},
    error::{TransportError, EXIT_NOT_FOUND, EXIT_SUCCESS},
    logging,
    registry::{ComponentContainer, WagonRegistry},
    transport::{
        DefaultRepositoryTransportFactory, HostServices, LoggingProgressLoggerFactory,
        RepositoryTransportFactory,
    },
    wagon::{Repository, TransferEvent, TransferEventType, Wagon, WagonError},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "orbit-wagon")]
#[command(version, about = "Deploy and fetch build artifacts in S3 through a wagon", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long = "log-level", value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Log file path (JSON lines); stderr when omitted
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List artifact names directly under a repository directory
    List {
        #[arg(default_value = "")]
        directory: String,
    },

    #[command(flatten)]
    Transfer(WagonCommand),
}

/// Operations that run through a connected wagon
#[derive(Subcommand)]
enum WagonCommand {
    /// Download a resource from the repository
    Get {
        /// Resource name relative to the repository root
        resource: String,
        /// Local destination file
        destination: PathBuf,
    },

    /// Download a resource only if the remote copy is newer
    GetIfNewer {
        resource: String,
        destination: PathBuf,
        /// Reference time (RFC 3339); defaults to the destination's mtime
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },

    /// Upload a local file to the repository
    Put {
        /// Local source file
        source: PathBuf,
        /// Resource name relative to the repository root
        resource: String,
    },

    /// Check whether a resource exists
    Exists { resource: String },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Wagon(#[from] WagonError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Transport(e) => e.exit_code(),
            CliError::Wagon(e) => e.exit_code(),
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32, CliError> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().ok_or_else(|| {
        TransportError::configuration("A configuration file is required (--config)")
    })?;
    let mut config = WagonConfig::from_file(&config_path)?;

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        TransportError::configuration_with("Failed to start async runtime", e)
    })?;

    runtime.block_on(execute(cli.command, config))
}

async fn execute(command: Commands, config: WagonConfig) -> Result<i32, CliError> {
    let repository = config.artifact_repository()?;
    let host = HostServices {
        progress_logger_factory: Some(Arc::new(LoggingProgressLoggerFactory)),
        ..Default::default()
    };
    let transports = Arc::new(DefaultRepositoryTransportFactory::new(
        config.s3.clone(),
        host,
    ));

    let operation = match command {
        // Listing is not part of the wagon contract; go straight to the transport.
        Commands::List { directory } => {
            let transport = transports
                .create_transport(
                    &repository.protocol(),
                    repository.name(),
                    Some(repository.credentials()),
                )
                .await?;
            let parent = repository.resolve(&format!("{}/", directory.trim_end_matches('/')))?;
            for name in transport.repository().list(&parent).await? {
                println!("{}", name);
            }
            return Ok(EXIT_SUCCESS);
        }
        Commands::Transfer(operation) => operation,
    };

    let registry = WagonRegistry::new();
    let container = ComponentContainer::new();
    let wagon = registry.register(&container, &repository, transports).await?;

    wagon.add_transfer_listener(Arc::new(|event: &TransferEvent| match event.event_type {
        TransferEventType::Completed => {
            info!("{} {} completed", event.request_type, event.resource)
        }
        TransferEventType::Error => warn!(
            "{} {} failed: {}",
            event.request_type,
            event.resource,
            event.error.as_deref().unwrap_or("unknown cause")
        ),
        _ => debug!("{} {} {:?}", event.request_type, event.resource, event.event_type),
    }));

    wagon.connect(Repository::new(
        repository.name(),
        repository.url().as_str(),
    ));
    let outcome = run_operation(&*wagon, operation).await;
    wagon.disconnect();

    outcome
}

async fn run_operation(wagon: &dyn Wagon, operation: WagonCommand) -> Result<i32, CliError> {
    match operation {
        WagonCommand::Get {
            resource,
            destination,
        } => {
            wagon.get(&resource, &destination).await?;
            println!("{} -> {}", resource, destination.display());
            Ok(EXIT_SUCCESS)
        }
        WagonCommand::GetIfNewer {
            resource,
            destination,
            since,
        } => {
            let since = match since {
                Some(since) => since,
                None => match local_modified(&destination).await {
                    Some(modified) => modified,
                    None => {
                        wagon.get(&resource, &destination).await?;
                        println!("{} -> {}", resource, destination.display());
                        return Ok(EXIT_SUCCESS);
                    }
                },
            };
            if wagon
                .get_if_newer(&resource, &destination, since.timestamp_millis())
                .await?
            {
                println!("{} -> {}", resource, destination.display());
            } else {
                println!("{} is up to date", destination.display());
            }
            Ok(EXIT_SUCCESS)
        }
        WagonCommand::Put { source, resource } => {
            wagon.put(&source, &resource).await?;
            println!("{} -> {}", source.display(), resource);
            Ok(EXIT_SUCCESS)
        }
        WagonCommand::Exists { resource } => {
            let exists = wagon.resource_exists(&resource).await?;
            println!("{}", exists);
            Ok(if exists { EXIT_SUCCESS } else { EXIT_NOT_FOUND })
        }
    }
}

async fn local_modified(path: &std::path::Path) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.modified().ok().map(DateTime::<Utc>::from)
}
