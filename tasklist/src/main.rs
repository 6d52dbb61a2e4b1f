use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use tasklist_core::{
    api::{docs::generate_openapi_json, RestApiServer, TaskApi},
    config::{BackendKind, TaskListConfig},
    error::TaskListResult,
    observability::{init_tracing, TracingSink},
    storage::{KeyValueBackend, MemoryBackend, RedbBackend, TaskStore},
};

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Personal task-list service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Serve the task API over HTTP
    Serve {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bind address, overrides the configuration (e.g. 0.0.0.0:3000)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show how many tasks a user owns
    Quota {
        /// User identifier (the token subject)
        #[arg(long)]
        user: String,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the OpenAPI document
    Openapi,
}

fn open_store(config: &TaskListConfig) -> TaskListResult<TaskStore> {
    let backend: Arc<dyn KeyValueBackend> = match config.storage.backend {
        BackendKind::Redb => Arc::new(RedbBackend::open(
            config.storage.database_path(),
            &config.storage.table_name,
        )?),
        BackendKind::Memory => {
            warn!("Using the in-memory backend, tasks are lost on exit");
            Arc::new(MemoryBackend::new())
        }
    };

    Ok(TaskStore::new(backend, config.storage.max_tasks_per_user))
}

fn load_config(path: Option<&Path>, bind: Option<String>) -> TaskListResult<TaskListConfig> {
    let mut config = TaskListConfig::load(path)?;
    if let Some(bind) = bind {
        config.server.bind_address = bind;
        config.validate()?;
    }
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> TaskListResult<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, bind } => {
            let config = load_config(config.as_deref(), bind)?;
            let store = open_store(&config)?;

            info!(
                "Starting task-list service (table {}, {} tasks per user)",
                config.storage.table_name, config.storage.max_tasks_per_user
            );

            let api = TaskApi::new(store, &config, Arc::new(TracingSink));
            RestApiServer::new(config.server.clone(), Arc::new(api), &config.storage.table_name)
                .serve_with_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Quota { user, config } => {
            let config = load_config(config.as_deref(), None)?;
            let store = open_store(&config)?;
            let count = store.count(&user).await?;
            println!("{}: {}/{} tasks", user, count, store.max_tasks());
        }
        Commands::Openapi => {
            println!("{}", generate_openapi_json());
        }
    }

    Ok(())
}
