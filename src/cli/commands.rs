//! CLI command definitions for shipwright.
//!
//! This module wires configuration, the Redis queue, the Postgres store,
//! and the Docker-backed deploy engine into runnable commands.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::engine::{DeployEngine, DockerRuntime, EngineConfig, PgPortAllocator};
use crate::model::{AppType, Application, Deployment};
use crate::queue::{DeployRequest, Job, JobQueue, WorkerPool, WorkerPoolConfig};
use crate::store::{Database, DeploymentStore};

/// Container deployment orchestrator.
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(about = "Queue-driven container deployment orchestrator")]
#[command(version)]
#[command(
    long_about = "shipwright builds application images from git repositories and runs them as containers.\n\nDeployments are submitted as durable jobs on a Redis queue and processed by a worker pool.\n\nExample usage:\n  shipwright enqueue --name my-app --git-url https://github.com/acme/my-app.git\n  shipwright worker --workers 2"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the deployment worker pool until interrupted.
    Worker(WorkerArgs),

    /// Create a deployment record and enqueue a deploy job for it.
    #[command(alias = "deploy")]
    Enqueue(EnqueueArgs),

    /// Stop a running deployment and remove its container.
    Stop(StopArgs),

    /// Apply the database schema migrations and exit.
    Migrate,

    /// Show queue depths and, optionally, one deployment record.
    Status(StatusArgs),
}

/// Arguments for `shipwright worker`.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Number of concurrent workers; overrides the WORKERS env variable.
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Arguments for `shipwright enqueue`.
#[derive(Parser, Debug)]
pub struct EnqueueArgs {
    /// Application name, used for logging only.
    #[arg(long)]
    pub name: String,

    /// Application type: web-application, bot-service, or generic-server.
    #[arg(long, default_value = "web-application", value_parser = parse_app_type)]
    pub app_type: AppType,

    /// Git repository URL to deploy.
    #[arg(long)]
    pub git_url: String,

    /// Branch to deploy.
    #[arg(long, default_value = "main")]
    pub git_branch: String,

    /// Subfolder within the repository; "." is the repository root.
    #[arg(long, default_value = ".")]
    pub git_folder: String,

    /// Access token for private repositories (can also use GIT_TOKEN env var).
    #[arg(long, env = "GIT_TOKEN")]
    pub git_token: Option<String>,

    /// Environment variable for the built image, as KEY=VALUE. Repeatable.
    #[arg(short, long = "env", value_parser = parse_env_pair)]
    pub environment: Vec<(String, String)>,

    /// Override the type's default install command.
    #[arg(long)]
    pub install_command: Option<String>,

    /// Override the type's default build command.
    #[arg(long)]
    pub build_command: Option<String>,

    /// Override the type's default start command.
    #[arg(long)]
    pub start_command: Option<String>,

    /// Application id; a fresh one is generated when omitted.
    #[arg(long)]
    pub app_id: Option<Uuid>,
}

/// Arguments for `shipwright stop`.
#[derive(Parser, Debug)]
pub struct StopArgs {
    /// Deployment to stop.
    #[arg(long)]
    pub deployment: Uuid,
}

/// Arguments for `shipwright status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Also fetch this deployment record from the store.
    #[arg(long)]
    pub deployment: Option<Uuid>,
}

fn parse_app_type(value: &str) -> Result<AppType, String> {
    match value {
        "web-application" => Ok(AppType::WebApplication),
        "bot-service" => Ok(AppType::BotService),
        "generic-server" => Ok(AppType::GenericServer),
        other => Err(format!(
            "unknown app type '{other}', expected web-application, bot-service, or generic-server"
        )),
    }
}

fn parse_env_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("invalid environment variable '{value}', expected KEY=VALUE")),
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = OrchestratorConfig::from_env()?;

    match cli.command {
        Commands::Worker(args) => run_worker_command(config, args).await,
        Commands::Enqueue(args) => run_enqueue_command(config, args).await,
        Commands::Stop(args) => run_stop_command(config, args).await,
        Commands::Migrate => run_migrate_command(config).await,
        Commands::Status(args) => run_status_command(config, args).await,
    }
}

async fn run_worker_command(mut config: OrchestratorConfig, args: WorkerArgs) -> anyhow::Result<()> {
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let queue = Arc::new(JobQueue::connect(&config.redis_url, &config.queue_name).await?);
    let (engine, store) = build_engine(&config, database)?;

    let mut pool = WorkerPool::new(WorkerPoolConfig::from(&config), queue, engine, store);
    pool.start().await?;

    info!(workers = config.workers, queue = %config.queue_name, "Worker running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Interrupt received, shutting down");
    if let Err(e) = pool.shutdown().await {
        error!(error = %e, "Worker pool did not shut down cleanly");
    }

    Ok(())
}

/// Wires the Docker runtime, store, and port allocator into an engine.
fn build_engine(
    config: &OrchestratorConfig,
    database: Database,
) -> anyhow::Result<(Arc<DeployEngine>, Arc<dyn DeploymentStore>)> {
    let runtime = Arc::new(DockerRuntime::new()?);
    let ports = Arc::new(PgPortAllocator::new(
        database.clone(),
        config.port_range_start,
        config.port_range_end,
    ));
    let store: Arc<dyn DeploymentStore> = Arc::new(database);

    let engine = Arc::new(DeployEngine::new(
        runtime,
        Arc::clone(&store),
        ports,
        EngineConfig {
            public_host: config.public_host.clone(),
            build_timeout: config.build_timeout,
            run_timeout: config.run_timeout,
        },
    ));

    Ok((engine, store))
}

async fn run_enqueue_command(config: OrchestratorConfig, args: EnqueueArgs) -> anyhow::Result<()> {
    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;

    let app = Application {
        id: args.app_id.unwrap_or_else(Uuid::new_v4),
        name: args.name.clone(),
        app_type: args.app_type,
        git_url: args.git_url,
        git_branch: args.git_branch,
        git_token: args.git_token,
        git_folder: args.git_folder,
        environment: args.environment.into_iter().collect(),
        start_command: args.start_command,
        install_command: args.install_command,
        build_command: args.build_command,
    };

    let deployment = Deployment::pending(app.id);
    database.create_deployment(&deployment).await?;

    let request = DeployRequest::from_application(&app, deployment.id);

    let job = Job::deploy(request).with_max_attempts(config.max_attempts);
    let job_id = job.id;

    let queue = JobQueue::connect(&config.redis_url, &config.queue_name).await?;
    queue.enqueue(&job).await?;

    info!(
        name = %app.name,
        app_type = %app.app_type,
        app_id = %app.id,
        deployment_id = %deployment.id,
        job_id = %job_id,
        "Deployment enqueued"
    );
    println!("deployment_id: {}", deployment.id);
    println!("job_id: {}", job_id);

    Ok(())
}

async fn run_stop_command(config: OrchestratorConfig, args: StopArgs) -> anyhow::Result<()> {
    let database = Database::connect(&config.database_url).await?;
    let (engine, _) = build_engine(&config, database)?;

    engine.stop(args.deployment).await?;
    info!(deployment_id = %args.deployment, "Deployment stopped");
    println!("deployment {} stopped", args.deployment);

    Ok(())
}

async fn run_migrate_command(config: OrchestratorConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!("Migrations applied");
    Ok(())
}

async fn run_status_command(config: OrchestratorConfig, args: StatusArgs) -> anyhow::Result<()> {
    let queue = JobQueue::connect(&config.redis_url, &config.queue_name).await?;
    let stats = queue.stats().await?;

    println!("queue: {}", config.queue_name);
    println!("  pending:     {}", stats.pending_jobs);
    println!("  processing:  {}", stats.processing_jobs);
    println!("  dead letter: {}", stats.dead_letter_jobs);

    if let Some(deployment_id) = args.deployment {
        let database = Database::connect(&config.database_url).await?;
        match database.get_deployment(deployment_id).await? {
            Some(deployment) => {
                println!("deployment: {}", deployment.id);
                println!("  app:       {}", deployment.app_id);
                println!("  status:    {}", deployment.status);
                if let Some(url) = &deployment.url {
                    println!("  url:       {url}");
                }
                if let Some(container_id) = &deployment.container_id {
                    println!("  container: {container_id}");
                }
                if let Some(image_tag) = &deployment.image_tag {
                    println!("  image:     {image_tag}");
                }
                if let Some(error) = &deployment.error {
                    println!("  error:     {error}");
                }
            }
            None => {
                warn!(deployment_id = %deployment_id, "Deployment not found");
                println!("deployment {deployment_id}: not found");
            }
        }
    }

    Ok(())
}
