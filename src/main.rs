use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mirror_sync::{
    application::{
        builder::ApplicationBuilder,
        credentials::helper_output,
        migration::{MigrateOptions, MigrationOrchestrator},
        ports::RepoRepository,
    },
    entities::Owner,
    value_objects::{PushMirrorId, RepoId},
    Config,
};

#[derive(Parser)]
#[command(name = "mirror-sync", version, about = "Repository and large-file mirror synchronization")]
struct Cli {
    /// TOML configuration file; environment variables override its values
    #[arg(short = 'c', long = "config", env = "MIRROR_SYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pull and push mirror scheduler until interrupted
    Serve,
    /// Push one push-mirror now
    SyncPush { id: PushMirrorId },
    /// Fetch one pull-mirror now
    SyncPull { repo_id: RepoId },
    /// Import a remote repository into an existing, empty repository row
    Migrate(MigrateArgs),
    /// Answer git's credential requests; git appends the operation
    CredentialHelper {
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        password: String,
        operation: Option<String>,
    },
}

#[derive(clap::Args)]
struct MigrateArgs {
    #[arg(long)]
    repo_id: RepoId,
    #[arg(long)]
    clone_addr: String,
    #[arg(long, default_value = "")]
    auth_username: String,
    #[arg(long, env = "MIGRATE_AUTH_PASSWORD", default_value = "", hide_env_values = true)]
    auth_password: String,
    #[arg(long, env = "MIGRATE_AUTH_TOKEN", default_value = "", hide_env_values = true)]
    auth_token: String,
    /// Keep the repository as a pull mirror of the remote
    #[arg(long)]
    mirror: bool,
    /// Go-style duration such as `8h` or `10m30s`
    #[arg(long, default_value = "")]
    mirror_interval: String,
    #[arg(long)]
    wiki: bool,
    #[arg(long)]
    lfs: bool,
    #[arg(long, default_value = "")]
    lfs_endpoint: String,
}

impl MigrateArgs {
    fn options(&self, repo_name: &str) -> MigrateOptions {
        MigrateOptions {
            auth_username: self.auth_username.clone(),
            auth_password: self.auth_password.clone(),
            auth_token: self.auth_token.clone(),
            wiki: self.wiki,
            lfs: self.lfs,
            lfs_endpoint: self.lfs_endpoint.clone(),
            mirror: self.mirror,
            mirror_interval: self.mirror_interval.clone(),
            ..MigrateOptions::new(self.clone_addr.clone(), repo_name)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    // Git reads the credential helper's stdout, so logs go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::CredentialHelper {
        username,
        password,
        operation,
    } = &cli.command
    {
        // Only `get` expects an answer; `store` and `erase` are no-ops.
        if operation.as_deref().unwrap_or("get") == "get" {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(helper_output(username, password).as_bytes())?;
            stdout.flush()?;
        }
        return Ok(());
    }

    init_tracing();

    let config = Config::load(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    config.validate().map_err(anyhow::Error::msg)?;
    info!("Configuration loaded and validated");

    let run_migrations = matches!(cli.command, Command::Serve);
    let services = ApplicationBuilder::new(config)
        .with_database(run_migrations)
        .await
        .map_err(|e| anyhow::anyhow!("database setup failed: {e}"))?
        .with_infrastructure()
        .await
        .map_err(|e| anyhow::anyhow!("infrastructure setup failed: {e}"))?
        .build()
        .map_err(|e| anyhow::anyhow!("service setup failed: {e}"))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, shutting down");
            on_signal.cancel();
        }
    });

    let result = match cli.command {
        Command::Serve => {
            info!("Mirror scheduler started");
            let stats = services.scheduler.clone().run(cancel).await;
            info!(
                passes = stats.passes_completed,
                synced = stats.total_synced,
                failed = stats.total_failed,
                errors = stats.total_errors,
                "Mirror scheduler stopped"
            );
            Ok(())
        }
        Command::SyncPush { id } => {
            if services.push.sync_push_mirror(&cancel, id).await {
                Ok(())
            } else {
                Err(anyhow::anyhow!("push mirror {id} failed; see last_error"))
            }
        }
        Command::SyncPull { repo_id } => {
            if services.pull.sync_pull_mirror(&cancel, repo_id).await {
                Ok(())
            } else {
                Err(anyhow::anyhow!("pull mirror of repository {repo_id} failed; see last_error"))
            }
        }
        Command::Migrate(args) => migrate(&services.repos, &services.migration, &cancel, &args).await,
        Command::CredentialHelper { .. } => Ok(()),
    };

    services.pool.close().await;
    result
}

async fn migrate(
    repos: &Arc<dyn RepoRepository>,
    orchestrator: &MigrationOrchestrator,
    cancel: &CancellationToken,
    args: &MigrateArgs,
) -> anyhow::Result<()> {
    let Some(repo) = repos
        .find_by_id(args.repo_id)
        .await
        .context("loading repository")?
    else {
        bail!("repository {} does not exist", args.repo_id);
    };
    let owner = Owner::new(repo.owner_id, repo.owner_name.clone());
    let options = args.options(&repo.name);

    let report = match orchestrator
        .migrate_repository_git_data(cancel, &owner, repo, &options)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            error!("Migration failed: {}", e);
            return Err(e.into());
        }
    };

    info!(
        repository = %report.repository,
        wiki = report.wiki_imported,
        cancelled = report.cancelled,
        "Migration finished"
    );
    if let Some(lfs) = &report.lfs {
        info!("Large-file objects: {}", lfs.summary());
    }
    for step in &report.degraded {
        warn!("Degraded: {}", step);
    }
    Ok(())
}
