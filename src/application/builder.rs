use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::application::{
    credentials::CredentialInjector,
    lfs::ObjectTransferPipeline,
    migration::MigrationOrchestrator,
    mirror::{MirrorScheduler, PullMirrorSyncer, PushMirrorSyncer},
    ports::{
        ContentStore, LfsClientFactory, LfsMetaRepository, MirrorRepository, PointerScanner,
        PushMirrorRepository, ReleaseRepository, RepoRepository, UserRepository, VcsClient,
    },
    tags::TagReconciler,
};
use crate::config::Config;
use crate::infrastructure::{
    git::{GitCli, GitPointerScanner},
    lfs::LfsClientRouter,
    persistence::{
        PostgresLfsMetaRepository, PostgresMirrorRepository, PostgresPushMirrorRepository,
        PostgresReleaseRepository, PostgresRepoRepository, PostgresUserRepository,
    },
    storage::LocalContentStore,
};

type BoxError = Box<dyn std::error::Error>;

/// Ports wired to their adapters
struct Infrastructure {
    vcs: Arc<dyn VcsClient>,
    repos: Arc<dyn RepoRepository>,
    users: Arc<dyn UserRepository>,
    mirrors: Arc<dyn MirrorRepository>,
    push_mirrors: Arc<dyn PushMirrorRepository>,
    releases: Arc<dyn ReleaseRepository>,
    lfs_meta: Arc<dyn LfsMetaRepository>,
    content_store: Arc<dyn ContentStore>,
    scanner: Arc<dyn PointerScanner>,
    lfs_clients: Arc<dyn LfsClientFactory>,
}

/// Everything the binary drives
pub struct Services {
    pub pool: sqlx::PgPool,
    pub repos: Arc<dyn RepoRepository>,
    pub migration: Arc<MigrationOrchestrator>,
    pub pull: Arc<PullMirrorSyncer>,
    pub push: Arc<PushMirrorSyncer>,
    pub scheduler: Arc<MirrorScheduler>,
}

/// Application builder for clean dependency injection and setup
pub struct ApplicationBuilder {
    config: Config,
    pool: Option<sqlx::PgPool>,
    infrastructure: Option<Infrastructure>,
}

impl ApplicationBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pool: None,
            infrastructure: None,
        }
    }

    /// Initialize database connection pool with retry logic
    pub async fn with_database(mut self, run_migrations: bool) -> Result<Self, BoxError> {
        info!("Connecting to database");

        let mut retries = 3;
        let mut delay = Duration::from_secs(1);
        let pool = loop {
            match PgPoolOptions::new()
                .max_connections(self.config.db_max_connections)
                .min_connections(self.config.db_min_connections)
                .acquire_timeout(Duration::from_secs(self.config.db_acquire_timeout_secs))
                .idle_timeout(Some(Duration::from_secs(self.config.db_idle_timeout_secs)))
                .max_lifetime(Some(Duration::from_secs(self.config.db_max_lifetime_secs)))
                .connect(&self.config.database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) if retries > 0 => {
                    retries -= 1;
                    tracing::warn!(
                        "Database connection failed, retrying in {:?} ({} retries left): {}",
                        delay,
                        retries,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!("Failed to connect to database after retries: {}", e);
                    return Err(Box::new(e));
                }
            }
        };

        info!(
            "Database pool configured: max={}, min={}, acquire_timeout={}s",
            self.config.db_max_connections,
            self.config.db_min_connections,
            self.config.db_acquire_timeout_secs,
        );

        if run_migrations {
            info!("Running database migrations");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to run migrations: {}", e);
                    e
                })?;
        }

        self.pool = Some(pool);
        Ok(self)
    }

    /// Initialize repositories, the content store and the git/LFS adapters
    pub async fn with_infrastructure(mut self) -> Result<Self, BoxError> {
        let pool = self.pool.as_ref().ok_or("Database pool not initialized")?;

        let content_store = Arc::new(LocalContentStore::with_durability(
            self.config.lfs_content_root.clone(),
            self.config.lfs_durable_writes,
        ));
        content_store.init().await?;

        let lfs_clients = LfsClientRouter::new(
            self.config.lfs_batch_size,
            Duration::from_secs(self.config.lfs_request_timeout_secs),
        )?;

        self.infrastructure = Some(Infrastructure {
            vcs: Arc::new(GitCli::new(Duration::from_secs(self.config.git_timeout_secs))),
            repos: Arc::new(PostgresRepoRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            mirrors: Arc::new(PostgresMirrorRepository::new(pool.clone())),
            push_mirrors: Arc::new(PostgresPushMirrorRepository::new(pool.clone())),
            releases: Arc::new(PostgresReleaseRepository::new(pool.clone())),
            lfs_meta: Arc::new(PostgresLfsMetaRepository::new(pool.clone())),
            content_store,
            scanner: Arc::new(GitPointerScanner::new(self.config.scan_queue_capacity)),
            lfs_clients: Arc::new(lfs_clients),
        });

        info!(
            repo_root = %self.config.repo_root.display(),
            lfs_root = %self.config.lfs_content_root.display(),
            "Infrastructure layer initialized"
        );
        Ok(self)
    }

    /// Build the syncers, the scheduler and the migration orchestrator
    pub fn build(self) -> Result<Services, BoxError> {
        let pool = self.pool.ok_or("Database pool not initialized")?;
        let infra = self
            .infrastructure
            .ok_or("Infrastructure not initialized")?;
        let credentials = CredentialInjector::new(self.config.credential_helper());

        let tags = Arc::new(TagReconciler::new(
            Arc::clone(&infra.vcs),
            Arc::clone(&infra.releases),
            Arc::clone(&infra.users),
        ));
        let transfer = Arc::new(ObjectTransferPipeline::new(
            Arc::clone(&infra.content_store),
            Arc::clone(&infra.lfs_meta),
            Arc::clone(&infra.scanner),
            self.config.transfer(),
        ));

        let migration = Arc::new(MigrationOrchestrator::new(
            Arc::clone(&infra.vcs),
            credentials.clone(),
            Arc::clone(&tags),
            Arc::clone(&transfer),
            Arc::clone(&infra.lfs_clients),
            Arc::clone(&infra.repos),
            Arc::clone(&infra.mirrors),
            self.config.migration(),
        ));

        let pull = Arc::new(PullMirrorSyncer::new(
            Arc::clone(&infra.vcs),
            credentials.clone(),
            Arc::clone(&infra.mirrors),
            Arc::clone(&infra.repos),
            Arc::clone(&tags),
            Arc::clone(&transfer),
            Arc::clone(&infra.lfs_clients),
            self.config.mirror_sync(),
        ));

        let push = Arc::new(PushMirrorSyncer::new(
            Arc::clone(&infra.vcs),
            credentials,
            Arc::clone(&infra.push_mirrors),
            Arc::clone(&infra.repos),
            Arc::clone(&transfer),
            Arc::clone(&infra.lfs_clients),
            self.config.mirror_sync(),
        ));

        let scheduler = Arc::new(MirrorScheduler::new(
            Arc::clone(&pull),
            Arc::clone(&push),
            Arc::clone(&infra.mirrors),
            Arc::clone(&infra.push_mirrors),
            self.config.scheduler(),
        ));

        info!("Application layer initialized");

        Ok(Services {
            pool,
            repos: infra.repos,
            migration,
            pull,
            push,
            scheduler,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
