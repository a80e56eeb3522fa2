use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::batch_processor::{BatchConfig, BatchProcessor};
use super::config::SchedulerConfig;
use super::pull_sync::PullMirrorSyncer;
use super::push_sync::PushMirrorSyncer;
use super::results::{SyncPassReport, SyncStatistics};
use crate::application::ports::{MirrorRepository, PushMirrorRepository};
use crate::domain::value_objects::{PushMirrorId, RepoId};

/// One unit of scheduled work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    Pull(RepoId),
    Push(PushMirrorId),
}

impl std::fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTarget::Pull(id) => write!(f, "pull mirror of repo {id}"),
            SyncTarget::Push(id) => write!(f, "push mirror {id}"),
        }
    }
}

/// Periodically syncs every due pull and push mirror.
///
/// Each pass asks both repositories for due mirrors, claims them in an
/// in-flight set and runs them with bounded concurrency. A mirror whose
/// previous sync is still running is skipped for the pass, so one mirror is
/// never synced twice at the same time. Every sync runs in its own task; a
/// crash fails only that mirror.
///
/// ```rust,ignore
/// let scheduler = Arc::new(MirrorScheduler::new(pull, push, mirrors, push_mirrors, config));
/// let report = scheduler.run_once(&cancel).await;
/// println!("{}", report.summary());
///
/// // Or run until cancelled
/// scheduler.run(cancel).await;
/// ```
pub struct MirrorScheduler {
    pull: Arc<PullMirrorSyncer>,
    push: Arc<PushMirrorSyncer>,
    mirrors: Arc<dyn MirrorRepository>,
    push_mirrors: Arc<dyn PushMirrorRepository>,
    /// Claimed targets and when they were dispatched
    in_flight: Arc<DashMap<SyncTarget, DateTime<Utc>>>,
    config: SchedulerConfig,
}

impl MirrorScheduler {
    pub fn new(
        pull: Arc<PullMirrorSyncer>,
        push: Arc<PushMirrorSyncer>,
        mirrors: Arc<dyn MirrorRepository>,
        push_mirrors: Arc<dyn PushMirrorRepository>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            pull,
            push,
            mirrors,
            push_mirrors,
            in_flight: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Run passes every `poll_interval` until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> SyncStatistics {
        info!(
            "Starting mirror scheduler with interval: {:?}, concurrency: {}",
            self.config.poll_interval, self.config.max_concurrent_syncs
        );

        let mut stats = SyncStatistics::default();
        let mut interval = time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let report = self.run_once(&cancel).await;
            if report.has_work() {
                info!("Mirror sync pass completed: {}", report.summary());
            } else {
                debug!("No mirrors due");
            }
            for e in &report.errors {
                error!("Mirror sync pass error: {}", e);
            }
            stats.update(&report);
        }

        info!("Mirror scheduler stopped: {}", stats.summary());
        stats
    }

    /// Sync everything currently due, once.
    pub async fn run_once(&self, cancel: &CancellationToken) -> SyncPassReport {
        let mut report = SyncPassReport::new();
        if cancel.is_cancelled() {
            return report;
        }

        let now = Utc::now();
        let mut due = Vec::new();

        match self.mirrors.find_due(now, self.config.batch_limit).await {
            Ok(mirrors) => due.extend(mirrors.into_iter().map(|m| SyncTarget::Pull(m.repo_id))),
            Err(e) => report.add_error(format!("Failed to list due pull mirrors: {}", e)),
        }
        match self
            .push_mirrors
            .find_due(now, self.config.batch_limit)
            .await
        {
            Ok(mirrors) => due.extend(mirrors.into_iter().map(|m| SyncTarget::Push(m.id))),
            Err(e) => report.add_error(format!("Failed to list due push mirrors: {}", e)),
        }

        let claimed = self.claim(due, now, &mut report);
        if claimed.is_empty() {
            return report;
        }

        let processor = {
            let pull = Arc::clone(&self.pull);
            let push = Arc::clone(&self.push);
            let cancel = cancel.clone();
            move |target: SyncTarget| {
                let pull = Arc::clone(&pull);
                let push = Arc::clone(&push);
                let cancel = cancel.clone();
                async move {
                    match target {
                        SyncTarget::Pull(repo_id) => pull.sync_pull_mirror(&cancel, repo_id).await,
                        SyncTarget::Push(id) => push.sync_push_mirror(&cancel, id).await,
                    }
                }
            }
        };

        let batch_config = BatchConfig {
            concurrent_batch_size: self.config.max_concurrent_syncs,
        };
        let results = BatchProcessor::process_concurrent(claimed, &batch_config, processor).await;

        for result in results {
            self.in_flight.remove(&result.item);
            let ok = match result.result {
                Ok(ok) => ok,
                Err(e) => {
                    report.add_error(format!("Sync of {} crashed: {}", result.item, e));
                    false
                }
            };
            match (result.item, ok) {
                (SyncTarget::Pull(_), true) => report.pull_synced += 1,
                (SyncTarget::Pull(_), false) => report.pull_failed += 1,
                (SyncTarget::Push(_), true) => report.push_synced += 1,
                (SyncTarget::Push(_), false) => report.push_failed += 1,
            }
        }

        report
    }

    /// Claim each target not already running
    fn claim(
        &self,
        due: Vec<SyncTarget>,
        now: DateTime<Utc>,
        report: &mut SyncPassReport,
    ) -> Vec<SyncTarget> {
        let mut claimed = Vec::with_capacity(due.len());
        for target in due {
            match self.in_flight.entry(target) {
                Entry::Occupied(running) => {
                    warn!(
                        "Skipping {}: sync started at {} still running",
                        target,
                        running.get()
                    );
                    report.skipped_in_flight += 1;
                }
                Entry::Vacant(slot) => {
                    slot.insert(now);
                    claimed.push(target);
                }
            }
        }
        claimed
    }
}
