/// Outcome of one scheduler pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncPassReport {
    pub pull_synced: usize,
    pub pull_failed: usize,
    pub push_synced: usize,
    pub push_failed: usize,
    /// Due mirrors left alone because a sync for them was still running
    pub skipped_in_flight: usize,
    /// Failures of the pass itself (listing due mirrors, crashed tasks)
    pub errors: Vec<String>,
}

impl SyncPassReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.pull_failed == 0 && self.push_failed == 0
    }

    /// Whether the pass dispatched anything
    pub fn has_work(&self) -> bool {
        self.attempted() > 0 || self.skipped_in_flight > 0
    }

    pub fn attempted(&self) -> usize {
        self.pull_synced + self.pull_failed + self.push_synced + self.push_failed
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn merge(&mut self, other: SyncPassReport) {
        self.pull_synced += other.pull_synced;
        self.pull_failed += other.pull_failed;
        self.push_synced += other.push_synced;
        self.push_failed += other.push_failed;
        self.skipped_in_flight += other.skipped_in_flight;
        self.errors.extend(other.errors);
    }

    pub fn summary(&self) -> String {
        format!(
            "pull {} ok / {} failed, push {} ok / {} failed, {} still running, {} errors",
            self.pull_synced,
            self.pull_failed,
            self.push_synced,
            self.push_failed,
            self.skipped_in_flight,
            self.errors.len()
        )
    }
}

/// Running totals across scheduler passes
#[derive(Debug, Clone, Default)]
pub struct SyncStatistics {
    pub passes_completed: usize,
    pub total_synced: usize,
    pub total_failed: usize,
    pub total_errors: usize,
}

impl SyncStatistics {
    pub fn update(&mut self, report: &SyncPassReport) {
        self.passes_completed += 1;
        self.total_synced += report.pull_synced + report.push_synced;
        self.total_failed += report.pull_failed + report.push_failed;
        self.total_errors += report.errors.len();
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passes, {} synced, {} failed, {} errors",
            self.passes_completed, self.total_synced, self.total_failed, self.total_errors
        )
    }
}
