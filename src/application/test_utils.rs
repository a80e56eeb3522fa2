use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::application::migration::models::{
    Comment, Issue, Label, Milestone, PullRequest, Release, Review,
};
use crate::application::ports::{
    BlobReader, CloneOptions, ContentStore, DownloadSink, FetchOptions, LfsClient,
    LfsClientFactory, LfsError, LfsMetaRepository, MigrationSink, MirrorRepository, PointerScan,
    PointerScanner, PushMirrorRepository, PushOptions, ReleaseQuery, ReleaseRepository,
    RepoRepository, RepositoryError, ScanError, StorageError, TagInfo, UploadSource,
    UserRepository, VcsClient, VcsError,
};
use crate::domain::entities::{
    LfsMetaObject, MirrorConfig, PushMirrorConfig, ReleaseTagRecord, Repository,
};
use crate::domain::value_objects::{
    Oid, Pointer, PointerBlob, PushMirrorId, ReleaseId, RepoId, UserId,
};

/// Pointer describing `content`
pub fn pointer_for(content: &[u8]) -> Pointer {
    let oid = Oid::from_hex(hex::encode(Sha256::digest(content))).unwrap();
    Pointer::new(oid, content.len() as u64)
}

fn stored_reader(bytes: Vec<u8>) -> BlobReader {
    Box::pin(Cursor::new(bytes))
}

/// In-memory content store
pub struct InMemoryContentStore {
    pub objects: Mutex<HashMap<Oid, Vec<u8>>>,
    pub should_fail_put: bool,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            should_fail_put: false,
        }
    }

    pub fn failing_put() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            should_fail_put: true,
        }
    }

    pub fn insert(&self, pointer: &Pointer, content: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(pointer.oid.clone(), content.to_vec());
    }

    pub fn content(&self, pointer: &Pointer) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(&pointer.oid).cloned()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn exists(&self, pointer: &Pointer) -> Result<bool, StorageError> {
        Ok(self.objects.lock().unwrap().contains_key(&pointer.oid))
    }

    async fn get(&self, pointer: &Pointer) -> Result<BlobReader, StorageError> {
        self.content(pointer)
            .map(stored_reader)
            .ok_or_else(|| StorageError::NotFound(pointer.oid.to_string()))
    }

    async fn put(&self, pointer: &Pointer, mut reader: BlobReader) -> Result<(), StorageError> {
        if self.should_fail_put {
            return Err(StorageError::Internal("disk full".into()));
        }
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        let actual = pointer_for(&buf);
        if actual.oid != pointer.oid {
            return Err(StorageError::HashMismatch {
                expected: pointer.oid.to_string(),
                actual: actual.oid.to_string(),
            });
        }
        self.insert(pointer, &buf);
        Ok(())
    }
}

/// In-memory large-file record table
pub struct InMemoryLfsMetaRepository {
    pub records: Mutex<HashMap<(RepoId, Oid), LfsMetaObject>>,
}

impl InMemoryLfsMetaRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Sorted oids linked to `repo_id`
    pub fn oids(&self, repo_id: RepoId) -> Vec<Oid> {
        let mut oids: Vec<Oid> = self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(r, _)| *r == repo_id)
            .map(|(_, oid)| oid.clone())
            .collect();
        oids.sort();
        oids
    }
}

#[async_trait]
impl LfsMetaRepository for InMemoryLfsMetaRepository {
    async fn find_by_oid(
        &self,
        repo_id: RepoId,
        oid: &Oid,
    ) -> Result<Option<LfsMetaObject>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(repo_id, oid.clone()))
            .cloned())
    }

    async fn create(&self, meta: &LfsMetaObject) -> Result<bool, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let key = (meta.repo_id, meta.pointer.oid.clone());
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, meta.clone());
        Ok(true)
    }

    async fn remove_by_oid(&self, repo_id: RepoId, oid: &Oid) -> Result<u64, RepositoryError> {
        let removed = self
            .records
            .lock()
            .unwrap()
            .remove(&(repo_id, oid.clone()))
            .is_some();
        Ok(u64::from(removed))
    }

    async fn count_by_repo(&self, repo_id: RepoId) -> Result<u64, RepositoryError> {
        Ok(self.oids(repo_id).len() as u64)
    }
}

/// Scanner emitting a fixed list of pointers, optionally ending in an error
pub struct StaticPointerScanner {
    pub blobs: Vec<PointerBlob>,
    pub error: Option<String>,
    pub scanned_paths: Mutex<Vec<PathBuf>>,
}

impl StaticPointerScanner {
    pub fn new(blobs: Vec<PointerBlob>) -> Self {
        Self {
            blobs,
            error: None,
            scanned_paths: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }
}

impl PointerScanner for StaticPointerScanner {
    fn scan(&self, repo_path: &Path, cancel: CancellationToken) -> PointerScan {
        self.scanned_paths
            .lock()
            .unwrap()
            .push(repo_path.to_path_buf());

        let (tx, receiver) = mpsc::channel(2);
        let blobs = self.blobs.clone();
        let error = self.error.clone();
        let handle = tokio::spawn(async move {
            for blob in blobs {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    sent = tx.send(blob) => if sent.is_err() { return Ok(()) },
                }
            }
            match error {
                Some(message) => Err(ScanError::Process(message)),
                None => Ok(()),
            }
        });
        PointerScan { receiver, handle }
    }
}

/// Large-file remote keeping objects in memory
pub struct FakeLfsRemote {
    pub batch_size: usize,
    pub objects: Mutex<HashMap<Oid, Vec<u8>>>,
    pub requests: Mutex<Vec<Vec<Oid>>>,
    pub rejected: Mutex<HashSet<Oid>>,
    pub transport_fails: AtomicBool,
    pub store_fails: AtomicBool,
    pub cancel_on_request: Mutex<Option<CancellationToken>>,
}

impl FakeLfsRemote {
    pub fn with_objects(batch_size: usize, contents: &[&[u8]]) -> Self {
        let objects = contents
            .iter()
            .map(|c| (pointer_for(c).oid, c.to_vec()))
            .collect();
        Self {
            batch_size,
            objects: Mutex::new(objects),
            requests: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
            transport_fails: AtomicBool::new(false),
            store_fails: AtomicBool::new(false),
            cancel_on_request: Mutex::new(None),
        }
    }

    pub fn reject(&self, oid: &Oid) {
        self.rejected.lock().unwrap().insert(oid.clone());
    }

    pub fn fail_transport(&self) {
        self.transport_fails.store(true, Ordering::SeqCst);
    }

    /// Accept uploads but fail to keep their content
    pub fn fail_store(&self) {
        self.store_fails.store(true, Ordering::SeqCst);
    }

    pub fn cancel_on_request(&self, token: CancellationToken) {
        *self.cancel_on_request.lock().unwrap() = Some(token);
    }

    /// Oids of every batch request, in order
    pub fn batches(&self) -> Vec<Vec<Oid>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn object(&self, oid: &Oid) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(oid).cloned()
    }

    fn begin(&self, objects: &[Pointer]) -> Result<(), LfsError> {
        self.requests
            .lock()
            .unwrap()
            .push(objects.iter().map(|p| p.oid.clone()).collect());
        if let Some(token) = self.cancel_on_request.lock().unwrap().as_ref() {
            token.cancel();
        }
        if self.transport_fails.load(Ordering::SeqCst) {
            return Err(LfsError::Transport("connection reset".into()));
        }
        Ok(())
    }

    fn rejection(&self, pointer: &Pointer) -> Option<LfsError> {
        self.rejected
            .lock()
            .unwrap()
            .contains(&pointer.oid)
            .then(|| LfsError::Object {
                oid: pointer.oid.to_string(),
                code: 422,
                message: "rejected".into(),
            })
    }
}

#[async_trait]
impl LfsClient for FakeLfsRemote {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn download(
        &self,
        _cancel: &CancellationToken,
        objects: &[Pointer],
        sink: &dyn DownloadSink,
    ) -> Result<(), LfsError> {
        self.begin(objects)?;
        for pointer in objects {
            let content = match self.rejection(pointer) {
                Some(err) => Err(err),
                None => self.object(&pointer.oid).map(stored_reader).ok_or_else(|| {
                    LfsError::Object {
                        oid: pointer.oid.to_string(),
                        code: 404,
                        message: "not found".into(),
                    }
                }),
            };
            let _ = sink.receive(pointer, content).await;
        }
        Ok(())
    }

    async fn upload(
        &self,
        _cancel: &CancellationToken,
        objects: &[Pointer],
        source: &dyn UploadSource,
    ) -> Result<(), LfsError> {
        self.begin(objects)?;
        for pointer in objects {
            if self.object(&pointer.oid).is_some() {
                continue;
            }
            let Ok(mut reader) = source.open(pointer, self.rejection(pointer)).await else {
                continue;
            };
            let mut buf = Vec::new();
            let outcome = match reader.read_to_end(&mut buf).await {
                Ok(_) if self.store_fails.load(Ordering::SeqCst) => {
                    Err(LfsError::Http {
                        status: 507,
                        message: "insufficient storage".into(),
                    })
                }
                Ok(_) => {
                    self.objects.lock().unwrap().insert(pointer.oid.clone(), buf);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            };
            source.finished(pointer, outcome).await;
        }
        Ok(())
    }
}

/// Factory handing out one shared fake remote and recording endpoints
pub struct FakeLfsFactory {
    pub remote: Arc<FakeLfsRemote>,
    pub endpoints: Mutex<Vec<Url>>,
}

impl FakeLfsFactory {
    pub fn new(remote: Arc<FakeLfsRemote>) -> Self {
        Self {
            remote,
            endpoints: Mutex::new(Vec::new()),
        }
    }
}

impl LfsClientFactory for FakeLfsFactory {
    fn create(&self, endpoint: Url) -> Result<Arc<dyn LfsClient>, LfsError> {
        self.endpoints.lock().unwrap().push(endpoint);
        let client: Arc<dyn LfsClient> = self.remote.clone();
        Ok(client)
    }
}

/// In-memory release table
pub struct InMemoryReleaseRepository {
    pub records: Mutex<Vec<ReleaseTagRecord>>,
    next_id: AtomicI64,
}

impl InMemoryReleaseRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn seed(&self, mut record: ReleaseTagRecord) -> ReleaseId {
        let id = ReleaseId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        record.id = Some(id);
        self.records.lock().unwrap().push(record);
        id
    }

    pub fn records_for_tag(&self, repo_id: RepoId, tag: &str) -> Vec<ReleaseTagRecord> {
        let lower = tag.to_lowercase();
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.repo_id == repo_id && r.lower_tag_name == lower)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl ReleaseRepository for InMemoryReleaseRepository {
    async fn list_by_repo(
        &self,
        repo_id: RepoId,
        query: ReleaseQuery,
    ) -> Result<Vec<ReleaseTagRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.repo_id == repo_id)
            .filter(|r| query.include_drafts || !r.is_draft)
            .filter(|r| query.include_tags || !r.is_tag)
            .skip(query.offset() as usize)
            .take(query.page_size as usize)
            .cloned()
            .collect())
    }

    async fn find_by_tag_name(
        &self,
        repo_id: RepoId,
        tag_name: &str,
    ) -> Result<Option<ReleaseTagRecord>, RepositoryError> {
        Ok(self.records_for_tag(repo_id, tag_name).into_iter().next())
    }

    async fn insert(&self, release: &ReleaseTagRecord) -> Result<ReleaseId, RepositoryError> {
        if !self.records_for_tag(release.repo_id, &release.tag_name).is_empty() {
            return Err(RepositoryError::ConstraintViolation(release.tag_name.clone()));
        }
        Ok(self.seed(release.clone()))
    }

    async fn update(&self, release: &ReleaseTagRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id.is_some() && r.id == release.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("{:?}", release.id)))?;
        *existing = release.clone();
        Ok(())
    }

    async fn delete_by_id(&self, id: ReleaseId) -> Result<(), RepositoryError> {
        self.records.lock().unwrap().retain(|r| r.id != Some(id));
        Ok(())
    }
}

/// Email to user lookup
#[derive(Default)]
pub struct InMemoryUserRepository {
    pub users: HashMap<String, UserId>,
}

impl InMemoryUserRepository {
    pub fn with_user(email: &str, id: UserId) -> Self {
        Self {
            users: HashMap::from([(email.to_string(), id)]),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_id_by_email(&self, email: &str) -> Result<Option<UserId>, RepositoryError> {
        Ok(self.users.get(email).copied())
    }
}

/// In-memory repository table
pub struct InMemoryRepoRepository {
    pub repos: Mutex<HashMap<RepoId, Repository>>,
    pub should_fail_update: bool,
}

impl InMemoryRepoRepository {
    pub fn new(repos: Vec<Repository>) -> Self {
        Self {
            repos: Mutex::new(repos.into_iter().map(|r| (r.id, r)).collect()),
            should_fail_update: false,
        }
    }

    pub fn failing_update(repos: Vec<Repository>) -> Self {
        Self {
            should_fail_update: true,
            ..Self::new(repos)
        }
    }

    pub fn get(&self, id: RepoId) -> Option<Repository> {
        self.repos.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl RepoRepository for InMemoryRepoRepository {
    async fn find_by_id(&self, id: RepoId) -> Result<Option<Repository>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn update(&self, repo: &Repository) -> Result<(), RepositoryError> {
        if self.should_fail_update {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.repos.lock().unwrap().insert(repo.id, repo.clone());
        Ok(())
    }

    async fn update_size(&self, id: RepoId, size_bytes: u64) -> Result<(), RepositoryError> {
        if let Some(repo) = self.repos.lock().unwrap().get_mut(&id) {
            repo.size_bytes = size_bytes;
        }
        Ok(())
    }
}

/// In-memory pull-mirror table
pub struct InMemoryMirrorRepository {
    pub mirrors: Mutex<HashMap<RepoId, MirrorConfig>>,
}

impl InMemoryMirrorRepository {
    pub fn new(mirrors: Vec<MirrorConfig>) -> Self {
        Self {
            mirrors: Mutex::new(mirrors.into_iter().map(|m| (m.repo_id, m)).collect()),
        }
    }

    pub fn get(&self, repo_id: RepoId) -> Option<MirrorConfig> {
        self.mirrors.lock().unwrap().get(&repo_id).cloned()
    }
}

#[async_trait]
impl MirrorRepository for InMemoryMirrorRepository {
    async fn insert(&self, mirror: &MirrorConfig) -> Result<(), RepositoryError> {
        self.mirrors
            .lock()
            .unwrap()
            .insert(mirror.repo_id, mirror.clone());
        Ok(())
    }

    async fn find_by_repo_id(
        &self,
        repo_id: RepoId,
    ) -> Result<Option<MirrorConfig>, RepositoryError> {
        Ok(self.get(repo_id))
    }

    async fn update(&self, mirror: &MirrorConfig) -> Result<(), RepositoryError> {
        self.insert(mirror).await
    }

    async fn delete_by_repo_id(&self, repo_id: RepoId) -> Result<(), RepositoryError> {
        self.mirrors.lock().unwrap().remove(&repo_id);
        Ok(())
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MirrorConfig>, RepositoryError> {
        let mut due: Vec<MirrorConfig> = self
            .mirrors
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|m| m.next_update);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }
}

/// In-memory push-mirror table
pub struct InMemoryPushMirrorRepository {
    pub mirrors: Mutex<Vec<PushMirrorConfig>>,
    pub updates: Mutex<Vec<PushMirrorConfig>>,
}

impl InMemoryPushMirrorRepository {
    pub fn new(mirrors: Vec<PushMirrorConfig>) -> Self {
        Self {
            mirrors: Mutex::new(mirrors),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn get(&self, id: PushMirrorId) -> Option<PushMirrorConfig> {
        self.mirrors
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }
}

#[async_trait]
impl PushMirrorRepository for InMemoryPushMirrorRepository {
    async fn insert(&self, mirror: &PushMirrorConfig) -> Result<PushMirrorId, RepositoryError> {
        self.mirrors.lock().unwrap().push(mirror.clone());
        Ok(mirror.id)
    }

    async fn find_by_id(
        &self,
        id: PushMirrorId,
    ) -> Result<Option<PushMirrorConfig>, RepositoryError> {
        Ok(self.get(id))
    }

    async fn find_by_repo_id(
        &self,
        repo_id: RepoId,
    ) -> Result<Vec<PushMirrorConfig>, RepositoryError> {
        Ok(self
            .mirrors
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.repo_id == repo_id)
            .cloned()
            .collect())
    }

    async fn update(&self, mirror: &PushMirrorConfig) -> Result<(), RepositoryError> {
        self.updates.lock().unwrap().push(mirror.clone());
        let mut mirrors = self.mirrors.lock().unwrap();
        if let Some(existing) = mirrors.iter_mut().find(|m| m.id == mirror.id) {
            *existing = mirror.clone();
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: PushMirrorId) -> Result<(), RepositoryError> {
        self.mirrors.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }

    async fn delete_by_repo_id(&self, repo_id: RepoId) -> Result<(), RepositoryError> {
        self.mirrors.lock().unwrap().retain(|m| m.repo_id != repo_id);
        Ok(())
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PushMirrorConfig>, RepositoryError> {
        let mut due: Vec<PushMirrorConfig> = self
            .mirrors
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|m| m.last_update_or_epoch());
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }
}

/// Sink recording how many items each facet received
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<(&'static str, usize)>>,
}

impl RecordingSink {
    pub fn facets(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(f, _)| *f).collect()
    }

    pub fn count(&self, facet: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, _)| *f == facet)
            .map(|(_, n)| n)
            .sum()
    }

    fn record(&self, facet: &'static str, n: usize) -> Result<(), RepositoryError> {
        self.calls.lock().unwrap().push((facet, n));
        Ok(())
    }
}

#[async_trait]
impl MigrationSink for RecordingSink {
    async fn create_topics(
        &self,
        _repo_id: RepoId,
        topics: &[String],
    ) -> Result<(), RepositoryError> {
        self.record("Topics", topics.len())
    }

    async fn create_milestones(
        &self,
        _repo_id: RepoId,
        milestones: &[Milestone],
    ) -> Result<(), RepositoryError> {
        self.record("Milestones", milestones.len())
    }

    async fn create_labels(&self, _repo_id: RepoId, labels: &[Label]) -> Result<(), RepositoryError> {
        self.record("Labels", labels.len())
    }

    async fn create_releases(
        &self,
        _repo_id: RepoId,
        releases: &[Release],
    ) -> Result<(), RepositoryError> {
        self.record("Releases", releases.len())
    }

    async fn create_issues(&self, _repo_id: RepoId, issues: &[Issue]) -> Result<(), RepositoryError> {
        self.record("Issues", issues.len())
    }

    async fn create_comments(
        &self,
        _repo_id: RepoId,
        comments: &[Comment],
    ) -> Result<(), RepositoryError> {
        self.record("Comments", comments.len())
    }

    async fn create_pull_requests(
        &self,
        _repo_id: RepoId,
        pull_requests: &[PullRequest],
    ) -> Result<(), RepositoryError> {
        self.record("PullRequests", pull_requests.len())
    }

    async fn create_reviews(
        &self,
        _repo_id: RepoId,
        reviews: &[Review],
    ) -> Result<(), RepositoryError> {
        self.record("Reviews", reviews.len())
    }
}

/// Scriptable VCS that records what it was asked to do. Clones create the
/// destination directory so filesystem side effects can be observed.
#[derive(Default)]
pub struct FakeVcs {
    pub clones: Mutex<Vec<(String, PathBuf, Vec<String>)>>,
    pub failing_clones: Mutex<HashSet<String>>,
    pub accessible: Mutex<HashSet<String>>,
    pub empty: AtomicBool,
    pub head: Mutex<Option<String>>,
    pub tags: Mutex<HashMap<String, String>>,
    pub remotes: Mutex<HashMap<(PathBuf, String), String>>,
    pub config_added: Mutex<Vec<(PathBuf, String, String)>>,
    pub removed_sections: Mutex<Vec<(PathBuf, String)>>,
    pub hooks: Mutex<Vec<PathBuf>>,
    pub pushes: Mutex<Vec<(PathBuf, PushOptions)>>,
    pub fetches: Mutex<Vec<(PathBuf, FetchOptions)>>,
    pub push_error: Mutex<Option<String>>,
    pub fetch_error: Mutex<Option<String>>,
    pub panicking_pushes: Mutex<HashSet<PathBuf>>,
    pub size: u64,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self {
            head: Mutex::new(Some("main".into())),
            size: 4096,
            ..Self::default()
        }
    }

    pub fn fail_clone(&self, remote: &str) {
        self.failing_clones.lock().unwrap().insert(remote.to_string());
    }

    pub fn make_accessible(&self, remote: &str) {
        self.accessible.lock().unwrap().insert(remote.to_string());
    }

    pub fn set_remote(&self, repo: &Path, name: &str, address: &str) {
        self.remotes
            .lock()
            .unwrap()
            .insert((repo.to_path_buf(), name.to_string()), address.to_string());
    }

    pub fn has_remote(&self, repo: &Path, name: &str) -> bool {
        self.remotes
            .lock()
            .unwrap()
            .contains_key(&(repo.to_path_buf(), name.to_string()))
    }

    pub fn panic_on_push(&self, repo: &Path) {
        self.panicking_pushes
            .lock()
            .unwrap()
            .insert(repo.to_path_buf());
    }

    pub fn pushed_paths(&self) -> Vec<PathBuf> {
        self.pushes
            .lock()
            .unwrap()
            .iter()
            .map(|(p, _)| p.clone())
            .collect()
    }
}

#[async_trait]
impl VcsClient for FakeVcs {
    async fn clone_repo(
        &self,
        remote: &str,
        dest: &Path,
        opts: &CloneOptions,
    ) -> Result<(), VcsError> {
        self.clones
            .lock()
            .unwrap()
            .push((remote.to_string(), dest.to_path_buf(), opts.args.clone()));
        if self.failing_clones.lock().unwrap().contains(remote) {
            return Err(VcsError::CommandFailed {
                command: "clone".into(),
                stderr: format!("fatal: could not read from {remote}"),
            });
        }
        tokio::fs::create_dir_all(dest).await?;
        self.set_remote(dest, "origin", remote);
        Ok(())
    }

    async fn is_repo_url_accessible(&self, remote: &str, _args: &[String]) -> bool {
        self.accessible.lock().unwrap().contains(remote)
    }

    async fn update_server_info(&self, _repo: &Path) -> Result<(), VcsError> {
        Ok(())
    }

    async fn is_empty(&self, _repo: &Path) -> Result<bool, VcsError> {
        Ok(self.empty.load(Ordering::SeqCst))
    }

    async fn head_branch(&self, _repo: &Path) -> Result<Option<String>, VcsError> {
        Ok(self.head.lock().unwrap().clone())
    }

    async fn list_tags(&self, _repo: &Path) -> Result<Vec<String>, VcsError> {
        let mut tags: Vec<String> = self.tags.lock().unwrap().keys().cloned().collect();
        tags.sort();
        Ok(tags)
    }

    async fn tag_commit_id(&self, _repo: &Path, tag: &str) -> Result<String, VcsError> {
        self.tags
            .lock()
            .unwrap()
            .get(tag)
            .cloned()
            .ok_or_else(|| VcsError::NotExist(tag.to_string()))
    }

    async fn tag_info(&self, repo: &Path, tag: &str) -> Result<TagInfo, VcsError> {
        Ok(TagInfo {
            name: tag.to_string(),
            commit_id: self.tag_commit_id(repo, tag).await?,
            tagger: None,
            author: None,
            committer: None,
        })
    }

    async fn commits_count(&self, _repo: &Path, _commit_id: &str) -> Result<u64, VcsError> {
        Ok(1)
    }

    async fn remote_address(&self, repo: &Path, remote: &str) -> Result<String, VcsError> {
        self.remotes
            .lock()
            .unwrap()
            .get(&(repo.to_path_buf(), remote.to_string()))
            .cloned()
            .ok_or_else(|| VcsError::NotExist(remote.to_string()))
    }

    async fn add_remote(
        &self,
        repo: &Path,
        name: &str,
        address: &str,
        _mirror_push: bool,
    ) -> Result<(), VcsError> {
        self.set_remote(repo, name, address);
        Ok(())
    }

    async fn add_config(&self, repo: &Path, key: &str, value: &str) -> Result<(), VcsError> {
        self.config_added.lock().unwrap().push((
            repo.to_path_buf(),
            key.to_string(),
            value.to_string(),
        ));
        Ok(())
    }

    async fn remove_remote(&self, repo: &Path, name: &str) -> Result<(), VcsError> {
        self.remotes
            .lock()
            .unwrap()
            .remove(&(repo.to_path_buf(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| VcsError::NotExist(name.to_string()))
    }

    async fn remove_config_section(
        &self,
        config_file: &Path,
        section: &str,
    ) -> Result<(), VcsError> {
        self.removed_sections
            .lock()
            .unwrap()
            .push((config_file.to_path_buf(), section.to_string()));
        Ok(())
    }

    async fn push(&self, repo: &Path, opts: &PushOptions) -> Result<(), VcsError> {
        if self.panicking_pushes.lock().unwrap().contains(repo) {
            panic!("push exploded");
        }
        self.pushes
            .lock()
            .unwrap()
            .push((repo.to_path_buf(), opts.clone()));
        match self.push_error.lock().unwrap().clone() {
            Some(stderr) => Err(VcsError::CommandFailed {
                command: "push".into(),
                stderr,
            }),
            None => Ok(()),
        }
    }

    async fn remote_update(&self, repo: &Path, opts: &FetchOptions) -> Result<(), VcsError> {
        self.fetches
            .lock()
            .unwrap()
            .push((repo.to_path_buf(), opts.clone()));
        match self.fetch_error.lock().unwrap().clone() {
            Some(stderr) => Err(VcsError::CommandFailed {
                command: "remote update".into(),
                stderr,
            }),
            None => Ok(()),
        }
    }

    async fn install_hooks(&self, repo: &Path) -> Result<(), VcsError> {
        self.hooks.lock().unwrap().push(repo.to_path_buf());
        Ok(())
    }

    async fn repository_size(&self, _repo: &Path) -> Result<u64, VcsError> {
        Ok(self.size)
    }
}
