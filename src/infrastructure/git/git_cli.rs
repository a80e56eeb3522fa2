use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::application::ports::{
    CloneOptions, FetchOptions, PushOptions, Signature, TagInfo, VcsClient, VcsError,
};

/// Hooks that forward to the scripts in `hooks/<name>.d/`
const DELEGATE_HOOKS: [&str; 3] = ["pre-receive", "update", "post-receive"];

const DELEGATE_HOOK_SCRIPT: &str = r#"#!/usr/bin/env bash
data=$(cat)
exitcodes=""
hookname=$(basename "$0")
GIT_DIR=${GIT_DIR:-$(dirname "$0")/..}

for hook in "${GIT_DIR}/hooks/${hookname}.d/"*; do
  test -x "${hook}" && test -f "${hook}" || continue
  echo "${data}" | "${hook}" "$@"
  exitcodes="${exitcodes} $?"
done

for i in ${exitcodes}; do
  [ "${i}" -eq 0 ] || exit "${i}"
done
"#;

/// Probes must answer quickly; a hanging remote counts as inaccessible.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// `VcsClient` backed by the `git` binary.
///
/// Every invocation runs with terminal prompts disabled and is killed when
/// its timeout expires. A failing command reports its stderr as
/// `exit status <code> - <stderr>`.
pub struct GitCli {
    git_binary: PathBuf,
    default_timeout: Duration,
}

impl GitCli {
    pub fn new(default_timeout: Duration) -> Self {
        Self::with_binary(PathBuf::from("git"), default_timeout)
    }

    pub fn with_binary(git_binary: PathBuf, default_timeout: Duration) -> Self {
        Self {
            git_binary,
            default_timeout,
        }
    }

    /// Run git and return stdout
    async fn run(
        &self,
        dir: Option<&Path>,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, VcsError> {
        let command = describe(args);
        trace!("Running {}", command);

        let mut cmd = Command::new(&self.git_binary);
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let timeout = if timeout.is_zero() {
            self.default_timeout
        } else {
            timeout
        };
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| VcsError::Timeout(command.clone()))??;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!("{} failed with exit status {}", command, code);
        Err(VcsError::CommandFailed {
            command,
            stderr: format!("exit status {code} - {stderr}"),
        })
    }

    async fn run_in(&self, repo: &Path, args: &[&str]) -> Result<String, VcsError> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.run(Some(repo), &args, self.default_timeout).await
    }

    async fn commit_signatures(
        &self,
        repo: &Path,
        commit_id: &str,
    ) -> Result<(Option<Signature>, Option<Signature>), VcsError> {
        let out = self
            .run_in(
                repo,
                &["log", "-1", "--format=%an%x00%ae%x00%at%x00%cn%x00%ce%x00%ct", commit_id],
            )
            .await?;
        let fields: Vec<&str> = out.trim_end_matches('\n').split('\0').collect();
        if fields.len() != 6 {
            return Err(VcsError::Parse(format!("commit {commit_id}: {out}")));
        }
        Ok((
            signature(fields[0], fields[1], fields[2]),
            signature(fields[3], fields[4], fields[5]),
        ))
    }
}

/// `git <subcommand>` without the `-c` options, which may carry credentials
fn describe(args: &[String]) -> String {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "-c" {
            iter.next();
            continue;
        }
        return format!("git {arg}");
    }
    "git".to_string()
}

fn signature(name: &str, email: &str, unix: &str) -> Option<Signature> {
    if name.is_empty() && email.is_empty() {
        return None;
    }
    let when: DateTime<Utc> = unix
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    Some(Signature {
        name: name.to_string(),
        email: email.trim_matches(|c| c == '<' || c == '>').to_string(),
        when,
    })
}

fn is_no_such_remote(err: &VcsError) -> bool {
    matches!(err, VcsError::CommandFailed { stderr, .. } if stderr.contains("No such remote"))
}

/// `rev-parse --verify --quiet` exits 1 with no output for a missing ref
fn is_missing_ref(err: &VcsError) -> bool {
    matches!(err, VcsError::CommandFailed { stderr, .. } if stderr.trim_end() == "exit status 1 -")
}

fn is_no_such_section(err: &VcsError) -> bool {
    matches!(err, VcsError::CommandFailed { stderr, .. } if stderr.contains("no such section"))
}

async fn directory_size(root: &Path) -> Result<u64, std::io::Error> {
    let mut total = 0;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                pending.push(entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    Ok(total)
}

#[async_trait]
impl VcsClient for GitCli {
    async fn clone_repo(
        &self,
        remote: &str,
        dest: &Path,
        opts: &CloneOptions,
    ) -> Result<(), VcsError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut args = opts.args.clone();
        args.push("clone".into());
        if opts.mirror {
            args.push("--mirror".into());
        } else if opts.bare {
            args.push("--bare".into());
        }
        if opts.quiet {
            args.push("--quiet".into());
        }
        args.push("--".into());
        args.push(remote.to_string());
        args.push(dest.to_string_lossy().into_owned());

        self.run(None, &args, opts.timeout).await.map(|_| ())
    }

    async fn is_repo_url_accessible(&self, remote: &str, args: &[String]) -> bool {
        let mut full = args.to_vec();
        full.extend(
            ["ls-remote", "-q", "-h", remote, "HEAD"]
                .iter()
                .map(|a| a.to_string()),
        );
        self.run(None, &full, PROBE_TIMEOUT).await.is_ok()
    }

    async fn update_server_info(&self, repo: &Path) -> Result<(), VcsError> {
        self.run_in(repo, &["update-server-info"]).await.map(|_| ())
    }

    async fn is_empty(&self, repo: &Path) -> Result<bool, VcsError> {
        let out = self.run_in(repo, &["rev-list", "-n", "1", "--all"]).await?;
        Ok(out.trim().is_empty())
    }

    async fn head_branch(&self, repo: &Path) -> Result<Option<String>, VcsError> {
        match self.run_in(repo, &["symbolic-ref", "--short", "-q", "HEAD"]).await {
            Ok(out) => {
                let branch = out.trim();
                Ok((!branch.is_empty()).then(|| branch.to_string()))
            }
            // Exit status 1 means HEAD is detached.
            Err(VcsError::CommandFailed { stderr, .. }) if stderr.starts_with("exit status 1 ") => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_tags(&self, repo: &Path) -> Result<Vec<String>, VcsError> {
        let out = self.run_in(repo, &["tag", "--list"]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn tag_commit_id(&self, repo: &Path, tag: &str) -> Result<String, VcsError> {
        let rev = format!("refs/tags/{tag}^{{commit}}");
        match self
            .run_in(repo, &["rev-parse", "--verify", "--quiet", rev.as_str()])
            .await
        {
            Ok(out) if !out.trim().is_empty() => Ok(out.trim().to_string()),
            Ok(_) => Err(VcsError::NotExist(tag.to_string())),
            Err(e) if is_missing_ref(&e) => Err(VcsError::NotExist(tag.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn tag_info(&self, repo: &Path, tag: &str) -> Result<TagInfo, VcsError> {
        let commit_id = self.tag_commit_id(repo, tag).await?;
        let reference = format!("refs/tags/{tag}");
        let out = self
            .run_in(
                repo,
                &[
                    "for-each-ref",
                    "--format=%(taggername)%00%(taggeremail)%00%(taggerdate:unix)",
                    reference.as_str(),
                ],
            )
            .await?;
        let fields: Vec<&str> = out.trim_end_matches('\n').split('\0').collect();
        let tagger = match fields.as_slice() {
            [name, email, when] => signature(name, email, when),
            _ => None,
        };
        let (author, committer) = self.commit_signatures(repo, &commit_id).await?;

        Ok(TagInfo {
            name: tag.to_string(),
            commit_id,
            tagger,
            author,
            committer,
        })
    }

    async fn commits_count(&self, repo: &Path, commit_id: &str) -> Result<u64, VcsError> {
        let out = self.run_in(repo, &["rev-list", "--count", commit_id]).await?;
        out.trim()
            .parse()
            .map_err(|_| VcsError::Parse(format!("commit count: {}", out.trim())))
    }

    async fn remote_address(&self, repo: &Path, remote: &str) -> Result<String, VcsError> {
        match self.run_in(repo, &["remote", "get-url", remote]).await {
            Ok(out) => Ok(out.trim().to_string()),
            Err(e) if is_no_such_remote(&e) => Err(VcsError::NotExist(remote.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn add_remote(
        &self,
        repo: &Path,
        name: &str,
        address: &str,
        mirror_push: bool,
    ) -> Result<(), VcsError> {
        let mut args = vec!["remote", "add"];
        if mirror_push {
            args.push("--mirror=push");
        }
        args.extend([name, address]);
        self.run_in(repo, &args).await.map(|_| ())
    }

    async fn add_config(&self, repo: &Path, key: &str, value: &str) -> Result<(), VcsError> {
        self.run_in(repo, &["config", "--add", key, value])
            .await
            .map(|_| ())
    }

    async fn remove_remote(&self, repo: &Path, name: &str) -> Result<(), VcsError> {
        match self.run_in(repo, &["remote", "rm", name]).await {
            Ok(_) => Ok(()),
            Err(e) if is_no_such_remote(&e) => Err(VcsError::NotExist(name.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn remove_config_section(
        &self,
        config_file: &Path,
        section: &str,
    ) -> Result<(), VcsError> {
        if !fs::try_exists(config_file).await? {
            return Err(VcsError::NotExist(config_file.display().to_string()));
        }
        let args: Vec<String> = vec![
            "config".into(),
            "--file".into(),
            config_file.to_string_lossy().into_owned(),
            "--remove-section".into(),
            section.to_string(),
        ];
        match self.run(None, &args, self.default_timeout).await {
            Ok(_) => Ok(()),
            Err(e) if is_no_such_section(&e) => Err(VcsError::NotExist(section.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn push(&self, repo: &Path, opts: &PushOptions) -> Result<(), VcsError> {
        let mut args = opts.args.clone();
        args.push("push".into());
        if opts.force {
            args.push("--force".into());
        }
        if opts.mirror {
            args.push("--mirror".into());
        }
        args.push(opts.remote.clone());
        self.run(Some(repo), &args, opts.timeout).await.map(|_| ())
    }

    async fn remote_update(&self, repo: &Path, opts: &FetchOptions) -> Result<(), VcsError> {
        let mut args = opts.args.clone();
        args.extend(["remote".to_string(), "update".to_string()]);
        if opts.prune {
            args.push("--prune".into());
        }
        args.push(opts.remote.clone());
        self.run(Some(repo), &args, opts.timeout).await.map(|_| ())
    }

    async fn install_hooks(&self, repo: &Path) -> Result<(), VcsError> {
        let hooks_dir = repo.join("hooks");
        for name in DELEGATE_HOOKS {
            fs::create_dir_all(hooks_dir.join(format!("{name}.d"))).await?;
            let hook = hooks_dir.join(name);
            fs::write(&hook, DELEGATE_HOOK_SCRIPT).await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).await?;
            }
        }
        Ok(())
    }

    async fn repository_size(&self, repo: &Path) -> Result<u64, VcsError> {
        Ok(directory_size(repo).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe_hides_credential_options() {
        let args: Vec<String> = [
            "-c",
            "credential.helper=/bin/app credential-helper --password s3cret",
            "clone",
            "--mirror",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(describe(&args), "git clone");
    }

    #[test]
    fn test_signature_parsing() {
        let sig = signature("Alice", "<alice@example.com>", "1700000000").unwrap();
        assert_eq!(sig.email, "alice@example.com");
        assert_eq!(sig.when.timestamp(), 1_700_000_000);
        assert!(signature("", "", "").is_none());
    }

    #[tokio::test]
    async fn test_remove_config_section_missing_file_is_not_exist() {
        let dir = TempDir::new().unwrap();
        let git = GitCli::new(Duration::from_secs(5));

        let err = git
            .remove_config_section(&dir.path().join("config"), "remote.origin")
            .await
            .unwrap_err();

        assert!(err.is_not_exist());
    }

    #[tokio::test]
    async fn test_remove_config_section_handles_inline_headers() {
        let git = GitCli::new(Duration::from_secs(30));
        let variants = [
            "[core]\n\tbare = true\n[remote \"origin\"] url = https://u:secret@h/r.git\n[gc]\n\tauto = 0\n",
            "[core]\n\tbare = true\n[remote \"origin\"] # mirror source\n\turl = https://u:secret@h/r.git\n\tmirror = true\n",
            "[core]\n\tbare = true\n[remote \"origin\"]\n\turl = https://u:secret@h/r.git\n",
        ];

        for config in variants {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("config");
            std::fs::write(&path, config).unwrap();

            git.remove_config_section(&path, "remote.origin").await.unwrap();

            let left = std::fs::read_to_string(&path).unwrap();
            assert!(!left.contains("secret"), "credentials left in {left:?}");
            assert!(left.contains("bare = true"));
            let again = git
                .remove_config_section(&path, "remote.origin")
                .await
                .unwrap_err();
            assert!(again.is_not_exist());
        }
    }

    #[tokio::test]
    async fn test_missing_tag_is_not_exist() {
        let dir = TempDir::new().unwrap();
        let status = std::process::Command::new("git")
            .args(["init", "--bare", "--quiet"])
            .arg(dir.path())
            .status()
            .unwrap();
        assert!(status.success());

        let err = GitCli::new(Duration::from_secs(30))
            .tag_commit_id(dir.path(), "v1")
            .await
            .unwrap_err();

        assert!(err.is_not_exist());
    }

    #[tokio::test]
    async fn test_broken_repository_is_not_a_missing_tag() {
        let dir = TempDir::new().unwrap();

        let err = GitCli::new(Duration::from_secs(30))
            .tag_commit_id(dir.path(), "v1")
            .await
            .unwrap_err();

        assert!(!err.is_not_exist());
        assert!(matches!(err, VcsError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_install_hooks_writes_delegates() {
        let dir = TempDir::new().unwrap();
        let git = GitCli::new(Duration::from_secs(5));

        git.install_hooks(dir.path()).await.unwrap();

        for name in DELEGATE_HOOKS {
            let script = std::fs::read_to_string(dir.path().join("hooks").join(name)).unwrap();
            assert!(script.starts_with("#!/usr/bin/env bash"));
            assert!(dir.path().join("hooks").join(format!("{name}.d")).is_dir());
        }
    }

    #[tokio::test]
    async fn test_repository_size_sums_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("objects/ab")).unwrap();
        std::fs::write(dir.path().join("HEAD"), b"ref: refs/heads/main\n").unwrap();
        std::fs::write(dir.path().join("objects/ab/cdef"), vec![0u8; 100]).unwrap();

        let size = GitCli::new(Duration::from_secs(5))
            .repository_size(dir.path())
            .await
            .unwrap();

        assert_eq!(size, 21 + 100);
    }
}
