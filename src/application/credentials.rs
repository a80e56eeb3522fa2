//! Credential handling for VCS subprocesses.
//!
//! Secrets never end up in a persisted remote address: clones and pushes get
//! them through a short-lived credential helper configured on the command
//! line, and only the bare username is kept in the canonical URL.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::application::ports::VcsClient;

/// Username used with bearer tokens
pub const TOKEN_USERNAME: &str = "oauth2";

const REDACTED: &str = "<credentials>";

/// Wiki locations probed next to a repository address
/// (`.wiki.git` for GitHub/GitLab style hosts, `.git/wiki` for Bitbucket).
pub const WIKI_URL_SUFFIXES: [&str; 2] = [".wiki.git", ".git/wiki"];

#[derive(Debug, Error)]
pub enum RemoteAddressError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    /// Never carries the offending text
    #[error("credentials in the address are not valid UTF-8 once decoded")]
    Encoding,
}

/// Credentials supplied alongside a remote address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAuth {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub token: String,
}

/// Canonical address plus the credentials to inject at run time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedCloneUrl {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Resolve which credentials to use for `remote` and strip secrets from it.
///
/// A token wins and is sent as `oauth2:<token>`; explicit credentials come
/// next; otherwise whatever the URL embeds is used.
pub fn format_clone_url(
    auth: &RemoteAuth,
    remote: &str,
) -> Result<FormattedCloneUrl, RemoteAddressError> {
    let mut url = Url::parse(remote)?;

    if !auth.token.is_empty() {
        strip_userinfo(&mut url);
        return Ok(FormattedCloneUrl {
            url: url.to_string(),
            username: TOKEN_USERNAME.to_string(),
            password: auth.token.clone(),
        });
    }

    let (username, password) = if !auth.username.is_empty() {
        (auth.username.clone(), auth.password.clone())
    } else {
        let password = url.password().map(percent_decode).transpose()?;
        (percent_decode(url.username())?, password.unwrap_or_default())
    };

    // Keep only the username component the URL already carried.
    let _ = url.set_password(None);

    Ok(FormattedCloneUrl {
        url: url.to_string(),
        username,
        password,
    })
}

/// Put credentials into `address` for in-memory use (LFS endpoint discovery).
/// Unparsable addresses are returned unchanged.
pub fn url_with_credentials(address: &str, username: &str, password: &str) -> String {
    let Ok(mut url) = Url::parse(address) else {
        return address.to_string();
    };
    if !username.is_empty() {
        let _ = url.set_username(username);
        let _ = url.set_password((!password.is_empty()).then_some(password));
    }
    url.to_string()
}

/// Remove userinfo from every occurrence of `address` in `message`
pub fn sanitize_url_error(message: &str, address: &str) -> String {
    let Ok(url) = Url::parse(address) else {
        return message.to_string();
    };
    if url.username().is_empty() && url.password().is_none() {
        return message.to_string();
    }

    let mut bare = url.clone();
    strip_userinfo(&mut bare);
    let sanitized = bare.as_str().replacen("://", &format!("://{REDACTED}@"), 1);

    message
        .replace(url.as_str(), &sanitized)
        .replace(address, &sanitized)
}

/// Where the running binary can be reached as a credential helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialHelperConfig {
    pub app_path: PathBuf,
    pub config_path: PathBuf,
}

/// Builds `-c credential.helper=...` arguments for git invocations.
#[derive(Debug, Clone)]
pub struct CredentialInjector {
    config: CredentialHelperConfig,
}

impl CredentialInjector {
    pub fn new(config: CredentialHelperConfig) -> Self {
        Self { config }
    }

    /// Arguments for clone and push. Empty when there is no username.
    pub fn helper_args(&self, username: &str, password: &str) -> Vec<String> {
        if username.is_empty() {
            return Vec::new();
        }
        vec!["-c".to_string(), self.helper_setting(username, Some(password))]
    }

    /// Arguments for accessibility probes, which leave out an empty password.
    pub fn probe_args(&self, username: &str, password: &str) -> Vec<String> {
        if username.is_empty() {
            return Vec::new();
        }
        let password = (!password.is_empty()).then_some(password);
        vec!["-c".to_string(), self.helper_setting(username, password)]
    }

    fn helper_setting(&self, username: &str, password: Option<&str>) -> String {
        let mut setting = format!(
            "credential.helper={} -c {} credential-helper --username {}",
            shell_words::quote(&self.config.app_path.to_string_lossy()),
            shell_words::quote(&self.config.config_path.to_string_lossy()),
            shell_words::quote(username),
        );
        if let Some(password) = password {
            setting.push_str(" --password ");
            setting.push_str(&shell_words::quote(password));
        }
        setting
    }

    /// First wiki address next to `remote` that answers, if any
    pub async fn wiki_remote_url(
        &self,
        vcs: &dyn VcsClient,
        remote: &str,
        username: &str,
        password: &str,
    ) -> Option<String> {
        let args = self.probe_args(username, password);
        let remote = remote.trim_end_matches('/');
        let base = remote.strip_suffix(".git").unwrap_or(remote);

        for suffix in WIKI_URL_SUFFIXES {
            let candidate = format!("{base}{suffix}");
            if vcs.is_repo_url_accessible(&candidate, &args).await {
                return Some(candidate);
            }
            debug!(suffix, "Wiki probe got no answer");
        }
        None
    }
}

/// Lines written by the credential helper for a `get` request
pub fn helper_output(username: &str, password: &str) -> String {
    let mut out = String::new();
    if !username.is_empty() {
        out.push_str(&format!("username={username}\n"));
    }
    if !password.is_empty() {
        out.push_str(&format!("password={password}\n"));
    }
    out
}

fn strip_userinfo(url: &mut Url) {
    let _ = url.set_password(None);
    let _ = url.set_username("");
}

/// Decode a percent-encoded userinfo component
fn percent_decode(value: &str) -> Result<String, RemoteAddressError> {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RemoteAddressError::Encoding)
}
