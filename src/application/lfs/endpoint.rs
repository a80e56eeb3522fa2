use std::path::Path;

use tracing::error;
use url::Url;

/// Large-file endpoint for a repository address.
///
/// An explicit `override_url` is used as is; otherwise the endpoint is
/// `<repo>.git/info/lfs` next to the clone address. `git://` addresses are
/// served over https; local paths map to `file://` URLs.
pub fn determine_endpoint(clone_url: &str, override_url: Option<&str>) -> Option<Url> {
    match override_url.filter(|u| !u.is_empty()) {
        Some(explicit) => endpoint_from_url(explicit),
        None => endpoint_from_clone_url(clone_url),
    }
}

fn endpoint_from_clone_url(raw: &str) -> Option<Url> {
    let mut endpoint = endpoint_from_url(raw)?;
    if endpoint.scheme() == "file" {
        return Some(endpoint);
    }

    let trimmed = endpoint.path().trim_end_matches('/').to_string();
    let path = if trimmed.ends_with(".git") {
        format!("{trimmed}/info/lfs")
    } else {
        format!("{trimmed}.git/info/lfs")
    };
    endpoint.set_path(&path);
    Some(endpoint)
}

fn endpoint_from_url(raw: &str) -> Option<Url> {
    if raw.starts_with('/') {
        return endpoint_from_local_path(raw);
    }

    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            error!("Unable to parse large-file endpoint: {}", e);
            return None;
        }
    };

    match url.scheme() {
        "http" | "https" | "file" => Some(url),
        "git" => Url::parse(&format!("https{}", &raw["git".len()..])).ok(),
        scheme => {
            if Path::new(raw).exists() {
                return endpoint_from_local_path(raw);
            }
            error!(scheme, "Unknown large-file endpoint scheme");
            None
        }
    }
}

fn endpoint_from_local_path(raw: &str) -> Option<Url> {
    let path = Path::new(raw);
    let git_dir = if path.file_name().is_some_and(|n| n == ".git") {
        path.to_path_buf()
    } else {
        path.join(".git")
    };
    let target = if git_dir.exists() { git_dir.as_path() } else { path };
    Url::from_file_path(target).ok()
}
