mod filesystem_client;
mod http_client;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::application::ports::{LfsClient, LfsClientFactory, LfsError};

pub use filesystem_client::FilesystemLfsClient;
pub use http_client::HttpLfsClient;

/// Builds a large-file client per endpoint; `file://` endpoints are served
/// from the local filesystem, `http(s)://` through the batch API.
pub struct LfsClientRouter {
    http: reqwest::Client,
    batch_size: usize,
}

impl LfsClientRouter {
    pub fn new(batch_size: usize, request_timeout: Duration) -> Result<Self, LfsError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("mirror-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LfsError::Transport(e.to_string()))?;
        Ok(Self { http, batch_size })
    }
}

impl LfsClientFactory for LfsClientRouter {
    fn create(&self, endpoint: Url) -> Result<Arc<dyn LfsClient>, LfsError> {
        match endpoint.scheme() {
            "http" | "https" => Ok(Arc::new(HttpLfsClient::new(
                self.http.clone(),
                endpoint,
                self.batch_size,
            ))),
            "file" => {
                let path = endpoint
                    .to_file_path()
                    .map_err(|_| LfsError::Protocol(format!("invalid file endpoint: {endpoint}")))?;
                Ok(Arc::new(FilesystemLfsClient::new(path, self.batch_size)))
            }
            scheme => Err(LfsError::Protocol(format!(
                "unsupported large-file endpoint scheme: {scheme}"
            ))),
        }
    }
}
