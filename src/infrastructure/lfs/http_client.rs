use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::application::ports::{BlobReader, DownloadSink, LfsClient, LfsError, UploadSource};
use crate::domain::value_objects::Pointer;

const MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    operation: &'a str,
    transfers: [&'a str; 1],
    objects: Vec<ObjectSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ObjectSpec {
    oid: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    objects: Vec<ObjectResponse>,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    oid: String,
    #[serde(default)]
    actions: HashMap<String, Action>,
    error: Option<ObjectError>,
}

#[derive(Debug, Clone, Deserialize)]
struct Action {
    href: String,
    #[serde(default)]
    header: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ObjectError {
    code: i64,
    message: String,
}

/// Client for the LFS batch API with the `basic` transfer adapter.
///
/// Credentials embedded in the endpoint URL are moved into basic auth and
/// never sent as part of the URL.
pub struct HttpLfsClient {
    http: Client,
    endpoint: Url,
    credentials: Option<(String, Option<String>)>,
    batch_size: usize,
}

impl HttpLfsClient {
    pub fn new(http: Client, endpoint: Url, batch_size: usize) -> Self {
        let (endpoint, credentials) = split_credentials(endpoint);
        Self {
            http,
            endpoint,
            credentials,
            batch_size: batch_size.max(1),
        }
    }

    fn batch_url(&self) -> Result<Url, LfsError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/objects/batch"))
            .map_err(|e| LfsError::Protocol(format!("invalid endpoint: {e}")))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_deref()),
            None => request,
        }
    }

    async fn batch(
        &self,
        cancel: &CancellationToken,
        operation: &str,
        objects: &[Pointer],
    ) -> Result<Vec<ObjectResponse>, LfsError> {
        let body = BatchRequest {
            operation,
            transfers: ["basic"],
            objects: objects
                .iter()
                .map(|p| ObjectSpec {
                    oid: p.oid.to_string(),
                    size: p.size,
                })
                .collect(),
        };

        let request = self
            .authorize(self.http.post(self.batch_url()?))
            .header(header::ACCEPT, MEDIA_TYPE)
            .header(header::CONTENT_TYPE, MEDIA_TYPE)
            .json(&body);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LfsError::Cancelled),
            response = request.send() => response.map_err(transport)?,
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LfsError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: BatchResponse = response
            .json()
            .await
            .map_err(|e| LfsError::Protocol(format!("batch response: {e}")))?;
        debug!(
            "Batch {} of {} objects answered with {} entries",
            operation,
            objects.len(),
            parsed.objects.len()
        );
        Ok(parsed.objects)
    }

    fn with_headers(&self, request: RequestBuilder, action: &Action) -> RequestBuilder {
        let request = if action.header.contains_key("Authorization") {
            request
        } else {
            self.authorize(request)
        };
        action
            .header
            .iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        action: &Action,
    ) -> Result<BlobReader, LfsError> {
        let request = self.with_headers(self.http.get(&action.href), action);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LfsError::Cancelled),
            response = request.send() => response.map_err(transport)?,
        };
        let response = ensure_success(response).await?;

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::pin(StreamReader::new(stream)))
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        pointer: &Pointer,
        action: &Action,
        reader: BlobReader,
    ) -> Result<(), LfsError> {
        let body = reqwest::Body::wrap_stream(ReaderStream::new(reader));
        let request = self
            .with_headers(self.http.put(&action.href), action)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, pointer.size)
            .body(body);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(LfsError::Cancelled),
            response = request.send() => response.map_err(transport)?,
        };
        ensure_success(response).await?;
        Ok(())
    }

    async fn verify(&self, pointer: &Pointer, action: &Action) -> Result<(), LfsError> {
        let response = self
            .with_headers(self.http.post(&action.href), action)
            .header(header::ACCEPT, MEDIA_TYPE)
            .header(header::CONTENT_TYPE, MEDIA_TYPE)
            .json(&ObjectSpec {
                oid: pointer.oid.to_string(),
                size: pointer.size,
            })
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl LfsClient for HttpLfsClient {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn download(
        &self,
        cancel: &CancellationToken,
        objects: &[Pointer],
        sink: &dyn DownloadSink,
    ) -> Result<(), LfsError> {
        let responses = self.batch(cancel, "download", objects).await?;

        for pointer in objects {
            if cancel.is_cancelled() {
                return Err(LfsError::Cancelled);
            }
            let content = match find(&responses, pointer) {
                None => Err(object_error(pointer, 404, "missing from batch response")),
                Some(ObjectResponse {
                    error: Some(err), ..
                }) => Err(object_error(pointer, err.code, &err.message)),
                Some(response) => match response.actions.get("download") {
                    Some(action) => self.fetch(cancel, action).await,
                    None => Err(object_error(pointer, 404, "no download action")),
                },
            };
            if matches!(content, Err(LfsError::Cancelled)) {
                return Err(LfsError::Cancelled);
            }
            // Per-object failures are recorded by the sink.
            let _ = sink.receive(pointer, content).await;
        }
        Ok(())
    }

    async fn upload(
        &self,
        cancel: &CancellationToken,
        objects: &[Pointer],
        source: &dyn UploadSource,
    ) -> Result<(), LfsError> {
        let responses = self.batch(cancel, "upload", objects).await?;

        for pointer in objects {
            if cancel.is_cancelled() {
                return Err(LfsError::Cancelled);
            }
            let response = match find(&responses, pointer) {
                Some(response) => response,
                None => {
                    let _ = source
                        .open(pointer, Some(object_error(pointer, 404, "missing from batch response")))
                        .await;
                    continue;
                }
            };
            if let Some(err) = &response.error {
                let _ = source
                    .open(pointer, Some(object_error(pointer, err.code, &err.message)))
                    .await;
                continue;
            }
            // No upload action: the remote already has the object.
            let Some(action) = response.actions.get("upload") else {
                continue;
            };

            let Ok(reader) = source.open(pointer, None).await else {
                continue;
            };
            let mut outcome = self.send(cancel, pointer, action, reader).await;
            if outcome.is_ok() {
                if let Some(verify) = response.actions.get("verify") {
                    outcome = self.verify(pointer, verify).await;
                }
            }
            if matches!(outcome, Err(LfsError::Cancelled)) {
                return Err(LfsError::Cancelled);
            }
            if let Err(e) = &outcome {
                warn!("Upload of large-file object {} failed: {}", pointer, e);
            }
            source.finished(pointer, outcome).await;
        }
        Ok(())
    }
}

fn find<'a>(responses: &'a [ObjectResponse], pointer: &Pointer) -> Option<&'a ObjectResponse> {
    responses
        .iter()
        .find(|r| r.oid.eq_ignore_ascii_case(pointer.oid.as_hex()))
}

fn object_error(pointer: &Pointer, code: i64, message: &str) -> LfsError {
    LfsError::Object {
        oid: pointer.oid.to_string(),
        code,
        message: message.to_string(),
    }
}

fn transport(err: reqwest::Error) -> LfsError {
    // reqwest includes the URL in its errors; drop it so credentials in
    // action hrefs never reach logs.
    LfsError::Transport(err.without_url().to_string())
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LfsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match status {
        StatusCode::NOT_FOUND => "object not found".to_string(),
        _ => response.text().await.unwrap_or_default(),
    };
    Err(LfsError::Http {
        status: status.as_u16(),
        message,
    })
}

fn decode(component: &str) -> String {
    urlencoding::decode(component)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| component.to_string())
}

/// Move userinfo out of the URL
fn split_credentials(mut url: Url) -> (Url, Option<(String, Option<String>)>) {
    if url.username().is_empty() {
        return (url, None);
    }
    let user = decode(url.username());
    let password = url.password().map(decode);
    let _ = url.set_username("");
    let _ = url.set_password(None);
    (url, Some((user, password)))
}
