use std::sync::Arc;

use futures::stream::{self, Stream};
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RepoLocation;
use crate::endpoints::github::GithubEndpoint;
use crate::models::codec;
use crate::models::errors::{CatalogError, ErrorExt};
use crate::models::token::BearerToken;
use crate::Result;

const GITHUB_JSON: &str = "application/vnd.github+json";
const BODY_CHUNK_SIZE: usize = 64 * 1024;

/// Upload progress in percent, 0 to 100.
pub type Progress = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    /// Revision marker that must accompany the next write.
    pub sha: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PutFile {
    pub message: String,
    /// Base64 encoded file content.
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub sha: String,
    pub download_url: Option<String>,
}

/// Read/write access to files in the hosting repository.
#[allow(async_fn_in_trait)]
pub trait ContentStore {
    /// `Ok(None)` when the file does not exist yet.
    async fn get_file(&self, token: &BearerToken, path: &str) -> Result<Option<RemoteFile>>;

    /// Writes `file` at `path`. A stale or missing `sha` for an existing file is
    /// rejected by the store, never merged.
    async fn put_file(
        &self,
        token: &BearerToken,
        path: &str,
        file: PutFile,
        progress: Option<Progress>,
    ) -> Result<PutOutcome>;

    fn public_url(&self, path: &str) -> String;
}

pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }

    ((done.min(total) * 100) / total) as u8
}

/// Splits `bytes` into chunks, reporting how much has been handed to the
/// transport so far.
pub fn progress_chunks(
    bytes: Vec<u8>,
    progress: Progress,
) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + Sync + 'static {
    let total = bytes.len();
    let chunks = bytes
        .chunks(BODY_CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect::<Vec<_>>();

    let mut sent = 0;

    stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        progress(percent(sent, total));

        Ok::<_, std::io::Error>(chunk)
    }))
}

pub fn progress_body(bytes: Vec<u8>, progress: Progress) -> Body {
    Body::wrap_stream(progress_chunks(bytes, progress))
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Turns a non-2xx response into an error carrying the status and the API's
/// own message when it sent one.
pub async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();

    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_owned()
        });

    Err(CatalogError::from_status(status.as_u16(), message))
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    encoding: Option<String>,
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutResponseContent,
}

#[derive(Debug, Deserialize)]
struct PutResponseContent {
    sha: String,
    download_url: Option<String>,
}

#[derive(Serialize)]
struct PutBody<'a> {
    #[serde(flatten)]
    file: &'a PutFile,
    branch: &'a str,
}

#[derive(Debug, Clone)]
pub struct GithubStore {
    client: Client,
    repo: RepoLocation,
}

impl GithubStore {
    pub fn new(client: Client, repo: RepoLocation) -> Self {
        Self { client, repo }
    }

    async fn download(&self, token: &BearerToken, url: &str) -> Result<Vec<u8>> {
        debug!("Making GET request to download url: {}", url);

        let res = self
            .client
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await?;

        Ok(check_status(res).await?.bytes().await?.to_vec())
    }
}

impl ContentStore for GithubStore {
    async fn get_file(&self, token: &BearerToken, path: &str) -> Result<Option<RemoteFile>> {
        let url = GithubEndpoint::Contents(&self.repo, path).url();

        debug!("Making GET request to endpoint: {}", url);

        let res = self
            .client
            .get(&url)
            .query(&[("ref", &self.repo.branch)])
            .bearer_auth(token.secret())
            .header(ACCEPT, GITHUB_JSON)
            .send()
            .await?;

        if res.status() == StatusCode::NOT_FOUND {
            debug!("{} does not exist yet", path);
            return Ok(None);
        }

        let body = check_status(res).await?.text().await?;
        let file = serde_json::from_str::<ContentsResponse>(&body)?;

        // Files over 1MB come back without inline content.
        let content = if file.encoding.as_deref() == Some("none") {
            let download_url = file
                .download_url
                .context(format!("{} has no inline content or download url", path))?;

            self.download(token, &download_url).await?
        } else {
            codec::decode_content(&file.content)?
        };

        Ok(Some(RemoteFile {
            content,
            sha: file.sha,
        }))
    }

    async fn put_file(
        &self,
        token: &BearerToken,
        path: &str,
        file: PutFile,
        progress: Option<Progress>,
    ) -> Result<PutOutcome> {
        let url = GithubEndpoint::Contents(&self.repo, path).url();

        let body = serde_json::to_vec(&PutBody {
            file: &file,
            branch: &self.repo.branch,
        })?;
        let length = body.len();

        debug!("Making PUT request to endpoint: {} ({} bytes)", url, length);

        let body = match progress {
            Some(progress) => progress_body(body, progress),
            None => Body::from(body),
        };

        let res = self
            .client
            .put(&url)
            .bearer_auth(token.secret())
            .header(ACCEPT, GITHUB_JSON)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, length)
            .body(body)
            .send()
            .await?;

        let body = check_status(res).await?.text().await?;
        let res = serde_json::from_str::<PutResponse>(&body)?;

        info!("Committed {}: {}", path, file.message);

        Ok(PutOutcome {
            sha: res.content.sha,
            download_url: res.content.download_url,
        })
    }

    fn public_url(&self, path: &str) -> String {
        GithubEndpoint::RawContents(&self.repo, path).url()
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for the contents API with the same revision rules.
    #[derive(Default)]
    pub struct MemoryStore {
        files: Mutex<HashMap<String, (Vec<u8>, u64)>>,
        revision: AtomicU64,
        fail_next_put: Mutex<Option<CatalogError>>,
        pub gets: AtomicUsize,
        pub puts: AtomicUsize,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Writes `content` directly, bumping the revision like another client would.
        pub fn insert(&self, path: &str, content: &[u8]) {
            let rev = self.revision.fetch_add(1, Ordering::SeqCst) + 1;

            self.files
                .lock()
                .unwrap()
                .insert(path.to_owned(), (content.to_vec(), rev));
        }

        pub fn read(&self, path: &str) -> Option<Vec<u8>> {
            self.files.lock().unwrap().get(path).map(|(c, _)| c.clone())
        }

        pub fn fail_next_put(&self, err: CatalogError) {
            *self.fail_next_put.lock().unwrap() = Some(err);
        }

        pub fn put_count(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }

        pub fn get_count(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    impl ContentStore for MemoryStore {
        async fn get_file(&self, _token: &BearerToken, path: &str) -> Result<Option<RemoteFile>> {
            self.gets.fetch_add(1, Ordering::SeqCst);

            Ok(self
                .files
                .lock()
                .unwrap()
                .get(path)
                .map(|(content, rev)| RemoteFile {
                    content: content.clone(),
                    sha: format!("sha-{}", rev),
                }))
        }

        async fn put_file(
            &self,
            _token: &BearerToken,
            path: &str,
            file: PutFile,
            progress: Option<Progress>,
        ) -> Result<PutOutcome> {
            self.puts.fetch_add(1, Ordering::SeqCst);

            if let Some(err) = self.fail_next_put.lock().unwrap().take() {
                return Err(err);
            }

            let current = self
                .files
                .lock()
                .unwrap()
                .get(path)
                .map(|(_, rev)| format!("sha-{}", rev));

            match (current, file.sha.as_deref()) {
                (None, None) => {}
                (Some(current), Some(given)) if current == given => {}
                (Some(_), None) => {
                    return Err(CatalogError::from_status(422, "\"sha\" wasn't supplied."))
                }
                (_, Some(given)) => {
                    return Err(CatalogError::from_status(
                        409,
                        format!("{} does not match {}", path, given),
                    ))
                }
            }

            let content = codec::decode_content(&file.content)?;
            self.insert(path, &content);

            if let Some(progress) = progress {
                progress(100);
            }

            let sha = format!("sha-{}", self.revision.load(Ordering::SeqCst));

            Ok(PutOutcome {
                sha,
                download_url: None,
            })
        }

        fn public_url(&self, path: &str) -> String {
            format!("memory://{}", path)
        }
    }
}
