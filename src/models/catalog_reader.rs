use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::RepoLocation;
use crate::endpoints::github::GithubEndpoint;
use crate::models::codec;
use crate::models::content_store::{check_status, ContentStore};
use crate::models::filter::{self, FilterQuery};
use crate::models::records::CatalogRecord;
use crate::models::token::BearerToken;
use crate::Result;

pub const PUBLIC_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// The current array together with the revision marker it was read at.
/// `sha` is `None` when the file does not exist yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot<R> {
    pub records: Vec<R>,
    pub sha: Option<String>,
}

pub async fn read_snapshot<S: ContentStore, R: DeserializeOwned>(
    store: &S,
    token: &BearerToken,
    path: &str,
) -> Result<CatalogSnapshot<R>> {
    match store.get_file(token, path).await? {
        Some(file) => Ok(CatalogSnapshot {
            records: codec::parse_catalog(&file.content)?,
            sha: Some(file.sha),
        }),
        None => Ok(CatalogSnapshot {
            records: Vec::new(),
            sha: None,
        }),
    }
}

#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    async fn fetch_catalog<R: DeserializeOwned>(&self, path: &str) -> Result<Vec<R>>;
}

/// Unauthenticated reads from the raw content mirror.
#[derive(Debug, Clone)]
pub struct PublicReader {
    client: Client,
    repo: RepoLocation,
}

impl PublicReader {
    pub fn new(client: Client, repo: RepoLocation) -> Self {
        Self { client, repo }
    }
}

impl CatalogSource for PublicReader {
    async fn fetch_catalog<R: DeserializeOwned>(&self, path: &str) -> Result<Vec<R>> {
        let url = GithubEndpoint::RawContents(&self.repo, path).url();

        debug!("Making GET request to endpoint: {}", url);

        let res = self
            .client
            .get(&url)
            .timeout(PUBLIC_READ_TIMEOUT)
            .send()
            .await?;

        let body = check_status(res).await?.bytes().await?;

        codec::parse_catalog(&body)
    }
}

/// Reads through the contents API with a bearer token.
pub struct AuthenticatedSource<'a, S> {
    pub store: &'a S,
    pub token: &'a BearerToken,
}

impl<S: ContentStore> CatalogSource for AuthenticatedSource<'_, S> {
    async fn fetch_catalog<R: DeserializeOwned>(&self, path: &str) -> Result<Vec<R>> {
        Ok(read_snapshot(self.store, self.token, path).await?.records)
    }
}

/// What a viewer page shows: the fetched list, or an empty list and an error
/// banner when the fetch failed.
#[derive(Debug, Clone)]
pub struct CatalogView<R> {
    records: Vec<R>,
    error: Option<String>,
}

impl<R: CatalogRecord> CatalogView<R> {
    pub async fn load<C: CatalogSource>(source: &C, path: &str) -> Self {
        match source.fetch_catalog(path).await {
            Ok(records) => Self {
                records,
                error: None,
            },
            Err(e) => {
                warn!("Failed to load {}: {}", path, e);

                Self {
                    records: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filtered(&self, query: &FilterQuery) -> Vec<R> {
        filter::apply_filter(&self.records, query)
    }

    pub fn find(&self, id: &str) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }
}
