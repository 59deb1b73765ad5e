use std::collections::BTreeMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::models::catalog_kind::CatalogKind;
use crate::models::content_store::{check_status, progress_body, ContentStore, Progress, PutFile};
use crate::models::errors::{CatalogError, ErrorKind};
use crate::models::file_info::FileInfo;
use crate::models::token::{BearerToken, TokenState};
use crate::Result;

const MB: u64 = 1024 * 1024;

pub const MAX_UPLOAD_BYTES: u64 = 100 * MB;
/// Archives above this go through the multipart endpoint instead of the
/// contents API.
pub const LARGE_ARCHIVE_BYTES: u64 = 25 * MB;

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, clap::ValueEnum)]
pub enum AssetSlot {
    Image,
    Archive,
}

impl AssetSlot {
    /// `zip` fields hold archives; every other uploadable field is an image.
    pub fn for_field(field: &str) -> Self {
        if field.eq_ignore_ascii_case("zip") {
            AssetSlot::Archive
        } else {
            AssetSlot::Image
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            AssetSlot::Image => &["jpg", "jpeg", "png", "gif"],
            AssetSlot::Archive => &["zip"],
        }
    }

    pub fn validate(&self, file_name: &str, size: u64) -> Result<()> {
        let allowed = self.allowed_extensions();

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension {
            Some(ext) if allowed.contains(&ext.as_str()) => {}
            _ => {
                return Err(CatalogError::validation(format!(
                    "Invalid file type for {}. Allowed: {}",
                    file_name,
                    allowed.join(", ")
                )))
            }
        }

        if size == 0 {
            return Err(CatalogError::validation(format!("{} is empty", file_name)));
        }

        if size > MAX_UPLOAD_BYTES {
            return Err(CatalogError::validation(format!(
                "{} is {:.1} MB, the limit is {} MB",
                file_name,
                size as f64 / MB as f64,
                MAX_UPLOAD_BYTES / MB
            )));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UploadRoute {
    ContentApi,
    Multipart,
}

pub fn route_for(slot: AssetSlot, size: u64) -> UploadRoute {
    if slot == AssetSlot::Archive && size > LARGE_ARCHIVE_BYTES {
        UploadRoute::Multipart
    } else {
        UploadRoute::ContentApi
    }
}

/// Anything outside `[A-Za-z0-9._-]` becomes `_`, so the name is a single
/// literal segment in both the contents url and the public url.
pub fn asset_path(kind: CatalogKind, file_name: &str) -> String {
    let file_name = file_name
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect::<String>();

    format!(
        "{}/{}_{}",
        kind.asset_folder(),
        Utc::now().timestamp_millis(),
        file_name
    )
}

/// Multipart upload target for large archives. Its token is issued separately
/// from the contents API bearer token and is never compiled in.
#[derive(Debug, Clone)]
pub struct LargeUploadTarget {
    pub endpoint: String,
    pub token: BearerToken,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

pub struct Uploader<S> {
    store: S,
    client: Client,
    token: TokenState,
    large_upload: Option<LargeUploadTarget>,
}

impl<S: ContentStore> Uploader<S> {
    pub fn new(
        store: S,
        client: Client,
        token: TokenState,
        large_upload: Option<LargeUploadTarget>,
    ) -> Self {
        Self {
            store,
            client,
            token,
            large_upload,
        }
    }

    /// Validates before reading the file so oversized picks never hit memory
    /// or the network.
    pub async fn upload_file(
        &self,
        slot: AssetSlot,
        kind: CatalogKind,
        file: &FileInfo,
        progress: Progress,
    ) -> Result<String> {
        slot.validate(&file.file_name, file.len())?;

        let data = file.read().await?;

        self.upload_bytes(slot, kind, &file.file_name, data, progress)
            .await
    }

    /// Returns the public url of the uploaded asset.
    pub async fn upload_bytes(
        &self,
        slot: AssetSlot,
        kind: CatalogKind,
        file_name: &str,
        data: Vec<u8>,
        progress: Progress,
    ) -> Result<String> {
        let size = data.len() as u64;
        slot.validate(file_name, size)?;

        let url = match route_for(slot, size) {
            UploadRoute::ContentApi => {
                let token = self.token.bearer()?;
                let path = asset_path(kind, file_name);

                debug!("Uploading {} ({} bytes) to {}", file_name, size, path);

                let file = PutFile {
                    message: format!("Upload {}", file_name),
                    content: STANDARD.encode(&data),
                    sha: None,
                };

                let outcome = self
                    .store
                    .put_file(token, &path, file, Some(progress))
                    .await?;

                outcome
                    .download_url
                    .unwrap_or_else(|| self.store.public_url(&path))
            }
            UploadRoute::Multipart => self.upload_multipart(file_name, data, progress).await?,
        };

        info!("Uploaded {} to {}", file_name, url);

        Ok(url)
    }

    async fn upload_multipart(
        &self,
        file_name: &str,
        data: Vec<u8>,
        progress: Progress,
    ) -> Result<String> {
        let target = self.large_upload.as_ref().ok_or_else(|| {
            CatalogError::new(
                ErrorKind::TokenUnavailable,
                "Large archive uploads are not configured",
            )
        })?;

        let size = data.len() as u64;

        debug!("Making multipart POST to {} ({} bytes)", target.endpoint, size);

        let part = Part::stream_with_length(progress_body(data, progress), size)
            .file_name(file_name.to_owned())
            .mime_str("application/zip")?;

        let res = self
            .client
            .post(&target.endpoint)
            .bearer_auth(target.token.secret())
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        let body = check_status(res).await?.text().await?;

        Ok(serde_json::from_str::<UploadResponse>(&body)?.url)
    }
}

/// Upload results waiting for the record they belong to, keyed by the
/// record's JSON field name.
#[derive(Debug, Default, Clone)]
pub struct PendingForm {
    uploads: BTreeMap<String, String>,
}

impl PendingForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `file` into `field`. On failure the field is left empty so the
    /// upload can be retried.
    pub async fn fill<S: ContentStore>(
        &mut self,
        uploader: &Uploader<S>,
        kind: CatalogKind,
        field: &str,
        file: &FileInfo,
        progress: Progress,
    ) -> Result<&str> {
        self.uploads.remove(field);

        let url = uploader
            .upload_file(AssetSlot::for_field(field), kind, file, progress)
            .await?;

        let url = self.uploads.entry(field.to_owned()).or_insert(url);

        Ok(url.as_str())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.uploads.get(field).map(String::as_str)
    }

    /// Copies every uploaded url into the matching field of `record`.
    pub fn apply(&self, record: &mut Value) -> Result<()> {
        let object = record
            .as_object_mut()
            .ok_or_else(|| CatalogError::validation("Record must be a JSON object"))?;

        for (field, url) in &self.uploads {
            object.insert(field.clone(), Value::String(url.clone()));
        }

        Ok(())
    }
}
