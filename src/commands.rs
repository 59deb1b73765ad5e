use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::{Config, RepoLocation};
use crate::models::catalog_client::CatalogClient;
use crate::models::catalog_kind::{CatalogKind, RecordShape};
use crate::models::catalog_reader::{AuthenticatedSource, CatalogView, PublicReader};
use crate::models::codec;
use crate::models::content_store::{GithubStore, Progress};
use crate::models::errors::{CatalogError, ErrorExt, ErrorKind};
use crate::models::file_info::FileInfo;
use crate::models::filter::{DebouncedFilter, FilterQuery};
use crate::models::host_bridge::{self, ExternalDownloader, HostBridge, InstallOutcome, ProgressHub};
use crate::models::preload::{image_urls, preload_images};
use crate::models::records::effect::Effect;
use crate::models::records::hero::Hero;
use crate::models::records::skin::Skin;
use crate::models::records::CatalogRecord;
use crate::models::task_scope::TaskScope;
use crate::models::token::{BearerToken, TokenSource, TokenState};
use crate::models::uploader::{LargeUploadTarget, PendingForm, Uploader};
use crate::{Command, Result};

/// Runs `$f::<Record>(args)` with the record type that matches the catalog.
macro_rules! with_record {
    ($kind:expr, $f:ident($($arg:expr),* $(,)?)) => {
        match $kind.shape() {
            RecordShape::Hero => $f::<Hero>($($arg),*).await,
            RecordShape::Skin => $f::<Skin>($($arg),*).await,
            RecordShape::Effect => $f::<Effect>($($arg),*).await,
        }
    };
}

pub struct Context {
    config: Config,
    client: Client,
    repo: RepoLocation,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder().user_agent(&config.user_agent).build()?;
        let repo = config.repo_location();

        Ok(Self {
            config,
            client,
            repo,
        })
    }

    async fn token(&self) -> TokenState {
        TokenSource::new(
            self.client.clone(),
            self.config.token_endpoint.clone(),
            self.config.token_format,
            self.config.token_field.clone(),
        )
        .acquire(&self.config.user_agent)
        .await
    }

    fn store(&self) -> GithubStore {
        GithubStore::new(self.client.clone(), self.repo.clone())
    }

    fn public_reader(&self) -> PublicReader {
        PublicReader::new(self.client.clone(), self.repo.clone())
    }

    fn path(&self, kind: CatalogKind) -> String {
        self.repo.path(&kind.file_name())
    }

    fn uploader(&self, token: TokenState) -> Uploader<GithubStore> {
        let large_upload = match (&self.config.upload_endpoint, &self.config.upload_token) {
            (Some(endpoint), Some(token)) => Some(LargeUploadTarget {
                endpoint: endpoint.clone(),
                token: BearerToken::new(token.clone()),
            }),
            _ => None,
        };

        Uploader::new(self.store(), self.client.clone(), token, large_upload)
    }
}

pub(crate) async fn run(config: Config, command: Command) -> Result<()> {
    let ctx = Context::new(config)?;

    match command {
        Command::Token => {
            match ctx.token().await.error() {
                None => println!("Token acquired, writes enabled."),
                Some(reason) => println!("Writes disabled: {}", reason),
            }
            Ok(())
        }
        Command::List {
            catalog,
            search,
            category,
            sort,
            authenticated,
            json,
        } => {
            let query = FilterQuery {
                search,
                category,
                sort,
            };
            with_record!(catalog, list(&ctx, catalog, &query, authenticated, json))
        }
        Command::Show { catalog, id } => with_record!(catalog, show(&ctx, catalog, &id)),
        Command::Add {
            catalog,
            json,
            uploads,
        } => with_record!(catalog, add(&ctx, catalog, &json, &uploads)),
        Command::Update {
            catalog,
            id,
            json,
            uploads,
        } => with_record!(catalog, update(&ctx, catalog, &id, &json, &uploads)),
        Command::Delete { catalog, id } => with_record!(catalog, delete(&ctx, catalog, &id)),
        Command::Upload {
            catalog,
            slot,
            path,
        } => {
            let uploader = ctx.uploader(ctx.token().await);
            let file = FileInfo::open(&path).await?;

            let url = uploader
                .upload_file(slot, catalog, &file, progress_printer(&file.file_name))
                .await?;

            println!("{}", url);
            Ok(())
        }
        Command::Browse { catalog } => with_record!(catalog, browse(&ctx, catalog)),
        Command::Install { url, downloader } => install(&url, downloader).await,
    }
}

fn progress_printer(label: &str) -> Progress {
    let label = label.to_owned();

    Arc::new(move |percent| {
        eprint!("\rUploading {} {:>3}%", label, percent);

        if percent >= 100 {
            eprintln!();
        }
    })
}

fn print_records<R: CatalogRecord>(records: &[R], json: bool) -> Result<()> {
    if json {
        print!("{}", codec::serialize_catalog(records)?);
        return Ok(());
    }

    for record in records {
        println!(
            "{:<12} {:<32} {}",
            record.id(),
            record.name(),
            record.categories().join(", ")
        );
    }

    println!("{} record(s)", records.len());

    Ok(())
}

async fn load_view<R: CatalogRecord>(
    ctx: &Context,
    kind: CatalogKind,
    authenticated: bool,
) -> Result<CatalogView<R>> {
    let path = ctx.path(kind);

    let view = if authenticated {
        let token = ctx.token().await;
        let store = ctx.store();
        let source = AuthenticatedSource {
            store: &store,
            token: token.bearer()?,
        };

        CatalogView::load(&source, &path).await
    } else {
        CatalogView::load(&ctx.public_reader(), &path).await
    };

    if let Some(e) = view.error() {
        eprintln!("Failed to load {}: {}", kind, e);
    }

    Ok(view)
}

async fn list<R: CatalogRecord>(
    ctx: &Context,
    kind: CatalogKind,
    query: &FilterQuery,
    authenticated: bool,
    json: bool,
) -> Result<()> {
    let view = load_view::<R>(ctx, kind, authenticated).await?;

    print_records(&view.filtered(query), json)
}

async fn show<R: CatalogRecord>(ctx: &Context, kind: CatalogKind, id: &str) -> Result<()> {
    let view = load_view::<R>(ctx, kind, false).await?;

    let record = view.find(id).ok_or_else(|| {
        CatalogError::new(ErrorKind::NotFound, format!("No {} with id {}", kind.label(), id))
    })?;

    println!("{}", serde_json::to_string_pretty(record)?);

    Ok(())
}

/// Uploads every `FIELD=PATH` pair and writes the resulting urls into `record`.
async fn fill_uploads(
    ctx: &Context,
    kind: CatalogKind,
    token: &TokenState,
    uploads: &[(String, PathBuf)],
    record: &mut Value,
) -> Result<()> {
    if uploads.is_empty() {
        return Ok(());
    }

    let uploader = ctx.uploader(token.clone());
    let mut form = PendingForm::new();

    for (field, path) in uploads {
        let file = FileInfo::open(path).await?;

        let url = form
            .fill(&uploader, kind, field, &file, progress_printer(&file.file_name))
            .await?;

        println!("{} -> {}", field, url);
    }

    form.apply(record)
}

/// Absent fields load empty and are caught by `validate`; what is left here
/// is a field holding the wrong kind of JSON value.
fn parse_record<R: CatalogRecord>(record: Value) -> Result<R> {
    serde_json::from_value(record)
        .map_err(|e| CatalogError::validation(format!("Invalid record: {}", e)))
}

async fn add<R: CatalogRecord>(
    ctx: &Context,
    kind: CatalogKind,
    json: &str,
    uploads: &[(String, PathBuf)],
) -> Result<()> {
    let mut record = serde_json::from_str::<Value>(json).context("Record is not valid JSON")?;

    let token = ctx.token().await;

    fill_uploads(ctx, kind, &token, uploads, &mut record).await?;

    let mut client = CatalogClient::<_, R>::new(ctx.store(), kind, ctx.path(kind), token);
    let outcome = client.create(parse_record(record)?).await?;

    println!("{}", outcome.message);

    if let Some(record) = outcome.record {
        println!("id: {}", record.id());
    }

    Ok(())
}

async fn update<R: CatalogRecord>(
    ctx: &Context,
    kind: CatalogKind,
    id: &str,
    json: &str,
    uploads: &[(String, PathBuf)],
) -> Result<()> {
    let mut changes = serde_json::from_str::<Value>(json).context("Changes are not valid JSON")?;

    let token = ctx.token().await;
    let mut client = CatalogClient::<_, R>::new(ctx.store(), kind, ctx.path(kind), token.clone());

    let current = client
        .refresh()
        .await?
        .iter()
        .find(|r| r.id() == id)
        .cloned()
        .ok_or_else(|| {
            CatalogError::new(ErrorKind::NotFound, format!("No {} with id {}", kind.label(), id))
        })?;

    fill_uploads(ctx, kind, &token, uploads, &mut changes).await?;

    let mut record = serde_json::to_value(&current)?;
    let fields = changes
        .as_object()
        .ok_or_else(|| CatalogError::validation("Changes must be a JSON object"))?;

    if let Some(target) = record.as_object_mut() {
        for (field, value) in fields {
            target.insert(field.clone(), value.clone());
        }

        target.insert("id".to_owned(), Value::String(id.to_owned()));
    }

    let outcome = client.update(parse_record(record)?).await?;

    println!("{}", outcome.message);

    Ok(())
}

async fn delete<R: CatalogRecord>(ctx: &Context, kind: CatalogKind, id: &str) -> Result<()> {
    let token = ctx.token().await;
    let mut client = CatalogClient::<_, R>::new(ctx.store(), kind, ctx.path(kind), token);

    let outcome = client.delete(id).await?;

    println!("{}", outcome.message);

    Ok(())
}

/// `cat:<value>` words set the category filter; the rest is the search text.
fn parse_browse_query(line: &str) -> FilterQuery {
    let mut query = FilterQuery::default();
    let mut words = Vec::new();

    for word in line.split_whitespace() {
        match word.strip_prefix("cat:") {
            Some(category) if !category.is_empty() => query.category = Some(category.to_owned()),
            _ => words.push(word),
        }
    }

    query.search = words.join(" ");
    query
}

async fn browse<R: CatalogRecord>(ctx: &Context, kind: CatalogKind) -> Result<()> {
    let view = load_view::<R>(ctx, kind, false).await?;
    let records = Arc::new(view.records().to_vec());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debounced = DebouncedFilter::new(move |found: Vec<R>| {
        let _ = tx.send(found);
    });
    let mut preloads = TaskScope::new();

    println!(
        "{} {} record(s). Type to search, `cat:<role>` to filter, Ctrl-D to quit.",
        records.len(),
        kind
    );

    debounced.update(records.clone(), FilterQuery::default());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => debounced.update(records.clone(), parse_browse_query(&line)),
                None => break,
            },
            Some(found) = rx.recv() => {
                print_records(&found, false)?;

                if preloads.active() > 0 {
                    debug!("Cancelling {} stale preload(s)", preloads.active());
                }
                preloads.cancel_all();

                let client = ctx.client.clone();
                let urls = image_urls(&found);

                preloads.spawn(async move {
                    let settled = preload_images(&client, &urls).await;
                    debug!("Preloaded {} image(s)", settled);
                });
            }
        }
    }

    Ok(())
}

async fn install(url: &str, downloader: Option<String>) -> Result<()> {
    let hub = ProgressHub::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _listener = hub.install(move |event| {
        let _ = tx.send(event.clone());
    });

    let bridge = downloader.map(|program| ExternalDownloader::new(program, hub.clone()));

    match host_bridge::install(bridge.as_ref().map(|b| b as &dyn HostBridge), url)? {
        InstallOutcome::Delegated => {
            while let Some(event) = rx.recv().await {
                match event.progress {
                    Some(progress) => println!("{} {:.0}%", event.status, progress),
                    None => println!("{}", event.status),
                }

                if event.status.is_final() {
                    if let Some(message) = event.message {
                        println!("{}", message);
                    }
                    break;
                }
            }
        }
        InstallOutcome::OpenInBrowser { url, alert } => {
            println!("Open {} in your browser.", url);
            println!("{}", alert);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::records::REQUIRED_FIELDS_MESSAGE;

    #[test]
    fn browse_query_splits_category() {
        let query = parse_browse_query("cat:Assassin  night owl");

        assert_eq!(query.category.as_deref(), Some("Assassin"));
        assert_eq!(query.search, "night owl");
        assert_eq!(parse_browse_query("").search, "");
    }

    #[test]
    fn missing_fields_surface_as_validation() {
        let hero = parse_record::<Hero>(serde_json::json!({"her": "Layla"})).unwrap();
        let err = hero.validate().unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, REQUIRED_FIELDS_MESSAGE);
    }

    #[test]
    fn wrongly_typed_field_is_not_reported_as_missing() {
        let err = parse_record::<Skin>(serde_json::json!({"skin": "Aries", "roles": "Marksman"}))
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.starts_with("Invalid record"));

        let err = parse_record::<Hero>(serde_json::json!({"her": "Layla", "roll": "Jungler", "URL": "u"}))
            .unwrap()
            .validate()
            .unwrap_err();
        assert_eq!(err.message, "Unknown role Jungler");
    }
}
