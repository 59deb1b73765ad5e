use tracing::info;

use crate::models::catalog_kind::CatalogKind;
use crate::models::catalog_reader::{read_snapshot, CatalogSnapshot};
use crate::models::codec;
use crate::models::content_store::{ContentStore, PutFile};
use crate::models::errors::{CatalogError, ErrorKind};
use crate::models::id::generate_id;
use crate::models::records::CatalogRecord;
use crate::models::token::TokenState;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<R> {
    /// The created or updated record, `None` after a delete.
    pub record: Option<R>,
    pub message: String,
    /// Revision marker of the file after the write.
    pub sha: String,
}

/// Read-modify-write access to one catalog file.
///
/// Every mutation re-reads the array and its revision marker, applies the
/// change in memory and writes it back with that marker. A concurrent writer
/// makes the marker stale and the write fails with [`ErrorKind::Conflict`];
/// there is no retry and no merge. The local list only changes after the
/// store accepted the write.
pub struct CatalogClient<S, R> {
    store: S,
    kind: CatalogKind,
    path: String,
    token: TokenState,
    records: Vec<R>,
}

impl<S: ContentStore, R: CatalogRecord> CatalogClient<S, R> {
    pub fn new<P: Into<String>>(store: S, kind: CatalogKind, path: P, token: TokenState) -> Self {
        Self {
            store,
            kind,
            path: path.into(),
            token,
            records: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn refresh(&mut self) -> Result<&[R]> {
        let token = self.token.bearer()?;
        let snapshot: CatalogSnapshot<R> = read_snapshot(&self.store, token, &self.path).await?;

        self.records = snapshot.records;

        Ok(&self.records)
    }

    pub async fn create(&mut self, mut record: R) -> Result<MutationOutcome<R>> {
        record.validate()?;
        self.token.bearer()?;

        let message = format!("Add {} {}", self.kind.label(), record.name());

        let sha = self
            .commit(&message, |mut records| {
                let id = generate_id(records.iter().map(|r| r.id()));
                record.set_id(id);
                records.push(record.clone());

                Ok(records)
            })
            .await?;

        Ok(MutationOutcome {
            record: Some(record),
            message,
            sha,
        })
    }

    /// Replaces the record with the same id; the id itself never changes.
    pub async fn update(&mut self, record: R) -> Result<MutationOutcome<R>> {
        if record.id().trim().is_empty() {
            return Err(CatalogError::validation("Select a record to update"));
        }

        record.validate()?;
        self.token.bearer()?;

        let message = format!("Update {} {}", self.kind.label(), record.id());
        let label = self.kind.label();

        let sha = self
            .commit(&message, |mut records| {
                let existing = records
                    .iter_mut()
                    .find(|r| r.id() == record.id())
                    .ok_or_else(|| missing_record(label, record.id()))?;

                *existing = record.clone();

                Ok(records)
            })
            .await?;

        Ok(MutationOutcome {
            record: Some(record),
            message,
            sha,
        })
    }

    pub async fn delete(&mut self, id: &str) -> Result<MutationOutcome<R>> {
        if id.trim().is_empty() {
            return Err(CatalogError::validation("Select a record to delete"));
        }

        self.token.bearer()?;

        let message = format!("Delete {} {}", self.kind.label(), id);
        let label = self.kind.label();

        let sha = self
            .commit(&message, |records| {
                let before = records.len();
                let records = records
                    .into_iter()
                    .filter(|r| r.id() != id)
                    .collect::<Vec<_>>();

                if records.len() == before {
                    return Err(missing_record(label, id));
                }

                Ok(records)
            })
            .await?;

        Ok(MutationOutcome {
            record: None,
            message,
            sha,
        })
    }

    async fn commit<F>(&mut self, message: &str, transform: F) -> Result<String>
    where
        F: FnOnce(Vec<R>) -> Result<Vec<R>>,
    {
        let token = self.token.bearer()?;

        let snapshot: CatalogSnapshot<R> = read_snapshot(&self.store, token, &self.path).await?;
        let records = transform(snapshot.records)?;

        let file = PutFile {
            message: message.to_owned(),
            content: codec::encode_catalog(&records)?,
            sha: snapshot.sha,
        };

        let outcome = self.store.put_file(token, &self.path, file, None).await?;

        info!("{} ({} records)", message, records.len());

        self.records = records;

        Ok(outcome.sha)
    }
}

fn missing_record(label: &str, id: &str) -> CatalogError {
    CatalogError::new(ErrorKind::NotFound, format!("No {} with id {}", label, id))
}
