use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::errors::CatalogError;
use crate::Result;

pub mod effect;
pub mod hero;
pub mod skin;

pub const REQUIRED_FIELDS_MESSAGE: &str = "All fields are required";

/// A flat record stored in one of the catalog arrays.
pub trait CatalogRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    fn name(&self) -> &str;

    /// Checks the fields an admin form must fill in before submitting.
    fn validate(&self) -> Result<()>;

    /// Values the case-insensitive search matches against.
    fn search_fields(&self) -> Vec<&str>;

    /// Values the category filter compares for equality.
    fn categories(&self) -> Vec<String>;

    fn image_urls(&self) -> Vec<&str>;
}

pub(crate) fn require_all(fields: &[&str]) -> Result<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        Err(CatalogError::validation(REQUIRED_FIELDS_MESSAGE))
    } else {
        Ok(())
    }
}

/// Stored values are read as plain strings; only forms are held to the known set.
pub(crate) fn require_known<T: FromStr>(label: &str, value: &str) -> Result<()> {
    value
        .parse::<T>()
        .map(|_| ())
        .map_err(|_| CatalogError::validation(format!("Unknown {} {}", label, value)))
}
