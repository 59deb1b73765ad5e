use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::records::{require_all, CatalogRecord};
use crate::Result;

/// Shared shape of the recall, spawn, battle emote and elimination catalogs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Effect {
    pub id: String,
    pub name: String,
    pub image1: String,
    pub image2: String,
    pub zip: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogRecord for Effect {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<()> {
        require_all(&[
            self.name.as_str(),
            self.image1.as_str(),
            self.image2.as_str(),
            self.zip.as_str(),
        ])
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn categories(&self) -> Vec<String> {
        Vec::new()
    }

    fn image_urls(&self) -> Vec<&str> {
        vec![self.image1.as_str(), self.image2.as_str()]
    }
}
