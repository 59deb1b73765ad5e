use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::errors::CatalogError;
use crate::models::records::hero::HeroRole;
use crate::models::records::{require_all, require_known, CatalogRecord};
use crate::Result;

pub const MAX_SKIN_ROLES: usize = 2;

#[derive(
    Clone,
    Copy,
    Debug,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum SkinType {
    Basic,
    Elite,
    Special,
    Epic,
    Starlight,
    Collector,
    Legend,
    Limited,
    Exclusive,
}

/// Like [`Hero`](crate::models::records::hero::Hero), type and roles are kept
/// as stored and only checked against the known sets on validation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skin {
    pub id: String,
    /// Matched against `Hero::name`, not the hero id.
    pub hero: String,
    #[serde(rename = "skin")]
    pub name: String,
    #[serde(rename = "type")]
    pub skin_type: String,
    pub roles: Vec<String>,
    pub image1: String,
    pub image2: String,
    pub zip: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogRecord for Skin {
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
            self.hero.as_str(),
            self.name.as_str(),
            self.skin_type.as_str(),
            self.image1.as_str(),
            self.image2.as_str(),
            self.zip.as_str(),
        ])?;
        require_known::<SkinType>("skin type", &self.skin_type)?;

        for role in &self.roles {
            require_known::<HeroRole>("role", role)?;
        }

        if self.roles.len() > MAX_SKIN_ROLES {
            return Err(CatalogError::validation(format!(
                "A skin can have at most {} roles",
                MAX_SKIN_ROLES
            )));
        }

        Ok(())
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.hero.as_str(), self.skin_type.as_str()];
        fields.extend(self.roles.iter().map(String::as_str));

        fields
    }

    fn categories(&self) -> Vec<String> {
        let mut categories = vec![self.skin_type.clone()];
        categories.extend(self.roles.iter().cloned());

        categories
    }

    fn image_urls(&self) -> Vec<&str> {
        vec![self.image1.as_str(), self.image2.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skin() -> Skin {
        serde_json::from_str(
            r#"{
                "id": "s1",
                "hero": "Layla",
                "skin": "Cannon and Roses",
                "type": "Epic",
                "roles": ["Marksman"],
                "image1": "https://cdn/1.png",
                "image2": "https://cdn/2.png",
                "zip": "https://cdn/s1.zip"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn roles_default_to_empty() {
        let skin: Skin = serde_json::from_str(
            r#"{"hero": "Layla", "skin": "Classic", "type": "Basic", "image1": "a", "image2": "b", "zip": "c"}"#,
        )
        .unwrap();

        assert!(skin.roles.is_empty());
        assert!(skin.id.is_empty());
    }

    #[test]
    fn too_many_roles_rejected() {
        let mut skin = skin();
        skin.roles = vec!["Marksman".to_owned(), "Mage".to_owned(), "Tank".to_owned()];

        assert!(skin.validate().is_err());

        skin.roles.pop();
        assert!(skin.validate().is_ok());
    }

    #[test]
    fn missing_archive_rejected() {
        let mut skin = skin();
        skin.zip.clear();

        assert_eq!(skin.validate().unwrap_err().message, "All fields are required");
    }

    #[test]
    fn unlisted_type_loads_but_fails_validation() {
        let mut skin = skin();
        skin.skin_type = "Zodiac".to_owned();

        let reloaded: Skin = serde_json::from_value(serde_json::to_value(&skin).unwrap()).unwrap();

        assert_eq!(reloaded.skin_type, "Zodiac");
        assert_eq!(reloaded.validate().unwrap_err().message, "Unknown skin type Zodiac");
    }

    #[test]
    fn unlisted_role_fails_validation() {
        let mut skin = skin();
        skin.roles = vec!["Jungler".to_owned()];

        assert_eq!(skin.validate().unwrap_err().message, "Unknown role Jungler");
    }

    #[test]
    fn categories_include_type_and_roles() {
        assert_eq!(skin().categories(), vec!["Epic", "Marksman"]);
    }
}
