use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::records::{require_all, require_known, CatalogRecord};
use crate::Result;

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
pub enum HeroRole {
    Tank,
    Fighter,
    Assassin,
    Mage,
    Marksman,
    Support,
}

/// A stored hero. Missing or unlisted values still load, so one odd record
/// never hides the rest of the catalog; [`CatalogRecord::validate`] holds new
/// and edited heroes to [`HeroRole`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hero {
    pub id: String,
    #[serde(rename = "her")]
    pub name: String,
    #[serde(rename = "roll")]
    pub role: String,
    #[serde(rename = "URL")]
    pub image: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
impl Hero {
    pub fn new<S: Into<String>>(id: S, name: S, role: HeroRole, image: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: role.to_string(),
            image: image.into(),
            extra: Map::new(),
        }
    }
}

impl CatalogRecord for Hero {
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
        require_all(&[self.name.as_str(), self.role.as_str(), self.image.as_str()])?;
        require_known::<HeroRole>("role", &self.role)
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.role.as_str()]
    }

    fn categories(&self) -> Vec<String> {
        vec![self.role.clone()]
    }

    fn image_urls(&self) -> Vec<&str> {
        vec![self.image.as_str()]
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn wire_field_names() {
        let hero: Hero = serde_json::from_str(
            r#"{"id": "x1", "her": "Layla", "roll": "Marksman", "URL": "https://cdn/l.png"}"#,
        )
        .unwrap();

        assert_eq!(hero.name, "Layla");
        assert_eq!(hero.role, "Marksman");

        let json = serde_json::to_value(&hero).unwrap();
        assert_eq!(json["her"], "Layla");
        assert_eq!(json["URL"], "https://cdn/l.png");
    }

    #[test]
    fn unknown_fields_survive() {
        let hero: Hero = serde_json::from_str(
            r#"{"id": "x1", "her": "Layla", "roll": "Marksman", "URL": "u", "lane": "gold"}"#,
        )
        .unwrap();

        let json = serde_json::to_value(&hero).unwrap();

        assert_eq!(json["lane"], "gold");
    }

    #[test]
    fn empty_fields_are_rejected() {
        let hero = Hero::new("", "Layla", HeroRole::Marksman, "");

        assert_eq!(hero.validate().unwrap_err().message, "All fields are required");
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(HeroRole::from_str("assassin").unwrap(), HeroRole::Assassin);
    }

    #[test]
    fn unlisted_role_loads_but_fails_validation() {
        let hero: Hero = serde_json::from_str(
            r#"{"id": "x1", "her": "Layla", "roll": "Jungler", "URL": "u"}"#,
        )
        .unwrap();

        assert_eq!(hero.role, "Jungler");
        assert_eq!(hero.validate().unwrap_err().message, "Unknown role Jungler");

        let lowercase = Hero {
            role: "marksman".to_owned(),
            ..hero
        };
        assert!(lowercase.validate().is_ok());
    }

    #[test]
    fn missing_fields_load_empty() {
        let hero: Hero = serde_json::from_str(r#"{"her": "Layla"}"#).unwrap();

        assert!(hero.role.is_empty());
        assert_eq!(hero.validate().unwrap_err().message, "All fields are required");
    }
}
