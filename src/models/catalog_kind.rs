use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordShape {
    Hero,
    Skin,
    Effect,
}

#[derive(
    Clone,
    Copy,
    Debug,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum CatalogKind {
    Hero,
    Skin,
    Recall,
    Spawn,
    BattleEmote,
    Elimination,
}

impl CatalogKind {
    pub fn file_name(&self) -> String {
        format!("{}.json", self)
    }

    /// Folder uploaded images and archives for this catalog are stored under.
    pub fn asset_folder(&self) -> &'static str {
        match self {
            CatalogKind::Hero => "heroes",
            CatalogKind::Skin => "skins",
            CatalogKind::Recall => "recalls",
            CatalogKind::Spawn => "spawns",
            CatalogKind::BattleEmote => "emotes",
            CatalogKind::Elimination => "eliminations",
        }
    }

    /// Lowercase name used in commit messages.
    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Hero => "hero",
            CatalogKind::Skin => "skin",
            CatalogKind::Recall => "recall",
            CatalogKind::Spawn => "spawn",
            CatalogKind::BattleEmote => "battle emote",
            CatalogKind::Elimination => "elimination",
        }
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            CatalogKind::Hero => RecordShape::Hero,
            CatalogKind::Skin => RecordShape::Skin,
            CatalogKind::Recall
            | CatalogKind::Spawn
            | CatalogKind::BattleEmote
            | CatalogKind::Elimination => RecordShape::Effect,
        }
    }
}
