use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::types::SpriteId;

/// Where a sprite's pixels live in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpriteDef {
    /// Cell coordinates in a uniform grid; `frames` consecutive cells to the right.
    Grid { col: u32, row: u32, frames: u32 },
    /// Pixel rectangle with a draw offset.
    Absolute {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        ox: i32,
        oy: i32,
    },
}

/// Named sprites in declaration order.
/// The order defines sprite ids: the first entry is `SpriteId(1)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpriteTable {
    sprites: IndexMap<String, SpriteDef>,
}

impl SpriteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sprite. Redefining a name keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, def: SpriteDef) {
        self.sprites.insert(name.into(), def);
    }

    pub fn get(&self, name: &str) -> Option<&SpriteDef> {
        self.sprites.get(name)
    }

    /// Sprite id of a named sprite. None if unknown or past the 255th entry.
    pub fn sprite_id(&self, name: &str) -> Option<SpriteId> {
        self.sprites.get_index_of(name).and_then(SpriteId::from_index)
    }

    /// Look a sprite up by id.
    pub fn by_id(&self, id: SpriteId) -> Option<(&str, &SpriteDef)> {
        let index = (id.0 as usize).checked_sub(1)?;
        self.sprites
            .get_index(index)
            .map(|(name, def)| (name.as_str(), def))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpriteDef)> {
        self.sprites.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(col: u32) -> SpriteDef {
        SpriteDef::Grid { col, row: 0, frames: 1 }
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut table = SpriteTable::new();
        table.insert("hero_idle", grid(0));
        table.insert("hero_run", grid(1));
        table.insert("coin", grid(2));

        assert_eq!(table.sprite_id("hero_idle"), Some(SpriteId(1)));
        assert_eq!(table.sprite_id("coin"), Some(SpriteId(3)));
        assert_eq!(table.sprite_id("missing"), None);
        assert_eq!(table.by_id(SpriteId(2)).map(|(n, _)| n), Some("hero_run"));
        assert_eq!(table.by_id(SpriteId::NONE), None);
    }

    #[test]
    fn redefinition_keeps_position() {
        let mut table = SpriteTable::new();
        table.insert("a", grid(0));
        table.insert("b", grid(1));
        table.insert("a", grid(5));
        assert_eq!(table.sprite_id("a"), Some(SpriteId(1)));
        assert_eq!(table.get("a"), Some(&grid(5)));
    }
}
