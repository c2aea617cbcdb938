//! Parsed script document.
//!
//! A document is plain data: names and strings as written. Resolution to
//! typed components, bound variables and compiled events happens in
//! `systems::program`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::components::sprite::SpriteTable;
use crate::memory::buffer::IntWidth;

/// A schema variable: where it lives in the globals region and how wide it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVar {
    /// Byte offset from the start of the globals region.
    pub addr: usize,
    #[serde(rename = "type")]
    pub width: IntWidth,
}

/// A value inside an inline `{key: value}` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    List(Vec<i64>),
    Text(String),
}

/// Component parameters in declaration order.
pub type ParamMap = IndexMap<String, ParamValue>;

/// `Key -> Action` line in an entity block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBinding {
    pub key: String,
    pub action: String,
}

/// `shape:` / `solid:` list items in an entity block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicsShape {
    pub shape: Option<String>,
    pub solid: bool,
}

/// An `Entity.<Name>` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Sprite table name used when the slot has no sprite yet.
    pub visual: Option<String>,
    /// Component name → parameters, as written.
    pub components: IndexMap<String, ParamMap>,
    pub inputs: Vec<InputBinding>,
    pub physics: Vec<PhysicsShape>,
}

/// A trigger and the actions it runs, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDef {
    pub trigger: String,
    pub actions: Vec<String>,
}

/// An entity placed at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnInstance {
    pub entity: String,
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Sidecar image the script belongs to.
    pub source: Option<String>,
    pub imports: Vec<String>,
    pub schema: IndexMap<String, SchemaVar>,
    /// Entity definitions in declaration order; the order defines type ids.
    pub entities: IndexMap<String, EntityDef>,
    pub events: Vec<EventDef>,
    pub sprites: SpriteTable,
    /// Sprite cell size set by `$Grid`.
    pub grid_size: Option<u32>,
    pub spawns: Vec<SpawnInstance>,
}
