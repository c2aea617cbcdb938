//! Lenient script parser.
//!
//! Lines that don't fit the grammar of the block they appear in are skipped
//! and reported as warnings; a document is always produced.
//!
//! ```text
//! Source: level1.png
//! Import: enemies
//! Schema:
//!   - $Score: {addr: 0, type: Int16}
//! Entity.Hero:
//!   Visual: hero_idle
//!   Gravity: {force: 1, terminalVelocity: 6}
//!   Kinematic:
//!   - ArrowLeft -> MoveLeft
//!   - shape: box
//!   - solid: true
//! Events:
//!   Input(MoveLeft):
//!     - State.$Score += 1
//! Sprites:
//!   $Grid: 16
//!   hero_idle: [0, 0, 2]
//!   coin: {x: 32, y: 0, w: 8, h: 8}
//! Spawn:
//!   - Hero: {x: 16, y: 16}
//! ```

use serde::{Deserialize, Serialize};

use crate::components::sprite::SpriteDef;
use crate::memory::buffer::IntWidth;
use crate::script::ast::{
    Document, EntityDef, EventDef, InputBinding, ParamMap, ParamValue, PhysicsShape, SchemaVar,
    SpawnInstance,
};
use crate::script::lexer::{lex, split_mapping, LineKind};
use crate::script::value::{parse_inline_map, parse_int, parse_int_list, unquote};

/// Key of the sprite-cell-size entry in `Sprites`. Never gets a sprite id.
pub const GRID_KEY: &str = "$Grid";

/// A skipped line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub document: Document,
    pub warnings: Vec<ParseWarning>,
}

/// The top-level block the parser is inside.
enum Section {
    None,
    Schema,
    Entity(String),
    Events,
    Sprites,
    Spawn,
}

struct Parser {
    doc: Document,
    warnings: Vec<ParseWarning>,
    section: Section,
    line: usize,
}

/// Parse script text into a best-effort document.
pub fn parse(text: &str) -> ParseOutput {
    let mut parser = Parser {
        doc: Document::default(),
        warnings: Vec::new(),
        section: Section::None,
        line: 0,
    };

    for line in lex(text) {
        parser.line = line.number;
        match line.kind {
            LineKind::Empty | LineKind::Comment => {}
            LineKind::Mapping { key, value } if line.indent == 0 => parser.top_level(key, value),
            LineKind::Mapping { key, value } => parser.nested_mapping(key, value),
            LineKind::ListItem(item) => parser.list_item(item),
            LineKind::Other(body) => parser.warn(format!("unrecognised line '{}'", body)),
        }
    }

    ParseOutput {
        document: parser.doc,
        warnings: parser.warnings,
    }
}

impl Parser {
    fn warn(&mut self, message: String) {
        self.warnings.push(ParseWarning {
            line: self.line,
            message,
        });
    }

    fn top_level(&mut self, key: &str, value: &str) {
        self.section = Section::None;
        match key {
            "Source" => self.doc.source = Some(unquote(value).to_string()),
            "Import" => {
                let path = unquote(value);
                if path.is_empty() {
                    self.warn("empty Import".to_string());
                } else {
                    self.doc.imports.push(path.to_string());
                }
            }
            "Schema" => self.section = Section::Schema,
            "Events" => self.section = Section::Events,
            "Sprites" => self.section = Section::Sprites,
            "Spawn" => self.section = Section::Spawn,
            _ => match key.strip_prefix("Entity.") {
                Some(name) if !name.is_empty() => {
                    self.doc.entities.entry(name.to_string()).or_default();
                    self.section = Section::Entity(name.to_string());
                }
                _ => self.warn(format!("unknown top-level key '{}'", key)),
            },
        }
    }

    fn nested_mapping(&mut self, key: &str, value: &str) {
        match &self.section {
            Section::Schema => self.schema_entry(key, value),
            Section::Entity(name) => {
                let name = name.clone();
                self.entity_mapping(&name, key, value);
            }
            Section::Events => {
                self.doc.events.push(EventDef {
                    trigger: key.to_string(),
                    actions: Vec::new(),
                });
                // `Trigger: action` on one line.
                if !value.is_empty() {
                    self.push_action(value);
                }
            }
            Section::Sprites => self.sprite_entry(key, value),
            Section::Spawn => self.spawn_entry(key, value),
            Section::None => self.warn(format!("'{}' is outside any block", key)),
        }
    }

    fn list_item(&mut self, item: &str) {
        match &self.section {
            Section::Schema => match split_mapping(item) {
                Some((key, value)) => self.schema_entry(key, value),
                None => self.warn(format!("expected '$NAME: {{addr, type}}', got '{}'", item)),
            },
            Section::Entity(name) => {
                let name = name.clone();
                self.entity_list_item(&name, item);
            }
            Section::Events => self.push_action(item),
            Section::Spawn => match split_mapping(item) {
                Some((key, value)) => self.spawn_entry(key, value),
                None => self.warn(format!("expected 'Entity: {{x, y}}', got '{}'", item)),
            },
            Section::Sprites | Section::None => {
                self.warn(format!("unexpected list item '{}'", item))
            }
        }
    }

    fn schema_entry(&mut self, key: &str, value: &str) {
        if !key.starts_with('$') {
            self.warn(format!("schema variable '{}' must start with '$'", key));
            return;
        }
        let Some(map) = parse_inline_map(value) else {
            self.warn(format!("schema variable '{}' needs {{addr, type}}", key));
            return;
        };
        let addr = match map.get("addr") {
            Some(ParamValue::Int(n)) => usize::try_from(*n).ok(),
            _ => None,
        };
        let width = match map.get("type") {
            Some(ParamValue::Text(t)) => IntWidth::from_name(t),
            _ => None,
        };
        match (addr, width) {
            (Some(addr), Some(width)) => {
                self.doc.schema.insert(key.to_string(), SchemaVar { addr, width });
            }
            _ => self.warn(format!("schema variable '{}' has a bad addr or type", key)),
        }
    }

    fn entity_mapping(&mut self, name: &str, key: &str, value: &str) {
        let entity = self.doc.entities.entry(name.to_string()).or_default();
        if key == "Visual" {
            entity.visual = Some(unquote(value).to_string());
            return;
        }
        let params = if value.is_empty() {
            Some(ParamMap::new())
        } else {
            parse_inline_map(value)
        };
        match params {
            Some(params) => {
                entity.components.insert(key.to_string(), params);
            }
            None => self.warn(format!("component '{}' needs {{...}} parameters", key)),
        }
    }

    fn entity_list_item(&mut self, name: &str, item: &str) {
        let entity: &mut EntityDef = self.doc.entities.entry(name.to_string()).or_default();

        if let Some((key, action)) = item.split_once("->") {
            let (key, action) = (key.trim(), action.trim());
            if key.is_empty() || action.is_empty() {
                self.warn(format!("bad input binding '{}'", item));
            } else {
                entity.inputs.push(InputBinding {
                    key: key.to_string(),
                    action: action.to_string(),
                });
            }
            return;
        }

        match split_mapping(item) {
            Some(("shape", value)) => entity.physics.push(PhysicsShape {
                shape: Some(unquote(value).to_string()),
                solid: false,
            }),
            Some(("solid", value)) => {
                let solid = matches!(unquote(value), "true" | "1" | "yes");
                match entity.physics.last_mut() {
                    Some(shape) => shape.solid = solid,
                    None => entity.physics.push(PhysicsShape { shape: None, solid }),
                }
            }
            _ => self.warn(format!("unexpected entity item '{}'", item)),
        }
    }

    fn push_action(&mut self, action: &str) {
        match self.doc.events.last_mut() {
            Some(event) => event.actions.push(action.to_string()),
            None => self.warn(format!("action '{}' has no trigger", action)),
        }
    }

    fn sprite_entry(&mut self, key: &str, value: &str) {
        if key == GRID_KEY {
            let size = parse_int(value).or_else(|| parse_int_list(value)?.first().copied());
            match size.and_then(|n| u32::try_from(n).ok()) {
                Some(size) => self.doc.grid_size = Some(size),
                None => self.warn(format!("bad grid size '{}'", value)),
            }
            return;
        }

        if let Some(cells) = parse_int_list(value) {
            let cell = |i: usize| cells.get(i).and_then(|&n| u32::try_from(n).ok());
            match (cell(0), cell(1)) {
                (Some(col), Some(row)) => {
                    let frames = cell(2).unwrap_or(1);
                    self.doc.sprites.insert(key, SpriteDef::Grid { col, row, frames });
                }
                _ => self.warn(format!("sprite '{}' needs [col, row, frames?]", key)),
            }
            return;
        }

        if let Some(map) = parse_inline_map(value) {
            let int = |k: &str| match map.get(k) {
                Some(ParamValue::Int(n)) => Some(*n),
                _ => None,
            };
            let unsigned = |k: &str| int(k).and_then(|n| u32::try_from(n).ok());
            match (unsigned("x"), unsigned("y"), unsigned("w"), unsigned("h")) {
                (Some(x), Some(y), Some(w), Some(h)) => {
                    let ox = int("ox").unwrap_or(0) as i32;
                    let oy = int("oy").unwrap_or(0) as i32;
                    self.doc
                        .sprites
                        .insert(key, SpriteDef::Absolute { x, y, w, h, ox, oy });
                }
                _ => self.warn(format!("sprite '{}' needs {{x, y, w, h}}", key)),
            }
            return;
        }

        self.warn(format!("sprite '{}' has no frame data", key));
    }

    fn spawn_entry(&mut self, key: &str, value: &str) {
        let coords = parse_inline_map(value).and_then(|map| {
            let coord = |k: &str| match map.get(k) {
                Some(ParamValue::Int(n)) => i16::try_from(*n).ok(),
                _ => None,
            };
            Some((coord("x")?, coord("y")?))
        });
        match coords {
            Some((x, y)) => self.doc.spawns.push(SpawnInstance {
                entity: key.to_string(),
                x,
                y,
            }),
            None => self.warn(format!("spawn of '{}' needs {{x, y}}", key)),
        }
    }
}
