//! A script document compiled against a memory layout.
//!
//! Everything a tick needs is resolved here once: type ids, typed components in
//! dispatch order, sprite ids for visuals, bound schema variables and compiled
//! events. Problems become diagnostics; compilation itself never fails.

use serde::Serialize;

use crate::api::types::{SpriteId, TypeId};
use crate::components::component::Component;
use crate::memory::layout::MemoryLayout;
use crate::script::ast::{Document, EntityDef};
use crate::systems::evaluator::{bind_schema, CompiledEvent, VarTable};

/// What the tick does for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityBehaviour {
    pub name: String,
    /// Sorted by `Component::order`.
    pub components: Vec<Component>,
    /// Sprite for slots whose sprite byte is still 0.
    pub visual: Option<SpriteId>,
}

impl EntityBehaviour {
    fn compile(name: &str, def: &EntityDef, document: &Document, diagnostics: &mut Vec<String>) -> Self {
        let mut components = Vec::with_capacity(def.components.len());
        for (component, params) in &def.components {
            let mut notes = Vec::new();
            match Component::from_params(component, params, &mut notes) {
                Ok(c) => components.push(c),
                Err(msg) => diagnostics.push(format!("Entity.{}: {}", name, msg)),
            }
            diagnostics.extend(notes.into_iter().map(|note| format!("Entity.{}: {}", name, note)));
        }
        components.sort_by_key(Component::order);

        let visual = def.visual.as_deref().and_then(|visual| {
            let id = document.sprites.sprite_id(visual);
            if id.is_none() {
                diagnostics.push(format!("Entity.{}: visual '{}' is not in Sprites", name, visual));
            }
            id
        });

        Self {
            name: name.to_string(),
            components,
            visual,
        }
    }
}

/// A spawn instance with its entity name resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedSpawn {
    pub type_id: TypeId,
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    document: Document,
    /// Indexed by `TypeId::index`.
    behaviours: Vec<EntityBehaviour>,
    vars: VarTable,
    events: Vec<CompiledEvent>,
    spawns: Vec<ResolvedSpawn>,
    diagnostics: Vec<String>,
}

impl Program {
    pub fn compile(document: Document, layout: &MemoryLayout) -> Self {
        let mut diagnostics = Vec::new();

        let mut behaviours = Vec::with_capacity(document.entities.len());
        for (index, (name, def)) in document.entities.iter().enumerate() {
            if TypeId::from_index(index).is_none() {
                diagnostics.push(format!("Entity.{}: more than 255 entity types, ignored", name));
                continue;
            }
            behaviours.push(EntityBehaviour::compile(name, def, &document, &mut diagnostics));
        }

        let vars = bind_schema(&document.schema, layout, &mut diagnostics);
        let events = document
            .events
            .iter()
            .map(|def| CompiledEvent::compile(def, &vars, &mut diagnostics))
            .collect();

        let mut spawns = Vec::with_capacity(document.spawns.len());
        for spawn in &document.spawns {
            let type_id = document
                .entities
                .get_index_of(&spawn.entity)
                .and_then(TypeId::from_index);
            match type_id {
                Some(type_id) => spawns.push(ResolvedSpawn {
                    type_id,
                    x: spawn.x,
                    y: spawn.y,
                }),
                None => diagnostics.push(format!("Spawn: unknown entity '{}'", spawn.entity)),
            }
        }

        log::debug!(
            "compiled {} entity types, {} schema variables, {} events",
            behaviours.len(),
            vars.len(),
            document.events.len()
        );

        Self {
            document,
            behaviours,
            vars,
            events,
            spawns,
            diagnostics,
        }
    }

    pub fn behaviour(&self, type_id: TypeId) -> Option<&EntityBehaviour> {
        self.behaviours.get(type_id.index()?)
    }

    pub fn behaviours(&self) -> &[EntityBehaviour] {
        &self.behaviours
    }

    pub fn type_id(&self, entity: &str) -> Option<TypeId> {
        self.document
            .entities
            .get_index_of(entity)
            .and_then(TypeId::from_index)
    }

    pub fn vars(&self) -> &VarTable {
        &self.vars
    }

    pub fn events(&self) -> &[CompiledEvent] {
        &self.events
    }

    pub fn spawns(&self) -> &[ResolvedSpawn] {
        &self.spawns
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}
