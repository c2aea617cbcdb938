use std::collections::{HashMap, HashSet};

use crate::script::ast::Document;

/// Abstract actions active for one frame (`"Jump"`, `"MoveLeft"`, ...).
/// Sampled once before the tick and read-only during it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    actions: HashSet<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn press(&mut self, action: impl Into<String>) {
        self.actions.insert(action.into());
    }

    pub fn release(&mut self, action: &str) {
        self.actions.remove(action);
    }

    pub fn contains(&self, action: &str) -> bool {
        self.actions.contains(action)
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Physical key → action names, collected from entity `Key -> Action` bindings.
#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    bindings: HashMap<String, Vec<String>>,
}

impl InputMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gather the bindings of every entity. A key bound twice to the same
    /// action is kept once.
    pub fn from_document(document: &Document) -> Self {
        let mut mapper = Self::new();
        for def in document.entities.values() {
            for binding in &def.inputs {
                mapper.bind(&binding.key, &binding.action);
            }
        }
        mapper
    }

    pub fn bind(&mut self, key: &str, action: &str) {
        let actions = self.bindings.entry(key.to_string()).or_default();
        if !actions.iter().any(|a| a == action) {
            actions.push(action.to_string());
        }
    }

    pub fn actions_for(&self, key: &str) -> &[String] {
        self.bindings.get(key).map_or(&[], Vec::as_slice)
    }

    /// Build the frame's action set from the keys currently held.
    pub fn sample<'k>(&self, held: impl IntoIterator<Item = &'k str>) -> InputState {
        let mut state = InputState::new();
        for key in held {
            for action in self.actions_for(key) {
                state.press(action.clone());
            }
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse;

    #[test]
    fn press_and_release() {
        let mut input = InputState::new();
        input.press("Jump");
        input.press("Jump");
        assert!(input.contains("Jump"));
        assert_eq!(input.len(), 1);
        input.release("Jump");
        assert!(input.is_empty());
    }

    #[test]
    fn mapper_uses_entity_bindings() {
        let doc = parse(
            "Entity.Hero:\n  - ArrowLeft -> MoveLeft\n  - Space -> Jump\nEntity.Ship:\n  - Space -> Fire\n  - Space -> Jump\n",
        )
        .document;
        let mapper = InputMapper::from_document(&doc);
        assert_eq!(mapper.actions_for("Space"), ["Jump", "Fire"]);
        assert!(mapper.actions_for("KeyQ").is_empty());

        let state = mapper.sample(["Space", "KeyQ"]);
        assert_eq!(state, InputState::from_actions(["Jump", "Fire"]));
    }
}
