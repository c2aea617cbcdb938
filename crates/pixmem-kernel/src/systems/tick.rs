use glam::UVec2;

use crate::api::types::{SlotId, SpriteId};
use crate::memory::buffer::StateBuffer;
use crate::systems::program::Program;

/// Apply component behaviours to every active slot, in pool order.
///
/// Per slot: the declared components in their fixed order (Gravity, Kinematic,
/// Collider, Animator), then sprite resolution. Inactive slots and slots whose
/// type has no definition are not touched.
pub fn ecs_tick(buffer: &mut StateBuffer, program: &Program, world: UVec2) {
    for index in 0..buffer.slot_count() {
        let mut slot = buffer.slot_mut(SlotId(index));
        if !slot.active() {
            continue;
        }
        let Some(behaviour) = program.behaviour(slot.type_id()) else {
            continue;
        };

        for component in &behaviour.components {
            component.apply(&mut slot, world);
        }

        // Never overwrites a sprite set by an animator, an action or the host.
        if let Some(visual) = behaviour.visual {
            if slot.sprite_id() == SpriteId::NONE {
                slot.set_sprite_id(visual);
            }
        }
    }
}
