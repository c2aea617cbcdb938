//! Per-entity behaviours applied by the tick, in a fixed order.
//!
//! Scripts name components by string; the program compiler turns each name and
//! parameter map into one of these variants once at load.

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::api::types::SpriteId;
use crate::components::slot::{SlotMut, ENTITY_SIZE};
use crate::script::ast::{ParamMap, ParamValue};

/// Constant downward acceleration with a velocity cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gravity {
    pub force: i32,
    pub terminal_velocity: i32,
}

impl Gravity {
    /// `velY += force`, capped at the terminal velocity only when the sum exceeds it.
    pub fn apply(&self, slot: &mut SlotMut<'_>) {
        let sum = slot.vel_y() as i32 + self.force;
        let capped = if sum > self.terminal_velocity {
            self.terminal_velocity
        } else {
            sum
        };
        slot.set_vel_y(saturate_i16(capped));
    }
}

/// Longest animator sequence the one-byte sequence index can address.
pub const MAX_SEQUENCE_LEN: usize = u8::MAX as usize + 1;

/// Frame-sequence animation driven by a per-slot countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animator {
    /// Sprite ids to cycle through. Never empty, at most `MAX_SEQUENCE_LEN`.
    pub sequence: Vec<u8>,
    /// Ticks to hold each frame.
    pub speed: u8,
}

impl Animator {
    /// A non-zero timer counts down; a zero timer advances the sequence and
    /// reloads. A slot spawned with timer 0 therefore advances on its first tick.
    pub fn apply(&self, slot: &mut SlotMut<'_>) {
        let timer = slot.anim_timer();
        if timer > 0 {
            slot.set_anim_timer(timer - 1);
            return;
        }

        let index = (slot.seq_index() as usize + 1) % self.sequence.len();
        slot.set_seq_index(index as u8);
        slot.set_sprite_id(SpriteId(self.sequence[index]));
        slot.set_anim_timer(self.speed);
    }
}

/// A component with its parameters, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Gravity(Gravity),
    Kinematic,
    Collider,
    Animator(Animator),
}

impl Component {
    /// Position in the fixed per-tick order: Gravity, Kinematic, Collider, Animator.
    pub fn order(&self) -> u8 {
        match self {
            Component::Gravity(_) => 0,
            Component::Kinematic => 1,
            Component::Collider => 2,
            Component::Animator(_) => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Component::Gravity(_) => "Gravity",
            Component::Kinematic => "Kinematic",
            Component::Collider => "Collider",
            Component::Animator(_) => "Animator",
        }
    }

    /// Build a component from its script name and parameters.
    /// Returns an error message for unknown names or unusable parameters.
    /// Parameters that were adjusted to fit are reported through `notes`.
    pub fn from_params(name: &str, params: &ParamMap, notes: &mut Vec<String>) -> Result<Self, String> {
        match name {
            "Gravity" => Ok(Component::Gravity(Gravity {
                force: int_param(params, "force").unwrap_or(0),
                terminal_velocity: int_param(params, "terminalVelocity")
                    .unwrap_or(i16::MAX as i32),
            })),
            "Kinematic" => Ok(Component::Kinematic),
            "Collider" => Ok(Component::Collider),
            "Animator" => {
                let mut sequence: Vec<u8> = match params.get("sequence") {
                    Some(ParamValue::List(items)) => {
                        items.iter().map(|&v| v.clamp(0, u8::MAX as i64) as u8).collect()
                    }
                    Some(ParamValue::Int(v)) => vec![(*v).clamp(0, u8::MAX as i64) as u8],
                    _ => Vec::new(),
                };
                if sequence.is_empty() {
                    return Err("Animator needs a non-empty sequence".to_string());
                }
                if sequence.len() > MAX_SEQUENCE_LEN {
                    notes.push(format!(
                        "Animator sequence of {} frames cut to {}",
                        sequence.len(),
                        MAX_SEQUENCE_LEN
                    ));
                    sequence.truncate(MAX_SEQUENCE_LEN);
                }
                let speed = int_param(params, "speed").unwrap_or(0).clamp(0, u8::MAX as i32) as u8;
                Ok(Component::Animator(Animator { sequence, speed }))
            }
            other => Err(format!("unknown component '{}'", other)),
        }
    }

    /// Apply this component to one active slot.
    pub fn apply(&self, slot: &mut SlotMut<'_>, world: UVec2) {
        match self {
            Component::Gravity(gravity) => gravity.apply(slot),
            Component::Kinematic => integrate(slot),
            Component::Collider => clamp_to_world(slot, world),
            Component::Animator(animator) => animator.apply(slot),
        }
    }
}

/// `pos += vel` on both axes, wrapping at the i16 range.
fn integrate(slot: &mut SlotMut<'_>) {
    let x = slot.pos_x().wrapping_add(slot.vel_x());
    let y = slot.pos_y().wrapping_add(slot.vel_y());
    slot.set_pos_x(x);
    slot.set_pos_y(y);
}

/// Keep the entity box inside the world. Each axis clamps independently and a
/// clamped axis loses its velocity.
fn clamp_to_world(slot: &mut SlotMut<'_>, world: UVec2) {
    let max_x = (world.x as i32 - ENTITY_SIZE).max(0);
    let max_y = (world.y as i32 - ENTITY_SIZE).max(0);

    if let Some(x) = clamp_axis(slot.pos_x() as i32, max_x) {
        slot.set_pos_x(x);
        slot.set_vel_x(0);
    }
    if let Some(y) = clamp_axis(slot.pos_y() as i32, max_y) {
        slot.set_pos_y(y);
        slot.set_vel_y(0);
    }
}

/// The clamped value, or None when `value` is already in `[0, max]`.
fn clamp_axis(value: i32, max: i32) -> Option<i16> {
    if value < 0 {
        Some(0)
    } else if value > max {
        Some(saturate_i16(max))
    } else {
        None
    }
}

fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn int_param(params: &ParamMap, key: &str) -> Option<i32> {
    match params.get(key) {
        Some(ParamValue::Int(v)) => Some((*v).clamp(i32::MIN as i64, i32::MAX as i64) as i32),
        _ => None,
    }
}
