use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::input::state::InputState;
use crate::systems::probe::CollisionProbe;

/// Entity type stored in a slot's type byte.
/// 1-based position of the entity definition in the document; 0 means unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TypeId(pub u8);

impl TypeId {
    pub const NONE: TypeId = TypeId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Type id for the definition at `index` (0-based), if it fits in a byte.
    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index + 1).ok().map(TypeId)
    }

    /// 0-based definition index, or None for the unused id.
    pub fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

/// Sprite stored in a slot's sprite byte.
/// 1-based position in the sprite table; 0 means unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SpriteId(pub u8);

impl SpriteId {
    pub const NONE: SpriteId = SpriteId(0);

    pub fn from_index(index: usize) -> Option<Self> {
        u8::try_from(index + 1).ok().map(SpriteId)
    }
}

/// Index of a slot in the entity pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// Everything a frame's systems may consult besides the buffer itself.
pub struct FrameContext<'a> {
    /// World size in pixels (the image size).
    pub world: UVec2,
    /// Actions active this frame.
    pub input: &'a InputState,
    /// Colour-pair contact test for `Collision(...)` triggers.
    pub probe: &'a dyn CollisionProbe,
}
