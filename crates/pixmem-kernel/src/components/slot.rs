//! Entity slot record: a fixed-width struct packed into the entity region.
//!
//! ```text
//! byte  0      active flag (1 = live, any other non-zero byte = occupied but idle)
//! byte  1      type id (0 = unused)
//! bytes 2..4   position X (i16, big-endian)
//! bytes 4..6   position Y
//! bytes 6..8   velocity X
//! bytes 8..10  velocity Y
//! byte  10     animation timer
//! byte  11     animation sequence index
//! byte  12     sprite id (0 = unresolved)
//! bytes 13..   free for host data
//! ```
//!
//! Bytes from `COMPONENT_DATA_START` to the end of the slot are zeroed on spawn.

use glam::IVec2;

use crate::api::types::{SlotId, SpriteId, TypeId};
use crate::memory::buffer::{IntWidth, StateBuffer};
use crate::memory::layout::RegionKind;

pub const SLOT_ACTIVE: usize = 0;
pub const SLOT_TYPE_ID: usize = 1;
pub const SLOT_POS_X: usize = 2;
pub const SLOT_POS_Y: usize = 4;
pub const SLOT_VEL_X: usize = 6;
pub const SLOT_VEL_Y: usize = 8;
pub const SLOT_ANIM_TIMER: usize = 10;
pub const SLOT_SEQ_INDEX: usize = 11;
pub const SLOT_SPRITE_ID: usize = 12;

/// First byte cleared by spawn.
pub const COMPONENT_DATA_START: usize = SLOT_VEL_X;

/// Smallest slot that holds every field above.
pub const SLOT_MIN_BYTES: usize = 13;

pub const DEFAULT_SLOT_SIZE: usize = 16;

/// Side length of an entity's axis-aligned box, in pixels.
pub const ENTITY_SIZE: i32 = 16;

macro_rules! slot_getters {
    () => {
        pub fn id(&self) -> SlotId {
            self.id
        }

        /// Live: ticked, listed and erasable. Only a flag of exactly 1 counts.
        pub fn active(&self) -> bool {
            self.byte(SLOT_ACTIVE) == 1
        }

        /// Not free for spawn. Any non-zero flag holds the slot.
        pub fn occupied(&self) -> bool {
            self.byte(SLOT_ACTIVE) != 0
        }

        pub fn type_id(&self) -> TypeId {
            TypeId(self.byte(SLOT_TYPE_ID))
        }

        pub fn pos_x(&self) -> i16 {
            self.int16(SLOT_POS_X)
        }

        pub fn pos_y(&self) -> i16 {
            self.int16(SLOT_POS_Y)
        }

        pub fn vel_x(&self) -> i16 {
            self.int16(SLOT_VEL_X)
        }

        pub fn vel_y(&self) -> i16 {
            self.int16(SLOT_VEL_Y)
        }

        pub fn pos(&self) -> IVec2 {
            IVec2::new(self.pos_x() as i32, self.pos_y() as i32)
        }

        pub fn vel(&self) -> IVec2 {
            IVec2::new(self.vel_x() as i32, self.vel_y() as i32)
        }

        pub fn anim_timer(&self) -> u8 {
            self.byte(SLOT_ANIM_TIMER)
        }

        pub fn seq_index(&self) -> u8 {
            self.byte(SLOT_SEQ_INDEX)
        }

        pub fn sprite_id(&self) -> SpriteId {
            SpriteId(self.byte(SLOT_SPRITE_ID))
        }

        /// Whether `point` lies in this slot's `ENTITY_SIZE` box.
        pub fn contains(&self, point: IVec2) -> bool {
            let min = self.pos();
            let max = min + IVec2::splat(ENTITY_SIZE);
            point.x >= min.x && point.x < max.x && point.y >= min.y && point.y < max.y
        }

        fn byte(&self, field: usize) -> u8 {
            self.buffer.read_byte(RegionKind::Entities, self.base + field)
        }

        fn int16(&self, field: usize) -> i16 {
            self.buffer.read_int(RegionKind::Entities, self.base + field, IntWidth::Int16) as i16
        }
    };
}

/// Read-only view of one slot.
pub struct SlotRef<'a> {
    buffer: &'a StateBuffer,
    id: SlotId,
    base: usize,
}

impl<'a> SlotRef<'a> {
    slot_getters!();
}

/// Mutable view of one slot.
pub struct SlotMut<'a> {
    buffer: &'a mut StateBuffer,
    id: SlotId,
    base: usize,
}

impl<'a> SlotMut<'a> {
    slot_getters!();

    pub fn set_active(&mut self, active: bool) {
        self.set_byte(SLOT_ACTIVE, active as u8);
    }

    pub fn set_type_id(&mut self, type_id: TypeId) {
        self.set_byte(SLOT_TYPE_ID, type_id.0);
    }

    pub fn set_pos_x(&mut self, x: i16) {
        self.set_int16(SLOT_POS_X, x);
    }

    pub fn set_pos_y(&mut self, y: i16) {
        self.set_int16(SLOT_POS_Y, y);
    }

    pub fn set_vel_x(&mut self, vx: i16) {
        self.set_int16(SLOT_VEL_X, vx);
    }

    pub fn set_vel_y(&mut self, vy: i16) {
        self.set_int16(SLOT_VEL_Y, vy);
    }

    pub fn set_anim_timer(&mut self, timer: u8) {
        self.set_byte(SLOT_ANIM_TIMER, timer);
    }

    pub fn set_seq_index(&mut self, index: u8) {
        self.set_byte(SLOT_SEQ_INDEX, index);
    }

    pub fn set_sprite_id(&mut self, sprite: SpriteId) {
        self.set_byte(SLOT_SPRITE_ID, sprite.0);
    }

    /// Clear velocity, animation state, sprite id and host bytes.
    pub fn clear_component_data(&mut self) {
        let len = self.buffer.layout().slot_size - COMPONENT_DATA_START;
        self.buffer
            .fill_zero(RegionKind::Entities, self.base + COMPONENT_DATA_START, len);
    }

    fn set_byte(&mut self, field: usize, value: u8) {
        self.buffer.write_byte(RegionKind::Entities, self.base + field, value);
    }

    fn set_int16(&mut self, field: usize, value: i16) {
        self.buffer
            .write_int(RegionKind::Entities, self.base + field, IntWidth::Int16, value as i32);
    }
}

impl StateBuffer {
    /// Number of slots in the entity pool.
    pub fn slot_count(&self) -> usize {
        self.layout().slot_count
    }

    pub fn slot(&self, id: SlotId) -> SlotRef<'_> {
        let base = self.layout().slot_offset(id.0);
        SlotRef { buffer: self, id, base }
    }

    pub fn slot_mut(&mut self, id: SlotId) -> SlotMut<'_> {
        let base = self.layout().slot_offset(id.0);
        SlotMut { buffer: self, id, base }
    }
}
