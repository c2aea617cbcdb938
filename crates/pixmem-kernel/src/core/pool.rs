use glam::IVec2;

use crate::api::types::{SlotId, TypeId};
use crate::memory::buffer::StateBuffer;

/// Spawn/erase over the fixed slot array in the entity region.
/// Slots are scanned linearly in pool order; nothing is allocated.
pub struct EntityPool<'a> {
    buffer: &'a mut StateBuffer,
}

impl<'a> EntityPool<'a> {
    pub fn new(buffer: &'a mut StateBuffer) -> Self {
        Self { buffer }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.buffer.slot_count()
    }

    /// First unoccupied slot in pool order.
    pub fn first_free(&self) -> Option<SlotId> {
        (0..self.capacity())
            .map(SlotId)
            .find(|&id| !self.buffer.slot(id).occupied())
    }

    /// Claim the first unoccupied slot. Component data is zeroed, whatever a
    /// previous occupant left behind. Returns None when every slot is occupied.
    pub fn spawn(&mut self, type_id: TypeId, x: i16, y: i16) -> Option<SlotId> {
        let id = self.first_free()?;
        let mut slot = self.buffer.slot_mut(id);
        slot.clear_component_data();
        slot.set_active(true);
        slot.set_type_id(type_id);
        slot.set_pos_x(x);
        slot.set_pos_y(y);
        Some(id)
    }

    /// Deactivate the first active slot whose box contains `(x, y)`.
    /// Overlapping entities later in the pool are left alone.
    pub fn erase(&mut self, x: i32, y: i32) -> bool {
        let point = IVec2::new(x, y);
        let hit = self
            .active_slots()
            .find(|&id| self.buffer.slot(id).contains(point));
        match hit {
            Some(id) => {
                self.buffer.slot_mut(id).set_active(false);
                true
            }
            None => false,
        }
    }

    /// Active slots in pool order.
    pub fn active_slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        (0..self.capacity())
            .map(SlotId)
            .filter(move |&id| self.buffer.slot(id).active())
    }

    pub fn active_count(&self) -> usize {
        self.active_slots().count()
    }

    /// Deactivate every slot. Field bytes are kept.
    pub fn clear(&mut self) {
        for id in (0..self.capacity()).map(SlotId) {
            self.buffer.slot_mut(id).set_active(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::kernel::KernelConfig;
    use crate::components::slot::COMPONENT_DATA_START;
    use crate::memory::layout::RegionKind;

    fn buffer(max_entities: usize) -> StateBuffer {
        let config = KernelConfig {
            max_entities,
            ..KernelConfig::default()
        };
        StateBuffer::zeroed(64, 64, &config).unwrap()
    }

    #[test]
    fn spawn_on_empty_pool_claims_slot_zero() {
        let mut buf = buffer(4);
        let mut pool = EntityPool::new(&mut buf);
        assert_eq!(pool.spawn(TypeId(3), 10, -4), Some(SlotId(0)));

        let slot = buf.slot(SlotId(0));
        assert!(slot.active());
        assert_eq!(slot.type_id(), TypeId(3));
        assert_eq!((slot.pos_x(), slot.pos_y()), (10, -4));
    }

    #[test]
    fn spawn_zeroes_component_data() {
        let mut buf = buffer(4);
        let slot_size = buf.layout().slot_size;
        for offset in 0..slot_size {
            buf.write_byte(RegionKind::Entities, offset, 0xAB);
        }
        // Stale but inactive.
        buf.slot_mut(SlotId(0)).set_active(false);

        EntityPool::new(&mut buf).spawn(TypeId(1), 0, 0);
        for offset in COMPONENT_DATA_START..slot_size {
            assert_eq!(buf.read_byte(RegionKind::Entities, offset), 0, "byte {}", offset);
        }
    }

    #[test]
    fn spawn_claims_first_inactive_and_fails_when_full() {
        let mut buf = buffer(3);
        let mut pool = EntityPool::new(&mut buf);
        assert_eq!(pool.spawn(TypeId(1), 0, 0), Some(SlotId(0)));
        assert_eq!(pool.spawn(TypeId(1), 0, 0), Some(SlotId(1)));
        assert_eq!(pool.spawn(TypeId(1), 0, 0), Some(SlotId(2)));
        assert_eq!(pool.spawn(TypeId(1), 0, 0), None);
        assert_eq!(pool.active_count(), 3);

        assert!(!pool.erase(20, 0));
        assert!(pool.erase(0, 0));
        assert_eq!(pool.first_free(), Some(SlotId(0)));
        assert_eq!(pool.spawn(TypeId(2), 5, 5), Some(SlotId(0)));
        assert_eq!(pool.spawn(TypeId(2), 5, 5), None);
    }

    #[test]
    fn erase_hits_first_match_only() {
        let mut buf = buffer(4);
        let mut pool = EntityPool::new(&mut buf);
        pool.spawn(TypeId(1), 0, 0);
        pool.spawn(TypeId(2), 8, 8);

        // (10, 10) is inside both boxes.
        assert!(pool.erase(10, 10));
        let active: Vec<_> = pool.active_slots().collect();
        assert_eq!(active, [SlotId(1)]);

        // Box is half-open: x = 8 + 16 is outside.
        assert!(!pool.erase(24, 10));
        assert!(pool.erase(23, 23));
        assert!(!pool.erase(23, 23));
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn stray_flag_holds_the_slot_without_being_active() {
        let mut buf = buffer(2);
        buf.write_byte(RegionKind::Entities, 0, 2);

        let mut pool = EntityPool::new(&mut buf);
        assert_eq!(pool.active_count(), 0);
        assert!(!pool.erase(0, 0));
        assert_eq!(pool.spawn(TypeId(1), 0, 0), Some(SlotId(1)));
        assert_eq!(pool.spawn(TypeId(1), 0, 0), None);
    }

    #[test]
    fn erase_on_empty_pool_is_false() {
        let mut buf = buffer(4);
        assert!(!EntityPool::new(&mut buf).erase(0, 0));
    }

    #[test]
    fn erase_keeps_fields() {
        let mut buf = buffer(2);
        EntityPool::new(&mut buf).spawn(TypeId(7), 30, 40);
        EntityPool::new(&mut buf).erase(31, 41);
        let slot = buf.slot(SlotId(0));
        assert!(!slot.active());
        assert_eq!(slot.type_id(), TypeId(7));
        assert_eq!(slot.pos_x(), 30);
    }

    #[test]
    fn clear_deactivates_all() {
        let mut buf = buffer(4);
        let mut pool = EntityPool::new(&mut buf);
        pool.spawn(TypeId(1), 0, 0);
        pool.spawn(TypeId(1), 0, 0);
        pool.clear();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.first_free(), Some(SlotId(0)));
    }
}
