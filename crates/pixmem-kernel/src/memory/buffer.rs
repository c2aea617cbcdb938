//! The state buffer and its typed integer accessors.
//!
//! All multi-byte values are big-endian across consecutive bytes, regardless of
//! which pixel channel they land in. Every read and write in the kernel goes
//! through this type so the encoding lives in one place.

use serde::{Deserialize, Serialize};

use crate::api::kernel::KernelConfig;
use crate::memory::layout::{
    MemoryError, MemoryLayout, RegionKind, BYTES_PER_PIXEL, HEADER_FRAME_COUNTER,
    HEADER_LAYOUT_VERSION, HEADER_SLOT_COUNT, HEADER_SLOT_SIZE, HEADER_WORLD_HEIGHT,
    HEADER_WORLD_WIDTH, LAYOUT_VERSION,
};

/// Integer width of a typed access.
///
/// `Int8`, `Int16` and `Int32` are signed two's complement. `Int24` is unsigned
/// (`0..=0xFFFFFF`), which is what a packed RGB colour needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    Int8,
    Int16,
    Int24,
    Int32,
}

impl IntWidth {
    /// Number of bytes occupied.
    pub fn bytes(self) -> usize {
        match self {
            IntWidth::Int8 => 1,
            IntWidth::Int16 => 2,
            IntWidth::Int24 => 3,
            IntWidth::Int32 => 4,
        }
    }

    /// Parse a schema type name (`Int8`, `Int16`, `Int24`, `Int32`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int8" => Some(IntWidth::Int8),
            "Int16" => Some(IntWidth::Int16),
            "Int24" => Some(IntWidth::Int24),
            "Int32" => Some(IntWidth::Int32),
            _ => None,
        }
    }
}

/// A `width × height` RGBA image used as the whole simulation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBuffer {
    layout: MemoryLayout,
    bytes: Vec<u8>,
}

impl StateBuffer {
    /// Copy host pixel data into a new state buffer. The host's bytes are never
    /// written to.
    pub fn from_rgba(
        width: u32,
        height: u32,
        pixels: &[u8],
        config: &KernelConfig,
    ) -> Result<Self, MemoryError> {
        let layout = MemoryLayout::from_config(width, height, config)?;
        if pixels.len() != layout.buffer_total_bytes {
            return Err(MemoryError::SizeMismatch {
                width,
                height,
                expected: layout.buffer_total_bytes,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            layout,
            bytes: pixels.to_vec(),
        })
    }

    /// An all-zero buffer (transparent black image).
    pub fn zeroed(width: u32, height: u32, config: &KernelConfig) -> Result<Self, MemoryError> {
        let layout = MemoryLayout::from_config(width, height, config)?;
        let bytes = vec![0; layout.buffer_total_bytes];
        Ok(Self { layout, bytes })
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width
    }

    pub fn height(&self) -> u32 {
        self.layout.height
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// Independent copy of the bytes, for renderers and undo history.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// The buffer viewed as RGBA pixels in row-major order.
    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.bytes)
    }

    /// RGBA value of pixel `(x, y)`, or None outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.layout.width || y >= self.layout.height {
            return None;
        }
        let at = self.layout.pixel_byte_offset(x, y);
        let mut px = [0u8; BYTES_PER_PIXEL];
        px.copy_from_slice(&self.bytes[at..at + BYTES_PER_PIXEL]);
        Some(px)
    }

    // -- Absolute accessors (byte address from the start of the buffer) --

    pub fn read_uint8(&self, addr: usize) -> u8 {
        self.bytes[addr]
    }

    pub fn write_uint8(&mut self, addr: usize, value: u8) {
        self.bytes[addr] = value;
    }

    pub fn read_int8(&self, addr: usize) -> i8 {
        self.bytes[addr] as i8
    }

    pub fn write_int8(&mut self, addr: usize, value: i8) {
        self.bytes[addr] = value as u8;
    }

    pub fn read_int16(&self, addr: usize) -> i16 {
        i16::from_be_bytes([self.bytes[addr], self.bytes[addr + 1]])
    }

    pub fn write_int16(&mut self, addr: usize, value: i16) {
        self.bytes[addr..addr + 2].copy_from_slice(&value.to_be_bytes());
    }

    pub fn read_int24(&self, addr: usize) -> u32 {
        u32::from_be_bytes([0, self.bytes[addr], self.bytes[addr + 1], self.bytes[addr + 2]])
    }

    /// Stores the low 24 bits of `value`.
    pub fn write_int24(&mut self, addr: usize, value: u32) {
        let be = value.to_be_bytes();
        self.bytes[addr..addr + 3].copy_from_slice(&be[1..]);
    }

    pub fn read_int32(&self, addr: usize) -> i32 {
        let mut be = [0u8; 4];
        be.copy_from_slice(&self.bytes[addr..addr + 4]);
        i32::from_be_bytes(be)
    }

    pub fn write_int32(&mut self, addr: usize, value: i32) {
        self.bytes[addr..addr + 4].copy_from_slice(&value.to_be_bytes());
    }

    // -- Region accessors --
    //
    // Offsets are relative to the region. An access that would cross into the
    // next region is a layout bug and panics with the OutOfBounds message.

    fn block(&self, kind: RegionKind, offset: usize, width: usize) -> usize {
        if let Err(err) = self.layout.assert_block_offset(kind, offset, width) {
            panic!("{err}");
        }
        self.layout.region(kind).start + offset
    }

    pub fn read_byte(&self, kind: RegionKind, offset: usize) -> u8 {
        let addr = self.block(kind, offset, 1);
        self.read_uint8(addr)
    }

    pub fn write_byte(&mut self, kind: RegionKind, offset: usize, value: u8) {
        let addr = self.block(kind, offset, 1);
        self.write_uint8(addr, value);
    }

    /// Read an integer of the given width, sign-extended (Int24 zero-extended).
    pub fn read_int(&self, kind: RegionKind, offset: usize, width: IntWidth) -> i32 {
        let addr = self.block(kind, offset, width.bytes());
        match width {
            IntWidth::Int8 => self.read_int8(addr) as i32,
            IntWidth::Int16 => self.read_int16(addr) as i32,
            IntWidth::Int24 => self.read_int24(addr) as i32,
            IntWidth::Int32 => self.read_int32(addr),
        }
    }

    /// Write an integer truncated to the given width.
    pub fn write_int(&mut self, kind: RegionKind, offset: usize, width: IntWidth, value: i32) {
        let addr = self.block(kind, offset, width.bytes());
        match width {
            IntWidth::Int8 => self.write_int8(addr, value as i8),
            IntWidth::Int16 => self.write_int16(addr, value as i16),
            IntWidth::Int24 => self.write_int24(addr, value as u32),
            IntWidth::Int32 => self.write_int32(addr, value),
        }
    }

    /// Zero `len` bytes starting at `offset` within a region.
    pub fn fill_zero(&mut self, kind: RegionKind, offset: usize, len: usize) {
        let addr = self.block(kind, offset, len);
        self.bytes[addr..addr + len].fill(0);
    }

    // -- Header --

    /// Write capacities and world size into the header. The frame counter is
    /// left as found. Slot count fits Int16 because the layout caps it at
    /// `MAX_SLOT_COUNT`.
    pub fn write_header(&mut self) {
        let width = self.layout.width as i32;
        let height = self.layout.height as i32;
        let slot_size = self.layout.slot_size as u8;
        let slot_count = self.layout.slot_count as i32;
        self.write_int(RegionKind::Header, HEADER_WORLD_WIDTH, IntWidth::Int16, width);
        self.write_int(RegionKind::Header, HEADER_WORLD_HEIGHT, IntWidth::Int16, height);
        self.write_byte(RegionKind::Header, HEADER_LAYOUT_VERSION, LAYOUT_VERSION);
        self.write_byte(RegionKind::Header, HEADER_SLOT_SIZE, slot_size);
        self.write_int(RegionKind::Header, HEADER_SLOT_COUNT, IntWidth::Int16, slot_count);
    }

    pub fn frame_counter(&self) -> u32 {
        self.read_int(RegionKind::Header, HEADER_FRAME_COUNTER, IntWidth::Int32) as u32
    }

    pub fn set_frame_counter(&mut self, frame: u32) {
        self.write_int(RegionKind::Header, HEADER_FRAME_COUNTER, IntWidth::Int32, frame as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn buffer() -> StateBuffer {
        StateBuffer::zeroed(64, 64, &KernelConfig::default()).unwrap()
    }

    #[test]
    fn int16_is_big_endian() {
        let mut buf = buffer();
        buf.write_int16(100, 0x1234);
        assert_eq!(buf.as_bytes()[100], 0x12);
        assert_eq!(buf.as_bytes()[101], 0x34);
        buf.write_int16(100, -2);
        assert_eq!(&buf.as_bytes()[100..102], &[0xFF, 0xFE]);
        assert_eq!(buf.read_int16(100), -2);
    }

    #[test]
    fn int24_spans_three_bytes() {
        let mut buf = buffer();
        buf.write_int24(10, 0xAABBCC);
        assert_eq!(&buf.as_bytes()[9..14], &[0, 0xAA, 0xBB, 0xCC, 0]);
        buf.write_int24(10, 0x01_FF_00_11);
        assert_eq!(buf.read_int24(10), 0xFF0011);
    }

    #[test]
    fn int32_is_big_endian() {
        let mut buf = buffer();
        buf.write_int32(0, 0x0102_0304);
        assert_eq!(&buf.as_bytes()[0..4], &[1, 2, 3, 4]);
        assert_eq!(buf.read_int32(0), 0x0102_0304);
    }

    #[test]
    fn region_access_is_relative_to_region_start() {
        let mut buf = buffer();
        buf.write_int(RegionKind::Globals, 0, IntWidth::Int16, 10);
        let start = buf.layout().region(RegionKind::Globals).start;
        assert_eq!(buf.read_int16(start), 10);
        assert_eq!(buf.read_int(RegionKind::Globals, 0, IntWidth::Int16), 10);
    }

    #[test]
    fn region_write_truncates_to_width() {
        let mut buf = buffer();
        buf.write_int(RegionKind::Globals, 4, IntWidth::Int8, 300);
        assert_eq!(buf.read_int(RegionKind::Globals, 4, IntWidth::Int8), 44);
        buf.write_int(RegionKind::Globals, 4, IntWidth::Int16, 40_000);
        assert_eq!(buf.read_int(RegionKind::Globals, 4, IntWidth::Int16), 40_000 - 65_536);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn write_crossing_into_next_region_panics() {
        let mut buf = buffer();
        // Last two bytes of globals plus two bytes of the entity pool.
        buf.write_int(RegionKind::Globals, 1022, IntWidth::Int32, 1);
    }

    #[test]
    fn from_rgba_copies_and_checks_size() {
        let pixels = vec![7u8; 64 * 64 * 4];
        let mut buf = StateBuffer::from_rgba(64, 64, &pixels, &KernelConfig::default()).unwrap();
        buf.write_uint8(0, 1);
        assert_eq!(pixels[0], 7);

        let err = StateBuffer::from_rgba(64, 64, &pixels[..100], &KernelConfig::default())
            .unwrap_err();
        assert!(matches!(err, MemoryError::SizeMismatch { actual: 100, .. }));
    }

    #[test]
    fn pixel_view_matches_byte_offsets() {
        let mut buf = buffer();
        let at = buf.layout().pixel_byte_offset(3, 2);
        buf.write_int32(at, i32::from_be_bytes([0x10, 0x20, 0x30, 0xFF]));
        assert_eq!(buf.pixel(3, 2), Some([0x10, 0x20, 0x30, 0xFF]));
        assert_eq!(buf.pixels()[2 * 64 + 3], [0x10, 0x20, 0x30, 0xFF]);
        assert_eq!(buf.pixel(64, 0), None);
    }

    #[test]
    fn header_records_capacities() {
        let mut buf = buffer();
        buf.set_frame_counter(41);
        buf.write_header();
        assert_eq!(buf.frame_counter(), 41);
        assert_eq!(buf.read_int(RegionKind::Header, HEADER_WORLD_WIDTH, IntWidth::Int16), 64);
        assert_eq!(buf.read_byte(RegionKind::Header, HEADER_SLOT_SIZE), 16);
        assert_eq!(buf.read_int(RegionKind::Header, HEADER_SLOT_COUNT, IntWidth::Int16), 64);
    }

    proptest! {
        #[test]
        fn int8_round_trip(addr in 0usize..64 * 64 * 4, value in any::<i8>()) {
            let mut buf = buffer();
            buf.write_int8(addr, value);
            prop_assert_eq!(buf.read_int8(addr), value);
        }

        #[test]
        fn int16_round_trip(addr in 0usize..64 * 64 * 4 - 1, value in any::<i16>()) {
            let mut buf = buffer();
            buf.write_int16(addr, value);
            prop_assert_eq!(buf.read_int16(addr), value);
        }

        #[test]
        fn int24_round_trip(addr in 0usize..64 * 64 * 4 - 2, value in 0u32..=0xFF_FFFF) {
            let mut buf = buffer();
            buf.write_int24(addr, value);
            prop_assert_eq!(buf.read_int24(addr), value);
        }
    }
}
