//! State buffer layout.
//! The buffer is an RGBA image; every byte of every channel is addressable state.
//!
//! Layout (byte offsets, contiguous, no gaps):
//! ```text
//! [Header:    header_bytes]
//! [Globals:   globals_bytes]
//! [Entities:  slot_count × slot_size]
//! [Auxiliary: whatever remains of width × height × 4]
//! ```
//!
//! Capacities are written into the header at boot so a host can locate the
//! other regions without sharing this struct.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::kernel::KernelConfig;
use crate::components::slot::SLOT_MIN_BYTES;

/// Bytes per pixel (R, G, B, A).
pub const BYTES_PER_PIXEL: usize = 4;

/// Header field byte offsets (relative to the header region).
pub const HEADER_FRAME_COUNTER: usize = 0;
pub const HEADER_WORLD_WIDTH: usize = 4;
pub const HEADER_WORLD_HEIGHT: usize = 6;
pub const HEADER_LAYOUT_VERSION: usize = 8;
pub const HEADER_SLOT_SIZE: usize = 9;
pub const HEADER_SLOT_COUNT: usize = 10;

/// Bytes occupied by the header fields above.
pub const HEADER_FIELD_BYTES: usize = 12;

/// Largest slot count the Int16 header field can hold.
pub const MAX_SLOT_COUNT: usize = i16::MAX as usize;

/// Layout version written into the header.
pub const LAYOUT_VERSION: u8 = 1;

/// The named regions of the state buffer, in address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionKind {
    Header,
    Globals,
    Entities,
    Auxiliary,
}

impl RegionKind {
    pub const ALL: [RegionKind; 4] = [
        RegionKind::Header,
        RegionKind::Globals,
        RegionKind::Entities,
        RegionKind::Auxiliary,
    ];

    fn index(self) -> usize {
        match self {
            RegionKind::Header => 0,
            RegionKind::Globals => 1,
            RegionKind::Entities => 2,
            RegionKind::Auxiliary => 3,
        }
    }
}

/// A contiguous byte span `[start, start + len)` of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub start: usize,
    pub len: usize,
}

impl Region {
    /// First byte past the region.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("out of bounds: {width}-byte access at offset {offset} of the {region:?} region ({len} bytes)")]
    OutOfBounds {
        region: RegionKind,
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("pixel data is {actual} bytes, expected {expected} for a {width}x{height} RGBA image")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("a {available}-byte buffer cannot hold {required} bytes of header, globals and entity pool")]
    TooSmall { required: usize, available: usize },
    #[error("header of {len} bytes is smaller than the {min} bytes of header fields")]
    HeaderTooSmall { len: usize, min: usize },
    #[error("slot size {len} is outside {min}..=255")]
    InvalidSlotSize { len: usize, min: usize },
    #[error("{count} entity slots exceed the header limit of {max}")]
    TooManySlots { count: usize, max: usize },
    #[error("layout size overflows the address space")]
    Overflow,
}

/// Runtime-computed byte layout for a `width × height` state image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Image width in pixels (also the world width).
    pub width: u32,
    /// Image height in pixels (also the world height).
    pub height: u32,
    /// Bytes per entity slot.
    pub slot_size: usize,
    /// Number of entity slots.
    pub slot_count: usize,
    /// Total buffer size in bytes (`width × height × 4`).
    pub buffer_total_bytes: usize,
    regions: [Region; 4],
}

impl MemoryLayout {
    /// Compute the layout from raw capacities.
    pub fn new(
        width: u32,
        height: u32,
        header_bytes: usize,
        globals_bytes: usize,
        slot_size: usize,
        slot_count: usize,
    ) -> Result<Self, MemoryError> {
        if header_bytes < HEADER_FIELD_BYTES {
            return Err(MemoryError::HeaderTooSmall { len: header_bytes, min: HEADER_FIELD_BYTES });
        }
        if !(SLOT_MIN_BYTES..=u8::MAX as usize).contains(&slot_size) {
            return Err(MemoryError::InvalidSlotSize { len: slot_size, min: SLOT_MIN_BYTES });
        }

        if slot_count > MAX_SLOT_COUNT {
            return Err(MemoryError::TooManySlots { count: slot_count, max: MAX_SLOT_COUNT });
        }

        let buffer_total_bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or(MemoryError::Overflow)?;
        let pool_bytes = slot_size.checked_mul(slot_count).ok_or(MemoryError::Overflow)?;
        let required = header_bytes
            .checked_add(globals_bytes)
            .and_then(|n| n.checked_add(pool_bytes))
            .ok_or(MemoryError::Overflow)?;
        if required > buffer_total_bytes {
            return Err(MemoryError::TooSmall {
                required,
                available: buffer_total_bytes,
            });
        }

        let header = Region { kind: RegionKind::Header, start: 0, len: header_bytes };
        let globals = Region { kind: RegionKind::Globals, start: header.end(), len: globals_bytes };
        let entities = Region { kind: RegionKind::Entities, start: globals.end(), len: pool_bytes };
        let auxiliary = Region {
            kind: RegionKind::Auxiliary,
            start: entities.end(),
            len: buffer_total_bytes - required,
        };

        Ok(Self {
            width,
            height,
            slot_size,
            slot_count,
            buffer_total_bytes,
            regions: [header, globals, entities, auxiliary],
        })
    }

    /// Compute the layout from a KernelConfig.
    pub fn from_config(width: u32, height: u32, config: &KernelConfig) -> Result<Self, MemoryError> {
        Self::new(
            width,
            height,
            config.header_bytes,
            config.globals_bytes,
            config.slot_size,
            config.max_entities,
        )
    }

    pub fn region(&self, kind: RegionKind) -> Region {
        self.regions[kind.index()]
    }

    /// All regions in address order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Fails iff a `width`-byte access at `offset` would leave `kind`'s span.
    pub fn assert_block_offset(
        &self,
        kind: RegionKind,
        offset: usize,
        width: usize,
    ) -> Result<(), MemoryError> {
        let region = self.region(kind);
        match offset.checked_add(width) {
            Some(end) if end <= region.len => Ok(()),
            _ => Err(MemoryError::OutOfBounds {
                region: kind,
                offset,
                width,
                len: region.len,
            }),
        }
    }

    /// Flat byte index of the red channel of pixel `(x, y)`.
    pub fn pixel_byte_offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Offset of slot `index` relative to the entity region.
    pub fn slot_offset(&self, index: usize) -> usize {
        index * self.slot_size
    }
}
