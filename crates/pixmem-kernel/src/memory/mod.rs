pub mod buffer;
pub mod layout;

pub use buffer::{IntWidth, StateBuffer};
pub use layout::{MemoryError, MemoryLayout, Region, RegionKind};
