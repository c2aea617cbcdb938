pub mod baked;

pub use baked::{BakedAsset, Polygon};
