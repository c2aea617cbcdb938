pub mod component;
pub mod slot;
pub mod sprite;
