pub mod kernel;
pub mod types;
