pub mod state;

pub use state::{InputMapper, InputState};
