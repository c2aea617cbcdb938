pub mod evaluator;
pub mod probe;
pub mod program;
pub mod tick;
