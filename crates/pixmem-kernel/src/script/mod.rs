pub mod ast;
pub mod import;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{Document, EntityDef, EventDef, InputBinding, ParamMap, ParamValue, SchemaVar, SpawnInstance};
pub use import::{load, merge_imports, FsSource, MemorySource, MergeOutput, ScriptSource};
pub use parser::{parse, ParseOutput, ParseWarning};
