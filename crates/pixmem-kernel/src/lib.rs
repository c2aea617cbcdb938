pub mod api;
pub mod assets;
pub mod components;
pub mod core;
pub mod input;
pub mod memory;
pub mod script;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::kernel::{HostImage, Kernel, KernelConfig, KernelError};
pub use api::types::{FrameContext, SlotId, SpriteId, TypeId};
pub use assets::baked::BakedAsset;
pub use components::component::{Animator, Component, Gravity};
pub use components::slot::{SlotMut, SlotRef, ENTITY_SIZE};
pub use components::sprite::{SpriteDef, SpriteTable};
pub use core::pool::EntityPool;
pub use core::time::FrameClock;
pub use input::state::{InputMapper, InputState};
pub use memory::buffer::{IntWidth, StateBuffer};
pub use memory::layout::{MemoryError, MemoryLayout, Region, RegionKind};
pub use script::ast::Document;
pub use script::import::{load, merge_imports, FsSource, MemorySource, MergeOutput, ScriptSource};
pub use script::parser::{parse, ParseOutput, ParseWarning};
pub use systems::evaluator::{run_events, CompiledEvent, Trigger};
pub use systems::probe::{CollisionProbe, ColorTag, NoContact, PixelAdjacencyProbe};
pub use systems::program::{EntityBehaviour, Program};
pub use systems::tick::ecs_tick;
