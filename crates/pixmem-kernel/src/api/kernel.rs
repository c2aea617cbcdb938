use glam::UVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::types::FrameContext;
use crate::assets::baked::BakedAsset;
use crate::components::slot::DEFAULT_SLOT_SIZE;
use crate::core::pool::EntityPool;
use crate::input::state::InputState;
use crate::memory::buffer::StateBuffer;
use crate::memory::layout::MemoryError;
use crate::script::ast::Document;
use crate::systems::evaluator::run_events;
use crate::systems::probe::CollisionProbe;
use crate::systems::program::Program;
use crate::systems::tick::ecs_tick;

/// Capacities of the state buffer and frame pacing for hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Header region size in bytes (default: 64).
    pub header_bytes: usize,
    /// Globals region size in bytes (default: 1024).
    pub globals_bytes: usize,
    /// Number of entity slots (default: 64).
    pub max_entities: usize,
    /// Bytes per entity slot (default: 16).
    pub slot_size: usize,
    /// Seconds per tick for hosts that pace with a frame clock (default: 1/60).
    pub fixed_dt: f32,
    /// Most ticks a host runs for one display frame (default: 4).
    pub max_steps_per_frame: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            header_bytes: 64,
            globals_bytes: 1024,
            max_entities: 64,
            slot_size: DEFAULT_SLOT_SIZE,
            fixed_dt: 1.0 / 60.0,
            max_steps_per_frame: 4,
        }
    }
}

impl KernelConfig {
    /// Parse a config from a JSON string. Missing fields take their defaults.
    /// `fixed_dt` must be a positive, finite number of seconds.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(json)?;
        if !config.fixed_dt.is_finite() || config.fixed_dt <= 0.0 {
            return Err(serde::de::Error::custom(format!(
                "fixed_dt must be a positive number of seconds, got {}",
                config.fixed_dt
            )));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("baked asset is {asset_width}x{asset_height} but the image is {width}x{height}")]
    AssetMismatch {
        asset_width: u32,
        asset_height: u32,
        width: u32,
        height: u32,
    },
}

/// Pixels handed over by the host. Copied at boot and never written.
#[derive(Debug, Clone, Copy)]
pub struct HostImage<'a> {
    pub width: u32,
    pub height: u32,
    /// RGBA, row-major, `width * height * 4` bytes.
    pub pixels: &'a [u8],
}

/// Owns the live state buffer and the compiled program, and advances frames.
///
/// A tick needs `&mut Kernel`, so nothing else can observe the buffer while
/// it runs. Readers between frames borrow it or take a `snapshot`.
#[derive(Debug)]
pub struct Kernel {
    buffer: StateBuffer,
    program: Program,
    config: KernelConfig,
    diagnostics: Vec<String>,
    baked: Option<BakedAsset>,
}

impl Kernel {
    /// Copy the image into a state buffer, compile the document against its
    /// layout and place the document's spawn instances.
    pub fn boot(image: HostImage<'_>, document: Document, config: KernelConfig) -> Result<Self, KernelError> {
        let mut buffer = StateBuffer::from_rgba(image.width, image.height, image.pixels, &config)?;
        buffer.write_header();

        let program = Program::compile(document, buffer.layout());
        let mut diagnostics = program.diagnostics().to_vec();

        let mut pool = EntityPool::new(&mut buffer);
        for spawn in program.spawns() {
            if pool.spawn(spawn.type_id, spawn.x, spawn.y).is_none() {
                diagnostics.push(format!(
                    "Spawn: entity pool full, dropped type {} at ({}, {})",
                    spawn.type_id.0, spawn.x, spawn.y
                ));
            }
        }
        let active = pool.active_count();

        for diagnostic in &diagnostics {
            log::warn!("{}", diagnostic);
        }
        log::info!(
            "kernel booted: {}x{} image, {} entity types, {} active slots, {} events",
            image.width,
            image.height,
            program.behaviours().len(),
            active,
            program.events().len()
        );

        Ok(Self {
            buffer,
            program,
            config,
            diagnostics,
            baked: None,
        })
    }

    /// Run one frame: components over every active slot, then events, then
    /// advance the frame counter. Returns the new frame number.
    pub fn tick(&mut self, input: &InputState, probe: &dyn CollisionProbe) -> u32 {
        let world = self.world_size();
        ecs_tick(&mut self.buffer, &self.program, world);

        let ctx = FrameContext { world, input, probe };
        run_events(&mut self.buffer, self.program.events(), &ctx);

        let frame = self.buffer.frame_counter().wrapping_add(1);
        self.buffer.set_frame_counter(frame);
        frame
    }

    pub fn frame(&self) -> u32 {
        self.buffer.frame_counter()
    }

    pub fn world_size(&self) -> UVec2 {
        UVec2::new(self.buffer.width(), self.buffer.height())
    }

    pub fn buffer(&self) -> &StateBuffer {
        &self.buffer
    }

    /// Independent copy of the buffer bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.buffer.snapshot()
    }

    /// Spawn/erase access between frames.
    pub fn pool(&mut self) -> EntityPool<'_> {
        EntityPool::new(&mut self.buffer)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Compile and boot diagnostics.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Current value of a schema variable, by name with its `$`.
    pub fn read_var(&self, name: &str) -> Option<i64> {
        self.program.vars().get(name).map(|var| var.read(&self.buffer))
    }

    /// Host-side write to a schema variable. False if the name isn't bound.
    pub fn write_var(&mut self, name: &str, value: i64) -> bool {
        match self.program.vars().get(name) {
            Some(var) => {
                var.write(&mut self.buffer, value);
                true
            }
            None => false,
        }
    }

    /// Keep externally baked collision geometry for this image.
    pub fn attach_baked(&mut self, asset: BakedAsset) -> Result<(), KernelError> {
        let (width, height) = (self.buffer.width(), self.buffer.height());
        if !asset.matches_size(width, height) {
            return Err(KernelError::AssetMismatch {
                asset_width: asset.width,
                asset_height: asset.height,
                width,
                height,
            });
        }
        self.baked = Some(asset);
        Ok(())
    }

    pub fn baked(&self) -> Option<&BakedAsset> {
        self.baked.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{SlotId, SpriteId, TypeId};
    use crate::memory::layout::{RegionKind, HEADER_SLOT_COUNT, HEADER_WORLD_WIDTH};
    use crate::memory::buffer::IntWidth;
    use crate::script::parser::parse;
    use crate::systems::probe::{NoContact, PixelAdjacencyProbe};

    const SCRIPT: &str = "\
Schema:
  - $Score: {addr: 0, type: Int16}
  - $Jumps: {addr: 2, type: Int8}
Entity.Hero:
  Visual: hero_idle
  Gravity: {force: 1, terminalVelocity: 4}
  Kinematic:
  Collider:
  - Space -> Jump
Entity.Coin:
  Animator: {sequence: [3, 4], speed: 2}
Events:
  OnFrame:
    - State.$Score += 1
  Input(Jump):
    - State.$Jumps += 1
  Collision(Hero:#FF0000, Coin:#FFFF00):
    - State.$Score = 1000
Sprites:
  hero_idle: [0, 0, 1]
Spawn:
  - Hero: {x: 8, y: 0}
  - Coin: {x: 40, y: 40}
";

    fn image(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    fn boot(pixels: &[u8], config: KernelConfig) -> Kernel {
        let image = HostImage { width: 64, height: 64, pixels };
        Kernel::boot(image, parse(SCRIPT).document, config).unwrap()
    }

    #[test]
    fn boot_writes_header_and_spawns() {
        let pixels = image(64, 64);
        let kernel = boot(&pixels, KernelConfig::default());
        let buf = kernel.buffer();

        assert_eq!(buf.read_int(RegionKind::Header, HEADER_WORLD_WIDTH, IntWidth::Int16), 64);
        assert_eq!(buf.read_int(RegionKind::Header, HEADER_SLOT_COUNT, IntWidth::Int16), 64);
        assert_eq!(kernel.frame(), 0);
        assert!(kernel.diagnostics().is_empty(), "{:?}", kernel.diagnostics());

        let hero = buf.slot(SlotId(0));
        assert!(hero.active());
        assert_eq!(hero.type_id(), TypeId(1));
        assert_eq!((hero.pos_x(), hero.pos_y()), (8, 0));
        assert_eq!(buf.slot(SlotId(1)).type_id(), TypeId(2));
        assert!(!buf.slot(SlotId(2)).active());

        // The host's pixels are copied, not shared.
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn tick_runs_components_then_events() {
        let pixels = image(64, 64);
        let mut kernel = boot(&pixels, KernelConfig::default());
        let idle = InputState::new();

        assert_eq!(kernel.tick(&idle, &NoContact), 1);
        let hero = kernel.buffer().slot(SlotId(0));
        assert_eq!((hero.vel_y(), hero.pos_y()), (1, 1));
        assert_eq!(hero.sprite_id(), SpriteId(1));
        let coin = kernel.buffer().slot(SlotId(1));
        assert_eq!((coin.sprite_id(), coin.anim_timer()), (SpriteId(4), 2));
        assert_eq!(kernel.read_var("$Score"), Some(1));

        kernel.tick(&InputState::from_actions(["Jump"]), &NoContact);
        assert_eq!(kernel.read_var("$Score"), Some(2));
        assert_eq!(kernel.read_var("$Jumps"), Some(1));
        assert_eq!(kernel.frame(), 2);
        assert_eq!(kernel.read_var("$Missing"), None);
    }

    #[test]
    fn hero_falls_to_the_floor_and_stops() {
        let pixels = image(64, 64);
        let mut kernel = boot(&pixels, KernelConfig::default());
        for _ in 0..40 {
            kernel.tick(&InputState::new(), &NoContact);
        }
        let hero = kernel.buffer().slot(SlotId(0));
        assert_eq!(hero.pos_y(), 48);
        // Gravity pushes every frame; the collider takes it back.
        assert_eq!(hero.vel_y(), 0);
    }

    #[test]
    fn collision_event_reads_live_pixels() {
        let mut pixels = image(64, 64);
        let row = 60 * 64 * 4;
        pixels[row..row + 3].copy_from_slice(&[0xFF, 0, 0]);
        pixels[row + 4..row + 7].copy_from_slice(&[0xFF, 0xFF, 0]);
        let mut kernel = boot(&pixels, KernelConfig::default());

        kernel.tick(&InputState::new(), &NoContact);
        assert_eq!(kernel.read_var("$Score"), Some(1));
        kernel.tick(&InputState::new(), &PixelAdjacencyProbe);
        assert_eq!(kernel.read_var("$Score"), Some(1000));
    }

    #[test]
    fn frame_counter_wraps() {
        let pixels = image(64, 64);
        let mut kernel = boot(&pixels, KernelConfig::default());
        kernel.buffer.set_frame_counter(u32::MAX);
        assert_eq!(kernel.tick(&InputState::new(), &NoContact), 0);
    }

    #[test]
    fn full_pool_drops_spawns_with_a_diagnostic() {
        let pixels = image(64, 64);
        let config = KernelConfig { max_entities: 1, ..KernelConfig::default() };
        let kernel = boot(&pixels, config);
        assert_eq!(kernel.diagnostics().len(), 1);
        assert!(kernel.diagnostics()[0].contains("pool full"));
    }

    #[test]
    fn boot_rejects_bad_images() {
        let doc = Document::default();
        let small = image(8, 8);
        let err = Kernel::boot(
            HostImage { width: 8, height: 8, pixels: &small },
            doc.clone(),
            KernelConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::Memory(MemoryError::TooSmall { .. })));

        let short = vec![0; 100];
        let err = Kernel::boot(
            HostImage { width: 64, height: 64, pixels: &short },
            doc,
            KernelConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::Memory(MemoryError::SizeMismatch { .. })));
    }

    #[test]
    fn host_pool_and_var_access() {
        let pixels = image(64, 64);
        let mut kernel = boot(&pixels, KernelConfig::default());
        assert!(kernel.pool().erase(9, 1));
        assert_eq!(kernel.pool().spawn(TypeId(2), 0, 0), Some(SlotId(0)));
        assert!(kernel.write_var("$Score", 41));
        assert!(!kernel.write_var("$Nope", 1));
        kernel.tick(&InputState::new(), &NoContact);
        assert_eq!(kernel.read_var("$Score"), Some(42));
    }

    #[test]
    fn baked_asset_must_match_the_image() {
        let pixels = image(64, 64);
        let mut kernel = boot(&pixels, KernelConfig::default());
        let wrong = BakedAsset { width: 32, height: 64, polygons: Vec::new() };
        assert!(matches!(
            kernel.attach_baked(wrong),
            Err(KernelError::AssetMismatch { asset_width: 32, .. })
        ));
        let right = BakedAsset { width: 64, height: 64, polygons: Vec::new() };
        kernel.attach_baked(right).unwrap();
        assert!(kernel.baked().is_some());
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config = KernelConfig::from_json(r#"{"max_entities": 8}"#).unwrap();
        assert_eq!(config.max_entities, 8);
        assert_eq!(config.globals_bytes, 1024);
        assert!(KernelConfig::from_json(r#"{"max_entities": "lots"}"#).is_err());
    }

    #[test]
    fn config_rejects_non_positive_step() {
        assert!(KernelConfig::from_json(r#"{"fixed_dt": -0.016}"#).is_err());
        assert!(KernelConfig::from_json(r#"{"fixed_dt": 0}"#).is_err());
        assert!(KernelConfig::from_json(r#"{"fixed_dt": 0.02}"#).is_ok());
    }

    #[test]
    fn huge_capacities_fail_boot_instead_of_panicking() {
        let pixels = image(64, 64);
        for config in [
            KernelConfig { max_entities: usize::MAX / 8, ..KernelConfig::default() },
            KernelConfig { globals_bytes: usize::MAX, ..KernelConfig::default() },
        ] {
            let result = Kernel::boot(
                HostImage { width: 64, height: 64, pixels: &pixels },
                Document::default(),
                config,
            );
            assert!(matches!(
                result,
                Err(KernelError::Memory(MemoryError::TooManySlots { .. } | MemoryError::Overflow))
            ));
        }
    }
}
