use std::collections::HashSet;

use pixmem_kernel::{
    load, BakedAsset, FrameClock, HostImage, InputMapper, Kernel, KernelConfig, MemorySource,
    PixelAdjacencyProbe,
};

/// Browser-side frame loop around one kernel.
///
/// The host registers script files, boots from an image, then calls `tick`
/// from `requestAnimationFrame`. Kernel ticks run at a fixed rate; boot and
/// stop only ever happen between them.
pub struct KernelRunner {
    kernel: Option<Kernel>,
    files: MemorySource,
    config: KernelConfig,
    clock: FrameClock,
    mapper: InputMapper,
    held_keys: HashSet<String>,
    probe: PixelAdjacencyProbe,
    running: bool,
    /// Import, parse, compile and boot messages from the last boot.
    diagnostics: Vec<String>,
}

impl KernelRunner {
    pub fn new() -> Self {
        let config = KernelConfig::default();
        Self {
            kernel: None,
            files: MemorySource::new(),
            clock: FrameClock::new(config.fixed_dt, config.max_steps_per_frame),
            config,
            mapper: InputMapper::new(),
            held_keys: HashSet::new(),
            probe: PixelAdjacencyProbe,
            running: false,
            diagnostics: Vec::new(),
        }
    }

    /// Replace the config used by the next boot.
    pub fn set_config_json(&mut self, json: &str) -> bool {
        match KernelConfig::from_json(json) {
            Ok(config) => {
                self.config = config;
                true
            }
            Err(e) => {
                log::error!("bad kernel config: {}", e);
                false
            }
        }
    }

    /// Register (or replace) a script file by path.
    pub fn add_file(&mut self, path: &str, text: &str) {
        self.files.insert(path, text);
    }

    /// Load `entry` with its imports and boot a kernel from the image.
    /// Any running kernel is replaced. Returns false if boot failed.
    pub fn boot(&mut self, entry: &str, width: u32, height: u32, pixels: &[u8]) -> bool {
        self.running = false;
        self.kernel = None;

        let merged = load(entry, &self.files);
        self.diagnostics = merged.diagnostics;
        self.diagnostics.extend(merged.warnings);

        let mapper = InputMapper::from_document(&merged.document);
        let image = HostImage { width, height, pixels };
        match Kernel::boot(image, merged.document, self.config.clone()) {
            Ok(kernel) => {
                self.diagnostics.extend(kernel.diagnostics().iter().cloned());
                self.mapper = mapper;
                self.clock = FrameClock::new(self.config.fixed_dt, self.config.max_steps_per_frame);
                self.kernel = Some(kernel);
                self.running = true;
                true
            }
            Err(e) => {
                log::error!("boot failed: {}", e);
                self.diagnostics.push(e.to_string());
                false
            }
        }
    }

    pub fn start(&mut self) {
        if self.kernel.is_some() {
            self.clock.reset();
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn key_down(&mut self, key: &str) {
        self.held_keys.insert(key.to_string());
    }

    pub fn key_up(&mut self, key: &str) {
        self.held_keys.remove(key);
    }

    /// Advance by `dt` seconds of host time. Returns the number of kernel
    /// ticks run.
    pub fn tick(&mut self, dt: f32) -> u32 {
        if !self.running {
            return 0;
        }
        let Some(kernel) = self.kernel.as_mut() else {
            return 0;
        };

        let steps = self.clock.accumulate(dt);
        if steps == 0 {
            return 0;
        }
        // Input is sampled once per host frame and shared by its ticks.
        let input = self.mapper.sample(self.held_keys.iter().map(String::as_str));
        for _ in 0..steps {
            kernel.tick(&input, &self.probe);
        }
        steps
    }

    /// Run exactly one kernel tick, running or not.
    pub fn step(&mut self) -> bool {
        let Some(kernel) = self.kernel.as_mut() else {
            return false;
        };
        let input = self.mapper.sample(self.held_keys.iter().map(String::as_str));
        kernel.tick(&input, &self.probe);
        true
    }

    pub fn spawn(&mut self, entity: &str, x: i16, y: i16) -> bool {
        let Some(kernel) = self.kernel.as_mut() else {
            return false;
        };
        let Some(type_id) = kernel.program().type_id(entity) else {
            return false;
        };
        kernel.pool().spawn(type_id, x, y).is_some()
    }

    pub fn erase(&mut self, x: i32, y: i32) -> bool {
        self.kernel.as_mut().is_some_and(|k| k.pool().erase(x, y))
    }

    pub fn read_var(&self, name: &str) -> Option<i64> {
        self.kernel.as_ref()?.read_var(name)
    }

    pub fn load_baked(&mut self, json: &str) -> bool {
        let Some(kernel) = self.kernel.as_mut() else {
            return false;
        };
        let attached = BakedAsset::from_json(json)
            .map_err(|e| e.to_string())
            .and_then(|asset| kernel.attach_baked(asset).map_err(|e| e.to_string()));
        match attached {
            Ok(()) => true,
            Err(msg) => {
                log::warn!("baked asset rejected: {}", msg);
                false
            }
        }
    }

    // ---- Accessors for direct memory reads ----

    pub fn buffer_ptr(&self) -> *const u8 {
        self.kernel
            .as_ref()
            .map_or(std::ptr::null(), |k| k.buffer().as_ptr())
    }

    pub fn buffer_len(&self) -> u32 {
        self.kernel.as_ref().map_or(0, |k| k.buffer().len() as u32)
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.kernel.as_ref().map(Kernel::snapshot).unwrap_or_default()
    }

    pub fn frame(&self) -> u32 {
        self.kernel.as_ref().map_or(0, Kernel::frame)
    }

    pub fn world_width(&self) -> u32 {
        self.kernel.as_ref().map_or(0, |k| k.world_size().x)
    }

    pub fn world_height(&self) -> u32 {
        self.kernel.as_ref().map_or(0, |k| k.world_size().y)
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn diagnostics_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for KernelRunner {
    fn default() -> Self {
        Self::new()
    }
}
