//! `#[wasm_bindgen]` exports for browser hosts.
//!
//! One `KernelRunner` lives in a `thread_local!`; every export forwards to it.

pub mod runner;

pub use runner::KernelRunner;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<KernelRunner> = RefCell::new(KernelRunner::new());
}

fn with_runner<R>(f: impl FnOnce(&mut KernelRunner) -> R) -> R {
    RUNNER.with(|cell| f(&mut cell.borrow_mut()))
}

/// Install the panic hook and console logger. Safe to call more than once.
#[wasm_bindgen]
pub fn kernel_init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("pixmem: initialized");
}

#[wasm_bindgen]
pub fn kernel_set_config(json: &str) -> bool {
    with_runner(|r| r.set_config_json(json))
}

#[wasm_bindgen]
pub fn kernel_add_file(path: &str, text: &str) {
    with_runner(|r| r.add_file(path, text));
}

#[wasm_bindgen]
pub fn kernel_boot(entry: &str, width: u32, height: u32, pixels: &[u8]) -> bool {
    with_runner(|r| r.boot(entry, width, height, pixels))
}

#[wasm_bindgen]
pub fn kernel_start() {
    with_runner(|r| r.start());
}

#[wasm_bindgen]
pub fn kernel_stop() {
    with_runner(|r| r.stop());
}

#[wasm_bindgen]
pub fn kernel_tick(dt: f32) -> u32 {
    with_runner(|r| r.tick(dt))
}

#[wasm_bindgen]
pub fn kernel_step() -> bool {
    with_runner(|r| r.step())
}

#[wasm_bindgen]
pub fn kernel_key_down(key: &str) {
    with_runner(|r| r.key_down(key));
}

#[wasm_bindgen]
pub fn kernel_key_up(key: &str) {
    with_runner(|r| r.key_up(key));
}

#[wasm_bindgen]
pub fn kernel_spawn(entity: &str, x: i16, y: i16) -> bool {
    with_runner(|r| r.spawn(entity, x, y))
}

#[wasm_bindgen]
pub fn kernel_erase(x: i32, y: i32) -> bool {
    with_runner(|r| r.erase(x, y))
}

#[wasm_bindgen]
pub fn kernel_load_baked(json: &str) -> bool {
    with_runner(|r| r.load_baked(json))
}

// ---- Data accessors ----

/// Pointer into wasm memory. Only valid until the next boot.
#[wasm_bindgen]
pub fn get_buffer_ptr() -> *const u8 {
    with_runner(|r| r.buffer_ptr())
}

#[wasm_bindgen]
pub fn get_buffer_len() -> u32 {
    with_runner(|r| r.buffer_len())
}

/// Copy of the buffer, safe to keep across ticks.
#[wasm_bindgen]
pub fn get_snapshot() -> js_sys::Uint8Array {
    with_runner(|r| js_sys::Uint8Array::from(r.snapshot().as_slice()))
}

#[wasm_bindgen]
pub fn get_frame() -> u32 {
    with_runner(|r| r.frame())
}

#[wasm_bindgen]
pub fn get_world_width() -> u32 {
    with_runner(|r| r.world_width())
}

#[wasm_bindgen]
pub fn get_world_height() -> u32 {
    with_runner(|r| r.world_height())
}

#[wasm_bindgen]
pub fn get_var(name: &str) -> Option<f64> {
    with_runner(|r| r.read_var(name).map(|v| v as f64))
}

/// Diagnostics from the last boot as a JSON array of strings.
#[wasm_bindgen]
pub fn get_diagnostics() -> String {
    with_runner(|r| r.diagnostics_json())
}
