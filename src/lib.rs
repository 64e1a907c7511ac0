//! starfield-ngin
//!
//! A two-layer starfield scene rendered with wgpu, natively and in the
//! browser via WASM. The background layer holds a star-mapped sky sphere,
//! a textured ground plane and an axes helper; the foreground layer holds a
//! fogged white box that plays a looping positional sound. Each layer has
//! its own camera and damped orbit controller, and every frame draws the
//! background first and the foreground on top.
//!
//! High-level modules
//! - `bootstrap`: one-shot start gate (the play button on the web)
//! - `config`: the scene's constants and asset paths
//! - `camera` / `controls`: cameras, projections and orbit controllers
//! - `context`: central GPU and window context (device, queue, surface)
//! - `data_structures`: geometry, transforms, materials, textures, scenes
//! - `audio`: positional audio state and the audio output sinks
//! - `resources`: asset reading and fire-and-forget loading
//! - `viewport`: the two scene/camera/controller layers
//! - `pipelines` / `render`: GPU pipelines and the per-frame sequence
//! - `flow`: the winit application and entry points
//!

pub mod audio;
pub mod bootstrap;
pub mod camera;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewport;

#[cfg(not(target_arch = "wasm32"))]
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// WASM entry point. Fails if `#play` or `#canvas` is missing.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::start().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
