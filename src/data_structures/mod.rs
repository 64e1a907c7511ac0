//! Scene data: geometry, transforms, materials, textures and scene graphs.
//!
//! - `geometry` holds vertex layouts and the primitive builders
//! - `instance` holds node transforms and their uniform form
//! - `material` describes surfaces and their (lazily loaded) texture slot
//! - `texture` holds decoded images and the GPU texture wrapper
//! - `scene_graph` holds the ordered node list and scene environment

pub mod geometry;
pub mod instance;
pub mod material;
pub mod scene_graph;
pub mod texture;
