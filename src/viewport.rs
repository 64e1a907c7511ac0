//! The two layers of the demo.
//!
//! A [`Viewport`] bundles one scene with the camera that looks at it and the
//! controller that moves that camera. The [`Stage`] owns the background layer
//! (sky, ground, axes) and the foreground layer (the sounding box in fog),
//! and is the only place asset events are applied.

use cgmath::{Deg, Quaternion, Rotation3, Vector3};
use winit::{dpi::PhysicalSize, event::WindowEvent};

use crate::{
    audio::{AudioSink, PositionalAudio},
    camera::{Camera, Projection},
    config::{self, CameraConfig, ControlsConfig, SceneConfig},
    controls::OrbitController,
    data_structures::{
        geometry,
        instance::Transform,
        material::{Material, Side},
        scene_graph::{AmbientLight, FogExp2, Node, NodeId, Scene},
    },
    resources::loader::{AssetEvent, AssetPayload, AssetRequest, AssetTarget},
};

pub const SKY_NODE: &str = "sky";
pub const GROUND_NODE: &str = "ground";
pub const AXES_NODE: &str = "axes";
pub const BOX_NODE: &str = "box";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    Background,
    Foreground,
}

/// Drawable area in logical pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let logical = size.to_logical::<f64>(scale_factor);
        Self::new(
            logical.width.round() as u32,
            logical.height.round() as u32,
            scale_factor,
        )
    }

    /// Size of the render target in device pixels.
    pub fn physical(&self) -> (u32, u32) {
        let scale = |v: u32| (v as f64 * self.pixel_ratio).round() as u32;
        (scale(self.width), scale(self.height))
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug)]
pub struct Viewport {
    pub scene: Scene,
    pub camera: Camera,
    pub projection: Projection,
    pub controller: OrbitController,
}

impl Viewport {
    pub fn new(scene: Scene, camera: &CameraConfig, controls: &ControlsConfig, size: ViewportSize) -> Self {
        let projection = Projection::new(
            size.width,
            size.height,
            Deg(camera.fovy_degrees),
            camera.znear,
            camera.zfar,
        );
        let controller = OrbitController::new(controls.target, camera.fovy_degrees)
            .with_damping(controls.damping_factor)
            .with_screen_space_panning(controls.screen_space_panning);
        Self {
            scene,
            camera: Camera::new(camera.position, controls.target),
            projection,
            controller,
        }
    }
}

#[derive(Debug)]
pub struct Stage {
    pub background: Viewport,
    pub foreground: Viewport,
    pub ground: NodeId,
    pub speaker: NodeId,
    sky: Option<NodeId>,
    sky_radius: f32,
    sky_segments: u32,
    size: ViewportSize,
}

impl Stage {
    pub fn new(config: &SceneConfig, size: ViewportSize) -> Self {
        let mut foreground = Scene::new("foreground");
        foreground.fog = Some(FogExp2::new(config::rgb(config.fog_color), config.fog_density));
        let speaker_transform = Transform::from(Vector3::new(
            config.box_position.x,
            config.box_position.y,
            config.box_position.z,
        ))
        .with_rotation(Quaternion::from_angle_z(config.box_rotation_z));
        let speaker = foreground.add(
            Node::mesh(
                BOX_NODE,
                geometry::cuboid(config.box_size, config.box_size, config.box_size),
                Material::basic(config::rgb(config.box_color)),
                speaker_transform,
            )
            .with_audio(PositionalAudio::new(config.sound_ref_distance, config.sound_loop)),
        );

        let mut background = Scene::new("background");
        let ground_transform =
            Transform::new().with_rotation(Quaternion::from_angle_x(Deg(-90.0)));
        let ground = background.add(Node::mesh(
            GROUND_NODE,
            geometry::plane(
                config.ground_size,
                config.ground_size,
                config.ground_segments,
                config.ground_segments,
            ),
            Material::lambert(config::rgb(0xffffff))
                .with_repeat(config.ground_repeat)
                .with_flat_shading(config.ground_flat_shading),
            ground_transform,
        ));
        background.add(Node::axes(AXES_NODE, geometry::axes(config.axes_length)));
        // a single light object can only have one parent; it ends up here
        background.ambient = Some(AmbientLight::new(config::rgb(config.ambient_color)));

        Self {
            background: Viewport::new(
                background,
                &config.background_camera,
                &config.controls,
                size,
            ),
            foreground: Viewport::new(
                foreground,
                &config.foreground_camera,
                &config.controls,
                size,
            ),
            ground,
            speaker,
            sky: None,
            sky_radius: config.sky_radius,
            sky_segments: config.sky_segments,
            size,
        }
    }

    pub fn viewport(&self, layer: Layer) -> &Viewport {
        match layer {
            Layer::Background => &self.background,
            Layer::Foreground => &self.foreground,
        }
    }

    pub fn viewport_mut(&mut self, layer: Layer) -> &mut Viewport {
        match layer {
            Layer::Background => &mut self.background,
            Layer::Foreground => &mut self.foreground,
        }
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn sky(&self) -> Option<NodeId> {
        self.sky
    }

    pub fn asset_requests(&self) -> Vec<AssetRequest> {
        AssetRequest::scene_defaults(self.ground, self.speaker)
    }

    /// Writes the new size into both projections and both controllers.
    /// Zero-sized viewports are ignored.
    pub fn resize(&mut self, size: ViewportSize) {
        if size.is_empty() {
            return;
        }
        self.size = size;
        let (physical_width, physical_height) = size.physical();
        for viewport in [&mut self.background, &mut self.foreground] {
            viewport.projection.resize(size.width, size.height);
            viewport
                .controller
                .set_element_size(physical_width, physical_height);
        }
    }

    /// Both controllers listen to the same window.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        for viewport in [&mut self.background, &mut self.foreground] {
            viewport
                .controller
                .handle_window_event(&viewport.camera, event);
        }
    }

    /// One damping step for each controller.
    pub fn advance_controls(&mut self) {
        for viewport in [&mut self.background, &mut self.foreground] {
            viewport.controller.update(&mut viewport.camera);
        }
    }

    /// Applies a loaded asset to its target. Returns whether anything
    /// changed; a target that was already filled is left alone.
    pub fn apply_asset(&mut self, event: AssetEvent, audio: &mut dyn AudioSink) -> bool {
        match (event.target, event.payload) {
            (AssetTarget::SkyDome, AssetPayload::Texture(data)) => {
                if self.sky.is_some() {
                    log::warn!("Sky map delivered twice, ignoring");
                    return false;
                }
                let material = Material::basic(config::rgb(0xffffff))
                    .with_side(Side::Double)
                    .with_map(data);
                let sky = Node::mesh(
                    SKY_NODE,
                    geometry::sphere(self.sky_radius, self.sky_segments, self.sky_segments),
                    material,
                    Transform::default(),
                );
                self.sky = Some(self.background.scene.add(sky));
                true
            }
            (AssetTarget::GroundMap { node }, AssetPayload::Texture(data)) => {
                let Some(material) = self
                    .background
                    .scene
                    .node_mut(node)
                    .and_then(|node| node.material_mut())
                else {
                    log::warn!("Ground map delivered for unknown node {node:?}");
                    return false;
                };
                if material.map.is_loaded() {
                    log::warn!("Ground map delivered twice, ignoring");
                    return false;
                }
                material.set_map(data);
                true
            }
            (AssetTarget::Sound { node }, AssetPayload::Audio(clip)) => {
                let Some(scene_node) = self.foreground.scene.node_mut(node) else {
                    log::warn!("Sound delivered for unknown node {node:?}");
                    return false;
                };
                let position = scene_node.transform.position;
                let Some(positional) = scene_node.audio.as_mut() else {
                    log::warn!("Node {} has no positional audio", scene_node.name);
                    return false;
                };
                if positional.is_bound() {
                    log::warn!("Sound delivered twice, ignoring");
                    return false;
                }
                audio.set_source_position(cgmath::Point3::new(position.x, position.y, position.z));
                if let Err(e) = audio.play(&clip, positional.looping(), positional.ref_distance()) {
                    log::warn!("Could not start {}: {e}", clip.name);
                    return false;
                }
                positional.bind(clip)
            }
            (target, _) => {
                log::warn!("Asset payload does not fit {target:?}");
                false
            }
        }
    }

    /// Moves the listener with the background camera and keeps the source
    /// on the sounding node.
    pub fn sync_audio(&self, audio: &mut dyn AudioSink) {
        let Some(node) = self.foreground.scene.node(self.speaker) else {
            return;
        };
        if !node.audio.as_ref().is_some_and(|a| a.is_bound()) {
            return;
        }
        let position = node.transform.position;
        audio.set_source_position(cgmath::Point3::new(position.x, position.y, position.z));
        let camera = &self.background.camera;
        audio.set_listener_pose(camera.position, camera.forward(), camera.up);
    }
}
