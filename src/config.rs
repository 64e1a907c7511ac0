//! Scene constants.
//!
//! Every number the demo uses lives in [`SceneConfig`]. There is no runtime
//! configuration surface: the default is the scene.

use cgmath::{Point3, Rad, Vector3};

/// DOM id of the button that starts the demo (web only).
pub const PLAY_BUTTON_ID: &str = "play";
/// DOM id of the canvas the renderer draws into (web only).
pub const CANVAS_ID: &str = "canvas";

/// Deep Star Maps 2020, https://svs.gsfc.nasa.gov/4851
pub const SKY_MAP_PATH: &str = "img/starmap_2020_4k.exr";
pub const GROUND_MAP_PATH: &str = "img/Ground037_1K_Color.png";
pub const SOUND_PATH: &str = "sounds/takibi.mp3";

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub position: Point3<f32>,
}

#[derive(Clone, Debug)]
pub struct ControlsConfig {
    pub target: Point3<f32>,
    pub damping_factor: f32,
    pub screen_space_panning: bool,
}

#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub foreground_camera: CameraConfig,
    pub background_camera: CameraConfig,
    pub controls: ControlsConfig,

    /// `0xRRGGBB`
    pub fog_color: u32,
    pub fog_density: f32,
    pub ambient_color: u32,

    pub sky_radius: f32,
    pub sky_segments: u32,

    pub ground_size: f32,
    pub ground_segments: u32,
    pub ground_repeat: [f32; 2],
    pub ground_flat_shading: bool,

    pub box_size: f32,
    pub box_color: u32,
    pub box_position: Point3<f32>,
    pub box_rotation_z: Rad<f32>,

    pub axes_length: f32,

    pub sound_ref_distance: f32,
    pub sound_loop: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let position = Point3::new(1.0, 100.0, 10.0);
        Self {
            foreground_camera: CameraConfig {
                fovy_degrees: 75.0,
                znear: 0.1,
                zfar: 2_500.0,
                position,
            },
            background_camera: CameraConfig {
                fovy_degrees: 75.0,
                znear: 0.1,
                zfar: 2_500_000.0,
                position,
            },
            controls: ControlsConfig {
                target: Point3::new(0.0, 100.0, 0.0),
                damping_factor: 0.05,
                screen_space_panning: false,
            },
            fog_color: 0xcccccc,
            fog_density: 0.002,
            ambient_color: 0x222222,
            sky_radius: 90_000.0,
            sky_segments: 300,
            ground_size: 90_000.0,
            ground_segments: 30,
            ground_repeat: [300.0, 300.0],
            ground_flat_shading: true,
            box_size: 10.0,
            box_color: 0xffffff,
            box_position: Point3::new(100.0, 10.0, 100.0),
            box_rotation_z: Rad(-std::f32::consts::FRAC_PI_2),
            axes_length: 25_000.0,
            sound_ref_distance: 20.0,
            sound_loop: true,
        }
    }
}

/// Converts an sRGB `0xRRGGBB` colour into linear channels, the space the
/// shaders work in.
pub fn rgb(hex: u32) -> Vector3<f32> {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vector3::new(channel(16), channel(8), channel(0))
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}
