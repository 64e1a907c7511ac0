//! Damped orbit controls.
//!
//! An [`OrbitController`] turns pointer, wheel and arrow-key input into a
//! pending rotation/pan/dolly and applies a fraction of it to its camera on
//! every [`OrbitController::update`]. With damping enabled the unapplied
//! remainder decays by `1 - damping_factor` per frame, which gives the
//! inertial feel after the pointer is released.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Vector3, Zero};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
};

use crate::camera::Camera;

const EPS: f32 = 0.000_001;

/// What a held pointer button currently does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerAction {
    None,
    Rotate,
    Dolly,
    Pan,
}

/// Spherical coordinates around the target, y-up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    /// Azimuth around +Y, measured from +Z towards +X.
    pub theta: f32,
    /// Polar angle from +Y.
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self::default();
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug)]
pub struct OrbitController {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub screen_space_panning: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Pixels moved per arrow key press.
    pub key_pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    /// Vertical field of view of the bound camera, needed to scale pans.
    pub fovy_degrees: f32,

    spherical_delta: Spherical,
    pan_offset: Vector3<f32>,
    scale: f32,

    action: PointerAction,
    cursor: Option<PhysicalPosition<f64>>,
    modifiers: ModifiersState,
    element_size: (f32, f32),
}

impl OrbitController {
    pub fn new(target: Point3<f32>, fovy_degrees: f32) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            screen_space_panning: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            key_pan_speed: 7.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            fovy_degrees,
            spherical_delta: Spherical::default(),
            pan_offset: Vector3::zero(),
            scale: 1.0,
            action: PointerAction::None,
            cursor: None,
            modifiers: ModifiersState::empty(),
            element_size: (1.0, 1.0),
        }
    }

    pub fn with_damping(mut self, damping_factor: f32) -> Self {
        self.enable_damping = true;
        self.damping_factor = damping_factor;
        self
    }

    pub fn with_screen_space_panning(mut self, enabled: bool) -> Self {
        self.screen_space_panning = enabled;
        self
    }

    /// Size in physical pixels of the element receiving input.
    pub fn set_element_size(&mut self, width: u32, height: u32) {
        self.element_size = (width.max(1) as f32, height.max(1) as f32);
    }

    pub fn action(&self) -> PointerAction {
        self.action
    }

    /// Angle the camera will still turn by once the pending delta decays.
    pub fn pending_rotation(&self) -> (f32, f32) {
        (self.spherical_delta.theta, self.spherical_delta.phi)
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Values below one move the camera towards the target.
    pub fn dolly(&mut self, factor: f32) {
        self.scale *= factor;
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Pans by a screen-space delta in pixels.
    pub fn pan(&mut self, camera: &Camera, delta_x: f32, delta_y: f32) {
        let offset = camera.position - self.target;
        let target_distance =
            offset.magnitude() * (self.fovy_degrees / 2.0).to_radians().tan();
        let height = self.element_size.1;

        let forward = camera.forward();
        let right = forward.cross(camera.up);
        if right.magnitude2() < EPS {
            return;
        }
        let right = right.normalize();

        let left_distance = 2.0 * delta_x * target_distance / height * self.pan_speed;
        self.pan_offset += right * -left_distance;

        let up_distance = 2.0 * delta_y * target_distance / height * self.pan_speed;
        let up = if self.screen_space_panning {
            right.cross(forward).normalize()
        } else {
            camera.up.cross(right)
        };
        self.pan_offset += up * up_distance;
    }

    /// Feeds a window event; `camera` is only read, for pan directions.
    pub fn handle_window_event(&mut self, camera: &Camera, event: &WindowEvent) {
        match event {
            WindowEvent::ModifiersChanged(modifiers) => {
                self.modifiers = modifiers.state();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.handle_button(*state, *button);
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    self.handle_drag(camera, dx, dy);
                }
                self.cursor = Some(*position);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32,
                };
                if scroll > 0.0 {
                    self.dolly(self.zoom_scale());
                } else if scroll < 0.0 {
                    self.dolly(1.0 / self.zoom_scale());
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(camera, event),
            WindowEvent::Focused(false) => {
                self.action = PointerAction::None;
            }
            _ => (),
        }
    }

    fn handle_button(&mut self, state: ElementState, button: MouseButton) {
        if !state.is_pressed() {
            self.action = PointerAction::None;
            return;
        }
        let modified =
            self.modifiers.control_key() || self.modifiers.super_key() || self.modifiers.shift_key();
        self.action = match button {
            MouseButton::Left if modified => PointerAction::Pan,
            MouseButton::Left => PointerAction::Rotate,
            MouseButton::Middle => PointerAction::Dolly,
            MouseButton::Right => PointerAction::Pan,
            _ => PointerAction::None,
        };
    }

    fn handle_drag(&mut self, camera: &Camera, dx: f32, dy: f32) {
        let (_, height) = self.element_size;
        match self.action {
            PointerAction::Rotate => {
                self.rotate_left(2.0 * PI * dx / height * self.rotate_speed);
                self.rotate_up(2.0 * PI * dy / height * self.rotate_speed);
            }
            PointerAction::Dolly => {
                if dy > 0.0 {
                    self.dolly(1.0 / self.zoom_scale());
                } else if dy < 0.0 {
                    self.dolly(self.zoom_scale());
                }
            }
            PointerAction::Pan => self.pan(camera, dx, dy),
            PointerAction::None => (),
        }
    }

    fn handle_key(&mut self, camera: &Camera, event: &KeyEvent) {
        if !event.state.is_pressed() {
            return;
        }
        let speed = self.key_pan_speed;
        match event.physical_key {
            PhysicalKey::Code(KeyCode::ArrowUp) => self.pan(camera, 0.0, speed),
            PhysicalKey::Code(KeyCode::ArrowDown) => self.pan(camera, 0.0, -speed),
            PhysicalKey::Code(KeyCode::ArrowLeft) => self.pan(camera, speed, 0.0),
            PhysicalKey::Code(KeyCode::ArrowRight) => self.pan(camera, -speed, 0.0),
            _ => (),
        }
    }

    /// Advances one damping step and moves `camera`. Returns whether the
    /// camera changed.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let old_position = camera.position;
        let old_target = self.target;

        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.enable_damping {
            spherical.theta += self.spherical_delta.theta * self.damping_factor;
            spherical.phi += self.spherical_delta.phi * self.damping_factor;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        if self.enable_damping {
            self.target += self.pan_offset * self.damping_factor;
        } else {
            self.target += self.pan_offset;
        }

        camera.position = self.target + spherical.to_offset();
        camera.look_at = self.target;

        if self.enable_damping {
            let retention = 1.0 - self.damping_factor;
            self.spherical_delta.theta *= retention;
            self.spherical_delta.phi *= retention;
            self.pan_offset *= retention;
        } else {
            self.spherical_delta = Spherical::default();
            self.pan_offset = Vector3::zero();
        }
        self.scale = 1.0;

        (camera.position - old_position).magnitude2() > EPS
            || (self.target - old_target).magnitude2() > EPS
    }
}
