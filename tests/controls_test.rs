use cgmath::{InnerSpace, Point3};
use starfield_ngin::{
    camera::{Camera, CameraUniform, Projection},
    controls::{OrbitController, PointerAction},
};

use crate::common::test_utils::assert_close;

mod common;

fn camera() -> Camera {
    Camera::new(Point3::new(0.0, 0.0, 10.0), Point3::new(0.0, 0.0, 0.0))
}

#[test]
fn should_apply_a_fraction_of_the_rotation_per_frame() {
    let mut camera = camera();
    let mut controller = OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0).with_damping(0.05);
    controller.rotate_left(0.5);

    assert!(controller.update(&mut camera));

    assert_close(camera.position.x, 10.0 * (-0.025f32).sin());
    assert_close(controller.pending_rotation().0, -0.5 * 0.95);
}

#[test]
fn should_converge_with_damping() {
    let mut camera = camera();
    let mut controller = OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0).with_damping(0.05);
    controller.rotate_left(0.5);

    for _ in 0..400 {
        controller.update(&mut camera);
    }

    assert_close(camera.position.x, 10.0 * (-0.5f32).sin());
    assert_close(camera.position.z, 10.0 * 0.5f32.cos());
    assert_close((camera.position - controller.target).magnitude(), 10.0);
    assert_eq!(controller.target, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(camera.look_at, controller.target);
    assert!(controller.pending_rotation().0.abs() < 1e-4);
    assert!(!controller.update(&mut camera));
}

#[test]
fn should_apply_everything_at_once_without_damping() {
    let mut camera = camera();
    let mut controller = OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0);
    controller.rotate_left(0.5);

    assert!(controller.update(&mut camera));
    assert_close(camera.position.x, 10.0 * (-0.5f32).sin());
    assert!(!controller.update(&mut camera));
}

#[test]
fn should_keep_clear_of_the_poles() {
    let mut camera = camera();
    let mut controller = OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0);
    controller.rotate_up(10.0);

    controller.update(&mut camera);

    // never exactly above the target, where the view matrix degenerates
    assert!(camera.position.z > 0.0);
    assert!(camera.position.x.is_finite() && camera.position.y.is_finite());
    assert_close((camera.position - controller.target).magnitude(), 10.0);
}

#[test]
fn should_dolly_towards_the_target() {
    let mut camera = camera();
    let mut controller = OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0);
    controller.dolly(0.5);

    controller.update(&mut camera);

    assert_close(camera.position.z, 5.0);
}

#[test]
fn should_pan_in_the_horizontal_plane() {
    let mut camera = Camera::new(Point3::new(0.0, 5.0, 10.0), Point3::new(0.0, 0.0, 0.0));
    let mut controller =
        OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0).with_screen_space_panning(false);
    controller.set_element_size(800, 600);

    controller.pan(&camera, 30.0, 20.0);
    controller.update(&mut camera);

    assert!(controller.target.y.abs() < 1e-5);
    assert!(controller.target.x.abs() > 0.01);
    assert!(controller.target.z.abs() > 0.01);
    assert_close(camera.position.y, 5.0);
}

#[test]
fn should_pan_along_the_screen_when_enabled() {
    let mut camera = Camera::new(Point3::new(0.0, 5.0, 10.0), Point3::new(0.0, 0.0, 0.0));
    let mut controller =
        OrbitController::new(Point3::new(0.0, 0.0, 0.0), 75.0).with_screen_space_panning(true);
    controller.set_element_size(800, 600);

    controller.pan(&camera, 0.0, 20.0);
    controller.update(&mut camera);

    assert!(controller.target.y > 0.01);
}

#[test]
fn should_start_idle() {
    let controller = OrbitController::new(Point3::new(0.0, 100.0, 0.0), 75.0);
    assert_eq!(controller.action(), PointerAction::None);
    assert!(!controller.enable_damping);
    assert_eq!(controller.pending_rotation(), (0.0, 0.0));
}

#[test]
fn should_measure_fog_depth_along_the_view_axis() {
    let camera = camera();
    let mut uniform = CameraUniform::new();
    uniform.update_view_proj(&camera, &Projection::new(800, 600, cgmath::Deg(45.0), 1.0, 1000.0));

    assert_close(uniform.view_depth(Point3::new(0.0, 0.0, 0.0)), 10.0);
    // off to the side: same depth, much larger straight-line distance
    let oblique = Point3::new(30.0, 0.0, 0.0);
    assert_close(uniform.view_depth(oblique), 10.0);
    assert!((oblique - camera.position).magnitude() > 30.0);
    assert_close(uniform.view_depth(Point3::new(0.0, 0.0, -40.0)), 50.0);
}
