use std::sync::Arc;

use cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3};
use starfield_ngin::{
    audio::{AudioClip, PlaybackState, PositionalAudio},
    config,
    data_structures::{
        geometry::{axes, cuboid, plane, sphere},
        instance::Transform,
        material::{Material, MaterialUniform, Shading, Side, Wrapping},
        scene_graph::{AmbientLight, FogExp2, Node, Scene},
        texture::TextureData,
    },
};

use crate::common::test_utils::{assert_close, png_bytes};

mod common;

fn map() -> Arc<TextureData> {
    Arc::new(TextureData::from_bytes(&png_bytes(8, 4, [10, 20, 30, 255]), None).unwrap())
}

#[test]
fn should_build_sphere_with_collapsed_poles() {
    let geometry = sphere(2.0, 8, 6);

    assert_eq!(geometry.vertices.len(), 9 * 7);
    assert_eq!(geometry.indices.len(), 6 * 8 * 6 - 6 * 8);
    for vertex in &geometry.vertices {
        assert_close(Vector3::from(vertex.position).magnitude(), 2.0);
    }
    let max_index = *geometry.indices.iter().max().unwrap();
    assert!((max_index as usize) < geometry.vertices.len());
}

#[test]
fn should_build_plane_facing_z() {
    let geometry = plane(10.0, 6.0, 2, 3);

    assert_eq!(geometry.vertices.len(), 3 * 4);
    assert_eq!(geometry.triangle_count(), 2 * 2 * 3);
    assert!(geometry.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    assert_eq!(geometry.vertices[0].position, [-5.0, 3.0, 0.0]);
    assert_eq!(geometry.vertices[11].tex_coords, [1.0, 1.0]);
}

#[test]
fn should_build_box_and_axes() {
    let geometry = cuboid(10.0, 10.0, 10.0);
    assert_eq!(geometry.vertices.len(), 24);
    assert_eq!(geometry.indices.len(), 36);
    assert!(geometry
        .vertices
        .iter()
        .all(|v| v.position.iter().all(|c| c.abs() == 5.0)));

    let lines = axes(25.0);
    assert_eq!(lines.segment_count(), 3);
    assert_eq!(lines.vertices[1].position, [25.0, 0.0, 0.0]);
    assert_eq!(lines.vertices[5].color, [0.0, 0.0, 1.0]);
}

#[test]
fn should_bump_map_version_on_every_load() {
    let mut material = Material::lambert(config::rgb(0xffffff)).with_repeat([300.0, 300.0]);
    assert_eq!(material.map.version(), 0);
    assert_eq!(material.wrapping, Wrapping::Repeat);
    assert_eq!(material.to_uniform().flags & MaterialUniform::HAS_MAP, 0);

    material.set_map(map());
    material.set_map(map());

    assert_eq!(material.map.version(), 2);
    let uniform = material.to_uniform();
    assert_eq!(uniform.lambert, 1);
    assert_eq!(uniform.repeat, [300.0, 300.0]);
    assert_ne!(uniform.flags & MaterialUniform::HAS_MAP, 0);
}

#[test]
fn should_only_flat_shade_lambert() {
    let basic = Material::basic(config::rgb(0xffffff))
        .with_flat_shading(true)
        .with_side(Side::Double);
    assert_eq!(basic.shading, Shading::Basic);
    assert_eq!(basic.side, Side::Double);
    assert_eq!(basic.to_uniform().flags, MaterialUniform::FOG);

    let lambert = Material::lambert(config::rgb(0xffffff)).with_flat_shading(true);
    assert_eq!(
        lambert.shading,
        Shading::Lambert {
            flat_shading: true
        }
    );
    assert_ne!(lambert.to_uniform().flags & MaterialUniform::FLAT_SHADING, 0);
}

#[test]
fn should_convert_hex_colours_to_linear() {
    let white = config::rgb(0xffffff);
    assert_close(white.x, 1.0);
    assert_close(white.z, 1.0);
    let grey = config::rgb(0x808080);
    assert_close(grey.y, 0.2158);
    assert_eq!(config::rgb(0x000000), Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn should_downscale_textures_over_the_limit() {
    let data = map();
    assert!(data.fit_within(8).is_none());

    let fitted = data.fit_within(4).unwrap();
    assert_eq!(fitted.dimensions(), (4, 2));
    assert_eq!(TextureData::format_hint("img/starmap_2020_4k.exr"), Some("exr"));
}

#[test]
fn should_build_full_mip_chain() {
    let data = map();
    assert_eq!(data.mip_level_count(), 4);
    let sizes: Vec<_> = data.mip_chain().iter().map(|level| level.dimensions()).collect();
    assert_eq!(sizes, vec![(8, 4), (4, 2), (2, 1), (1, 1)]);
    assert_eq!(data.mip_chain()[3].get_pixel(0, 0).0, [10, 20, 30, 255]);

    let ground = TextureData::from_bytes(&png_bytes(1024, 1024, [90, 60, 30, 255]), Some("png")).unwrap();
    assert_eq!(ground.mip_level_count(), 11);
    assert_eq!(ground.mip_chain().len(), 11);
}

#[test]
fn should_bind_audio_once_and_attenuate_inversely() {
    let mut audio = PositionalAudio::new(20.0, true);
    assert_eq!(audio.state(), PlaybackState::Unbound);
    assert!(audio.clip().is_none());

    let clip = AudioClip {
        name: "takibi".to_string(),
        bytes: Arc::new(vec![0; 16]),
        sample_rate: 44_100,
        channels: 2,
    };
    assert!(audio.bind(clip.clone()));
    assert!(!audio.bind(clip));
    assert_eq!(
        audio.state(),
        PlaybackState::Bound {
            looping: true,
            playing: true,
            ref_distance: 20.0,
        }
    );

    assert_close(audio.gain_at(5.0), 1.0);
    assert_close(audio.gain_at(20.0), 1.0);
    assert_close(audio.gain_at(40.0), 0.5);
    assert_close(audio.gain_at(100.0), 0.2);
}

#[test]
fn should_fog_exponentially_squared() {
    let fog = FogExp2::new(config::rgb(0xcccccc), 0.002);
    assert_close(fog.factor(0.0), 0.0);
    assert_close(fog.factor(500.0), 1.0 - (-1.0f32).exp());
    assert!(fog.factor(5_000.0) > 0.99);
}

#[test]
fn should_keep_insertion_order_and_expose_environment() {
    let mut scene = Scene::new("test");
    assert!(scene.is_empty());
    let first = scene.add(Node::axes("a", axes(1.0)));
    let second = scene.add(Node::mesh(
        "b",
        cuboid(1.0, 1.0, 1.0),
        Material::basic(config::rgb(0xffffff)),
        Transform::default(),
    ));

    let names: Vec<_> = scene.nodes().map(|(_, node)| node.name.clone()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(first.index() < second.index());
    assert!(scene.node(first).unwrap().material().is_none());
    assert_eq!(scene.find("b"), Some(second));

    assert_eq!(scene.environment().fog_density, 0.0);
    scene.fog = Some(FogExp2::new(config::rgb(0xcccccc), 0.002));
    scene.ambient = Some(AmbientLight::new(config::rgb(0xffffff)));
    let environment = scene.environment();
    assert_close(environment.fog_density, 0.002);
    assert_close(environment.ambient[0], 1.0);
}

#[test]
fn should_compose_transforms() {
    let parent = Transform::from(Vector3::new(1.0, 0.0, 0.0))
        .with_rotation(Quaternion::from_angle_y(Deg(90.0)));
    let child = Transform::from(Vector3::new(0.0, 0.0, 1.0));

    let composed = &parent * &child;

    assert_close(composed.position.x, 2.0);
    assert_close(composed.position.y, 0.0);
    assert_close(composed.position.z, 0.0);
    let expected = parent.to_matrix() * child.to_matrix();
    let actual = composed.to_matrix();
    for column in 0..4 {
        for row in 0..4 {
            assert_close(actual[column][row], expected[column][row]);
        }
    }
}
