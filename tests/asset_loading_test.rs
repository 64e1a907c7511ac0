use std::sync::{Arc, mpsc};

use starfield_ngin::{
    audio::{AudioClip, PlaybackState},
    config::{self, SceneConfig},
    data_structures::{material::Side, texture::TextureData},
    resources::loader::{
        AssetEvent, AssetPayload, AssetRequest, AssetTarget, decode, fetch, fetch_all, spawn_load,
    },
    viewport::{SKY_NODE, Stage, ViewportSize},
};

use crate::common::test_utils::{RecordingSink, png_bytes, wav_bytes};

mod common;

fn stage() -> Stage {
    Stage::new(&SceneConfig::default(), ViewportSize::new(800, 600, 1.0))
}

fn texture(target: AssetTarget) -> AssetEvent {
    let data = TextureData::from_bytes(&png_bytes(2, 2, [255, 0, 0, 255]), Some("png")).unwrap();
    AssetEvent {
        target,
        payload: AssetPayload::Texture(Arc::new(data)),
    }
}

fn sound(target: AssetTarget) -> AssetEvent {
    AssetEvent {
        target,
        payload: AssetPayload::Audio(AudioClip {
            name: config::SOUND_PATH.to_string(),
            bytes: Arc::new(wav_bytes(44_100, 441)),
            sample_rate: 44_100,
            channels: 1,
        }),
    }
}

#[tokio::test]
async fn should_decode_textures_and_audio() {
    let request = AssetRequest::texture(AssetTarget::SkyDome, "img/sky.png");
    let event = decode(&request, png_bytes(4, 2, [0, 0, 255, 255])).await.unwrap();
    assert_eq!(event.target, AssetTarget::SkyDome);
    match event.payload {
        AssetPayload::Texture(data) => {
            assert_eq!(data.dimensions(), (4, 2));
            assert_eq!(data.image.get_pixel(3, 1).0, [0, 0, 255, 255]);
        }
        AssetPayload::Audio(_) => panic!("expected a texture"),
    }

    let stage = stage();
    let request = AssetRequest::audio(AssetTarget::Sound { node: stage.speaker }, "sounds/a.wav");
    let bytes = wav_bytes(22_050, 2_205);
    let event = decode(&request, bytes.clone()).await.unwrap();
    match event.payload {
        AssetPayload::Audio(clip) => {
            assert_eq!(clip.name, "sounds/a.wav");
            assert_eq!(*clip.bytes, bytes);
            assert_eq!(clip.sample_rate, 22_050);
            assert_eq!(clip.channels, 1);
        }
        AssetPayload::Texture(_) => panic!("expected audio"),
    }
}

#[tokio::test]
async fn should_reject_undecodable_texture() {
    let request = AssetRequest::texture(AssetTarget::SkyDome, "img/sky.png");
    assert!(decode(&request, b"not an image".to_vec()).await.is_err());
}

#[tokio::test]
async fn should_reject_audio_that_is_not_audio() {
    let stage = stage();
    let request = AssetRequest::audio(AssetTarget::Sound { node: stage.speaker }, config::SOUND_PATH);
    let not_found = b"<!DOCTYPE html><html><body><h1>404 Not Found</h1></body></html>".to_vec();

    assert!(decode(&request, not_found).await.is_err());
    assert!(decode(&request, vec![1, 2, 3]).await.is_err());
}

#[test]
fn should_leave_sound_unbound_when_audio_is_corrupt() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut stage = stage();
    let mut sink = RecordingSink::default();
    let speaker = stage.speaker;
    let request = AssetRequest::audio(AssetTarget::Sound { node: speaker }, config::SOUND_PATH);

    if let Ok(event) = runtime.block_on(decode(&request, b"<html>404</html>".to_vec())) {
        stage.apply_asset(event, &mut sink);
    }

    let audio = stage.foreground.scene.node(speaker).unwrap().audio.as_ref().unwrap();
    assert_eq!(audio.state(), PlaybackState::Unbound);
    assert!(sink.played.is_empty());
}

#[test]
fn should_not_bind_sound_the_sink_refused() {
    let mut stage = stage();
    let mut sink = RecordingSink {
        fail_play: true,
        ..Default::default()
    };
    let speaker = stage.speaker;

    assert!(!stage.apply_asset(sound(AssetTarget::Sound { node: speaker }), &mut sink));
    let audio = stage.foreground.scene.node(speaker).unwrap().audio.as_ref().unwrap();
    assert_eq!(audio.state(), PlaybackState::Unbound);
    assert!(sink.played.is_empty());

    sink.fail_play = false;
    assert!(stage.apply_asset(sound(AssetTarget::Sound { node: speaker }), &mut sink));
    assert_eq!(sink.played.len(), 1);
}

#[tokio::test]
async fn should_fail_fetching_missing_file() {
    let request = AssetRequest::texture(AssetTarget::SkyDome, "img/does_not_exist.exr");
    assert!(fetch(&request).await.is_err());
}

#[tokio::test]
async fn should_fetch_all_in_request_order() {
    let stage = stage();
    let requests = vec![
        AssetRequest::texture(AssetTarget::SkyDome, "img/missing_a.exr"),
        AssetRequest::audio(AssetTarget::Sound { node: stage.speaker }, "sounds/missing_b.mp3"),
    ];

    let results = fetch_all(&requests).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|result| result.is_err()));
}

#[test]
fn should_deliver_nothing_when_load_fails() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (tx, rx) = mpsc::channel();
    let request = AssetRequest::texture(AssetTarget::SkyDome, "img/does_not_exist.exr");

    let handle = spawn_load(&runtime, request, move |event| {
        tx.send(event).ok();
    });
    runtime.block_on(handle).unwrap();

    assert!(rx.try_recv().is_err());
}

#[test]
fn should_create_sky_once() {
    let mut stage = stage();
    let mut sink = RecordingSink::default();

    assert!(stage.apply_asset(texture(AssetTarget::SkyDome), &mut sink));
    let sky = stage.sky().unwrap();
    assert_eq!(stage.background.scene.len(), 3);
    assert_eq!(stage.background.scene.find(SKY_NODE), Some(sky));
    let material = stage.background.scene.node(sky).unwrap().material().unwrap();
    assert_eq!(material.side, Side::Double);
    assert!(material.map.is_loaded());

    assert!(!stage.apply_asset(texture(AssetTarget::SkyDome), &mut sink));
    assert_eq!(stage.background.scene.len(), 3);
    assert_eq!(stage.foreground.scene.len(), 1);
}

#[test]
fn should_fill_ground_map_once() {
    let mut stage = stage();
    let mut sink = RecordingSink::default();
    let ground = stage.ground;
    let map_version =
        |stage: &Stage| stage.background.scene.node(ground).unwrap().material().unwrap().map.version();
    assert_eq!(map_version(&stage), 0);

    assert!(stage.apply_asset(texture(AssetTarget::GroundMap { node: ground }), &mut sink));
    assert_eq!(map_version(&stage), 1);

    assert!(!stage.apply_asset(texture(AssetTarget::GroundMap { node: ground }), &mut sink));
    assert_eq!(map_version(&stage), 1);
    assert!(stage.sky().is_none());
}

#[test]
fn should_bind_sound_once() {
    let mut stage = stage();
    let mut sink = RecordingSink::default();
    let speaker = stage.speaker;

    assert!(stage.apply_asset(sound(AssetTarget::Sound { node: speaker }), &mut sink));
    let audio = stage.foreground.scene.node(speaker).unwrap().audio.as_ref().unwrap();
    assert_eq!(
        audio.state(),
        PlaybackState::Bound {
            looping: true,
            playing: true,
            ref_distance: 20.0,
        }
    );
    assert_eq!(sink.played.len(), 1);
    assert!(sink.played[0].looping);
    assert_eq!(sink.played[0].ref_distance, 20.0);
    assert_eq!(sink.played[0].name, config::SOUND_PATH);

    assert!(!stage.apply_asset(sound(AssetTarget::Sound { node: speaker }), &mut sink));
    assert_eq!(sink.played.len(), 1);
}

#[test]
fn should_follow_background_camera_once_sound_plays() {
    let mut stage = stage();
    let mut sink = RecordingSink::default();
    let speaker = stage.speaker;
    stage.apply_asset(sound(AssetTarget::Sound { node: speaker }), &mut sink);

    stage.sync_audio(&mut sink);

    assert_eq!(sink.listener_positions, vec![stage.background.camera.position]);
    let source = *sink.source_positions.last().unwrap();
    assert_eq!((source.x, source.y, source.z), (100.0, 10.0, 100.0));
}

#[test]
fn should_ignore_mismatched_payload() {
    let mut stage = stage();
    let mut sink = RecordingSink::default();
    let speaker = stage.speaker;
    let ground = stage.ground;

    assert!(!stage.apply_asset(texture(AssetTarget::Sound { node: speaker }), &mut sink));
    assert!(!stage.apply_asset(sound(AssetTarget::GroundMap { node: ground }), &mut sink));

    let audio = stage.foreground.scene.node(speaker).unwrap().audio.as_ref().unwrap();
    assert!(!audio.is_bound());
    let ground_node = stage.background.scene.node(ground).unwrap();
    assert!(!ground_node.material().unwrap().map.is_loaded());
    assert!(sink.played.is_empty());
}
