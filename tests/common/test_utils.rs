#![allow(dead_code)]

use std::io::Cursor;

use cgmath::{Point3, Vector3};
use starfield_ngin::{
    audio::{AudioClip, AudioSink},
    bootstrap::StartControl,
    render::{FrameExecutor, FrameStep},
};

/// Start control that counts what the bootstrap did to it.
#[derive(Default)]
pub(crate) struct RecordingControl {
    pub removed: u32,
    pub revealed: u32,
    pub fail_remove: bool,
}

impl StartControl for RecordingControl {
    fn remove_control(&mut self) -> anyhow::Result<()> {
        self.removed += 1;
        if self.fail_remove {
            anyhow::bail!("control already detached");
        }
        Ok(())
    }

    fn reveal_surface(&mut self) -> anyhow::Result<()> {
        self.revealed += 1;
        Ok(())
    }
}

pub(crate) struct Played {
    pub name: String,
    pub looping: bool,
    pub ref_distance: f32,
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    pub played: Vec<Played>,
    pub source_positions: Vec<Point3<f32>>,
    pub listener_positions: Vec<Point3<f32>>,
    pub fail_play: bool,
}

impl AudioSink for RecordingSink {
    fn play(&mut self, clip: &AudioClip, looping: bool, ref_distance: f32) -> anyhow::Result<()> {
        if self.fail_play {
            anyhow::bail!("output device refused {}", clip.name);
        }
        self.played.push(Played {
            name: clip.name.clone(),
            looping,
            ref_distance,
        });
        Ok(())
    }

    fn set_source_position(&mut self, position: Point3<f32>) {
        self.source_positions.push(position);
    }

    fn set_listener_pose(&mut self, position: Point3<f32>, _: Vector3<f32>, _: Vector3<f32>) {
        self.listener_positions.push(position);
    }
}

/// Frame executor that only writes down the steps it was asked to run.
#[derive(Default)]
pub(crate) struct RecordingExecutor {
    pub steps: Vec<FrameStep>,
    pub fail_on: Option<FrameStep>,
}

impl FrameExecutor for RecordingExecutor {
    fn execute(&mut self, step: FrameStep) -> anyhow::Result<()> {
        if self.fail_on == Some(step) {
            anyhow::bail!("{step:?} failed");
        }
        self.steps.push(step);
        Ok(())
    }
}

/// A solid-colour PNG file, as it would come off the disk.
pub(crate) fn png_bytes(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(colour));
    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("PNG encoding failed");
    bytes.into_inner()
}

pub(crate) fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

/// A short mono 16-bit PCM WAV file of silence.
pub(crate) fn wav_bytes(sample_rate: u32, samples: u32) -> Vec<u8> {
    let data_len = samples * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVEfmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.resize(44 + data_len as usize, 0);
    out
}
