//! Positional audio.
//!
//! The scene only tracks *whether* a node's sound is bound and how it plays;
//! spatialisation is the job of an [`AudioSink`]. Clips are decoded by
//! [`decode_clip`] while they load, so a file that is not audio never reaches
//! the scene. On the web the sink is Web Audio (HRTF panner, inverse distance
//! model). Natively the file is decoded with symphonia to validate it, and the
//! sink only logs what it would play.

use std::sync::Arc;

use cgmath::{Point3, Vector3};

/// A successfully decoded sound file.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioClip {
    pub name: String,
    /// The encoded file contents.
    pub bytes: Arc<Vec<u8>>,
    pub sample_rate: u32,
    pub channels: usize,
    /// Decoded samples, ready for a buffer source.
    #[cfg(target_arch = "wasm32")]
    pub buffer: web_sys::AudioBuffer,
}

/// Decodes the start of `bytes` and reads the stream parameters. Fails for
/// anything that is not a supported audio file.
#[cfg(not(target_arch = "wasm32"))]
pub async fn decode_clip(name: &str, bytes: Vec<u8>) -> anyhow::Result<AudioClip> {
    use anyhow::Context as _;
    use symphonia::core::{
        codecs::DecoderOptions, formats::FormatOptions, io::MediaSourceStream,
        meta::MetadataOptions, probe::Hint,
    };

    let bytes = Arc::new(bytes);
    let source = std::io::Cursor::new(bytes.as_ref().clone());
    let stream = MediaSourceStream::new(Box::new(source), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = std::path::Path::new(name).extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }
    let detected = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("{name} is not a known audio format"))?;
    let mut format = detected.format;
    let (track_id, params) = {
        let track = format
            .default_track()
            .with_context(|| format!("{name} has no audio track"))?;
        (track.id, track.codec_params.clone())
    };
    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .with_context(|| format!("no decoder for {name}"))?;

    // one packet proves the stream decodes
    loop {
        let packet = format
            .next_packet()
            .with_context(|| format!("{name} has no audio packets"))?;
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = decoder
            .decode(&packet)
            .with_context(|| format!("could not decode {name}"))?;
        let spec = *decoded.spec();
        return Ok(AudioClip {
            name: name.to_string(),
            bytes,
            sample_rate: spec.rate,
            channels: spec.channels.count(),
        });
    }
}

/// Decodes `bytes` with the browser's `decodeAudioData`.
#[cfg(target_arch = "wasm32")]
pub async fn decode_clip(name: &str, bytes: Vec<u8>) -> anyhow::Result<AudioClip> {
    web::decode(name, bytes).await
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackState {
    Unbound,
    Bound {
        looping: bool,
        playing: bool,
        ref_distance: f32,
    },
}

/// A sound source attached to a scene node.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionalAudio {
    state: PlaybackState,
    clip: Option<AudioClip>,
    ref_distance: f32,
    rolloff_factor: f32,
    looping: bool,
}

impl PositionalAudio {
    pub fn new(ref_distance: f32, looping: bool) -> Self {
        Self {
            state: PlaybackState::Unbound,
            clip: None,
            ref_distance,
            rolloff_factor: 1.0,
            looping,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, PlaybackState::Bound { .. })
    }

    pub fn clip(&self) -> Option<&AudioClip> {
        self.clip.as_ref()
    }

    pub fn ref_distance(&self) -> f32 {
        self.ref_distance
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Attaches the clip and starts playback. Returns `false` and changes
    /// nothing if a clip is already bound.
    pub fn bind(&mut self, clip: AudioClip) -> bool {
        if self.is_bound() {
            return false;
        }
        self.clip = Some(clip);
        self.state = PlaybackState::Bound {
            looping: self.looping,
            playing: true,
            ref_distance: self.ref_distance,
        };
        true
    }

    /// Gain of the inverse distance model at `distance` from the listener.
    pub fn gain_at(&self, distance: f32) -> f32 {
        let d = distance.max(self.ref_distance);
        self.ref_distance / (self.ref_distance + self.rolloff_factor * (d - self.ref_distance))
    }
}

/// Where positional audio ends up.
pub trait AudioSink {
    /// Starts `clip` at the source position last set.
    fn play(&mut self, clip: &AudioClip, looping: bool, ref_distance: f32) -> anyhow::Result<()>;
    fn set_source_position(&mut self, position: Point3<f32>);
    fn set_listener_pose(&mut self, position: Point3<f32>, forward: Vector3<f32>, up: Vector3<f32>);
}

/// Stand-in sink for targets without an audio backend.
#[derive(Debug, Default)]
pub struct LogSink {
    playing: Option<String>,
}

impl AudioSink for LogSink {
    fn play(&mut self, clip: &AudioClip, looping: bool, ref_distance: f32) -> anyhow::Result<()> {
        log::info!(
            "Playing {} ({} bytes, loop: {looping}, ref distance: {ref_distance}) without an audio backend",
            clip.name,
            clip.bytes.len()
        );
        self.playing = Some(clip.name.clone());
        Ok(())
    }

    fn set_source_position(&mut self, position: Point3<f32>) {
        if self.playing.is_some() {
            log::trace!("audio source at {position:?}");
        }
    }

    fn set_listener_pose(&mut self, position: Point3<f32>, _forward: Vector3<f32>, _up: Vector3<f32>) {
        if self.playing.is_some() {
            log::trace!("audio listener at {position:?}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebAudioSink;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::sync::Arc;

    use anyhow::anyhow;
    use cgmath::{Point3, Vector3};
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys as web;

    use super::{AudioClip, AudioSink};

    fn js_err(e: wasm_bindgen::JsValue) -> anyhow::Error {
        anyhow!("{e:?}")
    }

    /// Decodes in an offline context; the buffer plays in any context later.
    pub(super) async fn decode(name: &str, bytes: Vec<u8>) -> anyhow::Result<AudioClip> {
        let context =
            web::OfflineAudioContext::new_with_number_of_channels_and_length_and_sample_rate(
                1, 1, 44_100.0,
            )
            .map_err(js_err)?;
        let data = js_sys::Uint8Array::from(bytes.as_slice()).buffer();
        let promise = context.decode_audio_data(&data).map_err(js_err)?;
        let buffer = JsFuture::from(promise)
            .await
            .map_err(|e| anyhow!("could not decode {name}: {e:?}"))?
            .dyn_into::<web::AudioBuffer>()
            .map_err(js_err)?;
        Ok(AudioClip {
            name: name.to_string(),
            bytes: Arc::new(bytes),
            sample_rate: buffer.sample_rate() as u32,
            channels: buffer.number_of_channels() as usize,
            buffer,
        })
    }

    /// Web Audio output: one HRTF panner feeding the destination.
    pub struct WebAudioSink {
        context: web::AudioContext,
        panner: web::PannerNode,
    }

    impl std::fmt::Debug for WebAudioSink {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("WebAudioSink")
        }
    }

    impl WebAudioSink {
        /// Must run inside the user gesture that started the app, otherwise
        /// the browser keeps the context suspended.
        pub fn new() -> anyhow::Result<Self> {
            let context = web::AudioContext::new().map_err(js_err)?;
            let panner = web::PannerNode::new(&context).map_err(js_err)?;
            panner.set_panning_model(web::PanningModelType::Hrtf);
            panner.set_distance_model(web::DistanceModelType::Inverse);
            panner
                .connect_with_audio_node(&context.destination())
                .map_err(js_err)?;
            Ok(Self { context, panner })
        }
    }

    impl AudioSink for WebAudioSink {
        fn play(&mut self, clip: &AudioClip, looping: bool, ref_distance: f32) -> anyhow::Result<()> {
            self.panner.set_ref_distance(ref_distance as f64);
            let source = self.context.create_buffer_source().map_err(js_err)?;
            source.set_buffer(Some(&clip.buffer));
            source.set_loop(looping);
            source.connect_with_audio_node(&self.panner).map_err(js_err)?;
            source.start().map_err(js_err)?;
            Ok(())
        }

        fn set_source_position(&mut self, position: Point3<f32>) {
            self.panner
                .set_position(position.x as f64, position.y as f64, position.z as f64);
        }

        fn set_listener_pose(&mut self, position: Point3<f32>, forward: Vector3<f32>, up: Vector3<f32>) {
            let listener = self.context.listener();
            listener.set_position(position.x as f64, position.y as f64, position.z as f64);
            listener.set_orientation(
                forward.x as f64,
                forward.y as f64,
                forward.z as f64,
                up.x as f64,
                up.y as f64,
                up.z as f64,
            );
        }
    }
}
