//! Fire-and-forget asset loading.
//!
//! Every [`AssetRequest`] names the one thing it will change once loaded.
//! [`spawn_load`] runs the request in the background and hands the decoded
//! [`AssetEvent`] to a delivery callback, normally a winit event loop proxy.
//! A failed load is logged and dropped: no event is delivered and nothing in
//! the scene changes.

use std::sync::Arc;

use crate::{
    audio::{self, AudioClip},
    config,
    data_structures::{scene_graph::NodeId, texture::TextureData},
    resources::load_binary,
};

/// The scene element an asset is destined for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetTarget {
    /// The sky sphere, created in the background scene on arrival.
    SkyDome,
    /// The texture map of the ground mesh.
    GroundMap { node: NodeId },
    /// The positional audio attached to `node`.
    Sound { node: NodeId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    Texture,
    Audio,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetRequest {
    pub target: AssetTarget,
    pub path: String,
    pub kind: AssetKind,
}

impl AssetRequest {
    pub fn texture(target: AssetTarget, path: &str) -> Self {
        Self {
            target,
            path: path.to_string(),
            kind: AssetKind::Texture,
        }
    }

    pub fn audio(target: AssetTarget, path: &str) -> Self {
        Self {
            target,
            path: path.to_string(),
            kind: AssetKind::Audio,
        }
    }

    /// The three loads the scene starts with.
    pub fn scene_defaults(ground: NodeId, sound_node: NodeId) -> Vec<Self> {
        vec![
            Self::texture(AssetTarget::SkyDome, config::SKY_MAP_PATH),
            Self::texture(AssetTarget::GroundMap { node: ground }, config::GROUND_MAP_PATH),
            Self::audio(AssetTarget::Sound { node: sound_node }, config::SOUND_PATH),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AssetPayload {
    Texture(Arc<TextureData>),
    Audio(AudioClip),
}

/// A successfully loaded asset on its way to the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetEvent {
    pub target: AssetTarget,
    pub payload: AssetPayload,
}

/// Turns raw file contents into an event for `request`. Audio is fully
/// decoded here, so a clip that reaches the scene is known to be playable.
pub async fn decode(request: &AssetRequest, bytes: Vec<u8>) -> anyhow::Result<AssetEvent> {
    let payload = match request.kind {
        AssetKind::Texture => {
            let data = TextureData::from_bytes(&bytes, TextureData::format_hint(&request.path))?;
            AssetPayload::Texture(Arc::new(data))
        }
        AssetKind::Audio => AssetPayload::Audio(audio::decode_clip(&request.path, bytes).await?),
    };
    Ok(AssetEvent {
        target: request.target,
        payload,
    })
}

pub async fn fetch(request: &AssetRequest) -> anyhow::Result<AssetEvent> {
    let bytes = load_binary(&request.path).await?;
    decode(request, bytes).await
}

/// Loads all `requests` concurrently. Results come back in request order,
/// failures included.
pub async fn fetch_all(requests: &[AssetRequest]) -> Vec<anyhow::Result<AssetEvent>> {
    futures::future::join_all(requests.iter().map(fetch)).await
}

async fn load_and_deliver<D>(request: AssetRequest, deliver: D)
where
    D: FnOnce(AssetEvent),
{
    match fetch(&request).await {
        Ok(event) => {
            log::info!("Loaded {}", request.path);
            deliver(event);
        }
        Err(e) => log::warn!("Could not load {}: {e}", request.path),
    }
}

/// Starts `request` on the runtime and returns immediately.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_load<D>(
    runtime: &tokio::runtime::Runtime,
    request: AssetRequest,
    deliver: D,
) -> tokio::task::JoinHandle<()>
where
    D: FnOnce(AssetEvent) + Send + 'static,
{
    runtime.spawn(load_and_deliver(request, deliver))
}

/// Starts `request` on the browser's microtask queue and returns immediately.
#[cfg(target_arch = "wasm32")]
pub fn spawn_load<D>(request: AssetRequest, deliver: D)
where
    D: FnOnce(AssetEvent) + 'static,
{
    wasm_bindgen_futures::spawn_local(load_and_deliver(request, deliver));
}
