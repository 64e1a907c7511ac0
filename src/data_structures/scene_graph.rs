//! Flat scene graph.
//!
//! A [`Scene`] is an ordered list of [`Node`]s plus scene-wide environment
//! (fog and ambient light). Nodes are never removed, so a [`NodeId`] stays
//! valid for the life of the scene and insertion order is draw order.

use cgmath::Vector3;

use crate::{
    audio::PositionalAudio,
    data_structures::{
        geometry::{Geometry, LineGeometry},
        instance::Transform,
        material::Material,
    },
};

/// Handle to a node of one particular scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Mesh { geometry: Geometry, material: Material },
    /// Axes helper drawn as coloured lines, unaffected by fog and light.
    Axes { geometry: LineGeometry },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub audio: Option<PositionalAudio>,
}

impl Node {
    pub fn mesh(name: &str, geometry: Geometry, material: Material, transform: Transform) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Mesh { geometry, material },
            transform,
            audio: None,
        }
    }

    pub fn axes(name: &str, geometry: LineGeometry) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Axes { geometry },
            transform: Transform::default(),
            audio: None,
        }
    }

    pub fn with_audio(mut self, audio: PositionalAudio) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn material(&self) -> Option<&Material> {
        match &self.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            NodeKind::Axes { .. } => None,
        }
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        match &mut self.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            NodeKind::Axes { .. } => None,
        }
    }
}

/// Exponential squared fog: `1 - exp(-(density * depth)^2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FogExp2 {
    pub color: Vector3<f32>,
    pub density: f32,
}

impl FogExp2 {
    pub fn new(color: Vector3<f32>, density: f32) -> Self {
        Self { color, density }
    }

    /// Fraction of the fog colour mixed in at view-space `depth`.
    pub fn factor(&self, depth: f32) -> f32 {
        let d = self.density * depth;
        (1.0 - (-d * d).exp()).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AmbientLight {
    pub color: Vector3<f32>,
    pub intensity: f32,
}

impl AmbientLight {
    pub fn new(color: Vector3<f32>) -> Self {
        Self {
            color,
            intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub name: String,
    nodes: Vec<Node>,
    pub fog: Option<FogExp2>,
    pub ambient: Option<AmbientLight>,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn environment(&self) -> EnvironmentUniform {
        let (fog_color, fog_density) = match self.fog {
            Some(fog) => (fog.color, fog.density),
            None => (Vector3::new(0.0, 0.0, 0.0), 0.0),
        };
        let ambient = self
            .ambient
            .map(|light| light.color * light.intensity)
            .unwrap_or(Vector3::new(0.0, 0.0, 0.0));
        EnvironmentUniform {
            fog_color: fog_color.into(),
            fog_density,
            ambient: [ambient.x, ambient.y, ambient.z, 1.0],
        }
    }
}

/// Scene-wide shading inputs. Layout must match `Environment` in the WGSL
/// shaders; a zero density disables fog.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EnvironmentUniform {
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub ambient: [f32; 4],
}
