//! In-memory skeletal animation data model.
//!
//! A [`SkeletonContainer`] owns a node hierarchy, the shared keyframe/output
//! tables, and the animation clips bound to them. Clips reference tables by
//! accessor index; a clip may detach a private copy of the tables so it can be
//! reused standalone across multiple containers.

use glam::{Mat4, Quat, Vec3, Vec4};
use hashbrown::HashMap;

/// One joint/bone in the skeleton hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Bone name as authored in the source rig.
    pub name: String,

    /// Parent node index. `None` for the hierarchy root; never `self`.
    pub parent: Option<u32>,

    /// Transform from mesh space into this node's bone space at rest pose.
    pub inverse_bind_matrix: Mat4,

    /// Rest-pose local translation.
    pub translation: Vec3,

    /// Rest-pose local rotation.
    pub rotation: Quat,

    /// Rest-pose local scale.
    pub scale: Vec3,

    /// Corrective transform applied when reusing another skeleton's
    /// animation on this one. Identity unless set by retargeting.
    pub retarget_adjustment: Mat4,
}

impl Node {
    /// Create a root node with identity transforms.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            inverse_bind_matrix: Mat4::IDENTITY,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            retarget_adjustment: Mat4::IDENTITY,
        }
    }

    /// Local translation-rotation-scale matrix for the rest pose.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Cached uniform keyframe spacing, filled in by the builder when all samples
/// of a track lie on an even grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSpacing {
    /// Time between consecutive keyframes.
    pub spacing: f32,
    /// Reciprocal of `spacing`, for constant-time frame-index lookup.
    pub inv_spacing: f32,
}

/// Ascending keyframe timestamps for one sampled track.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    /// Keyframe times in seconds, ascending.
    pub times: Vec<f32>,

    /// Cached first timestamp (0.0 for an empty track).
    pub first_time: f32,

    /// Cached last timestamp (0.0 for an empty track).
    pub last_time: f32,

    /// Cached uniform spacing, if the track is evenly sampled.
    pub uniform: Option<UniformSpacing>,
}

impl KeyframeTrack {
    /// Wrap raw timestamps. Derived fields are filled in by the builder.
    pub fn new(times: Vec<f32>) -> Self {
        let first_time = times.first().copied().unwrap_or(0.0);
        let last_time = times.last().copied().unwrap_or(0.0);
        Self {
            times,
            first_time,
            last_time,
            uniform: None,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Sampled output values for one track.
///
/// Translation and scale channels use xyz; rotation channels store
/// quaternions in xyzw.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputChannel {
    pub values: Vec<Vec4>,
}

impl OutputChannel {
    pub fn new(values: Vec<Vec4>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The shared keyframe-track and output-channel table pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimTables {
    pub tracks: Vec<KeyframeTrack>,
    pub channels: Vec<OutputChannel>,
}

/// Accessor bindings for one node within one clip.
///
/// `None` means the component is not animated. An input accessor implies its
/// paired output accessor, and the referenced track and channel must have
/// equal lengths (enforced by the validator).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeChannels {
    pub translation_input: Option<u32>,
    pub translation_output: Option<u32>,
    pub rotation_input: Option<u32>,
    pub rotation_output: Option<u32>,
    pub scale_input: Option<u32>,
    pub scale_output: Option<u32>,
}

impl NodeChannels {
    /// A binding that animates nothing.
    pub const UNBOUND: Self = Self {
        translation_input: None,
        translation_output: None,
        rotation_input: None,
        rotation_output: None,
        scale_input: None,
        scale_output: None,
    };

    /// The three (input, output) accessor pairs with their component labels.
    pub fn pairs(&self) -> [(&'static str, Option<u32>, Option<u32>); 3] {
        [
            ("translation", self.translation_input, self.translation_output),
            ("rotation", self.rotation_input, self.rotation_output),
            ("scale", self.scale_input, self.scale_output),
        ]
    }

    /// Input accessors in binding order.
    pub fn inputs(&self) -> [Option<u32>; 3] {
        [
            self.translation_input,
            self.rotation_input,
            self.scale_input,
        ]
    }
}

/// One animation clip: per-node accessor bindings plus cached metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,

    /// One binding per node, ordered by node index.
    pub channels: Vec<NodeChannels>,

    /// Cached clip duration: the maximum last timestamp over every input
    /// track actually referenced. Filled in by the builder.
    pub duration: f32,

    /// Cached ascending, deduplicated input-track indices actually used,
    /// so evaluation can skip unused tracks. Filled in by the builder.
    pub used_input_tracks: Vec<u32>,

    /// Private copy of the keyframe/output tables, set by
    /// [`AnimationClip::detach_tables`]. When present the clip's accessors
    /// resolve against this copy instead of the container's shared tables,
    /// which makes the clip safe to share across containers.
    pub private_tables: Option<Box<AnimTables>>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: Vec::new(),
            duration: 0.0,
            used_input_tracks: Vec::new(),
            private_tables: None,
        }
    }

    /// The table pair in effect for this clip: private if detached, else the
    /// container's shared tables.
    pub fn tables<'a>(&'a self, shared: &'a AnimTables) -> &'a AnimTables {
        match &self.private_tables {
            Some(private) => private,
            None => shared,
        }
    }

    /// Copy the shared tables into private storage. Accessor indices stay
    /// valid because the whole table pair is copied.
    pub fn detach_tables(&mut self, shared: &AnimTables) {
        if self.private_tables.is_none() {
            self.private_tables = Some(Box::new(shared.clone()));
        }
    }
}

/// A skeleton with its animation clips and shared sample tables.
#[derive(Debug, Clone, Default)]
pub struct SkeletonContainer {
    pub nodes: Vec<Node>,

    /// Permutation of node indices in topological order: every parent occurs
    /// before all of its children.
    pub sorted_nodes: Vec<u32>,

    /// Subset of node indices used to deform skinned geometry.
    pub joint_nodes: Vec<u32>,

    /// Keyframe/output tables shared by all clips that have not detached.
    pub tables: AnimTables,

    pub clips: Vec<AnimationClip>,

    /// Per-clip snapshot of node bindings, indexed by clip position and
    /// padded to at least node count. Filled in by the builder.
    pub clip_channel_cache: Vec<Vec<NodeChannels>>,

    /// Canonical humanoid bone name -> node index, when the source asset
    /// carried VRM-style humanoid metadata.
    pub humanoid_bones: Option<HashMap<String, u32>>,

    /// Set once retargeting has rewritten this container in place.
    pub retarget_committed: bool,
}

impl SkeletonContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first node with the given name.
    pub fn node_index(&self, name: &str) -> Option<u32> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| i as u32)
    }

    /// First node with the given name.
    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Index of the first clip with the given name.
    pub fn find_clip(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name == name)
    }

    /// Exact-name -> node-index map. The first occurrence of a duplicated
    /// name wins.
    pub(crate) fn name_index_map(nodes: &[Node]) -> HashMap<String, u32> {
        let mut map = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            map.entry(node.name.clone()).or_insert(i as u32);
        }
        map
    }
}
