//! Skeletal animation data for rigged characters.
//!
//! This crate owns the data model for animation clips bound to a hierarchical
//! skeleton, a versioned binary container codec with lossy rotation-channel
//! compression, and a cross-rig retargeting engine that reapplies a clip
//! authored for one skeleton onto a structurally different one while
//! preserving bone-length proportions.
//!
//! Runtime sampling and blending live with the engine, not here; this crate
//! stops at the data, its codec, and the retargeting transform.
//!
//! # Modules
//!
//! - [`model`] - node hierarchy, keyframe/output tables, clips, containers
//! - [`formats`] - versioned binary container codec and channel compression
//! - [`validate`] - hierarchy and accessor invariant checks
//! - [`build`] - cached metadata derived once after load
//! - [`passes`] - unit-rescale fixup and unused-channel compaction
//! - [`retarget`] - cross-rig name mapping and bind recomputation

pub mod build;
pub mod error;
pub mod formats;
pub mod model;
pub mod passes;
pub mod retarget;
pub mod validate;

pub use error::{Result, RigAnimError};

// Re-export the data model.
pub use model::{
    AnimTables, AnimationClip, KeyframeTrack, Node, NodeChannels, OutputChannel,
    SkeletonContainer, UniformSpacing,
};

// Re-export commonly used format items.
pub use formats::{
    ChannelCompression, FORMAT_VERSION, MAX_CLIPS, MAX_DECODED_CHANNEL_BYTES, MAX_TABLE_LEN,
    decode_rotation_channel, encode_rotation_channel,
};

// Re-export the maintenance passes and checks.
pub use build::build;
pub use passes::{compact_output_channels, fix_unit_scale};
pub use validate::validate;
