//! Versioned binary container format for skeletal animation data.
//!
//! A container stream begins with a u32 format version (magic bytes are the
//! embedding file format's responsibility). Versions 1-4 are readable;
//! version 4 is the only version written.
//!
//! # Layout (version 4)
//! ```text
//! u32 version
//! node table            (count, then per node: 16xf32 inverse bind matrix,
//!                        4xf32 translation, 4xf32 rotation quat xyzw,
//!                        4xf32 scale, length-prefixed name, i32 parent)
//! sorted-node table     (count, i32 indices, parent-before-child order)
//! joint-node table      (count, i32 indices)
//! keyframe-track table  (count, then per track: count + f32 times)
//! output-channel table  (count, then per channel: u8 compression tag,
//!                        element count, raw 4xf32 values or lz4 blob)
//! clip table            (count, then per clip: name, binding count,
//!                        6x i32 accessors per binding, -1 = unused)
//! humanoid map          (u8 presence flag, count, name + u32 index entries)
//! ```
//!
//! Older versions: v1-v3 prefix the node table with an unused 16-float
//! skeleton root transform (read and discarded); v1 stores the keyframe and
//! output tables privately inside each clip (merged into the shared tables on
//! load with index offsetting); v1-v3 store channels uncompressed with no
//! tag; the humanoid map exists from v3 on.

pub mod container;
pub mod quat_codec;
pub mod stream;

pub use quat_codec::{decode_rotation_channel, encode_rotation_channel};
pub use stream::{ByteReader, MAX_STRING_LEN};

/// Current container format version, the only version written.
pub const FORMAT_VERSION: u32 = 4;

/// Upper bound for node/track/channel/binding table sizes. Generous for real
/// rigs; counts above it are treated as malformed input.
pub const MAX_TABLE_LEN: usize = 100_000;

/// Upper bound for the clip table size.
pub const MAX_CLIPS: usize = 10_000;

/// Upper bound on the decompressed size of one rotation channel blob.
pub const MAX_DECODED_CHANNEL_BYTES: usize = 1_000_000;

/// Per-channel storage encoding. A closed two-way choice, not an extension
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCompression {
    /// Raw 4xf32 values.
    None,
    /// Quantized, delta-filtered, lz4-compressed quaternions.
    Quat,
}

impl ChannelCompression {
    pub fn tag(self) -> u8 {
        match self {
            ChannelCompression::None => 0,
            ChannelCompression::Quat => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ChannelCompression::None),
            1 => Some(ChannelCompression::Quat),
            _ => None,
        }
    }
}

/// Layout capabilities of one readable format version. Version quirks live in
/// this table rather than in conditionals spread through the reader.
#[derive(Debug, Clone, Copy)]
pub(crate) struct VersionSpec {
    pub version: u32,
    /// v1-v3 carry an unused 16-float skeleton root transform.
    pub has_root_transform: bool,
    /// v1 stores keyframe/output tables privately per clip.
    pub per_clip_tables: bool,
    /// v4 prefixes each output channel with a compression tag.
    pub per_channel_compression: bool,
    /// The humanoid bone map exists from v3 on.
    pub has_humanoid_map: bool,
}

pub(crate) const VERSION_SPECS: [VersionSpec; 4] = [
    VersionSpec {
        version: 1,
        has_root_transform: true,
        per_clip_tables: true,
        per_channel_compression: false,
        has_humanoid_map: false,
    },
    VersionSpec {
        version: 2,
        has_root_transform: true,
        per_clip_tables: false,
        per_channel_compression: false,
        has_humanoid_map: false,
    },
    VersionSpec {
        version: 3,
        has_root_transform: true,
        per_clip_tables: false,
        per_channel_compression: false,
        has_humanoid_map: true,
    },
    VersionSpec {
        version: 4,
        has_root_transform: false,
        per_clip_tables: false,
        per_channel_compression: true,
        has_humanoid_map: true,
    },
];

pub(crate) fn version_spec(version: u32) -> Option<&'static VersionSpec> {
    VERSION_SPECS.iter().find(|s| s.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_tag_roundtrip() {
        for c in [ChannelCompression::None, ChannelCompression::Quat] {
            assert_eq!(ChannelCompression::from_tag(c.tag()), Some(c));
        }
        assert_eq!(ChannelCompression::from_tag(2), None);
        assert_eq!(ChannelCompression::from_tag(0xFF), None);
    }

    #[test]
    fn test_version_spec_table() {
        assert!(version_spec(0).is_none());
        assert!(version_spec(5).is_none());
        for v in 1..=4 {
            assert_eq!(version_spec(v).unwrap().version, v);
        }
        let current = version_spec(FORMAT_VERSION).unwrap();
        assert!(!current.has_root_transform);
        assert!(current.per_channel_compression);
        assert!(current.has_humanoid_map);
    }
}
