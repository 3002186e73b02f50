//! Reader/writer for the versioned animation container stream.
//!
//! Every count read from the stream is validated against its bound before any
//! proportional allocation happens; this is the primary defense against
//! malformed or adversarial input. Any unsupported version, oversized count,
//! or truncated read fails with the invalid-data error and the whole
//! container is discarded.

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Mat4, Quat, Vec3, Vec4};
use hashbrown::HashMap;
use std::io::Write;

use crate::build;
use crate::error::{Result, invalid_data};
use crate::formats::stream::{ByteReader, write_f32_slice, write_string};
use crate::formats::{
    ChannelCompression, FORMAT_VERSION, MAX_CLIPS, MAX_TABLE_LEN, quat_codec, version_spec,
};
use crate::model::{
    AnimTables, AnimationClip, KeyframeTrack, Node, NodeChannels, OutputChannel, SkeletonContainer,
};
use crate::validate;

impl SkeletonContainer {
    /// Deserialize a container, then validate it and build its caches.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        read_container(bytes)
    }

    /// Serialize as the current format version.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Serialize as the current format version into `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_container(self, w)
    }
}

/// Read a container from `bytes`, dispatching on the version spec table.
pub fn read_container(bytes: &[u8]) -> Result<SkeletonContainer> {
    let mut r = ByteReader::new(bytes);
    let version = r.read_u32()?;
    let spec = version_spec(version)
        .ok_or_else(|| invalid_data(format!("unsupported container version: {version}")))?;

    if spec.has_root_transform {
        // Unused global skeleton root transform carried by old versions.
        r.skip(16 * 4)?;
    }

    let nodes = read_nodes(&mut r)?;
    let sorted_nodes = read_index_table(&mut r, "sorted node")?;
    let joint_nodes = read_index_table(&mut r, "joint node")?;

    let (tables, clips) = if spec.per_clip_tables {
        read_clips_with_private_tables(&mut r)?
    } else {
        let tables = read_tables(&mut r, spec.per_channel_compression)?;
        let clips = read_clips(&mut r)?;
        (tables, clips)
    };

    let humanoid_bones = if spec.has_humanoid_map {
        read_humanoid_map(&mut r, nodes.len())?
    } else {
        None
    };

    let mut container = SkeletonContainer {
        nodes,
        sorted_nodes,
        joint_nodes,
        tables,
        clips,
        clip_channel_cache: Vec::new(),
        humanoid_bones,
        retarget_committed: false,
    };
    validate::validate(&container)?;
    build::build(&mut container);
    tracing::debug!(
        version,
        nodes = container.nodes.len(),
        clips = container.clips.len(),
        "loaded animation container"
    );
    Ok(container)
}

fn read_count(r: &mut ByteReader, bound: usize, what: &str) -> Result<usize> {
    let count = r.read_u32()? as usize;
    if count > bound {
        return Err(invalid_data(format!("{what} count too large: {count}")));
    }
    Ok(count)
}

fn read_opt_index(r: &mut ByteReader, what: &str) -> Result<Option<u32>> {
    let v = r.read_i32()?;
    match v {
        -1 => Ok(None),
        v if v >= 0 => Ok(Some(v as u32)),
        v => Err(invalid_data(format!("invalid {what} index: {v}"))),
    }
}

fn read_nodes(r: &mut ByteReader) -> Result<Vec<Node>> {
    let count = read_count(r, MAX_TABLE_LEN, "node")?;
    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        let mut matrix = [0.0f32; 16];
        r.read_f32_slice(&mut matrix)?;
        let mut translation = [0.0f32; 4];
        r.read_f32_slice(&mut translation)?;
        let mut rotation = [0.0f32; 4];
        r.read_f32_slice(&mut rotation)?;
        let mut scale = [0.0f32; 4];
        r.read_f32_slice(&mut scale)?;
        let name = r.read_string()?;
        let parent = read_opt_index(r, "parent")?;
        nodes.push(Node {
            name,
            parent,
            inverse_bind_matrix: Mat4::from_cols_array(&matrix),
            translation: Vec3::new(translation[0], translation[1], translation[2]),
            rotation: Quat::from_xyzw(rotation[0], rotation[1], rotation[2], rotation[3]),
            scale: Vec3::new(scale[0], scale[1], scale[2]),
            retarget_adjustment: Mat4::IDENTITY,
        });
    }
    Ok(nodes)
}

fn read_index_table(r: &mut ByteReader, what: &str) -> Result<Vec<u32>> {
    let count = read_count(r, MAX_TABLE_LEN, what)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let v = r.read_i32()?;
        if v < 0 {
            return Err(invalid_data(format!("invalid {what} index: {v}")));
        }
        out.push(v as u32);
    }
    Ok(out)
}

fn read_tables(r: &mut ByteReader, per_channel_compression: bool) -> Result<AnimTables> {
    let track_count = read_count(r, MAX_TABLE_LEN, "keyframe track")?;
    let mut tracks = Vec::with_capacity(track_count);
    for _ in 0..track_count {
        let len = read_count(r, MAX_TABLE_LEN, "keyframe")?;
        let mut times = vec![0.0f32; len];
        r.read_f32_slice(&mut times)?;
        tracks.push(KeyframeTrack::new(times));
    }

    let channel_count = read_count(r, MAX_TABLE_LEN, "output channel")?;
    let mut channels = Vec::with_capacity(channel_count);
    for _ in 0..channel_count {
        let compression = if per_channel_compression {
            let tag = r.read_u8()?;
            ChannelCompression::from_tag(tag)
                .ok_or_else(|| invalid_data(format!("unknown channel compression tag: {tag}")))?
        } else {
            ChannelCompression::None
        };
        let len = read_count(r, MAX_TABLE_LEN, "output element")?;
        let values = match compression {
            ChannelCompression::None => {
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let mut v = [0.0f32; 4];
                    r.read_f32_slice(&mut v)?;
                    values.push(Vec4::from_array(v));
                }
                values
            }
            ChannelCompression::Quat => {
                let blob_len = r.read_u32()? as usize;
                let blob = r.take(blob_len)?;
                quat_codec::decode_rotation_channel(blob, len)?
            }
        };
        channels.push(OutputChannel::new(values));
    }
    Ok(AnimTables { tracks, channels })
}

fn read_clip_header(r: &mut ByteReader) -> Result<(String, Vec<NodeChannels>)> {
    let name = r.read_string()?;
    let binding_count = read_count(r, MAX_TABLE_LEN, "clip binding")?;
    let mut channels = Vec::with_capacity(binding_count);
    for _ in 0..binding_count {
        channels.push(NodeChannels {
            translation_input: read_opt_index(r, "accessor")?,
            translation_output: read_opt_index(r, "accessor")?,
            rotation_input: read_opt_index(r, "accessor")?,
            rotation_output: read_opt_index(r, "accessor")?,
            scale_input: read_opt_index(r, "accessor")?,
            scale_output: read_opt_index(r, "accessor")?,
        });
    }
    Ok((name, channels))
}

fn read_clips(r: &mut ByteReader) -> Result<Vec<AnimationClip>> {
    let count = read_count(r, MAX_CLIPS, "clip")?;
    let mut clips = Vec::with_capacity(count);
    for _ in 0..count {
        let (name, channels) = read_clip_header(r)?;
        let mut clip = AnimationClip::new(name);
        clip.channels = channels;
        clips.push(clip);
    }
    Ok(clips)
}

/// v1 layout: each clip embeds its own keyframe/output tables. They are
/// merged into the shared tables here, offsetting accessor indices past the
/// entries already present.
fn read_clips_with_private_tables(
    r: &mut ByteReader,
) -> Result<(AnimTables, Vec<AnimationClip>)> {
    let mut shared = AnimTables::default();
    let count = read_count(r, MAX_CLIPS, "clip")?;
    let mut clips = Vec::with_capacity(count);
    for _ in 0..count {
        let (name, mut channels) = read_clip_header(r)?;
        let tables = read_tables(r, false)?;

        let track_offset = shared.tracks.len() as u32;
        let channel_offset = shared.channels.len() as u32;
        for binding in &mut channels {
            offset_binding(binding, track_offset, channel_offset);
        }
        shared.tracks.extend(tables.tracks);
        shared.channels.extend(tables.channels);

        let mut clip = AnimationClip::new(name);
        clip.channels = channels;
        clips.push(clip);
    }
    Ok((shared, clips))
}

fn offset_binding(b: &mut NodeChannels, track_offset: u32, channel_offset: u32) {
    for input in [
        &mut b.translation_input,
        &mut b.rotation_input,
        &mut b.scale_input,
    ] {
        if let Some(i) = input.as_mut() {
            *i += track_offset;
        }
    }
    for output in [
        &mut b.translation_output,
        &mut b.rotation_output,
        &mut b.scale_output,
    ] {
        if let Some(o) = output.as_mut() {
            *o += channel_offset;
        }
    }
}

fn read_humanoid_map(
    r: &mut ByteReader,
    node_count: usize,
) -> Result<Option<HashMap<String, u32>>> {
    let flag = r.read_u8()?;
    match flag {
        0 => Ok(None),
        1 => {
            let count = read_count(r, MAX_TABLE_LEN, "humanoid bone")?;
            let mut map = HashMap::with_capacity(count);
            for _ in 0..count {
                let name = r.read_string()?;
                let index = r.read_u32()?;
                if index as usize >= node_count {
                    return Err(invalid_data(format!(
                        "humanoid bone index out of range: {index}"
                    )));
                }
                map.insert(name, index);
            }
            Ok(Some(map))
        }
        other => Err(invalid_data(format!("invalid humanoid map flag: {other}"))),
    }
}

/// Write `container` as the current format version.
pub fn write_container<W: Write>(container: &SkeletonContainer, w: &mut W) -> Result<()> {
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;

    w.write_u32::<LittleEndian>(container.nodes.len() as u32)?;
    for node in &container.nodes {
        write_f32_slice(w, &node.inverse_bind_matrix.to_cols_array())?;
        let t = node.translation;
        write_f32_slice(w, &[t.x, t.y, t.z, 0.0])?;
        let q = node.rotation;
        write_f32_slice(w, &[q.x, q.y, q.z, q.w])?;
        let s = node.scale;
        write_f32_slice(w, &[s.x, s.y, s.z, 0.0])?;
        write_string(w, &node.name)?;
        write_opt_index(w, node.parent)?;
    }

    write_index_table(w, &container.sorted_nodes)?;
    write_index_table(w, &container.joint_nodes)?;

    let rotation_channels = rotation_channel_set(container);

    w.write_u32::<LittleEndian>(container.tables.tracks.len() as u32)?;
    for track in &container.tables.tracks {
        w.write_u32::<LittleEndian>(track.times.len() as u32)?;
        write_f32_slice(w, &track.times)?;
    }

    w.write_u32::<LittleEndian>(container.tables.channels.len() as u32)?;
    for (i, channel) in container.tables.channels.iter().enumerate() {
        if rotation_channels[i] {
            w.write_u8(ChannelCompression::Quat.tag())?;
            w.write_u32::<LittleEndian>(channel.values.len() as u32)?;
            let blob = quat_codec::encode_rotation_channel(&channel.values);
            w.write_u32::<LittleEndian>(blob.len() as u32)?;
            w.write_all(&blob)?;
        } else {
            w.write_u8(ChannelCompression::None.tag())?;
            w.write_u32::<LittleEndian>(channel.values.len() as u32)?;
            for v in &channel.values {
                write_f32_slice(w, &v.to_array())?;
            }
        }
    }

    w.write_u32::<LittleEndian>(container.clips.len() as u32)?;
    for clip in &container.clips {
        write_string(w, &clip.name)?;
        w.write_u32::<LittleEndian>(clip.channels.len() as u32)?;
        for b in &clip.channels {
            write_opt_index(w, b.translation_input)?;
            write_opt_index(w, b.translation_output)?;
            write_opt_index(w, b.rotation_input)?;
            write_opt_index(w, b.rotation_output)?;
            write_opt_index(w, b.scale_input)?;
            write_opt_index(w, b.scale_output)?;
        }
    }

    match &container.humanoid_bones {
        None => w.write_u8(0)?,
        Some(map) => {
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(map.len() as u32)?;
            // Sorted for byte-stable output.
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (name, &index) in entries {
                write_string(w, name)?;
                w.write_u32::<LittleEndian>(index)?;
            }
        }
    }
    Ok(())
}

fn write_opt_index<W: Write>(w: &mut W, index: Option<u32>) -> Result<()> {
    let v = match index {
        Some(i) => i as i32,
        None => -1,
    };
    w.write_i32::<LittleEndian>(v)?;
    Ok(())
}

fn write_index_table<W: Write>(w: &mut W, indices: &[u32]) -> Result<()> {
    w.write_u32::<LittleEndian>(indices.len() as u32)?;
    for &i in indices {
        w.write_i32::<LittleEndian>(i as i32)?;
    }
    Ok(())
}

/// Channels to store compressed: referenced as a rotation output by some clip
/// bound to the shared tables, and never referenced as a translation or scale
/// output (a channel shared across roles must stay exact).
fn rotation_channel_set(container: &SkeletonContainer) -> Vec<bool> {
    let len = container.tables.channels.len();
    let mut rotation = vec![false; len];
    let mut exact = vec![false; len];
    for clip in &container.clips {
        if clip.private_tables.is_some() {
            continue;
        }
        for b in &clip.channels {
            if let Some(o) = b.rotation_output {
                if let Some(slot) = rotation.get_mut(o as usize) {
                    *slot = true;
                }
            }
            for o in [b.translation_output, b.scale_output].into_iter().flatten() {
                if let Some(slot) = exact.get_mut(o as usize) {
                    *slot = true;
                }
            }
        }
    }
    for (r, e) in rotation.iter_mut().zip(&exact) {
        *r = *r && !e;
    }
    rotation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UniformSpacing;

    const QUAT_TOLERANCE: f32 = 1.0 / 32767.0;

    /// A small valid container: root + spine + arm, one clip animating the
    /// spine's rotation and the arm's translation.
    fn test_container() -> SkeletonContainer {
        let mut root = Node::new("Root");
        root.translation = Vec3::new(0.0, 1.0, 0.0);

        let mut spine = Node::new("Spine");
        spine.parent = Some(0);
        spine.translation = Vec3::new(0.0, 0.25, 0.0);
        spine.inverse_bind_matrix = Mat4::from_translation(Vec3::new(0.0, -1.25, 0.0));

        let mut arm = Node::new("Arm");
        arm.parent = Some(1);
        arm.translation = Vec3::new(0.5, 0.0, 0.0);
        arm.rotation = Quat::from_rotation_z(0.3);

        let tracks = vec![
            KeyframeTrack::new(vec![0.0, 0.5, 1.0]),
            KeyframeTrack::new(vec![0.0, 1.0]),
        ];
        let rot = |z: f32| {
            let q = Quat::from_rotation_z(z);
            Vec4::new(q.x, q.y, q.z, q.w)
        };
        let channels = vec![
            OutputChannel::new(vec![rot(0.0), rot(0.4), rot(0.8)]),
            OutputChannel::new(vec![
                Vec4::new(0.5, 0.0, 0.0, 0.0),
                Vec4::new(0.5, 0.2, 0.0, 0.0),
            ]),
        ];

        let mut clip = AnimationClip::new("wave");
        clip.channels = vec![
            NodeChannels::UNBOUND,
            NodeChannels {
                rotation_input: Some(0),
                rotation_output: Some(0),
                ..NodeChannels::UNBOUND
            },
            NodeChannels {
                translation_input: Some(1),
                translation_output: Some(1),
                ..NodeChannels::UNBOUND
            },
        ];

        let mut humanoid = HashMap::new();
        humanoid.insert("hips".to_string(), 0u32);
        humanoid.insert("spine".to_string(), 1u32);

        let mut container = SkeletonContainer {
            nodes: vec![root, spine, arm],
            sorted_nodes: vec![0, 1, 2],
            joint_nodes: vec![1, 2],
            tables: AnimTables {
                tracks,
                channels,
            },
            clips: vec![clip],
            clip_channel_cache: Vec::new(),
            humanoid_bones: Some(humanoid),
            retarget_committed: false,
        };
        build::build(&mut container);
        container
    }

    #[test]
    fn test_roundtrip_preserves_container() {
        let original = test_container();
        let bytes = original.to_bytes().unwrap();
        let decoded = SkeletonContainer::from_bytes(&bytes).unwrap();

        assert_eq!(decoded.nodes, original.nodes);
        assert_eq!(decoded.sorted_nodes, original.sorted_nodes);
        assert_eq!(decoded.joint_nodes, original.joint_nodes);
        assert_eq!(decoded.humanoid_bones, original.humanoid_bones);
        assert_eq!(decoded.tables.tracks, original.tables.tracks);
        assert_eq!(decoded.clips.len(), 1);
        assert_eq!(decoded.clips[0].name, "wave");
        assert_eq!(decoded.clips[0].channels, original.clips[0].channels);

        // Channel 1 is a translation channel: bit-exact.
        assert_eq!(decoded.tables.channels[1], original.tables.channels[1]);

        // Channel 0 is a rotation channel: lossy within 1/32767 per component.
        for (orig, dec) in original.tables.channels[0]
            .values
            .iter()
            .zip(&decoded.tables.channels[0].values)
        {
            for c in 0..4 {
                assert!((orig[c] - dec[c]).abs() <= QUAT_TOLERANCE);
            }
        }

        // Deserialization also validated and built the container.
        assert!(crate::validate::validate(&decoded).is_ok());
        assert!((decoded.clips[0].duration - 1.0).abs() < 1e-6);
        assert_eq!(decoded.clips[0].used_input_tracks, vec![0, 1]);
    }

    #[test]
    fn test_roundtrip_empty_container() {
        let container = SkeletonContainer::new();
        let bytes = container.to_bytes().unwrap();
        let decoded = SkeletonContainer::from_bytes(&bytes).unwrap();
        assert!(decoded.nodes.is_empty());
        assert!(decoded.clips.is_empty());
        assert!(decoded.humanoid_bones.is_none());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u32.to_le_bytes());
        let err = SkeletonContainer::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported container version"));
    }

    #[test]
    fn test_oversized_node_count_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&200_000u32.to_le_bytes());
        let err = SkeletonContainer::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("node count too large"));
    }

    #[test]
    fn test_oversized_clip_count_rejected() {
        // Valid empty tables, then an absurd clip count.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u32.to_le_bytes());
        for _ in 0..5 {
            bytes.extend_from_slice(&0u32.to_le_bytes()); // nodes..channels
        }
        bytes.extend_from_slice(&50_000u32.to_le_bytes());
        let err = SkeletonContainer::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("clip count too large"));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let bytes = test_container().to_bytes().unwrap();
        let err = SkeletonContainer::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(err.to_string().contains("invalid animation data"));
    }

    #[test]
    fn test_unknown_compression_tag_rejected() {
        // Empty node/index tables, then a channel with tag 7.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // nodes
        bytes.extend_from_slice(&0u32.to_le_bytes()); // sorted
        bytes.extend_from_slice(&0u32.to_le_bytes()); // joints
        bytes.extend_from_slice(&0u32.to_le_bytes()); // tracks
        bytes.extend_from_slice(&1u32.to_le_bytes()); // one channel
        bytes.push(7); // bad tag
        let err = SkeletonContainer::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("unknown channel compression tag"));
    }

    /// Hand-written v1 stream: private per-clip tables, root transform.
    #[test]
    fn test_read_v1_merges_private_tables() {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        // Skeleton root transform, read and discarded.
        for v in Mat4::IDENTITY.to_cols_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        // One root node.
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for v in Mat4::IDENTITY.to_cols_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.0f32; 4] {
            bytes.extend_from_slice(&v.to_le_bytes()); // translation
        }
        for v in [0.0f32, 0.0, 0.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes()); // rotation
        }
        for v in [1.0f32, 1.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes()); // scale
        }
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"Root");
        bytes.extend_from_slice(&(-1i32).to_le_bytes()); // parent
        // Sorted nodes, joint nodes.
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // Two clips, each with one private track + channel bound to index 0.
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for name in [b"a", b"b"] {
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(name.as_slice());
            // One binding: translation input/output = 0, rest unused.
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&0i32.to_le_bytes());
            bytes.extend_from_slice(&0i32.to_le_bytes());
            for _ in 0..4 {
                bytes.extend_from_slice(&(-1i32).to_le_bytes());
            }
            // Private tables: one track of two keys, one channel of two values.
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&2u32.to_le_bytes());
            bytes.extend_from_slice(&0.0f32.to_le_bytes());
            bytes.extend_from_slice(&1.0f32.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&2u32.to_le_bytes());
            for _ in 0..8 {
                bytes.extend_from_slice(&0.5f32.to_le_bytes());
            }
        }

        let container = SkeletonContainer::from_bytes(&bytes).unwrap();
        assert_eq!(container.tables.tracks.len(), 2);
        assert_eq!(container.tables.channels.len(), 2);
        assert_eq!(container.clips.len(), 2);
        // First clip keeps index 0; second clip was offset to index 1.
        assert_eq!(container.clips[0].channels[0].translation_input, Some(0));
        assert_eq!(container.clips[1].channels[0].translation_input, Some(1));
        assert_eq!(container.clips[1].channels[0].translation_output, Some(1));
        assert!(container.humanoid_bones.is_none());
    }

    /// Hand-written v3 stream: root transform, shared untagged tables,
    /// humanoid map.
    #[test]
    fn test_read_v3_shared_tables_and_humanoid_map() {
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        // Skeleton root transform, read and discarded.
        for v in Mat4::IDENTITY.to_cols_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        // One root node.
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for v in Mat4::IDENTITY.to_cols_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.0f32; 4] {
            bytes.extend_from_slice(&v.to_le_bytes()); // translation
        }
        for v in [0.0f32, 0.0, 0.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes()); // rotation
        }
        for v in [1.0f32, 1.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes()); // scale
        }
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"Hips");
        bytes.extend_from_slice(&(-1i32).to_le_bytes()); // parent
        // Sorted nodes, joint nodes.
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // Shared tables: one track, one channel, no compression tags in v3.
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0.0f32.to_le_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for _ in 0..8 {
            bytes.extend_from_slice(&0.25f32.to_le_bytes());
        }
        // One clip, one binding on the rotation pair.
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"idle");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        // Humanoid map with one entry.
        bytes.push(1);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"hips");
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let container = SkeletonContainer::from_bytes(&bytes).unwrap();
        assert_eq!(container.nodes.len(), 1);
        assert_eq!(container.tables.tracks.len(), 1);
        assert_eq!(container.tables.channels[0].values[0], Vec4::splat(0.25));
        assert_eq!(container.clips[0].name, "idle");
        assert_eq!(
            container.humanoid_bones.as_ref().unwrap().get("hips"),
            Some(&0)
        );
    }

    #[test]
    fn test_v3_rejects_out_of_range_humanoid_index() {
        // Minimal v3 stream with no nodes and a humanoid entry pointing at
        // node 5.
        let mut bytes: Vec<u8> = Vec::new();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        for v in Mat4::IDENTITY.to_cols_array() {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        for _ in 0..6 {
            bytes.extend_from_slice(&0u32.to_le_bytes()); // all tables empty
        }
        bytes.push(1);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"hips");
        bytes.extend_from_slice(&5u32.to_le_bytes());

        let err = SkeletonContainer::from_bytes(&bytes).unwrap_err();
        assert!(
            err.to_string().contains("humanoid bone index out of range"),
            "got: {err}"
        );
    }

    #[test]
    fn test_uniform_spacing_cached_after_load() {
        let bytes = test_container().to_bytes().unwrap();
        let decoded = SkeletonContainer::from_bytes(&bytes).unwrap();
        assert_eq!(
            decoded.tables.tracks[0].uniform,
            Some(UniformSpacing {
                spacing: 0.5,
                inv_spacing: 2.0
            })
        );
    }

    #[test]
    fn test_file_roundtrip() {
        let original = test_container();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.rba");

        let mut file = std::fs::File::create(&path).unwrap();
        original.write_to(&mut file).unwrap();
        file.flush().unwrap();
        drop(file);

        let bytes = std::fs::read(&path).unwrap();
        let decoded = SkeletonContainer::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.nodes, original.nodes);
        assert_eq!(decoded.clips[0].name, "wave");
    }
}
