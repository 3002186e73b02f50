//! Derives cached metadata after a container is loaded or rewritten.
//!
//! Per clip: duration, the set of input tracks actually used, and the
//! container-level binding snapshot. Per track: first/last timestamps and the
//! uniform-spacing fast path for constant-time frame lookup at playback time.

use crate::model::{AnimTables, NodeChannels, SkeletonContainer, UniformSpacing};

/// Maximum absolute deviation from the evenly-spaced prediction for a track
/// to still count as uniformly sampled.
const UNIFORM_SPACING_TOLERANCE: f32 = 1e-3;

/// Recompute every cached field of `container`.
pub fn build(container: &mut SkeletonContainer) {
    build_tables(&mut container.tables);
    for clip in &mut container.clips {
        if let Some(tables) = clip.private_tables.as_deref_mut() {
            build_tables(tables);
        }
    }

    let node_count = container.nodes.len();
    let shared = &container.tables;
    let mut cache = Vec::with_capacity(container.clips.len());
    for clip in &mut container.clips {
        let tables = match &clip.private_tables {
            Some(private) => &**private,
            None => shared,
        };

        let mut duration = 0.0f32;
        let mut used: Vec<u32> = Vec::new();
        for binding in &clip.channels {
            for input in binding.inputs().into_iter().flatten() {
                if let Some(track) = tables.tracks.get(input as usize) {
                    duration = duration.max(track.last_time);
                }
                used.push(input);
            }
        }
        used.sort_unstable();
        used.dedup();

        let mut snapshot = clip.channels.clone();
        if snapshot.len() < node_count {
            snapshot.resize(node_count, NodeChannels::UNBOUND);
        }

        clip.duration = duration;
        clip.used_input_tracks = used;
        cache.push(snapshot);
    }
    container.clip_channel_cache = cache;
}

fn build_tables(tables: &mut AnimTables) {
    for track in &mut tables.tracks {
        track.first_time = track.times.first().copied().unwrap_or(0.0);
        track.last_time = track.times.last().copied().unwrap_or(0.0);
        track.uniform = detect_uniform_spacing(&track.times);
    }
}

/// A track with at least two samples is uniform when every sample lies within
/// tolerance of the even grid anchored at its first and last sample.
fn detect_uniform_spacing(times: &[f32]) -> Option<UniformSpacing> {
    if times.len() < 2 {
        return None;
    }
    let first = times[0];
    let last = times[times.len() - 1];
    let spacing = (last - first) / (times.len() - 1) as f32;
    if spacing <= 0.0 {
        return None;
    }
    for (i, &t) in times.iter().enumerate() {
        let predicted = first + spacing * i as f32;
        if (t - predicted).abs() > UNIFORM_SPACING_TOLERANCE {
            return None;
        }
    }
    Some(UniformSpacing {
        spacing,
        inv_spacing: 1.0 / spacing,
    })
}
