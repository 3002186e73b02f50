//! In-place maintenance passes over a loaded container.
//!
//! Both passes rewrite the shared tables and therefore require exclusive
//! access to the container (single-writer convention; nothing else may hold a
//! detached view of the shared tables while they run).

use glam::{Vec3, Vec4};

use crate::model::{AnimTables, NodeChannels, SkeletonContainer};

/// Scale factor FBX exporters apply on centimetre-unit rigs.
const ARMATURE_EXPORT_SCALE: f32 = 100.0;

/// Undo a centimetre-unit export: if a node named "Armature" carries a ~100x
/// uniform scale, reset it to one and bring every translation back to metres
/// (node locals, translation output channels, and the translation column of
/// every inverse bind matrix, all x0.01).
///
/// Returns whether the fixup was applied.
pub fn fix_unit_scale(container: &mut SkeletonContainer) -> bool {
    let Some(armature) = container.nodes.iter().position(|n| {
        n.name == "Armature"
            && (n.scale - Vec3::splat(ARMATURE_EXPORT_SCALE))
                .abs()
                .max_element()
                < 0.5
    }) else {
        return false;
    };

    container.nodes[armature].scale = Vec3::ONE;
    for node in &mut container.nodes {
        node.translation *= 0.01;
        let t = node.inverse_bind_matrix.w_axis;
        node.inverse_bind_matrix.w_axis = Vec4::new(t.x * 0.01, t.y * 0.01, t.z * 0.01, t.w);
    }

    // Shared translation channels, marked through every attached clip.
    let mut marks = vec![false; container.tables.channels.len()];
    for clip in &container.clips {
        if clip.private_tables.is_some() {
            continue;
        }
        for binding in &clip.channels {
            mark_translation_output(binding, &mut marks);
        }
    }
    scale_marked_channels(&mut container.tables, &marks);

    // Detached clips carry their own copy of the tables.
    for clip in &mut container.clips {
        let Some(tables) = clip.private_tables.as_deref_mut() else {
            continue;
        };
        let mut marks = vec![false; tables.channels.len()];
        for binding in &clip.channels {
            mark_translation_output(binding, &mut marks);
        }
        scale_marked_channels(tables, &marks);
    }

    tracing::debug!("applied 100x armature unit fixup");
    true
}

fn mark_translation_output(binding: &NodeChannels, marks: &mut [bool]) {
    if let Some(output) = binding.translation_output {
        if let Some(mark) = marks.get_mut(output as usize) {
            *mark = true;
        }
    }
}

fn scale_marked_channels(tables: &mut AnimTables, marks: &[bool]) {
    for (channel, &marked) in tables.channels.iter_mut().zip(marks) {
        if marked {
            for v in &mut channel.values {
                v.x *= 0.01;
                v.y *= 0.01;
                v.z *= 0.01;
            }
        }
    }
}

/// Drop shared output channels no clip references and remap the surviving
/// accessor indices in every attached clip's bindings and in the binding
/// cache. Running the pass twice yields the same result as running it once.
pub fn compact_output_channels(container: &mut SkeletonContainer) {
    let channel_count = container.tables.channels.len();
    let mut used = vec![false; channel_count];
    for clip in &container.clips {
        if clip.private_tables.is_some() {
            continue;
        }
        for binding in &clip.channels {
            for (_, _, output) in binding.pairs() {
                if let Some(o) = output {
                    if let Some(mark) = used.get_mut(o as usize) {
                        *mark = true;
                    }
                }
            }
        }
    }
    if used.iter().all(|&u| u) {
        return;
    }

    let mut remap: Vec<Option<u32>> = Vec::with_capacity(channel_count);
    let mut next = 0u32;
    for &keep in &used {
        if keep {
            remap.push(Some(next));
            next += 1;
        } else {
            remap.push(None);
        }
    }

    let mut index = 0;
    container.tables.channels.retain(|_| {
        let keep = used[index];
        index += 1;
        keep
    });

    for clip in &mut container.clips {
        if clip.private_tables.is_some() {
            continue;
        }
        for binding in &mut clip.channels {
            remap_binding_outputs(binding, &remap);
        }
    }
    for (clip_index, cache) in container.clip_channel_cache.iter_mut().enumerate() {
        let detached = container
            .clips
            .get(clip_index)
            .is_some_and(|c| c.private_tables.is_some());
        if detached {
            continue;
        }
        for binding in cache.iter_mut() {
            remap_binding_outputs(binding, &remap);
        }
    }
}

fn remap_binding_outputs(binding: &mut NodeChannels, remap: &[Option<u32>]) {
    for output in [
        &mut binding.translation_output,
        &mut binding.rotation_output,
        &mut binding.scale_output,
    ] {
        if let Some(o) = output.as_mut() {
            if let Some(&Some(new)) = remap.get(*o as usize) {
                *o = new;
            }
        }
    }
}
