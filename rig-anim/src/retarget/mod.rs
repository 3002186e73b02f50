//! Cross-rig retargeting.
//!
//! Rewrites a character's container in place to use a donor skeleton's
//! animation clips while preserving the character's bone-length proportions.
//! The donor ("other") is a freshly loaded skeleton with animation; "this" is
//! the container describing the character's actual mesh-bound skeleton,
//! possibly under a different bone-naming convention.
//!
//! The character's rig is snapshotted, the donor's data is taken wholesale,
//! and every donor node is matched back to a character bone by humanoid
//! metadata, exact/prefixed name, or leaf-bone synonyms. Character bones with
//! no donor counterpart are synthesized so skinning keeps working. Per-node
//! corrective transforms and rebuilt inverse bind matrices compensate for the
//! proportion differences.

pub mod names;

use glam::Mat4;
use hashbrown::HashMap;

use crate::build;
use crate::error::{Result, invalid_data};
use crate::model::{Node, NodeChannels, SkeletonContainer};
use crate::validate;

impl SkeletonContainer {
    /// Rewrite `self` in place to use `donor`'s skeleton and clips, with
    /// per-node retarget adjustments for this character's bind pose.
    pub fn retarget_from(&mut self, donor: SkeletonContainer) -> Result<()> {
        retarget(self, donor)
    }

    /// Deserialize a donor container and retarget it onto `self`.
    pub fn load_and_retarget(&mut self, donor_bytes: &[u8]) -> Result<()> {
        let donor = SkeletonContainer::from_bytes(donor_bytes)?;
        self.retarget_from(donor)
    }
}

fn retarget(this: &mut SkeletonContainer, donor: SkeletonContainer) -> Result<()> {
    // Snapshot the character's rig, then take the donor's data wholesale.
    let old_nodes = std::mem::take(&mut this.nodes);
    let old_sorted = std::mem::take(&mut this.sorted_nodes);
    let old_joints = std::mem::take(&mut this.joint_nodes);
    let old_humanoid = this.humanoid_bones.take();

    this.nodes = donor.nodes;
    this.sorted_nodes = donor.sorted_nodes;
    this.joint_nodes = donor.joint_nodes;
    this.tables = donor.tables;
    this.clips = donor.clips;
    this.clip_channel_cache = donor.clip_channel_cache;
    this.humanoid_bones = donor.humanoid_bones;

    let old_by_name = SkeletonContainer::name_index_map(&old_nodes);
    let new_by_name = SkeletonContainer::name_index_map(&this.nodes);

    // Resolve an old counterpart for every new node. First match wins on the
    // old side when several new nodes resolve to the same bone.
    let mut new_to_old: Vec<Option<u32>> = vec![None; this.nodes.len()];
    let mut old_to_new: Vec<Option<u32>> = vec![None; old_nodes.len()];
    for (i, node) in this.nodes.iter().enumerate() {
        let resolved = resolve_old_counterpart(
            &node.name,
            &old_by_name,
            old_humanoid.as_ref(),
            old_nodes.len(),
        )?;
        new_to_old[i] = resolved;
        if let Some(o) = resolved {
            if old_to_new[o as usize].is_none() {
                old_to_new[o as usize] = Some(i as u32);
            }
        }
    }

    // Leaf bones that only match through the synonym tables.
    let synonyms = names::synonym_map();
    for (o, slot) in old_to_new.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        let Some(candidates) = synonyms.get(old_nodes[o].name.as_str()) else {
            continue;
        };
        for candidate in candidates {
            if let Some(&ni) = new_by_name.get(candidate.as_str()) {
                if new_to_old[ni as usize].is_none() {
                    new_to_old[ni as usize] = Some(o as u32);
                    *slot = Some(ni);
                    break;
                }
            }
        }
    }

    // Synthesize destination nodes for character bones with no donor
    // counterpart (cloth bones, tails, extra leaf joints), reparenting each
    // under its mapped parent. Appending keeps the sorted order topological
    // because the parent already precedes every existing entry.
    let mut synthetic = vec![false; this.nodes.len()];
    let max_sweeps = old_nodes.len() + 1;
    let mut sweeps = 0;
    while old_to_new.iter().any(Option::is_none) {
        sweeps += 1;
        if sweeps > max_sweeps {
            return Err(invalid_data(
                "apparent infinite loop while synthesizing retarget nodes",
            ));
        }
        let mut progressed = false;
        for o in 0..old_nodes.len() {
            if old_to_new[o].is_some() {
                continue;
            }
            let Some(op) = old_nodes[o].parent else {
                continue;
            };
            let Some(np) = old_to_new[op as usize] else {
                continue;
            };
            let old = &old_nodes[o];
            let ni = this.nodes.len() as u32;
            this.nodes.push(Node {
                name: old.name.clone(),
                parent: Some(np),
                inverse_bind_matrix: old.inverse_bind_matrix,
                translation: old.translation,
                rotation: old.rotation,
                scale: old.scale,
                retarget_adjustment: Mat4::IDENTITY,
            });
            this.sorted_nodes.push(ni);
            for clip in &mut this.clips {
                clip.channels.push(NodeChannels::UNBOUND);
            }
            new_to_old.push(Some(o as u32));
            synthetic.push(true);
            old_to_new[o] = Some(ni);
            progressed = true;
        }
        if !progressed {
            return Err(invalid_data(
                "apparent infinite loop while synthesizing retarget nodes",
            ));
        }
    }

    // Mesh-space bind matrices for both hierarchies, walked once over each
    // sorted order.
    let old_binds = mesh_space_binds(&old_nodes, &old_sorted);
    let new_binds = mesh_space_binds(&this.nodes, &this.sorted_nodes);

    // Corrective transform for synthesized nodes: the relative transform
    // between the old parent's and the new parent's bind pose in mesh space.
    // A synthetic parent already carries the correction, so its synthetic
    // children stay at identity.
    for i in 0..this.nodes.len() {
        if !synthetic[i] {
            continue;
        }
        let Some(o) = new_to_old[i] else { continue };
        let Some(op) = old_nodes[o as usize].parent else {
            continue;
        };
        let Some(np) = this.nodes[i].parent else { continue };
        if synthetic[np as usize] {
            continue;
        }
        this.nodes[i].retarget_adjustment =
            new_binds[np as usize].inverse() * old_binds[op as usize];
    }

    // Translation correction for matched nodes: move each bone's mesh-space
    // rest position back to where the character authored it, expressed in
    // the new parent's local space.
    for i in 0..this.nodes.len() {
        if synthetic[i] {
            continue;
        }
        let Some(o) = new_to_old[i] else { continue };
        let o = o as usize;
        let (Some(np), Some(op)) = (this.nodes[i].parent, old_nodes[o].parent) else {
            continue;
        };
        let np = np as usize;
        let op = op as usize;

        let old_ws = old_binds[op].transform_point3(old_nodes[o].translation);
        let mut new_ws = new_binds[np].transform_point3(this.nodes[i].translation);

        if new_to_old[np] != Some(op as u32) {
            // The parents do not correspond. One pattern is supported: the
            // donor rig inserts a single node between this bone and the bone
            // matching the old parent; accumulate the intervening parent's
            // local translation. Anything else is flagged rather than
            // silently mis-retargeted.
            match this.nodes[np].parent {
                Some(gp) if new_to_old[gp as usize] == Some(op as u32) => {
                    let accumulated = this.nodes[np].translation + this.nodes[i].translation;
                    new_ws = new_binds[gp as usize].transform_point3(accumulated);
                }
                _ => {
                    tracing::warn!(
                        node = %this.nodes[i].name,
                        "unsupported parent mismatch during retargeting"
                    );
                }
            }
        }

        let world_offset = old_ws - new_ws;
        let local_offset = this.nodes[np]
            .inverse_bind_matrix
            .transform_vector3(world_offset);
        this.nodes[i].retarget_adjustment = Mat4::from_translation(local_offset);
    }

    // Remap the skinning joints and rebuild their inverse bind matrices so a
    // vertex authored against the old mesh still lands correctly: new bone
    // orientation, old bind position, composed with a rotation-only
    // correction about the old position.
    let mut joints = Vec::with_capacity(old_joints.len());
    for &oj in &old_joints {
        let o = oj as usize;
        let nj = match old_to_new.get(o).copied().flatten() {
            Some(n) => n,
            None => {
                tracing::warn!(
                    joint = %old_nodes[o].name,
                    "no retarget counterpart for joint node, falling back to node 0"
                );
                0
            }
        };
        joints.push(nj);

        let old_bind = old_binds[o];
        let new_bind = new_binds[nj as usize];
        let old_pos = old_bind.w_axis.truncate();

        let mut target = new_bind;
        target.w_axis = old_pos.extend(1.0);

        let (_, old_pose_rotation, _) = old_nodes[o]
            .inverse_bind_matrix
            .to_scale_rotation_translation();
        let correction = Mat4::from_translation(old_pos)
            * Mat4::from_quat(old_pose_rotation)
            * Mat4::from_translation(-old_pos);

        this.nodes[nj as usize].inverse_bind_matrix = target.inverse() * correction;
    }
    this.joint_nodes = joints;

    build::build(this);
    validate::validate(this)?;
    this.retarget_committed = true;
    tracing::debug!(
        nodes = this.nodes.len(),
        joints = this.joint_nodes.len(),
        "retargeted container"
    );
    Ok(())
}

/// Resolve the old-node counterpart for a new node name. Priority: humanoid
/// metadata, exact name (with and without the vendor prefix stripped), exact
/// name with the vendor prefix added.
fn resolve_old_counterpart(
    name: &str,
    old_by_name: &HashMap<String, u32>,
    old_humanoid: Option<&HashMap<String, u32>>,
    old_node_count: usize,
) -> Result<Option<u32>> {
    if let Some(humanoid) = old_humanoid {
        if let Some(canonical) = names::canonical_humanoid_name(name) {
            if let Some(&index) = humanoid.get(canonical) {
                if index as usize >= old_node_count {
                    return Err(invalid_data(format!(
                        "humanoid bone index out of range: {index}"
                    )));
                }
                return Ok(Some(index));
            }
        }
    }
    if let Some(&index) = old_by_name.get(name) {
        return Ok(Some(index));
    }
    if let Some(stripped) = name.strip_prefix(names::VENDOR_BONE_PREFIX) {
        if let Some(&index) = old_by_name.get(stripped) {
            return Ok(Some(index));
        }
    }
    if let Some(&index) = old_by_name.get(&format!("{}{name}", names::VENDOR_BONE_PREFIX)) {
        return Ok(Some(index));
    }
    Ok(None)
}

/// Node-hierarchy to mesh-space bind matrices, composed iteratively over the
/// topological order.
fn mesh_space_binds(nodes: &[Node], sorted: &[u32]) -> Vec<Mat4> {
    let mut binds = vec![Mat4::IDENTITY; nodes.len()];
    for &index in sorted {
        let node = &nodes[index as usize];
        let local = node.local_matrix();
        binds[index as usize] = match node.parent {
            Some(parent) => binds[parent as usize] * local,
            None => local,
        };
    }
    binds
}
