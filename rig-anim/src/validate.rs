//! Invariant checks for a loaded or rewritten container.
//!
//! Any violation fails with a single invalid-data error; there is no partial
//! acceptance. Binding checks run against the table pair in effect for each
//! clip (private if detached, else shared).

use crate::error::{Result, invalid_data};
use crate::model::{AnimTables, SkeletonContainer};

/// Check every hierarchy and accessor invariant of `container`.
pub fn validate(container: &SkeletonContainer) -> Result<()> {
    let node_count = container.nodes.len();

    // The sorted-node list must be a bijection on node indices.
    if container.sorted_nodes.len() != node_count {
        return Err(invalid_data(format!(
            "sorted node list has {} entries for {} nodes",
            container.sorted_nodes.len(),
            node_count
        )));
    }
    let mut position = vec![usize::MAX; node_count];
    for (pos, &index) in container.sorted_nodes.iter().enumerate() {
        let Some(slot) = position.get_mut(index as usize) else {
            return Err(invalid_data(format!(
                "sorted node index out of range: {index}"
            )));
        };
        if *slot != usize::MAX {
            return Err(invalid_data(format!(
                "node {index} appears twice in sorted order"
            )));
        }
        *slot = pos;
    }

    for &index in &container.joint_nodes {
        if index as usize >= node_count {
            return Err(invalid_data(format!(
                "joint node index out of range: {index}"
            )));
        }
    }

    // Parent sanity and topological order: every parent strictly earlier.
    for (i, node) in container.nodes.iter().enumerate() {
        if let Some(parent) = node.parent {
            if parent as usize >= node_count {
                return Err(invalid_data(format!(
                    "parent index out of range: {parent}"
                )));
            }
            if parent as usize == i {
                return Err(invalid_data(format!("node '{}' is its own parent", node.name)));
            }
            if position[parent as usize] >= position[i] {
                return Err(invalid_data(format!(
                    "parent is after node '{}' in sorted order",
                    node.name
                )));
            }
        }
    }

    for clip in &container.clips {
        let tables = clip.tables(&container.tables);
        for binding in &clip.channels {
            for (what, input, output) in binding.pairs() {
                check_accessor_pair(tables, what, &clip.name, input, output)?;
            }
        }
    }

    Ok(())
}

fn check_accessor_pair(
    tables: &AnimTables,
    what: &str,
    clip_name: &str,
    input: Option<u32>,
    output: Option<u32>,
) -> Result<()> {
    if let Some(input) = input {
        let track = tables.tracks.get(input as usize).ok_or_else(|| {
            invalid_data(format!(
                "clip '{clip_name}': {what} input accessor out of range: {input}"
            ))
        })?;
        if track.is_empty() {
            return Err(invalid_data(format!(
                "clip '{clip_name}': {what} input track {input} has no keyframes"
            )));
        }
        let output = output.ok_or_else(|| {
            invalid_data(format!(
                "clip '{clip_name}': {what} input accessor without output accessor"
            ))
        })?;
        let channel = tables.channels.get(output as usize).ok_or_else(|| {
            invalid_data(format!(
                "clip '{clip_name}': {what} output accessor out of range: {output}"
            ))
        })?;
        if channel.len() != track.len() {
            return Err(invalid_data(format!(
                "clip '{clip_name}': {what} output length {} != keyframe count {}",
                channel.len(),
                track.len()
            )));
        }
    } else if let Some(output) = output {
        // Output without input only needs to be in bounds.
        if output as usize >= tables.channels.len() {
            return Err(invalid_data(format!(
                "clip '{clip_name}': {what} output accessor out of range: {output}"
            )));
        }
    }
    Ok(())
}
