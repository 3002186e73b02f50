//! Lossy codec for rotation output channels.
//!
//! Encode pipeline: quantize each quaternion component to snorm16 fixed
//! point, filter the i16 buffer with per-component deltas plus a low/high
//! byte-plane split (consecutive rotation keyframes differ little, so deltas
//! cluster near zero and the planes compress well), then lz4 with the
//! decompressed size prepended to the blob.
//!
//! Decode reverses all three steps and dequantizes by dividing by 32767.
//! Results are NOT renormalized; callers interpolating (e.g. nlerp) are
//! expected to normalize themselves.

use glam::Vec4;
use lz4_flex::{compress_prepend_size, decompress};

use crate::error::{Result, invalid_data};
use crate::formats::MAX_DECODED_CHANNEL_BYTES;

const COMPONENT_SCALE: f32 = 32767.0;

/// Bytes per filtered element: four i16 components.
const ELEMENT_SIZE: usize = 8;

/// Quantize one component to snorm16.
#[inline]
fn quantize(c: f32) -> i16 {
    (c.clamp(-1.0, 1.0) * COMPONENT_SCALE).round() as i16
}

/// Encode a quaternion channel into a self-sized compressed blob.
pub fn encode_rotation_channel(values: &[Vec4]) -> Vec<u8> {
    // Quantize to snorm16, four components per element.
    let mut quantized = Vec::with_capacity(values.len() * 4);
    for q in values {
        quantized.push(quantize(q.x));
        quantized.push(quantize(q.y));
        quantized.push(quantize(q.z));
        quantized.push(quantize(q.w));
    }

    // Per-component wrapping deltas between consecutive elements.
    let mut deltas = quantized.clone();
    for i in (4..deltas.len()).rev() {
        deltas[i] = deltas[i].wrapping_sub(deltas[i - 4]);
    }

    // Byte planes: all low bytes, then all high bytes.
    let mut planes = Vec::with_capacity(deltas.len() * 2);
    planes.extend(deltas.iter().map(|d| (*d as u16 & 0xFF) as u8));
    planes.extend(deltas.iter().map(|d| (*d as u16 >> 8) as u8));

    compress_prepend_size(&planes)
}

/// Decode a compressed quaternion channel blob into `element_count` values.
///
/// The decompressed size is taken from the blob's own header, never from
/// `element_count`, and is bounded before any decompression is attempted.
pub fn decode_rotation_channel(blob: &[u8], element_count: usize) -> Result<Vec<Vec4>> {
    if blob.len() < 4 {
        return Err(invalid_data("compressed channel blob too short"));
    }
    let decoded_size = u32::from_le_bytes([blob[0], blob[1], blob[2], blob[3]]) as usize;
    if decoded_size > MAX_DECODED_CHANNEL_BYTES {
        return Err(invalid_data(format!(
            "compressed channel too large: {decoded_size} decompressed bytes"
        )));
    }
    if decoded_size != element_count * ELEMENT_SIZE {
        return Err(invalid_data(format!(
            "compressed channel size mismatch: {decoded_size} bytes for {element_count} elements"
        )));
    }

    let planes = decompress(&blob[4..], decoded_size)
        .map_err(|e| invalid_data(format!("channel decompression failed: {e}")))?;
    if planes.len() < decoded_size {
        return Err(invalid_data(format!(
            "channel decompressed to {} bytes, expected {decoded_size}",
            planes.len()
        )));
    }

    // Rebuild i16 deltas from the byte planes.
    let component_count = element_count * 4;
    let (lo, hi) = planes.split_at(component_count);
    let mut components: Vec<i16> = lo
        .iter()
        .zip(hi)
        .map(|(&l, &h)| i16::from_le_bytes([l, h]))
        .collect();

    // Undo the per-component deltas.
    for i in 4..components.len() {
        components[i] = components[i].wrapping_add(components[i - 4]);
    }

    // Dequantize. No renormalization here.
    let values = components
        .chunks_exact(4)
        .map(|c| {
            Vec4::new(
                c[0] as f32 / COMPONENT_SCALE,
                c[1] as f32 / COMPONENT_SCALE,
                c[2] as f32 / COMPONENT_SCALE,
                c[3] as f32 / COMPONENT_SCALE,
            )
        })
        .collect();
    Ok(values)
}
