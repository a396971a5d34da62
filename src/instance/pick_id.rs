//! Interval ids packed into RGBA colours for the picking pass.
//!
//! 24 bits of id spread across red (high byte), green and blue; alpha marks
//! a hit. The picking target is cleared to transparent black, so a texel
//! with zero alpha decodes as "nothing under the cursor".

/// Largest id representable in three 8-bit channels.
pub const MAX_PICK_ID: u32 = (1 << 24) - 1;

/// Colour of instances that must never resolve to a pick.
pub const UNPICKABLE: [f32; 4] = [0.0; 4];

/// Pack `id` as a normalized RGBA colour, or `None` past [`MAX_PICK_ID`].
#[must_use]
pub fn encode_pick_id(id: u32) -> Option<[f32; 4]> {
    if id > MAX_PICK_ID {
        return None;
    }
    let [_, r, g, b] = id.to_be_bytes();
    Some([
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        1.0,
    ])
}

/// Recover the id from an `Rgba8Unorm` texel read back from the GPU.
#[must_use]
pub fn decode_pick_color(texel: [u8; 4]) -> Option<u32> {
    let [r, g, b, a] = texel;
    if a == 0 {
        return None;
    }
    Some(u32::from_be_bytes([0, r, g, b]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mimic the unorm8 quantization the GPU applies on write.
    fn quantize(color: [f32; 4]) -> [u8; 4] {
        color.map(|c| (c * 255.0).round() as u8)
    }

    #[test]
    fn ids_survive_unorm_quantization() {
        for id in [0, 1, 255, 256, 65_535, 65_536, 1_234_567, MAX_PICK_ID] {
            let color = encode_pick_id(id).unwrap();
            assert_eq!(decode_pick_color(quantize(color)), Some(id));
        }
    }

    #[test]
    fn ids_past_24_bits_are_rejected() {
        assert_eq!(encode_pick_id(MAX_PICK_ID + 1), None);
    }

    #[test]
    fn cleared_texel_is_no_hit() {
        assert_eq!(decode_pick_color([0, 0, 0, 0]), None);
        assert_eq!(decode_pick_color(quantize(UNPICKABLE)), None);
    }
}
