//! Render-state flags packed into one float per instance.
//!
//! The instance buffer stores the bitfield as an `f32` so every attribute
//! channel uploads as floats. Bits are therefore tested arithmetically,
//! `floor(mod(f, 2^(i+1))) >= 2^i`, with `mod` defined as
//! `x - y * floor(x / y)`. `check_bit` in `assets/shaders/modules/bitfield.wgsl`
//! evaluates the identical expression so host and device always agree.

/// Number of flag bits in use.
pub const FLAG_COUNT: u32 = 7;

/// Meaning of each bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderFlag {
    /// Not drawn (degenerate segment or explicitly hidden).
    ForceHidden = 0,
    /// Recolored with the hover color.
    Hovered = 1,
    /// Emissive term follows the diffuse color.
    Emissive = 2,
    /// Radial scale multiplied by the scale-attribute uniform.
    ScaleUp = 3,
    /// Radial scale divided by the scale-attribute uniform.
    ScaleDown = 4,
    /// Alpha set to the transparency uniform.
    Transparent = 5,
    /// Removed from both the visible and the picking pass.
    Culled = 6,
}

impl RenderFlag {
    /// All flags in bit order.
    pub const ALL: [Self; FLAG_COUNT as usize] = [
        Self::ForceHidden,
        Self::Hovered,
        Self::Emissive,
        Self::ScaleUp,
        Self::ScaleDown,
        Self::Transparent,
        Self::Culled,
    ];

    /// Bit position.
    #[must_use]
    pub fn bit(self) -> u32 {
        self as u32
    }
}

/// `2^location`, exact for every bit position in use.
fn pow2(location: u32) -> f32 {
    2f32.powi(location as i32)
}

/// GLSL-style modulo.
fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

/// Whether bit `location` is set in the float-encoded field `bits`.
#[must_use]
pub fn test_bit(bits: f32, location: u32) -> bool {
    let lower = pow2(location);
    glsl_mod(bits, lower * 2.0).floor() >= lower
}

/// `bits` with bit `location` set.
#[must_use]
pub fn set_bit(bits: f32, location: u32) -> f32 {
    if test_bit(bits, location) {
        bits
    } else {
        bits + pow2(location)
    }
}

/// `bits` with bit `location` cleared.
#[must_use]
pub fn clear_bit(bits: f32, location: u32) -> f32 {
    if test_bit(bits, location) {
        bits - pow2(location)
    } else {
        bits
    }
}

/// Typed view over a float-encoded bitfield.
///
/// Scale-up and scale-down are mutually exclusive: setting one clears the
/// other.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DynamicBits(f32);

impl DynamicBits {
    /// No flags set.
    pub const EMPTY: Self = Self(0.0);

    /// Wrap a raw float-encoded field.
    #[must_use]
    pub fn from_raw(raw: f32) -> Self {
        Self(raw)
    }

    /// Raw float for upload.
    #[must_use]
    pub fn raw(self) -> f32 {
        self.0
    }

    /// Whether `flag` is set.
    #[must_use]
    pub fn has(self, flag: RenderFlag) -> bool {
        test_bit(self.0, flag.bit())
    }

    /// Copy with `flag` set.
    #[must_use]
    pub fn with(self, flag: RenderFlag) -> Self {
        let bits = match flag {
            RenderFlag::ScaleUp => {
                clear_bit(self.0, RenderFlag::ScaleDown.bit())
            }
            RenderFlag::ScaleDown => {
                clear_bit(self.0, RenderFlag::ScaleUp.bit())
            }
            _ => self.0,
        };
        Self(set_bit(bits, flag.bit()))
    }

    /// Copy with `flag` cleared.
    #[must_use]
    pub fn without(self, flag: RenderFlag) -> Self {
        Self(clear_bit(self.0, flag.bit()))
    }

    /// Copy with `flag` set or cleared.
    #[must_use]
    pub fn toggled(self, flag: RenderFlag, on: bool) -> Self {
        if on {
            self.with(flag)
        } else {
            self.without(flag)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SET: f32 = 127.0;

    #[test]
    fn set_then_test_every_bit() {
        for i in 0..FLAG_COUNT {
            assert!(test_bit(set_bit(0.0, i), i));
            assert!(!test_bit(clear_bit(ALL_SET, i), i));
        }
    }

    #[test]
    fn matches_integer_bits_for_all_fields() {
        for field in 0u32..128 {
            let f = field as f32;
            for i in 0..FLAG_COUNT {
                assert_eq!(test_bit(f, i), field & (1 << i) != 0);
                assert_eq!(set_bit(f, i), (field | (1 << i)) as f32);
                assert_eq!(clear_bit(f, i), (field & !(1 << i)) as f32);
            }
        }
    }

    #[test]
    fn setting_is_idempotent() {
        let once = set_bit(0.0, 3);
        assert_eq!(set_bit(once, 3), once);
        assert_eq!(clear_bit(clear_bit(once, 3), 3), 0.0);
    }

    #[test]
    fn scale_flags_are_exclusive() {
        let bits = DynamicBits::EMPTY.with(RenderFlag::ScaleUp);
        let bits = bits.with(RenderFlag::ScaleDown);
        assert!(bits.has(RenderFlag::ScaleDown));
        assert!(!bits.has(RenderFlag::ScaleUp));
        let bits = bits.with(RenderFlag::ScaleUp);
        assert!(!bits.has(RenderFlag::ScaleDown));
    }

    #[test]
    fn typed_view_round_trips() {
        let bits = DynamicBits::EMPTY
            .with(RenderFlag::Hovered)
            .with(RenderFlag::Emissive)
            .toggled(RenderFlag::Culled, true);
        assert_eq!(bits.raw(), 2.0 + 4.0 + 64.0);
        let bits = bits.toggled(RenderFlag::Hovered, false);
        assert_eq!(bits.raw(), 4.0 + 64.0);
        assert!(RenderFlag::ALL
            .iter()
            .enumerate()
            .all(|(i, f)| f.bit() == i as u32));
    }
}
