//! Defines RGB color types and the color math used by the compositor
//!
//! Colors travel through the compositor as packed 15-bit words (`0bbbbbgg gggrrrrr`), the format
//! stored in CGRAM. They are only expanded to 24-bit RGB when the finished pixel is written to the
//! frame buffer.

use std::cmp;

/// Low bit of every 5-bit channel in a packed color
const CHANNEL_LOW_BITS: u32 = 0x0421;
/// Bit just above every 5-bit channel. Collects the carry (or borrow) of a channel.
const CHANNEL_CARRY_BITS: u32 = 0x8420;
/// All channel bits except the low bit of each channel
const CHANNEL_HIGH_BITS: u32 = 0x7bde;

/// Color math operation selected by bit 7 of `CGADSUB`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MathOp {
    Add,
    Sub,
}

impl Default for MathOp {
    fn default() -> Self {
        MathOp::Add
    }
}

/// 5-bit per channel RGB value used by the SNES
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SnesRgb {
    r: u8,
    g: u8,
    b: u8,
}

impl SnesRgb {
    /// Creates a new `SnesRgb` instance from the given RGB values.
    ///
    /// When debug assertions are enabled, this will panic when any color value is outside the 5
    /// bit range. When assertions are disabled, the values will be truncated to their low 5 bits.
    pub fn new(r: u8, g: u8, b: u8) -> SnesRgb {
        debug_assert_eq!(r & 0b11111, r);
        debug_assert_eq!(g & 0b11111, g);
        debug_assert_eq!(b & 0b11111, b);

        SnesRgb {
            r: r & 0b11111,
            g: g & 0b11111,
            b: b & 0b11111,
        }
    }

    /// Unpacks a `0bbbbbgg gggrrrrr` color word. Bit 15 is ignored.
    pub fn from_packed(color: u16) -> SnesRgb {
        SnesRgb {
            r: (color & 0x1f) as u8,
            g: (color >> 5 & 0x1f) as u8,
            b: (color >> 10 & 0x1f) as u8,
        }
    }

    /// Packs this color into a `0bbbbbgg gggrrrrr` word.
    pub fn to_packed(&self) -> u16 {
        (self.b as u16) << 10 | (self.g as u16) << 5 | self.r as u16
    }

    pub fn r(&self) -> u8 { self.r }
    pub fn g(&self) -> u8 { self.g }
    pub fn b(&self) -> u8 { self.b }

    /// Converts 5-bit RGB to 8-bit RGB, adjusting the color space
    ///
    /// The colors are adjusted as follows (http://wiki.superfamicom.org/snes/show/Palettes):
    /// ```text
    /// Rout = Rin << 3
    /// Gout = Gin << 3
    /// Bout = Bin << 3
    /// Rout += Rout / 32
    /// Gout += Gout / 32
    /// Bout += Bout / 32
    /// ```
    pub fn to_adjusted_rgb(&self) -> Rgb {
        // Convert to 8-bit per-channel RGB
        let mut rgb = Rgb {
            r: self.r() << 3,
            g: self.g() << 3,
            b: self.b() << 3,
        };

        // Adjust color range
        rgb.r += rgb.r / 32;
        rgb.g += rgb.g / 32;
        rgb.b += rgb.b / 32;

        rgb
    }
}

/// Standard 24-bit RGB color rendered to the frame buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Packs the color as `0x00RRGGBB`, the frame buffer format.
    pub fn to_packed(&self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_packed(color: u32) -> Rgb {
        Rgb {
            r: (color >> 16) as u8,
            g: (color >> 8) as u8,
            b: color as u8,
        }
    }

    /// Scales all channels by `brightness / 15`.
    fn dim(&self, brightness: u8) -> Rgb {
        let brightness = cmp::min(brightness, 15) as u16;
        let scale = |c: u8| (c as u16 * brightness / 15) as u8;
        Rgb {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

/// Maps a packed 15-bit color to a frame buffer pixel, applying the master brightness from
/// `INIDISP` (0 = black, 15 = full brightness).
pub fn light(color: u16, brightness: u8) -> u32 {
    SnesRgb::from_packed(color).to_adjusted_rgb().dim(brightness).to_packed()
}

/// Blends two packed 15-bit colors with the SNES color math unit.
///
/// All three channels are processed at once: the carry (or borrow) out of every channel is
/// collected in the bit above it and turned into a per-channel mask, so channels saturate at 31
/// (or 0) independently of each other. With `halve` set, the result of each channel is divided
/// by 2 (rounding down). Bit 15 of the inputs must be clear.
pub fn blend(x: u16, y: u16, op: MathOp, halve: bool) -> u16 {
    let (x, y) = (x as u32, y as u32);
    let result = match (op, halve) {
        (MathOp::Add, false) => {
            let sum = x + y;
            let carry = (sum - ((x ^ y) & CHANNEL_LOW_BITS)) & CHANNEL_CARRY_BITS;
            (sum - carry) | (carry - (carry >> 5))
        }
        (MathOp::Add, true) => {
            (x + y - ((x ^ y) & CHANNEL_LOW_BITS)) >> 1
        }
        (MathOp::Sub, halve) => {
            let diff = x.wrapping_sub(y).wrapping_add(CHANNEL_CARRY_BITS);
            let borrow = diff.wrapping_sub((x ^ y) & CHANNEL_CARRY_BITS) & CHANNEL_CARRY_BITS;
            let clamped = diff.wrapping_sub(borrow) & borrow.wrapping_sub(borrow >> 5);
            if halve {
                (clamped & CHANNEL_HIGH_BITS) >> 1
            } else {
                clamped
            }
        }
    };

    result as u16 & 0x7fff
}

/// Converts a region of packed `0x00RRGGBB` pixels to tightly packed `RGB24` data: The first byte
/// is the red component of the top left pixel, followed by its green and blue components, then
/// the next pixel to the right.
///
/// Rows shorter than `width` (or missing rows) are filled with black.
pub fn to_rgb24(pixels: &[u32], width: usize, height: usize, pitch: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let rgb = Rgb::from_packed(pixels.get(y * pitch + x).cloned().unwrap_or(0));
            data.push(rgb.r);
            data.push(rgb.g);
            data.push(rgb.b);
        }
    }
    data
}
