//! CGRAM definitions and methods

use crate::save::SaveState;

use std::io::{self, Read, Write};
use std::ops::{Deref, DerefMut};

/// Color RAM size in Bytes
pub const CGRAM_SIZE: usize = 512;

/// CGRAM - Stores the color palette
///
/// There are 256 colors in the palette, each 15 bits (5 bits per color channel), represented
/// by 2 Bytes of CGRAM (low byte first). Layout:
/// `?bbbbbgg` `gggrrrrr` (the `?`-bit is ignored)
#[derive(Clone)]
pub struct Cgram([u8; CGRAM_SIZE]);

impl Default for Cgram {
    fn default() -> Self { Cgram([0; CGRAM_SIZE]) }
}

impl Deref for Cgram {
    type Target = [u8; CGRAM_SIZE];
    fn deref(&self) -> &[u8; CGRAM_SIZE] { &self.0 }
}

impl DerefMut for Cgram {
    fn deref_mut(&mut self) -> &mut [u8; CGRAM_SIZE] { &mut self.0 }
}

impl SaveState for Cgram {
    fn save_state<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.0)
    }

    fn restore_state<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
        r.read_exact(&mut self.0)
    }
}

impl Cgram {
    /// Looks up a color index in the CGRAM and returns the packed 15-bit color stored there.
    ///
    /// CGRAM contains 256 colors, so any index is valid.
    pub fn color(&self, index: u8) -> u16 {
        let lo = self.0[index as usize * 2] as u16;
        let hi = self.0[index as usize * 2 + 1] as u16;
        (hi << 8 | lo) & 0x7fff
    }

    /// Stores a packed 15-bit color at the given index. Bit 15 is discarded.
    pub fn set_color(&mut self, index: u8, color: u16) {
        let color = color & 0x7fff;
        self.0[index as usize * 2] = color as u8;
        self.0[index as usize * 2 + 1] = (color >> 8) as u8;
    }
}

/// Builds a color directly from a palette index and the 3-bit tile palette group, without going
/// through CGRAM (used by BG1 in modes 3, 4 and 7 when direct color is enabled).
///
/// ```text
/// palette = BBGGGRRR
/// group   = -----bgr
/// output  = 0BBb00GG Gg0RRRr0
/// ```
pub fn direct_color(palette: u8, group: u8) -> u16 {
    let palette = palette as u16;
    let group = group as u16;

    (palette << 7 & 0x6000) + (group << 10 & 0x1000)
        + (palette << 4 & 0x0380) + (group << 5 & 0x0040)
        + (palette << 2 & 0x001c) + (group << 1 & 0x0002)
}

#[test]
fn color_roundtrip() {
    let mut cgram = Cgram::default();
    cgram.set_color(0xff, 0xffff);
    assert_eq!(cgram.color(0xff), 0x7fff);
    assert_eq!(cgram[511], 0x7f);
    cgram.set_color(3, 0x1234);
    assert_eq!(cgram.color(3), 0x1234);
    assert_eq!(cgram[7], 0x12);
}

#[test]
fn direct_color_bits() {
    use super::SnesRgb;

    // All palette bits set, no group bits
    assert_eq!(direct_color(0xff, 0), 0x6000 | 0x0380 | 0x001c);
    // Only the group bits
    assert_eq!(direct_color(0, 0b111), 0x1000 | 0x0040 | 0x0002);
    assert_eq!(direct_color(0xff, 0b111), SnesRgb::new(0b11110, 0b11110, 0b11100).to_packed());
}
