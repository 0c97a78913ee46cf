//! Color window gating
//!
//! The color window itself (its left/right positions and how window 1 and 2 combine) is computed
//! outside of the compositor and arrives as a per-pixel mask in `ScanlineInput::window`. `CGWSEL`
//! then selects, for two features, in which region of the screen they take effect:
//!
//! * "Clip to black" (`CGWSEL` bits 6-7): the main screen color is replaced by black.
//! * "Prevent color math" (`CGWSEL` bits 4-5): color math is disabled for the pixel.

/// Region of the screen in which a window-controlled feature is applied.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaskRegion {
    Nowhere,
    OutsideWindow,
    InsideWindow,
    Everywhere,
}

impl MaskRegion {
    /// Decodes a 2-bit `CGWSEL` field.
    pub fn from_bits(bits: u8) -> MaskRegion {
        match bits & 0b11 {
            0 => MaskRegion::Nowhere,
            1 => MaskRegion::OutsideWindow,
            2 => MaskRegion::InsideWindow,
            _ => MaskRegion::Everywhere,
        }
    }

    /// Returns `true` if the feature applies to a pixel inside (or outside) the window.
    pub fn applies(&self, inside: bool) -> bool {
        match *self {
            MaskRegion::Nowhere => false,
            MaskRegion::OutsideWindow => !inside,
            MaskRegion::InsideWindow => inside,
            MaskRegion::Everywhere => true,
        }
    }
}

/// Per-pixel result of the color window
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WindowOutput {
    /// If `false`, the main screen color is clipped to black.
    pub above_color_enable: bool,
    /// If `false`, color math is disabled for this pixel.
    pub below_color_enable: bool,
}

/// Color window settings from `CGWSEL`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ColorWindow {
    pub clip_to_black: MaskRegion,
    pub prevent_math: MaskRegion,
}

impl ColorWindow {
    /// Decodes the window bits of `CGWSEL` (`ccmm----`).
    pub fn from_cgwsel(cgwsel: u8) -> ColorWindow {
        ColorWindow {
            clip_to_black: MaskRegion::from_bits(cgwsel >> 6),
            prevent_math: MaskRegion::from_bits(cgwsel >> 4),
        }
    }

    /// Gates both sub-planes for a pixel that is `inside` the color window (or not).
    pub fn resolve(&self, inside: bool) -> WindowOutput {
        WindowOutput {
            above_color_enable: !self.clip_to_black.applies(inside),
            below_color_enable: !self.prevent_math.applies(inside),
        }
    }
}
