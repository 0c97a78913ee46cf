//! Layer pixel input for the compositor
//!
//! Background and sprite rendering happen outside of this crate. Whatever decodes tiles and
//! sprites hands the compositor a `ScanlineInput` per scanline: for each layer and each x
//! coordinate, the priority and palette index of the pixel on the main screen ("above") and on
//! the subscreen ("below"), plus the color window mask.

use super::SCREEN_WIDTH;

const WIDTH: usize = SCREEN_WIDTH as usize;

/// An enum of all layers a pixel can come from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Layer {
    Bg1,
    Bg2,
    Bg3,
    Bg4,
    /// Sprites with a palette 0-3 (CGRAM 128-191). These are opaque and cannot participate in
    /// color math.
    Obj1,
    /// Sprites with a palette 4-7 (CGRAM 192-255)
    Obj2,
    Backdrop,
}

impl Layer {
    /// Returns the background layer with the given index (0 = BG1).
    pub fn bg(index: usize) -> Layer {
        match index & 3 {
            0 => Layer::Bg1,
            1 => Layer::Bg2,
            2 => Layer::Bg3,
            _ => Layer::Bg4,
        }
    }

    /// Returns the sprite layer a sprite pixel with the given CGRAM index belongs to.
    pub fn obj(palette: u8) -> Layer {
        if palette >= 192 { Layer::Obj2 } else { Layer::Obj1 }
    }
}

/// The two compositing results per pixel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubPlane {
    /// Main screen
    Above,
    /// Subscreen, used as the second color math operand
    Below,
}

/// A single pixel produced by a layer for one sub-plane.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LayerPixel {
    /// Priority of the pixel. Higher values are drawn in front of lower ones. `0` means the layer
    /// has no (opaque) pixel here.
    pub priority: u8,
    /// CGRAM index of the color. For sprites, this includes the +128 sprite palette offset.
    pub palette: u8,
    /// Tile palette number (0-7). Only used for BG1 direct color.
    pub palette_group: u8,
}

impl LayerPixel {
    pub fn new(priority: u8, palette: u8) -> LayerPixel {
        LayerPixel {
            priority: priority,
            palette: palette,
            palette_group: 0,
        }
    }

    /// Returns `true` if the layer has no pixel here.
    pub fn is_transparent(&self) -> bool { self.priority == 0 }
}

/// One scanline of a layer, for both sub-planes
#[derive(Clone)]
pub struct LayerLine {
    pub above: [LayerPixel; WIDTH],
    pub below: [LayerPixel; WIDTH],
}

impl Default for LayerLine {
    fn default() -> Self {
        LayerLine {
            above: [LayerPixel::default(); WIDTH],
            below: [LayerPixel::default(); WIDTH],
        }
    }
}

impl LayerLine {
    /// Returns the pixel at `x` on the given sub-plane. Out of range coordinates are transparent.
    pub fn pixel(&self, plane: SubPlane, x: usize) -> LayerPixel {
        let line = match plane {
            SubPlane::Above => &self.above,
            SubPlane::Below => &self.below,
        };
        line.get(x).cloned().unwrap_or_default()
    }

    /// Puts a pixel on both sub-planes (the layer is enabled on the main and the subscreen).
    pub fn set(&mut self, x: usize, pixel: LayerPixel) {
        if x < WIDTH {
            self.above[x] = pixel;
            self.below[x] = pixel;
        }
    }

    pub fn clear(&mut self) {
        self.above = [LayerPixel::default(); WIDTH];
        self.below = [LayerPixel::default(); WIDTH];
    }
}

/// Everything the compositor needs from the outside to render a scanline.
#[derive(Clone, Default)]
pub struct ScanlineInput {
    /// BG1 - BG4
    pub bg: [LayerLine; 4],
    /// Sprite layer
    pub obj: LayerLine,
    /// Color window mask. `true` = the pixel lies inside the color window.
    pub window: ColorWindowLine,
}

impl ScanlineInput {
    /// Makes every layer transparent and clears the color window.
    pub fn clear(&mut self) {
        for bg in &mut self.bg {
            bg.clear();
        }
        self.obj.clear();
        self.window = ColorWindowLine::default();
    }
}

/// Color window mask of a scanline
#[derive(Clone)]
pub struct ColorWindowLine(pub [bool; WIDTH]);

impl Default for ColorWindowLine {
    fn default() -> Self { ColorWindowLine([false; WIDTH]) }
}

impl ColorWindowLine {
    /// Returns whether `x` lies inside the color window. Out of range coordinates are outside.
    pub fn inside(&self, x: usize) -> bool {
        self.0.get(x).cloned().unwrap_or(false)
    }

    /// Marks the range `left..=right` as inside the window (both ends inclusive, like the window
    /// position registers).
    pub fn set_range(&mut self, left: usize, right: usize) {
        for x in left..=right.min(WIDTH - 1) {
            self.0[x] = true;
        }
    }
}

/// Supplies the compositor with layer pixels, one scanline at a time.
///
/// This is the seam to whatever decodes backgrounds and sprites. It is called once per visible
/// scanline, in increasing `vcounter` order, with `input` already cleared.
pub trait ScanlineSource {
    fn scanline(&mut self, vcounter: u16, input: &mut ScanlineInput);
}

impl<T: ScanlineSource + ?Sized> ScanlineSource for Box<T> {
    fn scanline(&mut self, vcounter: u16, input: &mut ScanlineInput) {
        (**self).scanline(vcounter, input)
    }
}
