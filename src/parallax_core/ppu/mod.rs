//! Emulates the compositing stage of the Picture Processing Unit.
//!
//! Background and sprite pixels are decoded elsewhere and handed in one scanline at a time (see
//! `ScanlineSource`). The `Ppu` resolves which layer is visible on the main screen and the
//! subscreen, applies color math and the color window, and writes the result to the frame
//! buffer. The depth extension (`DepthExtension`) is consulted for every pixel and records a
//! depth buffer alongside the frame.
//!
//! Documentation mostly taken from http://emu-docs.org/Super%20NES/General/snesdoc.html and
//! http://wiki.superfamicom.org/

mod cgram;
mod layer;
mod regs;
mod rgb;
mod screen;
mod window;

pub use self::cgram::{direct_color, Cgram, CGRAM_SIZE};
pub use self::layer::{ColorWindowLine, Layer, LayerLine, LayerPixel, ScanlineInput,
    ScanlineSource, SubPlane};
pub use self::rgb::{blend, light, to_rgb24, MathOp, Rgb, SnesRgb};
pub use self::window::{ColorWindow, MaskRegion, WindowOutput};

use self::screen::Math;
use crate::depth::{DepthExtension, DEPTH_BUFFER_HEIGHT, DEPTH_BUFFER_WIDTH};

/// Physical screen width
/// (this is the width of a field, or a half-frame)
pub const SCREEN_WIDTH: u32 = 256;
/// Physical screen height
/// (this is the height of a field, or a half-frame)
pub const SCREEN_HEIGHT: u32 = 224;     // 224px for 60 Hz NTSC, 239 with overscan

/// Width of the frame buffer in pixels. Every logical pixel is stored as two samples.
pub const FRAME_BUF_WIDTH: usize = DEPTH_BUFFER_WIDTH;
/// Height of the frame buffer in rows. Every scanline occupies two rows (one per interlace
/// field).
pub const FRAME_BUF_HEIGHT: usize = DEPTH_BUFFER_HEIGHT;

/// Number of scanline slots in the frame buffer
const OUTPUT_LINES: u16 = (FRAME_BUF_HEIGHT / 2) as u16;

/// A view of the visible part of the last rendered frame.
pub struct Frame<'a> {
    /// Pixels as `0x00RRGGBB`, `pitch` pixels per row
    pub color: &'a [u32],
    /// Depth buffer, same layout as `color`
    pub depth: &'a [u16],
    pub width: usize,
    pub height: usize,
    pub pitch: usize,
    /// The far depth the depth buffer was written with
    pub far_depth: u16,
}

impl<'a> Frame<'a> {
    /// Converts the frame to `RGB24` (see `to_rgb24`).
    pub fn to_rgb24(&self) -> Vec<u8> {
        to_rgb24(self.color, self.width, self.height, self.pitch)
    }

    /// Returns the color of the pixel at `(x, y)`, or `None` if it lies outside the frame.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height { return None }
        self.color.get(y * self.pitch + x).cloned()
    }

    /// Returns the depth stored for the pixel at `(x, y)`.
    pub fn depth_at(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.width || y >= self.height { return None }
        self.depth.get(y * self.pitch + x).cloned()
    }
}

pub struct Ppu {
    /// PPU frame buffer. Contains `FRAME_BUF_WIDTH * FRAME_BUF_HEIGHT` pixels in `0x00RRGGBB`
    /// format, already adjusted to the master brightness. Scanline `y` of the output occupies
    /// rows `2*y` and `2*y + 1`.
    pub framebuf: Vec<u32>,

    /// The depth extension, which owns the depth buffer
    twofive: DepthExtension,

    /// Color math state carried from pixel to pixel (and from the below to the above plane)
    math: Math,

    /// CGRAM - Stores the color palette
    cgram: Cgram,
    /// `$2121` CGRAM word address. Incremented after every complete color write.
    cgadd: u8,
    /// Low byte of a color written to `$2122`, waiting for its high byte
    cg_lsb: u8,
    /// `true` if the next `$2122` write is the high byte
    cg_high: bool,

    /// Current interlace field (toggled every frame in interlace mode)
    field: bool,
    /// Number of frames rendered since power-on
    frame_count: u64,

    /// `$2100` - Screen Display register
    /// `x---bbbb`
    /// * `x`: Force blank (F-Blank)
    /// * `b`: Brightness (0=black, 15=max)
    inidisp: u8,
    /// `$2105` BG mode and character size
    /// `4321emmm`
    /// Only the `mmm` (BG mode) bits are relevant to the compositor: modes 5 and 6 are hires
    /// modes, and direct color applies to modes 3, 4 and 7.
    bgmode: u8,
    /// `$2130` Color Math Control Register A
    /// `ccmm--sd`
    /// * `cc`: Clip colors to black (0 = never, 1 = outside color window, 2 = inside color window,
    ///   3 = always)
    /// * `mm`: Prevent color math (same encoding as `cc`)
    /// * `s`: Add subscreen (instead of fixed color)
    /// * `d`: Direct color mode for 256-color BGs
    cgwsel: u8,
    /// `$2131` Color Math Control Register B
    /// `shbo4321`
    /// * `s`: Add/Subtract select (0 = add, 1 = subtract)
    /// * `h`: Half color math (the result is divided by 2)
    /// * `b`: Enable color math on the backdrop
    /// * `o`: Enable color math on sprites (with palette 4-7 only)
    /// * `4321`: Enable color math on BG4/3/2/1
    cgadsub: u8,
    /// `$2132` Fixed color data (5 bits per channel)
    /// `bgrccccc`: Write `ccccc` to the blue/green/red channel if the respective bit is set
    coldata_r: u8,
    coldata_g: u8,
    coldata_b: u8,
    /// `$2133` Screen Mode/Video Select
    /// `se--poIi`
    /// * `p`: Pseudo-hires (subscreen pixels are output between main screen pixels)
    /// * `o`: Overscan mode (239 instead of 224 visible lines)
    /// * `i`: Screen interlace
    setini: u8,
}

impl_save_state!(Ppu { twofive, cgram, cgadd, cg_lsb, cg_high, inidisp, bgmode, cgwsel, cgadsub,
    coldata_r, coldata_g, coldata_b, setini } ignore { framebuf, math, field, frame_count });

impl Default for Ppu {
    fn default() -> Self {
        Ppu {
            framebuf: vec![0; FRAME_BUF_WIDTH * FRAME_BUF_HEIGHT],
            twofive: DepthExtension::default(),
            math: Math::default(),
            cgram: Cgram::default(),
            cgadd: 0,
            cg_lsb: 0,
            cg_high: false,
            field: false,
            frame_count: 0,
            inidisp: 0x80,
            bgmode: 0,
            cgwsel: 0,
            cgadsub: 0,
            coldata_r: 0,
            coldata_g: 0,
            coldata_b: 0,
            setini: 0,
        }
    }
}

impl Ppu {
    pub fn new() -> Ppu {
        Ppu::default()
    }

    /// Resets all registers, CGRAM and the depth extension to their power-on state.
    pub fn power(&mut self) {
        *self = Ppu::default();
    }

    /// Returns the depth extension.
    pub fn depth(&self) -> &DepthExtension { &self.twofive }

    /// Returns the depth extension for reconfiguration. Must not be called while a frame is being
    /// rendered.
    pub fn depth_mut(&mut self) -> &mut DepthExtension { &mut self.twofive }

    pub fn cgram(&self) -> &Cgram { &self.cgram }

    pub fn cgram_mut(&mut self) -> &mut Cgram { &mut self.cgram }

    /// Returns `true` if forced blank is active (the screen is black).
    pub fn forced_blank(&self) -> bool { self.inidisp & 0x80 != 0 }

    /// Master brightness (0-15)
    pub fn brightness(&self) -> u8 { self.inidisp & 0x0f }

    /// Returns the active BG mode (0-7).
    pub fn bg_mode(&self) -> u8 { self.bgmode & 0b111 }

    pub fn interlace(&self) -> bool { self.setini & 0x01 != 0 }

    pub fn overscan(&self) -> bool { self.setini & 0x04 != 0 }

    pub fn pseudo_hires(&self) -> bool { self.setini & 0x08 != 0 }

    /// Returns `true` if the main and subscreen are output side by side (512 pixels per line).
    pub fn hires(&self) -> bool {
        self.pseudo_hires() || self.bg_mode() == 5 || self.bg_mode() == 6
    }

    /// Number of the last visible scanline.
    pub fn vdisp(&self) -> u16 {
        if self.overscan() { 239 } else { SCREEN_HEIGHT as u16 }
    }

    /// The current interlace field
    pub fn field(&self) -> bool { self.field }

    pub fn frame_count(&self) -> u64 { self.frame_count }

    /// Maps a scanline number to its slot in the output buffers. Without overscan, the picture
    /// is moved down by 7 lines so it's centered in the buffer.
    fn output_line(&self, vcounter: u16) -> u16 {
        vcounter + if self.overscan() { 0 } else { 7 }
    }

    /// Starts a new frame. Toggles the interlace field.
    pub fn start_frame(&mut self) {
        self.field = self.interlace() && !self.field;
        self.frame_count += 1;

        trace!("New frame {}. BG mode {}, brightness {}, depth mode {}, hires {}",
            self.frame_count,
            self.bg_mode(),
            self.brightness(),
            self.twofive.enabled(),
            self.hires());
    }

    /// Renders a complete frame, pulling the layer pixels of every visible scanline from
    /// `source`.
    pub fn render_frame<S: ScanlineSource + ?Sized>(&mut self, source: &mut S) {
        self.start_frame();

        let mut input = Box::new(ScanlineInput::default());
        for vcounter in 1..self.vdisp() + 1 {
            input.clear();
            source.scanline(vcounter, &mut input);
            self.render_scanline(vcounter, &input);
        }
    }

    /// Returns the visible part of the frame buffer and depth buffer.
    ///
    /// The view starts at the first rendered scanline and is `2 * vdisp` rows high.
    pub fn frame(&self) -> Frame<'_> {
        let first_row = self.output_line(1) as usize * 2;
        let height = self.vdisp() as usize * 2;
        let start = first_row * FRAME_BUF_WIDTH;

        Frame {
            color: &self.framebuf[start..],
            depth: &self.twofive.buffer()[start..],
            width: FRAME_BUF_WIDTH,
            height: height,
            pitch: FRAME_BUF_WIDTH,
            far_depth: self.twofive.far_depth(),
        }
    }
}
