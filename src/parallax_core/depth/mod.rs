//! The depth extension
//!
//! Assigns a 16-bit depth value to every pixel the compositor resolves. Depth is computed from
//! the layer, the pixel priority and its palette index by a per-layer linear formula:
//!
//! ```text
//! depth = base + priority_scale * priority + palette_scale * color_index
//! ```
//!
//! Smaller values are nearer. `far_depth` stands for "no geometry" and is what every cell of the
//! depth buffer is reset to. When the extension is disabled, every depth lookup yields
//! `far_depth`, which makes depth comparisons inert and leaves plain priority compositing.
//!
//! The compositor uses depth in two ways: `select_best` lets it break priority ties (or override
//! priority altogether), and the per-pixel depth buffer written through `begin_scanline`/`write`
//! feeds the reprojection post-process.

mod regs;
mod select;

pub use self::regs::{maps_address, DEPTH_CONTROL, DEPTH_FAR_HI, DEPTH_FAR_LO, DEPTH_LAYER_END,
    DEPTH_LAYER_START};
pub use self::select::{select_best, PixelCandidate};

use crate::save::SaveState;

use std::cmp;
use std::io::{self, Read, Write};

/// Width of the depth buffer in samples. Every logical pixel is stored twice (hires doubling).
pub const DEPTH_BUFFER_WIDTH: usize = 512;
/// Height of the depth buffer in rows (both interlaced fields).
pub const DEPTH_BUFFER_HEIGHT: usize = 480;

/// Depth formula settings of a single layer.
///
/// The fields are wider than their register representation; `DepthExtension::configure`
/// saturates them (`base` to 16 bits, the scales to 8 bits).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LayerDepth {
    pub base: u32,
    pub palette_scale: u32,
    pub priority_scale: u32,
}

impl Default for LayerDepth {
    fn default() -> Self {
        LayerDepth {
            base: 0,
            palette_scale: 0,
            priority_scale: 0x10,
        }
    }
}

impl LayerDepth {
    fn clamped(&self) -> LayerDepth {
        LayerDepth {
            base: cmp::min(self.base, 0xffff),
            palette_scale: cmp::min(self.palette_scale, 0xff),
            priority_scale: cmp::min(self.priority_scale, 0xff),
        }
    }

    /// Evaluates the depth formula without any clamping.
    fn depth(&self, priority: u8, color: u8) -> u32 {
        self.base + self.priority_scale * priority as u32 + self.palette_scale * color as u32
    }
}

/// The complete configuration of the depth extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DepthSettings {
    /// Depth mode. When disabled, depth never influences compositing.
    pub enable: bool,
    /// Lets a nearer pixel win against a pixel of higher priority.
    pub override_priority: bool,
    /// Saturate computed depths at `0xffff`. If `false`, they wrap around instead, like the raw
    /// 16-bit register arithmetic would.
    pub clamp_depth: bool,
    /// The "no geometry" sentinel (saturated to 16 bits).
    pub far_depth: u32,
    /// BG1 - BG4
    pub bg: [LayerDepth; 4],
    /// Sprites
    pub obj: LayerDepth,
}

impl Default for DepthSettings {
    /// Power-on settings
    fn default() -> Self {
        DepthSettings {
            enable: false,
            override_priority: false,
            clamp_depth: true,
            far_depth: 0xffff,
            bg: [LayerDepth::default(); 4],
            obj: LayerDepth::default(),
        }
    }
}

impl DepthSettings {
    /// Returns a copy with every field saturated to its register width.
    pub fn clamped(&self) -> DepthSettings {
        DepthSettings {
            far_depth: cmp::min(self.far_depth, 0xffff),
            bg: [
                self.bg[0].clamped(),
                self.bg[1].clamped(),
                self.bg[2].clamped(),
                self.bg[3].clamped(),
            ],
            obj: self.obj.clamped(),
            ..*self
        }
    }

    /// Returns the settings of layer `index` (0-3 = BG1-BG4, 4 = sprites).
    pub fn layer(&self, index: usize) -> &LayerDepth {
        if index < 4 { &self.bg[index] } else { &self.obj }
    }

    pub fn layer_mut(&mut self, index: usize) -> &mut LayerDepth {
        if index < 4 { &mut self.bg[index] } else { &mut self.obj }
    }
}

/// Depth buffer and the row cursors of the scanline being rendered
struct Output {
    /// `DEPTH_BUFFER_WIDTH * DEPTH_BUFFER_HEIGHT` samples
    buffer: Vec<u16>,
    /// Sample index in the first row written for the current scanline. `None` if no scanline is
    /// active or the extension is disabled.
    line_a: Option<usize>,
    /// Sample index in the second row written for the current scanline
    line_b: Option<usize>,
}

/// The depth extension. Owns the depth configuration and the depth buffer.
pub struct DepthExtension {
    settings: DepthSettings,
    output: Output,
}

impl Default for DepthExtension {
    fn default() -> Self {
        let settings = DepthSettings::default();
        DepthExtension {
            settings: settings,
            output: Output {
                buffer: vec![settings.far_depth as u16; DEPTH_BUFFER_WIDTH * DEPTH_BUFFER_HEIGHT],
                line_a: None,
                line_b: None,
            },
        }
    }
}

impl DepthExtension {
    /// Restores the power-on configuration and clears the depth buffer.
    pub fn power(&mut self) {
        self.settings = DepthSettings::default();
        self.output.line_a = None;
        self.output.line_b = None;
        self.reset_buffer();
    }

    /// Applies new settings.
    ///
    /// All fields are saturated to their register width. If the far depth changed or depth mode
    /// was switched on or off, the whole depth buffer is reset to the new far depth. Applying
    /// the current settings again is a no-op.
    pub fn configure(&mut self, settings: DepthSettings) {
        let settings = settings.clamped();
        if settings == self.settings {
            return;
        }

        let reset = settings.far_depth != self.settings.far_depth
            || settings.enable != self.settings.enable;
        self.settings = settings;
        if reset {
            debug!("depth mode {}, far depth ${:04X}: resetting depth buffer",
                if settings.enable { "enabled" } else { "disabled" }, settings.far_depth);
            self.reset_buffer();
        }
        if !settings.enable {
            self.output.line_a = None;
            self.output.line_b = None;
        }
    }

    /// Returns the active (saturated) settings.
    pub fn settings(&self) -> &DepthSettings { &self.settings }

    pub fn enabled(&self) -> bool { self.settings.enable }

    pub fn override_priority(&self) -> bool { self.settings.override_priority }

    /// The depth value that means "nothing here". Also the reset value of the depth buffer.
    pub fn far_depth(&self) -> u16 { self.settings.far_depth as u16 }

    /// Fills the entire depth buffer with the far depth.
    pub fn reset_buffer(&mut self) {
        let far = self.far_depth();
        for cell in self.output.buffer.iter_mut() {
            *cell = far;
        }
    }

    /// Returns the depth buffer (`DEPTH_BUFFER_WIDTH` samples per row).
    pub fn buffer(&self) -> &[u16] { &self.output.buffer }

    fn finish(&self, depth: u32) -> u16 {
        if self.settings.clamp_depth {
            cmp::min(depth, 0xffff) as u16
        } else {
            depth as u16
        }
    }

    /// Computes the depth of a pixel of background layer `layer` (0 = BG1, masked to 0-3).
    pub fn depth_for_background(&self, layer: usize, priority: u8, color: u8) -> u16 {
        if !self.settings.enable {
            return self.far_depth();
        }
        self.finish(self.settings.bg[layer & 3].depth(priority, color))
    }

    /// Computes the depth of a sprite pixel.
    pub fn depth_for_object(&self, priority: u8, color: u8) -> u16 {
        if !self.settings.enable {
            return self.far_depth();
        }
        self.finish(self.settings.obj.depth(priority, color))
    }

    /// Positions the row cursors at the start of output row `y`.
    ///
    /// Every scanline occupies two buffer rows. Without interlace, both rows receive the same
    /// samples. With interlace, only the row of the current `field` is written.
    pub fn begin_scanline(&mut self, y: u16, interlace: bool, field: bool) {
        if !self.settings.enable {
            self.output.line_a = None;
            self.output.line_b = None;
            return;
        }

        let mut line_a = y as usize * DEPTH_BUFFER_WIDTH * 2;
        let mut line_b = line_a + if interlace { 0 } else { DEPTH_BUFFER_WIDTH };
        if interlace && field {
            line_a += DEPTH_BUFFER_WIDTH;
            line_b += DEPTH_BUFFER_WIDTH;
        }
        self.output.line_a = Some(line_a);
        self.output.line_b = Some(line_b);
    }

    /// Writes the depth of the current pixel pair and advances the cursors.
    ///
    /// In hires mode, the first sample comes from the below plane and the second one from the
    /// above plane (planes that aren't visible store the far depth). Otherwise both samples get
    /// `front_depth`.
    pub fn write(&mut self,
                 below_depth: u16,
                 below_visible: bool,
                 above_depth: u16,
                 above_visible: bool,
                 front_depth: u16,
                 hires: bool) {
        let (line_a, line_b) = match (self.output.line_a, self.output.line_b) {
            (Some(a), Some(b)) => (a, b),
            _ => return,
        };

        let far = self.far_depth();
        let (first, second) = if hires {
            (if below_visible { below_depth } else { far },
             if above_visible { above_depth } else { far })
        } else {
            (front_depth, front_depth)
        };

        let buffer = &mut self.output.buffer;
        if line_a + 1 < buffer.len() && line_b + 1 < buffer.len() {
            buffer[line_a] = first;
            buffer[line_b] = first;
            buffer[line_a + 1] = second;
            buffer[line_b + 1] = second;
        }
        self.output.line_a = Some(line_a + 2);
        self.output.line_b = Some(line_b + 2);
    }

    /// Picks the depth stored for a non-hires pixel: the above plane if it is visible, else the
    /// below plane if that is visible, else the far depth.
    ///
    /// This is intentionally not a numeric minimum. The main screen wins, like it does for the
    /// color.
    pub fn front_depth(&self,
                       above_depth: u16,
                       above_visible: bool,
                       below_depth: u16,
                       below_visible: bool) -> u16 {
        if !self.settings.enable {
            self.far_depth()
        } else if above_visible {
            above_depth
        } else if below_visible {
            below_depth
        } else {
            self.far_depth()
        }
    }
}

/// Saves the settings at their register width. Restoring resets the depth buffer.
impl SaveState for DepthExtension {
    fn save_state<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let s = &self.settings;
        s.enable.save_state(w)?;
        s.override_priority.save_state(w)?;
        s.clamp_depth.save_state(w)?;
        (s.far_depth as u16).save_state(w)?;
        for layer in s.bg.iter().chain(Some(&s.obj)) {
            (layer.base as u16).save_state(w)?;
            (layer.palette_scale as u8).save_state(w)?;
            (layer.priority_scale as u8).save_state(w)?;
        }
        Ok(())
    }

    fn restore_state<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
        let mut s = DepthSettings::default();
        s.enable.restore_state(r)?;
        s.override_priority.restore_state(r)?;
        s.clamp_depth.restore_state(r)?;
        let mut far = 0u16;
        far.restore_state(r)?;
        s.far_depth = far as u32;
        for index in 0..5 {
            let (mut base, mut palette_scale, mut priority_scale) = (0u16, 0u8, 0u8);
            base.restore_state(r)?;
            palette_scale.restore_state(r)?;
            priority_scale.restore_state(r)?;
            *s.layer_mut(index) = LayerDepth {
                base: base as u32,
                palette_scale: palette_scale as u32,
                priority_scale: priority_scale as u32,
            };
        }

        self.settings = s;
        self.output.line_a = None;
        self.output.line_b = None;
        self.reset_buffer();
        Ok(())
    }
}
