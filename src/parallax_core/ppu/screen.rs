//! Scanline compositing
//!
//! For every pixel of a scanline, two results are resolved: the *above* plane (main screen) and
//! the *below* plane (subscreen). Each plane picks its winning layer pixel with `select_best`,
//! which decides by priority and, when depth mode is on, by depth. The above color is then
//! combined with the below color (or the fixed color) by the color math unit, gated by the color
//! window.
//!
//! The math state deliberately carries over from one pixel to the next: in hires modes, the
//! below sample of a pixel is blended using the color math flags of the *previous* pixel's above
//! plane, which is why the first hires pixel of a scanline is always transparent.

use super::{blend, light, Layer, MathOp, Ppu, ScanlineInput, SubPlane, ColorWindow,
    FRAME_BUF_WIDTH, OUTPUT_LINES, SCREEN_WIDTH};
use crate::depth::{select_best, PixelCandidate};

/// Compositing result of one sub-plane
#[derive(Debug, Copy, Clone, Default)]
struct PlaneState {
    /// Packed 15-bit color of the winning pixel
    color: u16,
    depth: u16,
    /// For `above`: the color window allows the color through (it isn't clipped to black).
    /// For `below`: the winning above pixel participates in color math.
    color_enable: bool,
}

/// Color math state of the scanline being rendered
#[derive(Debug, Clone, Default)]
pub struct Math {
    above: PlaneState,
    below: PlaneState,
    /// The below plane has no pixel (only the backdrop)
    transparent: bool,
    /// Latched "add subscreen" flag
    blend_mode: bool,
    /// Latched halve flag
    color_halve: bool,
}

/// Rendering
impl Ppu {
    /// Returns the fixed color from `COLDATA`.
    fn fixed_color(&self) -> u16 {
        (self.coldata_b as u16) << 10 | (self.coldata_g as u16) << 5 | self.coldata_r as u16
    }

    fn math_op(&self) -> MathOp {
        if self.cgadsub & 0x80 == 0 { MathOp::Add } else { MathOp::Sub }
    }

    fn color_window(&self) -> ColorWindow {
        ColorWindow::from_cgwsel(self.cgwsel)
    }

    /// Whether BG1 colors are built directly from the palette index.
    fn direct_color_active(&self) -> bool {
        self.cgwsel & 0x01 != 0 && match self.bg_mode() {
            3 | 4 | 7 => true,
            _ => false,
        }
    }

    fn color_math_enabled(&self, layer: Layer) -> bool {
        let bit = match layer {
            Layer::Bg1 => 0,
            Layer::Bg2 => 1,
            Layer::Bg3 => 2,
            Layer::Bg4 => 3,
            Layer::Obj2 => 4,
            Layer::Obj1 => return false,    // No color math for you!
            Layer::Backdrop => 5,
        };

        self.cgadsub & (1 << bit) != 0
    }

    /// Lines past the visible area (without overscan) and forced blank produce black.
    fn line_hidden(&self, vcounter: u16) -> bool {
        self.forced_blank() || (!self.overscan() && vcounter >= 225)
    }

    /// Collects the pixels of all layers at `x` on one sub-plane, with their colors and depths.
    fn candidates(&self, x: usize, input: &ScanlineInput, plane: SubPlane) -> [PixelCandidate; 5] {
        let far = self.twofive.far_depth();
        let direct = self.direct_color_active();

        let mut candidates = [PixelCandidate {
            layer: Layer::Backdrop,
            priority: 0,
            depth: far,
            color: 0,
            color_enable: false,
        }; 5];

        for (bg, candidate) in candidates.iter_mut().take(4).enumerate() {
            let pixel = input.bg[bg].pixel(plane, x);
            let layer = Layer::bg(bg);
            candidate.layer = layer;
            candidate.priority = pixel.priority;
            if pixel.is_transparent() {
                continue;
            }

            candidate.depth = self.twofive.depth_for_background(bg, pixel.priority, pixel.palette);
            candidate.color = if bg == 0 && direct {
                super::direct_color(pixel.palette, pixel.palette_group)
            } else {
                self.cgram.color(pixel.palette)
            };
            candidate.color_enable = self.color_math_enabled(layer);
        }

        let pixel = input.obj.pixel(plane, x);
        let layer = Layer::obj(pixel.palette);
        let obj = &mut candidates[4];
        obj.layer = layer;
        obj.priority = pixel.priority;
        if !pixel.is_transparent() {
            obj.depth = self.twofive.depth_for_object(pixel.priority, pixel.palette);
            obj.color = self.cgram.color(pixel.palette);
            obj.color_enable = self.color_math_enabled(layer);
        }

        candidates
    }

    /// Resets the color math state at the start of a scanline.
    fn begin_math(&mut self) {
        let backdrop = self.cgram.color(0);
        let far = self.twofive.far_depth();

        self.math.above = PlaneState { color: backdrop, depth: far, color_enable: false };
        self.math.below = PlaneState { color: backdrop, depth: far, color_enable: false };
        self.math.transparent = true;
        self.math.blend_mode = false;
        self.math.color_halve = false;
    }

    /// Resolves the below plane (subscreen) at `x`. Returns the color of the first hires sample,
    /// or 0 when not in hires mode.
    fn below(&mut self, vcounter: u16, x: usize, input: &ScanlineInput, hires: bool) -> u16 {
        if self.line_hidden(vcounter) {
            self.math.transparent = true;
            self.math.below.color = self.cgram.color(0);
            self.math.below.depth = self.twofive.far_depth();
            return 0;
        }

        let candidates = self.candidates(x, input, SubPlane::Below);
        match select_best(&candidates, self.twofive.enabled(), self.twofive.override_priority()) {
            Some(index) => {
                self.math.transparent = false;
                self.math.below.color = candidates[index].color;
                self.math.below.depth = candidates[index].depth;
            }
            None => {
                self.math.transparent = true;
                self.math.below.color = self.cgram.color(0);
                self.math.below.depth = self.twofive.far_depth();
            }
        }

        if !hires {
            return 0;
        }
        if !self.math.below.color_enable {
            return if self.math.above.color_enable { self.math.below.color } else { 0 };
        }

        let main = if self.math.above.color_enable { self.math.below.color } else { 0 };
        let sub = if self.math.blend_mode { self.math.above.color } else { self.fixed_color() };
        blend(main, sub, self.math_op(), self.math.color_halve)
    }

    /// Resolves the above plane (main screen) at `x` and returns its final color.
    fn above(&mut self, vcounter: u16, x: usize, input: &ScanlineInput) -> u16 {
        if self.line_hidden(vcounter) {
            self.math.above.color = self.cgram.color(0);
            self.math.above.depth = self.twofive.far_depth();
            self.math.below.color_enable = false;
            self.math.above.color_enable = false;
            return 0;
        }

        let candidates = self.candidates(x, input, SubPlane::Above);
        match select_best(&candidates, self.twofive.enabled(), self.twofive.override_priority()) {
            Some(index) => {
                self.math.above.color = candidates[index].color;
                self.math.above.depth = candidates[index].depth;
                self.math.below.color_enable = candidates[index].color_enable;
            }
            None => {
                self.math.above.color = self.cgram.color(0);
                self.math.above.depth = self.twofive.far_depth();
                self.math.below.color_enable = self.color_math_enabled(Layer::Backdrop);
            }
        }

        let window = self.color_window().resolve(input.window.inside(x));
        if !window.below_color_enable {
            self.math.below.color_enable = false;
        }
        self.math.above.color_enable = window.above_color_enable;
        if !self.math.below.color_enable {
            return if self.math.above.color_enable { self.math.above.color } else { 0 };
        }

        let blend_mode = self.cgwsel & 0x02 != 0;
        let halve = self.cgadsub & 0x40 != 0;
        if blend_mode && self.math.transparent {
            // Nothing on the subscreen: the fixed color is used, and never halved
            self.math.blend_mode = false;
            self.math.color_halve = false;
        } else {
            self.math.blend_mode = blend_mode;
            self.math.color_halve = halve && self.math.above.color_enable;
        }

        let main = if self.math.above.color_enable { self.math.above.color } else { 0 };
        let sub = if self.math.blend_mode { self.math.below.color } else { self.fixed_color() };
        blend(main, sub, self.math_op(), self.math.color_halve)
    }

    /// Main rendering entry point. Composites scanline `vcounter` from the given layer pixels and
    /// writes it to the frame buffer and the depth buffer.
    ///
    /// Line 0 is never displayed and is skipped, as are lines outside the output buffers.
    pub fn render_scanline(&mut self, vcounter: u16, input: &ScanlineInput) {
        if vcounter == 0 {
            return;
        }
        let y = self.output_line(vcounter);
        if y >= OUTPUT_LINES {
            trace_unique!("ignoring scanline {} outside of the output buffer", vcounter);
            return;
        }

        let interlace = self.interlace();
        let field = self.field;
        let mut line_a = y as usize * FRAME_BUF_WIDTH * 2;
        let mut line_b = line_a + if interlace { 0 } else { FRAME_BUF_WIDTH };
        if interlace && field {
            line_a += FRAME_BUF_WIDTH;
            line_b += FRAME_BUF_WIDTH;
        }
        self.twofive.begin_scanline(y, interlace, field);
        self.begin_math();

        let hires = self.hires();
        let brightness = self.brightness();
        for x in 0..SCREEN_WIDTH as usize {
            let below_color = self.below(vcounter, x, input, hires);
            let above_color = self.above(vcounter, x, input);

            let far = self.twofive.far_depth();
            let above_visible = self.math.above.depth != far;
            let below_visible = self.math.below.depth != far && !self.math.transparent;
            let front_depth = self.twofive.front_depth(self.math.above.depth, above_visible,
                                                       self.math.below.depth, below_visible);
            self.twofive.write(self.math.below.depth, below_visible,
                               self.math.above.depth, above_visible,
                               front_depth, hires);

            let first = light(if hires { below_color } else { above_color }, brightness);
            let second = light(above_color, brightness);
            self.framebuf[line_a + x * 2] = first;
            self.framebuf[line_b + x * 2] = first;
            self.framebuf[line_a + x * 2 + 1] = second;
            self.framebuf[line_b + x * 2 + 1] = second;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::depth::LayerDepth;

    const RED: u16 = 0x001f;
    const GREEN: u16 = 0x03e0;
    const BLUE: u16 = 0x7c00;

    /// A PPU with full brightness, BG mode 1 and a few colors in CGRAM
    fn ppu() -> Ppu {
        let mut ppu = Ppu::new();
        ppu.write_io(0x2100, 0x0f);
        ppu.write_io(0x2105, 0x01);
        ppu.cgram_mut().set_color(0, 0x0000);
        ppu.cgram_mut().set_color(1, RED);
        ppu.cgram_mut().set_color(2, GREEN);
        ppu.cgram_mut().set_color(3, BLUE);
        ppu.cgram_mut().set_color(200, 0x4210);
        ppu
    }

    fn enable_depth(ppu: &mut Ppu, override_priority: bool) {
        let mut settings = *ppu.depth().settings();
        settings.enable = true;
        settings.override_priority = override_priority;
        ppu.depth_mut().configure(settings);
    }

    /// Color of logical pixel `x` of scanline `vcounter` (second sample of the pair)
    fn pixel(ppu: &Ppu, vcounter: u16, x: usize) -> u32 {
        let frame = ppu.frame();
        frame.pixel(x * 2 + 1, (vcounter as usize - 1) * 2).unwrap()
    }

    fn depth(ppu: &Ppu, vcounter: u16, x: usize) -> u16 {
        let frame = ppu.frame();
        frame.depth_at(x * 2 + 1, (vcounter as usize - 1) * 2).unwrap()
    }

    #[test]
    fn higher_priority_wins() {
        let mut ppu = ppu();
        let mut input = ScanlineInput::default();
        input.bg[0].set(10, LayerPixel::new(2, 1));
        input.bg[1].set(10, LayerPixel::new(5, 2));
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 10), light(GREEN, 15));
        // Backdrop elsewhere
        assert_eq!(pixel(&ppu, 1, 11), 0);
        // Depth mode is off, so nothing ends up in the depth buffer
        assert_eq!(depth(&ppu, 1, 10), 0xffff);
    }

    #[test]
    fn depth_breaks_ties_and_fills_buffer() {
        let mut ppu = ppu();
        enable_depth(&mut ppu, false);
        let mut settings = *ppu.depth().settings();
        settings.bg[0] = LayerDepth { base: 500, palette_scale: 0, priority_scale: 0 };
        settings.bg[1] = LayerDepth { base: 300, palette_scale: 0, priority_scale: 0 };
        ppu.depth_mut().configure(settings);

        let mut input = ScanlineInput::default();
        input.bg[0].set(4, LayerPixel::new(3, 1));
        input.bg[1].set(4, LayerPixel::new(3, 2));
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 4), light(GREEN, 15));
        assert_eq!(depth(&ppu, 1, 4), 300);
        assert_eq!(depth(&ppu, 1, 5), 0xffff);
    }

    #[test]
    fn priority_override() {
        let mut ppu = ppu();
        enable_depth(&mut ppu, true);
        let mut settings = *ppu.depth().settings();
        settings.bg[0] = LayerDepth { base: 4000, palette_scale: 0, priority_scale: 0 };
        settings.obj = LayerDepth { base: 100, palette_scale: 0, priority_scale: 0 };
        ppu.depth_mut().configure(settings);

        // The sprite has the lower priority, but is nearer
        let mut input = ScanlineInput::default();
        input.bg[0].set(0, LayerPixel::new(9, 1));
        input.obj.set(0, LayerPixel::new(1, 200));
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(0x4210, 15));
        assert_eq!(depth(&ppu, 1, 0), 100);

        // Without the override, priority decides
        let mut settings = *ppu.depth().settings();
        settings.override_priority = false;
        ppu.depth_mut().configure(settings);
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(RED, 15));
        assert_eq!(depth(&ppu, 1, 0), 4000);
    }

    #[test]
    fn fixed_color_add_halve() {
        let mut ppu = ppu();
        ppu.write_io(0x2131, 0x41);         // add, halve, BG1
        ppu.write_io(0x2132, 0x3f);         // red = 31
        let mut input = ScanlineInput::default();
        input.bg[0].set(0, LayerPixel::new(1, 3));
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(blend(BLUE, RED, MathOp::Add, true), 15));
    }

    #[test]
    fn subscreen_subtract() {
        let mut ppu = ppu();
        ppu.cgram_mut().set_color(4, 0x7fff);
        ppu.write_io(0x2130, 0x02);         // add subscreen
        ppu.write_io(0x2131, 0x81);         // subtract, BG1
        let mut input = ScanlineInput::default();
        input.bg[0].above[0] = LayerPixel::new(1, 4);
        input.bg[1].below[0] = LayerPixel::new(1, 1);
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(0x7fe0, 15));
    }

    #[test]
    fn empty_subscreen_uses_fixed_color_without_halving() {
        let mut ppu = ppu();
        ppu.write_io(0x2130, 0x02);
        ppu.write_io(0x2131, 0x41);         // add, halve, BG1
        ppu.write_io(0x2132, 0x5f);         // green = 31
        let mut input = ScanlineInput::default();
        input.bg[0].above[0] = LayerPixel::new(1, 1);
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(RED | GREEN, 15));
    }

    #[test]
    fn window_gates_color_math() {
        let mut ppu = ppu();
        ppu.write_io(0x2130, 0x20);         // prevent color math inside the window
        ppu.write_io(0x2131, 0x01);
        ppu.write_io(0x2132, 0x9f);         // blue = 31
        let mut input = ScanlineInput::default();
        input.bg[0].set(0, LayerPixel::new(1, 1));
        input.bg[0].set(1, LayerPixel::new(1, 1));
        input.window.set_range(1, 1);
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(RED | BLUE, 15));
        assert_eq!(pixel(&ppu, 1, 1), light(RED, 15));
    }

    #[test]
    fn window_clips_to_black() {
        let mut ppu = ppu();
        ppu.write_io(0x2130, 0x80);         // clip inside the window
        let mut input = ScanlineInput::default();
        input.bg[0].set(3, LayerPixel::new(1, 2));
        input.bg[0].set(4, LayerPixel::new(1, 2));
        input.window.set_range(4, 10);
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 3), light(GREEN, 15));
        assert_eq!(pixel(&ppu, 1, 4), 0);
    }

    #[test]
    fn opaque_sprites_skip_color_math() {
        let mut ppu = ppu();
        ppu.cgram_mut().set_color(130, RED);
        ppu.cgram_mut().set_color(210, RED);
        ppu.write_io(0x2131, 0x10);         // add, sprites
        ppu.write_io(0x2132, 0x9f);
        let mut input = ScanlineInput::default();
        input.obj.set(0, LayerPixel::new(1, 130));
        input.obj.set(1, LayerPixel::new(1, 210));
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(RED, 15));
        assert_eq!(pixel(&ppu, 1, 1), light(RED | BLUE, 15));
    }

    #[test]
    fn direct_color_bg1() {
        let mut ppu = ppu();
        ppu.write_io(0x2105, 0x03);
        ppu.write_io(0x2130, 0x01);
        let mut input = ScanlineInput::default();
        input.bg[0].set(0, LayerPixel { priority: 1, palette: 0x07, palette_group: 0b001 });
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), light(direct_color(0x07, 0b001), 15));
    }

    #[test]
    fn forced_blank_is_black() {
        let mut ppu = ppu();
        enable_depth(&mut ppu, false);
        ppu.write_io(0x2100, 0x8f);
        let mut input = ScanlineInput::default();
        input.bg[0].set(0, LayerPixel::new(1, 1));
        ppu.render_scanline(1, &input);
        assert_eq!(pixel(&ppu, 1, 0), 0);
        assert_eq!(depth(&ppu, 1, 0), 0xffff);
    }

    #[test]
    fn hires_outputs_both_planes() {
        let mut ppu = ppu();
        ppu.write_io(0x2133, 0x08);         // pseudo-hires
        enable_depth(&mut ppu, false);
        let mut settings = *ppu.depth().settings();
        settings.bg[0] = LayerDepth { base: 10, palette_scale: 0, priority_scale: 0 };
        settings.bg[1] = LayerDepth { base: 20, palette_scale: 0, priority_scale: 0 };
        ppu.depth_mut().configure(settings);

        let mut input = ScanlineInput::default();
        input.bg[0].above[5] = LayerPixel::new(1, 1);
        input.bg[1].below[5] = LayerPixel::new(1, 2);
        ppu.render_scanline(1, &input);

        let frame = ppu.frame();
        assert_eq!(frame.pixel(10, 0), Some(light(GREEN, 15)));
        assert_eq!(frame.pixel(11, 0), Some(light(RED, 15)));
        assert_eq!(frame.depth_at(10, 0), Some(20));
        assert_eq!(frame.depth_at(11, 0), Some(10));
    }

    #[test]
    fn first_hires_pixel_is_transparent() {
        let mut ppu = ppu();
        ppu.write_io(0x2133, 0x08);
        let mut input = ScanlineInput::default();
        input.bg[1].set(0, LayerPixel::new(1, 2));
        ppu.render_scanline(1, &input);
        let frame = ppu.frame();
        assert_eq!(frame.pixel(0, 0), Some(0));
        assert_eq!(frame.pixel(1, 0), Some(light(GREEN, 15)));
    }

    #[test]
    fn line_zero_and_overflow_are_skipped() {
        let mut ppu = ppu();
        let mut input = ScanlineInput::default();
        input.bg[0].set(0, LayerPixel::new(1, 1));
        ppu.render_scanline(0, &input);
        ppu.render_scanline(400, &input);
        assert!(ppu.framebuf.iter().all(|&c| c == 0));
    }
}
