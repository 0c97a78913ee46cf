//! Color math test pattern
//!
//! BG1 draws vertical bars on the main screen, BG2 horizontal bars on the subscreen only. Inside
//! the color window (a band in the middle of the screen), the two are averaged. Outside of it,
//! color math is prevented. A sprite with an opaque palette moves across to show that it never
//! blends.

use super::{rgb, upload_colors, write_registers, Scene};

use parallax_core::ppu::{LayerPixel, Ppu, ScanlineInput, ScanlineSource, SCREEN_WIDTH};

/// Left and right edge of the color window (inclusive)
pub const WINDOW_LEFT: usize = 64;
pub const WINDOW_RIGHT: usize = 191;

#[derive(Default)]
pub struct BlendScene {
    frame: usize,
}

impl Scene for BlendScene {
    fn description(&self) -> &'static str {
        "color math: main and subscreen averaged inside the color window"
    }

    fn setup(&mut self, ppu: &mut Ppu) {
        upload_colors(ppu, 0, &[rgb(0, 0, 0)]);
        upload_colors(ppu, 1, &[rgb(31, 0, 0), rgb(0, 31, 0), rgb(0, 0, 31), rgb(31, 31, 31)]);
        upload_colors(ppu, 17, &[rgb(31, 31, 0), rgb(0, 31, 31)]);
        upload_colors(ppu, 130, &[rgb(31, 16, 0)]);

        write_registers(ppu, &[
            (0x2100, 0x0f),
            (0x2105, 0x01),
            (0x2130, 0x12),         // prevent math outside the window, add subscreen
            (0x2131, 0x41),         // add, halve, BG1
            (0x21c0, 0x04),         // depth mode off
        ]);
    }
}

impl ScanlineSource for BlendScene {
    fn scanline(&mut self, vcounter: u16, input: &mut ScanlineInput) {
        if vcounter == 1 {
            self.frame += 1;
        }

        let width = SCREEN_WIDTH as usize;
        for x in 0..width {
            input.bg[0].above[x] = LayerPixel::new(1, 1 + (x / 16 % 4) as u8);
            input.bg[1].below[x] = LayerPixel::new(1, 17 + (vcounter / 16 % 2) as u8);
        }

        let sprite = self.frame * 2 % width;
        if vcounter >= 100 && vcounter < 116 {
            for x in sprite..(sprite + 16).min(width) {
                input.obj.set(x, LayerPixel::new(3, 130));
            }
        }

        input.window.set_range(WINDOW_LEFT, WINDOW_RIGHT);
    }
}
