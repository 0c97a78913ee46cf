//! Pseudo-hires with depth
//!
//! The main screen (BG1) and the subscreen (BG2) are output side by side, 512 pixels per line.
//! Both carry their own depth, so the depth buffer alternates between the two layers.

use super::{rgb, upload_colors, write_registers, Scene};

use parallax_core::ppu::{LayerPixel, Ppu, ScanlineInput, ScanlineSource, SCREEN_WIDTH};

#[derive(Default)]
pub struct HiresScene;

impl Scene for HiresScene {
    fn description(&self) -> &'static str {
        "pseudo-hires: main and subscreen interleaved, each with its own depth"
    }

    fn setup(&mut self, ppu: &mut Ppu) {
        upload_colors(ppu, 0, &[rgb(0, 0, 4)]);
        upload_colors(ppu, 1, &[rgb(31, 20, 0), rgb(8, 8, 31)]);

        write_registers(ppu, &[
            (0x2100, 0x0f),
            (0x2105, 0x01),
            (0x2133, 0x08),         // pseudo-hires
            (0x21c0, 0x05),         // depth mode, clamp
            (0x21c1, 0x00),
            (0x21c2, 0x20),         // far depth $2000
            // BG1 nearer than BG2
            (0x21c4, 0x00), (0x21c5, 0x04), (0x21c7, 0x00),
            (0x21c8, 0x00), (0x21c9, 0x10), (0x21cb, 0x00),
        ]);
    }
}

impl ScanlineSource for HiresScene {
    fn scanline(&mut self, vcounter: u16, input: &mut ScanlineInput) {
        for x in 0..SCREEN_WIDTH as usize {
            // Diagonal stripes on the main screen, a checkerboard on the subscreen
            if (x + vcounter as usize) % 32 < 12 {
                input.bg[0].above[x] = LayerPixel::new(1, 1);
            }
            if (x / 8 + vcounter as usize / 8) % 2 == 0 {
                input.bg[1].below[x] = LayerPixel::new(1, 2);
            }
        }
    }
}
