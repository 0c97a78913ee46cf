//! A night skyline with a road and moving cars

use super::{noise, rgb, upload_colors, write_registers, Scene};

use parallax_core::ppu::{LayerPixel, Ppu, ScanlineInput, ScanlineSource, SCREEN_WIDTH};

/// First line of the road. Buildings stand on this line.
const GROUND: u16 = 176;
const BUILDING_WIDTH: usize = 24;

/// Sky gradient: CGRAM 1-8
const SKY: u8 = 1;
/// Building facades: CGRAM 16-23, lit windows: 24
const FACADE: u8 = 16;
const WINDOW: u8 = 24;
/// Road bands, nearest first: CGRAM 32-39, lane markings: 40
const ROAD: u8 = 32;
const MARKING: u8 = 40;
/// Car colors (sprite palette 4, color math enabled): CGRAM 200-203
const CAR: u8 = 200;

/// Far depth of the scene. The sky sits exactly at it, so it doesn't count as geometry.
const FAR: u16 = 0x1000;

struct Car {
    x: usize,
    /// Pixels per frame, negative = driving left
    speed: isize,
    /// Top line
    top: u16,
    color: u8,
}

/// The skyline scene. With depth mode off (the "flat" scene), the same picture is composited by
/// priority alone and the depth buffer stays empty.
pub struct CityScene {
    depth: bool,
    frame: usize,
    cars: Vec<Car>,
}

impl CityScene {
    pub fn new(depth: bool) -> CityScene {
        CityScene {
            depth: depth,
            frame: 0,
            cars: vec![
                Car { x: 20, speed: 3, top: 192, color: CAR },
                Car { x: 150, speed: 2, top: 200, color: CAR + 1 },
                Car { x: 90, speed: -4, top: 184, color: CAR + 2 },
                Car { x: 230, speed: -1, top: 208, color: CAR + 3 },
            ],
        }
    }

    /// Height of building `index` in lines
    fn building_height(index: usize) -> u16 {
        40 + (noise(index as u32) % 110) as u16
    }

    fn car_x(&self, car: &Car) -> usize {
        let width = SCREEN_WIDTH as isize;
        let x = (car.x as isize + car.speed * self.frame as isize) % width;
        (if x < 0 { x + width } else { x }) as usize
    }

    fn sky(line: u16, input: &mut ScanlineInput) {
        let band = SKY + (line / 24).min(7) as u8;
        for x in 0..SCREEN_WIDTH as usize {
            input.bg[1].set(x, LayerPixel::new(1, band));
        }
    }

    fn buildings(line: u16, input: &mut ScanlineInput) {
        for x in 0..SCREEN_WIDTH as usize {
            let index = x / BUILDING_WIDTH;
            let top = GROUND - Self::building_height(index);
            if line < top {
                continue;
            }

            let hash = noise(index as u32 + 1000);
            let column = x % BUILDING_WIDTH;
            let window = column % 4 == 2 && line % 6 >= 2 && line % 6 < 4
                && noise(hash ^ (line as u32 / 6) << 8 ^ column as u32) % 3 == 0;
            let palette = if window { WINDOW } else { FACADE + (hash % 8) as u8 };
            input.bg[0].set(x, LayerPixel::new(2, palette));
        }
    }

    fn road(line: u16, input: &mut ScanlineInput) {
        // Bands get nearer (and lower palette indices) towards the bottom of the screen
        let band = 7u16.saturating_sub((line - GROUND) / 8) as u8;
        for x in 0..SCREEN_WIDTH as usize {
            let marking = line == GROUND + 24 && x % 32 < 16;
            let palette = if marking { MARKING } else { ROAD + band };
            input.bg[2].set(x, LayerPixel::new(2, palette));
        }
    }

    fn cars(&self, line: u16, input: &mut ScanlineInput) {
        for car in &self.cars {
            if line < car.top || line >= car.top + 10 {
                continue;
            }
            let left = self.car_x(car);
            for dx in 0..32 {
                let x = (left + dx) % SCREEN_WIDTH as usize;
                input.obj.set(x, LayerPixel::new(3, car.color));
            }
        }
    }
}

impl Scene for CityScene {
    fn description(&self) -> &'static str {
        if self.depth {
            "night skyline with depth: buildings, road and cars at different distances"
        } else {
            "the skyline composited by priority only (depth mode off)"
        }
    }

    fn setup(&mut self, ppu: &mut Ppu) {
        let mut sky = Vec::new();
        for i in 0..8 {
            sky.push(rgb(2 + i, 1 + i / 2, 10 + i));
        }
        let facades: Vec<u16> = (0..8).map(|i| rgb(4 + i, 4 + i, 6 + i)).collect();
        let road: Vec<u16> = (0..8).map(|i| rgb(12 - i, 12 - i, 12 - i)).collect();

        upload_colors(ppu, 0, &[rgb(1, 0, 6)]);
        upload_colors(ppu, SKY, &sky);
        upload_colors(ppu, FACADE, &facades);
        upload_colors(ppu, WINDOW, &[rgb(31, 27, 12)]);
        upload_colors(ppu, ROAD, &road);
        upload_colors(ppu, MARKING, &[rgb(31, 31, 24)]);
        upload_colors(ppu, CAR, &[rgb(28, 4, 4), rgb(4, 20, 28), rgb(30, 30, 30), rgb(24, 24, 0)]);

        write_registers(ppu, &[
            (0x2100, 0x0f),         // full brightness
            (0x2105, 0x01),         // mode 1
            (0x2130, 0x00),         // fixed color
            (0x2131, 0x12),         // add, BG2 and sprite palettes 4-7
            (0x2132, 0x22),         // a reddish glow
            (0x2132, 0x41),
            (0x2132, 0x80),
        ]);

        let control = if self.depth { 0x05 } else { 0x04 };
        write_registers(ppu, &[
            (0x21c0, control),      // depth mode, clamp
            (0x21c1, FAR as u8),
            (0x21c2, (FAR >> 8) as u8),
            // BG1 (buildings): farther facade palettes are farther away
            (0x21c4, 0x00), (0x21c5, 0x08), (0x21c6, 0x20), (0x21c7, 0x00),
            // BG2 (sky): exactly at the far plane
            (0x21c8, FAR as u8), (0x21c9, (FAR >> 8) as u8), (0x21ca, 0x00), (0x21cb, 0x00),
            // BG3 (road)
            (0x21cc, 0x00), (0x21cd, 0x01), (0x21ce, 0x10), (0x21cf, 0x00),
            // Sprites (cars): nearest
            (0x21d4, 0x80), (0x21d5, 0x00), (0x21d6, 0x00), (0x21d7, 0x10),
        ]);

        info!("city scene set up (depth mode {})", self.depth);
    }
}

impl ScanlineSource for CityScene {
    fn scanline(&mut self, vcounter: u16, input: &mut ScanlineInput) {
        if vcounter == 1 {
            self.frame += 1;
        }

        Self::sky(vcounter, input);
        if vcounter < GROUND {
            Self::buildings(vcounter, input);
        } else {
            Self::road(vcounter, input);
        }
        self.cars(vcounter, input);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cars_wrap_around() {
        let mut scene = CityScene::new(true);
        scene.frame = 100;
        for car in &scene.cars {
            assert!(scene.car_x(car) < SCREEN_WIDTH as usize);
        }
        scene.frame = 0;
        assert_eq!(scene.car_x(&scene.cars[2]), 90);
    }

    #[test]
    fn layers_per_line() {
        let mut scene = CityScene::new(true);
        let mut input = ScanlineInput::default();
        scene.scanline(10, &mut input);
        assert!(input.bg[1].above.iter().all(|p| p.priority == 1));
        assert!(input.bg[2].above.iter().all(|p| p.is_transparent()));

        input.clear();
        scene.scanline(GROUND + 1, &mut input);
        assert!(input.bg[0].above.iter().all(|p| p.is_transparent()));
        assert!(input.bg[2].above.iter().all(|p| p.priority == 2));
    }

    #[test]
    fn buildings_stand_on_the_ground() {
        let mut input = ScanlineInput::default();
        CityScene::buildings(GROUND - 1, &mut input);
        assert!(input.bg[0].above.iter().all(|p| !p.is_transparent()));
    }
}
