//! Built-in scenes.
//!
//! A scene programs the PPU registers (colors, color math, depth extension) once and then acts as
//! the `ScanlineSource` that feeds the compositor with layer pixels. Scenes stand in for the tile
//! and sprite renderer, so the compositor can be exercised without one.

#![deny(unused_import_braces)]

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate log;
extern crate parallax_core;

use parallax_core::ppu::{Ppu, ScanlineSource};

use std::collections::BTreeMap;

mod blend;
mod city;
mod hires;

pub use self::blend::BlendScene;
pub use self::city::CityScene;
pub use self::hires::HiresScene;

/// A scanline source that knows how to set up the PPU for itself.
pub trait Scene: ScanlineSource {
    /// A one-line description, shown when listing scenes
    fn description(&self) -> &'static str;

    /// Programs registers and CGRAM. Called once, before the first frame.
    fn setup(&mut self, ppu: &mut Ppu);
}

pub type SceneMap = BTreeMap<&'static str, fn() -> Box<dyn Scene>>;

lazy_static! {
    pub static ref SCENE_MAP: SceneMap = {
        fn make_city() -> Box<dyn Scene> { Box::new(CityScene::new(true)) }
        fn make_flat() -> Box<dyn Scene> { Box::new(CityScene::new(false)) }
        fn make_blend() -> Box<dyn Scene> { Box::new(BlendScene::default()) }
        fn make_hires() -> Box<dyn Scene> { Box::new(HiresScene::default()) }

        let mut map = SceneMap::new();
        map.insert("city", make_city as fn() -> Box<dyn Scene>);
        map.insert("flat", make_flat);
        map.insert("blend", make_blend);
        map.insert("hires", make_hires);
        map
    };
}

pub const DEFAULT_SCENE: &str = "city";

/// Creates the scene registered under `name`.
pub fn create_scene(name: &str) -> Option<Box<dyn Scene>> {
    SCENE_MAP.get(name).map(|create| create())
}

/// Performs a list of register writes, in order.
pub fn write_registers(ppu: &mut Ppu, writes: &[(u16, u8)]) {
    for &(addr, data) in writes {
        ppu.write_io(addr, data);
    }
}

/// Uploads colors to CGRAM through the `$2121`/`$2122` ports, starting at index `start`.
pub fn upload_colors(ppu: &mut Ppu, start: u8, colors: &[u16]) {
    ppu.write_io(0x2121, start);
    for &color in colors {
        ppu.write_io(0x2122, color as u8);
        ppu.write_io(0x2122, (color >> 8) as u8);
    }
    trace!("uploaded {} colors to CGRAM ${:02X}", colors.len(), start);
}

/// Packs 5-bit channels into a 15-bit color.
pub fn rgb(r: u16, g: u16, b: u16) -> u16 {
    (b & 0x1f) << 10 | (g & 0x1f) << 5 | r & 0x1f
}

/// Cheap integer hash, used to place procedural scene elements deterministically.
fn noise(mut n: u32) -> u32 {
    n = (n ^ 61) ^ (n >> 16);
    n = n.wrapping_mul(9);
    n ^= n >> 4;
    n = n.wrapping_mul(0x27d4_eb2d);
    n ^ (n >> 15)
}
