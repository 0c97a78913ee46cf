//! Register interface of the depth extension
//!
//! ```text
//! $21C0      ---ocdde  Control: e = depth mode, o = priority override, c = clamp depth
//!                      (bits 0, 1, 2)
//! $21C1      Far depth, low byte
//! $21C2      Far depth, high byte
//! $21C3      (unmapped)
//! $21C4-$21C7  BG1: base low, base high, palette scale, priority scale
//! $21C8-$21CB  BG2
//! $21CC-$21CF  BG3
//! $21D0-$21D3  BG4
//! $21D4-$21D7  Sprites
//! ```
//!
//! All registers are readable. Unmapped addresses read as 0 and ignore writes.

use super::DepthExtension;

/// `$21C0` Control register
pub const DEPTH_CONTROL: u16 = 0x21c0;
/// `$21C1` Far depth low byte
pub const DEPTH_FAR_LO: u16 = 0x21c1;
/// `$21C2` Far depth high byte
pub const DEPTH_FAR_HI: u16 = 0x21c2;
/// First address of the per-layer blocks
pub const DEPTH_LAYER_START: u16 = 0x21c4;
/// Last address of the per-layer blocks (inclusive)
pub const DEPTH_LAYER_END: u16 = 0x21d7;

/// Returns `true` if `addr` belongs to a depth extension register.
pub fn maps_address(addr: u16) -> bool {
    match addr {
        DEPTH_CONTROL | DEPTH_FAR_LO | DEPTH_FAR_HI => true,
        DEPTH_LAYER_START..=DEPTH_LAYER_END => true,
        _ => false,
    }
}

/// Splits a layer block address into the layer index (0-4) and the byte offset (0-3).
fn layer_register(addr: u16) -> (usize, u16) {
    let offset = addr - DEPTH_LAYER_START;
    ((offset >> 2) as usize, offset & 3)
}

impl DepthExtension {
    /// Reads a depth register. Unmapped addresses read as 0.
    pub fn read_io(&self, addr: u16) -> u8 {
        let settings = self.settings();
        match addr {
            DEPTH_CONTROL => {
                settings.enable as u8
                    | (settings.override_priority as u8) << 1
                    | (settings.clamp_depth as u8) << 2
            }
            DEPTH_FAR_LO => settings.far_depth as u8,
            DEPTH_FAR_HI => (settings.far_depth >> 8) as u8,
            DEPTH_LAYER_START..=DEPTH_LAYER_END => {
                let (index, offset) = layer_register(addr);
                let layer = settings.layer(index);
                match offset {
                    0 => layer.base as u8,
                    1 => (layer.base >> 8) as u8,
                    2 => layer.palette_scale as u8,
                    _ => layer.priority_scale as u8,
                }
            }
            _ => 0,
        }
    }

    /// Writes a depth register.
    ///
    /// The write is applied to a copy of the current settings, which then goes through
    /// `configure`, so the far depth register resets the depth buffer when its value changes.
    pub fn write_io(&mut self, addr: u16, data: u8) {
        let mut settings = *self.settings();
        match addr {
            DEPTH_CONTROL => {
                settings.enable = data & 0x01 != 0;
                settings.override_priority = data & 0x02 != 0;
                settings.clamp_depth = data & 0x04 != 0;
            }
            DEPTH_FAR_LO => settings.far_depth = settings.far_depth & 0xff00 | data as u32,
            DEPTH_FAR_HI => settings.far_depth = settings.far_depth & 0x00ff | (data as u32) << 8,
            DEPTH_LAYER_START..=DEPTH_LAYER_END => {
                let (index, offset) = layer_register(addr);
                let layer = settings.layer_mut(index);
                match offset {
                    0 => layer.base = layer.base & 0xff00 | data as u32,
                    1 => layer.base = layer.base & 0x00ff | (data as u32) << 8,
                    2 => layer.palette_scale = data as u32,
                    _ => layer.priority_scale = data as u32,
                }
            }
            _ => return,
        }

        trace!("depth register ${:04X} = ${:02X}", addr, data);
        self.configure(settings);
    }
}
