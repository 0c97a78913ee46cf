//! PPU register interface
//!
//! The compositor registers (`$2100`-`$2133`) are write-only, reading them returns 0. The depth
//! extension registers (`$21C0`-`$21D7`) are forwarded to the `DepthExtension` and can be read
//! back. Any other address reads as 0 and ignores writes.

use super::Ppu;
use crate::depth;

/// `$2100` INIDISP
pub const INIDISP: u16 = 0x2100;
/// `$2105` BGMODE
pub const BGMODE: u16 = 0x2105;
/// `$2121` CGADD
pub const CGADD: u16 = 0x2121;
/// `$2122` CGDATA
pub const CGDATA: u16 = 0x2122;
/// `$2130` CGWSEL
pub const CGWSEL: u16 = 0x2130;
/// `$2131` CGADSUB
pub const CGADSUB: u16 = 0x2131;
/// `$2132` COLDATA
pub const COLDATA: u16 = 0x2132;
/// `$2133` SETINI
pub const SETINI: u16 = 0x2133;

macro_rules! fields_u8 {
    ( $($fld:ident)+ ) => {
        impl Ppu {
            $(
                pub fn $fld(&self) -> u8 { self.$fld }
            )+
        }
    };
}

fields_u8!(inidisp bgmode cgwsel cgadsub coldata_r coldata_g coldata_b setini);

impl Ppu {
    /// Reads a PPU register. Only the depth extension registers are readable.
    pub fn read_io(&self, addr: u16) -> u8 {
        if depth::maps_address(addr) {
            self.twofive.read_io(addr)
        } else {
            trace_unique!("read from write-only or unmapped register ${:04X}", addr);
            0
        }
    }

    /// Writes to a PPU register.
    pub fn write_io(&mut self, addr: u16, data: u8) {
        match addr {
            INIDISP => self.inidisp = data,
            BGMODE => self.bgmode = data,
            CGADD => {
                self.cgadd = data;
                self.cg_high = false;
            }
            CGDATA => {
                // The first write is latched, the second write stores the complete color
                if self.cg_high {
                    let color = (data as u16) << 8 | self.cg_lsb as u16;
                    self.cgram.set_color(self.cgadd, color);
                    self.cgadd = self.cgadd.wrapping_add(1);
                } else {
                    self.cg_lsb = data;
                }
                self.cg_high = !self.cg_high;
            }
            CGWSEL => self.cgwsel = data,
            CGADSUB => self.cgadsub = data,
            COLDATA => {
                let value = data & 0x1f;
                if data & 0x20 != 0 { self.coldata_r = value }
                if data & 0x40 != 0 { self.coldata_g = value }
                if data & 0x80 != 0 { self.coldata_b = value }
            }
            SETINI => self.setini = data,
            _ if depth::maps_address(addr) => self.twofive.write_io(addr, data),
            _ => trace_unique!("ignoring write to unmapped register ${:04X}", addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{DEPTH_CONTROL, DEPTH_FAR_HI, DEPTH_FAR_LO};

    #[test]
    fn cgram_port() {
        let mut ppu = Ppu::new();
        ppu.write_io(CGADD, 0x10);
        ppu.write_io(CGDATA, 0x34);
        ppu.write_io(CGDATA, 0x92);
        ppu.write_io(CGDATA, 0xff);
        ppu.write_io(CGDATA, 0x7f);
        assert_eq!(ppu.cgram().color(0x10), 0x1234);
        assert_eq!(ppu.cgram().color(0x11), 0x7fff);

        // Writing the address resets the latch
        ppu.write_io(CGDATA, 0x01);
        ppu.write_io(CGADD, 0x00);
        ppu.write_io(CGDATA, 0x1f);
        ppu.write_io(CGDATA, 0x00);
        assert_eq!(ppu.cgram().color(0), 0x001f);
    }

    #[test]
    fn coldata_channels() {
        let mut ppu = Ppu::new();
        ppu.write_io(COLDATA, 0xe0 | 0x0a);
        ppu.write_io(COLDATA, 0x40 | 0x1f);
        assert_eq!((ppu.coldata_r(), ppu.coldata_g(), ppu.coldata_b()), (0x0a, 0x1f, 0x0a));
    }

    #[test]
    fn compositor_registers_are_write_only() {
        let mut ppu = Ppu::new();
        ppu.write_io(CGADSUB, 0x81);
        assert_eq!(ppu.cgadsub(), 0x81);
        assert_eq!(ppu.read_io(CGADSUB), 0);
        assert_eq!(ppu.read_io(0x21c3), 0);
        assert_eq!(ppu.read_io(0x4200), 0);
    }

    #[test]
    fn depth_registers_forwarded() {
        let mut ppu = Ppu::new();
        ppu.write_io(DEPTH_CONTROL, 0x05);
        ppu.write_io(DEPTH_FAR_LO, 0xe8);
        ppu.write_io(DEPTH_FAR_HI, 0x03);
        assert_eq!(ppu.read_io(DEPTH_CONTROL), 0x05);
        assert!(ppu.depth().enabled());
        assert_eq!(ppu.depth().far_depth(), 1000);
        assert!(ppu.depth().buffer().iter().all(|&d| d == 1000));
    }

    #[test]
    fn power_restores_initial_state() {
        let mut ppu = Ppu::new();
        ppu.write_io(INIDISP, 0x0f);
        ppu.write_io(CGADSUB, 0x81);
        ppu.write_io(SETINI, 0x05);
        ppu.write_io(CGADD, 0x10);
        ppu.write_io(CGDATA, 0x34);
        ppu.write_io(CGDATA, 0x12);
        // Leaves the latch waiting for the high byte
        ppu.write_io(CGDATA, 0x55);
        ppu.write_io(DEPTH_CONTROL, 0x03);
        ppu.write_io(DEPTH_FAR_LO, 0xe8);
        ppu.write_io(DEPTH_FAR_HI, 0x03);

        ppu.power();
        assert_eq!((ppu.inidisp(), ppu.cgadsub(), ppu.setini()), (0x80, 0, 0));
        assert_eq!(ppu.cgram().color(0x10), 0);
        assert_eq!(ppu.read_io(DEPTH_CONTROL), 0x04);
        assert_eq!(ppu.depth().far_depth(), 0xffff);
        assert!(ppu.depth().buffer().iter().all(|&d| d == 0xffff));

        // The next CGDATA write is a low byte again, starting at color 0
        ppu.write_io(CGDATA, 0x1f);
        ppu.write_io(CGDATA, 0x00);
        assert_eq!(ppu.cgram().color(0), 0x001f);
        assert_eq!(ppu.cgram().color(0x11), 0);
    }
}
