//! Save state writing and reading
//!
//! A save state contains the depth configuration, the compositor registers and CGRAM. Neither
//! the frame buffer nor the depth buffer is saved: both are regenerated by the next rendered
//! frame, and restoring a state resets the depth buffer to the restored far depth.

use crate::ppu::Ppu;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use std::io::prelude::*;
use std::io::{self, BufWriter};

/// Written at the start of every save state
const MAGIC: &[u8; 4] = b"PLXS";
/// Incremented whenever the layout changes
const VERSION: u8 = 1;

/// Types which can be written to and restored from a save state.
///
/// `restore_state` overwrites the saved parts of an existing value. Anything that isn't saved
/// (buffers, render-time state) is left alone or recomputed by the implementation.
///
/// Struct impls should be generated with `impl_save_state!`, which names every field of the
/// type, so adding a field without deciding whether it is saved fails to compile.
pub trait SaveState {
    fn save_state<W: Write>(&self, w: &mut W) -> io::Result<()>;
    fn restore_state<R: Read>(&mut self, r: &mut R) -> io::Result<()>;
}

impl SaveState for u8 {
    fn save_state<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(*self)
    }

    fn restore_state<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
        *self = r.read_u8()?;
        Ok(())
    }
}

impl SaveState for u16 {
    fn save_state<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(*self)
    }

    fn restore_state<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
        *self = r.read_u16::<LittleEndian>()?;
        Ok(())
    }
}

/// `bool` is saved as a `1` or `0` byte. Any other byte is rejected.
impl SaveState for bool {
    fn save_state<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(if *self { 1 } else { 0 })
    }

    fn restore_state<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
        match r.read_u8()? {
            0 => *self = false,
            1 => *self = true,
            other => return Err(io::Error::new(io::ErrorKind::InvalidData,
                format!("invalid byte value for bool: {}", other))),
        }
        Ok(())
    }
}

/// Generates an impl of `SaveState` for a struct, saving/restoring the first list of fields in
/// order and ignoring the second list.
///
/// Both lists together must name every field of the type exactly once or this won't compile.
#[macro_export]
macro_rules! impl_save_state {
    ( $t:ident { $( $field:ident ),* } ignore { $( $ignore:ident ),* } ) => {
        impl $crate::save::SaveState for $t {
            fn save_state<W: ::std::io::Write>(&self, w: &mut W) -> ::std::io::Result<()> {
                let $t { $(ref $field,)* $(ref $ignore,)* } = *self;
                $(
                    $crate::save::SaveState::save_state($field, w)?;
                )*
                $(
                    let _ = $ignore;
                )*
                Ok(())
            }

            fn restore_state<R: ::std::io::Read>(&mut self, r: &mut R) -> ::std::io::Result<()> {
                let $t { $(ref mut $field,)* $(ref mut $ignore,)* } = *self;
                $(
                    $crate::save::SaveState::restore_state($field, r)?;
                )*
                $(
                    let _ = $ignore;
                )*
                Ok(())
            }
        }
    };
}

impl Ppu {
    /// Saves the depth configuration, compositor registers and CGRAM to `w`.
    pub fn create_save_state(&self, w: &mut dyn Write) -> io::Result<()> {
        // Wrap the writer in a `BufWriter` so the caller can't forget it
        let mut bufw = BufWriter::new(w);
        bufw.write_all(MAGIC)?;
        bufw.write_u8(VERSION)?;
        self.save_state(&mut bufw)?;
        bufw.flush()
    }

    /// Restores a state written by `create_save_state`.
    ///
    /// Fails with `InvalidData` if the header doesn't match. On failure, the PPU may be left
    /// partially restored.
    pub fn restore_save_state(&mut self, mut r: &mut dyn Read) -> io::Result<()> {
        let mut magic = [0; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "not a save state"));
        }
        let version = r.read_u8()?;
        if version != VERSION {
            return Err(io::Error::new(io::ErrorKind::InvalidData,
                format!("unsupported save state version {} (expected {})", version, VERSION)));
        }

        self.restore_state(&mut r)?;
        info!("restored save state (depth mode {})", self.depth().enabled());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::{DEPTH_CONTROL, DEPTH_FAR_HI, DEPTH_FAR_LO};

    use std::io::Cursor;

    fn configured() -> Ppu {
        let mut ppu = Ppu::new();
        ppu.write_io(0x2100, 0x0c);
        ppu.write_io(0x2131, 0x43);
        ppu.write_io(0x2132, 0xe5);
        ppu.write_io(0x2121, 0x20);
        ppu.write_io(0x2122, 0x1f);
        ppu.write_io(0x2122, 0x7c);
        ppu.write_io(DEPTH_CONTROL, 0x03);
        ppu.write_io(DEPTH_FAR_LO, 0x00);
        ppu.write_io(DEPTH_FAR_HI, 0x10);
        ppu.write_io(0x21c5, 0x02);
        ppu.write_io(0x21d6, 0x07);
        ppu
    }

    #[test]
    fn primitives() {
        let mut buf = Vec::new();
        0x1234u16.save_state(&mut buf).unwrap();
        true.save_state(&mut buf).unwrap();
        0xabu8.save_state(&mut buf).unwrap();
        assert_eq!(buf, [0x34, 0x12, 1, 0xab]);

        let mut r = Cursor::new(buf);
        let (mut a, mut b, mut c) = (0u16, false, 0u8);
        a.restore_state(&mut r).unwrap();
        b.restore_state(&mut r).unwrap();
        c.restore_state(&mut r).unwrap();
        assert_eq!((a, b, c), (0x1234, true, 0xab));
    }

    #[test]
    fn invalid_bool() {
        let mut b = false;
        let err = b.restore_state(&mut Cursor::new(vec![2])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn restore_roundtrip() {
        let ppu = configured();
        let mut state = Vec::new();
        ppu.create_save_state(&mut state).unwrap();
        assert_eq!(&state[..4], MAGIC);

        let mut restored = Ppu::new();
        restored.restore_save_state(&mut Cursor::new(&state[..])).unwrap();

        assert_eq!(restored.inidisp(), 0x0c);
        assert_eq!(restored.cgadsub(), 0x43);
        assert_eq!(restored.coldata_r(), 0x05);
        assert_eq!(restored.coldata_b(), 0x05);
        assert_eq!(restored.cgram().color(0x20), 0x7c1f);
        assert_eq!(restored.depth().settings(), ppu.depth().settings());
        assert_eq!(restored.read_io(0x21c5), 0x02);
        assert_eq!(restored.read_io(0x21d6), 0x07);
        assert!(restored.depth().buffer().iter().all(|&d| d == 0x1000));
    }

    #[test]
    fn restore_resets_depth_buffer() {
        let mut ppu = configured();
        let mut state = Vec::new();
        ppu.create_save_state(&mut state).unwrap();

        ppu.depth_mut().begin_scanline(10, false, false);
        ppu.depth_mut().write(0, false, 0, false, 3, false);
        assert_eq!(ppu.depth().buffer()[10 * 1024], 3);

        ppu.restore_save_state(&mut Cursor::new(&state[..])).unwrap();
        assert_eq!(ppu.depth().buffer()[10 * 1024], 0x1000);
    }

    #[test]
    fn bad_header() {
        let mut ppu = Ppu::new();
        let err = ppu.restore_save_state(&mut Cursor::new(&b"ZSNES Save State"[..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = ppu.restore_save_state(&mut Cursor::new(&b"PLXS\x09"[..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = ppu.restore_save_state(&mut Cursor::new(&b"PL"[..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn truncated_state() {
        let mut state = Vec::new();
        configured().create_save_state(&mut state).unwrap();
        state.truncate(state.len() - 3);
        let err = Ppu::new().restore_save_state(&mut Cursor::new(&state[..])).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
