//! The Parallax compositor core.
//!
//! Contains the scanline compositor (`ppu`), the depth extension that assigns a depth value to
//! every composited pixel (`depth`), the 2.5D reprojection post-process (`reproject`) and save
//! state support (`save`).

#![deny(unused_import_braces)]

#[macro_use] extern crate log;
extern crate byteorder;

#[macro_use] mod log_util;
#[macro_use] pub mod save;
pub mod depth;
pub mod ppu;
pub mod reproject;
