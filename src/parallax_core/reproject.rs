//! 2.5D reprojection of a finished frame
//!
//! Every pixel is lifted by an amount proportional to its distance from the far plane, and pushed
//! sideways away from the horizontal center by an amount proportional to that lift. The result
//! looks like the frame was a height field viewed at an angle: near geometry grows upwards and
//! fans out. Where several pixels land on the same spot, the nearest one wins.

use std::cmp;

/// Maximum vertical displacement in pixels (reached by pixels at depth 0)
const HEIGHT_SCALE: f32 = 24.0;
/// Horizontal displacement per pixel of vertical displacement, at the left and right edges
const SPREAD_SCALE: f32 = 0.5;

/// Scratch buffers of the reprojection. Resized and cleared on every call, so they can be reused
/// across frames to avoid reallocating.
#[derive(Debug, Default)]
pub struct ReprojectionBuffers {
    color: Vec<u32>,
    depth: Vec<u16>,
}

/// The reprojected image, borrowed from the `ReprojectionBuffers` it was rendered to.
#[derive(Debug)]
pub struct Reprojection<'a> {
    pub color: &'a [u32],
    /// Pixels per row. Always equal to the width.
    pub pitch: usize,
}

/// Returns `true` if `len` elements are enough for an image of `height` rows of `width` pixels
/// with `pitch` elements between row starts.
fn fits(len: usize, width: usize, height: usize, pitch: usize) -> bool {
    pitch >= width && (height - 1).checked_mul(pitch)
        .and_then(|last_row| last_row.checked_add(width))
        .map_or(false, |needed| len >= needed)
}

/// Rounds half away from zero and clamps to `0..limit`.
fn to_index(value: f32, limit: usize) -> usize {
    let rounded = value.round();
    if rounded <= 0.0 {
        0
    } else {
        cmp::min(rounded as usize, limit - 1)
    }
}

/// Reprojects a `width * height` image using its depth buffer.
///
/// Pixels at `far_depth` (or beyond) stay where they are. Returns `None` if either dimension is
/// 0 or one of the input slices is too short for the given dimensions and pitch.
pub fn reproject<'a>(source: &[u32],
                     source_pitch: usize,
                     width: usize,
                     height: usize,
                     depth: &[u16],
                     depth_pitch: usize,
                     far_depth: u16,
                     buffers: &'a mut ReprojectionBuffers) -> Option<Reprojection<'a>> {
    if width == 0 || height == 0 {
        return None;
    }
    if !fits(source.len(), width, height, source_pitch)
        || !fits(depth.len(), width, height, depth_pitch) {
        debug_unique!("reprojection input too small for {}x{} (color pitch {}, depth pitch {})",
            width, height, source_pitch, depth_pitch);
        return None;
    }

    let pixels = width * height;
    let dest_color = &mut buffers.color;
    let dest_depth = &mut buffers.depth;
    dest_color.clear();
    dest_color.resize(pixels, 0);
    dest_depth.clear();
    dest_depth.resize(pixels, far_depth);

    let inv_range = if far_depth == 0 { 0.0 } else { 1.0 / far_depth as f32 };
    let center_x = (width - 1) as f32 * 0.5;

    for y in 0..height {
        let source_row = &source[y * source_pitch..y * source_pitch + width];
        let depth_row = &depth[y * depth_pitch..y * depth_pitch + width];

        for (x, (&color, &z)) in source_row.iter().zip(depth_row).enumerate() {
            let diff = far_depth.saturating_sub(z);
            let lift = diff as f32 * inv_range * HEIGHT_SCALE;

            let mut dest_x = x as f32;
            if center_x > 0.0 {
                dest_x += (x as f32 - center_x) / center_x * lift * SPREAD_SCALE;
            }
            let dest_y = y as f32 - lift;

            let index = to_index(dest_y, height) * width + to_index(dest_x, width);
            if z <= dest_depth[index] {
                dest_depth[index] = z;
                dest_color[index] = color;
            }
        }
    }

    Some(Reprojection {
        color: &buffers.color,
        pitch: width,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_plane_is_unchanged() {
        let source: Vec<u32> = (0..6 * 5).map(|i| 0x010101 * i).collect();
        let depth = vec![800; 6 * 5];
        let mut buffers = ReprojectionBuffers::default();
        let out = reproject(&source, 6, 6, 5, &depth, 6, 800, &mut buffers).unwrap();
        assert_eq!(out.pitch, 6);
        assert_eq!(out.color, &source[..]);
    }

    #[test]
    fn near_pixel_moves_up_and_out() {
        let source: Vec<u32> = (1..17).collect();
        let mut depth = vec![1000; 16];
        depth[2 * 4 + 2] = 500;

        let mut buffers = ReprojectionBuffers::default();
        let out = reproject(&source, 4, 4, 4, &depth, 4, 1000, &mut buffers).unwrap();

        // Lifted by 12 lines (clamped to row 0), pushed right by 2 (clamped to column 3)
        assert_eq!(out.color[3], source[2 * 4 + 2]);
        assert_eq!(out.color[2 * 4 + 2], 0);
        for i in 0..16 {
            if i != 3 && i != 2 * 4 + 2 {
                assert_eq!(out.color[i], source[i], "pixel {}", i);
            }
        }
    }

    #[test]
    fn nearest_wins_regardless_of_order() {
        // A single column, so there's no horizontal spread
        let source: Vec<u32> = (0..30).map(|y| 0x100 + y).collect();
        let mut depth = vec![1000; 30];
        // Both land on line 8: 20 - 12 and 14 - 6
        depth[20] = 500;
        depth[14] = 750;
        // Both land on line 0, the nearer one is scanned first
        depth[2] = 0;
        depth[6] = 750;

        let mut buffers = ReprojectionBuffers::default();
        let out = reproject(&source, 1, 1, 30, &depth, 1, 1000, &mut buffers).unwrap();
        assert_eq!(out.color[8], source[20]);
        assert_eq!(out.color[0], source[2]);
        assert_eq!(out.color[14], 0);
        assert_eq!(out.color[20], 0);
    }

    #[test]
    fn pitch_and_reuse() {
        // Two rows of 3 pixels with padding
        let source = [1u32, 2, 3, 99, 4, 5, 6, 99];
        let depth = [7u16, 7, 7, 0, 0, 7, 7, 7, 0, 0];
        let mut buffers = ReprojectionBuffers::default();
        {
            let out = reproject(&source, 4, 3, 2, &depth, 5, 7, &mut buffers).unwrap();
            assert_eq!(out.color, &[1, 2, 3, 4, 5, 6]);
        }

        // Stale contents of a previous call don't leak into the next one
        let out = reproject(&[9], 1, 1, 1, &[3], 1, 3, &mut buffers).unwrap();
        assert_eq!(out.color, &[9]);
    }

    #[test]
    fn zero_far_depth() {
        let mut buffers = ReprojectionBuffers::default();
        let out = reproject(&[5, 6], 2, 2, 1, &[0, 0], 2, 0, &mut buffers).unwrap();
        assert_eq!(out.color, &[5, 6]);
    }

    #[test]
    fn rejects_bad_input() {
        let mut buffers = ReprojectionBuffers::default();
        let color = [0u32; 16];
        let depth = [0u16; 16];
        assert!(reproject(&color, 4, 0, 4, &depth, 4, 10, &mut buffers).is_none());
        assert!(reproject(&color, 4, 4, 0, &depth, 4, 10, &mut buffers).is_none());
        assert!(reproject(&color[..15], 4, 4, 4, &depth, 4, 10, &mut buffers).is_none());
        assert!(reproject(&color, 4, 4, 4, &depth[..12], 4, 10, &mut buffers).is_none());
        assert!(reproject(&color, 3, 4, 4, &depth, 4, 10, &mut buffers).is_none());
        assert!(reproject(&[], 1, 1, 1, &[], 1, 10, &mut buffers).is_none());
        // The last row doesn't need the padding
        assert!(reproject(&color[..14], 5, 4, 3, &depth, 4, 10, &mut buffers).is_some());
    }
}
