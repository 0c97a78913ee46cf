//! Priority and depth arbitration between layer pixels

use crate::ppu::Layer;

/// A layer pixel competing for a spot on one of the sub-planes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PixelCandidate {
    pub layer: Layer,
    /// `0` = the layer has no pixel here. Such candidates never win.
    pub priority: u8,
    pub depth: u16,
    /// Packed 15-bit color
    pub color: u16,
    /// Whether the layer participates in color math
    pub color_enable: bool,
}

/// Selects the winning candidate and returns its index, or `None` if all candidates are
/// transparent.
///
/// Candidates are visited in order. A candidate replaces the current winner if its priority is
/// strictly higher. With depth mode enabled it also wins on equal priority if it is strictly
/// nearer (smaller depth), and with `override_priority` set, being strictly nearer is enough,
/// whatever the priority. Ties keep the earlier candidate.
pub fn select_best(candidates: &[PixelCandidate],
                   depth_enabled: bool,
                   override_priority: bool) -> Option<usize> {
    let mut best: Option<(usize, u8, u16)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.priority == 0 {
            continue;
        }

        let replace = match best {
            None => true,
            Some((_, best_priority, best_depth)) => {
                if candidate.priority > best_priority {
                    true
                } else if depth_enabled && candidate.depth < best_depth {
                    candidate.priority == best_priority || override_priority
                } else {
                    false
                }
            }
        };

        if replace {
            best = Some((index, candidate.priority, candidate.depth));
        }
    }

    best.map(|(index, _, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(priority: u8, depth: u16) -> PixelCandidate {
        PixelCandidate {
            layer: Layer::Bg1,
            priority: priority,
            depth: depth,
            color: 0,
            color_enable: false,
        }
    }

    #[test]
    fn transparent_never_wins() {
        assert_eq!(select_best(&[], true, true), None);
        assert_eq!(select_best(&[candidate(0, 0), candidate(0, 5)], true, true), None);
        assert_eq!(select_best(&[candidate(0, 0), candidate(1, 0xffff)], true, true), Some(1));
    }

    #[test]
    fn priority_wins_without_depth() {
        for &(near, far) in &[(0u16, 0xffffu16), (0xffff, 0), (100, 100)] {
            let candidates = [candidate(2, near), candidate(5, far), candidate(3, 0)];
            assert_eq!(select_best(&candidates, false, false), Some(1));
            // `override_priority` has no effect while depth mode is disabled
            assert_eq!(select_best(&candidates, false, true), Some(1));
        }
    }

    #[test]
    fn depth_breaks_priority_ties() {
        let candidates = [candidate(4, 300), candidate(4, 200), candidate(4, 250)];
        assert_eq!(select_best(&candidates, true, false), Some(1));
        assert_eq!(select_best(&candidates, false, false), Some(0));
    }

    #[test]
    fn equal_depth_keeps_first() {
        let candidates = [candidate(4, 200), candidate(4, 200)];
        assert_eq!(select_best(&candidates, true, false), Some(0));
        assert_eq!(select_best(&candidates, true, true), Some(0));
    }

    #[test]
    fn higher_priority_beats_nearer_depth() {
        let candidates = [candidate(2, 10), candidate(6, 900)];
        assert_eq!(select_best(&candidates, true, false), Some(1));
    }

    #[test]
    fn override_lets_nearer_win() {
        let candidates = [candidate(6, 900), candidate(2, 10)];
        assert_eq!(select_best(&candidates, true, false), Some(0));
        assert_eq!(select_best(&candidates, true, true), Some(1));
    }
}
