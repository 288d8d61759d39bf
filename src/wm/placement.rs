//! Placement Module
//!
//! Smart placement searches a coarse grid (plus the edges of existing
//! windows) for the first spot where the new frame overlaps nothing; when
//! the sweep finds none, windows cascade from the top-left corner.

use tracing::debug;

use crate::config::{PlacementConfig, PlacementDirection, PlacementPolicy};
use crate::shared::Geometry;

/// Where the cascade restarts, relative to the usable area
pub const CASCADE_ORIGIN: i32 = 32;

/// Next cascade position of a workspace, relative to the usable area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadePoint {
    pub x: i32,
    pub y: i32,
}

impl Default for CascadePoint {
    fn default() -> Self {
        Self {
            x: CASCADE_ORIGIN,
            y: CASCADE_ORIGIN,
        }
    }
}

/// One placement run
pub struct Placer<'a> {
    pub config: &'a PlacementConfig,
    /// Usable area (screen minus struts)
    pub area: Geometry,
    /// Frames of non-iconic windows plus reserved strut rectangles
    pub obstacles: &'a [Geometry],
    /// Cascade offset per window (the titlebar height)
    pub cascade_step: u32,
}

impl<'a> Placer<'a> {
    /// Position for a frame of `size`, always inside the usable area when
    /// the frame fits.
    pub fn place(&self, size: (u32, u32), cascade: &mut CascadePoint) -> Geometry {
        let smart = match self.config.policy {
            PlacementPolicy::Smart => self.smart(size),
            PlacementPolicy::Cascade => None,
        };
        let (x, y) = match smart {
            Some(position) => position,
            None => self.cascade(cascade),
        };
        Geometry::new(x, y, size.0, size.1).clamped_to(&self.area)
    }

    /// First free spot in sweep order, if any.
    pub fn smart(&self, size: (u32, u32)) -> Option<(i32, i32)> {
        let xs = self.candidates(
            self.area.x,
            self.area.right(),
            size.0,
            self.config.left_to_right,
            |g| (g.x, g.right()),
        );
        let ys = self.candidates(
            self.area.y,
            self.area.bottom(),
            size.1,
            self.config.top_to_bottom,
            |g| (g.y, g.bottom()),
        );

        let fits = |x: i32, y: i32| {
            let candidate = Geometry::new(x, y, size.0, size.1).inflate(self.config.margin);
            !self.obstacles.iter().any(|o| candidate.intersects(o))
        };

        let found = match self.config.direction {
            PlacementDirection::Row => ys
                .iter()
                .find_map(|&y| xs.iter().find(|&&x| fits(x, y)).map(|&x| (x, y))),
            PlacementDirection::Column => xs
                .iter()
                .find_map(|&x| ys.iter().find(|&&y| fits(x, y)).map(|&y| (x, y))),
        };
        if found.is_none() {
            debug!("No free gap for {}x{}, cascading", size.0, size.1);
        }
        found
    }

    /// Candidate coordinates along one axis, in sweep order: the grid plus
    /// the positions just past every obstacle edge.
    fn candidates(
        &self,
        start: i32,
        end: i32,
        length: u32,
        forward: bool,
        span: impl Fn(&Geometry) -> (i32, i32),
    ) -> Vec<i32> {
        let length = length as i32;
        let last = end - length;
        if last < start {
            return Vec::new();
        }
        let step = self.config.grid_step.max(1) as i32;
        let margin = self.config.margin as i32;

        let mut out: Vec<i32> = if forward {
            (start..=last).step_by(step as usize).collect()
        } else {
            let mut v: Vec<i32> = Vec::new();
            let mut pos = last;
            while pos >= start {
                v.push(pos);
                pos -= step;
            }
            v
        };
        for obstacle in self.obstacles {
            let (low, high) = span(obstacle);
            let pos = if forward { high + margin } else { low - margin - length };
            if (start..=last).contains(&pos) {
                out.push(pos);
            }
        }

        out.sort_unstable();
        out.dedup();
        if !forward {
            out.reverse();
        }
        out
    }

    /// Next cascade position; wraps back once the point passes the middle
    /// of the area.
    pub fn cascade(&self, cascade: &mut CascadePoint) -> (i32, i32) {
        if cascade.x > (self.area.width / 2) as i32 || cascade.y > (self.area.height / 2) as i32 {
            *cascade = CascadePoint::default();
        }
        let position = (self.area.x + cascade.x, self.area.y + cascade.y);
        cascade.x += self.cascade_step as i32;
        cascade.y += self.cascade_step as i32;
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Geometry {
        Geometry::new(0, 0, 1024, 768)
    }

    fn place_all(config: &PlacementConfig, sizes: &[(u32, u32)], reserved: &[Geometry]) -> Vec<Geometry> {
        let mut obstacles: Vec<Geometry> = reserved.to_vec();
        let mut cascade = CascadePoint::default();
        let mut placed = Vec::new();
        for size in sizes {
            let placer = Placer {
                config,
                area: screen(),
                obstacles: &obstacles,
                cascade_step: 22,
            };
            let geometry = placer.place(*size, &mut cascade);
            obstacles.push(geometry);
            placed.push(geometry);
        }
        placed
    }

    #[test]
    fn test_spawn_and_place_row_smart() {
        let config = PlacementConfig::default();
        let placed = place_all(&config, &[(300, 200), (300, 200)], &[]);
        assert_eq!((placed[0].x, placed[0].y), (0, 0));
        assert_eq!((placed[1].x, placed[1].y), (300, 0));
    }

    #[test]
    fn test_column_right_to_left() {
        let config = PlacementConfig {
            direction: PlacementDirection::Column,
            left_to_right: false,
            ..PlacementConfig::default()
        };
        let placed = place_all(&config, &[(300, 200), (300, 200)], &[]);
        assert_eq!((placed[0].x, placed[0].y), (724, 0));
        assert_eq!((placed[1].x, placed[1].y), (724, 200));
    }

    #[test]
    fn test_margin_keeps_gap() {
        let config = PlacementConfig {
            margin: 4,
            ..PlacementConfig::default()
        };
        let placed = place_all(&config, &[(300, 200), (300, 200)], &[]);
        // Inflated boxes may poke outside the screen
        assert_eq!((placed[0].x, placed[0].y), (0, 0));
        assert_eq!((placed[1].x, placed[1].y), (304, 0));
    }

    #[test]
    fn test_reserved_strip_is_avoided() {
        let config = PlacementConfig::default();
        let panel = Geometry::new(0, 0, 1024, 30);
        let placed = place_all(&config, &[(300, 200)], &[panel]);
        assert_eq!((placed[0].x, placed[0].y), (0, 30));
    }

    #[test]
    fn test_never_overlaps_while_space_remains() {
        let config = PlacementConfig::default();
        // Nine of these fit on the screen in a 3 x 3 grid
        let sizes = vec![(340, 256); 9];
        let placed = place_all(&config, &sizes, &[]);
        for (i, a) in placed.iter().enumerate() {
            assert!(screen().contains(a));
            for b in &placed[i + 1..] {
                assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_full_screen_falls_back_to_cascade() {
        let config = PlacementConfig::default();
        let placed = place_all(&config, &[(1024, 768), (200, 100), (200, 100)], &[]);
        assert_eq!((placed[1].x, placed[1].y), (32, 32));
        assert_eq!((placed[2].x, placed[2].y), (54, 54));
    }

    #[test]
    fn test_cascade_wraps_past_half_screen() {
        let config = PlacementConfig {
            policy: PlacementPolicy::Cascade,
            ..PlacementConfig::default()
        };
        let placer = Placer {
            config: &config,
            area: screen(),
            obstacles: &[],
            cascade_step: 22,
        };
        let mut cascade = CascadePoint { x: 500, y: 390 };
        assert_eq!(placer.cascade(&mut cascade), (32, 32));
        assert_eq!(cascade, CascadePoint { x: 54, y: 54 });
    }

    #[test]
    fn test_oversized_window_is_clamped_to_origin() {
        let config = PlacementConfig::default();
        let placed = place_all(&config, &[(2000, 1000)], &[]);
        assert_eq!((placed[0].x, placed[0].y), (0, 0));
    }
}
