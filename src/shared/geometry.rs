//! Rectangles and reserved-area struts.
//!
//! All rectangles are half-open: a window at `x` with `width` covers the
//! columns `x..x + width`.

use serde::{Deserialize, Serialize};

/// Window geometry in root coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// First column past the right edge
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// First row past the bottom edge
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn with_position(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        Self { width, height, ..self }
    }

    /// True when the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Geometry) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when `other` lies completely inside `self`.
    pub fn contains(&self, other: &Geometry) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Grow the rectangle by `margin` pixels on every side.
    pub fn inflate(&self, margin: u32) -> Geometry {
        let m = margin as i32;
        Geometry {
            x: self.x - m,
            y: self.y - m,
            width: self.width + margin * 2,
            height: self.height + margin * 2,
        }
    }

    /// Place a rectangle of this size centered inside `area`.
    pub fn centered_in(&self, area: &Geometry) -> Geometry {
        Geometry {
            x: area.x + (area.width as i32 - self.width as i32) / 2,
            y: area.y + (area.height as i32 - self.height as i32) / 2,
            ..*self
        }
    }

    /// Move the rectangle so it lies inside `area` where possible. When the
    /// rectangle is larger than the area its top-left corner wins.
    pub fn clamped_to(&self, area: &Geometry) -> Geometry {
        let mut x = self.x;
        let mut y = self.y;
        if self.right() > area.right() {
            x = area.right() - self.width as i32;
        }
        if self.bottom() > area.bottom() {
            y = area.bottom() - self.height as i32;
        }
        Geometry {
            x: x.max(area.x),
            y: y.max(area.y),
            ..*self
        }
    }
}

/// Space reserved along the four screen edges (panels, docks, toolbars).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Strut {
    pub fn new(left: u32, right: u32, top: u32, bottom: u32) -> Self {
        Self { left, right, top, bottom }
    }

    /// Parse `_NET_WM_STRUT` / `_NET_WM_STRUT_PARTIAL` data. Only the first
    /// four values (left, right, top, bottom) are used.
    pub fn from_raw(values: &[u32]) -> Option<Self> {
        if values.len() < 4 {
            return None;
        }
        Some(Self::new(values[0], values[1], values[2], values[3]))
    }

    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }

    /// Keep the tightest bound on each edge.
    pub fn merge(&mut self, other: &Strut) {
        self.left = self.left.max(other.left);
        self.right = self.right.max(other.right);
        self.top = self.top.max(other.top);
        self.bottom = self.bottom.max(other.bottom);
    }

    /// The strips of `screen` this strut reserves, one per non-zero edge.
    pub fn reserved_rects(&self, screen: &Geometry) -> Vec<Geometry> {
        let mut rects = Vec::new();
        if self.left > 0 {
            rects.push(Geometry::new(screen.x, screen.y, self.left, screen.height));
        }
        if self.right > 0 {
            rects.push(Geometry::new(
                screen.right() - self.right as i32,
                screen.y,
                self.right,
                screen.height,
            ));
        }
        if self.top > 0 {
            rects.push(Geometry::new(screen.x, screen.y, screen.width, self.top));
        }
        if self.bottom > 0 {
            rects.push(Geometry::new(
                screen.x,
                screen.bottom() - self.bottom as i32,
                screen.width,
                self.bottom,
            ));
        }
        rects
    }

    /// The part of `screen` left over once this strut is reserved.
    pub fn apply_to(&self, screen: &Geometry) -> Geometry {
        let horizontal = (self.left + self.right).min(screen.width);
        let vertical = (self.top + self.bottom).min(screen.height);
        Geometry {
            x: screen.x + self.left.min(screen.width) as i32,
            y: screen.y + self.top.min(screen.height) as i32,
            width: screen.width - horizontal,
            height: screen.height - vertical,
        }
    }
}
