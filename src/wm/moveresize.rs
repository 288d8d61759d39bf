//! Interactive move and resize
//!
//! At most one gesture is active at a time; it lives in
//! `WindowManager::interaction` and owns the pointer grab until the button
//! is released or the gesture is aborted. In opaque mode every motion
//! sample configures the frame; otherwise an XOR outline follows the
//! pointer under a server grab and the geometry is committed on release.

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::xproto::{Timestamp, Window};
use x11rb::CURRENT_TIME;

use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::client_flags::Functions;
use crate::wm::display::Display;
use crate::wm::WindowManager;

/// Frame corner a resize drags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Corner of `rect` closest to a root position.
    pub fn nearest(rect: Geometry, x: i32, y: i32) -> Self {
        let left = x < rect.x + rect.width as i32 / 2;
        let top = y < rect.y + rect.height as i32 / 2;
        match (left, top) {
            (true, true) => Self::TopLeft,
            (false, true) => Self::TopRight,
            (true, false) => Self::BottomLeft,
            (false, false) => Self::BottomRight,
        }
    }

    fn left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    fn top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Move,
    Resize(Corner),
}

/// The active gesture
#[derive(Debug, Clone)]
pub struct Interaction {
    pub window: Window,
    pub root: Window,
    pub gesture: Gesture,
    /// Pointer position (root coordinates) when the gesture started
    pub pointer_origin: (i32, i32),
    /// Frame rectangle when the gesture started
    pub start: Geometry,
    /// Frame rectangle the gesture would commit now
    pub current: Geometry,
    pub opaque: bool,
    outline_drawn: bool,
}

/// Edges a dragged frame edge snaps to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapEdges {
    pub vertical: Vec<i32>,
    pub horizontal: Vec<i32>,
}

impl SnapEdges {
    /// Screen bounds plus the usable area left by panels.
    pub fn for_screen(screen: Geometry, usable: Geometry) -> Self {
        Self {
            vertical: vec![screen.x, screen.right(), usable.x, usable.right()],
            horizontal: vec![screen.y, screen.bottom(), usable.y, usable.bottom()],
        }
    }
}

/// Offset from `pos` to the nearest target closer than `threshold`.
fn nearest_offset(pos: i32, targets: &[i32], threshold: u32) -> Option<i32> {
    targets
        .iter()
        .map(|t| t - pos)
        .filter(|d| d.unsigned_abs() < threshold)
        .min_by_key(|d| d.unsigned_abs())
}

/// Snap a single edge position. An edge snaps only when it is strictly
/// closer than `threshold`; a threshold of 0 never snaps.
pub fn snap_edge(pos: i32, targets: &[i32], threshold: u32) -> i32 {
    pos + nearest_offset(pos, targets, threshold).unwrap_or(0)
}

/// Snap a span `[start, start + len)` by whichever of its edges is closer
/// to a target. Returns the new start.
fn snap_span(start: i32, len: u32, targets: &[i32], threshold: u32) -> i32 {
    let near = nearest_offset(start, targets, threshold);
    let far = nearest_offset(start + len as i32, targets, threshold);
    let offset = match (near, far) {
        (Some(a), Some(b)) if b.unsigned_abs() < a.unsigned_abs() => b,
        (Some(a), _) => a,
        (None, Some(b)) => b,
        (None, None) => 0,
    };
    start + offset
}

/// Frame rectangle moved so one of its edges sits on a nearby target.
pub fn snap_move(rect: Geometry, edges: &SnapEdges, threshold: u32) -> Geometry {
    rect.with_position(
        snap_span(rect.x, rect.width, &edges.vertical, threshold),
        snap_span(rect.y, rect.height, &edges.horizontal, threshold),
    )
}

/// Frame rectangle after dragging `corner` by (`dx`, `dy`). The opposite
/// edges stay fixed; the dragged edges snap, then `fit` turns the raw
/// frame size into one the client accepts.
pub fn resize_rect(
    start: Geometry,
    corner: Corner,
    (dx, dy): (i32, i32),
    edges: &SnapEdges,
    threshold: u32,
    fit: impl Fn(u32, u32) -> (u32, u32),
) -> Geometry {
    let width = if corner.left() {
        start.right() - snap_edge(start.x + dx, &edges.vertical, threshold)
    } else {
        snap_edge(start.right() + dx, &edges.vertical, threshold) - start.x
    };
    let height = if corner.top() {
        start.bottom() - snap_edge(start.y + dy, &edges.horizontal, threshold)
    } else {
        snap_edge(start.bottom() + dy, &edges.horizontal, threshold) - start.y
    };
    let (width, height) = fit(width.max(1) as u32, height.max(1) as u32);
    let x = if corner.left() { start.right() - width as i32 } else { start.x };
    let y = if corner.top() { start.bottom() - height as i32 } else { start.y };
    Geometry::new(x, y, width, height)
}

/// Frame size nearest to (`width`, `height`) whose client size obeys the
/// client's size hints.
fn fit_frame(client: &Client, width: u32, height: u32) -> (u32, u32) {
    let inner = client.layout.downsize(Geometry::new(0, 0, width, height));
    let (w, h) = client.size_hints.constrain(inner.width, inner.height);
    let frame = client.layout.upsize(Geometry::new(0, 0, w, h));
    (frame.width, frame.height)
}

impl<D: Display> WindowManager<D> {
    pub fn is_interacting(&self) -> bool {
        self.interaction.is_some()
    }

    /// Start dragging `window`. Refused while another gesture is active,
    /// when the window does not allow the operation, or when the pointer
    /// cannot be grabbed.
    pub fn start_interaction(
        &mut self,
        window: Window,
        gesture: Gesture,
        pointer: (i32, i32),
        time: Timestamp,
    ) -> Result<bool> {
        if let Some(active) = &self.interaction {
            debug!("Gesture on 0x{:x} refused: 0x{:x} is being dragged", window, active.window);
            return Ok(false);
        }
        let Some(client) = self.clients.get(&window) else {
            return Ok(false);
        };
        let allowed = match gesture {
            Gesture::Move => client.functions.contains(Functions::MOVE),
            Gesture::Resize(_) => client.functions.contains(Functions::RESIZE) && !client.is_shaded(),
        };
        if !allowed || !client.is_visible() {
            return Ok(false);
        }
        let root = self.screens[client.screen].root;
        let start = client.frame_rect();
        if !self.display.grab_pointer(root, time)? {
            debug!("Pointer grab for 0x{:x} failed", window);
            return Ok(false);
        }
        self.hide_menus()?;

        let opaque = self.config.behavior.opaque_move;
        let mut interaction = Interaction {
            window,
            root,
            gesture,
            pointer_origin: pointer,
            start,
            current: start,
            opaque,
            outline_drawn: false,
        };
        if !opaque {
            self.grab_server()?;
            self.display.draw_outline(root, start)?;
            interaction.outline_drawn = true;
        }
        debug!("Started {:?} on 0x{:x}", gesture, window);
        self.interaction = Some(interaction);
        self.display.flush()?;
        Ok(true)
    }

    /// Follow a pointer motion sample.
    pub fn interaction_motion(&mut self, root_x: i32, root_y: i32) -> Result<()> {
        let Some(interaction) = self.interaction.as_ref() else {
            return Ok(());
        };
        let Some(client) = self.clients.get(&interaction.window) else {
            return self.abort_interaction();
        };
        let screen = &self.screens[client.screen];
        let edges = SnapEdges::for_screen(screen.geometry, screen.usable_area());
        let threshold = self.config.behavior.edge_snap_threshold;
        let delta = (
            root_x - interaction.pointer_origin.0,
            root_y - interaction.pointer_origin.1,
        );
        let start = interaction.start;
        let target = match interaction.gesture {
            Gesture::Move => snap_move(
                start.with_position(start.x + delta.0, start.y + delta.1),
                &edges,
                threshold,
            ),
            Gesture::Resize(corner) => {
                resize_rect(start, corner, delta, &edges, threshold, |w, h| fit_frame(client, w, h))
            }
        };

        let Some(interaction) = self.interaction.as_mut() else {
            return Ok(());
        };
        if target == interaction.current {
            return Ok(());
        }
        let previous = interaction.current;
        interaction.current = target;
        let (window, root, opaque) = (interaction.window, interaction.root, interaction.opaque);
        if opaque {
            self.configure_window(window, target)?;
        } else {
            self.display.draw_outline(root, previous)?;
            self.display.draw_outline(root, target)?;
        }
        self.display.flush()
    }

    /// Button released: commit the geometry and let go of the pointer.
    pub fn finish_interaction(&mut self, time: Timestamp) -> Result<()> {
        let Some(interaction) = self.interaction.take() else {
            return Ok(());
        };
        self.release_interaction(&interaction, time)?;
        if !interaction.opaque && interaction.current != interaction.start {
            self.configure_window(interaction.window, interaction.current)?;
        }
        info!(
            "Finished {:?} on 0x{:x} at {:?}",
            interaction.gesture, interaction.window, interaction.current
        );
        self.display.flush()
    }

    /// Drop the active gesture without committing anything further. Safe
    /// to call when the window is already gone.
    pub fn abort_interaction(&mut self) -> Result<()> {
        let Some(interaction) = self.interaction.take() else {
            return Ok(());
        };
        debug!("Aborted {:?} on 0x{:x}", interaction.gesture, interaction.window);
        self.release_interaction(&interaction, CURRENT_TIME)?;
        self.display.flush()
    }

    fn release_interaction(&mut self, interaction: &Interaction, time: Timestamp) -> Result<()> {
        if interaction.outline_drawn {
            self.display.draw_outline(interaction.root, interaction.current)?;
        }
        if !interaction.opaque {
            self.ungrab_server()?;
        }
        self.display.ungrab_pointer(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing;
    use crate::wm::Removal;

    fn edges() -> SnapEdges {
        SnapEdges::for_screen(Geometry::new(0, 0, 1024, 768), Geometry::new(0, 0, 1024, 746))
    }

    #[test]
    fn test_snap_threshold_is_exclusive() {
        assert_eq!(snap_edge(9, &[0], 10), 0);
        assert_eq!(snap_edge(-9, &[0], 10), 0);
        assert_eq!(snap_edge(10, &[0], 10), 10);
        assert_eq!(snap_edge(1014, &[1024], 10), 1014);
        assert_eq!(snap_edge(1015, &[1024], 10), 1024);
    }

    #[test]
    fn test_zero_threshold_disables_snapping() {
        assert_eq!(snap_edge(1, &[0], 0), 1);
        let rect = Geometry::new(1, 1, 100, 100);
        assert_eq!(snap_move(rect, &edges(), 0), rect);
    }

    #[test]
    fn test_move_snaps_nearest_edge() {
        // Left edge 5 from the screen edge
        let rect = Geometry::new(5, 200, 100, 100);
        assert_eq!(snap_move(rect, &edges(), 10), Geometry::new(0, 200, 100, 100));
        // Bottom edge 3 above the toolbar
        let rect = Geometry::new(300, 643, 100, 100);
        assert_eq!(snap_move(rect, &edges(), 10), Geometry::new(300, 646, 100, 100));
    }

    #[test]
    fn test_resize_keeps_opposite_edge() {
        let start = Geometry::new(100, 100, 300, 200);
        let grow = resize_rect(start, Corner::BottomRight, (20, 10), &edges(), 10, |w, h| (w, h));
        assert_eq!(grow, Geometry::new(100, 100, 320, 210));

        let shrink = resize_rect(start, Corner::TopLeft, (20, 30), &edges(), 10, |w, h| (w, h));
        assert_eq!(shrink, Geometry::new(120, 130, 280, 170));
        assert_eq!(shrink.right(), start.right());
        assert_eq!(shrink.bottom(), start.bottom());
    }

    #[test]
    fn test_resize_left_applies_size_grid_from_right_edge() {
        let start = Geometry::new(100, 100, 300, 200);
        // Width snaps down to a multiple of 50
        let fit = |w: u32, h: u32| (w - w % 50, h);
        let rect = resize_rect(start, Corner::BottomLeft, (-30, 0), &edges(), 10, fit);
        assert_eq!(rect.width, 300);
        assert_eq!(rect.right(), 400);
        assert_eq!(rect.x, 100);
    }

    #[test]
    fn test_nearest_corner() {
        let rect = Geometry::new(0, 0, 100, 100);
        assert_eq!(Corner::nearest(rect, 10, 10), Corner::TopLeft);
        assert_eq!(Corner::nearest(rect, 90, 90), Corner::BottomRight);
        assert_eq!(Corner::nearest(rect, 90, 10), Corner::TopRight);
    }

    #[test]
    fn test_opaque_move_configures_on_motion() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        assert!(wm.start_interaction(0x400, Gesture::Move, (150, 110), CURRENT_TIME).unwrap());
        assert!(wm.display().pointer_grabbed);

        wm.interaction_motion(175, 160).unwrap();
        assert_eq!(wm.client(0x400).unwrap().frame_rect(), Geometry::new(125, 150, 302, 230));

        // x lands on 8: snaps to the screen edge
        wm.interaction_motion(58, 160).unwrap();
        assert_eq!(wm.client(0x400).unwrap().frame_rect().x, 0);

        wm.finish_interaction(CURRENT_TIME).unwrap();
        assert!(!wm.is_interacting());
        assert!(!wm.display().pointer_grabbed);
    }

    #[test]
    fn test_outline_move_commits_on_release() {
        let mut wm = testing::window_manager();
        wm.config.behavior.opaque_move = false;
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let start = wm.client(0x400).unwrap().frame_rect();

        assert!(wm.start_interaction(0x400, Gesture::Move, (150, 110), CURRENT_TIME).unwrap());
        assert_eq!(wm.display().server_grabs, 1);
        wm.interaction_motion(250, 210).unwrap();
        assert_eq!(wm.client(0x400).unwrap().frame_rect(), start);
        let moved = start.with_position(200, 200);
        assert_eq!(wm.display().outlines, vec![start, start, moved]);

        wm.finish_interaction(CURRENT_TIME).unwrap();
        assert_eq!(wm.display().outlines.last(), Some(&moved));
        assert_eq!(wm.display().server_grabs, 0);
        assert_eq!(wm.client(0x400).unwrap().frame_rect(), moved);
    }

    #[test]
    fn test_only_one_gesture_at_a_time() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        testing::manage(&mut wm, 0x401, Geometry::new(500, 100, 300, 200));
        assert!(wm.start_interaction(0x400, Gesture::Move, (0, 0), CURRENT_TIME).unwrap());
        assert!(!wm
            .start_interaction(0x401, Gesture::Resize(Corner::BottomRight), (0, 0), CURRENT_TIME)
            .unwrap());
        assert_eq!(wm.interaction.as_ref().map(|i| i.window), Some(0x400));
    }

    #[test]
    fn test_gesture_needs_function() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        if let Some(client) = wm.clients.get_mut(&0x400) {
            client.functions.remove(Functions::RESIZE);
        }
        assert!(!wm
            .start_interaction(0x400, Gesture::Resize(Corner::TopLeft), (0, 0), CURRENT_TIME)
            .unwrap());
        assert!(!wm.display().pointer_grabbed);
    }

    #[test]
    fn test_destroy_mid_gesture_aborts() {
        let mut wm = testing::window_manager();
        wm.config.behavior.opaque_move = false;
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        assert!(wm.start_interaction(0x400, Gesture::Move, (0, 0), CURRENT_TIME).unwrap());
        wm.unmanage(0x400, Removal::Destroyed).unwrap();
        assert!(!wm.is_interacting());
        assert!(!wm.display().pointer_grabbed);
        assert_eq!(wm.display().server_grabs, 0);
        // Motion after the abort is ignored
        wm.interaction_motion(10, 10).unwrap();
    }
}
