//! Screen Module
//!
//! Per-screen state: the workspaces, the current workspace, the icon list
//! and the reserved-area accumulator fed by struts.

use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::xproto::Window;

use crate::shared::{Geometry, Strut};
use crate::wm::display::Display;
use crate::wm::menu::CollaboratorId;
use crate::wm::transients::TransientManager;
use crate::wm::workspace::{FrameLookup, Workspace};

/// Who contributed a strut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrutSource {
    /// A client window carrying _NET_WM_STRUT(_PARTIAL)
    Client(Window),
    /// A toolbar or dock
    Collaborator(CollaboratorId),
}

/// What a workspace switch requires of the window manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSwitch {
    pub from: usize,
    pub to: usize,
    /// Windows to hide (stuck windows are never listed)
    pub hide: Vec<Window>,
    /// Windows to show
    pub show: Vec<Window>,
    /// Window to focus afterwards, when "focus last" is enabled
    pub focus: Option<Window>,
}

/// ScreenInfo - Per-screen window manager state
#[derive(Debug)]
pub struct Screen {
    pub index: usize,
    pub root: Window,
    pub geometry: Geometry,
    pub workspaces: Vec<Workspace>,
    current: usize,
    icons: Vec<Window>,
    struts: HashMap<StrutSource, Strut>,
    reserved: Strut,
    usable: Geometry,
}

impl Screen {
    pub fn new(index: usize, root: Window, geometry: Geometry, names: Vec<String>) -> Self {
        let mut workspaces: Vec<Workspace> = names.into_iter().map(Workspace::new).collect();
        if workspaces.is_empty() {
            workspaces.push(Workspace::new("Workspace 1".into()));
        }
        Self {
            index,
            root,
            geometry,
            workspaces,
            current: 0,
            icons: Vec::new(),
            struts: HashMap::new(),
            reserved: Strut::default(),
            usable: geometry,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_workspace(&self) -> &Workspace {
        &self.workspaces[self.current]
    }

    pub fn current_workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspaces[self.current]
    }

    pub fn workspace_count(&self) -> usize {
        self.workspaces.len()
    }

    pub fn workspace_names(&self) -> Vec<String> {
        self.workspaces.iter().map(|ws| ws.name.clone()).collect()
    }

    /// Record (or with `None`, drop) a strut contribution. Returns whether
    /// the usable area changed.
    pub fn set_strut(&mut self, source: StrutSource, strut: Option<Strut>) -> bool {
        match strut {
            Some(strut) if !strut.is_empty() => {
                self.struts.insert(source, strut);
            }
            _ => {
                self.struts.remove(&source);
            }
        }
        self.update_usable_area()
    }

    /// Recompute the reserved strut (tightest bound per edge) and the
    /// usable area.
    pub fn update_usable_area(&mut self) -> bool {
        let mut reserved = Strut::default();
        for strut in self.struts.values() {
            reserved.merge(strut);
        }
        let usable = reserved.apply_to(&self.geometry);
        let changed = usable != self.usable;
        self.reserved = reserved;
        self.usable = usable;
        if changed {
            debug!("Screen {} usable area now {:?}", self.index, usable);
        }
        changed
    }

    /// Screen minus every reserved strut. Placement always uses this.
    pub fn usable_area(&self) -> Geometry {
        self.usable
    }

    pub fn reserved_rects(&self) -> Vec<Geometry> {
        self.reserved.reserved_rects(&self.geometry)
    }

    /// Area a maximized frame fills.
    pub fn maximize_area(&self, full_maximize: bool) -> Geometry {
        if full_maximize {
            self.geometry
        } else {
            self.usable
        }
    }

    pub fn icons(&self) -> &[Window] {
        &self.icons
    }

    pub fn add_icon(&mut self, window: Window) {
        if !self.icons.contains(&window) {
            self.icons.push(window);
        }
    }

    pub fn remove_icon(&mut self, window: Window) -> bool {
        let before = self.icons.len();
        self.icons.retain(|w| *w != window);
        before != self.icons.len()
    }

    /// Move `window` from workspace `from` to workspace `to`. Stuck windows
    /// stay put unless `ignore_sticky` is set. Visibility is left to the
    /// caller. Returns whether the lists changed.
    #[allow(clippy::too_many_arguments)]
    pub fn reassociate_window(
        &mut self,
        display: &mut dyn Display,
        transients: &TransientManager,
        frame_of: FrameLookup<'_>,
        window: Window,
        from: usize,
        to: usize,
        stuck: bool,
        ignore_sticky: bool,
    ) -> Result<bool> {
        if from == to || to >= self.workspaces.len() || (stuck && !ignore_sticky) {
            return Ok(false);
        }
        if !self.workspaces[from].remove_window(window) {
            // Iconic windows only change their workspace number
            return Ok(false);
        }
        self.workspaces[to].add_window(display, transients, frame_of, window)?;
        debug!("Window 0x{:x} moved from workspace {} to {}", window, from, to);
        Ok(true)
    }

    /// Make `to` the current workspace. Returns what to hide, show and
    /// focus, or `None` when nothing changes.
    pub fn change_current_workspace(
        &mut self,
        to: usize,
        focus_last: bool,
        is_stuck: impl Fn(Window) -> bool,
    ) -> Option<WorkspaceSwitch> {
        if to == self.current || to >= self.workspaces.len() {
            return None;
        }
        let from = self.current;
        let hide = self.workspaces[from]
            .members()
            .iter()
            .copied()
            .filter(|w| !is_stuck(*w))
            .collect();
        let show = self.workspaces[to].members().to_vec();
        let focus = if focus_last {
            self.workspaces[to].last_focused
        } else {
            None
        };
        self.current = to;
        info!("Screen {}: workspace {} -> {}", self.index, from, to);
        Some(WorkspaceSwitch { from, to, hide, show, focus })
    }

    pub fn add_workspace(&mut self, name: String) -> usize {
        self.workspaces.push(Workspace::new(name));
        self.workspaces.len() - 1
    }

    /// Drop the last workspace and hand back its members. The first
    /// workspace is never removed, and neither is the current one: switch
    /// away first.
    pub fn remove_last_workspace(&mut self) -> Option<Vec<Window>> {
        let last = self.workspaces.len().checked_sub(1)?;
        if last == 0 || last == self.current {
            return None;
        }
        let removed = self.workspaces.pop()?;
        Some(removed.members().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::FakeDisplay;

    fn frame_of(window: Window) -> Option<Window> {
        Some(window + 0x1000)
    }

    fn screen(count: usize) -> Screen {
        let names = (0..count).map(|i| format!("ws{}", i)).collect();
        Screen::new(0, 0x100, Geometry::new(0, 0, 1024, 768), names)
    }

    fn populate(screen: &mut Screen, display: &mut FakeDisplay, ws: usize, windows: &[Window]) {
        let transients = TransientManager::new();
        for w in windows {
            screen.workspaces[ws].add_window(display, &transients, &frame_of, *w).unwrap();
        }
    }

    #[test]
    fn test_struts_take_tightest_bound() {
        let mut s = screen(1);
        assert!(s.set_strut(StrutSource::Client(0x500), Some(Strut::new(0, 0, 24, 0))));
        assert!(s.set_strut(StrutSource::Collaborator(CollaboratorId(0)), Some(Strut::new(0, 0, 30, 16))));
        assert_eq!(s.usable_area(), Geometry::new(0, 30, 1024, 768 - 46));
        assert_eq!(s.maximize_area(true), Geometry::new(0, 0, 1024, 768));

        assert!(s.set_strut(StrutSource::Collaborator(CollaboratorId(0)), None));
        assert_eq!(s.usable_area(), Geometry::new(0, 24, 1024, 744));
        assert!(!s.set_strut(StrutSource::Client(0x999), Some(Strut::default())));
    }

    #[test]
    fn test_switch_skips_stuck_windows() {
        let mut s = screen(2);
        let mut display = FakeDisplay::new();
        populate(&mut s, &mut display, 0, &[1, 2]);
        populate(&mut s, &mut display, 1, &[3]);
        s.workspaces[1].last_focused = Some(3);

        let switch = s.change_current_workspace(1, true, |w| w == 2).unwrap();
        assert_eq!(switch.hide, vec![1]);
        assert_eq!(switch.show, vec![3]);
        assert_eq!(switch.focus, Some(3));
        assert_eq!(s.current(), 1);

        assert!(s.change_current_workspace(1, true, |_| false).is_none());
        let back = s.change_current_workspace(0, false, |_| false).unwrap();
        assert_eq!(back.focus, None);
    }

    #[test]
    fn test_reassociate_moves_between_lists() {
        let mut s = screen(2);
        let mut display = FakeDisplay::new();
        let transients = TransientManager::new();
        populate(&mut s, &mut display, 0, &[1, 2]);

        assert!(s.reassociate_window(&mut display, &transients, &frame_of, 1, 0, 1, false, false).unwrap());
        assert_eq!(s.workspaces[0].members(), &[2]);
        assert_eq!(s.workspaces[1].members(), &[1]);
        assert_eq!(s.workspaces[1].stacking(), &[1]);

        // Stuck windows need ignore_sticky
        assert!(!s.reassociate_window(&mut display, &transients, &frame_of, 2, 0, 1, true, false).unwrap());
        assert!(s.reassociate_window(&mut display, &transients, &frame_of, 2, 0, 1, true, true).unwrap());
    }

    #[test]
    fn test_add_and_remove_last_workspace() {
        let mut s = screen(2);
        let mut display = FakeDisplay::new();
        assert_eq!(s.add_workspace("extra".into()), 2);
        populate(&mut s, &mut display, 2, &[7]);
        assert_eq!(s.remove_last_workspace(), Some(vec![7]));
        assert_eq!(s.workspace_count(), 2);

        s.change_current_workspace(1, false, |_| false);
        assert_eq!(s.remove_last_workspace(), None);
        s.change_current_workspace(0, false, |_| false);
        assert_eq!(s.remove_last_workspace(), Some(vec![]));
        assert_eq!(s.remove_last_workspace(), None);
    }
}
