//! Workspace Module
//!
//! A workspace keeps two independent orders over the same windows: the
//! membership list (insertion order, the numbering menus show) and the
//! stacking list (top-most first). Iconic windows are in neither.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::wm::display::{Display, StackPosition};
use crate::wm::placement::CascadePoint;
use crate::wm::transients::TransientManager;

/// Maps a client window to its frame window
pub type FrameLookup<'a> = &'a dyn Fn(Window) -> Option<Window>;

#[derive(Debug)]
pub struct Workspace {
    pub name: String,
    members: Vec<Window>,
    stacking: Vec<Window>,
    pub last_focused: Option<Window>,
    pub cascade: CascadePoint,
}

impl Workspace {
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: Vec::new(),
            stacking: Vec::new(),
            last_focused: None,
            cascade: CascadePoint::default(),
        }
    }

    /// Windows in membership order; a window's position is its index.
    pub fn members(&self) -> &[Window] {
        &self.members
    }

    /// Windows top-most first.
    pub fn stacking(&self) -> &[Window] {
        &self.stacking
    }

    pub fn contains(&self, window: Window) -> bool {
        self.members.contains(&window)
    }

    pub fn index_of(&self, window: Window) -> Option<usize> {
        self.members.iter().position(|w| *w == window)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Append to membership, put on top of the stacking order and raise it
    /// (with its transients). Returns the new membership index.
    pub fn add_window(
        &mut self,
        display: &mut dyn Display,
        transients: &TransientManager,
        frame_of: FrameLookup<'_>,
        window: Window,
    ) -> Result<usize> {
        if let Some(index) = self.index_of(window) {
            return Ok(index);
        }
        self.members.push(window);
        self.stacking.insert(0, window);
        self.raise_window(display, transients, frame_of, window)?;
        Ok(self.members.len() - 1)
    }

    /// Remove from both lists. Indices of the remaining members close up.
    /// Returns whether the window was here.
    pub fn remove_window(&mut self, window: Window) -> bool {
        let Some(index) = self.index_of(window) else {
            return false;
        };
        self.members.remove(index);
        self.stacking.retain(|w| *w != window);
        if self.last_focused == Some(window) {
            self.last_focused = None;
        }
        debug!("Removed 0x{:x} from workspace '{}' (slot {})", window, self.name, index);
        true
    }

    /// The transient chain of `window` restricted to this workspace, in
    /// stacking order: deepest transient first, chain root last.
    fn chain_block(&self, transients: &TransientManager, window: Window) -> Vec<Window> {
        let mut block: Vec<Window> = transients
            .chain_members(window)
            .into_iter()
            .filter(|w| self.stacking.contains(w))
            .collect();
        block.reverse();
        block
    }

    /// Raise the whole transient chain of `window` as one block.
    pub fn raise_window(
        &mut self,
        display: &mut dyn Display,
        transients: &TransientManager,
        frame_of: FrameLookup<'_>,
        window: Window,
    ) -> Result<()> {
        let block = self.chain_block(transients, window);
        if block.is_empty() {
            return Ok(());
        }
        self.stacking.retain(|w| !block.contains(w));
        self.stacking.splice(0..0, block.iter().copied());
        let frames: Vec<Window> = block.iter().filter_map(|w| frame_of(*w)).collect();
        display.restack(&frames, StackPosition::Top)
    }

    /// Lower the whole transient chain of `window` as one block.
    pub fn lower_window(
        &mut self,
        display: &mut dyn Display,
        transients: &TransientManager,
        frame_of: FrameLookup<'_>,
        window: Window,
    ) -> Result<()> {
        let block = self.chain_block(transients, window);
        if block.is_empty() {
            return Ok(());
        }
        self.stacking.retain(|w| !block.contains(w));
        self.stacking.extend(block.iter().copied());
        let frames: Vec<Window> = block.iter().filter_map(|w| frame_of(*w)).collect();
        display.restack(&frames, StackPosition::Bottom)
    }

    /// Put the stacking order back on the server, e.g. after the workspace
    /// became current again.
    pub fn restack_all(&self, display: &mut dyn Display, frame_of: FrameLookup<'_>) -> Result<()> {
        let frames: Vec<Window> = self.stacking.iter().filter_map(|w| frame_of(*w)).collect();
        if frames.is_empty() {
            return Ok(());
        }
        display.restack(&frames, StackPosition::Top)
    }
}
