//! Transients Module
//!
//! Transient-for relationships between managed windows. Links are plain
//! window ids in both directions; neither side owns the other.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};
use x11rb::protocol::xproto::Window;

/// Transient manager
#[derive(Debug, Default)]
pub struct TransientManager {
    /// child -> owner
    parents: HashMap<Window, Window>,
    /// owner -> children, in attach order
    children: HashMap<Window, Vec<Window>>,
}

impl TransientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `child` transient for `owner`. Refuses (and returns false) when
    /// the link would close a cycle.
    pub fn attach(&mut self, child: Window, owner: Window) -> bool {
        if child == owner || self.ancestors(owner).contains(&child) {
            warn!("Ignoring transient cycle: 0x{:x} -> 0x{:x}", child, owner);
            return false;
        }
        self.unlink(child);
        self.parents.insert(child, owner);
        self.children.entry(owner).or_default().push(child);
        debug!("Window 0x{:x} is transient for 0x{:x}", child, owner);
        true
    }

    /// Remove `window` from the graph: its owner forgets it and its own
    /// transients become orphans. Returns the orphans.
    pub fn detach(&mut self, window: Window) -> Vec<Window> {
        self.unlink(window);
        let orphans = self.children.remove(&window).unwrap_or_default();
        for orphan in &orphans {
            self.parents.remove(orphan);
        }
        orphans
    }

    fn unlink(&mut self, child: Window) {
        if let Some(owner) = self.parents.remove(&child) {
            if let Some(siblings) = self.children.get_mut(&owner) {
                siblings.retain(|w| *w != child);
                if siblings.is_empty() {
                    self.children.remove(&owner);
                }
            }
        }
    }

    pub fn transient_for(&self, window: Window) -> Option<Window> {
        self.parents.get(&window).copied()
    }

    pub fn transients_of(&self, window: Window) -> &[Window] {
        self.children.get(&window).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Owners of `window`, nearest first. Stops at the first repeat.
    fn ancestors(&self, window: Window) -> Vec<Window> {
        let mut seen = HashSet::from([window]);
        let mut out = Vec::new();
        let mut current = window;
        while let Some(owner) = self.parents.get(&current).copied() {
            if !seen.insert(owner) {
                break;
            }
            out.push(owner);
            current = owner;
        }
        out
    }

    /// Walk transient-for links up to the window that is not transient.
    pub fn chain_root(&self, window: Window) -> Window {
        self.ancestors(window).last().copied().unwrap_or(window)
    }

    /// The whole chain containing `window`, root first, each owner before
    /// its transients.
    pub fn chain_members(&self, window: Window) -> Vec<Window> {
        let root = self.chain_root(window);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            // Reverse so the first attached child is visited first
            for child in self.transients_of(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// The deepest modal transient below `window`, if any. Focus goes there
    /// instead of to `window`.
    pub fn modal_transient(&self, window: Window, is_modal: impl Fn(Window) -> bool) -> Option<Window> {
        let mut found = None;
        let mut current = window;
        let mut seen = HashSet::from([window]);
        loop {
            let next = self
                .transients_of(current)
                .iter()
                .rev()
                .copied()
                .find(|child| is_modal(*child) && !seen.contains(child));
            match next {
                Some(child) => {
                    seen.insert(child);
                    found = Some(child);
                    current = child;
                }
                None => return found,
            }
        }
    }
}
