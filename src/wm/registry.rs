//! Handle registry
//!
//! Maps every window handle the window manager created or adopted to the
//! object that owns it. Each object kind has its own table so a handle can
//! never be mistaken for another kind.
//!
//! Owners register their handles before the windows are mapped and
//! unregister them before the windows are destroyed, so a lookup miss
//! always means "not ours (any more)".

use std::collections::HashMap;

use tracing::warn;
use x11rb::protocol::xproto::Window;

use crate::wm::error::WmError;
use crate::wm::menu::{CollaboratorId, CollaboratorKind};

/// What an incoming event's handle resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    /// A managed client; carries the client window, which keys the client table
    Client(Window),
    Menu(CollaboratorId),
    Toolbar(CollaboratorId),
    Dock(CollaboratorId),
    /// Root window of the screen with this index
    Screen(usize),
}

#[derive(Debug, Default)]
pub struct HandleRegistry {
    windows: HashMap<Window, Window>,
    groups: HashMap<Window, Vec<Window>>,
    menus: HashMap<Window, CollaboratorId>,
    toolbars: HashMap<Window, CollaboratorId>,
    docks: HashMap<Window, CollaboratorId>,
    roots: HashMap<Window, usize>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` (client, frame or decoration window) as owned by
    /// the client whose window is `client`.
    pub fn register_client(&mut self, handle: Window, client: Window) -> Result<(), WmError> {
        match self.windows.get(&handle) {
            Some(owner) if *owner != client => Err(WmError::Inconsistent("handle already owned by another client")),
            _ => {
                self.windows.insert(handle, client);
                Ok(())
            }
        }
    }

    pub fn unregister_client(&mut self, handle: Window) {
        self.windows.remove(&handle);
    }

    /// Drop every handle owned by `client`. Returns how many were left over;
    /// a well-behaved owner has already removed them one by one.
    pub fn purge_client(&mut self, client: Window) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, owner| *owner != client);
        let leaked = before - self.windows.len();
        if leaked > 0 {
            warn!("Purged {} stale handles of client 0x{:x}", leaked, client);
        }
        leaked
    }

    pub fn client_of(&self, handle: Window) -> Option<Window> {
        self.windows.get(&handle).copied()
    }

    /// Handles owned by `client`, in no particular order.
    pub fn handles_of(&self, client: Window) -> Vec<Window> {
        self.windows
            .iter()
            .filter(|(_, owner)| **owner == client)
            .map(|(handle, _)| *handle)
            .collect()
    }

    pub fn add_group_member(&mut self, leader: Window, client: Window) {
        let members = self.groups.entry(leader).or_default();
        if !members.contains(&client) {
            members.push(client);
        }
    }

    /// Forget the group once its last member leaves.
    pub fn remove_group_member(&mut self, leader: Window, client: Window) {
        if let Some(members) = self.groups.get_mut(&leader) {
            members.retain(|w| *w != client);
            if members.is_empty() {
                self.groups.remove(&leader);
            }
        }
    }

    pub fn group_members(&self, leader: Window) -> &[Window] {
        self.groups.get(&leader).map(Vec::as_slice).unwrap_or(&[])
    }

    fn table(&mut self, kind: CollaboratorKind) -> &mut HashMap<Window, CollaboratorId> {
        match kind {
            CollaboratorKind::Menu => &mut self.menus,
            CollaboratorKind::Toolbar => &mut self.toolbars,
            CollaboratorKind::Dock => &mut self.docks,
        }
    }

    pub fn register_collaborator(&mut self, kind: CollaboratorKind, handle: Window, id: CollaboratorId) {
        self.table(kind).insert(handle, id);
    }

    pub fn unregister_collaborator(&mut self, kind: CollaboratorKind, handle: Window) {
        self.table(kind).remove(&handle);
    }

    pub fn register_root(&mut self, root: Window, screen: usize) {
        self.roots.insert(root, screen);
    }

    /// Resolve a handle: clients first, then menus, toolbars and docks,
    /// then screens.
    pub fn resolve(&self, handle: Window) -> Option<EventTarget> {
        if let Some(client) = self.windows.get(&handle) {
            return Some(EventTarget::Client(*client));
        }
        if let Some(id) = self.menus.get(&handle) {
            return Some(EventTarget::Menu(*id));
        }
        if let Some(id) = self.toolbars.get(&handle) {
            return Some(EventTarget::Toolbar(*id));
        }
        if let Some(id) = self.docks.get(&handle) {
            return Some(EventTarget::Dock(*id));
        }
        self.roots.get(&handle).map(|screen| EventTarget::Screen(*screen))
    }
}
