//! Operations on managed windows and workspaces
//!
//! Direct gestures, client messages and collaborator commands all end up
//! here, so a menu entry and a titlebar button behave the same.

use anyhow::Result;
use tracing::{debug, info};
use x11rb::protocol::xproto::{Timestamp, Window};
use x11rb::CURRENT_TIME;

use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::client_flags::{Functions, MaximizeMode};
use crate::wm::display::{Display, RootProperty};
use crate::wm::focus::focus_first;
use crate::wm::menu::{MenuItem, WmCommand};
use crate::wm::{managed, WindowManager};

impl<D: Display> WindowManager<D> {
    /// `window` followed by all of its transients, owners first.
    fn with_transients(&self, window: Window) -> Vec<Window> {
        let mut out = Vec::new();
        let mut stack = vec![window];
        while let Some(current) = stack.pop() {
            if out.contains(&current) {
                continue;
            }
            out.push(current);
            stack.extend(self.transients.transients_of(current).iter().rev());
        }
        out
    }

    /// Put a non-iconic client into its workspace's lists, on top.
    pub(crate) fn attach_to_workspace(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let (screen, workspace) = (client.screen, client.workspace);
        let clients = &self.clients;
        let frame_of = |w: Window| clients.get(&w).map(Client::frame_window);
        if let Some(ws) = self.screens[screen].workspaces.get_mut(workspace) {
            ws.add_window(&mut self.display, &self.transients, &frame_of, window)?;
        }
        self.restack_collaborators(screen)
    }

    // --- focus ---

    /// Give `window` the input focus, or its deepest modal transient when
    /// it has one. Returns whether some window took the focus.
    pub fn focus_window(&mut self, window: Window, time: Timestamp) -> Result<bool> {
        let clients = &self.clients;
        let target = self
            .transients
            .modal_transient(window, |w| clients.get(&w).is_some_and(|c| c.is_modal() && c.is_visible()))
            .unwrap_or(window);
        let Some(client) = self.clients.get(&target) else {
            return Ok(false);
        };
        if !client.set_input_focus(&mut self.display, time)? {
            return Ok(false);
        }
        if target != window {
            debug!("Focus for 0x{:x} redirected to modal 0x{:x}", window, target);
        }
        self.track_focus(Some(target))?;
        Ok(true)
    }

    /// Record where the focus is now (from our own request or a FocusIn)
    /// and repaint the frames involved.
    pub(crate) fn track_focus(&mut self, window: Option<Window>) -> Result<()> {
        let window = window.filter(|w| self.clients.contains_key(w));
        if self.focused == window {
            return Ok(());
        }
        if let Some(old) = self.focused.take() {
            if let Some(client) = self.clients.get_mut(&old) {
                client.set_focused(&mut self.display, self.renderer.as_mut(), &self.style, false)?;
            }
        }
        if let Some(new) = window {
            if let Some(client) = self.clients.get_mut(&new) {
                client.set_focused(&mut self.display, self.renderer.as_mut(), &self.style, true)?;
                let (screen, workspace) = (client.screen, client.workspace);
                if let Some(ws) = self.screens[screen].workspaces.get_mut(workspace) {
                    ws.last_focused = Some(new);
                }
            }
        }
        self.focused = window;
        self.publish_active()
    }

    /// Move the focus off a window that can no longer hold it: to its
    /// transient owner when that is still visible, else down the current
    /// workspace of its screen.
    fn release_focus_if_hidden(&mut self) -> Result<()> {
        let Some(focused) = self.focused else {
            return Ok(());
        };
        match self.clients.get(&focused) {
            Some(client) if client.is_visible() => Ok(()),
            Some(client) => {
                let screen = client.screen;
                let owner = self.transients.transient_for(focused);
                self.refocus(screen, owner)
            }
            None => self.drop_focus(),
        }
    }

    /// Give the focus to `preferred`, or failing that to the top-most
    /// window of the current workspace that takes it. Candidates refusing
    /// the focus are skipped; with none left the focus goes nowhere.
    pub(crate) fn refocus(&mut self, screen: usize, preferred: Option<Window>) -> Result<()> {
        let s = &self.screens[screen];
        let mut candidates: Vec<Window> = preferred.into_iter().collect();
        if let Some(ws) = s.workspaces.get(s.current()) {
            candidates.extend(ws.stacking().iter().copied().filter(|w| Some(*w) != preferred));
        }
        candidates.retain(|w| self.clients.get(w).is_some_and(Client::is_visible));
        let chosen = focus_first(candidates, |w| self.focus_window(w, CURRENT_TIME));
        match chosen {
            Some(window) => {
                debug!("Focus fell back to 0x{:x}", window);
                Ok(())
            }
            None => self.drop_focus(),
        }
    }

    fn drop_focus(&mut self) -> Result<()> {
        self.track_focus(None)?;
        self.display.set_input_focus(None, CURRENT_TIME)
    }

    // --- stacking ---

    /// Raise the transient chain of `window` as one block.
    pub fn raise_window(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        if client.is_iconic() {
            return Ok(());
        }
        let (screen, workspace) = (client.screen, client.workspace);
        let clients = &self.clients;
        let frame_of = |w: Window| clients.get(&w).map(Client::frame_window);
        if let Some(ws) = self.screens[screen].workspaces.get_mut(workspace) {
            ws.raise_window(&mut self.display, &self.transients, &frame_of, window)?;
        }
        self.restack_collaborators(screen)?;
        self.publish_client_lists()
    }

    pub fn lower_window(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        if client.is_iconic() {
            return Ok(());
        }
        let (screen, workspace) = (client.screen, client.workspace);
        let clients = &self.clients;
        let frame_of = |w: Window| clients.get(&w).map(Client::frame_window);
        if let Some(ws) = self.screens[screen].workspaces.get_mut(workspace) {
            ws.lower_window(&mut self.display, &self.transients, &frame_of, window)?;
        }
        self.publish_client_lists()
    }

    // --- state changes ---

    /// Iconify `window` and its transients: they leave the workspace lists
    /// and join the screen's icon list.
    pub fn iconify_window(&mut self, window: Window) -> Result<()> {
        for w in self.with_transients(window) {
            let Some(client) = self.clients.get_mut(&w) else {
                continue;
            };
            if !client.iconify(&mut self.display)? {
                continue;
            }
            let s = &mut self.screens[client.screen];
            if let Some(ws) = s.workspaces.get_mut(client.workspace) {
                ws.remove_window(w);
            }
            s.add_icon(w);
        }
        self.release_focus_if_hidden()?;
        self.publish_client_lists()
    }

    /// Bring an iconic window (and its transients) back onto the current
    /// workspace.
    pub fn deiconify_window(&mut self, window: Window) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        if !client.is_iconic() {
            return Ok(());
        }
        for w in self.with_transients(window) {
            let Some(client) = self.clients.get_mut(&w) else {
                continue;
            };
            let screen = client.screen;
            client.workspace = self.screens[screen].current();
            if !client.deiconify(&mut self.display, true)? {
                continue;
            }
            client.publish_desktop(&mut self.display)?;
            self.screens[screen].remove_icon(w);
            self.attach_to_workspace(w)?;
        }
        self.publish_client_lists()?;
        self.focus_window(window, CURRENT_TIME)?;
        Ok(())
    }

    /// Ask the client to close; it is forgotten when it destroys itself.
    pub fn close_window(&mut self, window: Window, time: Timestamp) -> Result<()> {
        if let Some(client) = self.clients.get(&window) {
            client.close(&mut self.display, time)?;
        }
        Ok(())
    }

    pub fn set_shaded(&mut self, window: Window, shaded: bool) -> Result<()> {
        let client = managed(&mut self.clients, window)?;
        client.set_shaded(&mut self.display, shaded)?;
        Ok(())
    }

    pub fn toggle_shade(&mut self, window: Window) -> Result<()> {
        let shaded = managed(&mut self.clients, window)?.is_shaded();
        self.set_shaded(window, !shaded)
    }

    /// Stick or unstick the whole transient chain of `window`.
    pub fn set_stuck(&mut self, window: Window, stuck: bool) -> Result<()> {
        for w in self.transients.chain_members(window) {
            if let Some(client) = self.clients.get_mut(&w) {
                client.set_stuck(&mut self.display, stuck)?;
            }
        }
        Ok(())
    }

    pub fn toggle_stick(&mut self, window: Window) -> Result<()> {
        let stuck = managed(&mut self.clients, window)?.is_stuck();
        self.set_stuck(window, !stuck)
    }

    /// Maximize along `mode`, or restore a maximized window.
    pub fn maximize_window(&mut self, window: Window, mode: MaximizeMode) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        if !client.functions.contains(Functions::MAXIMIZE) && !client.maximized.is_maximized() {
            return Ok(());
        }
        let area = self.screens[client.screen].maximize_area(self.config.behavior.full_maximize);
        managed(&mut self.clients, window)?.maximize(&mut self.display, mode, area)
    }

    /// Move and/or resize the frame of `window`.
    pub fn configure_window(&mut self, window: Window, rect: Geometry) -> Result<()> {
        managed(&mut self.clients, window)?.configure(&mut self.display, rect)
    }

    pub(crate) fn restyle_client(&mut self, window: Window) -> Result<()> {
        let client = managed(&mut self.clients, window)?;
        client.restyle(&mut self.display, self.renderer.as_mut(), &self.style)?;
        self.refresh_handles(window)
    }

    // --- workspaces ---

    /// Make `to` the current workspace of `screen`. Stuck windows come
    /// along; focus goes to the new workspace's last focused window when
    /// the policy asks for it.
    pub fn change_workspace(&mut self, screen: usize, to: usize) -> Result<()> {
        let clients = &self.clients;
        let Some(switch) = self.screens[screen].change_current_workspace(to, self.config.focus.focus_last, |w| {
            clients.get(&w).is_some_and(Client::is_stuck)
        }) else {
            return Ok(());
        };
        self.abort_interaction()?;

        self.with_server_grab(|wm| {
            for w in &switch.hide {
                if let Some(client) = wm.clients.get_mut(w) {
                    client.hide(&mut wm.display)?;
                }
            }
            let stuck: Vec<Window> = wm.screens[screen].workspaces[switch.from]
                .members()
                .iter()
                .copied()
                .filter(|w| wm.clients.get(w).is_some_and(Client::is_stuck))
                .collect();
            for w in stuck {
                let clients = &wm.clients;
                let frame_of = |w: Window| clients.get(&w).map(Client::frame_window);
                wm.screens[screen].reassociate_window(
                    &mut wm.display,
                    &wm.transients,
                    &frame_of,
                    w,
                    switch.from,
                    switch.to,
                    true,
                    true,
                )?;
                if let Some(client) = wm.clients.get_mut(&w) {
                    client.workspace = switch.to;
                }
            }
            for w in &switch.show {
                if let Some(client) = wm.clients.get_mut(w) {
                    client.show(&mut wm.display)?;
                }
            }
            let clients = &wm.clients;
            let frame_of = |w: Window| clients.get(&w).map(Client::frame_window);
            wm.screens[screen].workspaces[switch.to].restack_all(&mut wm.display, &frame_of)
        })?;
        self.restack_collaborators(screen)?;

        match switch.focus {
            Some(last) => self.refocus(screen, Some(last))?,
            None if self.focused.is_some_and(|w| !self.clients.get(&w).is_some_and(Client::is_visible)) => {
                self.drop_focus()?
            }
            None => {}
        }

        let root = self.screens[screen].root;
        self.display
            .set_root_property(root, RootProperty::CurrentDesktop(switch.to as u32))?;
        self.publish_client_lists()?;
        self.display.flush()
    }

    fn cycle_workspace(&mut self, screen: usize, forward: bool) -> Result<()> {
        let s = &self.screens[screen];
        let count = s.workspace_count();
        let to = if forward {
            (s.current() + 1) % count
        } else {
            (s.current() + count - 1) % count
        };
        self.change_workspace(screen, to)
    }

    /// Move `window` (with its transients) to workspace `to` of its screen.
    /// Stuck windows stay where they are. A window sent away from the
    /// current workspace is hidden, not iconified.
    pub fn send_to_workspace(&mut self, window: Window, to: usize) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let (screen, from) = (client.screen, client.workspace);
        if from == to || to >= self.screens[screen].workspace_count() || client.is_stuck() {
            return Ok(());
        }
        let current = self.screens[screen].current();
        for w in self.with_transients(window) {
            let Some(client) = self.clients.get(&w) else {
                continue;
            };
            if client.workspace != from || client.is_stuck() {
                continue;
            }
            {
                let clients = &self.clients;
                let frame_of = |w: Window| clients.get(&w).map(Client::frame_window);
                self.screens[screen].reassociate_window(
                    &mut self.display,
                    &self.transients,
                    &frame_of,
                    w,
                    from,
                    to,
                    false,
                    false,
                )?;
            }
            let client = managed(&mut self.clients, w)?;
            client.workspace = to;
            client.publish_desktop(&mut self.display)?;
            client.publish_state(&mut self.display)?;
            if !client.is_iconic() {
                if to == current {
                    client.show(&mut self.display)?;
                } else {
                    client.hide(&mut self.display)?;
                }
            }
        }
        info!("Sent 0x{:x} to workspace {}", window, to);
        self.release_focus_if_hidden()?;
        self.publish_client_lists()
    }

    pub fn add_workspace(&mut self, screen: usize) -> Result<()> {
        let name = self.config.workspace_name(self.screens[screen].workspace_count());
        let index = self.screens[screen].add_workspace(name);
        info!("Screen {}: added workspace {}", screen, index);
        self.publish_desktops(screen)
    }

    /// Drop the last workspace; its windows move to the one before it.
    pub fn remove_last_workspace(&mut self, screen: usize) -> Result<()> {
        let Some(members) = self.screens[screen].remove_last_workspace() else {
            debug!("Screen {}: last workspace cannot be removed", screen);
            return Ok(());
        };
        let target = self.screens[screen].workspace_count() - 1;
        let current = self.screens[screen].current();
        let orphans: Vec<Window> = self
            .client_order
            .iter()
            .copied()
            .filter(|w| {
                self.clients
                    .get(w)
                    .is_some_and(|c| c.screen == screen && c.workspace > target)
            })
            .collect();
        for w in orphans {
            let client = managed(&mut self.clients, w)?;
            client.workspace = target;
            client.publish_desktop(&mut self.display)?;
            client.publish_state(&mut self.display)?;
        }
        for w in members {
            self.attach_to_workspace(w)?;
            if target == current {
                managed(&mut self.clients, w)?.show(&mut self.display)?;
            }
        }
        self.publish_desktops(screen)?;
        self.publish_client_lists()
    }

    // --- menus ---

    /// Show the menu of `screen` with `items` at a root position.
    pub(crate) fn open_menu(&mut self, screen: usize, items: Vec<MenuItem>, at: (i32, i32)) -> Result<()> {
        self.hide_menus()?;
        let id = self.panels[screen].menu;
        let bounds = self.screens[screen].geometry;
        if let Some(menu) = self.collaborators.get_mut(id.0) {
            menu.open(&mut self.display, items, at, bounds)?;
        }
        Ok(())
    }

    /// Carry out a command from a collaborator.
    pub fn run_command(&mut self, command: WmCommand) -> Result<()> {
        debug!("Command {:?}", command);
        match command {
            WmCommand::Raise(w) => self.raise_window(w),
            WmCommand::Lower(w) => self.lower_window(w),
            WmCommand::Iconify(w) => self.iconify_window(w),
            WmCommand::Deiconify(w) => self.deiconify_window(w),
            WmCommand::Close(w) => self.close_window(w, CURRENT_TIME),
            WmCommand::ToggleShade(w) => self.toggle_shade(w),
            WmCommand::ToggleStick(w) => self.toggle_stick(w),
            WmCommand::Maximize(w, mode) => self.maximize_window(w, mode),
            WmCommand::ChangeWorkspace { screen, workspace } => self.change_workspace(screen, workspace),
            WmCommand::PrevWorkspace(screen) => self.cycle_workspace(screen, false),
            WmCommand::NextWorkspace(screen) => self.cycle_workspace(screen, true),
            WmCommand::SendToWorkspace(w, workspace) => self.send_to_workspace(w, workspace),
            WmCommand::AddWorkspace(screen) => self.add_workspace(screen),
            WmCommand::RemoveLastWorkspace(screen) => self.remove_last_workspace(screen),
            WmCommand::Reconfigure => self.reconfigure(),
            WmCommand::Exit => {
                info!("Exit requested");
                self.stop();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client_flags::ClientState;
    use crate::wm::display::{ClientProperty, StackPosition};
    use crate::wm::testing::{self, Call};

    #[test]
    fn test_focus_redirects_to_modal_transient() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        // _NET_WM_STATE_MODAL
        let modal = display.atoms().net_wm_state_modal;
        display.set_property(0x401, ClientProperty::NetWmState, vec![modal]);
        wm.manage_window(0, 0x401, false).unwrap();
        assert!(wm.client(0x401).unwrap().is_modal());

        wm.focus_window(0x400, CURRENT_TIME).unwrap();
        assert_eq!(wm.display().focus, Some(0x401));
        assert_eq!(wm.focused(), Some(0x401));
        assert_eq!(wm.display().active_window(), Some(0x401));
    }

    #[test]
    fn test_iconified_transient_hands_focus_to_owner() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x300, Geometry::new(600, 100, 200, 100));
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        wm.manage_window(0, 0x401, false).unwrap();
        // Keep 0x300 above the owner so only the owner rule picks 0x400
        wm.raise_window(0x300).unwrap();
        wm.focus_window(0x401, CURRENT_TIME).unwrap();

        wm.iconify_window(0x401).unwrap();
        assert_eq!(wm.focused(), Some(0x400));
        assert_eq!(wm.display().focus, Some(0x400));
        assert_eq!(wm.display().active_window(), Some(0x400));
    }

    #[test]
    fn test_send_to_other_workspace_hides_without_iconifying() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        wm.focus_window(0x400, CURRENT_TIME).unwrap();

        wm.send_to_workspace(0x400, 1).unwrap();
        let client = wm.client(0x400).unwrap();
        assert!(!client.is_visible());
        assert!(!client.is_iconic());
        assert_eq!(client.workspace, 1);
        let screen = &wm.screens()[0];
        assert!(!screen.workspaces[0].contains(0x400));
        assert!(screen.workspaces[1].contains(0x400));
        assert!(screen.icons().is_empty());
        assert_eq!(wm.display().desktops.get(&0x400), Some(&Some(1)));
        assert_eq!(wm.focused(), None);
        assert_eq!(wm.display().focus, None);

        // With another window left behind, that one takes the focus
        testing::manage(&mut wm, 0x402, Geometry::new(10, 10, 200, 100));
        testing::manage(&mut wm, 0x403, Geometry::new(300, 10, 200, 100));
        wm.focus_window(0x403, CURRENT_TIME).unwrap();
        wm.send_to_workspace(0x403, 2).unwrap();
        assert_eq!(wm.focused(), Some(0x402));
    }

    #[test]
    fn test_workspace_switch_hides_shows_and_carries_stuck_windows() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        testing::manage(&mut wm, 0x401, Geometry::new(300, 10, 200, 100));
        testing::manage(&mut wm, 0x402, Geometry::new(600, 10, 200, 100));
        wm.send_to_workspace(0x401, 1).unwrap();
        wm.set_stuck(0x402, true).unwrap();

        wm.change_workspace(0, 1).unwrap();
        assert!(!wm.client(0x400).unwrap().is_visible());
        assert!(wm.client(0x401).unwrap().is_visible());
        let stuck = wm.client(0x402).unwrap();
        assert!(stuck.is_visible());
        assert_eq!(stuck.workspace, 1);
        assert!(wm.screens()[0].workspaces[1].contains(0x402));
        assert!(!wm.screens()[0].workspaces[0].contains(0x402));
        let current = wm.display().root_prop(|p| match p {
            RootProperty::CurrentDesktop(d) => Some(*d),
            _ => None,
        });
        assert_eq!(current, Some(1));

        // Back again: last focused window gets the focus
        wm.focus_window(0x401, CURRENT_TIME).unwrap();
        wm.change_workspace(0, 0).unwrap();
        wm.change_workspace(0, 1).unwrap();
        assert_eq!(wm.focused(), Some(0x401));
    }

    #[test]
    fn test_iconify_moves_window_to_icon_list_and_back() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        wm.focus_window(0x400, CURRENT_TIME).unwrap();
        wm.iconify_window(0x400).unwrap();

        let screen = &wm.screens()[0];
        assert!(screen.current_workspace().is_empty());
        assert_eq!(screen.icons(), &[0x400]);
        assert_eq!(wm.focused(), None);
        assert_eq!(wm.display().focus, None);

        wm.change_workspace(0, 2).unwrap();
        wm.deiconify_window(0x400).unwrap();
        let client = wm.client(0x400).unwrap();
        assert!(client.is_visible());
        assert_eq!(client.workspace, 2);
        assert!(wm.screens()[0].icons().is_empty());
        assert!(wm.screens()[0].workspaces[2].contains(0x400));
    }

    #[test]
    fn test_raise_restacks_transient_chain_once() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        wm.manage_window(0, 0x401, false).unwrap();
        testing::manage(&mut wm, 0x402, Geometry::new(500, 100, 200, 100));

        wm.display_mut().clear_calls();
        wm.raise_window(0x400).unwrap();
        let frames = |w: Window| wm.client(w).unwrap().frame_window();
        assert_eq!(
            wm.display().restacks(),
            vec![(vec![frames(0x401), frames(0x400)], StackPosition::Top)]
        );
        assert_eq!(wm.screens()[0].current_workspace().stacking(), &[0x401, 0x400, 0x402]);
    }

    #[test]
    fn test_maximize_uses_usable_area_and_restores() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let before = wm.client(0x400).unwrap().frame_rect();

        wm.maximize_window(0x400, MaximizeMode::Full).unwrap();
        // Toolbar keeps the bottom 22 pixels
        assert_eq!(wm.client(0x400).unwrap().frame_rect(), Geometry::new(0, 0, 1024, 746));
        wm.maximize_window(0x400, MaximizeMode::Full).unwrap();
        assert_eq!(wm.client(0x400).unwrap().frame_rect(), before);
    }

    #[test]
    fn test_removing_last_workspace_moves_its_windows() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        wm.send_to_workspace(0x400, 3).unwrap();
        wm.change_workspace(0, 2).unwrap();

        wm.run_command(WmCommand::RemoveLastWorkspace(0)).unwrap();
        assert_eq!(wm.screens()[0].workspace_count(), 3);
        let client = wm.client(0x400).unwrap();
        assert_eq!(client.workspace, 2);
        assert!(client.is_visible());

        // The current workspace is never removed
        wm.run_command(WmCommand::RemoveLastWorkspace(0)).unwrap();
        assert_eq!(wm.screens()[0].workspace_count(), 3);

        wm.run_command(WmCommand::AddWorkspace(0)).unwrap();
        assert_eq!(wm.screens()[0].workspace_names()[3], "Workspace 4");
    }

    #[test]
    fn test_workspace_cycle_wraps() {
        let mut wm = testing::window_manager();
        wm.run_command(WmCommand::PrevWorkspace(0)).unwrap();
        assert_eq!(wm.screens()[0].current(), 3);
        wm.run_command(WmCommand::NextWorkspace(0)).unwrap();
        assert_eq!(wm.screens()[0].current(), 0);
    }

    #[test]
    fn test_stick_follows_transient_chain() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        wm.manage_window(0, 0x401, false).unwrap();

        wm.run_command(WmCommand::ToggleStick(0x401)).unwrap();
        assert!(wm.client(0x400).unwrap().state.contains(ClientState::STUCK));
        assert!(wm.client(0x401).unwrap().is_stuck());
    }

    #[test]
    fn test_exit_and_close_commands() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        wm.display_mut()
            .protocols
            .insert(0x401, crate::wm::client_flags::Protocols::DELETE_WINDOW);
        testing::manage(&mut wm, 0x401, Geometry::new(300, 10, 200, 100));

        // No WM_DELETE_WINDOW: nothing is sent and the client stays
        wm.run_command(WmCommand::Close(0x400)).unwrap();
        assert!(wm.display().sent_protocols.is_empty());
        assert!(wm.client(0x400).is_some());

        wm.run_command(WmCommand::Close(0x401)).unwrap();
        assert!(wm
            .display()
            .sent_protocols
            .contains(&(0x401, crate::wm::display::ClientProtocol::DeleteWindow)));

        wm.run_command(WmCommand::Exit).unwrap();
        assert!(!wm.is_running());
        assert!(!wm.display().calls.iter().any(|c| matches!(c, Call::Destroy(_))));
    }
}
