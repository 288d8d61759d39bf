//! Adopting and releasing clients
//!
//! `manage_window` turns a top-level window into a `Client`: frame,
//! registry entries, workspace slot, restored attributes, placement.
//! `unmanage` undoes all of it in reverse order.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;
use x11rb::CURRENT_TIME;

use crate::shared::Geometry;
use crate::wm::client::{Client, ClientHints};
use crate::wm::client_flags::{ClientState, IcccmState, MaximizeMode, NetWmState};
use crate::wm::display::{ClientProperty, Display};
use crate::wm::error::WmError;
use crate::wm::hints::{BOX_ATTR_MAX_HORZ, BOX_ATTR_MAX_VERT, BOX_ATTR_OMNIPRESENT, BOX_ATTR_SHADED};
use crate::wm::menu::CollaboratorKind;
use crate::wm::placement::Placer;
use crate::wm::screen::StrutSource;
use crate::wm::{managed, Removal, WindowManager};

impl<D: Display> WindowManager<D> {
    /// Start managing `window`, a child of the root of `screen`. During the
    /// startup scan (`adopting`) the window's current geometry is kept as is.
    ///
    /// A map request for a window we already manage deiconifies it.
    pub fn manage_window(&mut self, screen: usize, window: Window, adopting: bool) -> Result<()> {
        if self.clients.contains_key(&window) {
            return self.deiconify_window(window);
        }
        if self.registry.resolve(window).is_some() {
            debug!("0x{:x} belongs to us, not managing", window);
            return Ok(());
        }
        self.with_server_grab(|wm| wm.manage_grabbed(screen, window, adopting))?;
        self.display.flush()
    }

    fn manage_grabbed(&mut self, screen: usize, window: Window, adopting: bool) -> Result<()> {
        let Some(attrs) = self.display.window_attributes(window)? else {
            debug!("0x{:x} vanished before it could be managed", window);
            return Ok(());
        };
        if attrs.override_redirect {
            return Ok(());
        }
        let hints = ClientHints::read(&mut self.display, window)?;

        // Dockapps ask to start withdrawn
        if hints.wm.initial_state == IcccmState::Withdrawn && self.absorb_dockapp(screen, window)? {
            return Ok(());
        }

        let root = self.screens[screen].root;
        let owner = self.resolve_owner(screen, window, &hints);
        let workspace = self.initial_workspace(screen, owner, &hints);

        let record = hints.attributes;
        let attributes = hints
            .manager
            .and_then(|m| m.attributes)
            .or(record.map(|r| r.attributes))
            .unwrap_or(0);
        let net_state = hints.net_state;
        let requested_position = hints.size.has_position();
        let start_iconic = hints.wm.initial_state == IcccmState::Iconic || net_state.contains(NetWmState::HIDDEN);

        let mut client = Client::new(
            &mut self.display,
            self.renderer.as_mut(),
            &self.style,
            root,
            window,
            screen,
            workspace,
            &attrs,
            hints,
            owner.is_some(),
        )?;

        if let Err(e) = self.register_handles(&client) {
            self.registry.purge_client(window);
            client.release(&mut self.display, self.renderer.as_mut(), root, false)?;
            return Err(e);
        }

        // Transients share the stickiness of their chain root
        let stuck = match owner {
            Some(owner) => {
                let chain_root = self.transients.chain_root(owner);
                self.clients.get(&chain_root).is_some_and(Client::is_stuck)
            }
            None => attributes & BOX_ATTR_OMNIPRESENT != 0 || net_state.contains(NetWmState::STICKY),
        };
        if stuck {
            client.state.insert(ClientState::STUCK);
        }
        // Stuck windows live on whatever workspace is current
        if client.is_stuck() {
            client.workspace = self.screens[screen].current();
        }
        let workspace = client.workspace;
        if self.display.has_shape() {
            client.state.insert(ClientState::SHAPED);
        }

        let frame = client.frame_rect();
        let on_screen = frame.intersects(&self.screens[screen].geometry);
        if !adopting && !(requested_position && on_screen) {
            let area = self.screens[screen].usable_area();
            let placed = match owner.and_then(|o| self.clients.get(&o)) {
                Some(owner) => frame.centered_in(&owner.frame_rect()).clamped_to(&area),
                None => self.place_frame(screen, workspace, (frame.width, frame.height)),
            };
            client.configure(&mut self.display, placed)?;
        }

        let group = client.group;
        let strut = client.strut;
        self.clients.insert(window, client);
        self.client_order.push(window);

        if let Some(leader) = group.filter(|l| *l != window) {
            self.registry.add_group_member(leader, window);
        }
        if let Some(owner) = owner {
            if !self.transients.attach(window, owner) {
                warn!("Refusing transient loop 0x{:x} -> 0x{:x}", window, owner);
            }
        }
        if strut.is_some() && self.screens[screen].set_strut(StrutSource::Client(window), strut) {
            self.publish_workarea(screen)?;
        }

        if start_iconic {
            let client = managed(&mut self.clients, window)?;
            if attrs.mapped {
                client.iconify(&mut self.display)?;
            } else {
                client.start_iconic(&mut self.display)?;
            }
            self.screens[screen].add_icon(window);
        } else {
            self.attach_to_workspace(window)?;
            let client = managed(&mut self.clients, window)?;
            client.set_normal(&mut self.display)?;
        }

        let area = self.screens[screen].maximize_area(self.config.behavior.full_maximize);
        let client = managed(&mut self.clients, window)?;
        if attributes & BOX_ATTR_SHADED != 0 || net_state.contains(NetWmState::SHADED) {
            client.set_shaded(&mut self.display, true)?;
        }
        let mode = MaximizeMode::from_axes(
            attributes & BOX_ATTR_MAX_HORZ != 0 || net_state.contains(NetWmState::MAXIMIZED_HORZ),
            attributes & BOX_ATTR_MAX_VERT != 0 || net_state.contains(NetWmState::MAXIMIZED_VERT),
        );
        if mode.is_maximized() {
            client.maximize(&mut self.display, mode, area)?;
            if let Some(premax) = record.and_then(|r| r.premax) {
                client.premax = Some(premax);
            }
        }
        client.publish_desktop(&mut self.display)?;
        client.publish_state(&mut self.display)?;

        let visible = !start_iconic && workspace == self.screens[screen].current();
        if visible {
            managed(&mut self.clients, window)?.show(&mut self.display)?;
        }
        self.publish_client_lists()?;

        let focus_parent = owner.is_some() && owner == self.focused;
        if visible && !adopting && (self.config.focus.focus_new || focus_parent) {
            self.focus_window(window, CURRENT_TIME)?;
        }
        Ok(())
    }

    /// Owner of a transient: a managed window, or the group leader when
    /// WM_TRANSIENT_FOR names the root or None.
    fn resolve_owner(&self, screen: usize, window: Window, hints: &ClientHints) -> Option<Window> {
        let root = self.screens[screen].root;
        let target = match hints.transient_for? {
            t if t == 0 || t == root => hints.wm.window_group?,
            t => self.registry.client_of(t).unwrap_or(t),
        };
        (target != window && self.clients.get(&target).is_some_and(|c| c.screen == screen)).then_some(target)
    }

    fn initial_workspace(&self, screen: usize, owner: Option<Window>, hints: &ClientHints) -> usize {
        let s = &self.screens[screen];
        hints
            .manager
            .and_then(|m| m.workspace)
            .or(hints.attributes.and_then(|a| a.workspace))
            .or(owner.and_then(|o| self.clients.get(&o)).map(|c| c.workspace))
            .filter(|w| *w < s.workspace_count())
            .unwrap_or(s.current())
    }

    /// Free spot for a new frame of `size` on a workspace.
    fn place_frame(&mut self, screen: usize, workspace: usize, size: (u32, u32)) -> Geometry {
        let s = &mut self.screens[screen];
        let mut obstacles: Vec<Geometry> = s.workspaces[workspace]
            .members()
            .iter()
            .filter_map(|w| self.clients.get(w))
            .filter(|c| !c.is_iconic())
            .map(Client::visible_frame_rect)
            .collect();
        obstacles.extend(s.reserved_rects());
        let placer = Placer {
            config: &self.config.placement,
            area: s.usable_area(),
            obstacles: &obstacles,
            cascade_step: self.style.title_height,
        };
        placer.place(size, &mut s.workspaces[workspace].cascade)
    }

    fn register_handles(&mut self, client: &Client) -> Result<()> {
        self.registry.register_client(client.window, client.window)?;
        for handle in client.frame.handles() {
            self.registry.register_client(handle, client.window)?;
        }
        Ok(())
    }

    /// Re-register the handles of `window` after its decoration windows
    /// were replaced.
    pub(crate) fn refresh_handles(&mut self, window: Window) -> Result<()> {
        for handle in self.registry.handles_of(window) {
            self.registry.unregister_client(handle);
        }
        let client = self.clients.get(&window).ok_or(WmError::NotManaged(window))?;
        self.registry.register_client(window, window)?;
        for handle in client.frame.handles() {
            self.registry.register_client(handle, window)?;
        }
        Ok(())
    }

    /// Offer a withdrawn-start window to the dock of its screen.
    fn absorb_dockapp(&mut self, screen: usize, window: Window) -> Result<bool> {
        let dock = self.panels[screen].dock;
        let Some(collaborator) = self.collaborators.get_mut(dock.0) else {
            return Ok(false);
        };
        if !collaborator.absorb(&mut self.display, window)? {
            return Ok(false);
        }
        self.registry.register_collaborator(CollaboratorKind::Dock, window, dock);
        self.refresh_collaborator_strut(dock)?;
        info!("Dockapp 0x{:x} swallowed by the dock", window);
        Ok(true)
    }

    /// A dockapp went away. Returns false when no dock owned it.
    pub(crate) fn release_dockapp(&mut self, window: Window, reparent: bool) -> Result<bool> {
        let Some(index) = self.collaborators.iter().position(|c| c.owns_client(window)) else {
            return Ok(false);
        };
        let collaborator = &mut self.collaborators[index];
        collaborator.release(&mut self.display, window, reparent)?;
        self.registry.unregister_collaborator(CollaboratorKind::Dock, window);
        self.refresh_collaborator_strut(crate::wm::menu::CollaboratorId(index))?;
        Ok(true)
    }

    /// Stop managing `window`. Safe to call for windows we never managed.
    pub fn unmanage(&mut self, window: Window, removal: Removal) -> Result<()> {
        if self.interaction.as_ref().is_some_and(|i| i.window == window) {
            self.abort_interaction()?;
        }
        let Some(mut client) = self.clients.remove(&window) else {
            return Ok(());
        };
        info!("Unmanaging 0x{:x} ({:?})", window, removal);
        self.client_order.retain(|w| *w != window);
        if self.auto_raise.is_some() && self.focused == Some(window) {
            self.cancel_auto_raise();
        }

        for handle in self.registry.handles_of(window) {
            self.registry.unregister_client(handle);
        }
        self.registry.purge_client(window);
        if let Some(leader) = client.group {
            self.registry.remove_group_member(leader, window);
        }

        let owner = self.transients.transient_for(window);
        for orphan in self.transients.detach(window) {
            if let Some(c) = self.clients.get_mut(&orphan) {
                if c.update_decorations(&mut self.display, self.renderer.as_mut(), &self.style, false)? {
                    self.refresh_handles(orphan)?;
                }
            }
        }

        let screen = client.screen;
        let s = &mut self.screens[screen];
        for workspace in &mut s.workspaces {
            workspace.remove_window(window);
        }
        s.remove_icon(window);
        if s.set_strut(StrutSource::Client(window), None) {
            self.publish_workarea(screen)?;
        }

        let root = self.screens[screen].root;
        client.release(&mut self.display, self.renderer.as_mut(), root, removal == Removal::Destroyed)?;
        if removal == Removal::Withdrawn {
            self.display.set_wm_state(window, IcccmState::Withdrawn)?;
            self.display.delete_property(window, ClientProperty::NetWmState)?;
            self.display.delete_property(window, ClientProperty::NetWmDesktop)?;
            self.display.delete_property(window, ClientProperty::Attributes)?;
        }

        if self.focused == Some(window) {
            self.focused = None;
            if removal != Removal::Shutdown {
                self.refocus(screen, owner)?;
            }
            self.publish_active()?;
        }
        self.publish_client_lists()?;
        self.display.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client_flags::WindowType;
    use crate::wm::hints::ManagerHints;
    use crate::wm::session::AttributeRecord;
    use crate::wm::testing::{self, Call};

    #[test]
    fn test_registry_forgets_destroyed_client() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        let handles = wm.registry().handles_of(0x400);
        assert!(handles.len() > 2);
        assert!(handles.contains(&wm.client(0x400).unwrap().frame_window()));

        wm.unmanage(0x400, Removal::Destroyed).unwrap();
        for handle in handles {
            assert_eq!(wm.registry().resolve(handle), None);
        }
        assert!(wm.display().client_list().is_empty());
        assert!(wm.screens()[0].current_workspace().is_empty());
        // Nothing is sent to a window that no longer exists
        assert!(!wm.display().calls.iter().any(|c| matches!(c, Call::Reparent(0x400, testing::ROOT, _, _))));
    }

    #[test]
    fn test_withdrawn_client_loses_state_properties() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        assert!(wm.display().properties.contains_key(&(0x400, ClientProperty::Attributes)));
        wm.unmanage(0x400, Removal::Withdrawn).unwrap();
        let display = wm.display();
        assert_eq!(display.wm_states.get(&0x400), Some(&IcccmState::Withdrawn));
        assert!(!display.properties.contains_key(&(0x400, ClientProperty::Attributes)));
        assert!(display.calls.contains(&Call::Reparent(0x400, testing::ROOT, 11, 32)));
        assert!(!display.save_set.contains(&0x400));
    }

    #[test]
    fn test_unpositioned_window_is_placed() {
        let mut wm = testing::window_manager();
        wm.display_mut().add_client(0x400, Geometry::new(0, 0, 300, 200));
        wm.manage_window(0, 0x400, false).unwrap();
        let client = wm.client(0x400).unwrap();
        assert_eq!((client.frame_rect().x, client.frame_rect().y), (0, 0));
        assert!(client.is_visible());
        assert_eq!(wm.display().wm_states.get(&0x400), Some(&IcccmState::Normal));

        wm.display_mut().add_client(0x401, Geometry::new(0, 0, 300, 200));
        wm.manage_window(0, 0x401, false).unwrap();
        let second = wm.client(0x401).unwrap().frame_rect();
        assert!(!second.intersects(&wm.client(0x400).unwrap().frame_rect()));
        assert_eq!(wm.display().client_list(), vec![0x400, 0x401]);
        assert_eq!(wm.screens()[0].current_workspace().stacking(), &[0x401, 0x400]);
    }

    #[test]
    fn test_transient_centers_on_owner_and_follows_its_workspace() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        wm.manage_window(0, 0x401, false).unwrap();

        let owner = wm.client(0x400).unwrap().frame_rect();
        let dialog = wm.client(0x401).unwrap();
        assert_eq!(dialog.frame_rect().centered_in(&owner), dialog.frame_rect());
        assert_eq!(dialog.workspace, 0);
        assert!(!dialog.layout.has_handle());
    }

    #[test]
    fn test_transient_for_root_resolves_to_group_leader() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 400, 300));
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![testing::ROOT]);
        // WM_HINTS with WindowGroupHint naming 0x400
        display.set_property(0x401, ClientProperty::WmHints, vec![1 << 6, 0, 0, 0, 0, 0, 0, 0, 0x400]);
        wm.manage_window(0, 0x401, false).unwrap();
        assert_eq!(wm.transients.transient_for(0x401), Some(0x400));
        assert_eq!(wm.registry().group_members(0x400), &[0x401]);
    }

    #[test]
    fn test_attribute_record_restores_state_on_restart() {
        let mut wm = testing::window_manager();
        let record = AttributeRecord {
            attributes: BOX_ATTR_SHADED | BOX_ATTR_OMNIPRESENT,
            workspace: Some(2),
            premax: None,
            decoration: None,
        };
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(50, 50, 200, 100));
        display.set_property(0x400, ClientProperty::Attributes, record.encode().to_vec());
        wm.manage_window(0, 0x400, true).unwrap();

        let client = wm.client(0x400).unwrap();
        assert!(client.is_shaded());
        assert!(client.is_stuck());
        // Stuck windows join the current workspace
        assert_eq!(client.workspace, 0);
        assert!(client.is_visible());
        assert_eq!(wm.display().desktops.get(&0x400), Some(&None));
    }

    #[test]
    fn test_manager_hint_workspace_keeps_window_hidden() {
        let mut wm = testing::window_manager();
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(50, 50, 200, 100));
        // flags: workspace
        display.set_property(0x400, ClientProperty::ManagerHints, vec![1 << 1, 0, 3, 0]);
        assert_eq!(
            ManagerHints::from_raw(Some(&[1 << 1, 0, 3, 0])).and_then(|m| m.workspace),
            Some(3)
        );
        wm.manage_window(0, 0x400, false).unwrap();
        let client = wm.client(0x400).unwrap();
        assert_eq!(client.workspace, 3);
        assert!(!client.is_visible());
        assert!(wm.screens()[0].workspaces[3].contains(0x400));
        assert!(!wm.display().mapped.contains(&client.frame_window()));
    }

    #[test]
    fn test_iconic_start_goes_to_icon_list() {
        let mut wm = testing::window_manager();
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(50, 50, 200, 100));
        // StateHint, initial state Iconic
        display.set_property(0x400, ClientProperty::WmHints, vec![1 << 1, 0, 3, 0, 0, 0, 0, 0, 0]);
        wm.manage_window(0, 0x400, false).unwrap();
        let client = wm.client(0x400).unwrap();
        assert!(client.is_iconic());
        assert_eq!(client.ignore_unmaps, 0);
        assert_eq!(wm.screens()[0].icons(), &[0x400]);
        assert!(wm.screens()[0].current_workspace().is_empty());
        assert_eq!(wm.display().wm_states.get(&0x400), Some(&IcccmState::Iconic));
    }

    #[test]
    fn test_panel_strut_shrinks_usable_area() {
        let mut wm = testing::window_manager();
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(0, 0, 1024, 30));
        display.types.insert(0x400, WindowType::Dock);
        display.set_property(0x400, ClientProperty::Strut, vec![0, 0, 30, 0]);
        wm.manage_window(0, 0x400, true).unwrap();
        assert_eq!(wm.screens()[0].usable_area(), Geometry::new(0, 30, 1024, 716));
        assert!(wm.client(0x400).unwrap().is_stuck());

        wm.unmanage(0x400, Removal::Destroyed).unwrap();
        assert_eq!(wm.screens()[0].usable_area(), Geometry::new(0, 0, 1024, 746));
    }

    #[test]
    fn test_our_own_windows_are_never_managed() {
        let mut wm = testing::window_manager();
        let toolbar = wm.display().created(crate::wm::display::WindowRole::Panel)[0];
        wm.manage_window(0, toolbar, false).unwrap();
        assert!(wm.client(toolbar).is_none());
    }

    #[test]
    fn test_withdrawn_start_goes_to_dock() {
        let mut wm = testing::window_manager();
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(0, 0, 64, 64));
        display.set_property(0x400, ClientProperty::WmHints, vec![1 << 1, 0, 0, 0, 0, 0, 0, 0, 0]);
        wm.manage_window(0, 0x400, false).unwrap();
        assert!(wm.client(0x400).is_none());
        assert!(matches!(
            wm.registry().resolve(0x400),
            Some(crate::wm::registry::EventTarget::Dock(_))
        ));
        // 64px dockapp plus padding along the bottom edge
        assert_eq!(wm.screens()[0].usable_area().height, 700);

        assert!(wm.release_dockapp(0x400, false).unwrap());
        assert_eq!(wm.registry().resolve(0x400), None);
        assert_eq!(wm.screens()[0].usable_area().height, 746);
    }
}
