//! Window Manager Module
//!
//! `WindowManager` is the dispatcher: it owns every managed client, the
//! screens with their workspaces, the handle registry, the collaborators
//! (menus, toolbar, dock) and the cooperative timer queue. All of it lives
//! on one thread; nothing here is shared.
//!
//! The impl is split by concern: `manage` (adopting and releasing
//! clients), `actions` (operations on managed windows and workspaces),
//! `events` (routing), `moveresize` (the interactive gesture) and
//! `startup` (scan-and-adopt).

pub mod actions;
pub mod client;
pub mod client_flags;
pub mod decorations;
pub mod display;
pub mod error;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod hints;
pub mod manage;
pub mod menu;
pub mod moveresize;
pub mod panel;
pub mod placement;
pub mod registry;
pub mod render;
pub mod screen;
pub mod session;
pub mod startup;
pub mod timer;
pub mod transients;
pub mod workspace;
pub mod xconn;

#[cfg(test)]
pub mod testing;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::config::Config;
use crate::wm::client::Client;
use crate::wm::decorations::FrameStyle;
use crate::wm::display::{Display, RootProperty, StackPosition};
use crate::wm::error::WmError;
use crate::wm::menu::{Collaborator, CollaboratorId, CommandMenu};
use crate::wm::moveresize::Interaction;
use crate::wm::panel::{Dock, Toolbar};
use crate::wm::registry::HandleRegistry;
use crate::wm::render::Renderer;
use crate::wm::screen::{Screen, StrutSource};
use crate::wm::session::SessionState;
use crate::wm::timer::{ClickTracker, TimerId, TimerKind, TimerQueue};
use crate::wm::transients::TransientManager;

pub use decorations::ButtonType;
pub use ewmh::Atoms;

/// Clock tick period for the toolbar
const CLOCK_INTERVAL: Duration = Duration::from_secs(60);

/// How a client stops being managed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The client window no longer exists
    Destroyed,
    /// The client withdrew itself (unmapped)
    Withdrawn,
    /// The window manager is exiting; the client keeps its state properties
    Shutdown,
}

/// Client table lookup that borrows only the table, so the display can be
/// borrowed alongside.
fn managed(clients: &mut HashMap<Window, Client>, window: Window) -> Result<&mut Client> {
    clients
        .get_mut(&window)
        .ok_or_else(|| WmError::NotManaged(window).into())
}

/// Collaborators of one screen
#[derive(Debug, Clone, Copy)]
struct ScreenPanels {
    menu: CollaboratorId,
    toolbar: CollaboratorId,
    dock: CollaboratorId,
}

pub struct WindowManager<D: Display> {
    display: D,
    renderer: Box<dyn Renderer>,
    config: Config,
    config_path: Option<PathBuf>,
    style: FrameStyle,
    screens: Vec<Screen>,
    clients: HashMap<Window, Client>,
    /// Managed client windows, oldest first (_NET_CLIENT_LIST order)
    client_order: Vec<Window>,
    registry: HandleRegistry,
    transients: TransientManager,
    collaborators: Vec<Box<dyn Collaborator>>,
    panels: Vec<ScreenPanels>,
    timers: TimerQueue,
    clicks: ClickTracker,
    /// The one active move/resize gesture
    interaction: Option<Interaction>,
    focused: Option<Window>,
    /// Depth of our reentrant server grab
    server_grabs: u32,
    auto_raise: Option<TimerId>,
    clock: Option<TimerId>,
    running: bool,
}

impl<D: Display> WindowManager<D> {
    /// Build the per-screen state and collaborators. Expects the caller to
    /// own the display already (SubstructureRedirect selected on every
    /// root); existing windows are adopted separately by `adopt_existing`.
    pub fn new(
        mut display: D,
        renderer: Box<dyn Renderer>,
        config: Config,
        config_path: Option<PathBuf>,
        session: Option<&SessionState>,
    ) -> Result<Self> {
        let style = FrameStyle::from_config(&config);
        let mut registry = HandleRegistry::new();
        let mut screens = Vec::new();
        for (index, root) in display.screen_roots().into_iter().enumerate() {
            let geometry = display.screen_geometry(root);
            let names = session
                .and_then(|s| s.workspace_names(index, &config))
                .unwrap_or_else(|| (0..config.workspaces.count.max(1)).map(|i| config.workspace_name(i)).collect());
            info!("Screen {}: root 0x{:x}, {}x{}, {} workspaces", index, root, geometry.width, geometry.height, names.len());
            registry.register_root(root, index);
            screens.push(Screen::new(index, root, geometry, names));
        }

        let mut collaborators: Vec<Box<dyn Collaborator>> = Vec::new();
        let mut panels = Vec::new();
        let background = config.style.unfocused_title.color;
        let border = config.style.border.color;
        for screen in &mut screens {
            let menu = CommandMenu::create(&mut display, screen.index, screen.root, background)?;
            let toolbar = Toolbar::create(
                &mut display,
                screen.index,
                screen.root,
                screen.geometry,
                &config.toolbar,
                background,
            )?;
            let dock = Dock::create(&mut display, screen.index, screen.root, screen.geometry, &config.dock, border)?;

            let mut add = |collaborator: Box<dyn Collaborator>| {
                let id = CollaboratorId(collaborators.len());
                for handle in collaborator.handles() {
                    registry.register_collaborator(collaborator.kind(), handle, id);
                }
                screen.set_strut(StrutSource::Collaborator(id), collaborator.strut());
                collaborators.push(collaborator);
                id
            };
            panels.push(ScreenPanels {
                menu: add(Box::new(menu)),
                toolbar: add(Box::new(toolbar)),
                dock: add(Box::new(dock)),
            });
        }

        let mut timers = TimerQueue::new();
        let clock = Some(timers.schedule_repeating(TimerKind::ClockTick, CLOCK_INTERVAL, Instant::now()));

        let mut wm = Self {
            display,
            renderer,
            config,
            config_path,
            style,
            screens,
            clients: HashMap::new(),
            client_order: Vec::new(),
            registry,
            transients: TransientManager::new(),
            collaborators,
            panels,
            timers,
            clicks: ClickTracker::default(),
            interaction: None,
            focused: None,
            server_grabs: 0,
            auto_raise: None,
            clock,
            running: true,
        };
        for screen in 0..wm.screens.len() {
            wm.publish_desktops(screen)?;
        }
        wm.publish_active()?;
        wm.display.flush()?;
        Ok(wm)
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn client(&self, window: Window) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn focused(&self) -> Option<Window> {
        self.focused
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    fn screen_of_root(&self, root: Window) -> Option<usize> {
        self.screens.iter().position(|s| s.root == root)
    }

    // --- server grab ---

    /// Reentrant: only the outermost grab reaches the server.
    fn grab_server(&mut self) -> Result<()> {
        if self.server_grabs == 0 {
            self.display.grab_server()?;
        }
        self.server_grabs += 1;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        match self.server_grabs {
            0 => Ok(()),
            1 => {
                self.server_grabs = 0;
                self.display.ungrab_server()
            }
            _ => {
                self.server_grabs -= 1;
                Ok(())
            }
        }
    }

    /// Run `f` with the server grabbed; the grab is released on error too.
    fn with_server_grab<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.grab_server()?;
        let result = f(self);
        let ungrab = self.ungrab_server();
        let value = result?;
        ungrab?;
        Ok(value)
    }

    // --- collaborators ---

    /// Re-read a collaborator's strut; re-publishes the work area when the
    /// usable area changed.
    fn refresh_collaborator_strut(&mut self, id: CollaboratorId) -> Result<()> {
        let Some(collaborator) = self.collaborators.get(id.0) else {
            return Ok(());
        };
        let (screen, strut) = (collaborator.screen(), collaborator.strut());
        if self.screens[screen].set_strut(StrutSource::Collaborator(id), strut) {
            self.publish_workarea(screen)?;
        }
        Ok(())
    }

    /// Keep on-top collaborators above client frames after a restack.
    fn restack_collaborators(&mut self, screen: usize) -> Result<()> {
        let mut top = Vec::new();
        for collaborator in &self.collaborators {
            if collaborator.screen() == screen && collaborator.on_top() && collaborator.is_visible() {
                top.extend(collaborator.handles());
            }
        }
        if top.is_empty() {
            return Ok(());
        }
        self.display.restack(&top, StackPosition::Top)
    }

    fn hide_menus(&mut self) -> Result<()> {
        for panels in self.panels.clone() {
            if let Some(menu) = self.collaborators.get_mut(panels.menu.0) {
                menu.hide(&mut self.display)?;
            }
        }
        Ok(())
    }

    // --- EWMH publication ---

    fn publish_client_lists(&mut self) -> Result<()> {
        for screen in &self.screens {
            let list: Vec<Window> = self
                .client_order
                .iter()
                .copied()
                .filter(|w| self.clients.get(w).is_some_and(|c| c.screen == screen.index))
                .collect();
            // Bottom to top: icons, then every workspace bottom-up
            let mut stacking: Vec<Window> = screen.icons().to_vec();
            for workspace in &screen.workspaces {
                stacking.extend(workspace.stacking().iter().rev());
            }
            self.display.set_root_property(screen.root, RootProperty::ClientList(list))?;
            self.display
                .set_root_property(screen.root, RootProperty::ClientListStacking(stacking))?;
        }
        Ok(())
    }

    fn publish_desktops(&mut self, screen: usize) -> Result<()> {
        let s = &self.screens[screen];
        let root = s.root;
        let count = s.workspace_count() as u32;
        let names = s.workspace_names();
        let current = s.current() as u32;
        self.display.set_root_property(root, RootProperty::NumberOfDesktops(count))?;
        self.display.set_root_property(root, RootProperty::DesktopNames(names))?;
        self.display.set_root_property(root, RootProperty::CurrentDesktop(current))?;
        self.publish_workarea(screen)
    }

    fn publish_workarea(&mut self, screen: usize) -> Result<()> {
        let s = &self.screens[screen];
        let root = s.root;
        let areas = vec![s.usable_area(); s.workspace_count()];
        self.display.set_root_property(root, RootProperty::Workarea(areas))
    }

    fn publish_active(&mut self) -> Result<()> {
        for root in self.screens.iter().map(|s| s.root).collect::<Vec<_>>() {
            self.display.set_root_property(root, RootProperty::ActiveWindow(self.focused))?;
        }
        Ok(())
    }

    // --- timers ---

    /// Earliest pending timer deadline, for the event loop's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Run every timer due at `now`. Never called while an event is being
    /// handled.
    pub fn fire_timers(&mut self, now: Instant) -> Result<()> {
        for kind in self.timers.fire_due(now) {
            match kind {
                TimerKind::AutoRaise(window) => {
                    self.auto_raise = None;
                    if self.focused == Some(window) {
                        self.raise_window(window)?;
                    }
                }
                TimerKind::ClockTick => {
                    for collaborator in &mut self.collaborators {
                        collaborator.clock_tick(&mut self.display)?;
                    }
                }
                TimerKind::DoubleClickExpire => self.clicks.expire(),
            }
        }
        self.display.flush()
    }

    fn cancel_auto_raise(&mut self) {
        if let Some(id) = self.auto_raise.take() {
            self.timers.cancel(id);
        }
    }

    // --- lifecycle ---

    /// Reload the configuration file and apply what can change at runtime:
    /// policies and behavior right away, decoration metrics and textures by
    /// rebuilding every frame.
    pub fn reconfigure(&mut self) -> Result<()> {
        let config = match &self.config_path {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        };
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                warn!("Keeping current configuration: {:#}", e);
                return Ok(());
            }
        };
        info!("Reconfiguring");
        self.style = FrameStyle::from_config(&config);
        self.config = config;
        let windows: Vec<Window> = self.client_order.clone();
        for window in windows {
            self.restyle_client(window)?;
        }
        self.display.flush()
    }

    /// Release every client and collaborator and save the session.
    pub fn shutdown(&mut self, session_path: Option<&std::path::Path>) -> Result<()> {
        info!("Shutting down, releasing {} clients", self.clients.len());
        self.abort_interaction()?;
        if let Some(path) = session_path {
            if let Err(e) = SessionState::capture(&self.config, &self.screens).save(path) {
                warn!("Failed to save session: {:#}", e);
            }
        }
        for window in self.client_order.clone().into_iter().rev() {
            if let Err(e) = self.unmanage(window, Removal::Shutdown) {
                warn!("Failed to release 0x{:x}: {:#}", window, e);
            }
        }
        let mut collaborators = std::mem::take(&mut self.collaborators);
        for collaborator in &mut collaborators {
            for handle in collaborator.handles() {
                self.registry.unregister_collaborator(collaborator.kind(), handle);
            }
            collaborator.destroy(&mut self.display)?;
        }
        if let Some(id) = self.clock.take() {
            self.timers.cancel(id);
        }
        self.display.set_input_focus(None, x11rb::CURRENT_TIME)?;
        self.running = false;
        debug!("Shutdown complete");
        self.display.flush()
    }
}
