//! Events Module
//!
//! Protocol events as the core sees them, and their dispatch. The X11
//! connection translates raw x11rb events into [`Event`] (decoding atoms
//! and dropping duplicates); [`WindowManager::handle_event`] resolves the
//! target handle once through the registry and hands the event to the
//! owning client, collaborator or screen.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, trace};
use x11rb::protocol::xproto::{Timestamp, Window};

use crate::config::FocusPolicy;
use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::client_flags::{ClientState, Functions, IcccmState, MaximizeMode, NetWmState};
use crate::wm::decorations::{ButtonType, FrameRegion};
use crate::wm::display::{ClientProperty, Display, WindowChanges};
use crate::wm::focus::FocusModel;
use crate::wm::hints::{gravitate, MwmHints, SizeHints, WmHints};
use crate::wm::menu::{self, PointerEvent, WmCommand};
use crate::wm::moveresize::{Corner, Gesture};
use crate::wm::registry::EventTarget;
use crate::wm::screen::StrutSource;
use crate::wm::timer::{Click, TimerKind};
use crate::wm::{managed, Removal, WindowManager};

/// _NET_WM_DESKTOP value meaning "all desktops"
pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// _NET_WM_STATE client message action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    fn apply(self, current: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !current,
        }
    }
}

/// Client messages we act on, with their atoms already decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
    /// WM_CHANGE_STATE
    ChangeState(IcccmState),
    /// _NET_ACTIVE_WINDOW
    Activate,
    /// _NET_CLOSE_WINDOW
    Close,
    /// _NET_CURRENT_DESKTOP, sent to the root
    CurrentDesktop(u32),
    /// _NET_WM_DESKTOP
    Desktop(u32),
    /// _NET_WM_STATE
    State { action: StateAction, flags: NetWmState },
}

/// Client properties whose changes we follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedProperty {
    Name,
    NormalHints,
    WmHints,
    Protocols,
    MotifHints,
    Strut,
}

/// Stacking part of a ConfigureRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRequest {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub window: Window,
    pub changes: WindowChanges,
    pub stack: Option<StackRequest>,
}

/// Button press or release; `x`/`y` relative to `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
    pub button: u8,
    pub time: Timestamp,
    /// Mod1 held
    pub alt: bool,
}

impl ButtonEvent {
    fn pointer(&self) -> PointerEvent {
        PointerEvent {
            window: self.window,
            x: self.x,
            y: self.y,
            root_x: self.root_x,
            root_y: self.root_y,
            button: self.button,
            time: self.time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    MapRequest { parent: Window, window: Window },
    ConfigureRequest(ConfigureRequest),
    UnmapNotify { window: Window, synthetic: bool },
    DestroyNotify { window: Window },
    PropertyNotify { window: Window, property: WatchedProperty },
    ClientMessage { window: Window, request: ClientRequest },
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    Motion(ButtonEvent),
    Enter { window: Window, time: Timestamp },
    FocusIn { window: Window },
    Expose { window: Window, count: u16 },
    ShapeNotify { window: Window },
    /// The pointer grab of an interaction was taken away
    GrabLost,
}

impl<D: Display> WindowManager<D> {
    /// Route one event to its owner. Events whose handle nobody owns are
    /// dropped.
    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        trace!("{:?}", event);
        match event {
            Event::MapRequest { parent, window } => self.on_map_request(parent, window),
            Event::ConfigureRequest(request) => self.on_configure_request(request),
            Event::UnmapNotify { window, synthetic } => self.on_unmap(window, synthetic),
            Event::DestroyNotify { window } => self.on_destroy(window),
            Event::PropertyNotify { window, property } => self.on_property(window, property),
            Event::ClientMessage { window, request } => self.on_client_message(window, request),
            Event::ButtonPress(ev) => self.on_button_press(ev),
            Event::ButtonRelease(ev) => self.on_button_release(ev),
            Event::Motion(ev) => self.on_motion(ev),
            Event::Enter { window, time } => self.on_enter(window, time),
            Event::FocusIn { window } => {
                if self.clients.contains_key(&window) {
                    self.track_focus(Some(window))?;
                }
                Ok(())
            }
            Event::Expose { window, count } => self.on_expose(window, count),
            Event::ShapeNotify { window } => self.on_shape(window),
            Event::GrabLost => self.abort_interaction(),
        }
    }

    // --- structure ---

    fn on_map_request(&mut self, parent: Window, window: Window) -> Result<()> {
        if self.clients.contains_key(&window) {
            return self.deiconify_window(window);
        }
        match self.screen_of_root(parent) {
            Some(screen) => self.manage_window(screen, window, false),
            None => {
                debug!("Map request for 0x{:x} under 0x{:x} passed through", window, parent);
                self.display.map_window(window)
            }
        }
    }

    fn on_configure_request(&mut self, request: ConfigureRequest) -> Result<()> {
        let window = request.window;
        let Some(client) = self.clients.get(&window) else {
            return self.display.configure_window(window, request.changes);
        };

        let current = client.client_rect();
        let changes = request.changes;
        let (width, height) = client.size_hints.constrain(
            changes.width.unwrap_or(current.width),
            changes.height.unwrap_or(current.height),
        );
        let requested = Geometry::new(
            changes.x.unwrap_or(current.x),
            changes.y.unwrap_or(current.y),
            width,
            height,
        );
        let mut frame = client.layout.upsize(requested);
        if changes.x.is_some() || changes.y.is_some() {
            let (x, y) = gravitate(requested, client.size_hints.gravity, &client.layout.margins());
            frame = frame.with_position(
                if changes.x.is_some() { x } else { frame.x },
                if changes.y.is_some() { y } else { frame.y },
            );
        }
        if frame == client.frame_rect() {
            // ICCCM: answer even when nothing moves
            self.display.send_configure_notify(window, current)?;
        } else {
            self.configure_window(window, frame)?;
        }
        match request.stack {
            Some(StackRequest::Above) => self.raise_window(window)?,
            Some(StackRequest::Below) => self.lower_window(window)?,
            None => {}
        }
        self.display.flush()
    }

    fn on_unmap(&mut self, window: Window, synthetic: bool) -> Result<()> {
        let Some(client) = self.clients.get_mut(&window) else {
            if self.release_dockapp(window, true)? {
                self.display.flush()?;
            }
            return Ok(());
        };
        if client.ignore_unmaps > 0 && !synthetic {
            client.ignore_unmaps -= 1;
            return Ok(());
        }
        self.unmanage(window, Removal::Withdrawn)
    }

    fn on_destroy(&mut self, window: Window) -> Result<()> {
        if self.clients.contains_key(&window) {
            return self.unmanage(window, Removal::Destroyed);
        }
        self.release_dockapp(window, false)?;
        Ok(())
    }

    fn on_property(&mut self, window: Window, property: WatchedProperty) -> Result<()> {
        if !self.clients.contains_key(&window) {
            return Ok(());
        }
        match property {
            WatchedProperty::Name => {
                let title = self.display.read_title(window)?;
                let client = managed(&mut self.clients, window)?;
                client.title = title;
                client.repaint(&mut self.display, self.renderer.as_mut(), &self.style)?;
            }
            WatchedProperty::NormalHints => {
                let raw = self.display.read_property(window, ClientProperty::NormalHints)?;
                managed(&mut self.clients, window)?.size_hints = SizeHints::from_raw(raw.as_deref());
                self.redecorate(window)?;
                // New limits apply to the size the window has now
                let client = managed(&mut self.clients, window)?;
                let current = client.client_rect();
                client.resize_client(&mut self.display, current.width, current.height)?;
            }
            WatchedProperty::MotifHints => {
                let raw = self.display.read_property(window, ClientProperty::MotifHints)?;
                managed(&mut self.clients, window)?.mwm_hints = MwmHints::from_raw(raw.as_deref());
                self.redecorate(window)?;
            }
            WatchedProperty::WmHints => {
                let raw = self.display.read_property(window, ClientProperty::WmHints)?;
                let hints = WmHints::from_raw(raw.as_deref());
                let client = managed(&mut self.clients, window)?;
                client.state.set(ClientState::URGENT, hints.urgent);
                if !client.window_type.is_panel_like() {
                    client.focus_model = FocusModel::from_hints(hints.input, client.protocols);
                }
                client.wm_hints = hints;
                client.repaint(&mut self.display, self.renderer.as_mut(), &self.style)?;
            }
            WatchedProperty::Protocols => {
                let protocols = self.display.read_protocols(window)?;
                let client = managed(&mut self.clients, window)?;
                client.protocols = protocols;
                if !client.window_type.is_panel_like() {
                    client.focus_model = FocusModel::from_hints(client.wm_hints.input, protocols);
                }
            }
            WatchedProperty::Strut => {
                let strut = self.display.read_strut(window)?;
                let client = managed(&mut self.clients, window)?;
                client.strut = strut;
                let screen = client.screen;
                if self.screens[screen].set_strut(StrutSource::Client(window), strut) {
                    self.publish_workarea(screen)?;
                }
            }
        }
        self.display.flush()
    }

    fn redecorate(&mut self, window: Window) -> Result<()> {
        let transient = self.transients.transient_for(window).is_some();
        let client = managed(&mut self.clients, window)?;
        if client.update_decorations(&mut self.display, self.renderer.as_mut(), &self.style, transient)? {
            self.refresh_handles(window)?;
        }
        Ok(())
    }

    fn on_client_message(&mut self, window: Window, request: ClientRequest) -> Result<()> {
        if let ClientRequest::CurrentDesktop(desktop) = request {
            if let Some(screen) = self.screen_of_root(window) {
                self.change_workspace(screen, desktop as usize)?;
            }
            return Ok(());
        }
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        match request {
            ClientRequest::ChangeState(IcccmState::Iconic) => {
                if client.functions.contains(Functions::ICONIFY) {
                    self.iconify_window(window)?;
                }
            }
            ClientRequest::ChangeState(_) | ClientRequest::CurrentDesktop(_) => {}
            ClientRequest::Activate => {
                let (screen, workspace) = (client.screen, client.workspace);
                if client.is_iconic() {
                    self.deiconify_window(window)?;
                } else {
                    if workspace != self.screens[screen].current() && !client.is_stuck() {
                        self.change_workspace(screen, workspace)?;
                    }
                    self.raise_window(window)?;
                    self.focus_window(window, x11rb::CURRENT_TIME)?;
                }
            }
            ClientRequest::Close => self.close_window(window, x11rb::CURRENT_TIME)?,
            ClientRequest::Desktop(ALL_DESKTOPS) => self.set_stuck(window, true)?,
            ClientRequest::Desktop(desktop) => {
                if client.is_stuck() {
                    self.set_stuck(window, false)?;
                }
                self.send_to_workspace(window, desktop as usize)?;
            }
            ClientRequest::State { action, flags } => self.apply_net_state(window, action, flags)?,
        }
        self.display.flush()
    }

    fn apply_net_state(&mut self, window: Window, action: StateAction, flags: NetWmState) -> Result<()> {
        let client = managed(&mut self.clients, window)?;
        if flags.contains(NetWmState::SHADED) {
            let shaded = action.apply(client.is_shaded());
            self.set_shaded(window, shaded)?;
        }
        let client = managed(&mut self.clients, window)?;
        if flags.contains(NetWmState::STICKY) {
            let stuck = action.apply(client.is_stuck());
            self.set_stuck(window, stuck)?;
        }
        let client = managed(&mut self.clients, window)?;
        if flags.intersects(NetWmState::MAXIMIZED_HORZ | NetWmState::MAXIMIZED_VERT) {
            let current = client.maximized;
            let horizontal = if flags.contains(NetWmState::MAXIMIZED_HORZ) {
                action.apply(current.horizontal())
            } else {
                current.horizontal()
            };
            let vertical = if flags.contains(NetWmState::MAXIMIZED_VERT) {
                action.apply(current.vertical())
            } else {
                current.vertical()
            };
            let wanted = MaximizeMode::from_axes(horizontal, vertical);
            if wanted != current {
                if current.is_maximized() {
                    self.maximize_window(window, current)?;
                }
                if wanted.is_maximized() {
                    self.maximize_window(window, wanted)?;
                }
            }
        }
        let client = managed(&mut self.clients, window)?;
        if flags.contains(NetWmState::HIDDEN) {
            let hidden = action.apply(client.is_iconic());
            if hidden && !client.is_iconic() {
                self.iconify_window(window)?;
            } else if !hidden && client.is_iconic() {
                self.deiconify_window(window)?;
            }
        }
        let client = managed(&mut self.clients, window)?;
        if flags.contains(NetWmState::DEMANDS_ATTENTION) {
            let urgent = action.apply(client.state.contains(ClientState::URGENT));
            client.state.set(ClientState::URGENT, urgent);
            client.repaint(&mut self.display, self.renderer.as_mut(), &self.style)?;
            client.publish_state(&mut self.display)?;
        }
        Ok(())
    }

    // --- pointer ---

    fn on_button_press(&mut self, ev: ButtonEvent) -> Result<()> {
        if self.interaction.is_some() {
            return Ok(());
        }
        match self.registry.resolve(ev.window) {
            Some(EventTarget::Client(window)) => {
                self.hide_menus()?;
                self.client_button_press(window, ev)
            }
            Some(EventTarget::Menu(id) | EventTarget::Toolbar(id) | EventTarget::Dock(id)) => {
                let commands = match self.collaborators.get_mut(id.0) {
                    Some(c) => c.button_press(&mut self.display, &ev.pointer())?,
                    None => Vec::new(),
                };
                self.run_commands(commands)
            }
            Some(EventTarget::Screen(screen)) => self.root_button_press(screen, ev),
            None => Ok(()),
        }
    }

    fn client_button_press(&mut self, window: Window, ev: ButtonEvent) -> Result<()> {
        let Some(client) = self.clients.get(&window) else {
            return Ok(());
        };
        let region = client.frame.region_of(ev.window);
        let frame_rect = client.frame_rect();

        if (1..=3).contains(&ev.button) {
            if self.config.focus.raise_on_click || ev.alt {
                self.raise_window(window)?;
            }
            self.focus_window(window, ev.time)?;
        }

        if ev.alt {
            let gesture = match ev.button {
                1 => Gesture::Move,
                3 => Gesture::Resize(Corner::nearest(frame_rect, ev.root_x, ev.root_y)),
                _ => return Ok(()),
            };
            self.start_interaction(window, gesture, (ev.root_x, ev.root_y), ev.time)?;
            return self.display.flush();
        }

        let gesture = match (region, ev.button) {
            (Some(FrameRegion::Title | FrameRegion::Label), 1) => {
                let interval = self.config.behavior.double_click_interval_ms;
                match self.clicks.press(window, 1, ev.time, interval) {
                    Click::Double => {
                        if let Some(id) = self.clicks.take_expiry() {
                            self.timers.cancel(id);
                        }
                        self.toggle_shade(window)?;
                        None
                    }
                    Click::Single => {
                        let id = self.timers.schedule(
                            TimerKind::DoubleClickExpire,
                            Duration::from_millis(interval),
                            Instant::now(),
                        );
                        if let Some(old) = self.clicks.arm(id) {
                            self.timers.cancel(old);
                        }
                        Some(Gesture::Move)
                    }
                }
            }
            (Some(FrameRegion::Title | FrameRegion::Label), 2) => {
                self.lower_window(window)?;
                None
            }
            (Some(FrameRegion::Title | FrameRegion::Label), 3) => {
                self.open_window_menu(window, (ev.root_x, ev.root_y))?;
                None
            }
            (Some(FrameRegion::Title | FrameRegion::Label), 4) => {
                self.set_shaded(window, true)?;
                None
            }
            (Some(FrameRegion::Title | FrameRegion::Label), 5) => {
                self.set_shaded(window, false)?;
                None
            }
            (Some(FrameRegion::Handle), 1) => Some(Gesture::Move),
            (Some(FrameRegion::LeftGrip), 1) => Some(Gesture::Resize(Corner::BottomLeft)),
            (Some(FrameRegion::RightGrip), 1) => Some(Gesture::Resize(Corner::BottomRight)),
            (Some(FrameRegion::Frame), 1) => Some(Gesture::Resize(Corner::nearest(frame_rect, ev.root_x, ev.root_y))),
            // Titlebar buttons act on release
            _ => None,
        };
        if let Some(gesture) = gesture {
            self.start_interaction(window, gesture, (ev.root_x, ev.root_y), ev.time)?;
        }
        self.display.flush()
    }

    fn open_window_menu(&mut self, window: Window, at: (i32, i32)) -> Result<()> {
        let client = managed(&mut self.clients, window)?;
        let screen = client.screen;
        let s = &self.screens[screen];
        let items = menu::window_menu(
            window,
            client.functions,
            client.state,
            client.maximized,
            &s.workspace_names(),
            s.current(),
        );
        self.open_menu(screen, items, at)
    }

    fn root_button_press(&mut self, screen: usize, ev: ButtonEvent) -> Result<()> {
        let at = (ev.root_x, ev.root_y);
        match ev.button {
            1 => self.hide_menus()?,
            2 => {
                let s = &self.screens[screen];
                let items = menu::workspace_menu(screen, &s.workspace_names(), s.current());
                self.open_menu(screen, items, at)?;
            }
            3 => self.open_menu(screen, menu::root_menu(screen), at)?,
            4 => self.run_command(WmCommand::PrevWorkspace(screen))?,
            5 => self.run_command(WmCommand::NextWorkspace(screen))?,
            _ => {}
        }
        self.display.flush()
    }

    fn on_button_release(&mut self, ev: ButtonEvent) -> Result<()> {
        if self.interaction.is_some() {
            return self.finish_interaction(ev.time);
        }
        match self.registry.resolve(ev.window) {
            Some(EventTarget::Client(window)) => {
                let Some(client) = self.clients.get(&window) else {
                    return Ok(());
                };
                let Some(FrameRegion::Button(button)) = client.frame.region_of(ev.window) else {
                    return Ok(());
                };
                let size = self.style.button_size as i32;
                // Released outside the button: cancelled
                if ev.x < 0 || ev.y < 0 || ev.x >= size || ev.y >= size {
                    return Ok(());
                }
                match button {
                    ButtonType::Iconify => self.iconify_window(window)?,
                    ButtonType::Maximize => self.maximize_window(window, MaximizeMode::from_button(ev.button))?,
                    ButtonType::Close => self.close_window(window, ev.time)?,
                }
                self.display.flush()
            }
            Some(EventTarget::Menu(id) | EventTarget::Toolbar(id) | EventTarget::Dock(id)) => {
                let commands = match self.collaborators.get_mut(id.0) {
                    Some(c) => c.button_release(&mut self.display, &ev.pointer())?,
                    None => Vec::new(),
                };
                self.run_commands(commands)
            }
            _ => Ok(()),
        }
    }

    fn run_commands(&mut self, commands: Vec<WmCommand>) -> Result<()> {
        for command in commands {
            self.run_command(command)?;
        }
        self.display.flush()
    }

    fn on_motion(&mut self, ev: ButtonEvent) -> Result<()> {
        if self.interaction.is_some() {
            return self.interaction_motion(ev.root_x, ev.root_y);
        }
        if let Some(EventTarget::Menu(id) | EventTarget::Toolbar(id) | EventTarget::Dock(id)) =
            self.registry.resolve(ev.window)
        {
            if let Some(collaborator) = self.collaborators.get_mut(id.0) {
                collaborator.motion(&mut self.display, &ev.pointer())?;
            }
        }
        Ok(())
    }

    /// Sloppy focus: the window under the pointer takes the focus and,
    /// with auto-raise, is raised after a delay.
    fn on_enter(&mut self, handle: Window, time: Timestamp) -> Result<()> {
        if self.config.focus.policy != FocusPolicy::Sloppy || self.interaction.is_some() {
            return Ok(());
        }
        let Some(EventTarget::Client(window)) = self.registry.resolve(handle) else {
            return Ok(());
        };
        if self.focused == Some(window) || !self.clients.get(&window).is_some_and(Client::is_visible) {
            return Ok(());
        }
        if !self.focus_window(window, time)? {
            return Ok(());
        }
        if self.config.focus.auto_raise {
            self.cancel_auto_raise();
            let delay = Duration::from_millis(self.config.focus.auto_raise_delay_ms);
            self.auto_raise = Some(self.timers.schedule(TimerKind::AutoRaise(window), delay, Instant::now()));
        }
        self.display.flush()
    }

    fn on_expose(&mut self, window: Window, count: u16) -> Result<()> {
        if count > 0 {
            return Ok(());
        }
        match self.registry.resolve(window) {
            Some(EventTarget::Client(client)) => {
                if let Some(client) = self.clients.get_mut(&client) {
                    client.repaint(&mut self.display, self.renderer.as_mut(), &self.style)?;
                }
            }
            Some(EventTarget::Menu(id) | EventTarget::Toolbar(id) | EventTarget::Dock(id)) => {
                if let Some(collaborator) = self.collaborators.get_mut(id.0) {
                    collaborator.expose(&mut self.display, window)?;
                }
            }
            _ => return Ok(()),
        }
        self.display.flush()
    }

    fn on_shape(&mut self, window: Window) -> Result<()> {
        if !self.display.has_shape() {
            return Ok(());
        }
        let Some(client) = self.clients.get_mut(&window) else {
            return Ok(());
        };
        client.state.insert(ClientState::SHAPED);
        self.display
            .shape_frame(client.frame_window(), window, &client.layout.margins())?;
        self.display.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::display::{ClientProtocol, RootProperty, WindowRole};
    use crate::wm::testing::{self, ROOT};
    use x11rb::CURRENT_TIME;

    fn button(window: Window, button: u8, time: Timestamp) -> ButtonEvent {
        ButtonEvent {
            window,
            x: 5,
            y: 5,
            root_x: 150,
            root_y: 110,
            button,
            time,
            alt: false,
        }
    }

    #[test]
    fn test_map_request_manages_then_deiconifies() {
        let mut wm = testing::window_manager();
        wm.display_mut().add_client(0x400, Geometry::new(10, 10, 200, 100));
        wm.handle_event(Event::MapRequest { parent: ROOT, window: 0x400 }).unwrap();
        assert!(wm.client(0x400).unwrap().is_visible());

        wm.iconify_window(0x400).unwrap();
        wm.handle_event(Event::MapRequest { parent: ROOT, window: 0x400 }).unwrap();
        let client = wm.client(0x400).unwrap();
        assert!(client.is_visible());
        assert!(!client.is_iconic());
    }

    #[test]
    fn test_reparenting_unmap_is_ignored() {
        let mut wm = testing::window_manager();
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(10, 10, 200, 100));
        if let Some(attrs) = display.attributes.get_mut(&0x400) {
            attrs.mapped = true;
        }
        wm.manage_window(0, 0x400, true).unwrap();
        assert_eq!(wm.client(0x400).unwrap().ignore_unmaps, 1);

        wm.handle_event(Event::UnmapNotify { window: 0x400, synthetic: false }).unwrap();
        assert!(wm.client(0x400).is_some());
        wm.handle_event(Event::UnmapNotify { window: 0x400, synthetic: false }).unwrap();
        assert!(wm.client(0x400).is_none());
        assert!(wm.registry().client_of(0x400).is_none());
    }

    #[test]
    fn test_destroy_forgets_client() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        let frame = wm.client(0x400).unwrap().frame_window();
        wm.handle_event(Event::DestroyNotify { window: 0x400 }).unwrap();
        assert!(wm.client(0x400).is_none());
        assert!(wm.registry().resolve(frame).is_none());
        assert!(wm.display().client_list().is_empty());
    }

    #[test]
    fn test_destroyed_focus_skips_owner_that_takes_no_input() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x300, Geometry::new(600, 100, 200, 100));
        let display = wm.display_mut();
        display.add_client(0x400, Geometry::new(100, 100, 400, 300));
        // WM_HINTS: InputHint set, input = false
        display.set_property(0x400, ClientProperty::WmHints, vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
        wm.manage_window(0, 0x400, false).unwrap();
        let display = wm.display_mut();
        display.add_client(0x401, Geometry::new(0, 0, 100, 50));
        display.set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        wm.manage_window(0, 0x401, false).unwrap();
        wm.focus_window(0x401, CURRENT_TIME).unwrap();
        assert_eq!(wm.focused(), Some(0x401));

        wm.handle_event(Event::DestroyNotify { window: 0x401 }).unwrap();
        assert_eq!(wm.focused(), Some(0x300));
        assert_eq!(wm.display().focus, Some(0x300));
    }

    #[test]
    fn test_configure_request_passes_through_for_unmanaged() {
        let mut wm = testing::window_manager();
        let changes = WindowChanges::geometry(Geometry::new(1, 2, 3, 4));
        wm.handle_event(Event::ConfigureRequest(ConfigureRequest {
            window: 0x999,
            changes,
            stack: None,
        }))
        .unwrap();
        assert!(wm
            .display()
            .calls
            .contains(&testing::Call::Configure(0x999, changes)));
    }

    #[test]
    fn test_configure_request_moves_frame() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        wm.handle_event(Event::ConfigureRequest(ConfigureRequest {
            window: 0x400,
            changes: WindowChanges::geometry(Geometry::new(50, 60, 300, 150)),
            stack: Some(StackRequest::Below),
        }))
        .unwrap();
        let client = wm.client(0x400).unwrap();
        assert_eq!(client.frame_rect(), Geometry::new(50, 60, 302, 180));
        assert_eq!(client.client_rect(), Geometry::new(51, 82, 300, 150));
    }

    #[test]
    fn test_configure_request_without_change_still_answers() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(10, 10, 200, 100));
        let rect = wm.client(0x400).unwrap().client_rect();
        wm.display_mut().clear_calls();
        wm.handle_event(Event::ConfigureRequest(ConfigureRequest {
            window: 0x400,
            changes: WindowChanges::size(rect.width, rect.height),
            stack: None,
        }))
        .unwrap();
        assert_eq!(wm.display().calls, vec![testing::Call::ConfigureNotify(0x400, rect)]);
    }

    #[test]
    fn test_titlebar_double_click_toggles_shade() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let title = wm.client(0x400).unwrap().frame.title.unwrap();

        wm.handle_event(Event::ButtonPress(button(title, 1, 100))).unwrap();
        assert!(wm.is_interacting());
        wm.handle_event(Event::ButtonRelease(button(title, 1, 120))).unwrap();
        assert!(!wm.is_interacting());
        wm.handle_event(Event::ButtonPress(button(title, 1, 200))).unwrap();
        assert!(wm.client(0x400).unwrap().is_shaded());
        assert!(!wm.is_interacting());

        // Wheel down unshades
        wm.handle_event(Event::ButtonPress(button(title, 5, 900))).unwrap();
        assert!(!wm.client(0x400).unwrap().is_shaded());
    }

    #[test]
    fn test_close_button_acts_on_release_inside() {
        let mut wm = testing::window_manager();
        wm.display_mut()
            .protocols
            .insert(0x400, crate::wm::client_flags::Protocols::DELETE_WINDOW);
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let close = wm
            .client(0x400)
            .unwrap()
            .frame
            .buttons
            .iter()
            .find(|(b, _)| *b == ButtonType::Close)
            .map(|(_, w)| *w)
            .unwrap();

        wm.handle_event(Event::ButtonPress(button(close, 1, 10))).unwrap();
        assert!(wm.display().sent_protocols.is_empty());
        let mut outside = button(close, 1, 20);
        outside.x = -3;
        wm.handle_event(Event::ButtonRelease(outside)).unwrap();
        assert!(wm.display().sent_protocols.is_empty());

        wm.handle_event(Event::ButtonPress(button(close, 1, 30))).unwrap();
        wm.handle_event(Event::ButtonRelease(button(close, 1, 40))).unwrap();
        assert_eq!(wm.display().sent_protocols, vec![(0x400, ClientProtocol::DeleteWindow)]);
    }

    #[test]
    fn test_alt_drag_moves_window() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let frame = wm.client(0x400).unwrap().frame_window();
        let mut press = button(frame, 1, 10);
        press.alt = true;
        wm.handle_event(Event::ButtonPress(press)).unwrap();
        let mut motion = press;
        motion.root_x += 40;
        motion.root_y += 30;
        wm.handle_event(Event::Motion(motion)).unwrap();
        wm.handle_event(Event::ButtonRelease(motion)).unwrap();
        assert_eq!(wm.client(0x400).unwrap().frame_rect().with_size(1, 1), Geometry::new(140, 130, 1, 1));
        assert!(!wm.display().pointer_grabbed);
    }

    #[test]
    fn test_root_buttons_switch_workspace_and_open_menu() {
        let mut wm = testing::window_manager();
        wm.handle_event(Event::ButtonPress(button(ROOT, 5, 10))).unwrap();
        assert_eq!(wm.screens()[0].current(), 1);
        wm.handle_event(Event::ButtonPress(button(ROOT, 4, 20))).unwrap();
        assert_eq!(wm.screens()[0].current(), 0);

        wm.handle_event(Event::ButtonPress(button(ROOT, 3, 30))).unwrap();
        let menu = wm.display().created(WindowRole::Popup)[0];
        assert!(wm.display().mapped.contains(&menu));
        wm.handle_event(Event::ButtonPress(button(ROOT, 1, 40))).unwrap();
        assert!(!wm.display().mapped.contains(&menu));
    }

    #[test]
    fn test_net_wm_state_messages() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let state = |action, flags| Event::ClientMessage {
            window: 0x400,
            request: ClientRequest::State { action, flags },
        };

        wm.handle_event(state(StateAction::Add, NetWmState::SHADED)).unwrap();
        assert!(wm.client(0x400).unwrap().is_shaded());

        wm.handle_event(state(StateAction::Toggle, NetWmState::MAXIMIZED_HORZ | NetWmState::MAXIMIZED_VERT))
            .unwrap();
        let client = wm.client(0x400).unwrap();
        assert_eq!(client.maximized, MaximizeMode::Full);
        assert!(!client.is_shaded());

        wm.handle_event(state(StateAction::Remove, NetWmState::MAXIMIZED_HORZ)).unwrap();
        assert_eq!(wm.client(0x400).unwrap().maximized, MaximizeMode::Vertical);

        wm.handle_event(Event::ClientMessage {
            window: 0x400,
            request: ClientRequest::Desktop(ALL_DESKTOPS),
        })
        .unwrap();
        assert!(wm.client(0x400).unwrap().is_stuck());
        assert_eq!(wm.display().desktops.get(&0x400), Some(&None));
    }

    #[test]
    fn test_current_desktop_message_on_root() {
        let mut wm = testing::window_manager();
        wm.handle_event(Event::ClientMessage {
            window: ROOT,
            request: ClientRequest::CurrentDesktop(2),
        })
        .unwrap();
        assert_eq!(wm.screens()[0].current(), 2);
    }

    #[test]
    fn test_change_state_iconifies() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        wm.handle_event(Event::ClientMessage {
            window: 0x400,
            request: ClientRequest::ChangeState(IcccmState::Iconic),
        })
        .unwrap();
        assert!(wm.client(0x400).unwrap().is_iconic());
        assert_eq!(wm.display().wm_states.get(&0x400), Some(&IcccmState::Iconic));
    }

    #[test]
    fn test_sloppy_enter_focuses_and_auto_raises() {
        let mut wm = testing::window_manager();
        wm.config.focus.policy = FocusPolicy::Sloppy;
        wm.config.focus.auto_raise = true;
        wm.config.focus.focus_new = false;
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        testing::manage(&mut wm, 0x401, Geometry::new(150, 150, 300, 200));
        assert_eq!(wm.focused(), None);

        let frame = wm.client(0x400).unwrap().frame_window();
        wm.handle_event(Event::Enter { window: frame, time: CURRENT_TIME }).unwrap();
        assert_eq!(wm.focused(), Some(0x400));
        assert_eq!(wm.screens()[0].current_workspace().stacking()[0], 0x401);

        wm.fire_timers(Instant::now() + Duration::from_secs(1)).unwrap();
        assert_eq!(wm.screens()[0].current_workspace().stacking()[0], 0x400);
    }

    #[test]
    fn test_property_changes_are_followed() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        wm.display_mut().titles.insert(0x400, "renamed".into());
        wm.handle_event(Event::PropertyNotify {
            window: 0x400,
            property: WatchedProperty::Name,
        })
        .unwrap();
        assert_eq!(wm.client(0x400).unwrap().title, "renamed");

        wm.display_mut()
            .set_property(0x400, ClientProperty::Strut, vec![0, 0, 40, 0]);
        wm.handle_event(Event::PropertyNotify {
            window: 0x400,
            property: WatchedProperty::Strut,
        })
        .unwrap();
        let workarea = wm.display().root_prop(|p| match p {
            RootProperty::Workarea(areas) => areas.first().copied(),
            _ => None,
        });
        assert_eq!(workarea, Some(Geometry::new(0, 40, 1024, 706)));
    }

    #[test]
    fn test_raised_minimum_size_applies_at_once() {
        let mut wm = testing::window_manager();
        testing::manage(&mut wm, 0x400, Geometry::new(100, 100, 300, 200));
        let before = wm.client(0x400).unwrap().frame_rect();
        let mut hints = vec![0; 18];
        // USPosition | PMinSize, minimum 400x250
        hints[0] = 1 | (1 << 4);
        hints[5] = 400;
        hints[6] = 250;
        wm.display_mut().set_property(0x400, ClientProperty::NormalHints, hints);
        wm.handle_event(Event::PropertyNotify {
            window: 0x400,
            property: WatchedProperty::NormalHints,
        })
        .unwrap();

        let client = wm.client(0x400).unwrap();
        let inner = client.client_rect();
        assert_eq!((inner.width, inner.height), (400, 250));
        assert_eq!((client.frame_rect().x, client.frame_rect().y), (before.x, before.y));
    }
}
