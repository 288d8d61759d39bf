//! X11 connection
//!
//! [`XConnection`] is the production [`Display`]: it takes over each
//! screen (WM_S{n} selection plus SubstructureRedirect on the root),
//! interns the atoms, creates cursors and the XOR outline GC, and
//! translates raw x11rb events into the core's [`Event`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ReplyError;
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::protocol::Event as XEvent;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME, NONE};

use crate::shared::Geometry;
use crate::wm::client_flags::{IcccmState, NetWmState, Protocols, WindowType};
use crate::wm::decorations::{FrameRegion, Margins};
use crate::wm::display::{
    ClientProperty, ClientProtocol, Display, PointerState, RootProperty, StackPosition, WindowAttributes,
    WindowChanges, WindowRole,
};
use crate::wm::error::{log_x11_error, WmError};
use crate::wm::events::{
    ButtonEvent, ClientRequest, ConfigureRequest, Event, StackRequest, StateAction, WatchedProperty,
};
use crate::wm::ewmh::Atoms;
use crate::wm::render::Paint;

/// Focus target meaning "whatever window the pointer is in"
const POINTER_ROOT: Window = 1;

/// How long to wait for a replaced window manager to let go
const REPLACE_TIMEOUT: Duration = Duration::from_secs(15);

// X cursor font glyphs
const XC_LEFT_PTR: u16 = 68;
const XC_FLEUR: u16 = 52;
const XC_BOTTOM_LEFT_CORNER: u16 = 12;
const XC_BOTTOM_RIGHT_CORNER: u16 = 14;

#[derive(Debug, Clone, Copy)]
struct Cursors {
    normal: Cursor,
    moving: Cursor,
    bottom_left: Cursor,
    bottom_right: Cursor,
}

impl Cursors {
    fn new(conn: &RustConnection) -> Result<Self> {
        let font = conn.generate_id()?;
        conn.open_font(font, b"cursor")?;
        let create = |glyph: u16| -> Result<Cursor> {
            let cursor = conn.generate_id()?;
            conn.create_glyph_cursor(cursor, font, font, glyph, glyph + 1, 0, 0, 0, 0xffff, 0xffff, 0xffff)?;
            Ok(cursor)
        };
        let cursors = Self {
            normal: create(XC_LEFT_PTR)?,
            moving: create(XC_FLEUR)?,
            bottom_left: create(XC_BOTTOM_LEFT_CORNER)?,
            bottom_right: create(XC_BOTTOM_RIGHT_CORNER)?,
        };
        conn.close_font(font)?;
        Ok(cursors)
    }
}

#[derive(Debug, Clone, Copy)]
struct ScreenInfo {
    root: Window,
    geometry: Geometry,
    outline_gc: Gcontext,
}

/// The window manager's connection to the X server
pub struct XConnection {
    conn: Arc<RustConnection>,
    atoms: Atoms,
    screens: Vec<ScreenInfo>,
    cursors: Cursors,
    shape: bool,
}

impl XConnection {
    /// Connect and take over every screen. With `replace`, an existing
    /// window manager is asked to leave through the WM_S{n} selection.
    pub fn connect(display_name: Option<&str>, replace: bool) -> Result<Self> {
        let (conn, _) = x11rb::connect(display_name).context("Failed to connect to X server")?;
        let conn = Arc::new(conn);
        let atoms = Atoms::new(conn.as_ref()).context("Failed to intern atoms")?;
        let cursors = Cursors::new(&conn)?;
        let shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)?
            .is_some();
        debug!("SHAPE extension: {}", shape);

        let mut this = Self {
            conn,
            atoms,
            screens: Vec::new(),
            cursors,
            shape,
        };
        let count = this.conn.setup().roots.len();
        for index in 0..count {
            let info = this.take_over_screen(index, replace)?;
            this.screens.push(info);
        }
        this.conn.flush()?;
        info!("Managing {} screen(s)", count);
        Ok(this)
    }

    /// Shared handle for the readiness poller.
    pub fn connection(&self) -> Arc<RustConnection> {
        self.conn.clone()
    }

    fn take_over_screen(&self, index: usize, replace: bool) -> Result<ScreenInfo> {
        let conn = self.conn.as_ref();
        let screen = &conn.setup().roots[index];
        let root = screen.root;

        let selection = conn
            .intern_atom(false, format!("WM_S{}", index).as_bytes())?
            .reply()
            .context("Failed to intern WM selection atom")?
            .atom;
        let previous = conn.get_selection_owner(selection)?.reply()?.owner;
        if previous != NONE {
            if !replace {
                return Err(WmError::AnotherWmRunning(index).into());
            }
            info!("Screen {}: replacing window manager 0x{:x}", index, previous);
            conn.change_window_attributes(
                previous,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
            )?;
        }

        // Selection owner, also used for _NET_SUPPORTING_WM_CHECK
        let owner = conn.generate_id()?;
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            owner,
            root,
            -100,
            -100,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1u32),
        )?;
        conn.set_selection_owner(owner, selection, CURRENT_TIME)?;
        if conn.get_selection_owner(selection)?.reply()?.owner != owner {
            return Err(WmError::AnotherWmRunning(index).into());
        }

        if previous != NONE {
            let start = Instant::now();
            loop {
                match conn.get_window_attributes(previous)?.reply() {
                    Err(ReplyError::X11Error(_)) => break,
                    Err(e) => return Err(e.into()),
                    Ok(_) if start.elapsed() >= REPLACE_TIMEOUT => {
                        warn!("Screen {}: previous window manager did not exit, going on", index);
                        break;
                    }
                    Ok(_) => std::thread::sleep(Duration::from_millis(100)),
                }
            }
        }

        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::BUTTON_RELEASE
            | EventMask::LEAVE_WINDOW
            | EventMask::PROPERTY_CHANGE
            | EventMask::FOCUS_CHANGE;
        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(mask).cursor(self.cursors.normal),
        )?
        .check()
        .map_err(|_| WmError::AnotherWmRunning(index))?;

        self.atoms.setup_supported(conn, root)?;
        for window in [root, owner] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[owner],
            )?;
        }
        conn.change_property8(
            PropMode::REPLACE,
            owner,
            self.atoms.net_wm_name,
            self.atoms.utf8_string,
            b"boxwm",
        )?;

        let outline_gc = conn.generate_id()?;
        conn.create_gc(
            outline_gc,
            root,
            &CreateGCAux::new()
                .function(GX::XOR)
                .foreground(screen.white_pixel ^ screen.black_pixel)
                .line_width(2u32)
                .subwindow_mode(SubwindowMode::INCLUDE_INFERIORS),
        )?;

        let geometry = Geometry::new(
            0,
            0,
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );
        info!("Screen {}: root 0x{:x}, {}x{}", index, root, geometry.width, geometry.height);
        Ok(ScreenInfo {
            root,
            geometry,
            outline_gc,
        })
    }

    fn is_root(&self, window: Window) -> bool {
        self.screens.iter().any(|s| s.root == window)
    }

    fn property_atom(&self, property: ClientProperty) -> Atom {
        match property {
            ClientProperty::NormalHints => AtomEnum::WM_NORMAL_HINTS.into(),
            ClientProperty::WmHints => AtomEnum::WM_HINTS.into(),
            ClientProperty::TransientFor => AtomEnum::WM_TRANSIENT_FOR.into(),
            ClientProperty::MotifHints => self.atoms.motif_wm_hints,
            ClientProperty::ManagerHints => self.atoms.boxwm_hints,
            ClientProperty::Attributes => self.atoms.boxwm_attributes,
            ClientProperty::WmState => self.atoms.wm_state,
            ClientProperty::NetWmState => self.atoms.net_wm_state,
            ClientProperty::NetWmDesktop => self.atoms.net_wm_desktop,
            ClientProperty::Strut => self.atoms.net_wm_strut,
            ClientProperty::StrutPartial => self.atoms.net_wm_strut_partial,
        }
    }

    /// 32-bit values of a property, `None` when it is missing or the
    /// window is gone.
    fn read_u32s(&self, window: Window, property: Atom, length: u32) -> Result<Option<Vec<u32>>> {
        let reply = match self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, length)?
            .reply()
        {
            Ok(reply) => reply,
            Err(ReplyError::X11Error(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if reply.type_ == u32::from(AtomEnum::NONE) {
            return Ok(None);
        }
        Ok(reply.value32().map(|values| values.collect()))
    }

    fn read_string(&self, window: Window, property: Atom) -> Result<Option<String>> {
        match self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 256)?
            .reply()
        {
            Ok(reply) if reply.format == 8 && !reply.value.is_empty() => {
                Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
            }
            Ok(_) | Err(ReplyError::X11Error(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Translate a raw event; `None` for events the core does not need.
    pub fn translate(&self, event: XEvent) -> Option<Event> {
        match event {
            XEvent::MapRequest(e) => Some(Event::MapRequest {
                parent: e.parent,
                window: e.window,
            }),
            XEvent::ConfigureRequest(e) => Some(Event::ConfigureRequest(configure_request(&e))),
            XEvent::UnmapNotify(e) => Some(Event::UnmapNotify {
                window: e.window,
                synthetic: e.response_type & 0x80 != 0,
            }),
            XEvent::DestroyNotify(e) => Some(Event::DestroyNotify { window: e.window }),
            XEvent::PropertyNotify(e) => self
                .watched_property(e.atom)
                .map(|property| Event::PropertyNotify {
                    window: e.window,
                    property,
                }),
            XEvent::ClientMessage(e) => self.client_request(&e).map(|request| Event::ClientMessage {
                window: e.window,
                request,
            }),
            XEvent::ButtonPress(e) => Some(Event::ButtonPress(self.button_press(&e))),
            XEvent::ButtonRelease(e) => Some(Event::ButtonRelease(button_event(&e))),
            XEvent::MotionNotify(e) => Some(Event::Motion(ButtonEvent {
                window: e.event,
                x: i32::from(e.event_x),
                y: i32::from(e.event_y),
                root_x: i32::from(e.root_x),
                root_y: i32::from(e.root_y),
                button: 0,
                time: e.time,
                alt: false,
            })),
            XEvent::EnterNotify(e) if e.mode == NotifyMode::NORMAL => Some(Event::Enter {
                window: e.event,
                time: e.time,
            }),
            XEvent::LeaveNotify(e) if e.mode == NotifyMode::UNGRAB && self.is_root(e.event) => Some(Event::GrabLost),
            XEvent::FocusIn(e) if e.mode != NotifyMode::GRAB && e.detail != NotifyDetail::POINTER => {
                Some(Event::FocusIn { window: e.event })
            }
            XEvent::Expose(e) => Some(Event::Expose {
                window: e.window,
                count: e.count,
            }),
            XEvent::ShapeNotify(e) if e.shape_kind == shape::SK::BOUNDING => Some(Event::ShapeNotify {
                window: e.affected_window,
            }),
            XEvent::Error(e) => {
                log_x11_error(&e);
                None
            }
            _ => None,
        }
    }

    /// Presses that activated the click-to-focus grab on a frame are
    /// replayed to the client when they landed in the client area.
    fn button_press(&self, e: &ButtonPressEvent) -> ButtonEvent {
        let mut event = button_event(e);
        if event.alt || self.is_root(e.event) {
            return event;
        }
        let (window, allow) = press_routing(e.event, e.child, |w| self.is_ours(w));
        event.window = window;
        if let Err(err) = self.conn.allow_events(allow, e.time) {
            warn!("AllowEvents failed: {}", err);
        }
        event
    }

    /// Whether `window` was created on this connection
    fn is_ours(&self, window: Window) -> bool {
        let setup = self.conn.setup();
        window & !setup.resource_id_mask == setup.resource_id_base
    }

    fn watched_property(&self, atom: Atom) -> Option<WatchedProperty> {
        let a = &self.atoms;
        if atom == u32::from(AtomEnum::WM_NAME) || atom == a.net_wm_name {
            Some(WatchedProperty::Name)
        } else if atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
            Some(WatchedProperty::NormalHints)
        } else if atom == u32::from(AtomEnum::WM_HINTS) {
            Some(WatchedProperty::WmHints)
        } else if atom == a.wm_protocols {
            Some(WatchedProperty::Protocols)
        } else if atom == a.motif_wm_hints {
            Some(WatchedProperty::MotifHints)
        } else if atom == a.net_wm_strut || atom == a.net_wm_strut_partial {
            Some(WatchedProperty::Strut)
        } else {
            None
        }
    }

    fn client_request(&self, e: &ClientMessageEvent) -> Option<ClientRequest> {
        if e.format != 32 {
            return None;
        }
        let data = e.data.as_data32();
        let a = &self.atoms;
        let request = if e.type_ == a.wm_change_state {
            ClientRequest::ChangeState(IcccmState::from_raw(data[0])?)
        } else if e.type_ == a.net_active_window {
            ClientRequest::Activate
        } else if e.type_ == a.net_close_window {
            ClientRequest::Close
        } else if e.type_ == a.net_current_desktop {
            ClientRequest::CurrentDesktop(data[0])
        } else if e.type_ == a.net_wm_desktop {
            ClientRequest::Desktop(data[0])
        } else if e.type_ == a.net_wm_state {
            let flags = [data[1], data[2]]
                .into_iter()
                .filter_map(|atom| a.net_state_flag(atom))
                .fold(NetWmState::empty(), |acc, flag| acc | flag);
            ClientRequest::State {
                action: StateAction::from_raw(data[0])?,
                flags,
            }
        } else {
            debug!("Ignoring client message type {} for 0x{:x}", e.type_, e.window);
            return None;
        };
        Some(request)
    }

    fn role_attributes(&self, role: WindowRole) -> CreateWindowAux {
        let pointer = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::EXPOSURE;
        match role {
            WindowRole::Decoration(FrameRegion::Frame) => CreateWindowAux::new()
                .override_redirect(1u32)
                .cursor(self.cursors.normal)
                .event_mask(
                    pointer
                        | EventMask::BUTTON_MOTION
                        | EventMask::ENTER_WINDOW
                        | EventMask::SUBSTRUCTURE_REDIRECT
                        | EventMask::SUBSTRUCTURE_NOTIFY,
                ),
            WindowRole::Decoration(region) => {
                let cursor = match region {
                    FrameRegion::LeftGrip => self.cursors.bottom_left,
                    FrameRegion::RightGrip => self.cursors.bottom_right,
                    FrameRegion::Handle => self.cursors.moving,
                    _ => self.cursors.normal,
                };
                CreateWindowAux::new()
                    .cursor(cursor)
                    .event_mask(pointer | EventMask::BUTTON_MOTION | EventMask::ENTER_WINDOW)
            }
            WindowRole::Popup => CreateWindowAux::new()
                .override_redirect(1u32)
                .save_under(1u32)
                .cursor(self.cursors.normal)
                .event_mask(pointer | EventMask::POINTER_MOTION),
            WindowRole::Panel => CreateWindowAux::new()
                .override_redirect(1u32)
                .cursor(self.cursors.normal)
                .event_mask(pointer | EventMask::SUBSTRUCTURE_NOTIFY),
        }
    }
}

fn button_event(e: &ButtonPressEvent) -> ButtonEvent {
    ButtonEvent {
        window: e.event,
        x: i32::from(e.event_x),
        y: i32::from(e.event_y),
        root_x: i32::from(e.root_x),
        root_y: i32::from(e.root_y),
        button: e.detail,
        time: e.time,
        alt: u16::from(e.state) & u16::from(KeyButMask::MOD1) != 0,
    }
}

/// Target and thaw mode for a press under the frame grab. Our decoration
/// windows select presses themselves, so replaying one of those would
/// deliver it twice.
fn press_routing(event: Window, child: Window, ours: impl Fn(Window) -> bool) -> (Window, Allow) {
    match child {
        NONE => (event, Allow::ASYNC_POINTER),
        child if ours(child) => (child, Allow::ASYNC_POINTER),
        client => (client, Allow::REPLAY_POINTER),
    }
}

fn configure_request(e: &ConfigureRequestEvent) -> ConfigureRequest {
    let mask = u16::from(e.value_mask);
    let has = |flag: ConfigWindow| mask & u16::from(flag) != 0;
    let stack = if has(ConfigWindow::STACK_MODE) {
        match e.stack_mode {
            StackMode::ABOVE | StackMode::TOP_IF => Some(StackRequest::Above),
            StackMode::BELOW | StackMode::BOTTOM_IF => Some(StackRequest::Below),
            _ => None,
        }
    } else {
        None
    };
    ConfigureRequest {
        window: e.window,
        changes: WindowChanges {
            x: has(ConfigWindow::X).then_some(i32::from(e.x)),
            y: has(ConfigWindow::Y).then_some(i32::from(e.y)),
            width: has(ConfigWindow::WIDTH).then_some(u32::from(e.width)),
            height: has(ConfigWindow::HEIGHT).then_some(u32::from(e.height)),
            border_width: has(ConfigWindow::BORDER_WIDTH).then_some(u32::from(e.border_width)),
        },
        stack,
    }
}

fn rectangle(g: Geometry) -> Rectangle {
    Rectangle {
        x: g.x as i16,
        y: g.y as i16,
        width: g.width as u16,
        height: g.height as u16,
    }
}

impl Display for XConnection {
    fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn screen_roots(&self) -> Vec<Window> {
        self.screens.iter().map(|s| s.root).collect()
    }

    fn screen_geometry(&self, root: Window) -> Geometry {
        self.screens
            .iter()
            .find(|s| s.root == root)
            .map(|s| s.geometry)
            .unwrap_or_default()
    }

    fn has_shape(&self) -> bool {
        self.shape
    }

    fn create_window(&mut self, parent: Window, geometry: Geometry, role: WindowRole, paint: Paint) -> Result<Window> {
        let window = self.conn.generate_id()?;
        let aux = match paint {
            Paint::Color(pixel) => self.role_attributes(role).background_pixel(pixel),
            Paint::Pixmap(pixmap) => self.role_attributes(role).background_pixmap(pixmap),
        };
        self.conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            parent,
            geometry.x as i16,
            geometry.y as i16,
            geometry.width.max(1) as u16,
            geometry.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &aux,
        )?;
        Ok(window)
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.conn.destroy_window(window)?;
        Ok(())
    }

    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.conn.reparent_window(window, parent, x as i16, y as i16)?;
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn map_subwindows(&mut self, window: Window) -> Result<()> {
        self.conn.map_subwindows(window)?;
        Ok(())
    }

    fn configure_window(&mut self, window: Window, changes: WindowChanges) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        aux.x = changes.x;
        aux.y = changes.y;
        aux.width = changes.width.map(|w| w.max(1));
        aux.height = changes.height.map(|h| h.max(1));
        aux.border_width = changes.border_width;
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn restack(&mut self, windows: &[Window], position: StackPosition) -> Result<()> {
        match position {
            StackPosition::Top => {
                if let Some(first) = windows.first() {
                    self.conn
                        .configure_window(*first, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
                }
                for pair in windows.windows(2) {
                    self.conn.configure_window(
                        pair[1],
                        &ConfigureWindowAux::new().sibling(pair[0]).stack_mode(StackMode::BELOW),
                    )?;
                }
            }
            StackPosition::Bottom => {
                if let Some(last) = windows.last() {
                    self.conn
                        .configure_window(*last, &ConfigureWindowAux::new().stack_mode(StackMode::BELOW))?;
                }
                for pair in windows.windows(2).rev() {
                    self.conn.configure_window(
                        pair[0],
                        &ConfigureWindowAux::new().sibling(pair[1]).stack_mode(StackMode::ABOVE),
                    )?;
                }
            }
        }
        Ok(())
    }

    fn set_background(&mut self, window: Window, paint: Paint) -> Result<()> {
        let aux = match paint {
            Paint::Color(pixel) => ChangeWindowAttributesAux::new().background_pixel(pixel),
            Paint::Pixmap(pixmap) => ChangeWindowAttributesAux::new().background_pixmap(pixmap),
        };
        self.conn.change_window_attributes(window, &aux)?;
        self.conn.clear_area(true, window, 0, 0, 0, 0)?;
        Ok(())
    }

    fn select_client_input(&mut self, window: Window) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE | EventMask::ENTER_WINDOW),
        )?;
        if self.shape {
            self.conn.shape_select_input(window, true)?;
        }
        Ok(())
    }

    fn change_save_set(&mut self, window: Window, insert: bool) -> Result<()> {
        let mode = if insert { SetMode::INSERT } else { SetMode::DELETE };
        self.conn.change_save_set(mode, window)?;
        Ok(())
    }

    fn grab_window_buttons(&mut self, window: Window) -> Result<()> {
        let mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::BUTTON_MOTION;
        // Repeat every grab with CapsLock and NumLock
        let locks = [
            ModMask::from(0u16),
            ModMask::LOCK,
            ModMask::M2,
            ModMask::LOCK | ModMask::M2,
        ];
        for lock in locks {
            self.conn.grab_button(
                true,
                window,
                mask,
                GrabMode::SYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                ButtonIndex::ANY,
                lock,
            )?;
            self.conn.grab_button(
                false,
                window,
                mask,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                NONE,
                ButtonIndex::ANY,
                ModMask::M1 | lock,
            )?;
        }
        Ok(())
    }

    fn shape_frame(&mut self, frame: Window, client: Window, margins: &Margins) -> Result<()> {
        self.conn.shape_combine(
            shape::SO::SET,
            shape::SK::BOUNDING,
            shape::SK::BOUNDING,
            frame,
            margins.left as i16,
            margins.top as i16,
            client,
        )?;
        let size = match self.conn.get_geometry(frame)?.reply() {
            Ok(reply) => reply,
            Err(ReplyError::X11Error(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let (width, height) = (u32::from(size.width), u32::from(size.height));
        // Decorations stay rectangular
        let strips = [
            Geometry::new(0, 0, width, margins.top),
            Geometry::new(0, height.saturating_sub(margins.bottom) as i32, width, margins.bottom),
        ];
        let rects: Vec<Rectangle> = strips.into_iter().filter(|g| g.height > 0).map(rectangle).collect();
        self.conn.shape_rectangles(
            shape::SO::UNION,
            shape::SK::BOUNDING,
            ClipOrdering::UNSORTED,
            frame,
            0,
            0,
            &rects,
        )?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>, time: Timestamp) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window.unwrap_or(POINTER_ROOT), time)?;
        Ok(())
    }

    fn send_protocol(&mut self, window: Window, protocol: ClientProtocol, time: Timestamp) -> Result<()> {
        let atom = match protocol {
            ClientProtocol::DeleteWindow => self.atoms.wm_delete_window,
            ClientProtocol::TakeFocus => self.atoms.wm_take_focus,
        };
        let event = ClientMessageEvent::new(32, window, self.atoms.wm_protocols, [atom, time, 0, 0, 0]);
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: 0,
            override_redirect: false,
        };
        self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn set_wm_state(&mut self, window: Window, state: IcccmState) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state as u32, NONE],
        )?;
        Ok(())
    }

    fn set_net_wm_state(&mut self, window: Window, state: NetWmState) -> Result<()> {
        let atoms = self.atoms.net_state_atoms(state);
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_state,
            AtomEnum::ATOM,
            &atoms,
        )?;
        Ok(())
    }

    fn set_net_wm_desktop(&mut self, window: Window, workspace: Option<u32>) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_desktop,
            AtomEnum::CARDINAL,
            &[workspace.unwrap_or(u32::MAX)],
        )?;
        Ok(())
    }

    fn set_frame_extents(&mut self, window: Window, margins: &Margins) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_frame_extents,
            AtomEnum::CARDINAL,
            &[margins.left, margins.right, margins.top, margins.bottom],
        )?;
        Ok(())
    }

    fn set_root_property(&mut self, root: Window, property: RootProperty) -> Result<()> {
        let a = &self.atoms;
        let (atom, kind, values): (Atom, Atom, Vec<u32>) = match property {
            RootProperty::ClientList(list) => (a.net_client_list, AtomEnum::WINDOW.into(), list),
            RootProperty::ClientListStacking(list) => (a.net_client_list_stacking, AtomEnum::WINDOW.into(), list),
            RootProperty::ActiveWindow(active) => {
                (a.net_active_window, AtomEnum::WINDOW.into(), vec![active.unwrap_or(NONE)])
            }
            RootProperty::CurrentDesktop(index) => (a.net_current_desktop, AtomEnum::CARDINAL.into(), vec![index]),
            RootProperty::NumberOfDesktops(count) => {
                (a.net_number_of_desktops, AtomEnum::CARDINAL.into(), vec![count])
            }
            RootProperty::Workarea(areas) => {
                let values = areas
                    .iter()
                    .flat_map(|g| [g.x as u32, g.y as u32, g.width, g.height])
                    .collect();
                (a.net_workarea, AtomEnum::CARDINAL.into(), values)
            }
            RootProperty::DesktopNames(names) => {
                let mut data = Vec::new();
                for name in names {
                    data.extend_from_slice(name.as_bytes());
                    data.push(0);
                }
                self.conn
                    .change_property8(PropMode::REPLACE, root, a.net_desktop_names, a.utf8_string, &data)?;
                return Ok(());
            }
        };
        self.conn.change_property32(PropMode::REPLACE, root, atom, kind, &values)?;
        Ok(())
    }

    fn write_attributes(&mut self, window: Window, record: &[u32]) -> Result<()> {
        let atom = self.atoms.boxwm_attributes;
        self.conn.change_property32(PropMode::REPLACE, window, atom, atom, record)?;
        Ok(())
    }

    fn delete_property(&mut self, window: Window, property: ClientProperty) -> Result<()> {
        let atom = self.property_atom(property);
        self.conn.delete_property(window, atom)?;
        Ok(())
    }

    fn read_property(&mut self, window: Window, property: ClientProperty) -> Result<Option<Vec<u32>>> {
        self.read_u32s(window, self.property_atom(property), 64)
    }

    fn read_protocols(&mut self, window: Window) -> Result<Protocols> {
        let atoms = self
            .read_u32s(window, self.atoms.wm_protocols, 32)?
            .unwrap_or_default();
        let mut protocols = Protocols::empty();
        for atom in atoms {
            if atom == self.atoms.wm_delete_window {
                protocols.insert(Protocols::DELETE_WINDOW);
            } else if atom == self.atoms.wm_take_focus {
                protocols.insert(Protocols::TAKE_FOCUS);
            }
        }
        Ok(protocols)
    }

    fn read_title(&mut self, window: Window) -> Result<String> {
        if let Some(title) = self.read_string(window, self.atoms.net_wm_name)? {
            return Ok(title);
        }
        Ok(self
            .read_string(window, AtomEnum::WM_NAME.into())?
            .unwrap_or_default())
    }

    fn read_window_type(&mut self, window: Window) -> Result<WindowType> {
        let types = self
            .read_u32s(window, self.atoms.net_wm_window_type, 16)?
            .unwrap_or_default();
        Ok(self.atoms.window_type(&types))
    }

    fn window_attributes(&mut self, window: Window) -> Result<Option<WindowAttributes>> {
        let attrs = self.conn.get_window_attributes(window)?;
        let geometry = self.conn.get_geometry(window)?;
        let (attrs, geometry) = match (attrs.reply(), geometry.reply()) {
            (Ok(attrs), Ok(geometry)) => (attrs, geometry),
            (Err(ReplyError::X11Error(_)), _) | (_, Err(ReplyError::X11Error(_))) => return Ok(None),
            (Err(e), _) | (_, Err(e)) => return Err(e.into()),
        };
        Ok(Some(WindowAttributes {
            geometry: Geometry::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                u32::from(geometry.width),
                u32::from(geometry.height),
            ),
            border_width: u32::from(geometry.border_width),
            override_redirect: attrs.override_redirect,
            mapped: attrs.map_state != MapState::UNMAPPED,
        }))
    }

    fn query_tree(&mut self, window: Window) -> Result<Vec<Window>> {
        Ok(self.conn.query_tree(window)?.reply()?.children)
    }

    fn query_pointer(&mut self, root: Window) -> Result<PointerState> {
        let reply = self.conn.query_pointer(root)?.reply()?;
        Ok(PointerState {
            root_x: i32::from(reply.root_x),
            root_y: i32::from(reply.root_y),
        })
    }

    fn grab_pointer(&mut self, window: Window, time: Timestamp) -> Result<bool> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                NONE,
                self.cursors.moving,
                time,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self, time: Timestamp) -> Result<()> {
        self.conn.ungrab_pointer(time)?;
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.conn.ungrab_server()?;
        Ok(())
    }

    fn draw_outline(&mut self, root: Window, geometry: Geometry) -> Result<()> {
        let Some(screen) = self.screens.iter().find(|s| s.root == root) else {
            return Ok(());
        };
        let outline = Geometry::new(
            geometry.x,
            geometry.y,
            geometry.width.saturating_sub(1),
            geometry.height.saturating_sub(1),
        );
        self.conn
            .poly_rectangle(root, screen.outline_gc, &[rectangle(outline)])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush().map_err(WmError::ConnectionLost)?;
        Ok(())
    }
}
