//! Display Module
//!
//! The protocol surface the window manager core talks to. Every request the
//! core issues and every property it reads goes through [`Display`]; the X11
//! implementation lives in `xconn`, tests use a recording fake.

use anyhow::Result;
use x11rb::protocol::xproto::{Timestamp, Window};

use crate::shared::{Geometry, Strut};
use crate::wm::client_flags::{IcccmState, NetWmState, Protocols, WindowType};
use crate::wm::decorations::{FrameRegion, Margins};
use crate::wm::ewmh::Atoms;
use crate::wm::render::Paint;

/// A partial ConfigureWindow request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
}

impl WindowChanges {
    pub fn position(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            x: Some(geometry.x),
            y: Some(geometry.y),
            width: Some(geometry.width),
            height: Some(geometry.height),
            border_width: None,
        }
    }
}

/// What a window created by the window manager is for; decides its event
/// mask, cursor and override-redirect flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    Decoration(FrameRegion),
    /// Menus: override-redirect, pointer events
    Popup,
    /// Toolbar and dock strips
    Panel,
}

/// Where a restacked block ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPosition {
    /// Above every other window on the screen
    Top,
    /// Below every other window on the screen
    Bottom,
}

/// WM_PROTOCOLS messages we send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProtocol {
    DeleteWindow,
    TakeFocus,
}

/// Raw CARDINAL/WINDOW properties read off client windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProperty {
    NormalHints,
    WmHints,
    MotifHints,
    ManagerHints,
    Attributes,
    TransientFor,
    WmState,
    NetWmState,
    NetWmDesktop,
    Strut,
    StrutPartial,
}

/// Properties published on the root window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootProperty {
    ClientList(Vec<Window>),
    ClientListStacking(Vec<Window>),
    ActiveWindow(Option<Window>),
    CurrentDesktop(u32),
    NumberOfDesktops(u32),
    DesktopNames(Vec<String>),
    Workarea(Vec<Geometry>),
}

/// Attributes of an existing window, as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub border_width: u32,
    pub override_redirect: bool,
    pub mapped: bool,
}

/// Pointer position relative to the root window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerState {
    pub root_x: i32,
    pub root_y: i32,
}

/// Synchronous protocol surface used by the window manager core.
///
/// Methods take `&mut self` so a recording implementation needs no
/// interior mutability; the production connection is only ever used from
/// one thread anyway.
pub trait Display {
    fn atoms(&self) -> &Atoms;

    /// Root window of every screen, in screen order.
    fn screen_roots(&self) -> Vec<Window>;

    /// Size of the screen whose root is `root`.
    fn screen_geometry(&self, root: Window) -> Geometry;

    fn has_shape(&self) -> bool;

    // --- window tree ---

    /// Create a window of ours, unmapped.
    fn create_window(&mut self, parent: Window, geometry: Geometry, role: WindowRole, paint: Paint) -> Result<Window>;
    fn destroy_window(&mut self, window: Window) -> Result<()>;
    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()>;
    fn map_window(&mut self, window: Window) -> Result<()>;
    fn unmap_window(&mut self, window: Window) -> Result<()>;
    fn map_subwindows(&mut self, window: Window) -> Result<()>;
    fn configure_window(&mut self, window: Window, changes: WindowChanges) -> Result<()>;
    /// Stack `windows` (top-first) as one contiguous block.
    fn restack(&mut self, windows: &[Window], position: StackPosition) -> Result<()>;
    fn set_background(&mut self, window: Window, paint: Paint) -> Result<()>;

    // --- client setup ---

    /// Select the events we need on a managed client window.
    fn select_client_input(&mut self, window: Window) -> Result<()>;
    fn change_save_set(&mut self, window: Window, insert: bool) -> Result<()>;
    /// Passive Alt+button grabs for move/resize anywhere on a frame.
    fn grab_window_buttons(&mut self, window: Window) -> Result<()>;
    /// Copy the client's bounding shape onto its frame.
    fn shape_frame(&mut self, frame: Window, client: Window, margins: &Margins) -> Result<()>;

    // --- focus and protocols ---

    /// `None` reverts focus to the root window.
    fn set_input_focus(&mut self, window: Option<Window>, time: Timestamp) -> Result<()>;
    fn send_protocol(&mut self, window: Window, protocol: ClientProtocol, time: Timestamp) -> Result<()>;
    /// Tell the client where it is, in root coordinates.
    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()>;

    // --- properties ---

    fn set_wm_state(&mut self, window: Window, state: IcccmState) -> Result<()>;
    fn set_net_wm_state(&mut self, window: Window, state: NetWmState) -> Result<()>;
    /// `None` marks the window as present on every workspace.
    fn set_net_wm_desktop(&mut self, window: Window, workspace: Option<u32>) -> Result<()>;
    fn set_frame_extents(&mut self, window: Window, margins: &Margins) -> Result<()>;
    fn set_root_property(&mut self, root: Window, property: RootProperty) -> Result<()>;
    /// Write the persisted _BOXWM_ATTRIBUTES record.
    fn write_attributes(&mut self, window: Window, record: &[u32]) -> Result<()>;
    fn delete_property(&mut self, window: Window, property: ClientProperty) -> Result<()>;

    fn read_property(&mut self, window: Window, property: ClientProperty) -> Result<Option<Vec<u32>>>;
    fn read_protocols(&mut self, window: Window) -> Result<Protocols>;
    fn read_title(&mut self, window: Window) -> Result<String>;
    fn read_window_type(&mut self, window: Window) -> Result<WindowType>;
    fn read_strut(&mut self, window: Window) -> Result<Option<Strut>> {
        if let Some(values) = self.read_property(window, ClientProperty::StrutPartial)? {
            return Ok(Strut::from_raw(&values));
        }
        Ok(self
            .read_property(window, ClientProperty::Strut)?
            .and_then(|values| Strut::from_raw(&values)))
    }

    /// `None` when the window no longer exists.
    fn window_attributes(&mut self, window: Window) -> Result<Option<WindowAttributes>>;
    /// Children of `window`, bottom-most first.
    fn query_tree(&mut self, window: Window) -> Result<Vec<Window>>;
    fn query_pointer(&mut self, root: Window) -> Result<PointerState>;

    // --- grabs and feedback ---

    fn grab_pointer(&mut self, window: Window, time: Timestamp) -> Result<bool>;
    fn ungrab_pointer(&mut self, time: Timestamp) -> Result<()>;
    fn grab_server(&mut self) -> Result<()>;
    fn ungrab_server(&mut self) -> Result<()>;
    /// XOR a rectangle outline onto the root window; drawing it twice erases it.
    fn draw_outline(&mut self, root: Window, geometry: Geometry) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}
