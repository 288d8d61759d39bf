//! Client Flags
//!
//! Bitfield flags for client state and decoration capabilities.

use bitflags::bitflags;

bitflags! {
    /// Decoration capabilities of a frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Decorations: u32 {
        const TITLEBAR = 1 << 0;
        const HANDLE   = 1 << 1;
        const BORDER   = 1 << 2;
        const ICONIFY  = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE    = 1 << 5;
        const MENU     = 1 << 6;
    }
}

impl Default for Decorations {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// Operations the user may apply to a window
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Functions: u32 {
        const RESIZE   = 1 << 0;
        const MOVE     = 1 << 1;
        const ICONIFY  = 1 << 2;
        const MAXIMIZE = 1 << 3;
        const CLOSE    = 1 << 4;
        const SHADE    = 1 << 5;
    }
}

impl Default for Functions {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// Independent state flags of a managed window
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientState: u32 {
        const FOCUSED = 1 << 0;
        const VISIBLE = 1 << 1;
        const ICONIC  = 1 << 2;
        const SHADED  = 1 << 3;
        const STUCK   = 1 << 4;
        const MODAL   = 1 << 5;
        const URGENT  = 1 << 6;
        const SHAPED  = 1 << 7;
    }
}

bitflags! {
    /// WM_PROTOCOLS the client participates in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Protocols: u32 {
        const DELETE_WINDOW = 1 << 0;
        const TAKE_FOCUS    = 1 << 1;
    }
}

bitflags! {
    /// _NET_WM_STATE members this window manager publishes and honours
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NetWmState: u32 {
        const MODAL          = 1 << 0;
        const STICKY         = 1 << 1;
        const MAXIMIZED_VERT = 1 << 2;
        const MAXIMIZED_HORZ = 1 << 3;
        const SHADED         = 1 << 4;
        const HIDDEN         = 1 << 5;
        const DEMANDS_ATTENTION = 1 << 6;
    }
}

/// Which axes a window is maximized along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaximizeMode {
    #[default]
    None,
    Horizontal,
    Vertical,
    Full,
}

impl MaximizeMode {
    /// Button 1 maximizes fully, button 2 vertically, button 3 horizontally.
    pub fn from_button(button: u8) -> Self {
        match button {
            2 => Self::Vertical,
            3 => Self::Horizontal,
            _ => Self::Full,
        }
    }

    pub fn from_axes(horizontal: bool, vertical: bool) -> Self {
        match (horizontal, vertical) {
            (true, true) => Self::Full,
            (true, false) => Self::Horizontal,
            (false, true) => Self::Vertical,
            (false, false) => Self::None,
        }
    }

    pub fn horizontal(self) -> bool {
        matches!(self, Self::Horizontal | Self::Full)
    }

    pub fn vertical(self) -> bool {
        matches!(self, Self::Vertical | Self::Full)
    }

    pub fn is_maximized(self) -> bool {
        self != Self::None
    }
}

/// ICCCM WM_STATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcccmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

impl IcccmState {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Withdrawn),
            1 => Some(Self::Normal),
            3 => Some(Self::Iconic),
            _ => None,
        }
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE), reduced to what changes behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    #[default]
    Normal,
    Dialog,
    Dock,
    Desktop,
    Splash,
    Utility,
}

impl WindowType {
    /// Windows of this type never get a frame or the input focus.
    pub fn is_panel_like(self) -> bool {
        matches!(self, Self::Dock | Self::Desktop)
    }
}
