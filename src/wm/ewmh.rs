//! ICCCM / EWMH atoms
//!
//! Interns every atom the window manager reads or publishes, and maps the
//! EWMH state and window-type atoms onto our own flag types.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt as _, PropMode, Window};
use x11rb::wrapper::ConnectionExt as _;

use crate::wm::client_flags::{NetWmState, WindowType};

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    // ICCCM
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub utf8_string: Atom,
    // Motif and our own hints
    pub motif_wm_hints: Atom,
    pub boxwm_hints: Atom,
    pub boxwm_attributes: Atom,
    // EWMH root properties
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_number_of_desktops: Atom,
    pub net_desktop_names: Atom,
    pub net_current_desktop: Atom,
    pub net_active_window: Atom,
    pub net_workarea: Atom,
    pub net_close_window: Atom,
    // EWMH client properties
    pub net_wm_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_frame_extents: Atom,
    pub net_wm_strut: Atom,
    pub net_wm_strut_partial: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_modal: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_demands_attention: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_desktop: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_window_type_utility: Atom,
    pub net_wm_window_type_toolbar: Atom,
    pub net_wm_window_type_menu: Atom,
    pub net_wm_window_type_splash: Atom,
}

/// _NET_WM_STATE client message actions
pub const NET_WM_STATE_REMOVE: u32 = 0;
pub const NET_WM_STATE_ADD: u32 = 1;
pub const NET_WM_STATE_TOGGLE: u32 = 2;

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        // Send every request before waiting for the first reply
        let names = Self::NAMES;
        let cookies = names
            .iter()
            .map(|name| conn.intern_atom(false, name.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut atoms = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            atoms.push(cookie.reply()?.atom);
        }
        Ok(Self::from_slice(&atoms))
    }

    const NAMES: [&'static str; 41] = [
        "WM_PROTOCOLS",
        "WM_DELETE_WINDOW",
        "WM_TAKE_FOCUS",
        "WM_STATE",
        "WM_CHANGE_STATE",
        "UTF8_STRING",
        "_MOTIF_WM_HINTS",
        "_BOXWM_HINTS",
        "_BOXWM_ATTRIBUTES",
        "_NET_SUPPORTED",
        "_NET_SUPPORTING_WM_CHECK",
        "_NET_CLIENT_LIST",
        "_NET_CLIENT_LIST_STACKING",
        "_NET_NUMBER_OF_DESKTOPS",
        "_NET_DESKTOP_NAMES",
        "_NET_CURRENT_DESKTOP",
        "_NET_ACTIVE_WINDOW",
        "_NET_WORKAREA",
        "_NET_CLOSE_WINDOW",
        "_NET_WM_NAME",
        "_NET_WM_DESKTOP",
        "_NET_FRAME_EXTENTS",
        "_NET_WM_STRUT",
        "_NET_WM_STRUT_PARTIAL",
        "_NET_WM_STATE",
        "_NET_WM_STATE_MODAL",
        "_NET_WM_STATE_STICKY",
        "_NET_WM_STATE_MAXIMIZED_VERT",
        "_NET_WM_STATE_MAXIMIZED_HORZ",
        "_NET_WM_STATE_SHADED",
        "_NET_WM_STATE_HIDDEN",
        "_NET_WM_STATE_DEMANDS_ATTENTION",
        "_NET_WM_WINDOW_TYPE",
        "_NET_WM_WINDOW_TYPE_DESKTOP",
        "_NET_WM_WINDOW_TYPE_DOCK",
        "_NET_WM_WINDOW_TYPE_NORMAL",
        "_NET_WM_WINDOW_TYPE_DIALOG",
        "_NET_WM_WINDOW_TYPE_UTILITY",
        "_NET_WM_WINDOW_TYPE_TOOLBAR",
        "_NET_WM_WINDOW_TYPE_MENU",
        "_NET_WM_WINDOW_TYPE_SPLASH",
    ];

    fn from_slice(a: &[Atom]) -> Self {
        Self {
            wm_protocols: a[0],
            wm_delete_window: a[1],
            wm_take_focus: a[2],
            wm_state: a[3],
            wm_change_state: a[4],
            utf8_string: a[5],
            motif_wm_hints: a[6],
            boxwm_hints: a[7],
            boxwm_attributes: a[8],
            net_supported: a[9],
            net_supporting_wm_check: a[10],
            net_client_list: a[11],
            net_client_list_stacking: a[12],
            net_number_of_desktops: a[13],
            net_desktop_names: a[14],
            net_current_desktop: a[15],
            net_active_window: a[16],
            net_workarea: a[17],
            net_close_window: a[18],
            net_wm_name: a[19],
            net_wm_desktop: a[20],
            net_frame_extents: a[21],
            net_wm_strut: a[22],
            net_wm_strut_partial: a[23],
            net_wm_state: a[24],
            net_wm_state_modal: a[25],
            net_wm_state_sticky: a[26],
            net_wm_state_maximized_vert: a[27],
            net_wm_state_maximized_horz: a[28],
            net_wm_state_shaded: a[29],
            net_wm_state_hidden: a[30],
            net_wm_state_demands_attention: a[31],
            net_wm_window_type: a[32],
            net_wm_window_type_desktop: a[33],
            net_wm_window_type_dock: a[34],
            net_wm_window_type_normal: a[35],
            net_wm_window_type_dialog: a[36],
            net_wm_window_type_utility: a[37],
            net_wm_window_type_toolbar: a[38],
            net_wm_window_type_menu: a[39],
            net_wm_window_type_splash: a[40],
        }
    }

    /// Distinct fake atom values for tests that never talk to a server.
    #[cfg(test)]
    pub fn fake() -> Self {
        let values: Vec<Atom> = (0..Self::NAMES.len() as Atom).map(|i| 1000 + i).collect();
        Self::from_slice(&values)
    }

    fn state_table(&self) -> [(Atom, NetWmState); 7] {
        [
            (self.net_wm_state_modal, NetWmState::MODAL),
            (self.net_wm_state_sticky, NetWmState::STICKY),
            (self.net_wm_state_maximized_vert, NetWmState::MAXIMIZED_VERT),
            (self.net_wm_state_maximized_horz, NetWmState::MAXIMIZED_HORZ),
            (self.net_wm_state_shaded, NetWmState::SHADED),
            (self.net_wm_state_hidden, NetWmState::HIDDEN),
            (self.net_wm_state_demands_attention, NetWmState::DEMANDS_ATTENTION),
        ]
    }

    /// Map a _NET_WM_STATE member atom to our flag, if we support it.
    pub fn net_state_flag(&self, atom: Atom) -> Option<NetWmState> {
        self.state_table()
            .into_iter()
            .find(|(a, _)| *a == atom)
            .map(|(_, flag)| flag)
    }

    pub fn net_state_atoms(&self, state: NetWmState) -> Vec<Atom> {
        self.state_table()
            .into_iter()
            .filter(|(_, flag)| state.contains(*flag))
            .map(|(atom, _)| atom)
            .collect()
    }

    /// First recognised type wins, as EWMH lists types in preference order.
    pub fn window_type(&self, types: &[Atom]) -> WindowType {
        for &atom in types {
            let kind = if atom == self.net_wm_window_type_desktop {
                WindowType::Desktop
            } else if atom == self.net_wm_window_type_dock {
                WindowType::Dock
            } else if atom == self.net_wm_window_type_dialog {
                WindowType::Dialog
            } else if atom == self.net_wm_window_type_splash {
                WindowType::Splash
            } else if atom == self.net_wm_window_type_utility
                || atom == self.net_wm_window_type_toolbar
                || atom == self.net_wm_window_type_menu
            {
                WindowType::Utility
            } else if atom == self.net_wm_window_type_normal {
                WindowType::Normal
            } else {
                continue;
            };
            return kind;
        }
        WindowType::Normal
    }

    /// Set up _NET_SUPPORTED on root window
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window) -> Result<()> {
        let supported = [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_desktop_names,
            self.net_current_desktop,
            self.net_active_window,
            self.net_workarea,
            self.net_close_window,
            self.net_wm_name,
            self.net_wm_desktop,
            self.net_frame_extents,
            self.net_wm_strut,
            self.net_wm_strut_partial,
            self.net_wm_state,
            self.net_wm_state_modal,
            self.net_wm_state_sticky,
            self.net_wm_state_maximized_vert,
            self.net_wm_state_maximized_horz,
            self.net_wm_state_shaded,
            self.net_wm_state_hidden,
            self.net_wm_state_demands_attention,
            self.net_wm_window_type,
            self.net_wm_window_type_desktop,
            self.net_wm_window_type_dock,
            self.net_wm_window_type_normal,
            self.net_wm_window_type_dialog,
            self.net_wm_window_type_utility,
            self.net_wm_window_type_splash,
        ];

        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_supported,
            AtomEnum::ATOM,
            &supported,
        )?;

        Ok(())
    }
}
