//! Focus Module
//!
//! ICCCM input models and the focus hand-over itself. Which window should
//! get the focus (modal redirection, fallback order) is decided by the
//! window manager; this module only knows how to give it.

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::protocol::xproto::{Timestamp, Window};

use crate::wm::client_flags::{ClientState, Protocols};
use crate::wm::display::{ClientProtocol, Display};

/// ICCCM input model, from the WM_HINTS input field and WM_TAKE_FOCUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusModel {
    /// Never takes keyboard input
    NoInput,
    /// We set the focus, the client never asks
    Passive,
    /// We set the focus and tell the client with WM_TAKE_FOCUS
    LocallyActive,
    /// The client sets the focus itself when told with WM_TAKE_FOCUS
    GloballyActive,
}

impl FocusModel {
    pub fn from_hints(input: bool, protocols: Protocols) -> Self {
        match (input, protocols.contains(Protocols::TAKE_FOCUS)) {
            (false, false) => Self::NoInput,
            (true, false) => Self::Passive,
            (true, true) => Self::LocallyActive,
            (false, true) => Self::GloballyActive,
        }
    }
}

/// Hand the input focus to a managed window.
///
/// Returns whether the focus was (or already is) with the window. Hidden
/// windows and windows that take no input refuse; a shaded window gets the
/// focus on its frame so keystrokes don't reach the invisible client.
pub fn transfer(
    display: &mut dyn Display,
    client: Window,
    frame: Window,
    model: FocusModel,
    state: ClientState,
    time: Timestamp,
) -> Result<bool> {
    if state.contains(ClientState::FOCUSED) {
        return Ok(true);
    }
    if !state.contains(ClientState::VISIBLE) {
        return Ok(false);
    }
    if state.contains(ClientState::SHADED) {
        display.set_input_focus(Some(frame), time)?;
        return Ok(true);
    }
    match model {
        FocusModel::NoInput => {
            debug!("Window 0x{:x} takes no input", client);
            Ok(false)
        }
        FocusModel::Passive => {
            display.set_input_focus(Some(client), time)?;
            Ok(true)
        }
        FocusModel::LocallyActive => {
            display.set_input_focus(Some(client), time)?;
            display.send_protocol(client, ClientProtocol::TakeFocus, time)?;
            Ok(true)
        }
        FocusModel::GloballyActive => {
            display.send_protocol(client, ClientProtocol::TakeFocus, time)?;
            Ok(true)
        }
    }
}

/// Try candidates in order until one accepts the focus. A failing candidate
/// is logged and skipped. Returns the window that accepted, if any.
pub fn focus_first(
    candidates: impl IntoIterator<Item = Window>,
    mut try_focus: impl FnMut(Window) -> Result<bool>,
) -> Option<Window> {
    for window in candidates {
        match try_focus(window) {
            Ok(true) => return Some(window),
            Ok(false) => {}
            Err(e) => warn!("Focusing 0x{:x} failed: {:#}", window, e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::FakeDisplay;

    #[test]
    fn test_models_from_hints() {
        assert_eq!(FocusModel::from_hints(true, Protocols::empty()), FocusModel::Passive);
        assert_eq!(FocusModel::from_hints(true, Protocols::TAKE_FOCUS), FocusModel::LocallyActive);
        assert_eq!(FocusModel::from_hints(false, Protocols::TAKE_FOCUS), FocusModel::GloballyActive);
        assert_eq!(FocusModel::from_hints(false, Protocols::DELETE_WINDOW), FocusModel::NoInput);
    }

    #[test]
    fn test_transfer_per_model() {
        let mut display = FakeDisplay::new();
        let visible = ClientState::VISIBLE;

        assert!(transfer(&mut display, 10, 11, FocusModel::Passive, visible, 0).unwrap());
        assert_eq!(display.focus, Some(10));
        assert!(display.sent_protocols.is_empty());

        assert!(transfer(&mut display, 20, 21, FocusModel::GloballyActive, visible, 0).unwrap());
        assert_eq!(display.focus, Some(10));
        assert_eq!(display.sent_protocols, vec![(20, ClientProtocol::TakeFocus)]);

        assert!(!transfer(&mut display, 30, 31, FocusModel::NoInput, visible, 0).unwrap());
        assert!(!transfer(&mut display, 30, 31, FocusModel::Passive, ClientState::empty(), 0).unwrap());

        assert!(transfer(&mut display, 40, 41, FocusModel::Passive, visible | ClientState::SHADED, 0).unwrap());
        assert_eq!(display.focus, Some(41));
    }

    #[test]
    fn test_already_focused_is_a_no_op() {
        let mut display = FakeDisplay::new();
        let state = ClientState::VISIBLE | ClientState::FOCUSED;
        assert!(transfer(&mut display, 10, 11, FocusModel::Passive, state, 0).unwrap());
        assert_eq!(display.focus, None);
    }

    #[test]
    fn test_fallback_skips_refusals_and_errors() {
        let chosen = focus_first([1, 2, 3], |w| match w {
            1 => Ok(false),
            2 => Err(anyhow::anyhow!("BadWindow")),
            _ => Ok(true),
        });
        assert_eq!(chosen, Some(3));
        assert_eq!(focus_first(Vec::new(), |_| Ok(true)), None);
    }
}
