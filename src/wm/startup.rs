//! Startup scan
//!
//! Windows that already exist when we take over a screen are adopted
//! before the event loop starts: mapped top-level windows, plus unmapped
//! ones a previous window manager left in the Iconic state.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::wm::client_flags::IcccmState;
use crate::wm::display::{ClientProperty, Display};
use crate::wm::error::{severity, Severity};
use crate::wm::WindowManager;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    window: Window,
    /// Unmapped but WM_STATE says Iconic
    left_iconic: bool,
    transient: bool,
}

impl<D: Display> WindowManager<D> {
    /// Adopt the existing windows of every screen. Returns how many were
    /// taken over.
    pub fn adopt_existing(&mut self) -> Result<usize> {
        let mut adopted = 0;
        for screen in 0..self.screens.len() {
            adopted += self.scan_screen(screen)?;
        }
        self.publish_client_lists()?;
        self.display.flush()?;
        info!("Adopted {} existing windows", adopted);
        Ok(adopted)
    }

    fn scan_screen(&mut self, screen: usize) -> Result<usize> {
        let root = self.screens[screen].root;
        let mut candidates = Vec::new();
        for window in self.display.query_tree(root)? {
            if self.registry.resolve(window).is_some() {
                continue;
            }
            let Some(attrs) = self.display.window_attributes(window)? else {
                continue;
            };
            if attrs.override_redirect {
                continue;
            }
            let wm_state = self
                .display
                .read_property(window, ClientProperty::WmState)?
                .and_then(|values| values.first().copied())
                .and_then(IcccmState::from_raw);
            let left_iconic = !attrs.mapped && wm_state == Some(IcccmState::Iconic);
            if !attrs.mapped && !left_iconic {
                continue;
            }
            let transient = self
                .display
                .read_property(window, ClientProperty::TransientFor)?
                .is_some();
            candidates.push(Candidate {
                window,
                left_iconic,
                transient,
            });
        }
        // Owners before their transients; the sort is stable
        candidates.sort_by_key(|c| c.transient);

        let mut adopted = 0;
        for candidate in candidates {
            let window = candidate.window;
            if let Err(e) = self.manage_window(screen, window, true) {
                if severity(&e) == Severity::Fatal {
                    return Err(e);
                }
                warn!("Could not adopt 0x{:x}: {:#}", window, e);
                continue;
            }
            let Some(client) = self.clients.get(&window) else {
                // Absorbed by the dock
                continue;
            };
            if candidate.left_iconic && !client.is_iconic() {
                self.iconify_window(window)?;
            }
            debug!("Adopted 0x{:x}", window);
            adopted += 1;
        }
        Ok(adopted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::testing;

    fn mapped(wm: &mut WindowManager<testing::FakeDisplay>, window: Window, geometry: Geometry) {
        let display = wm.display_mut();
        display.add_client(window, geometry);
        if let Some(attrs) = display.attributes.get_mut(&window) {
            attrs.mapped = true;
        }
    }

    #[test]
    fn test_adopted_window_keeps_its_place() {
        let mut wm = testing::window_manager();
        mapped(&mut wm, 0x400, Geometry::new(300, 200, 100, 50));
        assert_eq!(wm.adopt_existing().unwrap(), 1);
        let client = wm.client(0x400).unwrap();
        assert_eq!(client.frame_rect(), Geometry::new(300, 200, 102, 80));
        assert!(client.is_visible());
        // Adoption never steals the focus
        assert_eq!(wm.focused(), None);
        assert_eq!(wm.display().client_list(), vec![0x400]);
    }

    #[test]
    fn test_scan_skips_unmapped_and_override_redirect() {
        let mut wm = testing::window_manager();
        wm.display_mut().add_client(0x400, Geometry::new(0, 0, 100, 50));
        mapped(&mut wm, 0x401, Geometry::new(0, 0, 100, 50));
        if let Some(attrs) = wm.display_mut().attributes.get_mut(&0x401) {
            attrs.override_redirect = true;
        }
        assert_eq!(wm.adopt_existing().unwrap(), 0);
        assert!(wm.client(0x400).is_none());
        assert!(wm.client(0x401).is_none());
    }

    #[test]
    fn test_iconic_leftover_is_adopted_as_icon() {
        let mut wm = testing::window_manager();
        wm.display_mut().add_client(0x400, Geometry::new(0, 0, 100, 50));
        wm.display_mut()
            .set_property(0x400, ClientProperty::WmState, vec![IcccmState::Iconic as u32, 0]);
        assert_eq!(wm.adopt_existing().unwrap(), 1);
        assert!(wm.client(0x400).unwrap().is_iconic());
        assert_eq!(wm.screens()[0].icons(), &[0x400]);
    }

    #[test]
    fn test_transient_listed_first_still_finds_owner() {
        let mut wm = testing::window_manager();
        mapped(&mut wm, 0x401, Geometry::new(10, 10, 100, 50));
        wm.display_mut()
            .set_property(0x401, ClientProperty::TransientFor, vec![0x400]);
        mapped(&mut wm, 0x400, Geometry::new(200, 200, 300, 200));
        assert_eq!(wm.adopt_existing().unwrap(), 2);
        assert_eq!(wm.transients.transient_for(0x401), Some(0x400));
        assert_eq!(wm.display().client_list(), vec![0x400, 0x401]);
    }
}
