//! Panels
//!
//! The toolbar (workspace switching strip with a clock tick) and the dock,
//! which swallows withdrawn "dockapp" clients and stacks them along a
//! screen edge. Both reserve their strip through a strut.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::config::{PanelConfig, PanelPlacement};
use crate::shared::{Geometry, Strut};
use crate::wm::display::{Display, StackPosition, WindowChanges, WindowRole};
use crate::wm::menu::{Collaborator, CollaboratorKind, PointerEvent, WmCommand};
use crate::wm::render::Paint;

pub const TOOLBAR_HEIGHT: u32 = 22;
/// Gap around and between dock clients
pub const DOCK_PADDING: u32 = 2;

fn stack_position(on_top: bool) -> StackPosition {
    if on_top {
        StackPosition::Top
    } else {
        StackPosition::Bottom
    }
}

/// Workspace strip along the top or bottom edge. Left and right
/// placements fall back to top and bottom.
#[derive(Debug)]
pub struct Toolbar {
    screen: usize,
    window: Window,
    geometry: Geometry,
    top: bool,
    on_top: bool,
    background: u32,
    ticks: u64,
}

impl Toolbar {
    pub fn create(
        display: &mut dyn Display,
        screen: usize,
        root: Window,
        screen_geometry: Geometry,
        config: &PanelConfig,
        background: u32,
    ) -> Result<Self> {
        let top = matches!(config.placement, PanelPlacement::Top | PanelPlacement::Left);
        let y = if top {
            screen_geometry.y
        } else {
            screen_geometry.bottom() - TOOLBAR_HEIGHT as i32
        };
        let geometry = Geometry::new(screen_geometry.x, y, screen_geometry.width, TOOLBAR_HEIGHT);
        let window = display.create_window(root, geometry, WindowRole::Panel, Paint::Color(background))?;
        display.map_window(window)?;
        display.restack(&[window], stack_position(config.on_top))?;
        debug!("Toolbar 0x{:x} at {:?}", window, geometry);
        Ok(Self {
            screen,
            window,
            geometry,
            top,
            on_top: config.on_top,
            background,
            ticks: 0,
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Collaborator for Toolbar {
    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Toolbar
    }

    fn screen(&self) -> usize {
        self.screen
    }

    fn handles(&self) -> Vec<Window> {
        vec![self.window]
    }

    fn strut(&self) -> Option<Strut> {
        Some(if self.top {
            Strut::new(0, 0, TOOLBAR_HEIGHT, 0)
        } else {
            Strut::new(0, 0, 0, TOOLBAR_HEIGHT)
        })
    }

    /// Left third goes to the previous workspace, right third to the next;
    /// the wheel does the same anywhere on the strip.
    fn button_press(&mut self, _display: &mut dyn Display, event: &PointerEvent) -> Result<Vec<WmCommand>> {
        let third = (self.geometry.width / 3) as i32;
        let command = match event.button {
            1 if event.x < third => Some(WmCommand::PrevWorkspace(self.screen)),
            1 if event.x >= 2 * third => Some(WmCommand::NextWorkspace(self.screen)),
            4 => Some(WmCommand::PrevWorkspace(self.screen)),
            5 => Some(WmCommand::NextWorkspace(self.screen)),
            _ => None,
        };
        Ok(command.into_iter().collect())
    }

    fn expose(&mut self, display: &mut dyn Display, _window: Window) -> Result<()> {
        display.set_background(self.window, Paint::Color(self.background))
    }

    fn clock_tick(&mut self, display: &mut dyn Display) -> Result<()> {
        self.ticks += 1;
        display.set_background(self.window, Paint::Color(self.background))
    }

    fn is_visible(&self) -> bool {
        true
    }

    fn on_top(&self) -> bool {
        self.on_top
    }

    fn destroy(&mut self, display: &mut dyn Display) -> Result<()> {
        display.destroy_window(self.window)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DockClient {
    window: Window,
    width: u32,
    height: u32,
}

/// Container for dockapps along one screen edge
#[derive(Debug)]
pub struct Dock {
    screen: usize,
    root: Window,
    window: Window,
    screen_geometry: Geometry,
    placement: PanelPlacement,
    on_top: bool,
    clients: Vec<DockClient>,
    geometry: Geometry,
    mapped: bool,
}

impl Dock {
    pub fn create(
        display: &mut dyn Display,
        screen: usize,
        root: Window,
        screen_geometry: Geometry,
        config: &PanelConfig,
        background: u32,
    ) -> Result<Self> {
        let geometry = Geometry::new(screen_geometry.x, screen_geometry.y, 1, 1);
        let window = display.create_window(root, geometry, WindowRole::Panel, Paint::Color(background))?;
        Ok(Self {
            screen,
            root,
            window,
            screen_geometry,
            placement: config.placement,
            on_top: config.on_top,
            clients: Vec::new(),
            geometry,
            mapped: false,
        })
    }

    fn vertical(&self) -> bool {
        matches!(self.placement, PanelPlacement::Left | PanelPlacement::Right)
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn clients(&self) -> Vec<Window> {
        self.clients.iter().map(|c| c.window).collect()
    }

    /// Client positions inside the dock and the dock rectangle.
    fn layout(&self) -> (Vec<(i32, i32)>, Geometry) {
        let pad = DOCK_PADDING;
        let mut positions = Vec::with_capacity(self.clients.len());
        let mut along = pad;
        let mut across = 0;
        for client in &self.clients {
            if self.vertical() {
                positions.push((pad as i32, along as i32));
                along += client.height + pad;
                across = across.max(client.width);
            } else {
                positions.push((along as i32, pad as i32));
                along += client.width + pad;
                across = across.max(client.height);
            }
        }
        let thickness = across + 2 * pad;
        let s = self.screen_geometry;
        let geometry = match self.placement {
            PanelPlacement::Left => Geometry::new(s.x, s.y + (s.height as i32 - along as i32) / 2, thickness, along),
            PanelPlacement::Right => Geometry::new(
                s.right() - thickness as i32,
                s.y + (s.height as i32 - along as i32) / 2,
                thickness,
                along,
            ),
            PanelPlacement::Top => Geometry::new(s.x + (s.width as i32 - along as i32) / 2, s.y, along, thickness),
            PanelPlacement::Bottom => Geometry::new(
                s.x + (s.width as i32 - along as i32) / 2,
                s.bottom() - thickness as i32,
                along,
                thickness,
            ),
        };
        (positions, geometry)
    }

    fn relayout(&mut self, display: &mut dyn Display) -> Result<()> {
        if self.clients.is_empty() {
            if self.mapped {
                display.unmap_window(self.window)?;
                self.mapped = false;
            }
            return Ok(());
        }
        let (positions, geometry) = self.layout();
        for (client, (x, y)) in self.clients.iter().zip(positions) {
            display.configure_window(client.window, WindowChanges::position(x, y))?;
        }
        self.geometry = geometry;
        display.configure_window(self.window, WindowChanges::geometry(geometry))?;
        if !self.mapped {
            display.map_window(self.window)?;
            display.restack(&[self.window], stack_position(self.on_top))?;
            self.mapped = true;
        }
        Ok(())
    }
}

impl Collaborator for Dock {
    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Dock
    }

    fn screen(&self) -> usize {
        self.screen
    }

    fn handles(&self) -> Vec<Window> {
        vec![self.window]
    }

    fn strut(&self) -> Option<Strut> {
        if self.clients.is_empty() {
            return None;
        }
        let g = self.geometry;
        Some(match self.placement {
            PanelPlacement::Left => Strut::new(g.width, 0, 0, 0),
            PanelPlacement::Right => Strut::new(0, g.width, 0, 0),
            PanelPlacement::Top => Strut::new(0, 0, g.height, 0),
            PanelPlacement::Bottom => Strut::new(0, 0, 0, g.height),
        })
    }

    fn absorb(&mut self, display: &mut dyn Display, client: Window) -> Result<bool> {
        if self.owns_client(client) {
            return Ok(true);
        }
        let Some(attrs) = display.window_attributes(client)? else {
            return Ok(false);
        };
        self.clients.push(DockClient {
            window: client,
            width: attrs.geometry.width.max(1),
            height: attrs.geometry.height.max(1),
        });
        display.change_save_set(client, true)?;
        display.reparent_window(client, self.window, 0, 0)?;
        display.map_window(client)?;
        self.relayout(display)?;
        debug!("Dock absorbed 0x{:x}", client);
        Ok(true)
    }

    fn release(&mut self, display: &mut dyn Display, client: Window, reparent: bool) -> Result<bool> {
        let (positions, _) = self.layout();
        let Some(index) = self.clients.iter().position(|c| c.window == client) else {
            return Ok(false);
        };
        self.clients.remove(index);
        if reparent {
            let (x, y) = positions[index];
            display.reparent_window(client, self.root, self.geometry.x + x, self.geometry.y + y)?;
            display.change_save_set(client, false)?;
        }
        self.relayout(display)?;
        Ok(true)
    }

    fn owns_client(&self, client: Window) -> bool {
        self.clients.iter().any(|c| c.window == client)
    }

    fn is_visible(&self) -> bool {
        self.mapped
    }

    fn on_top(&self) -> bool {
        self.on_top
    }

    fn destroy(&mut self, display: &mut dyn Display) -> Result<()> {
        for client in self.clients() {
            self.release(display, client, true)?;
        }
        display.destroy_window(self.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::FakeDisplay;

    fn screen() -> Geometry {
        Geometry::new(0, 0, 1024, 768)
    }

    #[test]
    fn test_toolbar_reserves_its_edge_and_switches() {
        let mut display = FakeDisplay::new();
        let root = display.root();
        let config = PanelConfig::default();
        let mut toolbar = Toolbar::create(&mut display, 0, root, screen(), &config, 0).unwrap();
        assert_eq!(toolbar.geometry(), Geometry::new(0, 746, 1024, 22));
        assert_eq!(toolbar.strut(), Some(Strut::new(0, 0, 0, 22)));

        let event = |x: i32, button: u8| PointerEvent {
            window: 0,
            x,
            y: 5,
            root_x: x,
            root_y: 751,
            button,
            time: 0,
        };
        assert_eq!(
            toolbar.button_press(&mut display, &event(10, 1)).unwrap(),
            vec![WmCommand::PrevWorkspace(0)]
        );
        assert_eq!(
            toolbar.button_press(&mut display, &event(1000, 1)).unwrap(),
            vec![WmCommand::NextWorkspace(0)]
        );
        assert!(toolbar.button_press(&mut display, &event(500, 1)).unwrap().is_empty());
        toolbar.clock_tick(&mut display).unwrap();
        assert_eq!(toolbar.ticks(), 1);
    }

    #[test]
    fn test_dock_stacks_clients_and_grows_strut() {
        let mut display = FakeDisplay::new();
        let root = display.root();
        let config = PanelConfig {
            placement: PanelPlacement::Right,
            on_top: true,
        };
        let mut dock = Dock::create(&mut display, 0, root, screen(), &config, 0).unwrap();
        assert_eq!(dock.strut(), None);

        display.add_client(0x500, Geometry::new(0, 0, 64, 64));
        display.add_client(0x600, Geometry::new(0, 0, 48, 56));
        assert!(dock.absorb(&mut display, 0x500).unwrap());
        assert!(dock.absorb(&mut display, 0x600).unwrap());

        // 2 + 64 + 2 + 56 + 2 tall, 64 + 4 wide
        assert_eq!(dock.geometry(), Geometry::new(1024 - 68, (768 - 126) / 2, 68, 126));
        assert_eq!(dock.strut(), Some(Strut::new(0, 68, 0, 0)));
        assert!(dock.is_visible());

        assert!(dock.release(&mut display, 0x500, true).unwrap());
        assert_eq!(dock.clients(), vec![0x600]);
        assert!(!dock.release(&mut display, 0x500, true).unwrap());
        assert!(dock.release(&mut display, 0x600, false).unwrap());
        assert!(!dock.is_visible());
        assert_eq!(dock.strut(), None);
    }
}
