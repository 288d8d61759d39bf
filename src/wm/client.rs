//! Client Module
//!
//! One managed top-level window: the application's window, the frame we
//! wrapped it in, the hints it was managed with and its state flags.
//!
//! `configure` is the only way the frame geometry changes, and frame and
//! client rectangles are always derived from each other through the
//! `FrameLayout`, never stored independently.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::{Timestamp, Window};

use crate::shared::{Geometry, Strut};
use crate::wm::client_flags::{
    ClientState, Functions, IcccmState, MaximizeMode, NetWmState, Protocols, WindowType,
};
use crate::wm::decorations::{FrameLayout, FrameStyle, FrameWindows};
use crate::wm::display::{ClientProperty, ClientProtocol, Display, WindowAttributes, WindowChanges};
use crate::wm::focus::{self, FocusModel};
use crate::wm::hints::{
    gravitate, resolve_decorations, ManagerHints, MwmHints, SizeHints, WmHints, BOX_ATTR_MAX_HORZ,
    BOX_ATTR_MAX_VERT, BOX_ATTR_OMNIPRESENT, BOX_ATTR_SHADED,
};
use crate::wm::render::Renderer;
use crate::wm::session::AttributeRecord;

/// Everything read off a client window before it is managed
#[derive(Debug, Clone, Default)]
pub struct ClientHints {
    pub size: SizeHints,
    pub wm: WmHints,
    pub mwm: Option<MwmHints>,
    pub manager: Option<ManagerHints>,
    pub protocols: Protocols,
    pub title: String,
    pub window_type: WindowType,
    /// Raw WM_TRANSIENT_FOR; may name the root window or nothing at all
    pub transient_for: Option<Window>,
    pub net_state: NetWmState,
    pub attributes: Option<AttributeRecord>,
    pub strut: Option<Strut>,
}

impl ClientHints {
    pub fn read(display: &mut dyn Display, window: Window) -> Result<Self> {
        let size = SizeHints::from_raw(display.read_property(window, ClientProperty::NormalHints)?.as_deref());
        let wm = WmHints::from_raw(display.read_property(window, ClientProperty::WmHints)?.as_deref());
        let mwm = MwmHints::from_raw(display.read_property(window, ClientProperty::MotifHints)?.as_deref());
        let manager = ManagerHints::from_raw(display.read_property(window, ClientProperty::ManagerHints)?.as_deref());
        let transient_for = display
            .read_property(window, ClientProperty::TransientFor)?
            .and_then(|values| values.first().copied());
        let attributes = display
            .read_property(window, ClientProperty::Attributes)?
            .and_then(|values| AttributeRecord::decode(&values));
        let state_atoms = display.read_property(window, ClientProperty::NetWmState)?.unwrap_or_default();
        let net_state = state_atoms
            .iter()
            .filter_map(|atom| display.atoms().net_state_flag(*atom))
            .fold(NetWmState::empty(), |acc, flag| acc | flag);

        Ok(Self {
            size,
            wm,
            mwm,
            manager,
            protocols: display.read_protocols(window)?,
            title: display.read_title(window)?,
            window_type: display.read_window_type(window)?,
            transient_for,
            net_state,
            attributes,
            strut: display.read_strut(window)?,
        })
    }
}

/// A managed client window
#[derive(Debug)]
pub struct Client {
    pub window: Window,
    pub screen: usize,
    /// Workspace index; kept while iconic and while stuck
    pub workspace: usize,
    pub frame: FrameWindows,
    pub layout: FrameLayout,
    pub title: String,
    /// Unshaded frame rectangle in root coordinates
    frame_rect: Geometry,
    /// Frame rectangle before maximizing
    pub premax: Option<Geometry>,
    pub size_hints: SizeHints,
    pub wm_hints: WmHints,
    pub mwm_hints: Option<MwmHints>,
    pub manager_hints: Option<ManagerHints>,
    pub protocols: Protocols,
    pub focus_model: FocusModel,
    pub functions: Functions,
    pub window_type: WindowType,
    pub group: Option<Window>,
    pub state: ClientState,
    pub maximized: MaximizeMode,
    pub icccm_state: IcccmState,
    /// Unmap notifications we caused ourselves and must not treat as a
    /// withdrawal
    pub ignore_unmaps: u32,
    pub strut: Option<Strut>,
    old_border_width: u32,
}

impl Client {
    /// Build the frame around `window` and reparent it. Nothing is mapped;
    /// the caller registers the handles, places the frame and shows it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        style: &FrameStyle,
        root: Window,
        window: Window,
        screen: usize,
        workspace: usize,
        attrs: &WindowAttributes,
        hints: ClientHints,
        transient: bool,
    ) -> Result<Self> {
        let (decorations, functions) = resolve_decorations(
            hints.mwm.as_ref(),
            hints.manager.as_ref(),
            &hints.size,
            transient,
            hints.window_type,
        );
        let layout = FrameLayout::new(decorations, style);

        let (width, height) = hints.size.constrain(attrs.geometry.width, attrs.geometry.height);
        let requested = attrs.geometry.with_size(width, height);
        let (x, y) = gravitate(requested, hints.size.gravity, &layout.margins());
        let frame_rect = layout.upsize(requested).with_position(x, y);

        let frame = FrameWindows::create(display, renderer, root, &layout, style, frame_rect)?;

        display.configure_window(
            window,
            WindowChanges {
                width: Some(width),
                height: Some(height),
                border_width: Some(0),
                ..WindowChanges::default()
            },
        )?;
        display.change_save_set(window, true)?;
        display.select_client_input(window)?;
        let (ox, oy) = layout.client_offset();
        display.reparent_window(window, frame.frame, ox, oy)?;
        display.grab_window_buttons(frame.frame)?;
        display.set_frame_extents(window, &layout.margins())?;

        let focus_model = if hints.window_type.is_panel_like() {
            FocusModel::NoInput
        } else {
            FocusModel::from_hints(hints.wm.input, hints.protocols)
        };
        let mut state = ClientState::empty();
        if hints.net_state.contains(NetWmState::MODAL) {
            state.insert(ClientState::MODAL);
        }
        if hints.wm.urgent {
            state.insert(ClientState::URGENT);
        }
        if hints.window_type.is_panel_like() {
            state.insert(ClientState::STUCK);
        }

        info!("Managing 0x{:x} '{}' in frame 0x{:x}", window, hints.title, frame.frame);
        Ok(Self {
            window,
            screen,
            workspace,
            frame,
            layout,
            title: hints.title,
            frame_rect,
            premax: None,
            size_hints: hints.size,
            group: hints.wm.window_group,
            wm_hints: hints.wm,
            mwm_hints: hints.mwm,
            manager_hints: hints.manager,
            protocols: hints.protocols,
            focus_model,
            functions,
            window_type: hints.window_type,
            state,
            maximized: MaximizeMode::None,
            icccm_state: IcccmState::Withdrawn,
            // Reparenting a mapped window unmaps it once
            ignore_unmaps: u32::from(attrs.mapped),
            strut: hints.strut,
            old_border_width: attrs.border_width,
        })
    }

    pub fn frame_window(&self) -> Window {
        self.frame.frame
    }

    /// Unshaded frame rectangle.
    pub fn frame_rect(&self) -> Geometry {
        self.frame_rect
    }

    /// Frame rectangle as it is on screen (titlebar only while shaded).
    pub fn visible_frame_rect(&self) -> Geometry {
        if self.is_shaded() {
            let height = self.layout.shaded_height();
            self.frame_rect.with_size(self.frame_rect.width, height)
        } else {
            self.frame_rect
        }
    }

    pub fn client_rect(&self) -> Geometry {
        self.layout.downsize(self.frame_rect)
    }

    pub fn is_visible(&self) -> bool {
        self.state.contains(ClientState::VISIBLE)
    }

    pub fn is_iconic(&self) -> bool {
        self.state.contains(ClientState::ICONIC)
    }

    pub fn is_shaded(&self) -> bool {
        self.state.contains(ClientState::SHADED)
    }

    pub fn is_stuck(&self) -> bool {
        self.state.contains(ClientState::STUCK)
    }

    pub fn is_modal(&self) -> bool {
        self.state.contains(ClientState::MODAL)
    }

    pub fn is_focused(&self) -> bool {
        self.state.contains(ClientState::FOCUSED)
    }

    /// Keep at least one pixel of the frame at non-negative coordinates on
    /// each axis.
    fn clamp_frame(rect: Geometry) -> Geometry {
        let width = rect.width.max(1);
        let height = rect.height.max(1);
        Geometry::new(rect.x.max(1 - width as i32), rect.y.max(1 - height as i32), width, height)
    }

    /// Move and/or resize the frame. A resize repositions the decoration
    /// windows and resizes the client; a plain move only moves the frame.
    /// Either way the client gets a synthetic ConfigureNotify with its root
    /// position.
    pub fn configure(&mut self, display: &mut dyn Display, rect: Geometry) -> Result<()> {
        let rect = Self::clamp_frame(rect);
        let resized = rect.width != self.frame_rect.width || rect.height != self.frame_rect.height;
        let moved = rect.x != self.frame_rect.x || rect.y != self.frame_rect.y;
        if !resized && !moved {
            return Ok(());
        }
        self.frame_rect = rect;

        if resized {
            display.configure_window(self.frame.frame, WindowChanges::geometry(self.visible_frame_rect()))?;
            self.frame.reconfigure(display, &self.layout, rect.width, rect.height)?;
            let client = self.client_rect();
            display.configure_window(self.window, WindowChanges::size(client.width, client.height))?;
            if self.state.contains(ClientState::SHAPED) {
                display.shape_frame(self.frame.frame, self.window, &self.layout.margins())?;
            }
        } else {
            display.configure_window(self.frame.frame, WindowChanges::position(rect.x, rect.y))?;
        }
        display.send_configure_notify(self.window, self.client_rect())
    }

    /// Resize for a new client size, keeping the frame's top-left corner.
    pub fn resize_client(&mut self, display: &mut dyn Display, width: u32, height: u32) -> Result<()> {
        let (width, height) = self.size_hints.constrain(width, height);
        let client = self.client_rect().with_size(width, height);
        let frame = self.layout.upsize(client).with_position(self.frame_rect.x, self.frame_rect.y);
        self.configure(display, frame)
    }

    /// Map the frame (the client inside stays mapped).
    pub fn show(&mut self, display: &mut dyn Display) -> Result<()> {
        display.map_window(self.frame.frame)?;
        self.state.insert(ClientState::VISIBLE);
        Ok(())
    }

    /// Unmap the frame, e.g. when its workspace stops being current.
    pub fn hide(&mut self, display: &mut dyn Display) -> Result<()> {
        display.unmap_window(self.frame.frame)?;
        self.state.remove(ClientState::VISIBLE | ClientState::FOCUSED);
        Ok(())
    }

    /// First mapping after manage.
    pub fn set_normal(&mut self, display: &mut dyn Display) -> Result<()> {
        display.map_window(self.window)?;
        self.icccm_state = IcccmState::Normal;
        display.set_wm_state(self.window, IcccmState::Normal)?;
        self.publish_state(display)
    }

    /// Returns false when the window already was iconic.
    pub fn iconify(&mut self, display: &mut dyn Display) -> Result<bool> {
        if self.is_iconic() {
            return Ok(false);
        }
        self.state.insert(ClientState::ICONIC);
        self.state.remove(ClientState::VISIBLE | ClientState::FOCUSED);
        display.unmap_window(self.frame.frame)?;
        self.ignore_unmaps += 1;
        display.unmap_window(self.window)?;
        self.icccm_state = IcccmState::Iconic;
        display.set_wm_state(self.window, IcccmState::Iconic)?;
        self.publish_state(display)?;
        debug!("Iconified 0x{:x}", self.window);
        Ok(true)
    }

    /// Enter the iconic state straight from manage, for a client that was
    /// never mapped.
    pub fn start_iconic(&mut self, display: &mut dyn Display) -> Result<()> {
        self.state.insert(ClientState::ICONIC);
        self.icccm_state = IcccmState::Iconic;
        display.set_wm_state(self.window, IcccmState::Iconic)?;
        self.publish_state(display)
    }

    /// Leave the iconic state; `show` maps the frame as well.
    pub fn deiconify(&mut self, display: &mut dyn Display, show: bool) -> Result<bool> {
        if !self.is_iconic() {
            return Ok(false);
        }
        self.state.remove(ClientState::ICONIC);
        display.map_window(self.window)?;
        self.icccm_state = IcccmState::Normal;
        display.set_wm_state(self.window, IcccmState::Normal)?;
        if show {
            self.show(display)?;
        }
        self.publish_state(display)?;
        Ok(true)
    }

    /// Take the window off the screen without forgetting it.
    pub fn withdraw(&mut self, display: &mut dyn Display) -> Result<()> {
        self.state.remove(ClientState::VISIBLE | ClientState::FOCUSED);
        display.unmap_window(self.frame.frame)?;
        self.ignore_unmaps += 1;
        display.unmap_window(self.window)?;
        self.icccm_state = IcccmState::Withdrawn;
        display.set_wm_state(self.window, IcccmState::Withdrawn)
    }

    /// Ask the client to close. Returns whether a request went out; the
    /// window is only forgotten once the server reports it gone.
    pub fn close(&self, display: &mut dyn Display, time: Timestamp) -> Result<bool> {
        if !self.functions.contains(Functions::CLOSE) {
            return Ok(false);
        }
        if !self.protocols.contains(Protocols::DELETE_WINDOW) {
            warn!("0x{:x} does not support WM_DELETE_WINDOW, ignoring close", self.window);
            return Ok(false);
        }
        display.send_protocol(self.window, ClientProtocol::DeleteWindow, time)?;
        Ok(true)
    }

    /// Returns whether the state changed. Windows without a titlebar
    /// cannot be shaded.
    pub fn set_shaded(&mut self, display: &mut dyn Display, shaded: bool) -> Result<bool> {
        if shaded == self.is_shaded() || (shaded && !self.layout.has_titlebar()) {
            return Ok(false);
        }
        self.state.set(ClientState::SHADED, shaded);
        let visible = self.visible_frame_rect();
        display.configure_window(self.frame.frame, WindowChanges::size(visible.width, visible.height))?;
        self.publish_state(display)?;
        Ok(true)
    }

    pub fn set_stuck(&mut self, display: &mut dyn Display, stuck: bool) -> Result<bool> {
        if stuck == self.is_stuck() {
            return Ok(false);
        }
        self.state.set(ClientState::STUCK, stuck);
        self.publish_desktop(display)?;
        self.publish_state(display)?;
        Ok(true)
    }

    pub fn publish_desktop(&self, display: &mut dyn Display) -> Result<()> {
        let desktop = (!self.is_stuck()).then_some(self.workspace as u32);
        display.set_net_wm_desktop(self.window, desktop)
    }

    /// Frame rectangle for maximizing along `mode` inside `area`: the client
    /// fills what the decorations leave, snapped to its size grid, and the
    /// frame is centered on the maximized axes.
    pub fn maximized_rect(&self, mode: MaximizeMode, area: Geometry) -> Geometry {
        let available = self.layout.downsize(area);
        let client = self.client_rect();
        let width = if mode.horizontal() { available.width } else { client.width };
        let height = if mode.vertical() { available.height } else { client.height };
        let (width, height) = self.size_hints.constrain(width, height);
        let frame = self.layout.upsize(Geometry::new(0, 0, width, height));

        let mut rect = self.frame_rect;
        if mode.horizontal() {
            rect.width = frame.width;
            rect.x = area.x + (area.width as i32 - frame.width as i32) / 2;
        }
        if mode.vertical() {
            rect.height = frame.height;
            rect.y = area.y + (area.height as i32 - frame.height as i32) / 2;
        }
        rect
    }

    /// Maximize along `mode`, or restore when already maximized in any mode.
    pub fn maximize(&mut self, display: &mut dyn Display, mode: MaximizeMode, area: Geometry) -> Result<()> {
        if self.maximized.is_maximized() {
            self.maximized = MaximizeMode::None;
            if let Some(premax) = self.premax.take() {
                self.configure(display, premax)?;
            }
            return self.publish_state(display);
        }
        if !mode.is_maximized() {
            return Ok(());
        }
        if self.is_shaded() {
            self.set_shaded(display, false)?;
        }
        self.premax = Some(self.frame_rect);
        let target = self.maximized_rect(mode, area);
        self.maximized = mode;
        self.configure(display, target)?;
        self.publish_state(display)
    }

    /// Give this window the input focus according to its input model.
    pub fn set_input_focus(&self, display: &mut dyn Display, time: Timestamp) -> Result<bool> {
        focus::transfer(display, self.window, self.frame.frame, self.focus_model, self.state, time)
    }

    /// Track a FocusIn/FocusOut and repaint the frame to match.
    pub fn set_focused(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        style: &FrameStyle,
        focused: bool,
    ) -> Result<()> {
        if focused == self.is_focused() {
            return Ok(());
        }
        self.state.set(ClientState::FOCUSED, focused);
        self.repaint(display, renderer, style)
    }

    pub fn repaint(&mut self, display: &mut dyn Display, renderer: &mut dyn Renderer, style: &FrameStyle) -> Result<()> {
        let focused = self.is_focused();
        self.frame.repaint(
            display,
            renderer,
            &self.layout,
            style,
            focused,
            self.frame_rect.width,
            self.frame_rect.height,
        )
    }

    /// Recompute decorations (after hint changes or a transient-for
    /// change) and rebuild the frame when they differ. The client keeps its
    /// place on screen.
    pub fn update_decorations(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        style: &FrameStyle,
        transient: bool,
    ) -> Result<bool> {
        let (decorations, functions) = resolve_decorations(
            self.mwm_hints.as_ref(),
            self.manager_hints.as_ref(),
            &self.size_hints,
            transient,
            self.window_type,
        );
        self.functions = functions;
        if decorations == self.layout.decorations {
            return Ok(false);
        }
        self.rebuild_frame(display, renderer, style, FrameLayout::new(decorations, style))?;
        Ok(true)
    }

    /// Pick up new decoration metrics and textures after a reconfigure.
    pub fn restyle(&mut self, display: &mut dyn Display, renderer: &mut dyn Renderer, style: &FrameStyle) -> Result<()> {
        let layout = FrameLayout::new(self.layout.decorations, style);
        if layout == self.layout {
            return self.repaint(display, renderer, style);
        }
        self.rebuild_frame(display, renderer, style, layout)
    }

    fn rebuild_frame(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        style: &FrameStyle,
        layout: FrameLayout,
    ) -> Result<()> {
        let client = self.client_rect();
        self.layout = layout;
        if self.is_shaded() && !self.layout.has_titlebar() {
            self.state.remove(ClientState::SHADED);
        }
        let frame_rect = self.layout.upsize(client);
        self.frame.rebuild(display, renderer, &self.layout, style, frame_rect)?;
        let (ox, oy) = self.layout.client_offset();
        display.reparent_window(self.window, self.frame.frame, ox, oy)?;
        self.ignore_unmaps += u32::from(self.icccm_state == IcccmState::Normal);
        // Force the resize path so every decoration window is repositioned
        self.frame_rect = Geometry::default();
        self.configure(display, frame_rect)?;
        display.set_frame_extents(self.window, &self.layout.margins())?;
        self.repaint(display, renderer, style)
    }

    /// _NET_WM_STATE as it should be published.
    pub fn net_state(&self) -> NetWmState {
        let mut net = NetWmState::empty();
        net.set(NetWmState::MODAL, self.is_modal());
        net.set(NetWmState::STICKY, self.is_stuck());
        net.set(NetWmState::SHADED, self.is_shaded());
        net.set(NetWmState::HIDDEN, self.is_iconic());
        net.set(NetWmState::MAXIMIZED_HORZ, self.maximized.horizontal());
        net.set(NetWmState::MAXIMIZED_VERT, self.maximized.vertical());
        net.set(NetWmState::DEMANDS_ATTENTION, self.state.contains(ClientState::URGENT));
        net
    }

    pub fn attribute_record(&self) -> AttributeRecord {
        let mut attributes = 0;
        if self.is_shaded() {
            attributes |= BOX_ATTR_SHADED;
        }
        if self.maximized.vertical() {
            attributes |= BOX_ATTR_MAX_VERT;
        }
        if self.maximized.horizontal() {
            attributes |= BOX_ATTR_MAX_HORZ;
        }
        if self.is_stuck() {
            attributes |= BOX_ATTR_OMNIPRESENT;
        }
        AttributeRecord {
            attributes,
            workspace: Some(self.workspace),
            premax: self.premax,
            decoration: self.manager_hints.and_then(|m| m.decoration),
        }
    }

    /// Write _NET_WM_STATE and the persisted attribute record.
    pub fn publish_state(&self, display: &mut dyn Display) -> Result<()> {
        display.set_net_wm_state(self.window, self.net_state())?;
        display.write_attributes(self.window, &self.attribute_record().encode())
    }

    /// Hand the client back to the root window (unless it is already
    /// gone) and destroy the frame. The caller unregisters the handles
    /// first.
    pub fn release(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        root: Window,
        destroyed: bool,
    ) -> Result<()> {
        if !destroyed {
            let client = self.client_rect();
            display.reparent_window(self.window, root, client.x, client.y)?;
            display.configure_window(
                self.window,
                WindowChanges {
                    border_width: Some(self.old_border_width),
                    ..WindowChanges::default()
                },
            )?;
            display.change_save_set(self.window, false)?;
        }
        self.frame.destroy(display, renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::wm::render::SolidRenderer;
    use crate::wm::testing::{Call, FakeDisplay};

    const CLIENT: Window = 0x400;

    fn style() -> FrameStyle {
        FrameStyle::from_config(&Config::default())
    }

    fn make(display: &mut FakeDisplay, hints: ClientHints) -> Client {
        let attrs = WindowAttributes {
            geometry: Geometry::new(100, 100, 300, 200),
            border_width: 2,
            override_redirect: false,
            mapped: false,
        };
        let root = display.root();
        Client::new(display, &mut SolidRenderer, &style(), root, CLIENT, 0, 0, &attrs, hints, false).unwrap()
    }

    #[test]
    fn test_frame_wraps_client() {
        let mut display = FakeDisplay::new();
        let client = make(&mut display, ClientHints::default());
        // 1px border, 20px title, 6px handle
        assert_eq!(client.frame_rect(), Geometry::new(100, 100, 302, 230));
        assert_eq!(client.client_rect(), Geometry::new(101, 122, 300, 200));
        assert!(display.calls.contains(&Call::Reparent(CLIENT, client.frame_window(), 1, 22)));
        assert_eq!(client.ignore_unmaps, 0);
    }

    #[test]
    fn test_move_only_does_not_resize_client() {
        let mut display = FakeDisplay::new();
        let mut client = make(&mut display, ClientHints::default());
        let frame = client.frame_window();
        display.clear_calls();

        client.configure(&mut display, Geometry::new(150, 100, 302, 230)).unwrap();
        assert_eq!(
            display.calls,
            vec![
                Call::Configure(frame, WindowChanges::position(150, 100)),
                Call::ConfigureNotify(CLIENT, Geometry::new(151, 122, 300, 200)),
            ]
        );

        display.clear_calls();
        client.configure(&mut display, Geometry::new(150, 100, 402, 230)).unwrap();
        assert!(display.calls.contains(&Call::Configure(CLIENT, WindowChanges::size(400, 200))));

        display.clear_calls();
        client.configure(&mut display, Geometry::new(150, 100, 402, 230)).unwrap();
        assert!(display.calls.is_empty());
    }

    #[test]
    fn test_configure_keeps_a_pixel_on_screen() {
        let mut display = FakeDisplay::new();
        let mut client = make(&mut display, ClientHints::default());
        client.configure(&mut display, Geometry::new(-5000, -5000, 302, 230)).unwrap();
        assert_eq!(client.frame_rect().right(), 1);
        assert_eq!(client.frame_rect().bottom(), 1);
    }

    #[test]
    fn test_maximize_twice_restores_geometry() {
        let mut display = FakeDisplay::new();
        let mut client = make(&mut display, ClientHints::default());
        let before = client.frame_rect();
        let area = Geometry::new(0, 0, 1024, 768);

        client.maximize(&mut display, MaximizeMode::Full, area).unwrap();
        assert_eq!(client.frame_rect(), area);
        assert!(client.net_state().contains(NetWmState::MAXIMIZED_HORZ | NetWmState::MAXIMIZED_VERT));
        assert_eq!(client.premax, Some(before));

        client.maximize(&mut display, MaximizeMode::Full, area).unwrap();
        assert_eq!(client.frame_rect(), before);
        assert_eq!(client.maximized, MaximizeMode::None);
        assert_eq!(client.premax, None);
    }

    #[test]
    fn test_maximize_snaps_to_increments_and_centers() {
        let mut display = FakeDisplay::new();
        // PResizeInc | PBaseSize, base 0x0, increments 10x10
        let raw = vec![64 | 256, 0, 0, 0, 0, 0, 0, 0, 0, 10, 10, 0, 0, 0, 0, 0, 0, 1];
        let hints = ClientHints {
            size: SizeHints::from_raw(Some(&raw)),
            ..ClientHints::default()
        };
        let mut client = make(&mut display, hints);
        client.maximize(&mut display, MaximizeMode::Full, Geometry::new(0, 0, 1024, 768)).unwrap();
        // Client 1020x730 inside a 1022x760 frame
        assert_eq!(client.frame_rect(), Geometry::new(1, 4, 1022, 760));
        assert_eq!(client.client_rect().width, 1020);
        assert_eq!(client.client_rect().height, 730);
    }

    #[test]
    fn test_vertical_maximize_keeps_width_and_unshades() {
        let mut display = FakeDisplay::new();
        let mut client = make(&mut display, ClientHints::default());
        assert!(client.set_shaded(&mut display, true).unwrap());
        assert_eq!(client.visible_frame_rect().height, 22);

        client.maximize(&mut display, MaximizeMode::Vertical, Geometry::new(0, 30, 1024, 700)).unwrap();
        assert!(!client.is_shaded());
        assert_eq!(client.frame_rect(), Geometry::new(100, 30, 302, 700));
    }

    #[test]
    fn test_iconify_counts_own_unmap() {
        let mut display = FakeDisplay::new();
        let mut client = make(&mut display, ClientHints::default());
        client.show(&mut display).unwrap();
        assert!(client.iconify(&mut display).unwrap());
        assert!(!client.iconify(&mut display).unwrap());
        assert_eq!(client.ignore_unmaps, 1);
        assert!(!client.is_visible());
        assert_eq!(display.wm_states.get(&CLIENT), Some(&IcccmState::Iconic));
        assert!(client.net_state().contains(NetWmState::HIDDEN));

        assert!(client.deiconify(&mut display, true).unwrap());
        assert!(client.is_visible());
        assert_eq!(display.wm_states.get(&CLIENT), Some(&IcccmState::Normal));
    }

    #[test]
    fn test_close_is_cooperative() {
        let mut display = FakeDisplay::new();
        let client = make(&mut display, ClientHints::default());
        assert!(!client.close(&mut display, 0).unwrap());

        let hints = ClientHints {
            protocols: Protocols::DELETE_WINDOW,
            ..ClientHints::default()
        };
        let polite = make(&mut display, hints);
        assert!(polite.close(&mut display, 0).unwrap());
        assert_eq!(display.sent_protocols, vec![(CLIENT, ClientProtocol::DeleteWindow)]);
    }

    #[test]
    fn test_attribute_record_follows_state() {
        let mut display = FakeDisplay::new();
        let mut client = make(&mut display, ClientHints::default());
        client.workspace = 2;
        client.set_stuck(&mut display, true).unwrap();
        let record = client.attribute_record();
        assert_eq!(record.attributes, BOX_ATTR_OMNIPRESENT);
        assert_eq!(record.workspace, Some(2));
        assert_eq!(display.desktops.get(&CLIENT), Some(&None));
        assert_eq!(
            display.properties.get(&(CLIENT, ClientProperty::Attributes)),
            Some(&record.encode().to_vec())
        );
    }

    #[test]
    fn test_fixed_size_transient_loses_maximize() {
        let mut display = FakeDisplay::new();
        // PMinSize | PMaxSize, 300x200 both
        let raw = vec![16 | 32, 0, 0, 0, 0, 300, 200, 300, 200, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let hints = ClientHints {
            size: SizeHints::from_raw(Some(&raw)),
            ..ClientHints::default()
        };
        let client = make(&mut display, hints);
        assert!(!client.functions.contains(Functions::MAXIMIZE | Functions::RESIZE));
        assert!(!client.layout.has_handle());
        // No border: the titlebar sits at the frame origin
        assert_eq!(client.client_rect(), Geometry::new(100, 120, 300, 200));
    }
}
