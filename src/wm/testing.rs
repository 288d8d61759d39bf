//! Recording display used by the unit tests.
//!
//! Requests are appended to `calls`; state the window manager publishes
//! (WM_STATE, _NET_WM_STATE, focus, root properties) is kept in plain
//! maps so tests can assert on the end result instead of the call log.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use x11rb::protocol::xproto::{Timestamp, Window};

use crate::config::Config;
use crate::shared::Geometry;
use crate::wm::client_flags::{IcccmState, NetWmState, Protocols, WindowType};
use crate::wm::decorations::Margins;
use crate::wm::display::{
    ClientProperty, ClientProtocol, Display, PointerState, RootProperty, StackPosition, WindowAttributes,
    WindowChanges, WindowRole,
};
use crate::wm::ewmh::Atoms;
use crate::wm::render::{Paint, SolidRenderer};
use crate::wm::WindowManager;

pub const ROOT: Window = 0x100;

/// Window manager on a fresh fake display with the default config.
pub fn window_manager() -> WindowManager<FakeDisplay> {
    WindowManager::new(FakeDisplay::new(), Box::new(SolidRenderer), Config::default(), None, None).unwrap()
}

/// Create `window` with a user-specified position and manage it.
pub fn manage(wm: &mut WindowManager<FakeDisplay>, window: Window, geometry: Geometry) {
    let display = wm.display_mut();
    display.add_client(window, geometry);
    let mut hints = vec![0; 18];
    // USPosition
    hints[0] = 1;
    display.set_property(window, ClientProperty::NormalHints, hints);
    wm.manage_window(0, window, false).unwrap();
}

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(Window, Window, Geometry, WindowRole),
    Destroy(Window),
    Reparent(Window, Window, i32, i32),
    Map(Window),
    Unmap(Window),
    Configure(Window, WindowChanges),
    Restack(Vec<Window>, StackPosition),
    ConfigureNotify(Window, Geometry),
    Shape(Window, Window),
}

#[derive(Debug)]
pub struct FakeDisplay {
    atoms: Atoms,
    pub calls: Vec<Call>,
    pub focus: Option<Window>,
    pub sent_protocols: Vec<(Window, ClientProtocol)>,
    pub properties: HashMap<(Window, ClientProperty), Vec<u32>>,
    pub protocols: HashMap<Window, Protocols>,
    pub titles: HashMap<Window, String>,
    pub types: HashMap<Window, WindowType>,
    pub attributes: HashMap<Window, WindowAttributes>,
    pub children: HashMap<Window, Vec<Window>>,
    pub wm_states: HashMap<Window, IcccmState>,
    pub net_states: HashMap<Window, NetWmState>,
    pub desktops: HashMap<Window, Option<u32>>,
    pub extents: HashMap<Window, Margins>,
    pub root_props: Vec<RootProperty>,
    pub mapped: HashSet<Window>,
    pub save_set: HashSet<Window>,
    pub server_grabs: u32,
    pub pointer_grabbed: bool,
    pub pointer: (i32, i32),
    pub outlines: Vec<Geometry>,
    pub shape: bool,
    next_id: Window,
}

impl Default for FakeDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDisplay {
    pub fn new() -> Self {
        Self {
            atoms: Atoms::fake(),
            calls: Vec::new(),
            focus: None,
            sent_protocols: Vec::new(),
            properties: HashMap::new(),
            protocols: HashMap::new(),
            titles: HashMap::new(),
            types: HashMap::new(),
            attributes: HashMap::new(),
            children: HashMap::new(),
            wm_states: HashMap::new(),
            net_states: HashMap::new(),
            desktops: HashMap::new(),
            extents: HashMap::new(),
            root_props: Vec::new(),
            mapped: HashSet::new(),
            save_set: HashSet::new(),
            server_grabs: 0,
            pointer_grabbed: false,
            pointer: (0, 0),
            outlines: Vec::new(),
            shape: false,
            next_id: 0x10000,
        }
    }

    pub fn root(&self) -> Window {
        ROOT
    }

    /// A top-level application window that exists but is not managed yet.
    pub fn add_client(&mut self, window: Window, geometry: Geometry) {
        self.attributes.insert(
            window,
            WindowAttributes {
                geometry,
                border_width: 0,
                override_redirect: false,
                mapped: false,
            },
        );
        self.children.entry(ROOT).or_default().push(window);
    }

    pub fn set_property(&mut self, window: Window, property: ClientProperty, values: Vec<u32>) {
        self.properties.insert((window, property), values);
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn restacks(&self) -> Vec<(Vec<Window>, StackPosition)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Restack(windows, position) => Some((windows.clone(), *position)),
                _ => None,
            })
            .collect()
    }

    /// Windows created with `role`, in creation order.
    pub fn created(&self, role: WindowRole) -> Vec<Window> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Create(window, _, _, r) if *r == role => Some(*window),
                _ => None,
            })
            .collect()
    }

    /// Most recent value published for a root property.
    pub fn root_prop<T>(&self, pick: impl Fn(&RootProperty) -> Option<T>) -> Option<T> {
        self.root_props.iter().rev().find_map(pick)
    }

    pub fn client_list(&self) -> Vec<Window> {
        self.root_prop(|p| match p {
            RootProperty::ClientList(list) => Some(list.clone()),
            _ => None,
        })
        .unwrap_or_default()
    }

    pub fn active_window(&self) -> Option<Window> {
        self.root_prop(|p| match p {
            RootProperty::ActiveWindow(active) => Some(*active),
            _ => None,
        })
        .flatten()
    }

    fn detach_child(&mut self, window: Window) {
        for children in self.children.values_mut() {
            children.retain(|w| *w != window);
        }
    }
}

impl Display for FakeDisplay {
    fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    fn screen_roots(&self) -> Vec<Window> {
        vec![ROOT]
    }

    fn screen_geometry(&self, _root: Window) -> Geometry {
        Geometry::new(0, 0, 1024, 768)
    }

    fn has_shape(&self) -> bool {
        self.shape
    }

    fn create_window(&mut self, parent: Window, geometry: Geometry, role: WindowRole, _paint: Paint) -> Result<Window> {
        let window = self.next_id;
        self.next_id += 1;
        self.calls.push(Call::Create(window, parent, geometry, role));
        Ok(window)
    }

    fn destroy_window(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::Destroy(window));
        self.mapped.remove(&window);
        self.detach_child(window);
        Ok(())
    }

    fn reparent_window(&mut self, window: Window, parent: Window, x: i32, y: i32) -> Result<()> {
        self.calls.push(Call::Reparent(window, parent, x, y));
        self.detach_child(window);
        self.children.entry(parent).or_default().push(window);
        Ok(())
    }

    fn map_window(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::Map(window));
        self.mapped.insert(window);
        Ok(())
    }

    fn unmap_window(&mut self, window: Window) -> Result<()> {
        self.calls.push(Call::Unmap(window));
        self.mapped.remove(&window);
        Ok(())
    }

    fn map_subwindows(&mut self, _window: Window) -> Result<()> {
        Ok(())
    }

    fn configure_window(&mut self, window: Window, changes: WindowChanges) -> Result<()> {
        self.calls.push(Call::Configure(window, changes));
        if let Some(attrs) = self.attributes.get_mut(&window) {
            let g = &mut attrs.geometry;
            g.x = changes.x.unwrap_or(g.x);
            g.y = changes.y.unwrap_or(g.y);
            g.width = changes.width.unwrap_or(g.width);
            g.height = changes.height.unwrap_or(g.height);
        }
        Ok(())
    }

    fn restack(&mut self, windows: &[Window], position: StackPosition) -> Result<()> {
        self.calls.push(Call::Restack(windows.to_vec(), position));
        Ok(())
    }

    fn set_background(&mut self, _window: Window, _paint: Paint) -> Result<()> {
        Ok(())
    }

    fn select_client_input(&mut self, _window: Window) -> Result<()> {
        Ok(())
    }

    fn change_save_set(&mut self, window: Window, insert: bool) -> Result<()> {
        if insert {
            self.save_set.insert(window);
        } else {
            self.save_set.remove(&window);
        }
        Ok(())
    }

    fn grab_window_buttons(&mut self, _window: Window) -> Result<()> {
        Ok(())
    }

    fn shape_frame(&mut self, frame: Window, client: Window, _margins: &Margins) -> Result<()> {
        self.calls.push(Call::Shape(frame, client));
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<Window>, _time: Timestamp) -> Result<()> {
        self.focus = window;
        Ok(())
    }

    fn send_protocol(&mut self, window: Window, protocol: ClientProtocol, _time: Timestamp) -> Result<()> {
        self.sent_protocols.push((window, protocol));
        Ok(())
    }

    fn send_configure_notify(&mut self, window: Window, geometry: Geometry) -> Result<()> {
        self.calls.push(Call::ConfigureNotify(window, geometry));
        Ok(())
    }

    fn set_wm_state(&mut self, window: Window, state: IcccmState) -> Result<()> {
        self.wm_states.insert(window, state);
        Ok(())
    }

    fn set_net_wm_state(&mut self, window: Window, state: NetWmState) -> Result<()> {
        self.net_states.insert(window, state);
        Ok(())
    }

    fn set_net_wm_desktop(&mut self, window: Window, workspace: Option<u32>) -> Result<()> {
        self.desktops.insert(window, workspace);
        Ok(())
    }

    fn set_frame_extents(&mut self, window: Window, margins: &Margins) -> Result<()> {
        self.extents.insert(window, *margins);
        Ok(())
    }

    fn set_root_property(&mut self, _root: Window, property: RootProperty) -> Result<()> {
        self.root_props.push(property);
        Ok(())
    }

    fn write_attributes(&mut self, window: Window, record: &[u32]) -> Result<()> {
        self.properties.insert((window, ClientProperty::Attributes), record.to_vec());
        Ok(())
    }

    fn delete_property(&mut self, window: Window, property: ClientProperty) -> Result<()> {
        self.properties.remove(&(window, property));
        Ok(())
    }

    fn read_property(&mut self, window: Window, property: ClientProperty) -> Result<Option<Vec<u32>>> {
        Ok(self.properties.get(&(window, property)).cloned())
    }

    fn read_protocols(&mut self, window: Window) -> Result<Protocols> {
        Ok(self.protocols.get(&window).copied().unwrap_or_default())
    }

    fn read_title(&mut self, window: Window) -> Result<String> {
        Ok(self.titles.get(&window).cloned().unwrap_or_default())
    }

    fn read_window_type(&mut self, window: Window) -> Result<WindowType> {
        Ok(self.types.get(&window).copied().unwrap_or_default())
    }

    fn window_attributes(&mut self, window: Window) -> Result<Option<WindowAttributes>> {
        Ok(self.attributes.get(&window).copied())
    }

    fn query_tree(&mut self, window: Window) -> Result<Vec<Window>> {
        Ok(self.children.get(&window).cloned().unwrap_or_default())
    }

    fn query_pointer(&mut self, _root: Window) -> Result<PointerState> {
        Ok(PointerState {
            root_x: self.pointer.0,
            root_y: self.pointer.1,
        })
    }

    fn grab_pointer(&mut self, _window: Window, _time: Timestamp) -> Result<bool> {
        self.pointer_grabbed = true;
        Ok(true)
    }

    fn ungrab_pointer(&mut self, _time: Timestamp) -> Result<()> {
        self.pointer_grabbed = false;
        Ok(())
    }

    fn grab_server(&mut self) -> Result<()> {
        self.server_grabs += 1;
        Ok(())
    }

    fn ungrab_server(&mut self) -> Result<()> {
        self.server_grabs = self.server_grabs.saturating_sub(1);
        Ok(())
    }

    fn draw_outline(&mut self, _root: Window, geometry: Geometry) -> Result<()> {
        self.outlines.push(geometry);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
