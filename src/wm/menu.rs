//! Menu Module
//!
//! Collaborators are the objects other than client windows that own
//! handles: menus, the toolbar and the dock. They receive forwarded pointer
//! events and answer with [`WmCommand`]s, which go through the same code
//! paths as direct gestures on a frame.

use anyhow::Result;
use tracing::debug;
use x11rb::protocol::xproto::{Timestamp, Window};
use x11rb::CURRENT_TIME;

use crate::shared::{Geometry, Strut};
use crate::wm::client_flags::{ClientState, Functions, MaximizeMode};
use crate::wm::display::{Display, StackPosition, WindowChanges, WindowRole};
use crate::wm::render::Paint;

/// Index of a collaborator in the window manager's collaborator table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollaboratorId(pub usize);

/// Registry table a collaborator's handles live in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollaboratorKind {
    Menu,
    Toolbar,
    Dock,
}

/// Commands collaborators send back to the window manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmCommand {
    Raise(Window),
    Lower(Window),
    Iconify(Window),
    Deiconify(Window),
    Close(Window),
    ToggleShade(Window),
    ToggleStick(Window),
    Maximize(Window, MaximizeMode),
    ChangeWorkspace { screen: usize, workspace: usize },
    PrevWorkspace(usize),
    NextWorkspace(usize),
    SendToWorkspace(Window, usize),
    AddWorkspace(usize),
    RemoveLastWorkspace(usize),
    Reconfigure,
    Exit,
}

/// Pointer event forwarded to a collaborator, coordinates relative to
/// `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub window: Window,
    pub x: i32,
    pub y: i32,
    pub root_x: i32,
    pub root_y: i32,
    pub button: u8,
    pub time: Timestamp,
}

/// In-process object owning handles of its own.
///
/// Everything has a default so each collaborator only implements what it
/// cares about.
pub trait Collaborator {
    fn kind(&self) -> CollaboratorKind;

    /// Screen index this collaborator lives on
    fn screen(&self) -> usize;

    /// Handles to register in the registry
    fn handles(&self) -> Vec<Window>;

    fn button_press(&mut self, _display: &mut dyn Display, _event: &PointerEvent) -> Result<Vec<WmCommand>> {
        Ok(Vec::new())
    }

    fn button_release(&mut self, _display: &mut dyn Display, _event: &PointerEvent) -> Result<Vec<WmCommand>> {
        Ok(Vec::new())
    }

    fn motion(&mut self, _display: &mut dyn Display, _event: &PointerEvent) -> Result<()> {
        Ok(())
    }

    fn expose(&mut self, _display: &mut dyn Display, _window: Window) -> Result<()> {
        Ok(())
    }

    /// Space reserved at the screen edges
    fn strut(&self) -> Option<Strut> {
        None
    }

    fn clock_tick(&mut self, _display: &mut dyn Display) -> Result<()> {
        Ok(())
    }

    /// Menus only: show `items` near the pointer, kept inside `bounds`.
    fn open(&mut self, _display: &mut dyn Display, _items: Vec<MenuItem>, _at: (i32, i32), _bounds: Geometry) -> Result<()> {
        Ok(())
    }

    fn hide(&mut self, _display: &mut dyn Display) -> Result<()> {
        Ok(())
    }

    fn is_visible(&self) -> bool {
        false
    }

    /// Whether the collaborator must stay above client windows
    fn on_top(&self) -> bool {
        false
    }

    /// Docks only: take over `client`. Returns false to decline.
    fn absorb(&mut self, _display: &mut dyn Display, _client: Window) -> Result<bool> {
        Ok(false)
    }

    /// Docks only: forget `client`. With `reparent`, give it back to the
    /// root window. Returns whether the client was ours.
    fn release(&mut self, _display: &mut dyn Display, _client: Window, _reparent: bool) -> Result<bool> {
        Ok(false)
    }

    fn owns_client(&self, _client: Window) -> bool {
        false
    }

    fn destroy(&mut self, display: &mut dyn Display) -> Result<()>;
}

/// One menu entry; items without a command are inert titles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub command: Option<WmCommand>,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, command: WmCommand) -> Self {
        Self {
            label: label.into(),
            command: Some(command),
        }
    }

    pub fn title(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: None,
        }
    }
}

pub const MENU_WIDTH: u32 = 160;
pub const ITEM_HEIGHT: u32 = 18;

/// Root menu (button 3 on the root window)
pub fn root_menu(screen: usize) -> Vec<MenuItem> {
    vec![
        MenuItem::title("boxwm"),
        MenuItem::new("Add workspace", WmCommand::AddWorkspace(screen)),
        MenuItem::new("Remove last workspace", WmCommand::RemoveLastWorkspace(screen)),
        MenuItem::new("Reconfigure", WmCommand::Reconfigure),
        MenuItem::new("Exit", WmCommand::Exit),
    ]
}

/// Workspace menu (button 2 on the root window)
pub fn workspace_menu(screen: usize, names: &[String], current: usize) -> Vec<MenuItem> {
    let mut items = vec![MenuItem::title("Workspaces")];
    for (workspace, name) in names.iter().enumerate() {
        let label = if workspace == current {
            format!("* {}", name)
        } else {
            name.clone()
        };
        items.push(MenuItem::new(label, WmCommand::ChangeWorkspace { screen, workspace }));
    }
    items.push(MenuItem::new("New workspace", WmCommand::AddWorkspace(screen)));
    items.push(MenuItem::new("Remove last", WmCommand::RemoveLastWorkspace(screen)));
    items
}

/// Window menu (button 3 on a titlebar). Entries the window's functions
/// forbid are left out.
pub fn window_menu(
    window: Window,
    functions: Functions,
    state: ClientState,
    maximized: MaximizeMode,
    names: &[String],
    current: usize,
) -> Vec<MenuItem> {
    let mut items = Vec::new();
    for (workspace, name) in names.iter().enumerate() {
        if workspace != current {
            items.push(MenuItem::new(format!("Send to {}", name), WmCommand::SendToWorkspace(window, workspace)));
        }
    }
    if functions.contains(Functions::SHADE) {
        let label = if state.contains(ClientState::SHADED) { "Unshade" } else { "Shade" };
        items.push(MenuItem::new(label, WmCommand::ToggleShade(window)));
    }
    let label = if state.contains(ClientState::STUCK) { "Unstick" } else { "Stick" };
    items.push(MenuItem::new(label, WmCommand::ToggleStick(window)));
    if functions.contains(Functions::ICONIFY) {
        items.push(MenuItem::new("Iconify", WmCommand::Iconify(window)));
    }
    if functions.contains(Functions::MAXIMIZE) {
        let label = if maximized.is_maximized() { "Restore" } else { "Maximize" };
        items.push(MenuItem::new(label, WmCommand::Maximize(window, MaximizeMode::Full)));
    }
    items.push(MenuItem::new("Raise", WmCommand::Raise(window)));
    items.push(MenuItem::new("Lower", WmCommand::Lower(window)));
    if functions.contains(Functions::CLOSE) {
        items.push(MenuItem::new("Close", WmCommand::Close(window)));
    }
    items
}

/// Top-left corner for a menu of `size` opened at `at`: below and to the
/// right of the pointer, flipped back when that would leave `bounds`.
pub fn menu_position(size: (u32, u32), at: (i32, i32), bounds: &Geometry) -> (i32, i32) {
    let (w, h) = (size.0 as i32, size.1 as i32);
    let mut x = at.0;
    let mut y = at.1;
    if x + w > bounds.right() {
        x -= w;
    }
    if y + h > bounds.bottom() {
        y -= h;
    }
    (
        x.min(bounds.right() - w).max(bounds.x),
        y.min(bounds.bottom() - h).max(bounds.y),
    )
}

/// Popup menu of fixed-height rows
#[derive(Debug)]
pub struct CommandMenu {
    screen: usize,
    window: Window,
    items: Vec<MenuItem>,
    geometry: Geometry,
    visible: bool,
    /// Set once the pointer moved inside or pressed on the menu, so the
    /// release of the opening click doesn't pick the first row.
    armed: bool,
    highlighted: Option<usize>,
}

impl CommandMenu {
    pub fn create(display: &mut dyn Display, screen: usize, root: Window, background: u32) -> Result<Self> {
        let geometry = Geometry::new(0, 0, MENU_WIDTH, ITEM_HEIGHT);
        let window = display.create_window(root, geometry, WindowRole::Popup, Paint::Color(background))?;
        Ok(Self {
            screen,
            window,
            items: Vec::new(),
            geometry,
            visible: false,
            armed: false,
            highlighted: None,
        })
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Row under a point relative to the menu window.
    pub fn item_at(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.geometry.width as i32 {
            return None;
        }
        let row = (y / ITEM_HEIGHT as i32) as usize;
        (row < self.items.len()).then_some(row)
    }
}

impl Collaborator for CommandMenu {
    fn kind(&self) -> CollaboratorKind {
        CollaboratorKind::Menu
    }

    fn screen(&self) -> usize {
        self.screen
    }

    fn handles(&self) -> Vec<Window> {
        vec![self.window]
    }

    fn open(&mut self, display: &mut dyn Display, items: Vec<MenuItem>, at: (i32, i32), bounds: Geometry) -> Result<()> {
        let size = (MENU_WIDTH, (items.len().max(1) as u32) * ITEM_HEIGHT);
        let (x, y) = menu_position(size, at, &bounds);
        self.items = items;
        self.geometry = Geometry::new(x, y, size.0, size.1);
        self.armed = false;
        self.highlighted = None;

        display.configure_window(self.window, WindowChanges::geometry(self.geometry))?;
        display.restack(&[self.window], StackPosition::Top)?;
        display.map_window(self.window)?;
        if !display.grab_pointer(self.window, CURRENT_TIME)? {
            debug!("Menu could not grab the pointer");
        }
        self.visible = true;
        Ok(())
    }

    fn hide(&mut self, display: &mut dyn Display) -> Result<()> {
        if !self.visible {
            return Ok(());
        }
        self.visible = false;
        self.highlighted = None;
        display.unmap_window(self.window)?;
        display.ungrab_pointer(CURRENT_TIME)
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn button_press(&mut self, display: &mut dyn Display, event: &PointerEvent) -> Result<Vec<WmCommand>> {
        if self.item_at(event.x, event.y).is_some() {
            self.armed = true;
        } else {
            self.hide(display)?;
        }
        Ok(Vec::new())
    }

    fn motion(&mut self, _display: &mut dyn Display, event: &PointerEvent) -> Result<()> {
        self.highlighted = self.item_at(event.x, event.y);
        if self.highlighted.is_some() {
            self.armed = true;
        }
        Ok(())
    }

    fn button_release(&mut self, display: &mut dyn Display, event: &PointerEvent) -> Result<Vec<WmCommand>> {
        if !self.armed {
            self.armed = true;
            return Ok(Vec::new());
        }
        let command = self
            .item_at(event.x, event.y)
            .and_then(|row| self.items[row].command.clone());
        match command {
            Some(command) => {
                self.hide(display)?;
                Ok(vec![command])
            }
            // Titles keep the menu open, clicks outside close it
            None if self.item_at(event.x, event.y).is_some() => Ok(Vec::new()),
            None => {
                self.hide(display)?;
                Ok(Vec::new())
            }
        }
    }

    fn on_top(&self) -> bool {
        true
    }

    fn destroy(&mut self, display: &mut dyn Display) -> Result<()> {
        self.visible = false;
        display.destroy_window(self.window)
    }
}
