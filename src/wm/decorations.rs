//! Window decorations (frame, titlebar, handle, grips, buttons)
//!
//! `FrameLayout` is pure arithmetic over the decoration metrics and is what
//! keeps client and frame geometry consistent; `FrameWindows` owns the
//! server-side windows that make up one frame.

use std::collections::HashMap;

use anyhow::Result;
use x11rb::protocol::xproto::{Pixmap, Window};

use crate::config::{Config, StyleConfig};
use crate::shared::Geometry;
use crate::wm::client_flags::Decorations;
use crate::wm::display::{Display, WindowChanges, WindowRole};
use crate::wm::render::{Paint, Renderer, Texture};

/// Titlebar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonType {
    Iconify,
    Maximize,
    Close,
}

/// Part of a frame an event landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRegion {
    Frame,
    Title,
    Label,
    Handle,
    LeftGrip,
    RightGrip,
    Button(ButtonType),
}

/// Space the frame adds around the client on each side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Decoration metrics and textures, from the configuration
#[derive(Debug, Clone)]
pub struct FrameStyle {
    pub border_width: u32,
    pub title_height: u32,
    pub handle_height: u32,
    pub grip_width: u32,
    pub button_size: u32,
    pub textures: StyleConfig,
}

impl FrameStyle {
    pub fn from_config(config: &Config) -> Self {
        let d = &config.decorations;
        Self {
            border_width: d.border_width,
            title_height: d.title_height.max(1),
            handle_height: d.handle_height.max(1),
            grip_width: d.grip_width.max(1),
            button_size: d.button_size.min(d.title_height).max(1),
            textures: config.style.clone(),
        }
    }

    fn texture(&self, region: FrameRegion, focused: bool) -> &Texture {
        let t = &self.textures;
        match (region, focused) {
            (FrameRegion::Frame, _) => &t.border,
            (FrameRegion::Title, true) => &t.focused_title,
            (FrameRegion::Title, false) => &t.unfocused_title,
            (FrameRegion::Label, true) => &t.focused_label,
            (FrameRegion::Label, false) => &t.unfocused_label,
            (FrameRegion::Handle, true) => &t.focused_handle,
            (FrameRegion::Handle, false) => &t.unfocused_handle,
            (FrameRegion::LeftGrip | FrameRegion::RightGrip, true) => &t.focused_grip,
            (FrameRegion::LeftGrip | FrameRegion::RightGrip, false) => &t.unfocused_grip,
            (FrameRegion::Button(_), true) => &t.focused_button,
            (FrameRegion::Button(_), false) => &t.unfocused_button,
        }
    }
}

/// Geometry of a frame with a given decoration set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub decorations: Decorations,
    border_width: u32,
    title_height: u32,
    handle_height: u32,
    grip_width: u32,
    button_size: u32,
}

impl FrameLayout {
    pub fn new(decorations: Decorations, style: &FrameStyle) -> Self {
        Self {
            decorations,
            border_width: style.border_width,
            title_height: style.title_height,
            handle_height: style.handle_height,
            grip_width: style.grip_width,
            button_size: style.button_size,
        }
    }

    fn border(&self) -> u32 {
        if self.decorations.contains(Decorations::BORDER) {
            self.border_width
        } else {
            0
        }
    }

    pub fn has_titlebar(&self) -> bool {
        self.decorations.contains(Decorations::TITLEBAR)
    }

    pub fn has_handle(&self) -> bool {
        self.decorations.contains(Decorations::HANDLE)
    }

    pub fn margins(&self) -> Margins {
        let b = self.border();
        let top = if self.has_titlebar() { b + self.title_height + b } else { b };
        let bottom = if self.has_handle() { b + self.handle_height + b } else { b };
        Margins { left: b, right: b, top, bottom }
    }

    /// Frame rectangle around a client rectangle (both in root coordinates).
    pub fn upsize(&self, client: Geometry) -> Geometry {
        let m = self.margins();
        Geometry {
            x: client.x - m.left as i32,
            y: client.y - m.top as i32,
            width: client.width + m.left + m.right,
            height: client.height + m.top + m.bottom,
        }
    }

    /// Client rectangle inside a frame rectangle. Exact inverse of `upsize`.
    pub fn downsize(&self, frame: Geometry) -> Geometry {
        let m = self.margins();
        Geometry {
            x: frame.x + m.left as i32,
            y: frame.y + m.top as i32,
            width: frame.width.saturating_sub(m.left + m.right),
            height: frame.height.saturating_sub(m.top + m.bottom),
        }
    }

    /// Client origin inside the frame window.
    pub fn client_offset(&self) -> (i32, i32) {
        let m = self.margins();
        (m.left as i32, m.top as i32)
    }

    /// Frame height while shaded: only the titlebar stays visible.
    pub fn shaded_height(&self) -> u32 {
        self.margins().top.max(1)
    }

    fn button_pad(&self) -> u32 {
        self.title_height.saturating_sub(self.button_size) / 2
    }

    fn title_width(&self, frame_width: u32) -> u32 {
        frame_width.saturating_sub(2 * self.border()).max(1)
    }

    /// Titlebar, relative to the frame.
    pub fn title_rect(&self, frame_width: u32) -> Option<Geometry> {
        let b = self.border() as i32;
        self.has_titlebar()
            .then(|| Geometry::new(b, b, self.title_width(frame_width), self.title_height))
    }

    /// Buttons present, left to right.
    pub fn buttons(&self) -> Vec<ButtonType> {
        if !self.has_titlebar() {
            return Vec::new();
        }
        [
            (Decorations::ICONIFY, ButtonType::Iconify),
            (Decorations::MAXIMIZE, ButtonType::Maximize),
            (Decorations::CLOSE, ButtonType::Close),
        ]
        .into_iter()
        .filter(|(flag, _)| self.decorations.contains(*flag))
        .map(|(_, button)| button)
        .collect()
    }

    /// Button, relative to the titlebar. Iconify sits on the left, maximize
    /// and close on the right.
    pub fn button_rect(&self, button: ButtonType, frame_width: u32) -> Option<Geometry> {
        if !self.buttons().contains(&button) {
            return None;
        }
        let pad = self.button_pad() as i32;
        let size = self.button_size as i32;
        let width = self.title_width(frame_width) as i32;
        let x = match button {
            ButtonType::Iconify => pad,
            ButtonType::Close => width - pad - size,
            ButtonType::Maximize => {
                if self.decorations.contains(Decorations::CLOSE) {
                    width - 2 * (pad + size)
                } else {
                    width - pad - size
                }
            }
        };
        Some(Geometry::new(x, pad, self.button_size, self.button_size))
    }

    /// Label between the buttons, relative to the titlebar.
    pub fn label_rect(&self, frame_width: u32) -> Option<Geometry> {
        if !self.has_titlebar() {
            return None;
        }
        let pad = self.button_pad() as i32;
        let width = self.title_width(frame_width) as i32;
        let left = self
            .button_rect(ButtonType::Iconify, frame_width)
            .map_or(pad, |r| r.right() + pad);
        let right = [ButtonType::Maximize, ButtonType::Close]
            .into_iter()
            .filter_map(|b| self.button_rect(b, frame_width))
            .map(|r| r.x - pad)
            .min()
            .unwrap_or(width - pad);
        let height = self.title_height.saturating_sub(2 * self.button_pad()).max(1);
        Some(Geometry::new(left, pad, (right - left).max(1) as u32, height))
    }

    /// Handle, relative to the frame (unshaded frame height).
    pub fn handle_rect(&self, frame_width: u32, frame_height: u32) -> Option<Geometry> {
        if !self.has_handle() {
            return None;
        }
        let b = self.border();
        let y = frame_height.saturating_sub(b + self.handle_height) as i32;
        Some(Geometry::new(b as i32, y, self.title_width(frame_width), self.handle_height))
    }

    /// Resize grip, relative to the handle.
    pub fn grip_rect(&self, right: bool, frame_width: u32) -> Option<Geometry> {
        if !self.has_handle() {
            return None;
        }
        let handle_width = self.title_width(frame_width);
        let width = self.grip_width.min(handle_width);
        let x = if right { (handle_width - width) as i32 } else { 0 };
        Some(Geometry::new(x, 0, width, self.handle_height))
    }
}

/// The server-side windows of one frame
#[derive(Debug)]
pub struct FrameWindows {
    pub frame: Window,
    pub title: Option<Window>,
    pub label: Option<Window>,
    pub handle: Option<Window>,
    pub left_grip: Option<Window>,
    pub right_grip: Option<Window>,
    pub buttons: Vec<(ButtonType, Window)>,
    pixmaps: HashMap<Window, Pixmap>,
}

impl FrameWindows {
    /// Create the frame and its decoration windows, all unmapped.
    /// `frame_rect` is the unshaded frame rectangle.
    pub fn create(
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        root: Window,
        layout: &FrameLayout,
        style: &FrameStyle,
        frame_rect: Geometry,
    ) -> Result<Self> {
        let frame_paint = renderer.render(
            (frame_rect.width, frame_rect.height),
            style.texture(FrameRegion::Frame, false),
        )?;
        let frame = display.create_window(root, frame_rect, WindowRole::Decoration(FrameRegion::Frame), frame_paint)?;
        let mut windows = Self {
            frame,
            title: None,
            label: None,
            handle: None,
            left_grip: None,
            right_grip: None,
            buttons: Vec::new(),
            pixmaps: HashMap::new(),
        };
        windows.remember(frame, frame_paint);
        windows.create_children(display, renderer, layout, style, frame_rect)?;
        Ok(windows)
    }

    fn create_children(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        layout: &FrameLayout,
        style: &FrameStyle,
        frame_rect: Geometry,
    ) -> Result<()> {
        let width = frame_rect.width;
        let frame = self.frame;
        let mut make = |this: &mut Self, parent: Window, rect: Geometry, region: FrameRegion| -> Result<Window> {
            let paint = renderer.render((rect.width, rect.height), style.texture(region, false))?;
            let window = display.create_window(parent, rect, WindowRole::Decoration(region), paint)?;
            this.remember(window, paint);
            Ok(window)
        };

        if let Some(rect) = layout.title_rect(width) {
            let title = make(self, frame, rect, FrameRegion::Title)?;
            self.title = Some(title);
            if let Some(rect) = layout.label_rect(width) {
                self.label = Some(make(self, title, rect, FrameRegion::Label)?);
            }
            for button in layout.buttons() {
                if let Some(rect) = layout.button_rect(button, width) {
                    let window = make(self, title, rect, FrameRegion::Button(button))?;
                    self.buttons.push((button, window));
                }
            }
        }
        if let Some(rect) = layout.handle_rect(width, frame_rect.height) {
            let handle = make(self, frame, rect, FrameRegion::Handle)?;
            self.handle = Some(handle);
            if let Some(rect) = layout.grip_rect(false, width) {
                self.left_grip = Some(make(self, handle, rect, FrameRegion::LeftGrip)?);
            }
            if let Some(rect) = layout.grip_rect(true, width) {
                self.right_grip = Some(make(self, handle, rect, FrameRegion::RightGrip)?);
            }
        }

        for parent in [self.title, self.handle].into_iter().flatten() {
            display.map_subwindows(parent)?;
        }
        Ok(())
    }

    /// Replace the decoration windows after the decoration set changed.
    /// The frame window itself survives.
    pub fn rebuild(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        layout: &FrameLayout,
        style: &FrameStyle,
        frame_rect: Geometry,
    ) -> Result<()> {
        for window in self.decoration_handles() {
            if let Some(pixmap) = self.pixmaps.remove(&window) {
                renderer.release(pixmap);
            }
        }
        for window in [self.title, self.handle].into_iter().flatten() {
            display.destroy_window(window)?;
        }
        self.title = None;
        self.label = None;
        self.handle = None;
        self.left_grip = None;
        self.right_grip = None;
        self.buttons.clear();
        self.create_children(display, renderer, layout, style, frame_rect)
    }

    fn remember(&mut self, window: Window, paint: Paint) {
        if let Paint::Pixmap(pixmap) = paint {
            self.pixmaps.insert(window, pixmap);
        }
    }

    /// Every decoration window except the frame itself.
    pub fn decoration_handles(&self) -> Vec<Window> {
        let mut handles: Vec<Window> = [
            self.title,
            self.label,
            self.handle,
            self.left_grip,
            self.right_grip,
        ]
        .into_iter()
        .flatten()
        .collect();
        handles.extend(self.buttons.iter().map(|(_, w)| *w));
        handles
    }

    /// Every window of the frame, frame first.
    pub fn handles(&self) -> Vec<Window> {
        let mut handles = vec![self.frame];
        handles.extend(self.decoration_handles());
        handles
    }

    pub fn region_of(&self, window: Window) -> Option<FrameRegion> {
        if window == self.frame {
            return Some(FrameRegion::Frame);
        }
        let fixed = [
            (self.title, FrameRegion::Title),
            (self.label, FrameRegion::Label),
            (self.handle, FrameRegion::Handle),
            (self.left_grip, FrameRegion::LeftGrip),
            (self.right_grip, FrameRegion::RightGrip),
        ];
        fixed
            .into_iter()
            .find(|(w, _)| *w == Some(window))
            .map(|(_, region)| region)
            .or_else(|| {
                self.buttons
                    .iter()
                    .find(|(_, w)| *w == window)
                    .map(|(button, _)| FrameRegion::Button(*button))
            })
    }

    /// Reposition the decoration windows for a new (unshaded) frame size.
    pub fn reconfigure(&self, display: &mut dyn Display, layout: &FrameLayout, width: u32, height: u32) -> Result<()> {
        if let (Some(title), Some(rect)) = (self.title, layout.title_rect(width)) {
            display.configure_window(title, WindowChanges::geometry(rect))?;
        }
        if let (Some(label), Some(rect)) = (self.label, layout.label_rect(width)) {
            display.configure_window(label, WindowChanges::geometry(rect))?;
        }
        for (button, window) in &self.buttons {
            if let Some(rect) = layout.button_rect(*button, width) {
                display.configure_window(*window, WindowChanges::position(rect.x, rect.y))?;
            }
        }
        if let (Some(handle), Some(rect)) = (self.handle, layout.handle_rect(width, height)) {
            display.configure_window(handle, WindowChanges::geometry(rect))?;
        }
        if let (Some(grip), Some(rect)) = (self.right_grip, layout.grip_rect(true, width)) {
            display.configure_window(grip, WindowChanges::position(rect.x, rect.y))?;
        }
        Ok(())
    }

    /// Ask the renderer for fresh backgrounds, e.g. after a focus change.
    pub fn repaint(
        &mut self,
        display: &mut dyn Display,
        renderer: &mut dyn Renderer,
        layout: &FrameLayout,
        style: &FrameStyle,
        focused: bool,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let mut regions: Vec<(Window, Geometry, FrameRegion)> = Vec::new();
        if let (Some(w), Some(r)) = (self.title, layout.title_rect(width)) {
            regions.push((w, r, FrameRegion::Title));
        }
        if let (Some(w), Some(r)) = (self.label, layout.label_rect(width)) {
            regions.push((w, r, FrameRegion::Label));
        }
        for (button, w) in &self.buttons {
            if let Some(r) = layout.button_rect(*button, width) {
                regions.push((*w, r, FrameRegion::Button(*button)));
            }
        }
        if let (Some(w), Some(r)) = (self.handle, layout.handle_rect(width, height)) {
            regions.push((w, r, FrameRegion::Handle));
        }
        for (grip, right, region) in [
            (self.left_grip, false, FrameRegion::LeftGrip),
            (self.right_grip, true, FrameRegion::RightGrip),
        ] {
            if let (Some(w), Some(r)) = (grip, layout.grip_rect(right, width)) {
                regions.push((w, r, region));
            }
        }

        for (window, rect, region) in regions {
            let paint = renderer.render((rect.width, rect.height), style.texture(region, focused))?;
            if let Some(old) = self.pixmaps.remove(&window) {
                renderer.release(old);
            }
            self.remember(window, paint);
            display.set_background(window, paint)?;
        }
        Ok(())
    }

    /// Release pixmaps and destroy the frame (its children go with it).
    /// The caller unregisters the handles first.
    pub fn destroy(&mut self, display: &mut dyn Display, renderer: &mut dyn Renderer) -> Result<()> {
        for (_, pixmap) in self.pixmaps.drain() {
            renderer.release(pixmap);
        }
        display.destroy_window(self.frame)
    }
}
