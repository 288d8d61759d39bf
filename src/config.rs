//! Configuration system for boxwm
//!
//! Loads configuration from TOML file at `~/.config/boxwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::render::Texture;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspaces: WorkspaceConfig,
    pub placement: PlacementConfig,
    pub focus: FocusConfig,
    pub behavior: BehaviorConfig,
    pub decorations: DecorationConfig,
    pub style: StyleConfig,
    pub toolbar: PanelConfig,
    pub dock: PanelConfig,
}

impl Config {
    /// Load configuration from the default location, or use defaults if the
    /// file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            if let Err(e) = Self::save_default(path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Directory holding config.toml and session.toml
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Failed to get config directory")?
            .join("boxwm"))
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Name of workspace `index`, falling back to "Workspace N"
    pub fn workspace_name(&self, index: usize) -> String {
        self.workspaces
            .names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Workspace {}", index + 1))
    }
}

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Number of workspaces per screen
    pub count: usize,
    /// Workspace names, in order
    pub names: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            count: 4,
            names: Vec::new(),
        }
    }
}

/// Placement policy for windows without a requested position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// Search for a free gap, cascade when none exists
    Smart,
    /// Always cascade
    Cascade,
}

/// Scan direction of smart placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementDirection {
    /// Sweep along rows, then move down (or up)
    Row,
    /// Sweep along columns, then move right (or left)
    Column,
}

/// Window placement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub policy: PlacementPolicy,
    pub direction: PlacementDirection,
    pub left_to_right: bool,
    pub top_to_bottom: bool,
    /// Gap kept between a placed window and its neighbours
    pub margin: u32,
    /// Step of the coarse candidate grid
    pub grid_step: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            policy: PlacementPolicy::Smart,
            direction: PlacementDirection::Row,
            left_to_right: true,
            top_to_bottom: true,
            margin: 0,
            grid_step: 8,
        }
    }
}

/// Focus policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusPolicy {
    /// Click to focus
    ClickToFocus,
    /// Sloppy focus (focus on enter, keep on leave)
    Sloppy,
}

/// Focus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub policy: FocusPolicy,
    /// Raise a sloppy-focused window after the pointer dwells on it
    pub auto_raise: bool,
    pub auto_raise_delay_ms: u64,
    /// Focus windows when they are first mapped
    pub focus_new: bool,
    /// Focus the last focused window when switching workspaces
    pub focus_last: bool,
    pub raise_on_click: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            policy: FocusPolicy::ClickToFocus,
            auto_raise: false,
            auto_raise_delay_ms: 400,
            focus_new: true,
            focus_last: true,
            raise_on_click: true,
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Move/resize windows live instead of dragging an outline
    pub opaque_move: bool,
    /// Distance (pixels) under which dragged edges snap; 0 disables
    pub edge_snap_threshold: u32,
    /// Maximize over the whole screen, ignoring struts
    pub full_maximize: bool,
    pub double_click_interval_ms: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            opaque_move: true,
            edge_snap_threshold: 10,
            full_maximize: false,
            double_click_interval_ms: 250,
        }
    }
}

/// Window decoration geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorationConfig {
    /// Border width in pixels
    pub border_width: u32,
    /// Titlebar height in pixels
    pub title_height: u32,
    /// Handle (bottom bar) height in pixels
    pub handle_height: u32,
    /// Width of each resize grip at the ends of the handle
    pub grip_width: u32,
    /// Button size in pixels
    pub button_size: u32,
}

impl Default for DecorationConfig {
    fn default() -> Self {
        Self {
            border_width: 1,
            title_height: 20,
            handle_height: 6,
            grip_width: 20,
            button_size: 14,
        }
    }
}

/// Texture descriptors for each decoration region. Interpreted only by the
/// renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub border: Texture,
    pub focused_title: Texture,
    pub unfocused_title: Texture,
    pub focused_label: Texture,
    pub unfocused_label: Texture,
    pub focused_handle: Texture,
    pub unfocused_handle: Texture,
    pub focused_grip: Texture,
    pub unfocused_grip: Texture,
    pub focused_button: Texture,
    pub unfocused_button: Texture,
}

impl Default for StyleConfig {
    fn default() -> Self {
        // Nord palette
        Self {
            border: Texture::solid(0x2e3440),
            focused_title: Texture::solid(0x5e81ac),
            unfocused_title: Texture::solid(0x3b4252),
            focused_label: Texture::solid(0x5e81ac),
            unfocused_label: Texture::solid(0x3b4252),
            focused_handle: Texture::solid(0x4c566a),
            unfocused_handle: Texture::solid(0x3b4252),
            focused_grip: Texture::solid(0x88c0d0),
            unfocused_grip: Texture::solid(0x434c5e),
            focused_button: Texture::solid(0xd8dee9),
            unfocused_button: Texture::solid(0x4c566a),
        }
    }
}

/// Screen edge a toolbar or dock is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelPlacement {
    Top,
    Bottom,
    Left,
    Right,
}

/// Toolbar / dock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub placement: PanelPlacement,
    pub on_top: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            placement: PanelPlacement::Bottom,
            on_top: false,
        }
    }
}
