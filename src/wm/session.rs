//! Session Module
//!
//! Two kinds of persisted state:
//!
//! - the per-window attribute record, stored as `_BOXWM_ATTRIBUTES` on the
//!   client window itself so it survives a restart of the window manager;
//! - `session.toml` next to the configuration file, with the per-screen
//!   workspace layout and the policies the user changed at runtime.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, FocusPolicy, PanelConfig, PlacementPolicy};
use crate::shared::Geometry;
use crate::wm::hints::DecorationPreset;
use crate::wm::screen::Screen;

// Record flags: which fields are meaningful
const RECORD_ATTRIBUTES: u32 = 1 << 0;
const RECORD_WORKSPACE: u32 = 1 << 1;
const RECORD_PREMAX: u32 = 1 << 2;
const RECORD_DECORATION: u32 = 1 << 3;

/// Number of CARDINALs in `_BOXWM_ATTRIBUTES`
pub const RECORD_LEN: usize = 8;

/// Saved attributes of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttributeRecord {
    /// `BOX_ATTR_*` bits (shaded, maximized vert/horz, omnipresent)
    pub attributes: u32,
    pub workspace: Option<usize>,
    /// Frame geometry before maximizing
    pub premax: Option<Geometry>,
    pub decoration: Option<DecorationPreset>,
}

impl AttributeRecord {
    /// Layout: flags, attributes, workspace, premax x, y, width, height,
    /// decoration preset.
    pub fn encode(&self) -> [u32; RECORD_LEN] {
        let mut out = [0u32; RECORD_LEN];
        let mut flags = RECORD_ATTRIBUTES;
        out[1] = self.attributes;
        if let Some(workspace) = self.workspace {
            flags |= RECORD_WORKSPACE;
            out[2] = workspace as u32;
        }
        if let Some(g) = self.premax {
            flags |= RECORD_PREMAX;
            out[3] = g.x as u32;
            out[4] = g.y as u32;
            out[5] = g.width;
            out[6] = g.height;
        }
        if let Some(preset) = self.decoration {
            flags |= RECORD_DECORATION;
            out[7] = preset.to_raw();
        }
        out[0] = flags;
        out
    }

    /// `None` for short or foreign data.
    pub fn decode(values: &[u32]) -> Option<Self> {
        if values.len() < RECORD_LEN {
            debug!("Ignoring short attribute record ({} values)", values.len());
            return None;
        }
        let flags = values[0];
        Some(Self {
            attributes: if flags & RECORD_ATTRIBUTES != 0 { values[1] } else { 0 },
            workspace: (flags & RECORD_WORKSPACE != 0).then_some(values[2] as usize),
            premax: (flags & RECORD_PREMAX != 0 && values[5] > 0 && values[6] > 0)
                .then(|| Geometry::new(values[3] as i32, values[4] as i32, values[5], values[6])),
            decoration: if flags & RECORD_DECORATION != 0 {
                DecorationPreset::from_raw(values[7])
            } else {
                None
            },
        })
    }
}

/// Workspace layout of one screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSession {
    pub workspace_count: usize,
    pub names: Vec<String>,
}

/// Contents of session.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub screens: Vec<ScreenSession>,
    pub placement: PlacementPolicy,
    pub focus: FocusPolicy,
    pub toolbar: PanelConfig,
    pub dock: PanelConfig,
}

impl SessionState {
    pub fn capture(config: &Config, screens: &[Screen]) -> Self {
        Self {
            screens: screens
                .iter()
                .map(|s| ScreenSession {
                    workspace_count: s.workspace_count(),
                    names: s.workspace_names(),
                })
                .collect(),
            placement: config.placement.policy,
            focus: config.focus.policy,
            toolbar: config.toolbar.clone(),
            dock: config.dock.clone(),
        }
    }

    /// Overwrite the configuration values the session carries.
    pub fn apply(&self, config: &mut Config) {
        config.placement.policy = self.placement;
        config.focus.policy = self.focus;
        config.toolbar = self.toolbar.clone();
        config.dock = self.dock.clone();
    }

    /// Workspace names for `screen`, padded to the saved count.
    pub fn workspace_names(&self, screen: usize, config: &Config) -> Option<Vec<String>> {
        let saved = self.screens.get(screen)?;
        let count = saved.workspace_count.max(1);
        Some(
            (0..count)
                .map(|i| saved.names.get(i).cloned().unwrap_or_else(|| config.workspace_name(i)))
                .collect(),
        )
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Config::config_dir()?.join("session.toml"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let text = toml::to_string_pretty(self).context("Failed to serialize session")?;
        fs::write(path, text).with_context(|| format!("Failed to write session file {:?}", path))?;
        info!("Session saved to {:?}", path);
        Ok(())
    }

    /// `Ok(None)` when there is no session file yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read session file {:?}", path))?;
        let session = toml::from_str(&text).with_context(|| format!("Failed to parse session file {:?}", path))?;
        Ok(Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelPlacement;
    use crate::wm::hints::{BOX_ATTR_MAX_HORZ, BOX_ATTR_SHADED};

    #[test]
    fn test_attribute_record_layout() {
        let record = AttributeRecord {
            attributes: BOX_ATTR_SHADED | BOX_ATTR_MAX_HORZ,
            workspace: Some(2),
            premax: Some(Geometry::new(-10, 40, 300, 200)),
            decoration: None,
        };
        let raw = record.encode();
        assert_eq!(raw[0], RECORD_ATTRIBUTES | RECORD_WORKSPACE | RECORD_PREMAX);
        assert_eq!(raw[2], 2);
        assert_eq!(AttributeRecord::decode(&raw), Some(record));
        assert_eq!(AttributeRecord::decode(&raw[..5]), None);
    }

    #[test]
    fn test_zero_sized_premax_is_dropped() {
        let raw = [RECORD_PREMAX, 0, 0, 5, 5, 0, 0, 0];
        assert_eq!(AttributeRecord::decode(&raw).and_then(|r| r.premax), None);
    }

    #[test]
    fn test_session_file_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxwm").join("session.toml");
        assert_eq!(SessionState::load(&path).unwrap(), None);

        let mut config = Config::default();
        config.focus.policy = FocusPolicy::Sloppy;
        config.dock.placement = PanelPlacement::Left;
        let screens = vec![Screen::new(
            0,
            0x100,
            Geometry::new(0, 0, 1024, 768),
            vec!["mail".into(), "code".into(), "web".into()],
        )];
        SessionState::capture(&config, &screens).save(&path).unwrap();

        let session = SessionState::load(&path).unwrap().unwrap();
        let mut fresh = Config::default();
        session.apply(&mut fresh);
        assert_eq!(fresh.focus.policy, FocusPolicy::Sloppy);
        assert_eq!(fresh.dock.placement, PanelPlacement::Left);
        assert_eq!(
            session.workspace_names(0, &fresh),
            Some(vec!["mail".to_string(), "code".to_string(), "web".to_string()])
        );
        assert_eq!(session.workspace_names(1, &fresh), None);
    }
}
