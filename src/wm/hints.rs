//! Hints Module
//!
//! Window hints parsing and application (WM_NORMAL_HINTS, WM_HINTS,
//! _MOTIF_WM_HINTS and our own _BOXWM_HINTS).
//!
//! Parsing never fails: missing or malformed properties fall back to the
//! ICCCM defaults (north-west gravity, 1x1 minimum size, unit increments).

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::shared::Geometry;
use crate::wm::client_flags::{Decorations, Functions, IcccmState, WindowType};
use crate::wm::decorations::Margins;

/// Largest width/height the protocol can express
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

// WM_SIZE_HINTS flags
const US_POSITION: u32 = 1 << 0;
const P_POSITION: u32 = 1 << 2;
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;
const P_WIN_GRAVITY: u32 = 1 << 9;

/// ICCCM window gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
    #[default]
    NorthWest,
    North,
    NorthEast,
    West,
    Center,
    East,
    SouthWest,
    South,
    SouthEast,
    Static,
}

impl Gravity {
    pub fn from_raw(value: u32) -> Self {
        match value {
            2 => Self::North,
            3 => Self::NorthEast,
            4 => Self::West,
            5 => Self::Center,
            6 => Self::East,
            7 => Self::SouthWest,
            8 => Self::South,
            9 => Self::SouthEast,
            10 => Self::Static,
            // 0 (ForgetGravity) and 1 both mean north-west for top-levels
            _ => Self::NorthWest,
        }
    }

    /// Offset from the position a client asked for to the frame position,
    /// so that the reference point named by the gravity stays put.
    pub fn frame_offset(self, margins: &Margins) -> (i32, i32) {
        let horizontal = (margins.left + margins.right) as i32;
        let vertical = (margins.top + margins.bottom) as i32;
        let dx = match self {
            Self::NorthWest | Self::West | Self::SouthWest => 0,
            Self::North | Self::Center | Self::South => -horizontal / 2,
            Self::NorthEast | Self::East | Self::SouthEast => -horizontal,
            Self::Static => -(margins.left as i32),
        };
        let dy = match self {
            Self::NorthWest | Self::North | Self::NorthEast => 0,
            Self::West | Self::Center | Self::East => -vertical / 2,
            Self::SouthWest | Self::South | Self::SouthEast => -vertical,
            Self::Static => -(margins.top as i32),
        };
        (dx, dy)
    }
}

/// Size hints (WM_NORMAL_HINTS), already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeHints {
    pub flags: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub width_inc: u32,
    pub height_inc: u32,
    pub base_width: u32,
    pub base_height: u32,
    pub min_aspect: Option<(u32, u32)>,
    pub max_aspect: Option<(u32, u32)>,
    pub gravity: Gravity,
}

impl Default for SizeHints {
    fn default() -> Self {
        Self {
            flags: 0,
            min_width: 1,
            min_height: 1,
            max_width: MAX_DIMENSION,
            max_height: MAX_DIMENSION,
            width_inc: 1,
            height_inc: 1,
            base_width: 0,
            base_height: 0,
            min_aspect: None,
            max_aspect: None,
            gravity: Gravity::NorthWest,
        }
    }
}

impl SizeHints {
    /// Parse the 18 CARDINALs of WM_SIZE_HINTS. Short or absent data
    /// yields the defaults.
    pub fn from_raw(values: Option<&[u32]>) -> Self {
        let Some(values) = values else {
            return Self::default();
        };
        if values.len() < 15 {
            debug!("Short WM_NORMAL_HINTS ({} values), using defaults", values.len());
            return Self::default();
        }

        let flags = values[0];
        let mut hints = Self {
            flags,
            ..Self::default()
        };

        let has_min = flags & P_MIN_SIZE != 0;
        let has_base = flags & P_BASE_SIZE != 0 && values.len() >= 17;

        if has_min {
            hints.min_width = values[5];
            hints.min_height = values[6];
        } else if has_base {
            // ICCCM: the base size doubles as minimum when no minimum is given
            hints.min_width = values[15];
            hints.min_height = values[16];
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_width = values[7];
            hints.max_height = values[8];
        }
        if flags & P_RESIZE_INC != 0 {
            hints.width_inc = values[9];
            hints.height_inc = values[10];
        }
        if flags & P_ASPECT != 0 {
            hints.min_aspect = Some((values[11], values[12]));
            hints.max_aspect = Some((values[13], values[14]));
        }
        if has_base {
            hints.base_width = values[15];
            hints.base_height = values[16];
        } else if has_min {
            hints.base_width = values[5];
            hints.base_height = values[6];
        }
        if flags & P_WIN_GRAVITY != 0 && values.len() >= 18 {
            hints.gravity = Gravity::from_raw(values[17]);
        }

        hints.normalize();
        hints
    }

    /// Repair values no client should send.
    fn normalize(&mut self) {
        self.min_width = self.min_width.clamp(1, MAX_DIMENSION);
        self.min_height = self.min_height.clamp(1, MAX_DIMENSION);
        self.max_width = self.max_width.clamp(self.min_width, MAX_DIMENSION);
        self.max_height = self.max_height.clamp(self.min_height, MAX_DIMENSION);
        self.width_inc = self.width_inc.max(1);
        self.height_inc = self.height_inc.max(1);
        self.base_width = self.base_width.min(self.max_width);
        self.base_height = self.base_height.min(self.max_height);
        for aspect in [&mut self.min_aspect, &mut self.max_aspect] {
            if matches!(aspect, Some((n, d)) if *n == 0 || *d == 0) {
                *aspect = None;
            }
        }
    }

    /// The client asked for its position explicitly (user or program).
    pub fn has_position(&self) -> bool {
        self.flags & (US_POSITION | P_POSITION) != 0
    }

    /// Minimum equals maximum: the window cannot be resized.
    pub fn is_fixed_size(&self) -> bool {
        self.flags & P_MIN_SIZE != 0
            && self.flags & P_MAX_SIZE != 0
            && self.min_width == self.max_width
            && self.min_height == self.max_height
    }

    /// Snap a client size to the min/max/increment/aspect constraints.
    /// Sizes already on the grid come back unchanged.
    pub fn constrain(&self, width: u32, height: u32) -> (u32, u32) {
        let mut w = width.clamp(self.min_width, self.max_width);
        let mut h = height.clamp(self.min_height, self.max_height);

        if let Some((num, den)) = self.min_aspect {
            // w / h >= num / den
            if (w as u64) * (den as u64) < (h as u64) * (num as u64) {
                h = ((w as u64 * den as u64) / num as u64) as u32;
            }
        }
        if let Some((num, den)) = self.max_aspect {
            // w / h <= num / den
            if (w as u64) * (den as u64) > (h as u64) * (num as u64) {
                w = ((h as u64 * num as u64) / den as u64) as u32;
            }
        }

        w = snap_to_increment(w, self.base_width, self.width_inc, self.min_width, self.max_width);
        h = snap_to_increment(h, self.base_height, self.height_inc, self.min_height, self.max_height);

        // Snapping can push the ratio out of range again. Step the long side
        // down the grid; the minimum size wins over the aspect.
        if let Some((num, den)) = self.min_aspect {
            let limit = ((w as u64 * den as u64) / num as u64).min(u32::MAX as u64) as u32;
            h = shrink_to(h, limit, self.height_inc, self.min_height);
        }
        if let Some((num, den)) = self.max_aspect {
            let limit = ((h as u64 * num as u64) / den as u64).min(u32::MAX as u64) as u32;
            w = shrink_to(w, limit, self.width_inc, self.min_width);
        }
        (w, h)
    }

    /// Size in increments above the base size, as shown during resizes.
    pub fn increments(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.saturating_sub(self.base_width) / self.width_inc,
            height.saturating_sub(self.base_height) / self.height_inc,
        )
    }
}

fn snap_to_increment(value: u32, base: u32, inc: u32, min: u32, max: u32) -> u32 {
    if inc <= 1 || value < base {
        return value.clamp(min, max);
    }
    let mut snapped = base + ((value - base) / inc) * inc;
    while snapped < min && snapped + inc <= max {
        snapped += inc;
    }
    snapped.clamp(min, max)
}

/// Take whole increments off `value` until it is at most `limit`, never
/// going below `min`.
fn shrink_to(value: u32, limit: u32, inc: u32, min: u32) -> u32 {
    if value <= limit {
        return value;
    }
    let inc = inc.max(1);
    let steps = (value - limit).div_ceil(inc);
    value.saturating_sub(steps.saturating_mul(inc)).max(min)
}

// WM_HINTS flags
const INPUT_HINT: u32 = 1 << 0;
const STATE_HINT: u32 = 1 << 1;
const WINDOW_GROUP_HINT: u32 = 1 << 6;
const URGENCY_HINT: u32 = 1 << 8;

/// WM hints (WM_HINTS)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmHints {
    pub flags: u32,
    /// Client relies on the window manager to get keyboard input
    pub input: bool,
    pub initial_state: IcccmState,
    pub window_group: Option<Window>,
    pub urgent: bool,
}

impl Default for WmHints {
    fn default() -> Self {
        Self {
            flags: 0,
            input: true,
            initial_state: IcccmState::Normal,
            window_group: None,
            urgent: false,
        }
    }
}

impl WmHints {
    /// Parse the 9 CARDINALs of WM_HINTS.
    pub fn from_raw(values: Option<&[u32]>) -> Self {
        let Some(values) = values.filter(|v| v.len() >= 9) else {
            return Self::default();
        };
        let flags = values[0];
        let mut hints = Self {
            flags,
            ..Self::default()
        };
        if flags & INPUT_HINT != 0 {
            hints.input = values[1] != 0;
        }
        if flags & STATE_HINT != 0 {
            hints.initial_state = IcccmState::from_raw(values[2]).unwrap_or(IcccmState::Normal);
        }
        if flags & WINDOW_GROUP_HINT != 0 && values[8] != 0 {
            hints.window_group = Some(values[8]);
        }
        hints.urgent = flags & URGENCY_HINT != 0;
        hints
    }
}

// _MOTIF_WM_HINTS
const MWM_HINTS_FUNCTIONS: u32 = 1 << 0;
const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

const MWM_FUNC_ALL: u32 = 1 << 0;
const MWM_FUNC_RESIZE: u32 = 1 << 1;
const MWM_FUNC_MOVE: u32 = 1 << 2;
const MWM_FUNC_MINIMIZE: u32 = 1 << 3;
const MWM_FUNC_MAXIMIZE: u32 = 1 << 4;
const MWM_FUNC_CLOSE: u32 = 1 << 5;

const MWM_DECOR_ALL: u32 = 1 << 0;
const MWM_DECOR_BORDER: u32 = 1 << 1;
const MWM_DECOR_RESIZEH: u32 = 1 << 2;
const MWM_DECOR_TITLE: u32 = 1 << 3;
const MWM_DECOR_MENU: u32 = 1 << 4;
const MWM_DECOR_MINIMIZE: u32 = 1 << 5;
const MWM_DECOR_MAXIMIZE: u32 = 1 << 6;

/// Motif hints (_MOTIF_WM_HINTS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MwmHints {
    pub flags: u32,
    pub functions: u32,
    pub decorations: u32,
}

impl MwmHints {
    pub fn from_raw(values: Option<&[u32]>) -> Option<Self> {
        let values = values.filter(|v| v.len() >= 3)?;
        Some(Self {
            flags: values[0],
            functions: values[1],
            decorations: values[2],
        })
    }

    fn apply(&self, decorations: &mut Decorations, functions: &mut Functions) {
        if self.flags & MWM_HINTS_DECORATIONS != 0 {
            let table = [
                (MWM_DECOR_BORDER, Decorations::BORDER),
                (MWM_DECOR_RESIZEH, Decorations::HANDLE),
                (MWM_DECOR_TITLE, Decorations::TITLEBAR),
                (MWM_DECOR_MENU, Decorations::MENU),
                (MWM_DECOR_MINIMIZE, Decorations::ICONIFY),
                (MWM_DECOR_MAXIMIZE, Decorations::MAXIMIZE),
            ];
            *decorations = mwm_bits(self.decorations, MWM_DECOR_ALL, &table);
            // A close button needs somewhere to live
            if decorations.contains(Decorations::TITLEBAR) {
                decorations.insert(Decorations::CLOSE);
            }
        }
        if self.flags & MWM_HINTS_FUNCTIONS != 0 {
            let table = [
                (MWM_FUNC_RESIZE, Functions::RESIZE),
                (MWM_FUNC_MOVE, Functions::MOVE),
                (MWM_FUNC_MINIMIZE, Functions::ICONIFY),
                (MWM_FUNC_MAXIMIZE, Functions::MAXIMIZE),
                (MWM_FUNC_CLOSE, Functions::CLOSE),
            ];
            *functions = mwm_bits(self.functions, MWM_FUNC_ALL, &table) | Functions::SHADE;
            if !functions.contains(Functions::CLOSE) {
                decorations.remove(Decorations::CLOSE);
            }
            if !functions.contains(Functions::ICONIFY) {
                decorations.remove(Decorations::ICONIFY);
            }
            if !functions.contains(Functions::MAXIMIZE) {
                decorations.remove(Decorations::MAXIMIZE);
            }
        }
    }
}

/// With the ALL bit set, the remaining bits list exclusions.
fn mwm_bits<F: bitflags::Flags + Copy>(raw: u32, all_bit: u32, table: &[(u32, F)]) -> F {
    let all = raw & all_bit != 0;
    let mut out = F::empty();
    for (bit, flag) in table {
        if (raw & bit != 0) != all {
            out.insert(*flag);
        }
    }
    out
}

// _BOXWM_HINTS flags
const BOX_HINT_ATTRIBUTES: u32 = 1 << 0;
const BOX_HINT_WORKSPACE: u32 = 1 << 1;
const BOX_HINT_DECORATION: u32 = 1 << 2;

// _BOXWM_HINTS attributes
pub const BOX_ATTR_SHADED: u32 = 1 << 0;
pub const BOX_ATTR_MAX_VERT: u32 = 1 << 1;
pub const BOX_ATTR_MAX_HORZ: u32 = 1 << 2;
pub const BOX_ATTR_OMNIPRESENT: u32 = 1 << 3;

/// Decoration presets selectable through _BOXWM_HINTS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationPreset {
    None,
    Normal,
    Tiny,
    Tool,
}

impl DecorationPreset {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Normal),
            2 => Some(Self::Tiny),
            3 => Some(Self::Tool),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Normal => 1,
            Self::Tiny => 2,
            Self::Tool => 3,
        }
    }

    pub fn decorations(self) -> Decorations {
        match self {
            Self::None => Decorations::empty(),
            Self::Normal => Decorations::all(),
            Self::Tiny => {
                Decorations::TITLEBAR | Decorations::BORDER | Decorations::ICONIFY | Decorations::MENU
            }
            Self::Tool => Decorations::TITLEBAR | Decorations::BORDER | Decorations::CLOSE,
        }
    }
}

/// Window-manager specific hints (_BOXWM_HINTS)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerHints {
    pub attributes: Option<u32>,
    pub workspace: Option<usize>,
    pub decoration: Option<DecorationPreset>,
}

impl ManagerHints {
    pub fn from_raw(values: Option<&[u32]>) -> Option<Self> {
        let values = values.filter(|v| v.len() >= 4)?;
        let flags = values[0];
        Some(Self {
            attributes: (flags & BOX_HINT_ATTRIBUTES != 0).then_some(values[1]),
            workspace: (flags & BOX_HINT_WORKSPACE != 0).then_some(values[2] as usize),
            decoration: if flags & BOX_HINT_DECORATION != 0 {
                DecorationPreset::from_raw(values[3])
            } else {
                None
            },
        })
    }
}

/// Work out which decorations and functions a window gets.
///
/// Manager hints override Motif hints, which override the defaults. Fixed
/// size and transient windows lose their border, handle and maximize button
/// whatever the hints say.
pub fn resolve_decorations(
    mwm: Option<&MwmHints>,
    manager: Option<&ManagerHints>,
    size: &SizeHints,
    transient: bool,
    window_type: WindowType,
) -> (Decorations, Functions) {
    let mut decorations = Decorations::default();
    let mut functions = Functions::default();

    if let Some(mwm) = mwm {
        mwm.apply(&mut decorations, &mut functions);
    }
    if let Some(preset) = manager.and_then(|m| m.decoration) {
        decorations = preset.decorations();
    }

    match window_type {
        WindowType::Dock | WindowType::Desktop => {
            decorations = Decorations::empty();
            functions = Functions::empty();
        }
        WindowType::Splash => decorations = Decorations::empty(),
        _ => {}
    }

    if size.is_fixed_size() || transient {
        decorations.remove(Decorations::BORDER | Decorations::HANDLE | Decorations::MAXIMIZE);
        functions.remove(Functions::MAXIMIZE);
    }
    if size.is_fixed_size() {
        functions.remove(Functions::RESIZE);
    }

    (decorations, functions)
}

/// Frame position for a client-requested position, honouring gravity.
pub fn gravitate(requested: Geometry, gravity: Gravity, margins: &Margins) -> (i32, i32) {
    let (dx, dy) = gravity.frame_offset(margins);
    (requested.x + dx, requested.y + dy)
}
