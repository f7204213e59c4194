//! Strata event interface.
//!
//! This library describes the already decoded backend and client protocol
//! events consumed by the Strata compositor core. Events are exchanged as one
//! JSON object per line.

use std::error::Error;
use std::io::BufRead;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
#[cfg(feature = "smithay")]
use smithay::utils::{Logical, Point, Rectangle, Size};
#[cfg(feature = "smithay")]
use smithay::wayland::shell::wlr_layer::{
    Anchor, ExclusiveZone, KeyboardInteractivity, Layer, Margins,
};

/// Client surface handle.
#[derive(Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Debug)]
#[serde(transparent)]
pub struct SurfaceId(pub u32);

/// Client connection handle.
#[derive(Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Debug)]
#[serde(transparent)]
pub struct ClientId(pub u32);

/// Output handle.
#[derive(Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord, Copy, Clone, Debug)]
#[serde(transparent)]
pub struct OutputId(pub u32);

/// Decoded backend or client event.
#[derive(Deserialize, Serialize, PartialEq, Clone, Debug)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    /// Output was connected.
    NewOutput {
        output: OutputId,
        name: String,
        #[serde(default)]
        modes: Vec<Mode>,
    },
    /// Output switched to a different mode.
    OutputMode { output: OutputId, mode: Mode },
    /// Output was disconnected.
    DestroyOutput { output: OutputId },

    /// Client created a new toplevel surface.
    NewToplevel {
        client: ClientId,
        surface: SurfaceId,
        #[serde(default)]
        kind: ToplevelKind,
    },
    /// Toplevel surface became visible.
    Map { surface: SurfaceId },
    /// Toplevel surface became invisible.
    Unmap { surface: SurfaceId },
    /// Toplevel or layer surface was destroyed.
    DestroySurface { surface: SurfaceId },
    /// Toplevel surface committed a new buffer.
    Commit {
        surface: SurfaceId,
        size: Dimensions,
        /// Surface-local damage; `None` damages the entire surface tree.
        #[serde(default)]
        damage: Option<Vec<Rect>>,
        #[serde(default)]
        subsurfaces: Vec<Subsurface>,
    },
    /// Client acknowledged a configure.
    AckConfigure { surface: SurfaceId, serial: u32 },
    /// X11 client requested new window geometry.
    ConfigureRequest { surface: SurfaceId, geometry: Rect },
    /// Client requested an interactive move.
    RequestMove { surface: SurfaceId },
    /// Client requested an interactive resize.
    RequestResize { surface: SurfaceId, edges: u32 },

    /// Client created a layer shell surface.
    NewLayerSurface {
        client: ClientId,
        surface: SurfaceId,
        #[serde(default)]
        output: Option<OutputId>,
        layer: LayerTier,
        #[serde(default)]
        state: LayerState,
    },
    /// Layer surface committed new state.
    LayerState { surface: SurfaceId, state: LayerState },

    /// Relative pointer motion.
    PointerMotion {
        #[serde(default)]
        time: u32,
        dx: f64,
        dy: f64,
    },
    /// Absolute pointer motion, normalized to `0.0..=1.0`.
    PointerMotionAbsolute {
        #[serde(default)]
        time: u32,
        x: f64,
        y: f64,
    },
    /// Pointer button press or release.
    PointerButton {
        #[serde(default)]
        time: u32,
        button: u32,
        state: ButtonState,
    },
    /// Scroll event.
    PointerAxis {
        #[serde(default)]
        time: u32,
        #[serde(default)]
        horizontal: f64,
        #[serde(default)]
        vertical: f64,
    },
    /// End of a group of pointer events.
    PointerFrame,

    /// Keyboard key press or release.
    Key {
        #[serde(default)]
        time: u32,
        keycode: u32,
        state: KeyState,
        #[serde(default)]
        keysyms: Vec<u32>,
    },
    /// Keyboard modifier state change.
    Modifiers {
        #[serde(default)]
        depressed: u32,
        #[serde(default)]
        latched: u32,
        #[serde(default)]
        locked: u32,
        #[serde(default)]
        group: u32,
    },

    /// Client set its pointer image.
    SetCursor {
        client: ClientId,
        #[serde(default)]
        surface: Option<SurfaceId>,
        #[serde(default)]
        hotspot: Location,
    },
    /// Client requested ownership of the global keybindings.
    BindKeybindings { client: ClientId },
    /// Client registered a global keybinding.
    RegisterKeybinding { client: ClientId, keycode: u32, modifiers: u32 },
    /// Client cleared all its global keybindings.
    ClearKeybindings { client: ClientId },
    /// Client requested a global pointer grab.
    GrabMouse { client: ClientId, cursor: String },
    /// Client released its global pointer grab.
    ReleaseMouse { client: ClientId },
    /// Client connection was closed.
    ClientDisconnected { client: ClientId },
}

impl FromStr for Event {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// Read events from a line-based script.
///
/// Empty lines and lines starting with `#` are skipped.
pub fn read_events<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<Event, Box<dyn Error + Send + Sync>>> {
    reader.lines().filter_map(|line| {
        let line = match line {
            Ok(line) => line,
            Err(err) => return Some(Err(err.into())),
        };

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        Some(line.parse::<Event>().map_err(|err| err.into()))
    })
}

/// Toplevel surface protocol.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum ToplevelKind {
    /// Native xdg_shell toplevel.
    #[default]
    Xdg,
    /// Xwayland window.
    X11 { window: u32 },
}

/// Output mode.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Debug)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    /// Refresh rate in mHz.
    #[serde(default)]
    pub refresh: i32,
    #[serde(default)]
    pub preferred: bool,
}

/// Committed subsurface.
#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
pub struct Subsurface {
    pub surface: SurfaceId,
    /// Offset from the parent surface.
    #[serde(default)]
    pub location: Location,
    pub size: Dimensions,
    #[serde(default)]
    pub children: Vec<Subsurface>,
}

/// Layer shell tier.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum LayerTier {
    Background,
    Bottom,
    Top,
    Overlay,
}

/// Layer keyboard interactivity.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum Interactivity {
    #[default]
    None,
    Exclusive,
    OnDemand,
}

/// Double-buffered layer surface state.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
#[serde(default)]
pub struct LayerState {
    /// Anchor bitmask (top = 1, bottom = 2, left = 4, right = 8).
    pub anchor: u32,
    pub margin: LayerMargin,
    pub exclusive_zone: i32,
    pub size: Dimensions,
    pub keyboard_interactivity: Interactivity,
}

/// Layer margins.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
#[serde(default)]
pub struct LayerMargin {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Rectangle on the wire.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Size on the wire.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
}

/// Integer position on the wire.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

/// Pointer button state.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Keyboard key state.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum KeyState {
    Pressed,
    Released,
}

#[cfg(feature = "smithay")]
impl From<Rect> for Rectangle<i32, Logical> {
    fn from(rect: Rect) -> Self {
        Rectangle::from_loc_and_size((rect.x, rect.y), (rect.width, rect.height))
    }
}

#[cfg(feature = "smithay")]
impl From<Dimensions> for Size<i32, Logical> {
    fn from(size: Dimensions) -> Self {
        Size::from((size.width, size.height))
    }
}

#[cfg(feature = "smithay")]
impl From<Location> for Point<i32, Logical> {
    fn from(location: Location) -> Self {
        Point::from((location.x, location.y))
    }
}

#[cfg(feature = "smithay")]
impl From<LayerTier> for Layer {
    fn from(tier: LayerTier) -> Self {
        match tier {
            LayerTier::Background => Layer::Background,
            LayerTier::Bottom => Layer::Bottom,
            LayerTier::Top => Layer::Top,
            LayerTier::Overlay => Layer::Overlay,
        }
    }
}

#[cfg(feature = "smithay")]
impl From<Interactivity> for KeyboardInteractivity {
    fn from(interactivity: Interactivity) -> Self {
        match interactivity {
            Interactivity::None => KeyboardInteractivity::None,
            Interactivity::Exclusive => KeyboardInteractivity::Exclusive,
            Interactivity::OnDemand => KeyboardInteractivity::OnDemand,
        }
    }
}

#[cfg(feature = "smithay")]
impl From<LayerMargin> for Margins {
    fn from(margin: LayerMargin) -> Self {
        Margins { top: margin.top, right: margin.right, bottom: margin.bottom, left: margin.left }
    }
}

#[cfg(feature = "smithay")]
impl LayerState {
    /// Edges the surface is anchored to.
    pub fn anchor(&self) -> Anchor {
        Anchor::from_bits_truncate(self.anchor)
    }

    /// Exclusive zone in protocol form.
    pub fn exclusive_zone(&self) -> ExclusiveZone {
        match self.exclusive_zone {
            zone if zone > 0 => ExclusiveZone::Exclusive(zone as u32),
            0 => ExclusiveZone::Neutral,
            _ => ExclusiveZone::DontCare,
        }
    }
}
