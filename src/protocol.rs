//! Outbound client and backend requests.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use smithay::utils::{Logical, Point, Rectangle, Size};
pub use strata_ipc::{ClientId, OutputId, SurfaceId};

use crate::cursor::CursorImage;

/// Request emitted by the compositor core.
///
/// Requests are queued while an event is processed and drained by the
/// backend afterwards.
#[derive(PartialEq, Clone, Debug)]
pub enum Request {
    /// Ask a native toplevel or layer surface to resize.
    Configure { surface: SurfaceId, serial: u32, size: Size<i32, Logical> },
    /// Reposition and resize an X11 window.
    ConfigureX11 { surface: SurfaceId, window: u32, geometry: Rectangle<i32, Logical> },
    /// Ask a surface to close.
    Close { surface: SurfaceId },
    /// Change the activation state of a toplevel.
    Activate { surface: SurfaceId, activated: bool },

    KeyboardEnter { surface: SurfaceId, keys: Vec<u32>, modifiers: ModifierState },
    KeyboardLeave { surface: SurfaceId },
    Key { surface: SurfaceId, time: u32, keycode: u32, pressed: bool },
    KeyboardModifiers { surface: SurfaceId, modifiers: ModifierState },

    PointerEnter { surface: SurfaceId, location: Point<f64, Logical> },
    PointerLeave { surface: SurfaceId },
    PointerMotion { surface: SurfaceId, time: u32, location: Point<f64, Logical> },
    PointerButton { surface: SurfaceId, time: u32, button: u32, pressed: bool },
    PointerAxis { surface: SurfaceId, time: u32, horizontal: f64, vertical: f64 },
    PointerFrame { surface: SurfaceId },

    /// Change the rendered cursor image.
    CursorImage(CursorImage),

    /// Key event for the keybinding registrant.
    KeybindingKey { client: ClientId, time: u32, keycode: u32, modifiers: u32, pressed: bool },

    /// Global pointer position for the mouse grabber.
    GrabberMotion { client: ClientId, location: Point<i32, Logical> },
    /// Pointer button for the mouse grabber.
    GrabberButton { client: ClientId, time: u32, button: u32, pressed: bool },

    /// Post a protocol error to a misbehaving client.
    ProtocolError { client: ClientId, error: ProtocolError },

    /// Output has pending damage and needs a new frame.
    ScheduleFrame { output: OutputId },

    /// Switch to a different virtual terminal.
    ChangeVt(i32),

    /// Shut down the compositor.
    Terminate,
}

/// Keyboard modifier state.
#[derive(Default, PartialEq, Eq, Copy, Clone, Debug)]
pub struct ModifierState {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

impl ModifierState {
    /// Effective modifier mask.
    pub fn mask(&self) -> u32 {
        self.depressed | self.latched | self.locked
    }
}

/// Client protocol violation.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ProtocolError {
    /// Layer surface margins exceed the available space.
    InvalidLayerGeometry(SurfaceId),
    /// Layer surface was created without any output present.
    NoOutput(SurfaceId),
    /// Mouse grab requested while another client holds it.
    AlreadyGrabbed,
    /// Mouse release requested by a client without the grab.
    NotGrabbed,
    /// Keybindings are owned by another client.
    KeybindingsTaken,
    /// Keybinding request from a client which does not own the keybindings.
    NotRegistrant,
}

impl Display for ProtocolError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLayerGeometry(surface) => {
                write!(f, "layer surface {} has negative size after margins", surface.0)
            },
            Self::NoOutput(surface) => {
                write!(f, "no output available for layer surface {}", surface.0)
            },
            Self::AlreadyGrabbed => write!(f, "mouse has already been grabbed"),
            Self::NotGrabbed => write!(f, "mouse has not been grabbed by this client"),
            Self::KeybindingsTaken => write!(f, "keybindings are bound by another client"),
            Self::NotRegistrant => write!(f, "client does not own the keybindings"),
        }
    }
}

impl Error for ProtocolError {}

/// Monotonic configure serial source.
#[derive(Default, Debug)]
pub struct SerialCounter(u32);

impl SerialCounter {
    /// Get the next serial.
    ///
    /// Serials are never zero.
    pub fn next_serial(&mut self) -> u32 {
        self.0 = self.0.wrapping_add(1).max(1);
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn serials_skip_zero() {
        let mut serial = SerialCounter(u32::MAX - 1);
        assert_eq!(serial.next_serial(), u32::MAX);
        assert_eq!(serial.next_serial(), 1);
    }

    #[test]
    fn effective_modifiers() {
        let modifiers = ModifierState { depressed: 1, latched: 4, locked: 2, group: 1 };
        assert_eq!(modifiers.mask(), 7);
    }
}
