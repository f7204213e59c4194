//! Input focus.

use smithay::utils::{Logical, Point};
use tracing::debug;

use crate::protocol::{ClientId, ModifierState, Request, SurfaceId};

/// Entity owning a focused surface.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum FocusTarget {
    View(SurfaceId),
    Layer(SurfaceId),
}

/// Surface receiving pointer events.
#[derive(PartialEq, Copy, Clone, Debug)]
pub struct PointerFocus {
    pub surface: SurfaceId,
    pub target: FocusTarget,
    pub client: ClientId,
    /// Pointer position in surface-local coordinates.
    pub location: Point<f64, Logical>,
}

/// Surface receiving keyboard events.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct KeyboardFocus {
    pub surface: SurfaceId,
    pub client: ClientId,
}

/// Pointer and keyboard focus holder.
#[derive(Default, Debug)]
pub struct Seat {
    pub modifiers: ModifierState,
    pointer_focus: Option<PointerFocus>,
    view_focus: Option<KeyboardFocus>,
    layer_focus: Option<KeyboardFocus>,
    pressed_keys: Vec<u32>,
}

impl Seat {
    pub fn pointer_focus(&self) -> Option<PointerFocus> {
        self.pointer_focus
    }

    /// Focused toplevel, even while a layer holds the keyboard.
    pub fn view_focus(&self) -> Option<KeyboardFocus> {
        self.view_focus
    }

    /// Layer surface with exclusive keyboard focus.
    pub fn layer_focus(&self) -> Option<KeyboardFocus> {
        self.layer_focus
    }

    /// Surface receiving keyboard input.
    pub fn keyboard_focus(&self) -> Option<KeyboardFocus> {
        self.layer_focus.or(self.view_focus)
    }

    /// Keycodes which are currently held down.
    pub fn pressed_keys(&self) -> &[u32] {
        &self.pressed_keys
    }

    /// Track a key press or release.
    pub fn update_key(&mut self, keycode: u32, pressed: bool) {
        let index = self.pressed_keys.iter().position(|key| *key == keycode);
        match (index, pressed) {
            (None, true) => self.pressed_keys.push(keycode),
            (Some(index), false) => {
                self.pressed_keys.remove(index);
            },
            _ => (),
        }
    }

    /// Move the pointer focus.
    ///
    /// Moving within the focused surface reports motion, otherwise the old
    /// surface is left and the new one entered.
    pub fn update_pointer_focus(
        &mut self,
        focus: Option<PointerFocus>,
        time: u32,
        requests: &mut Vec<Request>,
    ) {
        match (self.pointer_focus, focus) {
            (Some(old), Some(new)) if old.surface == new.surface => {
                let location = new.location;
                requests.push(Request::PointerMotion { surface: new.surface, time, location });
            },
            (old, new) => {
                if let Some(old) = old {
                    requests.push(Request::PointerLeave { surface: old.surface });
                }

                if let Some(new) = new {
                    let location = new.location;
                    requests.push(Request::PointerEnter { surface: new.surface, location });
                }
            },
        }

        self.pointer_focus = focus;
    }

    /// Change the focused toplevel.
    pub fn set_view_focus(&mut self, focus: Option<KeyboardFocus>, requests: &mut Vec<Request>) {
        let old = self.keyboard_focus();
        self.view_focus = focus;
        self.sync_keyboard(old, requests);
    }

    /// Change the exclusive layer focus.
    pub fn set_layer_focus(&mut self, focus: Option<KeyboardFocus>, requests: &mut Vec<Request>) {
        if self.layer_focus != focus {
            debug!("Layer keyboard focus changed to {:?}", focus.map(|focus| focus.surface));
        }

        let old = self.keyboard_focus();
        self.layer_focus = focus;
        self.sync_keyboard(old, requests);
    }

    /// Drop all references to a destroyed surface.
    ///
    /// No leave events are sent to the destroyed surface.
    pub fn forget_surface(&mut self, surface: SurfaceId, requests: &mut Vec<Request>) {
        if self.pointer_focus.map_or(false, |focus| focus.surface == surface) {
            self.pointer_focus = None;
        }

        let old = self.keyboard_focus().filter(|focus| focus.surface != surface);
        if self.view_focus.map_or(false, |focus| focus.surface == surface) {
            self.view_focus = None;
        }
        if self.layer_focus.map_or(false, |focus| focus.surface == surface) {
            self.layer_focus = None;
        }
        self.sync_keyboard(old, requests);
    }

    /// Drop pointer focus owned by a destroyed view or layer.
    pub fn forget_target(&mut self, target: FocusTarget) {
        if self.pointer_focus.map_or(false, |focus| focus.target == target) {
            self.pointer_focus = None;
        }
    }

    /// Send enter and leave events after a keyboard focus change.
    fn sync_keyboard(&mut self, old: Option<KeyboardFocus>, requests: &mut Vec<Request>) {
        let new = self.keyboard_focus();
        if old == new {
            return;
        }

        if let Some(old) = old {
            requests.push(Request::KeyboardLeave { surface: old.surface });
        }

        if let Some(new) = new {
            requests.push(Request::KeyboardEnter {
                surface: new.surface,
                keys: self.pressed_keys.clone(),
                modifiers: self.modifiers,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn focus(id: u32) -> Option<KeyboardFocus> {
        Some(KeyboardFocus { surface: SurfaceId(id), client: ClientId(id) })
    }

    fn pointer(id: u32, x: f64) -> Option<PointerFocus> {
        Some(PointerFocus {
            surface: SurfaceId(id),
            target: FocusTarget::View(SurfaceId(id)),
            client: ClientId(id),
            location: (x, 0.).into(),
        })
    }

    #[test]
    fn pointer_enter_motion_leave() {
        let mut seat = Seat::default();
        let mut requests = Vec::new();

        seat.update_pointer_focus(pointer(1, 1.), 0, &mut requests);
        seat.update_pointer_focus(pointer(1, 2.), 5, &mut requests);
        seat.update_pointer_focus(pointer(2, 3.), 6, &mut requests);
        seat.update_pointer_focus(None, 7, &mut requests);

        assert_eq!(requests, vec![
            Request::PointerEnter { surface: SurfaceId(1), location: (1., 0.).into() },
            Request::PointerMotion { surface: SurfaceId(1), time: 5, location: (2., 0.).into() },
            Request::PointerLeave { surface: SurfaceId(1) },
            Request::PointerEnter { surface: SurfaceId(2), location: (3., 0.).into() },
            Request::PointerLeave { surface: SurfaceId(2) },
        ]);
    }

    #[test]
    fn layer_focus_overrides_view() {
        let mut seat = Seat::default();
        let mut requests = Vec::new();
        seat.update_key(30, true);

        seat.set_view_focus(focus(1), &mut requests);
        seat.set_layer_focus(focus(2), &mut requests);

        // View focus changes are deferred while a layer holds the keyboard.
        seat.set_view_focus(focus(3), &mut requests);
        assert_eq!(seat.keyboard_focus(), focus(2));
        assert_eq!(seat.layer_focus(), focus(2));

        seat.set_layer_focus(None, &mut requests);
        assert_eq!(seat.layer_focus(), None);

        let enter = |id| Request::KeyboardEnter {
            surface: SurfaceId(id),
            keys: vec![30],
            modifiers: ModifierState::default(),
        };
        assert_eq!(requests, vec![
            enter(1),
            Request::KeyboardLeave { surface: SurfaceId(1) },
            enter(2),
            Request::KeyboardLeave { surface: SurfaceId(2) },
            enter(3),
        ]);
    }

    #[test]
    fn destroyed_surface_gets_no_leave() {
        let mut seat = Seat::default();
        let mut requests = Vec::new();

        seat.set_view_focus(focus(1), &mut requests);
        seat.update_pointer_focus(pointer(1, 0.), 0, &mut requests);
        requests.clear();

        seat.forget_surface(SurfaceId(1), &mut requests);
        assert!(requests.is_empty());
        assert_eq!(seat.keyboard_focus(), None);
        assert_eq!(seat.pointer_focus(), None);
    }

    #[test]
    fn pressed_keys_tracked() {
        let mut seat = Seat::default();
        seat.update_key(10, true);
        seat.update_key(11, true);
        seat.update_key(10, true);
        seat.update_key(10, false);
        assert_eq!(seat.pressed_keys(), &[11]);
    }
}
