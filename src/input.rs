//! Input event handling.

use smithay::utils::Point;
use tracing::{debug, info};
use xkbcommon::xkb::keysyms;

use crate::config::VT_COUNT;
use crate::cursor::{self, CursorMode};
use crate::geometry::RectExt;
use crate::keybindings::ModifierMask;
use crate::protocol::{ModifierState, Request};
use crate::seat::FocusTarget;
use crate::strata::Strata;

impl Strata {
    /// Handle a keyboard key.
    pub(crate) fn key(&mut self, time: u32, keycode: u32, pressed: bool, symbols: &[u32]) {
        self.seat.update_key(keycode, pressed);

        if self.handle_reserved_key(symbols, pressed) {
            return;
        }

        let focus = self.seat.keyboard_focus();
        let modifiers = self.seat.modifiers.mask();
        let client = focus.map(|focus| focus.client);
        if self.keybindings.on_key(keycode, modifiers, pressed, time, client, &mut self.requests) {
            return;
        }

        if let Some(focus) = focus {
            self.requests.push(Request::Key { surface: focus.surface, time, keycode, pressed });
        }
    }

    /// Intercept keys which are never delivered to clients.
    fn handle_reserved_key(&mut self, symbols: &[u32], pressed: bool) -> bool {
        let modifiers = ModifierMask::from_bits_truncate(self.seat.modifiers.depressed);

        for &keysym in symbols {
            let vt = keysym.wrapping_sub(keysyms::KEY_XF86Switch_VT_1);
            if vt < VT_COUNT {
                if pressed {
                    info!("Switching to VT {}", vt + 1);
                    self.requests.push(Request::ChangeVt(vt as i32 + 1));
                }
                return true;
            }

            let terminate = ModifierMask::SHIFT | ModifierMask::CONTROL;
            if keysym == keysyms::KEY_Escape && modifiers.contains(terminate) {
                if pressed {
                    info!("Terminating compositor");
                    self.terminate();
                }
                return true;
            }
        }

        false
    }

    /// Handle a keyboard modifier change.
    pub(crate) fn modifiers(&mut self, modifiers: ModifierState) {
        self.seat.modifiers = modifiers;

        if let Some(focus) = self.seat.keyboard_focus() {
            self.requests.push(Request::KeyboardModifiers { surface: focus.surface, modifiers });
        }
    }

    /// Handle relative pointer motion.
    pub(crate) fn pointer_motion(&mut self, time: u32, dx: f64, dy: f64) {
        let bounds = match self.outputs.bounding_box() {
            Some(bounds) => bounds,
            None => return,
        };

        let position = self.cursor.position + Point::from((dx, dy));
        self.cursor.position = bounds.clamp_point(position);
        self.process_motion(time);
    }

    /// Handle pointer motion in normalized coordinates.
    pub(crate) fn pointer_motion_absolute(&mut self, time: u32, x: f64, y: f64) {
        let bounds = match self.outputs.bounding_box() {
            Some(bounds) => bounds,
            None => return,
        };

        self.cursor.position = bounds.denormalize(x, y);
        self.process_motion(time);
    }

    /// Apply pointer movement to the active grab or the pointer focus.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn process_motion(&mut self, time: u32) {
        let position = self.cursor.position;

        match self.cursor.mode {
            CursorMode::Move { view, offset, .. } => {
                self.damage_view(view, None);
                if let Some(view) = self.views.get_mut(view) {
                    view.set_location(cursor::move_origin(position, offset));
                }
                self.damage_view(view, None);
            },
            CursorMode::Resize { view, pointer, original, edges } => {
                let delta = position - pointer;
                let delta = Point::from((delta.x as i32, delta.y as i32));
                let geometry = cursor::resize_geometry(original, edges, delta);
                let serial = self.serials.next_serial();
                if let Some(view) = self.views.get_mut(view) {
                    let request = view.request_geometry(geometry, serial);
                    self.requests.push(request);
                }
            },
            CursorMode::Passthrough => {
                let focus = self.hit_test(position);

                let target = focus.map(|focus| focus.target);
                let over_view = matches!(target, Some(FocusTarget::View(_)));
                if !over_view && self.cursor.has_client_image() {
                    if let Some(image) = self.cursor.set_client_image(None) {
                        self.requests.push(Request::CursorImage(image));
                    }
                }

                self.seat.update_pointer_focus(focus, time, &mut self.requests);
            },
        }

        if let Some(output) = self.outputs.output_at(position) {
            self.outputs.set_active(output);
        }

        if let Some(client) = self.grabber.client() {
            let location = Point::from((position.x as i32, position.y as i32));
            self.requests.push(Request::GrabberMotion { client, location });
        }
    }

    /// Handle a pointer button.
    pub(crate) fn pointer_button(&mut self, time: u32, button: u32, pressed: bool) {
        if !pressed {
            self.cursor.end_grab();
        }

        if let Some(client) = self.grabber.client() {
            self.requests.push(Request::GrabberButton { client, time, button, pressed });
            return;
        }

        if let Some(focus) = self.seat.pointer_focus() {
            let surface = focus.surface;
            self.requests.push(Request::PointerButton { surface, time, button, pressed });
        }

        if !pressed || self.cursor.mode != CursorMode::Passthrough {
            return;
        }

        match self.hit_test(self.cursor.position).map(|focus| focus.target) {
            Some(FocusTarget::View(view)) => self.focus_view(view),
            Some(FocusTarget::Layer(layer)) => debug!("Ignoring click focus for layer {layer:?}"),
            None => (),
        }
    }

    /// Handle a scroll event.
    pub(crate) fn pointer_axis(&mut self, time: u32, horizontal: f64, vertical: f64) {
        if let Some(focus) = self.seat.pointer_focus() {
            let surface = focus.surface;
            self.requests.push(Request::PointerAxis { surface, time, horizontal, vertical });
        }
    }

    /// Handle the end of a pointer event group.
    pub(crate) fn pointer_frame(&mut self) {
        if let Some(focus) = self.seat.pointer_focus() {
            self.requests.push(Request::PointerFrame { surface: focus.surface });
        }
    }
}
