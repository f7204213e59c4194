//! Strata compositor state.

use std::mem;

use smithay::utils::{Logical, Point, Rectangle};
use smithay::wayland::shell::wlr_layer::Layer;
use strata_ipc::{ButtonState, Event, KeyState, LayerState, Mode, ToplevelKind};
use tracing::{debug, trace, warn};

use crate::cursor::{Cursor, MouseGrabber, ResizeEdges};
use crate::damage::Region;
use crate::geometry::RectExt;
use crate::keybindings::Keybindings;
use crate::layer::LayerSurface;
use crate::output::{Output, Outputs};
use crate::protocol::{
    ClientId, ModifierState, OutputId, ProtocolError, Request, SerialCounter, SurfaceId,
};
use crate::seat::{FocusTarget, KeyboardFocus, PointerFocus, Seat};
use crate::views::surface::SurfaceTree;
use crate::views::view::View;
use crate::views::Views;

/// Surface drawn on an output.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct RenderElement {
    pub surface: SurfaceId,
    /// Output-local surface geometry.
    pub geometry: Rectangle<i32, Logical>,
}

/// Shared compositor state.
#[derive(Default, Debug)]
pub struct Strata {
    pub outputs: Outputs,
    pub views: Views,
    pub seat: Seat,
    pub cursor: Cursor,
    pub keybindings: Keybindings,
    pub grabber: MouseGrabber,

    pub(crate) serials: SerialCounter,
    pub(crate) requests: Vec<Request>,

    terminated: bool,
}

impl Strata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a single backend or client event.
    ///
    /// Resulting requests are queued until [`Self::drain_requests`].
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn handle_event(&mut self, event: Event) {
        trace!("Handling {event:?}");

        match event {
            Event::NewOutput { output, name, modes } => self.add_output(output, name, modes),
            Event::OutputMode { output, mode } => self.set_output_mode(output, mode),
            Event::DestroyOutput { output } => self.remove_output(output),
            Event::NewToplevel { client, surface, kind } => self.add_view(client, surface, kind),
            Event::Map { surface } => self.map(surface),
            Event::Unmap { surface } => self.unmap(surface),
            Event::DestroySurface { surface } => self.destroy_surface(surface),
            Event::Commit { surface, size, damage, subsurfaces } => {
                let tree = SurfaceTree::from_commit(surface, size.into(), &subsurfaces);
                let damage = damage.map(|rects| {
                    rects.into_iter().map(Rectangle::<i32, Logical>::from).collect::<Region>()
                });
                self.commit(tree, damage);
            },
            Event::AckConfigure { surface, serial } => {
                if let Some(view) = self.views.get_mut(surface) {
                    view.ack_configure(serial);
                }
            },
            Event::ConfigureRequest { surface, geometry } => {
                self.configure_x11(surface, geometry.into());
            },
            Event::RequestMove { surface } => self.request_move(surface),
            Event::RequestResize { surface, edges } => {
                self.request_resize(surface, ResizeEdges::from_bits_truncate(edges));
            },
            Event::NewLayerSurface { client, surface, output, layer, state } => {
                self.add_layer(client, surface, output, layer.into(), state);
            },
            Event::LayerState { surface, state } => self.set_layer_state(surface, state),
            Event::PointerMotion { time, dx, dy } => self.pointer_motion(time, dx, dy),
            Event::PointerMotionAbsolute { time, x, y } => {
                self.pointer_motion_absolute(time, x, y);
            },
            Event::PointerButton { time, button, state } => {
                self.pointer_button(time, button, state == ButtonState::Pressed);
            },
            Event::PointerAxis { time, horizontal, vertical } => {
                self.pointer_axis(time, horizontal, vertical);
            },
            Event::PointerFrame => self.pointer_frame(),
            Event::Key { time, keycode, state, keysyms } => {
                self.key(time, keycode, state == KeyState::Pressed, &keysyms);
            },
            Event::Modifiers { depressed, latched, locked, group } => {
                self.modifiers(ModifierState { depressed, latched, locked, group });
            },
            Event::SetCursor { client, surface, hotspot } => {
                self.set_cursor(client, surface, hotspot.into());
            },
            Event::BindKeybindings { client } => {
                let result = self.keybindings.bind(client);
                self.check_protocol(client, result);
            },
            Event::RegisterKeybinding { client, keycode, modifiers } => {
                let result = self.keybindings.register(client, keycode, modifiers);
                self.check_protocol(client, result);
            },
            Event::ClearKeybindings { client } => {
                let result = self.keybindings.clear(client);
                self.check_protocol(client, result);
            },
            Event::GrabMouse { client, cursor } => self.grab_mouse(client, cursor),
            Event::ReleaseMouse { client } => self.release_mouse(client),
            Event::ClientDisconnected { client } => self.disconnect(client),
        }

        self.schedule_frames();
    }

    /// Take all pending requests.
    pub fn drain_requests(&mut self) -> Vec<Request> {
        mem::take(&mut self.requests)
    }

    /// Take the accumulated damage of every damaged output.
    pub fn take_damage(&mut self) -> Vec<(OutputId, Region)> {
        self.outputs
            .iter_mut()
            .filter(|output| !output.damage.region().is_empty())
            .map(|output| (output.id, output.damage.take_and_clear()))
            .collect()
    }

    /// Check if termination was requested.
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    pub(crate) fn terminate(&mut self) {
        self.terminated = true;
        self.requests.push(Request::Terminate);
    }

    /// Surfaces of an output in drawing order, bottom-most first.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn render_elements(&self, output: OutputId) -> Vec<RenderElement> {
        let output = match self.outputs.get(output) {
            Some(output) => output,
            None => return Vec::new(),
        };

        let layer_elements = |layer: Layer| {
            output
                .layers
                .list(layer)
                .iter()
                .filter(|layer| layer.mapped)
                .map(|layer| RenderElement { surface: layer.surface, geometry: layer.geometry })
        };

        let output_geometry = output.geometry();
        let views = self
            .views
            .iter()
            .rev()
            .filter(|view| view.mapped && view.geometry().overlaps(output_geometry))
            .map(|view| RenderElement {
                geometry: output.to_local(view.geometry()),
                surface: view.surface,
            });

        layer_elements(Layer::Background)
            .chain(layer_elements(Layer::Bottom))
            .chain(views)
            .chain(layer_elements(Layer::Top))
            .chain(layer_elements(Layer::Overlay))
            .collect()
    }

    /// Surface at a layout point.
    ///
    /// Overlay and top layers are above all views, bottom and background
    /// layers below them.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn hit_test(&self, point: Point<f64, Logical>) -> Option<PointerFocus> {
        let output = self.outputs.output_at(point).and_then(|id| self.outputs.get(id));

        let layer_at = |layers: &[Layer]| {
            let output = output?;
            let local = point - output.location().to_f64();
            let layer = output.layers.surface_at(layers, local)?;
            Some(PointerFocus {
                location: local - layer.geometry.loc.to_f64(),
                target: FocusTarget::Layer(layer.surface),
                surface: layer.surface,
                client: layer.client,
            })
        };

        if let Some(focus) = layer_at(&[Layer::Overlay, Layer::Top]) {
            return Some(focus);
        }

        if let Some((view, offset)) = self.views.view_at(point) {
            return Some(PointerFocus {
                target: FocusTarget::View(view.surface),
                surface: offset.surface,
                location: offset.local,
                client: view.client,
            });
        }

        layer_at(&[Layer::Bottom, Layer::Background])
    }

    /// Give keyboard focus to a view and raise it.
    pub fn focus_view(&mut self, surface: SurfaceId) {
        let previous = self.seat.view_focus();
        if previous.map(|focus| focus.surface) == Some(surface) {
            return;
        }

        let client = match self.views.get(surface) {
            Some(view) => view.client,
            None => return,
        };

        debug!("Focusing view {surface:?}");

        if let Some(previous) = previous {
            self.requests.push(Request::Activate { surface: previous.surface, activated: false });
        }

        self.views.raise(surface);
        self.requests.push(Request::Activate { surface, activated: true });
        self.damage_view(surface, None);

        let focus = KeyboardFocus { surface, client };
        self.seat.set_view_focus(Some(focus), &mut self.requests);
    }

    /// Damage a view on every output it is visible on.
    ///
    /// The region is relative to the view's origin. Without a region, the
    /// view and all its subsurfaces are damaged.
    pub fn damage_view(&mut self, surface: SurfaceId, region: Option<&Region>) {
        let view = match self.views.get(surface) {
            Some(view) => view,
            None => return,
        };

        let whole;
        let region = match region {
            Some(region) => region,
            None => {
                whole = view.tree().boxes().into_iter().collect::<Region>();
                &whole
            },
        };

        let geometry = view.geometry();
        for id in self.outputs.locate(geometry).into_iter().flatten() {
            if let Some(output) = self.outputs.get_mut(id) {
                let bounds = output.to_local(geometry);
                output.damage.add_region(Some(region), bounds);
            }
        }
    }

    /// Damage a box in layout coordinates.
    fn damage_layout_box(&mut self, rect: Rectangle<i32, Logical>) {
        for id in self.outputs.locate(rect).into_iter().flatten() {
            if let Some(output) = self.outputs.get_mut(id) {
                let local = output.to_local(rect);
                output.damage.add_box(local);
            }
        }
    }

    /// Request frames for all outputs with new damage.
    fn schedule_frames(&mut self) {
        for output in self.outputs.iter_mut() {
            if output.damage.take_frame_request() {
                self.requests.push(Request::ScheduleFrame { output: output.id });
            }
        }
    }

    /// Report a client protocol violation.
    fn check_protocol(&mut self, client: ClientId, result: Result<(), ProtocolError>) {
        if let Err(error) = result {
            warn!("Protocol error for client {}: {error}", client.0);
            self.requests.push(Request::ProtocolError { client, error });
        }
    }

    fn add_output(&mut self, id: OutputId, name: String, modes: Vec<Mode>) {
        if self.outputs.get(id).is_some() {
            warn!("Ignoring duplicate output {id:?}");
            return;
        }

        let output = self.outputs.add(Output::new(id, name, modes));
        output.damage_whole();

        self.clamp_cursor();
    }

    fn set_output_mode(&mut self, id: OutputId, mode: Mode) {
        let output = match self.outputs.get_mut(id) {
            Some(output) => output,
            None => {
                debug!("Ignoring mode for unknown output {id:?}");
                return;
            },
        };

        debug!("Output {id:?} switched to {mode:?}");
        output.set_mode(mode);

        self.outputs.reflow();
        self.arrange_layers(id);
        for output in self.outputs.iter_mut() {
            output.damage_whole();
        }
        self.clamp_cursor();
    }

    /// Remove an output, closing all its layer surfaces.
    fn remove_output(&mut self, id: OutputId) {
        let mut output = match self.outputs.remove(id) {
            Some(output) => output,
            None => {
                debug!("Ignoring removal of unknown output {id:?}");
                return;
            },
        };

        for layer in output.layers.take_all() {
            self.requests.push(Request::Close { surface: layer.surface });
            self.forget_layer(&layer);
        }
        self.update_layer_focus();

        for output in self.outputs.iter_mut() {
            output.damage_whole();
        }
        self.clamp_cursor();
    }

    /// Keep the pointer within the output layout.
    fn clamp_cursor(&mut self) {
        if let Some(bounds) = self.outputs.bounding_box() {
            self.cursor.position = bounds.clamp_point(self.cursor.position);
        }
    }

    fn add_view(&mut self, client: ClientId, surface: SurfaceId, kind: ToplevelKind) {
        if self.views.get(surface).is_some() {
            warn!("Ignoring duplicate toplevel {surface:?}");
            return;
        }

        let mut view = View::new(surface, client, kind.into());

        // Place new windows in the active output's usable area.
        if let Some(output) = self.outputs.active_mut() {
            view.set_location(output.location() + output.usable_area().loc);
        }

        self.views.add(view);
    }

    fn map(&mut self, surface: SurfaceId) {
        if let Some(view) = self.views.get_mut(surface) {
            view.mapped = true;
            self.focus_view(surface);
            self.damage_view(surface, None);
            return;
        }

        if let Some(id) = self.outputs.layer_output(surface) {
            if let Some(layer) = self.layer_mut(id, surface) {
                layer.mapped = true;
            }
            self.arrange_layers(id);
            self.damage_layer(id, surface, None);
            return;
        }

        debug!("Ignoring map of unknown surface {surface:?}");
    }

    fn unmap(&mut self, surface: SurfaceId) {
        if self.views.get(surface).is_some() {
            self.damage_view(surface, None);
            if let Some(view) = self.views.get_mut(surface) {
                view.mapped = false;
            }

            self.release_view(surface);
            if self.seat.view_focus().map(|focus| focus.surface) == Some(surface) {
                self.focus_next(surface);
            }
            return;
        }

        if let Some(id) = self.outputs.layer_output(surface) {
            self.damage_layer(id, surface, None);
            if let Some(layer) = self.layer_mut(id, surface) {
                layer.mapped = false;
            }
            self.seat.forget_target(FocusTarget::Layer(surface));
            self.arrange_layers(id);
            return;
        }

        debug!("Ignoring unmap of unknown surface {surface:?}");
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        if let Some(view) = self.views.get(surface) {
            if view.mapped {
                self.damage_view(surface, None);
            }

            let focused = self.seat.view_focus().map(|focus| focus.surface) == Some(surface);

            self.release_view(surface);
            self.seat.forget_surface(surface, &mut self.requests);
            self.views.remove(surface);

            if focused {
                self.focus_next(surface);
            }
            return;
        }

        if let Some(id) = self.outputs.layer_output(surface) {
            self.damage_layer(id, surface, None);
            let layer = self.outputs.get_mut(id).and_then(|output| output.layers.remove(surface));
            if let Some(layer) = layer {
                self.forget_layer(&layer);
            }
            self.arrange_layers(id);
            return;
        }

        trace!("Ignoring destruction of unknown surface {surface:?}");
    }

    /// Drop grabs and pointer focus targeting a view.
    fn release_view(&mut self, surface: SurfaceId) {
        if self.cursor.mode.grabbed_view() == Some(surface) {
            self.cursor.end_grab();
        }
        self.seat.forget_target(FocusTarget::View(surface));
    }

    /// Focus the frontmost mapped view other than `except`.
    fn focus_next(&mut self, except: SurfaceId) {
        match self.views.next_mapped(except).map(|view| view.surface) {
            Some(next) => self.focus_view(next),
            None => self.seat.set_view_focus(None, &mut self.requests),
        }
    }

    fn commit(&mut self, tree: SurfaceTree, damage: Option<Region>) {
        let surface = tree.surface;

        if let Some(view) = self.views.get_mut(surface) {
            let mapped = view.mapped;
            let moved = view.commit(tree);

            if mapped {
                for rect in moved {
                    self.damage_layout_box(rect);
                }
                self.damage_view(surface, damage.as_ref());
            }
            return;
        }

        if let Some(id) = self.outputs.layer_output(surface) {
            self.arrange_layers(id);
            self.damage_layer(id, surface, damage.as_ref());
            return;
        }

        trace!("Ignoring commit of unknown surface {surface:?}");
    }

    fn configure_x11(&mut self, surface: SurfaceId, geometry: Rectangle<i32, Logical>) {
        let view = match self.views.get_mut(surface) {
            Some(view) => view,
            None => {
                debug!("Ignoring configure request of unknown view {surface:?}");
                return;
            },
        };

        let mapped = view.mapped;
        let old_geometry = view.geometry();
        let request = match view.configure_x11(geometry) {
            Some(request) => request,
            None => {
                debug!("Ignoring X11 configure request of native view {surface:?}");
                return;
            },
        };
        self.requests.push(request);

        if mapped && old_geometry != geometry {
            self.damage_layout_box(old_geometry);
            self.damage_view(surface, None);
        }
    }

    /// Check if a view owns the pointer focus.
    fn has_pointer_focus(&self, surface: SurfaceId) -> bool {
        let focus = self.seat.pointer_focus();
        focus.map_or(false, |focus| focus.target == FocusTarget::View(surface))
    }

    fn request_move(&mut self, surface: SurfaceId) {
        if !self.has_pointer_focus(surface) {
            debug!("Ignoring move request from unfocused view {surface:?}");
            return;
        }

        if let Some(view) = self.views.get(surface) {
            let geometry = view.geometry();
            self.cursor.start_move(surface, geometry);
        }
    }

    fn request_resize(&mut self, surface: SurfaceId, edges: ResizeEdges) {
        if !self.has_pointer_focus(surface) {
            debug!("Ignoring resize request from unfocused view {surface:?}");
            return;
        }

        if let Some(view) = self.views.get(surface) {
            let geometry = view.geometry();
            self.cursor.start_resize(surface, geometry, edges);
        }
    }

    fn add_layer(
        &mut self,
        client: ClientId,
        surface: SurfaceId,
        output: Option<OutputId>,
        layer: Layer,
        state: LayerState,
    ) {
        let output = output.filter(|id| self.outputs.get(*id).is_some());
        let id = match output.or_else(|| self.outputs.active_id()) {
            Some(id) => id,
            None => {
                self.requests.push(Request::Close { surface });
                return self.check_protocol(client, Err(ProtocolError::NoOutput(surface)));
            },
        };

        debug!("Adding layer surface {surface:?} to {layer:?} on {id:?}");

        if let Some(output) = self.outputs.get_mut(id) {
            output.layers.add(LayerSurface::new(surface, client, layer, state.into()));
        }
        self.arrange_layers(id);
    }

    fn set_layer_state(&mut self, surface: SurfaceId, state: LayerState) {
        let id = match self.outputs.layer_output(surface) {
            Some(id) => id,
            None => {
                debug!("Ignoring state of unknown layer surface {surface:?}");
                return;
            },
        };

        if let Some(layer) = self.layer_mut(id, surface) {
            layer.attributes = state.into();
        }
        self.arrange_layers(id);
    }

    fn layer_mut(&mut self, output: OutputId, surface: SurfaceId) -> Option<&mut LayerSurface> {
        self.outputs.get_mut(output)?.layers.get_mut(surface)
    }

    /// Damage a mapped layer surface.
    ///
    /// The region is relative to the surface's origin.
    fn damage_layer(&mut self, output: OutputId, surface: SurfaceId, region: Option<&Region>) {
        let output = match self.outputs.get_mut(output) {
            Some(output) => output,
            None => return,
        };

        let geometry = match output.layers.get(surface) {
            Some(layer) if layer.mapped => layer.geometry,
            _ => return,
        };

        output.damage.add_region(region, geometry);
    }

    /// Rearrange an output's layer surfaces and update the layer focus.
    fn arrange_layers(&mut self, id: OutputId) {
        let output = match self.outputs.get_mut(id) {
            Some(output) => output,
            None => return,
        };

        let closed = output.arrange_layers(&mut self.serials, &mut self.requests);
        for layer in &closed {
            self.forget_layer(layer);
        }

        self.update_layer_focus();
    }

    /// Drop all references to a removed layer surface.
    fn forget_layer(&mut self, layer: &LayerSurface) {
        self.seat.forget_target(FocusTarget::Layer(layer.surface));
        self.seat.forget_surface(layer.surface, &mut self.requests);
    }

    /// Give keyboard focus to the topmost keyboard-interactive layer.
    fn update_layer_focus(&mut self) {
        let focus = self.outputs.iter().find_map(|output| {
            let layer = output.layers.keyboard_focus()?;
            Some(KeyboardFocus { surface: layer.surface, client: layer.client })
        });
        self.seat.set_layer_focus(focus, &mut self.requests);
    }

    fn set_cursor(
        &mut self,
        client: ClientId,
        surface: Option<SurfaceId>,
        hotspot: Point<i32, Logical>,
    ) {
        let focus = self.seat.pointer_focus();
        if focus.map(|focus| focus.client) != Some(client) {
            debug!("Ignoring cursor image from unfocused client {}", client.0);
            return;
        }

        if let Some(image) = self.cursor.set_client_image(Some((surface, hotspot))) {
            self.requests.push(Request::CursorImage(image));
        }
    }

    fn grab_mouse(&mut self, client: ClientId, cursor: String) {
        if let Err(err) = self.grabber.grab(client) {
            return self.check_protocol(client, Err(err));
        }

        self.cursor.end_grab();
        let image = self.cursor.set_compositor_image(Some(cursor));
        self.requests.push(Request::CursorImage(image));
    }

    fn release_mouse(&mut self, client: ClientId) {
        if let Err(err) = self.grabber.release(client) {
            return self.check_protocol(client, Err(err));
        }

        let image = self.cursor.set_compositor_image(None);
        self.requests.push(Request::CursorImage(image));
    }

    /// Clean up after a client went away.
    fn disconnect(&mut self, client: ClientId) {
        debug!("Client {} disconnected", client.0);

        self.keybindings.unbind(client);
        if self.grabber.client() == Some(client) {
            self.release_mouse(client);
        }

        let views = self.views.iter().filter(|view| view.client == client).map(|view| view.surface);
        let layers = self.outputs.iter().flat_map(|output| {
            output.layers.iter().filter(|layer| layer.client == client).map(|layer| layer.surface)
        });
        let surfaces: Vec<_> = views.chain(layers).collect();

        for surface in surfaces {
            self.destroy_surface(surface);
        }
    }
}

#[cfg(test)]
mod test {
    use strata_ipc::{Dimensions, Interactivity, LayerTier, Location, Rect};

    use super::*;
    use crate::cursor::{CursorImage, CursorMode};

    fn mode(width: i32, height: i32) -> Mode {
        Mode { width, height, refresh: 60_000, preferred: true }
    }

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rectangle<i32, Logical> {
        Rectangle::from_loc_and_size((x, y), (w, h))
    }

    fn output(strata: &mut Strata, id: u32, width: i32, height: i32) {
        let modes = vec![mode(width, height)];
        strata.handle_event(Event::NewOutput { output: OutputId(id), name: id.to_string(), modes });
    }

    fn toplevel(strata: &mut Strata, id: u32, width: i32, height: i32) {
        let surface = SurfaceId(id);
        strata.handle_event(Event::NewToplevel {
            client: ClientId(id),
            kind: ToplevelKind::Xdg,
            surface,
        });
        strata.handle_event(Event::Commit {
            size: Dimensions { width, height },
            subsurfaces: Vec::new(),
            damage: None,
            surface,
        });
        strata.handle_event(Event::Map { surface });
    }

    fn layer(strata: &mut Strata, id: u32, layer: LayerTier, state: LayerState) {
        let surface = SurfaceId(id);
        strata.handle_event(Event::NewLayerSurface {
            client: ClientId(id),
            output: None,
            surface,
            layer,
            state,
        });
        strata.handle_event(Event::Map { surface });
    }

    fn move_pointer(strata: &mut Strata, x: f64, y: f64) {
        let position = strata.cursor.position;
        let (dx, dy) = (x - position.x, y - position.y);
        strata.handle_event(Event::PointerMotion { time: 0, dx, dy });
    }

    fn button(strata: &mut Strata, state: ButtonState) {
        strata.handle_event(Event::PointerButton { time: 0, button: 272, state });
    }

    fn keyboard_focus(strata: &Strata) -> Option<SurfaceId> {
        strata.seat.keyboard_focus().map(|focus| focus.surface)
    }

    #[test]
    fn map_focuses_and_damages() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        strata.take_damage();
        strata.drain_requests();

        toplevel(&mut strata, 1, 200, 100);

        assert_eq!(keyboard_focus(&strata), Some(SurfaceId(1)));
        let requests = strata.drain_requests();
        assert!(requests.contains(&Request::Activate { surface: SurfaceId(1), activated: true }));
        let frames = requests.iter().filter(|request| {
            matches!(request, Request::ScheduleFrame { output: OutputId(1) })
        });
        assert_eq!(frames.count(), 1);

        let damage = strata.take_damage();
        assert_eq!(damage.len(), 1);
        assert!(damage[0].1.contains((199, 99).into()));
        assert!(strata.take_damage().is_empty());
    }

    #[test]
    fn commit_damage_spans_outputs() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 1000, 1000);
        output(&mut strata, 2, 1000, 1000);
        toplevel(&mut strata, 1, 100, 100);
        strata.views.get_mut(SurfaceId(1)).unwrap().set_location((950, 10).into());
        strata.take_damage();

        strata.handle_event(Event::Commit {
            surface: SurfaceId(1),
            size: Dimensions { width: 100, height: 100 },
            damage: Some(vec![Rect { x: 40, y: 0, width: 20, height: 10 }]),
            subsurfaces: Vec::new(),
        });

        let damage = strata.take_damage();
        assert_eq!(damage.len(), 2);
        assert_eq!(damage[0].1.rects(), &[rect(990, 10, 10, 10)]);
        assert_eq!(damage[1].1.rects(), &[rect(0, 10, 10, 10)]);
    }

    #[test]
    fn hit_test_order() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 800, 600);

        let anchor = 0b1111;
        let size = Dimensions { width: 0, height: 0 };
        let state = LayerState { anchor, size, ..Default::default() };
        layer(&mut strata, 2, LayerTier::Background, state);

        let point = Point::from((10., 10.));
        let focus = strata.hit_test(point).unwrap();
        assert_eq!(focus.target, FocusTarget::View(SurfaceId(1)));

        layer(&mut strata, 3, LayerTier::Overlay, state);
        let focus = strata.hit_test(point).unwrap();
        assert_eq!(focus.target, FocusTarget::Layer(SurfaceId(3)));

        strata.handle_event(Event::DestroySurface { surface: SurfaceId(3) });
        strata.handle_event(Event::Unmap { surface: SurfaceId(1) });
        let focus = strata.hit_test(point).unwrap();
        assert_eq!(focus.target, FocusTarget::Layer(SurfaceId(2)));
        assert_eq!(focus.location, point);
    }

    #[test]
    fn interactive_layer_steals_and_returns_focus() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 200, 200);
        strata.drain_requests();

        let state = LayerState {
            size: Dimensions { width: 100, height: 100 },
            keyboard_interactivity: Interactivity::Exclusive,
            ..Default::default()
        };
        layer(&mut strata, 2, LayerTier::Overlay, state);
        assert_eq!(keyboard_focus(&strata), Some(SurfaceId(2)));
        let leave = Request::KeyboardLeave { surface: SurfaceId(1) };
        assert!(strata.drain_requests().contains(&leave));

        strata.handle_event(Event::DestroySurface { surface: SurfaceId(2) });
        assert_eq!(keyboard_focus(&strata), Some(SurfaceId(1)));

        let requests = strata.drain_requests();
        assert!(!requests.contains(&Request::KeyboardLeave { surface: SurfaceId(2) }));
        assert!(requests.iter().any(|request| {
            matches!(request, Request::KeyboardEnter { surface: SurfaceId(1), .. })
        }));
    }

    #[test]
    fn output_destruction_closes_layers() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        output(&mut strata, 2, 800, 600);
        strata.outputs.set_active(OutputId(2));

        let state = LayerState {
            keyboard_interactivity: Interactivity::Exclusive,
            size: Dimensions { width: 10, height: 10 },
            ..Default::default()
        };
        layer(&mut strata, 5, LayerTier::Top, state);
        assert_eq!(strata.outputs.layer_output(SurfaceId(5)), Some(OutputId(2)));
        strata.drain_requests();

        strata.handle_event(Event::DestroyOutput { output: OutputId(2) });

        let requests = strata.drain_requests();
        assert!(requests.contains(&Request::Close { surface: SurfaceId(5) }));
        assert_eq!(strata.outputs.layer_output(SurfaceId(5)), None);
        assert_eq!(strata.outputs.active_id(), Some(OutputId(1)));
        assert_eq!(keyboard_focus(&strata), None);

        strata.handle_event(Event::DestroyOutput { output: OutputId(1) });
        strata.handle_event(Event::NewLayerSurface {
            client: ClientId(6),
            surface: SurfaceId(6),
            output: None,
            layer: LayerTier::Top,
            state: LayerState::default(),
        });
        assert_eq!(strata.drain_requests(), vec![
            Request::Close { surface: SurfaceId(6) },
            Request::ProtocolError {
                client: ClientId(6),
                error: ProtocolError::NoOutput(SurfaceId(6)),
            },
        ]);
    }

    #[test]
    fn move_grab_follows_pointer() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 300, 200);
        strata.views.get_mut(SurfaceId(1)).unwrap().set_location((100, 100).into());

        move_pointer(&mut strata, 150., 150.);
        button(&mut strata, ButtonState::Pressed);
        strata.handle_event(Event::RequestMove { surface: SurfaceId(1) });
        assert!(matches!(strata.cursor.mode, CursorMode::Move { .. }));

        move_pointer(&mut strata, 170., 130.);
        assert_eq!(strata.views.get(SurfaceId(1)).unwrap().geometry(), rect(120, 80, 300, 200));

        button(&mut strata, ButtonState::Released);
        assert_eq!(strata.cursor.mode, CursorMode::Passthrough);
    }

    #[test]
    fn unfocused_requests_ignored() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 100, 100);
        toplevel(&mut strata, 2, 100, 100);
        strata.views.get_mut(SurfaceId(2)).unwrap().set_location((400, 400).into());
        move_pointer(&mut strata, 10., 10.);
        strata.drain_requests();

        strata.handle_event(Event::RequestMove { surface: SurfaceId(2) });
        assert_eq!(strata.cursor.mode, CursorMode::Passthrough);

        let hotspot = Location { x: 0, y: 0 };
        let surface = Some(SurfaceId(9));
        strata.handle_event(Event::SetCursor { client: ClientId(2), surface, hotspot });
        assert!(strata.drain_requests().is_empty());

        strata.handle_event(Event::SetCursor { client: ClientId(1), surface, hotspot });
        assert_eq!(strata.drain_requests(), vec![Request::CursorImage(CursorImage::Surface {
            hotspot: (0, 0).into(),
            surface,
        })]);
    }

    #[test]
    fn destroyed_grab_target_ends_grab() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 100, 100);
        toplevel(&mut strata, 2, 100, 100);
        move_pointer(&mut strata, 10., 10.);

        let edges = (ResizeEdges::BOTTOM | ResizeEdges::RIGHT).bits();
        strata.handle_event(Event::RequestResize { surface: SurfaceId(2), edges });
        assert_eq!(strata.cursor.mode.grabbed_view(), Some(SurfaceId(2)));
        strata.drain_requests();

        strata.handle_event(Event::DestroySurface { surface: SurfaceId(2) });
        assert_eq!(strata.cursor.mode, CursorMode::Passthrough);
        assert_eq!(strata.seat.pointer_focus(), None);
        assert_eq!(keyboard_focus(&strata), Some(SurfaceId(1)));

        let requests = strata.drain_requests();
        assert!(!requests.contains(&Request::KeyboardLeave { surface: SurfaceId(2) }));
        assert!(requests.contains(&Request::Activate { surface: SurfaceId(1), activated: true }));
    }

    #[test]
    fn resize_keeps_opposite_edge() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 300, 200);
        strata.views.get_mut(SurfaceId(1)).unwrap().set_location((100, 100).into());

        move_pointer(&mut strata, 110., 110.);
        button(&mut strata, ButtonState::Pressed);
        let edges = (ResizeEdges::TOP | ResizeEdges::LEFT).bits();
        strata.handle_event(Event::RequestResize { surface: SurfaceId(1), edges });
        strata.drain_requests();

        move_pointer(&mut strata, 130., 140.);
        let size = (280, 170).into();
        let configure = Request::Configure { surface: SurfaceId(1), serial: 1, size };
        assert!(strata.drain_requests().contains(&configure));

        button(&mut strata, ButtonState::Released);
        assert_eq!(strata.cursor.mode, CursorMode::Passthrough);

        // Geometry only changes once the client commits the acknowledged size.
        strata.handle_event(Event::AckConfigure { surface: SurfaceId(1), serial: 1 });
        assert_eq!(strata.views.get(SurfaceId(1)).unwrap().geometry(), rect(100, 100, 300, 200));

        strata.take_damage();
        strata.handle_event(Event::Commit {
            surface: SurfaceId(1),
            size: Dimensions { width: 250, height: 150 },
            subsurfaces: Vec::new(),
            damage: None,
        });
        assert_eq!(strata.views.get(SurfaceId(1)).unwrap().geometry(), rect(150, 150, 250, 150));

        let damage = strata.take_damage();
        assert_eq!(damage.len(), 1);
        assert!(damage[0].1.contains((100, 100).into()));
    }

    #[test]
    fn x11_configure_applied() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        let surface = SurfaceId(1);
        let kind = ToplevelKind::X11 { window: 5 };
        strata.handle_event(Event::NewToplevel { client: ClientId(1), surface, kind });
        strata.drain_requests();

        let geometry = Rect { x: 20, y: 30, width: 200, height: 100 };
        strata.handle_event(Event::ConfigureRequest { surface, geometry });

        assert_eq!(strata.views.get(surface).unwrap().geometry(), rect(20, 30, 200, 100));
        assert_eq!(strata.drain_requests(), vec![Request::ConfigureX11 {
            geometry: rect(20, 30, 200, 100),
            window: 5,
            surface,
        }]);
    }

    #[test]
    fn mode_change_rearranges_layers() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);

        let state = LayerState {
            size: Dimensions { width: 0, height: 30 },
            exclusive_zone: 30,
            anchor: 0b1101,
            ..Default::default()
        };
        layer(&mut strata, 2, LayerTier::Top, state);

        let output = strata.outputs.get(OutputId(1)).unwrap();
        assert_eq!(output.usable_area(), rect(0, 30, 800, 570));
        strata.drain_requests();

        strata.handle_event(Event::OutputMode { output: OutputId(1), mode: mode(1024, 768) });

        let output = strata.outputs.get(OutputId(1)).unwrap();
        assert_eq!(output.usable_area(), rect(0, 30, 1024, 738));
        assert_eq!(output.layers.get(SurfaceId(2)).unwrap().geometry, rect(0, 0, 1024, 30));

        let requests = strata.drain_requests();
        assert!(requests.iter().any(|request| matches!(
            request,
            Request::Configure { surface: SurfaceId(2), size, .. } if size.w == 1024 && size.h == 30
        )));
        assert!(requests.contains(&Request::ScheduleFrame { output: OutputId(1) }));
    }

    #[test]
    fn render_order() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        output(&mut strata, 2, 800, 600);
        toplevel(&mut strata, 1, 100, 100);
        toplevel(&mut strata, 2, 100, 100);

        let size = Dimensions { width: 10, height: 10 };
        layer(&mut strata, 3, LayerTier::Top, LayerState { size, ..Default::default() });
        layer(&mut strata, 4, LayerTier::Background, LayerState { size, ..Default::default() });

        let surfaces: Vec<_> =
            strata.render_elements(OutputId(1)).iter().map(|element| element.surface.0).collect();
        assert_eq!(surfaces, vec![4, 1, 2, 3]);
        assert!(strata.render_elements(OutputId(2)).is_empty());
    }

    #[test]
    fn client_disconnect_cleans_up() {
        let mut strata = Strata::new();
        output(&mut strata, 1, 800, 600);
        toplevel(&mut strata, 1, 100, 100);
        strata.handle_event(Event::BindKeybindings { client: ClientId(1) });
        let cursor = String::from("crosshair");
        strata.handle_event(Event::GrabMouse { client: ClientId(1), cursor });

        strata.handle_event(Event::ClientDisconnected { client: ClientId(1) });

        assert!(strata.views.get(SurfaceId(1)).is_none());
        assert_eq!(strata.keybindings.registrant(), None);
        assert_eq!(strata.grabber.client(), None);
        assert_eq!(keyboard_focus(&strata), None);
    }
}
