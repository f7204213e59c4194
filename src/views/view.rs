//! Toplevel windows.

use std::mem;

use smithay::utils::{Logical, Point, Rectangle};
use strata_ipc::ToplevelKind;

use crate::protocol::{ClientId, Request, SurfaceId};
use crate::views::surface::{OffsetSurface, SurfaceTree};

/// Toplevel protocol specific state.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum ViewKind {
    /// Native toplevel, resized through acknowledged configures.
    Xdg { acked_serial: Option<u32> },
    /// Xwayland window, which has no configure serials.
    X11 { window: u32, configure_pending: bool },
}

impl From<ToplevelKind> for ViewKind {
    fn from(kind: ToplevelKind) -> Self {
        match kind {
            ToplevelKind::Xdg => Self::Xdg { acked_serial: None },
            ToplevelKind::X11 { window } => Self::X11 { window, configure_pending: false },
        }
    }
}

/// Geometry change waiting for the client.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct PendingConfigure {
    pub serial: u32,
    pub geometry: Rectangle<i32, Logical>,
}

/// Toplevel window.
#[derive(Debug)]
pub struct View {
    pub surface: SurfaceId,
    pub client: ClientId,
    pub kind: ViewKind,
    pub mapped: bool,
    geometry: Rectangle<i32, Logical>,
    pending: Option<PendingConfigure>,
    tree: SurfaceTree,
}

impl View {
    pub fn new(surface: SurfaceId, client: ClientId, kind: ViewKind) -> Self {
        Self {
            surface,
            client,
            kind,
            geometry: Rectangle::from_loc_and_size((0, 0), (0, 0)),
            tree: SurfaceTree::new(surface),
            mapped: false,
            pending: None,
        }
    }

    /// Window geometry in layout coordinates.
    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        self.geometry
    }

    /// Move the window without changing its size.
    pub fn set_location(&mut self, location: Point<i32, Logical>) {
        self.geometry.loc = location;
    }

    pub fn pending(&self) -> Option<PendingConfigure> {
        self.pending
    }

    pub fn tree(&self) -> &SurfaceTree {
        &self.tree
    }

    /// Boxes covered by the window and all its subsurfaces, in layout
    /// coordinates.
    pub fn boxes(&self) -> Vec<Rectangle<i32, Logical>> {
        let mut boxes = vec![self.geometry];
        for rect in self.tree.boxes() {
            boxes.push(Rectangle::from_loc_and_size(rect.loc + self.geometry.loc, rect.size));
        }
        boxes
    }

    /// Surface at a layout point.
    pub fn surface_at(&self, point: Point<f64, Logical>) -> Option<OffsetSurface> {
        self.tree.surface_at(point - self.geometry.loc.to_f64())
    }

    /// Ask the client to change its geometry.
    pub fn request_geometry(&mut self, geometry: Rectangle<i32, Logical>, serial: u32) -> Request {
        self.pending = Some(PendingConfigure { serial, geometry });

        match &mut self.kind {
            ViewKind::Xdg { .. } => {
                Request::Configure { surface: self.surface, serial, size: geometry.size }
            },
            ViewKind::X11 { window, configure_pending } => {
                *configure_pending = true;
                Request::ConfigureX11 { surface: self.surface, window: *window, geometry }
            },
        }
    }

    /// Handle a configure acknowledgement.
    pub fn ack_configure(&mut self, serial: u32) {
        match &mut self.kind {
            ViewKind::Xdg { acked_serial } => *acked_serial = Some(serial),
            ViewKind::X11 { .. } => (),
        }
    }

    /// Apply geometry requested by an X11 client.
    ///
    /// Returns the configure echoing the new geometry, or `None` for native
    /// toplevels.
    pub fn configure_x11(&mut self, geometry: Rectangle<i32, Logical>) -> Option<Request> {
        match self.kind {
            ViewKind::X11 { window, .. } => {
                self.geometry = geometry;
                Some(Request::ConfigureX11 { surface: self.surface, window, geometry })
            },
            ViewKind::Xdg { .. } => None,
        }
    }

    /// Apply a committed surface tree.
    ///
    /// Returns the layout boxes invalidated by size or position changes.
    pub fn commit(&mut self, tree: SurfaceTree) -> Vec<Rectangle<i32, Logical>> {
        let old_geometry = self.geometry;
        let old_boxes = self.boxes();

        self.geometry.size = tree.size;
        self.tree = tree;
        self.resolve_pending();

        let new_boxes = self.boxes();
        if self.geometry == old_geometry && new_boxes == old_boxes {
            return Vec::new();
        }

        let mut damage = old_boxes;
        damage.extend(new_boxes);
        damage
    }

    /// Move the window once the client caught up with a resize.
    ///
    /// Edges moved by the resize stay anchored to their opposite edge.
    fn resolve_pending(&mut self) {
        let pending = match self.pending {
            Some(pending) => pending,
            None => return,
        };

        let resolved = match &mut self.kind {
            ViewKind::Xdg { acked_serial } => {
                acked_serial.map_or(false, |acked| acked >= pending.serial)
            },
            ViewKind::X11 { configure_pending, .. } => mem::take(configure_pending),
        };
        if !resolved {
            return;
        }
        self.pending = None;

        let target = pending.geometry;
        if target.loc.x != self.geometry.loc.x {
            self.geometry.loc.x = target.loc.x + target.size.w - self.geometry.size.w;
        }
        if target.loc.y != self.geometry.loc.y {
            self.geometry.loc.y = target.loc.y + target.size.h - self.geometry.size.h;
        }
    }
}
