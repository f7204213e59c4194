//! Pointer interaction state.

use bitflags::bitflags;
use smithay::utils::{Logical, Point, Rectangle};
use tracing::debug;

use crate::config::DEFAULT_CURSOR;
use crate::protocol::{ClientId, ProtocolError, SurfaceId};

bitflags! {
    /// Window edges affected by an interactive resize.
    #[derive(PartialEq, Eq, Copy, Clone, Debug)]
    pub struct ResizeEdges: u32 {
        const TOP = 1;
        const BOTTOM = 2;
        const LEFT = 4;
        const RIGHT = 8;
    }
}

/// Pointer interaction mode.
#[derive(PartialEq, Copy, Clone, Debug)]
pub enum CursorMode {
    /// Events are forwarded to the surface under the pointer.
    Passthrough,
    /// A view follows the pointer.
    Move {
        view: SurfaceId,
        /// Pointer position relative to the view origin.
        offset: Point<f64, Logical>,
        original: Rectangle<i32, Logical>,
    },
    /// A view is resized by pointer motion.
    Resize {
        view: SurfaceId,
        /// Pointer position when the grab started.
        pointer: Point<f64, Logical>,
        original: Rectangle<i32, Logical>,
        edges: ResizeEdges,
    },
}

impl CursorMode {
    /// View targeted by the current grab.
    pub fn grabbed_view(&self) -> Option<SurfaceId> {
        match self {
            Self::Move { view, .. } | Self::Resize { view, .. } => Some(*view),
            Self::Passthrough => None,
        }
    }
}

/// Image shown for the pointer.
#[derive(PartialEq, Clone, Debug)]
pub enum CursorImage {
    /// Image from the compositor's cursor theme.
    Named(String),
    /// Client surface; `None` hides the cursor.
    Surface { surface: Option<SurfaceId>, hotspot: Point<i32, Logical> },
}

/// Pointer state.
#[derive(Debug)]
pub struct Cursor {
    pub position: Point<f64, Logical>,
    pub mode: CursorMode,
    compositor_image: Option<String>,
    client_image: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            position: Point::from((0., 0.)),
            mode: CursorMode::Passthrough,
            compositor_image: None,
            client_image: false,
        }
    }
}

impl Cursor {
    /// Start moving a view.
    pub fn start_move(&mut self, view: SurfaceId, original: Rectangle<i32, Logical>) {
        let offset = self.position - original.loc.to_f64();
        debug!("Starting move of {view:?}");
        self.mode = CursorMode::Move { view, offset, original };
    }

    /// Start resizing a view.
    pub fn start_resize(
        &mut self,
        view: SurfaceId,
        original: Rectangle<i32, Logical>,
        edges: ResizeEdges,
    ) {
        debug!("Starting resize of {view:?} with edges {edges:?}");
        self.mode = CursorMode::Resize { view, pointer: self.position, original, edges };
    }

    /// Leave any active grab.
    pub fn end_grab(&mut self) {
        if self.mode != CursorMode::Passthrough {
            debug!("Ending pointer grab");
        }
        self.mode = CursorMode::Passthrough;
    }

    /// Update the client-provided cursor image.
    ///
    /// Passing `None` drops the client image. Returns the image which should
    /// be shown, if it changed.
    pub fn set_client_image(
        &mut self,
        image: Option<(Option<SurfaceId>, Point<i32, Logical>)>,
    ) -> Option<CursorImage> {
        let use_client_image = image.is_some();

        let mut update = None;
        if self.compositor_image.is_none() {
            if let Some((surface, hotspot)) = image {
                update = Some(CursorImage::Surface { surface, hotspot });
            } else if self.client_image {
                update = Some(CursorImage::Named(DEFAULT_CURSOR.into()));
            }
        }

        self.client_image = use_client_image;
        update
    }

    /// Check if a client image is in use.
    pub fn has_client_image(&self) -> bool {
        self.client_image
    }

    /// Override all cursor images with a named image.
    ///
    /// Passing `None` clears the override.
    pub fn set_compositor_image(&mut self, name: Option<String>) -> CursorImage {
        self.compositor_image = name;
        let name = self.compositor_image.as_deref().unwrap_or(DEFAULT_CURSOR);
        CursorImage::Named(name.into())
    }
}

/// Origin of a moved view.
pub fn move_origin(
    pointer: Point<f64, Logical>,
    offset: Point<f64, Logical>,
) -> Point<i32, Logical> {
    Point::from(((pointer.x - offset.x) as i32, (pointer.y - offset.y) as i32))
}

/// Geometry of a resized view.
///
/// Sizes are clamped to at least one pixel, with the edge opposite to a
/// moved top or left edge staying in place.
pub fn resize_geometry(
    original: Rectangle<i32, Logical>,
    edges: ResizeEdges,
    delta: Point<i32, Logical>,
) -> Rectangle<i32, Logical> {
    let mut geometry = original;

    if edges.contains(ResizeEdges::TOP) {
        geometry.loc.y += delta.y;
        geometry.size.h -= delta.y;
        if geometry.size.h < 1 {
            geometry.loc.y += geometry.size.h - 1;
            geometry.size.h = 1;
        }
    } else if edges.contains(ResizeEdges::BOTTOM) {
        geometry.size.h = (geometry.size.h + delta.y).max(1);
    }

    if edges.contains(ResizeEdges::LEFT) {
        geometry.loc.x += delta.x;
        geometry.size.w -= delta.x;
        if geometry.size.w < 1 {
            geometry.loc.x += geometry.size.w - 1;
            geometry.size.w = 1;
        }
    } else if edges.contains(ResizeEdges::RIGHT) {
        geometry.size.w = (geometry.size.w + delta.x).max(1);
    }

    geometry
}

/// Global pointer grab by a privileged client.
#[derive(Default, Debug)]
pub struct MouseGrabber {
    client: Option<ClientId>,
}

impl MouseGrabber {
    /// Grab the pointer.
    pub fn grab(&mut self, client: ClientId) -> Result<(), ProtocolError> {
        if self.client.is_some() {
            return Err(ProtocolError::AlreadyGrabbed);
        }

        debug!("Mouse grabbed by {client:?}");
        self.client = Some(client);
        Ok(())
    }

    /// Release the pointer.
    pub fn release(&mut self, client: ClientId) -> Result<(), ProtocolError> {
        if self.client != Some(client) {
            return Err(ProtocolError::NotGrabbed);
        }

        debug!("Mouse released by {client:?}");
        self.client = None;
        Ok(())
    }

    /// Client holding the grab.
    pub fn client(&self) -> Option<ClientId> {
        self.client
    }
}
