//! Layer shell surfaces.

use smithay::utils::{Logical, Point, Rectangle, Size};
use smithay::wayland::shell::wlr_layer::{
    Anchor, ExclusiveZone, KeyboardInteractivity, Layer, Margins,
};
use strata_ipc::LayerState;
use tracing::warn;

use crate::damage::OutputDamage;
use crate::protocol::{ClientId, ProtocolError, Request, SerialCounter, SurfaceId};

/// Order in which the layers claim output space.
const ARRANGE_ORDER: [Layer; 4] = [Layer::Overlay, Layer::Top, Layer::Bottom, Layer::Background];

/// Client-requested layer surface state.
#[derive(Copy, Clone, Debug)]
pub struct LayerAttributes {
    pub anchor: Anchor,
    pub margin: Margins,
    pub exclusive_zone: ExclusiveZone,
    pub size: Size<i32, Logical>,
    pub keyboard_interactivity: KeyboardInteractivity,
}

impl From<LayerState> for LayerAttributes {
    fn from(state: LayerState) -> Self {
        Self {
            anchor: state.anchor(),
            margin: state.margin.into(),
            exclusive_zone: state.exclusive_zone(),
            size: state.size.into(),
            keyboard_interactivity: state.keyboard_interactivity.into(),
        }
    }
}

/// Layer shell surface.
#[derive(Debug)]
pub struct LayerSurface {
    pub surface: SurfaceId,
    pub client: ClientId,
    pub layer: Layer,
    pub attributes: LayerAttributes,

    /// Arranged geometry in output-local coordinates.
    pub geometry: Rectangle<i32, Logical>,

    pub mapped: bool,

    configured_size: Option<Size<i32, Logical>>,
}

impl LayerSurface {
    pub fn new(
        surface: SurfaceId,
        client: ClientId,
        layer: Layer,
        attributes: LayerAttributes,
    ) -> Self {
        Self {
            attributes,
            surface,
            client,
            layer,
            configured_size: None,
            geometry: Rectangle::from_loc_and_size((0, 0), (0, 0)),
            mapped: false,
        }
    }

    /// Check if this surface wants exclusive keyboard focus.
    pub fn keyboard_interactive(&self) -> bool {
        self.attributes.keyboard_interactivity == KeyboardInteractivity::Exclusive
    }
}

/// Result of a layer arrangement.
#[derive(Debug)]
pub struct Arrangement {
    /// Output-local area left after exclusive zones.
    pub usable_area: Rectangle<i32, Logical>,

    /// Surfaces which were closed due to invalid geometry.
    pub closed: Vec<LayerSurface>,
}

/// Layer shell surfaces of one output.
#[derive(Debug, Default)]
pub struct Layers {
    background: Vec<LayerSurface>,
    bottom: Vec<LayerSurface>,
    top: Vec<LayerSurface>,
    overlay: Vec<LayerSurface>,
}

impl Layers {
    /// Add a new layer shell surface.
    pub fn add(&mut self, surface: LayerSurface) {
        self.list_mut(surface.layer).push(surface);
    }

    /// Remove a layer shell surface.
    pub fn remove(&mut self, surface: SurfaceId) -> Option<LayerSurface> {
        for layer in ARRANGE_ORDER {
            let list = self.list_mut(layer);
            if let Some(index) = list.iter().position(|layer| layer.surface == surface) {
                return Some(list.remove(index));
            }
        }
        None
    }

    pub fn get(&self, surface: SurfaceId) -> Option<&LayerSurface> {
        self.iter().find(|layer| layer.surface == surface)
    }

    pub fn get_mut(&mut self, surface: SurfaceId) -> Option<&mut LayerSurface> {
        self.background
            .iter_mut()
            .chain(&mut self.bottom)
            .chain(&mut self.top)
            .chain(&mut self.overlay)
            .find(|layer| layer.surface == surface)
    }

    /// All surfaces, bottom-most first.
    pub fn iter(&self) -> impl Iterator<Item = &LayerSurface> {
        self.background.iter().chain(&self.bottom).chain(&self.top).chain(&self.overlay)
    }

    /// Surfaces of one layer in registration order.
    pub fn list(&self, layer: Layer) -> &[LayerSurface] {
        match layer {
            Layer::Background => &self.background,
            Layer::Bottom => &self.bottom,
            Layer::Top => &self.top,
            Layer::Overlay => &self.overlay,
        }
    }

    fn list_mut(&mut self, layer: Layer) -> &mut Vec<LayerSurface> {
        match layer {
            Layer::Background => &mut self.background,
            Layer::Bottom => &mut self.bottom,
            Layer::Top => &mut self.top,
            Layer::Overlay => &mut self.overlay,
        }
    }

    /// Remove all surfaces.
    pub fn take_all(&mut self) -> Vec<LayerSurface> {
        let mut surfaces = Vec::new();
        for layer in ARRANGE_ORDER {
            surfaces.append(self.list_mut(layer));
        }
        surfaces
    }

    /// Topmost mapped surface of `layers` at an output-local point.
    pub fn surface_at(
        &self,
        layers: &[Layer],
        point: Point<f64, Logical>,
    ) -> Option<&LayerSurface> {
        layers
            .iter()
            .flat_map(|layer| self.list(*layer).iter().rev())
            .find(|layer| layer.mapped && layer.geometry.to_f64().contains(point))
    }

    /// Surface which should receive exclusive keyboard focus.
    pub fn keyboard_focus(&self) -> Option<&LayerSurface> {
        let mut surfaces = self.overlay.iter().rev().chain(self.top.iter().rev());
        surfaces.find(|layer| layer.keyboard_interactive())
    }

    /// Position all surfaces on an output of the given size.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn arrange(
        &mut self,
        output_size: Size<i32, Logical>,
        damage: &mut OutputDamage,
        serials: &mut SerialCounter,
        requests: &mut Vec<Request>,
    ) -> Arrangement {
        let full_area = Rectangle::from_loc_and_size((0, 0), output_size);
        let mut arranger = Arranger {
            usable_area: full_area,
            closed: Vec::new(),
            full_area,
            requests,
            serials,
            damage,
        };

        for layer in ARRANGE_ORDER {
            arranger.arrange(self.list_mut(layer), true);
        }

        for layer in ARRANGE_ORDER {
            arranger.arrange(self.list_mut(layer), false);
        }

        Arrangement { usable_area: arranger.usable_area, closed: arranger.closed }
    }
}

/// State shared between the arrangement passes.
struct Arranger<'a> {
    full_area: Rectangle<i32, Logical>,
    usable_area: Rectangle<i32, Logical>,
    closed: Vec<LayerSurface>,
    damage: &'a mut OutputDamage,
    serials: &'a mut SerialCounter,
    requests: &'a mut Vec<Request>,
}

impl Arranger<'_> {
    /// Arrange surfaces with or without an exclusive zone, newest first.
    fn arrange(&mut self, surfaces: &mut Vec<LayerSurface>, exclusive: bool) {
        for index in (0..surfaces.len()).rev() {
            let attributes = surfaces[index].attributes;
            let reserved = match attributes.exclusive_zone {
                ExclusiveZone::Exclusive(zone) => Some(zone as i32),
                _ => None,
            };

            if exclusive != reserved.is_some() {
                continue;
            }

            let bounds = match attributes.exclusive_zone {
                ExclusiveZone::DontCare => self.full_area,
                _ => self.usable_area,
            };

            match layer_geometry(&attributes, bounds) {
                Some(geometry) => {
                    if let Some(zone) = reserved {
                        reserve(&mut self.usable_area, attributes.anchor, attributes.margin, zone);
                    }
                    self.place(&mut surfaces[index], geometry);
                },
                None => {
                    let surface = surfaces.remove(index);
                    self.close(surface);
                },
            }
        }
    }

    /// Apply the arranged geometry to a surface.
    fn place(&mut self, surface: &mut LayerSurface, geometry: Rectangle<i32, Logical>) {
        if surface.mapped && surface.geometry != geometry {
            self.damage.add_box(surface.geometry);
            self.damage.add_box(geometry);
        }
        surface.geometry = geometry;

        if surface.configured_size != Some(geometry.size) {
            let serial = self.serials.next_serial();
            self.requests.push(Request::Configure {
                surface: surface.surface,
                size: geometry.size,
                serial,
            });
            surface.configured_size = Some(geometry.size);
        }
    }

    /// Reject a surface which does not fit its output.
    fn close(&mut self, surface: LayerSurface) {
        let error = ProtocolError::InvalidLayerGeometry(surface.surface);
        warn!("Closing layer surface: {error}");

        if surface.mapped {
            self.damage.add_box(surface.geometry);
        }

        self.requests.push(Request::Close { surface: surface.surface });
        self.requests.push(Request::ProtocolError { client: surface.client, error });
        self.closed.push(surface);
    }
}

/// Compute a surface's box within `bounds`.
///
/// Returns `None` if margins leave the surface with a negative size.
fn layer_geometry(
    attributes: &LayerAttributes,
    bounds: Rectangle<i32, Logical>,
) -> Option<Rectangle<i32, Logical>> {
    let LayerAttributes { anchor, margin, .. } = *attributes;
    let mut size = attributes.size;
    let mut loc = Point::<i32, Logical>::from((0, 0));

    let horizontal = anchor.contains(Anchor::LEFT | Anchor::RIGHT);
    if horizontal && size.w == 0 {
        loc.x = bounds.loc.x;
        size.w = bounds.size.w;
    } else if anchor.contains(Anchor::LEFT) {
        loc.x = bounds.loc.x;
    } else if anchor.contains(Anchor::RIGHT) {
        loc.x = bounds.loc.x + bounds.size.w - size.w;
    } else {
        loc.x = bounds.loc.x + bounds.size.w / 2 - size.w / 2;
    }

    let vertical = anchor.contains(Anchor::TOP | Anchor::BOTTOM);
    if vertical && size.h == 0 {
        loc.y = bounds.loc.y;
        size.h = bounds.size.h;
    } else if anchor.contains(Anchor::TOP) {
        loc.y = bounds.loc.y;
    } else if anchor.contains(Anchor::BOTTOM) {
        loc.y = bounds.loc.y + bounds.size.h - size.h;
    } else {
        loc.y = bounds.loc.y + bounds.size.h / 2 - size.h / 2;
    }

    if horizontal {
        loc.x += margin.left;
        size.w -= margin.left + margin.right;
    } else if anchor.contains(Anchor::LEFT) {
        loc.x += margin.left;
    } else if anchor.contains(Anchor::RIGHT) {
        loc.x -= margin.right;
    }

    if vertical {
        loc.y += margin.top;
        size.h -= margin.top + margin.bottom;
    } else if anchor.contains(Anchor::TOP) {
        loc.y += margin.top;
    } else if anchor.contains(Anchor::BOTTOM) {
        loc.y -= margin.bottom;
    }

    (size.w >= 0 && size.h >= 0).then(|| Rectangle::from_loc_and_size(loc, size))
}

/// Shrink the usable area by an exclusive zone.
///
/// Only surfaces anchored to a single edge, or to one edge and both of its
/// perpendicular edges, reserve space.
fn reserve(
    usable_area: &mut Rectangle<i32, Logical>,
    anchor: Anchor,
    margin: Margins,
    zone: i32,
) {
    if anchor == Anchor::TOP || anchor == !Anchor::BOTTOM {
        let reserved = zone + margin.top;
        usable_area.loc.y += reserved;
        usable_area.size.h -= reserved;
    } else if anchor == Anchor::LEFT || anchor == !Anchor::RIGHT {
        let reserved = zone + margin.left;
        usable_area.loc.x += reserved;
        usable_area.size.w -= reserved;
    } else if anchor == Anchor::BOTTOM || anchor == !Anchor::TOP {
        usable_area.size.h -= zone + margin.bottom;
    } else if anchor == Anchor::RIGHT || anchor == !Anchor::LEFT {
        usable_area.size.w -= zone + margin.right;
    }
}
