//! Output region handling.

use std::time::Duration;

use indexmap::IndexMap;
use smithay::utils::{Logical, Point, Rectangle, Size};
use strata_ipc::Mode;
use tracing::info;

use crate::config::FALLBACK_FRAME_INTERVAL;
use crate::damage::OutputDamage;
use crate::geometry::RectExt;
use crate::layer::{LayerSurface, Layers};
use crate::protocol::{OutputId, Request, SerialCounter, SurfaceId};

/// Physical display, typically a screen.
#[derive(Debug)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub layers: Layers,
    pub damage: OutputDamage,
    modes: Vec<Mode>,
    mode: Option<Mode>,
    location: Point<i32, Logical>,
    usable_area: Rectangle<i32, Logical>,
}

impl Output {
    /// Create an output using its preferred mode, or the last advertised one.
    pub fn new(id: OutputId, name: impl Into<String>, modes: Vec<Mode>) -> Self {
        let mode = modes.iter().find(|mode| mode.preferred).or_else(|| modes.last()).copied();

        let mut output = Self {
            modes,
            mode,
            id,
            name: name.into(),
            usable_area: Rectangle::from_loc_and_size((0, 0), (0, 0)),
            location: Point::from((0, 0)),
            damage: Default::default(),
            layers: Default::default(),
        };
        output.usable_area = output.local_geometry();
        output.damage.set_clip(output.local_geometry());
        output
    }

    /// Switch to a different mode.
    pub fn set_mode(&mut self, mode: Mode) {
        if !self.modes.contains(&mode) {
            self.modes.push(mode);
        }
        self.mode = Some(mode);
        self.damage.set_clip(self.local_geometry());
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// Output dimensions.
    pub fn size(&self) -> Size<i32, Logical> {
        match self.mode {
            Some(mode) => (mode.width, mode.height).into(),
            None => (0, 0).into(),
        }
    }

    /// Position in the output layout.
    pub fn location(&self) -> Point<i32, Logical> {
        self.location
    }

    /// Output area in layout coordinates.
    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        Rectangle::from_loc_and_size(self.location, self.size())
    }

    /// Output area in output-local coordinates.
    pub fn local_geometry(&self) -> Rectangle<i32, Logical> {
        Rectangle::from_loc_and_size((0, 0), self.size())
    }

    /// Area not reserved by layer shell exclusive zones, in output-local
    /// coordinates.
    pub fn usable_area(&self) -> Rectangle<i32, Logical> {
        self.usable_area
    }

    /// Duration between frames.
    pub fn frame_interval(&self) -> Duration {
        match self.mode {
            Some(mode) if mode.refresh > 0 => {
                Duration::from_micros(1_000_000_000 / mode.refresh as u64)
            },
            _ => FALLBACK_FRAME_INTERVAL,
        }
    }

    /// Arrange all layer shell surfaces.
    ///
    /// Returns the surfaces which had to be closed.
    pub fn arrange_layers(
        &mut self,
        serials: &mut SerialCounter,
        requests: &mut Vec<Request>,
    ) -> Vec<LayerSurface> {
        let size = self.size();
        let arrangement = self.layers.arrange(size, &mut self.damage, serials, requests);
        self.usable_area = arrangement.usable_area;
        arrangement.closed
    }

    /// Damage the entire output.
    pub fn damage_whole(&mut self) {
        let geometry = self.local_geometry();
        self.damage.add_box(geometry);
    }

    /// Convert a layout rectangle into output-local coordinates.
    pub fn to_local(&self, rect: Rectangle<i32, Logical>) -> Rectangle<i32, Logical> {
        Rectangle::from_loc_and_size(rect.loc - self.location, rect.size)
    }
}

/// Output layout.
///
/// Outputs are placed left to right in creation order.
#[derive(Debug, Default)]
pub struct Outputs {
    outputs: IndexMap<OutputId, Output>,
    active: Option<OutputId>,
}

impl Outputs {
    /// Add a new output to the right of all existing outputs.
    pub fn add(&mut self, output: Output) -> &mut Output {
        let id = output.id;
        info!("Adding output {:?} ({}) with mode {:?}", id, output.name, output.mode);

        self.outputs.insert(id, output);
        self.active.get_or_insert(id);
        self.reflow();

        &mut self.outputs[&id]
    }

    /// Remove an output.
    ///
    /// The active output falls back to the oldest remaining one.
    pub fn remove(&mut self, id: OutputId) -> Option<Output> {
        let output = self.outputs.shift_remove(&id)?;
        info!("Removing output {:?} ({})", id, output.name);

        if self.active == Some(id) {
            self.active = self.outputs.keys().next().copied();
        }
        self.reflow();

        Some(output)
    }

    /// Reposition all outputs after a size change.
    pub fn reflow(&mut self) {
        let mut x = 0;
        for output in self.outputs.values_mut() {
            output.location = Point::from((x, 0));
            x += output.size().w;
        }
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(&id)
    }

    pub fn get_mut(&mut self, id: OutputId) -> Option<&mut Output> {
        self.outputs.get_mut(&id)
    }

    /// Outputs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Output> {
        self.outputs.values_mut()
    }

    pub fn active_id(&self) -> Option<OutputId> {
        self.active
    }

    pub fn active_mut(&mut self) -> Option<&mut Output> {
        self.outputs.get_mut(&self.active?)
    }

    pub fn set_active(&mut self, id: OutputId) {
        if self.outputs.contains_key(&id) {
            self.active = Some(id);
        }
    }

    /// Output containing a layout point.
    pub fn output_at(&self, point: Point<f64, Logical>) -> Option<OutputId> {
        let output = self.iter().find(|output| output.geometry().to_f64().contains(point));
        output.map(|output| output.id)
    }

    /// Outputs under the corners of a rectangle.
    ///
    /// Every output is reported at most once.
    pub fn locate(&self, rect: Rectangle<i32, Logical>) -> [Option<OutputId>; 4] {
        let mut outputs = rect.corners().map(|corner| self.output_at(corner.to_f64()));

        for i in 1..outputs.len() {
            if outputs[..i].contains(&outputs[i]) {
                outputs[i] = None;
            }
        }

        outputs
    }

    /// Smallest rectangle covering all outputs.
    pub fn bounding_box(&self) -> Option<Rectangle<i32, Logical>> {
        self.iter().map(|output| output.geometry()).reduce(Rectangle::merge)
    }

    /// Output owning a layer shell surface.
    pub fn layer_output(&self, surface: SurfaceId) -> Option<OutputId> {
        self.iter().find(|output| output.layers.get(surface).is_some()).map(|output| output.id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mode(width: i32, height: i32) -> Mode {
        Mode { width, height, refresh: 60_000, preferred: false }
    }

    #[test]
    fn mode_selection() {
        let preferred = Mode { preferred: true, ..mode(1280, 720) };
        let output = Output::new(OutputId(0), "A", vec![mode(640, 480), preferred, mode(800, 600)]);
        assert_eq!(output.mode(), Some(preferred));

        let output = Output::new(OutputId(1), "B", vec![mode(640, 480), mode(800, 600)]);
        assert_eq!(output.size(), Size::from((800, 600)));
        assert_eq!(output.frame_interval(), Duration::from_micros(16_666));

        let output = Output::new(OutputId(2), "C", Vec::new());
        assert_eq!(output.size(), Size::from((0, 0)));
        assert_eq!(output.frame_interval(), FALLBACK_FRAME_INTERVAL);
    }

    #[test]
    fn auto_placement() {
        let mut outputs = Outputs::default();
        outputs.add(Output::new(OutputId(1), "A", vec![mode(1920, 1080)]));
        outputs.add(Output::new(OutputId(2), "B", vec![mode(1280, 1024)]));

        let second = outputs.get(OutputId(2)).unwrap();
        assert_eq!(second.geometry(), Rectangle::from_loc_and_size((1920, 0), (1280, 1024)));
        let bounding_box = Rectangle::from_loc_and_size((0, 0), (3200, 1080));
        assert_eq!(outputs.bounding_box(), Some(bounding_box));
    }

    #[test]
    fn locate_dedups() {
        let mut outputs = Outputs::default();
        outputs.add(Output::new(OutputId(1), "A", vec![mode(1000, 1000)]));
        outputs.add(Output::new(OutputId(2), "B", vec![mode(1000, 1000)]));

        let inside = Rectangle::from_loc_and_size((10, 10), (100, 100));
        assert_eq!(outputs.locate(inside), [Some(OutputId(1)), None, None, None]);

        let straddling = Rectangle::from_loc_and_size((950, 10), (100, 100));
        let located = outputs.locate(straddling);
        assert_eq!(located, [Some(OutputId(1)), Some(OutputId(2)), None, None]);

        let offscreen = Rectangle::from_loc_and_size((-500, -500), (10, 10));
        assert_eq!(outputs.locate(offscreen), [None; 4]);
    }

    #[test]
    fn active_falls_back_to_oldest() {
        let mut outputs = Outputs::default();
        outputs.add(Output::new(OutputId(1), "A", vec![mode(100, 100)]));
        outputs.add(Output::new(OutputId(2), "B", vec![mode(100, 100)]));
        outputs.add(Output::new(OutputId(3), "C", vec![mode(100, 100)]));
        assert_eq!(outputs.active_id(), Some(OutputId(1)));

        outputs.set_active(OutputId(3));
        outputs.remove(OutputId(3));
        assert_eq!(outputs.active_id(), Some(OutputId(1)));

        outputs.remove(OutputId(1));
        assert_eq!(outputs.active_id(), Some(OutputId(2)));
        assert_eq!(outputs.get(OutputId(2)).unwrap().location(), Point::from((0, 0)));

        outputs.remove(OutputId(2));
        assert_eq!(outputs.active_id(), None);
    }
}
