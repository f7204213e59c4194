//! Surface trees.

use smithay::utils::{Logical, Point, Rectangle, Size};

use crate::protocol::SurfaceId;

/// Surface at a point, with the point in surface-local coordinates.
#[derive(PartialEq, Copy, Clone, Debug)]
pub struct OffsetSurface {
    pub surface: SurfaceId,
    pub local: Point<f64, Logical>,
}

impl OffsetSurface {
    pub fn new(surface: SurfaceId, local: Point<f64, Logical>) -> Self {
        Self { surface, local }
    }
}

/// Committed surface with all its subsurfaces.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SurfaceTree {
    pub surface: SurfaceId,
    pub size: Size<i32, Logical>,
    pub children: Vec<Subsurface>,
}

/// Subsurface positioned relative to its parent.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Subsurface {
    pub location: Point<i32, Logical>,
    pub tree: SurfaceTree,
}

impl SurfaceTree {
    /// Create a tree without any content.
    pub fn new(surface: SurfaceId) -> Self {
        Self { surface, size: Size::from((0, 0)), children: Vec::new() }
    }

    /// Create a tree from a commit.
    pub fn from_commit(
        surface: SurfaceId,
        size: Size<i32, Logical>,
        subsurfaces: &[strata_ipc::Subsurface],
    ) -> Self {
        let children = subsurfaces
            .iter()
            .map(|child| Subsurface {
                tree: Self::from_commit(child.surface, child.size.into(), &child.children),
                location: child.location.into(),
            })
            .collect();
        Self { surface, size, children }
    }

    /// Topmost surface at a point relative to the tree's origin.
    ///
    /// Subsurfaces are stacked above their parent, later siblings on top.
    pub fn surface_at(&self, point: Point<f64, Logical>) -> Option<OffsetSurface> {
        let child = self.children.iter().rev().find_map(|child| {
            child.tree.surface_at(point - child.location.to_f64())
        });
        if child.is_some() {
            return child;
        }

        let bounds = Rectangle::from_loc_and_size((0., 0.), self.size.to_f64());
        bounds.contains(point).then(|| OffsetSurface::new(self.surface, point))
    }

    /// Boxes of every surface relative to the tree's origin.
    pub fn boxes(&self) -> Vec<Rectangle<i32, Logical>> {
        let mut boxes = Vec::new();
        self.collect_boxes(Point::from((0, 0)), &mut boxes);
        boxes
    }

    fn collect_boxes(&self, offset: Point<i32, Logical>, boxes: &mut Vec<Rectangle<i32, Logical>>) {
        boxes.push(Rectangle::from_loc_and_size(offset, self.size));
        for child in &self.children {
            child.tree.collect_boxes(offset + child.location, boxes);
        }
    }
}
