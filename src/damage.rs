//! Damage tracking.

use std::mem;

use smithay::utils::{Logical, Point, Rectangle};

use crate::geometry::RectExt;

/// Union of damaged rectangles.
#[derive(Default, PartialEq, Eq, Clone, Debug)]
pub struct Region {
    rects: Vec<Rectangle<i32, Logical>>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rectangle to the region.
    ///
    /// Rectangles already covered by a single member are ignored, members
    /// covered by the new rectangle are dropped.
    pub fn union_rect(&mut self, rect: Rectangle<i32, Logical>) {
        if rect.is_degenerate() || self.rects.iter().any(|member| member.contains_rect(rect)) {
            return;
        }

        self.rects.retain(|member| !rect.contains_rect(*member));
        self.rects.push(rect);
    }

    /// Copy of the region moved by `offset`.
    pub fn translate(&self, offset: Point<i32, Logical>) -> Self {
        let rects = self.rects.iter().map(|rect| {
            let loc = rect.loc + offset;
            Rectangle::from_loc_and_size(loc, rect.size)
        });
        Self { rects: rects.collect() }
    }

    pub fn rects(&self) -> &[Rectangle<i32, Logical>] {
        &self.rects
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Check if any member contains the point.
    pub fn contains(&self, point: Point<i32, Logical>) -> bool {
        self.rects.iter().any(|rect| rect.contains(point))
    }

    /// Smallest rectangle covering the entire region.
    pub fn bounding_box(&self) -> Option<Rectangle<i32, Logical>> {
        self.rects.iter().copied().reduce(Rectangle::merge)
    }
}

impl From<Rectangle<i32, Logical>> for Region {
    fn from(rect: Rectangle<i32, Logical>) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }
}

impl FromIterator<Rectangle<i32, Logical>> for Region {
    fn from_iter<I: IntoIterator<Item = Rectangle<i32, Logical>>>(iter: I) -> Self {
        let mut region = Self::new();
        for rect in iter {
            region.union_rect(rect);
        }
        region
    }
}

/// Accumulated damage of one output, in output-local coordinates.
#[derive(Default, Debug)]
pub struct OutputDamage {
    region: Region,
    clip: Option<Rectangle<i32, Logical>>,
    frame_pending: bool,
}

impl OutputDamage {
    /// Restrict all further damage to `clip`.
    pub fn set_clip(&mut self, clip: Rectangle<i32, Logical>) {
        self.clip = Some(clip);
    }

    /// Damage a single rectangle.
    ///
    /// Parts outside of the clip rectangle are discarded.
    pub fn add_box(&mut self, rect: Rectangle<i32, Logical>) {
        let rect = match self.clip {
            Some(clip) => match rect.intersection(clip) {
                Some(rect) => rect,
                None => return,
            },
            None => rect,
        };

        if rect.is_degenerate() {
            return;
        }

        self.region.union_rect(rect);
        self.frame_pending = true;
    }

    /// Damage a region relative to `bounds`.
    ///
    /// Without a region, all of `bounds` is damaged.
    pub fn add_region(&mut self, region: Option<&Region>, bounds: Rectangle<i32, Logical>) {
        match region {
            Some(region) => {
                for rect in region.translate(bounds.loc).rects() {
                    self.add_box(*rect);
                }
            },
            None => self.add_box(bounds),
        }
    }

    /// Current damage without clearing it.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Take all accumulated damage.
    pub fn take_and_clear(&mut self) -> Region {
        mem::take(&mut self.region)
    }

    /// Check and reset whether a frame should be scheduled.
    pub fn take_frame_request(&mut self) -> bool {
        mem::take(&mut self.frame_pending)
    }
}
