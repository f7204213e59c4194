//! Extensions to Smithay's geometry module.

use smithay::utils::{Logical, Point, Rectangle};

pub trait RectExt {
    /// Top-left, top-right, bottom-left and bottom-right corners.
    ///
    /// The right and bottom corners lie on the exclusive edges.
    fn corners(&self) -> [Point<i32, Logical>; 4];

    /// Closest point inside the rectangle.
    fn clamp_point(&self, point: Point<f64, Logical>) -> Point<f64, Logical>;

    /// Map normalized coordinates onto the rectangle.
    fn denormalize(&self, x: f64, y: f64) -> Point<f64, Logical>;

    /// Check if the rectangle covers no area.
    fn is_degenerate(&self) -> bool;
}

impl RectExt for Rectangle<i32, Logical> {
    fn corners(&self) -> [Point<i32, Logical>; 4] {
        let (x, y) = (self.loc.x, self.loc.y);
        let (right, bottom) = (x + self.size.w, y + self.size.h);
        [(x, y).into(), (right, y).into(), (x, bottom).into(), (right, bottom).into()]
    }

    fn clamp_point(&self, point: Point<f64, Logical>) -> Point<f64, Logical> {
        if self.is_degenerate() {
            return self.loc.to_f64();
        }

        let min = self.loc.to_f64();
        let max_x = (self.loc.x + self.size.w - 1) as f64;
        let max_y = (self.loc.y + self.size.h - 1) as f64;
        Point::from((point.x.min(max_x).max(min.x), point.y.min(max_y).max(min.y)))
    }

    fn denormalize(&self, x: f64, y: f64) -> Point<f64, Logical> {
        let x = self.loc.x as f64 + x.clamp(0., 1.) * self.size.w as f64;
        let y = self.loc.y as f64 + y.clamp(0., 1.) * self.size.h as f64;
        self.clamp_point((x, y).into())
    }

    fn is_degenerate(&self) -> bool {
        self.size.w <= 0 || self.size.h <= 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn corners_on_exclusive_edges() {
        let rect = Rectangle::<i32, Logical>::from_loc_and_size((10, 20), (30, 40));
        let corners = rect.corners();
        assert_eq!(corners[0], Point::from((10, 20)));
        assert_eq!(corners[1], Point::from((40, 20)));
        assert_eq!(corners[2], Point::from((10, 60)));
        assert_eq!(corners[3], Point::from((40, 60)));
    }

    #[test]
    fn clamp_inside() {
        let rect = Rectangle::<i32, Logical>::from_loc_and_size((0, 0), (1920, 1080));
        assert_eq!(rect.clamp_point((-5., 2000.).into()), Point::from((0., 1079.)));
        assert_eq!(rect.clamp_point((20.5, 30.).into()), Point::from((20.5, 30.)));
        assert_eq!(rect.denormalize(0.5, 1.), Point::from((960., 1079.)));
    }
}
