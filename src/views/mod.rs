//! Window management.

use smithay::utils::{Logical, Point};

use crate::protocol::SurfaceId;
use crate::views::surface::OffsetSurface;
use crate::views::view::View;

pub mod surface;
pub mod view;

/// Toplevel windows in stacking order.
#[derive(Debug, Default)]
pub struct Views {
    /// Views sorted front to back.
    views: Vec<View>,
}

impl Views {
    /// Add a new view at the front.
    pub fn add(&mut self, view: View) {
        self.views.insert(0, view);
    }

    pub fn remove(&mut self, surface: SurfaceId) -> Option<View> {
        let index = self.position(surface)?;
        Some(self.views.remove(index))
    }

    pub fn get(&self, surface: SurfaceId) -> Option<&View> {
        self.views.iter().find(|view| view.surface == surface)
    }

    pub fn get_mut(&mut self, surface: SurfaceId) -> Option<&mut View> {
        self.views.iter_mut().find(|view| view.surface == surface)
    }

    /// Move a view to the front.
    pub fn raise(&mut self, surface: SurfaceId) {
        if let Some(index) = self.position(surface) {
            let view = self.views.remove(index);
            self.views.insert(0, view);
        }
    }

    /// Views front to back.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &View> {
        self.views.iter()
    }

    /// Topmost mapped view at a layout point.
    pub fn view_at(&self, point: Point<f64, Logical>) -> Option<(&View, OffsetSurface)> {
        self.views
            .iter()
            .filter(|view| view.mapped)
            .find_map(|view| Some((view, view.surface_at(point)?)))
    }

    /// Frontmost mapped view, ignoring `except`.
    pub fn next_mapped(&self, except: SurfaceId) -> Option<&View> {
        self.views.iter().find(|view| view.mapped && view.surface != except)
    }

    fn position(&self, surface: SurfaceId) -> Option<usize> {
        self.views.iter().position(|view| view.surface == surface)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::ClientId;
    use crate::views::surface::SurfaceTree;
    use crate::views::view::ViewKind;

    fn mapped_view(id: u32, location: (i32, i32)) -> View {
        let mut view = View::new(SurfaceId(id), ClientId(id), ViewKind::Xdg { acked_serial: None });
        view.set_location(location.into());
        view.commit(SurfaceTree { size: (100, 100).into(), ..SurfaceTree::new(SurfaceId(id)) });
        view.mapped = true;
        view
    }

    #[test]
    fn front_to_back() {
        let mut views = Views::default();
        views.add(mapped_view(1, (0, 0)));
        views.add(mapped_view(2, (50, 50)));

        let (view, hit) = views.view_at((60., 60.).into()).unwrap();
        assert_eq!(view.surface, SurfaceId(2));
        assert_eq!(hit.local, Point::from((10., 10.)));

        views.raise(SurfaceId(1));
        let (view, hit) = views.view_at((60., 60.).into()).unwrap();
        assert_eq!(view.surface, SurfaceId(1));
        assert_eq!(hit.local, Point::from((60., 60.)));
    }

    #[test]
    fn unmapped_views_ignored() {
        let mut views = Views::default();
        views.add(mapped_view(1, (0, 0)));
        views.add(mapped_view(2, (0, 0)));
        views.get_mut(SurfaceId(2)).unwrap().mapped = false;

        let (view, _) = views.view_at((10., 10.).into()).unwrap();
        assert_eq!(view.surface, SurfaceId(1));
        assert_eq!(views.next_mapped(SurfaceId(1)).map(|view| view.surface), None);
        assert!(views.view_at((500., 500.).into()).is_none());
    }
}
