use estatemap_shared::geo::{self, Coordinate, MAX_ZOOM, MIN_ZOOM};

/// What the map container currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: u8,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Container pixel position of a coordinate.
    pub fn to_screen(&self, coord: Coordinate) -> (f64, f64) {
        let (cx, cy) = geo::project(self.center, self.zoom);
        let (x, y) = geo::project(coord, self.zoom);
        (x - cx + self.width / 2.0, y - cy + self.height / 2.0)
    }

    /// Coordinate under a container pixel position.
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> Coordinate {
        let (cx, cy) = geo::project(self.center, self.zoom);
        geo::unproject(
            cx + sx - self.width / 2.0,
            cy + sy - self.height / 2.0,
            self.zoom,
        )
    }

    /// Center after dragging the content by `(dx, dy)` pixels.
    pub fn panned(&self, dx: f64, dy: f64) -> Coordinate {
        self.screen_to_world(self.width / 2.0 - dx, self.height / 2.0 - dy)
    }
}

/// Convert client (viewport) coordinates to container-relative pixel coordinates.
pub fn client_to_container(
    client_x: f64,
    client_y: f64,
    rect_left: f64,
    rect_top: f64,
) -> (f64, f64) {
    (client_x - rect_left, client_y - rect_top)
}

pub fn clamp_zoom(zoom: i32) -> u8 {
    zoom.clamp(i32::from(MIN_ZOOM), i32::from(MAX_ZOOM)) as u8
}

/// New center so that the point under the cursor stays put when zooming
/// from `view.zoom` to `new_zoom`.
pub fn zoom_center_at_cursor(
    view: &Viewport,
    cursor_x: f64,
    cursor_y: f64,
    new_zoom: u8,
) -> Coordinate {
    let anchor = view.screen_to_world(cursor_x, cursor_y);
    let (ax, ay) = geo::project(anchor, new_zoom);
    let offset_x = cursor_x - view.width / 2.0;
    let offset_y = cursor_y - view.height / 2.0;
    geo::unproject(ax - offset_x, ay - offset_y, new_zoom)
}

/// A press that either stays a click or turns into a pan once the pointer
/// leaves the threshold radius. Shared by mouse drags and one-finger touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pan {
    origin: (f64, f64),
    origin_center: Coordinate,
    threshold: f64,
    moved: bool,
}

impl Pan {
    pub fn new(origin: (f64, f64), origin_center: Coordinate, threshold: f64) -> Self {
        Pan {
            origin,
            origin_center,
            threshold,
            moved: false,
        }
    }

    /// Feed the pointer position. Returns the new map center while panning.
    pub fn update(
        &mut self,
        pos: (f64, f64),
        zoom: u8,
        width: f64,
        height: f64,
    ) -> Option<Coordinate> {
        let dx = pos.0 - self.origin.0;
        let dy = pos.1 - self.origin.1;
        if !self.moved && dx.hypot(dy) > self.threshold {
            self.moved = true;
        }
        if !self.moved {
            return None;
        }
        let from = Viewport {
            center: self.origin_center,
            zoom,
            width,
            height,
        };
        Some(from.panned(dx, dy))
    }

    pub fn is_pan(&self) -> bool {
        self.moved
    }

    pub fn origin(&self) -> (f64, f64) {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> Viewport {
        Viewport {
            center: Coordinate { lat: 12.97, lng: 77.59 },
            zoom: 12,
            width: 800.0,
            height: 600.0,
        }
    }

    fn close(a: Coordinate, b: Coordinate) -> bool {
        (a.lat - b.lat).abs() < 1e-9 && (a.lng - b.lng).abs() < 1e-9
    }

    #[test]
    fn test_client_to_container_offset() {
        let (x, y) = client_to_container(450.0, 350.0, 320.0, 50.0);
        assert!((x - 130.0).abs() < 1e-9);
        assert!((y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_center_maps_to_container_middle() {
        let v = view();
        let (x, y) = v.to_screen(v.center);
        assert!((x - 400.0).abs() < 1e-9);
        assert!((y - 300.0).abs() < 1e-9);
        assert!(close(v.screen_to_world(400.0, 300.0), v.center));
    }

    #[test]
    fn test_screen_to_world_inverts_to_screen() {
        let v = view();
        let point = Coordinate { lat: 12.99, lng: 77.63 };
        let (x, y) = v.to_screen(point);
        assert!(close(v.screen_to_world(x, y), point));
    }

    #[test]
    fn test_north_is_up_and_east_is_right() {
        let v = view();
        let (x, y) = v.to_screen(Coordinate { lat: 13.0, lng: 77.6 });
        assert!(x > 400.0);
        assert!(y < 300.0);
    }

    #[test]
    fn test_panned_moves_center_against_drag() {
        let v = view();
        // Dragging content right reveals what was to the west
        let center = v.panned(100.0, 0.0);
        assert!(center.lng < v.center.lng);
        assert!((center.lat - v.center.lat).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_keeps_cursor_anchor() {
        let v = view();
        let anchor = v.screen_to_world(150.0, 420.0);
        let center = zoom_center_at_cursor(&v, 150.0, 420.0, 13);
        let zoomed = Viewport { center, zoom: 13, ..v };
        let (x, y) = zoomed.to_screen(anchor);
        assert!((x - 150.0).abs() < 1e-6);
        assert!((y - 420.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_at_center_keeps_center() {
        let v = view();
        let center = zoom_center_at_cursor(&v, 400.0, 300.0, 14);
        assert!(close(center, v.center));
    }

    #[test]
    fn test_clamp_zoom() {
        assert_eq!(clamp_zoom(0), MIN_ZOOM);
        assert_eq!(clamp_zoom(25), MAX_ZOOM);
        assert_eq!(clamp_zoom(10), 10);
    }

    #[test]
    fn test_pan_below_threshold_stays_a_click() {
        let v = view();
        let mut pan = Pan::new((100.0, 100.0), v.center, 3.0);
        assert_eq!(pan.update((102.0, 101.0), v.zoom, v.width, v.height), None);
        assert!(!pan.is_pan());
        assert_eq!(pan.origin(), (100.0, 100.0));
    }

    #[test]
    fn test_pan_tracks_from_original_center() {
        let v = view();
        let mut pan = Pan::new((100.0, 100.0), v.center, 3.0);
        let first = pan.update((150.0, 100.0), v.zoom, v.width, v.height).unwrap();
        assert!(pan.is_pan());
        assert!(close(first, v.panned(50.0, 0.0)));
        // Coming back inside the radius keeps panning
        let back = pan.update((101.0, 100.0), v.zoom, v.width, v.height).unwrap();
        assert!(close(back, v.panned(1.0, 0.0)));
    }
}
