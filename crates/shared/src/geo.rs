/// Geodesy and web-map projection helpers.
///
/// Distances use a spherical Earth (haversine). Map projection is the
/// Web-Mercator scheme used by OSM raster tiles: 256px tiles, zoom 0 is a
/// single tile covering the whole world.
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Raster tile edge in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Web-Mercator cannot represent the poles; latitudes are clamped to this.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

pub const MIN_ZOOM: u8 = 3;
pub const MAX_ZOOM: u8 = 18;
pub const DEFAULT_ZOOM: u8 = 12;

/// Initial map center (Bengaluru east).
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    lat: 12.992_765_5,
    lng: 77.806_044_8,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let c = Coordinate { lat, lng };
        c.is_valid().then_some(c)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Human-readable distance: meters below 1 km, two-decimal kilometers above.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{:.2} km", km)
    }
}

/// World size in pixels at a given zoom level.
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

/// Project a coordinate to Web-Mercator world pixels at `zoom`.
pub fn project(coord: Coordinate, zoom: u8) -> (f64, f64) {
    let size = world_size(zoom);
    let lat = coord.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (coord.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    (x, y)
}

/// Inverse of [`project`]. X wraps around the antimeridian, Y is clamped.
pub fn unproject(x: f64, y: f64, zoom: u8) -> Coordinate {
    let size = world_size(zoom);
    let x = x.rem_euclid(size);
    let y = y.clamp(0.0, size);
    let lng = x / size * 360.0 - 180.0;
    let n = std::f64::consts::PI * (1.0 - 2.0 * y / size);
    let lat = n.sinh().atan().to_degrees();
    Coordinate { lat, lng }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// A tile that intersects the viewport, with its top-left corner in
/// viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub key: TileKey,
    pub left: f64,
    pub top: f64,
}

/// Tiles covering a `width` x `height` viewport centered on `center`.
///
/// Columns wrap horizontally; rows outside the world are skipped.
pub fn visible_tiles(center: Coordinate, zoom: u8, width: f64, height: f64) -> Vec<PlacedTile> {
    let (cx, cy) = project(center, zoom);
    let origin_x = cx - width / 2.0;
    let origin_y = cy - height / 2.0;
    let tiles_per_axis = 1i64 << zoom;

    let first_col = (origin_x / TILE_SIZE).floor() as i64;
    let last_col = ((origin_x + width) / TILE_SIZE).ceil() as i64 - 1;
    let first_row = ((origin_y / TILE_SIZE).floor() as i64).max(0);
    let last_row = (((origin_y + height) / TILE_SIZE).ceil() as i64 - 1).min(tiles_per_axis - 1);

    let mut tiles = Vec::new();
    for row in first_row..=last_row {
        for col in first_col..=last_col {
            tiles.push(PlacedTile {
                key: TileKey {
                    z: zoom,
                    x: col.rem_euclid(tiles_per_axis) as u32,
                    y: row as u32,
                },
                left: col as f64 * TILE_SIZE - origin_x,
                top: row as f64 * TILE_SIZE - origin_y,
            });
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let a = c(12.99, 77.80);
        assert_eq!(haversine_km(a, a), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let pairs = [
            (c(12.99, 77.80), c(13.19, 77.70)),
            (c(-33.86, 151.21), c(51.50, -0.12)),
            (c(0.0, 179.9), c(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        // One degree along a meridian is ~111.19 km on a 6371 km sphere
        let d = haversine_km(c(0.0, 0.0), c(1.0, 0.0));
        assert!((d - 111.195).abs() < 0.01);
    }

    #[test]
    fn test_haversine_known_city_pair() {
        // Bengaluru city center to Kempegowda airport, roughly 30 km
        let d = haversine_km(c(12.9716, 77.5946), c(13.1986, 77.7066));
        assert!(d > 27.0 && d < 29.0, "got {d}");
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(12.0, 77.0).is_some());
        assert!(Coordinate::new(90.0, -180.0).is_some());
        assert!(Coordinate::new(90.1, 0.0).is_none());
        assert!(Coordinate::new(0.0, 180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.85), "850 m");
        assert_eq!(format_distance(2.348), "2.35 km");
        assert_eq!(format_distance(0.0), "0 m");
    }

    #[test]
    fn test_project_origin_is_world_center() {
        let (x, y) = project(c(0.0, 0.0), 0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_unproject_inverse() {
        let p = c(12.9927655, 77.8060448);
        let (x, y) = project(p, 12);
        let back = unproject(x, y, 12);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lng - p.lng).abs() < 1e-9);
    }

    #[test]
    fn test_project_clamps_poles() {
        let (_, y) = project(c(90.0, 0.0), 1);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_visible_tiles_single_tile_world() {
        let tiles = visible_tiles(c(0.0, 0.0), 0, 256.0, 256.0);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].key, TileKey { z: 0, x: 0, y: 0 });
        assert!((tiles[0].left).abs() < 1e-9);
        assert!((tiles[0].top).abs() < 1e-9);
    }

    #[test]
    fn test_visible_tiles_cover_viewport() {
        let tiles = visible_tiles(DEFAULT_CENTER, DEFAULT_ZOOM, 800.0, 600.0);
        // 800px spans at most 5 columns, 600px at most 4 rows
        assert!(tiles.len() >= 12 && tiles.len() <= 20);
        assert!(tiles.iter().all(|t| t.key.z == DEFAULT_ZOOM));
        assert!(tiles.iter().any(|t| t.left <= 0.0 && t.top <= 0.0));
    }

    #[test]
    fn test_visible_tiles_wrap_columns() {
        let tiles = visible_tiles(c(0.0, 179.99), 1, 512.0, 256.0);
        assert!(tiles.iter().any(|t| t.key.x == 0));
        assert!(tiles.iter().any(|t| t.key.x == 1));
    }
}
