use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmenityCategory {
    Metro,
    School,
    Hospital,
    Airport,
}

impl AmenityCategory {
    pub const ALL: [AmenityCategory; 4] = [
        AmenityCategory::Metro,
        AmenityCategory::School,
        AmenityCategory::Hospital,
        AmenityCategory::Airport,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            AmenityCategory::Metro => "metro",
            AmenityCategory::School => "school",
            AmenityCategory::Hospital => "hospital",
            AmenityCategory::Airport => "airport",
        }
    }

    /// Plural label shown in the filter panel.
    pub fn label(self) -> &'static str {
        match self {
            AmenityCategory::Metro => "Metros",
            AmenityCategory::School => "Schools",
            AmenityCategory::Hospital => "Hospitals",
            AmenityCategory::Airport => "Airports",
        }
    }

    /// Category string understood by the upstream nearby-search API.
    pub fn places_type(self) -> &'static str {
        match self {
            AmenityCategory::Metro => "subway_station",
            AmenityCategory::School => "school",
            AmenityCategory::Hospital => "hospital",
            AmenityCategory::Airport => "airport",
        }
    }
}

impl std::fmt::Display for AmenityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for AmenityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        AmenityCategory::ALL
            .into_iter()
            .find(|c| c.slug() == needle || c.places_type() == needle)
            .or(match needle.as_str() {
                "metros" | "subway" | "metro_station" => Some(AmenityCategory::Metro),
                "schools" => Some(AmenityCategory::School),
                "hospitals" => Some(AmenityCategory::Hospital),
                "airports" => Some(AmenityCategory::Airport),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown amenity category: {}", s))
    }
}

/// An amenity attached to a project in its source record, with the distance
/// the dataset (or the loader) computed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyAmenity {
    pub name: String,
    pub distance_km: f64,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub nearby: BTreeMap<AmenityCategory, Vec<NearbyAmenity>>,
}

impl Project {
    /// Precomputed amenities of one category, if the source record had a list for it.
    pub fn nearby_of(&self, category: AmenityCategory) -> Option<&[NearbyAmenity]> {
        self.nearby.get(&category).map(Vec::as_slice)
    }
}

/// Generate a URL-safe slug from a display name.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    pub name: String,
    pub category: AmenityCategory,
    pub coordinate: Coordinate,
}

/// Image URLs for a project, from the separate image dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectImages {
    pub project_name: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayKind {
    Line,
    Area,
}

/// A route or boundary drawn beneath the markers. Each path is one
/// line string or polygon ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub name: Option<String>,
    pub kind: OverlayKind,
    pub paths: Vec<Vec<Coordinate>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerIcon {
    Project,
    Amenity(AmenityCategory),
}

impl MarkerIcon {
    /// Fill color of the map pin.
    pub fn color(self) -> &'static str {
        match self {
            MarkerIcon::Project => "#d64545",
            MarkerIcon::Amenity(AmenityCategory::Metro) => "#7b3fb5",
            MarkerIcon::Amenity(AmenityCategory::School) => "#2f7fd1",
            MarkerIcon::Amenity(AmenityCategory::Hospital) => "#2e9e5b",
            MarkerIcon::Amenity(AmenityCategory::Airport) => "#e08a1e",
        }
    }

    /// Single-letter glyph drawn inside the pin.
    pub fn glyph(self) -> char {
        match self {
            MarkerIcon::Project => 'P',
            MarkerIcon::Amenity(AmenityCategory::Metro) => 'M',
            MarkerIcon::Amenity(AmenityCategory::School) => 'S',
            MarkerIcon::Amenity(AmenityCategory::Hospital) => 'H',
            MarkerIcon::Amenity(AmenityCategory::Airport) => 'A',
        }
    }
}

/// A renderable point for the current view state. `project_id` is set for
/// project markers so a click can select them.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub icon: MarkerIcon,
    pub label: String,
    pub detail: Option<String>,
    pub project_id: Option<String>,
}

// Upstream nearby-search wire types. Unknown fields are ignored.

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub results: Vec<Place>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub geometry: PlaceGeometry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceGeometry {
    pub location: PlaceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaceLocation {
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.geometry.location.lat, self.geometry.location.lng)
    }
}
