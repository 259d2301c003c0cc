use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::geo::format_distance;
use crate::models::{Amenity, AmenityCategory, Marker, MarkerIcon, NearbyAmenity, Project};

fn project_marker(project: &Project) -> Marker {
    Marker {
        coordinate: project.coordinate,
        icon: MarkerIcon::Project,
        label: project.name.clone(),
        detail: None,
        project_id: Some(project.id.clone()),
    }
}

fn amenity_marker(amenity: &Amenity) -> Marker {
    Marker {
        coordinate: amenity.coordinate,
        icon: MarkerIcon::Amenity(amenity.category),
        label: amenity.name.clone(),
        detail: None,
        project_id: None,
    }
}

fn nearby_marker(category: AmenityCategory, nearby: &NearbyAmenity) -> Marker {
    Marker {
        coordinate: nearby.coordinate,
        icon: MarkerIcon::Amenity(category),
        label: nearby.name.clone(),
        detail: Some(format_distance(nearby.distance_km)),
        project_id: None,
    }
}

/// Compute the markers to display for a view state.
///
/// With no selection: every project, plus every bulk amenity of each active
/// filter. With a selection: only that project, plus for each active filter
/// the project's own nearby list for the category, or the bulk dataset when
/// the project carries no list for it.
///
/// Projects come first, then amenities in category order. Markers with
/// invalid coordinates are never emitted.
pub fn derive_markers(
    projects: &[Project],
    selected: Option<&Project>,
    filters: &BTreeSet<AmenityCategory>,
    amenities: &BTreeMap<AmenityCategory, Arc<[Amenity]>>,
) -> Vec<Marker> {
    let mut markers: Vec<Marker> = match selected {
        Some(project) => vec![project_marker(project)],
        None => projects.iter().map(project_marker).collect(),
    };

    for &category in filters {
        let bulk = || {
            amenities
                .get(&category)
                .map(|list| list.iter().map(amenity_marker).collect::<Vec<_>>())
                .unwrap_or_default()
        };
        let for_category = match selected.and_then(|p| p.nearby_of(category)) {
            Some(nearby) => nearby.iter().map(|n| nearby_marker(category, n)).collect(),
            None => bulk(),
        };
        markers.extend(for_category);
    }

    markers.retain(|m| m.coordinate.is_valid());
    markers
}
