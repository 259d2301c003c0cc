/// Nearest-amenity resolution for a selected project.
///
/// One nearby-search per category, all issued together; each category always
/// yields exactly one entry, with a "Not found" sentinel standing in for a
/// failed or empty search.
use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::geo::{haversine_km, Coordinate};
use crate::models::{AmenityCategory, PlacesResponse};

/// Categories resolved when a project is selected.
pub const NEAREST_CATEGORIES: [AmenityCategory; 3] = [
    AmenityCategory::Airport,
    AmenityCategory::Hospital,
    AmenityCategory::School,
];

pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestAmenity {
    pub category: AmenityCategory,
    pub name: String,
    pub distance_km: f64,
    pub coordinate: Option<Coordinate>,
}

impl NearestAmenity {
    pub fn not_found(category: AmenityCategory) -> Self {
        NearestAmenity {
            category,
            name: NOT_FOUND.to_string(),
            distance_km: 0.0,
            coordinate: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.coordinate.is_some()
    }
}

/// Pick the closest place in a search response, ranked by haversine distance
/// from `origin`. Places without a valid location are ignored.
pub fn nearest_from_response(
    origin: Coordinate,
    category: AmenityCategory,
    response: &PlacesResponse,
) -> NearestAmenity {
    response
        .results
        .iter()
        .filter_map(|place| {
            let coordinate = place.coordinate()?;
            Some(NearestAmenity {
                category,
                name: place.name.clone(),
                distance_km: haversine_km(origin, coordinate),
                coordinate: Some(coordinate),
            })
        })
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
        .unwrap_or_else(|| NearestAmenity::not_found(category))
}

/// Resolve the nearest amenity of each category around `origin`.
///
/// `fetch` performs one nearby-search. All searches run concurrently and the
/// result has one entry per requested category, in request order.
pub async fn resolve_nearest<F, Fut>(
    origin: Coordinate,
    categories: &[AmenityCategory],
    fetch: F,
) -> Vec<NearestAmenity>
where
    F: Fn(AmenityCategory) -> Fut,
    Fut: Future<Output = Result<PlacesResponse, String>>,
{
    let lookups = categories.iter().map(|&category| {
        let pending = fetch(category);
        async move {
            match pending.await {
                Ok(response) => nearest_from_response(origin, category, &response),
                Err(e) => {
                    tracing::warn!(%category, error = %e, "Nearby search failed");
                    NearestAmenity::not_found(category)
                }
            }
        }
    });
    join_all(lookups).await
}
