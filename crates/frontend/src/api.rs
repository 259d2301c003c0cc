use serde::de::DeserializeOwned;

use estatemap_shared::geo::Coordinate;
use estatemap_shared::models::{AmenityCategory, PlacesResponse};

/// Build the proxy URL for one nearby search.
pub fn build_places_url(origin: &str, category: AmenityCategory, at: Coordinate) -> String {
    format!(
        "{}/api/places?type={}&lat={}&lng={}",
        origin,
        category.places_type(),
        at.lat,
        at.lng
    )
}

/// URL of a static geodata file served under `/data`.
pub fn data_url(origin: &str, file: &str) -> String {
    format!("{}/data/{}", origin, file.trim_start_matches('/'))
}

fn origin() -> Result<String, String> {
    // In production, same origin. In dev, might be different.
    let window = web_sys::window().ok_or("No window")?;
    window
        .location()
        .origin()
        .map_err(|_| "Could not read page origin".to_string())
}

pub async fn fetch_text(url: &str) -> Result<String, String> {
    let resp = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("{} returned {}: {}", url, status, body.trim()));
    }
    Ok(body)
}

pub async fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T, String> {
    let body = fetch_text(url).await?;
    serde_json::from_str(&body).map_err(|e| format!("{}: {}", url, e))
}

/// Fetch a static data file by name.
pub async fn fetch_data_file(file: &str) -> Result<String, String> {
    fetch_text(&data_url(&origin()?, file)).await
}

/// One nearby search through the backend proxy.
pub async fn fetch_places(
    category: AmenityCategory,
    at: Coordinate,
) -> Result<PlacesResponse, String> {
    fetch_json(&build_places_url(&origin()?, category, at)).await
}
