/// Nearby-search proxy. Holds the upstream credential so browsers never see it.
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use estatemap_shared::geo::Coordinate;

use crate::config::PlacesConfig;
use crate::error::{AppError, AppResult};
use crate::AppState;

const NEARBY_SEARCH_PATH: &str = "/maps/api/place/nearbysearch/json";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream answered {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    radius_m: u32,
}

impl PlacesClient {
    pub fn new(config: &PlacesConfig) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("estatemap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(PlacesClient {
            http,
            base_url: config.api_base.clone(),
            api_key: config.api_key.clone(),
            radius_m: config.radius_m,
        })
    }

    /// Run one nearby search and hand back the raw response body.
    pub async fn nearby_search(
        &self,
        place_type: &str,
        at: Coordinate,
    ) -> Result<Bytes, UpstreamError> {
        let url = format!("{}{}", self.base_url, NEARBY_SEARCH_PATH);
        let response = self
            .http
            .get(url)
            .query(&[
                ("location", format!("{},{}", at.lat, at.lng)),
                ("radius", self.radius_m.to_string()),
                ("type", place_type.to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }
        Ok(response.bytes().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlacesQuery {
    #[serde(rename = "type")]
    pub place_type: String,
    pub lat: f64,
    pub lng: f64,
}

pub async fn places_handler(
    State(state): State<AppState>,
    query: Result<Query<PlacesQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|e| AppError::bad_request(e.body_text()))?;
    let place_type = query.place_type.trim();
    if place_type.is_empty() {
        return Err(AppError::bad_request("Missing place type"));
    }
    let at = Coordinate::new(query.lat, query.lng).ok_or_else(|| {
        AppError::bad_request(format!("Coordinate out of range: {},{}", query.lat, query.lng))
    })?;

    match state.places.nearby_search(place_type, at).await {
        Ok(body) => {
            tracing::debug!(place_type, bytes = body.len(), "Nearby search succeeded");
            Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
        Err(e) => {
            tracing::error!(place_type, error = %e, "Nearby search failed");
            Err(AppError::internal(format!("Error fetching {} data", place_type)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::{Json, Router};
    use tower::ServiceExt;

    use crate::build_api;

    fn places_config(api_base: String) -> PlacesConfig {
        PlacesConfig {
            api_base,
            api_key: "test-key".to_string(),
            radius_m: 5000,
            timeout: Duration::from_secs(2),
        }
    }

    fn proxy_app(api_base: String) -> Router {
        let places = PlacesClient::new(&places_config(api_base)).unwrap();
        build_api(AppState { places })
    }

    /// Serve `router` on an ephemeral local port and return its base URL.
    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// A base URL nothing listens on.
    async fn dead_upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    async fn get_places(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_unreachable_upstream_names_category() {
        let app = proxy_app(dead_upstream().await);
        let (status, _, body) =
            get_places(app, "/api/places?type=hospital&lat=12.99&lng=77.80").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("hospital"));
        assert_eq!(body, "Error fetching hospital data");
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_500() {
        let upstream = Router::new().route(
            NEARBY_SEARCH_PATH,
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let app = proxy_app(spawn_upstream(upstream).await);
        let (status, _, body) =
            get_places(app, "/api/places?type=school&lat=12.99&lng=77.80").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Error fetching school data");
    }

    #[tokio::test]
    async fn test_success_passes_body_through_verbatim() {
        let upstream = Router::new().route(
            NEARBY_SEARCH_PATH,
            get(|Query(params): Query<HashMap<String, String>>| async move { Json(params) }),
        );
        let app = proxy_app(spawn_upstream(upstream).await);
        let (status, content_type, body) =
            get_places(app, "/api/places?type=airport&lat=12.99&lng=77.8").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let echoed: HashMap<String, String> = serde_json::from_str(&body).unwrap();
        assert_eq!(echoed["location"], "12.99,77.8");
        assert_eq!(echoed["radius"], "5000");
        assert_eq!(echoed["type"], "airport");
        assert_eq!(echoed["key"], "test-key");
    }

    #[tokio::test]
    async fn test_payload_shape_is_not_validated() {
        let upstream = Router::new().route(NEARBY_SEARCH_PATH, get(|| async { "not even json" }));
        let app = proxy_app(spawn_upstream(upstream).await);
        let (status, _, body) = get_places(app, "/api/places?type=school&lat=1&lng=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "not even json");
    }

    #[tokio::test]
    async fn test_bad_coordinates_are_rejected() {
        let base = dead_upstream().await;
        for uri in [
            "/api/places?type=school&lat=abc&lng=77.8",
            "/api/places?type=school&lng=77.8",
            "/api/places?type=school&lat=91&lng=77.8",
            "/api/places?type=%20&lat=12&lng=77.8",
        ] {
            let (status, _, _) = get_places(proxy_app(base.clone()), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_responses_carry_cors_headers() {
        let app = proxy_app(dead_upstream().await);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/api/places?type=hospital&lat=12.99&lng=77.80")
                    .header(header::ORIGIN, "http://localhost:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
