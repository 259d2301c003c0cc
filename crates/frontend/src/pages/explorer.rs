use dioxus::prelude::*;
use estatemap_shared::geo::{Coordinate, DEFAULT_CENTER, DEFAULT_ZOOM};
use estatemap_shared::loader::{self, LoadError, MAX_CSV_ROWS};
use estatemap_shared::models::{AmenityCategory, Project};
use estatemap_shared::nearest::{resolve_nearest, NEAREST_CATEGORIES};
use estatemap_shared::state::{Action, DataSource, Payload, ViewState};

use crate::api;
use crate::components::amenity_filter::AmenityFilter;
use crate::components::map_view::MapView;
use crate::components::project_details::ProjectDetails;

const PROJECTS_FILE: &str = "projects.json";
const PROJECT_IMAGES_FILE: &str = "project_images.json";
const OVERLAYS_FILE: &str = "metro_lines.geojson";

/// Static file backing a data source. Nearest amenities come from the
/// proxy instead.
fn source_file(source: DataSource) -> Option<&'static str> {
    match source {
        DataSource::Projects => Some(PROJECTS_FILE),
        DataSource::ProjectImages => Some(PROJECT_IMAGES_FILE),
        DataSource::Amenities(AmenityCategory::Metro) => Some("metros.json"),
        DataSource::Amenities(AmenityCategory::School) => Some("schools.json"),
        DataSource::Amenities(AmenityCategory::Hospital) => Some("hospitals.json"),
        DataSource::Amenities(AmenityCategory::Airport) => Some("airports.csv"),
        DataSource::Overlays => Some(OVERLAYS_FILE),
        DataSource::Nearest => None,
    }
}

/// Sources fetched once when the page mounts.
fn initial_sources() -> Vec<DataSource> {
    let mut sources = vec![DataSource::Projects, DataSource::ProjectImages];
    sources.extend(AmenityCategory::ALL.into_iter().map(DataSource::Amenities));
    sources.push(DataSource::Overlays);
    sources
}

/// Parse a fetched file into the payload for its source. Parse errors
/// become a failed load.
fn parse_payload(source: DataSource, text: &str) -> Payload {
    let parsed: Result<Payload, LoadError> = match source {
        DataSource::Projects => loader::parse_projects(text).map(Payload::Projects),
        DataSource::ProjectImages => loader::parse_project_images(text).map(Payload::ProjectImages),
        DataSource::Amenities(category) => match source_file(source) {
            Some(file) if file.ends_with(".csv") => {
                loader::parse_csv_amenities(category, text, MAX_CSV_ROWS).map(Payload::Amenities)
            }
            _ => loader::parse_amenities(category, text).map(Payload::Amenities),
        },
        DataSource::Overlays => loader::parse_overlays(text).map(Payload::Overlays),
        DataSource::Nearest => Err(LoadError::Shape(
            "nearest amenities are not loaded from a file".to_string(),
        )),
    };
    parsed.unwrap_or_else(|e| Payload::Failed(e.to_string()))
}

fn dispatch(mut view: Signal<ViewState>, action: Action) {
    let next = view.peek().apply(action);
    view.set(next);
}

/// A static file request that has been issued but not answered yet.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingLoad {
    source: DataSource,
    file: &'static str,
    generation: u64,
}

/// Bump the generation of every source in `sources` that is backed by a
/// file and return the requests to send.
fn issue_loads(state: &ViewState, sources: &[DataSource]) -> (ViewState, Vec<PendingLoad>) {
    let mut next = state.clone();
    let mut pending = Vec::new();
    for &source in sources {
        let Some(file) = source_file(source) else { continue };
        next = next.apply(Action::RequestIssued(source));
        pending.push(PendingLoad {
            source,
            file,
            generation: next.generation(source),
        });
    }
    (next, pending)
}

/// Fetch one issued request and apply its result.
fn fetch_source(view: Signal<ViewState>, load: PendingLoad) {
    spawn(async move {
        let payload = match api::fetch_data_file(load.file).await {
            Ok(text) => parse_payload(load.source, &text),
            Err(e) => Payload::Failed(e),
        };
        dispatch(
            view,
            Action::DataLoaded {
                source: load.source,
                generation: load.generation,
                payload,
            },
        );
    });
}

/// Request every static source. Called from an effect, never during render.
fn load_all(mut view: Signal<ViewState>) {
    let (next, pending) = issue_loads(&view.peek(), &initial_sources());
    view.set(next);
    for load in pending {
        fetch_source(view, load);
    }
}

/// Select a project, center the map on it and resolve its nearest amenities.
fn select_project(view: Signal<ViewState>, mut center: Signal<Coordinate>, id: String) {
    dispatch(view, Action::SelectProject(id.clone()));
    let origin = view
        .peek()
        .selected_project()
        .filter(|p| p.id == id)
        .map(|p| p.coordinate);
    let Some(origin) = origin else { return };
    center.set(origin);

    dispatch(view, Action::RequestIssued(DataSource::Nearest));
    let generation = view.peek().generation(DataSource::Nearest);
    spawn(async move {
        let entries = resolve_nearest(origin, &NEAREST_CATEGORIES, |category| {
            api::fetch_places(category, origin)
        })
        .await;
        let found = entries.iter().filter(|e| e.is_found()).count();
        tracing::debug!(project = %id, found, "Nearest amenities resolved");
        dispatch(
            view,
            Action::DataLoaded {
                source: DataSource::Nearest,
                generation,
                payload: Payload::Nearest {
                    project_id: id,
                    entries,
                },
            },
        );
    });
}

#[component]
pub fn Explorer() -> Element {
    let view = use_signal(ViewState::new);
    let center = use_signal(|| DEFAULT_CENTER);
    let zoom = use_signal(|| DEFAULT_ZOOM);

    // Reads inside are `peek` only, so this runs once after the first render
    use_effect(move || load_all(view));

    let state = view.read();
    let markers = state.markers();
    let overlays = state.overlays.clone();
    let projects = state.projects_with_images();
    let selected: Option<Project> = state.selected_project().map(|p| Project {
        images: state.images_for(p),
        ..p.clone()
    });
    let selected_coordinate = selected.as_ref().map(|p| p.coordinate);
    let nearest = state.nearest().map(<[_]>::to_vec);
    let filters = state.filters.clone();
    let counts: Vec<(AmenityCategory, usize)> = AmenityCategory::ALL
        .into_iter()
        .map(|c| (c, state.amenities.get(&c).map_or(0, |list| list.len())))
        .collect();
    drop(state);

    rsx! {
        div { class: "app",
            div { class: "header",
                h1 { "Project Map" }
            }

            div { class: "sidebar",
                AmenityFilter {
                    filters: filters,
                    counts: counts,
                    on_change: move |filters| dispatch(view, Action::SetFilters(filters)),
                }

                ProjectDetails {
                    projects: projects,
                    selected: selected,
                    nearest: nearest,
                    on_select: move |id| select_project(view, center, id),
                    on_clear: move |_| dispatch(view, Action::ClearSelection),
                }
            }

            MapView {
                markers: markers,
                overlays: overlays,
                selected: selected_coordinate,
                center: center,
                zoom: zoom,
                on_select: move |id| select_project(view, center, id),
                on_clear: move |_| dispatch(view, Action::ClearSelection),
            }
        }
    }
}
