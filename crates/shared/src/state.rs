/// View state for the map screen as an immutable value.
///
/// Every transition goes through [`ViewState::apply`], which returns a new
/// state and leaves the old one untouched. Asynchronous loads are tagged with
/// a per-source generation: a result older than the latest request issued for
/// its source is dropped so a late response never overwrites newer data.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::loader::attach_images;
use crate::markers::derive_markers;
use crate::models::{Amenity, AmenityCategory, Marker, Overlay, Project, ProjectImages};
use crate::nearest::NearestAmenity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataSource {
    Projects,
    ProjectImages,
    Amenities(AmenityCategory),
    Overlays,
    Nearest,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Projects => write!(f, "projects"),
            DataSource::ProjectImages => write!(f, "project images"),
            DataSource::Amenities(c) => write!(f, "{} amenities", c),
            DataSource::Overlays => write!(f, "overlays"),
            DataSource::Nearest => write!(f, "nearest amenities"),
        }
    }
}

/// Data delivered by a completed load.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Projects(Vec<Project>),
    ProjectImages(Vec<ProjectImages>),
    Amenities(Vec<Amenity>),
    Overlays(Vec<Overlay>),
    Nearest {
        project_id: String,
        entries: Vec<NearestAmenity>,
    },
    /// The load failed; the source is left empty.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SelectProject(String),
    ClearSelection,
    SetFilters(BTreeSet<AmenityCategory>),
    RequestIssued(DataSource),
    DataLoaded {
        source: DataSource,
        generation: u64,
        payload: Payload,
    },
}

/// Nearest-amenity results for one project.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestResult {
    pub project_id: String,
    pub entries: Arc<[NearestAmenity]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub projects: Arc<[Project]>,
    pub images: Arc<[ProjectImages]>,
    pub amenities: BTreeMap<AmenityCategory, Arc<[Amenity]>>,
    pub overlays: Arc<[Overlay]>,
    pub selected: Option<String>,
    pub filters: BTreeSet<AmenityCategory>,
    pub nearest: Option<NearestResult>,
    generations: BTreeMap<DataSource, u64>,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            projects: Arc::from(Vec::new()),
            images: Arc::from(Vec::new()),
            amenities: BTreeMap::new(),
            overlays: Arc::from(Vec::new()),
            selected: None,
            filters: BTreeSet::new(),
            nearest: None,
            generations: BTreeMap::new(),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest generation issued for `source` (0 before any request).
    pub fn generation(&self, source: DataSource) -> u64 {
        self.generations.get(&source).copied().unwrap_or(0)
    }

    pub fn selected_project(&self) -> Option<&Project> {
        let id = self.selected.as_deref()?;
        self.projects.iter().find(|p| p.id == id)
    }

    /// Projects with the separate image dataset merged in.
    pub fn projects_with_images(&self) -> Vec<Project> {
        attach_images(&self.projects, &self.images)
    }

    /// Every image URL known for a project, own images first.
    pub fn images_for(&self, project: &Project) -> Vec<String> {
        attach_images(std::slice::from_ref(project), &self.images)
            .pop()
            .map(|p| p.images)
            .unwrap_or_default()
    }

    /// Nearest-amenity entries for the current selection, if resolved.
    pub fn nearest(&self) -> Option<&[NearestAmenity]> {
        let result = self.nearest.as_ref()?;
        (self.selected.as_deref() == Some(result.project_id.as_str()))
            .then_some(&result.entries[..])
    }

    pub fn markers(&self) -> Vec<Marker> {
        derive_markers(
            &self.projects,
            self.selected_project(),
            &self.filters,
            &self.amenities,
        )
    }

    /// Apply a transition, producing the next state.
    pub fn apply(&self, action: Action) -> ViewState {
        let mut next = self.clone();
        match action {
            Action::SelectProject(id) => {
                if !self.projects.iter().any(|p| p.id == id) {
                    tracing::warn!(project_id = %id, "Ignoring selection of unknown project");
                    return next;
                }
                if next.nearest.as_ref().is_some_and(|n| n.project_id != id) {
                    next.nearest = None;
                }
                next.selected = Some(id);
            }
            Action::ClearSelection => {
                next.selected = None;
                next.nearest = None;
            }
            Action::SetFilters(filters) => {
                next.filters = filters;
            }
            Action::RequestIssued(source) => {
                *next.generations.entry(source).or_insert(0) += 1;
            }
            Action::DataLoaded {
                source,
                generation,
                payload,
            } => {
                let latest = self.generation(source);
                if generation < latest {
                    tracing::debug!(%source, generation, latest, "Discarding stale load result");
                    return next;
                }
                next.load(source, payload);
            }
        }
        next
    }

    fn load(&mut self, source: DataSource, payload: Payload) {
        match (source, payload) {
            (_, Payload::Failed(reason)) => {
                tracing::error!(%source, error = %reason, "Failed to load data source");
                self.clear(source);
            }
            (DataSource::Projects, Payload::Projects(projects)) => {
                tracing::info!(count = projects.len(), "Loaded projects");
                self.projects = Arc::from(projects);
                if self.selected_project().is_none() {
                    self.selected = None;
                    self.nearest = None;
                }
            }
            (DataSource::ProjectImages, Payload::ProjectImages(images)) => {
                self.images = Arc::from(images);
            }
            (DataSource::Amenities(category), Payload::Amenities(list)) => {
                tracing::info!(%category, count = list.len(), "Loaded amenities");
                let list: Vec<Amenity> = list
                    .into_iter()
                    .filter(|a| a.category == category)
                    .collect();
                self.amenities.insert(category, Arc::from(list));
            }
            (DataSource::Overlays, Payload::Overlays(overlays)) => {
                self.overlays = Arc::from(overlays);
            }
            (DataSource::Nearest, Payload::Nearest { project_id, entries }) => {
                if self.selected.as_deref() == Some(project_id.as_str()) {
                    self.nearest = Some(NearestResult {
                        project_id,
                        entries: Arc::from(entries),
                    });
                } else {
                    tracing::debug!(%project_id, "Dropping nearest amenities for stale selection");
                }
            }
            (source, payload) => {
                tracing::warn!(%source, ?payload, "Payload does not match data source");
            }
        }
    }

    fn clear(&mut self, source: DataSource) {
        match source {
            DataSource::Projects => {
                self.projects = Arc::from(Vec::new());
                self.selected = None;
                self.nearest = None;
            }
            DataSource::ProjectImages => self.images = Arc::from(Vec::new()),
            DataSource::Amenities(category) => {
                self.amenities.remove(&category);
            }
            DataSource::Overlays => self.overlays = Arc::from(Vec::new()),
            DataSource::Nearest => self.nearest = None,
        }
    }
}
