/// Parsers for the static geodata files the map view loads at startup.
///
/// Every parser is tolerant at the row level: a malformed record is dropped
/// with a `warn!` and the rest of the document still loads. Only a document
/// whose overall shape is wrong (not an array, not a FeatureCollection, a
/// table without the required columns) is an error.
use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};

use crate::geo::{haversine_km, Coordinate};
use crate::models::{
    slugify, Amenity, AmenityCategory, NearbyAmenity, Overlay, OverlayKind, Project,
    ProjectImages,
};

/// Upper bound on materialized rows from a delimited-text source.
pub const MAX_CSV_ROWS: usize = 500;

const NAME_KEYS: &[&str] = &["Project Name", "name", "Name", "project_name"];
const LAT_KEYS: &[&str] = &["Latitude", "latitude", "lat"];
const LNG_KEYS: &[&str] = &["Longitude", "longitude", "lng", "lon"];

/// Required table columns and the header spellings accepted for each.
const CSV_COLUMNS: [(&str, &[&str]); 3] = [
    ("name", &["name"]),
    ("latitude", &["latitude", "lat"]),
    ("longitude", &["longitude", "lng", "lon"]),
];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Look up the first present key, falling back to a trimmed, case-insensitive match.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).or_else(|| {
        obj.iter()
            .find(|(k, _)| keys.iter().any(|want| k.trim().eq_ignore_ascii_case(want)))
            .map(|(_, v)| v)
    })
}

/// Numbers, or strings holding numbers. Everything else is rejected.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a coordinate either from a nested `coordinates {latitude, longitude}`
/// object or from flat latitude/longitude fields.
fn coordinate_of(obj: &Map<String, Value>) -> Option<Coordinate> {
    if let Some(Value::Object(nested)) = field(obj, &["coordinates", "location"]) {
        return coordinate_of(nested);
    }
    let lat = number(field(obj, LAT_KEYS)?)?;
    let lng = number(field(obj, LNG_KEYS)?)?;
    Coordinate::new(lat, lng)
}

/// Distances in source data are kilometers, or strings like `"1.2 km"` / `"850 m"`.
fn distance_km(value: &Value) -> Option<f64> {
    if let Some(n) = number(value) {
        return (n >= 0.0).then_some(n);
    }
    let s = value.as_str()?.trim().to_ascii_lowercase();
    let km = if let Some(v) = s.strip_suffix("km") {
        v.trim().parse::<f64>().ok()?
    } else if let Some(v) = s.strip_suffix('m') {
        v.trim().parse::<f64>().ok()? / 1000.0
    } else {
        return None;
    };
    (km.is_finite() && km >= 0.0).then_some(km)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(text).collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn array_document(json: &str, what: &str) -> Result<Vec<Value>, LoadError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(rows) => Ok(rows),
        other => Err(LoadError::Shape(format!(
            "{what}: expected a JSON array, found {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// JSON sources
// ---------------------------------------------------------------------------

/// Parse the project list.
pub fn parse_projects(json: &str) -> Result<Vec<Project>, LoadError> {
    let rows = array_document(json, "projects")?;
    let total = rows.len();
    let projects: Vec<Project> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let project = project_from_row(row);
            if project.is_none() {
                tracing::warn!(row = i, "Skipping project without a name or valid coordinates");
            }
            project
        })
        .collect();
    let projects = unique_ids(projects);
    tracing::debug!(loaded = projects.len(), total, "Parsed projects");
    Ok(projects)
}

/// Suffix repeated ids with `-2`, `-3`, ... in document order so every
/// project is selectable on its own.
fn unique_ids(mut projects: Vec<Project>) -> Vec<Project> {
    let mut taken: HashSet<String> = projects.iter().map(|p| p.id.clone()).collect();
    let mut seen = HashSet::new();
    for project in &mut projects {
        if seen.insert(project.id.clone()) {
            continue;
        }
        let base = project.id.clone();
        let mut n = 2;
        while taken.contains(&format!("{base}-{n}")) {
            n += 1;
        }
        project.id = format!("{base}-{n}");
        tracing::warn!(
            project = %project.name,
            from = %base,
            to = %project.id,
            "Renamed duplicate project id"
        );
        taken.insert(project.id.clone());
        seen.insert(project.id.clone());
    }
    projects
}

fn project_from_row(row: &Value) -> Option<Project> {
    let obj = row.as_object()?;
    let name = text(field(obj, NAME_KEYS)?)?;
    let coordinate = coordinate_of(obj)?;
    let id = obj
        .get("id")
        .and_then(text)
        .unwrap_or_else(|| slugify(&name));
    let images = string_list(field(obj, &["images", "image_urls"]));
    let nearby = match field(obj, &["nearby", "nearby_amenities"]) {
        Some(Value::Object(lists)) => nearby_lists(&name, coordinate, lists),
        _ => BTreeMap::new(),
    };
    Some(Project {
        id,
        name,
        coordinate,
        images,
        nearby,
    })
}

fn nearby_lists(
    project: &str,
    origin: Coordinate,
    lists: &Map<String, Value>,
) -> BTreeMap<AmenityCategory, Vec<NearbyAmenity>> {
    let mut out = BTreeMap::new();
    for (key, entries) in lists {
        let Ok(category) = key.parse::<AmenityCategory>() else {
            tracing::warn!(project, key = %key, "Ignoring nearby list with unknown category");
            continue;
        };
        let Some(entries) = entries.as_array() else {
            tracing::warn!(project, %category, "Nearby list is not an array");
            continue;
        };
        let parsed: Vec<NearbyAmenity> = entries
            .iter()
            .filter_map(|entry| {
                let amenity = nearby_from_entry(origin, entry);
                if amenity.is_none() {
                    tracing::warn!(project, %category, "Skipping malformed nearby amenity");
                }
                amenity
            })
            .collect();
        out.insert(category, parsed);
    }
    out
}

fn nearby_from_entry(origin: Coordinate, entry: &Value) -> Option<NearbyAmenity> {
    let obj = entry.as_object()?;
    let name = text(field(obj, &["name", "Name"])?)?;
    let coordinate = coordinate_of(obj)?;
    let distance = field(obj, &["distance", "distance_km"])
        .and_then(distance_km)
        .unwrap_or_else(|| haversine_km(origin, coordinate));
    Some(NearbyAmenity {
        name,
        distance_km: distance,
        coordinate,
    })
}

/// Parse a bulk amenity list for one category.
pub fn parse_amenities(category: AmenityCategory, json: &str) -> Result<Vec<Amenity>, LoadError> {
    let rows = array_document(json, category.slug())?;
    Ok(rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let amenity = row.as_object().and_then(|obj| {
                Some(Amenity {
                    name: text(field(obj, &["name", "Name"])?)?,
                    category,
                    coordinate: coordinate_of(obj)?,
                })
            });
            if amenity.is_none() {
                tracing::warn!(row = i, %category, "Skipping malformed amenity row");
            }
            amenity
        })
        .collect())
}

/// Parse the separate project image dataset.
pub fn parse_project_images(json: &str) -> Result<Vec<ProjectImages>, LoadError> {
    let rows = array_document(json, "project images")?;
    Ok(rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let record = row.as_object().and_then(|obj| {
                Some(ProjectImages {
                    project_name: text(field(obj, NAME_KEYS)?)?,
                    images: string_list(field(obj, &["images", "image_urls"])),
                })
            });
            if record.is_none() {
                tracing::warn!(row = i, "Skipping image record without a project name");
            }
            record
        })
        .collect())
}

/// Merge image records into projects by case-insensitive name. Returns new
/// projects; URLs already present are not repeated.
pub fn attach_images(projects: &[Project], records: &[ProjectImages]) -> Vec<Project> {
    projects
        .iter()
        .map(|p| {
            let mut project = p.clone();
            for record in records
                .iter()
                .filter(|r| r.project_name.trim().eq_ignore_ascii_case(p.name.trim()))
            {
                for url in &record.images {
                    if !project.images.contains(url) {
                        project.images.push(url.clone());
                    }
                }
            }
            project
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn header_index(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Parse a comma-delimited amenity table, keeping at most `cap` valid rows.
pub fn parse_csv_amenities(
    category: AmenityCategory,
    text: &str,
    cap: usize,
) -> Result<Vec<Amenity>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let columns: Vec<Option<usize>> = CSV_COLUMNS
        .iter()
        .map(|(_, names)| header_index(&headers, names))
        .collect();
    let &[Some(name_idx), Some(lat_idx), Some(lng_idx)] = columns.as_slice() else {
        let missing: Vec<&str> = CSV_COLUMNS
            .iter()
            .zip(&columns)
            .filter(|(_, idx)| idx.is_none())
            .map(|((label, _), _)| *label)
            .collect();
        return Err(LoadError::Shape(format!(
            "{category} table is missing column(s): {}",
            missing.join(", ")
        )));
    };

    let mut amenities = Vec::new();
    for (i, record) in reader.records().enumerate() {
        if amenities.len() >= cap {
            break;
        }
        // Header is line 1
        let line = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(line, %category, error = %e, "Skipping unreadable row");
                continue;
            }
        };
        let name = record.get(name_idx).map(str::trim).filter(|s| !s.is_empty());
        let lat = record.get(lat_idx).and_then(|v| v.trim().parse::<f64>().ok());
        let lng = record.get(lng_idx).and_then(|v| v.trim().parse::<f64>().ok());
        match (name, lat, lng) {
            (Some(name), Some(lat), Some(lng)) => match Coordinate::new(lat, lng) {
                Some(coordinate) => amenities.push(Amenity {
                    name: name.to_string(),
                    category,
                    coordinate,
                }),
                None => tracing::warn!(line, %category, lat, lng, "Coordinates out of range"),
            },
            _ => tracing::warn!(line, %category, "Missing name or non-numeric coordinates"),
        }
    }
    Ok(amenities)
}

// ---------------------------------------------------------------------------
// GeoJSON
// ---------------------------------------------------------------------------

/// GeoJSON positions are `[lng, lat, ...]`.
fn position(value: &Value) -> Option<Coordinate> {
    let pos = value.as_array()?;
    let lng = pos.first()?.as_f64()?;
    let lat = pos.get(1)?.as_f64()?;
    Coordinate::new(lat, lng)
}

fn path(value: &Value) -> Option<Vec<Coordinate>> {
    value.as_array()?.iter().map(position).collect()
}

fn paths(value: &Value) -> Option<Vec<Vec<Coordinate>>> {
    value.as_array()?.iter().map(path).collect()
}

fn overlay_from_geometry(geometry: &Value) -> Result<(OverlayKind, Vec<Vec<Coordinate>>), String> {
    let kind = geometry["type"].as_str().unwrap_or_default();
    let coords = &geometry["coordinates"];
    let parsed = match kind {
        "LineString" => path(coords).map(|p| (OverlayKind::Line, vec![p])),
        "MultiLineString" => paths(coords).map(|p| (OverlayKind::Line, p)),
        "Polygon" => paths(coords).map(|p| (OverlayKind::Area, p)),
        "MultiPolygon" => coords
            .as_array()
            .and_then(|polys| {
                polys
                    .iter()
                    .map(paths)
                    .collect::<Option<Vec<_>>>()
            })
            .map(|polys| (OverlayKind::Area, polys.into_iter().flatten().collect())),
        other => return Err(format!("unsupported geometry type '{other}'")),
    };
    parsed.ok_or_else(|| format!("invalid {kind} coordinates"))
}

/// Parse a GeoJSON FeatureCollection into line/area overlays.
pub fn parse_overlays(json: &str) -> Result<Vec<Overlay>, LoadError> {
    let doc: Value = serde_json::from_str(json)?;
    if doc["type"].as_str() != Some("FeatureCollection") {
        return Err(LoadError::Shape("expected a GeoJSON FeatureCollection".to_string()));
    }
    let features = doc["features"]
        .as_array()
        .ok_or_else(|| LoadError::Shape("FeatureCollection without 'features' array".to_string()))?;

    let mut overlays = Vec::new();
    for (i, feature) in features.iter().enumerate() {
        let name = feature["properties"]
            .as_object()
            .and_then(|props| field(props, &["name", "Name"]))
            .and_then(text);
        match overlay_from_geometry(&feature["geometry"]) {
            Ok((kind, paths)) => overlays.push(Overlay { name, kind, paths }),
            Err(reason) => {
                tracing::warn!(feature = i, reason = %reason, "Skipping GeoJSON feature")
            }
        }
    }
    Ok(overlays)
}
