use dioxus::prelude::*;
use estatemap_shared::geo::format_distance;
use estatemap_shared::models::{AmenityCategory, NearbyAmenity, Project};
use estatemap_shared::nearest::NearestAmenity;

/// One line of the nearest-amenity table: category label, place name, distance.
pub fn nearest_row(entry: &NearestAmenity) -> (&'static str, String, String) {
    let label = match entry.category {
        AmenityCategory::Metro => "Nearest metro",
        AmenityCategory::School => "Nearest school",
        AmenityCategory::Hospital => "Nearest hospital",
        AmenityCategory::Airport => "Nearest airport",
    };
    let distance = if entry.is_found() {
        format_distance(entry.distance_km)
    } else {
        "-".to_string()
    };
    (label, entry.name.clone(), distance)
}

/// Precomputed nearby amenities, closest first.
fn sorted_nearby(list: &[NearbyAmenity]) -> Vec<NearbyAmenity> {
    let mut sorted = list.to_vec();
    sorted.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    sorted
}

#[component]
pub fn ProjectDetails(
    projects: Vec<Project>,
    selected: Option<Project>,
    nearest: Option<Vec<NearestAmenity>>,
    on_select: EventHandler<String>,
    on_clear: EventHandler<()>,
) -> Element {
    let Some(project) = selected else {
        let count = projects.len();
        return rsx! {
            div { class: "panel",
                h3 { "Projects ({count})" }
                if projects.is_empty() {
                    p { class: "muted", "No projects loaded." }
                }
                ul { class: "project-list",
                    for p in projects {
                        li {
                            key: "{p.id}",
                            onclick: {
                                let id = p.id.clone();
                                move |_| on_select.call(id.clone())
                            },
                            "{p.name}"
                        }
                    }
                }
            }
        };
    };

    let nearby: Vec<(AmenityCategory, Vec<NearbyAmenity>)> = project
        .nearby
        .iter()
        .map(|(category, list)| (*category, sorted_nearby(list)))
        .collect();

    let nearest_section = match nearest {
        Some(entries) => {
            let rows: Vec<(bool, &'static str, String, String)> = entries
                .iter()
                .map(|entry| {
                    let (label, name, distance) = nearest_row(entry);
                    (entry.is_found(), label, name, distance)
                })
                .collect();
            rsx! {
                table { class: "nearest-table",
                    tbody {
                        for (found, label, name, distance) in rows {
                            tr {
                                class: if found { "" } else { "not-found" },
                                th { "{label}" }
                                td { "{name}" }
                                td { class: "distance", "{distance}" }
                            }
                        }
                    }
                }
            }
        }
        None => rsx! {
            p { class: "muted", "Looking up nearby places..." }
        },
    };

    rsx! {
        div { class: "panel project-details",
            div { class: "details-header",
                h3 { "{project.name}" }
                button {
                    class: "secondary",
                    onclick: move |_| on_clear.call(()),
                    "All projects"
                }
            }

            if !project.images.is_empty() {
                div { class: "gallery",
                    for (i, url) in project.images.iter().enumerate() {
                        img {
                            key: "{i}",
                            src: "{url}",
                            alt: "{project.name}",
                            loading: "lazy",
                        }
                    }
                }
            }

            h4 { "Closest amenities" }
            {nearest_section}

            for (category, list) in nearby {
                div { class: "nearby-group",
                    h4 { {category.label()} }
                    if list.is_empty() {
                        p { class: "muted", "None listed." }
                    }
                    ul {
                        for item in list {
                            li {
                                span { "{item.name}" }
                                span { class: "distance", {format_distance(item.distance_km)} }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estatemap_shared::geo::Coordinate;

    #[test]
    fn test_nearest_row_found() {
        let entry = NearestAmenity {
            category: AmenityCategory::Airport,
            name: "Kempegowda International".to_string(),
            distance_km: 31.456,
            coordinate: Some(Coordinate { lat: 13.1986, lng: 77.7066 }),
        };
        assert_eq!(
            nearest_row(&entry),
            ("Nearest airport", "Kempegowda International".to_string(), "31.46 km".to_string())
        );
    }

    #[test]
    fn test_nearest_row_not_found() {
        let entry = NearestAmenity::not_found(AmenityCategory::School);
        assert_eq!(
            nearest_row(&entry),
            ("Nearest school", "Not found".to_string(), "-".to_string())
        );
    }

    #[test]
    fn test_sorted_nearby_closest_first() {
        let item = |name: &str, d: f64| NearbyAmenity {
            name: name.to_string(),
            distance_km: d,
            coordinate: Coordinate { lat: 12.9, lng: 77.6 },
        };
        let sorted = sorted_nearby(&[item("far", 4.2), item("near", 0.4), item("mid", 1.0)]);
        let names: Vec<&str> = sorted.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["near", "mid", "far"]);
    }
}
